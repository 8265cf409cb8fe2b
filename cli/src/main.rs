mod error_formatter;
mod formatter;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use formatter::Formatter;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;
use verifier::{AnalysisLimits, Verifier};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "verifier")]
#[command(about = "Flatten rule bases and enumerate their logical possibilities.")]
#[command(
    long_about = "Loads rule base syntax trees from .json files, lowers them into a flat graph of\npackages, rules, patterns, constraints and restrictions, and lists the alternative\nconjunctions under which each pattern and rule can match."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log flattening progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Cap on the number of possibilities a single rule may expand into
    #[arg(long, global = true, value_name = "N")]
    max_rule_possibilities: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Flatten rule bases and print a summary
    ///
    /// Loads every .json file under PATH (or PATH itself when it is a file) and prints
    /// per-package counts. With --json the complete graph is printed instead.
    Flatten {
        /// Rule base file or directory containing .json files
        path: PathBuf,
        /// Print the flattened graph and possibilities as JSON
        #[arg(long)]
        json: bool,
    },
    /// List pattern and rule possibilities
    ///
    /// Every rule possibility is one conjunction of pattern possibilities; a rule matches
    /// when any of them holds.
    Possibilities {
        /// Rule base file or directory containing .json files
        path: PathBuf,
        /// Only show the rule with this name
        #[arg(short, long)]
        rule: Option<String>,
    },
    /// Show the flattened component tree of a rule
    Show {
        /// Rule base file or directory containing .json files
        path: PathBuf,
        /// Name of the rule to show
        rule: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut limits = AnalysisLimits::default();
    if let Some(max) = cli.max_rule_possibilities {
        limits.max_rule_possibilities = max;
    }

    let result = match &cli.command {
        Commands::Flatten { path, json } => flatten_command(path, *json, limits),
        Commands::Possibilities { path, rule } => {
            possibilities_command(path, rule.as_deref(), limits)
        }
        Commands::Show { path, rule } => show_command(path, rule, limits),
    };

    if let Err(e) = result {
        if let Some(verifier_err) = e.downcast_ref::<verifier::VerifierError>() {
            eprintln!("{}", error_formatter::format_error(verifier_err));
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("verifier=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("verifier=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn flatten_command(path: &Path, json: bool, limits: AnalysisLimits) -> Result<()> {
    let mut verifier = Verifier::with_limits(limits);
    let file_count = load_workspace(&mut verifier, path)?;

    if json {
        println!("{}", verifier.data().to_json()?);
    } else {
        let formatter = Formatter::default();
        print!("{}", formatter.format_summary(file_count, verifier.data()));
    }

    Ok(())
}

fn possibilities_command(path: &Path, rule: Option<&str>, limits: AnalysisLimits) -> Result<()> {
    let mut verifier = Verifier::with_limits(limits);
    load_workspace(&mut verifier, path)?;

    if let Some(name) = rule {
        if verifier.data().find_rules(name).is_empty() {
            anyhow::bail!("Rule '{}' not found", name);
        }
    }

    let formatter = Formatter::default();
    print!("{}", formatter.format_possibilities(verifier.data(), rule));

    Ok(())
}

fn show_command(path: &Path, rule: &str, limits: AnalysisLimits) -> Result<()> {
    let mut verifier = Verifier::with_limits(limits);
    load_workspace(&mut verifier, path)?;

    let rules = verifier.data().find_rules(rule);
    if rules.is_empty() {
        anyhow::bail!("Rule '{}' not found", rule);
    }

    // Rules of the same name in different packages are shown one after another
    let formatter = Formatter::default();
    for id in rules {
        print!("{}", formatter.format_rule_tree(verifier.data(), id));
    }

    Ok(())
}

/// Load all .json rule base files below `root`, returning how many were read
fn load_workspace(verifier: &mut Verifier, root: &Path) -> Result<usize> {
    let mut file_count = 0;
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("cannot read {}", root.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|s| s.to_str()) != Some("json")
        {
            continue;
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        match verifier.add_json(&text) {
            Ok(packages) => {
                debug!(file = %path.display(), packages = packages.len(), "loaded rule base");
            }
            Err(err) => {
                error!(file = %path.display(), "rejected rule base");
                return Err(err.into());
            }
        }
        file_count += 1;
    }

    Ok(file_count)
}
