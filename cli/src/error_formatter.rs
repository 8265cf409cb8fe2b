use verifier::VerifierError;

/// Format a VerifierError for terminal output, naming the rule and line it was raised in
pub fn format_error(error: &VerifierError) -> String {
    match error {
        VerifierError::LimitExceeded {
            limit_name,
            limit_value,
            actual,
            rule,
            line,
        } => {
            let suggestion = match *limit_name {
                "max_rule_possibilities" => {
                    "Raise it with --max-rule-possibilities or split the rule into smaller rules."
                }
                "max_nesting_depth" => "Flatten deeply nested and/or/not groups in the rule.",
                _ => "Reduce the number of alternatives inside a single pattern.",
            };
            format!(
                "Analysis limit exceeded: {}\n  Rule: {} (line {})\n  Limit: {}\n  Actual: {}\n  {}",
                limit_name, rule, line, limit_value, actual, suggestion
            )
        }
        VerifierError::Input(err) => format!(
            "Invalid rule base document at line {}, column {}: {}",
            err.line(),
            err.column(),
            err
        ),
        _ => {
            let location = match (error.rule(), error.line()) {
                (Some(rule), Some(line)) => format!("\n  --> rule '{}', line {}", rule, line),
                _ => String::new(),
            };
            format!("Error: {}{}", error, location)
        }
    }
}
