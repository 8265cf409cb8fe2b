use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const BILLING: &str = r#"
{
  "name": "billing",
  "rules": [
    {
      "name": "late_fee",
      "line": 4,
      "lhs": [
        {
          "kind": "pattern",
          "object_type": "Invoice",
          "identifier": "$i",
          "constraints": [
            {
              "kind": "field_constraint",
              "field_name": "days",
              "restrictions": [
                {
                  "kind": "connective",
                  "connective": "or",
                  "restrictions": [
                    { "kind": "literal", "evaluator": ">", "text": "30" },
                    { "kind": "literal", "evaluator": "==", "text": "0" }
                  ]
                }
              ]
            }
          ]
        },
        { "kind": "not", "descrs": [{ "kind": "pattern", "object_type": "Payment" }] }
      ],
      "consequence": "charge($i);"
    }
  ]
}
"#;

const BROKEN: &str = r#"
{
  "name": "broken",
  "rules": [{
    "name": "uses",
    "line": 7,
    "lhs": [{
      "kind": "pattern",
      "object_type": "Order",
      "constraints": [{
        "kind": "field_constraint",
        "field_name": "owner",
        "restrictions": [{ "kind": "variable", "evaluator": "==", "identifier": "$missing" }]
      }]
    }]
  }]
}
"#;

fn workspace(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for (name, content) in files {
        fs::write(temp_dir.path().join(name), content).unwrap();
    }
    temp_dir
}

#[test]
fn test_cli_flatten_summary() {
    let temp_dir = workspace(&[
        ("billing.json", BILLING),
        ("empty.json", r#"[{ "name": "empty" }]"#),
        ("notes.txt", "ignored"),
    ]);

    let mut cmd = Command::cargo_bin("verifier").unwrap();
    cmd.arg("flatten").arg(temp_dir.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Flattened 2 files"))
        .stdout(predicate::str::contains("billing"))
        .stdout(predicate::str::contains("empty"))
        .stdout(predicate::str::contains("2 classes, 1 fields, 1 variables"));
}

#[test]
fn test_cli_flatten_json() {
    let temp_dir = workspace(&[("billing.json", BILLING)]);

    let mut cmd = Command::cargo_bin("verifier").unwrap();
    cmd.arg("flatten")
        .arg(temp_dir.path().join("billing.json"))
        .arg("--json");

    let output = cmd.assert().success().get_output().stdout.clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["components"][0]["type"], "rule_package");
    assert_eq!(json["rule_possibilities"].as_array().unwrap().len(), 2);
}

#[test]
fn test_cli_possibilities() {
    let temp_dir = workspace(&[("billing.json", BILLING)]);

    let mut cmd = Command::cargo_bin("verifier").unwrap();
    cmd.arg("possibilities")
        .arg(temp_dir.path())
        .arg("--rule")
        .arg("late_fee");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("late_fee (line 4, 2 possibilities)"))
        .stdout(predicate::str::contains("Invoice(days > 30)"))
        .stdout(predicate::str::contains("Invoice(days == 0)"))
        .stdout(predicate::str::contains("not Payment()"));
}

#[test]
fn test_cli_possibilities_unknown_rule() {
    let temp_dir = workspace(&[("billing.json", BILLING)]);

    let mut cmd = Command::cargo_bin("verifier").unwrap();
    cmd.arg("possibilities")
        .arg(temp_dir.path())
        .arg("--rule")
        .arg("nonexistent");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_cli_show_rule_tree() {
    let temp_dir = workspace(&[("billing.json", BILLING)]);

    let mut cmd = Command::cargo_bin("verifier").unwrap();
    cmd.arg("show").arg(temp_dir.path()).arg("late_fee");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("rule late_fee"))
        .stdout(predicate::str::contains("pattern $i : Invoice"))
        .stdout(predicate::str::contains("constraint days"))
        .stdout(predicate::str::contains("pattern Payment [not]"))
        .stdout(predicate::str::contains("consequence charge($i);"));
}

#[test]
fn test_cli_reports_rule_and_line_on_error() {
    let temp_dir = workspace(&[("broken.json", BROKEN)]);

    let mut cmd = Command::cargo_bin("verifier").unwrap();
    cmd.arg("flatten").arg(temp_dir.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unresolved variable '$missing'"))
        .stderr(predicate::str::contains("rule 'uses', line 7"));
}

#[test]
fn test_cli_rule_possibility_limit() {
    let temp_dir = workspace(&[("billing.json", BILLING)]);

    let mut cmd = Command::cargo_bin("verifier").unwrap();
    cmd.arg("flatten")
        .arg(temp_dir.path())
        .arg("--max-rule-possibilities")
        .arg("1");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("max_rule_possibilities"))
        .stderr(predicate::str::contains("Rule: late_fee (line 4)"));
}

#[test]
fn test_cli_malformed_document() {
    let temp_dir = workspace(&[("bad.json", "{ not json")]);

    let mut cmd = Command::cargo_bin("verifier").unwrap();
    cmd.arg("flatten").arg(temp_dir.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid rule base document"));
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("verifier").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("flatten"))
        .stdout(predicate::str::contains("possibilities"));
}
