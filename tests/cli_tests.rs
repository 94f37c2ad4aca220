//! Integration tests for the console-expr CLI
//!
//! Tests the CLI commands: eval, cond, parse, lex, check

use std::fs;
use std::io::Write;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique temp file path
fn unique_test_file(prefix: &str, extension: &str) -> String {
    let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir();
    dir.join(format!(
        "console_expr_{}_{}_{}.{}",
        prefix,
        std::process::id(),
        counter,
        extension
    ))
    .display()
    .to_string()
}

fn write_test_file(prefix: &str, extension: &str, content: &str) -> String {
    let path = unique_test_file(prefix, extension);
    let mut file = fs::File::create(&path).expect("Failed to create test file");
    write!(file, "{}", content).expect("Failed to write test file");
    path
}

/// Helper to run console-expr and capture output
fn run_cli(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_console-expr"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("CONSOLE_EXPR_CONFIG")
        .output()
        .expect("Failed to execute console-expr");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

// ============================================================================
// console-expr eval
// ============================================================================

#[test]
fn test_eval_single_token_prints_typed_json() {
    let (stdout, _, code) = run_cli(&["eval", "${data.amount * 2}", "--data", r#"{"amount": 21}"#]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "42");
}

#[test]
fn test_eval_mixed_template_prints_string() {
    let (stdout, _, code) = run_cli(&[
        "eval",
        "Hello ${user.name}, you have ${LEN(user.roles)} roles",
        "--user",
        r#"{"id": "u1", "name": "Ada", "roles": ["admin", "editor"]}"#,
    ]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), r#""Hello Ada, you have 2 roles""#);
}

#[test]
fn test_eval_user_keeps_extra_attributes() {
    let (stdout, _, code) = run_cli(&[
        "eval",
        "${user.department} / ${user.name}",
        "--user",
        r#"{"id": "u1", "name": "Ada", "department": "EMEA"}"#,
    ]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), r#""EMEA / Ada""#);
}

#[test]
fn test_eval_reads_data_file() {
    let data = write_test_file(
        "data",
        "json",
        r#"{"items": [{"price": 10}, {"price": 20}, {"price": 30}]}"#,
    );
    let (stdout, _, code) = run_cli(&["eval", "${SUM(data.items, 'price')}", "--data", &data]);
    fs::remove_file(&data).ok();

    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "60");
}

#[test]
fn test_eval_object_result() {
    let (stdout, _, code) = run_cli(&["eval", "${params}", "--params", r#"{"id": "7"}"#]);
    assert_eq!(code, 0);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("eval should print JSON");
    assert_eq!(json, serde_json::json!({"id": "7"}));
}

#[test]
fn test_eval_failure_degrades_without_strict() {
    let (stdout, _, code) = run_cli(&["eval", "${missing.value}"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), r#""${missing.value}""#);
}

#[test]
fn test_eval_failure_with_strict() {
    let (_, stderr, code) = run_cli(&["eval", "${missing.value}", "--strict"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("missing is not defined"), "stderr: {}", stderr);
}

#[test]
fn test_eval_rejects_dangerous_expression() {
    let (_, stderr, code) = run_cli(&["eval", "${eval('1')}"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Potentially dangerous expression"), "stderr: {}", stderr);
}

#[test]
fn test_eval_invalid_json_argument() {
    let (_, stderr, code) = run_cli(&["eval", "${data}", "--data", "{not json"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("invalid JSON"), "stderr: {}", stderr);
}

#[test]
fn test_eval_with_config_file() {
    let config = write_test_file("config", "toml", "max_steps = 2\n");
    let (_, stderr, code) = run_cli(&["eval", "${1 + 2 + 3}", "--strict", "--config", &config]);
    fs::remove_file(&config).ok();

    assert_ne!(code, 0);
    assert!(stderr.contains("budget exhausted"), "stderr: {}", stderr);
}

#[test]
fn test_eval_with_invalid_config_file() {
    let config = write_test_file("bad_config", "toml", "max_steps = \"lots\"\n");
    let (_, stderr, code) = run_cli(&["eval", "${1}", "--config", &config]);
    fs::remove_file(&config).ok();

    assert_ne!(code, 0);
    assert!(stderr.contains("Invalid configuration"), "stderr: {}", stderr);
}

// ============================================================================
// console-expr cond
// ============================================================================

#[test]
fn test_cond() {
    let (stdout, _, code) = run_cli(&["cond", "${data.status === 'active'}", "--data", r#"{"status": "active"}"#]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "true");

    let (stdout, _, code) = run_cli(&["cond", "${1 > 2}"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "false");
}

// ============================================================================
// console-expr parse / lex / check
// ============================================================================

#[test]
fn test_parse_json_output() {
    let (stdout, _, code) = run_cli(&["parse", "data.amount > 1000", "--json"]);
    assert_eq!(code, 0);

    let json: serde_json::Value = serde_json::from_str(&stdout).expect("parse should output valid JSON");
    assert_eq!(json["Binary"]["operator"], "Gt");
    assert_eq!(json["Binary"]["right"]["Number"], 1000.0);
}

#[test]
fn test_parse_error() {
    let (_, stderr, code) = run_cli(&["parse", "data.amount >"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Parser error"), "stderr: {}", stderr);
}

#[test]
fn test_lex() {
    let (stdout, _, code) = run_cli(&["lex", "a?.b ?? 1"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("QuestionDot"));
    assert!(stdout.contains("Nullish"));
    assert!(stdout.contains("Number(1.0)"));
}

#[test]
fn test_check_valid_expression() {
    let (stdout, _, code) = run_cli(&["check", "IF(data.total > page.limit, 'big', 'small')"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No errors found"));
    assert!(stdout.contains("reads: IF, data, page"));
}

#[test]
fn test_check_dangerous_expression() {
    let (_, stderr, code) = run_cli(&["check", "window.location"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Potentially dangerous expression"));
}
