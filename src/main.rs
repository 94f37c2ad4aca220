//! console-expr CLI
//!
//! Evaluate and inspect console template expressions.

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use colored::*;
use console_expr::{
    lexer::Lexer, logging, parser::parse_expression_with_depth, EvaluationOptions,
    EvaluatorConfig, ExpressionEvaluator, StandardContextOptions, UserInfo, Value,
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "console-expr")]
#[command(author = "Console Expression Team")]
#[command(version)]
#[command(about = "Evaluate ${...} template expressions against a console context", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Evaluator configuration (TOML)
    #[arg(long, global = true, value_name = "FILE", env = "CONSOLE_EXPR_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a template and print the result as JSON
    ///
    /// Examples:
    ///   console-expr eval '${data.amount * 2}' --data '{"amount": 21}'
    ///   console-expr eval 'Hello ${user.name}' --user user.json
    Eval {
        /// Template text, e.g. 'Total: ${SUM(data.items, "price")}'
        #[arg(value_name = "TEMPLATE")]
        template: String,

        #[command(flatten)]
        context: ContextArgs,

        /// Fail on the first evaluation error instead of degrading
        #[arg(long)]
        strict: bool,
    },
    /// Evaluate a visibility condition and print true or false
    Cond {
        /// Condition template, e.g. '${data.status === "active"}'
        #[arg(value_name = "CONDITION")]
        condition: String,

        #[command(flatten)]
        context: ContextArgs,

        /// Fail on the first evaluation error instead of degrading
        #[arg(long)]
        strict: bool,
    },
    /// Parse an expression and display the AST
    Parse {
        /// Bare expression (no ${} wrapper)
        #[arg(value_name = "EXPR")]
        expression: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Tokenize an expression and display tokens
    Lex {
        /// Bare expression (no ${} wrapper)
        #[arg(value_name = "EXPR")]
        expression: String,
    },
    /// Check an expression for errors without evaluating it
    Check {
        /// Bare expression (no ${} wrapper)
        #[arg(value_name = "EXPR")]
        expression: String,
    },
    /// Start an interactive session
    Repl {
        #[command(flatten)]
        context: ContextArgs,
    },
}

/// Inputs for the standard context. Each takes a JSON file path or inline JSON.
#[derive(Args, Default)]
struct ContextArgs {
    /// Current record, bound as `data`, `record` and `form`
    #[arg(long, value_name = "JSON|FILE")]
    data: Option<String>,

    /// Authenticated user (id, name, email, roles, locale, timezone, avatar)
    #[arg(long, value_name = "JSON|FILE")]
    user: Option<String>,

    /// Route and query parameters
    #[arg(long, value_name = "JSON|FILE")]
    params: Option<String>,

    /// Page metadata and variables
    #[arg(long, value_name = "JSON|FILE")]
    page: Option<String>,

    /// Environment values
    #[arg(long, value_name = "JSON|FILE")]
    env: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let result = load_config(cli.config.as_ref()).and_then(|config| {
        logging::init_tracing(&config.log_level);
        match cli.command {
            Some(Commands::Eval {
                template,
                context,
                strict,
            }) => eval_template(&template, &context, strict, config),
            Some(Commands::Cond {
                condition,
                context,
                strict,
            }) => eval_condition(&condition, &context, strict, config),
            Some(Commands::Parse { expression, json }) => parse_expr(&expression, json, &config),
            Some(Commands::Lex { expression }) => lex_expr(&expression),
            Some(Commands::Check { expression }) => check_expr(&expression, config),
            Some(Commands::Repl { context }) => run_repl(&context, config),
            None => run_repl(&ContextArgs::default(), config),
        }
    });

    if let Err(e) = result {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<EvaluatorConfig> {
    match path {
        Some(path) => Ok(EvaluatorConfig::load(path)?),
        None => Ok(EvaluatorConfig::default()),
    }
}

/// Inline JSON when the argument looks like JSON, otherwise a path to a JSON file
fn read_json(arg: &str) -> anyhow::Result<serde_json::Value> {
    let trimmed = arg.trim_start();
    let text = if trimmed.starts_with('{') || trimmed.starts_with('[') {
        arg.to_string()
    } else {
        fs::read_to_string(arg).with_context(|| format!("cannot read {}", arg))?
    };
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", arg))
}

fn build_evaluator(args: &ContextArgs, config: EvaluatorConfig) -> anyhow::Result<ExpressionEvaluator> {
    let mut options = StandardContextOptions::new();
    if let Some(data) = &args.data {
        options = options.with_data(read_json(data)?);
    }
    if let Some(user) = &args.user {
        let user: UserInfo = serde_json::from_value(read_json(user)?)
            .context("--user does not describe a user")?;
        options = options.with_user(user);
    }
    if let Some(params) = &args.params {
        options = options.with_params(read_json(params)?);
    }
    if let Some(page) = &args.page {
        options = options.with_page(read_json(page)?);
    }
    if let Some(env) = &args.env {
        options = options.with_env(read_json(env)?);
    }
    Ok(ExpressionEvaluator::from_standard_context(options).with_config(config))
}

fn render(value: &Value) -> anyhow::Result<String> {
    match value {
        Value::Undefined => Ok("undefined".to_string()),
        other => Ok(serde_json::to_string_pretty(other)?),
    }
}

fn eval_template(
    template: &str,
    args: &ContextArgs,
    strict: bool,
    config: EvaluatorConfig,
) -> anyhow::Result<()> {
    let evaluator = build_evaluator(args, config)?;
    let options = EvaluationOptions::new().with_throw_on_error(strict);
    let value = evaluator.evaluate(&Value::from(template), &options)?;
    println!("{}", render(&value)?);
    Ok(())
}

fn eval_condition(
    condition: &str,
    args: &ContextArgs,
    strict: bool,
    config: EvaluatorConfig,
) -> anyhow::Result<()> {
    let evaluator = build_evaluator(args, config)?;
    let options = EvaluationOptions::new().with_throw_on_error(strict);
    let condition = Value::from(condition);
    let visible = evaluator.evaluate_condition(Some(&condition), &options)?;
    println!("{}", visible);
    Ok(())
}

fn parse_expr(expression: &str, json: bool, config: &EvaluatorConfig) -> anyhow::Result<()> {
    let ast = parse_expression_with_depth(expression, config.max_depth)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ast)?);
    } else {
        println!("{:#?}", ast);
    }

    Ok(())
}

fn lex_expr(expression: &str) -> anyhow::Result<()> {
    for token in Lexer::new(expression) {
        let token = token?;
        println!("{:>4}  {:?}", token.position, token.kind);
    }

    Ok(())
}

fn check_expr(expression: &str, config: EvaluatorConfig) -> anyhow::Result<()> {
    let evaluator = ExpressionEvaluator::default().with_config(config);
    let ast = evaluator.validate(expression)?;

    println!("{} No errors found", "✓".green());
    let names = ast.referenced_names();
    if !names.is_empty() {
        println!("  reads: {}", names.join(", "));
    }
    Ok(())
}

fn run_repl(args: &ContextArgs, config: EvaluatorConfig) -> anyhow::Result<()> {
    println!("{}", "console-expr interactive session".green().bold());
    println!("Type {} for help, {} to exit\n", ":help".cyan(), ":quit".cyan());

    let mut rl = DefaultEditor::new()?;
    let mut evaluator = build_evaluator(args, config)?;
    let options = EvaluationOptions::strict();

    loop {
        let readline = rl.readline(&format!("{} ", "expr>".blue().bold()));
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if line.starts_with(':') {
                    match repl_command(&mut evaluator, line) {
                        Ok(true) => continue,
                        Ok(false) => {
                            println!("Goodbye!");
                            break;
                        }
                        Err(e) => {
                            println!("{}: {}", "Error".red(), e);
                            continue;
                        }
                    }
                }

                // `${...}` input is a template, anything else a bare expression
                let result = if line.contains("${") {
                    evaluator.evaluate(&Value::from(line), &options)
                } else {
                    evaluator.evaluate_expression(line, &options)
                };
                match result.map_err(anyhow::Error::from).and_then(|v| render(&v)) {
                    Ok(text) => println!("{}", text.green()),
                    Err(e) => println!("{}: {}", "Error".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    Ok(())
}

/// Handle a `:command`. Returns `false` when the session should end.
fn repl_command(evaluator: &mut ExpressionEvaluator, line: &str) -> anyhow::Result<bool> {
    let mut parts = line.splitn(3, char::is_whitespace);
    let command = parts.next().unwrap_or_default();

    match command {
        ":quit" | ":q" | ":exit" => return Ok(false),
        ":help" | ":h" => print_repl_help(),
        ":set" => {
            let name = parts.next().filter(|n| !n.is_empty());
            let json = parts.next().map(str::trim).filter(|j| !j.is_empty());
            let (Some(name), Some(json)) = (name, json) else {
                anyhow::bail!("usage: :set <name> <json>");
            };
            let value: serde_json::Value =
                serde_json::from_str(json).with_context(|| format!("invalid JSON: {}", json))?;
            evaluator.update_context([(name, value)]);
            println!("{} = {}", name.cyan(), json);
        }
        ":ctx" => {
            for (key, value) in evaluator.context().to_object() {
                println!("  {} = {}", key.cyan(), serde_json::to_string(&value)?);
            }
        }
        ":functions" => {
            println!("  {}", console_expr::stdlib::function_names().join(", "));
        }
        other => anyhow::bail!("Unknown command: {}", other),
    }

    Ok(true)
}

fn print_repl_help() {
    println!("{}", "\nSession Commands:".yellow().bold());
    println!("  {}          - Show this help message", ":help, :h".cyan());
    println!("  {}   - Exit the session", ":quit, :q, :exit".cyan());
    println!("  {} - Bind a variable, e.g. :set data {{\"amount\": 5}}", ":set <name> <json>".cyan());
    println!("  {}               - Show every visible binding", ":ctx".cyan());
    println!("  {}         - List formula functions", ":functions".cyan());
    println!();
    println!("{}", "Examples:".yellow().bold());
    println!("  {}", "data.amount * 1.2".cyan());
    println!("  {}", "SUM(data.items, 'price')".cyan());
    println!("  {}", "Hello ${user.name ?? 'guest'}".cyan());
    println!();
}
