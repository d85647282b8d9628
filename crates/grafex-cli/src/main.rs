//! Grafex CLI
//!
//! Parses and evaluates one expression, optionally under a custom grammar.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use grafex::{Engine, Grammar, OperationRegistry, Value};
use serde_json::json;

#[derive(Parser)]
#[command(name = "grafex")]
#[command(about = "Evaluate expressions under a configurable grammar")]
#[command(allow_negative_numbers = true)]
#[command(after_help = "\
EXAMPLES:
    # Standard arithmetic
    grafex '2 + 3 * 4'

    # Implicit multiplication and variables
    grafex '2 x^2 + 1' --bind x=3

    # Inspect each stage
    grafex 'max(1, sin(x), 3)' --tokens --tree --free

    # Sample a curve as JSON points
    grafex 'sin(x)' --sample x --from 0 --to 3.14159 --steps 8 --json

    # Custom grammar
    grafex 'a # b' --grammar my_grammar.json
")]
struct Args {
    /// Expression to evaluate
    #[arg(allow_hyphen_values = true)]
    expression: String,

    /// JSON grammar configuration (defaults to the standard grammar)
    #[arg(short, long)]
    grammar: Option<PathBuf>,

    /// Bind a variable before evaluating: name=value (number, true or false)
    #[arg(short, long = "bind", value_parser = parse_binding)]
    bindings: Vec<(String, Value)>,

    /// Print the token stream
    #[arg(long)]
    tokens: bool,

    /// Print the syntax tree
    #[arg(long)]
    tree: bool,

    /// Print free variables and their types
    #[arg(long)]
    free: bool,

    /// Sample the expression over this variable instead of evaluating once
    #[arg(long)]
    sample: Option<String>,

    /// Start of the sampling range
    #[arg(long, default_value_t = 0.0, requires = "sample")]
    from: f64,

    /// End of the sampling range
    #[arg(long, default_value_t = 1.0, requires = "sample")]
    to: f64,

    /// Number of sampling intervals (steps + 1 points)
    #[arg(long, default_value_t = 10, requires = "sample")]
    steps: usize,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

fn parse_binding(raw: &str) -> Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in '{raw}'"));
    }
    let value = match value.trim() {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        number => Value::Number(
            number
                .parse::<f64>()
                .map_err(|e| format!("invalid value '{number}': {e}"))?,
        ),
    };
    Ok((name.to_string(), value))
}

fn load_grammar(path: Option<&PathBuf>) -> anyhow::Result<Grammar> {
    let Some(path) = path else {
        return Ok(Grammar::standard());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading grammar {}", path.display()))?;
    let grammar = Grammar::from_json(&text)
        .with_context(|| format!("invalid grammar {}", path.display()))?;
    log::info!("Loaded grammar from {}", path.display());
    Ok(grammar)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let grammar = Arc::new(load_grammar(args.grammar.as_ref())?);
    let engine = Engine::new(grammar, Arc::new(OperationRegistry::standard()));

    if args.tokens {
        for token in engine.parser().tokenize(&args.expression)? {
            println!("{token}");
        }
    }
    if args.tree {
        println!("{}", engine.parse(&args.expression)?);
    }

    let mut tree = engine.compile(&args.expression)?;

    if args.free {
        for (name, ty) in tree.free_variables() {
            println!("{name}: {ty}");
        }
    }

    for (name, value) in &args.bindings {
        if tree.bind(name, value.clone()) == 0 {
            log::warn!("'{}' does not occur in the expression", name);
        }
    }

    if let Some(variable) = &args.sample {
        let points = engine.sample(&mut tree, variable, args.from, args.to, args.steps)?;
        if args.json {
            let points: Vec<_> = points.iter().map(|(x, y)| json!([x, y])).collect();
            println!("{}", serde_json::to_string(&points)?);
        } else {
            for (x, y) in points {
                println!("{x}\t{y}");
            }
        }
        return Ok(());
    }

    let value = tree.evaluate()?;
    if args.json {
        let free: serde_json::Map<_, _> = tree
            .free_variables()
            .into_iter()
            .map(|(name, ty)| (name, json!(ty.to_string())))
            .collect();
        let out = json!({
            "expression": tree.to_string(),
            "value": value,
            "free": free,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{value}");
    }

    Ok(())
}
