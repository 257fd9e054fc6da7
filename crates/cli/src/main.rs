use std::env;
use std::io::{self, Read};

mod commands;
use tabload_engine::execute_command;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .init();

    let mut args = env::args().skip(1).collect::<Vec<String>>();
    if args.is_empty() {
        let mut input = String::new();
        io::stdin().read_to_string(&mut input)?;
        args = input.split_whitespace().map(str::to_string).collect();
    }

    if args.is_empty() || commands::help::is_help_request(&args) {
        commands::help::print_help();
        return Ok(());
    }

    if !matches!(args[0].as_str(), "load" | "ping" | "tables" | "schema") {
        commands::help::print_help();
        return Ok(());
    }

    let command = serialize_command(&args);
    let output = execute_command(&command)?;
    println!("{output}");

    Ok(())
}

/// Re-joins arguments so the engine tokenizer sees each one as a single
/// token, quoting and escaping where needed.
fn serialize_command(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            let plain = !arg.is_empty()
                && !arg
                    .chars()
                    .any(|ch| ch.is_whitespace() || matches!(ch, '"' | '\'' | '\\'));
            if plain {
                arg.clone()
            } else {
                format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
