use std::sync::Arc;

use serde_json::json;
use tabload_ingest::{CsvReader, LogPort, TracingLog};

use crate::{EngineResult, LoadRequest, NativeDrivers, Pipeline, RelationalSink};

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Load {
        request_path: String,
    },
    Ping {
        request_path: String,
    },
    Tables {
        request_path: String,
    },
    Schema {
        request_path: String,
        table_name: String,
    },
}

pub fn execute_command(command: &str) -> EngineResult<String> {
    let parsed = parse_command(command)?;
    match parsed {
        Command::Load { request_path } => {
            let request = LoadRequest::from_path(&request_path)?;
            let reader = CsvReader::new(port("reader"));
            let pipeline = Pipeline::new(&reader, &NativeDrivers, port("pipeline"), port("sink"));
            let response = pipeline.handle(&request);
            Ok(serde_json::to_string(&response)?)
        }
        Command::Ping { request_path } => {
            let mut sink = open_sink(&request_path)?;
            let report = sink.test_connection();
            sink.close();
            Ok(serde_json::to_string(&report)?)
        }
        Command::Tables { request_path } => {
            let mut sink = open_sink(&request_path)?;
            let tables = sink.list_tables();
            sink.close();
            Ok(json!({ "tables": tables }).to_string())
        }
        Command::Schema {
            request_path,
            table_name,
        } => {
            let mut sink = open_sink(&request_path)?;
            let info = sink.table_info(&table_name);
            sink.close();
            let Some(info) = info else {
                return Err(format!("Table '{table_name}' not found").into());
            };
            Ok(serde_json::to_string(&info)?)
        }
    }
}

fn port(component: &str) -> Arc<dyn LogPort> {
    Arc::new(TracingLog::new(component))
}

fn open_sink(request_path: &str) -> EngineResult<RelationalSink> {
    let request = LoadRequest::from_path(request_path)?;
    Ok(RelationalSink::create(&request.destination, port("sink"))?)
}

fn parse_command(command: &str) -> EngineResult<Command> {
    let tokens = tokenize(command)?;
    let Some(name) = tokens.first().map(String::as_str) else {
        return Err("Command cannot be empty".into());
    };

    match name {
        "load" => parse_request_only(&tokens, "load")
            .map(|request_path| Command::Load { request_path }),
        "ping" => parse_request_only(&tokens, "ping")
            .map(|request_path| Command::Ping { request_path }),
        "tables" => parse_request_only(&tokens, "tables")
            .map(|request_path| Command::Tables { request_path }),
        "schema" => parse_schema(&tokens),
        _ => Err(format!("Unknown command: {name}").into()),
    }
}

fn parse_request_only(tokens: &[String], name: &str) -> EngineResult<String> {
    if tokens.len() != 2 {
        return Err(format!("Usage: {name} <request.json>").into());
    }
    Ok(tokens[1].clone())
}

fn parse_schema(tokens: &[String]) -> EngineResult<Command> {
    if tokens.len() != 3 {
        return Err("Usage: schema <request.json> <table_name>".into());
    }
    Ok(Command::Schema {
        request_path: tokens[1].clone(),
        table_name: tokens[2].clone(),
    })
}

/// Splits on whitespace. Single or double quotes group text into one token
/// (an empty pair yields an empty token) and a backslash inside quotes takes
/// the next character literally.
fn tokenize(command: &str) -> EngineResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut token: Option<String> = None;
    let mut chars = command.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' | '\'' => {
                let buf = token.get_or_insert_with(String::new);
                loop {
                    match chars.next() {
                        Some(c) if c == ch => break,
                        Some('\\') => match chars.next() {
                            Some(escaped) => buf.push(escaped),
                            None => return Err("Unterminated quoted string".into()),
                        },
                        Some(c) => buf.push(c),
                        None => return Err("Unterminated quoted string".into()),
                    }
                }
            }
            c if c.is_whitespace() => tokens.extend(token.take()),
            c => token.get_or_insert_with(String::new).push(c),
        }
    }
    tokens.extend(token);

    Ok(tokens)
}
