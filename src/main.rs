use clap::{Parser, Subcommand};
use cqlkit::error::QueryError;
use cqlkit::output::{
    json_response, AnalyzeResponse, ErrorResponse, FormatResponse, OutputFormat, ParseResponse,
    RewriteResponse,
};
use cqlkit::visitor::PredicateVisitor;
use cqlkit::{classify, CqlQuery, SharingRewriter};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "cqlkit",
    version,
    about = "Inspect, format and rewrite content queries"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format
    #[arg(long, global = true, default_value_t = OutputFormat::Human)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Command {
    /// Parse query text and print the predicate tree
    Parse {
        /// Query text (CQL)
        query: String,
    },
    /// Print the canonical text form of a query
    Format {
        /// Query text (CQL)
        query: String,
    },
    /// Print shape statistics for a query
    Analyze {
        /// Query text (CQL)
        query: String,
    },
    /// Run the sharing rewrite pipeline and print the rewritten query
    Rewrite {
        /// Query text (CQL)
        query: String,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Parse { query } => run_parse(query, cli.output),
        Command::Format { query } => run_format(query, cli.output),
        Command::Analyze { query } => run_analyze(query, cli.output),
        Command::Rewrite { query } => run_rewrite(query, cli.output),
    };

    if let Err(error) = result {
        print_error(&error, cli.output);
        std::process::exit(1);
    }
}

fn run_parse(text: &str, output: OutputFormat) -> Result<(), QueryError> {
    let query = CqlQuery::parse(text)?;
    match output {
        OutputFormat::Human => {
            println!("fingerprint: {}", query.fingerprint());
            println!("tree: {}", query.tree);
        }
        _ => {
            let response = json_response(ParseResponse {
                query: text.to_string(),
                fingerprint: query.fingerprint(),
                tree: Arc::clone(&query.tree),
            });
            print_json(&response, output);
        }
    }
    Ok(())
}

fn run_format(text: &str, output: OutputFormat) -> Result<(), QueryError> {
    let query = CqlQuery::parse(text)?;
    let formatted = query.to_text();
    match output {
        OutputFormat::Human => println!("{}", formatted),
        _ => {
            let response = json_response(FormatResponse {
                query: text.to_string(),
                fingerprint: query.fingerprint(),
                formatted,
            });
            print_json(&response, output);
        }
    }
    Ok(())
}

fn run_analyze(text: &str, output: OutputFormat) -> Result<(), QueryError> {
    let query = CqlQuery::parse(text)?;
    let info = classify(&query)?;
    match output {
        OutputFormat::Human => {
            println!("clauses: {} should, {} must, {} must_not", info.should_clauses, info.must_clauses, info.must_not_clauses);
            println!("boolean nodes: {}", info.boolean_nodes);
            println!(
                "leaves: {} term, {} prefix, {} wildcard, {} fuzzy",
                info.term_queries, info.prefix_queries, info.wildcard_queries, info.fuzzy_queries
            );
            println!(
                "ranges: {} total ({} closed, {} open)",
                info.range_queries, info.closed_ranges, info.open_ranges
            );
            if info.top != 0 || info.skip != 0 {
                println!("paging: top {} skip {}", info.top, info.skip);
            }
            if !info.sort_fields.is_empty() {
                println!("sort: {}", info.sort_fields.join(", "));
            }
        }
        _ => {
            let response = json_response(AnalyzeResponse {
                query: text.to_string(),
                fingerprint: query.fingerprint(),
                info,
            });
            print_json(&response, output);
        }
    }
    Ok(())
}

fn run_rewrite(text: &str, output: OutputFormat) -> Result<(), QueryError> {
    let mut query = CqlQuery::parse(text)?;
    let rewritten_tree = SharingRewriter.visit(&query.tree)?;
    let changed = !Arc::ptr_eq(&query.tree, &rewritten_tree);
    query.tree = rewritten_tree;
    let rewritten = query.to_text();
    match output {
        OutputFormat::Human => {
            if changed {
                println!("{}", rewritten);
            } else {
                println!("{} (unchanged)", rewritten);
            }
        }
        _ => {
            let response = json_response(RewriteResponse {
                query: text.to_string(),
                rewritten,
                changed,
            });
            print_json(&response, output);
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(response: &T, output: OutputFormat) {
    let rendered = match output {
        OutputFormat::Pretty => serde_json::to_string_pretty(response),
        _ => serde_json::to_string(response),
    };
    match rendered {
        Ok(json) => println!("{}", json),
        Err(error) => eprintln!("Error: failed to serialize response: {}", error),
    }
}

fn print_error(error: &QueryError, output: OutputFormat) {
    match output {
        OutputFormat::Human => {
            eprintln!("Error [{}]: {}", error.error_code(), error);
            if let Some(hint) = error.remediation() {
                eprintln!("Hint: {}", hint);
            }
        }
        _ => {
            let response = ErrorResponse {
                code: error.error_code().to_string(),
                error: error.severity().to_string(),
                message: error.to_string(),
                remediation: error.remediation().map(str::to_string),
            };
            print_json(&json_response(response), output);
        }
    }
}
