use chrono::Utc;
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::ast::Predicate;
use crate::classifier::QueryInfo;

const SCHEMA_VERSION: &str = "1.0.0";

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Pretty,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            OutputFormat::Human => "human",
            OutputFormat::Json => "json",
            OutputFormat::Pretty => "pretty",
        };
        write!(f, "{}", value)
    }
}

#[derive(Serialize)]
pub struct JsonResponse<T> {
    pub schema_version: &'static str,
    pub execution_id: String,
    pub tool: &'static str,
    pub timestamp: String,
    pub data: T,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
    pub message: String,
    pub remediation: Option<String>,
}

/// `parse` subcommand payload: the original text, its fingerprint, and the
/// parsed tree.
#[derive(Serialize)]
pub struct ParseResponse {
    pub query: String,
    pub fingerprint: String,
    pub tree: Arc<Predicate>,
}

/// `format` subcommand payload: canonical text form of the query.
#[derive(Serialize)]
pub struct FormatResponse {
    pub query: String,
    pub formatted: String,
    pub fingerprint: String,
}

/// `analyze` subcommand payload: shape statistics.
#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub query: String,
    pub fingerprint: String,
    pub info: QueryInfo,
}

/// `rewrite` subcommand payload: the query before and after the sharing
/// rewrite pipeline.
#[derive(Serialize)]
pub struct RewriteResponse {
    pub query: String,
    pub rewritten: String,
    pub changed: bool,
}

pub fn json_response<T>(data: T) -> JsonResponse<T> {
    JsonResponse {
        schema_version: SCHEMA_VERSION,
        execution_id: execution_id(),
        tool: "cqlkit",
        timestamp: Utc::now().to_rfc3339(),
        data,
    }
}

pub fn execution_id() -> String {
    let timestamp = Utc::now().timestamp();
    let pid = std::process::id();
    format!("{:x}-{:x}", timestamp, pid)
}
