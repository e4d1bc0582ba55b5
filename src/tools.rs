//! Tool surface: named operations with JSON input schemas, plus a
//! JSON-lines stdio transport.
//!
//! Each request line is `{"id", "tool", "arguments"}` and is answered with
//! `{"id", "result"}` or `{"id", "error": {"kind", "message"}}`. The pseudo
//! tool `listTools` returns the tool definitions.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::search::SearchOrchestrator;
use crate::{Result, SearchError, SearchQuery};

pub const SEARCH: &str = "search";
pub const INTEGRATED_SEARCH: &str = "integratedSearch";
pub const GOOGLE_SEARCH: &str = "googleSearch";
pub const FETCH_URL: &str = "fetchUrl";
const LIST_TOOLS: &str = "listTools";

/// Name, description and JSON input schema of one tool.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntegratedArgs {
    query: String,
    #[serde(default)]
    language_code: Option<String>,
    #[serde(default, alias = "includeHtml")]
    keep_markup: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProtectedArgs {
    query: String,
    #[serde(default, alias = "includeHtml")]
    keep_markup: bool,
}

#[derive(Debug, Deserialize)]
struct FetchUrlArgs {
    url: String,
}

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    tool: String,
    #[serde(default)]
    arguments: Value,
}

/// Dispatches tool calls to a [`SearchOrchestrator`].
pub struct ToolRegistry {
    orchestrator: Arc<SearchOrchestrator>,
}

impl ToolRegistry {
    pub fn new(orchestrator: Arc<SearchOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Definitions of every tool, in a stable order.
    pub fn list_tools() -> Vec<ToolDefinition> {
        let query = json!({
            "type": "string",
            "minLength": 1,
            "description": "Search terms"
        });
        let keep_markup = json!({
            "type": "boolean",
            "default": false,
            "description": "Return raw HTML instead of cleaned text (alias: includeHtml)"
        });
        let language_code = json!({
            "type": "string",
            "description": "Language code such as 'ko' or 'en'"
        });

        vec![
            ToolDefinition {
                name: SEARCH,
                description: "Search one engine by name, or every eligible engine when no engine is given.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": query,
                        "engineName": {
                            "type": "string",
                            "description": "Engine name, e.g. 'Bing' or 'Naver' (case-insensitive)"
                        },
                        "languageCode": language_code,
                        "keepMarkup": keep_markup
                    },
                    "required": ["query"]
                }),
            },
            ToolDefinition {
                name: INTEGRATED_SEARCH,
                description: "Search every engine supporting the language concurrently. Engine failures are reported per entry.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": query,
                        "languageCode": language_code,
                        "keepMarkup": keep_markup
                    },
                    "required": ["query"]
                }),
            },
            ToolDefinition {
                name: GOOGLE_SEARCH,
                description: "Search Google through a real browser, typing the query like a person.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": query,
                        "keepMarkup": keep_markup
                    },
                    "required": ["query"]
                }),
            },
            ToolDefinition {
                name: FETCH_URL,
                description: "Fetch an http(s) URL and return its readable text.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "url": {
                            "type": "string",
                            "format": "uri",
                            "description": "Absolute http or https URL"
                        }
                    },
                    "required": ["url"]
                }),
            },
        ]
    }

    /// Runs `tool` with `arguments` and returns its JSON output.
    pub async fn call(&self, tool: &str, arguments: Value) -> Result<Value> {
        debug!(tool, "Tool call");
        match tool {
            SEARCH => {
                let args: SearchQuery = parse_args(tool, arguments)?;
                match &args.engine_name {
                    Some(engine) => {
                        let result = self
                            .orchestrator
                            .run_single_engine_search(
                                &args.query,
                                engine,
                                args.language_code.as_deref(),
                                args.keep_markup,
                            )
                            .await?;
                        Ok(serde_json::to_value(result)?)
                    }
                    None => {
                        let results = self
                            .orchestrator
                            .run_integrated_search(
                                &args.query,
                                args.language_code.as_deref(),
                                args.keep_markup,
                            )
                            .await?;
                        Ok(serde_json::to_value(results)?)
                    }
                }
            }
            INTEGRATED_SEARCH => {
                let args: IntegratedArgs = parse_args(tool, arguments)?;
                let results = self
                    .orchestrator
                    .run_integrated_search(
                        &args.query,
                        args.language_code.as_deref(),
                        args.keep_markup,
                    )
                    .await?;
                Ok(serde_json::to_value(results)?)
            }
            GOOGLE_SEARCH => {
                let args: ProtectedArgs = parse_args(tool, arguments)?;
                let result = self
                    .orchestrator
                    .run_dedicated_protected_engine_search(&args.query, args.keep_markup)
                    .await?;
                Ok(serde_json::to_value(result)?)
            }
            FETCH_URL => {
                let args: FetchUrlArgs = parse_args(tool, arguments)?;
                let content = self.orchestrator.fetch_url(&args.url).await?;
                Ok(serde_json::to_value(content)?)
            }
            LIST_TOOLS => Ok(serde_json::to_value(Self::list_tools())?),
            other => Err(SearchError::UnknownTool(other.to_string())),
        }
    }

    /// Like [`call`](Self::call), but folds errors into an error payload.
    pub async fn call_json(&self, tool: &str, arguments: Value) -> Value {
        match self.call(tool, arguments).await {
            Ok(value) => value,
            Err(e) => error_payload(&e),
        }
    }

    /// Handles one transport line and returns the response object.
    pub async fn handle_line(&self, line: &str) -> Value {
        let request: Request = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!("Malformed request: {}", e);
                let err = SearchError::InvalidArguments(format!("malformed request: {}", e));
                return json!({ "id": Value::Null, "error": error_body(&err) });
            }
        };

        match self.call(&request.tool, request.arguments).await {
            Ok(result) => json!({ "id": request.id, "result": result }),
            Err(e) => {
                warn!(tool = %request.tool, kind = e.kind(), "Tool call failed: {}", e);
                json!({ "id": request.id, "error": error_body(&e) })
            }
        }
    }

    /// Serves JSON-lines requests from `reader` until end of input.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Serving tools over stdio");
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let response = self.handle_line(&line).await;
            let mut out = serde_json::to_string(&response)?;
            out.push('\n');
            writer.write_all(out.as_bytes()).await?;
            writer.flush().await?;
        }
        info!("Input closed, stopping");
        Ok(())
    }
}

/// `{"error": {"kind", "message"}}` for a failed call.
pub fn error_payload(err: &SearchError) -> Value {
    json!({ "error": error_body(err) })
}

fn error_body(err: &SearchError) -> Value {
    json!({ "kind": err.kind(), "message": err.to_string() })
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T> {
    serde_json::from_value(arguments)
        .map_err(|e| SearchError::InvalidArguments(format!("{}: {}", tool, e)))
}
