//! JSON-RPC message model and LSP param/result shapes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{DocumentSymbolNode, Location, Position, Range, SymbolKind};

const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC "method not found".
pub const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, thiserror::Error)]
#[error("cannot convert path to file URI: {}", path.display())]
pub struct PathToUriError {
    path: PathBuf,
}

/// Request id. Client-issued ids are always integers; servers may use strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Int(i64),
    Str(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Str(id) => write!(f, "{id:?}"),
        }
    }
}

/// Error payload of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// One JSON-RPC message in either direction.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request {
        id: RequestId,
        method: String,
        params: Option<Value>,
    },
    Response {
        id: RequestId,
        outcome: Result<Value, ResponseError>,
    },
    Notification {
        method: String,
        params: Option<Value>,
    },
}

impl Message {
    #[must_use]
    pub fn request(id: i64, method: &str, params: Option<Value>) -> Self {
        Self::Request {
            id: RequestId::Int(id),
            method: method.to_string(),
            params,
        }
    }

    #[must_use]
    pub fn notification(method: &str, params: Option<Value>) -> Self {
        Self::Notification {
            method: method.to_string(),
            params,
        }
    }

    /// Serialize to the JSON-RPC object form. `params` is omitted, not null,
    /// when absent.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("jsonrpc".into(), Value::from(JSONRPC_VERSION));
        match self {
            Self::Request { id, method, params } => {
                obj.insert("id".into(), id_value(id));
                obj.insert("method".into(), Value::from(method.as_str()));
                if let Some(params) = params {
                    obj.insert("params".into(), params.clone());
                }
            }
            Self::Response { id, outcome } => {
                obj.insert("id".into(), id_value(id));
                match outcome {
                    Ok(result) => {
                        obj.insert("result".into(), result.clone());
                    }
                    Err(error) => {
                        obj.insert(
                            "error".into(),
                            serde_json::to_value(error).unwrap_or(Value::Null),
                        );
                    }
                }
            }
            Self::Notification { method, params } => {
                obj.insert("method".into(), Value::from(method.as_str()));
                if let Some(params) = params {
                    obj.insert("params".into(), params.clone());
                }
            }
        }
        Value::Object(obj)
    }

    /// Classify a decoded JSON value. Returns `None` for anything that is not
    /// a well-formed request, response or notification.
    #[must_use]
    pub fn from_value(frame: &Value) -> Option<Self> {
        let id = frame
            .get("id")
            .filter(|id| !id.is_null())
            .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());
        let method = frame
            .get("method")
            .and_then(Value::as_str)
            .map(String::from);
        let params = frame.get("params").cloned();

        match (id, method) {
            (Some(id), Some(method)) => Some(Self::Request { id, method, params }),
            (None, Some(method)) => Some(Self::Notification { method, params }),
            (Some(id), None) => {
                if let Some(error) = frame.get("error") {
                    let error = serde_json::from_value::<ResponseError>(error.clone()).ok()?;
                    Some(Self::Response {
                        id,
                        outcome: Err(error),
                    })
                } else {
                    let result = frame.get("result")?.clone();
                    Some(Self::Response {
                        id,
                        outcome: Ok(result),
                    })
                }
            }
            (None, None) => None,
        }
    }
}

fn id_value(id: &RequestId) -> Value {
    match id {
        RequestId::Int(id) => Value::from(*id),
        RequestId::Str(id) => Value::from(id.as_str()),
    }
}

pub(crate) fn initialize_params(root_uri: &str, initialization_options: Option<&Value>) -> Value {
    let mut params = serde_json::json!({
        "processId": std::process::id(),
        "rootUri": root_uri,
        "capabilities": {
            "textDocument": {
                "synchronization": {
                    "dynamicRegistration": false,
                    "willSave": false,
                    "willSaveWaitUntil": false,
                    "didSave": false
                },
                "documentSymbol": {
                    "dynamicRegistration": false,
                    "hierarchicalDocumentSymbolSupport": true
                },
                "references": {
                    "dynamicRegistration": false
                },
                "hover": {
                    "dynamicRegistration": false,
                    "contentFormat": ["markdown", "plaintext"]
                },
                "publishDiagnostics": {
                    "relatedInformation": false
                }
            },
            "workspace": {
                "configuration": true,
                "workspaceFolders": true
            }
        },
        "workspaceFolders": [{
            "uri": root_uri,
            "name": "workspace"
        }]
    });
    if let Some(options) = initialization_options {
        params["initializationOptions"] = options.clone();
    }
    params
}

pub(crate) fn did_open_params(
    uri: &str,
    language_id: &str,
    version: i32,
    text: &str,
) -> Value {
    serde_json::json!({
        "textDocument": {
            "uri": uri,
            "languageId": language_id,
            "version": version,
            "text": text
        }
    })
}

pub(crate) fn did_close_params(uri: &str) -> Value {
    serde_json::json!({
        "textDocument": { "uri": uri }
    })
}

pub(crate) fn document_symbol_params(uri: &str) -> Value {
    serde_json::json!({
        "textDocument": { "uri": uri }
    })
}

pub(crate) fn text_document_position_params(uri: &str, position: Position) -> Value {
    serde_json::json!({
        "textDocument": { "uri": uri },
        "position": position
    })
}

pub(crate) fn reference_params(uri: &str, position: Position, include_declaration: bool) -> Value {
    let mut params = text_document_position_params(uri, position);
    params["context"] = serde_json::json!({ "includeDeclaration": include_declaration });
    params
}

// ── Result parsing ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LspDocumentSymbol {
    name: String,
    #[serde(default)]
    detail: Option<String>,
    kind: u64,
    range: Range,
    selection_range: Range,
    #[serde(default)]
    children: Vec<LspDocumentSymbol>,
}

impl LspDocumentSymbol {
    fn into_node(self) -> DocumentSymbolNode {
        DocumentSymbolNode {
            name: self.name,
            kind: SymbolKind::from_lsp(self.kind),
            detail: self.detail,
            range: self.range,
            selection_range: self.selection_range,
            container: None,
            children: self
                .children
                .into_iter()
                .map(LspDocumentSymbol::into_node)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LspSymbolInformation {
    name: String,
    kind: u64,
    location: Location,
    #[serde(default)]
    container_name: Option<String>,
}

/// Parse a `textDocument/documentSymbol` result.
///
/// Servers answer with either hierarchical `DocumentSymbol[]` or flat
/// `SymbolInformation[]`; flat entries keep their `containerName` so callers
/// can rebuild qualified names.
pub(crate) fn parse_document_symbols(result: Value) -> Vec<DocumentSymbolNode> {
    let Value::Array(items) = result else {
        return Vec::new();
    };
    let hierarchical = items
        .first()
        .is_some_and(|first| first.get("selectionRange").is_some());

    if hierarchical {
        items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<LspDocumentSymbol>(item).ok())
            .map(LspDocumentSymbol::into_node)
            .collect()
    } else {
        items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<LspSymbolInformation>(item).ok())
            .map(|info| {
                let range = info.location.range;
                DocumentSymbolNode {
                    name: info.name,
                    kind: SymbolKind::from_lsp(info.kind),
                    detail: None,
                    range,
                    selection_range: range,
                    container: info.container_name.filter(|c| !c.is_empty()),
                    children: Vec::new(),
                }
            })
            .collect()
    }
}

/// Parse a `textDocument/references` result (`Location[] | null`).
pub(crate) fn parse_locations(result: Value) -> Vec<Location> {
    match result {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<Location>(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// Extract plain text from a `textDocument/hover` result.
///
/// Handles `MarkupContent`, `MarkedString` (string or `{language, value}`)
/// and arrays of either. Markdown code fences are stripped. Array parts are
/// separated by a blank line so the signature stays its own paragraph.
pub(crate) fn parse_hover_text(result: &Value) -> Option<String> {
    let contents = result.get("contents")?;
    let parts: Vec<String> = match contents {
        Value::Array(items) => items.iter().filter_map(marked_string_text).collect(),
        other => marked_string_text(other).into_iter().collect(),
    };
    let text = parts
        .iter()
        .map(|part| strip_code_fences(part))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    if text.is_empty() { None } else { Some(text) }
}

fn marked_string_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("value").and_then(Value::as_str).map(String::from),
        _ => None,
    }
}

/// Keep only the contents of the first fenced code block, if any.
fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.contains("```") {
        return trimmed.to_string();
    }
    let mut inside = false;
    let mut block = Vec::new();
    for line in trimmed.lines() {
        if line.trim_start().starts_with("```") {
            if inside {
                break;
            }
            inside = true;
            continue;
        }
        if inside {
            block.push(line);
        }
    }
    block.join("\n").trim().to_string()
}

pub fn path_to_file_uri(path: &Path) -> Result<url::Url, PathToUriError> {
    url::Url::from_file_path(path).map_err(|()| PathToUriError {
        path: path.to_path_buf(),
    })
}

#[must_use]
pub fn file_uri_to_path(uri: &str) -> Option<PathBuf> {
    url::Url::parse(uri)
        .ok()
        .and_then(|u| u.to_file_path().ok())
}
