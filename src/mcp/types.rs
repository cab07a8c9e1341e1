//! MCP 2024-11-05 protocol types and JSON-RPC 2.0 primitives
//!
//! This module defines the wire types mcpilot exchanges with an MCP server:
//! the JSON-RPC envelope, the lifecycle handshake, and the descriptor and
//! result shapes for tools, resources and prompts. Struct fields are
//! `camelCase` on the wire via `#[serde(rename_all = "camelCase")]`. All
//! `Option<>` fields omit their key from JSON when `None`.
//!
//! It also carries the payloads of the reserved database tools
//! (`list_database_connections` and `select_database_connection`), whose
//! results arrive as JSON encoded inside a text content item.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::McpilotError;

// ---------------------------------------------------------------------------
// Protocol constants
// ---------------------------------------------------------------------------

/// The MCP protocol revision announced during `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC protocol identifier carried by every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// Client name announced in `clientInfo`.
pub const CLIENT_NAME: &str = "mcpilot";

/// Lifecycle: client sends `initialize` to open a session.
pub const METHOD_INITIALIZE: &str = "initialize";
/// Lifecycle: client sends `notifications/initialized` after the server ACKs.
pub const METHOD_INITIALIZED: &str = "notifications/initialized";
/// List the tools the server exposes.
pub const METHOD_TOOLS_LIST: &str = "tools/list";
/// Invoke a named tool.
pub const METHOD_TOOLS_CALL: &str = "tools/call";
/// List the resources the server exposes.
pub const METHOD_RESOURCES_LIST: &str = "resources/list";
/// Read the contents of a resource by URI.
pub const METHOD_RESOURCES_READ: &str = "resources/read";
/// List the prompts the server exposes.
pub const METHOD_PROMPTS_LIST: &str = "prompts/list";
/// Retrieve a rendered prompt by name.
pub const METHOD_PROMPTS_GET: &str = "prompts/get";

/// Reserved tool listing the database connections available to the session.
pub const TOOL_LIST_DATABASES: &str = "list_database_connections";
/// Reserved tool switching the session's active database connection.
pub const TOOL_SELECT_DATABASE: &str = "select_database_connection";

// ---------------------------------------------------------------------------
// JSON-RPC 2.0 wire types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request object.
///
/// Request ids are per-connection integers starting at 1.
///
/// # Examples
///
/// ```
/// use mcpilot::mcp::types::JsonRpcRequest;
///
/// let req = JsonRpcRequest::new(1, "tools/list", None);
/// let json = serde_json::to_value(&req).unwrap();
/// assert_eq!(json["jsonrpc"], "2.0");
/// assert_eq!(json["id"], 1);
/// assert!(json.get("params").is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version identifier; always `"2.0"`.
    pub jsonrpc: String,
    /// Request correlation identifier.
    pub id: u64,
    /// The method name to invoke.
    pub method: String,
    /// Optional method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Builds a request envelope for `method` with the given id.
    pub fn new(id: u64, method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 response object.
///
/// Exactly one of `result` or `error` is present in a valid response. The
/// `id` is kept as a raw value because peers may answer parse failures with
/// `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version identifier; always `"2.0"`.
    pub jsonrpc: String,
    /// Mirrors the `id` from the corresponding request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    /// Successful result value; mutually exclusive with `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error object; mutually exclusive with `result`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Returns true when the echoed id equals `expected`.
    pub fn answers(&self, expected: u64) -> bool {
        self.id.as_ref().and_then(serde_json::Value::as_u64) == Some(expected)
    }

    /// Converts the response into its result value.
    ///
    /// A present `error` becomes [`McpilotError::McpProtocol`]. A response
    /// carrying neither field yields `Value::Null`.
    ///
    /// # Errors
    ///
    /// Returns the peer's error mapped to [`McpilotError::McpProtocol`].
    pub fn into_result(self) -> Result<serde_json::Value, McpilotError> {
        if let Some(err) = self.error {
            return Err(err.into());
        }
        Ok(self.result.unwrap_or(serde_json::Value::Null))
    }
}

/// A JSON-RPC 2.0 error object.
///
/// Implements `Display` as `"RPC error {code}: {message}"`.
///
/// # Examples
///
/// ```
/// use mcpilot::mcp::types::JsonRpcError;
///
/// let e = JsonRpcError { code: -32600, message: "Invalid Request".to_string(), data: None };
/// assert_eq!(e.to_string(), "RPC error -32600: Invalid Request");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code as defined by JSON-RPC 2.0 or the server.
    pub code: i64,
    /// Human-readable error description.
    pub message: String,
    /// Optional additional error context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RPC error {}: {}", self.code, self.message)
    }
}

impl From<JsonRpcError> for McpilotError {
    fn from(err: JsonRpcError) -> Self {
        McpilotError::McpProtocol {
            code: err.code,
            message: err.message,
        }
    }
}

/// A JSON-RPC 2.0 notification (a request with no `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// Protocol version identifier; always `"2.0"`.
    pub jsonrpc: String,
    /// The notification method name.
    pub method: String,
    /// Optional notification parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcNotification {
    /// Builds a notification envelope for `method`.
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Identifies a client or server implementation by name and version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Implementation {
    /// Short name of the implementation (e.g. `"mcpilot"`).
    pub name: String,
    /// Version string.
    pub version: String,
}

impl Implementation {
    /// The implementation record this crate announces.
    pub fn this_client() -> Self {
        Self {
            name: CLIENT_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Parameters for the `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol revision requested by the client.
    pub protocol_version: String,
    /// Client capabilities; mcpilot announces none.
    pub capabilities: serde_json::Value,
    /// Client identity.
    pub client_info: Implementation,
}

impl Default for InitializeParams {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: serde_json::json!({}),
            client_info: Implementation::this_client(),
        }
    }
}

/// Result of the `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Protocol revision selected by the server.
    pub protocol_version: String,
    /// Server capabilities, kept opaque.
    #[serde(default)]
    pub capabilities: serde_json::Value,
    /// Server identity.
    pub server_info: Implementation,
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// A tool exposed by an MCP server.
///
/// # Examples
///
/// ```
/// use mcpilot::mcp::types::McpTool;
///
/// let tool: McpTool = serde_json::from_value(serde_json::json!({
///     "name": "query_database",
///     "inputSchema": { "type": "object" }
/// })).unwrap();
/// assert_eq!(tool.name, "query_database");
/// assert!(tool.description.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    /// Unique name of the tool within the server.
    pub name: String,
    /// Human-readable description of the tool's purpose.
    #[serde(default)]
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    #[serde(default = "empty_object_schema")]
    pub input_schema: serde_json::Value,
}

fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({ "type": "object" })
}

/// Result of a `tools/list` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// Tools exposed by the server.
    #[serde(default)]
    pub tools: Vec<McpTool>,
}

/// Parameters for a `tools/call` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    /// Name of the tool to invoke.
    pub name: String,
    /// Arguments object passed to the tool.
    pub arguments: serde_json::Value,
}

/// A single content item in a tool result or prompt message.
///
/// Discriminated by the `"type"` field on the wire. Content kinds this
/// client does not interpret decode as [`ContentItem::Other`], which keeps
/// the raw object so it serializes back unchanged.
///
/// # Examples
///
/// ```
/// use mcpilot::mcp::types::ContentItem;
///
/// let c = ContentItem::text("hello");
/// let json = serde_json::to_value(&c).unwrap();
/// assert_eq!(json["type"], "text");
/// assert_eq!(json["text"], "hello");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    /// Plain text output.
    Text {
        /// The text content.
        text: String,
    },
    /// A base64-encoded image.
    Image {
        /// Base64-encoded image bytes.
        data: String,
        /// MIME type of the image (e.g. `"image/png"`).
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// An embedded resource, kept opaque.
    Resource {
        /// The resource contents.
        resource: serde_json::Value,
    },
    /// Any content kind this client does not interpret, verbatim.
    #[serde(untagged)]
    Other(serde_json::Value),
}

impl ContentItem {
    /// Creates a text content item.
    pub fn text(text: impl Into<String>) -> Self {
        ContentItem::Text { text: text.into() }
    }

    /// Returns the text of a text item.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentItem::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Returns the text a reader would see: a text item's text, or the
    /// `text` field of an embedded resource.
    pub fn readable_text(&self) -> Option<&str> {
        match self {
            ContentItem::Text { text } => Some(text),
            ContentItem::Resource { resource } => resource.get("text")?.as_str(),
            _ => None,
        }
    }
}

/// Joins the text items of `items` with newlines, skipping other kinds.
pub fn join_text(items: &[ContentItem]) -> String {
    items
        .iter()
        .filter_map(ContentItem::as_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result of a `tools/call` request.
///
/// `is_error = true` means the RPC succeeded but the tool itself failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// The content items produced by the tool.
    #[serde(default)]
    pub content: Vec<ContentItem>,
    /// Whether the tool reported a failure.
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Newline-joined text of all text content items.
    pub fn text(&self) -> String {
        join_text(&self.content)
    }
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Metadata describing a resource exposed by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Canonical URI for this resource.
    pub uri: String,
    /// Human-readable resource name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Result of a `resources/list` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResourcesResult {
    /// Resources exposed by the server.
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// Parameters for `resources/read`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceParams {
    /// URI of the resource to read.
    pub uri: String,
}

/// Contents of a resource, either text or base64 blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    /// Canonical URI that identifies this resource.
    pub uri: String,
    /// MIME type of the contents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Text body for text resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64 body for binary resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

/// Result of a `resources/read` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadResourceResult {
    /// One or more content objects representing the resource.
    #[serde(default)]
    pub contents: Vec<ResourceContents>,
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// Conversation participant role.
///
/// # Examples
///
/// ```
/// use mcpilot::mcp::types::Role;
///
/// let r: Role = serde_json::from_str("\"user\"").unwrap();
/// assert_eq!(r, Role::User);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A message from the human user (or carrying tool results).
    User,
    /// A message from the model.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Describes a single argument accepted by a prompt template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptArgument {
    /// Argument name.
    pub name: String,
    /// What this argument controls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the caller must supply it.
    #[serde(default)]
    pub required: bool,
}

/// Metadata describing a prompt template exposed by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prompt {
    /// Unique name of this prompt.
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Argument descriptors for this template.
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// Result of a `prompts/list` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPromptsResult {
    /// Prompts exposed by the server.
    #[serde(default)]
    pub prompts: Vec<Prompt>,
}

/// Parameters for `prompts/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPromptParams {
    /// Name of the prompt to retrieve.
    pub name: String,
    /// Template argument substitutions.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub arguments: HashMap<String, String>,
}

/// A single message in a rendered prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptMessage {
    /// Who authored this message.
    pub role: Role,
    /// The message body.
    pub content: ContentItem,
}

/// Result of a `prompts/get` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetPromptResult {
    /// What this prompt does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The rendered prompt messages.
    #[serde(default)]
    pub messages: Vec<PromptMessage>,
}

// ---------------------------------------------------------------------------
// Reserved database tools
// ---------------------------------------------------------------------------

/// A database connection the server can route the session to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseInfo {
    /// Connection name used with `select_database_connection`.
    pub name: String,
    /// Database host.
    #[serde(default)]
    pub host: String,
    /// Database port.
    #[serde(default)]
    pub port: u16,
    /// Database name on the host.
    #[serde(default)]
    pub database: String,
    /// Login role.
    #[serde(default)]
    pub user: String,
    /// libpq `sslmode` setting.
    #[serde(default)]
    pub sslmode: String,
}

/// Payload of `list_database_connections`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListDatabasesResult {
    /// Connections visible to this session.
    #[serde(default)]
    pub databases: Vec<DatabaseInfo>,
    /// Name of the currently selected connection, empty when none.
    #[serde(default)]
    pub current: String,
}

/// Payload of `select_database_connection`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SelectDatabaseResult {
    /// Whether the switch happened.
    pub success: bool,
    /// Connection active after the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    /// Informational message from the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failure reason when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
