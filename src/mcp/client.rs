//! Typed MCP client facade
//!
//! [`McpClient`] wraps any [`Transport`] and exposes the handful of MCP
//! operations mcpilot needs: the lifecycle handshake, tool/resource/prompt
//! discovery, tool invocation, resource reads, and the database convenience
//! wrappers built on reserved tool names.
//!
//! Results are decoded generically from the raw `result` value into the
//! typed response structs in [`crate::mcp::types`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{McpilotError, Result};
use crate::mcp::transport::{Transport, TransportKind};
use crate::mcp::types::{
    CallToolParams, CallToolResult, GetPromptParams, GetPromptResult, InitializeParams,
    InitializeResult, ListDatabasesResult, ListPromptsResult, ListResourcesResult,
    ListToolsResult, McpTool, Prompt, ReadResourceParams, ReadResourceResult, Resource,
    SelectDatabaseResult, METHOD_INITIALIZE, METHOD_INITIALIZED, METHOD_PROMPTS_GET,
    METHOD_PROMPTS_LIST, METHOD_RESOURCES_LIST, METHOD_RESOURCES_READ, METHOD_TOOLS_CALL,
    METHOD_TOOLS_LIST, TOOL_LIST_DATABASES, TOOL_SELECT_DATABASE,
};

/// MCP client over a stdio or HTTP transport.
///
/// Cloning is cheap; clones share the underlying transport.
///
/// # Examples
///
/// ```no_run
/// use std::collections::HashMap;
/// use std::sync::Arc;
/// use mcpilot::mcp::client::McpClient;
/// use mcpilot::mcp::transport::stdio::StdioTransport;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let transport = StdioTransport::spawn("./pgedge-mcp-server".into(), vec![], HashMap::new(), None)?;
/// let client = McpClient::new(Arc::new(transport));
/// client.initialize().await?;
/// for tool in client.list_tools().await? {
///     println!("{}: {}", tool.name, tool.description);
/// }
/// client.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct McpClient {
    transport: Arc<dyn Transport>,
}

impl McpClient {
    /// Wraps `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// The transport this client talks through.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Which wire the client uses.
    pub fn kind(&self) -> TransportKind {
        self.transport.kind()
    }

    async fn call<P, R>(&self, method: &str, params: Option<P>) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let params = params.map(serde_json::to_value).transpose()?;
        let value = self.transport.request(method, params).await?;
        serde_json::from_value(value).map_err(|e| {
            McpilotError::McpTransport(format!("failed to decode {} result: {}", method, e)).into()
        })
    }

    /// Performs the `initialize` handshake.
    ///
    /// Announces protocol `2024-11-05`, empty capabilities and this client's
    /// name and version. Over stdio a `notifications/initialized`
    /// notification follows the result.
    ///
    /// # Errors
    ///
    /// Returns a transport or protocol error if the handshake fails.
    pub async fn initialize(&self) -> Result<InitializeResult> {
        let result: InitializeResult = self
            .call(METHOD_INITIALIZE, Some(InitializeParams::default()))
            .await?;

        if self.transport.kind() == TransportKind::Stdio {
            self.transport.notify(METHOD_INITIALIZED, None).await?;
        }

        info!(
            "connected to {} {} (protocol {})",
            result.server_info.name, result.server_info.version, result.protocol_version
        );
        Ok(result)
    }

    /// Lists the tools the server exposes.
    pub async fn list_tools(&self) -> Result<Vec<McpTool>> {
        let result: ListToolsResult = self.call::<(), _>(METHOD_TOOLS_LIST, None).await?;
        Ok(result.tools)
    }

    /// Lists the resources the server exposes.
    pub async fn list_resources(&self) -> Result<Vec<Resource>> {
        let result: ListResourcesResult = self.call::<(), _>(METHOD_RESOURCES_LIST, None).await?;
        Ok(result.resources)
    }

    /// Lists the prompts the server exposes.
    pub async fn list_prompts(&self) -> Result<Vec<Prompt>> {
        let result: ListPromptsResult = self.call::<(), _>(METHOD_PROMPTS_LIST, None).await?;
        Ok(result.prompts)
    }

    /// Renders a prompt with the given arguments.
    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: HashMap<String, String>,
    ) -> Result<GetPromptResult> {
        let params = GetPromptParams {
            name: name.to_string(),
            arguments,
        };
        self.call(METHOD_PROMPTS_GET, Some(params)).await
    }

    /// Invokes a tool.
    ///
    /// A `Null` argument is sent as an empty object. The returned result may
    /// carry `is_error = true`: the RPC succeeded but the tool failed. That
    /// is not an `Err`.
    ///
    /// # Errors
    ///
    /// Returns a transport or protocol error if the call itself fails.
    pub async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<CallToolResult> {
        let arguments = if arguments.is_null() {
            serde_json::json!({})
        } else {
            arguments
        };
        debug!("calling tool {} with {}", name, arguments);
        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        self.call(METHOD_TOOLS_CALL, Some(params)).await
    }

    /// Reads a resource by URI.
    pub async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult> {
        let params = ReadResourceParams {
            uri: uri.to_string(),
        };
        self.call(METHOD_RESOURCES_READ, Some(params)).await
    }

    /// Lists the database connections available to this session.
    ///
    /// # Errors
    ///
    /// Returns [`McpilotError::Tool`] when the tool reports a failure or its
    /// output is not the expected JSON.
    pub async fn list_databases(&self) -> Result<ListDatabasesResult> {
        let result = self
            .call_tool(TOOL_LIST_DATABASES, serde_json::json!({}))
            .await?;
        decode_tool_payload(TOOL_LIST_DATABASES, &result)
    }

    /// Switches the session's active database without reconnecting.
    ///
    /// # Errors
    ///
    /// Returns [`McpilotError::Tool`] when the tool fails, its output is not
    /// the expected JSON, or the server reports `success: false`.
    pub async fn select_database(&self, name: &str) -> Result<SelectDatabaseResult> {
        let result = self
            .call_tool(TOOL_SELECT_DATABASE, serde_json::json!({ "name": name }))
            .await?;
        let selected: SelectDatabaseResult = decode_tool_payload(TOOL_SELECT_DATABASE, &result)?;
        if !selected.success {
            let reason = selected
                .error
                .clone()
                .or_else(|| selected.message.clone())
                .unwrap_or_else(|| format!("could not select database `{}`", name));
            return Err(McpilotError::Tool(reason).into());
        }
        Ok(selected)
    }

    /// Releases the transport.
    pub async fn close(&self) -> Result<()> {
        self.transport.close().await
    }
}

fn decode_tool_payload<T: DeserializeOwned>(tool: &str, result: &CallToolResult) -> Result<T> {
    let text = result.text();
    if result.is_error {
        return Err(McpilotError::Tool(format!("{} failed: {}", tool, text)).into());
    }
    serde_json::from_str(&text).map_err(|e| {
        McpilotError::Tool(format!("unexpected {} output: {}", tool, e)).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::transport::fake::FakeTransport;
    use serde_json::json;

    fn text_result(text: &str, is_error: bool) -> serde_json::Value {
        json!({"content": [{"type": "text", "text": text}], "isError": is_error})
    }

    #[tokio::test]
    async fn test_initialize_sends_notification_over_stdio() {
        let fake = Arc::new(FakeTransport::new(TransportKind::Stdio));
        let client = McpClient::new(fake.clone());

        let result = client.initialize().await.unwrap();
        assert_eq!(result.server_info.name, "fake-server");

        let calls = fake.calls();
        assert_eq!(calls[0].method, "initialize");
        let params = calls[0].params.clone().unwrap();
        assert_eq!(params["protocolVersion"], "2024-11-05");
        assert_eq!(calls[1].method, "notifications/initialized");
        assert!(calls[1].notification);
    }

    #[tokio::test]
    async fn test_initialize_skips_notification_over_http() {
        let fake = Arc::new(FakeTransport::new(TransportKind::Http));
        let client = McpClient::new(fake.clone());

        client.initialize().await.unwrap();
        assert_eq!(fake.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_call_tool_passes_through_tool_error() {
        let fake = Arc::new(
            FakeTransport::new(TransportKind::Stdio)
                .respond(METHOD_TOOLS_CALL, Ok(text_result("bad sql", true))),
        );
        let client = McpClient::new(fake.clone());

        let result = client.call_tool("query_database", json!(null)).await.unwrap();
        assert!(result.is_error);
        assert_eq!(result.text(), "bad sql");
        let params = fake.calls()[0].params.clone().unwrap();
        assert_eq!(params["arguments"], json!({}));
    }

    #[tokio::test]
    async fn test_protocol_error_surfaces_with_code() {
        let fake = Arc::new(FakeTransport::new(TransportKind::Stdio).respond(
            METHOD_RESOURCES_READ,
            Err(McpilotError::McpProtocol {
                code: -32602,
                message: "unknown resource".into(),
            }),
        ));
        let client = McpClient::new(fake);

        let err = client.read_resource("pg://nowhere").await.unwrap_err();
        let typed = err.downcast_ref::<McpilotError>().unwrap();
        assert_eq!(typed.protocol_code(), Some(-32602));
    }

    #[tokio::test]
    async fn test_undecodable_result_is_transport_error() {
        let fake = Arc::new(
            FakeTransport::new(TransportKind::Stdio)
                .respond(METHOD_TOOLS_LIST, Ok(json!({"tools": "nope"}))),
        );
        let client = McpClient::new(fake);

        let err = client.list_tools().await.unwrap_err();
        assert!(err.downcast_ref::<McpilotError>().unwrap().is_transport());
    }

    #[tokio::test]
    async fn test_list_databases_decodes_text_payload() {
        let payload = json!({
            "databases": [{"name": "prod", "host": "db", "port": 5432,
                "database": "app", "user": "ro", "sslmode": "require"}],
            "current": "prod"
        })
        .to_string();
        let fake = Arc::new(
            FakeTransport::new(TransportKind::Http)
                .respond(METHOD_TOOLS_CALL, Ok(text_result(&payload, false))),
        );
        let client = McpClient::new(fake.clone());

        let dbs = client.list_databases().await.unwrap();
        assert_eq!(dbs.current, "prod");
        assert_eq!(dbs.databases[0].name, "prod");
        let params = fake.calls()[0].params.clone().unwrap();
        assert_eq!(params["name"], "list_database_connections");
    }

    #[tokio::test]
    async fn test_select_database_failure_is_tool_error() {
        let payload = json!({"success": false, "error": "no such database"}).to_string();
        let fake = Arc::new(
            FakeTransport::new(TransportKind::Http)
                .respond(METHOD_TOOLS_CALL, Ok(text_result(&payload, false))),
        );
        let client = McpClient::new(fake.clone());

        let err = client.select_database("staging").await.unwrap_err();
        assert_eq!(err.to_string(), "Tool execution error: no such database");
        let params = fake.calls()[0].params.clone().unwrap();
        assert_eq!(params["arguments"]["name"], "staging");
    }

    #[tokio::test]
    async fn test_select_database_tool_error_is_tool_error() {
        let fake = Arc::new(
            FakeTransport::new(TransportKind::Http)
                .respond(METHOD_TOOLS_CALL, Ok(text_result("not allowed", true))),
        );
        let client = McpClient::new(fake);

        let err = client.select_database("staging").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<McpilotError>(),
            Some(McpilotError::Tool(_))
        ));
    }

    #[tokio::test]
    async fn test_get_prompt_sends_arguments() {
        let fake = Arc::new(FakeTransport::new(TransportKind::Stdio).respond(
            METHOD_PROMPTS_GET,
            Ok(json!({"messages": [{"role": "user", "content": {"type": "text", "text": "hi"}}]})),
        ));
        let client = McpClient::new(fake.clone());

        let mut args = HashMap::new();
        args.insert("table".to_string(), "orders".to_string());
        let prompt = client.get_prompt("explain", args).await.unwrap();
        assert_eq!(prompt.messages.len(), 1);
        let params = fake.calls()[0].params.clone().unwrap();
        assert_eq!(params["arguments"]["table"], "orders");
    }
}
