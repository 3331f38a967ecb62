//! HTTP client for the dashboard server's REST API.
//!
//! Every call resolves to `Result<T, ApiError>`. Non-2xx replies are turned into
//! [`ApiError::Http`] carrying the server's `error` string when the body has one,
//! and a generic status message otherwise. The UI decides how to surface the
//! error; nothing in here retries.

use crate::types::*;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use urlencoding::encode;

/// Everything that can go wrong between the UI and the server.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// The request never produced an HTTP response
    #[error("network error: {0}")]
    Transport(String),
    /// No response within the configured timeout
    #[error("request timed out")]
    Timeout,
    /// The server answered with a non-2xx status
    #[error("{message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// The server's `error` field, or a generic status message
        message: String,
    },
    /// A 2xx reply whose body did not match the expected schema
    #[error("unexpected response: {0}")]
    Decode(String),
    /// The request was rejected before it was sent
    #[error("invalid request: {0}")]
    Invalid(String),
}

impl ApiError {
    /// Whether the failure means the server could not be reached at all.
    pub fn is_offline(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Timeout)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// Interprets a raw HTTP reply.
///
/// An empty body counts as JSON `null`. On failure the `error` string of the
/// body wins over the generic `HTTP error! status: N` message.
pub fn interpret_response(status: u16, body: &str) -> Result<serde_json::Value, ApiError> {
    let parsed = if body.trim().is_empty() {
        Ok(serde_json::Value::Null)
    } else {
        serde_json::from_str::<serde_json::Value>(body)
    };

    if !(200..300).contains(&status) {
        let message = parsed
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_owned))
            .unwrap_or_else(|| format!("HTTP error! status: {status}"));
        return Err(ApiError::Http { status, message });
    }

    parsed.map_err(|e| ApiError::Decode(e.to_string()))
}

/// Decodes a successful reply into the expected record type.
pub fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Thin typed wrapper around the REST endpoints.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    /// Creates a client for the server at `base_url`.
    ///
    /// An empty base URL means "same origin", which is what the web build uses.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full URL for an API path such as `/api/config`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends one JSON request and returns the decoded JSON reply.
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<serde_json::Value, ApiError> {
        log::debug!("Sending API request: {method} {path}");
        let mut builder = self
            .http
            .request(method.clone(), self.url(path))
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.timeout);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let result = interpret_response(status, &text);
        match &result {
            Ok(_) => log::debug!("API response success for {method} {path}"),
            Err(e) => log::warn!("API {method} request to {path} error: {e}"),
        }
        result
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        decode(self.request::<()>(Method::GET, path, None).await?)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        decode(self.request(Method::POST, path, Some(body)).await?)
    }

    async fn delete(&self, path: &str) -> Result<MessageResponse, ApiError> {
        decode(self.request::<()>(Method::DELETE, path, None).await?)
    }

    /// `GET /api/config`
    pub async fn fetch_config(&self) -> Result<AppConfig, ApiError> {
        self.get("/api/config").await
    }

    /// `GET /api/nodes`
    pub async fn list_nodes(&self) -> Result<Vec<Node>, ApiError> {
        self.get("/api/nodes").await
    }

    /// `GET /api/groups`
    pub async fn list_groups(&self) -> Result<Vec<Group>, ApiError> {
        self.get("/api/groups").await
    }

    /// `POST /api/nodes`, creating or updating a node.
    pub async fn save_node(&self, request: &NodeRequest) -> Result<Node, ApiError> {
        validate_node_request(request)?;
        self.post("/api/nodes", request).await
    }

    /// `DELETE /api/nodes/{id}`
    pub async fn delete_node(&self, id: &str) -> Result<MessageResponse, ApiError> {
        self.delete(&format!("/api/nodes/{}", encode(id))).await
    }

    /// `POST /api/groups`, creating or updating a group.
    pub async fn save_group(&self, request: &GroupRequest) -> Result<Group, ApiError> {
        validate_group_request(request)?;
        self.post("/api/groups", request).await
    }

    /// `DELETE /api/groups/{id}`
    pub async fn delete_group(&self, id: &str) -> Result<MessageResponse, ApiError> {
        self.delete(&format!("/api/groups/{}", encode(id))).await
    }

    /// `POST /api/layout`, replacing the stored dashboard layout.
    pub async fn save_layout(&self, layout: &Layout) -> Result<MessageResponse, ApiError> {
        self.post("/api/layout", layout).await
    }

    /// `POST /api/scada_layout`, replacing the stored SCADA elements.
    pub async fn save_scada_layout(
        &self,
        elements: &[ScadaElement],
    ) -> Result<MessageResponse, ApiError> {
        self.post("/api/scada_layout", elements).await
    }

    /// `GET /api/node_value/{ua_id}`
    pub async fn read_value(&self, ua_id: &str) -> Result<Option<NodeValue>, ApiError> {
        let reply: ValueReadResponse = self.get(&value_path(ua_id)).await?;
        Ok(reply.value)
    }

    /// `POST /api/node_value/{ua_id}`
    pub async fn write_value(
        &self,
        ua_id: &str,
        write: &ValueWrite,
    ) -> Result<MessageResponse, ApiError> {
        if ua_id.trim().is_empty() {
            return Err(ApiError::Invalid("node has no OPC UA id".into()));
        }
        self.post(&value_path(ua_id), write).await
    }

    /// `GET /api/historical_data`
    pub async fn historical_data(
        &self,
        query: &HistoricalQuery,
    ) -> Result<Vec<HistoricalSample>, ApiError> {
        let reply: Option<Vec<HistoricalSample>> = self.get(&query.path()).await?;
        Ok(reply.unwrap_or_default())
    }

    /// `POST /api/opcua_endpoint`
    pub async fn set_endpoint(&self, url: &str) -> Result<MessageResponse, ApiError> {
        self.post("/api/opcua_endpoint", &endpoint_body(url)?).await
    }

    /// `POST /api/opcua_connect`
    pub async fn connect(&self, url: &str) -> Result<MessageResponse, ApiError> {
        self.post("/api/opcua_connect", &endpoint_body(url)?).await
    }

    /// `POST /api/opcua_disconnect`
    pub async fn disconnect(&self, url: &str) -> Result<MessageResponse, ApiError> {
        self.post("/api/opcua_disconnect", &endpoint_body(url)?).await
    }
}

/// Parameters of a historical data query.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalQuery {
    /// Node to query
    pub node_id: NodeId,
    /// Inclusive start, `YYYY-MM-DDTHH:MM:SS`
    pub start_time: Option<String>,
    /// Inclusive end, `YYYY-MM-DDTHH:MM:SS`
    pub end_time: Option<String>,
}

impl HistoricalQuery {
    /// Request path including the query string.
    pub fn path(&self) -> String {
        let mut path = format!("/api/historical_data?node_id={}", encode(&self.node_id));
        if let Some(start) = &self.start_time {
            path.push_str(&format!("&start_time={}", encode(start)));
        }
        if let Some(end) = &self.end_time {
            path.push_str(&format!("&end_time={}", encode(end)));
        }
        path
    }
}

/// Checks the fields the server requires of a node.
pub fn validate_node_request(request: &NodeRequest) -> Result<(), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::Invalid("node name is required".into()));
    }
    if request.node_ua_id.trim().is_empty() {
        return Err(ApiError::Invalid("OPC UA node id is required".into()));
    }
    Ok(())
}

/// Checks the fields the server requires of a group.
pub fn validate_group_request(request: &GroupRequest) -> Result<(), ApiError> {
    if request.title.trim().is_empty() {
        return Err(ApiError::Invalid("group title is required".into()));
    }
    Ok(())
}

fn endpoint_body(url: &str) -> Result<EndpointRequest, ApiError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ApiError::Invalid("OPC UA endpoint URL is required".into()));
    }
    Ok(EndpointRequest { url: url.to_string() })
}

/// The value route matches the rest of the path, so a tag keeps its `/`
/// separators (`ns=2;s=Tank/Level`) and each part between them is escaped.
fn value_path(ua_id: &str) -> String {
    let parts: Vec<String> = ua_id.split('/').map(|part| encode(part).into_owned()).collect();
    format!("/api/node_value/{}", parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_field_wins_over_generic_message() {
        let err = interpret_response(500, r#"{"error":"db locked"}"#).unwrap_err();
        assert_eq!(
            err,
            ApiError::Http {
                status: 500,
                message: "db locked".into()
            }
        );
        assert_eq!(err.to_string(), "db locked");
    }

    #[test]
    fn unstructured_failure_falls_back_to_status_message() {
        let err = interpret_response(502, "<html>Bad Gateway</html>").unwrap_err();
        assert_eq!(err.to_string(), "HTTP error! status: 502");

        let err = interpret_response(404, "").unwrap_err();
        assert_eq!(err.to_string(), "HTTP error! status: 404");
    }

    #[test]
    fn success_bodies_are_parsed_and_empty_is_null() {
        let value = interpret_response(201, r#"{"id":"n1"}"#).unwrap();
        assert_eq!(value["id"], "n1");
        assert_eq!(interpret_response(200, "  ").unwrap(), serde_json::Value::Null);
        assert!(matches!(
            interpret_response(200, "not json"),
            Err(ApiError::Decode(_))
        ));
    }

    #[test]
    fn transport_errors_count_as_offline() {
        assert!(ApiError::Timeout.is_offline());
        assert!(ApiError::Transport("refused".into()).is_offline());
        assert!(!ApiError::Http {
            status: 500,
            message: "x".into()
        }
        .is_offline());
    }

    #[test]
    fn validation_rejects_blank_required_fields() {
        let mut request = NodeRequest {
            id: None,
            name: "  ".into(),
            node_type: NodeType::Text,
            node_ua_id: "ns=2;i=1".into(),
            size: ElementSize::Medium,
            group_id: None,
            unit: None,
        };
        assert!(matches!(validate_node_request(&request), Err(ApiError::Invalid(_))));
        request.name = "Level".into();
        assert!(validate_node_request(&request).is_ok());

        let group = GroupRequest {
            id: None,
            title: String::new(),
            size: ElementSize::Small,
        };
        assert!(validate_group_request(&group).is_err());
        assert!(endpoint_body("   ").is_err());
    }

    #[test]
    fn historical_query_encodes_parameters() {
        let query = HistoricalQuery {
            node_id: "n 1".into(),
            start_time: Some("2026-10-15T00:00:00".into()),
            end_time: None,
        };
        assert_eq!(
            query.path(),
            "/api/historical_data?node_id=n%201&start_time=2026-10-15T00%3A00%3A00"
        );
    }

    #[test]
    fn value_path_keeps_tag_syntax() {
        assert_eq!(value_path("ns=2;s=Tank/Level"), "/api/node_value/ns%3D2%3Bs%3DTank/Level");
        assert_eq!(value_path("ns=2;s=A B#1"), "/api/node_value/ns%3D2%3Bs%3DA%20B%231");
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = ApiClient::new("http://localhost:5000/", Duration::from_secs(1));
        assert_eq!(client.url("/api/config"), "http://localhost:5000/api/config");
    }
}
