// File: src/client.rs
use crate::error::ApiError;
use crate::model::{Settings, Task, TaskFields, TaskStatus};

use http::{Method, Request, StatusCode, Uri, header};
use http_body_util::BodyExt;
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

type HttpsClient =
    Client<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>, String>;

#[derive(Deserialize)]
struct MessageBody {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct AskAiBody {
    response: Option<String>,
    error: Option<String>,
}

/// Gateway to the notes backend. Every call is one request/response; nothing
/// here retries or keeps state beyond the connection pool.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: HttpsClient,
    base: String,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base = base_url.trim().trim_end_matches('/').to_string();
        let uri: Uri = base
            .parse()
            .map_err(|e: http::uri::InvalidUri| ApiError::InvalidUrl(e.to_string()))?;
        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(ApiError::InvalidUrl(format!(
                "'{}' needs a scheme and host",
                base
            )));
        }

        let mut root_store = rustls::RootCertStore::empty();
        let result = rustls_native_certs::load_native_certs();
        root_store.add_parsable_certificates(result.certs);

        // Plain http backends (the usual local setup) don't need any roots.
        if root_store.is_empty() && uri.scheme_str() == Some("https") {
            return Err(ApiError::Transport(
                "No valid system certificates found.".to_string(),
            ));
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let https_connector = HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .build();

        let http = Client::builder(TokioExecutor::new()).build(https_connector);
        Ok(Self {
            http,
            base,
            timeout: REQUEST_TIMEOUT,
        })
    }

    /// Limit for one whole exchange, response body included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Uri, ApiError> {
        format!("{}{}", self.base, path)
            .parse()
            .map_err(|e: http::uri::InvalidUri| ApiError::InvalidUrl(e.to_string()))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<(StatusCode, Vec<u8>), ApiError> {
        let uri = self.endpoint(path)?;
        tracing::debug!(%method, %uri, "api request");

        let mut builder = Request::builder()
            .method(method.clone())
            .uri(uri)
            .header(header::ACCEPT, "application/json");
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        let request = builder.body(body.unwrap_or_default())?;

        let exchange = async {
            let response = self.http.request(request).await?;
            let status = response.status();
            let bytes = response
                .into_body()
                .collect()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?
                .to_bytes()
                .to_vec();
            Ok::<_, ApiError>((status, bytes))
        };
        let (status, bytes) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ApiError::Transport(format!("{} {} timed out", method, path)))??;

        tracing::debug!(%method, path, status = status.as_u16(), len = bytes.len(), "api response");
        Ok((status, bytes))
    }

    /// Splits success from application failure. The backend puts its reason
    /// in an `error` field; fall back to the status line.
    fn check(status: StatusCode, bytes: Vec<u8>) -> Result<Vec<u8>, ApiError> {
        if status.is_success() {
            return Ok(bytes);
        }
        let message = serde_json::from_slice::<MessageBody>(&bytes)
            .ok()
            .and_then(|b| b.error.or(b.message))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });
        Err(ApiError::Application {
            status: status.as_u16(),
            message,
        })
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<T, ApiError> {
        let (status, bytes) = self.send(method, path, body).await?;
        let bytes = Self::check(status, bytes)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// For endpoints that answer `{"message": "..."}`. An empty or odd body on
    /// success is not an error.
    async fn request_message(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<String, ApiError> {
        let (status, bytes) = self.send(method, path, body).await?;
        let bytes = Self::check(status, bytes)?;
        Ok(serde_json::from_slice::<MessageBody>(&bytes)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_default())
    }

    // --- NOTES ---

    pub async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.request_json(Method::GET, "/api/notes", None).await
    }

    pub async fn create_task(&self, fields: &TaskFields) -> Result<String, ApiError> {
        fields.validate()?;
        let body = serde_json::to_string(&fields.trimmed())?;
        self.request_message(Method::POST, "/api/notes", Some(body))
            .await
    }

    pub async fn update_task(&self, id: &str, fields: &TaskFields) -> Result<String, ApiError> {
        fields.validate()?;
        let body = serde_json::to_string(&fields.trimmed())?;
        let path = format!("/api/notes/{}", encode_segment(id));
        self.request_message(Method::PUT, &path, Some(body)).await
    }

    pub async fn patch_status(&self, id: &str, status: &TaskStatus) -> Result<(), ApiError> {
        let body = serde_json::json!({ "status": status }).to_string();
        let path = format!("/api/notes/{}/status", encode_segment(id));
        self.request_message(Method::PATCH, &path, Some(body))
            .await
            .map(|_| ())
    }

    pub async fn delete_task(&self, id: &str) -> Result<(), ApiError> {
        let path = format!("/api/notes/{}", encode_segment(id));
        self.request_message(Method::DELETE, &path, None)
            .await
            .map(|_| ())
    }

    // --- SETTINGS & SYNC ---

    pub async fn get_settings(&self) -> Result<Settings, ApiError> {
        self.request_json(Method::GET, "/api/settings", None).await
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<String, ApiError> {
        let body = serde_json::to_string(settings)?;
        self.request_message(Method::POST, "/api/settings", Some(body))
            .await
    }

    pub async fn sync(&self) -> Result<String, ApiError> {
        self.request_message(Method::POST, "/api/sync", None).await
    }

    // --- AI ---

    pub async fn ask_ai(&self, prompt: &str, context: &str) -> Result<String, ApiError> {
        let body = serde_json::json!({ "prompt": prompt, "context": context }).to_string();
        let (status, bytes) = self.send(Method::POST, "/api/ask-ai", Some(body)).await?;
        let bytes = Self::check(status, bytes)?;
        let parsed: AskAiBody = serde_json::from_slice(&bytes)?;
        match (parsed.response, parsed.error) {
            (Some(text), _) => Ok(text),
            (None, Some(error)) => Err(ApiError::Application {
                status: status.as_u16(),
                message: error,
            }),
            (None, None) => Err(ApiError::Decode("missing 'response' field".to_string())),
        }
    }
}

/// Percent-encodes an id for use as one path segment.
fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("AbC-12_x.y~"), "AbC-12_x.y~");
        assert_eq!(encode_segment("a/b c"), "a%2Fb%20c");
    }

    #[test]
    fn test_check_extracts_error_field() {
        let body = br#"{"error": "Telegram User ID is not set in Settings."}"#.to_vec();
        let err = ApiClient::check(StatusCode::BAD_REQUEST, body).unwrap_err();
        match err {
            ApiError::Application { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Telegram User ID is not set in Settings.");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_check_falls_back_to_reason() {
        let err = ApiClient::check(StatusCode::INTERNAL_SERVER_ERROR, b"<html>".to_vec())
            .unwrap_err();
        assert_eq!(err.to_string(), "Internal Server Error");
    }

    #[test]
    fn test_rejects_relative_base() {
        assert!(matches!(
            ApiClient::new("/api"),
            Err(ApiError::InvalidUrl(_))
        ));
    }
}
