use crate::request::RequestPayload;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_GENERATE_PATH: &str = "/generate-graph/";

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server error: {status}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl GenerateError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GenerateError::Api { status, .. } => Some(*status),
            GenerateError::Http(e) => e.status().map(|s| s.as_u16()),
            GenerateError::Parse(_) => None,
        }
    }
}

/// Client for the remote graph-extraction service.
#[derive(Debug, Clone)]
pub struct GraphClient {
    client: Client,
    base_url: String,
    generate_path: String,
}

impl GraphClient {
    pub fn new(base_url: &str) -> Result<Self, GenerateError> {
        Self::with_options(base_url, DEFAULT_GENERATE_PATH, None)
    }

    pub fn with_options(
        base_url: &str,
        generate_path: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, GenerateError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            generate_path: generate_path.to_string(),
        })
    }

    pub fn generate_url(&self) -> String {
        if self.generate_path.starts_with('/') {
            format!("{}{}", self.base_url, self.generate_path)
        } else {
            format!("{}/{}", self.base_url, self.generate_path)
        }
    }

    /// POST the payload and return the decoded JSON body.
    pub async fn generate(&self, payload: RequestPayload) -> Result<Value, GenerateError> {
        let form = payload.into_form()?;
        let resp = self
            .client
            .post(self.generate_url())
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(GenerateError::Api { status, message });
        }

        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|e| GenerateError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{build, DraftInput};
    use crate::settings::GenerationSettings;
    use mockito::Matcher;

    fn payload() -> RequestPayload {
        let draft = DraftInput {
            text: "Marie Curie discovered radium".into(),
            ..DraftInput::default()
        };
        build(&draft, &GenerationSettings::default())
    }

    #[test]
    fn test_generate_url_joins_path() {
        let client = GraphClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.generate_url(), "http://localhost:8000/generate-graph/");

        let legacy =
            GraphClient::with_options("http://localhost:8000", "api/generate-graph", None).unwrap();
        assert_eq!(legacy.generate_url(), "http://localhost:8000/api/generate-graph");
    }

    #[tokio::test]
    async fn test_generate_posts_multipart() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/generate-graph/")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=".into()),
            )
            .match_body(Matcher::Regex("Marie Curie discovered radium".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"html":"<div>graph</div>","nodes":3}"#)
            .create_async()
            .await;

        let client = GraphClient::new(&server.url()).unwrap();
        let body = client.generate(payload()).await.unwrap();
        assert_eq!(body["html"], "<div>graph</div>");
        assert_eq!(body["nodes"], 3);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/generate-graph/")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = GraphClient::new(&server.url()).unwrap();
        let err = client.generate(payload()).await.unwrap_err();
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.to_string(), "Server error: 502");
    }

    #[tokio::test]
    async fn test_generate_invalid_json() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/generate-graph/")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let client = GraphClient::new(&server.url()).unwrap();
        let err = client.generate(payload()).await.unwrap_err();
        assert!(matches!(err, GenerateError::Parse(_)));
    }
}
