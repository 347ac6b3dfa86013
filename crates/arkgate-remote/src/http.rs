//! Arkacdn over HTTP.

use reqwest::{Client, RequestBuilder, Url};

use crate::{RemoteError, RemoteResponse, RemoteStore, Upload};

/// [`RemoteStore`] backed by the Arkacdn HTTP API.
///
/// Holds one `reqwest::Client` so connections are pooled across calls. No
/// timeout is set beyond the client's own defaults; pass a configured
/// client with [`with_http_client`](Self::with_http_client) to change that.
#[derive(Debug, Clone)]
pub struct ArkacdnClient {
    base_url: String,
    http: Client,
}

impl ArkacdnClient {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    /// Returns [`RemoteError::InvalidBaseUrl`] unless `base_url` is an
    /// absolute `http`/`https` URL.
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| RemoteError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RemoteError::InvalidBaseUrl(format!(
                "{base_url}: unsupported scheme {}",
                parsed.scheme()
            )));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        })
    }

    /// Use a custom HTTP client (timeouts, proxies, connection pool reuse).
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// API root without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        request: RequestBuilder,
        credential: Option<&str>,
    ) -> Result<RemoteResponse, RemoteError> {
        let request = match credential {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok(RemoteResponse::from_text(status, text))
    }
}

impl RemoteStore for ArkacdnClient {
    async fn upload(
        &self,
        credential: Option<&str>,
        upload: &Upload,
    ) -> Result<RemoteResponse, RemoteError> {
        let request = self.http.post(self.url("/upload/plain")).json(upload);
        let response = Self::send(request, credential).await?;
        tracing::debug!(status = response.status, filename = %upload.filename, "upload answered");
        Ok(response)
    }

    async fn fetch_meta(
        &self,
        credential: Option<&str>,
        file_id: &str,
    ) -> Result<RemoteResponse, RemoteError> {
        let request = self.http.get(self.url(&format!("/upload/{file_id}")));
        Self::send(request, credential).await
    }

    async fn fetch_content(
        &self,
        credential: Option<&str>,
        file_id: &str,
    ) -> Result<RemoteResponse, RemoteError> {
        let request = self.http.get(self.url(&format!("/upload/{file_id}/json")));
        Self::send(request, credential).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RemoteResponse, RemoteError> {
        let request = self
            .http
            .post(self.url("/auth/refresh"))
            .json(&serde_json::json!({ "refreshToken": refresh_token }));
        Self::send(request, None).await
    }
}
