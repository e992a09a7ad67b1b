//! Client for the hosted music-generation API.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Method, Url};
use url::form_urlencoded;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::GenerationError,
    track::normalize_body,
    transport::{HttpRequest, ReqwestTransport, Transport},
    types::GenerationRequest,
    GenerationResult,
};

pub const DEFAULT_BASE_URL: &str = "https://api.aimlapi.com/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the client needs, passed in explicitly.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub credential: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: Url, credential: Option<String>) -> Self {
        Self { base_url: with_trailing_slash(base_url), credential, timeout: DEFAULT_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Operations shared by the client and anything layered on top of it.
#[async_trait]
pub trait MusicGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult;

    async fn fetch_status(&self, ids: &[String]) -> GenerationResult;
}

/// Stateless client: one HTTP call per operation, no retries, no polling.
#[derive(Clone)]
pub struct GenerationClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl GenerationClient {
    pub fn new(config: ClientConfig) -> Result<Self, GenerationError> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let config = ClientConfig { base_url: with_trailing_slash(config.base_url), ..config };
        Self { config, transport }
    }

    pub fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    fn credential(&self) -> Result<&str, GenerationError> {
        self.config
            .credential
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .ok_or(GenerationError::MissingCredential)
    }

    fn endpoint(&self, path: &str) -> Result<Url, GenerationError> {
        self.config
            .base_url
            .join(path)
            .map_err(|err| GenerationError::InvalidRequest(format!("invalid endpoint {path}: {err}")))
    }

    /// `?ids[0]=..&ids[1]=..` with literal brackets; only the ids are escaped.
    fn status_url(&self, ids: &[String]) -> Url {
        let query = ids
            .iter()
            .enumerate()
            .map(|(index, id)| {
                let value: String = form_urlencoded::byte_serialize(id.as_bytes()).collect();
                format!("ids[{index}]={value}")
            })
            .collect::<Vec<_>>()
            .join("&");
        let mut url = self.config.base_url.clone();
        url.set_query(Some(&query));
        url
    }

    async fn send(&self, request: HttpRequest) -> GenerationResult {
        let response = self.transport.execute(request).await.map_err(|failure| {
            warn!(?failure, "request failed");
            GenerationError::from(failure)
        })?;

        if !response.is_success() {
            warn!(status = response.status, "API returned an error status");
            return Err(GenerationError::ApiError {
                status_code: response.status,
                body_text: response.body,
            });
        }

        let tracks = normalize_body(&response.body)?;
        debug!(count = tracks.len(), "normalized tracks");
        Ok(tracks)
    }
}

#[async_trait]
impl MusicGenerator for GenerationClient {
    #[instrument(skip_all, fields(endpoint = request.mode.endpoint(), wait_audio = request.wait_for_audio))]
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        if request.base_prompt.trim().is_empty() {
            return Err(GenerationError::InvalidRequest("base prompt must not be empty".into()));
        }
        let bearer = self.credential()?.to_string();
        let url = self.endpoint(request.mode.endpoint())?;

        let body = serde_json::to_value(request.payload())
            .map_err(|err| GenerationError::InvalidRequest(format!("unencodable request: {err}")))?;
        info!(url = %url, "submitting generation request");

        self.send(HttpRequest {
            method: Method::POST,
            url,
            bearer,
            body: Some(body),
            timeout: self.config.timeout,
        })
        .await
    }

    #[instrument(skip_all, fields(ids = ids.len()))]
    async fn fetch_status(&self, ids: &[String]) -> GenerationResult {
        if ids.is_empty() {
            return Err(GenerationError::InvalidRequest("at least one track id is required".into()));
        }
        if ids.iter().any(|id| id.trim().is_empty()) {
            return Err(GenerationError::InvalidRequest("track ids must not be empty".into()));
        }
        let bearer = self.credential()?.to_string();
        let url = self.status_url(ids);
        debug!(url = %url, "fetching track status");

        self.send(HttpRequest {
            method: Method::GET,
            url,
            bearer,
            body: None,
            timeout: self.config.timeout,
        })
        .await
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{
        collections::VecDeque,
        sync::{Mutex, MutexGuard},
    };

    use super::*;
    use crate::transport::{HttpResponse, TransportFailure};

    /// In-memory transport replaying scripted outcomes and recording requests.
    #[derive(Default)]
    pub struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<HttpResponse, TransportFailure>>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        pub fn replying(replies: impl IntoIterator<Item = Result<HttpResponse, TransportFailure>>) -> Arc<Self> {
            Arc::new(Self { replies: Mutex::new(replies.into_iter().collect()), seen: Mutex::default() })
        }

        pub fn ok(status: u16, body: &str) -> Result<HttpResponse, TransportFailure> {
            Ok(HttpResponse { status, body: body.to_string() })
        }

        pub fn requests(&self) -> MutexGuard<'_, Vec<HttpRequest>> {
            self.seen.lock().unwrap()
        }

        pub fn calls(&self) -> usize {
            self.requests().len()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
            self.seen.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportFailure::Other("no scripted reply".into())))
        }
    }

    pub fn client(transport: Arc<ScriptedTransport>) -> GenerationClient {
        let config = ClientConfig::new(
            Url::parse("https://api.example.test/suno").unwrap(),
            Some("test-token".into()),
        );
        GenerationClient::with_transport(config, transport)
    }
}
