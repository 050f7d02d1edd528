//! Authenticated request pipeline shared by every endpoint wrapper.
//!
//! Each call checks for a signed-in user, mints a fresh bearer token, sends
//! exactly one request and classifies the response:
//!
//! 1. `401` hands off to [`SessionExpiryHandler`] and yields [`ApiError::SessionExpired`]
//! 2. other non-2xx yields [`ApiError::RequestFailed`] with the backend's message
//! 3. 2xx decodes as the requested type, or as raw bytes for media
//!
//! There are no retries and nothing is cached.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::ApiError;
use crate::expiry::SessionExpiryHandler;
use crate::models::{Media, MediaPayload};
use crate::session::{SessionError, SessionProvider};
use crate::settings::Settings;

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Text fields plus optional file parts, converted to a reqwest form at send time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    fields: Vec<(String, String)>,
    files: Vec<FilePart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, part: FilePart) -> Self {
        self.files.push(part);
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn files(&self) -> &[FilePart] {
        &self.files
    }

    fn into_form(self) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for (name, value) in self.fields {
            form = form.text(name, value);
        }
        for file in self.files {
            let part = Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.mime)
                .map_err(|err| ApiError::InvalidRequest(format!("bad MIME type: {err}")))?;
            form = form.part(file.field, part);
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartForm),
}

/// One backend call: method, path, query and body. Credentials are added by [`ApiClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: RequestBody,
}

impl ApiRequest {
    /// `path` is split on `/`; use [`ApiRequest::segment`] for ids.
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends one path segment, percent-encoded as a unit.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|err| ApiError::InvalidRequest(format!("failed to serialize body: {err}")))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<Url>,
    session: Arc<dyn SessionProvider>,
    expiry: Arc<SessionExpiryHandler>,
}

impl ApiClient {
    pub fn new(
        base_url: Url,
        session: Arc<dyn SessionProvider>,
        expiry: Arc<SessionExpiryHandler>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: Arc::new(base_url),
            session,
            expiry,
        }
    }

    pub fn from_settings(
        settings: &Settings,
        session: Arc<dyn SessionProvider>,
        expiry: Arc<SessionExpiryHandler>,
    ) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ApiError::ClientSetup)?;

        Ok(Self {
            http,
            base_url: Arc::new(settings.api_base_url.clone()),
            session,
            expiry,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn expiry_handler(&self) -> &Arc<SessionExpiryHandler> {
        &self.expiry
    }

    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path();
        let response = self.execute(request).await?;
        let bytes = response.bytes().await?;
        decode_json(&bytes).map_err(|err| {
            warn!(error = %err, %path, "response body did not match expected shape");
            ApiError::InvalidResponse(format!("{path}: {err}"))
        })
    }

    /// For endpoints whose success body carries nothing the caller needs.
    pub async fn send_unit(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.execute(request).await.map(|_| ())
    }

    /// JSON bodies are read as a [`MediaPayload`] reference, anything else as inline bytes.
    pub async fn send_media(&self, request: ApiRequest) -> Result<Media, ApiError> {
        let path = request.path();
        let response = self.execute(request).await?;
        let media_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| OCTET_STREAM.to_string());
        let bytes = response.bytes().await?;

        if is_json(&media_type) {
            let payload: MediaPayload = serde_json::from_slice(&bytes).map_err(|err| {
                warn!(error = %err, %path, "media reference did not parse");
                ApiError::InvalidResponse(format!("{path}: {err}"))
            })?;
            return Ok(Media::Reference(payload));
        }

        Ok(Media::Inline {
            bytes: bytes.to_vec(),
            media_type,
        })
    }

    async fn execute(&self, request: ApiRequest) -> Result<reqwest::Response, ApiError> {
        let path = request.path();

        self.require_session(&path)?;
        let token = self.session.mint_token().await.map_err(|err| {
            warn!(error = %err, %path, "could not obtain bearer token");
            ApiError::from(err)
        })?;

        let url = self.url_for(&request)?;
        let ApiRequest { method, body, .. } = request;
        debug!(%method, %path, "sending request");

        let builder = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, token.header_value());
        let builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder
                .header(CONTENT_TYPE, "application/json")
                .json(&value),
            RequestBody::Multipart(form) => builder.multipart(form.into_form()?),
        };

        let response = builder.send().await.map_err(|err| {
            warn!(error = %err, %path, "transport failure");
            ApiError::NetworkFailure(err)
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.expiry.handle(&path);
            return Err(ApiError::SessionExpired);
        }
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let err = ApiError::from_error_body(status, &body);
            warn!(%status, %path, error = %err, "request failed");
            return Err(err);
        }

        debug!(%status, %path, "request succeeded");
        Ok(response)
    }

    /// Fails with `Unauthenticated` when nobody is signed in. Wrappers call
    /// this before validating their input so a signed-out caller always
    /// sees the same error.
    pub(crate) fn require_session(&self, operation: &str) -> Result<(), ApiError> {
        if self.session.current_identity().is_none() {
            warn!(operation, "request attempted without a signed-in user");
            return Err(SessionError::NotSignedIn.into());
        }
        Ok(())
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let mut url = (*self.base_url).clone();
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::InvalidRequest(format!("base URL {} cannot have a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(&request.segments);
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }
}

/// Empty 2xx bodies decode like JSON `null`.
fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        serde_json::from_value(serde_json::Value::Null)
    } else {
        serde_json::from_slice(bytes)
    }
}

fn is_json(media_type: &str) -> bool {
    let essence = media_type.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case("application/json") || essence.ends_with("+json")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::expiry::ExpiryPrompt;
    use crate::session::{BearerToken, Identity, MemorySession};

    struct SilentPrompt;

    #[async_trait::async_trait]
    impl ExpiryPrompt for SilentPrompt {
        async fn acknowledge_expired(&self, _title: &str, _message: &str) {}
        fn navigate_to_entry(&self) {}
    }

    fn client(base: &str) -> ApiClient {
        let session = Arc::new(MemorySession::signed_in(
            Identity::new("u1"),
            BearerToken::new("t1"),
        ));
        let expiry = Arc::new(SessionExpiryHandler::new(session.clone(), Arc::new(SilentPrompt)));
        ApiClient::new(Url::parse(base).unwrap(), session, expiry)
    }

    #[test]
    fn test_url_for_joins_segments_and_query() {
        let client = client("http://localhost:8000");
        let request = ApiRequest::get("/admin/getExercises").query("class_id", "c 1&x");
        let url = client.url_for(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/admin/getExercises?class_id=c+1%26x"
        );
    }

    #[test]
    fn test_url_for_keeps_base_path_prefix() {
        let client = client("https://api.example.com/v1/");
        let request = ApiRequest::get("user/exercise").segment("a/b").segment("media");
        let url = client.url_for(&request).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/user/exercise/a%2Fb/media");
    }

    #[test]
    fn test_request_descriptor() {
        let request = ApiRequest::post("/user/markComplete")
            .json(&json!({"exercise_id": "ex1"}))
            .unwrap();
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.path(), "/user/markComplete");
        assert_eq!(
            request.body(),
            &RequestBody::Json(json!({"exercise_id": "ex1"}))
        );
    }

    #[test]
    fn test_decode_json_empty_body() {
        decode_json::<()>(b"").unwrap();
        let missing: Option<u32> = decode_json(b"  ").unwrap();
        assert_eq!(missing, None);
        assert!(decode_json::<u32>(b"").is_err());
    }

    #[test]
    fn test_is_json() {
        assert!(is_json("application/json"));
        assert!(is_json("application/json; charset=utf-8"));
        assert!(is_json("application/problem+json"));
        assert!(!is_json("video/mp4"));
        assert!(!is_json(OCTET_STREAM));
    }
}
