use async_trait::async_trait;
use egp_core::config::InfuraCredentials;
use egp_core::serde_utils::{from_json_bytes, json_or_text, to_json_bytes};
use egp_protocol::objects::ContentId;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::error::StoreError;
use crate::store::ObjectStore;

/// Public Infura endpoint for the Kubo RPC API.
pub const INFURA_API_URL: &str = "https://ipfs.infura.io:5001";

/// Object store backed by the Kubo (go-ipfs) HTTP RPC API.
#[derive(Clone)]
pub struct IpfsStore {
    http: reqwest::Client,
    api_url: Url,
    auth: Option<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    #[serde(rename = "Version")]
    version: String,
}

impl IpfsStore {
    pub fn new(mut api_url: Url) -> Self {
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path().trim_end_matches('/'));
            api_url.set_path(&path);
        }
        Self {
            http: reqwest::Client::new(),
            api_url,
            auth: None,
        }
    }

    /// Store talking to Infura with project credentials.
    pub fn infura(credentials: &InfuraCredentials) -> Result<Self, StoreError> {
        let api_url = Url::parse(INFURA_API_URL)
            .map_err(|err| StoreError::Protocol(format!("invalid Infura url: {err}")))?;
        Ok(Self::new(api_url).with_basic_auth(
            credentials.project_id.clone(),
            credentials.project_secret.clone(),
        ))
    }

    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.auth = Some((username.into(), password.into()));
        self
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn endpoint(&self, command: &str) -> Result<Url, StoreError> {
        self.api_url
            .join(&format!("api/v0/{command}"))
            .map_err(|err| StoreError::Protocol(format!("invalid api url: {err}")))
    }

    async fn call(
        &self,
        command: &str,
        subject: Option<&ContentId>,
        form: Option<Form>,
    ) -> Result<Response, StoreError> {
        let mut request = self.http.post(self.endpoint(command)?);
        if let Some(id) = subject {
            request = request.query(&[("arg", id.as_str())]);
        }
        if let Some((username, password)) = &self.auth {
            request = request.basic_auth(username, Some(password));
        }
        if let Some(form) = form {
            request = request.multipart(form);
        }

        let response = request
            .send()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.bytes().await.unwrap_or_default();
        let message = match json_or_text(&body) {
            Value::Object(map) => map
                .get("Message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Value::String(text) => text,
            other => other.to_string(),
        };
        Err(classify(status, message, subject))
    }

    /// Version reported by the node, used as a connectivity probe.
    pub async fn version(&self) -> Result<String, StoreError> {
        let response = self.call("version", None, None).await?;
        let body = response
            .bytes()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        let version: VersionResponse =
            from_json_bytes(&body).map_err(|err| StoreError::Protocol(err.to_string()))?;
        Ok(version.version)
    }
}

/// Phrases Kubo puts in a 500 body when the requested path can never name content.
const UNRESOLVABLE_MARKERS: [&str; 3] = ["invalid path", "invalid cid", "failed to resolve"];

fn classify(status: StatusCode, message: String, subject: Option<&ContentId>) -> StoreError {
    let lowered = message.to_ascii_lowercase();
    let unresolvable = status == StatusCode::INTERNAL_SERVER_ERROR
        && UNRESOLVABLE_MARKERS.iter().any(|marker| lowered.contains(marker));
    let missing =
        status == StatusCode::NOT_FOUND || lowered.contains("not found") || unresolvable;
    match subject {
        Some(id) if missing => StoreError::NotFound(id.clone()),
        _ if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS => {
            StoreError::Unavailable(format!("{status}: {message}"))
        }
        _ => StoreError::Protocol(format!("{status}: {message}")),
    }
}

#[async_trait]
impl ObjectStore for IpfsStore {
    #[instrument(skip_all)]
    async fn store(&self, object: &Value) -> Result<ContentId, StoreError> {
        let bytes = to_json_bytes(object).map_err(|err| StoreError::Protocol(err.to_string()))?;
        let part = Part::bytes(bytes)
            .file_name("object.json")
            .mime_str("application/json")
            .map_err(|err| StoreError::Protocol(err.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self.call("add?pin=false", None, Some(form)).await?;
        let body = response
            .bytes()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        let added: AddResponse =
            from_json_bytes(&body).map_err(|err| StoreError::Protocol(err.to_string()))?;
        let id = ContentId::parse(added.hash).map_err(|err| StoreError::Protocol(err.to_string()))?;
        debug!(%id, "stored object on ipfs");
        Ok(id)
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn get(&self, id: &ContentId) -> Result<Value, StoreError> {
        let response = self.call("cat", Some(id), None).await?;
        let body = response
            .bytes()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        from_json_bytes(&body).map_err(|err| StoreError::Protocol(err.to_string()))
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn pin(&self, id: &ContentId) -> Result<(), StoreError> {
        self.call("pin/add", Some(id), None).await?;
        Ok(())
    }
}
