use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    ApiConfig, AuthApi, ConfigError, Credentials, PermissionRecord, PermissionSource,
    TransportError, UserId,
    wire::{self, PermissionRequest},
};

/// reqwest client for the auth and permission-authority endpoints
pub struct ApiClient {
    http: Client,
    base_url: Url,
    login_path: String,
    logout_path: String,
    permissions_path: String,
    bearer: ArcSwapOption<String>,
}

impl ApiClient {
    pub fn from_config(config: &ApiConfig) -> Result<Self, ConfigError> {
        let http = ClientBuilder::new()
            .connect_timeout(config.connect_timeout()?)
            .timeout(config.request_timeout()?)
            .user_agent(config.user_agent())
            .build()
            .map_err(TransportError::ClientBuild)?;

        Ok(ApiClient {
            http,
            base_url: config.base_url()?,
            login_path: config.login_path.clone(),
            logout_path: config.logout_path.clone(),
            permissions_path: config.permissions_path.clone(),
            bearer: ArcSwapOption::empty(),
        })
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.bearer.load_full().map(|token| token.as_str().to_owned())
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| TransportError::Url(format!("{path}: {err}")))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.bearer.load_full() {
            Some(token) => builder.bearer_auth(token.as_str()),
            None => builder,
        }
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response, TransportError> {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);
        let response = self.authorized(self.http.post(url.clone())).json(body).send().await?;
        debug!("POST response: {} {}", response.status(), url);
        check_status(response).await
    }
}

async fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<Value, TransportError> {
        let response = self.post_json(&self.login_path, credentials).await?;
        response
            .json::<Value>()
            .await
            .map_err(|err| TransportError::Decode(err.to_string()))
    }

    async fn logout(&self) -> Result<(), TransportError> {
        self.post_json(&self.logout_path, &serde_json::json!({})).await?;
        Ok(())
    }

    fn set_bearer_token(&self, token: Option<&str>) {
        self.bearer.store(token.map(|token| Arc::new(token.to_owned())));
    }
}

#[async_trait]
impl PermissionSource for ApiClient {
    async fn fetch_permissions(&self, user_id: UserId) -> Result<Vec<PermissionRecord>, TransportError> {
        let response = self
            .post_json(&self.permissions_path, &PermissionRequest { user_id })
            .await?;
        let body = response.bytes().await?;
        wire::decode_records(&body).map_err(|err| TransportError::Decode(err.to_string()))
    }
}
