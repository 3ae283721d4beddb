use log::debug;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Token;
use crate::error::{IntegrationError, Result};

pub const API_VERSION: &str = "7.0";

/// HTTP plumbing shared by the server client and the providers API.
pub struct RestCore {
    client: Client,
}

impl RestCore {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("azdo-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IntegrationError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Personal access tokens go in as the password of a Basic credential with no user name.
    pub fn auth_request(&self, request: RequestBuilder, token: &Token) -> RequestBuilder {
        if token.is_empty() {
            request
        } else {
            request.basic_auth("", Some(token.as_str()))
        }
    }

    pub fn get(&self, url: Url, token: &Token) -> RequestBuilder {
        self.auth_request(
            self.client.get(url).query(&[("api-version", API_VERSION)]),
            token,
        )
    }

    pub fn post(&self, url: Url, token: &Token) -> RequestBuilder {
        self.auth_request(
            self.client.post(url).query(&[("api-version", API_VERSION)]),
            token,
        )
    }

    pub fn patch(&self, url: Url, token: &Token) -> RequestBuilder {
        self.auth_request(
            self.client.patch(url).query(&[("api-version", API_VERSION)]),
            token,
        )
    }

    /// Sends the request and decodes the body, treating 404 as `None`.
    pub async fn fetch_optional<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> Result<Option<T>> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!("{operation}: server returned 404");
            return Ok(None);
        }

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(IntegrationError::Authentication(format!(
                "{operation} failed: server returned {status}"
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IntegrationError::Api(format!(
                "{operation} failed with status {status}: {body}"
            )));
        }

        Ok(Some(response.json::<T>().await?))
    }
}
