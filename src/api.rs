// src/api.rs
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::config::REQUEST_TIMEOUT;
use crate::error::ApiError;
use crate::models::{Task, TaskCreatePayload, TaskList};

/// The three task endpoints the editor depends on.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError>;
    async fn create_task(&self, payload: &TaskCreatePayload) -> Result<Task, ApiError>;
    async fn update_task(&self, id: i64, payload: &TaskCreatePayload) -> Result<Task, ApiError>;
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Response of `POST /user/login-user`. The token sits at the top level or
/// under `data`, depending on backend version.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    data: Option<LoginData>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(default)]
    token: Option<String>,
}

impl LoginResponse {
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .or_else(|| self.data.as_ref().and_then(|d| d.token.as_deref()))
    }
}

#[derive(Clone, Debug)]
pub struct Client {
    base: Url,
    token: Option<String>,
    http: reqwest::Client,
}

impl Client {
    pub fn new(base: &str, token: Option<String>) -> Result<Self, ApiError> {
        // Url::join drops the last path segment unless the base ends in '/'.
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { base, token, http })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Exchange credentials for a bearer token. Sent without authentication.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let url = self.base.join("user/login-user")?;
        info!(%url, email, "logging in");
        let res = self
            .http
            .post(url)
            .header(ACCEPT, "application/json")
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        let body: LoginResponse = decode(res).await?;
        body.token().map(str::to_string).ok_or(ApiError::MissingToken)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.base.join(path)?;
        debug!(%method, %url, "task api request");
        let mut req = self.http.request(method, url).header(ACCEPT, "application/json");
        if let Some(token) = &self.token {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        Ok(req)
    }
}

#[async_trait]
impl TaskBackend for Client {
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let res = self.request(Method::GET, "tasks")?.send().await?;
        let list: TaskList = decode(res).await?;
        Ok(list.data)
    }

    async fn create_task(&self, payload: &TaskCreatePayload) -> Result<Task, ApiError> {
        let res = self.request(Method::POST, "tasks")?.json(payload).send().await?;
        decode(res).await
    }

    async fn update_task(&self, id: i64, payload: &TaskCreatePayload) -> Result<Task, ApiError> {
        let res = self
            .request(Method::PUT, &format!("tasks/{id}"))?
            .json(payload)
            .send()
            .await?;
        decode(res).await
    }
}

async fn decode<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, ApiError> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        return Err(ApiError::Status { status, body: text });
    }
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Client::new("https://admin.example.com/api", None).unwrap();
        assert_eq!(client.base().as_str(), "https://admin.example.com/api/");
        assert!(!client.has_token());
    }

    #[test]
    fn test_client_with_token() {
        let client = Client::new("https://admin.example.com/", Some("test-token".to_string())).unwrap();
        assert_eq!(client.base().as_str(), "https://admin.example.com/");
        assert!(client.has_token());
    }

    #[test]
    fn test_client_rejects_bad_base() {
        assert!(matches!(Client::new("not a url", None), Err(ApiError::Url(_))));
    }

    #[test]
    fn test_login_token_locations() {
        let top: LoginResponse = serde_json::from_str(r#"{"token":"abc"}"#).unwrap();
        assert_eq!(top.token(), Some("abc"));

        let nested: LoginResponse = serde_json::from_str(r#"{"data":{"token":"xyz","id":1}}"#).unwrap();
        assert_eq!(nested.token(), Some("xyz"));

        let none: LoginResponse = serde_json::from_str(r#"{"message":"ok"}"#).unwrap();
        assert_eq!(none.token(), None);
    }
}
