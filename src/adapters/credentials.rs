use crate::domain::ports::CredentialProvider;
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;

pub const API_KEY_VAR: &str = "ARCGIS_API_KEY";

/// 設定檔中直接提供的金鑰
pub struct StaticCredential(String);

impl StaticCredential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

#[async_trait]
impl CredentialProvider for StaticCredential {
    async fn credential(&self) -> Result<String> {
        let key = self.0.trim();
        if key.is_empty() {
            return Err(AppError::config("service.api_key", "API key is empty"));
        }
        Ok(key.to_string())
    }
}

/// 從環境變數 (含 .env) 讀取金鑰
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredential {
    fn default() -> Self {
        Self::new(API_KEY_VAR)
    }
}

#[async_trait]
impl CredentialProvider for EnvCredential {
    async fn credential(&self) -> Result<String> {
        dotenvy::dotenv().ok();
        match std::env::var(&self.var) {
            Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
            _ => Err(AppError::config(
                &self.var,
                "environment variable is missing or empty",
            )),
        }
    }
}

/// 向後端的 `/api-key` 取得金鑰，和瀏覽器端的做法相同
pub struct HttpCredential {
    client: Client,
    url: String,
}

impl HttpCredential {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for HttpCredential {
    async fn credential(&self) -> Result<String> {
        tracing::debug!("Fetching API key from: {}", self.url);
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::config(
                "key_endpoint",
                format!("{} answered HTTP {}", self.url, status.as_u16()),
            ));
        }

        let key = response.text().await?.trim().to_string();
        if key.is_empty() {
            return Err(AppError::config("key_endpoint", "backend returned an empty key"));
        }
        Ok(key)
    }
}
