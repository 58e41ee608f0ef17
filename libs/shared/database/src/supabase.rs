use anyhow::Result;
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Failures reported by the PostgREST endpoint. Returned wrapped in
/// `anyhow::Error`; use [`store_error`] to inspect them.
#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

pub fn store_error(err: &anyhow::Error) -> Option<&SupabaseError> {
    err.downcast_ref::<SupabaseError>()
}

pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(store_error(err), Some(SupabaseError::UniqueViolation(_)))
}

pub fn is_foreign_key_violation(err: &anyhow::Error) -> bool {
    matches!(store_error(err), Some(SupabaseError::ForeignKeyViolation(_)))
}

/// PostgREST answers 409 for several SQLSTATEs; the JSON body's `code`
/// tells them apart.
fn conflict_error(body: String) -> SupabaseError {
    let code = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("code").and_then(Value::as_str).map(str::to_owned));

    match code.as_deref() {
        Some("23505") => SupabaseError::UniqueViolation(body),
        Some("23503") => SupabaseError::ForeignKeyViolation(body),
        _ => SupabaseError::Api { status: 409, message: body },
    }
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.anon_key)
                .map_err(|e| SupabaseError::InvalidHeader(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| SupabaseError::InvalidHeader(e.to_string()))?,
            );
        }

        Ok(headers)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            let err = match status.as_u16() {
                401 | 403 => SupabaseError::Auth(error_text),
                404 => SupabaseError::NotFound(error_text),
                409 => conflict_error(error_text),
                code => SupabaseError::Api { status: code, message: error_text },
            };
            return Err(err.into());
        }

        Ok(response)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        headers: Option<HeaderMap>,
    ) -> Result<T>
    where T: DeserializeOwned {
        let response = self.send(method, path, auth_token, body, headers).await?;
        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Sends a request whose response body is irrelevant (deletes, bulk
    /// inserts without `return=representation`).
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<()> {
        self.send(method, path, auth_token, body, None).await?;
        Ok(())
    }
}

/// `Prefer: return=representation`, so inserts and updates echo the rows.
pub fn return_representation() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}
