use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ServiceAccountKey;
use crate::error::{AppError, Result};

const DOCS_API_BASE: &str = "https://docs.googleapis.com/v1/documents";
const DOCS_SCOPE: &str = "https://www.googleapis.com/auth/documents";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum DocsRequest {
    DeleteContentRange { range: ContentRange },
    InsertText { location: InsertLocation, text: String },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentRange {
    start_index: u64,
    end_index: u64,
}

#[derive(Debug, Serialize)]
struct InsertLocation {
    index: u64,
}

#[derive(Serialize)]
struct BatchUpdateBody {
    requests: Vec<DocsRequest>,
}

/// Google Docs client authenticated as a service account. Every failure on
/// this path is a write error: the document is the run's only sink and
/// there is no partial retry.
pub struct DocsClient {
    http: Client,
    key: ServiceAccountKey,
    document_id: String,
}

impl DocsClient {
    pub fn new(key: ServiceAccountKey, document_id: String) -> Self {
        DocsClient {
            http: Client::new(),
            key,
            document_id,
        }
    }

    /// Replaces the whole document body with `content` in one batch update,
    /// so a given scrape always leaves the document in the same final state.
    pub async fn replace_contents(&self, content: &str) -> Result<()> {
        let token = self.access_token().await?;
        let end_index = self.document_end_index(&token).await?;
        let requests = build_replace_requests(end_index, content);

        let url = format!("{DOCS_API_BASE}/{}:batchUpdate", self.document_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&BatchUpdateBody { requests })
            .send()
            .await
            .map_err(|e| AppError::WriteError(format!("batchUpdate request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::WriteError(format!(
                "batchUpdate returned {status}: {body}"
            )));
        }
        info!("Replaced contents of document {}", self.document_id);
        Ok(())
    }

    /// Signs a service-account assertion and exchanges it for a bearer token.
    async fn access_token(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: DOCS_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| AppError::WriteError(format!("Invalid service account key: {e}")))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| AppError::WriteError(format!("Failed to sign token assertion: {e}")))?;

        debug!("Requesting access token for {}", self.key.client_email);
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| AppError::WriteError(format!("Token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::WriteError(format!(
                "Token endpoint returned {status}: {body}"
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::WriteError(format!("Invalid token response: {e}")))?;
        Ok(token.access_token)
    }

    /// Reads the `endIndex` of the last structural element of the document
    /// body, which bounds the range the replace has to clear.
    async fn document_end_index(&self, token: &str) -> Result<u64> {
        let url = format!("{DOCS_API_BASE}/{}", self.document_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::WriteError(format!("documents.get request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::WriteError(format!(
                "documents.get returned {status}: {body}"
            )));
        }
        let document: Value = response
            .json()
            .await
            .map_err(|e| AppError::WriteError(format!("Invalid document response: {e}")))?;
        Ok(trailing_end_index(&document))
    }
}

fn trailing_end_index(document: &Value) -> u64 {
    document["body"]["content"]
        .as_array()
        .and_then(|content| content.last())
        .and_then(|segment| segment["endIndex"].as_u64())
        .unwrap_or(1)
}

// A fresh document holds only the trailing newline; below an end index of 2
// there is no range to delete and the API rejects an empty one.
fn build_replace_requests(end_index: u64, content: &str) -> Vec<DocsRequest> {
    let mut requests = Vec::with_capacity(2);
    if end_index > 2 {
        requests.push(DocsRequest::DeleteContentRange {
            range: ContentRange {
                start_index: 1,
                end_index: end_index - 1,
            },
        });
    }
    requests.push(DocsRequest::InsertText {
        location: InsertLocation { index: 1 },
        text: content.to_string(),
    });
    requests
}
