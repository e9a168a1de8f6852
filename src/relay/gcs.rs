//! Google Cloud Storage over its JSON API, authenticated with a
//! service-account JWT.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::store::{ObjectStore, StoreError};
use crate::config::GcsCredentials;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const API_BASE: &str = "https://storage.googleapis.com";
const SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";
const JWT_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before Google says they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

fn claims(client_email: &str, now_secs: i64) -> Claims<'_> {
    Claims {
        iss: client_email,
        scope: SCOPE,
        aud: TOKEN_URL,
        iat: now_secs,
        exp: now_secs + ASSERTION_LIFETIME_SECS,
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    #[serde(default)]
    items: Vec<ListItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListItem {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Google's `{"error":{"message":..}}` text, or the status line.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|env| env.error.message)
        .unwrap_or_else(|_| format!("object store returned {status}"))
}

fn backend<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> StoreError + '_ {
    move |err| StoreError::Backend(format!("{context}: {err}"))
}

pub struct GcsStore {
    http: Client,
    credentials: GcsCredentials,
    signing_key: EncodingKey,
    token: Mutex<Option<CachedToken>>,
}

impl GcsStore {
    pub fn new(credentials: GcsCredentials) -> anyhow::Result<Self> {
        let signing_key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
            .map_err(|err| anyhow::anyhow!("GCLOUD_PRIVATE_KEY is not a valid RSA PEM key: {err}"))?;
        log::info!(
            "using GCS bucket {} (project {})",
            credentials.bucket,
            credentials.project_id
        );
        Ok(Self {
            http: Client::new(),
            credentials,
            signing_key,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, StoreError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let now = chrono::Utc::now().timestamp();
        let assertion = jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims(&self.credentials.client_email, now),
            &self.signing_key,
        )
        .map_err(backend("failed to sign token request"))?;

        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[("grant_type", JWT_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(backend("token request failed"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Backend(format!(
                "token exchange rejected ({status}): {body}"
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(backend("malformed token response"))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        log::debug!("obtained GCS access token valid for {}s", token.expires_in);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    fn object_url(&self, name: &str) -> Result<Url, StoreError> {
        object_url(&self.credentials.bucket, name)
    }
}

fn object_url(bucket: &str, name: &str) -> Result<Url, StoreError> {
    let mut url = Url::parse(API_BASE).map_err(backend("bad API base"))?;
    url.path_segments_mut()
        .map_err(|_| StoreError::Backend("API base cannot take a path".to_string()))?
        .clear()
        .extend(["storage", "v1", "b", bucket, "o", name]);
    Ok(url)
}

async fn failure(context: &str, response: reqwest::Response) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    StoreError::Backend(format!("{context}: {}", error_message(status, &body)))
}

#[async_trait]
impl ObjectStore for GcsStore {
    fn bucket(&self) -> &str {
        &self.credentials.bucket
    }

    async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        let token = self.access_token().await?;
        let url = format!("{API_BASE}/upload/storage/v1/b/{}/o", self.credentials.bucket);
        let response = self
            .http
            .post(url)
            .query(&[("uploadType", "media"), ("name", name)])
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(backend("upload failed"))?;
        if !response.status().is_success() {
            return Err(failure("upload failed", response).await);
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let token = self.access_token().await?;
        let url = format!("{API_BASE}/storage/v1/b/{}/o", self.credentials.bucket);
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(&url)
                .bearer_auth(&token)
                .query(&[("fields", "items(name),nextPageToken")]);
            if let Some(page) = page_token.as_deref() {
                request = request.query(&[("pageToken", page)]);
            }
            let response = request.send().await.map_err(backend("listing failed"))?;
            if !response.status().is_success() {
                return Err(failure("listing failed", response).await);
            }
            let page: ListPage = response
                .json()
                .await
                .map_err(backend("malformed listing"))?;
            names.extend(page.items.into_iter().map(|item| item.name));

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .delete(self.object_url(name)?)
            .bearer_auth(token)
            .send()
            .await
            .map_err(backend("delete failed"))?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound {
                bucket: self.credentials.bucket.clone(),
                name: name.to_string(),
            }),
            _ => Err(failure("delete failed", response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assertion_claims_last_one_hour() {
        let c = claims("svc@proj.iam.gserviceaccount.com", 1_700_000_000);
        assert_eq!(c.iss, "svc@proj.iam.gserviceaccount.com");
        assert_eq!(c.aud, "https://oauth2.googleapis.com/token");
        assert!(c.scope.ends_with("devstorage.read_write"));
        assert_eq!(c.exp - c.iat, 3600);
    }

    #[test]
    fn object_names_are_percent_encoded() {
        let url = object_url("looks", "my look/1.jpg").unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/looks/o/my%20look%2F1.jpg"
        );
    }

    #[test]
    fn api_error_messages_are_passed_through() {
        let body = r#"{"error":{"code":403,"message":"Access denied."}}"#;
        assert_eq!(error_message(StatusCode::FORBIDDEN, body), "Access denied.");
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "<html>"),
            "object store returned 502 Bad Gateway"
        );
    }

    #[test]
    fn listing_pages_tolerate_missing_items() {
        let page: ListPage = serde_json::from_str("{}").unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());

        let page: ListPage =
            serde_json::from_str(r#"{"items":[{"name":"1-upload.jpg"}],"nextPageToken":"abc"}"#).unwrap();
        assert_eq!(page.items[0].name, "1-upload.jpg");
        assert_eq!(page.next_page_token.as_deref(), Some("abc"));
    }

    #[test]
    fn invalid_private_key_is_rejected() {
        let creds = GcsCredentials {
            project_id: "proj".into(),
            client_email: "svc@proj.iam.gserviceaccount.com".into(),
            private_key: "not a key".into(),
            bucket: "looks".into(),
        };
        assert!(GcsStore::new(creds).is_err());
    }
}
