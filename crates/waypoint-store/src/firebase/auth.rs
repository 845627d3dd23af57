// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service-account authentication for the Firebase REST API.
//!
//! Signs an RS256 JWT with the account's private key, exchanges it at the
//! account's `token_uri` for an OAuth2 access token, and caches the token
//! until shortly before it expires.

use std::path::Path;
use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use waypoint_core::RelayError;

/// Scopes required to read and write the real-time database as an admin.
const SCOPES: &str =
    "https://www.googleapis.com/auth/firebase.database https://www.googleapis.com/auth/userinfo.email";

/// Form-encoded grant type for the JWT bearer flow.
const JWT_BEARER_GRANT: &str = "urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer";

/// Lifetime requested for each signed assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh the cached token this long before it expires.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// The fields of a Google service-account key file that the relay needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[redacted]")
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Read and parse a key file.
    pub async fn from_file(path: &Path) -> Result<Self, RelayError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            RelayError::Config(format!(
                "cannot read service account file {}: {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            RelayError::Config(format!(
                "invalid service account file {}: {e}",
                path.display()
            ))
        })
    }
}

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
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Mints and caches OAuth2 access tokens for one service account.
pub struct TokenSource {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSource")
            .field("client_email", &self.key.client_email)
            .finish_non_exhaustive()
    }
}

impl TokenSource {
    /// Build a token source; fails when the private key is not valid RSA PEM.
    pub fn new(key: ServiceAccountKey, client: reqwest::Client) -> Result<Self, RelayError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| RelayError::Config(format!("invalid service account private key: {e}")))?;
        Ok(Self {
            key,
            encoding_key,
            client,
            cached: Mutex::new(None),
        })
    }

    /// Return a valid access token, refreshing it when close to expiry.
    ///
    /// Concurrent callers wait on the same refresh instead of each minting
    /// their own token.
    pub async fn access_token(&self) -> Result<String, RelayError> {
        let mut cached = self.cached.lock().await;
        if let Some(current) = cached.as_ref() {
            if current.expires_at > Instant::now() + REFRESH_MARGIN {
                return Ok(current.token.clone());
            }
        }

        let fresh = self.fetch().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    fn assertion(&self) -> Result<String, RelayError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SCOPES,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(|e| {
            RelayError::Internal(format!("failed to sign service account assertion: {e}"))
        })
    }

    async fn fetch(&self) -> Result<CachedToken, RelayError> {
        let assertion = self.assertion()?;
        let body = format!("grant_type={JWT_BEARER_GRANT}&assertion={assertion}");

        let response = self
            .client
            .post(&self.key.token_uri)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await
            .map_err(|e| token_error(format!("token request failed: {e}"), Some(e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(token_error(
                format!("token endpoint returned HTTP {status}: {detail}"),
                None,
            ));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| token_error(format!("malformed token response: {e}"), Some(e)))?;

        debug!(
            client_email = %self.key.client_email,
            expires_in = parsed.expires_in,
            "minted database access token"
        );

        Ok(CachedToken {
            token: parsed.access_token,
            expires_at: Instant::now() + Duration::from_secs(parsed.expires_in),
        })
    }
}

fn token_error(message: String, source: Option<reqwest::Error>) -> RelayError {
    RelayError::Persistence {
        path: "<auth>".to_string(),
        message,
        source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) const TEST_PRIVATE_KEY: &str = include_str!("../../testdata/test_rsa_key.pem");

    pub(crate) fn test_key(token_uri: String) -> ServiceAccountKey {
        ServiceAccountKey {
            client_email: "relay@demo-project.iam.gserviceaccount.com".to_string(),
            private_key: TEST_PRIVATE_KEY.to_string(),
            private_key_id: Some("kid-1".to_string()),
            token_uri,
            project_id: Some("demo-project".to_string()),
        }
    }

    pub(crate) async fn mount_token_endpoint(server: &MockServer, expires_in: u64) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=urn%3Aietf"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.test-token",
                "expires_in": expires_in,
                "token_type": "Bearer"
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn token_is_cached_between_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.cached",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source =
            TokenSource::new(test_key(format!("{}/token", server.uri())), reqwest::Client::new())
                .unwrap();
        assert_eq!(source.access_token().await.unwrap(), "ya29.cached");
        assert_eq!(source.access_token().await.unwrap(), "ya29.cached");
    }

    #[tokio::test]
    async fn token_near_expiry_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.short",
                "expires_in": 30
            })))
            .expect(2)
            .mount(&server)
            .await;

        let source =
            TokenSource::new(test_key(format!("{}/token", server.uri())), reqwest::Client::new())
                .unwrap();
        source.access_token().await.unwrap();
        source.access_token().await.unwrap();
    }

    #[tokio::test]
    async fn rejected_exchange_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;

        let source =
            TokenSource::new(test_key(format!("{}/token", server.uri())), reqwest::Client::new())
                .unwrap();
        let err = source.access_token().await.unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[test]
    fn invalid_private_key_is_a_config_error() {
        let mut key = test_key("http://localhost/token".to_string());
        key.private_key = "not a pem".to_string();
        let err = TokenSource::new(key, reqwest::Client::new()).unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }

    #[tokio::test]
    async fn key_file_parses_and_redacts() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sa.json");
        let json = serde_json::json!({
            "type": "service_account",
            "project_id": "demo-project",
            "private_key_id": "kid-1",
            "private_key": TEST_PRIVATE_KEY,
            "client_email": "relay@demo-project.iam.gserviceaccount.com",
            "token_uri": "https://oauth2.googleapis.com/token"
        });
        std::fs::write(&file, json.to_string()).unwrap();

        let key = ServiceAccountKey::from_file(&file).await.unwrap();
        assert_eq!(key.project_id.as_deref(), Some("demo-project"));
        let debug = format!("{key:?}");
        assert!(!debug.contains("BEGIN PRIVATE KEY"));
    }

    #[tokio::test]
    async fn missing_key_file_is_a_config_error() {
        let err = ServiceAccountKey::from_file(Path::new("/nonexistent/sa.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }
}
