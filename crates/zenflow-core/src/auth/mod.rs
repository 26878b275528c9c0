//! Supabase auth client used to resolve the signed-in user for cloud sync.

use std::fmt;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SupabaseEndpoint;
use crate::util::unix_timestamp_now;

/// Sessions this close to expiry are refreshed before use.
const EXPIRY_SKEW_SECONDS: i64 = 60;

/// Longest raw response body carried into an error message
const MAX_ERROR_BODY_CHARS: usize = 180;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        unix_timestamp_now() + EXPIRY_SKEW_SECONDS >= self.expires_at
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const HIDDEN: &str = "<hidden>";
        f.debug_struct("AuthSession")
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .field("access_token", &HIDDEN)
            .field("refresh_token", &HIDDEN)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Where the signed-in session is kept between runs
pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

/// Email/password client for Supabase GoTrue.
#[derive(Clone)]
pub struct SupabaseAuthClient<S: SessionPersistence> {
    auth_url: String,
    anon_key: String,
    client: Client,
    store: S,
}

impl<S: SessionPersistence> SupabaseAuthClient<S> {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>, store: S) -> AuthResult<Self> {
        let anon_key = anon_key.into().trim().to_owned();
        if anon_key.is_empty() {
            return Err(AuthError::InvalidConfiguration("Supabase anon key must not be empty"));
        }

        Ok(Self {
            auth_url: normalize_auth_url(url.as_ref())?,
            anon_key,
            client: Client::builder().build()?,
            store,
        })
    }

    pub fn from_endpoint(endpoint: &SupabaseEndpoint, store: S) -> AuthResult<Self> {
        Self::new(&endpoint.url, endpoint.anon_key.clone(), store)
    }

    /// Load the persisted session, refreshing it when it is about to expire.
    ///
    /// A session the server refuses to refresh is cleared and `None`
    /// returned. Transport failures keep it for the next attempt.
    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored) = self.store.load_session()? else {
            return Ok(None);
        };
        if !stored.is_expired() {
            return Ok(Some(stored));
        }

        match self.refresh_session(&stored.refresh_token).await {
            Ok(session) => Ok(Some(session)),
            Err(error @ AuthError::Http(_)) => Err(error),
            Err(error) => {
                tracing::warn!("Dropping persisted session that failed to refresh: {}", error);
                self.store.clear_session()?;
                Ok(None)
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        if email.trim().is_empty() {
            return Err(AuthError::Api("Email is required".to_owned()));
        }
        if password.trim().is_empty() {
            return Err(AuthError::Api("Password is required".to_owned()));
        }

        let session = self
            .token_grant("password", &PasswordGrant { email, password })
            .await?;
        tracing::info!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration("Refresh token must not be empty"));
        }

        let session = self
            .token_grant("refresh_token", &RefreshGrant { refresh_token })
            .await?;
        tracing::debug!(user_id = %session.user.id, "Refreshed session");
        Ok(session)
    }

    /// Revoke the session remotely and forget it locally.
    ///
    /// An already-revoked token (401) still clears the local copy.
    pub async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        let response = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            ensure_success(response).await?;
        }

        self.store.clear_session()
    }

    /// POST `/token?grant_type=...` and persist the resulting session.
    async fn token_grant<B: Serialize + Sync>(&self, grant_type: &str, body: &B) -> AuthResult<AuthSession> {
        let response = self
            .with_anon_key(self.client.post(format!("{}/token", self.auth_url)))
            .query(&[("grant_type", grant_type)])
            .json(body)
            .send()
            .await?;
        let tokens: TokenResponse = ensure_success(response).await?.json().await?;
        let session = AuthSession::try_from(tokens)?;
        self.store.save_session(&session)?;
        Ok(session)
    }

    fn with_anon_key(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }
}

async fn ensure_success(response: Response) -> AuthResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AuthError::Api(describe_failure(status, &body)))
}

fn describe_failure(status: StatusCode, body: &str) -> String {
    error_body_message(body).map_or_else(
        || format!("HTTP {}", status.as_u16()),
        |message| format!("{message} ({})", status.as_u16()),
    )
}

/// GoTrue base URL (`.../auth/v1`) for a project URL.
pub fn normalize_auth_url(url: &str) -> AuthResult<String> {
    let base = url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err(AuthError::InvalidConfiguration("Supabase URL must not be empty"));
    }
    if !crate::util::is_http_url(base) {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must include http:// or https://",
        ));
    }

    Ok(if base.ends_with("/auth/v1") {
        base.to_owned()
    } else {
        format!("{base}/auth/v1")
    })
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<AuthUser>,
}

impl TryFrom<TokenResponse> for AuthSession {
    type Error = AuthError;

    fn try_from(tokens: TokenResponse) -> AuthResult<Self> {
        let expires_at = tokens
            .expires_at
            .or_else(|| tokens.expires_in.map(|secs| unix_timestamp_now().saturating_add(secs)));

        let (Some(access_token), Some(refresh_token), Some(expires_at), Some(user)) =
            (tokens.access_token, tokens.refresh_token, expires_at, tokens.user)
        else {
            return Err(AuthError::Api(
                "Auth response did not include an active session".to_owned(),
            ));
        };

        Ok(Self {
            access_token,
            refresh_token,
            expires_at,
            user,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

/// Readable message from a Supabase error response body.
///
/// Prefers the JSON message fields; otherwise the trimmed raw body, capped in
/// length. `None` for an empty body.
pub(crate) fn error_body_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ErrorBody>(body).unwrap_or_default();
    [parsed.message, parsed.msg, parsed.error_description, parsed.error]
        .into_iter()
        .flatten()
        .map(|message| message.trim().to_owned())
        .find(|message| !message.is_empty())
        .or_else(|| {
            let raw: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
            (!raw.is_empty()).then_some(raw)
        })
}
