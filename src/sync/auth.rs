use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

use crate::storage::config::Config;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to read token file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse token: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Not signed in")]
    NotSignedIn,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Server rejected the access token")]
    Unauthorized,
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserIdentity {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl UserIdentity {
    pub fn display(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.uid)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenInfo {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub token_type: String,
    pub user: UserIdentity,
}

impl TokenInfo {
    pub fn new(access_token: String, expires_in_seconds: i64, user: UserIdentity) -> Self {
        Self {
            access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in_seconds),
            token_type: "Bearer".to_string(),
            user,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.expires_at > Utc::now()
    }
}

pub struct TokenStorage {
    path: PathBuf,
}

impl TokenStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn save_token(&self, token: &TokenInfo) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(token)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn load_token(&self) -> Result<TokenInfo, AuthError> {
        let content = std::fs::read_to_string(&self.path)?;
        let token: TokenInfo = serde_json::from_str(&content)?;
        Ok(token)
    }

    pub fn clear(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_expired(&self, token: &TokenInfo) -> bool {
        token.expires_at <= Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthState {
    pub signed_in: bool,
    pub user: Option<UserIdentity>,
}

impl AuthState {
    fn from_token(token: Option<&TokenInfo>) -> Self {
        match token {
            Some(token) => Self {
                signed_in: true,
                user: Some(token.user.clone()),
            },
            None => Self::default(),
        }
    }
}

/// Identity plus a bearer-authenticated call primitive.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    fn current_user(&self) -> Option<UserIdentity>;

    fn subscribe(&self) -> watch::Receiver<AuthState>;

    /// Sends `method path` with the current bearer token and returns the raw body.
    async fn call_with_token(
        &self,
        path: &str,
        method: Method,
        body: Option<serde_json::Value>,
    ) -> Result<String, AuthError>;
}

pub struct BearerAuthProvider {
    base_url: String,
    client: reqwest::Client,
    storage: TokenStorage,
    token: RwLock<Option<TokenInfo>>,
    state: watch::Sender<AuthState>,
}

impl BearerAuthProvider {
    pub fn new(base_url: String, storage: TokenStorage, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let token = match storage.load_token() {
            Ok(token) if !storage.is_expired(&token) => Some(token),
            Ok(_) => {
                tracing::info!("Cached token has expired");
                None
            }
            Err(_) => None,
        };

        let (state, _) = watch::channel(AuthState::from_token(token.as_ref()));

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            storage,
            token: RwLock::new(token),
            state,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AuthError> {
        Self::new(
            config.api.base_url.clone(),
            TokenStorage::new(config.auth.token_cache.clone()),
            Duration::from_secs(config.api.timeout_secs),
        )
    }

    pub fn is_signed_in(&self) -> bool {
        self.state.borrow().signed_in
    }

    pub fn sign_in(&self, token: TokenInfo) -> Result<(), AuthError> {
        self.storage.save_token(&token)?;
        tracing::info!("Signed in as {}", token.user.display());
        self.replace_token(Some(token));
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), AuthError> {
        self.storage.clear()?;
        tracing::info!("Signed out");
        self.replace_token(None);
        Ok(())
    }

    fn replace_token(&self, token: Option<TokenInfo>) {
        let state = AuthState::from_token(token.as_ref());
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
        self.state.send_replace(state);
    }

    fn valid_token(&self) -> Result<TokenInfo, AuthError> {
        let token = match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        match token {
            Some(token) if token.is_valid() => Ok(token),
            Some(_) => {
                self.replace_token(None);
                Err(AuthError::TokenExpired)
            }
            None => Err(AuthError::NotSignedIn),
        }
    }
}

#[async_trait]
impl AuthProvider for BearerAuthProvider {
    fn current_user(&self) -> Option<UserIdentity> {
        self.state.borrow().user.clone()
    }

    fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    async fn call_with_token(
        &self,
        path: &str,
        method: Method,
        body: Option<serde_json::Value>,
    ) -> Result<String, AuthError> {
        let token = self.valid_token()?;
        let url = format!("{}{}", self.base_url, path);

        tracing::debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(&token.access_token);
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == 401 {
            tracing::error!("Access token rejected on {} {}", method, path);
            self.replace_token(None);
            return Err(AuthError::Unauthorized);
        }

        let text = response.text().await?;

        if !status.is_success() {
            tracing::error!("{} {} failed. Status: {}, Body: {}", method, path, status, text);
            return Err(AuthError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }
}
