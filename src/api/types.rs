//! Shared types for the API layer: context, token store, JSON extractor.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::config::ServerConfig;
use crate::core_state::CoreState;

/// Expired entries are swept once the store grows past this size.
const CLEANUP_THRESHOLD: usize = 1000;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
/// Wraps `CoreState` plus the in-memory token store.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub tokens: Arc<Mutex<TokenStore>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            core,
            tokens: Arc::new(Mutex::new(TokenStore::new(access_ttl, refresh_ttl))),
        }
    }

    pub fn from_config(core: Arc<CoreState>, config: &ServerConfig) -> Self {
        Self::new(core, config.access_token_ttl, config.refresh_token_ttl)
    }

    pub fn lock_tokens(&self) -> Result<MutexGuard<'_, TokenStore>, ApiError> {
        self.tokens
            .lock()
            .map_err(|_| ApiError::Internal("token store lock poisoned".into()))
    }
}

// ═══════════════════════════════════════════════════════════
// Token store: opaque bearer tokens, hashed at rest
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
struct TokenEntry {
    account_id: i64,
    expires_at: Instant,
}

impl TokenEntry {
    fn live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// `{access, refresh}` pair returned by the token endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Access and refresh tokens keyed by their SHA-256 hash.
/// The plaintext is only ever held by the client.
pub struct TokenStore {
    access: HashMap<[u8; 32], TokenEntry>,
    refresh: HashMap<[u8; 32], TokenEntry>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenStore {
    pub fn new(access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            access: HashMap::new(),
            refresh: HashMap::new(),
            access_ttl,
            refresh_ttl,
        }
    }

    fn insert(map: &mut HashMap<[u8; 32], TokenEntry>, account_id: i64, ttl: Duration) -> String {
        let token = generate_token();
        map.insert(
            hash_token(&token),
            TokenEntry {
                account_id,
                expires_at: Instant::now() + ttl,
            },
        );
        token
    }

    fn cleanup_if_full(&mut self) {
        if self.len() > CLEANUP_THRESHOLD {
            self.cleanup();
        }
    }

    /// Issue a fresh access + refresh pair for an authenticated account.
    pub fn issue_pair(&mut self, account_id: i64) -> TokenPair {
        self.cleanup_if_full();
        TokenPair {
            access: Self::insert(&mut self.access, account_id, self.access_ttl),
            refresh: Self::insert(&mut self.refresh, account_id, self.refresh_ttl),
        }
    }

    /// Exchange a live refresh token for a new access token.
    pub fn refresh(&mut self, refresh_token: &str) -> Option<String> {
        let entry = self.refresh.get(&hash_token(refresh_token)).copied()?;
        if !entry.live(Instant::now()) {
            self.refresh.remove(&hash_token(refresh_token));
            return None;
        }
        self.cleanup_if_full();
        Some(Self::insert(&mut self.access, entry.account_id, self.access_ttl))
    }

    /// Account id behind a live access token.
    pub fn validate_access(&self, token: &str) -> Option<i64> {
        self.access
            .get(&hash_token(token))
            .filter(|entry| entry.live(Instant::now()))
            .map(|entry| entry.account_id)
    }

    /// Drop every token issued to `account_id`.
    pub fn revoke_account(&mut self, account_id: i64) {
        self.access.retain(|_, e| e.account_id != account_id);
        self.refresh.retain(|_, e| e.account_id != account_id);
    }

    pub fn cleanup(&mut self) {
        let now = Instant::now();
        self.access.retain(|_, e| e.live(now));
        self.refresh.retain(|_, e| e.live(now));
    }

    pub fn len(&self) -> usize {
        self.access.len() + self.refresh.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

// ═══════════════════════════════════════════════════════════
// JSON bodies
// ═══════════════════════════════════════════════════════════

/// `axum::Json` with rejections rendered as a 400 `ApiError`.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(format!("Malformed request body: {}", rejection.body_text()))
}

/// Parse an optional JSON body. An empty body yields `T::default()`.
pub fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Malformed request body: {e}")))
}
