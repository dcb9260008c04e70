//! 呼び出し元の認証
//!
//! Bearer トークンを ID プロバイダの公開鍵（JWKS）で検証し、`sub` クレームを
//! 呼び出し元のユーザーIDとして返す。鍵セットは注入可能な [`JwksCache`] が保持する。

use crate::config::AuthConfig;
use async_trait::async_trait;
use domain::UserId;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authorization header is missing")]
    MissingToken,

    #[error("Authorization header is not a bearer token")]
    MalformedHeader,

    #[error("No signing key found for kid {0}")]
    UnknownKey(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Failed to load signing keys: {0}")]
    KeySet(String),
}

/// 検証に使う JWT クレーム
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// トークン検証の抽象（テストではネットワークを使わない実装に差し替える）
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError>;
}

/// `Authorization` ヘッダー値から Bearer トークンを取り出す
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingToken)?;
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MalformedHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedHeader);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok(token)
}

/// 鍵セット取得回数をスライディングウィンドウで制限する
#[derive(Debug)]
pub struct RefreshLimiter {
    max_per_window: usize,
    window: Duration,
    recent: VecDeque<Instant>,
}

impl RefreshLimiter {
    pub fn new(max_per_window: u32, window: Duration) -> Self {
        Self {
            max_per_window: max_per_window as usize,
            window,
            recent: VecDeque::new(),
        }
    }

    pub fn per_minute(max: u32) -> Self {
        Self::new(max, Duration::from_secs(60))
    }

    /// 取得が許可されれば記録して `true` を返す
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        while let Some(&oldest) = self.recent.front() {
            if now.duration_since(oldest) >= self.window {
                self.recent.pop_front();
            } else {
                break;
            }
        }

        if self.recent.len() < self.max_per_window {
            self.recent.push_back(now);
            true
        } else {
            false
        }
    }
}

#[derive(Debug)]
struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

/// 署名鍵セットのキャッシュ
///
/// 未知の `kid` または期限切れの場合にのみ再取得し、取得頻度は
/// [`RefreshLimiter`] で制限する。制限中は期限切れの鍵をそのまま使う。
pub struct JwksCache {
    jwks_uri: String,
    http: reqwest::Client,
    max_age: Duration,
    state: RwLock<Option<CachedKeys>>,
    limiter: Mutex<RefreshLimiter>,
}

impl JwksCache {
    pub fn new(jwks_uri: impl Into<String>, requests_per_minute: u32, max_age: Duration) -> Self {
        Self {
            jwks_uri: jwks_uri.into(),
            http: reqwest::Client::new(),
            max_age,
            state: RwLock::new(None),
            limiter: Mutex::new(RefreshLimiter::per_minute(requests_per_minute)),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.jwks_uri.clone(),
            config.jwks_requests_per_minute,
            config.jwks_cache_ttl,
        )
    }

    /// 取得済みの鍵セットで初期化する
    pub fn with_keys(self, keys: JwkSet) -> Self {
        Self {
            state: RwLock::new(Some(CachedKeys {
                keys,
                fetched_at: Instant::now(),
            })),
            ..self
        }
    }

    pub async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        let cached = {
            let state = self.state.read().await;
            state.as_ref().map(|cached| {
                let fresh = cached.fetched_at.elapsed() < self.max_age;
                (find_key(&cached.keys, kid), fresh)
            })
        };

        match cached {
            Some((Some(key), true)) => return key,
            Some((stale, _)) if !self.limiter.lock().await.try_acquire(Instant::now()) => {
                warn!(kid, "JWKS refresh rate limited");
                return stale.unwrap_or_else(|| Err(AuthError::UnknownKey(kid.to_string())));
            }
            None if !self.limiter.lock().await.try_acquire(Instant::now()) => {
                warn!(kid, "JWKS refresh rate limited");
                return Err(AuthError::UnknownKey(kid.to_string()));
            }
            _ => {}
        }

        let keys = self.fetch().await?;
        let key = find_key(&keys, kid);
        *self.state.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });

        key.unwrap_or_else(|| Err(AuthError::UnknownKey(kid.to_string())))
    }

    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        debug!(uri = %self.jwks_uri, "fetching JWKS");
        let keys = self
            .http
            .get(&self.jwks_uri)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AuthError::KeySet(e.to_string()))?
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeySet(e.to_string()))?;

        info!(uri = %self.jwks_uri, keys = keys.keys.len(), "JWKS refreshed");
        Ok(keys)
    }
}

fn find_key(keys: &JwkSet, kid: &str) -> Option<Result<DecodingKey, AuthError>> {
    keys.find(kid).map(|jwk| {
        DecodingKey::from_jwk(jwk).map_err(|e| AuthError::KeySet(format!("unusable key {kid}: {e}")))
    })
}

/// JWKS による JWT 検証
///
/// 署名アルゴリズムは許可リスト（既定 RS256）に限定し、`aud` / `iss` / `exp` を検証する。
pub struct JwksVerifier {
    cache: Arc<JwksCache>,
    validation: Validation,
}

impl JwksVerifier {
    pub fn new(cache: Arc<JwksCache>, audience: &str, issuer: &str) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[audience]);
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);
        Self { cache, validation }
    }

    pub fn from_config(config: &AuthConfig, cache: Arc<JwksCache>) -> Self {
        Self::new(cache, &config.audience, &config.issuer)
    }
}

#[async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if !self.validation.algorithms.contains(&header.alg) {
            return Err(AuthError::InvalidToken(format!(
                "algorithm {:?} is not allowed",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token header has no kid".to_string()))?;

        let key = self.cache.decoding_key(&kid).await?;
        let data = decode::<Claims>(token, &key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        UserId::from_string(data.claims.sub)
            .map_err(|_| AuthError::InvalidToken("empty subject".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(bearer_token(Some("bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(None), Err(AuthError::MissingToken));
        assert_eq!(bearer_token(Some("Basic dXNlcg==")), Err(AuthError::MalformedHeader));
        assert_eq!(bearer_token(Some("Bearer")), Err(AuthError::MalformedHeader));
        assert_eq!(bearer_token(Some("Bearer   ")), Err(AuthError::MalformedHeader));
    }

    #[test]
    fn test_refresh_limiter_window() {
        let start = Instant::now();
        let mut limiter = RefreshLimiter::per_minute(2);

        assert!(limiter.try_acquire(start));
        assert!(limiter.try_acquire(start + Duration::from_secs(1)));
        assert!(!limiter.try_acquire(start + Duration::from_secs(30)));
        // 最初の取得から 1 分経てば枠が空く
        assert!(limiter.try_acquire(start + Duration::from_secs(60)));
        assert!(!limiter.try_acquire(start + Duration::from_secs(60)));
    }

    #[test]
    fn test_refresh_limiter_zero_never_allows() {
        let mut limiter = RefreshLimiter::per_minute(0);
        assert!(!limiter.try_acquire(Instant::now()));
    }
}
