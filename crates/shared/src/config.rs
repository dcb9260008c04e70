use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// レコードストアの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    DynamoDb,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dynamodb" => Ok(Self::DynamoDb),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => Err(()),
        }
    }
}

/// ID プロバイダ（JWT 検証）の設定
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwks_uri: String,
    pub audience: String,
    pub issuer: String,
    pub jwks_requests_per_minute: u32,
    pub jwks_cache_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub store_backend: StoreBackend,
    pub dynamodb_table: String,
    pub dynamodb_endpoint: Option<String>,
    pub aws_region: String,
    pub dynamodb_max_attempts: u32,
    pub dynamodb_page_size: Option<i32>,
    pub auth: AuthConfig,
    pub log_format: LogFormat,
    pub seed_demo_data: bool,
    pub demo_owner_id: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の取得関数から設定を組み立てる（テスト用に環境変数を差し替え可能）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let auth = AuthConfig {
            jwks_uri: required("JWKS_URI")?,
            audience: required("AUTH_AUDIENCE")?,
            issuer: required("AUTH_ISSUER")?,
            jwks_requests_per_minute: parse_or(&lookup, "JWKS_REQUESTS_PER_MINUTE", 5)?,
            jwks_cache_ttl: Duration::from_secs(parse_or(&lookup, "JWKS_CACHE_TTL_SECS", 600)?),
        };

        let seed_demo_data = parse_or(&lookup, "SEED_DEMO_DATA", false)?;
        let demo_owner_id = lookup("DEMO_OWNER_ID").filter(|id| !id.is_empty());
        if seed_demo_data && demo_owner_id.is_none() {
            return Err(ConfigError::Missing("DEMO_OWNER_ID"));
        }

        Ok(Config {
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            store_backend: parse_or(&lookup, "STORE_BACKEND", StoreBackend::DynamoDb)?,
            dynamodb_table: lookup("DYNAMODB_TABLE").unwrap_or_else(|| "todos".to_string()),
            dynamodb_endpoint: lookup("DYNAMODB_ENDPOINT"),
            aws_region: lookup("AWS_REGION").unwrap_or_else(|| "ap-northeast-1".to_string()),
            dynamodb_max_attempts: parse_or(&lookup, "DYNAMODB_MAX_ATTEMPTS", 3)?,
            dynamodb_page_size: parse_opt(&lookup, "DYNAMODB_PAGE_SIZE")?,
            auth,
            log_format: parse_or(&lookup, "LOG_FORMAT", LogFormat::Json)?,
            seed_demo_data,
            demo_owner_id,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

fn parse_opt<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(name)
        .map(|value| value.parse().map_err(|_| ConfigError::Invalid { name, value }))
        .transpose()
}
