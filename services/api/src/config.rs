use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:8443";
pub const DEFAULT_METRICS_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 300;
pub const DEFAULT_CONTEXT_CACHE_TTL_SECS: u64 = 30;
pub const DEFAULT_CONTEXT_CACHE_CAPACITY: usize = 1000;
pub const DEFAULT_DEPARTMENT_CACHE_TTL_SECS: u64 = 600;
pub const DEFAULT_DEPARTMENT_CACHE_CAPACITY: usize = 256;
pub const MIN_SESSION_SECRET_BYTES: usize = 32;

// API service configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    // HS256 secret shared with the session issuer.
    pub session_secret: String,
    pub rate_limit: RateLimitConfig,
    // Memo of resolved access per (resource, action, token suffix).
    pub context_cache: CacheConfig,
    // Department name to id resolutions.
    pub department_cache: CacheConfig,
    // Optional YAML fixture loaded into the in-memory store at startup.
    pub seed_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u32,
    // Key clients by `x-forwarded-for`/`x-real-ip`; only safe behind a proxy
    // that overwrites those headers.
    pub trust_proxy_headers: bool,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs.max(1))
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
            max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            trust_proxy_headers: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub capacity: usize,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ApiConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    session_secret: Option<String>,
    rate_limit_window_secs: Option<u64>,
    rate_limit_max_requests: Option<u32>,
    trust_proxy_headers: Option<bool>,
    context_cache_ttl_secs: Option<u64>,
    context_cache_capacity: Option<usize>,
    department_cache_ttl_secs: Option<u64>,
    department_cache_capacity: Option<usize>,
    seed_path: Option<PathBuf>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_or("TRELLIS_BIND", DEFAULT_BIND)
            .parse()
            .with_context(|| "parse TRELLIS_BIND")?;
        let metrics_bind = env_or("TRELLIS_METRICS_BIND", DEFAULT_METRICS_BIND)
            .parse()
            .with_context(|| "parse TRELLIS_METRICS_BIND")?;
        let session_secret = std::env::var("TRELLIS_SESSION_SECRET").unwrap_or_default();
        let rate_limit = RateLimitConfig {
            window_secs: env_parse(
                "TRELLIS_RATE_LIMIT_WINDOW_SECS",
                DEFAULT_RATE_LIMIT_WINDOW_SECS,
            )?,
            max_requests: env_parse(
                "TRELLIS_RATE_LIMIT_MAX_REQUESTS",
                DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            )?,
            trust_proxy_headers: env_parse("TRELLIS_TRUST_PROXY_HEADERS", false)?,
        };
        let context_cache = CacheConfig {
            ttl_secs: env_parse("TRELLIS_CONTEXT_CACHE_TTL_SECS", DEFAULT_CONTEXT_CACHE_TTL_SECS)?,
            capacity: env_parse("TRELLIS_CONTEXT_CACHE_CAPACITY", DEFAULT_CONTEXT_CACHE_CAPACITY)?,
        };
        let department_cache = CacheConfig {
            ttl_secs: env_parse(
                "TRELLIS_DEPARTMENT_CACHE_TTL_SECS",
                DEFAULT_DEPARTMENT_CACHE_TTL_SECS,
            )?,
            capacity: env_parse(
                "TRELLIS_DEPARTMENT_CACHE_CAPACITY",
                DEFAULT_DEPARTMENT_CACHE_CAPACITY,
            )?,
        };
        let seed_path = std::env::var("TRELLIS_SEED_PATH").ok().map(PathBuf::from);
        Ok(Self {
            bind_addr,
            metrics_bind,
            session_secret,
            rate_limit,
            context_cache,
            department_cache,
            seed_path,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("TRELLIS_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read TRELLIS_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: ApiConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse api config yaml")?;
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.session_secret {
            self.session_secret = value;
        }
        if let Some(value) = override_cfg.rate_limit_window_secs {
            self.rate_limit.window_secs = value;
        }
        if let Some(value) = override_cfg.rate_limit_max_requests {
            self.rate_limit.max_requests = value;
        }
        if let Some(value) = override_cfg.trust_proxy_headers {
            self.rate_limit.trust_proxy_headers = value;
        }
        if let Some(value) = override_cfg.context_cache_ttl_secs {
            self.context_cache.ttl_secs = value;
        }
        if let Some(value) = override_cfg.context_cache_capacity {
            self.context_cache.capacity = value;
        }
        if let Some(value) = override_cfg.department_cache_ttl_secs {
            self.department_cache.ttl_secs = value;
        }
        if let Some(value) = override_cfg.department_cache_capacity {
            self.department_cache.capacity = value;
        }
        if let Some(value) = override_cfg.seed_path {
            self.seed_path = Some(value);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_secret.len() < MIN_SESSION_SECRET_BYTES {
            bail!("TRELLIS_SESSION_SECRET must be at least {MIN_SESSION_SECRET_BYTES} bytes");
        }
        if self.rate_limit.max_requests == 0 {
            bail!("rate limit max_requests must be positive");
        }
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value.parse().with_context(|| format!("parse {key}")),
        Err(_) => Ok(default),
    }
}
