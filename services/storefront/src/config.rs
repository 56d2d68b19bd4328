//! Storefront service configuration.
//!
//! # Purpose
//! Sources configuration from `HAUNT_*` environment variables with an
//! optional YAML override file (`HAUNT_CONFIG`). Defaults favor local
//! development: in-memory storage, live DNS verification against public
//! resolvers.
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_PLATFORM_SUFFIX: &str = "haunt.site";
pub const DEFAULT_CNAME_TARGET: &str = "storefronts.haunt.site";
const DEFAULT_DNS_RESOLVERS: &str = "1.1.1.1,8.8.8.8";
const DEFAULT_DNS_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

/// How the DNS verifier is wired.
///
/// `AcceptAll` exists for test and demo environments only and is never the
/// default; selecting it logs a warning at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsMode {
    Live,
    AcceptAll,
}

/// Whether slug-based public resolution stays available once a tenant has a
/// verified custom domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugFallback {
    Always,
    UntilCustomDomain,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_ms: u64,
    pub acquire_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    pub platform_suffix: String,
    pub cname_target: String,
    pub token_secret: String,
    pub dns_mode: DnsMode,
    pub dns_timeout: Duration,
    pub dns_resolvers: Vec<IpAddr>,
    pub verify_cooldown: Duration,
    pub slug_fallback: SlugFallback,
}

#[derive(Debug, Deserialize)]
struct StorefrontConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<String>,
    postgres: Option<PostgresConfig>,
    platform_suffix: Option<String>,
    cname_target: Option<String>,
    token_secret: Option<String>,
    dns_mode: Option<String>,
    dns_timeout_ms: Option<u64>,
    dns_resolvers: Option<Vec<String>>,
    verify_cooldown_seconds: Option<u64>,
    slug_fallback: Option<String>,
}

impl StorefrontConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("HAUNT_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8443".to_string())
            .parse()
            .with_context(|| "parse HAUNT_BIND")?;
        let metrics_bind = std::env::var("HAUNT_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse HAUNT_METRICS_BIND")?;
        let storage = parse_storage(
            &std::env::var("HAUNT_STORAGE").unwrap_or_else(|_| "memory".to_string()),
        )?;
        let postgres = match std::env::var("HAUNT_POSTGRES_URL") {
            Ok(url) => Some(PostgresConfig {
                url,
                max_connections: env_u64("HAUNT_POSTGRES_MAX_CONNECTIONS", 10)? as u32,
                connect_timeout_ms: env_u64("HAUNT_POSTGRES_CONNECT_TIMEOUT_MS", 5000)?,
                acquire_timeout_ms: env_u64("HAUNT_POSTGRES_ACQUIRE_TIMEOUT_MS", 5000)?,
            }),
            Err(_) => None,
        };
        let platform_suffix = std::env::var("HAUNT_PLATFORM_SUFFIX")
            .unwrap_or_else(|_| DEFAULT_PLATFORM_SUFFIX.to_string());
        let cname_target =
            std::env::var("HAUNT_CNAME_TARGET").unwrap_or_else(|_| DEFAULT_CNAME_TARGET.to_string());
        let token_secret = std::env::var("HAUNT_TOKEN_SECRET")
            .unwrap_or_else(|_| "haunt-dev-token-secret".to_string());
        let dns_mode =
            parse_dns_mode(&std::env::var("HAUNT_DNS_MODE").unwrap_or_else(|_| "live".to_string()))?;
        let dns_timeout =
            Duration::from_millis(env_u64("HAUNT_DNS_TIMEOUT_MS", DEFAULT_DNS_TIMEOUT_MS)?);
        let dns_resolvers = parse_resolvers(
            &std::env::var("HAUNT_DNS_RESOLVERS")
                .unwrap_or_else(|_| DEFAULT_DNS_RESOLVERS.to_string()),
        )?;
        let verify_cooldown =
            Duration::from_secs(env_u64("HAUNT_VERIFY_COOLDOWN_SECONDS", 0)?);
        let slug_fallback = parse_slug_fallback(
            &std::env::var("HAUNT_SLUG_FALLBACK").unwrap_or_else(|_| "always".to_string()),
        )?;

        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            platform_suffix,
            cname_target,
            token_secret,
            dns_mode,
            dns_timeout,
            dns_resolvers,
            verify_cooldown,
            slug_fallback,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("HAUNT_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read HAUNT_CONFIG: {path}"))?;
            let override_cfg: StorefrontConfigOverride = serde_yaml::from_str(&contents)
                .with_context(|| "parse storefront config yaml")?;
            if let Some(value) = override_cfg.bind_addr {
                config.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
            }
            if let Some(value) = override_cfg.metrics_bind {
                config.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
            }
            if let Some(value) = override_cfg.storage {
                config.storage = parse_storage(&value)?;
            }
            if let Some(value) = override_cfg.postgres {
                config.postgres = Some(value);
            }
            if let Some(value) = override_cfg.platform_suffix {
                config.platform_suffix = value;
            }
            if let Some(value) = override_cfg.cname_target {
                config.cname_target = value;
            }
            if let Some(value) = override_cfg.token_secret {
                config.token_secret = value;
            }
            if let Some(value) = override_cfg.dns_mode {
                config.dns_mode = parse_dns_mode(&value)?;
            }
            if let Some(value) = override_cfg.dns_timeout_ms {
                config.dns_timeout = Duration::from_millis(value);
            }
            if let Some(values) = override_cfg.dns_resolvers {
                config.dns_resolvers = parse_resolvers(&values.join(","))?;
            }
            if let Some(value) = override_cfg.verify_cooldown_seconds {
                config.verify_cooldown = Duration::from_secs(value);
            }
            if let Some(value) = override_cfg.slug_fallback {
                config.slug_fallback = parse_slug_fallback(&value)?;
            }
        }
        Ok(config)
    }
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(value) => value.parse().with_context(|| format!("parse {key}")),
        Err(_) => Ok(default),
    }
}

fn parse_storage(value: &str) -> Result<StorageBackend> {
    match value {
        "memory" => Ok(StorageBackend::Memory),
        "postgres" => Ok(StorageBackend::Postgres),
        other => bail!("unknown storage backend: {other}"),
    }
}

fn parse_dns_mode(value: &str) -> Result<DnsMode> {
    match value {
        "live" => Ok(DnsMode::Live),
        "accept-all" => Ok(DnsMode::AcceptAll),
        other => bail!("unknown dns mode: {other}"),
    }
}

fn parse_slug_fallback(value: &str) -> Result<SlugFallback> {
    match value {
        "always" => Ok(SlugFallback::Always),
        "until-custom-domain" => Ok(SlugFallback::UntilCustomDomain),
        other => bail!("unknown slug fallback policy: {other}"),
    }
}

fn parse_resolvers(value: &str) -> Result<Vec<IpAddr>> {
    let resolvers: Vec<IpAddr> = value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse()
                .with_context(|| format!("parse resolver address: {entry}"))
        })
        .collect::<Result<_>>()?;
    if resolvers.is_empty() {
        bail!("at least one DNS resolver is required");
    }
    Ok(resolvers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvGuard {
        key: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let prev = std::env::var(key).ok();
            unsafe {
                std::env::set_var(key, value);
            }
            Self { key, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.prev {
                Some(value) => unsafe {
                    std::env::set_var(self.key, value);
                },
                None => unsafe {
                    std::env::remove_var(self.key);
                },
            }
        }
    }

    #[test]
    #[serial]
    fn defaults_are_sensible() {
        let config = StorefrontConfig::from_env().expect("config");
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.dns_mode, DnsMode::Live);
        assert_eq!(config.slug_fallback, SlugFallback::Always);
        assert_eq!(config.platform_suffix, DEFAULT_PLATFORM_SUFFIX);
        assert_eq!(config.dns_resolvers.len(), 2);
        assert!(config.verify_cooldown.is_zero());
    }

    #[test]
    #[serial]
    fn env_overrides_apply() {
        let _g1 = EnvGuard::set("HAUNT_DNS_MODE", "accept-all");
        let _g2 = EnvGuard::set("HAUNT_SLUG_FALLBACK", "until-custom-domain");
        let _g3 = EnvGuard::set("HAUNT_DNS_RESOLVERS", "9.9.9.9");
        let _g4 = EnvGuard::set("HAUNT_VERIFY_COOLDOWN_SECONDS", "30");
        let config = StorefrontConfig::from_env().expect("config");
        assert_eq!(config.dns_mode, DnsMode::AcceptAll);
        assert_eq!(config.slug_fallback, SlugFallback::UntilCustomDomain);
        assert_eq!(config.dns_resolvers, vec!["9.9.9.9".parse::<IpAddr>().unwrap()]);
        assert_eq!(config.verify_cooldown, Duration::from_secs(30));
    }

    #[test]
    #[serial]
    fn rejects_unknown_modes() {
        let _guard = EnvGuard::set("HAUNT_DNS_MODE", "sometimes");
        assert!(StorefrontConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn yaml_override_wins_over_env() {
        let dir = std::env::temp_dir().join(format!("haunt-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("tmp dir");
        let path = dir.join("storefront.yaml");
        std::fs::write(
            &path,
            "platform_suffix: ghosts.example\ndns_timeout_ms: 1500\n",
        )
        .expect("write yaml");
        let _guard = EnvGuard::set("HAUNT_CONFIG", path.to_str().expect("utf8 path"));
        let config = StorefrontConfig::from_env_or_yaml().expect("config");
        assert_eq!(config.platform_suffix, "ghosts.example");
        assert_eq!(config.dns_timeout, Duration::from_millis(1500));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
