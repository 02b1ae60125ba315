//! Configuration types shared across crates.

use crate::coordinate::PackageType;
use crate::organization::OrganizationTable;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Login key and token secret used when none are configured.
pub const DEFAULT_AUTH_KEY: &str = "change_me";

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:4001").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    /// SECURITY: When enabled, ensure this endpoint is network-restricted
    /// at the infrastructure level.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
    /// Compress responses when the client accepts it (default: true).
    #[serde(default = "default_true")]
    pub compression: bool,
    /// Maximum number of file writes in flight per publish.
    #[serde(default = "default_max_concurrent_writes")]
    pub max_concurrent_writes: usize,
}

fn default_bind() -> String {
    "127.0.0.1:4001".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_writes() -> usize {
    8
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: true,
            compression: true,
            max_concurrent_writes: default_max_concurrent_writes(),
        }
    }
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
    /// Process-local memory. Contents are lost on restart.
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/storage"),
        }
    }
}

/// An organization and the hostnames that route to it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrganizationConfig {
    pub name: String,
    #[serde(default)]
    pub hostnames: Vec<String>,
}

fn default_organizations() -> Vec<OrganizationConfig> {
    vec![OrganizationConfig {
        name: "local".to_string(),
        hostnames: vec!["localhost".to_string(), "127.0.0.1".to_string()],
    }]
}

/// Login and token configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared key exchanged for a token at `/auth/login`.
    #[serde(default = "default_auth_key")]
    pub key: String,
    /// HMAC secret used to sign tokens.
    #[serde(default = "default_auth_key")]
    pub secret: String,
    /// Token lifetime in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

fn default_auth_key() -> String {
    DEFAULT_AUTH_KEY.to_string()
}

fn default_token_ttl_secs() -> u64 {
    86400
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            key: default_auth_key(),
            secret: default_auth_key(),
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

impl AuthConfig {
    /// Whether the login key is still the built-in default.
    pub fn uses_default_key(&self) -> bool {
        self.key == DEFAULT_AUTH_KEY
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret == DEFAULT_AUTH_KEY
    }
}

/// Cache-Control values for mutable and negative responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Alias redirects.
    #[serde(default = "default_alias_cache_control")]
    pub alias: String,
    /// Bytes served through a `~` alias.
    #[serde(default = "default_swr_cache_control")]
    pub stale_while_revalidate: String,
    /// 404 responses.
    #[serde(default = "default_not_found_cache_control")]
    pub not_found: String,
}

fn default_alias_cache_control() -> String {
    "public, max-age=1200".to_string()
}

fn default_swr_cache_control() -> String {
    "public, max-age=60, stale-while-revalidate=86400".to_string()
}

fn default_not_found_cache_control() -> String {
    "public, max-age=5".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            alias: default_alias_cache_control(),
            stale_while_revalidate: default_swr_cache_control(),
            not_found: default_not_found_cache_control(),
        }
    }
}

/// Upload size limits in bytes, per package type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_pkg_max_file_size")]
    pub pkg_max_file_size: u64,
    #[serde(default = "default_map_max_file_size")]
    pub map_max_file_size: u64,
    #[serde(default = "default_img_max_file_size")]
    pub img_max_file_size: u64,
}

fn default_pkg_max_file_size() -> u64 {
    10_000_000
}

fn default_map_max_file_size() -> u64 {
    1_000_000
}

fn default_img_max_file_size() -> u64 {
    20_000_000
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            pkg_max_file_size: default_pkg_max_file_size(),
            map_max_file_size: default_map_max_file_size(),
            img_max_file_size: default_img_max_file_size(),
        }
    }
}

impl LimitsConfig {
    /// Limit for a package type. npm shares the pkg limit.
    pub fn max_file_size(&self, kind: PackageType) -> u64 {
        match kind {
            PackageType::Pkg | PackageType::Npm => self.pkg_max_file_size,
            PackageType::Map => self.map_max_file_size,
            PackageType::Img => self.img_max_file_size,
        }
    }

    /// Largest limit across all types.
    pub fn max_upload_size(&self) -> u64 {
        self.pkg_max_file_size
            .max(self.map_max_file_size)
            .max(self.img_max_file_size)
    }
}

/// Full application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default = "default_organizations")]
    pub organizations: Vec<OrganizationConfig>,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            organizations: default_organizations(),
            auth: AuthConfig::default(),
            cache: CacheConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.max_concurrent_writes == 0 {
            return Err("server.max_concurrent_writes must be greater than 0".to_string());
        }
        if self.organizations.is_empty() {
            return Err("at least one organization must be configured".to_string());
        }
        self.organization_table().map_err(|e| e.to_string())?;

        if self.auth.key.is_empty() {
            return Err("auth.key cannot be empty".to_string());
        }
        if self.auth.secret.is_empty() {
            return Err("auth.secret cannot be empty".to_string());
        }
        if self.auth.token_ttl_secs == 0 {
            return Err("auth.token_ttl_secs must be greater than 0".to_string());
        }

        for (field, value) in [
            ("cache.alias", &self.cache.alias),
            ("cache.stale_while_revalidate", &self.cache.stale_while_revalidate),
            ("cache.not_found", &self.cache.not_found),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} cannot be empty"));
            }
        }

        for (field, value) in [
            ("limits.pkg_max_file_size", self.limits.pkg_max_file_size),
            ("limits.map_max_file_size", self.limits.map_max_file_size),
            ("limits.img_max_file_size", self.limits.img_max_file_size),
        ] {
            if value == 0 {
                return Err(format!("{field} must be greater than 0"));
            }
        }
        Ok(())
    }

    /// Build the hostname table from the configured organizations.
    pub fn organization_table(&self) -> crate::Result<OrganizationTable> {
        OrganizationTable::new(self.organizations.iter().map(|org| {
            (
                org.name.as_str(),
                org.hostnames.iter().map(String::as_str),
            )
        }))
    }

    /// Create a test configuration backed by memory storage.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::Memory,
            organizations: default_organizations(),
            auth: AuthConfig {
                key: "test-key".to_string(),
                secret: "test-secret".to_string(),
                token_ttl_secs: 3600,
            },
            cache: CacheConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}
