use std::env;

use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deployment {
    Local,
    Dev,
    Stage,
    Prod,
}

impl Deployment {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Self::Dev,
            "stage" | "staging" => Self::Stage,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

/// Which repository implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl StorageBackend {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" => Self::Memory,
            _ => Self::Postgres,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub storage_backend: StorageBackend,
    pub database_url: String,
    pub run_migrations: bool,

    // API settings
    pub api_host: String,
    pub api_port: u16,
    pub request_body_limit_bytes: usize,
    pub flat_error_status: bool,

    // Identity verification
    pub auth_verify_url: Option<String>,
    pub auth_cache_ttl_seconds: u64,
    pub auth_cache_max_entries: u64,
    pub auth_public_paths: Vec<String>,

    // Rate limiting
    pub disable_rate_limiting: bool,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,

    // Application metadata
    pub deployment: Deployment,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if required environment variables are not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        if dotenvy::dotenv().is_err() {
            tracing::debug!("No .env file found");
        }
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if required variables are absent, or
    /// `ConfigError::Invalid` if the `DB_*` parts do not form a URL.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_or = |key: &str, default: &str| -> String {
            var(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let storage_backend = StorageBackend::from_str(&parse_or("STORAGE_BACKEND", "postgres"));
        let database_url = match storage_backend {
            StorageBackend::Postgres => database_url(&var)?,
            StorageBackend::Memory => var("DATABASE_URL").unwrap_or_default(),
        };

        Ok(Self {
            // Storage
            storage_backend,
            database_url,
            run_migrations: parse_or("RUN_MIGRATIONS", "true").parse().unwrap_or(true),

            // API settings
            api_host: parse_or("API_HOST", "0.0.0.0"),
            api_port: var("API_PORT")
                .or_else(|| var("PORT"))
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(3000),
            request_body_limit_bytes: parse_or("REQUEST_BODY_LIMIT_BYTES", "1048576")
                .parse()
                .unwrap_or(1024 * 1024), // 1MB default
            flat_error_status: parse_or("FLAT_ERROR_STATUS", "false")
                .parse()
                .unwrap_or(false),

            // Identity verification
            auth_verify_url: var("AUTH_VERIFY_URL").filter(|v| !v.trim().is_empty()),
            auth_cache_ttl_seconds: parse_or("AUTH_CACHE_TTL_SECONDS", "300")
                .parse()
                .unwrap_or(300),
            auth_cache_max_entries: parse_or("AUTH_CACHE_MAX_ENTRIES", "10000")
                .parse()
                .unwrap_or(10_000),
            auth_public_paths: parse_or("AUTH_PUBLIC_PATHS", "/hc")
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(ToString::to_string)
                .collect(),

            // Rate limiting
            disable_rate_limiting: parse_or("DISABLE_RATE_LIMITING", "false")
                .parse()
                .unwrap_or(false),
            rate_limit_per_second: parse_or("RATE_LIMIT_PER_SECOND", "10")
                .parse()
                .unwrap_or(10),
            rate_limit_burst: parse_or("RATE_LIMIT_BURST", "100")
                .parse()
                .unwrap_or(100),

            // Application metadata
            deployment: Deployment::from_str(&parse_or("DEPLOYMENT", "local")),
        })
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

/// `DATABASE_URL` wins; otherwise the URL is assembled from the `DB_*` parts.
fn database_url<F>(var: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = var("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
        return Ok(url);
    }

    let host = var("DB_HOST").ok_or(ConfigError::Missing("DATABASE_URL or DB_HOST"))?;
    let user = var("DB_USER").ok_or(ConfigError::Missing("DB_USER"))?;
    let name = var("DB_NAME").ok_or(ConfigError::Missing("DB_NAME"))?;
    let port = var("DB_PORT").unwrap_or_else(|| "5432".to_string());

    let mut url = Url::parse(&format!("postgres://{host}:{port}"))
        .map_err(|e| ConfigError::Invalid("DB_HOST or DB_PORT", e.to_string()))?;
    // Url leaves '%' alone in userinfo; escape it so the driver decodes it back.
    url.set_username(&user.replace('%', "%25"))
        .map_err(|()| ConfigError::Invalid("DB_USER", "cannot carry credentials".to_string()))?;
    if let Some(pass) = var("DB_PASS").filter(|p| !p.is_empty()) {
        url.set_password(Some(&pass.replace('%', "%25")))
            .map_err(|()| ConfigError::Invalid("DB_PASS", "cannot carry credentials".to_string()))?;
    }
    url.path_segments_mut()
        .map_err(|()| ConfigError::Invalid("DB_NAME", "cannot set database name".to_string()))?
        .push(&name);

    Ok(url.into())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
