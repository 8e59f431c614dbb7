use std::env;
use std::sync::Arc;

use siren_db_memory::{InMemoryStore, JsonFileStore};
use siren_notifications::{AlertNotifier, NoopNotifier, SmtpConfig, SmtpNotifier};
use siren_server::cache::CacheBackend;
use siren_server::config::{AppConfig, load_config};
use siren_server::{AppState, ServerBuilder};
use siren_storage::DispatchStore;

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From SIREN_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (siren.toml)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (SIREN_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist - it's optional
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    siren_server::observability::init_tracing();

    let (config_path, source) = resolve_config_path();
    let cfg = match load_config(Some(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = %config_path,
        source = %source,
        "Configuration loaded"
    );
    siren_server::observability::apply_logging_level(&cfg.logging.level);

    let store = match build_store(&cfg).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Storage initialization failed: {e}");
            std::process::exit(2);
        }
    };
    tracing::info!(backend = store.backend_name(), "Storage ready");

    let notifier = build_notifier(&cfg);
    let cache = build_cache(&cfg);

    let state = AppState::new(store, notifier, cache, &cfg);
    let server = ServerBuilder::new(state, cfg).build();

    if let Err(err) = server.run().await {
        eprintln!("Server error: {err}");
    }
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: SIREN_CONFIG
/// 3. Default: siren.toml
fn resolve_config_path() -> (String, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return (path, ConfigSource::CliArgument);
            }
        }
    }

    if let Ok(path) = env::var("SIREN_CONFIG") {
        if !path.is_empty() {
            return (path, ConfigSource::EnvironmentVariable);
        }
    }

    ("siren.toml".to_string(), ConfigSource::Default)
}

async fn build_store(
    cfg: &AppConfig,
) -> Result<Arc<dyn DispatchStore>, siren_storage::StorageError> {
    match cfg.storage.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        _ => Ok(Arc::new(JsonFileStore::open(&cfg.storage.data_dir).await?)),
    }
}

fn build_notifier(cfg: &AppConfig) -> Arc<dyn AlertNotifier> {
    match &cfg.email.smtp {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, "SMTP alerts enabled");
            Arc::new(SmtpNotifier::new(SmtpConfig {
                host: smtp.host.clone(),
                port: smtp.port,
                username: smtp.username.clone(),
                password: smtp.password.clone(),
                from_email: smtp.from_email.clone(),
            }))
        }
        None => {
            tracing::warn!("No SMTP configuration, dispatch alerts disabled");
            Arc::new(NoopNotifier)
        }
    }
}

fn build_cache(cfg: &AppConfig) -> Option<CacheBackend> {
    if !cfg.cache.enabled {
        tracing::info!("Cache disabled");
        return None;
    }
    match &cfg.redis.url {
        Some(url) => {
            let redis_cfg = deadpool_redis::Config::from_url(url);
            match redis_cfg.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
                Ok(pool) => {
                    tracing::info!("Cache enabled (redis + local L1)");
                    Some(CacheBackend::new_redis(pool))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Redis pool creation failed, using local cache");
                    Some(CacheBackend::new_local())
                }
            }
        }
        None => {
            tracing::info!("Cache enabled (local)");
            Some(CacheBackend::new_local())
        }
    }
}
