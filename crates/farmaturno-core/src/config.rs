use crate::app_config::{AppConfig, Environment, FetchBackend};
use crate::ConfigError;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every setting has a default, so an empty environment yields a usable
/// development config. Parsing is decoupled from the process environment so
/// tests can drive it with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("FARMATURNO_ENV", "development"));

    // An explicit bind address wins; otherwise honour a bare `PORT` the way
    // most container platforms inject it.
    let default_bind = match lookup("PORT") {
        Ok(port) => format!("0.0.0.0:{port}"),
        Err(_) => "0.0.0.0:3000".to_string(),
    };
    let bind_addr = or_default("FARMATURNO_BIND_ADDR", &default_bind)
        .parse::<SocketAddr>()
        .map_err(|e| invalid("FARMATURNO_BIND_ADDR", e.to_string()))?;

    let log_level = or_default("FARMATURNO_LOG_LEVEL", "info");
    let dataset_path = PathBuf::from(or_default("FARMATURNO_DATASET_PATH", "./farmacias.json"));
    let public_dir = PathBuf::from(or_default("FARMATURNO_PUBLIC_DIR", "./public"));

    let backend_raw = or_default("FARMATURNO_FETCH_BACKEND", "browser");
    let fetch_backend = parse_fetch_backend(&backend_raw).ok_or_else(|| {
        invalid(
            "FARMATURNO_FETCH_BACKEND",
            format!("unknown backend \"{backend_raw}\""),
        )
    })?;

    let upstream_base_url = or_default(
        "FARMATURNO_UPSTREAM_BASE_URL",
        "https://seremienlinea.minsal.cl",
    )
    .trim_end_matches('/')
    .to_string();

    let request_timeout_secs = parse_u64("FARMATURNO_REQUEST_TIMEOUT_SECS", "30")?;
    let session_timeout_secs = parse_u64("FARMATURNO_SESSION_TIMEOUT_SECS", "60")?;
    let user_agent = or_default("FARMATURNO_USER_AGENT", DEFAULT_USER_AGENT);
    let max_in_flight = parse_usize("FARMATURNO_MAX_IN_FLIGHT", "16")?.max(1);
    let max_retries = parse_u32("FARMATURNO_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("FARMATURNO_RETRY_BACKOFF_BASE_MS", "500")?;

    let schedule = or_default("FARMATURNO_SCHEDULE", "0 0 8,16 * * *");
    let tz_raw = or_default("FARMATURNO_TIMEZONE", "America/Santiago");
    let timezone = tz_raw
        .parse::<chrono_tz::Tz>()
        .map_err(|e| invalid("FARMATURNO_TIMEZONE", e.to_string()))?;

    let startup_raw = or_default("FARMATURNO_RUN_ON_STARTUP", "true");
    let run_on_startup = parse_bool(&startup_raw).ok_or_else(|| {
        invalid(
            "FARMATURNO_RUN_ON_STARTUP",
            format!("expected true/false, got \"{startup_raw}\""),
        )
    })?;

    let chrome_path = lookup("FARMATURNO_CHROME_PATH")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        dataset_path,
        public_dir,
        fetch_backend,
        upstream_base_url,
        request_timeout_secs,
        session_timeout_secs,
        user_agent,
        max_in_flight,
        max_retries,
        retry_backoff_base_ms,
        schedule,
        timezone,
        run_on_startup,
        chrome_path,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

fn parse_fetch_backend(s: &str) -> Option<FetchBackend> {
    match s.trim().to_ascii_lowercase().as_str() {
        "browser" | "chrome" | "headless" => Some(FetchBackend::Browser),
        "direct" | "http" => Some(FetchBackend::Direct),
        _ => None,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
