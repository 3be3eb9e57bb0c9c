use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

fn config_with(pairs: &[(&'static str, &'static str)]) -> Result<AppConfig, ConfigError> {
    let map: HashMap<&str, &str> = pairs.iter().copied().collect();
    build_app_config(lookup_from_map(&map))
}

#[test]
fn parse_environment_production() {
    assert_eq!(parse_environment("production"), Environment::Production);
}

#[test]
fn parse_environment_unknown_defaults_to_development() {
    assert_eq!(parse_environment("staging"), Environment::Development);
}

#[test]
fn build_app_config_defaults_from_empty_env() {
    let cfg = config_with(&[]).expect("empty env should use defaults");
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3000");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.dataset_path.to_str(), Some("./farmacias.json"));
    assert_eq!(cfg.public_dir.to_str(), Some("./public"));
    assert_eq!(cfg.fetch_backend, FetchBackend::Browser);
    assert_eq!(cfg.upstream_base_url, "https://seremienlinea.minsal.cl");
    assert_eq!(cfg.request_timeout_secs, 30);
    assert_eq!(cfg.session_timeout_secs, 60);
    assert_eq!(cfg.max_in_flight, 16);
    assert_eq!(cfg.max_retries, 2);
    assert_eq!(cfg.retry_backoff_base_ms, 500);
    assert_eq!(cfg.schedule, "0 0 8,16 * * *");
    assert_eq!(cfg.timezone, chrono_tz::America::Santiago);
    assert!(cfg.run_on_startup);
    assert!(cfg.chrome_path.is_none());
}

#[test]
fn port_overrides_default_bind_port() {
    let cfg = config_with(&[("PORT", "8080")]).unwrap();
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:8080");
}

#[test]
fn explicit_bind_addr_wins_over_port() {
    let cfg = config_with(&[("PORT", "8080"), ("FARMATURNO_BIND_ADDR", "127.0.0.1:9000")]).unwrap();
    assert_eq!(cfg.bind_addr.to_string(), "127.0.0.1:9000");
}

#[test]
fn build_app_config_fails_with_invalid_bind_addr() {
    let result = config_with(&[("FARMATURNO_BIND_ADDR", "not-a-socket-addr")]);
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "FARMATURNO_BIND_ADDR"),
        "expected InvalidEnvVar(FARMATURNO_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn fetch_backend_direct_is_accepted() {
    let cfg = config_with(&[("FARMATURNO_FETCH_BACKEND", "Direct")]).unwrap();
    assert_eq!(cfg.fetch_backend, FetchBackend::Direct);
}

#[test]
fn fetch_backend_unknown_is_rejected() {
    let result = config_with(&[("FARMATURNO_FETCH_BACKEND", "carrier-pigeon")]);
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "FARMATURNO_FETCH_BACKEND"),
        "expected InvalidEnvVar(FARMATURNO_FETCH_BACKEND), got: {result:?}"
    );
}

#[test]
fn upstream_base_url_trailing_slash_is_trimmed() {
    let cfg = config_with(&[("FARMATURNO_UPSTREAM_BASE_URL", "http://127.0.0.1:4000/")]).unwrap();
    assert_eq!(cfg.upstream_base_url, "http://127.0.0.1:4000");
}

#[test]
fn max_in_flight_zero_is_clamped_to_one() {
    let cfg = config_with(&[("FARMATURNO_MAX_IN_FLIGHT", "0")]).unwrap();
    assert_eq!(cfg.max_in_flight, 1);
}

#[test]
fn max_in_flight_invalid() {
    let result = config_with(&[("FARMATURNO_MAX_IN_FLIGHT", "lots")]);
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "FARMATURNO_MAX_IN_FLIGHT"),
        "expected InvalidEnvVar(FARMATURNO_MAX_IN_FLIGHT), got: {result:?}"
    );
}

#[test]
fn request_timeout_override() {
    let cfg = config_with(&[("FARMATURNO_REQUEST_TIMEOUT_SECS", "5")]).unwrap();
    assert_eq!(cfg.request_timeout_secs, 5);
}

#[test]
fn request_timeout_invalid() {
    let result = config_with(&[("FARMATURNO_REQUEST_TIMEOUT_SECS", "-1")]);
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "FARMATURNO_REQUEST_TIMEOUT_SECS"),
        "expected InvalidEnvVar(FARMATURNO_REQUEST_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn timezone_override() {
    let cfg = config_with(&[("FARMATURNO_TIMEZONE", "UTC")]).unwrap();
    assert_eq!(cfg.timezone, chrono_tz::UTC);
}

#[test]
fn timezone_invalid() {
    let result = config_with(&[("FARMATURNO_TIMEZONE", "Mars/Olympus_Mons")]);
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "FARMATURNO_TIMEZONE"),
        "expected InvalidEnvVar(FARMATURNO_TIMEZONE), got: {result:?}"
    );
}

#[test]
fn run_on_startup_accepts_false() {
    let cfg = config_with(&[("FARMATURNO_RUN_ON_STARTUP", "false")]).unwrap();
    assert!(!cfg.run_on_startup);
}

#[test]
fn run_on_startup_rejects_garbage() {
    let result = config_with(&[("FARMATURNO_RUN_ON_STARTUP", "maybe")]);
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "FARMATURNO_RUN_ON_STARTUP"),
        "expected InvalidEnvVar(FARMATURNO_RUN_ON_STARTUP), got: {result:?}"
    );
}

#[test]
fn blank_chrome_path_is_ignored() {
    let cfg = config_with(&[("FARMATURNO_CHROME_PATH", "  ")]).unwrap();
    assert!(cfg.chrome_path.is_none());

    let cfg = config_with(&[("FARMATURNO_CHROME_PATH", "/usr/bin/chromium")]).unwrap();
    assert_eq!(
        cfg.chrome_path.as_deref().and_then(|p| p.to_str()),
        Some("/usr/bin/chromium")
    );
}
