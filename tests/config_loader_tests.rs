use statuspage::config::{ConfigError, ConfigLoader};
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    for key in [
        "STATUSPAGE_PROFILE",
        "STATUSPAGE_API_BIND_ADDR",
        "STATUSPAGE_LOG_LEVEL",
        "STATUSPAGE_DATABASE_URL",
        "STATUSPAGE_WEBHOOK_SIGNING_SECRET",
        "STATUSPAGE_AUTH_JWT_PUBLIC_KEY",
        "STATUSPAGE_CORS_ALLOWED_ORIGINS",
        "STATUSPAGE_DB_MAX_CONNECTIONS",
    ] {
        unsafe {
            env::remove_var(key);
        }
    }
}

fn set_required_env() {
    unsafe {
        env::set_var("STATUSPAGE_DATABASE_URL", "sqlite::memory:");
        env::set_var("STATUSPAGE_WEBHOOK_SIGNING_SECRET", SECRET);
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

#[test]
fn loads_defaults_when_only_required_values_present() {
    let _guard = env_guard();
    clear_env();
    set_required_env();

    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8000");
    assert_eq!(cfg.log_level, "info");
    assert!(cfg.run_migrations);
    assert_eq!(cfg.webhook_tolerance_seconds, 300);
    assert!(cfg.cors_allowed_origins.is_empty());
    cfg.bind_addr().expect("default bind addr parses");
    clear_env();
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        &format!(
            "STATUSPAGE_API_BIND_ADDR=127.0.0.1:3000\nSTATUSPAGE_DATABASE_URL=sqlite::memory:\nSTATUSPAGE_WEBHOOK_SIGNING_SECRET={SECRET}\n"
        ),
    );
    write_env_file(
        &temp_dir,
        ".env.test",
        "STATUSPAGE_API_BIND_ADDR=192.168.0.10:5000\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "STATUSPAGE_API_BIND_ADDR=10.0.0.5:6000\n",
    );

    // Select profile via .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        "STATUSPAGE_PROFILE=test\nSTATUSPAGE_API_BIND_ADDR=127.0.0.1:4000\n",
    );

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    clear_env();
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();
    set_required_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "STATUSPAGE_API_BIND_ADDR=127.0.0.1:3000\nSTATUSPAGE_CORS_ALLOWED_ORIGINS=https://a.example\n",
    );

    unsafe {
        env::set_var("STATUSPAGE_API_BIND_ADDR", "0.0.0.0:9090");
        env::set_var(
            "STATUSPAGE_CORS_ALLOWED_ORIGINS",
            "https://status.example, https://admin.example,",
        );
    }

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with env override");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:9090");
    assert_eq!(
        cfg.cors_allowed_origins,
        vec!["https://status.example", "https://admin.example"]
    );

    clear_env();
}

#[test]
fn invalid_bind_addr_returns_error() {
    let _guard = env_guard();
    clear_env();
    set_required_env();

    unsafe {
        env::set_var("STATUSPAGE_API_BIND_ADDR", "not-an-addr");
    }
    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let err = loader.load().expect_err("invalid bind addr should fail");
    assert!(format!("{}", err).contains("invalid api bind address"));

    clear_env();
}

#[test]
fn missing_required_settings_are_fatal() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));

    let err = loader.load().expect_err("database url is required");
    assert!(matches!(err, ConfigError::MissingDatabaseUrl));

    unsafe {
        env::set_var("STATUSPAGE_DATABASE_URL", "sqlite::memory:");
    }
    let err = loader.load().expect_err("webhook secret is required");
    assert!(matches!(err, ConfigError::MissingWebhookSigningSecret));

    unsafe {
        env::set_var("STATUSPAGE_WEBHOOK_SIGNING_SECRET", SECRET);
        env::set_var("STATUSPAGE_PROFILE", "prod");
    }
    let err = loader.load().expect_err("prod needs a session key");
    assert!(matches!(err, ConfigError::MissingJwtPublicKey { .. }));

    clear_env();
}

#[test]
fn malformed_numbers_are_reported_by_key() {
    let _guard = env_guard();
    clear_env();
    set_required_env();

    unsafe {
        env::set_var("STATUSPAGE_DB_MAX_CONNECTIONS", "lots");
    }
    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let err = loader.load().expect_err("non-numeric pool size should fail");
    assert!(matches!(
        err,
        ConfigError::InvalidValue {
            key: "DB_MAX_CONNECTIONS",
            ..
        }
    ));

    clear_env();
}
