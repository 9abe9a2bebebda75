use std::env;
use std::sync::{Mutex, OnceLock};

use cotar_cli::commands::{migrate, seed};
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    // A single pooled connection keeps the in-memory database alive across
    // the migrate steps.
    with_env(
        &[("COTAR_DATABASE_URL", "sqlite::memory:"), ("COTAR_DATABASE_MAX_CONNECTIONS", "1")],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 0, "expected successful migrate run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "migrate");
            assert_eq!(payload["status"], "ok");

            let message = payload["message"].as_str().unwrap_or("");
            assert!(message.contains("migration version 1"), "unexpected message: {message}");
        },
    );
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("COTAR_DATABASE_URL", "postgres://localhost/cotar")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_loads_and_verifies_demo_dataset() {
    with_env(
        &[("COTAR_DATABASE_URL", "sqlite::memory:"), ("COTAR_DATABASE_MAX_CONNECTIONS", "1")],
        || {
            let result = seed::run();
            assert_eq!(result.exit_code, 0, "expected deterministic seed success");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "seed");
            assert_eq!(payload["status"], "ok");

            let message = payload["message"].as_str().unwrap_or("");
            assert!(message.contains("quote quote-demo-001"));
            assert!(message.contains("invitation letter letter-demo-001"));
            assert!(message.contains("demo-valid-token"));
            assert!(message.contains("demo-expired-token"));
        },
    );
}

#[test]
fn seed_is_idempotent_across_runs() {
    let db_path = env::temp_dir().join("cotar-seed-idempotency-test.db");
    let _ = std::fs::remove_file(&db_path);
    let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

    with_env(&[("COTAR_DATABASE_URL", database_url.as_str())], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["status"], "ok");

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);
        assert_eq!(second_payload["status"], "ok");

        assert_eq!(first_payload["message"], second_payload["message"]);
    });

    let _ = std::fs::remove_file(&db_path);
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "COTAR_DATABASE_URL",
        "COTAR_DATABASE_MAX_CONNECTIONS",
        "COTAR_DATABASE_TIMEOUT_SECS",
        "COTAR_SERVER_BIND_ADDRESS",
        "COTAR_SERVER_PORT",
        "COTAR_SERVER_PUBLIC_BASE_URL",
        "COTAR_ELIGIBILITY_BASE_URL",
        "COTAR_AUTH_BASE_URL",
        "COTAR_AUTH_SERVICE_KEY",
        "COTAR_CEP_BASE_URL",
        "COTAR_STORAGE_ROOT_DIR",
        "COTAR_ESCROW_ENABLED",
        "COTAR_ESCROW_BASE_URL",
        "COTAR_ESCROW_API_KEY",
        "COTAR_LOGGING_LEVEL",
        "COTAR_LOGGING_FORMAT",
        "COTAR_LOG_LEVEL",
        "COTAR_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
