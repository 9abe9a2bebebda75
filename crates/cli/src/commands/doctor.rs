use cotar_core::config::{AppConfig, LoadOptions};
use cotar_db::connect_with_settings;
use secrecy::ExposeSecret;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_auth_service_key(&config));
            checks.push(check_storage_root(&config));
            checks.push(check_escrow_configuration(&config));
            checks.push(check_database_connectivity(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in [
                "auth_service_key_readiness",
                "storage_root",
                "escrow_configuration",
                "database_connectivity",
            ] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_ready =
        checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if all_ready { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_ready {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_auth_service_key(config: &AppConfig) -> DoctorCheck {
    if config.auth.service_key.expose_secret().trim().is_empty() {
        DoctorCheck {
            name: "auth_service_key_readiness",
            status: CheckStatus::Fail,
            details: "auth.service_key is empty; supplier sessions will fall back to manual login"
                .to_string(),
        }
    } else {
        DoctorCheck {
            name: "auth_service_key_readiness",
            status: CheckStatus::Pass,
            details: "service key present for session provisioning".to_string(),
        }
    }
}

fn check_storage_root(config: &AppConfig) -> DoctorCheck {
    let root = &config.storage.root_dir;

    if root.exists() {
        if root.is_dir() {
            DoctorCheck {
                name: "storage_root",
                status: CheckStatus::Pass,
                details: format!("attachment root `{}` exists", root.display()),
            }
        } else {
            DoctorCheck {
                name: "storage_root",
                status: CheckStatus::Fail,
                details: format!("attachment root `{}` is not a directory", root.display()),
            }
        }
    } else {
        match std::fs::create_dir_all(root) {
            Ok(()) => DoctorCheck {
                name: "storage_root",
                status: CheckStatus::Pass,
                details: format!("created attachment root `{}`", root.display()),
            },
            Err(error) => DoctorCheck {
                name: "storage_root",
                status: CheckStatus::Fail,
                details: format!(
                    "could not create attachment root `{}`: {error}",
                    root.display()
                ),
            },
        }
    }
}

fn check_escrow_configuration(config: &AppConfig) -> DoctorCheck {
    if !config.escrow.enabled {
        return DoctorCheck {
            name: "escrow_configuration",
            status: CheckStatus::Skipped,
            details: "escrow integration disabled; admin balance and release routes return 503"
                .to_string(),
        };
    }

    // Endpoint and key presence are enforced by config validation when enabled.
    let base_url = config.escrow.base_url.as_deref().unwrap_or("<unset>");
    DoctorCheck {
        name: "escrow_configuration",
        status: CheckStatus::Pass,
        details: format!("escrow gateway configured at `{base_url}`"),
    }
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

        pool.close().await;
        Ok::<(), String>(())
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        },
        Err(error) => {
            DoctorCheck { name: "database_connectivity", status: CheckStatus::Fail, details: error }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::{render_human, CheckStatus, DoctorCheck, DoctorReport};

    #[test]
    fn human_rendering_marks_each_status() {
        let report = DoctorReport {
            overall_status: CheckStatus::Fail,
            summary: "doctor: one or more readiness checks failed".to_string(),
            checks: vec![
                DoctorCheck {
                    name: "config_validation",
                    status: CheckStatus::Pass,
                    details: "configuration loaded and validated".to_string(),
                },
                DoctorCheck {
                    name: "escrow_configuration",
                    status: CheckStatus::Skipped,
                    details: "escrow integration disabled".to_string(),
                },
                DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: "failed to connect to database: pool timed out".to_string(),
                },
            ],
        };

        let rendered = render_human(&report);

        assert!(rendered.starts_with("doctor: one or more readiness checks failed"));
        assert!(rendered.contains("- [ok] config_validation:"));
        assert!(rendered.contains("- [skip] escrow_configuration:"));
        assert!(rendered.contains("- [fail] database_connectivity: failed to connect"));
    }
}
