use crate::commands::CommandResult;
use cotar_core::config::{AppConfig, LoadOptions};
use cotar_db::{connect_with_settings, migrations, DemoSeedDataset, SeedResult};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seed_result = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<SeedResult, (&'static str, String, u8)> =
            if !verification.all_passed() {
                Err(("seed_verification", verification_failure_message(&verification.checks), 6u8))
            } else {
                Ok(seed_result)
            };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", seed_summary(&seeded)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn verification_failure_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks = checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(*check))
        .collect::<Vec<_>>();

    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}

fn seed_summary(seeded: &SeedResult) -> String {
    format!(
        "demo dataset loaded: quote {} with invitation letter {} and response links [{}]",
        seeded.quote_id,
        seeded.letter_id,
        seeded.tokens.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::{seed_summary, verification_failure_message};
    use cotar_db::SeedResult;

    #[test]
    fn verification_error_message_targets_failed_checks() {
        let checks = [
            ("quote-present", true),
            ("letter-recipients", false),
            ("token-expired-state", false),
        ];

        assert_eq!(
            verification_failure_message(&checks),
            "Seed verification failed for checks: letter-recipients, token-expired-state"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        let checks = [("quote-present", true), ("letter-recipients", true)];

        assert_eq!(verification_failure_message(&checks), "Some seed data failed to load");
    }

    #[test]
    fn success_summary_names_seeded_entities() {
        let seeded = SeedResult {
            quote_id: "quote-demo-001",
            letter_id: "letter-demo-001",
            tokens: vec!["demo-valid-token", "demo-expired-token"],
        };

        assert_eq!(
            seed_summary(&seeded),
            "demo dataset loaded: quote quote-demo-001 with invitation letter letter-demo-001 and response links [demo-valid-token, demo-expired-token]"
        );
    }
}
