//! Periodic worker that escalates breached support cases and reports
//! overdue process steps across every team.

use std::env;
use std::time::Duration;

use chrono::Utc;
use config::Config;
use dotenvy::dotenv;

use teamcrm::db::establish_connection_pool;
use teamcrm::models::config::ServerConfig;
use teamcrm::repository::DieselRepository;
use teamcrm::services::hooks::HookRegistry;
use teamcrm::services::processes::overdue_steps;
use teamcrm::services::support_cases::sweep_breaches;

fn sweep_once(repo: &DieselRepository, hooks: &HookRegistry, server_config: &ServerConfig) {
    let now = Utc::now().naive_utc();

    match sweep_breaches(repo, hooks, &server_config.sla, None, now) {
        Ok(report) if report.escalations.is_empty() => {
            log::debug!("{} breached cases, no new escalations", report.breached)
        }
        Ok(report) => log::info!(
            "{} breached cases, {} escalated",
            report.breached,
            report.escalations.len()
        ),
        Err(e) => log::error!("SLA sweep failed: {e}"),
    }

    match overdue_steps(repo, None, now) {
        Ok(steps) => {
            for overdue in steps {
                log::warn!(
                    "Execution {} step {} ({}) is overdue since {}",
                    overdue.execution.id,
                    overdue.step.step_index,
                    overdue.step.name,
                    overdue
                        .step
                        .due_at
                        .map(|due| due.to_string())
                        .unwrap_or_default()
                );
            }
        }
        Err(e) => log::error!("Overdue step check failed: {e}"),
    }
}

fn main() {
    dotenv().ok(); // Load .env file
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    // Select config profile (defaults to `local`).
    let app_env = env::var("APP_ENV").unwrap_or_else(|_| "local".into());

    let settings = Config::builder()
        // Add `./config/default.yaml`
        .add_source(config::File::with_name("config/default"))
        // Add environment-specific overrides
        .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
        // Add settings from the environment (with a prefix of APP)
        .add_source(config::Environment::with_prefix("APP"))
        .build();

    let settings = match settings {
        Ok(settings) => settings,
        Err(err) => {
            log::error!("Error loading settings: {}", err);
            std::process::exit(1);
        }
    };

    let server_config = match settings.try_deserialize::<ServerConfig>() {
        Ok(server_config) => server_config,
        Err(err) => {
            log::error!("Error loading server config: {}", err);
            std::process::exit(1);
        }
    };

    let pool = match establish_connection_pool(
        &server_config.database_url,
        &server_config.database,
    ) {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    let repo = DieselRepository::new(pool);
    let hooks = HookRegistry::default();
    let interval = Duration::from_secs(server_config.sweep_interval_secs.max(1));

    log::info!("Starting SLA sweep every {}s", interval.as_secs());

    loop {
        sweep_once(&repo, &hooks, &server_config);
        std::thread::sleep(interval);
    }
}
