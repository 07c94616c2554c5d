use tracing::{error, info};

use warden::{Config, Database, IdentityRepository};

#[tokio::main]
async fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "warden.toml".to_string());

    // Load configuration
    let config = match Config::load_with_env(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = warden::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        warden::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    info!("Warden - identity and session authentication core");
    info!(
        session_timeout_millis = config.auth.session_timeout_millis,
        superusers = config.auth.superuser_emails.len(),
        "Auth configured"
    );

    let db = match Database::open(&config.database.path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {e}");
            std::process::exit(1);
        }
    };

    let repo = IdentityRepository::new(db.pool().clone());
    match (repo.count().await, repo.list_admins().await) {
        (Ok(count), Ok(admins)) => {
            info!(identities = count, admins = admins.len(), "Identity store ready");
        }
        (Err(e), _) | (_, Err(e)) => {
            error!("Identity store check failed: {e}");
            std::process::exit(1);
        }
    }
}
