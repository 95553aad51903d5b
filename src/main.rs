use invitebot::communication::error_alert::ErrorAlertService;
use invitebot::communication::telegram::TelegramService;
use invitebot::configuration::{Config, Context, Secrets};
use invitebot::core::ServiceManager;
use invitebot::AppError;
use dotenvy::dotenv;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenv().ok();
    let config_file = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.json".to_string());
    let config = Config::new(&config_file).map_err(|e| AppError::ConfigError(e.to_string()))?;

    let log_level = Level::from_str(&config.log_level).unwrap_or(Level::INFO);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(log_level.to_string()))
        .init();
    tracing::info!("Starting invite bot");

    let secrets = Secrets::from_env().map_err(|e| AppError::ConfigError(e.to_string()))?;
    let context = Context::new(config, secrets)
        .await
        .map_err(|e| AppError::ConfigError(e.to_string()))?;
    tracing::info!(admins = context.config.admin_ids.len(), "Registration service ready");

    let mut service_manager = ServiceManager::new(context);
    let (error_sender, error_receiver) = mpsc::channel::<String>(100);
    let shared_error_receiver = Arc::new(Mutex::new(error_receiver));

    service_manager
        .spawn_with_error_receiver::<ErrorAlertService>("error-alert", shared_error_receiver);
    service_manager.spawn_with_error_sender::<TelegramService>("telegram", error_sender);

    service_manager
        .wait()
        .await
        .map_err(|_| AppError::ServiceError)
}
