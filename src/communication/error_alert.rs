use crate::configuration::Context;
use crate::core::service_manager::{Error as ServiceManagerError, ServiceWithErrorReceiver};
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::prelude::*;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

/// Forwards operational failures to the configured Telegram chat.
///
/// Without an `error_channel_id` the alerts are only drained and logged.
pub struct ErrorAlertService {
    bot: Bot,
    receiver: Arc<Mutex<mpsc::Receiver<String>>>,
    channel_id: Option<ChatId>,
}

#[async_trait]
impl ServiceWithErrorReceiver for ErrorAlertService {
    type Context = Context;

    async fn new(
        context: Context,
        receiver: Arc<Mutex<mpsc::Receiver<String>>>,
    ) -> Result<Self, ServiceManagerError> {
        Ok(Self {
            bot: Bot::new(&context.secrets.bot_token),
            receiver,
            channel_id: context.config.telegram.error_channel_id.map(ChatId),
        })
    }

    async fn run(self) -> Result<(), ServiceManagerError> {
        let mut rx = self.receiver.lock().await;
        while let Some(alert) = rx.recv().await {
            let Some(channel_id) = self.channel_id else {
                debug!(alert = %alert, "No error channel configured, dropping alert");
                continue;
            };
            if let Err(e) = self.bot.send_message(channel_id, alert).await {
                error!(channel_id = %channel_id, error = %e, "Failed to send error alert");
            }
        }
        Err(ServiceManagerError::new("Error alert channel closed"))
    }
}
