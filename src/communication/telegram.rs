use crate::communication::dispatcher::CommandDispatcher;
use crate::configuration::Context;
use crate::core::service_manager::{Error as ServiceManagerError, ServiceWithErrorSender};
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::prelude::*;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Longest text Telegram accepts in one message, in characters.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

pub struct TelegramService {
    bot: Bot,
    dispatcher: CommandDispatcher,
}

#[async_trait]
impl ServiceWithErrorSender for TelegramService {
    type Context = Context;

    async fn new(
        context: Context,
        error_sender: mpsc::Sender<String>,
    ) -> Result<Self, ServiceManagerError> {
        let bot = Bot::new(&context.secrets.bot_token);
        let dispatcher = CommandDispatcher::new(
            context.registration.clone(),
            context.config.admin_ids.clone(),
            error_sender,
        );

        Ok(Self { bot, dispatcher })
    }

    async fn run(self) -> Result<(), ServiceManagerError> {
        info!("Telegram service polling for updates");
        let dispatcher = Arc::new(self.dispatcher);
        teloxide::repl(self.bot, move |bot: Bot, msg: Message| {
            let dispatcher = Arc::clone(&dispatcher);
            async move {
                // One task per message so a slow or failing command never stalls polling
                tokio::spawn(Self::handle_message(bot, msg, dispatcher));
                respond(())
            }
        })
        .await;
        Ok(())
    }
}

impl TelegramService {
    async fn handle_message(
        bot: Bot,
        msg: Message,
        dispatcher: Arc<CommandDispatcher>,
    ) -> ResponseResult<()> {
        let chat_id = msg.chat.id;
        let (Some(text), Some(from)) = (msg.text(), msg.from()) else {
            bot.send_message(chat_id, "I can only process text commands. Send /help to see them.")
                .await?;
            return Ok(());
        };

        let telegram_id = from.id.0 as i64;
        let reply = dispatcher.handle(telegram_id, text).await;

        for chunk in split_message(&reply, TELEGRAM_MESSAGE_LIMIT) {
            if let Err(e) = bot.send_message(chat_id, chunk).await {
                error!(chat_id = %chat_id, telegram_id = %telegram_id, error = %e, "Failed to send reply");
                return Err(e);
            }
        }
        Ok(())
    }
}

/// Splits `text` into pieces of at most `limit` characters, preferring line breaks.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len <= limit {
            current.push_str(line);
            current_len += line_len;
            continue;
        }

        // a single line longer than the limit is cut on character boundaries
        let mut piece = String::new();
        let mut piece_len = 0;
        for c in line.chars() {
            if piece_len == limit {
                chunks.push(std::mem::take(&mut piece));
                piece_len = 0;
            }
            piece.push(c);
            piece_len += 1;
        }
        current = piece;
        current_len = piece_len;
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}
