pub mod commands;
pub mod dispatcher;
pub mod error_alert;
pub mod error_handler;
pub mod telegram;
