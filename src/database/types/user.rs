use serde::{Deserialize, Serialize};

// `id` is issued by the web application, never generated here
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub telegram_id: i64,
    pub invite_code: Option<String>,
}
