mod errors;
mod services;
mod types;

pub use errors::DatabaseError;
pub use services::DatabaseService;
pub use types::{InviteCode, InviteStatus, User, INVITE_CODE_TTL_SECS};
