mod invite;
mod user;

pub use invite::{InviteCode, InviteStatus, INVITE_CODE_TTL_SECS};
pub use user::User;
