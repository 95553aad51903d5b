use serde::{Deserialize, Serialize};
use std::fmt;

/// Invite codes stay valid for seven days after creation.
pub const INVITE_CODE_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum InviteStatus {
    Unused,
    Used,
    Expired,
    Deleted,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Unused => "unused",
            InviteStatus::Used => "used",
            InviteStatus::Expired => "expired",
            InviteStatus::Deleted => "deleted",
        }
    }

    /// Status only ever moves forward out of `Unused`.
    pub fn can_transition_to(&self, next: InviteStatus) -> bool {
        matches!(
            (self, next),
            (InviteStatus::Unused, InviteStatus::Used)
                | (InviteStatus::Unused, InviteStatus::Expired)
                | (InviteStatus::Unused, InviteStatus::Deleted)
        )
    }
}

impl fmt::Display for InviteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct InviteCode {
    pub code: String,
    pub status: InviteStatus,
    pub create_time: i64,
    pub expire_time: i64,
    pub creator: i64,
}

impl InviteCode {
    // An invite whose expiry equals the current second is already expired
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expire_time <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite(expire_time: i64) -> InviteCode {
        InviteCode {
            code: "code".to_string(),
            status: InviteStatus::Unused,
            create_time: expire_time - INVITE_CODE_TTL_SECS,
            expire_time,
            creator: 1,
        }
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let code = invite(1_000);
        assert!(!code.is_expired_at(999));
        assert!(code.is_expired_at(1_000));
        assert!(code.is_expired_at(1_001));
    }

    #[test]
    fn test_status_only_moves_forward_from_unused() {
        use InviteStatus::*;
        assert!(Unused.can_transition_to(Used));
        assert!(Unused.can_transition_to(Expired));
        assert!(Unused.can_transition_to(Deleted));

        for from in [Used, Expired, Deleted] {
            for to in [Unused, Used, Expired, Deleted] {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }
}
