use super::super::types::{InviteCode, InviteStatus, INVITE_CODE_TTL_SECS};
use super::DatabaseError;
use super::DatabaseService;
use chrono::Utc;
use tracing::{debug, info};

impl DatabaseService {
    pub async fn create_invite_code(
        &self,
        code: &str,
        creator: i64,
    ) -> Result<InviteCode, DatabaseError> {
        self.create_invite_code_at(code, creator, Utc::now().timestamp())
            .await
    }

    // Insert an unused invite created at `create_time`
    pub async fn create_invite_code_at(
        &self,
        code: &str,
        creator: i64,
        create_time: i64,
    ) -> Result<InviteCode, DatabaseError> {
        let invite = InviteCode {
            code: code.to_string(),
            status: InviteStatus::Unused,
            create_time,
            expire_time: create_time + INVITE_CODE_TTL_SECS,
            creator,
        };

        sqlx::query(
            "INSERT INTO invite_codes (code, status, create_time, expire_time, creator) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&invite.code)
        .bind(invite.status)
        .bind(invite.create_time)
        .bind(invite.expire_time)
        .bind(invite.creator)
        .execute(self.pool())
        .await?;

        info!(code = %code, creator = %creator, "Invite code created");
        Ok(invite)
    }

    pub async fn get_invite_code(&self, code: &str) -> Result<InviteCode, DatabaseError> {
        sqlx::query_as::<_, InviteCode>("SELECT * FROM invite_codes WHERE code = ?")
            .bind(code)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Invite code {code}")))
    }

    // Callers are responsible for checking that the transition is legal
    pub async fn set_invite_code_status(
        &self,
        code: &str,
        status: InviteStatus,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE invite_codes SET status = ? WHERE code = ?")
            .bind(status)
            .bind(code)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Invite code {code}")));
        }

        debug!(code = %code, status = %status, "Invite code status updated");
        Ok(())
    }

    pub async fn list_invite_codes(&self) -> Result<Vec<InviteCode>, DatabaseError> {
        let invites = sqlx::query_as::<_, InviteCode>(
            "SELECT * FROM invite_codes ORDER BY create_time, rowid",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(invites)
    }
}
