use super::super::types::{InviteStatus, User};
use super::DatabaseError;
use super::DatabaseService;
use tracing::info;

impl DatabaseService {
    // Open registration path, no invite involved
    pub async fn create_user(
        &self,
        id: &str,
        telegram_id: i64,
        invite_code: Option<&str>,
    ) -> Result<User, DatabaseError> {
        sqlx::query("INSERT INTO users (id, telegram_id, invite_code) VALUES (?, ?, ?)")
            .bind(id)
            .bind(telegram_id)
            .bind(invite_code)
            .execute(self.pool())
            .await?;

        info!(user_id = %id, telegram_id = %telegram_id, "User created");
        Ok(User {
            id: id.to_string(),
            telegram_id,
            invite_code: invite_code.map(str::to_string),
        })
    }

    /// Insert the user and mark the invite as used in one transaction.
    ///
    /// The status flip only applies to an invite that is still `unused`; if it
    /// is not, nothing is written and `DatabaseError::Conflict` is returned.
    pub async fn create_user_with_invite(
        &self,
        id: &str,
        telegram_id: i64,
        invite_code: &str,
    ) -> Result<User, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query("UPDATE invite_codes SET status = ? WHERE code = ? AND status = ?")
            .bind(InviteStatus::Used)
            .bind(invite_code)
            .bind(InviteStatus::Unused)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::Conflict(format!(
                "Invite code {invite_code} is no longer unused"
            )));
        }

        sqlx::query("INSERT INTO users (id, telegram_id, invite_code) VALUES (?, ?, ?)")
            .bind(id)
            .bind(telegram_id)
            .bind(invite_code)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(user_id = %id, telegram_id = %telegram_id, code = %invite_code, "User created with invite code");
        Ok(User {
            id: id.to_string(),
            telegram_id,
            invite_code: Some(invite_code.to_string()),
        })
    }

    pub async fn get_user_by_telegram_id(&self, telegram_id: i64) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE telegram_id = ?")
            .bind(telegram_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User with telegram id {telegram_id}")))
    }

    pub async fn get_user_by_user_id(&self, id: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    pub async fn delete_user_by_telegram_id(&self, telegram_id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE telegram_id = ?")
            .bind(telegram_id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "User with telegram id {telegram_id}"
            )));
        }

        info!(telegram_id = %telegram_id, "User deleted");
        Ok(())
    }
}
