use sqlx::FromRow;

use super::Database;
use crate::error::StoreError;

#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub login: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
    /// The single token currently accepted for this login.
    pub token: Option<String>,
}

impl Database {
    pub async fn create_user(&self, login: &str, password_hash: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO users (login, password) VALUES ($1, $2)")
            .bind(login)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_insert(e, login))?;
        Ok(())
    }

    pub async fn find_user(&self, login: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT login, password, token FROM users WHERE login = $1",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Replaces whatever token the user had.
    pub async fn set_token(&self, login: &str, token: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET token = $1 WHERE login = $2")
            .bind(token)
            .bind(login)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Clears `token` if it is the one stored for `login`. Returns whether a
    /// token was cleared.
    pub async fn clear_token(&self, login: &str, token: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE users SET token = NULL WHERE login = $1 AND token = $2")
            .bind(login)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_login_is_reported() {
        let db = Database::in_memory().await.unwrap();
        db.create_user("alice12345", "h1").await.unwrap();
        let err = db.create_user("alice12345", "h2").await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(login) if login == "alice12345"));
    }

    #[tokio::test]
    async fn token_lifecycle() {
        let db = Database::in_memory().await.unwrap();
        db.create_user("alice12345", "hash").await.unwrap();
        assert_eq!(db.find_user("alice12345").await.unwrap().unwrap().token, None);

        db.set_token("alice12345", "t1").await.unwrap();
        db.set_token("alice12345", "t2").await.unwrap();
        let user = db.find_user("alice12345").await.unwrap().unwrap();
        assert_eq!(user.token.as_deref(), Some("t2"));
        assert_eq!(user.password_hash, "hash");

        // Only the stored token can be cleared.
        assert!(!db.clear_token("alice12345", "t1").await.unwrap());
        assert!(db.clear_token("alice12345", "t2").await.unwrap());
        assert_eq!(db.find_user("alice12345").await.unwrap().unwrap().token, None);
    }

    #[tokio::test]
    async fn clear_token_is_scoped_to_login() {
        let db = Database::in_memory().await.unwrap();
        db.create_user("alice12345", "hash").await.unwrap();
        db.create_user("bobby12345", "hash").await.unwrap();
        db.set_token("alice12345", "alice-token").await.unwrap();

        assert!(!db.clear_token("bobby12345", "alice-token").await.unwrap());
        assert!(db.find_user("alice12345").await.unwrap().unwrap().token.is_some());
    }

    #[tokio::test]
    async fn unknown_user_is_none() {
        let db = Database::in_memory().await.unwrap();
        assert!(db.find_user("nobody123").await.unwrap().is_none());
    }
}
