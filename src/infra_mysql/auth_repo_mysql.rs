use super::util::downcast;
use crate::domain_model::*;
use crate::domain_port::*;
use anyhow::Context;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlAuthRepo {
    pool: MySqlPool,
}

impl MySqlAuthRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlAuthRepo { pool }
    }

    fn row_to_record(row: MySqlRow) -> anyhow::Result<AuthCredentialsRecord> {
        Ok(AuthCredentialsRecord {
            user_id: row.try_get::<UserId, _>("user_id")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
        })
    }
}

#[async_trait::async_trait]
impl AuthRepo for MySqlAuthRepo {
    async fn create_credentials_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        user_id: UserId,
        password_hash: &str,
    ) -> anyhow::Result<()> {
        let tx = downcast(tx)?;

        sqlx::query(
            r#"
INSERT INTO user_credential (user_id, password_hash)
VALUES (?, ?)
"#,
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(tx.conn())
        .await
        .context("insert credentials")?;

        Ok(())
    }

    async fn get_by_username(
        &self,
        username: &str,
    ) -> anyhow::Result<Option<AuthCredentialsRecord>> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT c.user_id, u.username, c.password_hash
FROM user_credential c
JOIN users u ON u.id = c.user_id
WHERE u.username = ?
"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("select credentials")?;

        row_opt.map(Self::row_to_record).transpose()
    }
}
