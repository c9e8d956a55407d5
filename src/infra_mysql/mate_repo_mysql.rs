use super::util::{insert_outcome, rows_to_users, user_columns};
use crate::domain_model::*;
use crate::domain_port::*;
use anyhow::Context;
use sqlx::MySqlPool;

pub struct MySqlMateRepo {
    pool: MySqlPool,
}

impl MySqlMateRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MateRepo for MySqlMateRepo {
    async fn insert_pending(
        &self,
        pair: UserPair,
        requested_by: UserId,
    ) -> anyhow::Result<InsertOutcome> {
        let res = sqlx::query(
            r#"
INSERT INTO mate_edge (user_min, user_max, requested_by, are_mates)
VALUES (?, ?, ?, FALSE)
"#,
        )
        .bind(pair.min())
        .bind(pair.max())
        .bind(requested_by)
        .execute(&self.pool)
        .await;

        insert_outcome(res, "mate edge")
    }

    async fn confirm_pending(&self, pair: UserPair, requested_by: UserId) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
UPDATE mate_edge SET are_mates = TRUE
WHERE user_min = ? AND user_max = ? AND requested_by = ? AND are_mates = FALSE
"#,
        )
        .bind(pair.min())
        .bind(pair.max())
        .bind(requested_by)
        .execute(&self.pool)
        .await
        .context("confirm mate edge")?;

        Ok(res.rows_affected() == 1)
    }

    async fn delete_pending(&self, pair: UserPair, requested_by: UserId) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
DELETE FROM mate_edge
WHERE user_min = ? AND user_max = ? AND requested_by = ? AND are_mates = FALSE
"#,
        )
        .bind(pair.min())
        .bind(pair.max())
        .bind(requested_by)
        .execute(&self.pool)
        .await
        .context("delete pending mate edge")?;

        Ok(res.rows_affected() == 1)
    }

    async fn delete(&self, pair: UserPair) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM mate_edge WHERE user_min = ? AND user_max = ?")
            .bind(pair.min())
            .bind(pair.max())
            .execute(&self.pool)
            .await
            .context("delete mate edge")?;

        Ok(res.rows_affected() == 1)
    }

    async fn state(&self, pair: UserPair) -> anyhow::Result<Option<EdgeState>> {
        let state: Option<bool> =
            sqlx::query_scalar("SELECT are_mates FROM mate_edge WHERE user_min = ? AND user_max = ?")
                .bind(pair.min())
                .bind(pair.max())
                .fetch_optional(&self.pool)
                .await
                .context("select mate edge")?;

        Ok(state.map(EdgeState::from))
    }

    async fn list_mates(
        &self,
        user: UserId,
        offset: PageOffset,
    ) -> anyhow::Result<Vec<UserRecord>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            user_columns!(),
            r#"
FROM mate_edge m
JOIN users u ON u.id = IF(m.user_min = ?, m.user_max, m.user_min)
WHERE (m.user_min = ? OR m.user_max = ?) AND m.are_mates = TRUE
ORDER BY m.created_at ASC, u.id ASC
LIMIT ? OFFSET ?
"#
        ))
        .bind(user)
        .bind(user)
        .bind(user)
        .bind(offset.limit())
        .bind(offset.offset())
        .fetch_all(&self.pool)
        .await
        .context("list mates")?;

        rows_to_users(rows)
    }

    async fn list_pending(
        &self,
        user: UserId,
        offset: PageOffset,
    ) -> anyhow::Result<Vec<UserRecord>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            user_columns!(),
            r#"
FROM mate_edge m
JOIN users u ON u.id = m.requested_by
WHERE (m.user_min = ? OR m.user_max = ?) AND m.requested_by <> ? AND m.are_mates = FALSE
ORDER BY m.created_at ASC, u.id ASC
LIMIT ? OFFSET ?
"#
        ))
        .bind(user)
        .bind(user)
        .bind(user)
        .bind(offset.limit())
        .bind(offset.offset())
        .fetch_all(&self.pool)
        .await
        .context("list pending mate requests")?;

        rows_to_users(rows)
    }
}
