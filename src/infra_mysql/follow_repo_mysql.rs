use super::util::{downcast, insert_outcome, rows_to_users, user_columns};
use crate::domain_model::*;
use crate::domain_port::*;
use anyhow::Context;
use sqlx::MySqlPool;

pub struct MySqlFollowRepo {
    pool: MySqlPool,
}

impl MySqlFollowRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FollowRepo for MySqlFollowRepo {
    async fn insert_pending(
        &self,
        follower: UserId,
        followee: UserId,
    ) -> anyhow::Result<InsertOutcome> {
        let res = sqlx::query(
            r#"
INSERT INTO follow_edge (follower_id, followee_id, is_following)
VALUES (?, ?, FALSE)
"#,
        )
        .bind(follower)
        .bind(followee)
        .execute(&self.pool)
        .await;

        insert_outcome(res, "follow edge")
    }

    async fn confirm_pending_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        follower: UserId,
        followee: UserId,
    ) -> anyhow::Result<bool> {
        let tx = downcast(tx)?;

        let res = sqlx::query(
            r#"
UPDATE follow_edge SET is_following = TRUE
WHERE follower_id = ? AND followee_id = ? AND is_following = FALSE
"#,
        )
        .bind(follower)
        .bind(followee)
        .execute(tx.conn())
        .await
        .context("confirm follow edge")?;

        Ok(res.rows_affected() == 1)
    }

    async fn delete_pending(&self, follower: UserId, followee: UserId) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
DELETE FROM follow_edge
WHERE follower_id = ? AND followee_id = ? AND is_following = FALSE
"#,
        )
        .bind(follower)
        .bind(followee)
        .execute(&self.pool)
        .await
        .context("delete pending follow edge")?;

        Ok(res.rows_affected() == 1)
    }

    async fn delete_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        follower: UserId,
        followee: UserId,
    ) -> anyhow::Result<Option<EdgeState>> {
        let tx = downcast(tx)?;

        let state: Option<bool> = sqlx::query_scalar(
            r#"
SELECT is_following FROM follow_edge
WHERE follower_id = ? AND followee_id = ?
FOR UPDATE
"#,
        )
        .bind(follower)
        .bind(followee)
        .fetch_optional(tx.conn())
        .await
        .context("lock follow edge")?;

        let Some(state) = state else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM follow_edge WHERE follower_id = ? AND followee_id = ?")
            .bind(follower)
            .bind(followee)
            .execute(tx.conn())
            .await
            .context("delete follow edge")?;

        Ok(Some(EdgeState::from(state)))
    }

    async fn state(
        &self,
        follower: UserId,
        followee: UserId,
    ) -> anyhow::Result<Option<EdgeState>> {
        let state: Option<bool> = sqlx::query_scalar(
            "SELECT is_following FROM follow_edge WHERE follower_id = ? AND followee_id = ?",
        )
        .bind(follower)
        .bind(followee)
        .fetch_optional(&self.pool)
        .await
        .context("select follow edge")?;

        Ok(state.map(EdgeState::from))
    }

    async fn list_followers(
        &self,
        followee: UserId,
        offset: PageOffset,
    ) -> anyhow::Result<Vec<UserRecord>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            user_columns!(),
            r#"
FROM follow_edge f
JOIN users u ON u.id = f.follower_id
WHERE f.followee_id = ? AND f.is_following = TRUE
ORDER BY f.created_at ASC, u.id ASC
LIMIT ? OFFSET ?
"#
        ))
        .bind(followee)
        .bind(offset.limit())
        .bind(offset.offset())
        .fetch_all(&self.pool)
        .await
        .context("list followers")?;

        rows_to_users(rows)
    }

    async fn list_following(
        &self,
        follower: UserId,
        offset: PageOffset,
    ) -> anyhow::Result<Vec<UserRecord>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            user_columns!(),
            r#"
FROM follow_edge f
JOIN users u ON u.id = f.followee_id
WHERE f.follower_id = ? AND f.is_following = TRUE
ORDER BY f.created_at ASC, u.id ASC
LIMIT ? OFFSET ?
"#
        ))
        .bind(follower)
        .bind(offset.limit())
        .bind(offset.offset())
        .fetch_all(&self.pool)
        .await
        .context("list following")?;

        rows_to_users(rows)
    }

    async fn list_pending(
        &self,
        followee: UserId,
        offset: PageOffset,
    ) -> anyhow::Result<Vec<UserRecord>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            user_columns!(),
            r#"
FROM follow_edge f
JOIN users u ON u.id = f.follower_id
WHERE f.followee_id = ? AND f.is_following = FALSE
ORDER BY f.created_at ASC, u.id ASC
LIMIT ? OFFSET ?
"#
        ))
        .bind(followee)
        .bind(offset.limit())
        .bind(offset.offset())
        .fetch_all(&self.pool)
        .await
        .context("list pending follow requests")?;

        rows_to_users(rows)
    }
}
