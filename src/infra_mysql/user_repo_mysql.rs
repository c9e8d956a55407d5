use super::util::{downcast, escape_like, insert_outcome, row_to_user, rows_to_users, user_columns};
use crate::application_port::UserUpdate;
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::{MySql, MySqlConnection, MySqlPool, QueryBuilder};

pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }

    async fn fetch_by_id(
        conn: &mut MySqlConnection,
        user_id: UserId,
    ) -> anyhow::Result<Option<UserRecord>> {
        let row = sqlx::query(concat!("SELECT ", user_columns!(), " FROM users u WHERE u.id = ?"))
            .bind(user_id)
            .fetch_optional(conn)
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn create_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        user: &NewUserRecord,
    ) -> anyhow::Result<InsertOutcome> {
        let tx = downcast(tx)?;

        let res = sqlx::query(
            r#"
INSERT INTO users (id, full_name, username, account_type, dob, avatar)
VALUES (?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(user.user_id)
        .bind(&user.full_name)
        .bind(&user.username)
        .bind(&user.account_type)
        .bind(user.dob)
        .bind(&user.avatar)
        .execute(tx.conn())
        .await;

        insert_outcome(res, "user")
    }

    async fn get_by_id(&self, user_id: UserId) -> anyhow::Result<Option<UserRecord>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_by_id(&mut conn, user_id).await
    }

    async fn get_by_username(&self, username: &str) -> anyhow::Result<Option<UserRecord>> {
        let row = sqlx::query(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users u WHERE u.username = ? LIMIT 1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn list_by_ids(&self, user_ids: &[UserId]) -> anyhow::Result<Vec<UserRecord>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<MySql> =
            QueryBuilder::new(concat!("SELECT ", user_columns!(), " FROM users u WHERE u.id IN ("));
        let mut separated = qb.separated(", ");
        for user_id in user_ids {
            separated.push_bind(*user_id);
        }
        separated.push_unseparated(") ORDER BY u.created_at ASC, u.id ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows_to_users(rows)
    }

    async fn list_page(&self, offset: PageOffset) -> anyhow::Result<Vec<UserRecord>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users u ORDER BY u.created_at ASC, u.id ASC LIMIT ? OFFSET ?"
        ))
        .bind(offset.limit())
        .bind(offset.offset())
        .fetch_all(&self.pool)
        .await?;

        rows_to_users(rows)
    }

    async fn search_prefix(
        &self,
        prefix: &str,
        offset: PageOffset,
    ) -> anyhow::Result<Vec<UserRecord>> {
        let pattern = format!("{}%", escape_like(prefix));

        let rows = sqlx::query(concat!(
            "SELECT ",
            user_columns!(),
            r#"
FROM users u
WHERE u.full_name LIKE ? OR u.username LIKE ?
ORDER BY u.username ASC, u.id ASC
LIMIT ? OFFSET ?
"#
        ))
        .bind(&pattern)
        .bind(&pattern)
        .bind(offset.limit())
        .bind(offset.offset())
        .fetch_all(&self.pool)
        .await?;

        rows_to_users(rows)
    }

    async fn update_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        user_id: UserId,
        update: &UserUpdate,
    ) -> anyhow::Result<Option<UserRecord>> {
        let tx = downcast(tx)?;

        sqlx::query(
            r#"
UPDATE users
SET full_name    = COALESCE(?, full_name),
    account_type = COALESCE(?, account_type),
    dob          = COALESCE(?, dob),
    gender       = COALESCE(?, gender),
    profession   = COALESCE(?, profession),
    bio          = COALESCE(?, bio),
    avatar       = COALESCE(?, avatar),
    banner       = COALESCE(?, banner),
    updated_at   = CURRENT_TIMESTAMP(6)
WHERE id = ?
"#,
        )
        .bind(&update.full_name)
        .bind(&update.account_type)
        .bind(update.dob)
        .bind(&update.gender)
        .bind(&update.profession)
        .bind(&update.bio)
        .bind(&update.avatar)
        .bind(&update.banner)
        .bind(user_id)
        .execute(tx.conn())
        .await?;

        Self::fetch_by_id(tx.conn(), user_id).await
    }

    async fn delete_in_tx(&self, tx: &mut dyn StorageTx, user_id: UserId) -> anyhow::Result<bool> {
        let tx = downcast(tx)?;

        // edges go with the user (ON DELETE CASCADE); counters of the other side do not
        sqlx::query(
            r#"
UPDATE users u
JOIN follow_edge f ON u.id = f.followee_id
SET u.followers_count = GREATEST(CAST(u.followers_count AS SIGNED) - 1, 0)
WHERE f.follower_id = ? AND f.is_following = TRUE
"#,
        )
        .bind(user_id)
        .execute(tx.conn())
        .await?;

        sqlx::query(
            r#"
UPDATE users u
JOIN follow_edge f ON u.id = f.follower_id
SET u.following_count = GREATEST(CAST(u.following_count AS SIGNED) - 1, 0)
WHERE f.followee_id = ? AND f.is_following = TRUE
"#,
        )
        .bind(user_id)
        .execute(tx.conn())
        .await?;

        let res = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(tx.conn())
            .await?;

        Ok(res.rows_affected() > 0)
    }

    async fn adjust_follow_counts_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        follower: UserId,
        followee: UserId,
        delta: i32,
    ) -> anyhow::Result<()> {
        let tx = downcast(tx)?;

        sqlx::query(
            r#"
UPDATE users
SET following_count = GREATEST(CAST(following_count AS SIGNED) + ?, 0)
WHERE id = ?
"#,
        )
        .bind(delta)
        .bind(follower)
        .execute(tx.conn())
        .await?;

        sqlx::query(
            r#"
UPDATE users
SET followers_count = GREATEST(CAST(followers_count AS SIGNED) + ?, 0)
WHERE id = ?
"#,
        )
        .bind(delta)
        .bind(followee)
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn id_exists(&self, user_id: UserId) -> anyhow::Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }
}
