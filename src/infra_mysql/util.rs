use super::repo_tx_mysql::MySqlTx;
use crate::domain_model::UserId;
use crate::domain_port::*;
use anyhow::anyhow;
use sqlx::Row;
use sqlx::mysql::{MySqlDatabaseError, MySqlRow};

/// Column list shared by every query that materializes a [`UserRecord`].
macro_rules! user_columns {
    () => {
        "u.id, u.full_name, u.username, u.account_type, u.dob, u.gender, u.profession, \
         u.bio, u.avatar, u.banner, u.posts_count, u.followers_count, u.following_count, \
         u.created_at"
    };
}
pub(super) use user_columns;

pub fn downcast(tx: &mut dyn StorageTx) -> anyhow::Result<&mut MySqlTx> {
    tx.as_any_mut()
        .downcast_mut::<MySqlTx>()
        .ok_or_else(|| anyhow!("transaction was not opened by the MySQL backend"))
}

fn mysql_error_number(err: &sqlx::Error) -> Option<u16> {
    if let sqlx::Error::Database(db) = err {
        if let Some(mysql_err) = db.try_downcast_ref::<MySqlDatabaseError>() {
            return Some(mysql_err.number());
        }
    }

    None
}

pub fn is_dup_key(err: &sqlx::Error) -> bool {
    mysql_error_number(err) == Some(1062) // ER_DUP_ENTRY
}

pub fn is_missing_reference(err: &sqlx::Error) -> bool {
    mysql_error_number(err) == Some(1452) // ER_NO_REFERENCED_ROW_2
}

/// Maps the result of an insert-if-absent statement.
pub fn insert_outcome(
    res: Result<sqlx::mysql::MySqlQueryResult, sqlx::Error>,
    what: &str,
) -> anyhow::Result<InsertOutcome> {
    match res {
        Ok(_) => Ok(InsertOutcome::Inserted),
        Err(e) if is_dup_key(&e) => Ok(InsertOutcome::Duplicate),
        Err(e) if is_missing_reference(&e) => Ok(InsertOutcome::MissingReference),
        Err(e) => Err(anyhow!("insert {what}: {e}")),
    }
}

/// Escapes `LIKE` wildcards so user input only matches literally.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub fn row_to_user(row: &MySqlRow) -> anyhow::Result<UserRecord> {
    Ok(UserRecord {
        user_id: row.try_get::<UserId, _>("id")?,
        full_name: row.try_get("full_name")?,
        username: row.try_get("username")?,
        account_type: row.try_get("account_type")?,
        dob: row.try_get("dob")?,
        gender: row.try_get("gender")?,
        profession: row.try_get("profession")?,
        bio: row.try_get("bio")?,
        avatar: row.try_get("avatar")?,
        banner: row.try_get("banner")?,
        posts_count: row.try_get("posts_count")?,
        followers_count: row.try_get("followers_count")?,
        following_count: row.try_get("following_count")?,
        created_at: row.try_get("created_at")?,
    })
}

pub fn rows_to_users(rows: Vec<MySqlRow>) -> anyhow::Result<Vec<UserRecord>> {
    rows.iter().map(row_to_user).collect()
}
