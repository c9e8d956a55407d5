use super::relation_resolver_impl::project_users;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use std::sync::Arc;

/// Upper bound on ids accepted by a single `get_users` call.
pub const MAX_IDS_PER_LOOKUP: usize = 100;

pub struct RealUserService {
    user_repo: Arc<dyn UserRepo>,
    resolver: Arc<dyn RelationResolver>,
    tx_manager: Arc<dyn TxManager>,
}

impl RealUserService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        resolver: Arc<dyn RelationResolver>,
        tx_manager: Arc<dyn TxManager>,
    ) -> RealUserService {
        RealUserService {
            user_repo,
            resolver,
            tx_manager,
        }
    }

    async fn project(
        &self,
        caller: Option<UserId>,
        records: Vec<UserRecord>,
        selection: &FieldSelection,
    ) -> Result<Vec<UserView>, UserError> {
        project_users(self.resolver.as_ref(), caller, &records, selection)
            .await
            .map_err(relation_err)
    }
}

fn store_err(e: anyhow::Error) -> UserError {
    UserError::Store(e.to_string())
}

fn relation_err(e: RelationError) -> UserError {
    UserError::Store(e.to_string())
}

fn validate_update(update: &UserUpdate) -> Result<(), UserError> {
    if update.is_empty() {
        return Err(UserError::InvalidInput("no fields to update".to_string()));
    }
    if update
        .full_name
        .as_deref()
        .is_some_and(|name| name.trim().is_empty())
    {
        return Err(UserError::InvalidInput("full name cannot be empty".to_string()));
    }
    if update.avatar.as_deref().is_some_and(str::is_empty) {
        return Err(UserError::InvalidInput("avatar cannot be empty".to_string()));
    }
    Ok(())
}

#[async_trait::async_trait]
impl UserService for RealUserService {
    async fn get_user(
        &self,
        caller: Option<UserId>,
        username: &str,
        selection: &FieldSelection,
    ) -> Result<UserView, UserError> {
        let record = self
            .user_repo
            .get_by_username(username)
            .await
            .map_err(store_err)?
            .ok_or(UserError::NotFound)?;

        let mut view = UserView::project(&record, selection);
        view.relation = Some(
            self.resolver
                .fetch_relation(caller, Some(record.user_id))
                .await
                .map_err(relation_err)?,
        );
        Ok(view)
    }

    async fn get_users(
        &self,
        caller: Option<UserId>,
        user_ids: &[UserId],
        offset: PageOffset,
        selection: &FieldSelection,
    ) -> Result<Vec<UserView>, UserError> {
        if user_ids.len() > MAX_IDS_PER_LOOKUP {
            return Err(UserError::InvalidInput(format!(
                "at most {MAX_IDS_PER_LOOKUP} user ids per request"
            )));
        }

        let records = if user_ids.is_empty() {
            self.user_repo.list_page(offset).await
        } else {
            self.user_repo.list_by_ids(user_ids).await
        }
        .map_err(store_err)?;

        self.project(caller, records, selection).await
    }

    async fn search_users(
        &self,
        caller: Option<UserId>,
        query: &str,
        offset: PageOffset,
        selection: &FieldSelection,
    ) -> Result<Vec<UserView>, UserError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(UserError::InvalidInput("search query is empty".to_string()));
        }

        let records = self
            .user_repo
            .search_prefix(query, offset)
            .await
            .map_err(store_err)?;

        self.project(caller, records, selection).await
    }

    async fn update_user(
        &self,
        caller: UserId,
        update: UserUpdate,
    ) -> Result<UserView, UserError> {
        validate_update(&update)?;

        let mut tx = self.tx_manager.begin().await.map_err(store_err)?;
        let record = self
            .user_repo
            .update_in_tx(&mut *tx, caller, &update)
            .await
            .map_err(store_err)?
            .ok_or(UserError::NotFound)?;
        tx.commit().await.map_err(store_err)?;

        let touched = update.touched_fields();
        debug!(user_id = %caller, fields = %touched, "profile updated");
        Ok(UserView::project(&record, &touched))
    }

    async fn delete_user(&self, caller: UserId) -> Result<(), UserError> {
        let mut tx = self.tx_manager.begin().await.map_err(store_err)?;
        let deleted = self
            .user_repo
            .delete_in_tx(&mut *tx, caller)
            .await
            .map_err(store_err)?;
        if !deleted {
            return Err(UserError::NotFound);
        }
        tx.commit().await.map_err(store_err)?;

        info!(user_id = %caller, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::test_support::TestStore;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn get_user_always_carries_the_relation() {
        let store = TestStore::new();
        let a = store.user("alice").await;
        store.user("bob").await;

        let view = store
            .users
            .get_user(Some(a), "bob", &FieldSelection::defaults())
            .await
            .unwrap();
        assert_eq!(view.username.as_deref(), Some("bob"));
        assert_eq!(view.relation.unwrap().is_following, Some(false));

        let anonymous = store
            .users
            .get_user(None, "bob", &FieldSelection::defaults())
            .await
            .unwrap();
        assert_eq!(anonymous.relation, Some(RelationSummary::unknown()));

        assert!(matches!(
            store.users.get_user(None, "nobody", &FieldSelection::defaults()).await,
            Err(UserError::NotFound)
        ));
    }

    #[tokio::test]
    async fn get_users_pages_everyone_when_no_ids_are_given() {
        let store = TestStore::new();
        let mut created = Vec::new();
        for i in 0..12 {
            created.push(store.user(&format!("user{i:02}")).await);
        }
        let sel = FieldSelection::defaults();

        let first = store.users.get_users(None, &[], PageOffset(0), &sel).await.unwrap();
        let second = store.users.get_users(None, &[], PageOffset(10), &sel).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 2);

        let picked = store
            .users
            .get_users(None, &[created[3], UserId::new_v4()], PageOffset(0), &sel)
            .await
            .unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, Some(created[3]));
    }

    #[tokio::test]
    async fn get_users_caps_the_id_list() {
        let store = TestStore::new();
        let ids: Vec<UserId> = (0..=MAX_IDS_PER_LOOKUP).map(|_| UserId::new_v4()).collect();

        assert!(matches!(
            store
                .users
                .get_users(None, &ids, PageOffset(0), &FieldSelection::defaults())
                .await,
            Err(UserError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn search_matches_prefix_case_insensitively() {
        let store = TestStore::new();
        store.user("Margaret").await;
        store.user("marvin").await;
        store.user("bob").await;
        let sel = FieldSelection::defaults();

        let hits = store.users.search_users(None, "MAR", PageOffset(0), &sel).await.unwrap();
        let names: Vec<_> = hits.iter().filter_map(|v| v.username.clone()).collect();
        assert_eq!(names, vec!["Margaret".to_string(), "marvin".to_string()]);

        let wildcard = store.users.search_users(None, "%", PageOffset(0), &sel).await.unwrap();
        assert!(wildcard.is_empty());
    }

    #[tokio::test]
    async fn update_returns_only_written_fields() {
        let store = TestStore::new();
        let a = store.user("alice").await;

        let update = UserUpdate {
            bio: Some("hello there".to_string()),
            dob: NaiveDate::from_ymd_opt(1990, 5, 17),
            ..Default::default()
        };
        let view = store.users.update_user(a, update).await.unwrap();

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"bio": "hello there", "dob": "1990-05-17"})
        );
        assert_eq!(store.record(a).await.bio.as_deref(), Some("hello there"));
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let store = TestStore::new();
        let a = store.user("alice").await;

        assert!(matches!(
            store.users.update_user(a, UserUpdate::default()).await,
            Err(UserError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn delete_cascades_edges_and_fixes_counters() {
        let store = TestStore::new();
        let a = store.user("alice").await;
        let b = store.user("bob").await;
        let svc = &store.relationships;

        svc.send_follow_request(a, b).await.unwrap();
        svc.accept_follow_request(b, a).await.unwrap();
        svc.send_follow_request(b, a).await.unwrap();
        svc.accept_follow_request(a, b).await.unwrap();
        svc.send_mate_request(a, b).await.unwrap();
        svc.accept_mate_request(b, a).await.unwrap();
        assert_eq!(store.record(b).await.followers_count, 1);
        assert_eq!(store.record(b).await.following_count, 1);

        store.users.delete_user(a).await.unwrap();

        let survivor = store.record(b).await;
        assert_eq!(survivor.followers_count, 0);
        assert_eq!(survivor.following_count, 0);
        assert_eq!(store.follow_state(a, b).await, None);
        assert_eq!(store.follow_state(b, a).await, None);
        assert_eq!(store.mate_state(a, b).await, None);
        assert!(matches!(store.users.delete_user(a).await, Err(UserError::NotFound)));

        let none_left = RelationSummary {
            is_following: Some(false),
            is_followed: Some(false),
            are_mates: Some(false),
        };
        let towards_deleted = store.resolver.fetch_relation(Some(b), Some(a)).await.unwrap();
        assert_eq!(towards_deleted, none_left);
        let from_deleted = store.resolver.fetch_relation(Some(a), Some(b)).await.unwrap();
        assert_eq!(from_deleted, none_left);
    }
}
