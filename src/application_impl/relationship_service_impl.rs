use super::relation_resolver_impl::project_users;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use std::sync::Arc;

pub struct RealRelationshipService {
    user_repo: Arc<dyn UserRepo>,
    follow_repo: Arc<dyn FollowRepo>,
    mate_repo: Arc<dyn MateRepo>,
    resolver: Arc<dyn RelationResolver>,
    tx_manager: Arc<dyn TxManager>,
}

impl RealRelationshipService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        follow_repo: Arc<dyn FollowRepo>,
        mate_repo: Arc<dyn MateRepo>,
        resolver: Arc<dyn RelationResolver>,
        tx_manager: Arc<dyn TxManager>,
    ) -> Self {
        Self {
            user_repo,
            follow_repo,
            mate_repo,
            resolver,
            tx_manager,
        }
    }

    async fn project(
        &self,
        caller: Option<UserId>,
        records: Vec<UserRecord>,
        selection: &FieldSelection,
    ) -> Result<Vec<UserView>, RelationError> {
        project_users(self.resolver.as_ref(), caller, &records, selection).await
    }
}

fn distinct(actor: UserId, target: UserId) -> Result<(), RelationError> {
    if actor == target {
        return Err(RelationError::SelfRelation);
    }
    Ok(())
}

fn store_err(op: &'static str) -> impl FnOnce(anyhow::Error) -> RelationError {
    move |e| RelationError::Store(format!("{op}: {e}"))
}

fn claim_result(outcome: InsertOutcome) -> Result<(), RelationError> {
    match outcome {
        InsertOutcome::Inserted => Ok(()),
        InsertOutcome::Duplicate => Err(RelationError::Duplicate),
        InsertOutcome::MissingReference => Err(RelationError::UserNotFound),
    }
}

#[async_trait::async_trait]
impl RelationshipService for RealRelationshipService {
    async fn send_follow_request(
        &self,
        follower: UserId,
        followee: UserId,
    ) -> Result<(), RelationError> {
        distinct(follower, followee)?;

        let outcome = self
            .follow_repo
            .insert_pending(follower, followee)
            .await
            .map_err(store_err("send follow request"))?;
        claim_result(outcome)?;

        debug!(%follower, %followee, "follow request sent");
        Ok(())
    }

    async fn unsend_follow_request(
        &self,
        follower: UserId,
        followee: UserId,
    ) -> Result<(), RelationError> {
        distinct(follower, followee)?;

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(store_err("unsend follow request"))?;

        let removed = self
            .follow_repo
            .delete_in_tx(&mut *tx, follower, followee)
            .await
            .map_err(store_err("unsend follow request"))?;

        match removed {
            None => return Err(RelationError::NotFound),
            Some(EdgeState::Confirmed) => {
                self.user_repo
                    .adjust_follow_counts_in_tx(&mut *tx, follower, followee, -1)
                    .await
                    .map_err(store_err("unsend follow request"))?;
            }
            Some(EdgeState::Pending) => {}
        }

        tx.commit()
            .await
            .map_err(store_err("unsend follow request"))?;

        debug!(%follower, %followee, "follow edge removed");
        Ok(())
    }

    async fn accept_follow_request(
        &self,
        accepter: UserId,
        requester: UserId,
    ) -> Result<(), RelationError> {
        distinct(accepter, requester)?;

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(store_err("accept follow request"))?;

        // order matters: the edge transition gates the counter update
        let confirmed = self
            .follow_repo
            .confirm_pending_in_tx(&mut *tx, requester, accepter)
            .await
            .map_err(store_err("accept follow request"))?;
        if !confirmed {
            return Err(RelationError::NotFound);
        }

        self.user_repo
            .adjust_follow_counts_in_tx(&mut *tx, requester, accepter, 1)
            .await
            .map_err(store_err("accept follow request"))?;

        tx.commit()
            .await
            .map_err(store_err("accept follow request"))?;

        debug!(%accepter, %requester, "follow request accepted");
        Ok(())
    }

    async fn reject_follow_request(
        &self,
        rejecter: UserId,
        requester: UserId,
    ) -> Result<(), RelationError> {
        distinct(rejecter, requester)?;

        let deleted = self
            .follow_repo
            .delete_pending(requester, rejecter)
            .await
            .map_err(store_err("reject follow request"))?;
        if !deleted {
            return Err(RelationError::NotFound);
        }

        debug!(%rejecter, %requester, "follow request rejected");
        Ok(())
    }

    async fn list_followers(
        &self,
        caller: Option<UserId>,
        target: UserId,
        offset: PageOffset,
        selection: &FieldSelection,
    ) -> Result<Vec<UserView>, RelationError> {
        let records = self
            .follow_repo
            .list_followers(target, offset)
            .await
            .map_err(store_err("list followers"))?;
        self.project(caller, records, selection).await
    }

    async fn list_following(
        &self,
        caller: Option<UserId>,
        target: UserId,
        offset: PageOffset,
        selection: &FieldSelection,
    ) -> Result<Vec<UserView>, RelationError> {
        let records = self
            .follow_repo
            .list_following(target, offset)
            .await
            .map_err(store_err("list following"))?;
        self.project(caller, records, selection).await
    }

    async fn list_pending_follow_requests(
        &self,
        target: UserId,
        offset: PageOffset,
        selection: &FieldSelection,
    ) -> Result<Vec<UserView>, RelationError> {
        let records = self
            .follow_repo
            .list_pending(target, offset)
            .await
            .map_err(store_err("list pending follow requests"))?;
        self.project(Some(target), records, selection).await
    }

    async fn send_mate_request(
        &self,
        requester: UserId,
        target: UserId,
    ) -> Result<(), RelationError> {
        distinct(requester, target)?;

        let outcome = self
            .mate_repo
            .insert_pending(UserPair::new(requester, target), requester)
            .await
            .map_err(store_err("send mate request"))?;
        claim_result(outcome)?;

        debug!(%requester, %target, "mate request sent");
        Ok(())
    }

    async fn unsend_mate_request(
        &self,
        requester: UserId,
        target: UserId,
    ) -> Result<(), RelationError> {
        distinct(requester, target)?;

        let deleted = self
            .mate_repo
            .delete(UserPair::new(requester, target))
            .await
            .map_err(store_err("unsend mate request"))?;
        if !deleted {
            return Err(RelationError::NotFound);
        }

        debug!(%requester, %target, "mate edge removed");
        Ok(())
    }

    async fn accept_mate_request(
        &self,
        accepter: UserId,
        requester: UserId,
    ) -> Result<(), RelationError> {
        distinct(accepter, requester)?;

        let confirmed = self
            .mate_repo
            .confirm_pending(UserPair::new(accepter, requester), requester)
            .await
            .map_err(store_err("accept mate request"))?;
        if !confirmed {
            return Err(RelationError::NotFound);
        }

        debug!(%accepter, %requester, "mate request accepted");
        Ok(())
    }

    async fn reject_mate_request(
        &self,
        rejecter: UserId,
        requester: UserId,
    ) -> Result<(), RelationError> {
        distinct(rejecter, requester)?;

        let deleted = self
            .mate_repo
            .delete_pending(UserPair::new(rejecter, requester), requester)
            .await
            .map_err(store_err("reject mate request"))?;
        if !deleted {
            return Err(RelationError::NotFound);
        }

        debug!(%rejecter, %requester, "mate request rejected");
        Ok(())
    }

    async fn list_mates(
        &self,
        caller: Option<UserId>,
        target: UserId,
        offset: PageOffset,
        selection: &FieldSelection,
    ) -> Result<Vec<UserView>, RelationError> {
        let records = self
            .mate_repo
            .list_mates(target, offset)
            .await
            .map_err(store_err("list mates"))?;
        self.project(caller, records, selection).await
    }

    async fn list_pending_mate_requests(
        &self,
        target: UserId,
        offset: PageOffset,
        selection: &FieldSelection,
    ) -> Result<Vec<UserView>, RelationError> {
        let records = self
            .mate_repo
            .list_pending(target, offset)
            .await
            .map_err(store_err("list pending mate requests"))?;
        self.project(Some(target), records, selection).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::test_support::TestStore;

    fn ids(views: &[UserView]) -> Vec<UserId> {
        views.iter().filter_map(|v| v.id).collect()
    }

    #[tokio::test]
    async fn follow_request_lifecycle() {
        let store = TestStore::new();
        let a = store.user("alice").await;
        let b = store.user("bob").await;
        let svc = &store.relationships;
        let sel = FieldSelection::defaults();

        svc.send_follow_request(a, b).await.unwrap();
        let pending = svc.list_pending_follow_requests(b, PageOffset(0), &sel).await.unwrap();
        assert_eq!(ids(&pending), vec![a]);
        assert!(svc.list_followers(None, b, PageOffset(0), &sel).await.unwrap().is_empty());

        svc.accept_follow_request(b, a).await.unwrap();
        assert_eq!(ids(&svc.list_followers(None, b, PageOffset(0), &sel).await.unwrap()), vec![a]);
        assert_eq!(ids(&svc.list_following(None, a, PageOffset(0), &sel).await.unwrap()), vec![b]);
        assert!(svc.list_pending_follow_requests(b, PageOffset(0), &sel).await.unwrap().is_empty());

        assert_eq!(store.record(a).await.following_count, 1);
        assert_eq!(store.record(b).await.followers_count, 1);
    }

    #[tokio::test]
    async fn any_existing_follow_edge_blocks_a_new_request() {
        let store = TestStore::new();
        let a = store.user("alice").await;
        let b = store.user("bob").await;
        let svc = &store.relationships;

        svc.send_follow_request(a, b).await.unwrap();
        assert!(matches!(svc.send_follow_request(a, b).await, Err(RelationError::Duplicate)));
        assert_eq!(store.follow_state(a, b).await, Some(EdgeState::Pending));

        svc.accept_follow_request(b, a).await.unwrap();
        assert!(matches!(svc.send_follow_request(a, b).await, Err(RelationError::Duplicate)));
        assert_eq!(store.follow_state(a, b).await, Some(EdgeState::Confirmed));

        // the reverse direction is an independent edge
        svc.send_follow_request(b, a).await.unwrap();
    }

    #[tokio::test]
    async fn unsend_twice_reports_not_found() {
        let store = TestStore::new();
        let a = store.user("alice").await;
        let b = store.user("bob").await;
        let svc = &store.relationships;

        svc.send_follow_request(a, b).await.unwrap();
        svc.accept_follow_request(b, a).await.unwrap();

        svc.unsend_follow_request(a, b).await.unwrap();
        assert_eq!(store.follow_state(a, b).await, None);
        assert_eq!(store.record(b).await.followers_count, 0);
        assert_eq!(store.record(a).await.following_count, 0);

        assert!(matches!(svc.unsend_follow_request(a, b).await, Err(RelationError::NotFound)));
        assert_eq!(store.follow_state(a, b).await, None);
        assert_eq!(store.record(b).await.followers_count, 0);
    }

    #[tokio::test]
    async fn only_the_recipient_can_accept_a_follow_request() {
        let store = TestStore::new();
        let a = store.user("alice").await;
        let b = store.user("bob").await;
        let svc = &store.relationships;

        svc.send_follow_request(a, b).await.unwrap();

        assert!(matches!(svc.accept_follow_request(a, b).await, Err(RelationError::NotFound)));
        assert_eq!(store.follow_state(a, b).await, Some(EdgeState::Pending));

        svc.accept_follow_request(b, a).await.unwrap();
        assert!(matches!(svc.accept_follow_request(b, a).await, Err(RelationError::NotFound)));
    }

    #[tokio::test]
    async fn reject_only_removes_pending_follow_requests() {
        let store = TestStore::new();
        let a = store.user("alice").await;
        let b = store.user("bob").await;
        let c = store.user("carol").await;
        let svc = &store.relationships;

        svc.send_follow_request(a, b).await.unwrap();
        assert!(matches!(svc.reject_follow_request(a, b).await, Err(RelationError::NotFound)));
        svc.reject_follow_request(b, a).await.unwrap();
        assert_eq!(store.follow_state(a, b).await, None);

        svc.send_follow_request(c, b).await.unwrap();
        svc.accept_follow_request(b, c).await.unwrap();
        assert!(matches!(svc.reject_follow_request(b, c).await, Err(RelationError::NotFound)));
        assert_eq!(store.follow_state(c, b).await, Some(EdgeState::Confirmed));
    }

    #[tokio::test]
    async fn self_relations_are_refused() {
        let store = TestStore::new();
        let a = store.user("alice").await;
        let svc = &store.relationships;

        assert!(matches!(svc.send_follow_request(a, a).await, Err(RelationError::SelfRelation)));
        assert!(matches!(svc.send_mate_request(a, a).await, Err(RelationError::SelfRelation)));
    }

    #[tokio::test]
    async fn requests_towards_unknown_users_are_refused() {
        let store = TestStore::new();
        let a = store.user("alice").await;
        let ghost = UserId::new_v4();
        let svc = &store.relationships;

        assert!(matches!(svc.send_follow_request(a, ghost).await, Err(RelationError::UserNotFound)));
        assert!(matches!(svc.send_mate_request(a, ghost).await, Err(RelationError::UserNotFound)));
    }

    #[tokio::test]
    async fn followers_are_paged_by_ten() {
        let store = TestStore::new();
        let u = store.user("popular").await;
        let svc = &store.relationships;
        let sel = FieldSelection::defaults();

        let mut followers = Vec::new();
        for i in 0..15 {
            let f = store.user(&format!("fan{i:02}")).await;
            svc.send_follow_request(f, u).await.unwrap();
            svc.accept_follow_request(u, f).await.unwrap();
            followers.push(f);
        }

        let first = svc.list_followers(None, u, PageOffset(0), &sel).await.unwrap();
        let second = svc.list_followers(None, u, PageOffset(10), &sel).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 5);

        let mut seen = ids(&first);
        seen.extend(ids(&second));
        assert_eq!(seen, followers);
        assert_eq!(store.record(u).await.followers_count, 15);
    }

    #[tokio::test]
    async fn mate_edge_is_symmetric_once_accepted() {
        let store = TestStore::new();
        let a = store.user("alice").await;
        let b = store.user("bob").await;
        let svc = &store.relationships;
        let sel = FieldSelection::defaults();

        svc.send_mate_request(a, b).await.unwrap();
        assert!(matches!(svc.send_mate_request(b, a).await, Err(RelationError::Duplicate)));
        assert_eq!(
            ids(&svc.list_pending_mate_requests(b, PageOffset(0), &sel).await.unwrap()),
            vec![a]
        );
        assert!(svc.list_pending_mate_requests(a, PageOffset(0), &sel).await.unwrap().is_empty());

        svc.accept_mate_request(b, a).await.unwrap();
        assert!(matches!(svc.send_mate_request(b, a).await, Err(RelationError::Duplicate)));
        assert!(matches!(svc.send_mate_request(a, b).await, Err(RelationError::Duplicate)));

        assert_eq!(ids(&svc.list_mates(None, a, PageOffset(0), &sel).await.unwrap()), vec![b]);
        assert_eq!(ids(&svc.list_mates(None, b, PageOffset(0), &sel).await.unwrap()), vec![a]);
    }

    #[tokio::test]
    async fn only_the_recipient_can_accept_or_reject_a_mate_request() {
        let store = TestStore::new();
        let a = store.user("alice").await;
        let b = store.user("bob").await;
        let svc = &store.relationships;

        svc.send_mate_request(a, b).await.unwrap();
        assert!(matches!(svc.accept_mate_request(a, b).await, Err(RelationError::NotFound)));
        assert!(matches!(svc.reject_mate_request(a, b).await, Err(RelationError::NotFound)));

        svc.reject_mate_request(b, a).await.unwrap();
        assert_eq!(store.mate_state(a, b).await, None);

        svc.send_mate_request(a, b).await.unwrap();
        svc.accept_mate_request(b, a).await.unwrap();
        assert!(matches!(svc.reject_mate_request(b, a).await, Err(RelationError::NotFound)));
        assert_eq!(store.mate_state(a, b).await, Some(EdgeState::Confirmed));
    }

    #[tokio::test]
    async fn either_side_can_remove_a_mate_edge() {
        let store = TestStore::new();
        let a = store.user("alice").await;
        let b = store.user("bob").await;
        let svc = &store.relationships;

        svc.send_mate_request(a, b).await.unwrap();
        svc.accept_mate_request(b, a).await.unwrap();

        svc.unsend_mate_request(b, a).await.unwrap();
        assert_eq!(store.mate_state(a, b).await, None);
        assert!(matches!(svc.unsend_mate_request(a, b).await, Err(RelationError::NotFound)));
    }

    #[tokio::test]
    async fn listings_carry_the_callers_relation() {
        let store = TestStore::new();
        let a = store.user("alice").await;
        let b = store.user("bob").await;
        let c = store.user("carol").await;
        let svc = &store.relationships;
        let sel = FieldSelection::defaults().with(UserField::Relation);

        // b follows c; a looks at c's followers and sees b
        svc.send_follow_request(b, c).await.unwrap();
        svc.accept_follow_request(c, b).await.unwrap();
        svc.send_follow_request(a, b).await.unwrap();
        svc.accept_follow_request(b, a).await.unwrap();

        let listed = svc.list_followers(Some(a), c, PageOffset(0), &sel).await.unwrap();
        let relation = listed[0].relation.unwrap();
        assert_eq!(relation.is_following, Some(true));
        assert_eq!(relation.is_followed, Some(false));

        let anonymous = svc.list_followers(None, c, PageOffset(0), &sel).await.unwrap();
        assert_eq!(anonymous[0].relation, Some(RelationSummary::unknown()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn crossing_mate_requests_leave_one_edge() {
        let store = TestStore::new();
        let a = store.user("alice").await;
        let b = store.user("bob").await;
        let svc = &store.relationships;

        let (from_a, from_b) =
            tokio::join!(svc.send_mate_request(a, b), svc.send_mate_request(b, a));

        let outcomes = [from_a, from_b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|r| matches!(r, Err(RelationError::Duplicate)))
                .count(),
            1
        );
        assert_eq!(store.mate_state(a, b).await, Some(EdgeState::Pending));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn repeated_follow_requests_race_to_one_edge() {
        let store = TestStore::new();
        let a = store.user("alice").await;
        let b = store.user("bob").await;
        let svc = &store.relationships;

        let (first, second) =
            tokio::join!(svc.send_follow_request(a, b), svc.send_follow_request(a, b));

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            outcomes
                .iter()
                .any(|r| matches!(r, Err(RelationError::Duplicate)))
        );
        assert_eq!(store.follow_state(a, b).await, Some(EdgeState::Pending));
    }
}
