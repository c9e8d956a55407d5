use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{FollowRepo, MateRepo, UserRecord};
use std::sync::Arc;

pub struct RealRelationResolver {
    follow_repo: Arc<dyn FollowRepo>,
    mate_repo: Arc<dyn MateRepo>,
}

impl RealRelationResolver {
    pub fn new(follow_repo: Arc<dyn FollowRepo>, mate_repo: Arc<dyn MateRepo>) -> Self {
        Self {
            follow_repo,
            mate_repo,
        }
    }
}

#[async_trait::async_trait]
impl RelationResolver for RealRelationResolver {
    async fn fetch_relation(
        &self,
        actor: Option<UserId>,
        target: Option<UserId>,
    ) -> Result<RelationSummary, RelationError> {
        let (Some(actor), Some(target)) = (actor, target) else {
            return Ok(RelationSummary::unknown());
        };
        if actor == target {
            return Ok(RelationSummary::resolved(None, None, None));
        }

        let (following, followed, mates) = tokio::try_join!(
            self.follow_repo.state(actor, target),
            self.follow_repo.state(target, actor),
            self.mate_repo.state(UserPair::new(actor, target)),
        )
        .map_err(|e| RelationError::Store(format!("fetch relation: {e}")))?;

        Ok(RelationSummary::resolved(following, followed, mates))
    }
}

/// Projects `records` onto `selection`, attaching the caller's relation to each row
/// when the selection asks for it.
pub async fn project_users(
    resolver: &dyn RelationResolver,
    caller: Option<UserId>,
    records: &[UserRecord],
    selection: &FieldSelection,
) -> Result<Vec<UserView>, RelationError> {
    let mut views = Vec::with_capacity(records.len());
    for record in records {
        let mut view = UserView::project(record, selection);
        if selection.wants_relation() {
            view.relation = Some(
                resolver
                    .fetch_relation(caller, Some(record.user_id))
                    .await?,
            );
        }
        views.push(view);
    }
    Ok(views)
}
