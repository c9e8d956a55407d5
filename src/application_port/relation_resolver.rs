use crate::application_port::RelationError;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait RelationResolver: Send + Sync {
    /// Relation of `actor` towards `target`. Every facet is unknown when either side
    /// is missing; otherwise every facet is a definite boolean.
    async fn fetch_relation(
        &self,
        actor: Option<UserId>,
        target: Option<UserId>,
    ) -> Result<RelationSummary, RelationError>;
}
