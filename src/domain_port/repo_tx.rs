use std::any::Any;

#[async_trait::async_trait]
pub trait TxManager: Send + Sync {
    async fn begin(&self) -> anyhow::Result<Box<dyn StorageTx>>;
}

/// A unit of work opened by a [`TxManager`]. Dropping it without `commit` rolls back.
#[async_trait::async_trait]
pub trait StorageTx: Send {
    /// Lets a backend recover its own transaction type from the trait object.
    fn as_any_mut(&mut self) -> &mut (dyn Any + Send);
    async fn commit(self: Box<Self>) -> anyhow::Result<()>;
    async fn rollback(self: Box<Self>) -> anyhow::Result<()>;
}
