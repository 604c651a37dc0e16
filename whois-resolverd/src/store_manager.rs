use tokio::sync::{mpsc, oneshot};
use anyhow::Result;
use shared::types::ResolvedRecord;
use crate::store::memory::ResultStore;

/// Commands sent to the store task
pub enum StoreCommand {
    Put(String, ResolvedRecord, oneshot::Sender<()>),
    Get(String, oneshot::Sender<Option<ResolvedRecord>>),
    Delete(String, oneshot::Sender<()>),
    Take(String, oneshot::Sender<Option<ResolvedRecord>>),
    Contains(String, oneshot::Sender<bool>),
    Len(oneshot::Sender<usize>),
    Shutdown,
}

/// Handle to the result store. Every operation runs on the single task that
/// owns the map, so each one is atomic per key.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    /// Spawn the store task around the given store
    pub fn spawn(mut store: ResultStore) -> Self {
        let (tx, mut rx) = mpsc::channel::<StoreCommand>(256);

        tokio::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                match cmd {
                    StoreCommand::Put(id, record, reply) => {
                        store.put(id, record);
                        let _ = reply.send(());
                    }
                    StoreCommand::Get(id, reply) => {
                        let _ = reply.send(store.get(&id));
                    }
                    StoreCommand::Delete(id, reply) => {
                        store.delete(&id);
                        let _ = reply.send(());
                    }
                    StoreCommand::Take(id, reply) => {
                        let _ = reply.send(store.take(&id));
                    }
                    StoreCommand::Contains(id, reply) => {
                        let _ = reply.send(store.contains(&id));
                    }
                    StoreCommand::Len(reply) => {
                        let _ = reply.send(store.len());
                    }
                    StoreCommand::Shutdown => {
                        tracing::info!("Result store shutting down");
                        break;
                    }
                }
            }
        });

        Self { tx }
    }

    /// Insert or overwrite a record
    pub async fn put(&self, id: String, record: ResolvedRecord) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(StoreCommand::Put(id, record, reply)).await?;
        Ok(rx.await?)
    }

    pub async fn get(&self, id: String) -> Result<Option<ResolvedRecord>> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(StoreCommand::Get(id, reply)).await?;
        Ok(rx.await?)
    }

    /// Remove a record, succeeding whether or not it exists
    pub async fn delete(&self, id: String) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(StoreCommand::Delete(id, reply)).await?;
        Ok(rx.await?)
    }

    /// Claim a record: fetch and remove it
    pub async fn take(&self, id: String) -> Result<Option<ResolvedRecord>> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(StoreCommand::Take(id, reply)).await?;
        Ok(rx.await?)
    }

    pub async fn contains(&self, id: String) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(StoreCommand::Contains(id, reply)).await?;
        Ok(rx.await?)
    }

    pub async fn len(&self) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(StoreCommand::Len(reply)).await?;
        Ok(rx.await?)
    }

    /// Stop the store task
    pub async fn shutdown(&self) -> Result<()> {
        self.tx.send(StoreCommand::Shutdown).await?;
        Ok(())
    }
}
