use std::{collections::HashMap, sync::Arc};

use sea_orm::DatabaseConnection;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{ResultEngine, WalkPolicy};

mod access;
mod balances;
mod expenses;
mod groups;
mod settlements;
mod users;

pub use balances::{GroupOverview, PairBalance, UserOverview};
pub use expenses::{ExpenseListFilter, UserExpenseFilter, UserExpenseKind};
pub use settlements::SettlementOutcome;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    walk_policy: WalkPolicy,
    /// One writer lock per group, taken around every settlement.
    group_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    async fn group_lock(&self, group_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.group_locks.lock().await;
        Arc::clone(locks.entry(group_id).or_default())
    }

    /// Gives back a lock taken with `group_lock`, forgetting it once no
    /// other task holds or waits on it.
    async fn release_group_lock(&self, group_id: Uuid, lock: Arc<Mutex<()>>) {
        let mut locks = self.group_locks.lock().await;
        drop(lock);
        if locks
            .get(&group_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&group_id);
        }
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    walk_policy: WalkPolicy,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// How a settlement walks past an obligation larger than what is left.
    pub fn walk_policy(mut self, policy: WalkPolicy) -> EngineBuilder {
        self.walk_policy = policy;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            walk_policy: self.walk_policy,
            group_locks: Mutex::new(HashMap::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn group_locks_are_forgotten_after_the_last_release() {
        let engine = Engine::builder().build().await.unwrap();
        let group_id = Uuid::new_v4();

        let first = engine.group_lock(group_id).await;
        let second = engine.group_lock(group_id).await;
        assert!(Arc::ptr_eq(&first, &second));

        engine.release_group_lock(group_id, first).await;
        assert_eq!(engine.group_locks.lock().await.len(), 1);
        engine.release_group_lock(group_id, second).await;
        assert!(engine.group_locks.lock().await.is_empty());
    }
}
