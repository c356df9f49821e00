use chrono::Utc;
use sea_orm::{ActiveValue, TransactionTrait, prelude::*};

use crate::{EngineError, ResultEngine, users, util::normalize_required_name};

use super::{Engine, with_tx};

impl Engine {
    /// Registers a user. `display_name` falls back to the username.
    pub async fn create_user(&self, username: &str, display_name: &str) -> ResultEngine<()> {
        let username = normalize_required_name(username, "user")?;
        let display_name = match display_name.trim() {
            "" => username.clone(),
            name => name.to_string(),
        };
        with_tx!(self, |db_tx| {
            if users::Entity::find_by_id(username.clone())
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(username));
            }
            users::ActiveModel {
                username: ActiveValue::Set(username.clone()),
                display_name: ActiveValue::Set(display_name),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;
            tracing::info!(user = %username, "user created");
            Ok(())
        })
    }
}
