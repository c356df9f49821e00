use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Currency, EngineError, Money, ResultEngine, SettlementCmd, SettlementRecord, expense_splits,
    plan_settlement, settlements, util::normalize_optional_text, validate_settlement,
};

use super::{Engine, with_tx};

/// What a recorded settlement did to the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    pub record: SettlementRecord,
    /// Splits flipped to settled, oldest expense first.
    pub cleared: Vec<Uuid>,
    /// Sum of the cleared splits.
    pub applied: Money,
    /// Part of the payment that cleared nothing. Only the record keeps it.
    pub unapplied: Money,
}

impl Engine {
    /// Records a payment and settles the splits it covers.
    ///
    /// The record is written even when no split is cleared. Splits are
    /// settled oldest expense first, whole splits only; see
    /// [`plan_settlement`] for the walk. Settlements of one group run one at
    /// a time, each inside a single DB transaction.
    pub async fn record_settlement(&self, cmd: SettlementCmd) -> ResultEngine<SettlementOutcome> {
        validate_settlement(&cmd.from_id, &cmd.to_id, cmd.amount)?;

        let lock = self.group_lock(cmd.group_id).await;
        let outcome = {
            let _guard = lock.lock().await;
            self.apply_settlement(&cmd).await
        };
        self.release_group_lock(cmd.group_id, lock).await;
        outcome
    }

    async fn apply_settlement(&self, cmd: &SettlementCmd) -> ResultEngine<SettlementOutcome> {
        with_tx!(self, |db_tx| {
            let (group, _) = self
                .require_member(&db_tx, cmd.group_id, &cmd.user_id)
                .await?;
            for party in [&cmd.from_id, &cmd.to_id] {
                if let Err(err) = self.require_party_member(&db_tx, cmd.group_id, party).await {
                    tracing::warn!(
                        group_id = %cmd.group_id,
                        from = %cmd.from_id,
                        to = %cmd.to_id,
                        amount = %cmd.amount,
                        "settlement rejected: {err}"
                    );
                    return Err(err);
                }
            }

            let mut record = SettlementRecord::new(
                cmd.group_id,
                cmd.from_id.clone(),
                cmd.to_id.clone(),
                cmd.amount,
                Currency::try_from(group.currency.as_str())?,
                &cmd.user_id,
            );
            record.notes = normalize_optional_text(cmd.notes.as_deref());
            let record_entry: settlements::ActiveModel = (&record).into();
            record_entry.insert(&db_tx).await?;

            let obligations = self.group_obligations(&db_tx, cmd.group_id).await?;
            let plan = plan_settlement(
                &obligations,
                &cmd.from_id,
                &cmd.to_id,
                cmd.amount,
                self.walk_policy,
            );
            tracing::debug!(
                group_id = %cmd.group_id,
                candidates = obligations.len(),
                cleared = plan.settled.len(),
                policy = self.walk_policy.as_str(),
                "settlement planned"
            );

            if !plan.settled.is_empty() {
                let ids: Vec<String> = plan.settled.iter().map(ToString::to_string).collect();
                let result = expense_splits::Entity::update_many()
                    .col_expr(expense_splits::Column::Settled, Expr::value(true))
                    .col_expr(
                        expense_splits::Column::SettledAt,
                        Expr::value(Some(record.settled_at)),
                    )
                    .filter(expense_splits::Column::Id.is_in(ids))
                    .filter(expense_splits::Column::Settled.eq(false))
                    .exec(&db_tx)
                    .await?;
                if result.rows_affected != plan.settled.len() as u64 {
                    tracing::error!(
                        group_id = %cmd.group_id,
                        expected = plan.settled.len(),
                        updated = result.rows_affected,
                        "settled splits changed under the group lock"
                    );
                    return Err(EngineError::InvariantViolation(
                        "splits changed while settling".to_string(),
                    ));
                }
            }

            tracing::info!(
                group_id = %cmd.group_id,
                from = %cmd.from_id,
                to = %cmd.to_id,
                amount = %cmd.amount,
                cleared = plan.settled.len(),
                unapplied = %plan.unapplied,
                "settlement recorded"
            );
            Ok(SettlementOutcome {
                record,
                cleared: plan.settled,
                applied: plan.applied,
                unapplied: plan.unapplied,
            })
        })
    }

    /// Settlement history of a group, newest first.
    pub async fn list_settlements(
        &self,
        group_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Vec<SettlementRecord>> {
        with_tx!(self, |db_tx| {
            self.require_member(&db_tx, group_id, user_id).await?;
            settlements::Entity::find()
                .filter(settlements::Column::GroupId.eq(group_id.to_string()))
                .order_by_desc(settlements::Column::SettledAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(SettlementRecord::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }
}
