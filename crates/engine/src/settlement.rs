//! Settlement walk.
//!
//! A recorded payment from `from_id` to `to_id` discharges the obligations it
//! can plausibly cover: unsettled shares where `to_id` paid and `from_id`
//! owes, oldest expense first. This module plans that walk without touching
//! storage; `Engine::record_settlement` applies the plan inside one DB
//! transaction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, Obligation, ResultEngine};

/// How the walk reacts to an obligation larger than what is left of the
/// payment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkPolicy {
    /// Stop at the first obligation that does not fit, even if smaller ones
    /// follow.
    #[default]
    StopAtFirstMiss,
    /// Skip obligations that do not fit and keep scanning for later ones
    /// that still do.
    SkipOversized,
}

impl WalkPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StopAtFirstMiss => "stop_at_first_miss",
            Self::SkipOversized => "skip_oversized",
        }
    }
}

impl TryFrom<&str> for WalkPolicy {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "stop_at_first_miss" => Ok(Self::StopAtFirstMiss),
            "skip_oversized" => Ok(Self::SkipOversized),
            other => Err(EngineError::InvalidSettlement(format!(
                "unknown walk policy: {other}"
            ))),
        }
    }
}

/// Outcome of a settlement walk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettlementPlan {
    /// Obligations to flip to settled, in walk order.
    pub settled: Vec<Uuid>,
    /// Sum of the settled obligations.
    pub applied: Money,
    /// Part of the payment that cleared nothing. It is not tracked anywhere
    /// beyond the settlement record itself.
    pub unapplied: Money,
}

/// Validates a settlement request before anything is persisted.
///
/// Membership of both parties is checked by the caller against the store.
pub fn validate_settlement(from_id: &str, to_id: &str, amount: Money) -> ResultEngine<()> {
    if from_id == to_id {
        return Err(EngineError::InvalidSettlement(
            "payer and payee must differ".to_string(),
        ));
    }
    if !amount.is_positive() {
        return Err(EngineError::InvalidAmount(
            "settlement amount must be > 0".to_string(),
        ));
    }
    Ok(())
}

/// Plans which obligations a payment of `amount` from `from_id` to `to_id`
/// discharges.
///
/// Candidates are the unsettled obligations with `payer_id == to_id` and
/// `ower_id == from_id`, oldest `incurred_at` first (input order breaks
/// ties). Each candidate is settled only if it fits entirely in what is left
/// of the payment; the comparison is exact, so the walk never over-settles.
#[must_use]
pub fn plan_settlement(
    obligations: &[Obligation],
    from_id: &str,
    to_id: &str,
    amount: Money,
    policy: WalkPolicy,
) -> SettlementPlan {
    let mut candidates: Vec<&Obligation> = obligations
        .iter()
        .filter(|o| !o.settled && o.payer_id == to_id && o.ower_id == from_id)
        .collect();
    candidates.sort_by_key(|o| o.incurred_at);

    let mut plan = SettlementPlan {
        unapplied: amount,
        ..SettlementPlan::default()
    };
    for obligation in candidates {
        if obligation.amount > plan.unapplied {
            match policy {
                WalkPolicy::StopAtFirstMiss => break,
                WalkPolicy::SkipOversized => continue,
            }
        }
        plan.settled.push(obligation.id);
        plan.applied += obligation.amount;
        plan.unapplied -= obligation.amount;
    }
    plan
}
