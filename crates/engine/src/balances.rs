//! Balance aggregation.
//!
//! Reduces a group's obligations (expense splits) into one net position per
//! member. Every call builds a fresh mapping from the obligations it is
//! given; nothing is cached between calls.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

/// One member's owed share of one expense, as seen by the core.
///
/// `payer_id` fronted the money, `ower_id` owes `amount` back to them.
/// `incurred_at` is the parent expense date, used to order the settlement walk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
    pub id: Uuid,
    pub payer_id: String,
    pub ower_id: String,
    pub amount: Money,
    pub settled: bool,
    pub incurred_at: DateTime<Utc>,
}

impl Obligation {
    /// An obligation contributes to balances only while unsettled and only
    /// when it moves money between two different members.
    #[must_use]
    pub fn is_outstanding(&self) -> bool {
        !self.settled && self.payer_id != self.ower_id
    }
}

/// Net position of a member.
///
/// Positive: the group owes this member. Negative: this member owes the group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub user_id: String,
    pub amount: Money,
}

impl Balance {
    pub fn new(user_id: impl Into<String>, amount: Money) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
        }
    }
}

/// Presentation view of a member's position in a group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSummary {
    pub user_id: String,
    pub display_name: String,
    /// Total of unsettled shares this member owes to others.
    pub owes: Money,
    /// Total of unsettled shares others owe to this member.
    pub owed: Money,
    /// `owed - owes`.
    pub net: Money,
}

impl MemberSummary {
    fn empty(user_id: &str, display_name: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            owes: Money::ZERO,
            owed: Money::ZERO,
            net: Money::ZERO,
        }
    }
}

/// Computes the net balance of every member appearing in an unsettled
/// obligation.
///
/// The payer is credited and the ower debited by each outstanding
/// obligation; settled ones and self-owed ones are skipped. Members without
/// outstanding obligations are absent, so callers listing a whole group must
/// default missing members to zero. Entries come out in first-seen order.
///
/// # Errors
///
/// [`EngineError::InvalidAmount`] when a balance overflows.
pub fn compute_balances(obligations: &[Obligation]) -> ResultEngine<Vec<Balance>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut balances: Vec<Balance> = Vec::new();

    for obligation in obligations.iter().filter(|o| o.is_outstanding()) {
        let payer = slot(&mut index, &mut balances, &obligation.payer_id);
        balances[payer].amount = balances[payer].amount.try_add(obligation.amount)?;
        let ower = slot(&mut index, &mut balances, &obligation.ower_id);
        balances[ower].amount = balances[ower].amount.try_sub(obligation.amount)?;
    }
    Ok(balances)
}

fn slot<'a>(
    index: &mut HashMap<&'a str, usize>,
    balances: &mut Vec<Balance>,
    user_id: &'a str,
) -> usize {
    *index.entry(user_id).or_insert_with(|| {
        balances.push(Balance::new(user_id, Money::ZERO));
        balances.len() - 1
    })
}

/// Checks the conservation law: every debit has a matching credit, so a
/// balance set always sums to zero.
pub fn ensure_conserved(balances: &[Balance]) -> ResultEngine<()> {
    let total = Money::try_sum(balances.iter().map(|b| b.amount))?;
    if !total.is_zero() {
        tracing::error!(%total, members = balances.len(), "balances do not sum to zero");
        return Err(EngineError::InvariantViolation(format!(
            "balances sum to {total}, expected 0.00"
        )));
    }
    Ok(())
}

/// Builds the per-member view of a group.
///
/// `members` is `(user_id, display_name)` for every current member; members
/// without outstanding obligations are reported with zero totals. Parties
/// that appear in obligations but are no longer members are still reported
/// so the view keeps summing to zero. Sorted by display name.
///
/// # Errors
///
/// [`EngineError::InvalidAmount`] when a total overflows.
pub fn summarize_members(
    obligations: &[Obligation],
    members: &[(String, String)],
) -> ResultEngine<Vec<MemberSummary>> {
    let mut summaries: HashMap<String, MemberSummary> = members
        .iter()
        .map(|(user_id, display_name)| {
            (user_id.clone(), MemberSummary::empty(user_id, display_name))
        })
        .collect();

    for obligation in obligations.iter().filter(|o| o.is_outstanding()) {
        let payer = summary_for(&mut summaries, &obligation.payer_id);
        payer.owed = payer.owed.try_add(obligation.amount)?;
        let ower = summary_for(&mut summaries, &obligation.ower_id);
        ower.owes = ower.owes.try_add(obligation.amount)?;
    }

    let mut out = summaries
        .into_values()
        .map(|mut s| {
            s.net = s.owed.try_sub(s.owes)?;
            Ok(s)
        })
        .collect::<ResultEngine<Vec<MemberSummary>>>()?;
    out.sort_by(|a, b| {
        a.display_name
            .cmp(&b.display_name)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    Ok(out)
}

fn summary_for<'a>(
    summaries: &'a mut HashMap<String, MemberSummary>,
    user_id: &str,
) -> &'a mut MemberSummary {
    summaries
        .entry(user_id.to_string())
        .or_insert_with(|| MemberSummary::empty(user_id, user_id))
}
