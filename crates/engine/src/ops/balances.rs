use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Currency, EngineError, MemberSummary, Money, ResultEngine, SimplifiedDebt, compute_balances,
    ensure_conserved, simplify_debts, summarize_members, util::parse_uuid,
};

use super::{Engine, with_tx};

/// A user's net position in one group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupOverview {
    pub group_id: Uuid,
    pub name: String,
    pub currency: Currency,
    pub net: Money,
}

/// A user's position across every active group they belong to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOverview {
    pub groups: Vec<GroupOverview>,
    /// Sum of the groups where the user is a net debtor, as a positive amount.
    pub you_owe: Money,
    /// Sum of the groups where the user is a net creditor.
    pub owed_to_you: Money,
    /// `owed_to_you - you_owe`.
    pub net: Money,
}

/// Net position between two users over the groups they share.
///
/// Positive: `other_id` owes the caller. Negative: the caller owes `other_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairBalance {
    pub other_id: String,
    pub net: Money,
    pub groups: Vec<GroupOverview>,
}

impl Engine {
    /// Per-member owes/owed/net view of a group, sorted by display name.
    pub async fn group_balances(
        &self,
        group_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Vec<MemberSummary>> {
        with_tx!(self, |db_tx| {
            self.require_member(&db_tx, group_id, user_id).await?;
            let obligations = self.group_obligations(&db_tx, group_id).await?;
            ensure_conserved(&compute_balances(&obligations)?)?;
            let members: Vec<(String, String)> = self
                .members(&db_tx, group_id)
                .await?
                .into_iter()
                .map(|m| (m.user_id, m.display_name))
                .collect();
            summarize_members(&obligations, &members)
        })
    }

    /// Minimal list of payments that clears the group's net balances.
    pub async fn suggested_settlements(
        &self,
        group_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Vec<SimplifiedDebt>> {
        with_tx!(self, |db_tx| {
            self.require_member(&db_tx, group_id, user_id).await?;
            let obligations = self.group_obligations(&db_tx, group_id).await?;
            let debts = simplify_debts(&compute_balances(&obligations)?)?;
            tracing::debug!(%group_id, transfers = debts.len(), "suggested settlements");
            Ok(debts)
        })
    }

    /// Net position of `user_id` in each active group, with totals.
    pub async fn user_overview(&self, user_id: &str) -> ResultEngine<UserOverview> {
        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, user_id).await?;
            let mut overview = UserOverview::default();
            for group in self.active_groups_of(&db_tx, user_id).await? {
                let group_id = parse_uuid(&group.id, "group")?;
                let obligations = self.group_obligations(&db_tx, group_id).await?;
                let net = compute_balances(&obligations)?
                    .into_iter()
                    .find(|b| b.user_id == user_id)
                    .map(|b| b.amount)
                    .unwrap_or_default();
                if net.is_negative() {
                    overview.you_owe = overview.you_owe.try_sub(net)?;
                } else {
                    overview.owed_to_you = overview.owed_to_you.try_add(net)?;
                }
                overview.groups.push(GroupOverview {
                    group_id,
                    name: group.name,
                    currency: Currency::try_from(group.currency.as_str())?,
                    net,
                });
            }
            overview.net = overview.owed_to_you.try_sub(overview.you_owe)?;
            Ok(overview)
        })
    }

    /// Net position between `user_id` and `other` over their shared groups.
    ///
    /// Only unsettled splits directly between the two count; debts routed
    /// through third members do not.
    pub async fn pair_balance(&self, user_id: &str, other: &str) -> ResultEngine<PairBalance> {
        if user_id == other {
            return Err(EngineError::InvalidAmount(
                "cannot compute a balance with yourself".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, other).await?;
            let mut pair = PairBalance {
                other_id: other.to_string(),
                net: Money::ZERO,
                groups: Vec::new(),
            };
            for group in self.active_groups_of(&db_tx, user_id).await? {
                let group_id = parse_uuid(&group.id, "group")?;
                if self.member_role(&db_tx, group_id, other).await?.is_none() {
                    continue;
                }
                let obligations = self.group_obligations(&db_tx, group_id).await?;
                let mut net = Money::ZERO;
                for o in obligations.iter().filter(|o| o.is_outstanding()) {
                    if o.payer_id == user_id && o.ower_id == other {
                        net = net.try_add(o.amount)?;
                    } else if o.payer_id == other && o.ower_id == user_id {
                        net = net.try_sub(o.amount)?;
                    }
                }
                pair.net = pair.net.try_add(net)?;
                pair.groups.push(GroupOverview {
                    group_id,
                    name: group.name,
                    currency: Currency::try_from(group.currency.as_str())?,
                    net,
                });
            }
            Ok(pair)
        })
    }
}
