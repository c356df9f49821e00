//! Expense split shares.
//!
//! An expense fans out into one obligation per participant. These helpers
//! build and check the shares before anything reaches the store.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, ResultEngine};

/// One participant's share of an expense, before it is persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitShare {
    pub user_id: String,
    pub amount: Money,
}

impl SplitShare {
    pub fn new(user_id: impl Into<String>, amount: Money) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
        }
    }
}

/// Divides `total` equally among `participants` in whole minor units.
///
/// The leftover minor units go one each to the first participants, so the
/// shares always add up to `total` exactly.
pub fn equal_split(total: Money, participants: &[String]) -> ResultEngine<Vec<SplitShare>> {
    if participants.is_empty() {
        return Err(EngineError::InvalidSplit(
            "at least one participant is required".to_string(),
        ));
    }
    if !total.is_positive() {
        return Err(EngineError::InvalidAmount(
            "expense amount must be > 0".to_string(),
        ));
    }

    let count = participants.len() as i64;
    let base = total.minor() / count;
    let remainder = total.minor() % count;
    Ok(participants
        .iter()
        .enumerate()
        .map(|(i, user_id)| {
            let extra = i64::from((i as i64) < remainder);
            SplitShare::new(user_id.clone(), Money::new(base + extra))
        })
        .collect())
}

/// Checks the shares of an expense of `total`.
///
/// Every share must be positive, each participant may appear once, every
/// participant must be in `members`, and the shares must add up to `total`
/// within [`Money::EPSILON`].
pub fn validate_splits(
    total: Money,
    shares: &[SplitShare],
    members: &[String],
) -> ResultEngine<()> {
    if !total.is_positive() {
        return Err(EngineError::InvalidAmount(
            "expense amount must be > 0".to_string(),
        ));
    }
    if shares.is_empty() {
        return Err(EngineError::InvalidSplit(
            "at least one participant is required".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(shares.len());
    for share in shares {
        if !share.amount.is_positive() {
            return Err(EngineError::InvalidSplit(format!(
                "share of {} must be > 0",
                share.user_id
            )));
        }
        if !seen.insert(share.user_id.as_str()) {
            return Err(EngineError::InvalidSplit(format!(
                "{} appears more than once",
                share.user_id
            )));
        }
        if !members.iter().any(|m| m == &share.user_id) {
            return Err(EngineError::NotMember(share.user_id.clone()));
        }
    }

    let sum = Money::try_sum(shares.iter().map(|s| s.amount))?;
    if !sum.within_epsilon(total) {
        return Err(EngineError::InvalidSplit(format!(
            "shares add up to {sum}, expense amount is {total}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn equal_split_spreads_remainder() {
        let shares = equal_split(Money::new(10_000), &members(&["a", "b", "c"])).unwrap();
        let amounts: Vec<i64> = shares.iter().map(|s| s.amount.minor()).collect();
        assert_eq!(amounts, vec![3334, 3333, 3333]);
        assert_eq!(shares.iter().map(|s| s.amount).sum::<Money>(), Money::new(10_000));
    }

    #[test]
    fn equal_split_rejects_empty_participants() {
        assert!(matches!(
            equal_split(Money::new(100), &[]),
            Err(EngineError::InvalidSplit(_))
        ));
    }

    #[test]
    fn accepts_one_cent_rounding_gap() {
        let group = members(&["a", "b", "c"]);
        let shares = vec![
            SplitShare::new("a", Money::new(3333)),
            SplitShare::new("b", Money::new(3333)),
            SplitShare::new("c", Money::new(3333)),
        ];
        assert!(validate_splits(Money::new(10_000), &shares, &group).is_ok());
    }

    #[test]
    fn rejects_sum_mismatch() {
        let group = members(&["a", "b"]);
        let shares = vec![
            SplitShare::new("a", Money::new(4000)),
            SplitShare::new("b", Money::new(4000)),
        ];
        assert!(matches!(
            validate_splits(Money::new(9000), &shares, &group),
            Err(EngineError::InvalidSplit(_))
        ));
    }

    #[test]
    fn rejects_non_members_duplicates_and_zero_shares() {
        let group = members(&["a", "b"]);
        assert_eq!(
            validate_splits(
                Money::new(100),
                &[SplitShare::new("z", Money::new(100))],
                &group
            ),
            Err(EngineError::NotMember("z".to_string()))
        );
        assert!(matches!(
            validate_splits(
                Money::new(200),
                &[
                    SplitShare::new("a", Money::new(100)),
                    SplitShare::new("a", Money::new(100)),
                ],
                &group
            ),
            Err(EngineError::InvalidSplit(_))
        ));
        assert!(matches!(
            validate_splits(
                Money::new(100),
                &[
                    SplitShare::new("a", Money::new(100)),
                    SplitShare::new("b", Money::ZERO),
                ],
                &group
            ),
            Err(EngineError::InvalidSplit(_))
        ));
    }

    #[test]
    fn huge_shares_fail_instead_of_wrapping() {
        let group = members(&["a", "b", "c", "d"]);
        let huge: Money = "30000000000000000".parse().unwrap();
        let shares: Vec<SplitShare> = group
            .iter()
            .map(|user| SplitShare::new(user.clone(), huge))
            .collect();
        assert_eq!(
            validate_splits(Money::new(100), &shares, &group),
            Err(EngineError::InvalidAmount("amount too large".to_string()))
        );
    }
}
