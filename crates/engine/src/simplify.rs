//! Debt simplification.
//!
//! Turns a set of net balances into a short list of suggested payments that
//! clears them. The plan is a suggestion only: persisted obligations are not
//! touched, and a suggested payment does not map onto specific obligations.

use serde::{Deserialize, Serialize};

use crate::{Balance, EngineError, Money, ResultEngine, balances::ensure_conserved};

/// A suggested payment: `from_id` should pay `to_id` the given amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplifiedDebt {
    pub from_id: String,
    pub to_id: String,
    pub amount: Money,
}

/// Derives a minimum-transaction settlement plan from net balances.
///
/// Greedy extremal matching: while more than one open balance remains, the
/// largest creditor is paired with the largest debtor and the smaller of the
/// two magnitudes is transferred, which zeroes at least one of them. For `n`
/// non-zero balances at most `n - 1` payments are produced.
///
/// Balances within [`Money::EPSILON`] of zero are treated as settled. Among
/// equal amounts the one listed first wins, so the output is deterministic
/// for a given input order.
///
/// # Errors
///
/// Returns [`EngineError::InvariantViolation`] when the balances do not sum
/// to zero, which can only happen after an upstream bookkeeping bug.
pub fn simplify_debts(balances: &[Balance]) -> ResultEngine<Vec<SimplifiedDebt>> {
    ensure_conserved(balances)?;

    let mut open: Vec<Balance> = balances
        .iter()
        .filter(|b| !b.amount.is_negligible())
        .cloned()
        .collect();
    let mut debts = Vec::with_capacity(open.len().saturating_sub(1));

    while open.len() > 1 {
        let (creditor, debtor) = extremes(&open);
        let transfer = open[creditor].amount.min(Money::ZERO.try_sub(open[debtor].amount)?);
        if !transfer.is_positive() {
            break;
        }

        debts.push(SimplifiedDebt {
            from_id: open[debtor].user_id.clone(),
            to_id: open[creditor].user_id.clone(),
            amount: transfer,
        });
        open[creditor].amount -= transfer;
        open[debtor].amount += transfer;
        open.retain(|b| !b.amount.is_negligible());
    }

    if !open.is_empty() {
        tracing::error!(
            remaining = open.len(),
            "debt simplification left unmatched balances"
        );
        return Err(EngineError::InvariantViolation(format!(
            "{} balance(s) left unmatched after simplification",
            open.len()
        )));
    }

    tracing::debug!(payments = debts.len(), "simplified debts");
    Ok(debts)
}

/// Index of the largest creditor and of the largest debtor (most negative).
/// Ties resolve to the earliest entry.
fn extremes(open: &[Balance]) -> (usize, usize) {
    let mut max = 0;
    let mut min = 0;
    for (i, balance) in open.iter().enumerate().skip(1) {
        if balance.amount > open[max].amount {
            max = i;
        }
        if balance.amount < open[min].amount {
            min = i;
        }
    }
    (max, min)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balances(entries: &[(&str, i64)]) -> Vec<Balance> {
        entries
            .iter()
            .map(|(user, minor)| Balance::new(*user, Money::new(*minor)))
            .collect()
    }

    fn debt(from: &str, to: &str, minor: i64) -> SimplifiedDebt {
        SimplifiedDebt {
            from_id: from.to_string(),
            to_id: to.to_string(),
            amount: Money::new(minor),
        }
    }

    #[test]
    fn empty_and_zero_inputs_need_no_payments() {
        assert!(simplify_debts(&[]).unwrap().is_empty());
        assert!(
            simplify_debts(&balances(&[("a", 0), ("b", 0), ("c", 0)]))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn one_creditor_two_debtors() {
        let plan = simplify_debts(&balances(&[("a", -3000), ("b", -3000), ("c", 6000)])).unwrap();
        assert_eq!(plan, vec![debt("a", "c", 3000), debt("b", "c", 3000)]);
    }

    #[test]
    fn pairs_largest_creditor_with_largest_debtor() {
        let plan = simplify_debts(&balances(&[
            ("a", 1000),
            ("b", 4000),
            ("c", -500),
            ("d", -4500),
        ]))
        .unwrap();
        assert_eq!(
            plan,
            vec![
                debt("d", "b", 4000),
                debt("c", "a", 500),
                debt("d", "a", 500),
            ]
        );
    }

    #[test]
    fn chain_collapses_to_single_payment() {
        // a owes b 20, b owes c 20: b nets out.
        let plan = simplify_debts(&balances(&[("a", -2000), ("b", 0), ("c", 2000)])).unwrap();
        assert_eq!(plan, vec![debt("a", "c", 2000)]);
    }

    #[test]
    fn ties_pick_first_listed() {
        let plan = simplify_debts(&balances(&[
            ("a", 500),
            ("b", 500),
            ("c", -500),
            ("d", -500),
        ]))
        .unwrap();
        assert_eq!(plan, vec![debt("c", "a", 500), debt("d", "b", 500)]);
    }

    #[test]
    fn one_cent_balances_are_still_paid() {
        let plan = simplify_debts(&balances(&[("a", 1), ("b", -1)])).unwrap();
        assert_eq!(plan, vec![debt("b", "a", 1)]);
    }

    #[test]
    fn unbalanced_input_is_an_invariant_violation() {
        let err = simplify_debts(&balances(&[("a", 1000), ("b", -900)])).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));
    }

    #[test]
    fn stays_within_transaction_bound() {
        let input = balances(&[
            ("a", 1234),
            ("b", -567),
            ("c", 890),
            ("d", -1001),
            ("e", -556),
        ]);
        let plan = simplify_debts(&input).unwrap();
        assert!(plan.len() <= input.len() - 1);
        assert!(plan.iter().all(|d| d.amount.is_positive()));
    }
}
