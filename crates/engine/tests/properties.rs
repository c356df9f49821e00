//! Property-based tests for the balance, simplification and settlement
//! invariants.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use engine::{
    Balance, Money, Obligation, WalkPolicy, compute_balances, equal_split, plan_settlement,
    simplify_debts,
};

const PEOPLE: [&str; 5] = ["a", "b", "c", "d", "e"];

fn obligation_strategy() -> impl Strategy<Value = Obligation> {
    (0..PEOPLE.len(), 0..PEOPLE.len(), 1i64..100_000, any::<bool>(), 0i64..60).prop_map(
        |(payer, ower, minor, settled, days)| Obligation {
            id: Uuid::new_v4(),
            payer_id: PEOPLE[payer].to_string(),
            ower_id: PEOPLE[ower].to_string(),
            amount: Money::new(minor),
            settled,
            incurred_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::days(days),
        },
    )
}

/// Balances that sum to zero: the last member absorbs the rest.
fn balanced_strategy() -> impl Strategy<Value = Vec<Balance>> {
    prop::collection::vec(-500_000i64..500_000, 1..8).prop_map(|amounts| {
        let rest: i64 = amounts.iter().sum();
        amounts
            .iter()
            .copied()
            .chain(std::iter::once(-rest))
            .enumerate()
            .map(|(i, minor)| Balance::new(format!("m{i}"), Money::new(minor)))
            .collect()
    })
}

// ============================================================================
// Balance Aggregator
// ============================================================================

proptest! {
    /// Property: balances always sum to zero
    #[test]
    fn balances_are_conserved(obligations in prop::collection::vec(obligation_strategy(), 0..40)) {
        let balances = compute_balances(&obligations).unwrap();
        prop_assert_eq!(balances.iter().map(|b| b.amount).sum::<Money>(), Money::ZERO);
    }

    /// Property: settled and self-owed obligations never move a balance
    #[test]
    fn only_outstanding_obligations_count(
        obligations in prop::collection::vec(obligation_strategy(), 0..40),
    ) {
        let outstanding: Vec<Obligation> = obligations
            .iter()
            .filter(|o| !o.settled && o.payer_id != o.ower_id)
            .cloned()
            .collect();
        prop_assert_eq!(compute_balances(&obligations), compute_balances(&outstanding));
    }

    /// Property: an equal split always adds back up to the total
    #[test]
    fn equal_split_adds_up(total in 1i64..10_000_000, n in 1usize..12) {
        let people: Vec<String> = (0..n).map(|i| format!("p{i}")).collect();
        let shares = equal_split(Money::new(total), &people).unwrap();
        prop_assert_eq!(shares.len(), n);
        prop_assert_eq!(shares.iter().map(|s| s.amount).sum::<Money>(), Money::new(total));
        let max = shares.iter().map(|s| s.amount.minor()).max().unwrap();
        let min = shares.iter().map(|s| s.amount.minor()).min().unwrap();
        prop_assert!(max - min <= 1);
    }
}

// ============================================================================
// Debt Simplifier
// ============================================================================

proptest! {
    /// Property: applying the suggested payments zeroes every balance
    #[test]
    fn simplified_debts_clear_every_balance(balances in balanced_strategy()) {
        let debts = simplify_debts(&balances).unwrap();
        let mut remaining = balances.clone();
        for debt in &debts {
            prop_assert!(debt.amount.is_positive());
            prop_assert_ne!(&debt.from_id, &debt.to_id);
            for balance in remaining.iter_mut() {
                if balance.user_id == debt.from_id {
                    balance.amount += debt.amount;
                }
                if balance.user_id == debt.to_id {
                    balance.amount -= debt.amount;
                }
            }
        }
        prop_assert!(remaining.iter().all(|b| b.amount.is_negligible()));
    }

    /// Property: at most n - 1 payments for n non-zero balances
    #[test]
    fn simplified_debts_are_bounded(balances in balanced_strategy()) {
        let open = balances.iter().filter(|b| !b.amount.is_negligible()).count();
        let debts = simplify_debts(&balances).unwrap();
        prop_assert!(debts.len() <= open.saturating_sub(1));
    }

    /// Property: all-zero balances need no payments
    #[test]
    fn zero_balances_need_no_payments(n in 0usize..10) {
        let balances: Vec<Balance> =
            (0..n).map(|i| Balance::new(format!("m{i}"), Money::ZERO)).collect();
        prop_assert!(simplify_debts(&balances).unwrap().is_empty());
    }

    /// Property: unbalanced input is rejected
    #[test]
    fn unbalanced_input_is_rejected(mut balances in balanced_strategy(), skew in 1i64..1_000) {
        balances[0].amount += Money::new(skew);
        prop_assert!(simplify_debts(&balances).is_err());
    }
}

// ============================================================================
// Settlement Recorder
// ============================================================================

proptest! {
    /// Property: a settlement never applies more than was paid
    #[test]
    fn settlement_never_over_settles(
        obligations in prop::collection::vec(obligation_strategy(), 0..30),
        amount in 1i64..300_000,
        skip in any::<bool>(),
    ) {
        let policy = if skip { WalkPolicy::SkipOversized } else { WalkPolicy::StopAtFirstMiss };
        let plan = plan_settlement(&obligations, "a", "b", Money::new(amount), policy);

        prop_assert_eq!(plan.applied + plan.unapplied, Money::new(amount));
        prop_assert!(!plan.unapplied.is_negative());

        let mut covered = Money::ZERO;
        for id in &plan.settled {
            let obligation = obligations.iter().find(|o| o.id == *id).unwrap();
            prop_assert!(!obligation.settled);
            prop_assert_eq!(obligation.payer_id.as_str(), "b");
            prop_assert_eq!(obligation.ower_id.as_str(), "a");
            covered += obligation.amount;
        }
        prop_assert_eq!(covered, plan.applied);
    }

    /// Property: skipping oversized obligations clears at least as much
    #[test]
    fn skipping_clears_at_least_as_much(
        obligations in prop::collection::vec(obligation_strategy(), 0..30),
        amount in 1i64..300_000,
    ) {
        let stop = plan_settlement(
            &obligations, "a", "b", Money::new(amount), WalkPolicy::StopAtFirstMiss,
        );
        let skip = plan_settlement(
            &obligations, "a", "b", Money::new(amount), WalkPolicy::SkipOversized,
        );
        prop_assert!(skip.applied >= stop.applied);
        prop_assert!(skip.settled.starts_with(&stop.settled));
    }
}
