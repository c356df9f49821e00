mod common;

use std::{collections::HashSet, sync::Arc};

use engine::{EngineError, ExpenseListFilter, Money, SettlementCmd, WalkPolicy};

use common::{day, engine_with_db, engine_with_file_db, engine_with_policy, group_with, paid};

fn pay(group_id: uuid::Uuid, from: &str, to: &str, minor: i64) -> SettlementCmd {
    SettlementCmd::new(group_id, from, from, to, Money::new(minor))
}

async fn open_splits(engine: &engine::Engine, group_id: uuid::Uuid) -> Vec<uuid::Uuid> {
    engine
        .list_expenses(group_id, &ExpenseListFilter::default(), "alice")
        .await
        .unwrap()
        .into_iter()
        .flat_map(|e| e.splits)
        .filter(|s| !s.settled)
        .map(|s| s.id)
        .collect()
}

#[tokio::test]
async fn exact_payment_clears_the_oldest_split() {
    let engine = engine_with_db().await;
    let group_id = group_with(&engine, "alice", &["bob"]).await;
    let older = paid(&engine, group_id, "bob", &[("alice", 2000)], day(1)).await;
    let newer = paid(&engine, group_id, "bob", &[("alice", 2500)], day(2)).await;
    let older_split = common::split_of(&engine, older, "alice", "alice").await;
    let newer_split = common::split_of(&engine, newer, "alice", "alice").await;

    let outcome = engine
        .record_settlement(pay(group_id, "alice", "bob", 2000).notes("cash"))
        .await
        .unwrap();
    assert_eq!(outcome.cleared, vec![older_split]);
    assert_eq!(outcome.applied, Money::new(2000));
    assert_eq!(outcome.unapplied, Money::ZERO);
    assert_eq!(outcome.record.notes.as_deref(), Some("cash"));
    assert_eq!(outcome.record.created_by, "alice");

    let expense = engine.expense(older, "bob").await.unwrap();
    let split = expense.splits.iter().find(|s| s.id == older_split).unwrap();
    assert!(split.settled);
    assert!(split.settled_at.is_some());
    assert_eq!(open_splits(&engine, group_id).await, vec![newer_split]);
}

#[tokio::test]
async fn overpayment_clears_everything_and_reports_the_rest() {
    let engine = engine_with_db().await;
    let group_id = group_with(&engine, "alice", &["bob"]).await;
    paid(&engine, group_id, "bob", &[("alice", 2000)], day(1)).await;
    paid(&engine, group_id, "bob", &[("alice", 2500)], day(2)).await;

    let outcome = engine
        .record_settlement(pay(group_id, "alice", "bob", 5000))
        .await
        .unwrap();
    assert_eq!(outcome.cleared.len(), 2);
    assert_eq!(outcome.applied, Money::new(4500));
    assert_eq!(outcome.unapplied, Money::new(500));
    assert_eq!(outcome.record.amount, Money::new(5000));
    assert!(open_splits(&engine, group_id).await.is_empty());
}

#[tokio::test]
async fn walk_stops_at_the_first_split_that_does_not_fit() {
    let engine = engine_with_db().await;
    let group_id = group_with(&engine, "alice", &["bob"]).await;
    paid(&engine, group_id, "bob", &[("alice", 3000)], day(1)).await;
    paid(&engine, group_id, "bob", &[("alice", 1000)], day(2)).await;

    let outcome = engine
        .record_settlement(pay(group_id, "alice", "bob", 1500))
        .await
        .unwrap();
    assert!(outcome.cleared.is_empty());
    assert_eq!(outcome.unapplied, Money::new(1500));
    assert_eq!(open_splits(&engine, group_id).await.len(), 2);

    let history = engine.list_settlements(group_id, "bob").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, outcome.record.id);
}

#[tokio::test]
async fn skip_policy_keeps_looking_for_smaller_splits() {
    let engine = engine_with_policy(WalkPolicy::SkipOversized).await;
    let group_id = group_with(&engine, "alice", &["bob"]).await;
    paid(&engine, group_id, "bob", &[("alice", 3000)], day(1)).await;
    let small = paid(&engine, group_id, "bob", &[("alice", 1000)], day(2)).await;
    let small_split = common::split_of(&engine, small, "bob", "alice").await;

    let outcome = engine
        .record_settlement(pay(group_id, "alice", "bob", 1500))
        .await
        .unwrap();
    assert_eq!(outcome.cleared, vec![small_split]);
    assert_eq!(outcome.unapplied, Money::new(500));
}

#[tokio::test]
async fn payment_only_clears_its_own_direction() {
    let engine = engine_with_db().await;
    let group_id = group_with(&engine, "alice", &["bob", "carol"]).await;
    paid(&engine, group_id, "bob", &[("alice", 1000)], day(1)).await;
    paid(&engine, group_id, "carol", &[("alice", 1000)], day(2)).await;

    // carol may record a payment between two other members.
    let outcome = engine
        .record_settlement(SettlementCmd::new(
            group_id,
            "carol",
            "bob",
            "alice",
            Money::new(1000),
        ))
        .await
        .unwrap();
    assert!(outcome.cleared.is_empty());
    assert_eq!(outcome.record.created_by, "carol");

    let outcome = engine
        .record_settlement(pay(group_id, "alice", "carol", 1000))
        .await
        .unwrap();
    assert_eq!(outcome.cleared.len(), 1);
    assert_eq!(open_splits(&engine, group_id).await.len(), 1);
}

#[tokio::test]
async fn rejected_settlements_leave_no_record() {
    let engine = engine_with_db().await;
    let group_id = group_with(&engine, "alice", &["bob"]).await;
    paid(&engine, group_id, "bob", &[("alice", 1000)], day(1)).await;

    assert!(matches!(
        engine
            .record_settlement(pay(group_id, "alice", "alice", 1000))
            .await,
        Err(EngineError::InvalidSettlement(_))
    ));
    assert!(matches!(
        engine.record_settlement(pay(group_id, "alice", "bob", 0)).await,
        Err(EngineError::InvalidAmount(_))
    ));
    assert!(matches!(
        engine.record_settlement(pay(group_id, "alice", "bob", -10)).await,
        Err(EngineError::InvalidAmount(_))
    ));
    assert_eq!(
        engine
            .record_settlement(SettlementCmd::new(
                group_id,
                "alice",
                "alice",
                "dave",
                Money::new(1000),
            ))
            .await,
        Err(EngineError::NotMember("dave".to_string()))
    );
    assert_eq!(
        engine
            .record_settlement(pay(group_id, "dave", "bob", 1000))
            .await,
        Err(EngineError::KeyNotFound("group not exists".to_string()))
    );

    assert!(
        engine
            .list_settlements(group_id, "alice")
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(open_splits(&engine, group_id).await.len(), 1);
}

#[tokio::test]
async fn history_is_newest_first() {
    let engine = engine_with_db().await;
    let group_id = group_with(&engine, "alice", &["bob"]).await;

    let first = engine
        .record_settlement(pay(group_id, "alice", "bob", 100).notes("   "))
        .await
        .unwrap();
    let second = engine
        .record_settlement(pay(group_id, "bob", "alice", 200))
        .await
        .unwrap();
    assert_eq!(first.record.notes, None);

    let history = engine.list_settlements(group_id, "alice").await.unwrap();
    let ids: Vec<_> = history.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![second.record.id, first.record.id]);
    assert_eq!(history[1].amount, Money::new(100));
    assert_eq!(
        engine.list_settlements(group_id, "carol").await,
        Err(EngineError::KeyNotFound("group not exists".to_string()))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_settlements_clear_distinct_splits() {
    let (engine, path) = engine_with_file_db().await;
    let engine = Arc::new(engine);
    let group_id = group_with(&engine, "alice", &["bob"]).await;
    for d in 1..=3 {
        paid(&engine, group_id, "bob", &[("alice", 1000)], day(d)).await;
    }

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .record_settlement(pay(group_id, "alice", "bob", 1000))
                    .await
            })
        })
        .collect();

    let mut cleared = HashSet::new();
    for task in tasks {
        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome.cleared.len(), 1);
        assert!(cleared.insert(outcome.cleared[0]));
    }
    assert_eq!(open_splits(&engine, group_id).await.len(), 1);
    assert_eq!(engine.list_settlements(group_id, "bob").await.unwrap().len(), 2);

    drop(engine);
    let _ = std::fs::remove_file(path);
}
