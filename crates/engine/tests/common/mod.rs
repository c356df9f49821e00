#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

use engine::{Engine, ExpenseCmd, MemberRole, Money, WalkPolicy};
use migration::MigratorTrait;

pub const USERS: [(&str, &str); 4] = [
    ("alice", "Alice"),
    ("bob", "Bob"),
    ("carol", "Carol"),
    ("dave", "Dave"),
];

async fn seed(db: DatabaseConnection, policy: WalkPolicy) -> Engine {
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db)
        .walk_policy(policy)
        .build()
        .await
        .unwrap();
    for (username, display_name) in USERS {
        engine.create_user(username, display_name).await.unwrap();
    }
    engine
}

pub async fn engine_with_db() -> Engine {
    engine_with_policy(WalkPolicy::default()).await
}

pub async fn engine_with_policy(policy: WalkPolicy) -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    seed(db, policy).await
}

pub async fn engine_with_file_db() -> (Engine, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("engine_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());
    let db = Database::connect(&url).await.unwrap();
    (seed(db, WalkPolicy::default()).await, path)
}

/// Noon UTC on the given day of March 2026.
pub fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, d, 12, 0, 0).unwrap()
}

/// A group created by `admin` with `others` added as plain members.
pub async fn group_with(engine: &Engine, admin: &str, others: &[&str]) -> Uuid {
    let group_id = engine
        .create_group("Trip", None, None, admin)
        .await
        .unwrap();
    for member in others {
        engine
            .add_member(group_id, member, MemberRole::Member, admin)
            .await
            .unwrap();
    }
    group_id
}

/// Records an expense paid by `payer` with explicit shares in minor units.
pub async fn paid(
    engine: &Engine,
    group_id: Uuid,
    payer: &str,
    shares: &[(&str, i64)],
    on: DateTime<Utc>,
) -> Uuid {
    let total = Money::new(shares.iter().map(|(_, minor)| minor).sum());
    let cmd = shares.iter().fold(
        ExpenseCmd::new(group_id, payer, "expense", total, on),
        |cmd, (user, minor)| cmd.split(*user, Money::new(*minor)),
    );
    engine.create_expense(cmd).await.unwrap()
}

/// Id of `user`'s split in an expense.
pub async fn split_of(engine: &Engine, expense_id: Uuid, viewer: &str, user: &str) -> Uuid {
    engine
        .expense(expense_id, viewer)
        .await
        .unwrap()
        .splits
        .iter()
        .find(|s| s.user_id == user)
        .map(|s| s.id)
        .unwrap()
}
