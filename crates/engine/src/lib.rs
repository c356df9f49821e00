//! Shared-expense ledger engine.
//!
//! The pure core lives in [`compute_balances`], [`simplify_debts`] and
//! [`plan_settlement`]; [`Engine`] applies it against the sea-orm store.

pub use balances::{
    Balance, MemberSummary, Obligation, compute_balances, ensure_conserved, summarize_members,
};
pub use commands::{ExpenseCmd, ExpenseUpdate, SettlementCmd};
pub use currency::Currency;
pub use error::EngineError;
pub use expense_splits::Split;
pub use expenses::{Expense, ExpenseCategory};
pub use groups::{Group, GroupSummary, Member, MemberRole};
pub use money::Money;
pub use ops::{
    Engine, EngineBuilder, ExpenseListFilter, GroupOverview, PairBalance, SettlementOutcome,
    UserExpenseFilter, UserExpenseKind, UserOverview,
};
pub use settlement::{SettlementPlan, WalkPolicy, plan_settlement, validate_settlement};
pub use settlements::SettlementRecord;
pub use simplify::{SimplifiedDebt, simplify_debts};
pub use splits::{SplitShare, equal_split, validate_splits};

mod balances;
mod commands;
mod currency;
mod error;
mod expense_splits;
mod expenses;
mod group_memberships;
mod groups;
mod money;
mod ops;
mod settlement;
mod settlements;
mod simplify;
mod splits;
mod users;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
