//! Command structs for engine operations.
//!
//! These types group parameters for write operations (expenses and
//! settlements), keeping call sites readable and avoiding long argument
//! lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Currency, ExpenseCategory, Money, SplitShare};

/// Create an expense and its splits.
#[derive(Clone, Debug)]
pub struct ExpenseCmd {
    pub group_id: Uuid,
    pub description: String,
    pub amount: Money,
    /// Defaults to the group currency; any other currency is rejected.
    pub currency: Option<Currency>,
    pub category: ExpenseCategory,
    pub paid_by: String,
    pub splits: Vec<SplitShare>,
    pub occurred_at: DateTime<Utc>,
    pub user_id: String,
}

impl ExpenseCmd {
    /// The caller pays by default; use [`ExpenseCmd::paid_by`] to record an
    /// expense fronted by another member.
    #[must_use]
    pub fn new(
        group_id: Uuid,
        user_id: impl Into<String>,
        description: impl Into<String>,
        amount: Money,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        let user_id = user_id.into();
        Self {
            group_id,
            description: description.into(),
            amount,
            currency: None,
            category: ExpenseCategory::default(),
            paid_by: user_id.clone(),
            splits: Vec::new(),
            occurred_at,
            user_id,
        }
    }

    #[must_use]
    pub fn paid_by(mut self, paid_by: impl Into<String>) -> Self {
        self.paid_by = paid_by.into();
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn category(mut self, category: ExpenseCategory) -> Self {
        self.category = category;
        self
    }

    #[must_use]
    pub fn splits(mut self, splits: Vec<SplitShare>) -> Self {
        self.splits = splits;
        self
    }

    #[must_use]
    pub fn split(mut self, user_id: impl Into<String>, amount: Money) -> Self {
        self.splits.push(SplitShare::new(user_id, amount));
        self
    }
}

/// Metadata changes for an existing expense. Amounts and splits are fixed.
#[derive(Clone, Debug, Default)]
pub struct ExpenseUpdate {
    pub description: Option<String>,
    pub category: Option<ExpenseCategory>,
    pub occurred_at: Option<DateTime<Utc>>,
}

impl ExpenseUpdate {
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: ExpenseCategory) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.description.is_none() && self.category.is_none() && self.occurred_at.is_none()
    }
}

/// Record a payment from `from_id` to `to_id` inside a group.
#[derive(Clone, Debug)]
pub struct SettlementCmd {
    pub group_id: Uuid,
    pub from_id: String,
    pub to_id: String,
    pub amount: Money,
    pub notes: Option<String>,
    pub user_id: String,
}

impl SettlementCmd {
    #[must_use]
    pub fn new(
        group_id: Uuid,
        user_id: impl Into<String>,
        from_id: impl Into<String>,
        to_id: impl Into<String>,
        amount: Money,
    ) -> Self {
        Self {
            group_id,
            from_id: from_id.into(),
            to_id: to_id.into(),
            amount,
            notes: None,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
