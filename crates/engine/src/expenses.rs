//! Expenses.
//!
//! An `Expense` is money one member fronted for the group. It owns one
//! [`Split`](crate::Split) per participant; the splits are the obligations
//! the balances are computed from.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, Money, Split, util::parse_uuid};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Food,
    Transport,
    Entertainment,
    Accommodation,
    Utilities,
    Shopping,
    #[default]
    Other,
}

impl ExpenseCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Transport => "transport",
            Self::Entertainment => "entertainment",
            Self::Accommodation => "accommodation",
            Self::Utilities => "utilities",
            Self::Shopping => "shopping",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for ExpenseCategory {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "food" => Ok(Self::Food),
            "transport" => Ok(Self::Transport),
            "entertainment" => Ok(Self::Entertainment),
            "accommodation" => Ok(Self::Accommodation),
            "utilities" => Ok(Self::Utilities),
            "shopping" => Ok(Self::Shopping),
            "other" => Ok(Self::Other),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid expense category: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub group_id: Uuid,
    pub description: String,
    pub amount: Money,
    pub currency: Currency,
    pub category: ExpenseCategory,
    pub paid_by: String,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub splits: Vec<Split>,
}

impl Expense {
    /// `true` once any participant other than the payer has settled.
    pub fn is_partially_settled(&self) -> bool {
        self.splits
            .iter()
            .any(|s| s.settled && s.user_id != self.paid_by)
    }

    /// `true` when every split is settled.
    pub fn is_settled(&self) -> bool {
        self.splits.iter().all(|s| s.settled)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub description: String,
    pub amount_minor: i64,
    pub currency: String,
    pub category: String,
    pub paid_by: String,
    pub occurred_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Groups,
    #[sea_orm(has_many = "super::expense_splits::Entity")]
    ExpenseSplits,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl Related<super::expense_splits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseSplits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            group_id: ActiveValue::Set(expense.group_id.to_string()),
            description: ActiveValue::Set(expense.description.clone()),
            amount_minor: ActiveValue::Set(expense.amount.minor()),
            currency: ActiveValue::Set(expense.currency.code().to_string()),
            category: ActiveValue::Set(expense.category.as_str().to_string()),
            paid_by: ActiveValue::Set(expense.paid_by.clone()),
            occurred_at: ActiveValue::Set(expense.occurred_at),
            created_at: ActiveValue::Set(expense.created_at),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "expense")?,
            group_id: parse_uuid(&model.group_id, "group")?,
            description: model.description,
            amount: Money::new(model.amount_minor),
            currency: Currency::try_from(model.currency.as_str())?,
            category: ExpenseCategory::try_from(model.category.as_str())?,
            paid_by: model.paid_by,
            occurred_at: model.occurred_at,
            created_at: model.created_at,
            splits: Vec::new(),
        })
    }
}
