//! Expense splits.
//!
//! A [`Split`] is one participant's share of an expense. It is immutable once
//! created except for `settled`, which flips from `false` to `true` exactly
//! once, and only through a recorded settlement. Splits are deleted only
//! together with their parent expense.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, Obligation, expenses, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub id: Uuid,
    pub expense_id: Uuid,
    pub user_id: String,
    pub amount: Money,
    pub settled: bool,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Split {
    pub fn new(expense_id: Uuid, user_id: String, amount: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            expense_id,
            user_id,
            amount,
            settled: false,
            settled_at: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_splits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub expense_id: String,
    pub user_id: String,
    pub amount_minor: i64,
    pub settled: bool,
    pub settled_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Split> for ActiveModel {
    fn from(split: &Split) -> Self {
        Self {
            id: ActiveValue::Set(split.id.to_string()),
            expense_id: ActiveValue::Set(split.expense_id.to_string()),
            user_id: ActiveValue::Set(split.user_id.clone()),
            amount_minor: ActiveValue::Set(split.amount.minor()),
            settled: ActiveValue::Set(split.settled),
            settled_at: ActiveValue::Set(split.settled_at),
        }
    }
}

impl TryFrom<Model> for Split {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "split")?,
            expense_id: parse_uuid(&model.expense_id, "expense")?,
            user_id: model.user_id,
            amount: Money::new(model.amount_minor),
            settled: model.settled,
            settled_at: model.settled_at,
        })
    }
}

/// Builds the core's view of a split: the payer comes from the parent
/// expense and the expense date orders the settlement walk.
pub(crate) fn to_obligation(
    split: Model,
    expense: &expenses::Model,
) -> Result<Obligation, EngineError> {
    Ok(Obligation {
        id: parse_uuid(&split.id, "split")?,
        payer_id: expense.paid_by.clone(),
        ower_id: split.user_id,
        amount: Money::new(split.amount_minor),
        settled: split.settled,
        incurred_at: expense.occurred_at,
    })
}
