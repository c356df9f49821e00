use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    Currency, EngineError, Expense, ExpenseCategory, ExpenseCmd, ExpenseUpdate, ResultEngine,
    Split, expense_splits, expenses,
    util::{ensure_group_currency, normalize_required_name, parse_uuid},
    validate_splits,
};

use super::{Engine, with_tx};

/// Filters for listing expenses.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct ExpenseListFilter {
    pub category: Option<ExpenseCategory>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Which of a user's expenses to list across their groups.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UserExpenseKind {
    /// Paid by the user or shared with them.
    #[default]
    All,
    /// Paid by the user.
    Paid,
    /// Someone else paid and the user's share is still open.
    Owe,
    /// The user paid and someone's share is still open.
    Owed,
}

impl UserExpenseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Paid => "paid",
            Self::Owe => "owe",
            Self::Owed => "owed",
        }
    }

    fn matches(self, expense: &Expense, user_id: &str) -> bool {
        let paid = expense.paid_by == user_id;
        match self {
            Self::All => paid || expense.splits.iter().any(|s| s.user_id == user_id),
            Self::Paid => paid,
            Self::Owe => {
                !paid
                    && expense
                        .splits
                        .iter()
                        .any(|s| s.user_id == user_id && !s.settled)
            }
            Self::Owed => paid && expense.splits.iter().any(|s| !s.settled),
        }
    }
}

impl TryFrom<&str> for UserExpenseKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "paid" => Ok(Self::Paid),
            "owe" => Ok(Self::Owe),
            "owed" => Ok(Self::Owed),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid expense kind: {other}"
            ))),
        }
    }
}

/// Paging for [`Engine::list_user_expenses`].
#[derive(Clone, Debug, Default)]
pub struct UserExpenseFilter {
    pub kind: UserExpenseKind,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

fn validate_list_filter(filter: &ExpenseListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidAmount(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if filter.limit == Some(0) {
        return Err(EngineError::InvalidAmount(
            "limit must be > 0".to_string(),
        ));
    }
    Ok(())
}

/// Attaches splits to `models`, keeping their order.
async fn with_splits(
    db: &DatabaseTransaction,
    models: Vec<expenses::Model>,
) -> ResultEngine<Vec<Expense>> {
    let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
    let mut splits_by_expense: HashMap<String, Vec<Split>> = HashMap::new();
    for model in expense_splits::Entity::find()
        .filter(expense_splits::Column::ExpenseId.is_in(ids))
        .order_by_asc(expense_splits::Column::UserId)
        .all(db)
        .await?
    {
        splits_by_expense
            .entry(model.expense_id.clone())
            .or_default()
            .push(Split::try_from(model)?);
    }

    let mut out = Vec::with_capacity(models.len());
    for model in models {
        let splits = splits_by_expense.remove(&model.id).unwrap_or_default();
        let mut expense = Expense::try_from(model)?;
        expense.splits = splits;
        out.push(expense);
    }
    Ok(out)
}

fn ensure_unsettled(expense: &Expense) -> ResultEngine<()> {
    if expense.is_partially_settled() {
        return Err(EngineError::Forbidden(
            "expense is already partially settled".to_string(),
        ));
    }
    Ok(())
}

fn ensure_payer(expense: &Expense, user_id: &str) -> ResultEngine<()> {
    if expense.paid_by != user_id {
        return Err(EngineError::Forbidden(
            "only the payer can change an expense".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    /// Creates an expense and fans it out into one split per participant.
    ///
    /// The payer's own share is stored already settled: it is money they
    /// owe themselves.
    pub async fn create_expense(&self, cmd: ExpenseCmd) -> ResultEngine<Uuid> {
        let description = normalize_required_name(&cmd.description, "expense")?;
        with_tx!(self, |db_tx| {
            let (group, _) = self
                .require_member(&db_tx, cmd.group_id, &cmd.user_id)
                .await?;
            let group_currency = Currency::try_from(group.currency.as_str())?;
            let currency = cmd.currency.unwrap_or(group_currency);
            ensure_group_currency(group_currency, currency)?;
            self.require_party_member(&db_tx, cmd.group_id, &cmd.paid_by)
                .await?;
            let members = self.member_ids(&db_tx, cmd.group_id).await?;
            validate_splits(cmd.amount, &cmd.splits, &members)?;

            let now = Utc::now();
            let expense = Expense {
                id: Uuid::new_v4(),
                group_id: cmd.group_id,
                description,
                amount: cmd.amount,
                currency,
                category: cmd.category,
                paid_by: cmd.paid_by.clone(),
                occurred_at: cmd.occurred_at,
                created_at: now,
                splits: Vec::new(),
            };
            let expense_entry: expenses::ActiveModel = (&expense).into();
            expense_entry.insert(&db_tx).await?;

            let split_entries: Vec<expense_splits::ActiveModel> = cmd
                .splits
                .iter()
                .map(|share| {
                    let mut split = Split::new(expense.id, share.user_id.clone(), share.amount);
                    if split.user_id == expense.paid_by {
                        split.settled = true;
                        split.settled_at = Some(now);
                    }
                    expense_splits::ActiveModel::from(&split)
                })
                .collect();
            expense_splits::Entity::insert_many(split_entries)
                .exec(&db_tx)
                .await?;

            tracing::info!(
                group_id = %cmd.group_id,
                expense_id = %expense.id,
                paid_by = %expense.paid_by,
                amount = %expense.amount,
                splits = cmd.splits.len(),
                "expense created"
            );
            Ok(expense.id)
        })
    }

    /// Returns an expense with its splits.
    pub async fn expense(&self, expense_id: Uuid, user_id: &str) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            self.require_expense(&db_tx, expense_id, user_id).await
        })
    }

    /// Lists the expenses of a group, newest first.
    pub async fn list_expenses(
        &self,
        group_id: Uuid,
        filter: &ExpenseListFilter,
        user_id: &str,
    ) -> ResultEngine<Vec<Expense>> {
        validate_list_filter(filter)?;
        with_tx!(self, |db_tx| {
            self.require_member(&db_tx, group_id, user_id).await?;

            let mut query =
                expenses::Entity::find().filter(expenses::Column::GroupId.eq(group_id.to_string()));
            if let Some(category) = filter.category {
                query = query.filter(expenses::Column::Category.eq(category.as_str()));
            }
            if let Some(from) = filter.from {
                query = query.filter(expenses::Column::OccurredAt.gte(from));
            }
            if let Some(to) = filter.to {
                query = query.filter(expenses::Column::OccurredAt.lt(to));
            }
            let models = query
                .order_by_desc(expenses::Column::OccurredAt)
                .order_by_desc(expenses::Column::CreatedAt)
                .limit(filter.limit)
                .offset(filter.offset)
                .all(&db_tx)
                .await?;

            with_splits(&db_tx, models).await
        })
    }

    /// Lists `user_id`'s expenses across their active groups, newest first.
    pub async fn list_user_expenses(
        &self,
        filter: &UserExpenseFilter,
        user_id: &str,
    ) -> ResultEngine<Vec<Expense>> {
        if filter.limit == Some(0) {
            return Err(EngineError::InvalidAmount(
                "limit must be > 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, user_id).await?;
            let group_ids: Vec<String> = self
                .active_groups_of(&db_tx, user_id)
                .await?
                .into_iter()
                .map(|g| g.id)
                .collect();
            let models = expenses::Entity::find()
                .filter(expenses::Column::GroupId.is_in(group_ids))
                .order_by_desc(expenses::Column::OccurredAt)
                .order_by_desc(expenses::Column::CreatedAt)
                .all(&db_tx)
                .await?;

            let offset = usize::try_from(filter.offset.unwrap_or(0)).unwrap_or(usize::MAX);
            let limit = filter
                .limit
                .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
            Ok(with_splits(&db_tx, models)
                .await?
                .into_iter()
                .filter(|e| filter.kind.matches(e, user_id))
                .skip(offset)
                .take(limit)
                .collect())
        })
    }

    /// Edits description, category or date of an expense (payer-only).
    ///
    /// Amounts and splits never change once recorded.
    pub async fn update_expense(
        &self,
        expense_id: Uuid,
        update: ExpenseUpdate,
        user_id: &str,
    ) -> ResultEngine<Expense> {
        let description = update
            .description
            .as_deref()
            .map(|d| normalize_required_name(d, "expense"))
            .transpose()?;
        with_tx!(self, |db_tx| {
            let mut expense = self.require_expense(&db_tx, expense_id, user_id).await?;
            ensure_payer(&expense, user_id)?;
            ensure_unsettled(&expense)?;
            if update.is_empty() {
                return Ok(expense);
            }

            let mut active = expenses::ActiveModel {
                id: ActiveValue::Unchanged(expense_id.to_string()),
                ..Default::default()
            };
            if let Some(description) = description {
                expense.description = description.clone();
                active.description = ActiveValue::Set(description);
            }
            if let Some(category) = update.category {
                expense.category = category;
                active.category = ActiveValue::Set(category.as_str().to_string());
            }
            if let Some(occurred_at) = update.occurred_at {
                expense.occurred_at = occurred_at;
                active.occurred_at = ActiveValue::Set(occurred_at);
            }
            active.update(&db_tx).await?;
            tracing::info!(%expense_id, "expense updated");
            Ok(expense)
        })
    }

    /// Deletes an expense and its splits (payer-only).
    pub async fn delete_expense(&self, expense_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let expense = self.require_expense(&db_tx, expense_id, user_id).await?;
            ensure_payer(&expense, user_id)?;
            ensure_unsettled(&expense)?;

            expense_splits::Entity::delete_many()
                .filter(expense_splits::Column::ExpenseId.eq(expense_id.to_string()))
                .exec(&db_tx)
                .await?;
            expenses::Entity::delete_by_id(expense_id.to_string())
                .exec(&db_tx)
                .await?;
            tracing::info!(group_id = %expense.group_id, %expense_id, "expense deleted");
            Ok(())
        })
    }

    async fn require_expense(
        &self,
        db: &DatabaseTransaction,
        expense_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Expense> {
        let model = expenses::Entity::find_by_id(expense_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
        let group_id = parse_uuid(&model.group_id, "group")?;
        self.require_member(db, group_id, user_id)
            .await
            .map_err(|err| match err {
                EngineError::KeyNotFound(_) => {
                    EngineError::KeyNotFound("expense not exists".to_string())
                }
                other => other,
            })?;

        let splits = expense_splits::Entity::find()
            .filter(expense_splits::Column::ExpenseId.eq(model.id.clone()))
            .order_by_asc(expense_splits::Column::UserId)
            .all(db)
            .await?
            .into_iter()
            .map(Split::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        let mut expense = Expense::try_from(model)?;
        expense.splits = splits;
        Ok(expense)
    }
}
