//! Settlement records: the append-only audit trail of real payments.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, Money, util::parse_uuid};

/// A payment from `from_id` to `to_id`. Never updated once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub id: Uuid,
    pub group_id: Uuid,
    pub from_id: String,
    pub to_id: String,
    pub amount: Money,
    pub currency: Currency,
    pub notes: Option<String>,
    pub settled_at: DateTime<Utc>,
    pub created_by: String,
}

impl SettlementRecord {
    pub fn new(
        group_id: Uuid,
        from_id: String,
        to_id: String,
        amount: Money,
        currency: Currency,
        created_by: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            from_id,
            to_id,
            amount,
            currency,
            notes: None,
            settled_at: Utc::now(),
            created_by: created_by.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "settlements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub from_user: String,
    pub to_user: String,
    pub amount_minor: i64,
    pub currency: String,
    pub notes: Option<String>,
    pub settled_at: DateTimeUtc,
    pub created_by: String,
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
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&SettlementRecord> for ActiveModel {
    fn from(record: &SettlementRecord) -> Self {
        Self {
            id: ActiveValue::Set(record.id.to_string()),
            group_id: ActiveValue::Set(record.group_id.to_string()),
            from_user: ActiveValue::Set(record.from_id.clone()),
            to_user: ActiveValue::Set(record.to_id.clone()),
            amount_minor: ActiveValue::Set(record.amount.minor()),
            currency: ActiveValue::Set(record.currency.code().to_string()),
            notes: ActiveValue::Set(record.notes.clone()),
            settled_at: ActiveValue::Set(record.settled_at),
            created_by: ActiveValue::Set(record.created_by.clone()),
        }
    }
}

impl TryFrom<Model> for SettlementRecord {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "settlement")?,
            group_id: parse_uuid(&model.group_id, "group")?,
            from_id: model.from_user,
            to_id: model.to_user,
            amount: Money::new(model.amount_minor),
            currency: Currency::try_from(model.currency.as_str())?,
            notes: model.notes,
            settled_at: model.settled_at,
            created_by: model.created_by,
        })
    }
}
