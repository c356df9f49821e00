use std::collections::HashMap;

use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Member, MemberRole, Obligation, ResultEngine, expense_splits, expenses,
    group_memberships, groups, users,
};

use super::Engine;

fn group_not_found() -> EngineError {
    EngineError::KeyNotFound("group not exists".to_string())
}

impl Engine {
    pub(super) async fn require_user_exists(
        &self,
        db: &DatabaseTransaction,
        username: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(username.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    pub(super) async fn member_role(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Option<MemberRole>> {
        let row =
            group_memberships::Entity::find_by_id((group_id.to_string(), user_id.to_string()))
                .one(db)
                .await?;
        row.as_ref()
            .map(|m| MemberRole::try_from(m.role.as_str()))
            .transpose()
    }

    /// Returns the active group if `user_id` belongs to it.
    ///
    /// Missing groups, inactive groups and groups the caller is not part of
    /// all look the same to the caller.
    pub(super) async fn require_member(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<(groups::Model, MemberRole)> {
        let group = groups::Entity::find_by_id(group_id.to_string())
            .filter(groups::Column::Active.eq(true))
            .one(db)
            .await?
            .ok_or_else(group_not_found)?;
        let role = self
            .member_role(db, group_id, user_id)
            .await?
            .ok_or_else(group_not_found)?;
        Ok((group, role))
    }

    pub(super) async fn require_admin(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<groups::Model> {
        let (group, role) = self.require_member(db, group_id, user_id).await?;
        if !role.is_admin() {
            return Err(EngineError::Forbidden(
                "only a group admin can do this".to_string(),
            ));
        }
        Ok(group)
    }

    pub(super) async fn require_party_member(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<()> {
        if self.member_role(db, group_id, user_id).await?.is_none() {
            return Err(EngineError::NotMember(user_id.to_string()));
        }
        Ok(())
    }

    pub(super) async fn member_ids(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
    ) -> ResultEngine<Vec<String>> {
        let rows = group_memberships::Entity::find()
            .filter(group_memberships::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(group_memberships::Column::JoinedAt)
            .all(db)
            .await?;
        Ok(rows.into_iter().map(|m| m.user_id).collect())
    }

    /// Members of a group with their display names, oldest member first.
    pub(super) async fn members(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
    ) -> ResultEngine<Vec<Member>> {
        let rows = group_memberships::Entity::find()
            .filter(group_memberships::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(group_memberships::Column::JoinedAt)
            .all(db)
            .await?;
        let names: HashMap<String, String> = users::Entity::find()
            .filter(users::Column::Username.is_in(rows.iter().map(|m| m.user_id.clone())))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.username, u.display_name))
            .collect();

        rows.into_iter()
            .map(|m| {
                Ok(Member {
                    display_name: names
                        .get(&m.user_id)
                        .cloned()
                        .unwrap_or_else(|| m.user_id.clone()),
                    role: MemberRole::try_from(m.role.as_str())?,
                    joined_at: m.joined_at,
                    user_id: m.user_id,
                })
            })
            .collect()
    }

    /// Every split of the group as an obligation, oldest expense first.
    pub(super) async fn group_obligations(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
    ) -> ResultEngine<Vec<Obligation>> {
        let rows = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(expenses::Column::OccurredAt)
            .order_by_asc(expenses::Column::CreatedAt)
            .find_with_related(expense_splits::Entity)
            .all(db)
            .await?;

        let mut out = Vec::new();
        for (expense, splits) in rows {
            for split in splits {
                out.push(expense_splits::to_obligation(split, &expense)?);
            }
        }
        Ok(out)
    }

    /// `true` while `user_id` (or anyone, when `None`) is party to an
    /// unsettled obligation in the group.
    pub(super) async fn has_unsettled(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        user_id: Option<&str>,
    ) -> ResultEngine<bool> {
        let obligations = self.group_obligations(db, group_id).await?;
        Ok(obligations.iter().filter(|o| o.is_outstanding()).any(|o| {
            user_id.is_none_or(|user_id| o.payer_id == user_id || o.ower_id == user_id)
        }))
    }

    /// Active groups `user_id` belongs to, by name.
    pub(super) async fn active_groups_of(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<Vec<groups::Model>> {
        let group_ids: Vec<String> = group_memberships::Entity::find()
            .filter(group_memberships::Column::UserId.eq(user_id.to_string()))
            .all(db)
            .await?
            .into_iter()
            .map(|m| m.group_id)
            .collect();
        groups::Entity::find()
            .filter(groups::Column::Id.is_in(group_ids))
            .filter(groups::Column::Active.eq(true))
            .order_by_asc(groups::Column::Name)
            .all(db)
            .await
            .map_err(Into::into)
    }
}
