use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Currency, EngineError, Group, GroupSummary, MemberRole, ResultEngine, compute_balances,
    group_memberships, groups,
    util::{normalize_optional_text, normalize_required_name, parse_uuid},
};

use super::{Engine, with_tx};

fn membership(group_id: Uuid, user_id: &str, role: MemberRole) -> group_memberships::ActiveModel {
    group_memberships::ActiveModel {
        group_id: ActiveValue::Set(group_id.to_string()),
        user_id: ActiveValue::Set(user_id.to_string()),
        role: ActiveValue::Set(role.as_str().to_string()),
        joined_at: ActiveValue::Set(Utc::now()),
    }
}

impl Engine {
    /// Creates a group; the creator becomes its first admin.
    pub async fn create_group(
        &self,
        name: &str,
        description: Option<&str>,
        currency: Option<Currency>,
        user_id: &str,
    ) -> ResultEngine<Uuid> {
        let name = normalize_required_name(name, "group")?;
        let group = Group::new(
            name,
            normalize_optional_text(description),
            currency.unwrap_or_default(),
            user_id,
        );
        let group_entry: groups::ActiveModel = (&group).into();
        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, user_id).await?;
            group_entry.insert(&db_tx).await?;
            membership(group.id, user_id, MemberRole::Admin)
                .insert(&db_tx)
                .await?;
            tracing::info!(group_id = %group.id, created_by = user_id, "group created");
            Ok(group.id)
        })
    }

    /// Returns a group with its members.
    pub async fn group(&self, group_id: Uuid, user_id: &str) -> ResultEngine<Group> {
        with_tx!(self, |db_tx| {
            let (model, _) = self.require_member(&db_tx, group_id, user_id).await?;
            let mut group = Group::try_from(model)?;
            group.members = self.members(&db_tx, group_id).await?;
            Ok(group)
        })
    }

    /// Renames the group or changes its description (admin-only).
    ///
    /// `None` keeps the current value; a blank description clears it.
    pub async fn update_group(
        &self,
        group_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        user_id: &str,
    ) -> ResultEngine<Group> {
        let name = name
            .map(|n| normalize_required_name(n, "group"))
            .transpose()?;
        with_tx!(self, |db_tx| {
            let model = self.require_admin(&db_tx, group_id, user_id).await?;
            let model = if name.is_none() && description.is_none() {
                model
            } else {
                let mut active: groups::ActiveModel = model.into();
                if let Some(name) = name {
                    active.name = ActiveValue::Set(name);
                }
                if description.is_some() {
                    active.description = ActiveValue::Set(normalize_optional_text(description));
                }
                let model = active.update(&db_tx).await?;
                tracing::info!(%group_id, updated_by = user_id, "group updated");
                model
            };
            let mut group = Group::try_from(model)?;
            group.members = self.members(&db_tx, group_id).await?;
            Ok(group)
        })
    }

    /// Active groups `user_id` belongs to, with the user's net position in each.
    pub async fn list_groups(&self, user_id: &str) -> ResultEngine<Vec<GroupSummary>> {
        with_tx!(self, |db_tx| {
            let models = self.active_groups_of(&db_tx, user_id).await?;
            let mut out = Vec::with_capacity(models.len());
            for model in models {
                let group = Group::try_from(model)?;
                let members = self.member_ids(&db_tx, group.id).await?.len();
                let obligations = self.group_obligations(&db_tx, group.id).await?;
                let net = compute_balances(&obligations)?
                    .into_iter()
                    .find(|b| b.user_id == user_id)
                    .map(|b| b.amount)
                    .unwrap_or_default();
                out.push(GroupSummary {
                    id: group.id,
                    name: group.name,
                    currency: group.currency,
                    members,
                    net,
                });
            }
            Ok(out)
        })
    }

    /// Adds `member` to the group (admin-only).
    pub async fn add_member(
        &self,
        group_id: Uuid,
        member: &str,
        role: MemberRole,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_admin(&db_tx, group_id, user_id).await?;
            self.require_user_exists(&db_tx, member).await?;
            if self.member_role(&db_tx, group_id, member).await?.is_some() {
                return Err(EngineError::ExistingKey(member.to_string()));
            }
            membership(group_id, member, role).insert(&db_tx).await?;
            tracing::info!(%group_id, member, role = role.as_str(), "member added");
            Ok(())
        })
    }

    /// Joins the active group with `invite_code` as a plain member.
    pub async fn join_group(&self, invite_code: &str, user_id: &str) -> ResultEngine<Uuid> {
        let invite_code = invite_code.trim().to_string();
        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, user_id).await?;
            let model = groups::Entity::find()
                .filter(groups::Column::InviteCode.eq(invite_code.clone()))
                .filter(groups::Column::Active.eq(true))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("invite code not exists".to_string()))?;
            let group_id = parse_uuid(&model.id, "group")?;
            if self.member_role(&db_tx, group_id, user_id).await?.is_some() {
                return Err(EngineError::ExistingKey(user_id.to_string()));
            }
            membership(group_id, user_id, MemberRole::Member)
                .insert(&db_tx)
                .await?;
            tracing::info!(%group_id, member = user_id, "member joined");
            Ok(group_id)
        })
    }

    /// Removes `member` from the group (admin-only).
    ///
    /// Rejected while the member is party to any unsettled obligation.
    pub async fn remove_member(
        &self,
        group_id: Uuid,
        member: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_admin(&db_tx, group_id, user_id).await?;
            if member == user_id {
                return Err(EngineError::Forbidden(
                    "use leave_group to leave a group".to_string(),
                ));
            }
            self.require_party_member(&db_tx, group_id, member).await?;
            if self.has_unsettled(&db_tx, group_id, Some(member)).await? {
                return Err(EngineError::Forbidden(format!(
                    "{member} still has unsettled expenses"
                )));
            }
            group_memberships::Entity::delete_by_id((group_id.to_string(), member.to_string()))
                .exec(&db_tx)
                .await?;
            tracing::info!(%group_id, member, "member removed");
            Ok(())
        })
    }

    /// Leaves the group. The group is deactivated once nobody is left.
    pub async fn leave_group(&self, group_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let (group, _) = self.require_member(&db_tx, group_id, user_id).await?;
            if self.has_unsettled(&db_tx, group_id, Some(user_id)).await? {
                return Err(EngineError::Forbidden(
                    "settle your expenses before leaving the group".to_string(),
                ));
            }
            group_memberships::Entity::delete_by_id((group_id.to_string(), user_id.to_string()))
                .exec(&db_tx)
                .await?;
            if self.member_ids(&db_tx, group_id).await?.is_empty() {
                let mut active: groups::ActiveModel = group.into();
                active.active = ActiveValue::Set(false);
                active.update(&db_tx).await?;
                tracing::info!(%group_id, "last member left, group deactivated");
            }
            tracing::info!(%group_id, member = user_id, "member left");
            Ok(())
        })
    }

    /// Deactivates the group (admin-only). Rejected while anything is unsettled.
    pub async fn delete_group(&self, group_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let group = self.require_admin(&db_tx, group_id, user_id).await?;
            if self.has_unsettled(&db_tx, group_id, None).await? {
                return Err(EngineError::Forbidden(
                    "group still has unsettled expenses".to_string(),
                ));
            }
            let mut active: groups::ActiveModel = group.into();
            active.active = ActiveValue::Set(false);
            active.update(&db_tx).await?;
            tracing::info!(%group_id, "group deleted");
            Ok(())
        })
    }
}
