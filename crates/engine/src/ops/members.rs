use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Member, Permission, ResultEngine, Role, household_members, users,
};

use super::{Engine, with_tx};

impl Engine {
    async fn require_active_member(
        &self,
        db: &DatabaseTransaction,
        household_id: Uuid,
        member_id: Uuid,
    ) -> ResultEngine<household_members::Model> {
        household_members::Entity::find_by_id((household_id, member_id))
            .one(db)
            .await?
            .filter(|m| m.active)
            .ok_or_else(|| EngineError::KeyNotFound("member not exists".to_string()))
    }

    async fn deactivate_membership(
        &self,
        db: &DatabaseTransaction,
        membership: household_members::Model,
    ) -> ResultEngine<()> {
        let mut active: household_members::ActiveModel = membership.into();
        active.active = ActiveValue::Set(false);
        active.update(db).await?;
        Ok(())
    }

    /// Inserts a membership or re-activates a previous one with a new role.
    pub(super) async fn activate_membership(
        &self,
        db: &DatabaseTransaction,
        household_id: Uuid,
        user_id: Uuid,
        role: Role,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        match household_members::Entity::find_by_id((household_id, user_id))
            .one(db)
            .await?
        {
            Some(existing) if existing.active => Err(EngineError::ExistingKey(
                "user is already a member".to_string(),
            )),
            Some(existing) => {
                let mut active: household_members::ActiveModel = existing.into();
                active.role = ActiveValue::Set(role.as_str().to_string());
                active.active = ActiveValue::Set(true);
                active.joined_at = ActiveValue::Set(now);
                active.update(db).await?;
                Ok(())
            }
            None => {
                household_members::ActiveModel {
                    household_id: ActiveValue::Set(household_id),
                    user_id: ActiveValue::Set(user_id),
                    role: ActiveValue::Set(role.as_str().to_string()),
                    active: ActiveValue::Set(true),
                    joined_at: ActiveValue::Set(now),
                }
                .insert(db)
                .await?;
                Ok(())
            }
        }
    }

    /// Lists the active members of a household.
    pub async fn list_members(&self, household_id: Uuid, user_id: Uuid) -> ResultEngine<Vec<Member>> {
        with_tx!(self, |db_tx| {
            self.require_permission(&db_tx, household_id, user_id, Permission::ViewReceipts)
                .await?;

            let rows = household_members::Entity::find()
                .filter(household_members::Column::HouseholdId.eq(household_id))
                .filter(household_members::Column::Active.eq(true))
                .find_also_related(users::Entity)
                .order_by_asc(household_members::Column::JoinedAt)
                .all(&db_tx)
                .await?;

            let mut out = Vec::with_capacity(rows.len());
            for (membership, user) in rows {
                let Some(user) = user else {
                    continue;
                };
                out.push(Member {
                    user_id: membership.user_id,
                    email: user.email,
                    display_name: user.display_name,
                    role: Role::try_from(membership.role.as_str())?,
                    joined_at: membership.joined_at,
                });
            }
            Ok(out)
        })
    }

    /// Changes the role of a non-owner member.
    ///
    /// Requires `InviteMembers`; granting or revoking `admin` is owner-only and
    /// the owner role can never be assigned here.
    pub async fn update_member_role(
        &self,
        household_id: Uuid,
        member_id: Uuid,
        role: Role,
        user_id: Uuid,
    ) -> ResultEngine<()> {
        if role == Role::Owner {
            return Err(EngineError::InvalidRole(
                "ownership transfer is not supported".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let actor_role = self
                .require_permission(&db_tx, household_id, user_id, Permission::InviteMembers)
                .await?;
            let membership = self
                .require_active_member(&db_tx, household_id, member_id)
                .await?;
            let current = Role::try_from(membership.role.as_str())?;

            if current == Role::Owner {
                return Err(EngineError::Forbidden(
                    "the owner's role cannot be changed".to_string(),
                ));
            }
            if actor_role != Role::Owner && (current == Role::Admin || role == Role::Admin) {
                return Err(EngineError::Forbidden(
                    "only the owner can grant or revoke admin".to_string(),
                ));
            }

            let mut active: household_members::ActiveModel = membership.into();
            active.role = ActiveValue::Set(role.as_str().to_string());
            active.update(&db_tx).await?;

            tracing::info!(%household_id, %member_id, role = role.as_str(), "member role updated");
            Ok(())
        })
    }

    /// Removes a member (owner/admin only). The owner cannot be removed.
    pub async fn remove_member(
        &self,
        household_id: Uuid,
        member_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_role(&db_tx, household_id, user_id, &[Role::Owner, Role::Admin])
                .await?;
            let membership = self
                .require_active_member(&db_tx, household_id, member_id)
                .await?;
            if Role::try_from(membership.role.as_str())? == Role::Owner {
                return Err(EngineError::Forbidden(
                    "cannot remove household owner".to_string(),
                ));
            }

            self.deactivate_membership(&db_tx, membership).await?;
            tracing::info!(%household_id, %member_id, removed_by = %user_id, "member removed");
            Ok(())
        })
    }

    /// Leaves a household. The owner must transfer ownership first, which is
    /// not supported, so owners can never leave.
    pub async fn leave_household(&self, household_id: Uuid, user_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let role = self
                .require_permission(&db_tx, household_id, user_id, Permission::ViewReceipts)
                .await?;
            if role == Role::Owner {
                return Err(EngineError::Forbidden(
                    "the owner cannot leave the household".to_string(),
                ));
            }
            let membership = self
                .require_active_member(&db_tx, household_id, user_id)
                .await?;
            self.deactivate_membership(&db_tx, membership).await?;
            tracing::info!(%household_id, %user_id, "member left");
            Ok(())
        })
    }

    /// Number of active members.
    pub async fn member_count(&self, household_id: Uuid) -> ResultEngine<u64> {
        household_members::Entity::find()
            .filter(household_members::Column::HouseholdId.eq(household_id))
            .filter(household_members::Column::Active.eq(true))
            .count(&self.database)
            .await
            .map_err(Into::into)
    }
}
