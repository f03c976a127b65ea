use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Invitation, Permission, ResultEngine, Role, invitations, users,
    util::normalize_email,
};

use super::{Engine, with_tx};

impl Engine {
    async fn require_invitation(
        &self,
        db: &DatabaseTransaction,
        invitation_id: Uuid,
    ) -> ResultEngine<invitations::Model> {
        invitations::Entity::find_by_id(invitation_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("invitation not exists".to_string()))
    }

    async fn require_invitee(
        &self,
        db: &DatabaseTransaction,
        invitation: &invitations::Model,
        user_id: Uuid,
    ) -> ResultEngine<()> {
        let user = users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?;
        if user.email != invitation.email {
            return Err(EngineError::Forbidden(
                "invitation is addressed to someone else".to_string(),
            ));
        }
        Ok(())
    }

    /// Invites an email address to join a household with `role`.
    pub async fn create_invitation(
        &self,
        household_id: Uuid,
        email: &str,
        role: Role,
        user_id: Uuid,
    ) -> ResultEngine<Invitation> {
        let email = normalize_email(email)?;
        if role == Role::Owner {
            return Err(EngineError::InvalidRole(
                "cannot invite as owner".to_string(),
            ));
        }
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.invitation_ttl)
            .ok_or_else(|| EngineError::InvalidDate("invitation expiry out of range".to_string()))?;

        with_tx!(self, |db_tx| {
            let actor_role = self
                .require_permission(&db_tx, household_id, user_id, Permission::InviteMembers)
                .await?;
            if role == Role::Admin && actor_role != Role::Owner {
                return Err(EngineError::Forbidden(
                    "only the owner can invite admins".to_string(),
                ));
            }

            if let Some(invitee) = users::Entity::find()
                .filter(users::Column::Email.eq(email.clone()))
                .one(&db_tx)
                .await?
                && self.active_role(&db_tx, household_id, invitee.id).await?.is_some()
            {
                return Err(EngineError::ExistingKey(format!(
                    "{email} is already a member"
                )));
            }

            let pending = invitations::Entity::find()
                .filter(invitations::Column::HouseholdId.eq(household_id))
                .filter(invitations::Column::Email.eq(email.clone()))
                .filter(invitations::Column::AcceptedAt.is_null())
                .filter(invitations::Column::DeclinedAt.is_null())
                .filter(invitations::Column::ExpiresAt.gt(now))
                .one(&db_tx)
                .await?;
            if pending.is_some() {
                return Err(EngineError::ExistingKey(format!(
                    "{email} already has a pending invitation"
                )));
            }

            let model = invitations::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                household_id: ActiveValue::Set(household_id),
                email: ActiveValue::Set(email.clone()),
                role: ActiveValue::Set(role.as_str().to_string()),
                invited_by: ActiveValue::Set(user_id),
                created_at: ActiveValue::Set(now),
                expires_at: ActiveValue::Set(expires_at),
                accepted_at: ActiveValue::Set(None),
                declined_at: ActiveValue::Set(None),
            }
            .insert(&db_tx)
            .await?;

            tracing::info!(%household_id, invitation_id = %model.id, "invitation created");
            Invitation::try_from(model)
        })
    }

    /// Pending invitations of a household (owner/admin only).
    pub async fn list_household_invitations(
        &self,
        household_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<Vec<Invitation>> {
        with_tx!(self, |db_tx| {
            self.require_permission(&db_tx, household_id, user_id, Permission::InviteMembers)
                .await?;
            let rows = invitations::Entity::find()
                .filter(invitations::Column::HouseholdId.eq(household_id))
                .filter(invitations::Column::AcceptedAt.is_null())
                .filter(invitations::Column::DeclinedAt.is_null())
                .order_by_desc(invitations::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            rows.into_iter().map(Invitation::try_from).collect()
        })
    }

    /// Pending, unexpired invitations addressed to the user's email.
    pub async fn list_my_invitations(&self, user_id: Uuid) -> ResultEngine<Vec<Invitation>> {
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            let user = users::Entity::find_by_id(user_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?;
            let rows = invitations::Entity::find()
                .filter(invitations::Column::Email.eq(user.email))
                .filter(invitations::Column::AcceptedAt.is_null())
                .filter(invitations::Column::DeclinedAt.is_null())
                .filter(invitations::Column::ExpiresAt.gt(now))
                .order_by_desc(invitations::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            rows.into_iter().map(Invitation::try_from).collect()
        })
    }

    /// Accepts an invitation, creating or re-activating the membership.
    pub async fn accept_invitation(&self, invitation_id: Uuid, user_id: Uuid) -> ResultEngine<Invitation> {
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            let model = self.require_invitation(&db_tx, invitation_id).await?;
            self.require_invitee(&db_tx, &model, user_id).await?;

            let invitation = Invitation::try_from(model.clone())?;
            if !invitation.is_pending() {
                return Err(EngineError::InvalidState(
                    "invitation already answered".to_string(),
                ));
            }
            if invitation.is_expired(now) {
                return Err(EngineError::Expired("invitation expired".to_string()));
            }

            self.activate_membership(&db_tx, invitation.household_id, user_id, invitation.role, now)
                .await?;

            let mut active: invitations::ActiveModel = model.into();
            active.accepted_at = ActiveValue::Set(Some(now));
            let model = active.update(&db_tx).await?;

            tracing::info!(
                household_id = %invitation.household_id,
                %user_id,
                role = invitation.role.as_str(),
                "invitation accepted"
            );
            Invitation::try_from(model)
        })
    }

    /// Declines an invitation addressed to the user.
    pub async fn decline_invitation(&self, invitation_id: Uuid, user_id: Uuid) -> ResultEngine<()> {
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            let model = self.require_invitation(&db_tx, invitation_id).await?;
            self.require_invitee(&db_tx, &model, user_id).await?;
            if model.accepted_at.is_some() || model.declined_at.is_some() {
                return Err(EngineError::InvalidState(
                    "invitation already answered".to_string(),
                ));
            }
            let mut active: invitations::ActiveModel = model.into();
            active.declined_at = ActiveValue::Set(Some(now));
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Withdraws a pending invitation (owner/admin of its household).
    pub async fn revoke_invitation(&self, invitation_id: Uuid, user_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_invitation(&db_tx, invitation_id).await?;
            self.require_permission(&db_tx, model.household_id, user_id, Permission::InviteMembers)
                .await?;
            if model.accepted_at.is_some() || model.declined_at.is_some() {
                return Err(EngineError::InvalidState(
                    "invitation already answered".to_string(),
                ));
            }
            invitations::Entity::delete_by_id(model.id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }
}
