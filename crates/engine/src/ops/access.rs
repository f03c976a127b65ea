use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Household, Permission, ResultEngine, Role, household_members, households,
};

use super::{Engine, with_tx};

fn denied() -> EngineError {
    EngineError::Forbidden("household access denied".to_string())
}

/// Generates a `require_*_in_household` method that loads a household-scoped
/// row by id, or fails with `KeyNotFound`.
macro_rules! impl_target_in_household {
    ($require_fn:ident, $entity:path, $model:path, $household_col:expr, $err_msg:literal) => {
        pub(super) async fn $require_fn(
            &self,
            db: &DatabaseTransaction,
            household_id: Uuid,
            target_id: Uuid,
        ) -> ResultEngine<$model> {
            <$entity>::find_by_id(target_id)
                .filter($household_col.eq(household_id))
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound($err_msg.to_string()))
        }
    };
}

impl Engine {
    impl_target_in_household!(
        require_category_in_household,
        crate::categories::Entity,
        crate::categories::Model,
        crate::categories::Column::HouseholdId,
        "category not exists"
    );

    impl_target_in_household!(
        require_transaction_in_household,
        crate::transactions::Entity,
        crate::transactions::Model,
        crate::transactions::Column::HouseholdId,
        "transaction not exists"
    );

    /// Role of `user_id` in `household_id`, or `None` when there is no active
    /// membership.
    pub(super) async fn active_role(
        &self,
        db: &DatabaseTransaction,
        household_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<Option<Role>> {
        let row = household_members::Entity::find_by_id((household_id, user_id))
            .one(db)
            .await?;
        match row {
            Some(m) if m.active => Role::try_from(m.role.as_str()).map(Some),
            _ => Ok(None),
        }
    }

    /// Fails with `Forbidden` unless the user is an active member whose role
    /// grants `permission`.
    pub(super) async fn require_permission(
        &self,
        db: &DatabaseTransaction,
        household_id: Uuid,
        user_id: Uuid,
        permission: Permission,
    ) -> ResultEngine<Role> {
        match self.active_role(db, household_id, user_id).await? {
            Some(role) if role.has(permission) => Ok(role),
            _ => {
                tracing::debug!(
                    %household_id,
                    %user_id,
                    permission = permission.as_str(),
                    "permission denied"
                );
                Err(denied())
            }
        }
    }

    /// Fails with `Forbidden` unless the user is an active member holding one
    /// of `allowed`.
    pub(super) async fn require_role(
        &self,
        db: &DatabaseTransaction,
        household_id: Uuid,
        user_id: Uuid,
        allowed: &[Role],
    ) -> ResultEngine<Role> {
        match self.active_role(db, household_id, user_id).await? {
            Some(role) if allowed.contains(&role) => Ok(role),
            _ => Err(denied()),
        }
    }

    pub(super) async fn require_household(
        &self,
        db: &DatabaseTransaction,
        household_id: Uuid,
    ) -> ResultEngine<households::Model> {
        households::Entity::find_by_id(household_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("household not exists".to_string()))
    }

    /// Permission check followed by the household load.
    pub(super) async fn require_household_with(
        &self,
        db: &DatabaseTransaction,
        household_id: Uuid,
        user_id: Uuid,
        permission: Permission,
    ) -> ResultEngine<(Household, Role)> {
        let role = self
            .require_permission(db, household_id, user_id, permission)
            .await?;
        let model = self.require_household(db, household_id).await?;
        Ok((Household::try_from(model)?, role))
    }

    /// Checks `permission` for the user in a household and returns their role.
    pub async fn check_permission(
        &self,
        household_id: Uuid,
        user_id: Uuid,
        permission: Permission,
    ) -> ResultEngine<Role> {
        with_tx!(self, |db_tx| {
            self.require_permission(&db_tx, household_id, user_id, permission)
                .await
        })
    }

    /// Checks that the user holds one of `allowed` in a household.
    pub async fn check_role(
        &self,
        household_id: Uuid,
        user_id: Uuid,
        allowed: &[Role],
    ) -> ResultEngine<Role> {
        with_tx!(self, |db_tx| {
            self.require_role(&db_tx, household_id, user_id, allowed)
                .await
        })
    }

    /// Active role of a user in a household, if any.
    pub async fn member_role(&self, household_id: Uuid, user_id: Uuid) -> ResultEngine<Option<Role>> {
        with_tx!(self, |db_tx| {
            self.active_role(&db_tx, household_id, user_id).await
        })
    }
}
