use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Currency, EngineError, Household, Permission, ResultEngine, Role, budgets, categories,
    household_members, households, invitations, transactions,
    util::{normalize_required_name, settings_to_text},
};

use super::{Engine, with_tx};

impl Engine {
    /// Creates a household and makes `user_id` its owner.
    ///
    /// The household row and the owner membership are written in the same DB
    /// transaction: either both exist afterwards or neither does.
    pub async fn create_household(
        &self,
        user_id: Uuid,
        name: &str,
        currency: Option<Currency>,
        settings: Option<&serde_json::Value>,
    ) -> ResultEngine<Household> {
        let name = normalize_required_name(name, "household")?;
        let settings = settings_to_text(settings)?;
        let currency = currency.unwrap_or_default();
        let now = Utc::now();
        let household_id = Uuid::new_v4();

        with_tx!(self, |db_tx| {
            let household = households::ActiveModel {
                id: ActiveValue::Set(household_id),
                name: ActiveValue::Set(name.clone()),
                currency: ActiveValue::Set(currency.code().to_string()),
                settings: ActiveValue::Set(settings.clone()),
                created_by: ActiveValue::Set(user_id),
                created_at: ActiveValue::Set(now),
            }
            .insert(&db_tx)
            .await?;

            household_members::ActiveModel {
                household_id: ActiveValue::Set(household_id),
                user_id: ActiveValue::Set(user_id),
                role: ActiveValue::Set(Role::Owner.as_str().to_string()),
                active: ActiveValue::Set(true),
                joined_at: ActiveValue::Set(now),
            }
            .insert(&db_tx)
            .await?;

            tracing::info!(%household_id, owner = %user_id, "household created");
            Household::try_from(household)
        })
    }

    /// Returns a household the user can view, with the user's role.
    pub async fn household(&self, household_id: Uuid, user_id: Uuid) -> ResultEngine<(Household, Role)> {
        with_tx!(self, |db_tx| {
            self.require_household_with(&db_tx, household_id, user_id, Permission::ViewReceipts)
                .await
        })
    }

    /// Lists every household the user is an active member of.
    pub async fn list_households(&self, user_id: Uuid) -> ResultEngine<Vec<(Household, Role)>> {
        self.user_households(user_id).await
    }

    /// Updates name, currency and/or settings (owner-only).
    pub async fn update_household(
        &self,
        household_id: Uuid,
        user_id: Uuid,
        name: Option<&str>,
        currency: Option<Currency>,
        settings: Option<&serde_json::Value>,
    ) -> ResultEngine<Household> {
        if name.is_none() && currency.is_none() && settings.is_none() {
            return Err(EngineError::InvalidName(
                "provide at least one of name, currency or settings".to_string(),
            ));
        }
        let name = name
            .map(|n| normalize_required_name(n, "household"))
            .transpose()?;
        let settings = settings.map(|s| settings_to_text(Some(s))).transpose()?;

        with_tx!(self, |db_tx| {
            self.require_permission(&db_tx, household_id, user_id, Permission::ManageHousehold)
                .await?;
            let model = self.require_household(&db_tx, household_id).await?;

            let mut active: households::ActiveModel = model.into();
            if let Some(name) = name {
                active.name = ActiveValue::Set(name);
            }
            if let Some(currency) = currency {
                active.currency = ActiveValue::Set(currency.code().to_string());
            }
            if let Some(settings) = settings {
                active.settings = ActiveValue::Set(settings);
            }
            let model = active.update(&db_tx).await?;
            Household::try_from(model)
        })
    }

    /// Deletes a household and everything it owns (owner-only).
    pub async fn delete_household(&self, household_id: Uuid, user_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_permission(&db_tx, household_id, user_id, Permission::ManageHousehold)
                .await?;
            self.require_household(&db_tx, household_id).await?;

            // Children first so the delete does not depend on FK cascades.
            transactions::Entity::delete_many()
                .filter(transactions::Column::HouseholdId.eq(household_id))
                .exec(&db_tx)
                .await?;
            budgets::Entity::delete_many()
                .filter(budgets::Column::HouseholdId.eq(household_id))
                .exec(&db_tx)
                .await?;
            categories::Entity::delete_many()
                .filter(categories::Column::HouseholdId.eq(household_id))
                .exec(&db_tx)
                .await?;
            invitations::Entity::delete_many()
                .filter(invitations::Column::HouseholdId.eq(household_id))
                .exec(&db_tx)
                .await?;
            household_members::Entity::delete_many()
                .filter(household_members::Column::HouseholdId.eq(household_id))
                .exec(&db_tx)
                .await?;
            households::Entity::delete_by_id(household_id)
                .exec(&db_tx)
                .await?;

            tracing::info!(%household_id, "household deleted");
            Ok(())
        })
    }
}
