use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Category, EngineError, Permission, ResultEngine, budgets, categories, transactions,
    util::{
        normalize_category_key, normalize_color, normalize_optional_text, normalize_required_name,
        require_positive_amount,
    },
};

use super::{Engine, with_tx};

/// Input for creating a category.
#[derive(Clone, Debug, Default)]
pub struct NewCategory {
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub monthly_budget_minor: Option<i64>,
}

/// Partial update; `None` leaves a field untouched.
#[derive(Clone, Debug, Default)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    /// `Some(None)` removes the monthly budget.
    pub monthly_budget_minor: Option<Option<i64>>,
}

impl Engine {
    async fn ensure_category_name_free(
        &self,
        db_tx: &DatabaseTransaction,
        household_id: Uuid,
        name_norm: &str,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query = categories::Entity::find()
            .filter(categories::Column::HouseholdId.eq(household_id))
            .filter(categories::Column::NameNorm.eq(name_norm.to_string()));
        if let Some(id) = except {
            query = query.filter(categories::Column::Id.ne(id));
        }
        if query.one(db_tx).await?.is_some() {
            return Err(EngineError::ExistingKey(name_norm.to_string()));
        }
        Ok(())
    }

    /// Lists a household's categories by name.
    pub async fn list_categories(&self, household_id: Uuid, user_id: Uuid) -> ResultEngine<Vec<Category>> {
        with_tx!(self, |db_tx| {
            self.require_permission(&db_tx, household_id, user_id, Permission::ViewReceipts)
                .await?;
            let rows = categories::Entity::find()
                .filter(categories::Column::HouseholdId.eq(household_id))
                .order_by_asc(categories::Column::NameNorm)
                .all(&db_tx)
                .await?;
            Ok(rows.into_iter().map(Category::from).collect())
        })
    }

    pub async fn create_category(
        &self,
        household_id: Uuid,
        input: NewCategory,
        user_id: Uuid,
    ) -> ResultEngine<Category> {
        let name = normalize_required_name(&input.name, "category")?;
        let name_norm = normalize_category_key(&name)?;
        let color = input.color.as_deref().map(normalize_color).transpose()?;
        let icon = normalize_optional_text(input.icon.as_deref());
        let monthly_budget_minor = input
            .monthly_budget_minor
            .map(|v| require_positive_amount(v, "monthly_budget_minor"))
            .transpose()?;

        with_tx!(self, |db_tx| {
            self.require_permission(&db_tx, household_id, user_id, Permission::ManageFinances)
                .await?;
            self.ensure_category_name_free(&db_tx, household_id, &name_norm, None)
                .await?;

            let model = categories::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                household_id: ActiveValue::Set(household_id),
                name: ActiveValue::Set(name.clone()),
                name_norm: ActiveValue::Set(name_norm.clone()),
                color: ActiveValue::Set(color.clone()),
                icon: ActiveValue::Set(icon.clone()),
                monthly_budget_minor: ActiveValue::Set(monthly_budget_minor),
            }
            .insert(&db_tx)
            .await?;
            Ok(Category::from(model))
        })
    }

    pub async fn update_category(
        &self,
        household_id: Uuid,
        category_id: Uuid,
        changes: CategoryChanges,
        user_id: Uuid,
    ) -> ResultEngine<Category> {
        let name = changes
            .name
            .as_deref()
            .map(|n| normalize_required_name(n, "category"))
            .transpose()?;
        let name_norm = name.as_deref().map(normalize_category_key).transpose()?;
        let color = changes.color.as_deref().map(normalize_color).transpose()?;
        let monthly_budget = match changes.monthly_budget_minor {
            Some(Some(v)) => Some(Some(require_positive_amount(v, "monthly_budget_minor")?)),
            other => other,
        };

        with_tx!(self, |db_tx| {
            self.require_permission(&db_tx, household_id, user_id, Permission::ManageFinances)
                .await?;
            let model = self
                .require_category_in_household(&db_tx, household_id, category_id)
                .await?;

            let mut active: categories::ActiveModel = model.into();
            if let (Some(name), Some(name_norm)) = (name, name_norm) {
                self.ensure_category_name_free(&db_tx, household_id, &name_norm, Some(category_id))
                    .await?;
                active.name = ActiveValue::Set(name);
                active.name_norm = ActiveValue::Set(name_norm);
            }
            if let Some(color) = color {
                active.color = ActiveValue::Set(Some(color));
            }
            if let Some(icon) = changes.icon {
                active.icon = ActiveValue::Set(normalize_optional_text(Some(&icon)));
            }
            if let Some(budget) = monthly_budget {
                active.monthly_budget_minor = ActiveValue::Set(budget);
            }
            let model = active.update(&db_tx).await?;
            Ok(Category::from(model))
        })
    }

    /// Deletes a category. Its transactions become uncategorized and budgets
    /// scoped to it are removed.
    pub async fn delete_category(
        &self,
        household_id: Uuid,
        category_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_permission(&db_tx, household_id, user_id, Permission::ManageFinances)
                .await?;
            self.require_category_in_household(&db_tx, household_id, category_id)
                .await?;

            transactions::Entity::update_many()
                .col_expr(
                    transactions::Column::CategoryId,
                    Expr::value(Option::<Uuid>::None),
                )
                .filter(transactions::Column::HouseholdId.eq(household_id))
                .filter(transactions::Column::CategoryId.eq(category_id))
                .exec(&db_tx)
                .await?;
            budgets::Entity::delete_many()
                .filter(budgets::Column::HouseholdId.eq(household_id))
                .filter(budgets::Column::CategoryId.eq(category_id))
                .exec(&db_tx)
                .await?;
            categories::Entity::delete_by_id(category_id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }
}
