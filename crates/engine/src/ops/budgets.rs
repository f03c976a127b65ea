use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Budget, BudgetChanges, BudgetProgress, EngineError, NewBudget, Permission, ResultEngine,
    budgets::{self, validate_range},
    util::{normalize_required_name, require_positive_amount},
};

use super::{Engine, with_tx};

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

impl Engine {
    async fn require_budget(
        &self,
        db: &DatabaseTransaction,
        budget_id: Uuid,
    ) -> ResultEngine<budgets::Model> {
        budgets::Entity::find_by_id(budget_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("budget not exists".to_string()))
    }

    pub async fn create_budget(
        &self,
        household_id: Uuid,
        user_id: Uuid,
        input: NewBudget,
    ) -> ResultEngine<Budget> {
        let name = normalize_required_name(&input.name, "budget")?;
        let amount_minor = require_positive_amount(input.amount_minor, "amount_minor")?;
        validate_range(input.period, input.start_date, input.end_date)?;

        with_tx!(self, |db_tx| {
            self.require_permission(&db_tx, household_id, user_id, Permission::ManageFinances)
                .await?;
            if let Some(category_id) = input.category_id {
                self.require_category_in_household(&db_tx, household_id, category_id)
                    .await?;
            }

            let model = budgets::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                household_id: ActiveValue::Set(household_id),
                name: ActiveValue::Set(name.clone()),
                amount_minor: ActiveValue::Set(amount_minor),
                period: ActiveValue::Set(input.period.as_str().to_string()),
                start_date: ActiveValue::Set(input.start_date),
                end_date: ActiveValue::Set(input.end_date),
                category_id: ActiveValue::Set(input.category_id),
                created_by: ActiveValue::Set(user_id),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;

            tracing::info!(%household_id, budget_id = %model.id, "budget created");
            Budget::try_from(model)
        })
    }

    /// A budget of a household the user can view.
    pub async fn budget(&self, budget_id: Uuid, user_id: Uuid) -> ResultEngine<Budget> {
        with_tx!(self, |db_tx| {
            let model = self.require_budget(&db_tx, budget_id).await?;
            self.require_permission(&db_tx, model.household_id, user_id, Permission::ViewReceipts)
                .await?;
            Budget::try_from(model)
        })
    }

    /// Budgets across the user's households, or the given ones.
    pub async fn list_budgets(
        &self,
        user_id: Uuid,
        scope: Option<&[Uuid]>,
    ) -> ResultEngine<Vec<Budget>> {
        with_tx!(self, |db_tx| {
            let households = self.viewable_households(&db_tx, user_id, scope).await?;
            if households.is_empty() {
                return Ok(Vec::new());
            }
            let rows = budgets::Entity::find()
                .filter(budgets::Column::HouseholdId.is_in(households))
                .order_by_asc(budgets::Column::Name)
                .order_by_asc(budgets::Column::Id)
                .all(&db_tx)
                .await?;
            rows.into_iter().map(Budget::try_from).collect()
        })
    }

    pub async fn update_budget(
        &self,
        budget_id: Uuid,
        user_id: Uuid,
        changes: BudgetChanges,
    ) -> ResultEngine<Budget> {
        let name = changes
            .name
            .as_deref()
            .map(|n| normalize_required_name(n, "budget"))
            .transpose()?;
        let amount_minor = changes
            .amount_minor
            .map(|v| require_positive_amount(v, "amount_minor"))
            .transpose()?;

        with_tx!(self, |db_tx| {
            let model = self.require_budget(&db_tx, budget_id).await?;
            let household_id = model.household_id;
            self.require_permission(&db_tx, household_id, user_id, Permission::ManageFinances)
                .await?;

            let current = Budget::try_from(model.clone())?;
            let period = changes.period.unwrap_or(current.period);
            let start_date = changes.start_date.unwrap_or(current.start_date);
            let end_date = changes.end_date.or(current.end_date);
            validate_range(period, start_date, end_date)?;

            if let Some(category_id) = changes.category_id {
                self.require_category_in_household(&db_tx, household_id, category_id)
                    .await?;
            }

            let mut active: budgets::ActiveModel = model.into();
            if let Some(name) = name {
                active.name = ActiveValue::Set(name);
            }
            if let Some(amount_minor) = amount_minor {
                active.amount_minor = ActiveValue::Set(amount_minor);
            }
            active.period = ActiveValue::Set(period.as_str().to_string());
            active.start_date = ActiveValue::Set(start_date);
            active.end_date = ActiveValue::Set(end_date);
            if let Some(category_id) = changes.category_id {
                active.category_id = ActiveValue::Set(Some(category_id));
            }

            let model = active.update(&db_tx).await?;
            Budget::try_from(model)
        })
    }

    pub async fn delete_budget(&self, budget_id: Uuid, user_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_budget(&db_tx, budget_id).await?;
            self.require_permission(&db_tx, model.household_id, user_id, Permission::ManageFinances)
                .await?;
            budgets::Entity::delete_by_id(model.id).exec(&db_tx).await?;
            Ok(())
        })
    }

    /// Spending against a budget for the window that contains `at`.
    pub async fn budget_progress(
        &self,
        budget_id: Uuid,
        user_id: Uuid,
        at: NaiveDate,
    ) -> ResultEngine<BudgetProgress> {
        with_tx!(self, |db_tx| {
            let model = self.require_budget(&db_tx, budget_id).await?;
            self.require_permission(&db_tx, model.household_id, user_id, Permission::ViewReceipts)
                .await?;
            let budget = Budget::try_from(model)?;

            let (start, end) = budget.window(at)?;
            let until = end
                .succ_opt()
                .map(day_start)
                .ok_or_else(|| EngineError::InvalidDate(format!("date out of range: {end}")))?;

            let expenses = self
                .expenses_between(
                    &db_tx,
                    budget.household_id,
                    Some(day_start(start)),
                    Some(until),
                    budget.category_id,
                )
                .await?;
            let spent = expenses
                .iter()
                .fold(0i64, |acc, tx| acc.saturating_add(tx.amount_minor));

            Ok(budget.progress((start, end), spent))
        })
    }
}
