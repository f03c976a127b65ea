//! Budget endpoints.

use api_types::budget::{
    BudgetList, BudgetListResponse, BudgetNew, BudgetPeriod as ApiPeriod, BudgetProgressQuery,
    BudgetProgressView, BudgetUpdate, BudgetView,
};
use axum::{Extension, extract::State, http::StatusCode};
use chrono::Utc;
use engine::{Budget, BudgetChanges, BudgetPeriod, NewBudget, User};
use uuid::Uuid;

use crate::{
    ServerError,
    extract::{HouseholdScope, Json, Path, Query},
    server::ServerState,
};

fn map_period(period: BudgetPeriod) -> ApiPeriod {
    match period {
        BudgetPeriod::Monthly => ApiPeriod::Monthly,
        BudgetPeriod::Yearly => ApiPeriod::Yearly,
        BudgetPeriod::Custom => ApiPeriod::Custom,
    }
}

fn period_from_api(period: ApiPeriod) -> BudgetPeriod {
    match period {
        ApiPeriod::Monthly => BudgetPeriod::Monthly,
        ApiPeriod::Yearly => BudgetPeriod::Yearly,
        ApiPeriod::Custom => BudgetPeriod::Custom,
    }
}

pub(crate) fn map_budget(budget: Budget) -> BudgetView {
    BudgetView {
        id: budget.id,
        household_id: budget.household_id,
        name: budget.name,
        amount_minor: budget.amount_minor,
        period: map_period(budget.period),
        start_date: budget.start_date,
        end_date: budget.end_date,
        category_id: budget.category_id,
    }
}

pub(crate) async fn list_for(
    state: &ServerState,
    user_id: Uuid,
    scope: Option<&[Uuid]>,
) -> Result<BudgetListResponse, ServerError> {
    let budgets = state
        .engine
        .list_budgets(user_id, scope)
        .await?
        .into_iter()
        .map(map_budget)
        .collect();
    Ok(BudgetListResponse { budgets })
}

/// Lists budgets. The `x-household-ids` header wins over `?household_id`.
pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    HouseholdScope(scope): HouseholdScope,
    Query(query): Query<BudgetList>,
) -> Result<Json<BudgetListResponse>, ServerError> {
    let scope = match (scope, query.household_id) {
        (Some(ids), _) => Some(ids),
        (None, Some(household_id)) => Some(vec![household_id]),
        (None, None) => None,
    };
    Ok(Json(list_for(&state, user.id, scope.as_deref()).await?))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<BudgetNew>,
) -> Result<(StatusCode, Json<BudgetView>), ServerError> {
    let input = NewBudget {
        name: payload.name,
        amount_minor: payload.amount_minor,
        period: period_from_api(payload.period),
        start_date: payload.start_date,
        end_date: payload.end_date,
        category_id: payload.category_id,
    };
    let budget = state
        .engine
        .create_budget(payload.household_id, user.id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(map_budget(budget))))
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(budget_id): Path<Uuid>,
) -> Result<Json<BudgetView>, ServerError> {
    let budget = state.engine.budget(budget_id, user.id).await?;
    Ok(Json(map_budget(budget)))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(budget_id): Path<Uuid>,
    Json(payload): Json<BudgetUpdate>,
) -> Result<Json<BudgetView>, ServerError> {
    let changes = BudgetChanges {
        name: payload.name,
        amount_minor: payload.amount_minor,
        period: payload.period.map(period_from_api),
        start_date: payload.start_date,
        end_date: payload.end_date,
        category_id: payload.category_id,
    };
    let budget = state
        .engine
        .update_budget(budget_id, user.id, changes)
        .await?;
    Ok(Json(map_budget(budget)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(budget_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_budget(budget_id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn progress(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(budget_id): Path<Uuid>,
    Query(query): Query<BudgetProgressQuery>,
) -> Result<Json<BudgetProgressView>, ServerError> {
    let at = query.at.unwrap_or_else(|| Utc::now().date_naive());
    let progress = state
        .engine
        .budget_progress(budget_id, user.id, at)
        .await?;
    Ok(Json(BudgetProgressView {
        budget_id: progress.budget_id,
        window_start: progress.window_start,
        window_end: progress.window_end,
        amount_minor: progress.amount_minor,
        spent_minor: progress.spent_minor,
        remaining_minor: progress.remaining_minor,
        percentage: progress.percentage,
    }))
}
