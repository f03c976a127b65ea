use api_types::report::{CategoryBreakdown, Summary, SummaryQuery};
use axum::{Extension, extract::State};
use chrono::Utc;
use engine::User;
use uuid::Uuid;

use crate::{
    ServerError,
    extract::{Json, Path, Query},
    households::map_currency,
    server::ServerState,
};

pub(crate) async fn summary_for(
    state: &ServerState,
    household_id: Uuid,
    user_id: Uuid,
    query: SummaryQuery,
) -> Result<Summary, ServerError> {
    let summary = state
        .engine
        .household_summary(
            household_id,
            user_id,
            query.from.map(|dt| dt.with_timezone(&Utc)),
            query.to.map(|dt| dt.with_timezone(&Utc)),
        )
        .await?;

    Ok(Summary {
        household_id: summary.household_id,
        currency: map_currency(summary.currency),
        total_income_minor: summary.total_income_minor,
        total_expenses_minor: summary.total_expenses_minor,
        net_minor: summary.net_minor,
        by_category: summary
            .by_category
            .into_iter()
            .map(|row| CategoryBreakdown {
                category_id: row.category_id,
                name: row.name,
                total_minor: row.total_minor,
                percentage: row.percentage,
                monthly_budget_minor: row.monthly_budget_minor,
            })
            .collect(),
    })
}

pub async fn summary(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(household_id): Path<Uuid>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Summary>, ServerError> {
    Ok(Json(summary_for(&state, household_id, user.id, query).await?))
}
