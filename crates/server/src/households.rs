//! Household endpoints.

use api_types::{
    household::{HouseholdListResponse, HouseholdNew, HouseholdUpdate, HouseholdView},
    membership::MembershipRole,
};
use axum::{Extension, extract::State, http::StatusCode};
use engine::{Household, Role, User};
use uuid::Uuid;

use crate::{
    ServerError,
    extract::{Json, Path},
    server::ServerState,
};

pub(crate) fn map_currency(currency: engine::Currency) -> api_types::Currency {
    match currency {
        engine::Currency::Eur => api_types::Currency::Eur,
        engine::Currency::Usd => api_types::Currency::Usd,
        engine::Currency::Gbp => api_types::Currency::Gbp,
        engine::Currency::Chf => api_types::Currency::Chf,
    }
}

pub(crate) fn currency_from_api(currency: api_types::Currency) -> engine::Currency {
    match currency {
        api_types::Currency::Eur => engine::Currency::Eur,
        api_types::Currency::Usd => engine::Currency::Usd,
        api_types::Currency::Gbp => engine::Currency::Gbp,
        api_types::Currency::Chf => engine::Currency::Chf,
    }
}

pub(crate) fn map_role(role: Role) -> MembershipRole {
    match role {
        Role::Owner => MembershipRole::Owner,
        Role::Admin => MembershipRole::Admin,
        Role::Member => MembershipRole::Member,
        Role::Viewer => MembershipRole::Viewer,
    }
}

pub(crate) fn role_from_api(role: MembershipRole) -> Role {
    match role {
        MembershipRole::Owner => Role::Owner,
        MembershipRole::Admin => Role::Admin,
        MembershipRole::Member => Role::Member,
        MembershipRole::Viewer => Role::Viewer,
    }
}

pub(crate) fn map_household(household: Household, role: Role) -> HouseholdView {
    HouseholdView {
        id: household.id,
        name: household.name,
        currency: map_currency(household.currency),
        settings: household.settings,
        created_by: household.created_by,
        created_at: household.created_at,
        role: map_role(role),
    }
}

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<HouseholdListResponse>, ServerError> {
    let households = state
        .engine
        .list_households(user.id)
        .await?
        .into_iter()
        .map(|(household, role)| map_household(household, role))
        .collect();
    Ok(Json(HouseholdListResponse { households }))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<HouseholdNew>,
) -> Result<(StatusCode, Json<HouseholdView>), ServerError> {
    let household = state
        .engine
        .create_household(
            user.id,
            &payload.name,
            payload.currency.map(currency_from_api),
            payload.settings.as_ref(),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(map_household(household, Role::Owner)),
    ))
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(household_id): Path<Uuid>,
) -> Result<Json<HouseholdView>, ServerError> {
    let (household, role) = state.engine.household(household_id, user.id).await?;
    Ok(Json(map_household(household, role)))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(household_id): Path<Uuid>,
    Json(payload): Json<HouseholdUpdate>,
) -> Result<Json<HouseholdView>, ServerError> {
    if payload.name.is_none() && payload.currency.is_none() && payload.settings.is_none() {
        return Err(ServerError::Generic(
            "provide at least one of name, currency or settings".to_string(),
        ));
    }

    let household = state
        .engine
        .update_household(
            household_id,
            user.id,
            payload.name.as_deref(),
            payload.currency.map(currency_from_api),
            payload.settings.as_ref(),
        )
        .await?;
    Ok(Json(map_household(household, Role::Owner)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(household_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_household(household_id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
