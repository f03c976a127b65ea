//! Endpoints about the authenticated user.

use api_types::{
    household::HouseholdListResponse,
    user::{UserUpdate, UserView},
};
use axum::{Extension, extract::State};
use engine::User;

use crate::{ServerError, extract::Json, households::map_household, server::ServerState};

fn map_user(user: User) -> UserView {
    UserView {
        id: user.id,
        email: user.email,
        display_name: user.display_name,
        created_at: user.created_at,
    }
}

pub async fn me(Extension(user): Extension<User>) -> Json<UserView> {
    Json(map_user(user))
}

pub async fn update_me(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<UserUpdate>,
) -> Result<Json<UserView>, ServerError> {
    let user = state
        .engine
        .update_user(user.id, &payload.display_name)
        .await?;
    Ok(Json(map_user(user)))
}

pub async fn my_households(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<HouseholdListResponse>, ServerError> {
    let households = state
        .engine
        .user_households(user.id)
        .await?
        .into_iter()
        .map(|(household, role)| map_household(household, role))
        .collect();
    Ok(Json(HouseholdListResponse { households }))
}
