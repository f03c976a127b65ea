//! Categories API endpoints.

use api_types::category::{CategoryCreate, CategoryListResponse, CategoryUpdate, CategoryView};
use axum::{Extension, extract::State, http::StatusCode};
use engine::{CategoryChanges, NewCategory, User};
use uuid::Uuid;

use crate::{
    ServerError,
    extract::{Json, Path},
    server::ServerState,
};

pub(crate) fn map_category(category: engine::Category) -> CategoryView {
    CategoryView {
        id: category.id,
        household_id: category.household_id,
        name: category.name,
        color: category.color,
        icon: category.icon,
        monthly_budget_minor: category.monthly_budget_minor,
    }
}

pub(crate) fn new_category(payload: CategoryCreate) -> NewCategory {
    NewCategory {
        name: payload.name,
        color: payload.color,
        icon: payload.icon,
        monthly_budget_minor: payload.monthly_budget_minor,
    }
}

pub(crate) async fn list_for(
    state: &ServerState,
    household_id: Uuid,
    user_id: Uuid,
) -> Result<CategoryListResponse, ServerError> {
    let categories = state
        .engine
        .list_categories(household_id, user_id)
        .await?
        .into_iter()
        .map(map_category)
        .collect();
    Ok(CategoryListResponse { categories })
}

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(household_id): Path<Uuid>,
) -> Result<Json<CategoryListResponse>, ServerError> {
    Ok(Json(list_for(&state, household_id, user.id).await?))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(household_id): Path<Uuid>,
    Json(payload): Json<CategoryCreate>,
) -> Result<(StatusCode, Json<CategoryView>), ServerError> {
    let category = state
        .engine
        .create_category(household_id, new_category(payload), user.id)
        .await?;
    Ok((StatusCode::CREATED, Json(map_category(category))))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((household_id, category_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CategoryUpdate>,
) -> Result<Json<CategoryView>, ServerError> {
    let monthly_budget_minor = match (payload.monthly_budget_minor, payload.clear_monthly_budget) {
        (Some(amount), _) => Some(Some(amount)),
        (None, true) => Some(None),
        (None, false) => None,
    };
    let changes = CategoryChanges {
        name: payload.name,
        color: payload.color,
        icon: payload.icon,
        monthly_budget_minor,
    };
    if changes.name.is_none()
        && changes.color.is_none()
        && changes.icon.is_none()
        && changes.monthly_budget_minor.is_none()
    {
        return Err(ServerError::Generic(
            "provide at least one field to update".to_string(),
        ));
    }

    let category = state
        .engine
        .update_category(household_id, category_id, changes, user.id)
        .await?;
    Ok(Json(map_category(category)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((household_id, category_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_category(household_id, category_id, user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
