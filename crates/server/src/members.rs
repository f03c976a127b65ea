//! Household membership endpoints.

use api_types::membership::{MemberRoleUpdate, MemberView, MembersResponse};
use axum::{Extension, extract::State, http::StatusCode};
use engine::{Member, User};
use uuid::Uuid;

use crate::{
    ServerError,
    extract::{Json, Path},
    households::{map_role, role_from_api},
    server::ServerState,
};

fn map_member(member: Member) -> MemberView {
    MemberView {
        user_id: member.user_id,
        email: member.email,
        display_name: member.display_name,
        role: map_role(member.role),
        joined_at: member.joined_at,
    }
}

async fn members_of(
    state: &ServerState,
    household_id: Uuid,
    user_id: Uuid,
) -> Result<MembersResponse, ServerError> {
    let members = state
        .engine
        .list_members(household_id, user_id)
        .await?
        .into_iter()
        .map(map_member)
        .collect();
    Ok(MembersResponse { members })
}

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(household_id): Path<Uuid>,
) -> Result<Json<MembersResponse>, ServerError> {
    Ok(Json(members_of(&state, household_id, user.id).await?))
}

/// Changes a member's role and returns the updated member list.
pub async fn update_role(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((household_id, member_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<MemberRoleUpdate>,
) -> Result<Json<MembersResponse>, ServerError> {
    state
        .engine
        .update_member_role(household_id, member_id, role_from_api(payload.role), user.id)
        .await?;
    Ok(Json(members_of(&state, household_id, user.id).await?))
}

pub async fn remove(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((household_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .remove_member(household_id, member_id, user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn leave(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(household_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.leave_household(household_id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
