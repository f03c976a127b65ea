//! Invitation endpoints.

use api_types::invitation::{InvitationListResponse, InvitationNew, InvitationView};
use axum::{Extension, extract::State, http::StatusCode};
use engine::{Invitation, User};
use uuid::Uuid;

use crate::{
    ServerError,
    extract::{Json, Path},
    households::{map_role, role_from_api},
    server::ServerState,
};

fn map_invitation(invitation: Invitation) -> InvitationView {
    InvitationView {
        id: invitation.id,
        household_id: invitation.household_id,
        email: invitation.email,
        role: map_role(invitation.role),
        invited_by: invitation.invited_by,
        created_at: invitation.created_at,
        expires_at: invitation.expires_at,
        accepted: invitation.accepted_at.is_some(),
    }
}

fn list_response(invitations: Vec<Invitation>) -> InvitationListResponse {
    InvitationListResponse {
        invitations: invitations.into_iter().map(map_invitation).collect(),
    }
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<InvitationNew>,
) -> Result<(StatusCode, Json<InvitationView>), ServerError> {
    let invitation = state
        .engine
        .create_invitation(
            payload.household_id,
            &payload.email,
            role_from_api(payload.role),
            user.id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(map_invitation(invitation))))
}

pub async fn list_for_household(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(household_id): Path<Uuid>,
) -> Result<Json<InvitationListResponse>, ServerError> {
    let invitations = state
        .engine
        .list_household_invitations(household_id, user.id)
        .await?;
    Ok(Json(list_response(invitations)))
}

pub async fn list_mine(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<InvitationListResponse>, ServerError> {
    let invitations = state.engine.list_my_invitations(user.id).await?;
    Ok(Json(list_response(invitations)))
}

pub async fn accept(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(invitation_id): Path<Uuid>,
) -> Result<Json<InvitationView>, ServerError> {
    let invitation = state
        .engine
        .accept_invitation(invitation_id, user.id)
        .await?;
    Ok(Json(map_invitation(invitation)))
}

pub async fn decline(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(invitation_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .decline_invitation(invitation_id, user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn revoke(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(invitation_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .revoke_invitation(invitation_id, user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
