//! Transactions API endpoints

use api_types::transaction::{
    TransactionKind as ApiKind, TransactionList, TransactionListResponse, TransactionNew,
    TransactionUpdate, TransactionView,
};
use axum::{Extension, extract::State, http::StatusCode};
use chrono::Utc;
use engine::{NewTransaction, TransactionChanges, TransactionKind, TransactionListFilter, User};
use uuid::Uuid;

use crate::{
    ServerError,
    extract::{Json, Path, Query},
    server::ServerState,
};

pub(crate) const DEFAULT_PAGE_SIZE: u64 = 50;

pub(crate) fn map_kind(kind: TransactionKind) -> ApiKind {
    match kind {
        TransactionKind::Income => ApiKind::Income,
        TransactionKind::Expense => ApiKind::Expense,
    }
}

pub(crate) fn kind_from_api(kind: ApiKind) -> TransactionKind {
    match kind {
        ApiKind::Income => TransactionKind::Income,
        ApiKind::Expense => TransactionKind::Expense,
    }
}

pub(crate) fn map_transaction(tx: engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        household_id: tx.household_id,
        kind: map_kind(tx.kind),
        amount_minor: tx.amount_minor,
        occurred_at: tx.occurred_at,
        category_id: tx.category_id,
        description: tx.description,
        merchant: tx.merchant,
        created_by: tx.created_by,
    }
}

pub(crate) fn new_transaction(payload: TransactionNew) -> NewTransaction {
    NewTransaction {
        kind: kind_from_api(payload.kind),
        amount_minor: payload.amount_minor,
        occurred_at: payload.occurred_at.with_timezone(&Utc),
        category_id: payload.category_id,
        description: payload.description,
        merchant: payload.merchant,
    }
}

pub(crate) async fn list_for(
    state: &ServerState,
    household_id: Uuid,
    user_id: Uuid,
    query: TransactionList,
) -> Result<TransactionListResponse, ServerError> {
    let filter = TransactionListFilter {
        from: query.from.map(|dt| dt.with_timezone(&Utc)),
        to: query.to.map(|dt| dt.with_timezone(&Utc)),
        kind: query.kind.map(kind_from_api),
        category_id: query.category_id,
    };

    let (txs, next_cursor) = state
        .engine
        .list_transactions(
            household_id,
            user_id,
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            query.cursor.as_deref(),
            &filter,
        )
        .await?;

    Ok(TransactionListResponse {
        transactions: txs.into_iter().map(map_transaction).collect(),
        next_cursor,
    })
}

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(household_id): Path<Uuid>,
    Query(query): Query<TransactionList>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    Ok(Json(list_for(&state, household_id, user.id, query).await?))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(household_id): Path<Uuid>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let tx = state
        .engine
        .create_transaction(household_id, user.id, new_transaction(payload))
        .await?;
    Ok((StatusCode::CREATED, Json(map_transaction(tx))))
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((household_id, tx_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state
        .engine
        .transaction(household_id, tx_id, user.id)
        .await?;
    Ok(Json(map_transaction(tx)))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((household_id, tx_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionView>, ServerError> {
    if payload.clear_category && payload.category_id.is_some() {
        return Err(ServerError::Generic(
            "provide only one of category_id or clear_category".to_string(),
        ));
    }
    let category_id = if payload.clear_category {
        Some(None)
    } else {
        payload.category_id.map(Some)
    };
    let changes = TransactionChanges {
        kind: payload.kind.map(kind_from_api),
        amount_minor: payload.amount_minor,
        occurred_at: payload.occurred_at.map(|dt| dt.with_timezone(&Utc)),
        category_id,
        description: payload.description,
        merchant: payload.merchant,
    };
    if changes.is_empty() {
        return Err(ServerError::Generic(
            "provide at least one field to update".to_string(),
        ));
    }

    let tx = state
        .engine
        .update_transaction(household_id, tx_id, user.id, changes)
        .await?;
    Ok(Json(map_transaction(tx)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((household_id, tx_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_transaction(household_id, tx_id, user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
