//! Receipts: expenses seen across every household of the caller.

use api_types::{
    receipt::{ReceiptList, ReceiptNew},
    transaction::{TransactionListResponse, TransactionView},
};
use axum::{Extension, extract::State, http::StatusCode};
use chrono::Utc;
use engine::{NewTransaction, TransactionKind, User};
use uuid::Uuid;

use crate::{
    ServerError,
    extract::{HouseholdScope, Json, Path, Query},
    server::ServerState,
    transactions::{DEFAULT_PAGE_SIZE, map_transaction},
};

/// Lists expenses, optionally scoped by the `x-household-ids` header.
pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    HouseholdScope(scope): HouseholdScope,
    Query(query): Query<ReceiptList>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let receipts = state
        .engine
        .list_receipts(
            user.id,
            scope.as_deref(),
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    Ok(Json(TransactionListResponse {
        transactions: receipts.into_iter().map(map_transaction).collect(),
        next_cursor: None,
    }))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<ReceiptNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let input = NewTransaction {
        kind: TransactionKind::Expense,
        amount_minor: payload.amount_minor,
        occurred_at: payload.occurred_at.with_timezone(&Utc),
        category_id: payload.category_id,
        description: payload.description,
        merchant: payload.merchant,
    };
    let tx = state
        .engine
        .create_transaction(payload.household_id, user.id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(map_transaction(tx))))
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(receipt_id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.receipt(receipt_id, user.id).await?;
    Ok(Json(map_transaction(tx)))
}
