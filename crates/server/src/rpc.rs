//! tRPC-style procedure router.
//!
//! Queries are served on `GET /trpc/{procedure}?input=<json>` and mutations
//! on `POST /trpc/{procedure}` with a JSON body. Every response uses the
//! tRPC envelope: `{"result":{"data":…}}` or `{"error":{"message","code"}}`.

use api_types::{
    household::{HouseholdListResponse, HouseholdNew},
    rpc::{
        BudgetListInput, CategoryCreateInput, HouseholdRef, SummaryInput, TransactionCreateInput,
        TransactionListInput,
    },
};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use engine::{EngineError, Role, User};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    ServerError, budgets, categories,
    households::{currency_from_api, map_household},
    reports,
    server::{ServerState, resolve_user},
    transactions,
};

const QUERIES: &[&str] = &[
    "households.list",
    "households.get",
    "categories.list",
    "transactions.list",
    "budgets.list",
    "reports.summary",
];

const MUTATIONS: &[&str] = &[
    "households.create",
    "transactions.create",
    "categories.create",
];

#[derive(Debug, Deserialize)]
pub struct RpcQuery {
    input: Option<String>,
}

#[derive(Serialize)]
struct RpcData<T> {
    data: T,
}

#[derive(Serialize)]
struct RpcSuccess<T> {
    result: RpcData<T>,
}

#[derive(Serialize)]
struct RpcErrorBody {
    message: String,
    code: &'static str,
}

#[derive(Serialize)]
struct RpcFailure {
    error: RpcErrorBody,
}

#[derive(Debug)]
pub(crate) struct RpcError {
    status: StatusCode,
    message: String,
}

impl RpcError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "internal server error".to_string(),
        }
    }
}

/// tRPC error code for a status; statuses without a code of their own are
/// reported as `BAD_REQUEST`.
fn code_for(status: StatusCode) -> (StatusCode, &'static str) {
    match status {
        StatusCode::UNAUTHORIZED => (status, "UNAUTHORIZED"),
        StatusCode::FORBIDDEN => (status, "FORBIDDEN"),
        StatusCode::NOT_FOUND => (status, "NOT_FOUND"),
        StatusCode::CONFLICT => (status, "CONFLICT"),
        StatusCode::INTERNAL_SERVER_ERROR => (status, "INTERNAL_SERVER_ERROR"),
        _ => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
    }
}

impl From<ServerError> for RpcError {
    fn from(value: ServerError) -> Self {
        let (status, message) = value.into_parts();
        Self { status, message }
    }
}

impl From<EngineError> for RpcError {
    fn from(value: EngineError) -> Self {
        ServerError::from(value).into()
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let (status, code) = code_for(self.status);
        let body = RpcFailure {
            error: RpcErrorBody {
                message: self.message,
                code,
            },
        };
        (status, Json(body)).into_response()
    }
}

fn parse_input<T: DeserializeOwned>(raw: Option<&[u8]>) -> Result<T, RpcError> {
    let raw = raw.ok_or_else(|| RpcError::bad_request("missing input"))?;
    serde_json::from_slice(raw).map_err(|err| RpcError::bad_request(format!("invalid input: {err}")))
}

fn to_data<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|err| {
        tracing::error!("failed to serialize rpc output: {err}");
        RpcError::internal()
    })
}

fn reply(outcome: Result<Value, RpcError>) -> Response {
    match outcome {
        Ok(data) => Json(RpcSuccess {
            result: RpcData { data },
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Like the REST auth layer, but failures use the tRPC envelope.
pub async fn auth(
    State(state): State<ServerState>,
    auth_header: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_user(&state, auth_header).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(err) => RpcError::from(err).into_response(),
    }
}

async fn run_query(
    state: &ServerState,
    user: &User,
    procedure: &str,
    input: Option<&[u8]>,
) -> Result<Value, RpcError> {
    match procedure {
        "households.list" => {
            let households = state
                .engine
                .list_households(user.id)
                .await?
                .into_iter()
                .map(|(household, role)| map_household(household, role))
                .collect();
            to_data(HouseholdListResponse { households })
        }
        "households.get" => {
            let input: HouseholdRef = parse_input(input)?;
            let (household, role) = state.engine.household(input.household_id, user.id).await?;
            to_data(map_household(household, role))
        }
        "categories.list" => {
            let input: HouseholdRef = parse_input(input)?;
            to_data(categories::list_for(state, input.household_id, user.id).await?)
        }
        "transactions.list" => {
            let input: TransactionListInput = parse_input(input)?;
            to_data(
                transactions::list_for(state, input.household_id, user.id, input.query).await?,
            )
        }
        "budgets.list" => {
            let input: BudgetListInput = match input {
                Some(_) => parse_input(input)?,
                None => BudgetListInput::default(),
            };
            to_data(budgets::list_for(state, user.id, input.household_ids.as_deref()).await?)
        }
        "reports.summary" => {
            let input: SummaryInput = parse_input(input)?;
            to_data(reports::summary_for(state, input.household_id, user.id, input.query).await?)
        }
        other if MUTATIONS.contains(&other) => Err(RpcError::bad_request(format!(
            "{other} is a mutation, use POST"
        ))),
        other => Err(RpcError::not_found(format!("unknown procedure: {other}"))),
    }
}

async fn run_mutation(
    state: &ServerState,
    user: &User,
    procedure: &str,
    input: Option<&[u8]>,
) -> Result<Value, RpcError> {
    match procedure {
        "households.create" => {
            let input: HouseholdNew = parse_input(input)?;
            let household = state
                .engine
                .create_household(
                    user.id,
                    &input.name,
                    input.currency.map(currency_from_api),
                    input.settings.as_ref(),
                )
                .await?;
            to_data(map_household(household, Role::Owner))
        }
        "transactions.create" => {
            let input: TransactionCreateInput = parse_input(input)?;
            let tx = state
                .engine
                .create_transaction(
                    input.household_id,
                    user.id,
                    transactions::new_transaction(input.transaction),
                )
                .await?;
            to_data(transactions::map_transaction(tx))
        }
        "categories.create" => {
            let input: CategoryCreateInput = parse_input(input)?;
            let category = state
                .engine
                .create_category(
                    input.household_id,
                    categories::new_category(input.category),
                    user.id,
                )
                .await?;
            to_data(categories::map_category(category))
        }
        other if QUERIES.contains(&other) => Err(RpcError::bad_request(format!(
            "{other} is a query, use GET"
        ))),
        other => Err(RpcError::not_found(format!("unknown procedure: {other}"))),
    }
}

pub async fn query(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(procedure): Path<String>,
    Query(query): Query<RpcQuery>,
) -> Response {
    let input = query.input.as_deref().map(str::as_bytes);
    reply(run_query(&state, &user, &procedure, input).await)
}

pub async fn mutation(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(procedure): Path<String>,
    body: Bytes,
) -> Response {
    let input = (!body.is_empty()).then_some(body.as_ref());
    reply(run_mutation(&state, &user, &procedure, input).await)
}
