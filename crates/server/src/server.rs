use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, Error as AxumError, Header, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use uuid::Uuid;

use std::{net::SocketAddr, sync::Arc};

use crate::{
    ServerError, budgets, categories, households, invitations, members, receipts, reports, rpc,
    transactions, users,
};
use engine::{Engine, User};

static HOUSEHOLD_IDS_HEADER: axum::http::HeaderName =
    axum::http::HeaderName::from_static("x-household-ids");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// `TypedHeader` scoping a request to some households.
///
/// The value is a comma-separated list of household UUIDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct XHouseholdIds(pub Vec<Uuid>);

impl Header for XHouseholdIds {
    fn name() -> &'static axum::http::HeaderName {
        &HOUSEHOLD_IDS_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let mut ids = Vec::new();
        for value in values {
            let Ok(value) = value.to_str() else {
                return Err(AxumError::invalid());
            };
            for part in value.split(',') {
                let Ok(id) = part.trim().parse::<Uuid>() else {
                    return Err(AxumError::invalid());
                };
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        if ids.is_empty() {
            return Err(AxumError::invalid());
        }
        Ok(XHouseholdIds(ids))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        let as_string = self
            .0
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        match axum::http::HeaderValue::from_str(&as_string) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-household-ids header"),
        }
    }
}

/// Resolves the bearer token to a user.
pub(crate) async fn resolve_user(
    state: &ServerState,
    auth_header: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
) -> Result<User, ServerError> {
    let Ok(auth_header) = auth_header else {
        return Err(ServerError::Unauthorized);
    };
    let token = auth_header.token();
    if token.is_empty() {
        return Err(ServerError::Unauthorized);
    }

    match state.engine.user_by_token(token).await? {
        Some(user) => Ok(user),
        None => {
            tracing::debug!("unknown bearer token");
            Err(ServerError::Unauthorized)
        }
    }
}

async fn auth(
    State(state): State<ServerState>,
    auth_header: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let user = resolve_user(&state, auth_header).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    let rest = Router::new()
        .route("/users/me", get(users::me).patch(users::update_me))
        .route("/users/me/households", get(users::my_households))
        .route("/users/me/invitations", get(invitations::list_mine))
        .route("/households", get(households::list).post(households::create))
        .route(
            "/households/{id}",
            get(households::get)
                .patch(households::update)
                .delete(households::delete),
        )
        .route("/households/{id}/members", get(members::list))
        .route(
            "/households/{id}/members/{user_id}",
            axum::routing::patch(members::update_role).delete(members::remove),
        )
        .route("/households/{id}/leave", post(members::leave))
        .route(
            "/households/{id}/invitations",
            get(invitations::list_for_household),
        )
        .route(
            "/households/{id}/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/households/{id}/categories/{category_id}",
            axum::routing::patch(categories::update).delete(categories::delete),
        )
        .route(
            "/households/{id}/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route(
            "/households/{id}/transactions/{tx_id}",
            get(transactions::get)
                .patch(transactions::update)
                .delete(transactions::delete),
        )
        .route("/households/{id}/reports/summary", get(reports::summary))
        .route("/budgets", get(budgets::list).post(budgets::create))
        .route(
            "/budgets/{id}",
            get(budgets::get)
                .patch(budgets::update)
                .delete(budgets::delete),
        )
        .route("/budgets/{id}/progress", get(budgets::progress))
        .route("/receipts", get(receipts::list).post(receipts::create))
        .route("/receipts/{id}", get(receipts::get))
        .route("/invitations", post(invitations::create))
        .route("/invitations/{id}", axum::routing::delete(invitations::revoke))
        .route("/invitations/{id}/accept", post(invitations::accept))
        .route("/invitations/{id}/decline", post(invitations::decline))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    let trpc = Router::new()
        .route("/trpc/{procedure}", get(rpc::query).post(rpc::mutation))
        .route_layer(middleware::from_fn_with_state(state.clone(), rpc::auth));

    rest.merge(trpc).with_state(state)
}

pub async fn run(engine: Engine, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
