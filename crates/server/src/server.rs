use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono_tz::Tz;

use std::sync::Arc;

use crate::{accounts, auth::AuthGate, transactions};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub auth: Arc<AuthGate>,
    pub default_tz: Tz,
}

async fn auth(
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(bearer)) = auth_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    let Some(user) = state.auth.authenticate(bearer.token()).await else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

// Ledger data is per-user; keep shared caches out of the picture.
async fn no_store(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/accounts", post(accounts::create).get(accounts::list))
        .route(
            "/accounts/{id}",
            get(accounts::get_one)
                .patch(accounts::update)
                .delete(accounts::remove),
        )
        .route(
            "/accounts/{id}/transactions",
            post(transactions::create).get(transactions::list),
        )
        .route(
            "/accounts/{id}/transactions/{tx_id}",
            get(transactions::get_one)
                .patch(transactions::update)
                .delete(transactions::remove),
        )
        .route("/accounts/{id}/recompute", post(transactions::recompute))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .layer(middleware::from_fn(no_store))
        .with_state(state)
}

/// Build the application router; the entry point for both `run` and tests.
pub fn app(engine: Engine, auth_gate: AuthGate, default_tz: Tz) -> Router {
    router(ServerState {
        engine: Arc::new(engine),
        auth: Arc::new(auth_gate),
        default_tz,
    })
}

pub async fn run(engine: Engine, auth_gate: AuthGate, default_tz: Tz, bind: &str) {
    let listener = match tokio::net::TcpListener::bind(bind).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, auth_gate, default_tz, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    auth_gate: AuthGate,
    default_tz: Tz,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(engine, auth_gate, default_tz)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    auth_gate: AuthGate,
    default_tz: Tz,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, auth_gate, default_tz, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
