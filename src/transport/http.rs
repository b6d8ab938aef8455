//! axum binding of the daily grid trigger.
//!
//! Every path and method lands on one handler. `POST` must carry the
//! administrative credential as a bearer token when one is configured.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use chrono::Utc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::generator::GridGenerator;
use crate::trigger::{self, TriggerMethod, TriggerResponse};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<GridGenerator>,
    /// Bearer token required on `POST`; `None` disables the check.
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(generator: Arc<GridGenerator>, admin_token: Option<String>) -> Self {
        Self {
            generator,
            admin_token: admin_token.map(Arc::from),
        }
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = self.admin_token.as_deref() else {
            return true;
        };
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token.trim() == expected)
    }
}

/// Create the trigger router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .fallback(handle_trigger)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn handle_trigger(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    let method = TriggerMethod::parse(method.as_str());
    if method == TriggerMethod::Post && !state.authorized(&headers) {
        tracing::warn!("trigger rejected: missing or invalid credential");
        return into_http(&TriggerResponse::error(401, "Unauthorized", None));
    }

    let today = Utc::now().date_naive();
    let generator = Arc::clone(&state.generator);
    let outcome =
        tokio::task::spawn_blocking(move || trigger::handle(&generator, &method, today)).await;

    match outcome {
        Ok(response) => into_http(&response),
        Err(e) => {
            tracing::error!(error = %e, "trigger task failed");
            into_http(&TriggerResponse::error(500, "internal error", None))
        }
    }
}

fn into_http(response: &TriggerResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let (content_type, body) = response.encode();
    (status, [(CONTENT_TYPE, content_type)], body).into_response()
}

/// Serve the trigger on `addr` until Ctrl+C.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn run_server(
    addr: SocketAddr,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let router = create_router(state);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("starcritters trigger listening on {}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    tracing::info!("trigger server shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratorPolicy;
    use crate::placement::FixtureProvider;
    use crate::storage::{InMemoryGridStore, InMemoryRelicStore, InMemoryReportStore};

    fn state(token: Option<&str>) -> AppState {
        let generator = GridGenerator::new(
            Arc::new(InMemoryReportStore::new()),
            Arc::new(InMemoryRelicStore::new()),
            Arc::new(InMemoryGridStore::new()),
            Arc::new(FixtureProvider::new()),
            GeneratorPolicy::default(),
        )
        .unwrap();
        AppState::new(Arc::new(generator), token.map(str::to_string))
    }

    fn bearer(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn bearer_check() {
        let st = state(Some("secret"));
        assert!(st.authorized(&bearer("Bearer secret")));
        assert!(!st.authorized(&bearer("Bearer other")));
        assert!(!st.authorized(&bearer("secret")));
        assert!(!st.authorized(&HeaderMap::new()));
    }

    #[test]
    fn no_token_configured_allows_all() {
        assert!(state(None).authorized(&HeaderMap::new()));
    }
}
