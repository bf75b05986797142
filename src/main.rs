use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Json, Path, Query, State,
    },
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    path::PathBuf,
    sync::Arc,
};
use subtle::ConstantTimeEq;
use tokio::signal;
use tokio::sync::broadcast;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
};

use theme_editor_server::commands::{invoke_command, CommandContext};
use theme_editor_server::models::Settings;
use theme_editor_server::services::{
    init_logger, prune_logs, CssDeployer, EventSink, SettingsManager, ThemeStore,
};

// ============================================================================
// Constants
// ============================================================================

const DATA_DIR_NAME: &str = "theme-editor";
const DEFAULT_CSS_RELATIVE_PATH: &str = "public/css/theme.css";

// ============================================================================
// Event System
// ============================================================================

#[derive(Clone, Serialize)]
struct ServerEvent {
    event: String,
    payload: Value,
}

#[derive(Clone)]
struct EventBus {
    sender: broadcast::Sender<ServerEvent>,
}

impl EventBus {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: &str, payload: Value) {
        let _ = self.sender.send(ServerEvent {
            event: event.to_string(),
            payload,
        });
    }
}

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
struct AppState {
    theme_store: Arc<ThemeStore>,
    css_deployer: Arc<CssDeployer>,
    settings_manager: Arc<SettingsManager>,
    event_bus: EventBus,
    auth_token: Option<String>,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

#[derive(Serialize)]
struct InvokeResponse {
    ok: bool,
    data: Option<Value>,
    error: Option<String>,
}

impl InvokeResponse {
    fn error(status: StatusCode, message: impl Into<String>) -> Response {
        let response = InvokeResponse {
            ok: false,
            data: None,
            error: Some(message.into()),
        };
        (status, Json(response)).into_response()
    }
}

// ============================================================================
// Security Utilities
// ============================================================================

/// Constant-time token comparison to prevent timing attacks
fn verify_token(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// Extract bearer token from Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ============================================================================
// CORS Configuration
// ============================================================================

fn build_cors_layer(cors_origins: &str) -> CorsLayer {
    let allowed_origins: Vec<String> = cors_origins
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            let origin_str = match origin.to_str() {
                Ok(s) => s,
                Err(_) => return false,
            };

            allowed_origins.iter().any(|allowed| {
                if allowed.ends_with(":*") {
                    // Wildcard port matching
                    let prefix = allowed.trim_end_matches(":*");
                    origin_str.starts_with(prefix) && origin_str[prefix.len()..].starts_with(':')
                } else {
                    origin_str == allowed
                }
            })
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware - bearer token when one is configured
async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.auth_token.as_deref() else {
        return next.run(request).await;
    };

    if bearer_token(&headers).is_some_and(|token| verify_token(expected, token)) {
        return next.run(request).await;
    }

    InvokeResponse::error(StatusCode::UNAUTHORIZED, "Authentication required")
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    match state.rate_limiter.check() {
        Ok(_) => next.run(request).await,
        Err(_) => InvokeResponse::error(
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded. Please try again later.",
        ),
    }
}

// ============================================================================
// Request Handlers
// ============================================================================

async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

/// Readiness check - verifies the theme store and settings are readable
async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let checks = [
        ("themes", state.theme_store.list_summaries().is_ok()),
        ("settings", state.settings_manager.load().is_ok()),
    ];

    let failed: Vec<&str> = checks
        .iter()
        .filter(|(_, ok)| !ok)
        .map(|(name, _)| *name)
        .collect();

    if failed.is_empty() {
        Json(json!({ "ready": true })).into_response()
    } else {
        log::warn!("Readiness check failed: {failed:?}");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "ready": false, "failed": failed })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
struct AuthQuery {
    token: Option<String>,
}

/// GET /ws - theme and log events. Browsers cannot set headers on a
/// WebSocket upgrade, so the token may also come as `?token=`.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AuthQuery>,
) -> impl IntoResponse {
    let authenticated = match state.auth_token.as_deref() {
        None => true,
        Some(expected) => bearer_token(&headers)
            .or(query.token.as_deref())
            .is_some_and(|token| verify_token(expected, token)),
    };

    if !authenticated {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state.event_bus.subscribe()))
}

async fn handle_socket(mut socket: WebSocket, mut receiver: broadcast::Receiver<ServerEvent>) {
    loop {
        match receiver.recv().await {
            Ok(event) => {
                let Ok(payload) = serde_json::to_string(&event) else {
                    continue;
                };
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::debug!("WebSocket client lagged, skipped {skipped} events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// POST /api/invoke/:command
async fn invoke(
    Path(command): Path<String>,
    State(state): State<AppState>,
    payload: Option<Json<Value>>,
) -> Response {
    let payload = payload.map(|Json(value)| value).unwrap_or_else(|| json!({}));
    let ctx = CommandContext {
        store: &state.theme_store,
        deployer: &state.css_deployer,
        events: &state.event_bus,
    };

    match invoke_command(&ctx, &command, &payload) {
        Ok(data) => {
            let response = InvokeResponse {
                ok: true,
                data: Some(data),
                error: None,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(error) => {
            log::warn!("Command {command} failed: {error}");
            let status = if error.is_not_found() {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::BAD_REQUEST
            };
            InvokeResponse::error(status, error.client_message())
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn parse_host(host: &str) -> IpAddr {
    host.parse().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn default_data_dir() -> PathBuf {
    dirs_next::data_dir()
        .map(|dir| dir.join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// Env var first, then settings.json, then `<data dir>/public/css/theme.css`
fn resolve_css_path(settings: &Settings, app_data_dir: &std::path::Path) -> PathBuf {
    env::var("THEME_EDITOR_CSS_PATH")
        .ok()
        .and_then(|value| non_empty(&value))
        .or_else(|| non_empty(&settings.css_path))
        .map(PathBuf::from)
        .unwrap_or_else(|| app_data_dir.join(DEFAULT_CSS_RELATIVE_PATH))
}

/// Env vars take precedence over settings. Without remote access enabled the
/// server stays on localhost unless THEME_EDITOR_HOST is set explicitly.
fn resolve_bind_address(settings: &Settings) -> (String, u16) {
    let env_host = env::var("THEME_EDITOR_HOST").ok().and_then(|value| non_empty(&value));
    let env_port: Option<u16> = env::var("THEME_EDITOR_PORT")
        .ok()
        .and_then(|value| value.parse().ok());

    let host = match env_host {
        Some(host) => host,
        None if settings.remote_enabled => settings.host.clone(),
        None => "127.0.0.1".to_string(),
    };

    (host, env_port.unwrap_or(settings.port))
}

/// Waits for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Shutdown signal received, server shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app_data_dir = env::var("THEME_EDITOR_DATA_DIR")
        .ok()
        .and_then(|value| non_empty(&value))
        .map(PathBuf::from)
        .unwrap_or_else(default_data_dir);
    let log_dir = env::var("THEME_EDITOR_LOG_DIR")
        .ok()
        .and_then(|value| non_empty(&value))
        .map(PathBuf::from)
        .unwrap_or_else(|| app_data_dir.join("logs"));
    let log_level = env::var("THEME_EDITOR_LOG_LEVEL")
        .ok()
        .and_then(|value| value.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);

    std::fs::create_dir_all(&app_data_dir)?;
    std::fs::create_dir_all(&log_dir)?;

    let event_bus = EventBus::new();
    init_logger(&log_dir, Arc::new(event_bus.clone()), log_level)?;
    log::info!("Data directory: {:?}", app_data_dir);

    let settings_manager = Arc::new(SettingsManager::new(app_data_dir.clone()));
    let settings = match settings_manager.load() {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("Using default settings: {e}");
            Settings::default()
        }
    };

    match prune_logs(&log_dir, settings.log_retention_days) {
        Ok(0) => {}
        Ok(removed) => log::info!("Pruned {removed} old log file(s)"),
        Err(e) => log::warn!("Log pruning failed: {e}"),
    }

    let auth_token = env::var("THEME_EDITOR_API_TOKEN")
        .ok()
        .and_then(|value| non_empty(&value))
        .or_else(|| non_empty(&settings.api_token));

    let theme_store = Arc::new(ThemeStore::open(&app_data_dir)?);
    let css_deployer = Arc::new(CssDeployer::new(resolve_css_path(&settings, &app_data_dir)));

    let rate_limit = env::var("THEME_EDITOR_RATE_LIMIT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(settings.rate_limit_per_minute);
    let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(
        NonZeroU32::new(rate_limit.max(1)).unwrap_or(NonZeroU32::MIN),
    )));

    let cors_origins = env::var("THEME_EDITOR_CORS_ORIGINS")
        .ok()
        .and_then(|value| non_empty(&value))
        .unwrap_or_else(|| settings.cors_origins.clone());

    let (host, port) = resolve_bind_address(&settings);

    let state = AppState {
        theme_store,
        css_deployer,
        settings_manager,
        event_bus,
        auth_token,
        rate_limiter,
    };

    let csp_value = HeaderValue::from_static("default-src 'self'; connect-src 'self' ws: wss:");

    // Protected routes (require authentication)
    let protected_routes = Router::new()
        .route("/api/invoke/:command", post(invoke))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Public routes; /ws checks its own token so it can accept ?token=
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/ws", get(ws_handler));

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(build_cors_layer(&cors_origins))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    let address = SocketAddr::new(parse_host(&host), port);
    log::info!("Theme editor backend listening on http://{address}");
    if state.auth_token.is_some() {
        log::info!("  Authentication: enabled");
    } else {
        log::info!("  Authentication: disabled (no token configured)");
    }

    let listener = tokio::net::TcpListener::bind(address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
