// Contact Relay API Server Module
//
// Purpose: accept contact form submissions, validate them and forward them
// to the site owner's mailbox through a pluggable mail transport.

#[cfg(feature = "api")]
use axum::{
    extract::{Form, FromRequest, Request, State},
    http::{header, HeaderName, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};

#[cfg(feature = "api")]
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

#[cfg(feature = "api")]
use moka::future::Cache;

#[cfg(feature = "api")]
use std::sync::Arc;

#[cfg(feature = "api")]
use crate::config::RelayConfig;

#[cfg(feature = "api")]
use crate::contact::{compose, mailer_from_config, validate, ContactRequest, Mailer};

#[cfg(feature = "api")]
pub const SEND_SUCCESS_MESSAGE: &str = "Message sent successfully! I'll get back to you soon.";

#[cfg(feature = "api")]
pub const SEND_FAILURE_MESSAGE: &str = "Failed to send the message. Please try again.";

// ============================================================================
// Application State
// ============================================================================

#[cfg(feature = "api")]
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub mailer: Arc<dyn Mailer>,
    /// Recently delivered submissions, keyed by normalized email + message
    pub recent: Cache<String, ()>,
}

#[cfg(feature = "api")]
impl AppState {
    pub fn new(config: RelayConfig, mailer: Arc<dyn Mailer>) -> Self {
        let recent = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(config.dedup_ttl)
            .build();

        Self {
            config: Arc::new(config),
            mailer,
            recent,
        }
    }

    /// State with the transport chosen by the configuration
    pub fn from_config(config: RelayConfig) -> anyhow::Result<Self> {
        let mailer = mailer_from_config(&config)?;
        tracing::info!("Using '{}' mail transport", mailer.name());
        Ok(Self::new(config, mailer))
    }
}

// ============================================================================
// Router
// ============================================================================

#[cfg(feature = "api")]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        .route("/api/health", get(health_check))
        // Contact form; any other method gets a JSON 405
        .route(
            "/api/contact",
            post(send_contact)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .fallback(not_found)
        // Middleware (applied in reverse order)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http()) // Request logging
        .with_state(state)
}

/// Any origin, without credentials
#[cfg(feature = "api")]
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::OPTIONS,
            Method::PATCH,
            Method::DELETE,
            Method::POST,
            Method::PUT,
        ])
        .allow_headers([
            HeaderName::from_static("x-csrf-token"),
            HeaderName::from_static("x-requested-with"),
            header::ACCEPT,
            HeaderName::from_static("accept-version"),
            header::CONTENT_LENGTH,
            HeaderName::from_static("content-md5"),
            header::CONTENT_TYPE,
            header::DATE,
            HeaderName::from_static("x-api-version"),
        ])
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

#[cfg(feature = "api")]
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

#[cfg(feature = "api")]
async fn preflight() -> StatusCode {
    StatusCode::OK
}

#[cfg(feature = "api")]
async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

#[cfg(feature = "api")]
async fn not_found() -> AppError {
    AppError::NotFound("Endpoint not found".to_string())
}

#[cfg(feature = "api")]
async fn send_contact(
    State(state): State<AppState>,
    body: Request,
) -> Result<Json<serde_json::Value>, AppError> {
    let request = read_contact_body(body).await?;
    let message = validate(&request).map_err(AppError::Validation)?;

    let key = message.dedup_key();
    if state.recent.get(&key).await.is_some() {
        tracing::info!("Duplicate contact message from {} within TTL, not resending", message.email);
        return Ok(success_body());
    }

    let envelope = compose(&message, &state.config)
        .map_err(|e| AppError::Delivery(e.to_string()))?;

    state
        .mailer
        .send(&envelope)
        .await
        .map_err(|e| AppError::Delivery(e.to_string()))?;

    state.recent.insert(key, ()).await;
    tracing::info!("Contact message sent from {}", message.email);

    Ok(success_body())
}

/// JSON body, or a urlencoded body from a plain HTML form post
#[cfg(feature = "api")]
async fn read_contact_body(body: Request) -> Result<ContactRequest, AppError> {
    let is_form = body
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    let parsed = if is_form {
        Form::<ContactRequest>::from_request(body, &())
            .await
            .map(|Form(request)| request)
            .map_err(|rejection| rejection.body_text())
    } else {
        Json::<ContactRequest>::from_request(body, &())
            .await
            .map(|Json(request)| request)
            .map_err(|rejection| rejection.body_text())
    };

    parsed.map_err(|detail| {
        tracing::debug!("Rejected contact body: {}", detail);
        AppError::Validation(vec!["Invalid request body".to_string()])
    })
}

#[cfg(feature = "api")]
fn success_body() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "message": SEND_SUCCESS_MESSAGE
    }))
}

// ============================================================================
// Error Handling
// ============================================================================

#[cfg(feature = "api")]
#[derive(Debug)]
pub enum AppError {
    Validation(Vec<String>),
    MethodNotAllowed,
    NotFound(String),
    Delivery(String),
}

#[cfg(feature = "api")]
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "success": false, "errors": errors }),
            ),
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                serde_json::json!({ "success": false, "message": "Method not allowed" }),
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "success": false, "message": msg }),
            ),
            AppError::Delivery(detail) => {
                tracing::error!("Failed to send contact email: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "success": false, "message": SEND_FAILURE_MESSAGE }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
