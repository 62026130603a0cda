use std::{net::SocketAddr, path::Path, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    serve, Form, Json, Router,
};
use minijinja::{path_loader, Environment};
use minijinja_autoreload::AutoReloader;
use serde::{Deserialize, Serialize};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::constants;
use crate::conversation::{ConversationState, Transcript};
use crate::error::GatewayError;
use crate::gateway::{validate_prompt, Gateway};
use crate::replicate::ImageOutput;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    templates: Arc<AutoReloader>,
    gateway: Arc<Gateway>,
}

impl AppState {
    pub fn new(templates: AutoReloader, gateway: Gateway) -> Self {
        Self {
            templates: Arc::new(templates),
            gateway: Arc::new(gateway),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    #[serde(rename = "imageUrl")]
    pub image_url: ImageOutput,
}

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub transcript: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    configured: bool,
}

// Minijinja Environment setup
pub fn create_minijinja_env(templates_dir: &Path) -> AutoReloader {
    let templates_dir = templates_dir.to_path_buf();
    AutoReloader::new(move |notifier| {
        let mut env = Environment::new();
        env.set_loader(path_loader(&templates_dir));
        // Watch the templates directory for changes
        notifier.watch_path(&templates_dir, true);
        Ok(env)
    })
}

fn render_page(
    state: &AppState,
    conversation: &ConversationState,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    state
        .templates
        .acquire_env()
        .and_then(|env| {
            env.get_template("index.html").and_then(|tmpl| {
                let context = minijinja::context! {
                    title => constants::PAGE_TITLE,
                    entries => conversation.transcript().entries(),
                    transcript_json => conversation.transcript().to_json(),
                    draft => conversation.draft(),
                    busy => conversation.is_busy(),
                    can_submit => conversation.can_submit(),
                    error => conversation.error(),
                    placeholder_image => constants::PLACEHOLDER_IMAGE,
                };
                tmpl.render(context)
            })
        })
        .map(Html)
        .map_err(|e| {
            error!("Failed to get or render template: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Internal Server Error: {}", e)),
            )
        })
}

async fn index_handler(
    State(state): State<AppState>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    render_page(&state, &ConversationState::new())
}

// The page carries its own transcript, so nothing is kept between requests.
// The form is answered with the in-process gateway; `/api/generate` is the
// JSON boundary used by the terminal chat and external callers.
async fn chat_handler(
    State(state): State<AppState>,
    Form(form): Form<ChatForm>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let transcript = Transcript::from_json(&form.transcript).unwrap_or_else(|e| {
        warn!("Discarding unreadable transcript from form: {}", e);
        Transcript::new()
    });
    let mut conversation = ConversationState::with_transcript(transcript);
    conversation.set_draft(form.prompt);
    conversation.submit(state.gateway.as_ref()).await;
    render_page(&state, &conversation)
}

async fn generate_handler(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, GatewayError> {
    let result = generate(&state.gateway, body).await;
    if let Err(e) = &result {
        error!("Image generation error: {}", e);
    }
    result
}

async fn generate(
    gateway: &Gateway,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, GatewayError> {
    gateway.api_token()?;
    let Json(request) = body.map_err(|rejection| {
        GatewayError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    })?;
    let prompt = validate_prompt(request.prompt.as_deref())?;
    let image_url = gateway.generate(prompt).await?;
    Ok(Json(GenerateResponse { image_url }))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        configured: state.gateway.config().is_configured(),
    })
}

/// Builds the application router around an already constructed state.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    // Serve static files from the static directory
    let static_files_service = ServeDir::new(static_dir).not_found_service(
        tower::service_fn(|_req: axum::extract::Request| async {
            Ok::<_, std::convert::Infallible>(
                (StatusCode::NOT_FOUND, "Not Found").into_response(),
            )
        }),
    );

    Router::new()
        .route("/", get(index_handler).post(chat_handler))
        .route("/api/generate", post(generate_handler))
        .route("/health", get(health_handler))
        .nest_service("/static", static_files_service)
        .with_state(state)
        .layer(TraceLayer::new_for_http()) // Add request logging
}

pub async fn start_web_server(config: ServerConfig) -> Result<()> {
    if !config.gateway.is_configured() {
        warn!(
            "{} is not set; generation requests will be rejected",
            constants::API_TOKEN_ENV
        );
    }

    let templates = create_minijinja_env(&config.templates_dir);
    let state = AppState::new(templates, Gateway::new(config.gateway.clone()));
    let app = router(state, &config.static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Web server listening on http://{}", addr);

    // Bind using tokio::net::TcpListener
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server failed")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {:?}", e);
        return;
    }
    info!("Ctrl-C received, initiating shutdown...");
}
