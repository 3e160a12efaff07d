use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use chess_coach_core::{BookLibrary, ChessEngine, CoachClient, LessonManager, PatternSummary};

mod config;
mod error;
mod routes;

use config::Config;

pub struct AppState {
    pub config: Config,
    pub engine: ChessEngine,
    pub books: BookLibrary,
    /// None when no API key is configured
    pub coach: Option<CoachClient>,
    pub lessons: Mutex<LessonManager>,
    /// Most recent pattern batch, fed into the coach's prompt
    pub last_patterns: Mutex<Option<PatternSummary>>,
}

impl AppState {
    pub fn new(config: Config, books: BookLibrary, coach: Option<CoachClient>) -> Self {
        Self {
            engine: ChessEngine::new(config.stockfish_path.clone()),
            config,
            books,
            coach,
            lessons: Mutex::new(LessonManager::new()),
            last_patterns: Mutex::new(None),
        }
    }
}

/// Locks a state mutex; a panicked holder does not take the server down
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn build_coach(config: &Config) -> Option<CoachClient> {
    let key = config.anthropic_api_key.as_ref()?;
    match CoachClient::new(key.clone()) {
        Ok(client) => {
            let client = client.with_model(config.anthropic_model.clone());
            tracing::info!(model = client.model(), "Coach enabled");
            Some(client)
        }
        Err(e) => {
            tracing::warn!("Failed to build coach client: {}", e);
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env();

    let books = BookLibrary::load(&config.books_dir).unwrap_or_else(|e| {
        tracing::warn!("Failed to load books from {}: {}", config.books_dir.display(), e);
        BookLibrary::default()
    });
    tracing::info!("Loaded {} book(s)", books.len());

    let coach = build_coach(&config);
    if coach.is_none() {
        tracing::info!("ANTHROPIC_API_KEY not set - coach endpoints disabled");
    }

    let state = Arc::new(AppState::new(config.clone(), books, coach));

    // The API stays up without an engine; analysis routes answer 503
    if let Err(e) = state.engine.start().await {
        tracing::warn!(path = state.engine.path(), "Chess engine unavailable: {}", e);
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router(state.clone())
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("Server running at http://{}", config.bind_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.engine.stop().await?;
    Ok(())
}
