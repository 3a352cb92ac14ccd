mod admin;
mod api;
mod auth;
mod config;
mod error;
mod listing;
mod media;
mod paths;
mod render;
mod storage;
mod stream;
mod trash;
mod upload;
mod worker;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::store::AuthStore;
use config::Config;
use media::classifier::{DocumentClassifier, ExternalClassifier};
use media::frame::{FfmpegExtractor, FrameExtractor};
use media::metadata::{ExifToolExtractor, MetadataExtractor};
use storage::{KeyedLocks, StorageRoot};
use worker::{MediaJob, WorkerDeps};

/// Shared application state passed to every handler via Axum's `State`
/// extractor. Must be `Clone` — Axum clones it once per request. Everything
/// inside is itself cheaply cloneable (`Arc`, pool handles, channel senders).
#[derive(Clone)]
pub struct AppState {
    pub storage: StorageRoot,
    pub config: Config,
    pub auth_store: Option<AuthStore>,
    pub locks: KeyedLocks,
    pub job_tx: tokio::sync::mpsc::Sender<MediaJob>,
    pub worker_deps: WorkerDeps,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    tokio::fs::create_dir_all(&config.sync_storage_path)
        .await
        .unwrap_or_else(|e| {
            panic!(
                "failed to create storage root '{}': {e}",
                config.sync_storage_path
            );
        });

    let storage = StorageRoot::new(&config.sync_storage_path);

    let auth_store = if let Some(db_path) = &config.sync_auth_db {
        let pepper = config
            .sync_session_secret
            .as_deref()
            .expect("SYNC_SESSION_SECRET is required when SYNC_AUTH_DB is set");
        let store = AuthStore::open(db_path, pepper)
            .await
            .expect("failed to open auth store");
        store
            .bootstrap_from_env(
                config.sync_admin_user.as_deref(),
                config.sync_admin_password.as_deref(),
            )
            .await
            .expect("failed to bootstrap admin user");
        Some(store)
    } else {
        None
    };

    let metadata_extractor: Arc<dyn MetadataExtractor> =
        Arc::new(ExifToolExtractor::new(config.sync_exiftool_path.clone()));
    let frame_extractor: Arc<dyn FrameExtractor> =
        Arc::new(FfmpegExtractor::new(config.sync_ffmpeg_path.clone()));
    let classifier: Option<Arc<dyn DocumentClassifier>> = config
        .sync_document_classifier_path
        .as_ref()
        .filter(|p| !p.is_empty())
        .map(|p| Arc::new(ExternalClassifier::new(p.clone())) as Arc<dyn DocumentClassifier>);

    let worker_deps = WorkerDeps {
        storage: storage.clone(),
        metadata_extractor,
        frame_extractor,
        classifier,
        document_to_trash: config.document_to_trash_enabled(),
    };

    let job_tx = worker::spawn_pool(
        worker_deps.clone(),
        config.sync_upload_queue_capacity,
        config.sync_worker_count,
    );

    let port = config.sync_server_port;

    let state = AppState {
        storage,
        config,
        auth_store,
        locks: KeyedLocks::new(),
        job_tx,
        worker_deps,
    };

    let app = Router::new()
        .route("/upload", post(api::upload::handle))
        .route("/folders", post(api::folders::handle))
        .route("/files", post(api::files::handle))
        .route("/img", post(api::img::handle))
        .route("/stream", get(api::stream::handle))
        .route("/move-to-trash", post(api::trash::move_to_trash))
        .route("/restore", post(api::trash::restore))
        .route("/empty-trash", post(api::trash::empty_trash))
        .route(
            "/regenerate-thumbnails",
            post(api::admin::regenerate_thumbnails),
        )
        .route(
            "/clean-orphan-thumbnails",
            post(api::admin::clean_orphan_thumbnails),
        )
        .route(
            "/run-document-detection",
            post(api::admin::run_document_detection),
        )
        .route("/auth/login", post(api::auth::login))
        .route("/auth/register", post(api::auth::register))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind TCP listener");

    axum::serve(listener, app).await.expect("server error");
}

/// `GET /health` — liveness probe for load balancers and process
/// supervisors.
async fn health_check() -> &'static str {
    "ok"
}
