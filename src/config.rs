use serde::Deserialize;

/// Application configuration loaded from environment variables via `envy`.
///
/// All fields map directly to environment variable names (uppercased by
/// envy). Provide defaults via `.env` for local development; override via
/// real env vars in production.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// TCP port the HTTP server listens on. Required.
    pub sync_server_port: u16,

    /// Filesystem root under which every user/device tree is stored.
    /// Required.
    pub sync_storage_path: String,

    /// Directory for log files. Empty means stderr only.
    #[serde(default)]
    pub log_path: String,

    /// Tracing filter directive, e.g. "info" or "sync_server=debug".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Path to the local SQLite auth store. When unset, `resolve()` always
    /// falls back to `lowercase(user)` and `/auth/*` routes are disabled.
    #[serde(default)]
    pub sync_auth_db: Option<String>,

    /// Bootstrap username created on first run when `sync_auth_db` has no
    /// users yet.
    #[serde(default)]
    pub sync_admin_user: Option<String>,

    /// Bootstrap password for `sync_admin_user`.
    #[serde(default)]
    pub sync_admin_password: Option<String>,

    /// Secret used to pepper locally-stored password hashes. Required when
    /// `sync_auth_db` is set.
    #[serde(default)]
    pub sync_session_secret: Option<String>,

    /// `1`, `true`, or `yes` enables document-to-Trash classification.
    #[serde(default)]
    pub sync_document_to_trash: Option<String>,

    /// Path to an external document classifier executable/script. Empty
    /// disables the external classifier in favor of the built-in heuristic.
    #[serde(default)]
    pub sync_document_classifier_path: Option<String>,

    /// Path (or bare name resolved via `PATH`) to the EXIF extractor binary.
    #[serde(default = "default_exiftool_path")]
    pub sync_exiftool_path: String,

    /// Path (or bare name resolved via `PATH`) to the video frame extractor.
    #[serde(default = "default_ffmpeg_path")]
    pub sync_ffmpeg_path: String,

    /// Number of concurrent media worker tasks.
    #[serde(default = "default_worker_count")]
    pub sync_worker_count: usize,

    /// Capacity of the bounded upload job queue.
    #[serde(default = "default_queue_capacity")]
    pub sync_upload_queue_capacity: usize,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_exiftool_path() -> String {
    "exiftool".into()
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".into()
}

fn default_worker_count() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    256
}

impl Config {
    /// Load configuration from the current process environment.
    ///
    /// Panics with a clear message if any required variable is missing.
    pub fn from_env() -> Self {
        let config: Config = envy::from_env().unwrap_or_else(|err| {
            panic!(
                "configuration error: {err}\nCheck that SYNC_STORAGE_PATH and \
                 SYNC_SERVER_PORT are set."
            );
        });

        if config.sync_auth_db.is_some() && config.sync_session_secret.is_none() {
            panic!("SYNC_SESSION_SECRET is required when SYNC_AUTH_DB is set");
        }

        config
    }

    /// Parses the loosely-typed `SYNC_DOCUMENT_TO_TRASH` string per spec:
    /// `1`, `true`, `yes` (case-sensitive, matching the original contract).
    pub fn document_to_trash_enabled(&self) -> bool {
        matches!(
            self.sync_document_to_trash.as_deref(),
            Some("1") | Some("true") | Some("yes")
        )
    }
}
