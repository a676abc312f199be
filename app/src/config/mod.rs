//! Configuration: defaults, validation, loading from the environment.

pub mod app_config;
pub mod defaults;
pub mod validation;

pub use app_config::AppConfig;

/// Load .env from multiple candidate paths. Returns the path that loaded.
///
/// Runs before tracing is installed so that `LOG_LEVEL` from the file takes
/// effect; callers log the outcome.
pub fn load_dotenv() -> Option<&'static str> {
    let candidates = [".env", "../.env", "../../.env"];
    candidates
        .into_iter()
        .find(|path| dotenvy::from_filename(path).is_ok())
}
