use crate::pattern::DEFAULT_POSITION_SUFFIX;

/// Default scope key when `ZONEMAP_SCOPE` is unset.
pub const DEFAULT_SCOPE: &str = "default";

/// Default number of rows per position/link insert call.
pub const DEFAULT_SYNC_CHUNK_SIZE: usize = 500;

/// Editor configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    /// Scope key passed to every store fetch/insert (one warehouse system).
    pub scope: String,
    /// Maximum rows per position or link insert call during reconciliation.
    pub chunk_size: usize,
    /// Suffix used by the default position pattern `{zone}.{suffix}{#}`.
    pub position_suffix: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            scope: DEFAULT_SCOPE.to_string(),
            chunk_size: DEFAULT_SYNC_CHUNK_SIZE,
            position_suffix: DEFAULT_POSITION_SUFFIX.to_string(),
        }
    }
}

impl EditorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default   |
    /// |---------------------------|-----------|
    /// | `ZONEMAP_SCOPE`           | `default` |
    /// | `ZONEMAP_SYNC_CHUNK_SIZE` | `500`     |
    /// | `ZONEMAP_POSITION_SUFFIX` | `V`       |
    ///
    /// Unparseable or zero chunk sizes fall back to the default.
    pub fn from_env() -> Self {
        let scope = std::env::var("ZONEMAP_SCOPE")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SCOPE.into());

        let chunk_size: usize = std::env::var("ZONEMAP_SYNC_CHUNK_SIZE")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_SYNC_CHUNK_SIZE);

        let position_suffix = std::env::var("ZONEMAP_POSITION_SUFFIX")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| DEFAULT_POSITION_SUFFIX.into());

        Self {
            scope,
            chunk_size,
            position_suffix,
        }
    }

    /// Same configuration for a different scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}
