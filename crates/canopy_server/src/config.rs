//! Server configuration.

/// Configuration for the store server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
    /// Maximum nesting depth of a written value.
    pub max_nesting_depth: usize,
    /// Whether to attach `etag` to every response, not only when asked.
    pub always_return_etag: bool,
}

impl ServerConfig {
    /// Creates a configuration with default limits.
    pub fn new() -> Self {
        Self {
            max_body_bytes: 16 * 1024 * 1024, // 16 MB
            max_nesting_depth: 32,
            always_return_etag: false,
        }
    }

    /// Sets the maximum body size.
    pub fn with_max_body_bytes(mut self, size: usize) -> Self {
        self.max_body_bytes = size;
        self
    }

    /// Sets the maximum value nesting depth.
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Attaches entity tags to every response.
    pub fn with_always_return_etag(mut self, value: bool) -> Self {
        self.always_return_etag = value;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
