//! Engine configuration.

/// Settings for a [`ReversibleEngine`](super::ReversibleEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Name recorded in execution logs and reports.
    pub migration_name: String,

    /// Run relation and custom integrity checks before committing.
    pub verify_on_success: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            migration_name: "migration".to_string(),
            verify_on_success: true,
        }
    }
}

impl EngineConfig {
    /// Create a configuration for a named migration.
    pub fn new(migration_name: impl Into<String>) -> Self {
        Self {
            migration_name: migration_name.into(),
            ..Default::default()
        }
    }

    /// Enable or disable integrity verification on success.
    pub fn with_verify_on_success(mut self, verify: bool) -> Self {
        self.verify_on_success = verify;
        self
    }
}
