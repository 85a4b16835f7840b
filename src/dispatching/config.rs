//! Worker pool configuration for parallel evaluation.

use rayon::ThreadPoolBuilder;

/// Error returned when a configuration fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("thread_name_prefix must not be empty")]
    EmptyThreadNamePrefix,

    #[error("stack_size must be positive")]
    ZeroStackSize,
}

/// Configuration of the per-call worker pool used by
/// [`RuleEngine::all_matches_parallel`].
///
/// The number of workers is deliberately absent: the pool is always sized
/// by the host (rayon's default thread count).
///
/// # Examples
///
/// ```
/// use u_rules::ParallelConfig;
///
/// let config = ParallelConfig::default()
///     .with_thread_name_prefix("pricing-rules")
///     .with_stack_size(4 * 1024 * 1024);
///
/// assert!(config.validate().is_ok());
/// ```
///
/// [`RuleEngine::all_matches_parallel`]: super::RuleEngine::all_matches_parallel
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParallelConfig {
    /// Prefix of worker thread names. Workers are named `{prefix}-{index}`.
    pub thread_name_prefix: String,

    /// Stack size of each worker in bytes. `None` keeps rayon's default.
    pub stack_size: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "u-rules-worker".into(),
            stack_size: None,
        }
    }
}

impl ParallelConfig {
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_name_prefix.is_empty() {
            return Err(ConfigError::EmptyThreadNamePrefix);
        }
        if self.stack_size == Some(0) {
            return Err(ConfigError::ZeroStackSize);
        }
        Ok(())
    }

    /// Returns a pool builder applying this configuration.
    pub(super) fn pool_builder(&self) -> ThreadPoolBuilder {
        let prefix = self.thread_name_prefix.clone();
        let builder = ThreadPoolBuilder::new().thread_name(move |i| format!("{prefix}-{i}"));
        match self.stack_size {
            Some(bytes) => builder.stack_size(bytes),
            None => builder,
        }
    }
}
