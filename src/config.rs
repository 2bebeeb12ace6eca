//! Store configuration.
//!
//! All sizes are in 4-byte words, the allocation unit of the buffer pool.

/// Tuning knobs for buffer sizing and compaction triggers.
///
/// # Example
///
/// ```rust
/// use enumstore::StoreConfig;
///
/// let config = StoreConfig::new()
///     .with_initial_buffer_words(1024)
///     .with_max_dead_ratio(0.5);
/// assert_eq!(config.initial_buffer_words, 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreConfig {
    /// Capacity of the first active buffer.
    pub initial_buffer_words: usize,

    /// Lower bound for any newly sized buffer.
    pub min_buffer_words: usize,

    /// Extra capacity added on top of the live words when a buffer is
    /// (re)sized, as a fraction of the required size.
    pub grow_factor: f64,

    /// Dead-to-used ratio of the active buffer above which compaction is wanted.
    pub max_dead_ratio: f64,

    /// Dead words required before the ratio is considered at all.
    pub min_dead_words: usize,
}

impl StoreConfig {
    /// Default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            initial_buffer_words: 4096,
            min_buffer_words: 256,
            grow_factor: 0.5,
            max_dead_ratio: 0.2,
            min_dead_words: 1024,
        }
    }

    /// Set [`StoreConfig::initial_buffer_words`].
    #[must_use]
    pub const fn with_initial_buffer_words(mut self, words: usize) -> Self {
        self.initial_buffer_words = words;
        self
    }

    /// Set [`StoreConfig::min_buffer_words`].
    #[must_use]
    pub const fn with_min_buffer_words(mut self, words: usize) -> Self {
        self.min_buffer_words = words;
        self
    }

    /// Set [`StoreConfig::grow_factor`].
    #[must_use]
    pub const fn with_grow_factor(mut self, factor: f64) -> Self {
        self.grow_factor = factor;
        self
    }

    /// Set [`StoreConfig::max_dead_ratio`].
    #[must_use]
    pub const fn with_max_dead_ratio(mut self, ratio: f64) -> Self {
        self.max_dead_ratio = ratio;
        self
    }

    /// Set [`StoreConfig::min_dead_words`].
    #[must_use]
    pub const fn with_min_dead_words(mut self, words: usize) -> Self {
        self.min_dead_words = words;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}
