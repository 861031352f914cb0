//! Deduplication configuration.

/// Similarity an AI comparison must reach to count as a match.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Configuration for AI-assisted deduplication.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeduplicationConfig {
    /// Minimum similarity, in `[0, 1]`, for two entries to match.
    pub similarity_threshold: f64,
    /// Whether an entry whose comparisons all failed is matched exactly.
    pub fallback_to_exact: bool,
}

impl Default for DeduplicationConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            fallback_to_exact: true,
        }
    }
}

impl DeduplicationConfig {
    /// Sets the similarity threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Sets whether failed comparisons fall back to exact matching.
    #[must_use]
    pub const fn with_fallback(mut self, fallback_to_exact: bool) -> Self {
        self.fallback_to_exact = fallback_to_exact;
        self
    }

    /// The configured threshold, or the default when it lies outside `[0, 1]`.
    #[must_use]
    pub fn effective_threshold(&self) -> f64 {
        if (0.0..=1.0).contains(&self.similarity_threshold) {
            self.similarity_threshold
        } else {
            tracing::warn!(
                threshold = self.similarity_threshold,
                default = DEFAULT_SIMILARITY_THRESHOLD,
                "Invalid similarity threshold, using default"
            );
            DEFAULT_SIMILARITY_THRESHOLD
        }
    }
}
