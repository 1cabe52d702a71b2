use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Prediction scores must be strictly greater than this to admit a
    /// document into the subset.
    pub score_threshold: f64,
    /// The first `dev_cap` positives in corpus order become the held-out
    /// dev slice; the rest become training triples.
    pub dev_cap: usize,
    /// Top-k of the search request a negative is drawn from.
    pub candidate_pool: usize,
    /// Log a progress event every this many corpus lines (0 disables).
    pub progress_every: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
            dev_cap: 5000,
            candidate_pool: 100,
            progress_every: 100_000,
        }
    }
}
