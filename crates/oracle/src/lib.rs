pub mod es;

pub use es::EsOracle;

use anyhow::Result;

/// A ranked full-text search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub doc_id: String,
    pub text: String,
}

/// Query-by-text capability used for negative sampling: up to `top_k`
/// `(doc_id, text)` hits in descending relevance order.
///
/// The subset builder is generic over this trait so its logic runs against
/// a deterministic fake in tests.
#[allow(async_fn_in_trait)]
pub trait SearchOracle {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>>;
}
