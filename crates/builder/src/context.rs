use serde::Serialize;

use corpus::SplitData;

/// Output streams for single-split mode, opened once and held for the
/// whole pass. The builder flushes them explicitly before returning.
pub struct TrainOutputs<W> {
    /// Filtered collection, same format as the input collection.
    pub collection: W,
    pub dev_qrels: W,
    pub dev_queries: W,
    pub triples: W,
}

/// One split's reference data plus its output streams, multi-split mode.
pub struct SplitSink<'a, W> {
    pub data: &'a SplitData,
    pub qrels: W,
    pub queries: W,
}

/// Counters accumulated during a pass. Reporting only; they never change
/// what gets written.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BuildStats {
    pub lines: u64,
    pub admitted: u64,
    pub positives: u64,
    pub dev_examples: u64,
    pub triples: u64,
    /// Matched judgment/query pairs across all splits (multi-split mode).
    pub matched: u64,
}
