use std::collections::HashSet;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use corpus::parse_collection_line;

use crate::config::BuildConfig;
use crate::context::{BuildStats, SplitSink};

/// Stream the collection once and replicate matched judgment/query pairs
/// into every split that judges the document. No cap, no negatives, no
/// search oracle; identical inputs produce byte-identical outputs.
pub async fn build_split_subsets<R, W>(
    collection: R,
    admitted: &HashSet<String>,
    out_collection: &mut W,
    sinks: &mut [SplitSink<'_, W>],
    config: &BuildConfig,
) -> Result<BuildStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stats = BuildStats::default();
    let mut lines = collection.lines();
    let mut line_num = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_num += 1;
        stats.lines += 1;
        let passage = parse_collection_line(&line, line_num)?;

        if admitted.contains(&passage.doc_id) {
            out_collection.write_all(line.as_bytes()).await?;
            out_collection.write_all(b"\n").await?;
            stats.admitted += 1;

            for sink in sinks.iter_mut() {
                if let Some((qid, query_text)) = sink.data.query_for_doc(&passage.doc_id) {
                    sink.qrels
                        .write_all(format!("{qid}\t0\t{}\t1\n", passage.doc_id).as_bytes())
                        .await?;
                    sink.queries
                        .write_all(format!("{qid}\t{query_text}\n").as_bytes())
                        .await?;
                    stats.matched += 1;
                }
            }
        }

        if config.progress_every > 0 && stats.lines % config.progress_every == 0 {
            info!(
                lines = stats.lines,
                admitted = stats.admitted,
                matched = stats.matched,
                "building split subsets"
            );
        }
    }

    out_collection.flush().await?;
    for sink in sinks.iter_mut() {
        sink.qrels.flush().await?;
        sink.queries.flush().await?;
    }
    Ok(stats)
}
