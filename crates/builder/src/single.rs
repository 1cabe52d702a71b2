use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use rand::Rng;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use corpus::{SplitData, parse_collection_line};
use oracle::{SearchHit, SearchOracle};

use crate::config::BuildConfig;
use crate::context::{BuildStats, TrainOutputs};

/// Stream the collection once and build the training subset.
///
/// Every admitted document is copied verbatim into the filtered
/// collection. Admitted documents that carry a judgment are positives:
/// the first `dev_cap` of them (in corpus-encounter order) go to the dev
/// qrels/queries outputs, the rest become `query \t positive \t negative`
/// training triples with the negative drawn from the search oracle.
pub async fn build_training_set<R, W, O, G>(
    collection: R,
    split: &SplitData,
    admitted: &HashSet<String>,
    oracle: &O,
    rng: &mut G,
    out: &mut TrainOutputs<W>,
    config: &BuildConfig,
) -> Result<BuildStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    O: SearchOracle,
    G: Rng,
{
    let mut stats = BuildStats::default();
    let mut lines = collection.lines();
    let mut line_num = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_num += 1;
        stats.lines += 1;
        let passage = parse_collection_line(&line, line_num)?;

        if admitted.contains(&passage.doc_id) {
            out.collection.write_all(line.as_bytes()).await?;
            out.collection.write_all(b"\n").await?;
            stats.admitted += 1;

            if let Some((qid, query_text)) = split.query_for_doc(&passage.doc_id) {
                if stats.positives < config.dev_cap as u64 {
                    out.dev_qrels
                        .write_all(format!("{qid}\t0\t{}\t1\n", passage.doc_id).as_bytes())
                        .await?;
                    out.dev_queries
                        .write_all(format!("{qid}\t{query_text}\n").as_bytes())
                        .await?;
                    stats.dev_examples += 1;
                } else {
                    let negative = sample_negative(
                        oracle,
                        rng,
                        query_text,
                        &passage.doc_id,
                        config.candidate_pool,
                    )
                    .await
                    .with_context(|| {
                        format!("negative sampling failed for document {}", passage.doc_id)
                    })?;
                    out.triples
                        .write_all(
                            format!("{query_text}\t{}\t{negative}\n", passage.text).as_bytes(),
                        )
                        .await?;
                    stats.triples += 1;
                }
                stats.positives += 1;
            }
        }

        if config.progress_every > 0 && stats.lines % config.progress_every == 0 {
            info!(
                lines = stats.lines,
                admitted = stats.admitted,
                positives = stats.positives,
                "building training set"
            );
        }
    }

    out.collection.flush().await?;
    out.dev_qrels.flush().await?;
    out.dev_queries.flush().await?;
    out.triples.flush().await?;
    Ok(stats)
}

/// Draw a uniformly random hit from a top-`pool` search for `query_text`
/// and return its passage text as the negative example.
pub async fn sample_negative<O, G>(
    oracle: &O,
    rng: &mut G,
    query_text: &str,
    positive_id: &str,
    pool: usize,
) -> Result<String>
where
    O: SearchOracle,
    G: Rng,
{
    let hits = oracle.search(query_text, pool).await?;
    if hits.is_empty() {
        bail!("search returned no candidates for query {:?}", query_text);
    }
    // the search can legitimately return fewer than `pool` hits; the draw
    // covers what actually came back
    let drawn = rng.gen_range(0..hits.len());
    let hit = choose_negative(&hits, drawn, positive_id)?;
    Ok(hit.text.clone())
}

/// Resolve a drawn index against the positive document: a collision
/// advances one slot, wrapping at the end of the hit list. A wrap that
/// lands back on the positive means there was no distinct candidate.
pub fn choose_negative<'a>(
    hits: &'a [SearchHit],
    drawn: usize,
    positive_id: &str,
) -> Result<&'a SearchHit> {
    let mut idx = drawn;
    if hits[idx].doc_id == positive_id {
        idx = (idx + 1) % hits.len();
        if hits[idx].doc_id == positive_id {
            bail!("no search candidate distinct from positive document {positive_id}");
        }
    }
    Ok(&hits[idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::mock::StepRng;

    struct FakeOracle {
        hits: Vec<SearchHit>,
    }

    impl SearchOracle for FakeOracle {
        async fn search(&self, _query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
            Ok(self.hits.iter().take(top_k).cloned().collect())
        }
    }

    fn hit(doc_id: &str, text: &str) -> SearchHit {
        SearchHit {
            doc_id: doc_id.to_string(),
            text: text.to_string(),
        }
    }

    async fn train_split() -> SplitData {
        let queries = b"q1\twhat do cats eat\n" as &[u8];
        let qrels = b"q1\t0\td1\t1\n" as &[u8];
        SplitData::from_readers("train", queries, qrels)
            .await
            .unwrap()
    }

    fn empty_outputs() -> TrainOutputs<Vec<u8>> {
        TrainOutputs {
            collection: Vec::new(),
            dev_qrels: Vec::new(),
            dev_queries: Vec::new(),
            triples: Vec::new(),
        }
    }

    #[tokio::test]
    async fn filters_collection_and_emits_dev_prefix() {
        let collection = b"d1\tcat\nd2\tdog\nd3\tfish\n" as &[u8];
        let admitted: HashSet<String> = ["d1", "d3"].iter().map(|s| s.to_string()).collect();
        let split = train_split().await;
        let oracle = FakeOracle { hits: vec![] };
        let mut rng = StepRng::new(0, 0);
        let mut out = empty_outputs();

        let stats = build_training_set(
            collection,
            &split,
            &admitted,
            &oracle,
            &mut rng,
            &mut out,
            &BuildConfig::default(),
        )
        .await
        .unwrap();

        // admitted docs appear exactly once, verbatim; d2 never does
        assert_eq!(out.collection, b"d1\tcat\nd3\tfish\n");
        assert_eq!(out.dev_qrels, b"q1\t0\td1\t1\n");
        assert_eq!(out.dev_queries, b"q1\twhat do cats eat\n");
        assert!(out.triples.is_empty());

        assert_eq!(stats.lines, 3);
        assert_eq!(stats.admitted, 2);
        assert_eq!(stats.positives, 1);
        assert_eq!(stats.dev_examples, 1);
        assert_eq!(stats.triples, 0);
    }

    #[tokio::test]
    async fn dev_cap_is_an_exact_prefix() {
        let collection = b"d1\ta\nd2\tb\nd3\tc\nd4\td\n" as &[u8];
        let admitted: HashSet<String> = ["d1", "d2", "d3", "d4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let queries = b"q1\tone\nq2\ttwo\nq3\tthree\nq4\tfour\n" as &[u8];
        let qrels =
            b"q1\t0\td1\t1\nq2\t0\td2\t1\nq3\t0\td3\t1\nq4\t0\td4\t1\n" as &[u8];
        let split = SplitData::from_readers("train", queries, qrels)
            .await
            .unwrap();

        let oracle = FakeOracle {
            hits: vec![hit("n1", "negA"), hit("n2", "negB")],
        };
        let mut rng = StepRng::new(0, 0); // always draws index 0
        let mut out = empty_outputs();
        let config = BuildConfig {
            dev_cap: 2,
            ..Default::default()
        };

        let stats = build_training_set(
            collection,
            &split,
            &admitted,
            &oracle,
            &mut rng,
            &mut out,
            &config,
        )
        .await
        .unwrap();

        // first two positives are dev, the rest are triples
        assert_eq!(out.dev_qrels, b"q1\t0\td1\t1\nq2\t0\td2\t1\n");
        assert_eq!(out.triples, b"three\tc\tnegA\nfour\td\tnegA\n");
        assert_eq!(stats.positives, 4);
        assert_eq!(stats.dev_examples + stats.triples, stats.positives);
    }

    #[tokio::test]
    async fn collision_with_positive_takes_next_hit() {
        let collection = b"d1\tcat passage\n" as &[u8];
        let admitted: HashSet<String> = ["d1".to_string()].into_iter().collect();
        let split = train_split().await;

        // the positive itself ranks first, so index 0 collides
        let oracle = FakeOracle {
            hits: vec![hit("d1", "cat passage"), hit("n1", "unrelated")],
        };
        let mut rng = StepRng::new(0, 0);
        let mut out = empty_outputs();
        let config = BuildConfig {
            dev_cap: 0,
            ..Default::default()
        };

        build_training_set(
            collection,
            &split,
            &admitted,
            &oracle,
            &mut rng,
            &mut out,
            &config,
        )
        .await
        .unwrap();

        assert_eq!(out.triples, b"what do cats eat\tcat passage\tunrelated\n");
    }

    #[tokio::test]
    async fn empty_search_results_fail_the_run() {
        let collection = b"d1\tcat passage\n" as &[u8];
        let admitted: HashSet<String> = ["d1".to_string()].into_iter().collect();
        let split = train_split().await;
        let oracle = FakeOracle { hits: vec![] };
        let mut rng = StepRng::new(0, 0);
        let mut out = empty_outputs();
        let config = BuildConfig {
            dev_cap: 0,
            ..Default::default()
        };

        let err = build_training_set(
            collection,
            &split,
            &admitted,
            &oracle,
            &mut rng,
            &mut out,
            &config,
        )
        .await
        .unwrap_err();
        assert!(format!("{err:#}").contains("no candidates"));
    }

    #[tokio::test]
    async fn malformed_collection_line_is_fatal() {
        let collection = b"d1\tcat\njust-one-field\n" as &[u8];
        let admitted: HashSet<String> = ["d1".to_string()].into_iter().collect();
        let split = train_split().await;
        let oracle = FakeOracle { hits: vec![] };
        let mut rng = StepRng::new(0, 0);
        let mut out = empty_outputs();

        let err = build_training_set(
            collection,
            &split,
            &admitted,
            &oracle,
            &mut rng,
            &mut out,
            &BuildConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn choose_negative_no_collision() {
        let hits = vec![hit("a", "ta"), hit("b", "tb"), hit("c", "tc")];
        let chosen = choose_negative(&hits, 1, "zzz").unwrap();
        assert_eq!(chosen.doc_id, "b");
    }

    #[test]
    fn choose_negative_advances_on_collision() {
        let hits = vec![hit("a", "ta"), hit("b", "tb"), hit("c", "tc")];
        let chosen = choose_negative(&hits, 0, "a").unwrap();
        assert_eq!(chosen.doc_id, "b");
    }

    #[test]
    fn choose_negative_wraps_at_end() {
        let hits = vec![hit("a", "ta"), hit("b", "tb"), hit("c", "tc")];
        let chosen = choose_negative(&hits, 2, "c").unwrap();
        assert_eq!(chosen.doc_id, "a");
    }

    #[test]
    fn choose_negative_fails_without_distinct_candidate() {
        let hits = vec![hit("a", "ta")];
        assert!(choose_negative(&hits, 0, "a").is_err());
    }
}
