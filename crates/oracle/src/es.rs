use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::{SearchHit, SearchOracle};

use corpus::parse_collection_line;

/// One request timeout for everything the adapter does, bulk included.
/// No retry policy: a failed request fails the run.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Documents per `_bulk` request during index population.
const BULK_BATCH: usize = 1000;

/// Elasticsearch adapter: match-query search over the `passage` field plus
/// one-time bulk population of the backing index.
pub struct EsOracle {
    base_url: String,
    index: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Deserialize)]
struct BulkResponse {
    errors: bool,
}

#[derive(Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub(crate) hits: Hits,
}

#[derive(Deserialize, Default)]
pub(crate) struct Hits {
    #[serde(default)]
    pub(crate) hits: Vec<Hit>,
}

#[derive(Deserialize)]
pub(crate) struct Hit {
    #[serde(rename = "_id")]
    pub(crate) id: String,
    #[serde(rename = "_source")]
    pub(crate) source: HitSource,
}

#[derive(Deserialize)]
pub(crate) struct HitSource {
    pub(crate) passage: String,
}

impl EsOracle {
    pub fn new(host: &str, port: u16, index: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            base_url: format!("http://{host}:{port}"),
            index: index.to_string(),
            client,
        })
    }

    /// Number of documents in the backing index. A missing index counts as
    /// zero; any other failure is fatal.
    pub async fn doc_count(&self) -> Result<u64> {
        let url = format!("{}/{}/_count", self.base_url, self.index);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("count request failed")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(0);
        }
        if !response.status().is_success() {
            bail!("count request failed: {}", response.status());
        }

        let count: CountResponse = response
            .json()
            .await
            .context("failed to parse count response")?;
        Ok(count.count)
    }

    /// Create the index with the given shard count. Another process having
    /// created it first is tolerated.
    pub async fn create_index(&self, shards: u32) -> Result<()> {
        let url = format!("{}/{}", self.base_url, self.index);
        let body = serde_json::json!({
            "settings": { "index": { "number_of_shards": shards } }
        });

        let response = self
            .client
            .put(&url)
            .json(&body)
            .send()
            .await
            .context("index creation request failed")?;

        if response.status().is_success() {
            info!(index = %self.index, shards, "created index");
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        if text.contains("resource_already_exists_exception") {
            warn!(index = %self.index, "index already exists, reusing it");
            return Ok(());
        }
        bail!("failed to create index {:?}: {}", self.index, text)
    }

    /// Make sure the index holds the full collection, bulk-loading it if
    /// the live document count falls short of the collection's line count.
    pub async fn ensure_indexed(&self, collection_path: &Path, shards: u32) -> Result<()> {
        let expected = count_lines(collection_path).await?;
        let current = self.doc_count().await?;
        if current >= expected {
            info!(index = %self.index, docs = current, "index already populated");
            return Ok(());
        }

        self.create_index(shards).await?;
        info!(
            index = %self.index,
            collection = %collection_path.display(),
            expected,
            "bulk indexing collection"
        );
        self.bulk_index(collection_path, expected).await
    }

    async fn bulk_index(&self, collection_path: &Path, expected: u64) -> Result<()> {
        let file = File::open(collection_path).await.with_context(|| {
            format!("failed to open collection {}", collection_path.display())
        })?;
        let mut lines = BufReader::new(file).lines();

        let mut body = String::new();
        let mut in_batch = 0usize;
        let mut indexed = 0u64;
        let mut line_num = 0usize;

        while let Some(line) = lines.next_line().await? {
            line_num += 1;
            let passage = parse_collection_line(&line, line_num)?;
            let action = serde_json::json!({
                "index": { "_index": self.index, "_id": passage.doc_id }
            });
            let doc = serde_json::json!({ "passage": passage.text });
            body.push_str(&action.to_string());
            body.push('\n');
            body.push_str(&doc.to_string());
            body.push('\n');
            in_batch += 1;

            if in_batch == BULK_BATCH {
                self.send_bulk(&body).await?;
                indexed += in_batch as u64;
                info!(indexed, expected, "indexing progress");
                body.clear();
                in_batch = 0;
            }
        }

        if in_batch > 0 {
            self.send_bulk(&body).await?;
            indexed += in_batch as u64;
        }

        info!(indexed, expected, "bulk indexing complete");
        Ok(())
    }

    async fn send_bulk(&self, body: &str) -> Result<()> {
        let url = format!("{}/_bulk", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("content-type", "application/x-ndjson")
            .body(body.to_string())
            .send()
            .await
            .context("bulk request failed")?;

        if !response.status().is_success() {
            bail!(
                "bulk indexing failed: {}",
                response.text().await.unwrap_or_default()
            );
        }

        let bulk: BulkResponse = response
            .json()
            .await
            .context("failed to parse bulk response")?;
        if bulk.errors {
            bail!("bulk indexing reported per-document errors");
        }
        Ok(())
    }
}

impl SearchOracle for EsOracle {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let url = format!("{}/{}/_search", self.base_url, self.index);
        let body = serde_json::json!({
            "size": top_k,
            "query": { "match": { "passage": { "query": query } } }
        });

        let response = self
            .client
            .post(&url)
            .query(&[("filter_path", "hits.hits")])
            .json(&body)
            .send()
            .await
            .context("search request failed")?;

        if !response.status().is_success() {
            bail!("search failed: {}", response.status());
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .context("failed to parse search response")?;

        Ok(parsed
            .hits
            .hits
            .into_iter()
            .map(|hit| SearchHit {
                doc_id: hit.id,
                text: hit.source.passage,
            })
            .collect())
    }
}

/// Line count of a file, used as the expected collection size.
pub async fn count_lines(path: &Path) -> Result<u64> {
    let file = File::open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut count = 0u64;
    while lines.next_line().await?.is_some() {
        count += 1;
    }
    Ok(count)
}
