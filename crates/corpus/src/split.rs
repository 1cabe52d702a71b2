use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::info;

/// Relevance judgments and query text for one named split.
///
/// `doc_to_query` keeps the *last* judgment in file order when a document
/// is judged under more than one query. That overwrite-in-order behavior
/// is a deliberate policy; do not change it to first-write-wins.
#[derive(Debug, Clone, Default)]
pub struct SplitData {
    pub name: String,
    /// All `(query_id, document_id)` pairs. Not consumed by subset
    /// construction itself, but part of the observable data model.
    pub qrels: HashSet<(String, String)>,
    pub doc_to_query: HashMap<String, String>,
    pub queries: HashMap<String, String>,
}

impl SplitData {
    /// Load a split from its queries and qrels TSV files.
    pub async fn load(name: &str, queries_path: &Path, qrels_path: &Path) -> Result<Self> {
        let queries_file = File::open(queries_path)
            .await
            .with_context(|| format!("failed to open queries file {}", queries_path.display()))?;
        let qrels_file = File::open(qrels_path)
            .await
            .with_context(|| format!("failed to open qrels file {}", qrels_path.display()))?;

        let split = Self::from_readers(
            name,
            BufReader::new(queries_file),
            BufReader::new(qrels_file),
        )
        .await
        .with_context(|| format!("failed to load split {:?}", name))?;

        info!(
            split = name,
            queries = split.queries.len(),
            judgments = split.qrels.len(),
            "loaded split"
        );
        Ok(split)
    }

    /// Build a split from in-memory readers. Queries load first so every
    /// judgment can be checked against the query store; a judgment whose
    /// query_id is missing aborts the load.
    pub async fn from_readers<Q, J>(name: &str, queries: Q, qrels: J) -> Result<Self>
    where
        Q: AsyncBufRead + Unpin,
        J: AsyncBufRead + Unpin,
    {
        let queries = read_queries(queries).await?;
        let mut split = SplitData {
            name: name.to_string(),
            queries,
            ..Default::default()
        };

        let mut lines = qrels.lines();
        let mut line_num = 0usize;
        while let Some(line) = lines.next_line().await? {
            line_num += 1;
            let fields: Vec<&str> = line.trim().split('\t').collect();
            if fields.len() != 4 {
                bail!(
                    "qrels line {}: expected 4 tab-separated fields, got {}",
                    line_num,
                    fields.len()
                );
            }
            let (qid, doc_id) = (fields[0], fields[2]);
            if !split.queries.contains_key(qid) {
                bail!(
                    "qrels line {}: query id {:?} not present in the query store",
                    line_num,
                    qid
                );
            }
            split.qrels.insert((qid.to_string(), doc_id.to_string()));
            // last write wins, in file order
            split
                .doc_to_query
                .insert(doc_id.to_string(), qid.to_string());
        }

        Ok(split)
    }

    /// Look up the query a judged document belongs to, as
    /// `(query_id, query_text)`.
    pub fn query_for_doc(&self, doc_id: &str) -> Option<(&str, &str)> {
        let qid = self.doc_to_query.get(doc_id)?;
        let text = self.queries.get(qid)?;
        Some((qid.as_str(), text.as_str()))
    }
}

async fn read_queries<R>(reader: R) -> Result<HashMap<String, String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut queries = HashMap::new();
    let mut lines = reader.lines();
    let mut line_num = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_num += 1;
        let fields: Vec<&str> = line.trim().split('\t').collect();
        if fields.len() != 2 {
            bail!(
                "queries line {}: expected `query_id\\tquery_text`, got {} fields",
                line_num,
                fields.len()
            );
        }
        queries.insert(fields[0].to_string(), fields[1].to_string());
    }

    Ok(queries)
}
