use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Build the subset membership set from a predictions reader.
///
/// Each line is `<score> <document_id>`; a document is admitted when its
/// score is strictly greater than `threshold`. Ties at the threshold are
/// excluded. Malformed lines abort with a parse error.
pub async fn read_admitted_set<R>(reader: R, threshold: f64) -> Result<HashSet<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut admitted = HashSet::new();
    let mut lines = reader.lines();
    let mut line_num = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_num += 1;
        let fields: Vec<&str> = line.trim().split(' ').collect();
        if fields.len() != 2 {
            bail!(
                "predictions line {}: expected `<score> <doc_id>`, got {} fields",
                line_num,
                fields.len()
            );
        }
        let score: f64 = fields[0].parse().with_context(|| {
            format!(
                "predictions line {}: non-numeric score {:?}",
                line_num, fields[0]
            )
        })?;
        if score > threshold {
            admitted.insert(fields[1].to_string());
        }
    }

    Ok(admitted)
}

/// Read the predictions file at `path` into a membership set.
pub async fn load_admitted_set(path: &Path, threshold: f64) -> Result<HashSet<String>> {
    let file = File::open(path)
        .await
        .with_context(|| format!("failed to open predictions file {}", path.display()))?;
    read_admitted_set(BufReader::new(file), threshold)
        .await
        .with_context(|| format!("failed to parse predictions file {}", path.display()))
}
