use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// One collection row: a passage keyed by its document id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub doc_id: String,
    pub text: String,
}

/// Parse a `doc_id \t passage` collection line.
///
/// `line_num` is 1-based and only used for error reporting.
pub fn parse_collection_line(line: &str, line_num: usize) -> Result<Passage> {
    let fields: Vec<&str> = line.trim().split('\t').collect();
    if fields.len() != 2 {
        bail!(
            "collection line {}: expected `doc_id\\tpassage`, got {} fields",
            line_num,
            fields.len()
        );
    }
    Ok(Passage {
        doc_id: fields[0].to_string(),
        text: fields[1].to_string(),
    })
}
