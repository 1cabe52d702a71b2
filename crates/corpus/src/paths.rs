use std::path::{Path, PathBuf};

/// Well-known file names inside a dataset directory.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn collection(&self) -> PathBuf {
        self.root.join("collection.tsv")
    }

    pub fn queries(&self, split: &str) -> PathBuf {
        self.root.join(format!("queries.{split}.tsv"))
    }

    pub fn qrels(&self, split: &str) -> PathBuf {
        self.root.join(format!("qrels.{split}.tsv"))
    }

    pub fn predictions(&self) -> PathBuf {
        self.root.join("preds")
    }
}

/// Well-known output file names for a built subset.
#[derive(Debug, Clone)]
pub struct OutDir {
    root: PathBuf,
}

impl OutDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The filtered collection, same format as the input collection.
    pub fn collection(&self) -> PathBuf {
        self.root.join("collection.tsv")
    }

    /// Held-out qrels for the dev prefix of single-split mode.
    pub fn dev_qrels(&self) -> PathBuf {
        self.root.join("qrels.dev.small.tsv")
    }

    pub fn dev_queries(&self) -> PathBuf {
        self.root.join("queries.dev.tsv")
    }

    pub fn train_triples(&self) -> PathBuf {
        self.root.join("triples.train.small.tsv")
    }

    pub fn qrels(&self, split: &str) -> PathBuf {
        self.root.join(format!("qrels.{split}.tsv"))
    }

    pub fn queries(&self, split: &str) -> PathBuf {
        self.root.join(format!("queries.{split}.tsv"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_split_names() {
        let data = DataDir::new("/data");
        assert_eq!(
            data.queries("train"),
            PathBuf::from("/data/queries.train.tsv")
        );
        assert_eq!(data.qrels("dev.small"), PathBuf::from("/data/qrels.dev.small.tsv"));
        assert_eq!(data.predictions(), PathBuf::from("/data/preds"));
    }
}
