pub mod paths;
pub mod predictions;
pub mod record;
pub mod split;

pub use paths::{DataDir, OutDir};
pub use record::{Passage, parse_collection_line};
pub use split::SplitData;
