pub mod config;
pub mod context;
pub mod multi;
pub mod single;

pub use config::BuildConfig;
pub use context::{BuildStats, SplitSink, TrainOutputs};
pub use multi::build_split_subsets;
pub use single::{build_training_set, choose_negative, sample_negative};
