pub mod codec;
pub mod config;
pub mod coverage;
pub mod distill;
pub mod element;
pub mod feature;
pub mod pool;
pub mod store;
pub mod workdir;

pub use codec::{FeatureRecord, pack_features, unpack_features};
pub use config::DistillConfig;
pub use coverage::FeatureSet;
pub use distill::{DistillError, RunOptions, RunStats, distill, run_distill_task};
pub use element::CorpusElement;
pub use feature::{DomainFilter, Feature};
pub use pool::ReadOrder;
pub use store::{FileRecordReader, FileRecordWriter, RecordReader, RecordWriter, StoreError};
pub use workdir::{ShardLayout, WorkDir};
