pub mod config;
pub mod error;
pub mod filters;
pub mod report;
pub mod scan;
pub mod state;
pub mod tree;
pub mod wordlist;

pub use config::{ScanConfig, ScanMode, ShowField, load_config};
pub use error::{BurrowError, ConfigError};
pub use filters::{FilterClause, FilterMode, FilterSet, RangeSpec};
pub use report::{ReportFormat, render};
pub use scan::{
    CancelToken, ProgressCallback, ScanEvent, ScanOutcome, ScanPlan, ScanState, ScanStats,
    Scheduler,
};
pub use state::ResumeState;
pub use tree::{DiscoveryTree, NodeId, TraversalOrder, TreeNode};
pub use wordlist::{CandidateSet, PermutationRequest, Pipeline, Transform, WordFilter};
