mod batch;
mod registry;
mod snapshot;
mod store;

pub use batch::{
    AnalysisBatch, BatchLink, BatchNode, DEFAULT_NODE_WEIGHT, ItemKind, ParsedBatch, Rejected,
};
pub use registry::{SystemRecord, SystemRegistry};
pub use snapshot::{EndpointRef, GraphSnapshot, LinkRecord, NodeRecord, SystemMeta};
pub use store::{Edge, GraphStore, MergeReport, Node, PruneReport, ReplaceReport, SearchHit};
