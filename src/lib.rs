//! Lore Galaxy: a multi-system relationship graph with a 3D force layout.
//!
//! Entities extracted from several source systems (books, universes, code
//! bases) are merged into one graph. Each system gets a color and an anchor
//! point in space, and a cluster force pulls every entity toward the mean
//! anchor of the systems it appears in, so shared entities settle between
//! their clusters.
//!
//! # Core Concepts
//!
//! - **Batches**: `{nodes, links}` payloads merged idempotently into the graph
//! - **Systems**: named sources with a stable color and anchor, kept in the registry
//! - **Simulation**: a Barnes-Hut force layout with pluggable custom forces
//! - **Shells**: spheres sized by membership, drawn around each system
//!
//! # Example
//!
//! ```
//! use lore_galaxy::{AnalysisBatch, BatchLink, BatchNode, Session};
//!
//! let mut session = Session::default();
//! session.merge(&AnalysisBatch {
//!     nodes: vec![
//!         BatchNode::new("Van Helsing", "Dracula", 8.0),
//!         BatchNode::new("Mina", "Dracula", 6.0),
//!     ],
//!     links: vec![BatchLink::new("Van Helsing", "Mina", "protects")],
//! });
//! session.run(50);
//! assert_eq!(session.shells().len(), 1);
//! ```

pub mod cluster;
pub mod config;
pub mod error;
pub mod graph;
pub mod math;
pub mod session;
pub mod shell;
pub mod sim;
mod util;

pub use cluster::ClusterForce;
pub use config::{ClusterConfig, EngineConfig, PhysicsConfig, RegistryConfig, ShellConfig};
pub use error::{GalaxyError, GalaxyResult};
pub use graph::{
    AnalysisBatch, BatchLink, BatchNode, Edge, EndpointRef, GraphSnapshot, GraphStore, ItemKind,
    LinkRecord, MergeReport, Node, NodeRecord, ParsedBatch, PruneReport, Rejected, ReplaceReport,
    SearchHit, SystemMeta, SystemRecord, SystemRegistry,
};
pub use math::{Vec3, vec3};
pub use session::{FetchOutcome, FetchTicket, SharedSession, Session};
pub use shell::{Shell, ShellProjector};
pub use sim::{Body, Force, GraphView, Simulation};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
