//! # renum: signage renumbering for way-marked node networks
//!
//! Reassigns the bounded label space 1..=99 to the nodes of a walking or
//! cycling node network after its topology changed, keeping equal numbers
//! far apart and adjacent numbers distinct.
//!
//! ## Pipeline
//!
//! ```text
//! node rows ─┐                 ┌─ buckets ──┐
//!            ├─ TopologyBuilder ┤            ├─ Allocator ─> Outcome ─> reports
//! link rows ─┘   (Diagnostics)  └─ reuse km ─┘
//! ```
//!
//! 1. **Ingest**: any [`RecordSource`] streams raw rows, nodes before links.
//! 2. **Build**: rows are decoded, merged across networks and validated.
//! 3. **Classify**: nodes fall into KEEP, TRY-KEEP, UPDATE or MAKE.
//! 4. **Allocate**: the buckets are numbered in that order.
//!
//! Row-level problems never stop a run; they are collected in
//! [`Diagnostics`]. Only a bad configuration or I/O failure is an [`Error`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use renum::{DelimitedFile, RenumConfig, Renumberer, TOPOLOGY_DELIMITER};
//!
//! # async fn example() -> renum::Result<()> {
//! let config = RenumConfig { cutoff: "TZ".into(), ..Default::default() };
//! let mut renum = Renumberer::new(config)?;
//!
//! let mut nodes = DelimitedFile::open("knooppunten.csv", TOPOLOGY_DELIMITER).await?;
//! let mut links = DelimitedFile::open("links.csv", TOPOLOGY_DELIMITER).await?;
//! renum.load(&mut nodes, &mut links).await?;
//!
//! let outcome = renum.run();
//! outcome.write_reports("/tmp/renum")?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod alloc;
pub mod classify;
pub mod config;
pub mod ingest;
pub mod model;
pub mod ordered;
pub mod report;
pub mod topology;

use std::path::{Path, PathBuf};

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{
    Assignment, Code, Direction, Link, LinkId, LinkKey, LinkStatus, Node, NodeId, NodeStatus,
    Position,
};

pub use config::{parse_spare_numbers, RenumConfig, ScoreWeights};
pub use ingest::delimited::{DelimitedFile, TOPOLOGY_DELIMITER};
pub use ingest::{MemorySource, ParseContext, Record, RecordError, RecordSource};
pub use topology::{Diagnostics, IssueKind, Topology, TopologyBuilder};
pub use classify::{Bucket, Classification};
pub use alloc::{Allocation, Allocator, UsageRegistry};
pub use report::{ResultKind, RunSummary};

// ============================================================================
// Top-level Renumberer handle
// ============================================================================

/// The primary entry point: load rows, then run.
pub struct Renumberer {
    config: RenumConfig,
    builder: TopologyBuilder,
}

impl Renumberer {
    /// Validate the configuration. Fails before any row is read.
    pub fn new(config: RenumConfig) -> Result<Self> {
        let builder = TopologyBuilder::new(&config)?;
        Ok(Self { config, builder })
    }

    pub fn config(&self) -> &RenumConfig {
        &self.config
    }

    /// Topology loaded so far.
    pub fn topology(&self) -> &Topology {
        self.builder.topology()
    }

    /// Stream one node source. May be called for several sources.
    pub async fn load_nodes<S: RecordSource + ?Sized>(&mut self, source: &mut S) -> Result<usize> {
        self.builder.load_nodes(source).await
    }

    /// Stream one link source. Load every node source first.
    pub async fn load_links<S: RecordSource + ?Sized>(&mut self, source: &mut S) -> Result<usize> {
        self.builder.load_links(source).await
    }

    /// Stream all nodes, then all links.
    pub async fn load<N, L>(&mut self, nodes: &mut N, links: &mut L) -> Result<()>
    where
        N: RecordSource + ?Sized,
        L: RecordSource + ?Sized,
    {
        self.load_nodes(nodes).await?;
        self.load_links(links).await?;
        Ok(())
    }

    /// Finish the topology, classify and allocate.
    pub fn run(self) -> Outcome {
        let Self { config, builder } = self;
        let (mut topology, mut diagnostics) = builder.finish();
        let classification = classify::classify(&topology, &config, &mut diagnostics);
        let allocation = alloc::allocate(&mut topology, &mut diagnostics, &classification, &config);
        Outcome { config, topology, diagnostics, classification, allocation }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub config: RenumConfig,
    pub topology: Topology,
    pub diagnostics: Diagnostics,
    pub classification: Classification,
    pub allocation: Allocation,
}

impl Outcome {
    pub fn node(&self, code: &str) -> Option<&Node> {
        let code: Code = code.parse().ok()?;
        self.topology.node_by_code(code)
    }

    /// Number assigned to the node with `code`.
    pub fn number(&self, code: &str) -> Option<u8> {
        self.node(code).and_then(Node::new_number)
    }

    pub fn result(&self, code: &str) -> Option<ResultKind> {
        self.node(code).map(ResultKind::of)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::collect(self)
    }

    /// Write every report into `dir`. Returns the paths written.
    pub fn write_reports(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        report::write_all(self, dir.as_ref())
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid code '{0}'")]
    InvalidCode(String),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
