//! Collected non-fatal findings.
//!
//! Nothing in here stops a run. Row problems, topology invariants and
//! allocation trouble all land in [`Diagnostics`] and are written out at
//! the end.

use serde::{Deserialize, Serialize};

use crate::ingest::{ParseContext, Record};
use crate::model::{Link, Node};

use super::records::{
    LINK_END, LINK_PID, LINK_START, LINK_STATUS, NODE_CODE, NODE_ID, NODE_NR, NODE_STATUS,
};

/// A problem with one node row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIssue {
    pub line: usize,
    pub code: String,
    pub id: String,
    pub old_nr: String,
    pub status: String,
    pub message: String,
}

/// A problem with one link row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkIssue {
    pub line: usize,
    pub code: String,
    pub pid: String,
    pub start: String,
    pub end: String,
    pub status: String,
    pub message: String,
}

/// Category of a finding that is not tied to a single row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A run of codes below the highest code that no node uses.
    CodeGap,
    /// An existing code sorts after a new code.
    CutoffOrder,
    /// Two links ended up on the same pair of numbers.
    DuplicateTrail,
    /// Two adjacent nodes hold the same number.
    AdjacentSameNumber,
    /// A number was reused closer than the safe distance.
    ReuseDistance,
    /// No candidate number could be found for a node.
    AllocationFailed,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::CodeGap => "code_gap",
            IssueKind::CutoffOrder => "cutoff_order",
            IssueKind::DuplicateTrail => "duplicate_trail",
            IssueKind::AdjacentSameNumber => "adjacent_same_number",
            IssueKind::ReuseDistance => "reuse_distance",
            IssueKind::AllocationFailed => "allocation_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalIssue {
    pub kind: IssueKind,
    pub message: String,
}

/// All findings of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub nodes: Vec<NodeIssue>,
    pub links: Vec<LinkIssue>,
    pub global: Vec<GlobalIssue>,
}

impl Diagnostics {
    /// Issue against a raw node row that never became a [`Node`].
    pub fn raw_node(&mut self, ctx: &ParseContext, record: &Record, message: impl Into<String>) {
        self.push_node(NodeIssue {
            line: ctx.line,
            code: record.text(NODE_CODE).to_string(),
            id: record.text(NODE_ID).to_string(),
            old_nr: record.text(NODE_NR).to_string(),
            status: record.text(NODE_STATUS).to_string(),
            message: message.into(),
        });
    }

    /// Issue against a known node; `line` is the row being processed.
    pub fn node(&mut self, line: usize, node: &Node, message: impl Into<String>) {
        self.push_node(NodeIssue {
            line,
            code: node.code.to_string(),
            id: node.legacy_id.to_string(),
            old_nr: node.old_nr.to_string(),
            status: node.status.to_string(),
            message: message.into(),
        });
    }

    /// Issue against a raw link row that never became a [`Link`].
    pub fn raw_link(&mut self, ctx: &ParseContext, record: &Record, message: impl Into<String>) {
        self.push_link(LinkIssue {
            line: ctx.line,
            code: String::new(),
            pid: record.text(LINK_PID).to_string(),
            start: record.text(LINK_START).to_string(),
            end: record.text(LINK_END).to_string(),
            status: record.text(LINK_STATUS).to_string(),
            message: message.into(),
        });
    }

    /// Issue against a link row; `link` may be the stored link or a candidate.
    pub fn link(&mut self, ctx: &ParseContext, link: &Link, message: impl Into<String>) {
        self.push_link(LinkIssue {
            line: ctx.line,
            code: link.key.to_string(),
            pid: link.pid.clone(),
            start: link.key.low.to_string(),
            end: link.key.high.to_string(),
            status: link.status.to_string(),
            message: message.into(),
        });
    }

    pub fn global(&mut self, kind: IssueKind, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(?kind, "{message}");
        self.global.push(GlobalIssue { kind, message });
    }

    fn push_node(&mut self, issue: NodeIssue) {
        tracing::debug!(line = issue.line, code = %issue.code, "node issue: {}", issue.message);
        self.nodes.push(issue);
    }

    fn push_link(&mut self, issue: LinkIssue) {
        tracing::debug!(line = issue.line, code = %issue.code, "link issue: {}", issue.message);
        self.links.push(issue);
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.global.iter().filter(|i| i.kind == kind).count()
    }

    pub fn total(&self) -> usize {
        self.nodes.len() + self.links.len() + self.global.len()
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}
