//! Lifecycle statuses for nodes and links.
//!
//! | Status  | Meaning                                              |
//! |---------|------------------------------------------------------|
//! | `IN`    | existing, number must be reconsidered                |
//! | `FIX`   | existing, number stays unless a touching link changes|
//! | `FIXNEW`| new code with an externally pinned number            |
//! | `NEW`   | brand-new node, gets a fresh number                  |
//! | `DEL`   | removed, kept inert for auditing                     |
//! | `EXT`   | existing node owned by a neighbouring network        |
//! | `EXTNEW`| new node owned by a neighbouring network             |
//!
//! `TODO` and `OUT` are recognised but refused at ingestion. Links add
//! `MIS` (pid unknown) and `NIV` (not levelled, ignored).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ingest::RecordError;

/// Status of a node row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeStatus {
    In,
    Fix,
    FixNew,
    New,
    Del,
    Ext,
    ExtNew,
}

impl NodeStatus {
    pub const ALL: [NodeStatus; 7] = [
        NodeStatus::In,
        NodeStatus::Fix,
        NodeStatus::FixNew,
        NodeStatus::New,
        NodeStatus::Del,
        NodeStatus::Ext,
        NodeStatus::ExtNew,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeStatus::In => "IN",
            NodeStatus::Fix => "FIX",
            NodeStatus::FixNew => "FIXNEW",
            NodeStatus::New => "NEW",
            NodeStatus::Del => "DEL",
            NodeStatus::Ext => "EXT",
            NodeStatus::ExtNew => "EXTNEW",
        }
    }

    /// Codes of these nodes must sort after the configured cutoff.
    pub fn has_new_code(self) -> bool {
        matches!(self, NodeStatus::New | NodeStatus::FixNew | NodeStatus::ExtNew)
    }

    /// These nodes must carry a nonzero legacy id and legacy number.
    pub fn requires_legacy(self) -> bool {
        matches!(
            self,
            NodeStatus::In | NodeStatus::Fix | NodeStatus::Del | NodeStatus::Ext
        )
    }

    pub fn is_external(self) -> bool {
        matches!(self, NodeStatus::Ext | NodeStatus::ExtNew)
    }

    /// Candidate for the southernmost spatial reference.
    pub fn is_reference_candidate(self) -> bool {
        matches!(self, NodeStatus::In | NodeStatus::Fix)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeStatus {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(NodeStatus::In),
            "FIX" => Ok(NodeStatus::Fix),
            "FIXNEW" => Ok(NodeStatus::FixNew),
            "NEW" => Ok(NodeStatus::New),
            "DEL" => Ok(NodeStatus::Del),
            "EXT" => Ok(NodeStatus::Ext),
            "EXTNEW" => Ok(NodeStatus::ExtNew),
            "TODO" | "OUT" => Err(RecordError::RejectedStatus(s.trim().to_string())),
            _ => Err(RecordError::UnknownStatus(s.trim().to_string())),
        }
    }
}

/// Status of a link row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LinkStatus {
    In,
    Fix,
    FixNew,
    New,
    Del,
    Ext,
    ExtNew,
    Mis,
    Niv,
}

impl LinkStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkStatus::In => "IN",
            LinkStatus::Fix => "FIX",
            LinkStatus::FixNew => "FIXNEW",
            LinkStatus::New => "NEW",
            LinkStatus::Del => "DEL",
            LinkStatus::Ext => "EXT",
            LinkStatus::ExtNew => "EXTNEW",
            LinkStatus::Mis => "MIS",
            LinkStatus::Niv => "NIV",
        }
    }

    /// Links whose pid must match their endpoints' legacy ids.
    pub fn checks_pid(self) -> bool {
        !matches!(self, LinkStatus::New | LinkStatus::Del | LinkStatus::Mis)
    }

    /// DEL and NEW links force both endpoints to reconsider their number.
    pub fn forces_change(self) -> bool {
        matches!(self, LinkStatus::New | LinkStatus::Del)
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkStatus {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(LinkStatus::In),
            "FIX" => Ok(LinkStatus::Fix),
            "FIXNEW" => Ok(LinkStatus::FixNew),
            "NEW" => Ok(LinkStatus::New),
            "DEL" => Ok(LinkStatus::Del),
            "EXT" => Ok(LinkStatus::Ext),
            "EXTNEW" => Ok(LinkStatus::ExtNew),
            "MIS" => Ok(LinkStatus::Mis),
            "NIV" => Ok(LinkStatus::Niv),
            "TODO" | "OUT" => Err(RecordError::RejectedStatus(s.trim().to_string())),
            _ => Err(RecordError::UnknownStatus(s.trim().to_string())),
        }
    }
}
