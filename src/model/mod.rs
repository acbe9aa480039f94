//! # Network Model
//!
//! Plain data for the way-marking network: codes, statuses, nodes, links
//! and the planar geometry they live in. Nodes and links are held in an
//! arena owned by [`Topology`](crate::topology::Topology) and refer to each
//! other by index.
//!
//! Design rule: no I/O and no allocation policy here.

pub mod code;
pub mod status;
pub mod geometry;
pub mod node;
pub mod link;

pub use code::{Code, CODEBASE, CODE_SPACE, code_to_value, value_to_code, is_empty_code};
pub use status::{NodeStatus, LinkStatus};
pub use geometry::{Position, LatLon, Envelope};
pub use node::{Node, NodeId, Networks, Adjacent, Assignment, MAX_NUMBER};
pub use link::{Link, LinkId, LinkKey, Direction, pid_for};
