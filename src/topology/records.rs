//! Typed decoding of raw node and link rows.

use crate::ingest::{coord, coord_num, int_or_zero, Record, RecordError};
use crate::model::{is_empty_code, Code, LatLon, LinkStatus, NodeStatus, Position};

// Node columns: XCoord;YCoord;KNOOPID;VOLGNR;NETWERKID;CODE;STATUS;LON_X;LAT_Y
pub const NODE_X: &str = "XCoord";
pub const NODE_Y: &str = "YCoord";
pub const NODE_ID: &str = "KNOOPID";
pub const NODE_NR: &str = "VOLGNR";
pub const NODE_NETWORK: &str = "NETWERKID";
pub const NODE_CODE: &str = "CODE";
pub const NODE_STATUS: &str = "STATUS";
pub const NODE_LON: &str = "LON_X";
pub const NODE_LAT: &str = "LAT_Y";

// Link columns: XCoord;YCoord;NETWERKID;NETWERK;PID;STATUS;STARTCODE;ENDCODE
pub const LINK_X: &str = "XCoord";
pub const LINK_Y: &str = "YCoord";
pub const LINK_NETWORK: &str = "NETWERKID";
pub const LINK_NETWORK_NAME: &str = "NETWERK";
pub const LINK_PID: &str = "PID";
pub const LINK_STATUS: &str = "STATUS";
pub const LINK_START: &str = "STARTCODE";
pub const LINK_END: &str = "ENDCODE";

/// A node row with every field typed.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub code: Code,
    pub status: NodeStatus,
    pub legacy_id: u64,
    pub old_nr: u32,
    pub network: String,
    pub position: Position,
    pub lat_lon: Option<LatLon>,
}

impl NodeRecord {
    /// Decode a row. The caller has already rejected empty codes.
    pub fn decode(record: &Record) -> Result<Self, RecordError> {
        let raw_code = record.require(NODE_CODE)?;
        let code: Code = raw_code
            .parse()
            .map_err(|_| RecordError::BadCode(raw_code.to_string()))?;
        let status: NodeStatus = record.require(NODE_STATUS)?.parse()?;
        let lat_lon = match (
            coord_num(record.text(NODE_LAT)),
            coord_num(record.text(NODE_LON)),
        ) {
            (Some(lat), Some(lon)) => Some(LatLon { lat, lon }),
            _ => None,
        };

        Ok(Self {
            code,
            status,
            legacy_id: int_or_zero(record, NODE_ID)?,
            old_nr: int_or_zero(record, NODE_NR)?,
            network: record.text(NODE_NETWORK).to_string(),
            position: Position::new(coord(record, NODE_X)?, coord(record, NODE_Y)?),
            lat_lon,
        })
    }
}

/// A link row with status and geometry typed.
///
/// Endpoint codes stay textual: whether an empty code is an error depends
/// on the status, which the builder decides.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRecord {
    pub pid: String,
    pub status: LinkStatus,
    pub network: String,
    pub network_name: String,
    pub centroid: Position,
    pub start: String,
    pub end: String,
}

impl LinkRecord {
    pub fn decode(record: &Record) -> Result<Self, RecordError> {
        let status: LinkStatus = record.require(LINK_STATUS)?.parse()?;
        let pid = record.text(LINK_PID);
        Ok(Self {
            pid: if is_empty_code(pid) { String::new() } else { pid.to_string() },
            status,
            network: record.text(LINK_NETWORK).to_string(),
            network_name: record.text(LINK_NETWORK_NAME).to_string(),
            centroid: Position::new(coord(record, LINK_X)?, coord(record, LINK_Y)?),
            start: record.text(LINK_START).to_string(),
            end: record.text(LINK_END).to_string(),
        })
    }

    pub fn has_endpoints(&self) -> bool {
        !is_empty_code(&self.start) && !is_empty_code(&self.end)
    }
}
