//! Header-first delimited text files, read line by line.
//!
//! Topology inputs are `;`-delimited. Cells may be wrapped in double
//! quotes; the quotes are stripped, embedded delimiters are not supported.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use super::{Record, RecordSource};
use crate::Result;

/// Delimiter of topology files.
pub const TOPOLOGY_DELIMITER: char = ';';

/// Streaming reader over a delimited file.
pub struct DelimitedFile {
    name: String,
    delimiter: char,
    header: Vec<String>,
    lines: Lines<BufReader<File>>,
}

impl DelimitedFile {
    /// Open `path` and read its header row.
    pub async fn open(path: impl AsRef<Path>, delimiter: char) -> Result<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let file = File::open(&path).await?;
        let mut lines = BufReader::new(file).lines();
        let header = match lines.next_line().await? {
            Some(line) => split_row(strip_bom(&line), delimiter),
            None => Vec::new(),
        };
        tracing::debug!(path = %path.display(), columns = header.len(), "opened delimited file");
        Ok(Self {
            name: path.display().to_string(),
            delimiter,
            header,
            lines,
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }
}

#[async_trait]
impl RecordSource for DelimitedFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_record(&mut self) -> Result<Option<Record>> {
        let Some(line) = self.lines.next_line().await? else {
            return Ok(None);
        };
        // Blank lines come back as blank records so line numbers stay aligned.
        let cells = split_row(&line, self.delimiter);
        Ok(Some(self.header.iter().cloned().zip(cells).collect()))
    }
}

fn strip_bom(line: &str) -> &str {
    line.strip_prefix('\u{feff}').unwrap_or(line)
}

fn split_row(line: &str, delimiter: char) -> Vec<String> {
    line.trim_end_matches(['\r', '\n'])
        .split(delimiter)
        .map(|cell| {
            let cell = cell.trim();
            cell.strip_prefix('"')
                .and_then(|c| c.strip_suffix('"'))
                .unwrap_or(cell)
                .to_string()
        })
        .collect()
}
