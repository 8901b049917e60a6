// kma .mapstat header markers and the kgt_mlst sequence type
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::config::defs::{FRAGMENT_COUNT_MARKER, PipelineError, VERSION_MARKER};

/// Run statistics from the `##` preamble of a kma `.mapstat` file.
/// Either marker may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapStat {
    pub fragment_count: Option<String>,
    pub version: Option<String>,
}

impl MapStat {
    pub fn parse(path: &Path) -> Result<Self, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::MissingInputFile(path.to_path_buf()));
        }
        let reader = BufReader::new(File::open(path)?);
        let mut stats = MapStat::default();
        for line in reader.lines() {
            let line = line?;
            if !line.starts_with("##") {
                continue;
            }
            if let Some(value) = marker_value(&line, FRAGMENT_COUNT_MARKER) {
                stats.fragment_count = Some(value);
            } else if let Some(value) = marker_value(&line, VERSION_MARKER) {
                stats.version = Some(value);
            }
        }
        Ok(stats)
    }
}

fn marker_value(line: &str, marker: &str) -> Option<String> {
    let mut fields = line.splitn(2, '\t');
    if fields.next()?.trim() != marker {
        return None;
    }
    let value = fields.next()?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Sequence type from a kgt_mlst result table: column two of line two.
pub fn read_mlst_type(path: &Path) -> Result<Option<String>, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::MissingInputFile(path.to_path_buf()));
    }
    let reader = BufReader::new(File::open(path)?);
    let Some(line) = reader.lines().nth(1) else {
        return Ok(None);
    };
    let line = line?;
    Ok(line
        .split('\t')
        .nth(1)
        .map(str::trim)
        .filter(|st| !st.is_empty())
        .map(String::from))
}
