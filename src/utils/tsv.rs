// Tab-separated result tables written by kma, kgt_mlst and the phenotype reference
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::config::defs::{PipelineError, TEMPLATE_COL};

/// One row of a result table. Field order follows the header.
#[derive(Debug, Clone, PartialEq)]
pub struct HitRecord {
    fields: Vec<(String, String)>,
}

impl HitRecord {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Parses a numeric field. Absence and non-numeric content are both errors
    /// the caller decides how to degrade.
    pub fn get_f64(&self, name: &str) -> Result<f64, PipelineError> {
        let value = self
            .get(name)
            .ok_or_else(|| PipelineError::MissingField(name.to_string()))?;
        value
            .parse::<f64>()
            .map_err(|_| PipelineError::UnparseableField {
                field: name.to_string(),
                value: value.to_string(),
            })
    }

    pub fn template_id(&self) -> Option<&str> {
        self.get(TEMPLATE_COL)
    }

    /// Display value: the trimmed source string, or "N/A".
    pub fn display(&self, name: &str) -> &str {
        match self.get(name) {
            Some(v) if !v.is_empty() => v,
            _ => crate::config::defs::NOT_AVAILABLE,
        }
    }
}

/// Rows of one result table in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub header: Vec<String>,
    pub records: Vec<HitRecord>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HitRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a HitRecord;
    type IntoIter = std::slice::Iter<'a, HitRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Reads a tab-separated table, first line as header.
///
/// # Arguments
///
/// * `path` - kma `.res`, resistance, plasmid, virulence or phenotype table.
///
/// # Returns
/// ResultSet in row order. A data row whose field count differs from the
/// header fails the whole read with `MalformedTable`.
pub fn read_result_set(path: &Path) -> Result<ResultSet, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::MissingInputFile(path.to_path_buf()));
    }
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();

    let header: Vec<String> = match lines.next() {
        Some(line) => split_row(&line?),
        None => return Ok(ResultSet::default()),
    };

    let mut records = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let values = split_row(&line);
        if values.len() != header.len() {
            return Err(PipelineError::MalformedTable {
                path: path.to_path_buf(),
                line: i + 2,
                expected: header.len(),
                found: values.len(),
            });
        }
        records.push(HitRecord::new(
            header.iter().cloned().zip(values).collect(),
        ));
    }

    Ok(ResultSet { header, records })
}

/// Writes a ResultSet back out in the layout `read_result_set` expects.
pub fn write_result_set(path: &Path, set: &ResultSet) -> Result<(), PipelineError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{}", set.header.join("\t"))?;
    for record in &set.records {
        let row: Vec<&str> = set
            .header
            .iter()
            .map(|h| record.get(h).unwrap_or(""))
            .collect();
        writeln!(writer, "{}", row.join("\t"))?;
    }
    writer.flush()?;
    Ok(())
}

fn split_row(line: &str) -> Vec<String> {
    line.trim_end_matches(['\r', '\n'])
        .split('\t')
        .map(|s| s.trim().to_string())
        .collect()
}
