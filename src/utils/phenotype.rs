// Joins resfinder hits against the phenotype reference table
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use log::debug;
use serde::Serialize;

use crate::config::defs::{ACCESSION_COL, CLASS_COL, PHENOTYPE_COL, PipelineError};
use crate::utils::hits::MatchQuality;
use crate::utils::tsv::{read_result_set, ResultSet};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhenotypeEntry {
    pub phenotypes: Vec<String>,
    pub classes: Vec<String>,
}

/// Accession -> phenotypes and drug classes. Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct PhenotypeReference {
    entries: HashMap<String, PhenotypeEntry>,
}

impl PhenotypeReference {
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let table = read_result_set(path)?;
        let reference = Self::from_result_set(&table);
        debug!("Loaded {} phenotype reference entries from {}", reference.len(), path.display());
        Ok(reference)
    }

    pub fn from_result_set(table: &ResultSet) -> Self {
        let mut entries: HashMap<String, PhenotypeEntry> = HashMap::new();
        for row in table {
            let Some(accession) = row.get(ACCESSION_COL).filter(|a| !a.is_empty()) else {
                continue;
            };
            let entry = entries.entry(accession.to_string()).or_default();
            entry.phenotypes.extend(split_list(row.get(PHENOTYPE_COL)));
            entry.classes.extend(split_list(row.get(CLASS_COL)));
        }
        Self { entries }
    }

    pub fn get(&self, accession: &str) -> Option<&PhenotypeEntry> {
        self.entries.get(accession)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedPhenotypes {
    pub flat: BTreeSet<String>,
    pub by_class: BTreeMap<String, BTreeSet<String>>,
}

impl DerivedPhenotypes {
    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }
}

/// Expected phenotypes implied by the AMR hits.
///
/// # Arguments
///
/// * `amr` - resfinder ResultSet, joined on `#Template`.
/// * `reference` - Loaded phenotype table.
///
/// # Returns
/// Flat phenotype set and the same phenotypes grouped per drug class. A gene
/// listed under several classes contributes its full phenotype list to each.
pub fn derive_phenotypes(amr: &ResultSet, reference: &PhenotypeReference) -> DerivedPhenotypes {
    let mut derived = DerivedPhenotypes::default();
    for hit in amr {
        let Some(entry) = hit.template_id().and_then(|id| reference.get(id)) else {
            continue;
        };
        derived.flat.extend(entry.phenotypes.iter().cloned());
        for class in &entry.classes {
            derived
                .by_class
                .entry(class.clone())
                .or_default()
                .extend(entry.phenotypes.iter().cloned());
        }
    }
    derived
}

pub type ClassQualityCounts = BTreeMap<String, BTreeMap<MatchQuality, usize>>;

/// Drug class -> match quality tier -> number of AMR hits.
pub fn class_quality_counts(amr: &ResultSet, reference: &PhenotypeReference) -> ClassQualityCounts {
    let mut counts = ClassQualityCounts::new();
    for hit in amr {
        let Some(entry) = hit.template_id().and_then(|id| reference.get(id)) else {
            continue;
        };
        let quality = MatchQuality::of_record(hit);
        for class in &entry.classes {
            *counts
                .entry(class.clone())
                .or_default()
                .entry(quality)
                .or_insert(0) += 1;
        }
    }
    counts
}

fn split_list(field: Option<&str>) -> Vec<String> {
    field
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
