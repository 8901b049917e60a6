// Derived aggregates shared by the text and PDF reports
use std::path::PathBuf;

use log::{info, warn};

use crate::config::defs::{
    KmaDatabase, MAPSTAT_EXT, PipelineError, RES_EXT, RunConfig, SCORE_COL,
};
use crate::utils::hits::best_hit;
use crate::utils::mapstat::{read_mlst_type, MapStat};
use crate::utils::phenotype::{
    class_quality_counts, derive_phenotypes, ClassQualityCounts, DerivedPhenotypes, PhenotypeReference,
};
use crate::utils::species::{SpeciesContext, VirulenceSection};
use crate::utils::tsv::{read_result_set, HitRecord, ResultSet};

pub const AMR_UNAVAILABLE: &str = "AMR results unavailable";
pub const REFERENCE_UNAVAILABLE: &str = "Phenotype reference unavailable";

/// Outcome of reading one optional input. Errors degrade the owning section only.
pub type FieldResult<T> = Result<T, PipelineError>;

/// Locations of every file the reports are built from.
#[derive(Debug, Clone)]
pub struct ResultPaths {
    pub bacteria: PathBuf,
    pub bacteria_mapstat: PathBuf,
    pub amr: PathBuf,
    pub plasmid: PathBuf,
    pub virulence: PathBuf,
    pub phenotype_table: PathBuf,
    pub mlst: PathBuf,
}

impl ResultPaths {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            bacteria: config.result_path(KmaDatabase::Bacteria.output_stem(), RES_EXT),
            bacteria_mapstat: config.result_path(KmaDatabase::Bacteria.output_stem(), MAPSTAT_EXT),
            amr: config.result_path(KmaDatabase::Amr.output_stem(), RES_EXT),
            plasmid: config.result_path(KmaDatabase::Plasmid.output_stem(), RES_EXT),
            virulence: config.result_path(KmaDatabase::Virulence.output_stem(), RES_EXT),
            phenotype_table: config.phenotype_table(),
            mlst: config.mlst_results(),
        }
    }
}

#[derive(Debug)]
pub struct IsolateAnalysis {
    pub bacteria: FieldResult<ResultSet>,
    pub best_hit: Option<HitRecord>,
    pub species: SpeciesContext,
    pub amr: FieldResult<ResultSet>,
    pub plasmid: FieldResult<ResultSet>,
    pub reference: FieldResult<PhenotypeReference>,
    pub phenotypes: DerivedPhenotypes,
    pub class_counts: ClassQualityCounts,
    pub virulence: VirulenceSection,
    pub mlst: FieldResult<Option<String>>,
    pub mapstat: FieldResult<MapStat>,
}

impl IsolateAnalysis {
    /// Reads all result files once. Never fails: a missing or malformed file
    /// is kept as the error of its own field.
    ///
    /// # Arguments
    ///
    /// * `paths` - Result file locations.
    /// * `virulence_enabled` - Whether the virulence alignment was part of this run.
    pub fn load(paths: &ResultPaths, virulence_enabled: bool) -> Self {
        let bacteria = logged("bacteria alignment", read_result_set(&paths.bacteria));
        let best_hit = match &bacteria {
            Ok(set) => best_hit(set, SCORE_COL).cloned(),
            Err(_) => None,
        };
        let species = SpeciesContext::from_best_hit(best_hit.as_ref());
        match species.template_id() {
            Some(id) => info!("Best bacterial hit: {}", id),
            None => warn!("No bacteria alignment hits found"),
        }

        let amr = logged("AMR", read_result_set(&paths.amr));
        let plasmid = logged("plasmid", read_result_set(&paths.plasmid));
        let reference = logged("phenotype reference", PhenotypeReference::load(&paths.phenotype_table));

        let (phenotypes, class_counts) = match (&amr, &reference) {
            (Ok(amr), Ok(reference)) => (
                derive_phenotypes(amr, reference),
                class_quality_counts(amr, reference),
            ),
            _ => (DerivedPhenotypes::default(), ClassQualityCounts::new()),
        };

        let virulence = virulence_section(&species, virulence_enabled, paths);
        let mlst = logged("MLST", read_mlst_type(&paths.mlst));
        let mapstat = logged("mapstat", MapStat::parse(&paths.bacteria_mapstat));

        Self {
            bacteria,
            best_hit,
            species,
            amr,
            plasmid,
            reference,
            phenotypes,
            class_counts,
            virulence,
            mlst,
            mapstat,
        }
    }

    pub fn amr_count(&self) -> usize {
        self.amr.as_ref().map(ResultSet::len).unwrap_or(0)
    }

    pub fn plasmid_count(&self) -> usize {
        self.plasmid.as_ref().map(ResultSet::len).unwrap_or(0)
    }

    /// Derived phenotypes, or the reason they could not be derived. An empty
    /// set is only meaningful when both the AMR hits and the reference loaded.
    pub fn expected_phenotypes(&self) -> Result<&DerivedPhenotypes, String> {
        if let Err(e) = &self.amr {
            return Err(format!("{}: {}", AMR_UNAVAILABLE, e));
        }
        if let Err(e) = &self.reference {
            return Err(format!("{}: {}", REFERENCE_UNAVAILABLE, e));
        }
        Ok(&self.phenotypes)
    }

    /// Marks the section fed by a failed tool run as unavailable, replacing
    /// whatever was read from disk for it.
    pub fn record_tool_failure(&mut self, step: ToolStep, error: PipelineError) {
        match step {
            ToolStep::Kma(KmaDatabase::Bacteria) => {
                self.bacteria = Err(error);
                self.best_hit = None;
                self.species = SpeciesContext::from_best_hit(None);
                self.virulence = VirulenceSection::NotApplicable;
            }
            ToolStep::Kma(KmaDatabase::Amr) => {
                self.amr = Err(error);
                self.phenotypes = DerivedPhenotypes::default();
                self.class_counts = ClassQualityCounts::new();
            }
            ToolStep::Kma(KmaDatabase::Plasmid) => self.plasmid = Err(error),
            ToolStep::Kma(KmaDatabase::Virulence) => {
                if self.species.includes_virulence() {
                    self.virulence = VirulenceSection::Unavailable(error.to_string());
                }
            }
            ToolStep::Mlst => self.mlst = Err(error),
        }
    }
}

/// External steps whose output feeds exactly one report section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStep {
    Kma(KmaDatabase),
    Mlst,
}

/// Decides the virulence section from the species gate alone.
pub fn virulence_section(species: &SpeciesContext, enabled: bool, paths: &ResultPaths) -> VirulenceSection {
    if !species.includes_virulence() {
        return VirulenceSection::NotApplicable;
    }
    if !enabled {
        return VirulenceSection::Unavailable("virulence alignment was not run".to_string());
    }
    match read_result_set(&paths.virulence) {
        Ok(set) => VirulenceSection::Available(set),
        Err(e) => {
            warn!("Virulence results unavailable: {}", e);
            VirulenceSection::Unavailable(e.to_string())
        }
    }
}

fn logged<T>(what: &str, result: FieldResult<T>) -> FieldResult<T> {
    if let Err(e) = &result {
        warn!("{} results unavailable: {}", what, e);
    }
    result
}
