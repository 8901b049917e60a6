// PDF report: data dictionary, enrichment and rendering with one degraded retry
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;
use tokio::process::Command;

use crate::config::defs::{
    COVERAGE_COL, DEPTH_COL, IDENTITY_COL, NO_SPECIES, NOT_AVAILABLE, PipelineError, SCORE_COL,
    TOOL_NAME, TOOL_VERSION, WEASYPRINT_TAG,
};
use crate::report::analysis::IsolateAnalysis;
use crate::utils::hits::MatchQuality;
use crate::utils::phenotype::DerivedPhenotypes;
use crate::utils::plotting::{captioned_chart, drug_class_chart};
use crate::utils::species::VirulenceSection;
use crate::utils::tsv::{HitRecord, ResultSet};

pub const PHENOTYPES_NOT_AVAILABLE: &str = "Expected phenotypes not available";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputStats {
    pub file_name: String,
    pub file_size: String,
    pub read_count: String,
    pub aligner_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesDetails {
    pub name: String,
    pub template: String,
    pub identity: String,
    pub coverage: String,
    pub depth: String,
    pub score: String,
    pub quality: MatchQuality,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedHit {
    pub template: String,
    pub identity: String,
    pub coverage: String,
    pub depth: String,
    pub quality: MatchQuality,
}

impl FormattedHit {
    pub fn from_record(record: &HitRecord) -> Self {
        Self {
            template: record.template_id().unwrap_or(NOT_AVAILABLE).to_string(),
            identity: record.display(IDENTITY_COL).to_string(),
            coverage: record.display(COVERAGE_COL).to_string(),
            depth: record.display(DEPTH_COL).to_string(),
            quality: MatchQuality::of_record(record),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportCounts {
    pub amr: usize,
    pub phenotypes: usize,
    pub plasmids: usize,
    pub virulence: usize,
}

/// Everything the report template consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportData {
    pub run_name: String,
    pub generated: String,
    pub tool_name: String,
    pub tool_version: String,
    pub logo_uri: Option<String>,
    pub input: InputStats,
    pub species_name: String,
    pub species: Option<SpeciesDetails>,
    pub counts: ReportCounts,
    pub mlst: String,
    pub amr_hits: Vec<FormattedHit>,
    pub plasmid_hits: Vec<FormattedHit>,
    pub show_virulence: bool,
    pub virulence_hits: Vec<FormattedHit>,
    pub virulence_note: Option<String>,
    pub phenotypes: Vec<String>,
    pub phenotypes_by_class: BTreeMap<String, Vec<String>>,
    /// Set when phenotypes could not be derived; replaces the phenotype lists.
    pub phenotype_note: Option<String>,
    pub chart_svg: String,
}

impl ReportData {
    /// Base dictionary every render starts from.
    pub fn defaults(run_name: &str) -> Self {
        Self {
            run_name: run_name.to_string(),
            generated: chrono::Local::now().format("%Y-%m-%d %H:%M").to_string(),
            tool_name: TOOL_NAME.to_string(),
            tool_version: TOOL_VERSION.to_string(),
            logo_uri: None,
            input: InputStats {
                file_name: NOT_AVAILABLE.to_string(),
                file_size: NOT_AVAILABLE.to_string(),
                read_count: NOT_AVAILABLE.to_string(),
                aligner_version: NOT_AVAILABLE.to_string(),
            },
            species_name: NO_SPECIES.to_string(),
            species: None,
            counts: ReportCounts::default(),
            mlst: NOT_AVAILABLE.to_string(),
            amr_hits: Vec::new(),
            plasmid_hits: Vec::new(),
            show_virulence: false,
            virulence_hits: Vec::new(),
            virulence_note: None,
            phenotypes: Vec::new(),
            phenotypes_by_class: BTreeMap::new(),
            phenotype_note: Some(PHENOTYPES_NOT_AVAILABLE.to_string()),
            chart_svg: drug_class_chart(&Default::default()),
        }
    }

    /// New dictionary with every populated override applied. `self` is untouched.
    pub fn merged(&self, o: ReportOverrides) -> Self {
        let base = self.clone();
        let amr_hits = o.amr_hits.unwrap_or(base.amr_hits);
        let plasmid_hits = o.plasmid_hits.unwrap_or(base.plasmid_hits);
        let (show_virulence, virulence_hits, virulence_note) = match o.virulence {
            Some(v) => (v.show, v.hits, v.note),
            None => (base.show_virulence, base.virulence_hits, base.virulence_note),
        };
        let (phenotypes, phenotypes_by_class, phenotype_note) = match o.phenotypes {
            Some(derived) => (
                derived.flat.into_iter().collect(),
                derived
                    .by_class
                    .into_iter()
                    .map(|(class, set)| (class, set.into_iter().collect()))
                    .collect(),
                None,
            ),
            None => (
                base.phenotypes,
                base.phenotypes_by_class,
                o.phenotype_note.or(base.phenotype_note),
            ),
        };
        let counts = ReportCounts {
            amr: amr_hits.len(),
            phenotypes: phenotypes.len(),
            plasmids: plasmid_hits.len(),
            virulence: virulence_hits.len(),
        };

        Self {
            run_name: base.run_name,
            generated: base.generated,
            tool_name: base.tool_name,
            tool_version: base.tool_version,
            logo_uri: o.logo_uri.or(base.logo_uri),
            input: InputStats {
                file_name: o.input_file_name.unwrap_or(base.input.file_name),
                file_size: o.input_file_size.unwrap_or(base.input.file_size),
                read_count: o.read_count.unwrap_or(base.input.read_count),
                aligner_version: o.aligner_version.unwrap_or(base.input.aligner_version),
            },
            species_name: o
                .species
                .as_ref()
                .map(|s| s.name.clone())
                .unwrap_or(base.species_name),
            species: o.species.or(base.species),
            counts,
            mlst: o.mlst.unwrap_or(base.mlst),
            amr_hits,
            plasmid_hits,
            show_virulence,
            virulence_hits,
            virulence_note,
            phenotypes,
            phenotypes_by_class,
            phenotype_note,
            chart_svg: o.chart_svg.unwrap_or(base.chart_svg),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VirulenceOverride {
    pub show: bool,
    pub hits: Vec<FormattedHit>,
    pub note: Option<String>,
}

/// Results of the individual enrichment steps; `None` keeps the default.
#[derive(Debug, Clone, Default)]
pub struct ReportOverrides {
    pub logo_uri: Option<String>,
    pub input_file_name: Option<String>,
    pub input_file_size: Option<String>,
    pub read_count: Option<String>,
    pub aligner_version: Option<String>,
    pub species: Option<SpeciesDetails>,
    pub mlst: Option<String>,
    pub amr_hits: Option<Vec<FormattedHit>>,
    pub plasmid_hits: Option<Vec<FormattedHit>>,
    pub virulence: Option<VirulenceOverride>,
    pub phenotypes: Option<DerivedPhenotypes>,
    pub phenotype_note: Option<String>,
    pub chart_svg: Option<String>,
}

impl ReportOverrides {
    /// Runs every enrichment step independently; a failing step only loses
    /// its own field.
    pub fn collect(analysis: &IsolateAnalysis, request: &PdfRequest) -> Self {
        let mapstat = analysis.mapstat.as_ref().ok();
        let (phenotypes, phenotype_note, chart_svg) = match analysis.expected_phenotypes() {
            Ok(derived) => (Some(derived.clone()), None, drug_class_chart(&analysis.class_counts)),
            Err(reason) => (None, Some(reason.clone()), captioned_chart(&reason)),
        };
        let input = request.inputs.first().map(PathBuf::as_path);
        Self {
            logo_uri: request.logo.as_deref().and_then(|p| step("logo", logo_uri(p))),
            input_file_name: input.and_then(|p| step("input file name", file_name(p))),
            input_file_size: input.and_then(|p| step("input file size", file_size(p))),
            read_count: mapstat.and_then(|m| m.fragment_count.clone()),
            aligner_version: mapstat.and_then(|m| m.version.clone()),
            species: analysis.best_hit.as_ref().and_then(|hit| {
                step("species details", species_details(hit, analysis.species.species_name()))
            }),
            mlst: analysis.mlst.as_ref().ok().and_then(|st| st.as_ref().map(|st| format!("ST{}", st))),
            amr_hits: analysis.amr.as_ref().ok().map(formatted),
            plasmid_hits: analysis.plasmid.as_ref().ok().map(formatted),
            virulence: Some(virulence_override(&analysis.virulence)),
            phenotypes,
            phenotype_note,
            chart_svg: Some(chart_svg),
        }
    }
}

fn step<T>(what: &str, result: Result<T, PipelineError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("PDF enrichment '{}' skipped: {}", what, e);
            None
        }
    }
}

fn logo_uri(path: &Path) -> Result<String, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::MissingInputFile(path.to_path_buf()));
    }
    let absolute = std::fs::canonicalize(path)?;
    Ok(format!("file://{}", absolute.display()))
}

fn file_name(path: &Path) -> Result<String, PipelineError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| PipelineError::MissingInputFile(path.to_path_buf()))
}

fn file_size(path: &Path) -> Result<String, PipelineError> {
    let bytes = std::fs::metadata(path)
        .map_err(|_| PipelineError::MissingInputFile(path.to_path_buf()))?
        .len();
    Ok(format!("{:.2} MB", bytes as f64 / 1_048_576.0))
}

fn species_details(hit: &HitRecord, name: Option<String>) -> Result<SpeciesDetails, PipelineError> {
    let template = hit
        .template_id()
        .ok_or_else(|| PipelineError::MissingField("#Template".to_string()))?;
    Ok(SpeciesDetails {
        name: name.unwrap_or_else(|| template.to_string()),
        template: template.to_string(),
        identity: hit.display(IDENTITY_COL).to_string(),
        coverage: hit.display(COVERAGE_COL).to_string(),
        depth: hit.display(DEPTH_COL).to_string(),
        score: hit.display(SCORE_COL).to_string(),
        quality: MatchQuality::of_record(hit),
    })
}

fn formatted(set: &ResultSet) -> Vec<FormattedHit> {
    set.iter().map(FormattedHit::from_record).collect()
}

fn virulence_override(section: &VirulenceSection) -> VirulenceOverride {
    match section {
        VirulenceSection::NotApplicable => VirulenceOverride { show: false, hits: Vec::new(), note: None },
        VirulenceSection::Unavailable(reason) => VirulenceOverride {
            show: true,
            hits: Vec::new(),
            note: Some(format!("No virulence data available ({})", reason)),
        },
        VirulenceSection::Available(set) => VirulenceOverride {
            show: true,
            hits: formatted(set),
            note: set.is_empty().then(|| "No virulence genes found".to_string()),
        },
    }
}

/// Turns the data dictionary into HTML.
pub trait TemplateRenderer {
    fn render(&self, data: &ReportData) -> Result<String, PipelineError>;
}

/// Turns an HTML file into a PDF file.
#[allow(async_fn_in_trait)]
pub trait DocumentRenderer {
    async fn render_pdf(&self, html_path: &Path, pdf_path: &Path) -> Result<(), PipelineError>;
}

/// Renders with the external `weasyprint` binary.
#[derive(Debug, Clone, Default)]
pub struct WeasyprintRenderer;

impl DocumentRenderer for WeasyprintRenderer {
    async fn render_pdf(&self, html_path: &Path, pdf_path: &Path) -> Result<(), PipelineError> {
        let output = Command::new(WEASYPRINT_TAG)
            .arg(html_path)
            .arg(pdf_path)
            .output()
            .await
            .map_err(|e| PipelineError::RenderingFailure(format!("Failed to spawn {}: {}. Is weasyprint installed?", WEASYPRINT_TAG, e)))?;
        if !output.status.success() {
            return Err(PipelineError::RenderingFailure(format!(
                "{} exited with {}: {}",
                WEASYPRINT_TAG,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PdfRequest {
    pub run_name: String,
    pub out_dir: PathBuf,
    pub inputs: Vec<PathBuf>,
    pub logo: Option<PathBuf>,
}

impl PdfRequest {
    pub fn pdf_path(&self) -> PathBuf {
        self.out_dir.join(format!("{}_report.pdf", self.run_name))
    }

    pub fn html_path(&self) -> PathBuf {
        self.out_dir.join(format!("{}_report.html", self.run_name))
    }

    pub fn json_path(&self) -> PathBuf {
        self.out_dir.join(format!("{}_report.json", self.run_name))
    }
}

/// Builds and renders the PDF report.
///
/// # Arguments
///
/// * `request` - Run name, output directory and optional inputs for enrichment.
/// * `analysis` - Derived aggregates shared with the text report.
/// * `template` - Data dictionary to HTML.
/// * `document` - HTML to PDF.
///
/// # Returns
/// Path to the PDF, or None when both the enriched and the default render
/// failed. Never an error: the run continues without a PDF.
pub async fn compose_pdf_report<T: TemplateRenderer, D: DocumentRenderer>(
    request: &PdfRequest,
    analysis: &IsolateAnalysis,
    template: &T,
    document: &D,
) -> Option<PathBuf> {
    let base = ReportData::defaults(&request.run_name);
    let enriched = base.merged(ReportOverrides::collect(analysis, request));

    match render_to_pdf(request, &enriched, template, document).await {
        Ok(path) => {
            info!("PDF report written to {}", path.display());
            return Some(path);
        }
        Err(e) => warn!("PDF rendering failed, retrying with default data: {}", e),
    }

    match render_to_pdf(request, &base, template, document).await {
        Ok(path) => {
            info!("Degraded PDF report written to {}", path.display());
            Some(path)
        }
        Err(e) => {
            warn!("No PDF produced: {}", e);
            None
        }
    }
}

async fn render_to_pdf<T: TemplateRenderer, D: DocumentRenderer>(
    request: &PdfRequest,
    data: &ReportData,
    template: &T,
    document: &D,
) -> Result<PathBuf, PipelineError> {
    let html = template.render(data)?;
    let html_path = request.html_path();
    tokio::fs::write(&html_path, html).await?;

    match serde_json::to_string_pretty(data) {
        Ok(json) => {
            if let Err(e) = tokio::fs::write(request.json_path(), json).await {
                warn!("Could not write report data: {}", e);
            }
        }
        Err(e) => warn!("Could not serialise report data: {}", e),
    }

    let pdf_path = request.pdf_path();
    debug!("Rendering {} -> {}", html_path.display(), pdf_path.display());
    document.render_pdf(&html_path, &pdf_path).await?;
    Ok(pdf_path)
}
