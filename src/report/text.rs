// Plain-text report written to report.txt
use std::fmt::{self, Write as FmtWrite};
use std::path::{Path, PathBuf};

use crate::config::defs::{COVERAGE_COL, DEPTH_COL, IDENTITY_COL, NOT_AVAILABLE, PipelineError, TEXT_REPORT};
use crate::report::analysis::{FieldResult, IsolateAnalysis, AMR_UNAVAILABLE};
use crate::utils::phenotype::DerivedPhenotypes;
use crate::utils::species::VirulenceSection;
use crate::utils::tsv::{HitRecord, ResultSet};

const RULE: &str = "==================================================";
const SUB_RULE: &str = "--------------------------------------------------";

pub const NO_BEST_HIT: &str = "No bacteria alignment hits found.";
pub const NO_PHENOTYPES: &str = "No phenotypes expected based on AMR genes.";
pub const NO_VIRULENCE_DATA: &str = "No virulence data available";

/// Builds the text report. Sections always appear in the same order; the
/// virulence section only for the target organism.
pub fn compose_text_report(run_name: &str, analysis: &IsolateAnalysis) -> Result<String, PipelineError> {
    let mut out = String::new();
    write_report(&mut out, run_name, analysis)
        .map_err(|e| PipelineError::RenderingFailure(format!("text report: {}", e)))?;
    Ok(out)
}

/// Writes `report.txt` into `out_dir`.
pub fn write_text_report(out_dir: &Path, run_name: &str, analysis: &IsolateAnalysis) -> Result<PathBuf, PipelineError> {
    let path = out_dir.join(TEXT_REPORT);
    std::fs::write(&path, compose_text_report(run_name, analysis)?)?;
    Ok(path)
}

fn write_report<W: FmtWrite>(out: &mut W, run_name: &str, analysis: &IsolateAnalysis) -> fmt::Result {
    writeln!(out, "Isolate Analysis Report: {}", run_name)?;
    writeln!(out, "{}\n", RULE)?;

    section(out, "Best Bacterial Alignment Hit")?;
    match &analysis.best_hit {
        Some(hit) => hit_block(out, hit)?,
        None => {
            writeln!(out, "{}", NO_BEST_HIT)?;
            if let Err(e) = &analysis.bacteria {
                writeln!(out, "({})", e)?;
            }
        }
    }
    writeln!(out)?;

    section(out, "Antimicrobial Resistance Genes")?;
    table_section(out, &analysis.amr, "No AMR genes found.", AMR_UNAVAILABLE)?;

    section(out, "Plasmids")?;
    table_section(out, &analysis.plasmid, "No plasmids found.", "Plasmid results unavailable")?;

    section(out, "Expected Phenotypes")?;
    match analysis.expected_phenotypes() {
        Err(reason) => writeln!(out, "{}", reason)?,
        Ok(derived) if derived.is_empty() => writeln!(out, "{}", NO_PHENOTYPES)?,
        Ok(derived) => phenotype_lists(out, derived)?,
    }
    writeln!(out)?;

    if analysis.species.includes_virulence() {
        section(out, "Virulence Factors")?;
        match &analysis.virulence {
            VirulenceSection::Available(set) => table_body(out, set, "No virulence genes found.")?,
            VirulenceSection::Unavailable(reason) => writeln!(out, "{} ({}).\n", NO_VIRULENCE_DATA, reason)?,
            VirulenceSection::NotApplicable => writeln!(out, "{}.\n", NO_VIRULENCE_DATA)?,
        }
    }

    Ok(())
}

fn phenotype_lists<W: FmtWrite>(out: &mut W, derived: &DerivedPhenotypes) -> fmt::Result {
    for phenotype in &derived.flat {
        writeln!(out, "- {}", phenotype)?;
    }
    writeln!(out, "\nBy drug class:")?;
    for (class, phenotypes) in &derived.by_class {
        let joined: Vec<&str> = phenotypes.iter().map(String::as_str).collect();
        writeln!(out, "  {}: {}", class, joined.join(", "))?;
    }
    Ok(())
}

fn section<W: FmtWrite>(out: &mut W, title: &str) -> fmt::Result {
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", SUB_RULE)
}

fn hit_block<W: FmtWrite>(out: &mut W, hit: &HitRecord) -> fmt::Result {
    writeln!(out, "Template: {}", hit.template_id().unwrap_or(NOT_AVAILABLE))?;
    writeln!(out, "Identity: {}", hit.display(IDENTITY_COL))?;
    writeln!(out, "Coverage: {}", hit.display(COVERAGE_COL))?;
    writeln!(out, "Depth: {}", hit.display(DEPTH_COL))
}

fn table_section<W: FmtWrite>(out: &mut W, set: &FieldResult<ResultSet>, empty: &str, unavailable: &str) -> fmt::Result {
    match set {
        Ok(set) => table_body(out, set, empty),
        Err(e) => writeln!(out, "{}: {}\n", unavailable, e),
    }
}

fn table_body<W: FmtWrite>(out: &mut W, set: &ResultSet, empty: &str) -> fmt::Result {
    if set.is_empty() {
        return writeln!(out, "{}\n", empty);
    }
    for hit in set {
        hit_block(out, hit)?;
        writeln!(out)?;
    }
    Ok(())
}
