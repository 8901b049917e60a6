use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tempfile::{tempdir, TempDir};

use isolate_pipelines::cli::Arguments;
use isolate_pipelines::config::defs::{KmaDatabase, PipelineError, RunConfig};
use isolate_pipelines::pipelines::isolate::{run_with, PipelineOptions};
use isolate_pipelines::report::analysis::{
    IsolateAnalysis, ResultPaths, ToolStep, AMR_UNAVAILABLE, REFERENCE_UNAVAILABLE,
};
use isolate_pipelines::report::html::HtmlTemplate;
use isolate_pipelines::report::pdf::{compose_pdf_report, DocumentRenderer, PdfRequest};
use isolate_pipelines::report::text::{compose_text_report, NO_BEST_HIT, NO_PHENOTYPES, NO_VIRULENCE_DATA};
use isolate_pipelines::utils::species::VirulenceSection;

const RES_HEADER: &str = "#Template\tScore\tExpected\tTemplate_length\tTemplate_Identity\tTemplate_Coverage\tQuery_Identity\tQuery_Coverage\tDepth\tq_value\tp_value";
const PHENOTYPE_HEADER: &str = "Gene_accession no.\tClass\tPhenotype\tPMID";

const ECOLI: &str = "55.1_Escherichia coli_GCF_000005845";
const KLEBSIELLA: &str = "12.3_Klebsiella pneumoniae_GCF_000240185";

/// Writes a kma-style `.res` table with one row per (template, score, identity, coverage).
fn write_res(path: &Path, rows: &[(&str, &str, &str, &str)]) -> Result<()> {
    let mut text = format!("{}\n", RES_HEADER);
    for (template, score, identity, coverage) in rows {
        text.push_str(&format!(
            "{}\t{}\t100\t1000\t{}\t{}\t{}\t{}\t25.3\t900.1\t1.0e-26\n",
            template, score, identity, coverage, identity, coverage
        ));
    }
    fs::write(path, text)?;
    Ok(())
}

struct Fixture {
    _dir: TempDir,
    out_dir: PathBuf,
    paths: ResultPaths,
    reads: PathBuf,
    phenotypes: PathBuf,
}

fn fixture(species: Option<&str>) -> Result<Fixture> {
    let dir = tempdir()?;
    let out_dir = dir.path().join("run1");
    fs::create_dir_all(out_dir.join("mlst"))?;

    let reads = dir.path().join("sample1.fastq");
    fs::write(&reads, "@r1\nACGT\n+\nIIII\n")?;

    let phenotypes = dir.path().join("phenotypes.txt");
    fs::write(
        &phenotypes,
        format!(
            "{}\nblaTEM-1B_1_AY458016\tBeta-lactam\tAmoxicillin, Ampicillin\t-\naac(3)-IId_1_EU022314\tAminoglycoside\tGentamicin,Tobramycin\t-\n",
            PHENOTYPE_HEADER
        ),
    )?;

    let bacteria = out_dir.join("bacteria_alignment.res");
    match species {
        Some(template) => write_res(
            &bacteria,
            &[("3.2_Shigella flexneri_GCF_000006925", "8000", "98.10", "97.00"), (template, "12000", "99.87", "100.00")],
        )?,
        None => write_res(&bacteria, &[])?,
    }
    fs::write(
        out_dir.join("bacteria_alignment.mapstat"),
        "## method\tKMA\n## version\t1.4.14\n## database\tbac_db\n## fragmentCount\t48213\n## date\t2026-10-19\n# refSequence\treadCount\n",
    )?;

    write_res(
        &out_dir.join("amr.res"),
        &[("blaTEM-1B_1_AY458016", "1800", "100.00", "100.00"), ("aac(3)-IId_1_EU022314", "1500", "99.50", "100.00")],
    )?;
    write_res(&out_dir.join("plasmid.res"), &[("IncFIB(AP001918)_1", "1100", "98.39", "100.00")])?;
    fs::write(out_dir.join("mlst").join("mlst_results.tsv"), "Sample\tST\tadk\tfumC\nrun1\t131\t53\t40\n")?;

    let config = run_config(&out_dir, &reads, &phenotypes, true);
    let paths = ResultPaths::from_config(&config);
    Ok(Fixture { _dir: dir, out_dir, paths, reads, phenotypes })
}

fn run_config(out_dir: &Path, reads: &Path, phenotypes: &Path, report_only: bool) -> RunConfig {
    RunConfig {
        cwd: out_dir.parent().map(Path::to_path_buf).unwrap_or_default(),
        out_dir: out_dir.to_path_buf(),
        run_name: "run1".to_string(),
        args: Arguments {
            input: vec![reads.to_string_lossy().to_string()],
            db_dir: "/nonexistent/db".to_string(),
            phenotype_table: Some(phenotypes.to_string_lossy().to_string()),
            report_only,
            ..Default::default()
        },
    }
}

struct CopyRenderer;

impl DocumentRenderer for CopyRenderer {
    async fn render_pdf(&self, html_path: &Path, pdf_path: &Path) -> Result<(), PipelineError> {
        fs::copy(html_path, pdf_path)?;
        Ok(())
    }
}

struct FailingRenderer;

impl DocumentRenderer for FailingRenderer {
    async fn render_pdf(&self, _html_path: &Path, _pdf_path: &Path) -> Result<(), PipelineError> {
        Err(PipelineError::RenderingFailure("renderer unavailable".to_string()))
    }
}

#[test]
fn test_load_klebsiella_isolate() -> Result<()> {
    let fx = fixture(Some(KLEBSIELLA))?;
    let analysis = IsolateAnalysis::load(&fx.paths, true);

    assert_eq!(analysis.species.template_id(), Some(KLEBSIELLA));
    assert_eq!(analysis.species.species_name().as_deref(), Some("Klebsiella pneumoniae"));
    assert!(!analysis.species.includes_virulence());
    assert_eq!(analysis.virulence, VirulenceSection::NotApplicable);
    assert_eq!(analysis.amr_count(), 2);
    assert_eq!(analysis.plasmid_count(), 1);
    assert_eq!(analysis.mlst.as_ref().ok().cloned().flatten().as_deref(), Some("131"));
    let mapstat = analysis.mapstat.as_ref().map_err(|e| anyhow::anyhow!("{}", e))?;
    assert_eq!(mapstat.fragment_count.as_deref(), Some("48213"));
    assert_eq!(mapstat.version.as_deref(), Some("1.4.14"));

    let flat: Vec<&str> = analysis.phenotypes.flat.iter().map(String::as_str).collect();
    assert_eq!(flat, vec!["Amoxicillin", "Ampicillin", "Gentamicin", "Tobramycin"]);
    assert_eq!(analysis.class_counts.len(), 2);
    Ok(())
}

#[test]
fn test_text_report_without_matching_phenotypes() -> Result<()> {
    let fx = fixture(Some(KLEBSIELLA))?;
    write_res(&fx.out_dir.join("amr.res"), &[("sul2_2_AY034138", "900", "100.00", "100.00")])?;
    let analysis = IsolateAnalysis::load(&fx.paths, true);

    let report = compose_text_report("run1", &analysis)?;
    assert!(report.starts_with("Isolate Analysis Report: run1\n"));
    assert!(report.contains("Template: sul2_2_AY034138"));
    assert!(report.contains(NO_PHENOTYPES));
    assert!(!report.contains("Virulence Factors"));
    Ok(())
}

#[test]
fn test_text_report_section_order() -> Result<()> {
    let fx = fixture(Some(KLEBSIELLA))?;
    let analysis = IsolateAnalysis::load(&fx.paths, true);
    let report = compose_text_report("run1", &analysis)?;

    let order = [
        "Best Bacterial Alignment Hit",
        "Antimicrobial Resistance Genes",
        "Plasmids",
        "Expected Phenotypes",
    ];
    let positions: Vec<usize> = order
        .iter()
        .map(|title| report.find(title).unwrap_or(usize::MAX))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "sections out of order: {:?}", positions);
    assert!(report.contains(&format!("Template: {}", KLEBSIELLA)));
    assert!(report.contains("  Beta-lactam: Amoxicillin, Ampicillin"));
    Ok(())
}

#[test]
fn test_text_report_without_bacteria_hits() -> Result<()> {
    let fx = fixture(None)?;
    let analysis = IsolateAnalysis::load(&fx.paths, true);
    assert!(analysis.best_hit.is_none());

    let report = compose_text_report("run1", &analysis)?;
    assert!(report.contains(NO_BEST_HIT));
    assert!(report.contains("Antimicrobial Resistance Genes"));
    assert!(!report.contains("Virulence Factors"));
    Ok(())
}

#[test]
fn test_ecoli_virulence_present_and_missing() -> Result<()> {
    let fx = fixture(Some(ECOLI))?;

    let missing = IsolateAnalysis::load(&fx.paths, true);
    assert!(missing.species.includes_virulence());
    assert!(matches!(missing.virulence, VirulenceSection::Unavailable(_)));
    let report = compose_text_report("run1", &missing)?;
    assert!(report.contains("Virulence Factors"));
    assert!(report.contains(NO_VIRULENCE_DATA));

    write_res(&fx.out_dir.join("virulence.res"), &[("stx2A_1_AB030484", "700", "100.00", "100.00")])?;
    let present = IsolateAnalysis::load(&fx.paths, true);
    assert_eq!(present.virulence.hit_count(), 1);
    let report = compose_text_report("run1", &present)?;
    assert!(report.contains("Template: stx2A_1_AB030484"));
    assert!(!report.contains(NO_VIRULENCE_DATA));
    Ok(())
}

#[test]
fn test_missing_amr_does_not_hide_other_sections() -> Result<()> {
    let fx = fixture(Some(KLEBSIELLA))?;
    fs::remove_file(fx.out_dir.join("amr.res"))?;
    let analysis = IsolateAnalysis::load(&fx.paths, true);

    assert!(analysis.amr.is_err());
    assert!(analysis.phenotypes.is_empty());
    let report = compose_text_report("run1", &analysis)?;
    assert!(report.contains(AMR_UNAVAILABLE));
    assert!(report.contains("Template: IncFIB(AP001918)_1"));
    assert!(!report.contains(NO_PHENOTYPES));
    Ok(())
}

#[tokio::test]
async fn test_missing_phenotype_reference_is_reported() -> Result<()> {
    let fx = fixture(Some(KLEBSIELLA))?;
    fs::remove_file(&fx.phenotypes)?;
    let analysis = IsolateAnalysis::load(&fx.paths, true);

    assert_eq!(analysis.amr_count(), 2);
    assert!(analysis.reference.is_err());
    assert!(analysis.expected_phenotypes().is_err());

    let report = compose_text_report("run1", &analysis)?;
    let phenotypes = report
        .split("Expected Phenotypes")
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("phenotype section missing"))?;
    assert!(phenotypes.contains(REFERENCE_UNAVAILABLE));
    assert!(!report.contains(NO_PHENOTYPES));

    let request = PdfRequest {
        run_name: "run1".to_string(),
        out_dir: fx.out_dir.clone(),
        inputs: vec![fx.reads.clone()],
        logo: None,
    };
    let pdf = compose_pdf_report(&request, &analysis, &HtmlTemplate, &CopyRenderer)
        .await
        .ok_or_else(|| anyhow::anyhow!("no pdf produced"))?;
    let html = fs::read_to_string(&pdf)?;
    assert!(html.contains(REFERENCE_UNAVAILABLE));
    assert!(html.contains("blaTEM-1B_1_AY458016"));
    assert!(!html.contains("No phenotypes expected based on AMR genes."));
    Ok(())
}

#[tokio::test]
async fn test_ecoli_with_virulence_disabled() -> Result<()> {
    let fx = fixture(Some(ECOLI))?;
    write_res(&fx.out_dir.join("virulence.res"), &[("stx2A_1_AB030484", "700", "100.00", "100.00")])?;
    let analysis = IsolateAnalysis::load(&fx.paths, false);

    assert!(analysis.species.includes_virulence());
    assert_eq!(
        analysis.virulence,
        VirulenceSection::Unavailable("virulence alignment was not run".to_string())
    );

    let report = compose_text_report("run1", &analysis)?;
    assert!(report.contains("Virulence Factors"));
    assert!(report.contains("No virulence data available (virulence alignment was not run)."));
    assert!(!report.contains("stx2A_1_AB030484"));

    let request = PdfRequest {
        run_name: "run1".to_string(),
        out_dir: fx.out_dir.clone(),
        inputs: vec![fx.reads.clone()],
        logo: None,
    };
    compose_pdf_report(&request, &analysis, &HtmlTemplate, &CopyRenderer)
        .await
        .ok_or_else(|| anyhow::anyhow!("no pdf produced"))?;
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(request.json_path())?)?;
    assert_eq!(json["show_virulence"], true);
    assert_eq!(json["counts"]["virulence"], 0);
    assert_eq!(json["virulence_note"], "No virulence data available (virulence alignment was not run)");
    let html = fs::read_to_string(request.html_path())?;
    assert!(html.contains("Virulence Factors"));
    Ok(())
}

#[test]
fn test_failed_bacteria_alignment_discards_files_on_disk() -> Result<()> {
    let fx = fixture(Some(ECOLI))?;
    let mut analysis = IsolateAnalysis::load(&fx.paths, true);
    assert!(analysis.best_hit.is_some());

    let failure = |db: &str| PipelineError::ToolExecution { tool: "kma".to_string(), error: format!("{} exited with 1", db) };
    analysis.record_tool_failure(ToolStep::Kma(KmaDatabase::Bacteria), failure("bacteria"));
    analysis.record_tool_failure(ToolStep::Kma(KmaDatabase::Plasmid), failure("plasmid"));
    analysis.record_tool_failure(ToolStep::Mlst, failure("mlst"));

    assert!(analysis.best_hit.is_none());
    assert_eq!(analysis.virulence, VirulenceSection::NotApplicable);
    assert!(analysis.mlst.is_err());
    let report = compose_text_report("run1", &analysis)?;
    assert!(report.contains(NO_BEST_HIT));
    assert!(report.contains("bacteria exited with 1"));
    assert!(report.contains("Plasmid results unavailable"));
    assert!(!report.contains(ECOLI));
    assert!(!report.contains("Virulence Factors"));
    Ok(())
}

#[tokio::test]
async fn test_pdf_report_with_html_template() -> Result<()> {
    let fx = fixture(Some(ECOLI))?;
    write_res(&fx.out_dir.join("virulence.res"), &[("stx2A_1_AB030484", "700", "100.00", "100.00")])?;
    let analysis = IsolateAnalysis::load(&fx.paths, true);
    let request = PdfRequest {
        run_name: "run1".to_string(),
        out_dir: fx.out_dir.clone(),
        inputs: vec![fx.reads.clone()],
        logo: None,
    };

    let pdf = compose_pdf_report(&request, &analysis, &HtmlTemplate, &CopyRenderer)
        .await
        .ok_or_else(|| anyhow::anyhow!("no pdf produced"))?;
    let html = fs::read_to_string(&pdf)?;
    assert!(html.contains("Escherichia coli"));
    assert!(html.contains("ST131"));
    assert!(html.contains("stx2A_1_AB030484"));
    assert!(html.contains("<svg"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(request.json_path())?)?;
    assert_eq!(json["counts"]["amr"], 2);
    assert_eq!(json["input"]["file_name"], "sample1.fastq");
    assert_eq!(json["input"]["read_count"], "48213");
    Ok(())
}

#[tokio::test]
async fn test_pdf_report_renderer_failure_is_not_fatal() -> Result<()> {
    let fx = fixture(Some(KLEBSIELLA))?;
    let analysis = IsolateAnalysis::load(&fx.paths, true);
    let request = PdfRequest {
        run_name: "run1".to_string(),
        out_dir: fx.out_dir.clone(),
        inputs: Vec::new(),
        logo: None,
    };
    assert!(compose_pdf_report(&request, &analysis, &HtmlTemplate, &FailingRenderer).await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_report_only_run() -> Result<()> {
    let fx = fixture(Some(KLEBSIELLA))?;
    let config = Arc::new(run_config(&fx.out_dir, &fx.reads, &fx.phenotypes, true));
    let options = PipelineOptions::from_config(&config);
    assert!(!options.run_tools);

    let outputs = run_with(config, &options, &HtmlTemplate, &CopyRenderer).await?;
    assert_eq!(outputs.text_report, fx.out_dir.join("report.txt"));
    let text = fs::read_to_string(&outputs.text_report)?;
    assert!(text.contains(KLEBSIELLA));
    assert_eq!(outputs.pdf_report, Some(fx.out_dir.join("run1_report.pdf")));
    assert!(fx.out_dir.join("run1_report.html").exists());
    Ok(())
}

#[tokio::test]
async fn test_report_only_run_without_bacteria_results() -> Result<()> {
    let fx = fixture(Some(KLEBSIELLA))?;
    fs::remove_file(fx.out_dir.join("bacteria_alignment.res"))?;
    let config = Arc::new(run_config(&fx.out_dir, &fx.reads, &fx.phenotypes, true));
    let options = PipelineOptions { pdf: false, ..PipelineOptions::from_config(&config) };

    let outputs = run_with(config, &options, &HtmlTemplate, &FailingRenderer).await?;
    assert!(outputs.pdf_report.is_none());
    assert!(outputs.analysis.bacteria.is_err());
    let text = fs::read_to_string(&outputs.text_report)?;
    assert!(text.contains(NO_BEST_HIT));
    Ok(())
}
