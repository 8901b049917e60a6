use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::config::defs::{
    KmaDatabase, PipelineError, RunConfig, KGT_MLST_TAG, KMA_TAG, MAPSTAT_EXT, MLST_DIR, RES_EXT, SCORE_COL,
    WEASYPRINT_TAG,
};
use crate::report::analysis::{IsolateAnalysis, ResultPaths, ToolStep};
use crate::report::html::HtmlTemplate;
use crate::report::pdf::{compose_pdf_report, DocumentRenderer, PdfRequest, TemplateRenderer, WeasyprintRenderer};
use crate::report::text::write_text_report;
use crate::utils::command::{check_version, generate_cli, presence_check, run_tool};
use crate::utils::file::{collect_fastq_inputs, merge_fastq_files};
use crate::utils::hits::best_hit;
use crate::utils::species::SpeciesContext;
use crate::utils::tsv::read_result_set;

/// What one run does besides the core alignments.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub run_tools: bool,
    pub virulence: bool,
    pub pdf: bool,
}

impl PipelineOptions {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            run_tools: !config.args.report_only,
            virulence: !config.args.no_virulence,
            pdf: !config.args.no_pdf,
        }
    }
}

#[derive(Debug)]
pub struct PipelineOutputs {
    pub text_report: PathBuf,
    pub pdf_report: Option<PathBuf>,
    pub analysis: IsolateAnalysis,
}

pub async fn run(config: Arc<RunConfig>) -> Result<(), PipelineError> {
    println!("\n-------------\n Isolate\n-------------\n");
    let options = PipelineOptions::from_config(&config);
    run_with(config, &options, &HtmlTemplate, &WeasyprintRenderer).await?;
    Ok(())
}

/// Full run with injectable renderers.
///
/// # Arguments
///
/// * `config` - RunConfig struct from main.
/// * `options` - Which optional steps run.
/// * `template` - Report data to HTML.
/// * `document` - HTML to PDF.
///
/// # Returns
/// Paths of the written reports and the analysis they were built from.
pub async fn run_with<T: TemplateRenderer, D: DocumentRenderer>(
    config: Arc<RunConfig>,
    options: &PipelineOptions,
    template: &T,
    document: &D,
) -> Result<PipelineOutputs, PipelineError> {
    let inputs = collect_fastq_inputs(&config.args.input)
        .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
    if inputs.is_empty() {
        return Err(PipelineError::InvalidConfig("No FASTQ input files found".to_string()));
    }
    let paths = ResultPaths::from_config(&config);

    let failures = if options.run_tools {
        run_alignments(&config, options, &inputs, &paths).await?
    } else {
        info!("Report only: using existing results in {}", config.out_dir.display());
        Vec::new()
    };

    let mut analysis = IsolateAnalysis::load(&paths, options.virulence);
    for (step, error) in failures {
        analysis.record_tool_failure(step, error);
    }
    debug!("Virulence hits: {}", analysis.virulence.hit_count());
    if let Err(e) = &analysis.bacteria {
        error!("No bacterial identification possible: {}", e);
    }

    let text_report = write_text_report(&config.out_dir, &config.run_name, &analysis)?;
    info!("Text report written to {}", text_report.display());

    let pdf_report = if options.pdf {
        match check_version(WEASYPRINT_TAG).await {
            Ok(version) => debug!("weasyprint {}", version),
            Err(e) => warn!("weasyprint check failed: {}", e),
        }
        let request = PdfRequest {
            run_name: config.run_name.clone(),
            out_dir: config.out_dir.clone(),
            inputs: pdf_inputs(&config, &inputs),
            logo: config.args.logo.as_ref().map(PathBuf::from),
        };
        compose_pdf_report(&request, &analysis, template, document).await
    } else {
        None
    };

    Ok(PipelineOutputs { text_report, pdf_report, analysis })
}

/// Merges reads and runs kma/kgt_mlst in order. Only a failure to prepare
/// the reads or a missing kma aborts. Every other tool failure is returned
/// so its section degrades instead of showing an older run's files.
async fn run_alignments(
    config: &RunConfig,
    options: &PipelineOptions,
    inputs: &[PathBuf],
    paths: &ResultPaths,
) -> Result<Vec<(ToolStep, PipelineError)>, PipelineError> {
    let merged = config.merged_reads();
    let bytes = merge_fastq_files(inputs, &merged)?;
    info!("Merged {} input file(s) ({} bytes) into {}", inputs.len(), bytes, merged.display());

    match check_version(KMA_TAG).await {
        Ok(version) => info!("kma {}", version),
        Err(e) => return Err(PipelineError::ToolExecution { tool: KMA_TAG.to_string(), error: e.to_string() }),
    }

    let mut failures = Vec::new();
    for db in [KmaDatabase::Bacteria, KmaDatabase::Amr, KmaDatabase::Plasmid] {
        if let Err(e) = run_kma(config, db).await {
            warn!("kma {} failed: {}", db.output_stem(), e);
            failures.push((ToolStep::Kma(db), e));
        }
    }

    let species = match read_result_set(&paths.bacteria) {
        Ok(set) => SpeciesContext::from_best_hit(best_hit(&set, SCORE_COL)),
        Err(_) => SpeciesContext::from_best_hit(None),
    };
    if species.includes_virulence() && options.virulence {
        if let Err(e) = run_kma(config, KmaDatabase::Virulence).await {
            warn!("kma {} failed: {}", KmaDatabase::Virulence.output_stem(), e);
            failures.push((ToolStep::Kma(KmaDatabase::Virulence), e));
        }
    } else {
        clear_outputs(&kma_outputs(config, KmaDatabase::Virulence))?;
        debug!("Skipping virulence alignment");
    }

    if let Err(e) = run_mlst(config, paths).await {
        warn!("MLST step failed: {}", e);
        failures.push((ToolStep::Mlst, e));
    }
    Ok(failures)
}

async fn run_kma(config: &RunConfig, db: KmaDatabase) -> Result<(), PipelineError> {
    clear_outputs(&kma_outputs(config, db))?;
    let args = generate_cli(KMA_TAG, config, Some(db))
        .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
    info!("Running kma against {}", db.db_stem());
    run_tool(KMA_TAG, &args).await
}

async fn run_mlst(config: &RunConfig, paths: &ResultPaths) -> Result<(), PipelineError> {
    std::fs::create_dir_all(config.out_dir.join(MLST_DIR))?;
    clear_outputs(std::slice::from_ref(&paths.mlst))?;
    presence_check(KGT_MLST_TAG).await?;
    let args = generate_cli(KGT_MLST_TAG, config, None)
        .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
    info!("Running {}", KGT_MLST_TAG);
    run_tool(KGT_MLST_TAG, &args).await
}

fn kma_outputs(config: &RunConfig, db: KmaDatabase) -> [PathBuf; 2] {
    [
        config.result_path(db.output_stem(), RES_EXT),
        config.result_path(db.output_stem(), MAPSTAT_EXT),
    ]
}

/// Removes results left by an earlier run in the same output directory.
fn clear_outputs(files: &[PathBuf]) -> Result<(), PipelineError> {
    for file in files {
        match std::fs::remove_file(file) {
            Ok(()) => debug!("Removed previous {}", file.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// The file whose name and size the PDF shows: the original input when there
/// is one, the merged reads otherwise.
fn pdf_inputs(config: &RunConfig, inputs: &[PathBuf]) -> Vec<PathBuf> {
    match inputs {
        [single] => vec![single.clone()],
        _ => vec![config.merged_reads()],
    }
}
