use std::time::{Instant, SystemTime};
use std::{env, fs};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::DateTime;
use env_logger::Builder;
use log::{self, LevelFilter, error, info};
use isolate_pipelines::cli::{self, parse};
use isolate_pipelines::config::defs::{PipelineError, RunConfig};
use isolate_pipelines::pipelines::isolate;


#[tokio::main]
async fn main() -> Result<()> {
    let run_start = Instant::now();

    let args = parse();

    let log_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    println!("\n-------------\n Isolate Pipelines\n-------------\n");

    let dir = env::current_dir()?;
    info!("The current directory is {:?}\n", dir);

    let out_dir = setup_output_dir(&args, &dir)?;
    let run_name = args.name.clone().unwrap_or_else(|| dir_name(&out_dir));
    info!("Run '{}' writing to {:?}", run_name, out_dir);

    let run_config = Arc::new(RunConfig {
        cwd: dir,
        out_dir,
        run_name,
        args,
    });

    if let Err(e) = isolate_run(run_config).await {
        error!("Pipeline failed: {} at {} milliseconds.", e, run_start.elapsed().as_millis());
        std::process::exit(1);
    }

    println!("Run complete: {} milliseconds.", run_start.elapsed().as_millis());
    Ok(())
}


async fn isolate_run(run_config: Arc<RunConfig>) -> Result<(), PipelineError> {
    isolate::run(run_config).await
}

/// Sets up output directory
/// If `output` is specified from args, uses it;
/// otherwise, creates a directory named `<name>_YYYYMMDD`, where name is
/// `--name` or the first input's file stem.
/// Ensures the directory exists.
///
/// # Arguments
/// * `args` - The parsed command-line arguments.
/// * `cwd` - The current working directory.
/// # Returns
/// path to the output directory.
fn setup_output_dir(args: &cli::args::Arguments, cwd: &Path) -> Result<PathBuf> {
    let out_dir = match &args.output {
        Some(out) => {
            let path = PathBuf::from(out);
            if path.is_absolute() {
                path
            } else {
                cwd.join(path)
            }
        }
        None => {
            let dir_base = match (&args.name, args.input.first()) {
                (Some(name), _) => name.clone(),
                (None, Some(file)) => sample_base(Path::new(file)),
                (None, None) => return Err(anyhow::anyhow!("Input path required")),
            };

            let timestamp = SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .map(|secs| {
                    DateTime::from_timestamp(secs as i64, 0)
                        .map(|dt| dt.format("%Y%m%d").to_string())
                        .unwrap_or_else(|| "19700101".to_string())
                })
                .unwrap_or_else(|_| "19700101".to_string());
            cwd.join(format!("{}_{}", dir_base, timestamp))
        }
    };
    fs::create_dir_all(&out_dir)?;
    Ok(out_dir)
}

/// "reads/sample1.fastq.gz" -> "sample1"
fn sample_base(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "default_sample".to_string());
    let mut base = name.as_str();
    for ext in [".gz", ".fastq", ".fq"] {
        base = base.strip_suffix(ext).unwrap_or(base);
    }
    if base.is_empty() { "default_sample".to_string() } else { base.to_string() }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "isolate".to_string())
}
