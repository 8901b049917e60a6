/// Functions and structs for working with creating command-line arguments

use std::process::Stdio;

use anyhow::{anyhow, Result};
use log::{debug, warn};
use tokio::process::Command;

use crate::config::defs::{KmaDatabase, PipelineError, RunConfig, KGT_MLST_TAG, KMA_TAG, TOOL_VERSIONS, WEASYPRINT_TAG};


pub mod kma {
    use anyhow::anyhow;
    use tokio::process::Command;
    use crate::cli::Technology;
    use crate::config::defs::{KmaDatabase, RunConfig, BACTERIA_MIN_IDENTITY, KMA_MIN_DEPTH, KMA_TAG};
    use crate::utils::streams::{read_child_output_to_vec, ChildStream};

    pub async fn kma_presence_check() -> anyhow::Result<String> {
        let mut child = Command::new(KMA_TAG)
            .arg("-v")
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| anyhow!("Failed to spawn: {}. Is kma installed?", e))?;

        let lines = read_child_output_to_vec(&mut child, ChildStream::Stdout).await?;
        child.wait().await?;
        let first_line = lines
            .first()
            .ok_or_else(|| anyhow!("No output from kma -v"))?;
        parse_version(first_line)
    }

    /// "KMA-1.4.14" -> "1.4.14"
    pub fn parse_version(line: &str) -> anyhow::Result<String> {
        let version = line
            .trim()
            .rsplit('-')
            .next()
            .ok_or_else(|| anyhow!("Invalid kma -v output: {}", line))?
            .to_string();
        if version.is_empty() {
            return Err(anyhow!("Empty version number in kma -v output: {}", line));
        }
        Ok(version)
    }

    pub fn arg_generator(config: &RunConfig, db: KmaDatabase) -> Vec<String> {
        let mut args_vec: Vec<String> = Vec::new();
        args_vec.push("-i".to_string());
        args_vec.push(config.merged_reads().to_string_lossy().to_string());
        args_vec.push("-o".to_string());
        args_vec.push(config.out_dir.join(db.output_stem()).to_string_lossy().to_string());
        args_vec.push("-t_db".to_string());
        args_vec.push(config.db_path(db).to_string_lossy().to_string());

        if db == KmaDatabase::Bacteria {
            args_vec.push("-ID".to_string());
            args_vec.push(BACTERIA_MIN_IDENTITY.to_string());
        }
        args_vec.push("-md".to_string());
        args_vec.push(KMA_MIN_DEPTH.to_string());

        if config.args.technology == Technology::Nanopore {
            args_vec.push("-ont".to_string());
        }
        if db == KmaDatabase::Bacteria {
            args_vec.push("-1t1".to_string());
        }

        args_vec
    }
}

pub mod kgt_mlst {
    use crate::config::defs::{RunConfig, KMA_MIN_DEPTH, MLST_DIR};

    pub fn arg_generator(config: &RunConfig) -> Vec<String> {
        let mut args_vec: Vec<String> = Vec::new();
        args_vec.push("-i".to_string());
        args_vec.push(config.merged_reads().to_string_lossy().to_string());
        args_vec.push("-o".to_string());
        args_vec.push(config.out_dir.join(MLST_DIR).to_string_lossy().to_string());
        args_vec.push("-db_dir".to_string());
        args_vec.push(config.args.db_dir.clone());
        args_vec.push("-md".to_string());
        args_vec.push(KMA_MIN_DEPTH.to_string());

        args_vec
    }
}

mod weasyprint {
    use anyhow::anyhow;
    use tokio::process::Command;
    use crate::config::defs::WEASYPRINT_TAG;
    use crate::utils::streams::{read_child_output_to_vec, ChildStream};

    pub async fn weasyprint_presence_check() -> anyhow::Result<String> {
        let mut child = Command::new(WEASYPRINT_TAG)
            .arg("--version")
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| anyhow!("Failed to spawn: {}. Is weasyprint installed?", e))?;

        let lines = read_child_output_to_vec(&mut child, ChildStream::Stdout).await?;
        child.wait().await?;
        let first_line = lines
            .first()
            .ok_or_else(|| anyhow!("No output from weasyprint --version"))?;
        let version = first_line
            .split_whitespace()
            .nth(2)
            .ok_or_else(|| anyhow!("Invalid weasyprint --version output: {}", first_line))?
            .to_string();
        Ok(version)
    }
}

pub fn generate_cli(tool: &str, config: &RunConfig, db: Option<KmaDatabase>) -> Result<Vec<String>> {
    let cmd = match tool {
        KMA_TAG => {
            let db = db.ok_or_else(|| anyhow!("kma requires a database"))?;
            kma::arg_generator(config, db)
        }
        KGT_MLST_TAG => kgt_mlst::arg_generator(config),
        _ => return Err(anyhow!("Unknown tool: {}", tool)),
    };

    Ok(cmd)
}


pub async fn check_version(tool: &str) -> Result<String> {
    let version = match tool {
        KMA_TAG => kma::kma_presence_check().await,
        WEASYPRINT_TAG => weasyprint::weasyprint_presence_check().await,
        _ => return Err(anyhow!("Unknown tool: {}", tool)),
    };
    let version = version?;
    if let Some(min) = TOOL_VERSIONS.get(tool) {
        let major_minor: Option<f32> = version
            .split('.')
            .take(2)
            .collect::<Vec<_>>()
            .join(".")
            .parse()
            .ok();
        match major_minor {
            Some(v) if v < *min => warn!("{} version {} is older than the tested {}", tool, version, min),
            None => debug!("Could not compare {} version {}", tool, version),
            _ => {}
        }
    }
    Ok(version)
}

/// Runs an external tool to completion.
///
/// # Arguments
///
/// * `tool` - Executable name.
/// * `args` - Arguments from `generate_cli`.
///
/// # Returns
/// Ok when the process exited successfully; its stderr otherwise.
pub async fn run_tool(tool: &str, args: &[String]) -> Result<(), PipelineError> {
    debug!("Running {} {}", tool, args.join(" "));
    let output = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| PipelineError::ToolExecution {
            tool: tool.to_string(),
            error: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(PipelineError::ToolExecution {
            tool: tool.to_string(),
            error: format!("{}: {}", output.status, String::from_utf8_lossy(&output.stderr).trim()),
        });
    }
    Ok(())
}

/// Spawns `tool` just to confirm it is on PATH.
pub async fn presence_check(tool: &str) -> Result<(), PipelineError> {
    let mut child = Command::new(tool)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| PipelineError::ToolExecution {
            tool: tool.to_string(),
            error: format!("{}. Is {} installed?", e, tool),
        })?;
    child.wait().await?;
    Ok(())
}
