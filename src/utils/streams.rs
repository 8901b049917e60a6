// src/utils/streams.rs: child process output handling
use anyhow::{anyhow, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChildStream {
    Stdout,
    Stderr,
}

/// Collects a child's stdout or stderr line by line until EOF.
///
/// # Arguments
///
/// * `child` - Spawned process with the requested stream piped.
/// * `stream` - Which stream to drain.
///
/// # Returns
/// Vector of lines, without line endings.
pub async fn read_child_output_to_vec(child: &mut Child, stream: ChildStream) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    match stream {
        ChildStream::Stdout => {
            let stdout = child.stdout.take().ok_or_else(|| anyhow!("Child stdout not piped"))?;
            let mut reader = BufReader::new(stdout).lines();
            while let Some(line) = reader.next_line().await? {
                lines.push(line);
            }
        }
        ChildStream::Stderr => {
            let stderr = child.stderr.take().ok_or_else(|| anyhow!("Child stderr not piped"))?;
            let mut reader = BufReader::new(stderr).lines();
            while let Some(line) = reader.next_line().await? {
                lines.push(line);
            }
        }
    }
    Ok(lines)
}
