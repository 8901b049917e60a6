use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;

use crate::config::defs::{FASTQ_EXTS, GZIP_EXT};

pub fn is_gzipped(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let mut buffer = [0u8; 2];
    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1F, 0x8B]), // Gzip magic bytes
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Opens a plain or gzipped file for reading.
pub fn open_maybe_gzipped(path: &Path) -> io::Result<Box<dyn Read>> {
    let file = File::open(path)?;
    if is_gzipped(path)? {
        Ok(Box::new(MultiGzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Concatenates FASTQ files into a single gzipped FASTQ.
///
/// # Arguments
///
/// * `inputs` - Plain or gzipped FASTQ files, in order.
/// * `output` - Destination `.fastq.gz`.
///
/// # Returns
/// Number of uncompressed bytes written.
pub fn merge_fastq_files(inputs: &[PathBuf], output: &Path) -> io::Result<u64> {
    if inputs.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "No FASTQ files to merge"));
    }
    let mut encoder = GzEncoder::new(BufWriter::new(File::create(output)?), Compression::default());
    let mut total = 0u64;
    for input in inputs {
        let mut reader = open_maybe_gzipped(input)?;
        let written = io::copy(&mut reader, &mut encoder)?;
        debug!("Merged {} ({} bytes)", input.display(), written);
        total += written;
    }
    encoder.finish()?.flush()?;
    Ok(total)
}

/// Expands directories into the FASTQ files they contain, sorted by name.
pub fn collect_fastq_inputs(inputs: &[String]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = PathBuf::from(input);
        if path.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(&path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_fastq_name(p))
                .collect();
            found.sort();
            files.extend(found);
        } else if path.exists() {
            files.push(path);
        } else {
            return Err(io::Error::new(io::ErrorKind::NotFound, format!("Input not found: {}", input)));
        }
    }
    Ok(files)
}

fn is_fastq_name(path: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy().to_lowercase()).unwrap_or_default();
    let name = name.strip_suffix(&format!(".{}", GZIP_EXT)).unwrap_or(name.as_str());
    FASTQ_EXTS.iter().any(|ext| name.ends_with(&format!(".{}", ext)))
}
