use std::path::PathBuf;
use crate::cli::Arguments;
use lazy_static::lazy_static;
use std::collections::HashMap;
use thiserror::Error;

// External software
pub const GZIP_EXT: &str = "gz";
pub const KMA_TAG: &str = "kma";
pub const KGT_MLST_TAG: &str = "kgt_mlst";
pub const WEASYPRINT_TAG: &str = "weasyprint";

pub const TOOL_NAME: &str = env!("CARGO_PKG_NAME");
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

lazy_static! {
    pub static ref TOOL_VERSIONS: HashMap<&'static str, f32> = {
        let mut m = HashMap::new();
        m.insert(KMA_TAG, 1.4);
        m.insert(WEASYPRINT_TAG, 63.0);

        m
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KmaDatabase {
    Bacteria,
    Amr,
    Plasmid,
    Virulence,
}

impl KmaDatabase {
    /// Directory and index stem under `--db_dir`.
    pub fn db_stem(&self) -> &'static str {
        match self {
            KmaDatabase::Bacteria => "bac_db",
            KmaDatabase::Amr => "resfinder_db",
            KmaDatabase::Plasmid => "plasmid_db",
            KmaDatabase::Virulence => "virulence_db",
        }
    }

    /// Output prefix inside the run directory; kma appends `.res`/`.mapstat`.
    pub fn output_stem(&self) -> &'static str {
        match self {
            KmaDatabase::Bacteria => BACTERIA_STEM,
            KmaDatabase::Amr => AMR_STEM,
            KmaDatabase::Plasmid => PLASMID_STEM,
            KmaDatabase::Virulence => VIRULENCE_STEM,
        }
    }
}

// Static Filenames
pub const BACTERIA_STEM: &str = "bacteria_alignment";
pub const AMR_STEM: &str = "amr";
pub const PLASMID_STEM: &str = "plasmid";
pub const VIRULENCE_STEM: &str = "virulence";
pub const MLST_DIR: &str = "mlst";
pub const MLST_RESULTS: &str = "mlst_results.tsv";
pub const MERGED_READS: &str = "merged_reads.fastq.gz";
pub const RES_EXT: &str = "res";
pub const MAPSTAT_EXT: &str = "mapstat";
pub const TEXT_REPORT: &str = "report.txt";
pub const PHENOTYPE_TABLE: &str = "phenotypes.txt";

// Result table columns
pub const TEMPLATE_COL: &str = "#Template";
pub const SCORE_COL: &str = "Score";
pub const IDENTITY_COL: &str = "Template_Identity";
pub const COVERAGE_COL: &str = "Template_Coverage";
pub const DEPTH_COL: &str = "Depth";
pub const ACCESSION_COL: &str = "Gene_accession no.";
pub const PHENOTYPE_COL: &str = "Phenotype";
pub const CLASS_COL: &str = "Class";

// mapstat markers
pub const FRAGMENT_COUNT_MARKER: &str = "## fragmentCount";
pub const VERSION_MARKER: &str = "## version";

// Static Parameters
pub const TARGET_ORGANISM: &str = "Escherichia coli";
pub const FULL_MATCH_PCT: f64 = 100.0;
pub const BACTERIA_MIN_IDENTITY: usize = 75;
pub const KMA_MIN_DEPTH: usize = 5;
pub const NOT_AVAILABLE: &str = "N/A";
pub const NO_SPECIES: &str = "No species identified";

pub const FASTQ_EXTS: &[&'static str] = &["fastq", "fq"];


#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing input file: {}", .0.display())]
    MissingInputFile(PathBuf),

    #[error("Malformed table {} at line {line}: expected {expected} fields, found {found}", path.display())]
    MalformedTable {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Unparseable field '{field}': '{value}'")]
    UnparseableField {
        field: String,
        value: String,
    },

    #[error("Missing field '{0}'")]
    MissingField(String),

    #[error("Rendering failed: {0}")]
    RenderingFailure(String),

    #[error("Tool execution failed: {tool}: {error}")]
    ToolExecution {
        tool: String,
        error: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::IOError(e.to_string())
    }
}


pub struct RunConfig  {
    pub cwd: PathBuf,
    pub out_dir: PathBuf,
    pub run_name: String,
    pub args: Arguments
}

impl RunConfig {
    /// `<out_dir>/<stem>.<ext>`
    pub fn result_path(&self, stem: &str, ext: &str) -> PathBuf {
        self.out_dir.join(format!("{}.{}", stem, ext))
    }

    pub fn db_path(&self, db: KmaDatabase) -> PathBuf {
        PathBuf::from(&self.args.db_dir).join(db.db_stem()).join(db.db_stem())
    }

    /// Reference table mapping resfinder accessions to phenotypes.
    pub fn phenotype_table(&self) -> PathBuf {
        match &self.args.phenotype_table {
            Some(table) => PathBuf::from(table),
            None => PathBuf::from(&self.args.db_dir)
                .join(KmaDatabase::Amr.db_stem())
                .join(PHENOTYPE_TABLE),
        }
    }

    pub fn mlst_results(&self) -> PathBuf {
        self.out_dir.join(MLST_DIR).join(MLST_RESULTS)
    }

    pub fn merged_reads(&self) -> PathBuf {
        self.out_dir.join(MERGED_READS)
    }
}
