use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, ValueEnum, Default, PartialEq)]
pub enum Technology {
    #[default]
    Nanopore,
    Illumina,
}

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "isolate-pipelines", version, about = "Bacterial isolate typing and reporting")]
pub struct Arguments {

    #[arg(short = 'i', long = "input", num_args = 1.., required = true, help = "One or more FASTQ files (plain or gzipped). Multiple files are merged before alignment.")]
    pub input: Vec<String>,

    #[arg(short = 'o', long = "output", help = "Output directory for all generated files. If not specified, a directory named '<name>_YYYYMMDD' will be created in the current working directory.")]
    pub output: Option<String>,

    #[arg(short = 'n', long = "name", help = "Run name used in report titles and the PDF file name. Defaults to the output directory name.")]
    pub name: Option<String>,

    #[arg(short = 'd', long = "db_dir", default_value = "/opt/cge/db")]
    pub db_dir: String,

    #[arg(long = "technology", default_value = "nanopore", value_enum)]
    pub technology: Technology,

    #[arg(long, help = "Optional phenotype reference table; defaults to <db_dir>/resfinder_db/phenotypes.txt")]
    pub phenotype_table: Option<String>,

    #[arg(long, help = "Optional logo image embedded in the PDF header")]
    pub logo: Option<String>,

    #[arg(long, default_value_t = false, help = "Skip the virulence alignment even for E. coli")]
    pub no_virulence: bool,

    #[arg(long, default_value_t = false, help = "Only write report.txt")]
    pub no_pdf: bool,

    #[arg(long, default_value_t = false, help = "Aggregate existing result files without running kma or kgt_mlst")]
    pub report_only: bool,

    #[arg(short = 'v', long = "verbose", action)]
    pub verbose: bool,
}
