use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use cactus_project::io::seqfile::SeqFile;
use cactus_project::project::experiment::{Database, KtType};
use cactus_project::project::launch::SystemRunner;
use cactus_project::project::{ProjectOptions, ProjectWrapper, DEFAULT_KT_PORT, DEFAULT_PROJECT_TOOL};

#[derive(Parser, Debug)]
#[command(
    name = "cactus-project",
    author,
    version,
    about = "Prepare a Progressive Cactus working directory and create the multi-cactus project",
    arg_required_else_help = true
)]
struct Cli {
    /// Sequence file: optional Newick tree line, then `name path` lines
    seq_file: PathBuf,
    /// Existing working directory (config.xml, expTemplate.xml and progressiveAlignment/ go here)
    working_dir: PathBuf,
    /// Workflow config XML (default: <cactus-root>/progressive/cactus_progressive_workflow_config.xml)
    #[arg(long = "config")]
    config_file: Option<PathBuf>,
    /// Also build a MAF and write it to this path
    #[arg(long = "output-maf")]
    output_maf: Option<PathBuf>,
    /// Run the original non-progressive cactus
    #[arg(long)]
    legacy: bool,
    #[arg(long, value_enum, default_value_t = Database::KyotoTycoon)]
    database: Database,
    #[arg(long = "kt-host", default_value = "localhost")]
    kt_host: String,
    #[arg(long = "kt-port", default_value_t = DEFAULT_KT_PORT)]
    kt_port: u16,
    #[arg(long = "kt-type", value_enum, default_value_t = KtType::Memory)]
    kt_type: KtType,
    /// ktserver tuning parameters used when creating the database
    #[arg(long = "kt-create-tuning")]
    kt_create_tuning: Option<String>,
    /// ktserver tuning parameters used when opening the database for reading
    #[arg(long = "kt-open-tuning")]
    kt_open_tuning: Option<String>,
    /// cactus installation root
    #[arg(long = "cactus-root", env = "CACTUS_ROOT", default_value = ".")]
    cactus_root: PathBuf,
    #[arg(long = "project-tool", default_value = DEFAULT_PROJECT_TOOL)]
    project_tool: String,
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();

    let seq_file = SeqFile::from_file(&cli.seq_file)
        .with_context(|| format!("cannot read seqfile '{}'", cli.seq_file.display()))?;
    let opt = ProjectOptions {
        config_file: cli.config_file,
        output_maf: cli.output_maf,
        legacy: cli.legacy,
        database: cli.database,
        kt_host: cli.kt_host,
        kt_port: cli.kt_port,
        kt_type: cli.kt_type,
        kt_create_tuning: cli.kt_create_tuning,
        kt_open_tuning: cli.kt_open_tuning,
        cactus_root: cli.cactus_root,
        project_tool: cli.project_tool,
    };
    run_project(opt, &seq_file, cli.working_dir)
}

fn run_project(opt: ProjectOptions, seq_file: &SeqFile, working_dir: PathBuf) -> Result<()> {
    log::info!("seqfile: {} genomes", seq_file.genomes().len());
    let mut project = ProjectWrapper::new(opt, seq_file, working_dir)?;
    let report = project.write_and_launch(&mut SystemRunner)?;
    if report.succeeded() {
        log::info!("project created in {}", report.alignment_dir.display());
    }
    Ok(())
}
