use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use tracing::info;

use kira_swarm::app::{Run, Stage};
use kira_swarm::command::{CommandRunner, SystemLauncher};
use kira_swarm::config::{
    DEFAULT_SRA_CACHE, DEFAULT_TEMP_ROOT, RunConfig, SwarmParams, ToolConfig,
};
use kira_swarm::error::SwarmError;
use kira_swarm::logging;

#[derive(Parser)]
#[command(name = "kira-swarm")]
#[command(about = "Align a set of reads with Swarm")]
#[command(version, author)]
struct Cli {
    #[arg(long, help = "Location for input file (local path, s3://, http(s)://, ftp:// or sra://)")]
    input: String,

    #[arg(long, help = "Name of sample, determines output filenames")]
    sample_name: String,

    #[arg(long, help = "Folder to place results (s3:// or local path)")]
    output_folder: String,

    #[arg(long, default_value_t = 1, help = "Resolution parameter used by Swarm")]
    differences: u32,

    #[arg(long, default_value_t = 1, help = "Drop OTUs with total mass less than N")]
    min_mass: u32,

    #[arg(long, help = "Keep abundance annotation in seed names")]
    keep_abundance: bool,

    #[arg(long, default_value = DEFAULT_TEMP_ROOT, help = "Folder used for temporary files")]
    temp_folder: Utf8PathBuf,

    #[arg(
        long,
        default_value = DEFAULT_SRA_CACHE,
        help = "Location the SRA toolkit uses as its download cache"
    )]
    sra_cache: Utf8PathBuf,

    #[arg(long, help = "JSON file naming the external tools")]
    tools: Option<PathBuf>,

    #[arg(long, help = "Publish results without gzip compression")]
    no_gzip: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<SwarmError>() {
            return ExitCode::from(err.exit_status());
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    let config = build_config(cli)?;

    let run_log = logging::init()?;
    let run = Run::init(config)?;
    if let Err(err) = run_log.attach(run.log_path()) {
        run.abort(Stage::Init, &err);
        return Err(err.into());
    }
    info!("Temporary folder: {}", run.workspace().path());

    let runner = CommandRunner::new(SystemLauncher);
    let report = run.execute(&runner)?;
    for location in &report.published {
        info!("Published {location}");
    }
    info!(
        "Finished {} in {:.1}s",
        report.sample_name,
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

fn build_config(cli: Cli) -> Result<RunConfig, SwarmError> {
    let tools = ToolConfig::load(cli.tools.as_deref())?;
    let mut config = RunConfig::new(
        cli.input.parse()?,
        &cli.sample_name,
        cli.output_folder.parse()?,
    );
    config.params = SwarmParams {
        differences: cli.differences,
        min_mass: cli.min_mass,
        keep_abundance: cli.keep_abundance,
    };
    config.temp_root = cli.temp_folder;
    config.sra_cache = cli.sra_cache;
    config.gzip = !cli.no_gzip;
    config.tools = tools;
    Ok(config)
}
