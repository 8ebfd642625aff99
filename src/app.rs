use std::fmt;
use std::fs::{self, OpenOptions};
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{error, info};

use crate::command::{CommandRunner, ProcessLauncher};
use crate::config::RunConfig;
use crate::error::SwarmError;
use crate::fetch::SourceFetcher;
use crate::normalize::Normalizer;
use crate::publish::Publisher;
use crate::swarm::{SwarmOutputs, cluster_invocation, log_file_name};
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Fetching,
    Normalizing,
    Clustering,
    Verifying,
    Publishing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "Init",
            Stage::Fetching => "Fetching",
            Stage::Normalizing => "Normalizing",
            Stage::Clustering => "Clustering",
            Stage::Verifying => "Verifying",
            Stage::Publishing => "Publishing",
            Stage::Done => "Done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub sample_name: String,
    pub workspace: Utf8PathBuf,
    pub reads: Utf8PathBuf,
    pub published: Vec<String>,
    pub elapsed: Duration,
}

/// A single sample run. Owns the workspace from `init` until the run either
/// finishes (workspace kept) or fails (workspace removed).
#[derive(Debug)]
pub struct Run {
    config: RunConfig,
    workspace: Workspace,
    log_path: Utf8PathBuf,
    started: Instant,
}

impl Run {
    /// Creates the workspace and an empty run log inside it.
    pub fn init(config: RunConfig) -> Result<Self, SwarmError> {
        let started = Instant::now();
        let workspace = Workspace::create(&config.temp_root)?;
        let log_path = workspace.join(&log_file_name(&config.sample_name));
        if let Err(err) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path.as_std_path())
        {
            workspace.teardown();
            return Err(SwarmError::Filesystem(format!("create {log_path}: {err}")));
        }
        Ok(Self {
            config,
            workspace,
            log_path,
            started,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn log_path(&self) -> &Utf8Path {
        &self.log_path
    }

    /// Drives fetch, normalize, cluster, verify and publish. Any error tears
    /// the workspace down before it is returned.
    pub fn execute<L: ProcessLauncher>(
        self,
        runner: &CommandRunner<L>,
    ) -> Result<RunReport, SwarmError> {
        let mut stage = Stage::Init;
        match self.pipeline(runner, &mut stage) {
            Ok(report) => {
                info!("phase={}; run finished", Stage::Done);
                Ok(report)
            }
            Err(err) => {
                self.abort(stage, &err);
                Err(err)
            }
        }
    }

    /// Ends a run that failed outside [`Run::execute`].
    pub fn abort(&self, stage: Stage, err: &SwarmError) {
        error!("There was an unexpected failure");
        error!("Failed during: {stage}");
        error!("Exit type: {}", err.kind());
        error!("Exit code: {err}");
        self.workspace.teardown();
    }

    fn pipeline<L: ProcessLauncher>(
        &self,
        runner: &CommandRunner<L>,
        stage: &mut Stage,
    ) -> Result<RunReport, SwarmError> {
        let config = &self.config;
        let tools = &config.tools;

        enter(stage, Stage::Fetching);
        info!("Fetching input file");
        let fetched = SourceFetcher::new(runner, tools, &config.sra_cache)
            .fetch(&config.input, &self.workspace)?;

        enter(stage, Stage::Normalizing);
        let reads = Normalizer::new(runner, tools).normalize(&fetched)?;

        enter(stage, Stage::Clustering);
        let outputs = SwarmOutputs::in_workspace(&self.workspace, &config.sample_name);
        info!("FASTA output: {}", outputs.fasta);
        info!("CSV output: {}", outputs.csv);
        runner.run(&cluster_invocation(tools, &reads, &outputs, &config.params))?;
        info!(
            "Seconds elapsed: {:.2}",
            self.started.elapsed().as_secs_f64()
        );

        enter(stage, Stage::Verifying);
        verify_outputs(&outputs)?;

        enter(stage, Stage::Publishing);
        // Artifacts already shipped stay published if a later one fails.
        let publisher = Publisher::new(runner, tools);
        let mut published = Vec::new();
        for path in [
            outputs.fasta.as_path(),
            outputs.csv.as_path(),
            self.log_path.as_path(),
        ] {
            published.push(publisher.publish(path, &config.destination, config.gzip)?);
        }

        Ok(RunReport {
            sample_name: config.sample_name.clone(),
            workspace: self.workspace.path().to_path_buf(),
            reads,
            published,
            elapsed: self.started.elapsed(),
        })
    }
}

fn enter(stage: &mut Stage, next: Stage) {
    info!("phase={next}");
    *stage = next;
}

/// A zero exit code alone is not trusted: both outputs must exist and be
/// non-empty.
pub fn verify_outputs(outputs: &SwarmOutputs) -> Result<(), SwarmError> {
    for path in outputs.paths() {
        let size = fs::metadata(path.as_std_path())
            .map(|meta| meta.len())
            .unwrap_or(0);
        if size == 0 {
            return Err(SwarmError::OutputMissingOrEmpty(
                path.to_path_buf().into_std_path_buf(),
            ));
        }
    }
    Ok(())
}
