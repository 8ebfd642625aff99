use std::fs::{self, File};
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

use crate::command::{CommandRunner, Invocation, ProcessLauncher};
use crate::config::ToolConfig;
use crate::domain::{SourceDescriptor, SraAccession};
use crate::error::SwarmError;
use crate::workspace::Workspace;

const SPLIT_SUFFIX: &str = "fastq";

/// Brings the input reads into the workspace. Returns the raw fetched path;
/// decompression and conversion are left to [`crate::normalize`].
pub struct SourceFetcher<'a, L: ProcessLauncher> {
    runner: &'a CommandRunner<L>,
    tools: &'a ToolConfig,
    sra_cache: &'a Utf8Path,
}

impl<'a, L: ProcessLauncher> SourceFetcher<'a, L> {
    pub fn new(
        runner: &'a CommandRunner<L>,
        tools: &'a ToolConfig,
        sra_cache: &'a Utf8Path,
    ) -> Self {
        Self {
            runner,
            tools,
            sra_cache,
        }
    }

    pub fn fetch(
        &self,
        source: &SourceDescriptor,
        workspace: &Workspace,
    ) -> Result<Utf8PathBuf, SwarmError> {
        info!("Getting reads from {source}");
        let filename = source.filename();
        let local_path = workspace.join(&filename);
        info!("Filename: {filename}");
        info!("Local path: {local_path}");

        match source {
            SourceDescriptor::LocalPath(path) => {
                info!("Treating as local path");
                if !path.as_std_path().exists() {
                    return Err(SwarmError::InputNotFound(path.clone().into_std_path_buf()));
                }
                info!("Making a copy in the temporary folder");
                fs::copy(path.as_std_path(), local_path.as_std_path())
                    .map_err(|err| SwarmError::Filesystem(format!("copy {path}: {err}")))?;
                Ok(local_path)
            }
            SourceDescriptor::ObjectStore { uri, .. } => {
                info!("Getting reads from S3");
                self.runner.run(&Invocation::new(
                    &self.tools.aws,
                    [
                        "s3",
                        "cp",
                        "--quiet",
                        "--sse",
                        "AES256",
                        uri.as_str(),
                        workspace.path().as_str(),
                    ],
                ))?;
                Ok(local_path)
            }
            SourceDescriptor::HttpLike { uri, .. } => {
                info!("Getting reads from URL");
                self.runner.run(&Invocation::new(
                    &self.tools.wget,
                    ["-P", workspace.path().as_str(), uri.as_str()],
                ))?;
                Ok(local_path)
            }
            SourceDescriptor::SequenceArchive(accession) => {
                info!("Getting reads from SRA: {accession}");
                self.fetch_sra(accession, workspace)
            }
        }
    }

    fn fetch_sra(
        &self,
        accession: &SraAccession,
        workspace: &Workspace,
    ) -> Result<Utf8PathBuf, SwarmError> {
        workspace.prepare_archive_cache(self.sra_cache)?;

        let local_path = workspace.join(&format!("{accession}.{SPLIT_SUFFIX}"));
        info!("Downloading {accession} from SRA to {local_path}");

        self.runner
            .run(&Invocation::new(&self.tools.prefetch, [accession.as_str()]))?;
        self.runner.run(&Invocation::new(
            &self.tools.fastq_dump,
            [
                "--split-files",
                "--outdir",
                workspace.path().as_str(),
                accession.as_str(),
            ],
        ))?;

        let parts = split_parts(workspace.path(), accession)?;
        if parts.is_empty() {
            return Err(SwarmError::SraDownloadEmpty(accession.to_string()));
        }

        info!("Concatenating {} output files", parts.len());
        let mut combined = tempfile::Builder::new()
            .prefix(&format!("{accession}.{SPLIT_SUFFIX}."))
            .suffix(".temp")
            .tempfile_in(workspace.path().as_std_path())
            .map_err(|err| SwarmError::Filesystem(err.to_string()))?;
        for part in &parts {
            let mut reader = File::open(part.as_std_path())
                .map_err(|err| SwarmError::Filesystem(format!("open {part}: {err}")))?;
            io::copy(&mut reader, combined.as_file_mut())
                .map_err(|err| SwarmError::Filesystem(format!("concatenate {part}: {err}")))?;
        }

        for part in &parts {
            info!("Removing {part}");
            remove_best_effort(part);
        }
        let cached = self.sra_cache.join(format!("{accession}.sra"));
        if cached.as_std_path().exists() {
            info!("Removing {cached}");
            remove_best_effort(&cached);
        }

        combined.persist(local_path.as_std_path()).map_err(|err| {
            SwarmError::Filesystem(format!("rename to {local_path}: {}", err.error))
        })?;
        info!("Done fetching {accession}");
        Ok(local_path)
    }
}

/// Files in `dir` named `<accession>*fastq`, in glob order.
fn split_parts(
    dir: &Utf8Path,
    accession: &SraAccession,
) -> Result<Vec<Utf8PathBuf>, SwarmError> {
    let entries = dir
        .read_dir_utf8()
        .map_err(|err| SwarmError::Filesystem(format!("read {dir}: {err}")))?;
    let mut parts = entries
        .flatten()
        .filter(|entry| {
            let name = entry.file_name();
            name.starts_with(accession.as_str()) && name.ends_with(SPLIT_SUFFIX)
        })
        .map(|entry| entry.into_path())
        .collect::<Vec<_>>();
    parts.sort();
    Ok(parts)
}

fn remove_best_effort(path: &Utf8Path) {
    if let Err(err) = fs::remove_file(path.as_std_path()) {
        if err.kind() != io::ErrorKind::NotFound {
            warn!("could not remove {path}: {err}");
        }
    }
}
