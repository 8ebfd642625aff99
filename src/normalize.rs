use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::command::{CommandRunner, Invocation, ProcessLauncher};
use crate::config::ToolConfig;
use crate::error::SwarmError;

const GZIP_SUFFIX: &str = ".gz";

/// Turns a fetched file into uncompressed FASTA: gunzip first, then
/// FASTQ to FASTA. Either step is skipped when it does not apply.
pub struct Normalizer<'a, L: ProcessLauncher> {
    runner: &'a CommandRunner<L>,
    tools: &'a ToolConfig,
}

impl<'a, L: ProcessLauncher> Normalizer<'a, L> {
    pub fn new(runner: &'a CommandRunner<L>, tools: &'a ToolConfig) -> Self {
        Self { runner, tools }
    }

    pub fn normalize(&self, path: &Utf8Path) -> Result<Utf8PathBuf, SwarmError> {
        let mut current = path.to_path_buf();

        if let Some(decompressed) = decompressed_path(&current) {
            info!("Decompressing {current}");
            self.runner
                .run(&Invocation::new(&self.tools.pigz, ["-d", current.as_str()]))?;
            current = decompressed;
        }

        // The FASTQ input stays on disk next to the converted file.
        if let Some(fasta) = fasta_path(&current) {
            info!("Converting to FASTA: {fasta}");
            self.runner.run(&Invocation::new(
                &self.tools.fastq_to_fasta,
                ["-i", current.as_str(), "-o", fasta.as_str()],
            ))?;
            current = fasta;
        }

        Ok(current)
    }
}

/// `reads.fastq.gz` -> `reads.fastq`; `None` when not gzip-suffixed.
pub fn decompressed_path(path: &Utf8Path) -> Option<Utf8PathBuf> {
    path.as_str()
        .strip_suffix(GZIP_SUFFIX)
        .map(Utf8PathBuf::from)
}

/// `reads.fastq` -> `reads.fasta`, `reads.FQ` -> `reads.Fa`; `None` unless
/// the name ends in `q`/`Q`.
pub fn fasta_path(path: &Utf8Path) -> Option<Utf8PathBuf> {
    let stem = path
        .as_str()
        .strip_suffix('q')
        .or_else(|| path.as_str().strip_suffix('Q'))?;
    Some(Utf8PathBuf::from(format!("{stem}a")))
}
