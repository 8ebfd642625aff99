use camino::{Utf8Path, Utf8PathBuf};

use crate::command::Invocation;
use crate::config::{SwarmParams, ToolConfig};
use crate::workspace::Workspace;

/// The two files Swarm writes for a sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwarmOutputs {
    pub fasta: Utf8PathBuf,
    pub csv: Utf8PathBuf,
}

impl SwarmOutputs {
    pub fn in_workspace(workspace: &Workspace, sample_name: &str) -> Self {
        Self {
            fasta: workspace.join(&format!("{sample_name}.swarm.fasta")),
            csv: workspace.join(&format!("{sample_name}.swarm.csv")),
        }
    }

    pub fn paths(&self) -> [&Utf8Path; 2] {
        [self.fasta.as_path(), self.csv.as_path()]
    }
}

pub fn log_file_name(sample_name: &str) -> String {
    format!("{sample_name}.log.txt")
}

/// `swarmwrapper cluster <reads> -D -w <fasta> -a <csv> -d <n> -M <n>`
pub fn cluster_invocation(
    tools: &ToolConfig,
    reads: &Utf8Path,
    outputs: &SwarmOutputs,
    params: &SwarmParams,
) -> Invocation {
    let mut args = vec![
        "cluster".to_string(),
        reads.to_string(),
        "-D".to_string(),
        "-w".to_string(),
        outputs.fasta.to_string(),
        "-a".to_string(),
        outputs.csv.to_string(),
        "-d".to_string(),
        params.differences.to_string(),
        "-M".to_string(),
        params.min_mass.to_string(),
    ];
    if params.keep_abundance {
        args.push("--keep-abundance".to_string());
    }
    Invocation::new(&tools.swarm, args)
}
