use std::fs;
use std::path::Path;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{Destination, SourceDescriptor};
use crate::error::SwarmError;

pub const DEFAULT_TEMP_ROOT: &str = "/share";
pub const DEFAULT_SRA_CACHE: &str = "/root/ncbi/public/sra";

/// Parameters forwarded verbatim to the clustering tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwarmParams {
    pub differences: u32,
    pub min_mass: u32,
    pub keep_abundance: bool,
}

impl Default for SwarmParams {
    fn default() -> Self {
        Self {
            differences: 1,
            min_mass: 1,
            keep_abundance: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: SourceDescriptor,
    pub sample_name: String,
    pub destination: Destination,
    pub params: SwarmParams,
    pub temp_root: Utf8PathBuf,
    pub sra_cache: Utf8PathBuf,
    pub gzip: bool,
    pub tools: ToolConfig,
}

impl RunConfig {
    pub fn new(input: SourceDescriptor, sample_name: &str, destination: Destination) -> Self {
        Self {
            input,
            sample_name: sample_name.to_string(),
            destination,
            params: SwarmParams::default(),
            temp_root: Utf8PathBuf::from(DEFAULT_TEMP_ROOT),
            sra_cache: Utf8PathBuf::from(DEFAULT_SRA_CACHE),
            gzip: true,
            tools: ToolConfig::default(),
        }
    }
}

/// External programs the pipeline shells out to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolConfig {
    pub aws: String,
    pub wget: String,
    pub prefetch: String,
    pub fastq_dump: String,
    pub pigz: String,
    pub fastq_to_fasta: String,
    pub swarm: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            aws: "aws".to_string(),
            wget: "wget".to_string(),
            prefetch: "prefetch".to_string(),
            fastq_dump: "fastq-dump".to_string(),
            pigz: "pigz".to_string(),
            fastq_to_fasta: "fastq_to_fasta".to_string(),
            swarm: "swarmwrapper".to_string(),
        }
    }
}

impl ToolConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, SwarmError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content =
            fs::read_to_string(path).map_err(|_| SwarmError::ConfigRead(path.to_path_buf()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, SwarmError> {
        serde_json::from_str(content).map_err(|err| SwarmError::ConfigParse(err.to_string()))
    }
}
