use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SwarmError {
    #[error("{program} exited with code {exit_code}")]
    CommandFailed { program: String, exit_code: i32 },

    #[error("failed to launch {program}: {message}")]
    CommandSpawn { program: String, message: String },

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("input file does not exist ({0})")]
    InputNotFound(PathBuf),

    #[error("did not recognize prefix for input: {0}")]
    UnrecognizedSourceScheme(String),

    #[error("invalid SRA accession: {0}")]
    InvalidAccession(String),

    #[error("file could not be downloaded from SRA: {0}")]
    SraDownloadEmpty(String),

    #[error("temporary folder already exists: {0}")]
    WorkspaceExists(PathBuf),

    #[error("output missing or empty: {0}")]
    OutputMissingOrEmpty(PathBuf),

    #[error("path is not valid UTF-8: {0}")]
    InvalidPath(PathBuf),

    #[error("failed to read tool config at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON tool config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl SwarmError {
    /// Short name of the variant, used when logging a fatal failure.
    pub fn kind(&self) -> &'static str {
        match self {
            SwarmError::CommandFailed { .. } => "CommandFailed",
            SwarmError::CommandSpawn { .. } => "CommandSpawn",
            SwarmError::MissingTool(_) => "MissingTool",
            SwarmError::InputNotFound(_) => "InputNotFound",
            SwarmError::UnrecognizedSourceScheme(_) => "UnrecognizedSourceScheme",
            SwarmError::InvalidAccession(_) => "InvalidAccession",
            SwarmError::SraDownloadEmpty(_) => "SraDownloadEmpty",
            SwarmError::WorkspaceExists(_) => "WorkspaceExists",
            SwarmError::OutputMissingOrEmpty(_) => "OutputMissingOrEmpty",
            SwarmError::InvalidPath(_) => "InvalidPath",
            SwarmError::ConfigRead(_) => "ConfigRead",
            SwarmError::ConfigParse(_) => "ConfigParse",
            SwarmError::Filesystem(_) => "Filesystem",
            SwarmError::Logging(_) => "Logging",
        }
    }

    /// Process exit status for this error. A failed external command passes
    /// its own exit code through.
    pub fn exit_status(&self) -> u8 {
        match self {
            SwarmError::CommandFailed { exit_code, .. } => u8::try_from(*exit_code)
                .ok()
                .filter(|code| *code != 0)
                .unwrap_or(1),
            SwarmError::InputNotFound(_)
            | SwarmError::UnrecognizedSourceScheme(_)
            | SwarmError::InvalidAccession(_)
            | SwarmError::ConfigRead(_)
            | SwarmError::ConfigParse(_) => 2,
            SwarmError::MissingTool(_) | SwarmError::CommandSpawn { .. } => 3,
            _ => 1,
        }
    }
}
