use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::SwarmError;

pub const OBJECT_STORE_PREFIX: &str = "s3://";
pub const SEQUENCE_ARCHIVE_PREFIX: &str = "sra://";
const HTTP_LIKE_PREFIXES: [&str; 3] = ["http://", "https://", "ftp://"];

/// Run accession in the Sequence Read Archive, e.g. `SRR000001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SraAccession(String);

impl SraAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SraAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SraAccession {
    type Err = SwarmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let prefix_len = normalized
            .chars()
            .take_while(|ch| ch.is_ascii_alphabetic())
            .count();
        let rest = &normalized[prefix_len..];
        let is_valid = prefix_len > 0
            && !rest.is_empty()
            && rest.chars().all(|ch| ch.is_ascii_digit() || ch == '.');
        if !is_valid {
            return Err(SwarmError::InvalidAccession(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Where the input reads come from, resolved once from the `--input` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    LocalPath(Utf8PathBuf),
    ObjectStore { uri: String, filename: String },
    HttpLike { uri: String, filename: String },
    SequenceArchive(SraAccession),
}

impl SourceDescriptor {
    pub fn scheme(&self) -> &'static str {
        match self {
            SourceDescriptor::LocalPath(_) => "local",
            SourceDescriptor::ObjectStore { .. } => "s3",
            SourceDescriptor::HttpLike { .. } => "url",
            SourceDescriptor::SequenceArchive(_) => "sra",
        }
    }

    /// File name the fetched reads will have inside the workspace.
    pub fn filename(&self) -> String {
        match self {
            SourceDescriptor::LocalPath(path) => path.file_name().unwrap_or_default().to_string(),
            SourceDescriptor::ObjectStore { filename, .. }
            | SourceDescriptor::HttpLike { filename, .. } => filename.clone(),
            SourceDescriptor::SequenceArchive(accession) => format!("{accession}.fastq"),
        }
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDescriptor::LocalPath(path) => write!(f, "{path}"),
            SourceDescriptor::ObjectStore { uri, .. } | SourceDescriptor::HttpLike { uri, .. } => {
                write!(f, "{uri}")
            }
            SourceDescriptor::SequenceArchive(accession) => {
                write!(f, "{SEQUENCE_ARCHIVE_PREFIX}{accession}")
            }
        }
    }
}

impl FromStr for SourceDescriptor {
    type Err = SwarmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.starts_with(OBJECT_STORE_PREFIX) {
            return Ok(SourceDescriptor::ObjectStore {
                uri: trimmed.to_string(),
                filename: last_segment(trimmed).to_string(),
            });
        }
        if HTTP_LIKE_PREFIXES
            .iter()
            .any(|prefix| trimmed.starts_with(prefix))
        {
            return Ok(SourceDescriptor::HttpLike {
                uri: trimmed.to_string(),
                filename: last_segment(trimmed).to_string(),
            });
        }
        if trimmed.starts_with(SEQUENCE_ARCHIVE_PREFIX) {
            return Ok(SourceDescriptor::SequenceArchive(
                last_segment(trimmed).parse()?,
            ));
        }
        if trimmed.contains("://") {
            return Err(SwarmError::UnrecognizedSourceScheme(value.to_string()));
        }
        Ok(SourceDescriptor::LocalPath(Utf8PathBuf::from(trimmed)))
    }
}

/// Where finished artifacts are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    ObjectStore(String),
    LocalDir(Utf8PathBuf),
}

impl Destination {
    pub fn local_dir(&self) -> Option<&Utf8Path> {
        match self {
            Destination::LocalDir(path) => Some(path),
            Destination::ObjectStore(_) => None,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::ObjectStore(uri) => write!(f, "{uri}"),
            Destination::LocalDir(path) => write!(f, "{path}"),
        }
    }
}

impl FromStr for Destination {
    type Err = SwarmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.starts_with(OBJECT_STORE_PREFIX) {
            Ok(Destination::ObjectStore(trimmed.to_string()))
        } else {
            Ok(Destination::LocalDir(Utf8PathBuf::from(trimmed)))
        }
    }
}

fn last_segment(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}
