use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::info;

use crate::command::{CommandRunner, Invocation, ProcessLauncher};
use crate::config::ToolConfig;
use crate::domain::Destination;
use crate::error::SwarmError;

/// Compresses and ships one finished artifact. Failures are fatal; nothing
/// is retried here.
pub struct Publisher<'a, L: ProcessLauncher> {
    runner: &'a CommandRunner<L>,
    tools: &'a ToolConfig,
}

impl<'a, L: ProcessLauncher> Publisher<'a, L> {
    pub fn new(runner: &'a CommandRunner<L>, tools: &'a ToolConfig) -> Self {
        Self { runner, tools }
    }

    /// Returns where the artifact ended up.
    pub fn publish(
        &self,
        path: &Utf8Path,
        destination: &Destination,
        compress: bool,
    ) -> Result<String, SwarmError> {
        let path = if compress {
            gzip_in_place(path)?
        } else {
            path.to_path_buf()
        };
        let filename = path
            .file_name()
            .ok_or_else(|| SwarmError::Filesystem(format!("no file name in {path}")))?;

        match destination {
            Destination::ObjectStore(uri) => {
                info!("Uploading {path} to {uri}");
                self.runner.run(&Invocation::new(
                    &self.tools.aws,
                    [
                        "s3",
                        "cp",
                        "--quiet",
                        "--sse",
                        "AES256",
                        path.as_str(),
                        uri.as_str(),
                    ],
                ))?;
                if uri.ends_with('/') {
                    Ok(format!("{uri}{filename}"))
                } else {
                    Ok(uri.clone())
                }
            }
            Destination::LocalDir(dir) => {
                let target = dir.join(filename);
                info!("Moving {path} to {target}");
                move_file(&path, dir, &target)?;
                Ok(target.to_string())
            }
        }
    }
}

/// Replaces `path` with `path.gz`.
pub fn gzip_in_place(path: &Utf8Path) -> Result<Utf8PathBuf, SwarmError> {
    let gz_path = Utf8PathBuf::from(format!("{path}.gz"));
    info!("Compressing {path}");
    let source = File::open(path.as_std_path())
        .map_err(|err| SwarmError::Filesystem(format!("open {path}: {err}")))?;
    let target = File::create(gz_path.as_std_path())
        .map_err(|err| SwarmError::Filesystem(format!("create {gz_path}: {err}")))?;

    let mut encoder = GzEncoder::new(BufWriter::new(target), Compression::default());
    io::copy(&mut BufReader::new(source), &mut encoder)
        .map_err(|err| SwarmError::Filesystem(format!("compress {path}: {err}")))?;
    let mut writer = encoder
        .finish()
        .map_err(|err| SwarmError::Filesystem(format!("compress {path}: {err}")))?;
    io::Write::flush(&mut writer)
        .map_err(|err| SwarmError::Filesystem(format!("write {gz_path}: {err}")))?;

    fs::remove_file(path.as_std_path())
        .map_err(|err| SwarmError::Filesystem(format!("remove {path}: {err}")))?;
    Ok(gz_path)
}

fn move_file(from: &Utf8Path, dir: &Utf8Path, to: &Utf8Path) -> Result<(), SwarmError> {
    fs::create_dir_all(dir.as_std_path())
        .map_err(|err| SwarmError::Filesystem(format!("create {dir}: {err}")))?;
    if fs::rename(from.as_std_path(), to.as_std_path()).is_ok() {
        return Ok(());
    }
    // rename does not cross filesystems
    fs::copy(from.as_std_path(), to.as_std_path())
        .map_err(|err| SwarmError::Filesystem(format!("copy {from} to {to}: {err}")))?;
    fs::remove_file(from.as_std_path())
        .map_err(|err| SwarmError::Filesystem(format!("remove {from}: {err}")))
}
