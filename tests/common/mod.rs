#![allow(dead_code)]

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;

use kira_swarm::command::{ProcessLauncher, ProcessOutput};
use kira_swarm::error::SwarmError;

pub const FASTQ: &str = "@read1\nACGTACGT\n+\nIIIIIIII\n@read2\nACGTACGA\n+\nIIIIIIII\n";

/// Stands in for aws, wget, prefetch, fastq-dump, pigz, fastq_to_fasta and
/// swarmwrapper by doing their filesystem effects in-process.
pub struct FakeToolchain {
    pub calls: Mutex<Vec<Vec<String>>>,
    pub sra_parts: Vec<(String, String)>,
    pub sra_cache: Option<Utf8PathBuf>,
    pub csv_body: Vec<u8>,
    pub failures: HashMap<String, i32>,
}

impl Default for FakeToolchain {
    fn default() -> Self {
        Self {
            calls: Mutex::default(),
            sra_parts: Vec::new(),
            sra_cache: None,
            csv_body: b"OTU1,2\n".to_vec(),
            failures: HashMap::new(),
        }
    }
}

impl FakeToolchain {
    pub fn failing(program: &str, exit_code: i32) -> Self {
        let mut tools = Self::default();
        tools.failures.insert(program.to_string(), exit_code);
        tools
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|argv| argv[0].clone())
            .collect()
    }

    pub fn calls_to(&self, program: &str) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|argv| argv[0] == program)
            .cloned()
            .collect()
    }
}

impl ProcessLauncher for FakeToolchain {
    fn launch(
        &self,
        argv: &[String],
        _redirect: Option<&Utf8Path>,
    ) -> Result<ProcessOutput, SwarmError> {
        self.calls.lock().unwrap().push(argv.to_vec());
        if let Some(code) = self.failures.get(&argv[0]) {
            return Ok(ProcessOutput {
                exit_code: *code,
                stdout: Some(format!("{} failed\n", argv[0])),
                stderr: None,
            });
        }

        match argv[0].as_str() {
            "aws" => {
                let (source, target) = (&argv[6], &argv[7]);
                if source.starts_with("s3://") {
                    write_download(target, source);
                }
            }
            "wget" => write_download(&argv[2], &argv[3]),
            "prefetch" => {
                if let Some(cache) = &self.sra_cache {
                    fs::write(cache.join(format!("{}.sra", argv[1])), b"blob").unwrap();
                }
            }
            "fastq-dump" => {
                for (name, body) in &self.sra_parts {
                    fs::write(Utf8Path::new(&argv[3]).join(name), body).unwrap();
                }
            }
            "pigz" => {
                let compressed = &argv[2];
                let mut text = Vec::new();
                GzDecoder::new(File::open(compressed).unwrap())
                    .read_to_end(&mut text)
                    .unwrap();
                fs::write(compressed.strip_suffix(".gz").unwrap(), text).unwrap();
                fs::remove_file(compressed).unwrap();
            }
            "fastq_to_fasta" => {
                let fastq = fs::read_to_string(&argv[2]).unwrap();
                fs::write(&argv[4], fastq_to_fasta(&fastq)).unwrap();
            }
            "swarmwrapper" => {
                let reads = fs::read_to_string(&argv[2]).unwrap();
                let seed = reads.lines().take(2).collect::<Vec<_>>().join("\n");
                fs::write(&argv[5], format!("{seed}\n")).unwrap();
                fs::write(&argv[7], &self.csv_body).unwrap();
            }
            _ => {}
        }
        Ok(ProcessOutput {
            exit_code: 0,
            stdout: Some(String::new()),
            stderr: None,
        })
    }
}

pub fn fastq_to_fasta(fastq: &str) -> String {
    fastq
        .lines()
        .collect::<Vec<_>>()
        .chunks(4)
        .map(|record| format!(">{}\n{}\n", &record[0][1..], record[1]))
        .collect()
}

fn write_download(dir: &str, uri: &str) {
    let name = uri.rsplit('/').next().unwrap();
    let path = Utf8Path::new(dir).join(name);
    if name.ends_with(".gz") {
        let file = File::create(&path).unwrap();
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::fast());
        std::io::Write::write_all(&mut encoder, FASTQ.as_bytes()).unwrap();
        encoder.finish().unwrap();
    } else {
        fs::write(&path, FASTQ).unwrap();
    }
}

pub fn scratch() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

pub fn gunzip_to_string(path: &Utf8Path) -> String {
    let mut text = String::new();
    GzDecoder::new(File::open(path.as_std_path()).unwrap())
        .read_to_string(&mut text)
        .unwrap();
    text
}

/// Workspace directories created under `temp_root`.
pub fn workspaces(temp_root: &Utf8Path) -> Vec<Utf8PathBuf> {
    match temp_root.read_dir_utf8() {
        Ok(entries) => entries
            .flatten()
            .map(|entry| entry.into_path())
            .filter(|path| path.is_dir())
            .collect(),
        Err(_) => Vec::new(),
    }
}
