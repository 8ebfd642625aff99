use std::fs;

use assert_matches::assert_matches;

use kira_swarm::config::{DEFAULT_SRA_CACHE, DEFAULT_TEMP_ROOT, RunConfig, SwarmParams, ToolConfig};
use kira_swarm::domain::Destination;
use kira_swarm::error::SwarmError;

#[test]
fn run_config_defaults() {
    let config = RunConfig::new(
        "sra://SRR000001".parse().unwrap(),
        "S1",
        "/out".parse::<Destination>().unwrap(),
    );
    assert_eq!(config.params, SwarmParams::default());
    assert_eq!(config.params.differences, 1);
    assert_eq!(config.params.min_mass, 1);
    assert!(!config.params.keep_abundance);
    assert_eq!(config.temp_root, DEFAULT_TEMP_ROOT);
    assert_eq!(config.sra_cache, DEFAULT_SRA_CACHE);
    assert!(config.gzip);
    assert_eq!(config.tools, ToolConfig::default());
}

#[test]
fn tool_config_from_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("tools.json");
    fs::write(
        &path,
        r#"{"aws": "/usr/local/bin/aws", "fastq_to_fasta": "fastx_fastq_to_fasta"}"#,
    )
    .unwrap();

    let tools = ToolConfig::load(Some(&path)).unwrap();
    assert_eq!(tools.aws, "/usr/local/bin/aws");
    assert_eq!(tools.fastq_to_fasta, "fastx_fastq_to_fasta");
    assert_eq!(tools.swarm, "swarmwrapper");
}

#[test]
fn tool_config_without_file() {
    assert_eq!(ToolConfig::load(None).unwrap(), ToolConfig::default());
}

#[test]
fn tool_config_rejects_wrong_types() {
    let err = ToolConfig::parse(r#"{"pigz": 3}"#).unwrap_err();
    assert_matches!(err, SwarmError::ConfigParse(_));
}
