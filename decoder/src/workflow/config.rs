use anyhow::Context;
use aptcore::prelude::StageConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Batch layout plus the stage parameters handed to the decoder.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    pub input_dir: PathBuf,
    pub raw_output_dir: PathBuf,
    pub false_color_output_dir: PathBuf,
    pub jobs: usize,
    pub report: Option<PathBuf>,
    pub stages: StageConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("recordings"),
            raw_output_dir: PathBuf::from("rawImages"),
            false_color_output_dir: PathBuf::from("falseColorImages"),
            jobs: 1,
            report: Some(PathBuf::from("decode_report.json")),
            stages: StageConfig::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn to_stage_config(&self) -> StageConfig {
        self.stages.clone()
    }

    /// Worker count, never below one.
    pub fn worker_count(&self) -> usize {
        self.jobs.max(1)
    }
}
