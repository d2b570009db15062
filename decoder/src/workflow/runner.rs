use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use aptcore::recording::image_file_name;
use aptcore::telemetry::MetricsRecorder;
use aptcore::{Decoder, ImageWriter};
use log::{error, info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::sync::Semaphore;
use tokio::task::JoinError;

/// Outcome of decoding one recording.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingReport {
    pub file: PathBuf,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub lines: usize,
    pub raw_image: Option<PathBuf>,
    pub false_color_image: Option<PathBuf>,
    pub error: Option<String>,
}

impl RecordingReport {
    fn failed(file: &Path, err: &anyhow::Error) -> Self {
        Self {
            file: file.to_path_buf(),
            sample_rate: None,
            channels: None,
            lines: 0,
            raw_image: None,
            false_color_image: None,
            error: Some(format!("{err:#}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub errors: usize,
    pub lines: usize,
    pub recordings: Vec<RecordingReport>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    decoder: Arc<Decoder>,
    writer: Arc<ImageWriter>,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> anyhow::Result<Self> {
        let decoder = Decoder::new(config.to_stage_config()).context("configuring decoder")?;
        Ok(Self {
            config,
            decoder: Arc::new(decoder),
            writer: Arc::new(ImageWriter::new()),
        })
    }

    /// Creates missing directories and lists `.wav` recordings in name order.
    pub fn prepare(&self) -> anyhow::Result<Vec<PathBuf>> {
        for dir in [
            &self.config.input_dir,
            &self.config.raw_output_dir,
            &self.config.false_color_output_dir,
        ] {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }

        let mut recordings = Vec::new();
        let entries = fs::read_dir(&self.config.input_dir)
            .with_context(|| format!("listing {}", self.config.input_dir.display()))?;
        for entry in entries {
            let path = entry
                .with_context(|| format!("listing {}", self.config.input_dir.display()))?
                .path();
            let is_wav = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("wav"))
                .unwrap_or(false);
            if path.is_file() && is_wav {
                recordings.push(path);
            }
        }
        recordings.sort();
        Ok(recordings)
    }

    pub fn execute(&self) -> anyhow::Result<BatchReport> {
        let recordings = self.prepare()?;
        if recordings.is_empty() {
            warn!(
                "Place recorded APT signals in the '{}' folder!",
                self.config.input_dir.display()
            );
        }

        let metrics = Arc::new(MetricsRecorder::new());
        let jobs = self.config.worker_count();
        let reports = if jobs <= 1 || recordings.len() <= 1 {
            recordings
                .iter()
                .map(|path| self.process(path, &metrics))
                .collect()
        } else {
            self.execute_concurrent(recordings, jobs, &metrics)?
        };

        let snapshot = metrics.snapshot();
        let report = BatchReport {
            processed: snapshot.processed,
            errors: snapshot.errors,
            lines: snapshot.lines,
            recordings: reports,
        };

        if let Some(path) = &self.config.report {
            let json = serde_json::to_string_pretty(&report).context("serializing batch report")?;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        }

        Ok(report)
    }

    /// One blocking worker per recording, at most `jobs` at a time.
    fn execute_concurrent(
        &self,
        recordings: Vec<PathBuf>,
        jobs: usize,
        metrics: &Arc<MetricsRecorder>,
    ) -> anyhow::Result<Vec<RecordingReport>> {
        let runtime = TokioBuilder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(jobs)
            .build()
            .context("creating runtime for decode workers")?;

        runtime.block_on(async {
            let semaphore = Arc::new(Semaphore::new(jobs));
            let mut handles = Vec::with_capacity(recordings.len());
            for path in recordings {
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .context("acquiring decode worker slot")?;
                let runner = self.clone();
                let worker_metrics = Arc::clone(metrics);
                let worker_path = path.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    runner.process(&worker_path, &worker_metrics)
                });
                handles.push((path, handle));
            }

            let mut reports = Vec::with_capacity(handles.len());
            for (path, handle) in handles {
                reports.push(joined_report(&path, handle.await, metrics));
            }
            Ok::<_, anyhow::Error>(reports)
        })
    }

    /// Decodes a single recording. Failures are logged and reported, never propagated.
    pub fn process(&self, path: &Path, metrics: &MetricsRecorder) -> RecordingReport {
        match self.decode_and_save(path) {
            Ok(report) => {
                metrics.record_processed(report.lines);
                report
            }
            Err(err) => {
                error!("failed to decode {}: {:#}", path.display(), err);
                metrics.record_error();
                RecordingReport::failed(path, &err)
            }
        }
    }

    fn decode_and_save(&self, path: &Path) -> anyhow::Result<RecordingReport> {
        let images = self
            .decoder
            .decode_file(path)
            .with_context(|| format!("decoding {}", path.display()))?;

        let mut report = RecordingReport {
            file: path.to_path_buf(),
            sample_rate: Some(images.info.sample_rate),
            channels: Some(images.info.channels),
            lines: images.line_count(),
            raw_image: None,
            false_color_image: None,
            error: None,
        };

        if images.is_empty() {
            warn!("{} produced no scan lines, no image written", path.display());
            return Ok(report);
        }

        let name = image_file_name(path);
        let raw_path = self.config.raw_output_dir.join(&name);
        self.writer
            .save(images.raw.view().into_dyn(), &raw_path)
            .with_context(|| format!("writing {}", raw_path.display()))?;
        report.raw_image = Some(raw_path);

        if let Some(false_color) = &images.false_color {
            let color_path = self.config.false_color_output_dir.join(&name);
            self.writer
                .save(false_color.view().into_dyn(), &color_path)
                .with_context(|| format!("writing {}", color_path.display()))?;
            report.false_color_image = Some(color_path);
        }

        info!("{} decoded into {} lines", path.display(), report.lines);
        Ok(report)
    }
}

/// A worker that died before reporting counts as a failure of its recording only.
fn joined_report(
    path: &Path,
    joined: Result<RecordingReport, JoinError>,
    metrics: &MetricsRecorder,
) -> RecordingReport {
    match joined {
        Ok(report) => report,
        Err(err) => {
            let err = anyhow::Error::new(err).context("decode worker stopped");
            error!("failed to decode {}: {:#}", path.display(), err);
            metrics.record_error();
            RecordingReport::failed(path, &err)
        }
    }
}
