use anyhow::Context;
use clap::Parser;
use generator::profile::{write_recording, GeneratorConfig};
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Decode APT weather-satellite recordings into images")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Directory scanned for .wav recordings
    #[arg(long)]
    input: Option<PathBuf>,
    /// Directory receiving greyscale images
    #[arg(long)]
    raw_output: Option<PathBuf>,
    /// Directory receiving false-color images
    #[arg(long)]
    false_color_output: Option<PathBuf>,
    /// Recordings decoded concurrently
    #[arg(long)]
    jobs: Option<usize>,
    /// Write a JSON summary of the batch
    #[arg(long)]
    report: Option<PathBuf>,
    /// Skip the false-color composite
    #[arg(long, default_value_t = false)]
    no_false_color: bool,
    /// Treat recordings without a single complete line as failures
    #[arg(long, default_value_t = false)]
    require_lines: bool,
    /// Write a synthetic APT recording to this path and exit
    #[arg(long)]
    synthesize: Option<PathBuf>,
    #[arg(long, default_value_t = 11_025)]
    synth_rate: u32,
    #[arg(long, default_value_t = 10.0)]
    synth_seconds: f32,
    #[arg(long, default_value_t = 1)]
    synth_channels: u16,
    #[arg(long, default_value_t = 0)]
    synth_seed: u64,
}

impl Args {
    fn workflow_config(&self) -> anyhow::Result<WorkflowConfig> {
        let mut config = if let Some(path) = &self.workflow {
            WorkflowConfig::load(path)?
        } else {
            WorkflowConfig::default()
        };
        if let Some(input) = &self.input {
            config.input_dir = input.clone();
        }
        if let Some(raw) = &self.raw_output {
            config.raw_output_dir = raw.clone();
        }
        if let Some(color) = &self.false_color_output {
            config.false_color_output_dir = color.clone();
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if self.report.is_some() {
            config.report = self.report.clone();
        }
        if self.no_false_color {
            config.stages.false_color = false;
        }
        if self.require_lines {
            config.stages.require_lines = true;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if let Some(path) = &args.synthesize {
        let generator = GeneratorConfig {
            sample_rate: args.synth_rate,
            seconds: args.synth_seconds,
            channels: args.synth_channels,
            seed: args.synth_seed,
            ..Default::default()
        };
        let frames = write_recording(&generator, path)
            .with_context(|| format!("synthesizing {}", path.display()))?;
        println!(
            "Wrote {} frames at {} Hz to {}",
            frames,
            generator.sample_rate,
            path.display()
        );
        return Ok(());
    }

    let runner = Runner::new(args.workflow_config()?)?;
    let report = runner.execute()?;

    println!(
        "Batch run -> processed {}, failed {}, lines {}",
        report.processed, report.errors, report.lines
    );
    for recording in &report.recordings {
        match &recording.error {
            Some(error) => println!("  {} failed: {}", recording.file.display(), error),
            None => println!(
                "  {} -> {} lines",
                recording.file.display(),
                recording.lines
            ),
        }
    }

    Ok(())
}
