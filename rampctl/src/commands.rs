// Command implementations for rampctl

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use ramp_rl_agent::DQNAgent;
use ramp_rl_core::{EpisodeReport, RewardModel, Simulator};
use ramp_rl_env::{ControlLoop, TraceSimulator};

use crate::config::RampConfig;

/// File the best-scoring parameters are written to
pub const BEST_MODEL_FILE: &str = "best_model.json";
/// Per-episode statistics log
pub const STATS_FILE: &str = "training_stats.jsonl";

#[derive(Args, Debug, Clone)]
pub struct CalibrateArgs {
    /// JSON-lines trace to replay
    #[arg(long)]
    pub trace: PathBuf,

    /// Steps to simulate (defaults to the configured episode length)
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// JSON-lines trace to replay
    #[arg(long)]
    pub trace: PathBuf,

    /// Worst baseline interval load
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Mean baseline interval load
    #[arg(long)]
    pub beta: Option<f64>,

    /// Number of training episodes
    #[arg(long, default_value = "100")]
    pub episodes: usize,

    /// Directory for the best model and training statistics
    #[arg(long, default_value = "models")]
    pub model_dir: PathBuf,

    /// Seed for weight init, exploration and replay sampling
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// JSON-lines trace to replay
    #[arg(long)]
    pub trace: PathBuf,

    /// Trained model checkpoint
    #[arg(long, default_value = "models/best_model.json")]
    pub model: PathBuf,

    /// Worst baseline interval load
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Mean baseline interval load
    #[arg(long)]
    pub beta: Option<f64>,

    /// Print the episode report as JSON
    #[arg(long)]
    pub json: bool,
}

/// One line of the training statistics log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeStats {
    pub episode: usize,
    pub score: f64,
    pub steps: usize,
    pub decisions: usize,
    pub transitions: usize,
    pub training_updates: usize,
    pub mean_loss: Option<f64>,
    pub epsilon: f64,
    pub best: bool,
    pub timestamp: DateTime<Utc>,
}

impl EpisodeStats {
    fn from_report(episode: usize, report: &EpisodeReport, best: bool) -> Self {
        Self {
            episode,
            score: report.total_reward,
            steps: report.steps,
            decisions: report.decisions,
            transitions: report.transitions,
            training_updates: report.training_updates,
            mean_loss: report.mean_loss,
            epsilon: report.final_epsilon,
            best,
            timestamp: report.end_time.unwrap_or_else(Utc::now),
        }
    }
}

pub async fn calibrate(config: &RampConfig, args: CalibrateArgs) -> Result<()> {
    let mut control = config.control.clone();
    if let Some(max_steps) = args.max_steps {
        control.max_steps = max_steps;
    }

    let mut sim = TraceSimulator::load(&args.trace).await?;
    let report = ramp_rl_env::calibrate(&mut sim, &control).context("Calibration run failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "alpha": report.constants.alpha,
                "beta": report.constants.beta,
                "intervals": report.interval_loads.len(),
            }))?
        );
    } else {
        println!("📏 Calibration (no control, {} steps)", control.max_steps);
        println!("   Intervals: {}", report.interval_loads.len());
        println!("   Alpha (max interval load): {}", report.constants.alpha);
        println!("   Beta (mean interval load): {}", report.constants.beta);
    }
    Ok(())
}

pub async fn train(mut config: RampConfig, args: TrainArgs) -> Result<()> {
    config.override_calibration(args.alpha, args.beta)?;
    if args.seed.is_some() {
        config.agent.base.seed = args.seed;
    }

    let mut sim = TraceSimulator::load(&args.trace).await?;
    let mut agent = DQNAgent::new(config.agent.clone()).context("Failed to create agent")?;
    let mut control = control_loop(&config)?;

    fs::create_dir_all(&args.model_dir)
        .await
        .with_context(|| format!("Failed to create {}", args.model_dir.display()))?;
    let best_path = args.model_dir.join(BEST_MODEL_FILE);
    let stats_path = args.model_dir.join(STATS_FILE);

    println!("🤖 Starting training");
    println!("   Episodes: {}", args.episodes);
    println!(
        "   Alpha: {}  Beta: {}",
        config.calibration.alpha, config.calibration.beta
    );
    println!("   Model directory: {}", args.model_dir.display());

    let mut best_score = f64::NEG_INFINITY;
    for episode in 0..args.episodes {
        let report = control
            .run_episode(&mut sim, &mut agent)
            .with_context(|| format!("Episode {episode} failed"))?;

        let improved = report.total_reward > best_score;
        if improved {
            best_score = report.total_reward;
            agent
                .checkpoint(Some(best_score))
                .save(&best_path)
                .await
                .context("Failed to save best model")?;
            info!(episode, score = best_score, "new best model");
        }

        append_stats(&stats_path, &EpisodeStats::from_report(episode, &report, improved)).await?;
        println!(
            "Episode {:>4}: score={:>8.3} epsilon={:.3} transitions={}{}",
            episode,
            report.total_reward,
            report.final_epsilon,
            report.transitions,
            if improved { "  ⭐" } else { "" }
        );
    }

    sim.close()?;
    println!("\n✅ Training complete. Best score: {best_score:.3}");
    println!("   Saved: {}", best_path.display());
    Ok(())
}

pub async fn evaluate(mut config: RampConfig, args: EvaluateArgs) -> Result<()> {
    config.override_calibration(args.alpha, args.beta)?;

    let mut agent = DQNAgent::from_checkpoint(config.agent.clone(), &args.model)
        .await
        .context("Cannot evaluate without a trained model")?;
    let mut sim = TraceSimulator::load(&args.trace).await?;
    let mut control = control_loop(&config)?;

    let report = control
        .run_episode(&mut sim, &mut agent)
        .context("Evaluation episode failed")?;
    sim.close()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("🔍 Evaluating {}", args.model.display());
    for line in decision_lines(&report, config.control.control_interval) {
        println!("   {line}");
    }
    println!("\nFinal score: {:.3}", report.total_reward);
    Ok(())
}

/// One line per decision with the interval's queue and upstream speed
fn decision_lines(report: &EpisodeReport, interval: usize) -> Vec<String> {
    let queue = report.history.get("queue").unwrap_or_default();
    let speed = report.history.get("speed_g1").unwrap_or_default();
    report
        .actions
        .iter()
        .enumerate()
        .map(|(i, action)| {
            format!(
                "decision {:>4} (step {:>5}): {}  queue={:.2} speed={:.2}",
                i + 1,
                (i + 1) * interval,
                action,
                queue.get(i).copied().unwrap_or(0.0),
                speed.get(i).copied().unwrap_or(0.0),
            )
        })
        .collect()
}

fn control_loop(config: &RampConfig) -> Result<ControlLoop> {
    let reward = RewardModel::new(config.calibration)?;
    ControlLoop::new(
        config.control.clone(),
        config.sensor.clone(),
        config.actuator.clone(),
        reward,
    )
    .context("Invalid control configuration")
}

async fn append_stats(path: &Path, stats: &EpisodeStats) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    file.write_all(serde_json::to_string(stats)?.as_bytes()).await?;
    file.write_all(b"\n").await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ramp_rl_core::{ControlConfig, GroupReading, LoopReading, SensorFrame};
    use ramp_rl_env::TraceFrame;

    async fn write_trace(dir: &Path, steps: usize) -> PathBuf {
        let frame = SensorFrame {
            groups: [5, 4, 4]
                .iter()
                .map(|&lanes| GroupReading::uniform(lanes, LoopReading::new(12.0, 6.0, 1)))
                .collect(),
            ramp_queue: [2.0, 4.0],
        };
        let lines: Vec<String> = (0..steps)
            .map(|i| {
                serde_json::to_string(&TraceFrame {
                    sensors: frame.clone(),
                    load: 100.0 + i as f64,
                })
                .unwrap()
            })
            .collect();
        let path = dir.join("trace.jsonl");
        fs::write(&path, lines.join("\n")).await.unwrap();
        path
    }

    fn short_config() -> RampConfig {
        let mut config = RampConfig {
            control: ControlConfig {
                control_interval: 15,
                max_steps: 60,
                terminal_on_episode_end: false,
            },
            ..RampConfig::default()
        };
        config.agent.base.seed = Some(1);
        config
    }

    #[tokio::test]
    async fn train_then_evaluate() {
        let dir = tempfile::tempdir().unwrap();
        let trace = write_trace(dir.path(), 60).await;
        let model_dir = dir.path().join("models");

        train(
            short_config(),
            TrainArgs {
                trace: trace.clone(),
                alpha: Some(2000.0),
                beta: Some(1500.0),
                episodes: 3,
                model_dir: model_dir.clone(),
                seed: None,
            },
        )
        .await
        .unwrap();

        let stats = std::fs::read_to_string(model_dir.join(STATS_FILE)).unwrap();
        let lines: Vec<EpisodeStats> = stats
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].best);
        assert_eq!(lines[0].decisions, 4);
        assert!(model_dir.join(BEST_MODEL_FILE).exists());

        evaluate(
            short_config(),
            EvaluateArgs {
                trace,
                model: model_dir.join(BEST_MODEL_FILE),
                alpha: Some(2000.0),
                beta: Some(1500.0),
                json: true,
            },
        )
        .await
        .unwrap();
    }

    #[test]
    fn decision_lines_show_queue_and_speed() {
        let mut report = EpisodeReport::start();
        let mut raw = [0.0; ramp_rl_core::STATE_DIM];
        raw[0] = 12.5;
        raw[ramp_rl_core::STATE_DIM - 1] = 3.0;
        report
            .history
            .record_interval(&raw, 100.0, ramp_rl_core::Reward(0.2), 0.2);
        report.actions.push(ramp_rl_core::MeterAction::Meter);

        let lines = decision_lines(&report, 15);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("step    15"), "{}", lines[0]);
        assert!(lines[0].contains("queue=3.00"), "{}", lines[0]);
        assert!(lines[0].contains("speed=12.50"), "{}", lines[0]);
    }

    #[tokio::test]
    async fn evaluate_without_model_fails() {
        let dir = tempfile::tempdir().unwrap();
        let trace = write_trace(dir.path(), 60).await;
        let err = evaluate(
            short_config(),
            EvaluateArgs {
                trace,
                model: dir.path().join("missing.json"),
                alpha: None,
                beta: None,
                json: false,
            },
        )
        .await
        .unwrap_err();
        assert!(format!("{err:#}").contains("train a model first"));
    }

    #[tokio::test]
    async fn calibrate_short_trace() {
        let dir = tempfile::tempdir().unwrap();
        let trace = write_trace(dir.path(), 30).await;
        calibrate(
            &short_config(),
            CalibrateArgs {
                trace,
                max_steps: Some(30),
                json: true,
            },
        )
        .await
        .unwrap();
    }
}
