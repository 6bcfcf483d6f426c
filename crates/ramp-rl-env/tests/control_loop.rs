use async_trait::async_trait;
use std::path::Path;

use ramp_rl_agent::{DQNAgent, DQNConfig};
use ramp_rl_core::{
    Agent, AgentConfig, CalibrationConstants, ControlConfig, GroupReading, LoopReading,
    MeterAction, RLError, Result, RewardModel, SensorFrame, SignalPhase, Simulator, StateVector,
    Transition,
};
use ramp_rl_env::{calibrate, ActuatorConfig, ControlLoop, SensorConfig, TraceFrame, TraceSimulator};

/// Simulator reporting the same detector frame every step
struct ConstantSim {
    frame: SensorFrame,
    load: fn(usize) -> f64,
    completed: usize,
    limit: usize,
    phases: Vec<SignalPhase>,
    resets: usize,
}

impl ConstantSim {
    fn new(reading: LoopReading, queue: f64, load: fn(usize) -> f64) -> Self {
        Self {
            frame: constant_frame(reading, queue),
            load,
            completed: 0,
            limit: usize::MAX,
            phases: Vec::new(),
            resets: 0,
        }
    }
}

fn constant_frame(reading: LoopReading, queue: f64) -> SensorFrame {
    SensorFrame {
        groups: SensorConfig::default()
            .lanes
            .iter()
            .map(|&lanes| GroupReading::uniform(lanes, reading))
            .collect(),
        ramp_queue: [queue, queue],
    }
}

impl Simulator for ConstantSim {
    fn reset(&mut self) -> Result<()> {
        self.completed = 0;
        self.phases.clear();
        self.resets += 1;
        Ok(())
    }

    fn read_sensors(&mut self) -> Result<SensorFrame> {
        Ok(self.frame.clone())
    }

    fn set_phase(&mut self, phase: SignalPhase) -> Result<()> {
        self.phases.push(phase);
        Ok(())
    }

    fn step(&mut self) -> Result<()> {
        if self.completed >= self.limit {
            return Err(RLError::Simulator("connection closed".to_string()));
        }
        self.completed += 1;
        Ok(())
    }

    fn load_metric(&mut self) -> Result<f64> {
        Ok((self.load)(self.completed))
    }
}

/// Agent that always picks the same action and records what it is given
struct ScriptedAgent {
    action: MeterAction,
    remembered: Vec<Transition>,
    replays: usize,
    episodes: usize,
}

impl ScriptedAgent {
    fn new(action: MeterAction) -> Self {
        Self {
            action,
            remembered: Vec::new(),
            replays: 0,
            episodes: 0,
        }
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn act(&mut self, _state: &StateVector) -> MeterAction {
        self.action
    }

    fn remember(&mut self, transition: Transition) {
        self.remembered.push(transition);
    }

    fn replay(&mut self) -> Result<Option<f64>> {
        self.replays += 1;
        Ok(Some(0.5))
    }

    fn end_episode(&mut self) {
        self.episodes += 1;
    }

    fn epsilon(&self) -> f64 {
        0.0
    }

    fn is_training(&self) -> bool {
        true
    }

    async fn save(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    async fn load(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

fn control_loop(config: ControlConfig) -> ControlLoop {
    ControlLoop::new(
        config,
        SensorConfig::default(),
        ActuatorConfig::default(),
        RewardModel::new(CalibrationConstants::default()).unwrap(),
    )
    .unwrap()
}

fn short_episode() -> ControlConfig {
    ControlConfig {
        control_interval: 15,
        max_steps: 90,
        terminal_on_episode_end: false,
    }
}

fn dqn_agent() -> DQNAgent {
    DQNAgent::new(DQNConfig {
        base: AgentConfig {
            seed: Some(42),
            ..AgentConfig::default()
        },
        ..DQNConfig::default()
    })
    .unwrap()
}

#[test]
fn ninety_step_episode_makes_six_decisions() {
    let mut sim = ConstantSim::new(LoopReading::new(10.0, 5.0, 0), 2.0, |_| 100.0);
    let mut agent = dqn_agent();
    let mut control = control_loop(short_episode());

    let report = control.run_episode(&mut sim, &mut agent).unwrap();

    assert_eq!(report.steps, 90);
    assert_eq!(report.decisions, 6);
    assert_eq!(report.transitions, 5);
    assert_eq!(agent.buffer().len(), 5);
    // batch of 32 never fills in one short episode
    assert_eq!(report.training_updates, 0);
    assert_eq!(report.mean_loss, None);
    assert!((report.final_epsilon - 0.95).abs() < 1e-12);
    assert_eq!(report.history.len(), 6);
    assert_eq!(report.actions.len(), 6);
    assert!(report.end_time.is_some());
    assert_eq!(sim.resets, 1);
}

#[test]
fn transitions_chain_consecutive_states() {
    let mut sim = ConstantSim::new(LoopReading::new(10.0, 5.0, 0), 2.0, |_| 100.0);
    let mut agent = ScriptedAgent::new(MeterAction::Meter);
    let mut control = control_loop(short_episode());

    let report = control.run_episode(&mut sim, &mut agent).unwrap();

    assert_eq!(agent.remembered.len(), 5);
    assert_eq!(agent.replays, 5);
    assert_eq!(report.training_updates, 5);
    assert_eq!(report.mean_loss, Some(0.5));
    assert_eq!(agent.episodes, 1);

    let expected = StateVector::new([
        10.0 / 30.0,
        0.05,
        10.0 / 30.0,
        0.05,
        10.0 / 30.0,
        0.05,
        0.0,
        0.0,
        0.0,
        0.1,
    ]);
    for t in &agent.remembered {
        assert_eq!(t.action, MeterAction::Meter);
        assert!(!t.terminal);
        for (a, b) in t.next_state.features().iter().zip(expected.features()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}

#[test]
fn interval_load_sets_the_reward() {
    // 15 steps at 200 vehicles give an interval load of 3000
    let mut sim = ConstantSim::new(LoopReading::new(10.0, 5.0, 0), 2.0, |_| 200.0);
    let mut agent = ScriptedAgent::new(MeterAction::Hold);
    let mut control = control_loop(short_episode());

    let report = control.run_episode(&mut sim, &mut agent).unwrap();

    let expected = (5601.0 - 3000.0) / 4238.26;
    for t in &agent.remembered {
        assert!((t.reward.value() - expected).abs() < 1e-12);
    }
    assert!((report.total_reward - 6.0 * expected).abs() < 1e-9);
    assert_eq!(report.history.get("load").unwrap(), &[3000.0; 6]);
}

#[test]
fn first_interval_holds_then_meters() {
    let mut sim = ConstantSim::new(LoopReading::new(10.0, 5.0, 0), 2.0, |_| 0.0);
    let mut agent = ScriptedAgent::new(MeterAction::Meter);
    let mut control = control_loop(short_episode());

    control.run_episode(&mut sim, &mut agent).unwrap();

    assert_eq!(sim.phases.len(), 90);
    assert!(sim.phases[..15].iter().all(|p| *p == SignalPhase::FreeFlow));
    for (step, phase) in sim.phases.iter().enumerate().skip(15) {
        let expected = if step % 6 < 2 {
            SignalPhase::FreeFlow
        } else {
            SignalPhase::Restrict
        };
        assert_eq!(*phase, expected, "step {step}");
    }
}

#[test]
fn final_transition_can_be_terminal() {
    let mut sim = ConstantSim::new(LoopReading::new(10.0, 5.0, 0), 2.0, |_| 0.0);
    let mut agent = ScriptedAgent::new(MeterAction::Hold);
    let mut control = control_loop(ControlConfig {
        terminal_on_episode_end: true,
        ..short_episode()
    });

    control.run_episode(&mut sim, &mut agent).unwrap();

    let terminal: Vec<bool> = agent.remembered.iter().map(|t| t.terminal).collect();
    assert_eq!(terminal, vec![false, false, false, false, true]);
}

#[test]
fn evaluation_stores_and_trains_nothing() {
    let mut sim = ConstantSim::new(LoopReading::new(10.0, 5.0, 0), 2.0, |_| 100.0);
    let mut agent = dqn_agent();
    agent.set_evaluation_mode();
    let mut control = control_loop(short_episode());

    let report = control.run_episode(&mut sim, &mut agent).unwrap();

    assert_eq!(report.decisions, 6);
    assert_eq!(report.transitions, 0);
    assert!(agent.buffer().is_empty());
    assert_eq!(report.final_epsilon, 0.0);
}

#[test]
fn simulator_failure_aborts_the_episode() {
    let mut sim = ConstantSim::new(LoopReading::new(10.0, 5.0, 0), 2.0, |_| 0.0);
    sim.limit = 40;
    let mut agent = ScriptedAgent::new(MeterAction::Hold);
    let mut control = control_loop(short_episode());

    let err = control.run_episode(&mut sim, &mut agent).unwrap_err();
    assert!(matches!(err, RLError::Simulator(_)));
    assert_eq!(agent.episodes, 0);
}

#[test]
fn calibration_uses_interval_totals() {
    let mut sim = ConstantSim::new(LoopReading::new(10.0, 5.0, 0), 2.0, |step| step as f64);
    let config = ControlConfig {
        control_interval: 15,
        max_steps: 45,
        terminal_on_episode_end: false,
    };

    let report = calibrate(&mut sim, &config).unwrap();

    assert_eq!(report.interval_loads, vec![120.0, 345.0, 570.0]);
    assert_eq!(report.constants.alpha, 570.0);
    assert!((report.constants.beta - 345.0).abs() < 1e-9);
    assert!(sim.phases.iter().all(|p| *p == SignalPhase::FreeFlow));
}

#[tokio::test]
async fn trace_file_drives_a_training_episode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.jsonl");
    let frame = constant_frame(LoopReading::new(12.0, 8.0, 1), 3.0);
    let lines: Vec<String> = (0..30)
        .map(|i| {
            serde_json::to_string(&TraceFrame {
                sensors: frame.clone(),
                load: f64::from(i),
            })
            .unwrap()
        })
        .collect();
    tokio::fs::write(&path, lines.join("\n")).await.unwrap();

    let mut sim = TraceSimulator::load(&path).await.unwrap();
    let mut agent = dqn_agent();
    let mut control = control_loop(ControlConfig {
        control_interval: 15,
        max_steps: 30,
        terminal_on_episode_end: false,
    });

    let first = control.run_episode(&mut sim, &mut agent).unwrap();
    assert_eq!(first.decisions, 2);
    assert_eq!(first.transitions, 1);
    assert_eq!(first.history.get("load").unwrap(), &[105.0, 330.0]);
    assert_eq!(
        sim.phase_count(SignalPhase::FreeFlow) + sim.phase_count(SignalPhase::Restrict),
        30
    );

    // the trace rewinds for the next episode
    let second = control.run_episode(&mut sim, &mut agent).unwrap();
    assert_eq!(second.steps, 30);
}
