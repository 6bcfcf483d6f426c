//! Step-driven control loop
//!
//! The loop advances the simulator one step at a time. Each step it buffers
//! the detector readings, commands the ramp signal for the current action and
//! accumulates the load metric. Every `control_interval` completed steps it
//! closes the interval: the buffered readings become the next state, the
//! accumulated load becomes the reward, the previous decision is handed to
//! the agent as a transition and a new action is chosen.

use metrics::{counter, gauge};
use tracing::{debug, info};

use ramp_rl_core::{
    Agent, ControlConfig, EpisodeReport, MeterAction, Result, RewardFunction, RewardModel,
    Simulator, StateVector, Transition,
};

use crate::actuator::{Actuator, ActuatorConfig};
use crate::sensor::{SensorAggregator, SensorConfig};

/// Runs episodes against a simulator on behalf of an agent
#[derive(Debug, Clone)]
pub struct ControlLoop {
    config: ControlConfig,
    sensors: SensorAggregator,
    actuator: Actuator,
    reward: RewardModel,
}

impl ControlLoop {
    /// Create a control loop from validated parts
    pub fn new(
        config: ControlConfig,
        sensors: SensorConfig,
        actuator: ActuatorConfig,
        reward: RewardModel,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sensors: SensorAggregator::new(sensors)?,
            actuator: Actuator::new(actuator)?,
            reward,
        })
    }

    /// Loop timing
    #[must_use]
    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// Reward model applied at each boundary
    #[must_use]
    pub fn reward_model(&self) -> &RewardModel {
        &self.reward
    }

    /// Run one episode of `max_steps` steps.
    ///
    /// The simulator is reset first. Errors from the simulator abort the
    /// episode. In evaluation mode the agent still acts but no transitions are
    /// stored and nothing is trained.
    pub fn run_episode<S, A>(&mut self, sim: &mut S, agent: &mut A) -> Result<EpisodeReport>
    where
        S: Simulator + ?Sized,
        A: Agent + ?Sized,
    {
        sim.reset()?;
        self.sensors.clear();

        let mut report = EpisodeReport::start();
        let mut action = MeterAction::Hold;
        let mut previous: Option<(StateVector, MeterAction)> = None;
        let mut interval_load = 0.0;
        let mut losses = Vec::new();
        let max_steps = self.config.max_steps;

        for step in 1..=max_steps {
            let frame = sim.read_sensors()?;
            self.sensors.collect_step(&frame)?;
            self.actuator.apply(sim, action, step - 1)?;
            sim.step()?;
            interval_load += sim.load_metric()?;
            report.steps = step;

            if !self.config.is_boundary(step) {
                continue;
            }

            let (state, raw) = self.sensors.flush_interval();
            let reward = self.reward.reward_for(interval_load);
            report.total_reward += reward.value();
            report
                .history
                .record_interval(&raw, interval_load, reward, report.total_reward);

            if let Some((prev_state, prev_action)) = previous {
                if agent.is_training() {
                    let terminal = self.config.terminal_on_episode_end && step == max_steps;
                    agent.remember(Transition::new(prev_state, prev_action, reward, state, terminal));
                    report.transitions += 1;
                    counter!("ramp_control_transitions_total", 1);

                    if let Some(loss) = agent.replay()? {
                        losses.push(loss);
                        report.training_updates += 1;
                    }
                }
            }

            action = agent.act(&state);
            report.decisions += 1;
            report.actions.push(action);
            counter!("ramp_control_decisions_total", 1);
            gauge!("ramp_control_interval_load", interval_load);
            debug!(
                step,
                %action,
                reward = reward.value(),
                load = interval_load,
                "control decision"
            );

            previous = Some((state, action));
            interval_load = 0.0;
        }

        agent.end_episode();
        report.final_epsilon = agent.epsilon();
        if !losses.is_empty() {
            report.mean_loss = Some(losses.iter().sum::<f64>() / losses.len() as f64);
        }
        report.finish();

        info!(
            episode = %report.id,
            steps = report.steps,
            decisions = report.decisions,
            score = report.total_reward,
            epsilon = report.final_epsilon,
            "episode complete"
        );
        Ok(report)
    }
}
