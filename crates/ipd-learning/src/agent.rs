//! Tabular Q-learning agent
//!
//! One value per (observation, action), epsilon-greedy action selection and
//! the one-step TD update
//!
//! Q(s,a) ← Q(s,a) + α[r + γ max_a' Q(s',a') - Q(s,a)]

use rand::Rng;

use crate::config::AgentConfig;
use crate::env::{Observation, NUM_STATES};
use crate::error::{IpdError, Result};
use crate::strategy::Action;

/// Number of actions: cooperate and defect
pub const NUM_ACTIONS: usize = 2;

/// Value table indexed `[state_index][action]`
pub type QTable = [[f64; NUM_ACTIONS]; NUM_STATES];

/// Epsilon-greedy Q-learner over the four last-round observations
#[derive(Clone, Debug, PartialEq)]
pub struct QAgent {
    action_space: usize,
    observation_space: usize,
    alpha: f64,
    gamma: f64,
    epsilon: f64,
    q_table: QTable,
}

impl QAgent {
    /// Create an agent with an all-zero table
    ///
    /// # Arguments
    /// * `action_space` - Must be 2
    /// * `observation_space` - Informational; the table always has 4 rows
    /// * `config` - alpha in (0, 1], gamma in [0, 1), epsilon in [0, 1]
    pub fn new(action_space: usize, observation_space: usize, config: AgentConfig) -> Result<Self> {
        if action_space != NUM_ACTIONS {
            return Err(IpdError::parameter("action_space", action_space, "exactly 2 actions"));
        }
        if !(config.alpha > 0.0 && config.alpha <= 1.0) {
            return Err(IpdError::parameter("alpha", config.alpha, "a learning rate in (0, 1]"));
        }
        if !(0.0..1.0).contains(&config.gamma) {
            return Err(IpdError::parameter("gamma", config.gamma, "a discount factor in [0, 1)"));
        }
        validate_epsilon(config.epsilon)?;

        Ok(Self {
            action_space,
            observation_space,
            alpha: config.alpha,
            gamma: config.gamma,
            epsilon: config.epsilon,
            q_table: [[0.0; NUM_ACTIONS]; NUM_STATES],
        })
    }

    /// Agent for the standard 2-action, 4-observation game
    pub fn from_config(config: AgentConfig) -> Result<Self> {
        Self::new(NUM_ACTIONS, NUM_STATES, config)
    }

    /// Row of the value table for an observation
    pub fn state_index(&self, observation: &Observation) -> Result<usize> {
        observation.state_index()
    }

    /// Epsilon-greedy action selection
    ///
    /// Explores uniformly with probability epsilon, otherwise takes the
    /// first action with the highest value.
    pub fn choose_action<R: Rng>(&self, observation: &Observation, rng: &mut R) -> Result<Action> {
        let state = self.state_index(observation)?;
        if rng.gen::<f64>() < self.epsilon {
            Ok(Action::ALL[rng.gen_range(0..NUM_ACTIONS)])
        } else {
            Ok(argmax(&self.q_table[state]))
        }
    }

    /// Best known action, ignoring epsilon
    pub fn greedy_action(&self, observation: &Observation) -> Result<Action> {
        Ok(argmax(&self.q_table[self.state_index(observation)?]))
    }

    /// `reward + gamma * max_a Q(next_observation, a)`
    pub fn td_target(&self, reward: f64, next_observation: &Observation) -> Result<f64> {
        let next = self.state_index(next_observation)?;
        let best_next = self.q_table[next]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        Ok(reward + self.gamma * best_next)
    }

    /// Move Q(observation, action) a step of size alpha toward `td_target`
    pub fn update(
        &mut self,
        observation: &Observation,
        action: Action,
        td_target: f64,
    ) -> Result<()> {
        let state = self.state_index(observation)?;
        let entry = &mut self.q_table[state][action.index()];
        let td_error = td_target - *entry;
        *entry += self.alpha * td_error;
        Ok(())
    }

    /// One Q-learning step for a transition
    ///
    /// `done` is accepted for the driver's convenience but the update still
    /// bootstraps from `next_observation` at the end of an episode.
    pub fn learn(
        &mut self,
        observation: &Observation,
        action: Action,
        reward: f64,
        next_observation: &Observation,
        _done: bool,
    ) -> Result<()> {
        let target = self.td_target(reward, next_observation)?;
        self.update(observation, action, target)
    }

    pub fn q_value(&self, observation: &Observation, action: Action) -> Result<f64> {
        Ok(self.q_table[self.state_index(observation)?][action.index()])
    }

    /// Greedy action for every state index
    pub fn policy(&self) -> [Action; NUM_STATES] {
        let mut policy = [Action::Cooperate; NUM_STATES];
        for (slot, row) in policy.iter_mut().zip(self.q_table.iter()) {
            *slot = argmax(row);
        }
        policy
    }

    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    /// Replace the whole table (used by tests and to seed a warm start)
    pub fn set_q_table(&mut self, q_table: QTable) {
        self.q_table = q_table;
    }

    pub fn set_epsilon(&mut self, epsilon: f64) -> Result<()> {
        validate_epsilon(epsilon)?;
        self.epsilon = epsilon;
        Ok(())
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn action_space(&self) -> usize {
        self.action_space
    }

    pub fn observation_space(&self) -> usize {
        self.observation_space
    }
}

impl Default for QAgent {
    fn default() -> Self {
        let config = AgentConfig::default();
        Self {
            action_space: NUM_ACTIONS,
            observation_space: NUM_STATES,
            alpha: config.alpha,
            gamma: config.gamma,
            epsilon: config.epsilon,
            q_table: [[0.0; NUM_ACTIONS]; NUM_STATES],
        }
    }
}

fn validate_epsilon(epsilon: f64) -> Result<()> {
    if (0.0..=1.0).contains(&epsilon) {
        Ok(())
    } else {
        Err(IpdError::parameter("epsilon", epsilon, "an exploration rate in [0, 1]"))
    }
}

/// First action with the maximal value
fn argmax(row: &[f64; NUM_ACTIONS]) -> Action {
    let mut best = 0;
    for (i, value) in row.iter().enumerate().skip(1) {
        if *value > row[best] {
            best = i;
        }
    }
    Action::ALL[best]
}
