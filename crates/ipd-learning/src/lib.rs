//! Q-learning for the Iterated Prisoner's Dilemma
//!
//! A tabular Q-learning agent trained against fixed opponent strategies.
//! The environment plays one match round by round and summarises the
//! history as the last round's pair of moves; the agent keeps one value
//! per (observation, action) and updates it with the one-step TD rule.

mod error;
mod random;
mod strategy;
mod env;
mod agent;
mod config;
mod training;

use serde::{Deserialize, Serialize};

pub use error::{IpdError, Result};
pub use random::SeededRng;
pub use strategy::{
    always_cooperate, always_defect, generous_cooperation_probability, generous_tit_for_tat,
    imperfect_tit_for_tat, suspicious_tit_for_tat, tit_for_tat, Action, OpponentInput, Strategy,
    StrategyKind, DEFAULT_IMITATION_PROBABILITY,
};
pub use env::{IpdEnv, Observation, StepResult, NUM_STATES};
pub use agent::{QAgent, QTable, NUM_ACTIONS};
pub use config::{AgentConfig, EnvConfig, TrainingConfig};
pub use training::{
    evaluate_episode, run_episode, train, train_with_config, train_with_progress, EpisodeSummary,
    OpponentStats, RoundRecord, TrainingReport,
};

/// Payoff quadruple for the Prisoner's Dilemma
///
/// A proper dilemma needs `T > R > P > S`; this is not enforced, see
/// [`Payoffs::is_dilemma`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payoffs {
    /// R: both cooperate
    pub reward: f64,
    /// T: defect against a cooperator
    pub temptation: f64,
    /// S: cooperate against a defector
    pub sucker: f64,
    /// P: both defect
    pub punishment: f64,
}

impl Payoffs {
    /// Argument order is (R, T, S, P)
    pub fn new(reward: f64, temptation: f64, sucker: f64, punishment: f64) -> Self {
        Self { reward, temptation, sucker, punishment }
    }

    /// Whether `T > R > P > S` holds
    pub fn is_dilemma(&self) -> bool {
        self.temptation > self.reward
            && self.reward > self.punishment
            && self.punishment > self.sucker
    }

    /// Payoffs for one round, returns (agent_reward, opponent_reward)
    pub fn payoff(&self, agent: Action, opponent: Action) -> (f64, f64) {
        match (agent, opponent) {
            (Action::Cooperate, Action::Cooperate) => (self.reward, self.reward),
            (Action::Cooperate, Action::Defect) => (self.sucker, self.temptation),
            (Action::Defect, Action::Cooperate) => (self.temptation, self.sucker),
            (Action::Defect, Action::Defect) => (self.punishment, self.punishment),
        }
    }

    /// The full reward matrix, indexed `[agent][opponent]`
    pub fn reward_matrix(&self) -> RewardMatrix {
        let mut entries = [[(0.0, 0.0); 2]; 2];
        for agent in Action::ALL {
            for opponent in Action::ALL {
                entries[agent.index()][opponent.index()] = self.payoff(agent, opponent);
            }
        }
        RewardMatrix { entries }
    }
}

impl Default for Payoffs {
    fn default() -> Self {
        Self::new(3.0, 5.0, 0.0, 1.0)
    }
}

/// Total mapping from (agent_action, opponent_action) to (agent_reward, opponent_reward)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RewardMatrix {
    entries: [[(f64, f64); 2]; 2],
}

impl RewardMatrix {
    pub fn get(&self, agent: Action, opponent: Action) -> (f64, f64) {
        self.entries[agent.index()][opponent.index()]
    }
}
