//! Configuration for environments, agents and training runs

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::strategy::{OpponentInput, StrategyKind};
use crate::Payoffs;

/// Environment configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Rounds per episode
    pub num_rounds: u32,
    pub payoffs: Payoffs,
    /// Opponent pool; one is drawn uniformly at every reset
    pub opponents: Vec<StrategyKind>,
    /// Input for opponents that do not pin their own; tft always imitates the agent
    pub opponent_input: OpponentInput,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            num_rounds: 10,
            payoffs: Payoffs::default(),
            opponents: vec![StrategyKind::TitForTat],
            opponent_input: OpponentInput::default(),
        }
    }
}

/// Q-learner hyperparameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Learning rate, in (0, 1]
    pub alpha: f64,
    /// Discount factor, in [0, 1)
    pub gamma: f64,
    /// Exploration rate, in [0, 1]
    pub epsilon: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.9,
            epsilon: 0.1,
        }
    }
}

/// A complete training run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub episodes: u32,
    /// Seed for the run's single random source
    pub seed: u64,
    pub env: EnvConfig,
    pub agent: AgentConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 1000,
            seed: 0,
            env: EnvConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Parse from JSON; absent fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IpdError;

    #[test]
    fn test_defaults() {
        let config = TrainingConfig::default();
        assert_eq!(config.env.num_rounds, 10);
        assert_eq!(config.env.payoffs, Payoffs::new(3.0, 5.0, 0.0, 1.0));
        assert_eq!(config.env.opponents, vec![StrategyKind::TitForTat]);
        assert_eq!(config.env.opponent_input, OpponentInput::OwnLastMove);
        assert_eq!(config.agent.alpha, 0.1);
        assert_eq!(config.agent.gamma, 0.9);
        assert_eq!(config.agent.epsilon, 0.1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = TrainingConfig::from_json(
            r#"{
                "episodes": 50,
                "env": {
                    "num_rounds": 20,
                    "opponents": [
                        "AlwaysDefect",
                        {"ImperfectTitForTat": {"imitation_probability": 0.9}}
                    ]
                },
                "agent": {"epsilon": 0.0}
            }"#,
        )
        .unwrap();

        assert_eq!(config.episodes, 50);
        assert_eq!(config.seed, 0);
        assert_eq!(config.env.num_rounds, 20);
        assert_eq!(config.env.payoffs, Payoffs::default());
        assert_eq!(
            config.env.opponents,
            vec![
                StrategyKind::AlwaysDefect,
                StrategyKind::ImperfectTitForTat { imitation_probability: 0.9 },
            ]
        );
        assert_eq!(config.agent.epsilon, 0.0);
        assert_eq!(config.agent.alpha, 0.1);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = TrainingConfig::default();
        config.env.opponents = StrategyKind::all().to_vec();
        config.env.opponent_input = OpponentInput::AgentLastMove;

        let parsed = TrainingConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            TrainingConfig::from_json("{\"episodes\": \"many\"}"),
            Err(IpdError::Config(_))
        ));
    }
}
