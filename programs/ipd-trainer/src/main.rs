//! IPD Trainer - trains a Q-learning agent on the Iterated Prisoner's Dilemma
//!
//! Settings come from an optional JSON config file, with command-line flags
//! taking precedence. The final report (table, greedy policy, per-opponent
//! rewards) is printed to stdout as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ipd_learning::{
    evaluate_episode, train_with_progress, IpdEnv, OpponentInput, QAgent, SeededRng,
    StrategyKind, TrainingConfig, TrainingReport,
};

#[derive(Parser, Debug)]
#[command(name = "ipd-trainer")]
#[command(version, about = "Train a tabular Q-learner against IPD strategies", long_about = None)]
struct Cli {
    /// JSON training config; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of training episodes
    #[arg(long)]
    episodes: Option<u32>,

    /// Seed for the run's random source
    #[arg(long)]
    seed: Option<u64>,

    /// Rounds per episode
    #[arg(long)]
    rounds: Option<u32>,

    /// Comma-separated opponent pool, e.g. tft,stft,gtft,imptft,always-defect
    #[arg(long, value_delimiter = ',')]
    opponents: Vec<String>,

    /// Which move opponents react to; tft always reacts to the agent
    #[arg(long, value_enum)]
    opponent_input: Option<InputArg>,

    #[arg(long)]
    alpha: Option<f64>,

    #[arg(long)]
    gamma: Option<f64>,

    #[arg(long)]
    epsilon: Option<f64>,

    /// Greedy evaluation episodes after training
    #[arg(long, default_value_t = 0)]
    eval_episodes: u32,

    /// Log a progress line every N episodes
    #[arg(long, default_value_t = 100)]
    log_every: u32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InputArg {
    Own,
    Agent,
}

impl From<InputArg> for OpponentInput {
    fn from(arg: InputArg) -> Self {
        match arg {
            InputArg::Own => OpponentInput::OwnLastMove,
            InputArg::Agent => OpponentInput::AgentLastMove,
        }
    }
}

impl Cli {
    fn training_config(&self) -> Result<TrainingConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                TrainingConfig::from_json(&json)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => TrainingConfig::default(),
        };

        if let Some(episodes) = self.episodes {
            config.episodes = episodes;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(rounds) = self.rounds {
            config.env.num_rounds = rounds;
        }
        if !self.opponents.is_empty() {
            config.env.opponents = self
                .opponents
                .iter()
                .map(|name| name.trim().parse::<StrategyKind>())
                .collect::<Result<Vec<_>, _>>()?;
        }
        if let Some(input) = self.opponent_input {
            config.env.opponent_input = input.into();
        }
        if let Some(alpha) = self.alpha {
            config.agent.alpha = alpha;
        }
        if let Some(gamma) = self.gamma {
            config.agent.gamma = gamma;
        }
        if let Some(epsilon) = self.epsilon {
            config.agent.epsilon = epsilon;
        }

        Ok(config)
    }
}

#[derive(serde::Serialize)]
struct Output {
    config: TrainingConfig,
    training: TrainingReport,
    evaluation_mean_reward: Option<f64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.training_config()?;

    let mut env = IpdEnv::from_config(&config.env)?;
    let mut agent = QAgent::from_config(config.agent)?;
    let mut rng = SeededRng::from_u64(config.seed);

    info!(
        episodes = config.episodes,
        rounds = config.env.num_rounds,
        opponents = ?config.env.opponents,
        seed = config.seed,
        "training started"
    );

    let log_every = cli.log_every.max(1);
    let mut window_reward = 0.0;
    let training = train_with_progress(
        &mut env,
        &mut agent,
        config.episodes,
        &mut rng,
        |episode, summary| {
            window_reward += summary.total_reward;
            if (episode + 1) % log_every == 0 {
                info!(
                    episode = episode + 1,
                    mean_reward = window_reward / log_every as f64,
                    "progress"
                );
                window_reward = 0.0;
            }
        },
    )?;
    info!(
        mean_reward = training.mean_reward,
        policy = ?training.policy,
        "training finished"
    );

    let evaluation_mean_reward = if cli.eval_episodes > 0 {
        let mut total = 0.0;
        for _ in 0..cli.eval_episodes {
            total += evaluate_episode(&mut env, &agent, &mut rng)?.total_reward;
        }
        Some(total / cli.eval_episodes as f64)
    } else {
        None
    };

    let output = Output {
        config,
        training,
        evaluation_mean_reward,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "ipd-trainer",
            "--episodes",
            "42",
            "--opponents",
            "tft,always-defect",
            "--opponent-input",
            "agent",
            "--epsilon",
            "0.05",
        ])
        .unwrap();
        let config = cli.training_config().unwrap();

        assert_eq!(config.episodes, 42);
        assert_eq!(
            config.env.opponents,
            vec![StrategyKind::TitForTat, StrategyKind::AlwaysDefect]
        );
        assert_eq!(config.env.opponent_input, OpponentInput::AgentLastMove);
        assert_eq!(config.agent.epsilon, 0.05);
        assert_eq!(config.agent.alpha, 0.1);
    }

    #[test]
    fn test_unknown_opponent_rejected() {
        let cli = Cli::try_parse_from(["ipd-trainer", "--opponents", "grudger"]).unwrap();
        assert!(cli.training_config().is_err());
    }
}
