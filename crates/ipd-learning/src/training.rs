//! Training driver
//!
//! Runs the reset → choose_action → step → learn loop and summarises what
//! happened, in the shape the trainer binary reports.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::{QAgent, QTable};
use crate::config::TrainingConfig;
use crate::env::{IpdEnv, Observation, NUM_STATES};
use crate::error::Result;
use crate::random::SeededRng;
use crate::strategy::Action;

/// One played round
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    /// What the agent saw before acting
    pub observation: Observation,
    pub agent_action: Action,
    pub opponent_action: Action,
    pub reward: f64,
    pub cumulative_reward: f64,
}

/// Result of a complete episode
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// Position of the opponent in the pool
    pub opponent_index: usize,
    pub opponent: String,
    pub rounds: Vec<RoundRecord>,
    pub total_reward: f64,
    /// Fraction of rounds in which the agent cooperated
    pub cooperation_rate: f64,
}

/// Per-opponent aggregate
///
/// One per pool entry, so two entries sharing a name stay apart.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OpponentStats {
    /// Position in the pool
    pub index: usize,
    pub name: String,
    pub episodes: u32,
    pub mean_reward: f64,
}

/// Result of a training run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub episodes: u32,
    /// Mean total reward per episode
    pub mean_reward: f64,
    /// Opponents that played at least once, in pool order
    pub per_opponent: Vec<OpponentStats>,
    pub q_table: QTable,
    /// Greedy action per state index
    pub policy: [Action; NUM_STATES],
}

/// Play one episode, learning after every step
pub fn run_episode<R: Rng>(
    env: &mut IpdEnv,
    agent: &mut QAgent,
    rng: &mut R,
) -> Result<EpisodeSummary> {
    play_episode(env, agent, rng, true)
}

/// Play one episode greedily without touching the value table
pub fn evaluate_episode<R: Rng>(
    env: &mut IpdEnv,
    agent: &QAgent,
    rng: &mut R,
) -> Result<EpisodeSummary> {
    let mut greedy = agent.clone();
    greedy.set_epsilon(0.0)?;
    play_episode(env, &mut greedy, rng, false)
}

fn play_episode<R: Rng>(
    env: &mut IpdEnv,
    agent: &mut QAgent,
    rng: &mut R,
    learn: bool,
) -> Result<EpisodeSummary> {
    let mut observation = env.reset(rng);
    let opponent_index = env.current_opponent_index().unwrap_or_default();
    let opponent = env
        .current_opponent()
        .map(|s| s.name().to_string())
        .unwrap_or_default();

    let mut rounds = Vec::new();
    let mut total_reward = 0.0;

    loop {
        let action = agent.choose_action(&observation, rng)?;
        let result = env.step(action.as_u8(), rng)?;
        if learn {
            agent.learn(&observation, action, result.reward, &result.observation, result.done)?;
        }

        total_reward += result.reward;
        rounds.push(RoundRecord {
            round: env.current_round(),
            observation,
            agent_action: action,
            opponent_action: Action::try_from(result.observation.opponent)?,
            reward: result.reward,
            cumulative_reward: total_reward,
        });

        observation = result.observation;
        if result.done {
            break;
        }
    }

    let cooperated = rounds
        .iter()
        .filter(|r| r.agent_action == Action::Cooperate)
        .count();
    let cooperation_rate = cooperated as f64 / rounds.len() as f64;

    Ok(EpisodeSummary {
        opponent_index,
        opponent,
        rounds,
        total_reward,
        cooperation_rate,
    })
}

/// Train for `episodes` episodes; the table carries over between them
pub fn train<R: Rng>(
    env: &mut IpdEnv,
    agent: &mut QAgent,
    episodes: u32,
    rng: &mut R,
) -> Result<TrainingReport> {
    train_with_progress(env, agent, episodes, rng, |_, _| {})
}

/// [`train`], calling `on_episode` with the 0-based index and summary of
/// every finished episode
pub fn train_with_progress<R, F>(
    env: &mut IpdEnv,
    agent: &mut QAgent,
    episodes: u32,
    rng: &mut R,
    mut on_episode: F,
) -> Result<TrainingReport>
where
    R: Rng,
    F: FnMut(u32, &EpisodeSummary),
{
    let mut reward_sum = 0.0;
    let mut per_opponent = vec![(0u32, 0.0f64); env.strategies().len()];

    for episode in 0..episodes {
        let summary = run_episode(env, agent, rng)?;
        on_episode(episode, &summary);
        debug!(
            episode,
            opponent = %summary.opponent,
            total_reward = summary.total_reward,
            cooperation_rate = summary.cooperation_rate,
            "episode finished"
        );

        reward_sum += summary.total_reward;
        let entry = &mut per_opponent[summary.opponent_index];
        entry.0 += 1;
        entry.1 += summary.total_reward;
    }

    let per_opponent = per_opponent
        .into_iter()
        .zip(env.strategies())
        .enumerate()
        .filter(|(_, ((count, _), _))| *count > 0)
        .map(|(index, ((count, sum), strategy))| OpponentStats {
            index,
            name: strategy.name().to_string(),
            episodes: count,
            mean_reward: sum / count as f64,
        })
        .collect();

    Ok(TrainingReport {
        episodes,
        mean_reward: if episodes == 0 { 0.0 } else { reward_sum / episodes as f64 },
        per_opponent,
        q_table: *agent.q_table(),
        policy: agent.policy(),
    })
}

/// Build the environment and agent from `config` and train with its seed
pub fn train_with_config(config: &TrainingConfig) -> Result<(QAgent, TrainingReport)> {
    let mut env = IpdEnv::from_config(&config.env)?;
    let mut agent = QAgent::from_config(config.agent)?;
    let mut rng = SeededRng::from_u64(config.seed);

    let report = train(&mut env, &mut agent, config.episodes, &mut rng)?;
    Ok((agent, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::strategy::Strategy;
    use crate::Payoffs;

    fn make_rng() -> SeededRng {
        SeededRng::new(&[42u8; 32], 0)
    }

    #[test]
    fn test_episode_length_and_rewards() {
        let pool = vec![Strategy::always_cooperate()];
        let mut env = IpdEnv::new(8, Payoffs::default(), pool).unwrap();
        let mut agent = QAgent::default();
        let mut rng = make_rng();

        let summary = run_episode(&mut env, &mut agent, &mut rng).unwrap();

        assert_eq!(summary.opponent_index, 0);
        assert_eq!(summary.opponent, "always-cooperate");
        assert_eq!(summary.rounds.len(), 8);
        assert_eq!(summary.rounds[0].observation, Observation::START);
        for (i, round) in summary.rounds.iter().enumerate() {
            assert_eq!(round.round, i as u32 + 1);
            assert_eq!(round.opponent_action, Action::Cooperate);
            let expected = if round.agent_action == Action::Cooperate { 3.0 } else { 5.0 };
            assert_eq!(round.reward, expected);
        }
        let total: f64 = summary.rounds.iter().map(|r| r.reward).sum();
        assert_eq!(summary.total_reward, total);
        assert_eq!(summary.rounds.last().unwrap().cumulative_reward, total);
    }

    #[test]
    fn test_observations_chain() {
        let pool = vec![Strategy::suspicious_tit_for_tat()];
        let mut env = IpdEnv::new(6, Payoffs::default(), pool).unwrap();
        let mut agent = QAgent::default();
        let mut rng = make_rng();

        let summary = run_episode(&mut env, &mut agent, &mut rng).unwrap();
        for pair in summary.rounds.windows(2) {
            let expected = Observation::from_actions(pair[0].agent_action, pair[0].opponent_action);
            assert_eq!(pair[1].observation, expected);
        }
    }

    #[test]
    fn test_run_episode_learns() {
        let mut env = IpdEnv::default();
        let mut agent = QAgent::default();
        let mut rng = make_rng();

        run_episode(&mut env, &mut agent, &mut rng).unwrap();
        assert_ne!(*agent.q_table(), [[0.0; 2]; 4]);
    }

    #[test]
    fn test_evaluate_episode_leaves_table_alone() {
        let mut env = IpdEnv::default();
        let mut agent = QAgent::default();
        agent.set_q_table([[1.0, 0.0]; 4]);
        let before = agent.clone();
        let mut rng = make_rng();

        let summary = evaluate_episode(&mut env, &agent, &mut rng).unwrap();

        assert_eq!(agent, before);
        assert_eq!(summary.cooperation_rate, 1.0);
        assert_eq!(summary.total_reward, 30.0);
    }

    #[test]
    fn test_train_report() {
        let pool = vec![Strategy::always_cooperate(), Strategy::always_defect()];
        let mut env = IpdEnv::new(5, Payoffs::default(), pool).unwrap();
        let mut agent = QAgent::default();
        let mut rng = make_rng();

        let report = train(&mut env, &mut agent, 200, &mut rng).unwrap();

        assert_eq!(report.episodes, 200);
        let counted: u32 = report.per_opponent.iter().map(|s| s.episodes).sum();
        assert_eq!(counted, 200);
        let names: Vec<_> = report.per_opponent.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["always-cooperate", "always-defect"]);
        assert_eq!(report.per_opponent[0].index, 0);
        assert_eq!(report.per_opponent[1].index, 1);
        assert_eq!(report.q_table, *agent.q_table());
        assert_eq!(report.policy, agent.policy());
    }

    #[test]
    fn test_same_name_opponents_reported_apart() {
        let pool = vec![
            Strategy::imperfect_tit_for_tat(1.0).unwrap(),
            Strategy::imperfect_tit_for_tat(0.0).unwrap(),
        ];
        let mut env = IpdEnv::new(5, Payoffs::default(), pool).unwrap();
        let mut agent = QAgent::default();
        agent.set_epsilon(0.0).unwrap();
        let mut rng = make_rng();

        let report = train(&mut env, &mut agent, 100, &mut rng).unwrap();

        assert_eq!(report.per_opponent.len(), 2);
        assert_eq!(report.per_opponent[0].index, 0);
        assert_eq!(report.per_opponent[1].index, 1);
        assert!(report.per_opponent.iter().all(|s| s.name == "imptft"));
        let counted: u32 = report.per_opponent.iter().map(|s| s.episodes).sum();
        assert_eq!(counted, 100);
    }

    #[test]
    fn test_train_with_progress_sees_every_episode() {
        let mut env = IpdEnv::default();
        let mut agent = QAgent::default();
        let mut rng = make_rng();
        let mut seen = Vec::new();

        let report = train_with_progress(&mut env, &mut agent, 12, &mut rng, |i, summary| {
            seen.push((i, summary.total_reward));
        })
        .unwrap();

        assert_eq!(seen.len(), 12);
        assert_eq!(seen.first().unwrap().0, 0);
        assert_eq!(seen.last().unwrap().0, 11);
        let mean = seen.iter().map(|(_, r)| r).sum::<f64>() / 12.0;
        assert!((report.mean_reward - mean).abs() < 1e-9);
    }

    #[test]
    fn test_train_zero_episodes() {
        let mut env = IpdEnv::default();
        let mut agent = QAgent::default();
        let mut rng = make_rng();

        let report = train(&mut env, &mut agent, 0, &mut rng).unwrap();
        assert_eq!(report.mean_reward, 0.0);
        assert!(report.per_opponent.is_empty());
    }

    #[test]
    fn test_train_with_config_is_reproducible() {
        let config = TrainingConfig {
            episodes: 100,
            seed: 1234,
            agent: AgentConfig { epsilon: 0.3, ..Default::default() },
            ..TrainingConfig::default()
        };

        let (agent_a, report_a) = train_with_config(&config).unwrap();
        let (agent_b, report_b) = train_with_config(&config).unwrap();

        assert_eq!(agent_a, agent_b);
        assert_eq!(report_a, report_b);
    }
}
