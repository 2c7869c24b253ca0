//! Match environment
//!
//! Plays one Iterated Prisoner's Dilemma episode against an opponent drawn
//! from a pool. The agent only ever sees the last round's pair of moves.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::config::EnvConfig;
use crate::error::{IpdError, Result};
use crate::strategy::{Action, OpponentInput, Strategy};
use crate::{Payoffs, RewardMatrix};

/// Number of distinct observations
pub const NUM_STATES: usize = 4;

/// Last round's moves as (agent, opponent)
///
/// Before the first round the environment emits `(0, 0)`, which is the same
/// value as a round of mutual cooperation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Observation {
    pub agent: u8,
    pub opponent: u8,
}

impl Observation {
    /// Observation returned by [`IpdEnv::reset`]
    pub const START: Observation = Observation { agent: 0, opponent: 0 };

    /// Raw pair; not validated until [`Observation::state_index`]
    pub fn new(agent: u8, opponent: u8) -> Self {
        Self { agent, opponent }
    }

    pub fn from_actions(agent: Action, opponent: Action) -> Self {
        Self::new(agent.as_u8(), opponent.as_u8())
    }

    /// (0,0)→0, (0,1)→1, (1,0)→2, (1,1)→3
    pub fn state_index(&self) -> Result<usize> {
        match (self.agent, self.opponent) {
            (agent @ 0..=1, opponent @ 0..=1) => Ok(agent as usize * 2 + opponent as usize),
            (agent, opponent) => Err(IpdError::InvalidObservation { agent, opponent }),
        }
    }

    /// Inverse of [`Observation::state_index`]
    pub fn from_state_index(index: usize) -> Option<Self> {
        (index < NUM_STATES).then(|| Self::new((index / 2) as u8, (index % 2) as u8))
    }
}

impl From<(u8, u8)> for Observation {
    fn from((agent, opponent): (u8, u8)) -> Self {
        Self::new(agent, opponent)
    }
}

/// Outcome of one [`IpdEnv::step`]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// This round's moves, which are the next round's "last moves"
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
}

/// Iterated Prisoner's Dilemma environment
#[derive(Clone, Debug)]
pub struct IpdEnv {
    num_rounds: u32,
    payoffs: Payoffs,
    reward_matrix: RewardMatrix,
    strategies: Vec<Strategy>,
    opponent_input: OpponentInput,
    current_round: u32,
    agent_history: Vec<Action>,
    opponent_history: Vec<Action>,
    current_opponent: Option<usize>,
}

impl IpdEnv {
    /// Create an environment
    ///
    /// # Arguments
    /// * `num_rounds` - Rounds per episode, must be positive
    /// * `payoffs` - (R, T, S, P); the dilemma ordering is not enforced
    /// * `strategies` - Opponent pool, one is drawn per episode
    pub fn new(num_rounds: u32, payoffs: Payoffs, strategies: Vec<Strategy>) -> Result<Self> {
        if num_rounds == 0 {
            return Err(IpdError::parameter("num_rounds", num_rounds, "a positive round count"));
        }
        if strategies.is_empty() {
            return Err(IpdError::EmptyStrategyPool);
        }
        if !payoffs.is_dilemma() {
            warn!(?payoffs, "payoffs do not satisfy T > R > P > S");
        }

        Ok(Self {
            num_rounds,
            payoffs,
            reward_matrix: payoffs.reward_matrix(),
            strategies,
            opponent_input: OpponentInput::default(),
            current_round: 0,
            agent_history: Vec::new(),
            opponent_history: Vec::new(),
            current_opponent: None,
        })
    }

    /// Build from configuration, resolving each named opponent
    pub fn from_config(config: &EnvConfig) -> Result<Self> {
        let strategies = config
            .opponents
            .iter()
            .map(|kind| Strategy::from_kind(*kind, &config.payoffs))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(config.num_rounds, config.payoffs, strategies)?
            .with_opponent_input(config.opponent_input))
    }

    /// Input for strategies that do not pin their own
    pub fn with_opponent_input(mut self, opponent_input: OpponentInput) -> Self {
        self.opponent_input = opponent_input;
        self
    }

    /// Start a new episode: clear history and draw an opponent uniformly from the pool
    pub fn reset<R: Rng>(&mut self, rng: &mut R) -> Observation {
        self.current_round = 0;
        self.agent_history.clear();
        self.opponent_history.clear();
        self.current_opponent = Some(rng.gen_range(0..self.strategies.len()));
        Observation::START
    }

    /// Play one round
    ///
    /// `action` is 0 (cooperate) or 1 (defect). Fails if the episode was not
    /// reset or has already reached `num_rounds`.
    pub fn step<R: RngCore>(&mut self, action: u8, rng: &mut R) -> Result<StepResult> {
        let agent_action = Action::try_from(action)?;
        let opponent = self.current_opponent.ok_or(IpdError::EpisodeNotStarted)?;
        if self.is_done() {
            return Err(IpdError::EpisodeFinished { rounds: self.current_round });
        }

        let strategy = &self.strategies[opponent];
        let input = match strategy.input().unwrap_or(self.opponent_input) {
            OpponentInput::OwnLastMove => self.opponent_history.last().copied(),
            OpponentInput::AgentLastMove => self.agent_history.last().copied(),
        };
        let opponent_action = strategy.respond(input, rng);

        let (reward, _) = self.reward_matrix.get(agent_action, opponent_action);

        self.agent_history.push(agent_action);
        self.opponent_history.push(opponent_action);
        self.current_round += 1;
        let done = self.is_done();

        trace!(
            round = self.current_round,
            agent = ?agent_action,
            opponent = ?opponent_action,
            reward,
            done,
            "round played"
        );

        Ok(StepResult {
            observation: Observation::from_actions(agent_action, opponent_action),
            reward,
            done,
        })
    }

    /// Last round's moves, or [`Observation::START`] before the first round
    pub fn observation(&self) -> Observation {
        match (self.agent_history.last(), self.opponent_history.last()) {
            (Some(agent), Some(opponent)) => Observation::from_actions(*agent, *opponent),
            _ => Observation::START,
        }
    }

    /// Pin the opponent for the current episode (index into the pool)
    pub fn set_opponent(&mut self, index: usize) -> Result<()> {
        if index >= self.strategies.len() {
            return Err(IpdError::parameter(
                "opponent index",
                index,
                "an index into the strategy pool",
            ));
        }
        self.current_opponent = Some(index);
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        self.current_round >= self.num_rounds
    }

    pub fn num_rounds(&self) -> u32 {
        self.num_rounds
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn payoffs(&self) -> &Payoffs {
        &self.payoffs
    }

    pub fn reward_matrix(&self) -> &RewardMatrix {
        &self.reward_matrix
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn opponent_input(&self) -> OpponentInput {
        self.opponent_input
    }

    pub fn agent_history(&self) -> &[Action] {
        &self.agent_history
    }

    pub fn opponent_history(&self) -> &[Action] {
        &self.opponent_history
    }

    /// Pool index of this episode's opponent; `None` before the first reset
    pub fn current_opponent_index(&self) -> Option<usize> {
        self.current_opponent
    }

    pub fn current_opponent(&self) -> Option<&Strategy> {
        self.current_opponent.map(|i| &self.strategies[i])
    }
}

impl Default for IpdEnv {
    /// Ten rounds of standard payoffs against Tit-for-Tat
    fn default() -> Self {
        Self {
            num_rounds: 10,
            payoffs: Payoffs::default(),
            reward_matrix: Payoffs::default().reward_matrix(),
            strategies: vec![Strategy::tit_for_tat()],
            opponent_input: OpponentInput::default(),
            current_round: 0,
            agent_history: Vec::new(),
            opponent_history: Vec::new(),
            current_opponent: None,
        }
    }
}
