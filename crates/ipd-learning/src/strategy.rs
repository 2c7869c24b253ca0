//! Actions and opponent strategies
//!
//! Every opponent shares one calling convention: it receives the single
//! move it reacts to (`None` on the first round) and returns an [`Action`].
//! Parameterized strategies bind their extra parameters when the
//! [`Strategy`] is built, so the per-call signature stays uniform.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{IpdError, Result};
use crate::Payoffs;

/// A move in the Prisoner's Dilemma
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Action {
    Cooperate = 0,
    Defect = 1,
}

impl Action {
    /// Both actions in index order
    pub const ALL: [Action; 2] = [Action::Cooperate, Action::Defect];

    /// Column of this action in the value table
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn opposite(self) -> Self {
        match self {
            Action::Cooperate => Action::Defect,
            Action::Defect => Action::Cooperate,
        }
    }
}

impl TryFrom<u8> for Action {
    type Error = IpdError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Action::Cooperate),
            1 => Ok(Action::Defect),
            _ => Err(IpdError::InvalidAction { value }),
        }
    }
}

impl From<Action> for u8 {
    fn from(action: Action) -> Self {
        action.as_u8()
    }
}

/// Which move an opponent strategy reacts to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpponentInput {
    /// The opponent's own previous move
    #[default]
    OwnLastMove,
    /// The agent's previous move
    AgentLastMove,
}

/// Always cooperate, never defect.
pub fn always_cooperate(_last: Option<Action>) -> Action {
    Action::Cooperate
}

/// Always defect, never cooperate.
pub fn always_defect(_last: Option<Action>) -> Action {
    Action::Defect
}

/// Tit-for-Tat: cooperate first, then replay the observed move.
pub fn tit_for_tat(last: Option<Action>) -> Action {
    last.unwrap_or(Action::Cooperate)
}

/// Suspicious Tit-for-Tat: defect first, then replay the observed move.
pub fn suspicious_tit_for_tat(last: Option<Action>) -> Action {
    last.unwrap_or(Action::Defect)
}

/// Generous Tit-for-Tat: cooperate first and after cooperation; after a
/// defection, cooperate with `cooperation_probability`.
pub fn generous_tit_for_tat<R: Rng + ?Sized>(
    last: Option<Action>,
    cooperation_probability: f64,
    rng: &mut R,
) -> Action {
    match last {
        None | Some(Action::Cooperate) => Action::Cooperate,
        Some(Action::Defect) => {
            if rng.gen::<f64>() < cooperation_probability {
                Action::Cooperate
            } else {
                Action::Defect
            }
        }
    }
}

/// Imperfect Tit-for-Tat: cooperate first, then replay the observed move with
/// `imitation_probability` and play the opposite move otherwise.
pub fn imperfect_tit_for_tat<R: Rng + ?Sized>(
    last: Option<Action>,
    imitation_probability: f64,
    rng: &mut R,
) -> Action {
    match last {
        None => Action::Cooperate,
        Some(action) => {
            if rng.gen::<f64>() < imitation_probability {
                action
            } else {
                action.opposite()
            }
        }
    }
}

/// Forgiveness probability of Generous Tit-for-Tat for a payoff quadruple:
/// `min(1 - (T - R) / (R - S), (R - P) / (T - P))`
///
/// 1/3 for the standard (3, 5, 0, 1) payoffs.
pub fn generous_cooperation_probability(payoffs: &Payoffs) -> f64 {
    let coeff_1 = (payoffs.temptation - payoffs.reward) / (payoffs.reward - payoffs.sucker);
    let coeff_2 = (payoffs.reward - payoffs.punishment) / (payoffs.temptation - payoffs.punishment);
    (1.0 - coeff_1).min(coeff_2)
}

/// Default imitation probability for Imperfect Tit-for-Tat
pub const DEFAULT_IMITATION_PROBABILITY: f64 = 0.8;

/// Named strategy types, as they appear in configuration files
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum StrategyKind {
    AlwaysCooperate,
    AlwaysDefect,
    TitForTat,
    SuspiciousTitForTat,
    GenerousTitForTat,
    ImperfectTitForTat { imitation_probability: f64 },
}

impl StrategyKind {
    /// Every bundled strategy, with default parameters
    pub fn all() -> [StrategyKind; 6] {
        [
            StrategyKind::AlwaysCooperate,
            StrategyKind::AlwaysDefect,
            StrategyKind::TitForTat,
            StrategyKind::SuspiciousTitForTat,
            StrategyKind::GenerousTitForTat,
            StrategyKind::ImperfectTitForTat {
                imitation_probability: DEFAULT_IMITATION_PROBABILITY,
            },
        ]
    }

    /// Short name, also used as the [`Strategy`] name
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::AlwaysCooperate => "always-cooperate",
            StrategyKind::AlwaysDefect => "always-defect",
            StrategyKind::TitForTat => "tft",
            StrategyKind::SuspiciousTitForTat => "stft",
            StrategyKind::GenerousTitForTat => "gtft",
            StrategyKind::ImperfectTitForTat { .. } => "imptft",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = IpdError;

    fn from_str(s: &str) -> Result<Self> {
        let kind = match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "always-cooperate" | "alwayscooperate" | "allc" => StrategyKind::AlwaysCooperate,
            "always-defect" | "alwaysdefect" | "alld" => StrategyKind::AlwaysDefect,
            "tft" | "tit-for-tat" | "titfortat" => StrategyKind::TitForTat,
            "stft" | "suspicious-tit-for-tat" | "suspicioustitfortat" => {
                StrategyKind::SuspiciousTitForTat
            }
            "gtft" | "generous-tit-for-tat" | "generoustitfortat" => {
                StrategyKind::GenerousTitForTat
            }
            "imptft" | "imperfect-tit-for-tat" | "imperfecttitfortat" => {
                StrategyKind::ImperfectTitForTat {
                    imitation_probability: DEFAULT_IMITATION_PROBABILITY,
                }
            }
            _ => {
                return Err(IpdError::UnknownStrategy {
                    name: s.to_string(),
                })
            }
        };
        Ok(kind)
    }
}

type RespondFn = dyn Fn(Option<Action>, &mut dyn RngCore) -> Action + Send + Sync;

/// An opponent strategy: a name plus a pure response function
///
/// A strategy may pin the move it reacts to; otherwise the environment's
/// [`OpponentInput`] applies. Cheap to clone; the function is shared.
#[derive(Clone)]
pub struct Strategy {
    name: String,
    input: Option<OpponentInput>,
    respond: Arc<RespondFn>,
}

impl Strategy {
    /// Wrap an arbitrary response function
    pub fn custom<F>(name: impl Into<String>, respond: F) -> Self
    where
        F: Fn(Option<Action>, &mut dyn RngCore) -> Action + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            input: None,
            respond: Arc::new(respond),
        }
    }

    /// Always react to `input`, whatever the environment is configured with
    pub fn with_input(mut self, input: OpponentInput) -> Self {
        self.input = Some(input);
        self
    }

    /// Wrap a deterministic one-argument strategy
    pub fn deterministic(name: impl Into<String>, respond: fn(Option<Action>) -> Action) -> Self {
        Self::custom(name, move |last, _rng| respond(last))
    }

    pub fn always_cooperate() -> Self {
        Self::deterministic("always-cooperate", always_cooperate)
    }

    pub fn always_defect() -> Self {
        Self::deterministic("always-defect", always_defect)
    }

    /// Tit-for-Tat imitating the agent's previous move
    pub fn tit_for_tat() -> Self {
        Self::deterministic("tft", tit_for_tat).with_input(OpponentInput::AgentLastMove)
    }

    pub fn suspicious_tit_for_tat() -> Self {
        Self::deterministic("stft", suspicious_tit_for_tat)
    }

    /// Generous Tit-for-Tat with its forgiveness probability bound from `payoffs`
    pub fn generous_tit_for_tat(payoffs: &Payoffs) -> Result<Self> {
        let probability = generous_cooperation_probability(payoffs);
        if !probability.is_finite() {
            return Err(IpdError::parameter(
                "gtft cooperation probability",
                probability,
                "a finite value (R != S and T != P)",
            ));
        }
        Ok(Self::custom("gtft", move |last, rng| {
            generous_tit_for_tat(last, probability, rng)
        }))
    }

    pub fn imperfect_tit_for_tat(imitation_probability: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&imitation_probability) {
            return Err(IpdError::parameter(
                "imitation_probability",
                imitation_probability,
                "a probability in [0, 1]",
            ));
        }
        Ok(Self::custom("imptft", move |last, rng| {
            imperfect_tit_for_tat(last, imitation_probability, rng)
        }))
    }

    /// Build a bundled strategy; `payoffs` feeds the parameterized ones
    pub fn from_kind(kind: StrategyKind, payoffs: &Payoffs) -> Result<Self> {
        match kind {
            StrategyKind::AlwaysCooperate => Ok(Self::always_cooperate()),
            StrategyKind::AlwaysDefect => Ok(Self::always_defect()),
            StrategyKind::TitForTat => Ok(Self::tit_for_tat()),
            StrategyKind::SuspiciousTitForTat => Ok(Self::suspicious_tit_for_tat()),
            StrategyKind::GenerousTitForTat => Self::generous_tit_for_tat(payoffs),
            StrategyKind::ImperfectTitForTat {
                imitation_probability,
            } => Self::imperfect_tit_for_tat(imitation_probability),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pinned input, if any
    pub fn input(&self) -> Option<OpponentInput> {
        self.input
    }

    /// React to `last` (`None` on the first round)
    pub fn respond<R: RngCore>(&self, last: Option<Action>, rng: &mut R) -> Action {
        (self.respond)(last, rng)
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self::tit_for_tat()
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}
