//! The per-round phase sequence.

use kittywar_protocol::Flag;

/// The phase a match is in.
///
/// Transitions are strictly ordered; `Setup` happens once and the other
/// five repeat:
///
/// ```text
/// Setup → Prelude → EnactStrategies → ShowCards → SettleStrategies → Postlude
///            ↑                                                          │
///            └──────────────────────────────────────────────────────────┘
/// ```
///
/// - **Setup**: players pick their cats.
/// - **Prelude**: round state resets; prelude abilities may be used.
/// - **EnactStrategies**: players pick a move and optionally a chance card.
/// - **ShowCards**: each side learns what the other picked.
/// - **SettleStrategies**: chance cards and combat are resolved.
/// - **Postlude**: postlude abilities may be used; then the next round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Setup,
    Prelude,
    EnactStrategies,
    ShowCards,
    SettleStrategies,
    Postlude,
}

impl Phase {
    /// The phase that follows this one.
    pub fn next(self) -> Self {
        match self {
            Self::Setup => Self::Prelude,
            Self::Prelude => Self::EnactStrategies,
            Self::EnactStrategies => Self::ShowCards,
            Self::ShowCards => Self::SettleStrategies,
            Self::SettleStrategies => Self::Postlude,
            Self::Postlude => Self::Prelude,
        }
    }

    /// Returns `true` if `flag` is an action this phase accepts.
    /// `READY` is accepted everywhere and is not an action.
    pub fn accepts(self, flag: Flag) -> bool {
        matches!(
            (self, flag),
            (Self::Setup, Flag::SelectCat)
                | (Self::Prelude | Self::Postlude, Flag::UseAbility)
                | (Self::EnactStrategies, Flag::SelectMove | Flag::UseChance)
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Setup => write!(f, "Setup"),
            Self::Prelude => write!(f, "Prelude"),
            Self::EnactStrategies => write!(f, "EnactStrategies"),
            Self::ShowCards => write!(f, "ShowCards"),
            Self::SettleStrategies => write!(f, "SettleStrategies"),
            Self::Postlude => write!(f, "Postlude"),
        }
    }
}
