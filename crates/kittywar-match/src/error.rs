//! Error types for the match layer.

use kittywar_protocol::Flag;

use crate::{Ability, Chance, Move, Phase};

/// Errors from the matchmaking plumbing.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// The matchmaker task has stopped (server shutting down).
    #[error("matchmaker is not running")]
    MatchmakerClosed,
}

/// Why a player's action was refused.
///
/// Never fatal: the player gets `FAILURE` on the same flag, the match
/// state is untouched, and the reason is logged at debug level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("{flag} is not accepted during {phase}")]
    WrongPhase { flag: Flag, phase: Phase },

    #[error("missing or non-numeric body")]
    MissingArgument,

    #[error("no cat with id {0}")]
    UnknownCat(i64),

    #[error("cat {0} is not owned")]
    CatNotOwned(u8),

    #[error("no move with id {0}")]
    UnknownMove(i64),

    #[error("a move was already selected this round")]
    MoveAlreadySelected,

    #[error("no chance card with id {0}")]
    UnknownChance(i64),

    #[error("chance card {0:?} is not held")]
    ChanceNotHeld(Chance),

    #[error("chance card {chance:?} needs {needs:?}, move is {selected:?}")]
    ChanceMoveMismatch {
        chance: Chance,
        needs: Move,
        selected: Option<Move>,
    },

    #[error("a chance card was already selected this round")]
    ChanceAlreadySelected,

    #[error("no chance card can be played when skipping")]
    Skipping,

    #[error("no ability with id {0}")]
    UnknownAbility(i64),

    #[error("ability {0} belongs to neither the cat nor the bonus")]
    AbilityNotOwned(Ability),

    #[error("ability {0} is on cooldown")]
    OnCooldown(Ability),

    #[error("ability {0} is passive")]
    Passive(Ability),

    #[error("ability {ability} only works during {needs}")]
    AbilityWrongPhase { ability: Ability, needs: Phase },
}
