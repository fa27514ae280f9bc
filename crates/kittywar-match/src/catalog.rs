//! The closed catalog: cats, moves, abilities, and chance cards.
//!
//! Every id a client can send maps to at most one variant here. Ids that
//! don't (`from_id` returns `None`) are illegal actions, never panics.

use std::fmt;

use crate::Phase;

// ---------------------------------------------------------------------------
// Cat
// ---------------------------------------------------------------------------

/// A playable cat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Cat {
    Persian = 0,
    Ragdoll = 1,
    MaineCoon = 2,
    Shorthair = 3,
    Siamese = 4,
    Abyssinian = 5,
}

impl Cat {
    pub const ALL: [Cat; 6] = [
        Cat::Persian,
        Cat::Ragdoll,
        Cat::MaineCoon,
        Cat::Shorthair,
        Cat::Siamese,
        Cat::Abyssinian,
    ];

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| i64::from(c.id()) == id)
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Health the cat starts a match with.
    pub fn base_hp(self) -> i32 {
        match self {
            Self::Persian => 8,
            _ => 10,
        }
    }

    /// Id of the innate ability. Cats 2–5 name abilities that have no
    /// effect defined, so [`Ability::from_id`] returns `None` for them.
    pub fn ability_id(self) -> u8 {
        self as u8
    }
}

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

/// The basic move each player picks every round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Move {
    Purr = 0,
    Guard = 1,
    Scratch = 2,
    Skip = 3,
}

impl Move {
    pub const ALL: [Move; 4] = [Move::Purr, Move::Guard, Move::Scratch, Move::Skip];

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|m| i64::from(m.id()) == id)
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

// ---------------------------------------------------------------------------
// Ability
// ---------------------------------------------------------------------------

/// An ability with a defined effect.
///
/// Active abilities are used with `USE_ABILITY`; passive ones fire on
/// their own at the start of the phase they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Ability {
    /// Active, postlude: +1 HP.
    Rejuvenation = 0,
    /// Passive, postlude: draw a chance card after dodging 2+ damage.
    Gentleman = 1,
    /// Passive, postlude: draw a chance card after dealing 2+ damage.
    Attacker = 6,
    /// Active, prelude: double the damage modifier.
    CriticalHit = 7,
}

impl Ability {
    /// The abilities handed out at random during setup.
    pub const BONUS: [Ability; 2] = [Ability::Attacker, Ability::CriticalHit];

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(Self::Rejuvenation),
            1 => Some(Self::Gentleman),
            6 => Some(Self::Attacker),
            7 => Some(Self::CriticalHit),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn is_passive(self) -> bool {
        matches!(self, Self::Gentleman | Self::Attacker)
    }

    /// The only phase in which the ability can take effect.
    pub fn phase(self) -> Phase {
        match self {
            Self::CriticalHit => Phase::Prelude,
            Self::Rejuvenation | Self::Gentleman | Self::Attacker => Phase::Postlude,
        }
    }

    /// Prelude entries before the ability can be used again. Passives
    /// have none.
    pub fn cooldown(self) -> u8 {
        match self {
            Self::Rejuvenation | Self::CriticalHit => 3,
            Self::Gentleman | Self::Attacker => 0,
        }
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}({})", self.id())
    }
}

// ---------------------------------------------------------------------------
// Chance
// ---------------------------------------------------------------------------

/// When a chance card takes effect relative to combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    PreSettle,
    PostSettle,
}

/// A one-shot chance card.
///
/// Ids come in three blocks of three, one block per move: 0–2 go with
/// PURR, 3–5 with GUARD, 6–8 with SCRATCH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Chance {
    DoublePurring = 0,
    GuaranteedPurring = 1,
    PurrAndDraw = 2,
    ReverseScratch = 3,
    GuardAndHeal = 4,
    GuardAndDraw = 5,
    CantReverse = 6,
    CantGuard = 7,
    DoubleScratch = 8,
}

impl Chance {
    pub const ALL: [Chance; 9] = [
        Chance::DoublePurring,
        Chance::GuaranteedPurring,
        Chance::PurrAndDraw,
        Chance::ReverseScratch,
        Chance::GuardAndHeal,
        Chance::GuardAndDraw,
        Chance::CantReverse,
        Chance::CantGuard,
        Chance::DoubleScratch,
    ];

    pub fn from_id(id: i64) -> Option<Self> {
        usize::try_from(id).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// The move this card must be played with.
    pub fn category(self) -> Move {
        match self.id() {
            0..=2 => Move::Purr,
            3..=5 => Move::Guard,
            _ => Move::Scratch,
        }
    }

    pub fn timing(self) -> Timing {
        match self {
            Self::GuaranteedPurring
            | Self::ReverseScratch
            | Self::CantReverse
            | Self::CantGuard
            | Self::DoubleScratch => Timing::PreSettle,
            Self::DoublePurring | Self::PurrAndDraw | Self::GuardAndHeal | Self::GuardAndDraw => {
                Timing::PostSettle
            }
        }
    }
}
