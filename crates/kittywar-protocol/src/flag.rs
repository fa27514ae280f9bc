//! The closed flag space of the Kitty War protocol.
//!
//! Every frame starts with a single flag byte. Requests from the client use
//! the session-level and match-control flags; notification flags are only
//! ever sent by the server. Anything outside this table is a protocol
//! violation and ends the connection.

use std::fmt;

/// A recognized protocol flag.
///
/// `#[repr(u8)]` pins each variant to its wire value, so `flag as u8` is
/// the byte that goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Flag {
    // -- Session level --
    Login = 0,
    Logout = 1,
    FindMatch = 2,
    UserProfile = 3,
    AllCards = 4,
    CatCards = 5,
    BasicCards = 6,
    ChanceCards = 7,
    AbilityCards = 8,
    EndMatch = 9,

    // -- Notifications (server → client only) --
    OpCat = 49,
    GainHp = 50,
    OpGainHp = 51,
    DmgModified = 52,
    OpDmgModified = 53,
    GainChance = 54,
    OpGainChance = 55,
    GainAbility = 56,
    GainChances = 57,
    RevealMove = 58,
    RevealChance = 59,
    Spotlight = 60,
    OpSpotlight = 61,

    // -- Match control --
    NextPhase = 98,
    Ready = 99,
    SelectCat = 100,
    UseAbility = 101,
    SelectMove = 102,
    UseChance = 103,
}

impl Flag {
    /// Returns `true` for flags the session answers itself, without
    /// consulting a match.
    pub fn is_session_level(self) -> bool {
        matches!(
            self,
            Self::Login
                | Self::Logout
                | Self::FindMatch
                | Self::UserProfile
                | Self::AllCards
                | Self::CatCards
                | Self::BasicCards
                | Self::ChanceCards
                | Self::AbilityCards
        )
    }
}

impl From<Flag> for u8 {
    fn from(flag: Flag) -> Self {
        flag as u8
    }
}

impl TryFrom<u8> for Flag {
    type Error = u8;

    /// Maps a wire byte to a flag, handing the byte back if it is not in
    /// the table.
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let flag = match value {
            0 => Self::Login,
            1 => Self::Logout,
            2 => Self::FindMatch,
            3 => Self::UserProfile,
            4 => Self::AllCards,
            5 => Self::CatCards,
            6 => Self::BasicCards,
            7 => Self::ChanceCards,
            8 => Self::AbilityCards,
            9 => Self::EndMatch,
            49 => Self::OpCat,
            50 => Self::GainHp,
            51 => Self::OpGainHp,
            52 => Self::DmgModified,
            53 => Self::OpDmgModified,
            54 => Self::GainChance,
            55 => Self::OpGainChance,
            56 => Self::GainAbility,
            57 => Self::GainChances,
            58 => Self::RevealMove,
            59 => Self::RevealChance,
            60 => Self::Spotlight,
            61 => Self::OpSpotlight,
            98 => Self::NextPhase,
            99 => Self::Ready,
            100 => Self::SelectCat,
            101 => Self::UseAbility,
            102 => Self::SelectMove,
            103 => Self::UseChance,
            other => return Err(other),
        };
        Ok(flag)
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}({})", *self as u8)
    }
}

/// Result codes carried as a one-byte body.
///
/// These share numeric values with some flags (`FAILURE` and `LOGIN` are
/// both 0), which is why they are a separate type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResultCode {
    Failure = 0,
    Success = 1,
    Draw = 2,
    Error = 3,
}

impl From<bool> for ResultCode {
    fn from(ok: bool) -> Self {
        if ok { Self::Success } else { Self::Failure }
    }
}

impl From<ResultCode> for u8 {
    fn from(code: ResultCode) -> Self {
        code as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_round_trips_through_u8() {
        for byte in 0..=u8::MAX {
            if let Ok(flag) = Flag::try_from(byte) {
                assert_eq!(u8::from(flag), byte);
            }
        }
    }

    #[test]
    fn test_flag_table_has_all_29_entries() {
        let count = (0..=u8::MAX).filter(|b| Flag::try_from(*b).is_ok()).count();
        assert_eq!(count, 29);
    }

    #[test]
    fn test_flag_rejects_unknown_byte() {
        assert_eq!(Flag::try_from(10), Err(10));
        assert_eq!(Flag::try_from(b'G'), Err(b'G'));
        assert_eq!(Flag::try_from(104), Err(104));
    }

    #[test]
    fn test_flag_session_level_split() {
        assert!(Flag::Login.is_session_level());
        assert!(Flag::AbilityCards.is_session_level());
        assert!(!Flag::EndMatch.is_session_level());
        assert!(!Flag::Ready.is_session_level());
        assert!(!Flag::UseChance.is_session_level());
    }

    #[test]
    fn test_flag_display_includes_wire_value() {
        assert_eq!(Flag::SelectCat.to_string(), "SelectCat(100)");
    }

    #[test]
    fn test_result_code_from_bool() {
        assert_eq!(ResultCode::from(true), ResultCode::Success);
        assert_eq!(ResultCode::from(false), ResultCode::Failure);
        assert_eq!(u8::from(ResultCode::Draw), 2);
        assert_eq!(u8::from(ResultCode::Error), 3);
    }
}
