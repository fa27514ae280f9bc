//! Per-player match state.

use kittywar_protocol::Response;
use rand::Rng;
use tokio::sync::mpsc;

use crate::{Ability, ActionError, Cat, Chance, Move};

/// Channel sender for delivering responses to a player's connection.
pub type PlayerSender = mpsc::UnboundedSender<Response>;

/// One of the two sides of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    One,
    Two,
}

impl Seat {
    pub fn opponent(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }
}

impl std::fmt::Display for Seat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::One => write!(f, "p1"),
            Self::Two => write!(f, "p2"),
        }
    }
}

/// Everything the match tracks about one player.
///
/// The "round" fields are reset on every prelude entry. Health is not:
/// it carries across rounds and has no upper bound.
#[derive(Debug)]
pub struct Player {
    pub username: String,
    /// Cat ids the player owns and may select.
    pub owned_cats: Vec<u8>,
    pub cat: Option<Cat>,
    pub health: i32,
    /// Random extra ability granted at the end of setup.
    pub bonus_ability: Option<Ability>,

    // -- Round state --
    pub healed: i32,
    pub dealt: i32,
    pub taken: i32,
    pub dodged: i32,
    pub modifier: i32,
    pub pierce: bool,
    pub reverse: bool,
    pub irreversible: bool,
    pub invulnerable: bool,
    /// Acts first in combat when the opponent lacks it. Nothing in the
    /// current catalog grants it.
    pub spotlight: bool,
    pub selected_move: Option<Move>,
    pub selected_chance: Option<Chance>,

    /// Held chance cards, oldest first.
    pub chances: Vec<Chance>,
    /// Played chance cards, oldest first.
    pub used_chances: Vec<Chance>,
    /// Abilities on cooldown with their remaining prelude entries.
    pub cooldowns: Vec<(Ability, u8)>,

    pub ready: bool,
    pub winner: bool,

    sender: PlayerSender,
}

impl Player {
    pub fn new(username: impl Into<String>, owned_cats: Vec<u8>, sender: PlayerSender) -> Self {
        Self {
            username: username.into(),
            owned_cats,
            cat: None,
            health: 0,
            bonus_ability: None,
            healed: 0,
            dealt: 0,
            taken: 0,
            dodged: 0,
            modifier: 1,
            pierce: false,
            reverse: false,
            irreversible: false,
            invulnerable: false,
            spotlight: false,
            selected_move: None,
            selected_chance: None,
            chances: Vec::new(),
            used_chances: Vec::new(),
            cooldowns: Vec::new(),
            ready: false,
            winner: false,
            sender,
        }
    }

    /// Queues a response to this player. A player whose connection is
    /// gone simply stops receiving.
    pub fn notify(&self, response: Response) {
        let _ = self.sender.send(response);
    }

    /// Health as one wire byte.
    pub fn health_byte(&self) -> u8 {
        self.health.clamp(0, i32::from(u8::MAX)) as u8
    }

    /// Held chance card ids, for `GAIN_CHANCES`.
    pub fn chance_ids(&self) -> Vec<u8> {
        self.chances.iter().map(|c| c.id()).collect()
    }

    pub(crate) fn heal(&mut self, amount: i32) {
        self.health += amount;
        self.healed += amount;
    }

    /// Clears everything that only lasts one round.
    pub(crate) fn reset_round(&mut self) {
        self.healed = 0;
        self.dealt = 0;
        self.taken = 0;
        self.dodged = 0;
        self.modifier = 1;
        self.pierce = false;
        self.reverse = false;
        self.irreversible = false;
        self.invulnerable = false;
        self.spotlight = false;
        self.selected_move = None;
        self.selected_chance = None;
    }

    // -----------------------------------------------------------------------
    // Selections
    // -----------------------------------------------------------------------

    /// Picks a cat and sets health to its base HP. Can be changed until
    /// setup ends.
    pub(crate) fn select_cat(&mut self, id: i64) -> Result<Cat, ActionError> {
        let cat = Cat::from_id(id).ok_or(ActionError::UnknownCat(id))?;
        if !self.owned_cats.contains(&cat.id()) {
            return Err(ActionError::CatNotOwned(cat.id()));
        }
        self.cat = Some(cat);
        self.health = cat.base_hp();
        Ok(cat)
    }

    /// Picks this round's move. Only one pick per round.
    pub(crate) fn select_move(&mut self, id: i64) -> Result<Move, ActionError> {
        let selected = Move::from_id(id).ok_or(ActionError::UnknownMove(id))?;
        if self.selected_move.is_some() {
            return Err(ActionError::MoveAlreadySelected);
        }
        self.selected_move = Some(selected);
        Ok(selected)
    }

    /// Plays a held chance card for this round, moving it from the held
    /// list to the used list.
    ///
    /// Every check runs before anything is mutated, so a refused card
    /// leaves the held list exactly as it was.
    pub(crate) fn select_chance(&mut self, id: i64) -> Result<Chance, ActionError> {
        let chance = Chance::from_id(id).ok_or(ActionError::UnknownChance(id))?;
        let position = self
            .chances
            .iter()
            .position(|c| *c == chance)
            .ok_or(ActionError::ChanceNotHeld(chance))?;
        if self.selected_chance.is_some() {
            return Err(ActionError::ChanceAlreadySelected);
        }
        if self.selected_move == Some(Move::Skip) {
            return Err(ActionError::Skipping);
        }
        if self.selected_move != Some(chance.category()) {
            return Err(ActionError::ChanceMoveMismatch {
                chance,
                needs: chance.category(),
                selected: self.selected_move,
            });
        }

        self.chances.remove(position);
        self.used_chances.push(chance);
        self.selected_chance = Some(chance);
        Ok(chance)
    }

    // -----------------------------------------------------------------------
    // Cards and cooldowns
    // -----------------------------------------------------------------------

    /// Adds a uniformly random chance card to the held list.
    pub(crate) fn draw_chance<R: Rng>(&mut self, rng: &mut R) -> Chance {
        let chance = Chance::ALL[rng.random_range(0..Chance::ALL.len())];
        self.chances.push(chance);
        chance
    }

    pub fn on_cooldown(&self, ability: Ability) -> bool {
        self.cooldowns.iter().any(|(a, _)| *a == ability)
    }

    pub(crate) fn start_cooldown(&mut self, ability: Ability) {
        let rounds = ability.cooldown();
        if rounds > 0 {
            self.cooldowns.push((ability, rounds));
        }
    }

    /// Ticks every cooldown down by one, dropping those that reach zero.
    /// The remaining entries keep their order.
    pub(crate) fn decrease_cooldowns(&mut self) {
        self.cooldowns.retain_mut(|(_, remaining)| {
            *remaining = remaining.saturating_sub(1);
            *remaining > 0
        });
    }

    /// Returns `true` if `id` is this player's cat ability or bonus ability.
    pub(crate) fn owns_ability(&self, ability: Ability) -> bool {
        self.cat.map(Cat::ability_id) == Some(ability.id()) || self.bonus_ability == Some(ability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn player() -> Player {
        let (tx, _rx) = mpsc::unbounded_channel();
        Player::new("tabby", vec![0, 1], tx)
    }

    fn player_holding(chances: &[Chance], selected: Option<Move>) -> Player {
        let mut p = player();
        p.chances = chances.to_vec();
        p.selected_move = selected;
        p
    }

    #[test]
    fn test_select_cat_sets_base_health() {
        let mut p = player();
        assert_eq!(p.select_cat(0), Ok(Cat::Persian));
        assert_eq!(p.health, 8);
        assert_eq!(p.select_cat(1), Ok(Cat::Ragdoll));
        assert_eq!(p.health, 10);
    }

    #[test]
    fn test_select_cat_rejects_unowned_and_unknown() {
        let mut p = player();
        assert_eq!(p.select_cat(3), Err(ActionError::CatNotOwned(3)));
        assert_eq!(p.select_cat(42), Err(ActionError::UnknownCat(42)));
        assert!(p.cat.is_none());
    }

    #[test]
    fn test_select_move_once_per_round() {
        let mut p = player();
        // PURR is id 0 and must still count as selected.
        assert_eq!(p.select_move(0), Ok(Move::Purr));
        assert_eq!(p.select_move(2), Err(ActionError::MoveAlreadySelected));
        assert_eq!(p.selected_move, Some(Move::Purr));
        p.reset_round();
        assert_eq!(p.select_move(2), Ok(Move::Scratch));
    }

    #[test]
    fn test_select_move_rejects_unknown() {
        let mut p = player();
        assert_eq!(p.select_move(4), Err(ActionError::UnknownMove(4)));
    }

    #[test]
    fn test_select_chance_moves_card_to_used() {
        let mut p = player_holding(&[Chance::CantGuard, Chance::DoubleScratch], Some(Move::Scratch));
        assert_eq!(p.select_chance(8), Ok(Chance::DoubleScratch));
        assert_eq!(p.chances, vec![Chance::CantGuard]);
        assert_eq!(p.used_chances, vec![Chance::DoubleScratch]);
        assert_eq!(p.selected_chance, Some(Chance::DoubleScratch));
    }

    #[test]
    fn test_select_chance_removes_only_one_copy() {
        let mut p = player_holding(&[Chance::GuardAndHeal, Chance::GuardAndHeal], Some(Move::Guard));
        p.select_chance(4).unwrap();
        assert_eq!(p.chances, vec![Chance::GuardAndHeal]);
    }

    #[test]
    fn test_select_chance_each_clause_fails_alone() {
        let held = [Chance::DoublePurring, Chance::ReverseScratch];

        let mut unknown = player_holding(&held, Some(Move::Purr));
        assert_eq!(unknown.select_chance(9), Err(ActionError::UnknownChance(9)));

        let mut not_held = player_holding(&held, Some(Move::Purr));
        assert_eq!(
            not_held.select_chance(1),
            Err(ActionError::ChanceNotHeld(Chance::GuaranteedPurring))
        );

        let mut mismatch = player_holding(&held, Some(Move::Scratch));
        assert!(matches!(
            mismatch.select_chance(0),
            Err(ActionError::ChanceMoveMismatch { .. })
        ));

        let mut no_move = player_holding(&held, None);
        assert!(matches!(
            no_move.select_chance(0),
            Err(ActionError::ChanceMoveMismatch { selected: None, .. })
        ));

        let mut skipping = player_holding(&held, Some(Move::Skip));
        assert_eq!(skipping.select_chance(0), Err(ActionError::Skipping));

        let mut twice = player_holding(&held, Some(Move::Purr));
        twice.selected_chance = Some(Chance::GuaranteedPurring);
        assert_eq!(twice.select_chance(0), Err(ActionError::ChanceAlreadySelected));

        for p in [unknown, not_held, mismatch, no_move, skipping, twice] {
            assert_eq!(p.chances, held.to_vec());
            assert!(p.used_chances.is_empty());
        }
    }

    #[test]
    fn test_reset_round_clears_round_state_only() {
        let mut p = player();
        p.select_cat(1).unwrap();
        p.chances.push(Chance::CantGuard);
        p.modifier = 4;
        p.pierce = true;
        p.dealt = 2;
        p.selected_move = Some(Move::Scratch);
        p.selected_chance = Some(Chance::DoubleScratch);

        p.reset_round();
        assert_eq!(p.modifier, 1);
        assert!(!p.pierce);
        assert_eq!(p.dealt, 0);
        assert!(p.selected_move.is_none());
        assert!(p.selected_chance.is_none());
        assert_eq!(p.health, 10);
        assert_eq!(p.chances, vec![Chance::CantGuard]);
    }

    #[test]
    fn test_start_cooldown_skips_passives() {
        let mut p = player();
        p.start_cooldown(Ability::Gentleman);
        assert!(p.cooldowns.is_empty());
        p.start_cooldown(Ability::CriticalHit);
        assert_eq!(p.cooldowns, vec![(Ability::CriticalHit, 3)]);
        assert!(p.on_cooldown(Ability::CriticalHit));
    }

    #[test]
    fn test_decrease_cooldowns_keeps_order() {
        let mut p = player();
        p.cooldowns = vec![
            (Ability::Rejuvenation, 2),
            (Ability::CriticalHit, 1),
            (Ability::Attacker, 3),
        ];
        p.decrease_cooldowns();
        assert_eq!(
            p.cooldowns,
            vec![(Ability::Rejuvenation, 1), (Ability::Attacker, 2)]
        );
    }

    #[test]
    fn test_draw_chance_appends_catalogued_card() {
        let mut p = player();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let drawn = p.draw_chance(&mut rng);
            assert_eq!(p.chances.last(), Some(&drawn));
        }
        assert_eq!(p.chances.len(), 50);
    }

    #[test]
    fn test_health_byte_clamps() {
        let mut p = player();
        p.health = -3;
        assert_eq!(p.health_byte(), 0);
        p.health = 300;
        assert_eq!(p.health_byte(), 255);
        p.health = 19;
        assert_eq!(p.health_byte(), 19);
    }

    #[test]
    fn test_owns_ability_cat_or_bonus() {
        let mut p = player();
        p.select_cat(0).unwrap();
        p.bonus_ability = Some(Ability::CriticalHit);
        assert!(p.owns_ability(Ability::Rejuvenation));
        assert!(p.owns_ability(Ability::CriticalHit));
        assert!(!p.owns_ability(Ability::Gentleman));
        assert!(!p.owns_ability(Ability::Attacker));
    }

    proptest! {
        /// Applying `n` decrements to a cooldown of `n` removes it exactly
        /// on the last one and never earlier.
        #[test]
        fn prop_cooldown_expires_after_exactly_n_ticks(n in 1u8..10, other in 1u8..10) {
            let mut p = player();
            p.cooldowns = vec![(Ability::Rejuvenation, n), (Ability::CriticalHit, other)];
            for tick in 1..=n {
                p.decrease_cooldowns();
                let present = p.on_cooldown(Ability::Rejuvenation);
                prop_assert_eq!(present, tick < n);
                for (_, remaining) in &p.cooldowns {
                    prop_assert!(*remaining > 0);
                }
            }
            prop_assert_eq!(p.on_cooldown(Ability::CriticalHit), other > n);
        }
    }
}
