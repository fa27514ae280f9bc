//! The match state machine shared by two sessions.
//!
//! A [`Match`] is driven entirely by the messages its two players send.
//! Each call to [`Match::handle`] runs to completion under the match lock,
//! queueing every notification it produces on the players' outboxes, so
//! the two sessions never observe a half-applied phase transition.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use kittywar_protocol::{Flag, Response, ResultCode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;

use crate::{Ability, ActionError, Phase, Player, Seat, Timing, ability, chance, combat};

/// A match reachable from both of its sessions.
pub type SharedMatch = Arc<Mutex<Match>>;

/// Health a player must sit at exactly to win.
pub const WINNING_HEALTH: i32 = 20;

/// Chance cards each player starts with.
pub const STARTING_CHANCES: usize = 2;

static NEXT_MATCH_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a match, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchId(u64);

impl MatchId {
    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }

    fn next() -> Self {
        Self(NEXT_MATCH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "match-{}", self.0)
    }
}

/// How a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win { winner: Seat },
    Draw,
    /// Ended by an integrity violation (a player readied without a cat or
    /// a move).
    Killed,
    /// A player disconnected while the match was running.
    Forfeit { loser: Seat },
}

/// One game between two players.
pub struct Match {
    id: MatchId,
    phase: Phase,
    players: [Player; 2],
    valid: bool,
    outcome: Option<Outcome>,
    rng: StdRng,
}

impl Match {
    /// Creates a match in `Setup` with an OS-seeded RNG.
    pub fn new(one: Player, two: Player) -> Self {
        Self::with_rng(one, two, StdRng::from_os_rng())
    }

    /// Creates a match whose random choices are reproducible.
    pub fn with_seed(one: Player, two: Player, seed: u64) -> Self {
        Self::with_rng(one, two, StdRng::seed_from_u64(seed))
    }

    fn with_rng(one: Player, two: Player, rng: StdRng) -> Self {
        let id = MatchId::next();
        tracing::info!(match_id = %id, p1 = %one.username, p2 = %two.username, "match created");
        Self {
            id,
            phase: Phase::Setup,
            players: [one, two],
            valid: true,
            outcome: None,
            rng,
        }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// `false` once the match has ended for any reason.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn player(&self, seat: Seat) -> &Player {
        &self.players[seat.index()]
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    /// Applies one in-match request from `seat` and returns whether the
    /// match is still valid.
    ///
    /// `READY` counts in every phase. Action flags are answered with
    /// `SUCCESS` or `FAILURE` on the same flag. Anything else is ignored.
    pub fn handle(&mut self, seat: Seat, flag: Flag, arg: Option<i64>) -> bool {
        if !self.valid {
            return false;
        }

        match flag {
            Flag::Ready => self.ready(seat),
            Flag::SelectCat | Flag::UseAbility | Flag::SelectMove | Flag::UseChance => {
                let result = if self.phase.accepts(flag) {
                    self.act(seat, flag, arg)
                } else {
                    Err(ActionError::WrongPhase { flag, phase: self.phase })
                };
                let player = self.player(seat);
                if let Err(reason) = &result {
                    tracing::debug!(
                        match_id = %self.id,
                        username = %player.username,
                        %flag,
                        %reason,
                        "action refused"
                    );
                }
                player.notify(Response::result(flag, result.is_ok().into()));
            }
            _ => {
                tracing::debug!(match_id = %self.id, %seat, %flag, "ignoring non-match flag");
            }
        }

        self.valid
    }

    fn act(&mut self, seat: Seat, flag: Flag, arg: Option<i64>) -> Result<(), ActionError> {
        let arg = arg.ok_or(ActionError::MissingArgument)?;
        let phase = self.phase;
        let (me, them) = split(&mut self.players, seat);
        match flag {
            Flag::SelectCat => me.select_cat(arg).map(|_| ()),
            Flag::SelectMove => me.select_move(arg).map(|_| ()),
            Flag::UseChance => me.select_chance(arg).map(|_| ()),
            Flag::UseAbility => ability::use_active(me, them, phase, arg).map(|_| ()),
            _ => Err(ActionError::WrongPhase { flag, phase }),
        }
    }

    /// Marks `seat` ready; when both are, runs the current phase's exit.
    fn ready(&mut self, seat: Seat) {
        self.players[seat.index()].ready = true;
        if !self.players.iter().all(|p| p.ready) {
            return;
        }

        match self.phase {
            Phase::Setup => self.finish_setup(),
            Phase::Prelude => self.next_phase(),
            Phase::EnactStrategies => {
                if self.players.iter().any(|p| p.selected_move.is_none()) {
                    tracing::warn!(match_id = %self.id, "player readied without a move");
                    self.kill();
                    return;
                }
                self.next_phase();
                self.show_cards();
            }
            Phase::ShowCards => {
                self.next_phase();
                self.settle();
            }
            Phase::SettleStrategies => {
                self.next_phase();
                self.attempt_passives();
            }
            Phase::Postlude => {
                self.check_winner();
                if self.valid {
                    self.next_phase();
                    self.enter_prelude();
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase transitions
    // -----------------------------------------------------------------------

    /// Clears both ready flags, advances, and tells both players.
    fn next_phase(&mut self) {
        for player in &mut self.players {
            player.ready = false;
        }
        self.phase = self.phase.next();
        for player in &self.players {
            player.notify(Response::empty(Flag::NextPhase));
        }
        tracing::debug!(match_id = %self.id, phase = %self.phase, "phase advanced");
    }

    fn finish_setup(&mut self) {
        if self.players.iter().any(|p| p.cat.is_none()) {
            tracing::warn!(match_id = %self.id, "player readied without a cat");
            self.kill();
            return;
        }

        for player in &mut self.players {
            let bonus = Ability::BONUS[self.rng.random_range(0..Ability::BONUS.len())];
            player.bonus_ability = Some(bonus);
            for _ in 0..STARTING_CHANCES {
                player.draw_chance(&mut self.rng);
            }
        }

        self.next_phase();
        for seat in [Seat::One, Seat::Two] {
            let me = self.player(seat);
            let them = self.player(seat.opponent());
            if let Some(cat) = them.cat {
                me.notify(Response::byte(Flag::OpCat, cat.id()));
            }
            if let Some(bonus) = me.bonus_ability {
                me.notify(Response::byte(Flag::GainAbility, bonus.id()));
            }
            me.notify(Response::bytes(Flag::GainChances, me.chance_ids()));
        }
        self.enter_prelude();
    }

    fn enter_prelude(&mut self) {
        for player in &mut self.players {
            player.reset_round();
            player.decrease_cooldowns();
        }
        self.attempt_passives();
    }

    /// Tries each player's cat ability and bonus ability as passives.
    fn attempt_passives(&mut self) {
        let phase = self.phase;
        for seat in [Seat::One, Seat::Two] {
            let (me, them) = split(&mut self.players, seat);
            let innate = me
                .cat
                .and_then(|cat| Ability::from_id(i64::from(cat.ability_id())));
            for ability in [innate, me.bonus_ability].into_iter().flatten() {
                ability::use_passive(me, them, phase, ability, &mut self.rng);
            }
        }
    }

    fn show_cards(&mut self) {
        for seat in [Seat::One, Seat::Two] {
            let me = self.player(seat);
            let them = self.player(seat.opponent());
            if let Some(selected) = them.selected_move {
                me.notify(Response::byte(Flag::RevealMove, selected.id()));
            }
            me.notify(match them.selected_chance {
                Some(card) => Response::byte(Flag::RevealChance, card.id()),
                None => Response::empty(Flag::RevealChance),
            });
        }
    }

    fn settle(&mut self) {
        self.resolve_chances(Timing::PreSettle);

        let [one, two] = &self.players;
        let first = match (one.spotlight, two.spotlight) {
            (true, false) => Seat::One,
            (false, true) => Seat::Two,
            _ if self.rng.random_bool(0.5) => Seat::One,
            _ => Seat::Two,
        };
        let (attacker, defender) = split(&mut self.players, first);
        combat::handle_combat(attacker, defender);
        combat::handle_combat(defender, attacker);

        self.resolve_chances(Timing::PostSettle);

        for seat in [Seat::One, Seat::Two] {
            let me = self.player(seat);
            let them = self.player(seat.opponent());
            me.notify(Response::byte(Flag::GainHp, me.health_byte()));
            me.notify(Response::byte(Flag::OpGainHp, them.health_byte()));
            me.notify(Response::bytes(Flag::GainChances, me.chance_ids()));
        }
        tracing::debug!(
            match_id = %self.id,
            p1_health = self.players[0].health,
            p2_health = self.players[1].health,
            "round settled"
        );

        self.check_winner();
    }

    fn resolve_chances(&mut self, timing: Timing) {
        for seat in [Seat::One, Seat::Two] {
            let (me, them) = split(&mut self.players, seat);
            chance::resolve(me, them, timing, &mut self.rng);
        }
    }

    // -----------------------------------------------------------------------
    // Endings
    // -----------------------------------------------------------------------

    /// Ends the match if either side reached exactly 20 health or brought
    /// the other to exactly 0.
    fn check_winner(&mut self) {
        let [one, two] = &mut self.players;
        let one_wins = one.health == WINNING_HEALTH || two.health == 0;
        let two_wins = two.health == WINNING_HEALTH || one.health == 0;
        one.winner |= one_wins;
        two.winner |= two_wins;
        if one.winner || two.winner {
            self.end_match();
        }
    }

    fn end_match(&mut self) {
        self.valid = false;
        let outcome = match (self.players[0].winner, self.players[1].winner) {
            (true, true) => Outcome::Draw,
            (true, false) => Outcome::Win { winner: Seat::One },
            _ => Outcome::Win { winner: Seat::Two },
        };
        self.outcome = Some(outcome);

        match outcome {
            Outcome::Win { winner } => {
                self.player(winner)
                    .notify(Response::result(Flag::EndMatch, ResultCode::Success));
                self.player(winner.opponent())
                    .notify(Response::result(Flag::EndMatch, ResultCode::Failure));
                tracing::info!(match_id = %self.id, winner = %self.player(winner).username, "match won");
            }
            _ => {
                self.notify_both(Response::result(Flag::EndMatch, ResultCode::Draw));
                tracing::info!(match_id = %self.id, "match drawn");
            }
        }
    }

    /// Ends the match with `ERROR` to both players.
    pub fn kill(&mut self) {
        if !self.valid {
            return;
        }
        self.valid = false;
        self.outcome = Some(Outcome::Killed);
        self.notify_both(Response::result(Flag::EndMatch, ResultCode::Error));
        tracing::info!(match_id = %self.id, phase = %self.phase, "match killed");
    }

    /// Records that `seat` left. If the match was still running, the
    /// other player wins.
    pub fn disconnect(&mut self, seat: Seat) {
        if !self.valid {
            return;
        }
        self.valid = false;
        self.outcome = Some(Outcome::Forfeit { loser: seat });
        self.player(seat.opponent())
            .notify(Response::result(Flag::EndMatch, ResultCode::Success));
        tracing::info!(
            match_id = %self.id,
            username = %self.player(seat).username,
            "player disconnected, match forfeited"
        );
    }

    fn notify_both(&self, response: Response) {
        for player in &self.players {
            player.notify(response.clone());
        }
    }
}

impl fmt::Debug for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Match")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("valid", &self.valid)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

/// Borrows `seat`'s player and the opponent mutably at the same time.
fn split(players: &mut [Player; 2], seat: Seat) -> (&mut Player, &mut Player) {
    let [one, two] = players;
    match seat {
        Seat::One => (one, two),
        Seat::Two => (two, one),
    }
}
