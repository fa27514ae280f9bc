//! Chance card effects.

use kittywar_protocol::{Flag, Response};
use rand::Rng;

use crate::{Chance, Player, Timing};

/// Applies the player's selected chance card if it belongs to `timing`.
///
/// Returns whether an effect took place. The conditional post-settle
/// cards look at what combat left in the accumulators, so they only make
/// sense after both combat directions have run.
pub fn resolve<R: Rng>(player: &mut Player, opponent: &Player, timing: Timing, rng: &mut R) -> bool {
    let Some(chance) = player.selected_chance else {
        return false;
    };
    if chance.timing() != timing {
        return false;
    }

    let applied = match chance {
        Chance::DoublePurring => {
            let untouched = player.taken == 0;
            if untouched {
                player.heal(2);
            }
            untouched
        }
        Chance::GuaranteedPurring => {
            player.heal(1);
            player.invulnerable = true;
            true
        }
        Chance::PurrAndDraw => {
            let healed = player.healed > 0;
            if healed {
                draw(player, opponent, rng);
            }
            healed
        }
        Chance::ReverseScratch => {
            player.reverse = true;
            true
        }
        Chance::GuardAndHeal => {
            let dodged = player.dodged > 0;
            if dodged {
                player.heal(1);
            }
            dodged
        }
        Chance::GuardAndDraw => {
            let dodged = player.dodged > 0;
            if dodged {
                draw(player, opponent, rng);
            }
            dodged
        }
        Chance::CantReverse => {
            player.irreversible = true;
            true
        }
        Chance::CantGuard => {
            player.pierce = true;
            true
        }
        Chance::DoubleScratch => {
            player.modifier *= 2;
            true
        }
    };

    tracing::debug!(username = %player.username, ?chance, applied, "chance card resolved");
    applied
}

fn draw<R: Rng>(player: &mut Player, opponent: &Player, rng: &mut R) {
    let drawn = player.draw_chance(rng);
    player.notify(Response::byte(Flag::GainChance, drawn.id()));
    opponent.notify(Response::empty(Flag::OpGainChance));
}
