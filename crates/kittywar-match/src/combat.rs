//! One direction of a combat exchange.

use crate::{Move, Player};

/// Damage a scratch deals before the modifier is applied.
const BASE_DAMAGE: i32 = 1;

/// Resolves what `attacker`'s move does to `defender` this round.
///
/// Settling calls this twice, once per direction. Only health and the
/// damage/heal accumulators change; flags and moves are read-only.
pub fn handle_combat(attacker: &mut Player, defender: &mut Player) {
    match (attacker.selected_move, defender.selected_move) {
        (Some(Move::Scratch), Some(Move::Guard)) => {
            let damage = BASE_DAMAGE * attacker.modifier;
            if (defender.reverse && attacker.irreversible) || !attacker.pierce {
                defender.dodged += damage;
            } else if defender.reverse {
                attacker.health -= damage;
                attacker.dealt += damage;
                attacker.taken += damage;
            } else {
                defender.health -= damage;
                defender.taken += damage;
                attacker.dealt += damage;
            }
        }
        (Some(Move::Scratch), Some(Move::Purr)) => {
            // Purring soaks the modifier: at most one point lands.
            if !defender.invulnerable {
                defender.health -= 1;
                defender.taken += 1;
                attacker.dealt += 1;
            }
        }
        (Some(Move::Scratch), _) => {
            let damage = BASE_DAMAGE * attacker.modifier;
            defender.health -= damage;
            defender.taken += damage;
            attacker.dealt += damage;
        }
        (Some(Move::Purr), Some(Move::Scratch)) => {
            if attacker.invulnerable {
                attacker.heal(1);
            }
        }
        (Some(Move::Purr), _) => attacker.heal(1),
        _ => {}
    }
}
