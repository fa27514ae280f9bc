//! Ability resolution.
//!
//! Active abilities are requested by the player; passives are attempted
//! by the match on every prelude and postlude entry. Both notify the user
//! and the opponent when they take effect.

use kittywar_protocol::{Flag, Response};
use rand::Rng;

use crate::{Ability, ActionError, Phase, Player};

/// Uses an active ability on the player's behalf.
///
/// Nothing changes unless every check passes: the ability exists, is the
/// cat's or the bonus ability, is not cooling down, is active, and
/// belongs to `phase`.
pub fn use_active(
    player: &mut Player,
    opponent: &Player,
    phase: Phase,
    id: i64,
) -> Result<Ability, ActionError> {
    let ability = Ability::from_id(id).ok_or(ActionError::UnknownAbility(id))?;
    if !player.owns_ability(ability) {
        return Err(ActionError::AbilityNotOwned(ability));
    }
    if player.on_cooldown(ability) {
        return Err(ActionError::OnCooldown(ability));
    }
    if ability.is_passive() {
        return Err(ActionError::Passive(ability));
    }
    if ability.phase() != phase {
        return Err(ActionError::AbilityWrongPhase {
            ability,
            needs: ability.phase(),
        });
    }

    match ability {
        Ability::Rejuvenation => player.heal(1),
        Ability::CriticalHit => player.modifier *= 2,
        Ability::Gentleman | Ability::Attacker => {}
    }
    player.start_cooldown(ability);
    tracing::debug!(username = %player.username, %ability, "active ability used");
    notify(ability, player, opponent);
    Ok(ability)
}

/// Fires `ability` if it is a passive whose condition holds in `phase`.
/// Returns whether it took effect.
pub fn use_passive<R: Rng>(
    player: &mut Player,
    opponent: &Player,
    phase: Phase,
    ability: Ability,
    rng: &mut R,
) -> bool {
    if !ability.is_passive() || player.on_cooldown(ability) || ability.phase() != phase {
        return false;
    }
    let triggered = match ability {
        Ability::Gentleman => player.dodged >= 2,
        Ability::Attacker => player.dealt >= 2,
        Ability::Rejuvenation | Ability::CriticalHit => false,
    };
    if !triggered {
        return false;
    }

    let drawn = player.draw_chance(rng);
    tracing::debug!(username = %player.username, %ability, ?drawn, "passive ability fired");
    notify(ability, player, opponent);
    true
}

fn notify(ability: Ability, player: &Player, opponent: &Player) {
    let (own, theirs) = match ability {
        Ability::Rejuvenation => (
            Response::byte(Flag::GainHp, 1),
            Response::byte(Flag::OpGainHp, 1),
        ),
        Ability::CriticalHit => {
            let modifier = player.modifier.clamp(0, i32::from(u8::MAX)) as u8;
            (
                Response::byte(Flag::DmgModified, modifier),
                Response::byte(Flag::OpDmgModified, modifier),
            )
        }
        Ability::Gentleman | Ability::Attacker => {
            let Some(card) = player.chances.last() else {
                return;
            };
            (
                Response::byte(Flag::GainChance, card.id()),
                Response::empty(Flag::OpGainChance),
            )
        }
    };
    player.notify(own);
    opponent.notify(theirs);
}
