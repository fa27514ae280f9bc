//! The card catalog served by `ALL_CARDS` and friends.
//!
//! This is display data for clients: names, descriptions, and the numbers
//! a card face shows. The rules themselves live in the match engine. The
//! catalog is loaded once at startup (or the built-in default is used)
//! and shared read-only by every session.

use serde::{Deserialize, Serialize};

use crate::SessionError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatCard {
    pub id: u8,
    pub name: String,
    pub description: String,
    pub health: i32,
    pub ability_id: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCard {
    pub id: u8,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChanceCard {
    pub id: u8,
    pub name: String,
    pub description: String,
    /// The move this card can be played with.
    pub move_id: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityCard {
    pub id: u8,
    pub name: String,
    pub description: String,
    pub passive: bool,
    /// Rounds before an active ability can be used again. 0 for passives.
    pub cooldown: u8,
}

/// Which part of the catalog a request asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSection {
    All,
    Cats,
    Moves,
    Chances,
    Abilities,
}

/// Every card a client may need to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardCatalog {
    pub cats: Vec<CatCard>,
    pub moves: Vec<MoveCard>,
    pub chances: Vec<ChanceCard>,
    pub abilities: Vec<AbilityCard>,
}

impl CardCatalog {
    /// Parses a catalog from JSON with the four top-level lists.
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes one section (or the whole catalog) as the JSON text body
    /// of a catalog response.
    pub fn section_json(&self, section: CatalogSection) -> Result<String, SessionError> {
        let json = match section {
            CatalogSection::All => serde_json::to_string(self),
            CatalogSection::Cats => serde_json::to_string(&self.cats),
            CatalogSection::Moves => serde_json::to_string(&self.moves),
            CatalogSection::Chances => serde_json::to_string(&self.chances),
            CatalogSection::Abilities => serde_json::to_string(&self.abilities),
        };
        Ok(json?)
    }
}

fn cat(id: u8, name: &str, description: &str, health: i32) -> CatCard {
    CatCard {
        id,
        name: name.into(),
        description: description.into(),
        health,
        ability_id: id,
    }
}

fn chance(id: u8, name: &str, description: &str, move_id: u8) -> ChanceCard {
    ChanceCard {
        id,
        name: name.into(),
        description: description.into(),
        move_id,
    }
}

/// The built-in catalog matching the game's closed set of cards.
impl Default for CardCatalog {
    fn default() -> Self {
        let moves = [
            (0, "Purr", "Heal 1 HP unless the opponent scratches."),
            (1, "Guard", "Dodge an incoming scratch."),
            (2, "Scratch", "Deal 1 damage to the opponent."),
            (3, "Skip", "Do nothing this round."),
        ]
        .into_iter()
        .map(|(id, name, description)| MoveCard {
            id,
            name: name.into(),
            description: description.into(),
        })
        .collect();

        Self {
            cats: vec![
                cat(0, "Persian", "Fragile but quick to recover.", 8),
                cat(1, "Ragdoll", "Rewarded for staying out of harm's way.", 10),
                cat(2, "Maine Coon", "A big, patient fighter.", 10),
                cat(3, "Shorthair", "Steady and dependable.", 10),
                cat(4, "Siamese", "Loud and unpredictable.", 10),
                cat(5, "Abyssinian", "Curious and restless.", 10),
            ],
            moves,
            chances: vec![
                chance(0, "Double Purring", "If you took no damage, heal 2 HP.", 0),
                chance(1, "Guaranteed Purring", "Heal 1 HP and ignore scratches this round.", 0),
                chance(2, "Purr and Draw", "If you healed, draw a chance card.", 0),
                chance(3, "Reverse Scratch", "Reflect a scratch back at the attacker.", 1),
                chance(4, "Guard and Heal", "If you dodged, heal 1 HP.", 1),
                chance(5, "Guard and Draw", "If you dodged, draw a chance card.", 1),
                chance(6, "Can't Reverse", "Your scratch cannot be reflected.", 2),
                chance(7, "Can't Guard", "Your scratch cannot be guarded.", 2),
                chance(8, "Double Scratch", "Your scratch deals double damage.", 2),
            ],
            abilities: vec![
                AbilityCard {
                    id: 0,
                    name: "Rejuvenation".into(),
                    description: "Heal 1 HP during the postlude.".into(),
                    passive: false,
                    cooldown: 3,
                },
                AbilityCard {
                    id: 1,
                    name: "Gentleman".into(),
                    description: "Draw a chance card after dodging 2 or more damage.".into(),
                    passive: true,
                    cooldown: 0,
                },
                AbilityCard {
                    id: 6,
                    name: "Attacker".into(),
                    description: "Draw a chance card after dealing 2 or more damage.".into(),
                    passive: true,
                    cooldown: 0,
                },
                AbilityCard {
                    id: 7,
                    name: "Critical Hit".into(),
                    description: "Double your damage this round.".into(),
                    passive: false,
                    cooldown: 3,
                },
            ],
        }
    }
}
