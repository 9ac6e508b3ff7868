//! Character and NPC sheets consumed by the combat engine.
//!
//! The engine only reads combat-relevant parts of a sheet (combat stats,
//! equipment, initiative formula) and writes back hit points.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a player character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterId(pub Uuid);

impl CharacterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CharacterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CharacterId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(CharacterId)
    }
}

/// Unique identifier for a non-player character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NpcId(pub Uuid);

impl NpcId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NpcId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Stats
// ============================================================================

/// The six core abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ability {
    Strength,
    Constitution,
    Agility,
    Intelligence,
    Wisdom,
    Charisma,
}

/// Ability values, each in `3..=20`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub strength: i32,
    pub constitution: i32,
    pub agility: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl Stats {
    pub const MIN: i32 = 3;
    pub const MAX: i32 = 20;

    /// Every ability set to the same value.
    pub fn flat(value: i32) -> Self {
        let value = value.clamp(Self::MIN, Self::MAX);
        Self {
            strength: value,
            constitution: value,
            agility: value,
            intelligence: value,
            wisdom: value,
            charisma: value,
        }
    }

    pub fn get(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Constitution => self.constitution,
            Ability::Agility => self.agility,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    /// `floor((value - 10) / 2)`.
    pub fn modifier(&self, ability: Ability) -> i32 {
        (self.get(ability) - 10).div_euclid(2)
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::flat(10)
    }
}

/// Combat-relevant numbers on a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatStats {
    pub max_hit_points: i32,
    pub current_hit_points: i32,
    #[serde(default = "default_armor_class")]
    pub armor_class: i32,
    #[serde(default)]
    pub attack_bonus: i32,
    #[serde(default)]
    pub mana: i32,
}

fn default_armor_class() -> i32 {
    10
}

impl CombatStats {
    pub fn new(max_hit_points: i32, armor_class: i32) -> Self {
        Self {
            max_hit_points,
            current_hit_points: max_hit_points,
            armor_class,
            attack_bonus: 0,
            mana: 0,
        }
    }

    pub fn with_attack_bonus(mut self, attack_bonus: i32) -> Self {
        self.attack_bonus = attack_bonus;
        self
    }
}

impl Default for CombatStats {
    fn default() -> Self {
        Self::new(10, default_armor_class())
    }
}

// ============================================================================
// Equipment
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    /// Damage in dice notation, e.g. "1d8".
    pub damage: String,
    #[serde(default)]
    pub weight: f32,
}

impl Weapon {
    pub fn new(name: impl Into<String>, damage: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            damage: damage.into(),
            weight: 0.0,
        }
    }

    /// Bare-handed strike used when nothing is equipped.
    pub fn unarmed() -> Self {
        Self::new("Unarmed strike", "1")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Armor {
    pub name: String,
    pub defense: i32,
    #[serde(default)]
    pub weight: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(default)]
    pub weapons: Vec<Weapon>,
    #[serde(default)]
    pub armor: Vec<Armor>,
    #[serde(default)]
    pub gold: i32,
}

impl Equipment {
    /// The equipped weapon is the first one carried.
    pub fn primary_weapon(&self) -> Option<&Weapon> {
        self.weapons.first()
    }
}

// ============================================================================
// Character
// ============================================================================

/// A player character sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    #[serde(default)]
    pub race: String,
    #[serde(default = "default_level")]
    pub level: u8,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub combat_stats: CombatStats,
    #[serde(default)]
    pub equipment: Equipment,
}

fn default_level() -> u8 {
    1
}

impl Character {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            race: String::new(),
            level: default_level(),
            stats: Stats::default(),
            combat_stats: CombatStats::default(),
            equipment: Equipment::default(),
        }
    }

    /// Initiative bonus: agility modifier plus half the wisdom modifier.
    pub fn calculate_initiative(&self) -> i32 {
        self.stats.modifier(Ability::Agility) + self.stats.modifier(Ability::Wisdom).div_euclid(2)
    }
}

// ============================================================================
// NPC
// ============================================================================

/// A non-player character sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    pub id: NpcId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub archetype: String,
    #[serde(default = "default_level")]
    pub level: u8,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub combat_stats: CombatStats,
    #[serde(default)]
    pub equipment: Equipment,
    /// Explicit initiative bonus; NPCs without one roll flat.
    #[serde(default)]
    pub initiative_bonus: Option<i32>,
}

impl Npc {
    pub fn initiative_bonus(&self) -> i32 {
        self.initiative_bonus.unwrap_or(0)
    }
}

struct NpcKit {
    keywords: &'static [&'static str],
    weapon: (&'static str, &'static str, f32),
    armor: Option<(&'static str, i32, f32)>,
}

lazy_static! {
    static ref NPC_KITS: Vec<NpcKit> = vec![
        NpcKit {
            keywords: &["goblin", "kobold"],
            weapon: ("Scimitar", "1d6", 3.0),
            armor: Some(("Leather armor", 1, 10.0)),
        },
        NpcKit {
            keywords: &["orc", "ogre"],
            weapon: ("Greataxe", "1d12", 7.0),
            armor: Some(("Hide armor", 2, 12.0)),
        },
        NpcKit {
            keywords: &["bandit", "brigand", "thug", "guard"],
            weapon: ("Shortsword", "1d6", 2.0),
            armor: Some(("Leather armor", 1, 10.0)),
        },
        NpcKit {
            keywords: &["skeleton", "zombie"],
            weapon: ("Rusty sword", "1d6", 3.0),
            armor: None,
        },
        NpcKit {
            keywords: &["wolf", "dog", "rat", "spider"],
            weapon: ("Bite", "1d6", 0.0),
            armor: None,
        },
    ];
}

/// Fallback natural weapon for creatures that match no kit.
const DEFAULT_NATURAL_WEAPON: (&str, &str) = ("Claws", "1d4");

/// Build a stand-in NPC sheet for a combatant described only by name.
///
/// Abilities are a flat 10; gear is picked by keyword match on the archetype,
/// then the name.
pub fn synthesize_npc(
    name: &str,
    archetype: Option<&str>,
    max_hit_points: i32,
    armor_class: i32,
) -> Npc {
    let haystack = format!("{} {}", archetype.unwrap_or_default(), name).to_lowercase();
    let kit = NPC_KITS
        .iter()
        .find(|kit| kit.keywords.iter().any(|k| haystack.contains(k)));

    let equipment = match kit {
        Some(kit) => Equipment {
            weapons: vec![Weapon {
                name: kit.weapon.0.to_string(),
                damage: kit.weapon.1.to_string(),
                weight: kit.weapon.2,
            }],
            armor: kit
                .armor
                .iter()
                .map(|(name, defense, weight)| Armor {
                    name: name.to_string(),
                    defense: *defense,
                    weight: *weight,
                })
                .collect(),
            gold: 0,
        },
        None => Equipment {
            weapons: vec![Weapon::new(DEFAULT_NATURAL_WEAPON.0, DEFAULT_NATURAL_WEAPON.1)],
            ..Equipment::default()
        },
    };

    Npc {
        id: NpcId::new(),
        name: name.to_string(),
        description: String::new(),
        archetype: archetype.unwrap_or(name).to_string(),
        level: default_level(),
        stats: Stats::flat(10),
        combat_stats: CombatStats::new(max_hit_points, armor_class),
        equipment,
        initiative_bonus: None,
    }
}

/// Create a sample fighter for testing and quick play.
pub fn create_sample_fighter(name: &str) -> Character {
    let mut character = Character::new(name);
    character.race = "Human".to_string();
    character.stats = Stats {
        strength: 16,
        constitution: 14,
        agility: 12,
        intelligence: 10,
        wisdom: 12,
        charisma: 8,
    };
    character.combat_stats = CombatStats::new(28, 16).with_attack_bonus(5);
    character.equipment = Equipment {
        weapons: vec![Weapon {
            name: "Longsword".to_string(),
            damage: "1d8".to_string(),
            weight: 3.0,
        }],
        armor: vec![Armor {
            name: "Chain mail".to_string(),
            defense: 6,
            weight: 55.0,
        }],
        gold: 15,
    };
    character
}
