//! Biome ids and names.

use serde::{Deserialize, Serialize};

/// Biomes a parcel column can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Biome {
    /// Open water.
    Ocean,
    /// Neutral grassland, the default.
    #[default]
    Plains,
    /// Sand and cacti.
    Desert,
    /// Mountains.
    ExtremeHills,
    /// Oak forest.
    Forest,
    /// Spruce forest.
    Taiga,
    /// Wetland.
    Swamp,
    /// River.
    River,
    /// Nether.
    Hell,
    /// Snow plains.
    IcePlains,
    /// Mushroom fields.
    MushroomIsland,
    /// Beach.
    Beach,
    /// Jungle.
    Jungle,
    /// Birch forest.
    BirchForest,
    /// Dark oak forest.
    RoofedForest,
    /// Snowy taiga.
    ColdTaiga,
    /// Savanna.
    Savanna,
    /// Badlands.
    Mesa,
}

const ALL: [Biome; 18] = [
    Biome::Ocean,
    Biome::Plains,
    Biome::Desert,
    Biome::ExtremeHills,
    Biome::Forest,
    Biome::Taiga,
    Biome::Swamp,
    Biome::River,
    Biome::Hell,
    Biome::IcePlains,
    Biome::MushroomIsland,
    Biome::Beach,
    Biome::Jungle,
    Biome::BirchForest,
    Biome::RoofedForest,
    Biome::ColdTaiga,
    Biome::Savanna,
    Biome::Mesa,
];

impl Biome {
    /// Numeric biome id written to world columns.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Ocean => 0,
            Self::Plains => 1,
            Self::Desert => 2,
            Self::ExtremeHills => 3,
            Self::Forest => 4,
            Self::Taiga => 5,
            Self::Swamp => 6,
            Self::River => 7,
            Self::Hell => 8,
            Self::IcePlains => 12,
            Self::MushroomIsland => 14,
            Self::Beach => 16,
            Self::Jungle => 21,
            Self::BirchForest => 27,
            Self::RoofedForest => 29,
            Self::ColdTaiga => 30,
            Self::Savanna => 35,
            Self::Mesa => 37,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ocean => "Ocean",
            Self::Plains => "Plains",
            Self::Desert => "Desert",
            Self::ExtremeHills => "Extreme Hills",
            Self::Forest => "Forest",
            Self::Taiga => "Taiga",
            Self::Swamp => "Swamp",
            Self::River => "River",
            Self::Hell => "Hell",
            Self::IcePlains => "Ice Plains",
            Self::MushroomIsland => "Mushroom Island",
            Self::Beach => "Beach",
            Self::Jungle => "Jungle",
            Self::BirchForest => "Birch Forest",
            Self::RoofedForest => "Roofed Forest",
            Self::ColdTaiga => "Cold Taiga",
            Self::Savanna => "Savanna",
            Self::Mesa => "Mesa",
        }
    }

    /// Looks a biome up by numeric id.
    #[must_use]
    pub fn from_id(id: u8) -> Option<Self> {
        ALL.into_iter().find(|biome| biome.id() == id)
    }

    /// Looks a biome up by name, ignoring case, spaces and underscores.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = normalize(name);
        ALL.into_iter().find(|biome| normalize(biome.name()) == wanted)
    }

    /// Every known biome.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &ALL
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl std::fmt::Display for Biome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
