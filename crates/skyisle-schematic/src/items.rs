//! Item type resolution for container contents.
//!
//! Template files name items either by legacy numeric id or by namespaced
//! string id (`minecraft:stone`). Both encodings resolve through an
//! [`ItemRegistry`] to the same [`ItemDescriptor`].

use thiserror::Error;

use quartz_nbt::NbtTag;

/// Namespace accepted on string ids.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Item resolution errors. Each one is isolated to a single inventory slot.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ItemResolutionError {
    /// Numeric id not present in the registry
    #[error("Unknown item id {0}")]
    UnknownId(i64),
    /// String id not present in the registry
    #[error("Unknown item name '{0}'")]
    UnknownName(String),
    /// String id in a namespace other than [`DEFAULT_NAMESPACE`]
    #[error("Unsupported item namespace in '{0}'")]
    UnsupportedNamespace(String),
    /// Item record has no usable `id`
    #[error("Item record is missing '{0}'")]
    MissingField(&'static str),
    /// Item resolved to air
    #[error("Item resolves to air")]
    Air,
}

/// Result type for item resolution.
pub type ItemResult<T> = Result<T, ItemResolutionError>;

/// A concrete item or block type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemDescriptor {
    /// Legacy numeric id
    pub id: u16,
    /// Canonical upper-case name
    pub name: String,
}

impl ItemDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(id: u16, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Named item/type lookup.
pub trait ItemRegistry {
    /// Resolves a legacy numeric id.
    fn by_id(&self, id: u16) -> Option<ItemDescriptor>;

    /// Resolves a bare (namespace-stripped) name, case-insensitively.
    fn by_name(&self, name: &str) -> Option<ItemDescriptor>;

    /// Resolves the `id` tag of an item record.
    fn resolve(&self, id: &NbtTag) -> ItemResult<ItemDescriptor> {
        let descriptor = if let Some(raw) = tag_i64(id) {
            let numeric = u16::try_from(raw).map_err(|_| ItemResolutionError::UnknownId(raw))?;
            self.by_id(numeric)
                .ok_or(ItemResolutionError::UnknownId(raw))?
        } else if let NbtTag::String(text) = id {
            self.resolve_str(text)?
        } else {
            return Err(ItemResolutionError::MissingField("id"));
        };
        if descriptor.id == 0 {
            return Err(ItemResolutionError::Air);
        }
        Ok(descriptor)
    }

    /// Resolves a string id, namespaced or bare. Numeric strings are legacy ids.
    fn resolve_str(&self, text: &str) -> ItemResult<ItemDescriptor> {
        let name = match text.split_once(':') {
            Some((namespace, name)) if namespace.eq_ignore_ascii_case(DEFAULT_NAMESPACE) => name,
            Some(_) => return Err(ItemResolutionError::UnsupportedNamespace(text.to_string())),
            None => text,
        };
        if let Ok(numeric) = name.parse::<u16>() {
            return self
                .by_id(numeric)
                .ok_or(ItemResolutionError::UnknownId(i64::from(numeric)));
        }
        self.by_name(name)
            .ok_or_else(|| ItemResolutionError::UnknownName(text.to_string()))
    }
}

/// Widens any integral tag to `i64`.
pub(crate) const fn tag_i64(tag: &NbtTag) -> Option<i64> {
    match *tag {
        NbtTag::Byte(v) => Some(v as i64),
        NbtTag::Short(v) => Some(v as i64),
        NbtTag::Int(v) => Some(v as i64),
        NbtTag::Long(v) => Some(v),
        _ => None,
    }
}

/// Legacy id table: `(id, canonical name)`.
const LEGACY_ITEMS: &[(u16, &str)] = &[
    (0, "AIR"),
    (1, "STONE"),
    (2, "GRASS"),
    (3, "DIRT"),
    (4, "COBBLESTONE"),
    (5, "PLANKS"),
    (6, "SAPLING"),
    (7, "BEDROCK"),
    (8, "WATER"),
    (9, "STILL_WATER"),
    (10, "LAVA"),
    (11, "STILL_LAVA"),
    (12, "SAND"),
    (13, "GRAVEL"),
    (14, "GOLD_ORE"),
    (15, "IRON_ORE"),
    (16, "COAL_ORE"),
    (17, "LOG"),
    (18, "LEAVES"),
    (19, "SPONGE"),
    (20, "GLASS"),
    (24, "SANDSTONE"),
    (30, "COBWEB"),
    (31, "TALL_GRASS"),
    (32, "DEAD_BUSH"),
    (35, "WOOL"),
    (37, "DANDELION"),
    (38, "POPPY"),
    (39, "BROWN_MUSHROOM"),
    (40, "RED_MUSHROOM"),
    (45, "BRICKS"),
    (48, "MOSS_STONE"),
    (49, "OBSIDIAN"),
    (50, "TORCH"),
    (52, "MONSTER_SPAWNER"),
    (54, "CHEST"),
    (58, "CRAFTING_TABLE"),
    (61, "FURNACE"),
    (63, "SIGN_POST"),
    (65, "LADDER"),
    (68, "WALL_SIGN"),
    (78, "SNOW_LAYER"),
    (79, "ICE"),
    (80, "SNOW_BLOCK"),
    (81, "CACTUS"),
    (82, "CLAY_BLOCK"),
    (83, "SUGARCANE_BLOCK"),
    (86, "PUMPKIN"),
    (91, "JACK_O_LANTERN"),
    (98, "STONE_BRICKS"),
    (103, "MELON_BLOCK"),
    (106, "VINE"),
    (111, "LILY_PAD"),
    (112, "NETHER_BRICKS"),
    (146, "TRAPPED_CHEST"),
    (256, "IRON_SHOVEL"),
    (257, "IRON_PICKAXE"),
    (258, "IRON_AXE"),
    (259, "FLINT_AND_STEEL"),
    (260, "APPLE"),
    (261, "BOW"),
    (262, "ARROW"),
    (263, "COAL"),
    (264, "DIAMOND"),
    (265, "IRON_INGOT"),
    (266, "GOLD_INGOT"),
    (280, "STICK"),
    (287, "STRING"),
    (295, "SEEDS"),
    (296, "WHEAT"),
    (297, "BREAD"),
    (323, "SIGN"),
    (324, "WOODEN_DOOR"),
    (325, "BUCKET"),
    (326, "WATER_BUCKET"),
    (327, "LAVA_BUCKET"),
    (332, "SNOWBALL"),
    (334, "LEATHER"),
    (338, "SUGARCANE"),
    (344, "EGG"),
    (351, "DYE"),
    (352, "BONE"),
    (353, "SUGAR"),
    (355, "BED"),
    (360, "MELON"),
    (361, "PUMPKIN_SEEDS"),
    (362, "MELON_SEEDS"),
    (390, "FLOWER_POT"),
    (391, "CARROT"),
    (392, "POTATO"),
];

/// Modern names that do not match a legacy name.
const NAME_OVERRIDES: &[(&str, &str)] = &[
    ("REEDS", "SUGARCANE"),
    ("WEB", "COBWEB"),
    ("TALLGRASS", "TALL_GRASS"),
    ("DEADBUSH", "DEAD_BUSH"),
    ("YELLOW_FLOWER", "DANDELION"),
    ("RED_FLOWER", "POPPY"),
    ("BRICK_BLOCK", "BRICKS"),
    ("MOSSY_COBBLESTONE", "MOSS_STONE"),
    ("MOB_SPAWNER", "MONSTER_SPAWNER"),
    ("STANDING_SIGN", "SIGN_POST"),
    ("SNOW", "SNOW_BLOCK"),
    ("CLAY", "CLAY_BLOCK"),
    ("LIT_PUMPKIN", "JACK_O_LANTERN"),
    ("STONEBRICK", "STONE_BRICKS"),
    ("WATERLILY", "LILY_PAD"),
    ("NETHER_BRICK", "NETHER_BRICKS"),
    ("WHEAT_SEEDS", "SEEDS"),
    ("FLOWING_WATER", "WATER"),
    ("FLOWING_LAVA", "LAVA"),
    ("OAK_PLANKS", "PLANKS"),
    ("OAK_LOG", "LOG"),
    ("OAK_LEAVES", "LEAVES"),
    ("OAK_SAPLING", "SAPLING"),
    ("GRASS_BLOCK", "GRASS"),
    ("MELON_SLICE", "MELON"),
];

/// The built-in legacy item table with manual overrides for renamed items.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinItemRegistry;

impl BuiltinItemRegistry {
    /// Creates the registry.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn lookup_exact(name: &str) -> Option<ItemDescriptor> {
        LEGACY_ITEMS
            .iter()
            .find(|(_, known)| known.eq_ignore_ascii_case(name))
            .map(|&(id, known)| ItemDescriptor::new(id, known))
    }
}

impl ItemRegistry for BuiltinItemRegistry {
    fn by_id(&self, id: u16) -> Option<ItemDescriptor> {
        LEGACY_ITEMS
            .iter()
            .find(|(known, _)| *known == id)
            .map(|&(id, name)| ItemDescriptor::new(id, name))
    }

    fn by_name(&self, name: &str) -> Option<ItemDescriptor> {
        let normalized = name.trim().replace([' ', '-'], "_").to_ascii_uppercase();
        if let Some(&(_, target)) = NAME_OVERRIDES.iter().find(|(from, _)| *from == normalized) {
            return Self::lookup_exact(target);
        }
        Self::lookup_exact(&normalized)
    }
}
