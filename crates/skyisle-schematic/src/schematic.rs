//! Schematic decoding.
//!
//! Turns a schematic blob (optionally gzip-compressed, read with
//! `quartz_nbt` so Java's modified UTF-8 strings survive) into a
//! [`StructureTemplate`]:
//! - Block ids are merged with the `AddBlocks` high nibbles into 12-bit ids
//! - The highest anchor block (bedrock by default) aligns the template
//!   vertically with the island base height
//! - Tile entities and entities are translated into template-local
//!   coordinates by subtracting the `WEOrigin` offset
//! - Container items are resolved one by one; failures drop only that item

use glam::DVec3;
use quartz_nbt::io::{self, Flavor};
use quartz_nbt::{NbtCompound, NbtList, NbtTag};
use skyisle_common::{block_ids, BlockPos, BlockState, ItemStack, TemplateId, DEFAULT_MAX_STACK};
use tracing::{debug, warn};

use crate::error::{DecodeError, DecodeResult};
use crate::items::{tag_i64, ItemRegistry, ItemResolutionError, ItemResult};
use crate::template::{PlacementOp, StructureTemplate, TemplateEntity, TemplateMeta};

/// Name the root compound must carry.
pub const ROOT_TAG: &str = "Schematic";

/// Gzip stream magic.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Number of sign text lines.
const SIGN_LINES: [&str; 4] = ["Text1", "Text2", "Text3", "Text4"];

/// Height parameters used to filter voxels during decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeSettings {
    /// World height the anchor block lands on
    pub island_height: i32,
    /// Air voxels are kept only below this world height
    pub air_floor: i32,
    /// World height limit (exclusive)
    pub world_height: i32,
    /// Block id used as the vertical anchor
    pub anchor_block: u16,
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            island_height: 60,
            air_floor: 60,
            world_height: 256,
            anchor_block: block_ids::BEDROCK,
        }
    }
}

impl DecodeSettings {
    /// Whether a voxel at template height `y` is kept, given the anchor height.
    #[must_use]
    pub const fn keeps(&self, block: BlockState, y: i32, anchor_y: i32) -> bool {
        let h = self.island_height + y - anchor_y;
        h >= 0 && h < self.world_height && (!block.is_air() || h < self.air_floor)
    }
}

/// Storage flavor of a blob, picked from its leading magic bytes.
#[must_use]
pub fn detect_flavor(bytes: &[u8]) -> Flavor {
    if bytes.starts_with(&GZIP_MAGIC) {
        Flavor::GzCompressed
    } else {
        Flavor::Uncompressed
    }
}

/// Decodes a schematic blob.
///
/// The returned template carries id 0 and default metadata; the registry
/// assigns both with [`StructureTemplate::with_meta`].
pub fn decode_schematic(
    bytes: &[u8],
    settings: &DecodeSettings,
    items: &dyn ItemRegistry,
) -> DecodeResult<StructureTemplate> {
    let mut reader = bytes;
    let (root, name) = io::read_nbt(&mut reader, detect_flavor(bytes))?;
    if name != ROOT_TAG {
        return Err(DecodeError::WrongRoot(name));
    }

    let width = required_short(&root, "Width")?;
    let length = required_short(&root, "Length")?;
    let height = required_short(&root, "Height")?;
    if width <= 0 || length <= 0 || height <= 0 {
        return Err(DecodeError::InvalidDimensions {
            width,
            length,
            height,
        });
    }
    let origin = BlockPos::new(
        required_int(&root, "WEOriginX")?,
        required_int(&root, "WEOriginY")?,
        required_int(&root, "WEOriginZ")?,
    );

    let volume = width as usize * length as usize * height as usize;
    let low = unsigned(required_bytes(&root, "Blocks")?);
    let data = required_bytes(&root, "Data")?;
    check_len("Blocks", volume, low.len())?;
    check_len("Data", volume, data.len())?;
    let add = match root.inner().get("AddBlocks") {
        Some(NbtTag::ByteArray(bytes)) => unsigned(bytes),
        Some(other) => return Err(wrong_type("AddBlocks", "byte array", other)),
        None => Vec::new(),
    };
    let ids = merge_block_ids(&low, &add);

    let (w, l, h) = (i32::from(width), i32::from(length), i32::from(height));
    let index = |x: i32, y: i32, z: i32| (y * w * l + z * w + x) as usize;

    let mut anchor: Option<BlockPos> = None;
    for y in 0..h {
        for z in 0..l {
            for x in 0..w {
                if ids[index(x, y, z)] == settings.anchor_block && anchor.map_or(true, |a| y > a.y) {
                    anchor = Some(BlockPos::new(x, y, z));
                }
            }
        }
    }
    let anchor_y = anchor.map_or(0, |a| a.y);

    let mut skipped_items = 0usize;
    let mut tiles = decode_tile_entities(&root, origin, items, &mut skipped_items);
    let entities = decode_entities(&root, origin);

    let mut ops = Vec::new();
    for y in 0..h {
        for z in 0..l {
            for x in 0..w {
                let i = index(x, y, z);
                let block = BlockState::new(ids[i], (data[i] as u8) & 0x0F);
                if !settings.keeps(block, y, anchor_y) {
                    continue;
                }
                let offset = BlockPos::new(x, y, z);
                let mut op = PlacementOp::block(offset, block);
                if let Some(tile) = tiles.remove(&offset) {
                    match tile {
                        TileData::Container(contents) if block.is_container() => {
                            op.contents = Some(contents);
                        },
                        TileData::Sign(lines) if block.is_sign() => op.text = Some(lines),
                        _ => debug!("Ignoring tile entity at {} on block {}", offset, block),
                    }
                }
                ops.push(op);
            }
        }
    }

    Ok(StructureTemplate {
        id: TemplateId::new(0),
        width: width as u16,
        length: length as u16,
        height: height as u16,
        ops,
        anchor,
        entities,
        meta: TemplateMeta::default(),
        skipped_items,
    })
}

/// Merges low block bytes with packed high nibbles into 12-bit ids.
///
/// Even indices take the low nibble of `add[i / 2]`, odd indices the high one.
#[must_use]
pub fn merge_block_ids(low: &[u8], add: &[u8]) -> Vec<u16> {
    low.iter()
        .enumerate()
        .map(|(i, &b)| {
            let base = u16::from(b);
            match add.get(i >> 1) {
                None => base,
                Some(&packed) if i & 1 == 0 => (u16::from(packed & 0x0F) << 8) | base,
                Some(&packed) => (u16::from(packed & 0xF0) << 4) | base,
            }
        })
        .collect()
}

enum TileData {
    Container(Vec<(u8, ItemStack)>),
    Sign(Vec<String>),
}

fn decode_tile_entities(
    root: &NbtCompound,
    origin: BlockPos,
    items: &dyn ItemRegistry,
    skipped: &mut usize,
) -> ahash::AHashMap<BlockPos, TileData> {
    let mut tiles = ahash::AHashMap::new();
    let Ok(list) = root.get::<_, &NbtList>("TileEntities") else {
        return tiles;
    };
    for tile in list.iter().filter_map(as_compound) {
        let coord = |name: &str| tile.inner().get(name).and_then(tag_i64).unwrap_or(0) as i32;
        let pos = BlockPos::new(coord("x"), coord("y"), coord("z")).sub(origin);

        if let Ok(records) = tile.get::<_, &NbtList>("Items") {
            let mut contents = Vec::with_capacity(records.len());
            for record in records.iter().filter_map(as_compound) {
                match decode_item(record, items) {
                    Ok(entry) => contents.push(entry),
                    Err(e) => {
                        *skipped += 1;
                        warn!("Skipping container item at {}: {}", pos, e);
                    },
                }
            }
            tiles.insert(pos, TileData::Container(contents));
        } else if tile.contains_key(SIGN_LINES[0]) {
            let lines = SIGN_LINES
                .iter()
                .map(|key| tile.get::<_, &str>(*key).unwrap_or_default().to_string())
                .collect();
            tiles.insert(pos, TileData::Sign(lines));
        }
    }
    tiles
}

fn decode_item(record: &NbtCompound, items: &dyn ItemRegistry) -> ItemResult<(u8, ItemStack)> {
    let field = |name: &str| record.inner().get(name).and_then(tag_i64);
    let slot = field("Slot")
        .and_then(|s| u8::try_from(s).ok())
        .ok_or(ItemResolutionError::MissingField("Slot"))?;
    let id = record
        .inner()
        .get("id")
        .ok_or(ItemResolutionError::MissingField("id"))?;
    let descriptor = items.resolve(id)?;
    let damage = field("Damage").map_or(0, |d| d.clamp(0, i64::from(u16::MAX)) as u16);
    let count = field("Count").map_or(1, |c| c.clamp(1, i64::from(DEFAULT_MAX_STACK)) as u8);
    Ok((slot, ItemStack::new(descriptor.id, damage, count)))
}

fn decode_entities(root: &NbtCompound, origin: BlockPos) -> Vec<TemplateEntity> {
    let Ok(list) = root.get::<_, &NbtList>("Entities") else {
        return Vec::new();
    };
    let origin = DVec3::new(f64::from(origin.x), f64::from(origin.y), f64::from(origin.z));
    list.iter()
        .filter_map(as_compound)
        .filter_map(|entity| {
            let Ok(kind) = entity.get::<_, &str>("id") else {
                warn!("Skipping template entity without an id");
                return None;
            };
            let position = vec3(entity, "Pos")? - origin;
            let motion = vec3(entity, "Motion").unwrap_or(DVec3::ZERO);
            let rotation = numbers(entity, "Rotation").unwrap_or_default();
            let angle = |i: usize| rotation.get(i).copied().unwrap_or(0.0) as f32;
            Some(TemplateEntity {
                kind: kind.to_string(),
                position,
                motion,
                yaw: angle(0),
                pitch: angle(1),
            })
        })
        .collect()
}

fn as_compound(tag: &NbtTag) -> Option<&NbtCompound> {
    match tag {
        NbtTag::Compound(compound) => Some(compound),
        _ => None,
    }
}

fn tag_f64(tag: &NbtTag) -> Option<f64> {
    match tag {
        NbtTag::Float(v) => Some(f64::from(*v)),
        NbtTag::Double(v) => Some(*v),
        other => tag_i64(other).map(|v| v as f64),
    }
}

/// Numeric list under `name`; `None` if absent or any element is not a number.
fn numbers(compound: &NbtCompound, name: &str) -> Option<Vec<f64>> {
    let list = compound.get::<_, &NbtList>(name).ok()?;
    list.iter().map(tag_f64).collect()
}

fn vec3(compound: &NbtCompound, name: &str) -> Option<DVec3> {
    match numbers(compound, name)?.as_slice() {
        &[x, y, z] => Some(DVec3::new(x, y, z)),
        _ => None,
    }
}

fn unsigned(bytes: &[i8]) -> Vec<u8> {
    bytes.iter().map(|&b| b as u8).collect()
}

const fn type_name(tag: &NbtTag) -> &'static str {
    match tag {
        NbtTag::Byte(_) => "byte",
        NbtTag::Short(_) => "short",
        NbtTag::Int(_) => "int",
        NbtTag::Long(_) => "long",
        NbtTag::Float(_) => "float",
        NbtTag::Double(_) => "double",
        NbtTag::ByteArray(_) => "byte array",
        NbtTag::String(_) => "string",
        NbtTag::List(_) => "list",
        NbtTag::Compound(_) => "compound",
        NbtTag::IntArray(_) => "int array",
        NbtTag::LongArray(_) => "long array",
    }
}

fn wrong_type(tag: &'static str, expected: &'static str, found: &NbtTag) -> DecodeError {
    DecodeError::WrongTagType {
        tag,
        expected,
        found: type_name(found),
    }
}

fn required<'a>(root: &'a NbtCompound, tag: &'static str) -> DecodeResult<&'a NbtTag> {
    root.inner().get(tag).ok_or(DecodeError::MissingTag(tag))
}

fn required_short(root: &NbtCompound, tag: &'static str) -> DecodeResult<i16> {
    match required(root, tag)? {
        NbtTag::Short(v) => Ok(*v),
        other => Err(wrong_type(tag, "short", other)),
    }
}

fn required_int(root: &NbtCompound, tag: &'static str) -> DecodeResult<i32> {
    match required(root, tag)? {
        NbtTag::Int(v) => Ok(*v),
        other => Err(wrong_type(tag, "int", other)),
    }
}

fn required_bytes<'a>(root: &'a NbtCompound, tag: &'static str) -> DecodeResult<&'a [i8]> {
    match required(root, tag)? {
        NbtTag::ByteArray(v) => Ok(v),
        other => Err(wrong_type(tag, "byte array", other)),
    }
}

fn check_len(tag: &'static str, expected: usize, actual: usize) -> DecodeResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(DecodeError::LengthMismatch {
            tag,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::items::BuiltinItemRegistry;

    /// Builds a schematic root with the required tags and origin (0, 0, 0).
    pub(crate) fn schematic_root(w: i16, l: i16, h: i16, blocks: Vec<u8>) -> NbtCompound {
        let mut root = NbtCompound::new();
        let volume = blocks.len();
        root.insert("Width", NbtTag::Short(w));
        root.insert("Length", NbtTag::Short(l));
        root.insert("Height", NbtTag::Short(h));
        root.insert("Blocks", NbtTag::ByteArray(blocks.into_iter().map(|b| b as i8).collect()));
        root.insert("Data", NbtTag::ByteArray(vec![0; volume]));
        root.insert("WEOriginX", NbtTag::Int(0));
        root.insert("WEOriginY", NbtTag::Int(0));
        root.insert("WEOriginZ", NbtTag::Int(0));
        root
    }

    pub(crate) fn encode_as(root: &NbtCompound, name: &str, flavor: Flavor) -> Vec<u8> {
        let mut out = Vec::new();
        io::write_nbt(&mut out, Some(name), root, flavor).expect("write failed");
        out
    }

    pub(crate) fn encode(root: NbtCompound) -> Vec<u8> {
        encode_as(&root, ROOT_TAG, Flavor::Uncompressed)
    }

    fn without(root: &NbtCompound, name: &str) -> NbtCompound {
        let mut out = NbtCompound::new();
        for (key, value) in root.inner().iter().filter(|(key, _)| key.as_str() != name) {
            out.insert(key.clone(), value.clone());
        }
        out
    }

    fn item(slot: i8, id: NbtTag, count: i8) -> NbtTag {
        let mut record = NbtCompound::new();
        record.insert("Slot", NbtTag::Byte(slot));
        record.insert("id", id);
        record.insert("Count", NbtTag::Byte(count));
        record.insert("Damage", NbtTag::Short(0));
        NbtTag::Compound(record)
    }

    fn sign_at(y: i32, lines: &[(&str, &str)]) -> NbtCompound {
        let mut sign = NbtCompound::new();
        sign.insert("x", NbtTag::Int(0));
        sign.insert("y", NbtTag::Int(y));
        sign.insert("z", NbtTag::Int(0));
        for (key, text) in lines {
            sign.insert(*key, NbtTag::String((*text).to_string()));
        }
        sign
    }

    fn decode(bytes: &[u8]) -> DecodeResult<StructureTemplate> {
        decode_schematic(bytes, &DecodeSettings::default(), &BuiltinItemRegistry::new())
    }

    #[test]
    fn test_single_stone_voxel() {
        let bytes = encode(schematic_root(2, 2, 1, vec![1, 0, 0, 0]));
        let template = decode(&bytes).expect("decode failed");
        assert_eq!(template.ops.len(), 1);
        assert_eq!(template.ops[0].offset, BlockPos::new(0, 0, 0));
        assert_eq!(template.ops[0].block.id, 1);
        assert_eq!(template.anchor, None);
    }

    #[test]
    fn test_air_below_floor_is_kept() {
        let bytes = encode(schematic_root(2, 2, 1, vec![1, 0, 0, 0]));
        let settings = DecodeSettings {
            air_floor: 61,
            ..DecodeSettings::default()
        };
        let template =
            decode_schematic(&bytes, &settings, &BuiltinItemRegistry::new()).expect("decode failed");
        assert_eq!(template.ops.len(), 4);
    }

    #[test]
    fn test_anchor_is_highest_bedrock() {
        // 1x1x4 column: bedrock, stone, bedrock, dirt
        let bytes = encode(schematic_root(1, 1, 4, vec![7, 1, 7, 3]));
        let template = decode(&bytes).expect("decode failed");
        assert_eq!(template.anchor, Some(BlockPos::new(0, 2, 0)));
        assert_eq!(template.ops.len(), 4);
    }

    #[test]
    fn test_voxels_outside_world_are_dropped() {
        let bytes = encode(schematic_root(1, 1, 3, vec![1, 1, 7]));
        let settings = DecodeSettings {
            island_height: 1,
            ..DecodeSettings::default()
        };
        let template =
            decode_schematic(&bytes, &settings, &BuiltinItemRegistry::new()).expect("decode failed");
        // anchor y = 2 maps to h = 1; y = 0 would land on h = -1
        let ys: Vec<i32> = template.ops.iter().map(|op| op.offset.y).collect();
        assert_eq!(ys, vec![1, 2]);
    }

    #[test]
    fn test_add_blocks_nibbles() {
        let ids = merge_block_ids(&[0x10, 0x20, 0x30], &[0xA5, 0x0C]);
        assert_eq!(ids, vec![0x510, 0xA20, 0xC30]);
        assert_eq!(merge_block_ids(&[9], &[]), vec![9]);
    }

    #[test]
    fn test_high_block_ids_from_tag() {
        // 0xC8 is stored as a negative signed byte
        let mut root = schematic_root(2, 1, 1, vec![0xC8, 0x01]);
        root.insert("AddBlocks", NbtTag::ByteArray(vec![0x21]));
        let template = decode(&encode(root)).expect("decode failed");
        let ids: Vec<u16> = template.ops.iter().map(|op| op.block.id).collect();
        assert_eq!(ids, vec![0x1C8, 0x201]);
    }

    #[test]
    fn test_op_order_and_data() {
        let mut root = schematic_root(2, 1, 2, vec![1, 2, 3, 4]);
        root.insert("Data", NbtTag::ByteArray(vec![0, 1, 2, 0x13]));
        let template = decode(&encode(root)).expect("decode failed");
        let ids: Vec<u16> = template.ops.iter().map(|op| op.block.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(template.ops[1].offset, BlockPos::new(1, 0, 0));
        assert_eq!(template.ops[2].offset, BlockPos::new(0, 1, 0));
        assert_eq!(template.ops[3].block.data, 3);
    }

    #[test]
    fn test_container_items() {
        let mut root = schematic_root(1, 1, 1, vec![54]);
        root.insert("WEOriginX", NbtTag::Int(100));
        let mut chest = NbtCompound::new();
        chest.insert("id", NbtTag::String("Chest".into()));
        chest.insert("x", NbtTag::Int(100));
        chest.insert("y", NbtTag::Int(0));
        chest.insert("z", NbtTag::Int(0));
        chest.insert(
            "Items",
            NbtTag::List(NbtList::from(vec![
                item(0, NbtTag::Short(1), 5),
                item(1, NbtTag::String("minecraft:stone".into()), 3),
                item(2, NbtTag::String("minecraft:not_a_thing".into()), 1),
            ])),
        );
        root.insert("TileEntities", NbtTag::List(NbtList::from(vec![NbtTag::Compound(chest)])));

        let template = decode(&encode(root)).expect("decode failed");
        let contents = template.ops[0].contents.as_ref().expect("no contents");
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].1.id, contents[1].1.id);
        assert_eq!(contents[0], (0, ItemStack::new(1, 0, 5)));
        assert_eq!(template.skipped_items, 1);
    }

    #[test]
    fn test_sign_text_and_entities() {
        let mut root = schematic_root(1, 1, 1, vec![63]);
        root.insert("WEOriginY", NbtTag::Int(10));
        let sign = sign_at(10, &[("Text1", "Welcome"), ("Text3", "home")]);
        root.insert("TileEntities", NbtTag::List(NbtList::from(vec![NbtTag::Compound(sign)])));

        let mut cow = NbtCompound::new();
        cow.insert("id", NbtTag::String("Cow".into()));
        cow.insert(
            "Pos",
            NbtTag::List(NbtList::from(vec![
                NbtTag::Double(0.5),
                NbtTag::Double(11.0),
                NbtTag::Double(0.5),
            ])),
        );
        cow.insert(
            "Rotation",
            NbtTag::List(NbtList::from(vec![NbtTag::Float(90.0), NbtTag::Float(0.0)])),
        );
        root.insert("Entities", NbtTag::List(NbtList::from(vec![NbtTag::Compound(cow)])));

        let template = decode(&encode(root)).expect("decode failed");
        assert_eq!(
            template.ops[0].text.as_deref(),
            Some(&["Welcome".to_string(), String::new(), "home".to_string(), String::new()][..])
        );
        assert_eq!(template.entities.len(), 1);
        assert_eq!(template.entities[0].position, DVec3::new(0.5, 1.0, 0.5));
        assert!((template.entities[0].yaw - 90.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_sign_text_in_java_modified_utf8() {
        // Supplementary characters are written as surrogate pairs and NUL as C0 80.
        const PLACEHOLDER: &[u8] = b"@@@@@@@@";
        const JAVA_BYTES: [u8; 8] = [0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80, 0xC0, 0x80];

        let mut root = schematic_root(1, 1, 1, vec![63]);
        let sign = sign_at(0, &[("Text1", "@@@@@@@@")]);
        root.insert("TileEntities", NbtTag::List(NbtList::from(vec![NbtTag::Compound(sign)])));
        let mut bytes = encode(root);
        let at = bytes
            .windows(PLACEHOLDER.len())
            .position(|window| window == PLACEHOLDER)
            .expect("placeholder not written");
        bytes[at..at + PLACEHOLDER.len()].copy_from_slice(&JAVA_BYTES);

        let template = decode(&bytes).expect("decode failed");
        let text = template.ops[0].text.as_ref().expect("no sign text");
        assert_eq!(text[0], "\u{1F600}\0");
        assert_eq!(text[1], "");
    }

    #[test]
    fn test_missing_and_malformed_tags() {
        let root = without(&schematic_root(1, 1, 1, vec![1]), "Data");
        assert!(matches!(decode(&encode(root)), Err(DecodeError::MissingTag("Data"))));

        let mut root = schematic_root(1, 1, 1, vec![1]);
        root.insert("Width", NbtTag::Int(1));
        assert!(matches!(
            decode(&encode(root)),
            Err(DecodeError::WrongTagType { tag: "Width", .. })
        ));

        let root = schematic_root(2, 1, 1, vec![1]);
        assert!(matches!(
            decode(&encode(root)),
            Err(DecodeError::LengthMismatch { tag: "Blocks", expected: 2, actual: 1 })
        ));

        let out = encode_as(&schematic_root(1, 1, 1, vec![1]), "Structure", Flavor::Uncompressed);
        assert!(matches!(decode(&out), Err(DecodeError::WrongRoot(_))));

        assert!(matches!(decode(b"not a schematic"), Err(DecodeError::Nbt(_))));
    }

    #[test]
    fn test_gzip_input() {
        let gz = encode_as(&schematic_root(2, 2, 1, vec![1, 0, 0, 0]), ROOT_TAG, Flavor::GzCompressed);
        assert!(matches!(detect_flavor(&gz), Flavor::GzCompressed));
        let template = decode(&gz).expect("decode failed");
        assert_eq!(template.ops.len(), 1);
    }
}
