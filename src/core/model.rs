use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::geometry::{Quad, Rect};

/// One text region as emitted by the OCR engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub confidence: f32,
    pub bbox: Quad,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Header,
    Paragraph,
    TableCell,
    TextBlock,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Header => "header",
            BlockType::Paragraph => "paragraph",
            BlockType::TableCell => "table_cell",
            BlockType::TextBlock => "text_block",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayoutBlock {
    #[serde(rename = "type")]
    pub kind: BlockType,
    pub bbox: Rect,
    pub area: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayoutAnalysis {
    pub blocks: Vec<LayoutBlock>,
    pub total_blocks: usize,
    pub has_tables: bool,
}

impl LayoutAnalysis {
    pub fn new(blocks: Vec<LayoutBlock>, has_tables: bool) -> Self {
        Self {
            total_blocks: blocks.len(),
            blocks,
            has_tables,
        }
    }
}

/// Insertion-ordered set of strings: the first occurrence wins, later duplicates are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySet {
    items: Vec<String>,
    seen: HashSet<String>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the value was already present.
    pub fn insert(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.seen.contains(&value) {
            return false;
        }
        self.seen.insert(value.clone());
        self.items.push(value);
        true
    }

    pub fn contains(&self, value: &str) -> bool {
        self.seen.contains(value)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.items
    }
}

impl<S: Into<String>> FromIterator<S> for EntitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<S: Into<String>> Extend<S> for EntitySet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl Serialize for EntitySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EntitySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Vec::<String>::deserialize(deserializer)?.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Persons,
    Organizations,
    Locations,
    Dates,
    Emails,
    Phones,
    Amounts,
    Urls,
}

impl EntityCategory {
    pub const ALL: [EntityCategory; 8] = [
        EntityCategory::Persons,
        EntityCategory::Organizations,
        EntityCategory::Locations,
        EntityCategory::Dates,
        EntityCategory::Emails,
        EntityCategory::Phones,
        EntityCategory::Amounts,
        EntityCategory::Urls,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityCategory::Persons => "persons",
            EntityCategory::Organizations => "organizations",
            EntityCategory::Locations => "locations",
            EntityCategory::Dates => "dates",
            EntityCategory::Emails => "emails",
            EntityCategory::Phones => "phones",
            EntityCategory::Amounts => "amounts",
            EntityCategory::Urls => "urls",
        }
    }
}

/// The closed set of eight entity categories.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entities {
    pub persons: EntitySet,
    pub organizations: EntitySet,
    pub locations: EntitySet,
    pub dates: EntitySet,
    pub emails: EntitySet,
    pub phones: EntitySet,
    pub amounts: EntitySet,
    pub urls: EntitySet,
}

impl Entities {
    pub fn get(&self, category: EntityCategory) -> &EntitySet {
        match category {
            EntityCategory::Persons => &self.persons,
            EntityCategory::Organizations => &self.organizations,
            EntityCategory::Locations => &self.locations,
            EntityCategory::Dates => &self.dates,
            EntityCategory::Emails => &self.emails,
            EntityCategory::Phones => &self.phones,
            EntityCategory::Amounts => &self.amounts,
            EntityCategory::Urls => &self.urls,
        }
    }

    pub fn get_mut(&mut self, category: EntityCategory) -> &mut EntitySet {
        match category {
            EntityCategory::Persons => &mut self.persons,
            EntityCategory::Organizations => &mut self.organizations,
            EntityCategory::Locations => &mut self.locations,
            EntityCategory::Dates => &mut self.dates,
            EntityCategory::Emails => &mut self.emails,
            EntityCategory::Phones => &mut self.phones,
            EntityCategory::Amounts => &mut self.amounts,
            EntityCategory::Urls => &mut self.urls,
        }
    }

    pub fn insert(&mut self, category: EntityCategory, value: impl Into<String>) -> bool {
        self.get_mut(category).insert(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityCategory, &EntitySet)> {
        EntityCategory::ALL
            .into_iter()
            .map(move |category| (category, self.get(category)))
    }

    pub fn total(&self) -> usize {
        self.iter().map(|(_, set)| set.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrSummary {
    pub full_text: String,
    pub text_blocks: Vec<TextSpan>,
    pub average_confidence: f64,
    pub word_count: usize,
    pub character_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultMetadata {
    pub image_dimensions: ImageDimensions,
    pub processing_complete: bool,
    pub total_entities_found: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentResult {
    pub success: bool,
    pub filename: String,
    pub ocr: OcrSummary,
    pub layout: LayoutAnalysis,
    pub entities: Entities,
    pub metadata: ResultMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn entity_set_keeps_first_seen_order() {
        let set: EntitySet = ["b@x.io", "a@x.io", "b@x.io"].into_iter().collect();
        assert_eq!(set.as_slice(), ["b@x.io", "a@x.io"]);
        assert!(set.contains("a@x.io"));
    }

    #[test]
    fn entities_serialize_with_eight_keys() {
        let mut entities = Entities::default();
        entities.insert(EntityCategory::Urls, "https://example.com");
        let value = serde_json::to_value(&entities).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 8);
        for category in EntityCategory::ALL {
            assert!(object.contains_key(category.as_str()));
        }
        assert_eq!(object["urls"], serde_json::json!(["https://example.com"]));
    }

    #[test]
    fn total_counts_every_category() {
        let mut entities = Entities::default();
        assert_eq!(entities.total(), 0);
        entities.insert(EntityCategory::Persons, "Ada Lovelace");
        entities.insert(EntityCategory::Persons, "Ada Lovelace");
        entities.insert(EntityCategory::Dates, "1843");
        assert_eq!(entities.total(), 2);
    }

    #[test]
    fn layout_block_uses_type_key() {
        let block = LayoutBlock {
            kind: BlockType::TableCell,
            bbox: Rect::new(0, 0, 60, 25),
            area: 1500,
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "table_cell", "bbox": [0, 0, 60, 25], "area": 1500})
        );
    }
}
