//! Typed decoding of bridge output and projection into the three text panes.

use std::fmt;
use std::fmt::Write as _;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ResponseError;

#[derive(Clone, Debug, PartialEq)]
pub struct CalculationResponse {
    pub tree_view: String,
    pub base_materials: String,
    pub level_stats: Vec<LevelTasks>,
}

/// Production tasks for one level, in the order the bridge emitted them.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelTasks {
    pub level: String,
    pub items: Vec<(String, f64)>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderedOutput {
    pub tree: String,
    pub base_materials: String,
    pub level_tasks: String,
}

#[derive(Debug, Deserialize)]
struct RawPayload {
    #[serde(default)]
    tree_view: Option<String>,
    #[serde(default)]
    base_materials: Option<String>,
    #[serde(default)]
    level_stats: Option<LevelStats>,
}

#[derive(Debug)]
struct LevelStats(Vec<LevelTasks>);

#[derive(Debug)]
struct ItemQuantities(Vec<(String, f64)>);

impl CalculationResponse {
    /// A non-null `error` wins over every other field; the payload is only
    /// typed once no error is present.
    pub fn decode(text: &str) -> Result<Self, ResponseError> {
        let value: Value = serde_json::from_str(text)?;
        if let Some(message) = error_message(&value) {
            return Err(ResponseError::Application(message));
        }
        let raw = RawPayload::deserialize(value)?;
        Ok(Self {
            tree_view: raw.tree_view.ok_or(ResponseError::MissingField("tree_view"))?,
            base_materials: raw
                .base_materials
                .ok_or(ResponseError::MissingField("base_materials"))?,
            level_stats: raw
                .level_stats
                .ok_or(ResponseError::MissingField("level_stats"))?
                .0,
        })
    }

    pub fn render(&self, target_item: &str, target_quantity: &str) -> RenderedOutput {
        RenderedOutput {
            tree: self.tree_view.clone(),
            base_materials: self.base_materials.clone(),
            level_tasks: format_level_tasks(target_item, target_quantity, &self.level_stats),
        }
    }
}

pub fn render(
    response_text: &str,
    target_item: &str,
    target_quantity: &str,
) -> Result<RenderedOutput, ResponseError> {
    CalculationResponse::decode(response_text)
        .map(|response| response.render(target_item, target_quantity))
}

pub fn format_level_tasks(
    target_item: &str,
    target_quantity: &str,
    levels: &[LevelTasks],
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "[L0] Final target shortfall: {} x {}",
        target_item, target_quantity
    );
    for level in levels {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "--- Level {} (L{}) production tasks ---",
            level.level, level.level
        );
        for (name, quantity) in &level.items {
            let _ = writeln!(out, "  {}: {:.2}", name, quantity);
        }
    }
    out
}

// Non-string error values are still errors; surface their JSON text.
fn error_message(response: &Value) -> Option<String> {
    match response.get("error")? {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}

impl<'de> Deserialize<'de> for LevelStats {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LevelStatsVisitor;

        impl<'de> Visitor<'de> for LevelStatsVisitor {
            type Value = LevelStats;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of level labels to item quantities")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut levels = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((level, items)) = map.next_entry::<String, ItemQuantities>()? {
                    levels.push(LevelTasks {
                        level,
                        items: items.0,
                    });
                }
                Ok(LevelStats(levels))
            }
        }

        deserializer.deserialize_map(LevelStatsVisitor)
    }
}

impl<'de> Deserialize<'de> for ItemQuantities {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ItemQuantitiesVisitor;

        impl<'de> Visitor<'de> for ItemQuantitiesVisitor {
            type Value = ItemQuantities;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of item names to numeric quantities")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut items = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, quantity)) = map.next_entry::<String, f64>()? {
                    items.push((name, quantity));
                }
                Ok(ItemQuantities(items))
            }
        }

        deserializer.deserialize_map(ItemQuantitiesVisitor)
    }
}
