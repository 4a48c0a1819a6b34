//! Keyboard layouts
//!
//! A layout is a JSON array of key records as shipped with the vendor software:
//!
//! ```json
//! [{"ledIds": [6], "description": "Esc", "shortName": "Esc",
//!   "topLeftCoordinates": {"x": 0.0, "y": 0.0}, "width": 1.0, "height": 1.0}]
//! ```
//!
//! Only the first LED id of a record is used.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::KeyboardError;
use crate::zone::{Led, Zone};

/// Top-left corner of a key, in key units
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KeyCoordinates {
    pub x: f32,
    pub y: f32,
}

/// Key record as it appears in a layout file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonKeyDefinition {
    led_ids: Vec<i32>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    short_name: String,
    #[serde(default)]
    top_left_coordinates: HashMap<String, f32>,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
}

/// One physical key of a layout
#[derive(Debug, Clone, PartialEq)]
pub struct KeyModel {
    led: Led,
    description: String,
    short_name: String,
    top_left: KeyCoordinates,
    width: f32,
    height: f32,
}

impl KeyModel {
    pub fn new(
        led_id: i32,
        description: impl Into<String>,
        short_name: impl Into<String>,
        top_left: KeyCoordinates,
        width: f32,
        height: f32,
    ) -> Self {
        Self {
            led: Led::new(led_id),
            description: description.into(),
            short_name: short_name.into(),
            top_left,
            width,
            height,
        }
    }

    fn from_json(def: JsonKeyDefinition) -> Result<Self, KeyboardError> {
        let Some(&led_id) = def.led_ids.first() else {
            return Err(KeyboardError::InvalidLayout(format!(
                "key \"{}\" has no LED ids",
                def.description
            )));
        };
        let coord = |axis: &str| def.top_left_coordinates.get(axis).copied().unwrap_or(0.0);
        let top_left = KeyCoordinates {
            x: coord("x"),
            y: coord("y"),
        };
        Ok(Self::new(
            led_id,
            def.description,
            def.short_name,
            top_left,
            def.width,
            def.height,
        ))
    }

    pub fn led_id(&self) -> i32 {
        self.led.id
    }

    pub fn led(&self) -> Led {
        self.led
    }

    pub fn zone(&self) -> Zone {
        self.led.zone
    }

    /// Firmware channel driving each of `[red, green, blue]`
    pub fn rgb_channels(&self) -> [u8; 3] {
        self.led.channels.as_array()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn top_left(&self) -> KeyCoordinates {
        self.top_left
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }
}

/// Lookup name of a key: its description with every non-word character removed
pub fn key_name(description: &str) -> String {
    description
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Keys of a layout in file order, indexed by [`key_name`]
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    keys: Vec<KeyModel>,
    by_name: HashMap<String, usize>,
}

impl KeyMap {
    pub fn new(keys: Vec<KeyModel>) -> Self {
        let mut by_name = HashMap::new();
        for (index, key) in keys.iter().enumerate() {
            let name = key_name(key.description());
            if !name.is_empty() {
                // Later records win on duplicate names
                by_name.insert(name, index);
            }
        }
        Self { keys, by_name }
    }

    /// Parse a layout from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, KeyboardError> {
        let defs: Vec<JsonKeyDefinition> = serde_json::from_str(json)?;
        let keys = defs
            .into_iter()
            .map(KeyModel::from_json)
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Parsed layout with {} keys", keys.len());
        Ok(Self::new(keys))
    }

    /// Load a layout file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, KeyboardError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => KeyboardError::LayoutNotFound(path.display().to_string()),
            _ => KeyboardError::Io(e),
        })?;
        let map = Self::from_json_str(&content)?;
        info!("Loaded {} keys from {}", map.len(), path.display());
        Ok(map)
    }

    /// Load `<dir>/<layout>.json`
    pub fn load_named<P: AsRef<Path>>(dir: P, layout: &str) -> Result<Self, KeyboardError> {
        let path = dir.as_ref().join(format!("{layout}.json"));
        Self::from_path(path).map_err(|e| match e {
            KeyboardError::LayoutNotFound(_) => KeyboardError::LayoutNotFound(layout.to_string()),
            other => other,
        })
    }

    /// Keys in file order
    pub fn keys(&self) -> &[KeyModel] {
        &self.keys
    }

    /// Look up a key by name; non-word characters in `name` are ignored
    pub fn get(&self, name: &str) -> Option<&KeyModel> {
        self.by_name
            .get(&key_name(name))
            .and_then(|&index| self.keys.get(index))
    }

    /// Indexed names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: &str = r#"[
        {"ledIds": [0], "description": "Esc", "shortName": "Esc",
         "topLeftCoordinates": {"x": 0.0, "y": 0.0}, "width": 1.0, "height": 1.0},
        {"ledIds": [15, 16], "description": "Page Up", "shortName": "PgUp",
         "topLeftCoordinates": {"x": 15.25, "y": 1.5}, "width": 1.0, "height": 1.0},
        {"ledIds": [20], "description": "(*)", "shortName": "",
         "topLeftCoordinates": {"x": 3.0, "y": 2.0}, "width": 2.25, "height": 1.0}
    ]"#;

    #[test]
    fn test_parse_layout() {
        let map = KeyMap::from_json_str(LAYOUT).unwrap();
        assert_eq!(map.len(), 3);

        let page_up = &map.keys()[1];
        assert_eq!(page_up.led_id(), 15);
        assert_eq!(page_up.zone(), Zone::Two);
        assert_eq!(page_up.rgb_channels(), [1, 2, 0]);
        assert_eq!(page_up.short_name(), "PgUp");
        assert_eq!(page_up.top_left(), KeyCoordinates { x: 15.25, y: 1.5 });

        let wide = &map.keys()[2];
        assert_eq!(wide.zone(), Zone::Three);
        assert_eq!(wide.width(), 2.25);
        assert_eq!(wide.height(), 1.0);
    }

    #[test]
    fn test_name_index() {
        let map = KeyMap::from_json_str(LAYOUT).unwrap();
        assert_eq!(map.names(), vec!["Esc", "PageUp"]);
        assert_eq!(map.get("PageUp").unwrap().led_id(), 15);
        assert_eq!(map.get("Page Up").unwrap().led_id(), 15);
        assert!(map.get("").is_none());
        assert!(map.get("Home").is_none());
    }

    #[test]
    fn test_key_name_strips_non_word() {
        assert_eq!(key_name("Left Shift"), "LeftShift");
        assert_eq!(key_name("F1_key!"), "F1_key");
        assert_eq!(key_name("+ / -"), "");
        assert_eq!(key_name("Ä"), "");
    }

    #[test]
    fn test_duplicate_names_keep_last() {
        let map = KeyMap::new(vec![
            KeyModel::new(1, "Enter", "", KeyCoordinates::default(), 1.0, 1.0),
            KeyModel::new(2, "Enter", "", KeyCoordinates::default(), 1.0, 1.0),
        ]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("Enter").unwrap().led_id(), 2);
    }

    #[test]
    fn test_missing_coordinates_default_to_origin() {
        let map = KeyMap::from_json_str(r#"[{"ledIds": [3], "description": "A"}]"#).unwrap();
        assert_eq!(map.keys()[0].top_left(), KeyCoordinates::default());
    }

    #[test]
    fn test_empty_led_ids_rejected() {
        let err = KeyMap::from_json_str(r#"[{"ledIds": [], "description": "Ghost"}]"#).unwrap_err();
        assert!(matches!(err, KeyboardError::InvalidLayout(_)));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            KeyMap::from_json_str("{not json"),
            Err(KeyboardError::Layout(_))
        ));
    }

    #[test]
    fn test_load_named() {
        let dir = std::env::temp_dir().join(format!("dk5q-layout-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("us.json"), LAYOUT).unwrap();

        let map = KeyMap::load_named(&dir, "us").unwrap();
        assert_eq!(map.len(), 3);

        let err = KeyMap::load_named(&dir, "de").unwrap_err();
        assert!(matches!(err, KeyboardError::LayoutNotFound(ref name) if name == "de"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
