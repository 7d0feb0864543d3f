use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ThemeError;

const BUILTIN_THEMES: &[(&str, &str)] = &[
    ("classic", include_str!("../themes/classic.toml")),
    ("slate", include_str!("../themes/slate.toml")),
];

/// Pixels per canvas unit.
const UNIT_PX: f32 = 96.0;

const FONT_FAMILY: &str = "sans-serif";
const TITLE_SIZE: f32 = 18.0;
const SUBTITLE_SIZE: f32 = 14.0;
const ENTITY_NAME_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 9.0;
const LABEL_SIZE: f32 = 8.0;
const LEGEND_TITLE_SIZE: f32 = 10.0;
const CHART_TITLE_SIZE: f32 = 16.0;
const AXIS_LABEL_SIZE: f32 = 12.0;

/// A stroke color and width (width in points).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: String,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub background: String,
    pub text: String,
    pub muted_text: String,
    pub entity_border: String,
    pub primary_key: String,
    pub foreign_key: String,
    pub unique: String,
    pub label_background: String,
    pub label_border: String,
    pub panel_background: String,
    pub matched: String,
    pub unmatched: String,
    pub bar: String,
    pub grid: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: "#FFFFFF".to_string(),
            text: "#000000".to_string(),
            muted_text: "#666666".to_string(),
            entity_border: "#000000".to_string(),
            primary_key: "#D32F2F".to_string(),
            foreign_key: "#1976D2".to_string(),
            unique: "#388E3C".to_string(),
            label_background: "#FFFFFF".to_string(),
            label_border: "#808080".to_string(),
            panel_background: "#F5F5F5".to_string(),
            matched: "#4CAF50".to_string(),
            unmatched: "#E0E0E0".to_string(),
            bar: "#2196F3".to_string(),
            grid: "#B0B0B0".to_string(),
        }
    }
}

/// Connector strokes per cardinality. The legend reads the same entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorStyles {
    pub one_to_one: StrokeStyle,
    pub one_to_many: StrokeStyle,
}

impl Default for ConnectorStyles {
    fn default() -> Self {
        Self {
            one_to_one: StrokeStyle {
                color: "#E91E63".to_string(),
                width: 2.5,
            },
            one_to_many: StrokeStyle {
                color: "#666666".to_string(),
                width: 1.5,
            },
        }
    }
}

/// Font family and sizes, in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Typography {
    pub font_family: String,
    pub title_size: f32,
    pub subtitle_size: f32,
    pub entity_name_size: f32,
    pub body_size: f32,
    pub label_size: f32,
    pub legend_title_size: f32,
    pub chart_title_size: f32,
    pub axis_label_size: f32,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            font_family: FONT_FAMILY.to_string(),
            title_size: TITLE_SIZE,
            subtitle_size: SUBTITLE_SIZE,
            entity_name_size: ENTITY_NAME_SIZE,
            body_size: BODY_SIZE,
            label_size: LABEL_SIZE,
            legend_title_size: LEGEND_TITLE_SIZE,
            chart_title_size: CHART_TITLE_SIZE,
            axis_label_size: AXIS_LABEL_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_unit_px")]
    pub unit_px: f32,
    #[serde(default)]
    pub palette: Palette,
    #[serde(default)]
    pub connectors: ConnectorStyles,
    #[serde(default)]
    pub typography: Typography,
}

fn default_unit_px() -> f32 {
    UNIT_PX
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_builtin("classic").expect("built-in classic theme must parse")
    }
}

impl Theme {
    pub fn from_builtin(name: &str) -> Result<Self, ThemeError> {
        let normalized = name.trim().to_ascii_lowercase();
        let content = BUILTIN_THEMES
            .iter()
            .find(|(n, _)| *n == normalized)
            .map(|(_, c)| *c)
            .ok_or_else(|| ThemeError::UnknownBuiltin {
                name: name.to_string(),
                available: Self::list_builtins().join(", "),
            })?;
        Self::from_toml_str(content)
    }

    pub fn list_builtins() -> Vec<&'static str> {
        BUILTIN_THEMES.iter().map(|(n, _)| *n).collect()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ThemeError> {
        toml::from_str(content).map_err(|e| ThemeError::Parse(format!("TOML: {}", e)))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ThemeError> {
        serde_yaml::from_str(content).map_err(|e| ThemeError::Parse(format!("YAML: {}", e)))
    }

    /// Resolve a `--theme` argument: an existing file path, else a built-in name.
    ///
    /// Files are tried as TOML first, then YAML.
    pub fn resolve(spec: &str) -> Result<Self, ThemeError> {
        let path = Path::new(spec);
        if !path.is_file() {
            return Self::from_builtin(spec);
        }

        let content = std::fs::read_to_string(path).map_err(|source| ThemeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).or_else(|_| Self::from_yaml_str(&content))
    }
}
