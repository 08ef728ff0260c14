use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const REDACTED_VALUE: &str = "****REDACTED****";
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "output";

/// Report configuration, loaded once per run and passed by reference.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportConfig {
    /// Preference ids whose values are replaced by [`REDACTED_VALUE`].
    pub secure_preferences: Vec<String>,
    /// Preference ids whose values are re-indented as JSON.
    pub json_preferences: Vec<String>,
    pub output_directory: Option<String>,
    /// Columns (by letter) that get the header-column treatment.
    pub col_headers: Vec<String>,
    /// Columns (by letter) holding per-environment values.
    pub col_values: Vec<String>,
    pub pref_cell_alignment: CellAlignment,
    pub all_row_font: CellFont,
    pub all_row_border: CellBorder,
    pub all_row_alignment: CellAlignment,
    pub header_col_fill: CellFill,
    pub header_row_fill: CellFill,
    pub header_row_font: CellFont,
    /// Worksheet column schema; row 1 of the spreadsheet holds these headers.
    pub header_row: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CellAlignment {
    pub horizontal: Option<HorizontalAlign>,
    pub vertical: Option<VerticalAlign>,
    pub wrap_text: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum HorizontalAlign {
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CellFont {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CellBorder {
    pub style: BorderStyle,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum BorderStyle {
    #[default]
    None,
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
    Hair,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CellFill {
    pub pattern: FillPattern,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum FillPattern {
    #[default]
    None,
    Solid,
    LightGray,
    MediumGray,
    DarkGray,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ColumnSpec {
    pub header: String,
    pub key: String,
    #[serde(default)]
    pub width: Option<f64>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let font = |size: f64, bold: bool, color: Option<&str>| CellFont {
            name: Some("Arial".to_string()),
            size: Some(size),
            bold,
            italic: false,
            color: color.map(str::to_string),
        };
        let column = |header: &str, key: &str, width: f64| ColumnSpec {
            header: header.to_string(),
            key: key.to_string(),
            width: Some(width),
        };
        let letters = |items: &[&str]| -> Vec<String> {
            items.iter().map(|item| (*item).to_string()).collect()
        };

        Self {
            secure_preferences: Vec::new(),
            json_preferences: Vec::new(),
            output_directory: None,
            col_headers: letters(&["A", "B", "C", "D", "E"]),
            col_values: letters(&["F", "G", "H", "I"]),
            pref_cell_alignment: CellAlignment {
                horizontal: Some(HorizontalAlign::Left),
                vertical: Some(VerticalAlign::Top),
                wrap_text: true,
            },
            all_row_font: font(10.0, false, None),
            all_row_border: CellBorder {
                style: BorderStyle::Thin,
                color: Some("#BFBFBF".to_string()),
            },
            all_row_alignment: CellAlignment {
                horizontal: None,
                vertical: Some(VerticalAlign::Top),
                wrap_text: true,
            },
            header_col_fill: CellFill {
                pattern: FillPattern::Solid,
                color: Some("#F2F2F2".to_string()),
            },
            header_row_fill: CellFill {
                pattern: FillPattern::Solid,
                color: Some("#1F4E78".to_string()),
            },
            header_row_font: font(11.0, true, Some("#FFFFFF")),
            header_row: vec![
                column("Site", "site", 20.0),
                column("Standard / Custom", "type", 18.0),
                column("Group", "group", 30.0),
                column("Key", "key", 35.0),
                column("Name", "name", 35.0),
                column("All Instances", "allInstances", 40.0),
                column("Development", "development", 40.0),
                column("Staging", "staging", 40.0),
                column("Production", "production", 40.0),
            ],
        }
    }
}

impl ReportConfig {
    pub fn is_secure(&self, preference_id: &str) -> bool {
        self.secure_preferences.iter().any(|id| id == preference_id)
    }

    pub fn is_json(&self, preference_id: &str) -> bool {
        self.json_preferences.iter().any(|id| id == preference_id)
    }

    /// Zero-based indices of the `colHeaders` columns.
    pub fn header_column_indices(&self) -> Result<Vec<u16>, ConfigError> {
        self.col_headers
            .iter()
            .map(|letter| column_index(letter, "colHeaders"))
            .collect()
    }

    pub fn value_column_indices(&self) -> Result<Vec<u16>, ConfigError> {
        self.col_values
            .iter()
            .map(|letter| column_index(letter, "colValues"))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.header_row.is_empty() {
            return Err(ConfigError::EmptyHeaderRow);
        }
        self.header_column_indices()?;
        self.value_column_indices()?;

        let colors = [
            ("allRowFont.color", self.all_row_font.color.as_deref()),
            ("headerRowFont.color", self.header_row_font.color.as_deref()),
            ("allRowBorder.color", self.all_row_border.color.as_deref()),
            ("headerColFill.color", self.header_col_fill.color.as_deref()),
            ("headerRowFill.color", self.header_row_fill.color.as_deref()),
        ];
        for (field, value) in colors {
            if let Some(value) = value {
                parse_color(value, field)?;
            }
        }
        Ok(())
    }
}

/// Load a ReportConfig from TOML (or JSON for `.json` paths). Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<ReportConfig> {
    if !config_path.exists() {
        return Ok(ReportConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let is_json = config_path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let parsed: ReportConfig = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?
    } else {
        toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?
    };
    parsed
        .validate()
        .with_context(|| format!("invalid configuration in {}", config_path.display()))?;
    Ok(parsed)
}

pub fn render_default_config() -> Result<String> {
    let body =
        toml::to_string_pretty(&ReportConfig::default()).context("failed to serialize config")?;
    Ok(format!(
        "# sitepref report configuration (written by `sitepref init-config`)\n# securePreferences are redacted, jsonPreferences are re-indented.\n\n{body}"
    ))
}

/// Convert a spreadsheet column letter (`A`, `AB`) to a zero-based index.
pub fn column_index(letter: &str, field: &'static str) -> Result<u16, ConfigError> {
    let invalid = || ConfigError::InvalidColumn {
        field,
        value: letter.to_string(),
    };
    let trimmed = letter.trim();
    if trimmed.is_empty() || trimmed.len() > 3 {
        return Err(invalid());
    }
    let mut index: u32 = 0;
    for ch in trimmed.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(invalid());
        }
        index = index * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    // XLSX has 16384 columns.
    if index > 16_384 {
        return Err(invalid());
    }
    Ok((index - 1) as u16)
}

/// Parse `#RRGGBB`, `RRGGBB` or ARGB `AARRGGBB` into a 24-bit RGB value.
pub fn parse_color(value: &str, field: &'static str) -> Result<u32, ConfigError> {
    let invalid = || ConfigError::InvalidColor {
        field,
        value: value.to_string(),
    };
    let hex = value.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return Err(invalid());
    }
    let rgb = match hex.len() {
        6 => hex,
        8 => &hex[2..],
        _ => return Err(invalid()),
    };
    u32::from_str_radix(rgb, 16).map_err(|_| invalid())
}
