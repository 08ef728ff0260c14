use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::metadata::MetadataMap;
use crate::xml::XmlElement;

/// Separator used when a preference declares several `value` children.
pub const VALUE_SEPARATOR: &str = " || ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Environment {
    AllInstances,
    Development,
    Staging,
    Production,
}

impl Environment {
    pub const ALL: [Environment; 4] = [
        Self::AllInstances,
        Self::Development,
        Self::Staging,
        Self::Production,
    ];

    /// Section name as it appears in the export.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllInstances => "all-instances",
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|env| env.as_str() == value)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPreferenceEntry {
    pub environment: Environment,
    pub id: String,
    pub group: String,
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentPreferences {
    pub environment: Environment,
    pub preferences: Vec<RawPreferenceEntry>,
}

/// List the preferences declared in each environment section, in document order.
///
/// Only sections present in the document produce an entry. Custom
/// preferences pass `metadata` to pick up their group and display name.
pub fn parse_preferences(
    section: &XmlElement,
    metadata: Option<&MetadataMap>,
) -> Vec<EnvironmentPreferences> {
    let mut out = Vec::new();
    for env_section in section.elements() {
        let Some(environment) = Environment::parse(&env_section.name) else {
            warn!(
                "skipping unknown environment section <{}> in <{}>",
                env_section.name, section.name
            );
            continue;
        };

        let mut preferences = Vec::new();
        for element in env_section.children("preference") {
            let Some(id) = element.attribute("preference-id") else {
                warn!("skipping preference without preference-id in {environment}");
                continue;
            };
            let known = metadata.and_then(|metadata| metadata.get(id));
            preferences.push(RawPreferenceEntry {
                environment,
                id: id.to_string(),
                group: known.map(|meta| meta.group_label()).unwrap_or_default(),
                name: known
                    .map(|meta| meta.display_name.clone())
                    .unwrap_or_default(),
                value: preference_value(element),
            });
        }

        out.push(EnvironmentPreferences {
            environment,
            preferences,
        });
    }
    out
}

/// Direct text wins; otherwise the `value` children, several joined.
fn preference_value(element: &XmlElement) -> Option<String> {
    if let Some(text) = element.text() {
        return Some(text);
    }
    let values: Vec<&XmlElement> = element.children("value").collect();
    match values.as_slice() {
        [] => None,
        [single] => single.text(),
        many => Some(
            many.iter()
                .map(|value| value.text().unwrap_or_default())
                .collect::<Vec<_>>()
                .join(VALUE_SEPARATOR),
        ),
    }
}
