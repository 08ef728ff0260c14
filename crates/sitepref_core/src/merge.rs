use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::error;

use crate::config::{REDACTED_VALUE, ReportConfig};
use crate::preferences::{Environment, EnvironmentPreferences};

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct MergedPreferenceRecord {
    pub group: String,
    pub name: String,
    #[serde(rename = "all-instances")]
    pub all_instances: String,
    pub development: String,
    pub staging: String,
    pub production: String,
}

impl MergedPreferenceRecord {
    pub fn value(&self, environment: Environment) -> &str {
        match environment {
            Environment::AllInstances => &self.all_instances,
            Environment::Development => &self.development,
            Environment::Staging => &self.staging,
            Environment::Production => &self.production,
        }
    }

    fn value_mut(&mut self, environment: Environment) -> &mut String {
        match environment {
            Environment::AllInstances => &mut self.all_instances,
            Environment::Development => &mut self.development,
            Environment::Staging => &mut self.staging,
            Environment::Production => &mut self.production,
        }
    }
}

/// Merged records keyed by preference id, iterated in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreferenceTable {
    entries: Vec<(String, MergedPreferenceRecord)>,
    positions: HashMap<String, usize>,
}

impl PreferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&MergedPreferenceRecord> {
        self.positions.get(id).map(|&index| &self.entries[index].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MergedPreferenceRecord)> {
        self.entries
            .iter()
            .map(|(id, record)| (id.as_str(), record))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    /// Record for `id`, created with empty columns on first sight.
    fn entry(&mut self, id: &str) -> &mut MergedPreferenceRecord {
        let index = match self.positions.get(id) {
            Some(&index) => index,
            None => {
                self.entries
                    .push((id.to_string(), MergedPreferenceRecord::default()));
                self.positions.insert(id.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }
}

impl Serialize for PreferenceTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, record) in &self.entries {
            map.serialize_entry(id, record)?;
        }
        map.end()
    }
}

/// Merge the environment lists of one section.
///
/// Folds in environment order, then preference order; `group` and `name`
/// are last-write-wins. Secure ids are redacted in every environment and
/// JSON ids are re-indented, falling back to the raw value (and logging
/// an error) when it does not parse.
pub fn merge_environments(
    environments: &[EnvironmentPreferences],
    config: &ReportConfig,
) -> PreferenceTable {
    let mut table = PreferenceTable::new();
    for env in environments {
        for pref in &env.preferences {
            let record = table.entry(&pref.id);
            record.group = pref.group.clone();
            record.name = pref.name.clone();

            if config.is_secure(&pref.id) {
                // Environments the id never appears in are masked too.
                for environment in Environment::ALL {
                    *record.value_mut(environment) = REDACTED_VALUE.to_string();
                }
                continue;
            }
            *record.value_mut(env.environment) = match pref.value.as_deref() {
                Some(raw) if config.is_json(&pref.id) => prettify_json(&pref.id, raw),
                Some(raw) => raw.to_string(),
                None => String::new(),
            };
        }
    }
    table
}

/// Re-serialize `raw` as 2-space indented JSON, or return it unchanged.
pub fn prettify_json(id: &str, raw: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(parsed) => serde_json::to_string_pretty(&parsed).unwrap_or_else(|_| raw.to_string()),
        Err(err) => {
            error!("{id} - {err}");
            raw.to_string()
        }
    }
}
