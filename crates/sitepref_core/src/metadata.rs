use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::AnalysisError;
use crate::xml::{XmlElement, read_document};

pub const SITE_PREFERENCES_TYPE_ID: &str = "SitePreferences";
const DEFAULT_LANGUAGE: &str = "x-default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferenceGroup {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceMetadata {
    pub id: String,
    pub group: Option<PreferenceGroup>,
    pub display_name: String,
}

impl PreferenceMetadata {
    /// `"{groupName} ({groupId})"`, or empty when the preference is ungrouped.
    pub fn group_label(&self) -> String {
        match &self.group {
            Some(group) => format!("{} ({})", group.name, group.id),
            None => String::new(),
        }
    }
}

pub type MetadataMap = BTreeMap<String, PreferenceMetadata>;

pub fn metadata_path(export_root: &Path) -> PathBuf {
    export_root
        .join("meta")
        .join("system-objecttype-extensions.xml")
}

/// Read `meta/system-objecttype-extensions.xml` and resolve the preference metadata.
pub fn analyze_meta(export_root: &Path) -> Result<MetadataMap> {
    let path = metadata_path(export_root);
    debug!("analyzing metadata: {}", path.display());
    let document = read_document(&path)?;
    Ok(resolve_metadata(&document, &path)?)
}

pub fn resolve_metadata(document: &XmlElement, source: &Path) -> Result<MetadataMap, AnalysisError> {
    let extension = document
        .children("type-extension")
        .find(|extension| extension.attribute("type-id") == Some(SITE_PREFERENCES_TYPE_ID))
        .ok_or_else(|| AnalysisError::MissingSitePreferences {
            path: source.to_path_buf(),
        })?;

    let groups = collect_groups(extension);
    let mut metadata = MetadataMap::new();

    let definitions = extension
        .child("custom-attribute-definitions")
        .into_iter()
        .flat_map(|definitions| definitions.children("attribute-definition"));
    for definition in definitions {
        let Some(id) = definition.attribute("attribute-id") else {
            warn!("skipping attribute-definition without attribute-id");
            continue;
        };
        // Later groups win when an attribute is listed more than once.
        let group = groups
            .iter()
            .rev()
            .find(|(_, members)| members.iter().any(|member| member == id))
            .map(|(group, _)| group.clone());

        metadata.insert(
            id.to_string(),
            PreferenceMetadata {
                id: id.to_string(),
                group,
                display_name: display_name(definition).unwrap_or_default(),
            },
        );
    }

    Ok(metadata)
}

fn collect_groups(extension: &XmlElement) -> Vec<(PreferenceGroup, Vec<String>)> {
    let Some(definitions) = extension.child("group-definitions") else {
        return Vec::new();
    };
    definitions
        .children("attribute-group")
        .map(|group| {
            let members = group
                .children("attribute")
                .filter_map(|attribute| attribute.attribute("attribute-id"))
                .map(str::to_string)
                .collect();
            (
                PreferenceGroup {
                    id: group.attribute("group-id").unwrap_or_default().to_string(),
                    name: display_name(group).unwrap_or_default(),
                },
                members,
            )
        })
        .collect()
}

fn display_name(element: &XmlElement) -> Option<String> {
    element
        .children("display-name")
        .find(|name| name.attribute("xml:lang") == Some(DEFAULT_LANGUAGE))
        .or_else(|| element.child("display-name"))
        .and_then(XmlElement::text)
}
