use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::ReportConfig;
use crate::error::AnalysisError;
use crate::merge::{PreferenceTable, merge_environments};
use crate::metadata::MetadataMap;
use crate::preferences::parse_preferences;
use crate::xml::{XmlElement, read_document};

pub const PREFERENCES_FILENAME: &str = "preferences.xml";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PreferencesFileSummary {
    pub standard: PreferenceTable,
    pub custom: PreferenceTable,
}

impl PreferencesFileSummary {
    pub fn preference_count(&self) -> usize {
        self.standard.len() + self.custom.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteReport {
    pub id: String,
    pub preferences: PreferencesFileSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateReport {
    pub global: PreferencesFileSummary,
    pub sites: Vec<SiteReport>,
}

impl AggregateReport {
    pub fn preference_count(&self) -> usize {
        self.global.preference_count()
            + self
                .sites
                .iter()
                .map(|site| site.preferences.preference_count())
                .sum::<usize>()
    }
}

pub fn global_preferences_path(export_root: &Path) -> PathBuf {
    export_root.join(PREFERENCES_FILENAME)
}

pub fn site_preferences_path(export_root: &Path, site_id: &str) -> PathBuf {
    export_root
        .join("sites")
        .join(site_id)
        .join(PREFERENCES_FILENAME)
}

/// Site ids with a `sites/<id>/preferences.xml`, sorted by directory name.
///
/// Symlinked site directories count; hidden (`.`-prefixed) ones do not.
pub fn discover_sites(export_root: &Path) -> Result<Vec<String>> {
    let sites_dir = export_root.join("sites");
    if !sites_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut sites = Vec::new();
    let walker = WalkDir::new(&sites_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !entry.path().is_dir() {
            continue;
        }
        if !entry.path().join(PREFERENCES_FILENAME).is_file() {
            continue;
        }
        sites.push(name);
    }
    Ok(sites)
}

/// Analyze one preferences document: its standard and custom sections.
///
/// `metadata` is joined into custom preferences only.
pub fn analyze_preferences_file(
    path: &Path,
    metadata: Option<&MetadataMap>,
    config: &ReportConfig,
) -> Result<PreferencesFileSummary> {
    debug!("analyzing file: {}", path.display());
    let document = read_document(path)?;
    if document.name != "preferences" {
        return Err(AnalysisError::NotAPreferencesDocument {
            path: path.to_path_buf(),
            found: document.name,
        }
        .into());
    }
    Ok(summarize_document(&document, metadata, config))
}

pub fn summarize_document(
    document: &XmlElement,
    metadata: Option<&MetadataMap>,
    config: &ReportConfig,
) -> PreferencesFileSummary {
    let section = |name: &str, metadata: Option<&MetadataMap>| match document.child(name) {
        Some(section) => merge_environments(&parse_preferences(section, metadata), config),
        None => PreferenceTable::new(),
    };
    PreferencesFileSummary {
        standard: section("standard-preferences", None),
        custom: section("custom-preferences", metadata),
    }
}

/// Analyze the global preferences file and every discovered site.
pub fn analyze_export(
    export_root: &Path,
    metadata: Option<&MetadataMap>,
    config: &ReportConfig,
) -> Result<AggregateReport> {
    let site_ids = discover_sites(export_root)?;
    if site_ids.is_empty() {
        return Err(AnalysisError::NoSitesFound {
            root: export_root.to_path_buf(),
        }
        .into());
    }
    info!("found {} site(s): {}", site_ids.len(), site_ids.join(", "));

    let global = analyze_preferences_file(&global_preferences_path(export_root), None, config)?;

    let mut sites = Vec::with_capacity(site_ids.len());
    for id in site_ids {
        let preferences = analyze_preferences_file(
            &site_preferences_path(export_root, &id),
            metadata,
            config,
        )?;
        sites.push(SiteReport { id, preferences });
    }

    Ok(AggregateReport { global, sites })
}
