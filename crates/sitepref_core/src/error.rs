use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The metadata document has no `SitePreferences` type extension.
    #[error("metadata not found: no `SitePreferences` type-extension in {}", path.display())]
    MissingSitePreferences { path: PathBuf },

    /// No `sites/<id>/preferences.xml` exists under the export root.
    #[error("no sites found under {}", root.display())]
    NoSitesFound { root: PathBuf },

    /// A preferences document whose root element is not `<preferences>`.
    #[error("{} is not a preferences document (root element `{found}`)", path.display())]
    NotAPreferencesDocument { path: PathBuf, found: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid color `{value}` for {field}: expected #RRGGBB, RRGGBB or AARRGGBB")]
    InvalidColor { field: &'static str, value: String },

    #[error("invalid column `{value}` in {field}: expected a spreadsheet column letter")]
    InvalidColumn { field: &'static str, value: String },

    #[error("headerRow must define at least one column")]
    EmptyHeaderRow,
}
