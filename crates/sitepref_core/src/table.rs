use crate::analysis::{AggregateReport, PreferencesFileSummary};
use crate::merge::PreferenceTable;

pub const COLUMN_COUNT: usize = 9;
pub const GLOBAL_SITE: &str = "global";

pub const HEADER_ROW: [&str; COLUMN_COUNT] = [
    "Site",
    "Standard / Custom",
    "Group",
    "Key",
    "Name",
    "All Instances",
    "Development",
    "Staging",
    "Production",
];

/// `[site, category, group, key, name, all-instances, development, staging, production]`
pub type Row = [String; COLUMN_COUNT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Standard,
    Custom,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Custom => "custom",
        }
    }
}

/// Header row first, then global rows, then each site in discovery order.
/// Within a site, standard rows precede custom rows.
pub fn tabulate(report: &AggregateReport) -> Vec<Row> {
    let mut rows = vec![HEADER_ROW.map(str::to_string)];
    push_summary(&mut rows, &report.global, GLOBAL_SITE);
    for site in &report.sites {
        push_summary(&mut rows, &site.preferences, &site.id);
    }
    rows
}

fn push_summary(rows: &mut Vec<Row>, summary: &PreferencesFileSummary, site: &str) {
    push_table(rows, &summary.standard, site, Category::Standard);
    push_table(rows, &summary.custom, site, Category::Custom);
}

fn push_table(rows: &mut Vec<Row>, table: &PreferenceTable, site: &str, category: Category) {
    for (key, record) in table.iter() {
        rows.push([
            site.to_string(),
            category.as_str().to_string(),
            record.group.clone(),
            key.to_string(),
            record.name.clone(),
            record.all_instances.clone(),
            record.development.clone(),
            record.staging.clone(),
            record.production.clone(),
        ]);
    }
}
