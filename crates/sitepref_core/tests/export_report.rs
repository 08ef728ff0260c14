use std::fs;
use std::path::Path;

use sitepref_core::analysis::analyze_export;
use sitepref_core::config::{REDACTED_VALUE, ReportConfig};
use sitepref_core::error::AnalysisError;
use sitepref_core::export::write_reports;
use sitepref_core::metadata::analyze_meta;
use sitepref_core::table::tabulate;
use tempfile::tempdir;

const GLOBAL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<preferences xmlns="http://www.demandware.com/xml/impex/preferences/2007-03-31">
    <standard-preferences>
        <all-instances>
            <preference preference-id="ActiveLocales">en_US</preference>
        </all-instances>
    </standard-preferences>
</preferences>"#;

const SITE_GENESIS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<preferences xmlns="http://www.demandware.com/xml/impex/preferences/2007-03-31">
    <custom-preferences>
        <development>
            <preference preference-id="custom.color">red</preference>
            <preference preference-id="apiKey">dev-secret</preference>
        </development>
        <production>
            <preference preference-id="apiKey">prod-secret</preference>
            <preference preference-id="paymentSettings">{"mode":"live","retries":3}</preference>
        </production>
    </custom-preferences>
    <standard-preferences>
        <all-instances>
            <preference preference-id="SiteCurrencies">
                <value>USD</value>
                <value>EUR</value>
            </preference>
        </all-instances>
    </standard-preferences>
</preferences>"#;

const SITE_OUTLET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<preferences>
    <standard-preferences>
        <staging>
            <preference preference-id="ActiveLocales">de_DE</preference>
        </staging>
    </standard-preferences>
</preferences>"#;

const METADATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xmlns="http://www.demandware.com/xml/impex/metadata/2006-10-31">
    <type-extension type-id="SitePreferences">
        <custom-attribute-definitions>
            <attribute-definition attribute-id="custom.color">
                <display-name xml:lang="x-default">Color</display-name>
            </attribute-definition>
            <attribute-definition attribute-id="apiKey">
                <display-name xml:lang="x-default">API Key</display-name>
            </attribute-definition>
        </custom-attribute-definitions>
        <group-definitions>
            <attribute-group group-id="brandColors">
                <display-name xml:lang="x-default">Brand Colors</display-name>
                <attribute attribute-id="custom.color"/>
            </attribute-group>
        </group-definitions>
    </type-extension>
</metadata>"#;

fn write_export(root: &Path) {
    fs::create_dir_all(root.join("meta")).expect("meta dir");
    fs::write(root.join("preferences.xml"), GLOBAL).expect("global");
    fs::write(
        root.join("meta").join("system-objecttype-extensions.xml"),
        METADATA,
    )
    .expect("metadata");
    for (site, body) in [("SiteGenesis", SITE_GENESIS), ("Outlet", SITE_OUTLET)] {
        let dir = root.join("sites").join(site);
        fs::create_dir_all(&dir).expect("site dir");
        fs::write(dir.join("preferences.xml"), body).expect("site prefs");
    }
}

fn config() -> ReportConfig {
    ReportConfig {
        secure_preferences: vec!["apiKey".to_string()],
        json_preferences: vec!["paymentSettings".to_string()],
        ..ReportConfig::default()
    }
}

fn row(fields: [&str; 9]) -> [String; 9] {
    fields.map(str::to_string)
}

#[test]
fn fixture_export_produces_expected_rows() {
    let temp = tempdir().expect("tempdir");
    let root = temp.path().join("export");
    write_export(&root);

    let metadata = analyze_meta(&root).expect("metadata");
    let report = analyze_export(&root, Some(&metadata), &config()).expect("analyze");
    let rows = tabulate(&report);

    assert_eq!(rows.len() - 1, report.preference_count());
    assert_eq!(
        rows[1],
        row(["global", "standard", "", "ActiveLocales", "", "en_US", "", "", ""])
    );
    // Sites are visited in sorted order.
    assert_eq!(
        rows[2],
        row(["Outlet", "standard", "", "ActiveLocales", "", "", "", "de_DE", ""])
    );
    assert_eq!(
        rows[3],
        row(["SiteGenesis", "standard", "", "SiteCurrencies", "", "USD || EUR", "", "", ""])
    );
    assert_eq!(
        rows[4],
        row([
            "SiteGenesis",
            "custom",
            "Brand Colors (brandColors)",
            "custom.color",
            "Color",
            "",
            "red",
            "",
            "",
        ])
    );

    let api_key = report.sites[1]
        .preferences
        .custom
        .get("apiKey")
        .expect("apiKey");
    assert_eq!(api_key.name, "API Key");
    for value in [
        &api_key.all_instances,
        &api_key.development,
        &api_key.staging,
        &api_key.production,
    ] {
        assert_eq!(value, REDACTED_VALUE);
    }

    let payment = report.sites[1]
        .preferences
        .custom
        .get("paymentSettings")
        .expect("paymentSettings");
    assert_eq!(
        payment.production,
        "{\n  \"mode\": \"live\",\n  \"retries\": 3\n}"
    );
}

#[test]
fn fixture_export_writes_all_reports() {
    let temp = tempdir().expect("tempdir");
    let root = temp.path().join("export");
    let output = temp.path().join("output");
    write_export(&root);

    let metadata = analyze_meta(&root).expect("metadata");
    let report = analyze_export(&root, Some(&metadata), &config()).expect("analyze");
    let summary = write_reports(&output, "code-base", &report, &config());
    assert!(summary.is_complete(), "{:?}", summary.failures);

    let csv = fs::read_to_string(output.join("report-code-base.csv")).expect("csv");
    assert!(csv.starts_with("Site,Standard / Custom,Group,Key,Name,"));
    assert!(csv.contains("global,standard,,ActiveLocales,,en_US,,,\n"));
    assert!(!csv.contains("prod-secret"));
    assert_eq!(csv.matches("****REDACTED****").count(), 4);

    let json: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(output.join("report-code-base.json")).expect("json"),
    )
    .expect("parse json");
    assert_eq!(json["sites"][0]["id"], "Outlet");
    assert_eq!(
        json["sites"][1]["preferences"]["custom"]["custom.color"]["group"],
        "Brand Colors (brandColors)"
    );

    let xls = fs::read(output.join("report-code-base.xls")).expect("xls");
    assert_eq!(&xls[..2], b"PK");
}

#[test]
fn export_without_sites_is_rejected() {
    let temp = tempdir().expect("tempdir");
    let root = temp.path().join("export");
    fs::create_dir_all(&root).expect("root");
    fs::write(root.join("preferences.xml"), GLOBAL).expect("global");

    let err = analyze_export(&root, None, &ReportConfig::default()).expect_err("must fail");
    assert!(matches!(
        err.downcast_ref::<AnalysisError>(),
        Some(AnalysisError::NoSitesFound { .. })
    ));
}

#[test]
fn missing_site_preferences_metadata_is_a_typed_error() {
    let temp = tempdir().expect("tempdir");
    let root = temp.path().join("export");
    fs::create_dir_all(root.join("meta")).expect("meta dir");
    fs::write(
        root.join("meta").join("system-objecttype-extensions.xml"),
        r#"<metadata><type-extension type-id="Product"/></metadata>"#,
    )
    .expect("metadata");

    let err = analyze_meta(&root).expect_err("must fail");
    assert!(matches!(
        err.downcast_ref::<AnalysisError>(),
        Some(AnalysisError::MissingSitePreferences { .. })
    ));
}
