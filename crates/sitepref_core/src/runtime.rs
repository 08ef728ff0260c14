use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::analysis::{discover_sites, global_preferences_path};
use crate::config::{DEFAULT_OUTPUT_DIRECTORY, ReportConfig};
use crate::metadata::metadata_path;

pub const CONFIG_FILENAME: &str = "sitepref.toml";
pub const DEFAULT_EXPORT_FOLDER: &str = "demo_data";
pub const DEFAULT_REPORT_NAME: &str = "code-base";

pub const FOLDER_ENV: &str = "SITEPREF_FOLDER";
pub const NAME_ENV: &str = "SITEPREF_NAME";
pub const OUTPUT_DIR_ENV: &str = "SITEPREF_OUTPUT_DIR";
pub const CONFIG_ENV: &str = "SITEPREF_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Prompt,
    Config,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Prompt => "prompt",
            Self::Config => "config",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub export_root: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub cwd: PathBuf,
}

impl ResolutionContext {
    pub fn from_process() -> Result<Self> {
        let cwd = env::current_dir().context("failed to read current directory")?;
        Ok(Self { cwd })
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub export_root: PathBuf,
    pub global_preferences_path: PathBuf,
    pub sites_dir: PathBuf,
    pub metadata_path: PathBuf,
    pub output_dir: PathBuf,
    pub config_path: PathBuf,
    pub root_source: ValueSource,
    pub output_source: ValueSource,
    pub config_source: ValueSource,
}

impl ResolvedPaths {
    pub fn diagnostics(&self) -> String {
        format!(
            "export_root={} ({})\nglobal_preferences={}\nsites_dir={}\nmetadata={}\noutput_dir={} ({})\nconfig_path={} ({})",
            normalize_for_display(&self.export_root),
            self.root_source.as_str(),
            normalize_for_display(&self.global_preferences_path),
            normalize_for_display(&self.sites_dir),
            normalize_for_display(&self.metadata_path),
            normalize_for_display(&self.output_dir),
            self.output_source.as_str(),
            normalize_for_display(&self.config_path),
            self.config_source.as_str(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct ExportStatus {
    pub export_root_exists: bool,
    pub global_preferences_exists: bool,
    pub sites_dir_exists: bool,
    pub metadata_exists: bool,
    pub site_count: usize,
    pub warnings: Vec<String>,
}

/// Config file location: `--config` > `SITEPREF_CONFIG` > `./sitepref.toml`.
pub fn resolve_config_path(
    context: &ResolutionContext,
    overrides: &PathOverrides,
) -> (PathBuf, ValueSource) {
    resolve_config_path_with_lookup(context, overrides, |key| env::var(key).ok())
}

fn resolve_config_path_with_lookup<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: F,
) -> (PathBuf, ValueSource)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = overrides.config.as_deref() {
        (absolutize(path, &context.cwd), ValueSource::Flag)
    } else if let Some(value) = non_empty(lookup_env(CONFIG_ENV)) {
        (absolutize(Path::new(&value), &context.cwd), ValueSource::Env)
    } else {
        (context.cwd.join(CONFIG_FILENAME), ValueSource::Default)
    }
}

/// Export root from `--folder` or `SITEPREF_FOLDER`, if either is set.
///
/// `None` means the caller has to ask for it.
pub fn resolve_export_root(
    context: &ResolutionContext,
    overrides: &PathOverrides,
) -> Option<(PathBuf, ValueSource)> {
    resolve_export_root_with_lookup(context, overrides, |key| env::var(key).ok())
}

fn resolve_export_root_with_lookup<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: F,
) -> Option<(PathBuf, ValueSource)>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = overrides.export_root.as_deref() {
        return Some((absolutize(path, &context.cwd), ValueSource::Flag));
    }
    non_empty(lookup_env(FOLDER_ENV))
        .map(|value| (absolutize(Path::new(&value), &context.cwd), ValueSource::Env))
}

pub fn resolve_paths(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    config: &ReportConfig,
    export_root: (PathBuf, ValueSource),
) -> ResolvedPaths {
    resolve_paths_with_lookup(context, overrides, config, export_root, |key| {
        env::var(key).ok()
    })
}

fn resolve_paths_with_lookup<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    config: &ReportConfig,
    export_root: (PathBuf, ValueSource),
    lookup_env: F,
) -> ResolvedPaths
where
    F: Fn(&str) -> Option<String>,
{
    let (export_root, root_source) = export_root;
    let export_root = absolutize(&export_root, &context.cwd);

    let (output_dir, output_source) = if let Some(path) = overrides.output_dir.as_deref() {
        (absolutize(path, &context.cwd), ValueSource::Flag)
    } else if let Some(value) = non_empty(lookup_env(OUTPUT_DIR_ENV)) {
        (absolutize(Path::new(&value), &context.cwd), ValueSource::Env)
    } else if let Some(value) = non_empty(config.output_directory.clone()) {
        (absolutize(Path::new(&value), &context.cwd), ValueSource::Config)
    } else {
        (
            context.cwd.join(DEFAULT_OUTPUT_DIRECTORY),
            ValueSource::Default,
        )
    };

    let (config_path, config_source) =
        resolve_config_path_with_lookup(context, overrides, &lookup_env);

    ResolvedPaths {
        global_preferences_path: global_preferences_path(&export_root),
        sites_dir: export_root.join("sites"),
        metadata_path: metadata_path(&export_root),
        export_root,
        output_dir,
        config_path,
        root_source,
        output_source,
        config_source,
    }
}

pub fn inspect_export(paths: &ResolvedPaths) -> Result<ExportStatus> {
    let export_root_exists = paths.export_root.is_dir();
    let global_preferences_exists = paths.global_preferences_path.is_file();
    let sites_dir_exists = paths.sites_dir.is_dir();
    let metadata_exists = paths.metadata_path.is_file();
    let site_count = if sites_dir_exists {
        discover_sites(&paths.export_root)
            .with_context(|| format!("failed to scan {}", paths.sites_dir.display()))?
            .len()
    } else {
        0
    };

    let mut warnings = Vec::new();
    if !metadata_exists {
        warnings.push(format!(
            "{} is missing; custom preferences will have no group or name",
            normalize_for_display(&paths.metadata_path)
        ));
    }
    if sites_dir_exists && site_count == 0 {
        warnings.push(format!(
            "{} has no site with a preferences.xml",
            normalize_for_display(&paths.sites_dir)
        ));
    }

    Ok(ExportStatus {
        export_root_exists,
        global_preferences_exists,
        sites_dir_exists,
        metadata_exists,
        site_count,
        warnings,
    })
}

/// Fail early when the export root or its global preferences file is absent.
pub fn ensure_export_ready(paths: &ResolvedPaths, status: &ExportStatus) -> Result<()> {
    if !status.export_root_exists {
        bail!(
            "export folder not found: {}",
            normalize_for_display(&paths.export_root)
        );
    }
    if !status.global_preferences_exists {
        bail!(
            "Site export is incomplete.\nMissing required paths:\n  - {} (missing)\nPoint --folder at the root of an unzipped site export.",
            normalize_for_display(&paths.global_preferences_path)
        );
    }
    Ok(())
}

/// Write `content` to `path` unless it exists and `force` is off.
///
/// Returns whether the file was written.
pub fn write_text_file(path: &Path, content: &str, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create parent directory {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

/// Report names end up in file names; allow `[A-Za-z0-9 _-]+` only.
pub fn validate_report_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, ' ' | '_' | '-'));
    if !valid {
        bail!("invalid report name `{name}`: use letters, digits, spaces, `_` or `-`");
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

pub fn normalize_for_display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;

    use tempfile::tempdir;

    use super::{
        CONFIG_ENV, FOLDER_ENV, OUTPUT_DIR_ENV, PathOverrides, ResolutionContext, ValueSource,
        ensure_export_ready, inspect_export, resolve_config_path_with_lookup,
        resolve_export_root_with_lookup, resolve_paths_with_lookup, validate_report_name,
        write_text_file,
    };
    use crate::config::ReportConfig;

    #[test]
    fn export_root_prefers_flag_over_env() {
        let temp = tempdir().expect("tempdir");
        let from_flag = temp.path().join("flag-root");
        let context = ResolutionContext {
            cwd: temp.path().to_path_buf(),
        };
        let overrides = PathOverrides {
            export_root: Some(from_flag.clone()),
            ..PathOverrides::default()
        };
        let env = HashMap::from([(
            FOLDER_ENV.to_string(),
            temp.path().join("env-root").to_string_lossy().to_string(),
        )]);

        let (root, source) =
            resolve_export_root_with_lookup(&context, &overrides, |key| env.get(key).cloned())
                .expect("resolved");
        assert_eq!(root, from_flag);
        assert_eq!(source, ValueSource::Flag);
    }

    #[test]
    fn export_root_falls_back_to_env_then_none() {
        let temp = tempdir().expect("tempdir");
        let context = ResolutionContext {
            cwd: temp.path().to_path_buf(),
        };
        let env = HashMap::from([(FOLDER_ENV.to_string(), " exports/acme ".to_string())]);

        let (root, source) = resolve_export_root_with_lookup(
            &context,
            &PathOverrides::default(),
            |key| env.get(key).cloned(),
        )
        .expect("resolved");
        assert_eq!(root, temp.path().join("exports/acme"));
        assert_eq!(source, ValueSource::Env);

        let blank = HashMap::from([(FOLDER_ENV.to_string(), "  ".to_string())]);
        assert!(
            resolve_export_root_with_lookup(&context, &PathOverrides::default(), |key| blank
                .get(key)
                .cloned())
            .is_none()
        );
    }

    #[test]
    fn output_dir_precedence_is_flag_env_config_default() {
        let temp = tempdir().expect("tempdir");
        let cwd = temp.path().to_path_buf();
        let context = ResolutionContext { cwd: cwd.clone() };
        let root = (cwd.join("export"), ValueSource::Flag);
        let config = ReportConfig {
            output_directory: Some("from-config".to_string()),
            ..ReportConfig::default()
        };
        let env = HashMap::from([(OUTPUT_DIR_ENV.to_string(), "from-env".to_string())]);

        let flagged = PathOverrides {
            output_dir: Some("from-flag".into()),
            ..PathOverrides::default()
        };
        let paths = resolve_paths_with_lookup(&context, &flagged, &config, root.clone(), |key| {
            env.get(key).cloned()
        });
        assert_eq!(paths.output_dir, cwd.join("from-flag"));
        assert_eq!(paths.output_source, ValueSource::Flag);

        let overrides = PathOverrides::default();
        let paths = resolve_paths_with_lookup(&context, &overrides, &config, root.clone(), |key| {
            env.get(key).cloned()
        });
        assert_eq!(paths.output_dir, cwd.join("from-env"));
        assert_eq!(paths.output_source, ValueSource::Env);

        let paths = resolve_paths_with_lookup(&context, &overrides, &config, root.clone(), |_| None);
        assert_eq!(paths.output_dir, cwd.join("from-config"));
        assert_eq!(paths.output_source, ValueSource::Config);

        let paths = resolve_paths_with_lookup(
            &context,
            &overrides,
            &ReportConfig::default(),
            root,
            |_| None,
        );
        assert_eq!(paths.output_dir, cwd.join("output"));
        assert_eq!(paths.output_source, ValueSource::Default);
    }

    #[test]
    fn config_path_defaults_to_working_directory() {
        let temp = tempdir().expect("tempdir");
        let context = ResolutionContext {
            cwd: temp.path().to_path_buf(),
        };
        let (path, source) =
            resolve_config_path_with_lookup(&context, &PathOverrides::default(), |_| None);
        assert_eq!(path, temp.path().join("sitepref.toml"));
        assert_eq!(source, ValueSource::Default);

        let env = HashMap::from([(CONFIG_ENV.to_string(), "conf/report.json".to_string())]);
        let (path, source) =
            resolve_config_path_with_lookup(&context, &PathOverrides::default(), |key| {
                env.get(key).cloned()
            });
        assert_eq!(path, temp.path().join("conf/report.json"));
        assert_eq!(source, ValueSource::Env);
    }

    #[test]
    fn diagnostics_names_every_path_and_source() {
        let temp = tempdir().expect("tempdir");
        let context = ResolutionContext {
            cwd: temp.path().to_path_buf(),
        };
        let paths = resolve_paths_with_lookup(
            &context,
            &PathOverrides::default(),
            &ReportConfig::default(),
            (temp.path().join("export"), ValueSource::Prompt),
            |_| None,
        );
        let text = paths.diagnostics();
        assert!(text.contains("export_root="));
        assert!(text.contains("(prompt)"));
        assert!(text.contains("meta/system-objecttype-extensions.xml"));
        assert!(text.contains("config_path="));
    }

    #[test]
    fn inspect_export_reports_layout() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("export");
        fs::create_dir_all(root.join("sites").join("SiteA")).expect("site dir");
        fs::write(root.join("preferences.xml"), "<preferences/>").expect("global");
        fs::write(
            root.join("sites").join("SiteA").join("preferences.xml"),
            "<preferences/>",
        )
        .expect("site");

        let context = ResolutionContext {
            cwd: temp.path().to_path_buf(),
        };
        let paths = resolve_paths_with_lookup(
            &context,
            &PathOverrides::default(),
            &ReportConfig::default(),
            (root, ValueSource::Flag),
            |_| None,
        );
        let status = inspect_export(&paths).expect("inspect");
        assert!(status.export_root_exists);
        assert!(status.global_preferences_exists);
        assert!(status.sites_dir_exists);
        assert!(!status.metadata_exists);
        assert_eq!(status.site_count, 1);
        assert_eq!(status.warnings.len(), 1);
        ensure_export_ready(&paths, &status).expect("ready");
    }

    #[test]
    fn ensure_export_ready_fails_without_global_preferences() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("export");
        fs::create_dir_all(&root).expect("root");
        let context = ResolutionContext {
            cwd: temp.path().to_path_buf(),
        };
        let paths = resolve_paths_with_lookup(
            &context,
            &PathOverrides::default(),
            &ReportConfig::default(),
            (root, ValueSource::Flag),
            |_| None,
        );
        let status = inspect_export(&paths).expect("inspect");
        let err = ensure_export_ready(&paths, &status).expect_err("must fail");
        assert!(err.to_string().contains("Site export is incomplete"));
        assert!(err.to_string().contains("preferences.xml"));
    }

    #[test]
    fn write_text_file_respects_force() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("sitepref.toml");
        assert!(write_text_file(&path, "a = 1\n", false).expect("write"));
        assert!(!write_text_file(&path, "a = 2\n", false).expect("skip"));
        assert_eq!(fs::read_to_string(&path).expect("read"), "a = 1\n");
        assert!(write_text_file(&path, "a = 2\n", true).expect("overwrite"));
        assert_eq!(fs::read_to_string(&path).expect("read"), "a = 2\n");
    }

    #[test]
    fn report_names_are_restricted() {
        validate_report_name("code-base").expect("valid");
        validate_report_name("Q3 audit_2").expect("valid");
        assert!(validate_report_name("").is_err());
        assert!(validate_report_name("../escape").is_err());
        assert!(validate_report_name("a/b").is_err());
    }
}
