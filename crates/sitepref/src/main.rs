use std::env;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use sitepref_core::analysis::{analyze_export, discover_sites};
use sitepref_core::config::{ReportConfig, load_config, render_default_config};
use sitepref_core::error::AnalysisError;
use sitepref_core::export::write_reports;
use sitepref_core::logging::init_logging;
use sitepref_core::metadata::{MetadataMap, analyze_meta};
use sitepref_core::runtime::{
    DEFAULT_EXPORT_FOLDER, DEFAULT_REPORT_NAME, NAME_ENV, PathOverrides, ResolutionContext,
    ResolvedPaths, ValueSource, ensure_export_ready, inspect_export, normalize_for_display,
    resolve_config_path, resolve_export_root, resolve_paths, validate_report_name,
    write_text_file,
};
use tracing::warn;

#[derive(Debug, Parser)]
#[command(
    name = "sitepref",
    version,
    about = "Site preference reports (CSV, XLS, JSON) from an unzipped SFCC site export"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved path diagnostics")]
    diagnostics: bool,
    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "More log output (-v debug, -vv trace)")]
    verbose: u8,
    #[arg(short, long, global = true, help = "Only log errors")]
    quiet: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    config: Option<PathBuf>,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            config: cli.config.clone(),
            diagnostics: cli.diagnostics,
        }
    }

    fn overrides(&self, export_root: Option<PathBuf>, output_dir: Option<PathBuf>) -> PathOverrides {
        PathOverrides {
            export_root,
            output_dir,
            config: self.config.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Analyze an export and write the CSV, XLS and JSON reports")]
    Report(ReportArgs),
    #[command(about = "List sites found in an export")]
    Sites(FolderArgs),
    #[command(about = "Print the custom preference metadata of an export as JSON")]
    Meta(FolderArgs),
    #[command(name = "init-config", about = "Write the default report configuration")]
    InitConfig(InitConfigArgs),
}

#[derive(Debug, Args)]
struct ReportArgs {
    #[arg(long, value_name = "PATH", help = "Root of the unzipped site export")]
    folder: Option<PathBuf>,
    #[arg(long, help = "Report name used in output file names")]
    name: Option<String>,
    #[arg(long, value_name = "PATH")]
    output_dir: Option<PathBuf>,
    #[arg(
        long,
        help = "Continue with empty group/name when preference metadata is missing"
    )]
    allow_missing_meta: bool,
}

#[derive(Debug, Args)]
struct FolderArgs {
    #[arg(long, value_name = "PATH", help = "Root of the unzipped site export")]
    folder: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct InitConfigArgs {
    #[arg(long, help = "Overwrite an existing config file")]
    force: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet)?;
    let runtime = RuntimeOptions::from_cli(&cli);

    match cli.command {
        Some(Commands::Report(args)) => run_report(&runtime, args),
        Some(Commands::Sites(args)) => run_sites(&runtime, args),
        Some(Commands::Meta(args)) => run_meta(&runtime, args),
        Some(Commands::InitConfig(args)) => run_init_config(&runtime, args),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn run_report(runtime: &RuntimeOptions, args: ReportArgs) -> Result<()> {
    let (paths, config) = resolve_runtime_paths(runtime, args.folder, args.output_dir)?;
    let name = resolve_report_name(args.name)?;
    let status = inspect_export(&paths)?;
    ensure_export_ready(&paths, &status)?;

    let metadata = load_metadata(&paths, args.allow_missing_meta)?;
    let report = analyze_export(&paths.export_root, metadata.as_ref(), &config)?;
    let summary = write_reports(&paths.output_dir, &name, &report, &config);

    println!("preference report");
    println!("export_root: {}", normalize_for_display(&paths.export_root));
    println!("name: {name}");
    println!("sites: {}", report.sites.len());
    println!("preferences: {}", report.preference_count());
    println!(
        "metadata: {}",
        if metadata.is_some() { "loaded" } else { "skipped" }
    );
    for path in &summary.written {
        println!("wrote: {}", normalize_for_display(path));
    }
    for failure in &summary.failures {
        println!(
            "failed: {} ({})",
            normalize_for_display(&failure.path),
            failure.message
        );
    }
    print_warnings(&status.warnings);
    if runtime.diagnostics {
        println!("\n[diagnostics]\n{}", paths.diagnostics());
    }

    if !summary.is_complete() {
        bail!(
            "{} of {} report files could not be written",
            summary.failures.len(),
            summary.failures.len() + summary.written.len()
        );
    }
    Ok(())
}

fn run_sites(runtime: &RuntimeOptions, args: FolderArgs) -> Result<()> {
    let (paths, _) = resolve_runtime_paths(runtime, args.folder, None)?;
    let sites = discover_sites(&paths.export_root)?;

    println!("export_root: {}", normalize_for_display(&paths.export_root));
    println!("sites.count: {}", sites.len());
    if sites.is_empty() {
        println!("sites: <none>");
    }
    for site in &sites {
        println!("site: {site}");
    }
    if runtime.diagnostics {
        println!("\n[diagnostics]\n{}", paths.diagnostics());
    }
    Ok(())
}

fn run_meta(runtime: &RuntimeOptions, args: FolderArgs) -> Result<()> {
    let (paths, _) = resolve_runtime_paths(runtime, args.folder, None)?;
    let metadata = analyze_meta(&paths.export_root)?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    if runtime.diagnostics {
        eprintln!("[diagnostics]\n{}", paths.diagnostics());
    }
    Ok(())
}

fn run_init_config(runtime: &RuntimeOptions, args: InitConfigArgs) -> Result<()> {
    let context = ResolutionContext::from_process()?;
    let (config_path, source) = resolve_config_path(&context, &runtime.overrides(None, None));
    let wrote = write_text_file(&config_path, &render_default_config()?, args.force)?;

    println!(
        "config_path: {} ({})",
        normalize_for_display(&config_path),
        source.as_str()
    );
    println!("wrote_config: {wrote}");
    if !wrote {
        println!("config exists; pass --force to overwrite");
    }
    Ok(())
}

/// Metadata is required unless `allow_missing` is set, in which case a
/// missing file or a missing `SitePreferences` extension is only a warning.
fn load_metadata(paths: &ResolvedPaths, allow_missing: bool) -> Result<Option<MetadataMap>> {
    if allow_missing && !paths.metadata_path.is_file() {
        warn!(
            "{} not found; continuing without preference metadata",
            normalize_for_display(&paths.metadata_path)
        );
        return Ok(None);
    }
    match analyze_meta(&paths.export_root) {
        Ok(metadata) => Ok(Some(metadata)),
        Err(err)
            if allow_missing
                && matches!(
                    err.downcast_ref::<AnalysisError>(),
                    Some(AnalysisError::MissingSitePreferences { .. })
                ) =>
        {
            warn!("{err}; continuing without preference metadata");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn resolve_runtime_paths(
    runtime: &RuntimeOptions,
    folder: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> Result<(ResolvedPaths, ReportConfig)> {
    let context = ResolutionContext::from_process()?;
    let overrides = runtime.overrides(folder, output_dir);
    let (config_path, _) = resolve_config_path(&context, &overrides);
    let config = load_config(&config_path)?;

    let export_root = match resolve_export_root(&context, &overrides) {
        Some(resolved) => resolved,
        None if io::stdin().is_terminal() => {
            let answer = prompt("Site export folder", &format!("./{DEFAULT_EXPORT_FOLDER}"))?;
            (PathBuf::from(answer), ValueSource::Prompt)
        }
        None => bail!("no export folder given: pass --folder or set SITEPREF_FOLDER"),
    };

    Ok((resolve_paths(&context, &overrides, &config, export_root), config))
}

/// `--name` > `SITEPREF_NAME` > prompt; without a terminal the default name is used.
fn resolve_report_name(flag: Option<String>) -> Result<String> {
    let from_env = env::var(NAME_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    let name = match flag.or(from_env) {
        Some(name) => name,
        None if io::stdin().is_terminal() => prompt("Report name", DEFAULT_REPORT_NAME)?,
        None => DEFAULT_REPORT_NAME.to_string(),
    };
    validate_report_name(&name)?;
    Ok(name)
}

fn prompt(label: &str, default: &str) -> Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{label} [{default}]: ")?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    let answer = line.trim();
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    })
}

fn print_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    println!("warnings:");
    for warning in warnings {
        println!("  - {warning}");
    }
}
