use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use auditflow_client::{ClientConfig, HttpAuditClient, HttpEngagementTracker};
use auditflow_core::audit::{ColumnMapping, SelectedFile, SheetSelection};
use auditflow_core::ids::EngagementId;
use auditflow_core::provider::BenchmarkEndpoint;
use auditflow_core::session::{AuditStatus, DisplayMode};
use auditflow_engine::{AuditOrchestrator, InMemoryMappingOverrides, SessionDefaults};
use auditflow_settings::ClientSettings;
use auditflow_telemetry::{init_telemetry, TelemetryConfig};

#[derive(Parser)]
#[command(name = "auditflow", version, about = "Trial balance audit client")]
struct Cli {
    /// Settings file (defaults to ~/.auditflow/settings.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Audit a trial balance file.
    Audit(AuditArgs),
    /// List industries available for benchmark comparison.
    Industries,
}

#[derive(Args)]
struct AuditArgs {
    /// Trial balance file (.csv, .tsv, .txt, .xlsx, .xlsm, .xls).
    file: PathBuf,

    /// Materiality threshold, overriding practice defaults.
    #[arg(long)]
    threshold: Option<f64>,

    /// Display mode: strict or lenient.
    #[arg(long)]
    mode: Option<DisplayMode>,

    /// Sheet to audit when the workbook has several.
    #[arg(long)]
    sheet: Option<String>,

    /// Cell range within the selected sheet, e.g. A1:F200.
    #[arg(long, requires = "sheet")]
    range: Option<String>,

    /// JSON file with an explicit column mapping.
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// JSON file of manual account overrides (`{"account": "category"}`).
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Compare ratios against this industry after a successful audit.
    #[arg(long)]
    industry: Option<String>,

    /// Link the result to an engagement.
    #[arg(long)]
    engagement_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => auditflow_settings::load_settings_from_path(path),
        None => auditflow_settings::load_settings(),
    }
    .context("failed to load settings")?;

    init_telemetry(&TelemetryConfig::from_level_name(
        &settings.logging.level,
        settings.logging.json,
    ));

    let client = HttpAuditClient::new(ClientConfig::from_settings(&settings.api))
        .context("failed to build HTTP client")?;

    match cli.command {
        Command::Audit(args) => run_audit(&settings, client, args).await,
        Command::Industries => {
            for industry in client
                .list_industries()
                .await
                .context("failed to list industries")?
            {
                println!("{industry}");
            }
            Ok(())
        }
    }
}

async fn run_audit(settings: &ClientSettings, client: HttpAuditClient, mut args: AuditArgs) -> Result<()> {
    let defaults = SessionDefaults::new(
        settings.audit.default_materiality_threshold,
        settings
            .audit
            .default_display_mode
            .parse()
            .unwrap_or_default(),
    );

    let overrides = match &args.overrides {
        Some(path) => {
            let json: serde_json::Value = read_json(path).await?;
            let map = json
                .as_object()
                .with_context(|| format!("{} must contain a JSON object", path.display()))?;
            InMemoryMappingOverrides::from_json(map)
        }
        None => InMemoryMappingOverrides::new(),
    };

    let mut builder = AuditOrchestrator::builder(Arc::new(client.clone()))
        .benchmark(Arc::new(client.clone()))
        .overrides(Arc::new(overrides))
        .defaults(defaults);
    if let Some(id) = args.engagement_id.take() {
        let tracker = HttpEngagementTracker::new(client.clone(), EngagementId::from_raw(id), |id| {
            eprintln!("Audit results linked to engagement {id}");
        });
        builder = builder.engagement(Arc::new(tracker));
    }
    let orch = builder.build();

    let _ = orch.load_practice_settings(&client).await;
    if let Some(threshold) = args.threshold {
        orch.set_materiality_threshold(threshold)?;
    }
    if let Some(mode) = args.mode {
        orch.set_display_mode(mode);
    }

    let name = args
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("invalid file name: {}", args.file.display()))?
        .to_string();
    let data = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    info!(file = %name, bytes = data.len(), "submitting trial balance");

    let mut mapping = match &args.mapping {
        Some(path) => Some(read_json::<ColumnMapping>(path).await?),
        None => None,
    };

    let mut status = orch
        .submit_file(SelectedFile::new(name.clone(), Bytes::from(data)))
        .await?;
    loop {
        status = match status {
            AuditStatus::AwaitingWorkbookSelection => {
                let Some(sheet_name) = args.sheet.take() else {
                    print_view(&orch)?;
                    bail!("the workbook has several sheets; choose one with --sheet");
                };
                orch.confirm_workbook_selection(SheetSelection {
                    sheet_name,
                    range: args.range.take(),
                })
                .await?
            }
            AuditStatus::AwaitingColumnMapping => {
                let Some(mapping) = mapping.take() else {
                    print_view(&orch)?;
                    bail!("column detection confidence is low; supply a mapping with --mapping");
                };
                orch.confirm_column_mapping(mapping).await?
            }
            _ => break,
        };
    }
    if let Some(message) = unused_sheet_flags(args.sheet.as_deref(), args.range.as_deref()) {
        warn!(file = %name, "{message}");
    }

    if status == AuditStatus::Success {
        if let Some(industry) = &args.industry {
            let _ = orch.change_industry(industry).await;
        }
    }
    orch.settle().await;
    print_view(&orch)?;

    match orch.error_message() {
        Some(message) if status == AuditStatus::Error => bail!(message),
        _ => Ok(()),
    }
}

fn print_view(orch: &AuditOrchestrator) -> Result<()> {
    let view = orch.view();
    let mut json = serde_json::to_value(&view)?;
    json["visible_balances"] = serde_json::to_value(view.visible_balances())?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Describe `--sheet`/`--range` flags that no workbook selection consumed.
fn unused_sheet_flags(sheet: Option<&str>, range: Option<&str>) -> Option<String> {
    let sheet = sheet?;
    let flags = match range {
        Some(range) => format!("--sheet {sheet} --range {range}"),
        None => format!("--sheet {sheet}"),
    };
    Some(format!("{flags} ignored: the file did not need a sheet selection"))
}
