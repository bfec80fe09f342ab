use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ruleengine_common::{RuleDocument, Rules, RulesResp};

use crate::config::{self, EngineConfig};
use crate::output::{self, OutputMode};
use crate::shutdown::wait_for_shutdown;
use crate::sync::Syncer;

pub const LOG_JSON_ENV: &str = "RULEENGINE_LOG_JSON";

#[derive(Parser)]
#[command(name = "ruleengine", version, about = "Prometheus alert rule sync")]
pub struct Opts {
    #[clap(subcommand)]
    pub cmd: Commands,

    #[arg(long, global = true, help = "Output as JSON")]
    pub json: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(long, global = true, help = "Path to engine config file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Rule API base URL (overrides config)")]
    pub server: Option<String>,

    #[arg(long, global = true, help = "Rules directory (overrides config)")]
    pub rules_dir: Option<String>,
}

impl Opts {
    /// `--log-json`, or `RULEENGINE_LOG_JSON` set to `1`/`true`.
    pub fn json_logs(&self) -> bool {
        self.log_json
            || std::env::var(LOG_JSON_ENV)
                .is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    }

    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the rule document for a rules file.
    Render(RenderArgs),
    /// Show how rules split across Prometheus instances.
    Partition(InputArgs),
    /// Pull rules from the API and write per-instance rule files.
    Sync(SyncArgs),
}

#[derive(clap::Args)]
pub struct InputArgs {
    #[arg(long, short, default_value = "-", help = "JSON rules file, or - for stdin")]
    pub input: String,
}

#[derive(clap::Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[arg(long, help = "Only render rules of this prom id")]
    pub prom: Option<i64>,
    #[arg(long, help = "Decode the output again and report the rule count")]
    pub check: bool,
}

#[derive(clap::Args)]
pub struct SyncArgs {
    #[arg(long, help = "Run a single cycle and exit")]
    pub once: bool,
}

pub async fn run(opts: Opts) -> Result<()> {
    let mode = opts.output_mode();
    match opts.cmd {
        Commands::Render(ref args) => render(args),
        Commands::Partition(ref args) => partition(args, mode),
        Commands::Sync(ref args) => {
            let cfg = load_config(&opts)?;
            sync(&cfg, args, mode).await
        }
    }
}

fn load_config(opts: &Opts) -> Result<EngineConfig> {
    let path = opts
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);
    let cfg = config::read_from_file(&path)
        .with_context(|| format!("loading config from {}", path.display()))?;
    Ok(config::apply_overrides(
        cfg,
        opts.server.as_deref(),
        opts.rules_dir.as_deref(),
    )?)
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading rules from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading rules from {input}"))
    }
}

/// Accepts either a bare JSON array of rules or a `{code, msg, data}`
/// listing envelope.
pub fn parse_rules(text: &str) -> Result<Rules> {
    let value: serde_json::Value = serde_json::from_str(text).context("rules input is not JSON")?;
    if value.is_array() {
        return Ok(serde_json::from_value(value)?);
    }
    if value.is_object() {
        let resp: RulesResp = serde_json::from_value(value)?;
        return Ok(resp.into_data()?);
    }
    bail!("rules input must be an array or a response envelope")
}

fn render(args: &RenderArgs) -> Result<()> {
    let mut rules = parse_rules(&read_input(&args.input.input)?)?;
    if let Some(prom) = args.prom {
        rules.retain_proms(&[prom]);
    }

    let content = rules.content()?;
    if args.check {
        let doc = RuleDocument::from_yaml(&content).context("rendered document does not decode")?;
        if doc.rule_count() != rules.len() {
            bail!(
                "rendered {} rules but input has {}",
                doc.rule_count(),
                rules.len()
            );
        }
        output::print_success(&format!("{} rules render cleanly", doc.rule_count()));
        return Ok(());
    }

    print!("{}", String::from_utf8_lossy(&content));
    Ok(())
}

#[derive(serde::Serialize)]
struct PartitionSummary {
    prom_id: i64,
    rules: usize,
    rule_ids: Vec<i64>,
}

fn partition(args: &InputArgs, mode: OutputMode) -> Result<()> {
    let rules = parse_rules(&read_input(&args.input)?)?;
    let summary: Vec<PartitionSummary> = rules
        .prom_rules()
        .into_iter()
        .map(|p| PartitionSummary {
            prom_id: p.prom.id,
            rules: p.rules.len(),
            rule_ids: p.rules.iter().map(|r| r.id).collect(),
        })
        .collect();

    match mode {
        OutputMode::Json => output::print_json(&summary)?,
        OutputMode::Human => {
            if summary.is_empty() {
                output::print_success("No rules to partition");
                return Ok(());
            }
            let mut table = output::build_table(&["Prom", "Rules", "Rule IDs"]);
            for s in &summary {
                table.add_row(vec![
                    s.prom_id.to_string(),
                    s.rules.to_string(),
                    output::join_ids(&s.rule_ids),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

async fn sync(cfg: &EngineConfig, args: &SyncArgs, mode: OutputMode) -> Result<()> {
    let syncer = Syncer::from_config(cfg)?;

    if !args.once {
        syncer.run(wait_for_shutdown()).await;
        return Ok(());
    }

    let report = syncer.run_once().await?;
    match mode {
        OutputMode::Json => output::print_json(&report)?,
        OutputMode::Human => {
            let mut table = output::build_table(&["Outcome", "Prom IDs"]);
            table.add_row(vec!["written".to_string(), output::join_ids(&report.written)]);
            table.add_row(vec!["unchanged".to_string(), output::join_ids(&report.unchanged)]);
            table.add_row(vec!["skipped".to_string(), output::join_ids(&report.skipped)]);
            table.add_row(vec!["removed".to_string(), output::join_ids(&report.removed)]);
            table.add_row(vec!["reloaded".to_string(), output::join_ids(&report.reloaded)]);
            println!("{table}");
            if !report.reload_failed.is_empty() {
                output::print_warning(&format!(
                    "reload failed for: {}",
                    output::join_ids(&report.reload_failed)
                ));
            }
        }
    }
    Ok(())
}
