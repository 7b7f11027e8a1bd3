use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use navgate_policy_center::{PolicyCenter, PolicySnapshot, PolicySource, RuntimeOverrideSpec};
use serde_json::Value;

use super::context::CliContext;
use super::output::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct PolicyArgs {
    #[command(subcommand)]
    pub command: PolicyCommand,
}

#[derive(Subcommand, Clone, Debug)]
pub enum PolicyCommand {
    /// Print the effective policy
    Show(PolicyShowArgs),
    /// Preview a runtime override; it lasts for this invocation only
    /// (use `classify --set PATH=VALUE` to classify under one)
    Override(PolicyOverrideArgs),
}

#[derive(Args, Clone, Debug)]
pub struct PolicyShowArgs {
    /// Output JSON instead of human summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone, Debug)]
pub struct PolicyOverrideArgs {
    /// Dot-path to override, e.g. navigation.chain_timeout_ms
    pub path: String,
    /// Override value as JSON literal (e.g. 4, true, "value")
    pub value: String,
    /// Override owner label
    #[arg(long, default_value = "cli")]
    pub owner: String,
    /// Reason for override
    #[arg(long, default_value = "manual override")]
    pub reason: String,
    /// Lifetime of the override, e.g. 30s or 5m (permanent when omitted)
    #[arg(long, value_parser = parse_ttl)]
    pub ttl: Option<Duration>,
}

pub fn cmd_policy(args: PolicyArgs, context: &CliContext, output: OutputFormat) -> Result<()> {
    match args.command {
        PolicyCommand::Show(show_args) => {
            let snapshot = context.policy_center().snapshot();
            let format = if show_args.json {
                OutputFormat::Json
            } else {
                output
            };
            match format.render(&*snapshot)? {
                Some(rendered) => println!("{rendered}"),
                None => print_summary(&snapshot),
            }
        }
        PolicyCommand::Override(override_args) => {
            let spec = override_spec(override_args);
            let path = spec.path.clone();
            context
                .policy_center()
                .apply_override(spec)
                .with_context(|| format!("Failed to override {path}"))?;
            let snapshot = context.policy_center().snapshot();
            println!("Override applied. Current revision: {}", snapshot.rev);
            if let Some(rendered) = output.render(&*snapshot)? {
                println!("{rendered}");
            }
        }
    }
    Ok(())
}

fn override_spec(args: PolicyOverrideArgs) -> RuntimeOverrideSpec {
    RuntimeOverrideSpec {
        path: args.path,
        value: parse_value(&args.value),
        owner: args.owner,
        reason: args.reason,
        ttl_seconds: args.ttl.map(|ttl| ttl.as_secs().max(1)).unwrap_or(0),
    }
}

/// Applies `PATH=VALUE` assignments given on the command line.
pub(crate) fn apply_assignments(
    context: &CliContext,
    assignments: &[(String, Value)],
) -> Result<()> {
    for (path, value) in assignments {
        context
            .policy_center()
            .apply_override(RuntimeOverrideSpec {
                path: path.clone(),
                value: value.clone(),
                owner: "cli".into(),
                reason: "command line assignment".into(),
                ttl_seconds: 0,
            })
            .with_context(|| format!("Failed to override {path}"))?;
    }
    Ok(())
}

pub(crate) fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (path, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PATH=VALUE, got `{raw}`"))?;
    let path = path.trim();
    if path.is_empty() {
        return Err(format!("missing path in `{raw}`"));
    }
    Ok((path.to_string(), parse_value(value.trim())))
}

/// JSON literal when it parses as one, otherwise the raw string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_ttl(raw: &str) -> Result<Duration, String> {
    if let Ok(seconds) = raw.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }
    humantime::parse_duration(raw).map_err(|err| format!("invalid ttl `{raw}`: {err}"))
}

fn print_summary(snapshot: &PolicySnapshot) {
    println!("Policy Revision: {}", snapshot.rev);
    println!();
    println!(
        "Navigation → chain_timeout={}, pairing_code_hosts=[{}], pairing_code_param={}",
        humantime::format_duration(snapshot.navigation.chain_timeout()),
        snapshot.navigation.pairing_code_hosts.join(", "),
        snapshot.navigation.pairing_code_param
    );
    println!(
        "Intents → self_package={}, self_scheme={}, web_app_shell_prefix={}",
        snapshot.intents.self_package,
        snapshot.intents.self_scheme,
        snapshot.intents.web_app_shell_prefix
    );
    println!(
        "Store → scheme={}, web_host={}, sms_schemes=[{}]",
        snapshot.intents.store_scheme,
        snapshot.intents.store_web_host,
        snapshot.intents.sms_schemes.join(", ")
    );
    println!(
        "Features → block_frame_renavigations={}, block_intents_to_self={}, keep_incognito_web_links_in_browser={}, keep_pdf_downloads_in_browser={}",
        snapshot.features.block_frame_renavigations,
        snapshot.features.block_intents_to_self,
        snapshot.features.keep_incognito_web_links_in_browser,
        snapshot.features.keep_pdf_downloads_in_browser
    );

    let mut overridden: Vec<_> = snapshot
        .provenance
        .values()
        .filter(|entry| entry.source != PolicySource::Builtin)
        .collect();
    if !overridden.is_empty() {
        overridden.sort_by(|a, b| a.path.cmp(&b.path));
        println!();
        println!("Overridden:");
        for entry in overridden {
            println!("  {} ← {:?}", entry.path, entry.source);
        }
    }
}
