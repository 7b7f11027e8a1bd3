use anyhow::{bail, Context, Result};
use clap::Args;
use navgate_external_nav::uri::{classify_uri, is_intent_uri};
use navgate_external_nav::{parse_intent_uri, ActivationDescriptor, UriClass};
use serde::Serialize;

use super::context::CliContext;
use super::output::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct ParseIntentArgs {
    /// Intent URI, e.g. "intent://scan/#Intent;scheme=zxing;package=com.example;end"
    pub uri: String,

    /// Output JSON instead of human summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct ParsedIntentReport {
    pub class: UriClass,
    pub activation: ActivationDescriptor,
    /// What would actually be sent to another application.
    pub sanitized: ActivationDescriptor,
    pub intent_uri: String,
}

pub fn cmd_parse_intent(
    args: ParseIntentArgs,
    context: &CliContext,
    output: OutputFormat,
) -> Result<()> {
    let report = parse_report(&args.uri, context)?;
    let format = if args.json { OutputFormat::Json } else { output };
    match format.render(&report)? {
        Some(rendered) => println!("{rendered}"),
        None => print_human(&report),
    }
    Ok(())
}

pub fn parse_report(raw: &str, context: &CliContext) -> Result<ParsedIntentReport> {
    let class = classify_uri(raw, &context.classifier_config());
    if !is_intent_uri(raw) {
        bail!("Not an intent URI (class: {class})");
    }
    let activation = parse_intent_uri(raw).context("Malformed intent URI")?;
    let mut sanitized = activation.clone();
    sanitized.sanitize_for_launch();
    let intent_uri = sanitized.to_intent_uri();
    Ok(ParsedIntentReport {
        class,
        activation,
        sanitized,
        intent_uri,
    })
}

fn print_human(report: &ParsedIntentReport) {
    let activation = &report.activation;
    println!("Class:      {}", report.class);
    print_field("Action", activation.action.as_deref());
    print_field("Data", activation.data.as_deref());
    print_field("Scheme", activation.scheme.as_deref());
    print_field("Package", activation.package.as_deref());
    if let Some(component) = &activation.component {
        println!("Component:  {}", component.flatten());
    }
    if !activation.categories.is_empty() {
        let categories: Vec<&str> = activation.categories.iter().map(String::as_str).collect();
        println!("Categories: {}", categories.join(", "));
    }
    println!("Flags:      {:#010x}", activation.flags.bits());
    for (key, value) in &activation.extras {
        println!("Extra:      {key} = {value}");
    }
    if let Some(selector) = &activation.selector {
        println!(
            "Selector:   {} (dropped on launch)",
            selector.to_intent_uri()
        );
    }
    println!();
    println!("Sanitized flags: {:#010x}", report.sanitized.flags.bits());
    println!("Launch URI:      {}", report.intent_uri);
}

fn print_field(label: &str, value: Option<&str>) {
    if let Some(value) = value {
        println!("{:<11} {value}", format!("{label}:"));
    }
}
