use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use navgate_external_nav::uri::classify_uri;
use navgate_external_nav::{
    parse_intent_uri, AsyncActionKind, AsyncActionTaken, ClassificationResult, NavigationRequest,
    NavigationStep, PageTransition, RedirectChainTracker, ResultKind, UriClass,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::context::CliContext;
use super::output::OutputFormat;
use super::policy::{apply_assignments, parse_assignment};

#[derive(Args, Clone, Debug)]
pub struct ClassifyArgs {
    /// URL to classify; further URLs are replayed as redirects of the same chain
    #[arg(required = true, num_args = 1..)]
    pub urls: Vec<String>,

    /// Referrer of the initial navigation
    #[arg(long)]
    pub referrer: Option<String>,

    /// Page transition flags, comma separated (e.g. link,client_redirect)
    #[arg(long, default_value = "link")]
    pub transition: String,

    /// Treat the first URL as a redirect as well
    #[arg(long)]
    pub redirect: bool,

    /// The navigation was started by a user gesture
    #[arg(long)]
    pub gesture: bool,

    /// Navigate from an incognito tab
    #[arg(long)]
    pub incognito: bool,

    /// Navigate from a background tab that may still launch applications
    #[arg(long)]
    pub background: bool,

    /// Intent URI of the activation that opened the tab
    #[arg(long, value_name = "URI")]
    pub from_activation: Option<String>,

    /// Package of the web-app shell hosting the navigation
    #[arg(long, value_name = "PACKAGE")]
    pub native_client_package: Option<String>,

    /// Ask the launched application to open a new tab
    #[arg(long)]
    pub new_tab: bool,

    /// Policy override for this run, e.g. navigation.chain_timeout_ms=5000 (repeatable)
    #[arg(long = "set", value_name = "PATH=VALUE", value_parser = parse_assignment)]
    pub overrides: Vec<(String, Value)>,

    /// Resolve confirmation prompts with this answer
    #[arg(long, value_enum)]
    pub decision: Option<Decision>,

    /// Output JSON instead of human summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Decision {
    Accept,
    Decline,
}

/// Outcome of one classified step.
#[derive(Clone, Debug, Serialize)]
pub struct StepReport {
    pub url: String,
    pub class: UriClass,
    pub kind: ResultKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_uri: Option<String>,
    pub requires_chooser: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub async_kind: Option<AsyncActionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<AsyncActionTaken>,
}

pub fn cmd_classify(args: ClassifyArgs, context: &CliContext, output: OutputFormat) -> Result<()> {
    let reports = classify_chain(&args, context)?;
    let format = if args.json { OutputFormat::Json } else { output };
    match format.render(&reports)? {
        Some(rendered) => println!("{rendered}"),
        None => print_human(&reports),
    }
    Ok(())
}

/// Replays `args.urls` as one navigation chain and classifies every step.
pub fn classify_chain(args: &ClassifyArgs, context: &CliContext) -> Result<Vec<StepReport>> {
    apply_assignments(context, &args.overrides)?;
    let classifier = context.classifier();
    let config = classifier.config().clone();
    let mut transition =
        PageTransition::parse_list(&args.transition).context("Invalid --transition")?;
    let mut tracker = RedirectChainTracker::new(config.chain_timeout);

    if let Some(raw) = &args.from_activation {
        let activation = parse_intent_uri(raw).context("Invalid --from-activation")?;
        tracker.update_activation(activation, false, false, false);
        transition |= PageTransition::FROM_API;
    }

    let mut reports = Vec::with_capacity(args.urls.len());
    for (index, url) in args.urls.iter().enumerate() {
        let initial = index == 0;
        let mut request = NavigationRequest::new(url.as_str())
            .with_transition(transition)
            .redirect(!initial || args.redirect)
            .user_gesture(initial && args.gesture)
            .incognito(args.incognito)
            .open_in_new_tab(args.new_tab);
        if args.background {
            request = request.background_tab(true);
        }
        if let Some(referrer) = &args.referrer {
            request = request.with_referrer(referrer.as_str());
        }
        if let Some(package) = &args.native_client_package {
            request = request.with_native_client_package(package.as_str());
        }

        tracker.update_new_url_loading(NavigationStep::from_request(&request));
        let result = classifier.classify(&request, &mut tracker);
        debug!(url = %url, kind = %result.kind(), "step classified");
        reports.push(step_report(
            url,
            classify_uri(url, &config),
            result,
            args.decision,
        ));
    }
    Ok(reports)
}

fn step_report(
    url: &str,
    class: UriClass,
    result: ClassificationResult,
    decision: Option<Decision>,
) -> StepReport {
    let kind = result.kind();
    let activation = result.activation();
    let mut report = StepReport {
        url: url.to_string(),
        class,
        kind,
        package: activation.and_then(|activation| activation.package.clone()),
        launch_uri: activation.map(|activation| activation.to_intent_uri()),
        requires_chooser: result.requires_chooser(),
        fallback_url: result.fallback_url().map(str::to_string),
        async_kind: result.async_kind(),
        decision: None,
    };
    if let (Some(decision), Some(action)) = (decision, result.into_async_action()) {
        report.decision = Some(action.resolve(decision == Decision::Accept));
    }
    report
}

fn print_human(reports: &[StepReport]) {
    for (index, report) in reports.iter().enumerate() {
        println!("[{}] {} ({})", index + 1, report.url, report.class);
        println!("    → {}", report.kind);
        if let Some(package) = &report.package {
            println!("    package: {package}");
        }
        if let Some(launch_uri) = &report.launch_uri {
            println!("    launch: {launch_uri}");
        }
        if report.requires_chooser {
            println!("    chooser: yes");
        }
        if let Some(fallback_url) = &report.fallback_url {
            println!("    fallback: {fallback_url}");
        }
        if let Some(async_kind) = report.async_kind {
            println!("    prompt: {async_kind:?}");
        }
        match &report.decision {
            Some(AsyncActionTaken::NoAction) => println!("    decision: no action"),
            Some(AsyncActionTaken::Navigate { target_url, .. }) => {
                println!("    decision: navigate to {target_url}")
            }
            Some(AsyncActionTaken::Launch(activation)) => {
                println!("    decision: launch {}", activation.to_intent_uri())
            }
            None => {}
        }
    }
}
