use anyhow::Result;

use super::classify::cmd_classify;
use super::commands::Commands;
use super::context::CliContext;
use super::env::CliArgs;
use super::parse_intent::cmd_parse_intent;
use super::policy::cmd_policy;

pub fn dispatch(cli: &CliArgs, context: &CliContext) -> Result<()> {
    let output = cli.output.clone();
    match &cli.command {
        Commands::Classify(args) => cmd_classify(args.clone(), context, output),
        Commands::ParseIntent(args) => cmd_parse_intent(args.clone(), context, output),
        Commands::Policy(args) => cmd_policy(args.clone(), context, output),
    }
}
