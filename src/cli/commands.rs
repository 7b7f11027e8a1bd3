use clap::Subcommand;

use super::classify::ClassifyArgs;
use super::parse_intent::ParseIntentArgs;
use super::policy::PolicyArgs;

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a navigation, or a redirect chain given as several URLs
    Classify(ClassifyArgs),

    /// Parse an intent URI and print its structured form
    ParseIntent(ParseIntentArgs),

    /// Inspect or override the interception policy
    Policy(PolicyArgs),
}
