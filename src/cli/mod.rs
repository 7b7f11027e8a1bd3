pub mod app;
pub mod classify;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod parse_intent;
pub mod policy;
pub mod runtime;

pub use classify::{cmd_classify, ClassifyArgs, StepReport};
pub use parse_intent::{cmd_parse_intent, ParseIntentArgs};
pub use policy::{cmd_policy, PolicyArgs};
