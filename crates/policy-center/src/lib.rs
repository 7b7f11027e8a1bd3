pub mod api;
pub mod defaults;
pub mod errors;
pub mod loader;
pub mod model;
pub mod override_store;

pub use api::{InMemoryPolicyCenter, PolicyCenter, PolicyGuard};
pub use defaults::default_snapshot;
pub use errors::PolicyError;
pub use loader::{load_snapshot, load_snapshot_with_options, LoadOptions};
pub use model::{
    FeatureFlags, IntentPolicy, NavigationPolicy, PolicySnapshot, PolicySource, PolicyView,
    RuntimeOverrideSpec,
};

#[cfg(test)]
mod tests;
