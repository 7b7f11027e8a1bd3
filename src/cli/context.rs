use std::sync::Arc;

use navgate_external_nav::{ClassifierConfig, ExternalNavigationClassifier};
use navgate_handler_registry::{HandlerManifest, HandlerRegistry};
use navgate_policy_center::{InMemoryPolicyCenter, PolicyCenter, PolicySnapshot};

pub struct CliContext {
    policy: Arc<InMemoryPolicyCenter>,
    manifest: HandlerManifest,
}

impl CliContext {
    pub fn new(snapshot: PolicySnapshot, manifest: HandlerManifest) -> Self {
        Self {
            policy: Arc::new(InMemoryPolicyCenter::new(snapshot)),
            manifest,
        }
    }

    pub fn policy_center(&self) -> &InMemoryPolicyCenter {
        self.policy.as_ref()
    }

    pub fn manifest(&self) -> &HandlerManifest {
        &self.manifest
    }

    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig::from_policy(&self.policy.snapshot())
    }

    /// A classifier over the current policy revision and the loaded manifest.
    pub fn classifier(&self) -> ExternalNavigationClassifier<HandlerRegistry> {
        ExternalNavigationClassifier::new(
            self.classifier_config(),
            HandlerRegistry::new(self.manifest.clone()),
        )
    }
}
