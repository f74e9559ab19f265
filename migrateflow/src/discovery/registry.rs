//! Pipeline registry for providers and factories.

use crate::errors::{DiscoveryError, RegistryError};
use crate::pipeline::Pipeline;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

/// Factory function type for creating pipelines.
pub type PipelineFactory = Box<dyn Fn() -> anyhow::Result<Arc<dyn Pipeline>> + Send + Sync>;

/// A named pipeline factory.
pub struct PipelineRegistration {
    name: String,
    factory: PipelineFactory,
}

impl PipelineRegistration {
    /// Creates a registration from a fallible factory.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<dyn Pipeline>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(factory),
        }
    }

    /// Creates a registration that builds the pipeline with `Default`.
    pub fn of<P>(name: impl Into<String>) -> Self
    where
        P: Pipeline + Default + 'static,
    {
        Self::new(name, || Ok(Arc::new(P::default()) as Arc<dyn Pipeline>))
    }

    /// Returns the registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for PipelineRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRegistration")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An extension module exposing pipelines.
pub trait PipelineProvider: Send + Sync {
    /// Returns the provider's name, used in diagnostics.
    fn name(&self) -> &str;

    /// Returns the provider's pipelines, in declaration order.
    fn pipelines(&self) -> Vec<PipelineRegistration>;
}

struct Entry {
    provider: String,
    registration: PipelineRegistration,
}

/// The outcome of one discovery pass.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Successfully instantiated pipelines, in registration order.
    pub pipelines: Vec<Arc<dyn Pipeline>>,
    /// Factories that failed to instantiate.
    pub errors: Vec<DiscoveryError>,
}

impl DiscoveryReport {
    /// Returns the names of the discovered pipelines.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.pipelines.iter().map(|p| p.name().to_string()).collect()
    }

    /// Returns true if every factory succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Registry for pipeline factories.
///
/// Order is provider registration order, then declaration order within a
/// provider, so discovery is deterministic for a fixed set of providers.
#[derive(Default)]
pub struct PipelineRegistry {
    entries: RwLock<Vec<Entry>>,
}

impl PipelineRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every pipeline of a provider.
    ///
    /// Fails without registering anything if any name is already taken.
    pub fn register_provider(&self, provider: &dyn PipelineProvider) -> Result<(), RegistryError> {
        let registrations = provider.pipelines();
        let mut entries = self.entries.write();

        let mut pending: Vec<&str> = Vec::with_capacity(registrations.len());
        for registration in &registrations {
            let name = registration.name();
            if let Some(existing) = entries.iter().find(|e| e.registration.name == name) {
                return Err(RegistryError::Duplicate {
                    name: name.to_string(),
                    provider: provider.name().to_string(),
                    existing: existing.provider.clone(),
                });
            }
            if pending.contains(&name) {
                return Err(RegistryError::Duplicate {
                    name: name.to_string(),
                    provider: provider.name().to_string(),
                    existing: provider.name().to_string(),
                });
            }
            pending.push(name);
        }

        debug!(
            provider = provider.name(),
            count = registrations.len(),
            "Registered pipeline provider"
        );
        entries.extend(registrations.into_iter().map(|registration| Entry {
            provider: provider.name().to_string(),
            registration,
        }));
        Ok(())
    }

    /// Registers a single pipeline on behalf of a provider.
    pub fn register(
        &self,
        provider: impl Into<String>,
        registration: PipelineRegistration,
    ) -> Result<(), RegistryError> {
        let provider = provider.into();
        let mut entries = self.entries.write();
        if let Some(existing) = entries
            .iter()
            .find(|e| e.registration.name == registration.name)
        {
            return Err(RegistryError::Duplicate {
                name: registration.name,
                provider,
                existing: existing.provider.clone(),
            });
        }
        entries.push(Entry {
            provider,
            registration,
        });
        Ok(())
    }

    /// Returns the registered names, in discovery order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .map(|e| e.registration.name.clone())
            .collect()
    }

    /// Returns the number of registered pipelines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Instantiates one pipeline per registered factory.
    ///
    /// A failing factory is recorded in [`DiscoveryReport::errors`] and
    /// skipped; the remaining factories still run.
    #[must_use]
    pub fn discover(&self) -> DiscoveryReport {
        let entries = self.entries.read();
        let mut report = DiscoveryReport::default();

        for entry in entries.iter() {
            match (entry.registration.factory)() {
                Ok(pipeline) => report.pipelines.push(pipeline),
                Err(e) => {
                    warn!(
                        pipeline = %entry.registration.name,
                        provider = %entry.provider,
                        error = %e,
                        "Pipeline failed to instantiate"
                    );
                    report.errors.push(DiscoveryError::from_anyhow(
                        &entry.registration.name,
                        &entry.provider,
                        &e,
                    ));
                }
            }
        }

        report
    }

    /// Clears all registrations.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl std::fmt::Debug for PipelineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRegistry")
            .field("pipelines", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockPipeline, MockProvider};
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default)]
    struct DefaultPipeline(MockPipeline);

    #[async_trait::async_trait]
    impl Pipeline for DefaultPipeline {
        fn name(&self) -> &str {
            "DefaultPipeline"
        }

        fn units(&self) -> futures::stream::BoxStream<'_, anyhow::Result<crate::core::Unit>> {
            self.0.units()
        }

        async fn prepare(
            &self,
            unit: &crate::core::Unit,
            ctx: &crate::pipeline::PhaseContext,
        ) -> anyhow::Result<crate::core::Payload> {
            self.0.prepare(unit, ctx).await
        }

        async fn commit(
            &self,
            unit: &crate::core::Unit,
            ctx: &crate::pipeline::PhaseContext,
        ) -> anyhow::Result<()> {
            self.0.commit(unit, ctx).await
        }
    }

    #[test]
    fn test_registry_creation() {
        let registry = PipelineRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.discover().pipelines.is_empty());
    }

    #[test]
    fn test_discovery_order_follows_providers() {
        let registry = PipelineRegistry::new();
        registry
            .register_provider(&MockProvider::new("crm", &["Contacts", "Companies"]))
            .unwrap();
        registry
            .register_provider(&MockProvider::new("shop", &["Orders"]))
            .unwrap();

        let report = registry.discover();
        assert!(report.is_complete());
        assert_eq!(report.names(), vec!["Contacts", "Companies", "Orders"]);
    }

    #[test]
    fn test_discovery_is_idempotent() {
        let registry = PipelineRegistry::new();
        registry
            .register_provider(&MockProvider::new("crm", &["Contacts", "Companies", "Deals"]))
            .unwrap();

        let first = registry.discover().names();
        let second = registry.discover().names();
        assert_eq!(first, second);
    }

    #[test]
    fn test_failing_factory_is_skipped() {
        let registry = PipelineRegistry::new();
        registry
            .register_provider(&MockProvider::new("crm", &["Contacts"]).with_broken("Broken"))
            .unwrap();
        registry
            .register_provider(&MockProvider::new("shop", &["Orders"]))
            .unwrap();

        let report = registry.discover();
        assert_eq!(report.names(), vec!["Contacts", "Orders"]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].name, "Broken");
        assert_eq!(report.errors[0].provider, "crm");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let registry = PipelineRegistry::new();
        registry
            .register_provider(&MockProvider::new("crm", &["Contacts"]))
            .unwrap();

        let err = registry
            .register_provider(&MockProvider::new("other", &["Accounts", "Contacts"]))
            .unwrap_err();
        assert!(err.to_string().contains("Contacts"));
        assert!(err.to_string().contains("crm"));
        // All-or-nothing: Accounts was not registered either
        assert_eq!(registry.names(), vec!["Contacts"]);
    }

    #[test]
    fn test_duplicate_within_provider_rejected() {
        let registry = PipelineRegistry::new();
        let err = registry
            .register_provider(&MockProvider::new("crm", &["Contacts", "Contacts"]))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_single_with_default() {
        let registry = PipelineRegistry::new();
        registry
            .register("app", PipelineRegistration::of::<DefaultPipeline>("DefaultPipeline"))
            .unwrap();
        assert!(registry
            .register("app", PipelineRegistration::of::<DefaultPipeline>("DefaultPipeline"))
            .is_err());

        let report = registry.discover();
        assert_eq!(report.names(), vec!["DefaultPipeline"]);

        registry.clear();
        assert!(registry.is_empty());
    }
}
