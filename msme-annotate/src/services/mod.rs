//! Lookup services used as attribute converters
//!
//! Every service implements [`ConversionService`]: a static capability set and
//! an async `convert`. Services are looked up by identifier in a
//! [`ServiceRegistry`], built once per run from a [`ServiceCatalog`] of known
//! implementations.
//!
//! # Services
//! 1. **pubchem** - PubChem PUG REST (InChI and name queries)
//! 2. **cir** - NCI Chemical Identifier Resolver (plain text)
//! 3. **cts** - Fiehn lab Chemical Translation Service
//! 4. **nlm** - NLM ChemIDplus summaries

pub mod cir;
pub mod cts;
pub mod http;
pub mod nlm;
pub mod pubchem;

pub use cir::Cir;
pub use cts::Cts;
pub use http::HttpSession;
pub use nlm::Nlm;
pub use pubchem::PubChem;

use crate::error::{AnnotateError, AnnotateResult};
use crate::job::{CapabilityIndex, Conversion};
use crate::record::AttributeValue;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;
use thiserror::Error;

/// Per-job conversion failure
///
/// Always contained by the annotator: recorded as a diagnostic, never
/// propagated out of a record's annotation.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The service does not declare this `(source, target)` pair
    #[error("{service} does not support conversion {from} -> {to}")]
    ConversionNotSupported {
        service: String,
        from: String,
        to: String,
    },

    /// The lookup produced no usable result (no match, bad input, transport)
    #[error("No data retrieved: {0}")]
    DataNotRetrieved(String),

    /// The response could not be interpreted
    #[error("Unknown response: {0}")]
    UnknownResponse(String),
}

impl ConversionError {
    pub fn not_supported(service: &str, from: &str, to: &str) -> Self {
        Self::ConversionNotSupported {
            service: service.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Attribute conversion capability of a lookup service
///
/// # Example
/// ```rust,ignore
/// use msme_annotate::services::{ConversionService, ConversionError};
///
/// struct Upper;
///
/// #[async_trait::async_trait]
/// impl ConversionService for Upper {
///     fn name(&self) -> &str { "Upper" }
///     fn capabilities(&self) -> Vec<Conversion> { vec![Conversion::new("name", "upper_name")] }
///     async fn convert(&self, from: &str, to: &str, value: &str) -> Result<AttributeValue, ConversionError> {
///         match (from, to) {
///             ("name", "upper_name") => Ok(value.to_uppercase().into()),
///             _ => Err(ConversionError::not_supported(self.name(), from, to)),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait ConversionService: Send + Sync {
    /// Service identifier used in jobs
    fn name(&self) -> &str;

    /// Declared `(source, target)` pairs; static for the service's lifetime
    fn capabilities(&self) -> Vec<Conversion>;

    /// Convert `value` of attribute `source` into attribute `target`
    ///
    /// # Errors
    /// - `ConversionNotSupported` for an undeclared pair
    /// - `DataNotRetrieved` when the lookup yields nothing usable
    /// - `UnknownResponse` when the response has an unexpected shape
    async fn convert(
        &self,
        source: &str,
        target: &str,
        value: &str,
    ) -> Result<AttributeValue, ConversionError>;
}

/// Builds a service instance on top of the run's shared HTTP session
pub type ServiceFactory = Arc<dyn Fn(&HttpSession) -> Arc<dyn ConversionService> + Send + Sync>;

/// Known service implementations, by identifier
///
/// A service identifier is "registered" when the catalog has a factory for
/// it. Validation against the catalog happens before any HTTP session exists.
#[derive(Clone, Default)]
pub struct ServiceCatalog {
    factories: IndexMap<String, ServiceFactory>,
}

impl ServiceCatalog {
    /// Catalog without any services
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog of the built-in lookup services
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        catalog.register(pubchem::SERVICE_ID, |session: &HttpSession| -> Arc<dyn ConversionService> {
            Arc::new(PubChem::new(session))
        });
        catalog.register(cir::SERVICE_ID, |session: &HttpSession| -> Arc<dyn ConversionService> {
            Arc::new(Cir::new(session))
        });
        catalog.register(cts::SERVICE_ID, |session: &HttpSession| -> Arc<dyn ConversionService> {
            Arc::new(Cts::new(session))
        });
        catalog.register(nlm::SERVICE_ID, |session: &HttpSession| -> Arc<dyn ConversionService> {
            Arc::new(Nlm::new(session))
        });
        catalog
    }

    /// Add (or replace) the factory for `id`
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn(&HttpSession) -> Arc<dyn ConversionService> + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Arc::new(factory));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered identifiers in registration order
    pub fn ids(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Check that every requested identifier has an implementation
    ///
    /// # Errors
    /// [`AnnotateError::UnknownService`] naming the first unknown identifier
    pub fn validate(&self, requested: &[String]) -> AnnotateResult<()> {
        match requested.iter().find(|id| !self.contains(id)) {
            Some(unknown) => Err(AnnotateError::UnknownService(unknown.clone())),
            None => Ok(()),
        }
    }

    /// Build a registry of the requested services, in request order
    pub fn instantiate(
        &self,
        requested: &[String],
        session: &HttpSession,
    ) -> AnnotateResult<ServiceRegistry> {
        self.validate(requested)?;

        let mut registry = ServiceRegistry::new();
        for id in requested {
            if registry.contains(id) {
                continue;
            }
            if let Some(factory) = self.factories.get(id) {
                registry.register(id.clone(), factory(session));
            }
        }

        tracing::debug!(services = ?registry.ids(), "Service registry built");
        Ok(registry)
    }
}

/// Service instances for one run, by identifier
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: IndexMap<String, Arc<dyn ConversionService>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, service: Arc<dyn ConversionService>) {
        self.services.insert(id.into(), service);
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn ConversionService>> {
        self.services.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.services.contains_key(id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.services.keys().map(String::as_str).collect()
    }

    /// Capability sets in registration order, queried once
    pub fn capability_index(&self) -> CapabilityIndex {
        let mut index = CapabilityIndex::new();
        for (id, service) in &self.services {
            index.register(id.clone(), service.capabilities());
        }
        index
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Whether a static conversion table declares `source -> target`
pub(crate) fn declares(table: &[(&str, &str)], source: &str, target: &str) -> bool {
    table.iter().any(|(s, t)| *s == source && *t == target)
}

/// Build a capability set from a static table
pub(crate) fn conversions(table: &[(&str, &str)]) -> Vec<Conversion> {
    table
        .iter()
        .map(|(source, target)| Conversion::new(*source, *target))
        .collect()
}

// ============================================================================
// Mock Service for Testing
// ============================================================================

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// How a mock conversion answers
    #[derive(Debug, Clone)]
    pub enum MockAnswer {
        Value(String),
        NoData,
        BadResponse,
    }

    /// Mock service with a fixed answer table, counting calls
    pub struct MockService {
        pub name: String,
        pub answers: Vec<((String, String), MockAnswer)>,
        pub calls: AtomicUsize,
    }

    impl MockService {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                answers: Vec::new(),
                calls: AtomicUsize::new(0),
            }
        }

        /// Declare `from -> to`; a `Value(v)` answer converts `x` into `v(x)`
        pub fn with(mut self, from: &str, to: &str, answer: MockAnswer) -> Self {
            self.answers
                .push(((from.to_string(), to.to_string()), answer));
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConversionService for MockService {
        fn name(&self) -> &str {
            &self.name
        }

        fn capabilities(&self) -> Vec<Conversion> {
            self.answers
                .iter()
                .map(|((from, to), _)| Conversion::new(from, to))
                .collect()
        }

        async fn convert(
            &self,
            source: &str,
            target: &str,
            value: &str,
        ) -> Result<AttributeValue, ConversionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let answer = self
                .answers
                .iter()
                .find(|((from, to), _)| from == source && to == target)
                .map(|(_, answer)| answer);

            match answer {
                Some(MockAnswer::Value(v)) => Ok(format!("{}({})", v, value).into()),
                Some(MockAnswer::NoData) => Err(ConversionError::DataNotRetrieved(
                    "mock: no data".to_string(),
                )),
                Some(MockAnswer::BadResponse) => Err(ConversionError::UnknownResponse(
                    "mock: garbage".to_string(),
                )),
                None => Err(ConversionError::not_supported(&self.name, source, target)),
            }
        }
    }
}
