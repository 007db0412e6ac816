//! Shared helpers for msme-annotate integration tests
//!
//! [`TableService`] is a deterministic stand-in for a lookup service:
//! converting `x` from `source` to `target` yields `"target(x)"`. Inputs can be
//! made to fail, and a per-input delay lets tests shuffle completion order.

#![allow(dead_code)]

use async_trait::async_trait;
use msme_annotate::job::Conversion;
use msme_annotate::services::{ConversionError, ConversionService, HttpSession, ServiceCatalog};
use msme_annotate::{AttributeValue, Record};
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type DelayFn = Box<dyn Fn(&str) -> Duration + Send + Sync>;

pub struct TableService {
    name: String,
    pairs: Vec<(String, String)>,
    failing: HashSet<String>,
    delay: Option<DelayFn>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl TableService {
    pub fn new(name: &str, pairs: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            pairs: pairs
                .iter()
                .map(|(s, t)| (s.to_string(), t.to_string()))
                .collect(),
            failing: HashSet::new(),
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Lookups of `value` report no data
    pub fn failing_on(mut self, value: &str) -> Self {
        self.failing.insert(value.to_string());
        self
    }

    pub fn with_delay(mut self, delay: impl Fn(&str) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConversionService for TableService {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Vec<Conversion> {
        self.pairs
            .iter()
            .map(|(s, t)| Conversion::new(s.as_str(), t.as_str()))
            .collect()
    }

    async fn convert(
        &self,
        source: &str,
        target: &str,
        value: &str,
    ) -> Result<AttributeValue, ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.pairs.iter().any(|(s, t)| s == source && t == target) {
            return Err(ConversionError::not_supported(&self.name, source, target));
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(value)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(value) {
            return Err(ConversionError::DataNotRetrieved(format!("no match for {}", value)));
        }

        Ok(json!(format!("{}({})", target, value)))
    }
}

/// Catalog offering one prebuilt service under its own name
pub fn catalog_with(service: Arc<TableService>) -> ServiceCatalog {
    let mut catalog = ServiceCatalog::empty();
    let id = service.name().to_string();
    catalog.register(id, move |_: &HttpSession| -> Arc<dyn ConversionService> {
        service.clone()
    });
    catalog
}

/// `count` records with only a `name` attribute, `r0`, `r1`, ...
pub fn named_records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| [("name", json!(format!("r{}", i)))].into_iter().collect())
        .collect()
}

/// All orderings of `items`
pub fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }

    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            out.push(tail);
        }
    }
    out
}
