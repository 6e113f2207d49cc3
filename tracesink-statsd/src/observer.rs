// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Gauge observation container.
//!
//! An [`ObserverResult`] is handed to instrumentation code that wants to report
//! gauge values. Values can be recorded directly with [`ObserverResult::observe`]
//! or deferred behind a callback with [`ObserverResult::observe_with`]; a
//! collection pass drains everything into [`Observation`] records.

use std::collections::HashMap;
use std::fmt;
use tracesink_common::tag::Tag;

/// Callback producing a gauge value at collection time.
pub type GaugeCallback = Box<dyn Fn() -> f64 + Send>;

/// A single collected gauge value with its tag set.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub value: f64,
    pub tags: Vec<Tag>,
}

/// Accumulates gauge observations until they are collected.
///
/// The container is two lookup tables: `values` holds direct observations
/// keyed by tag set (last write wins), `callbacks` holds deferred observations
/// resolved when [`collect`](Self::collect) runs. Direct observations are
/// consumed by collection; callbacks stay registered and are re-evaluated on
/// every pass.
#[derive(Default)]
pub struct ObserverResult {
    values: HashMap<Vec<Tag>, f64>,
    callbacks: Vec<(GaugeCallback, Vec<Tag>)>,
}

impl ObserverResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a gauge value for the given tag set, replacing any previous
    /// value recorded for the same tags since the last collection.
    pub fn observe(&mut self, value: f64, tags: Vec<Tag>) {
        self.values.insert(tags, value);
    }

    /// Register a callback evaluated on every collection pass.
    pub fn observe_with<F>(&mut self, callback: F, tags: Vec<Tag>)
    where
        F: Fn() -> f64 + Send + 'static,
    {
        self.callbacks.push((Box::new(callback), tags));
    }

    /// True when a collection pass would produce no observations.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.callbacks.is_empty()
    }

    /// Drain direct observations and evaluate registered callbacks.
    pub fn collect(&mut self) -> Vec<Observation> {
        let mut observations: Vec<Observation> = self
            .values
            .drain()
            .map(|(tags, value)| Observation { value, tags })
            .collect();
        for (callback, tags) in &self.callbacks {
            observations.push(Observation {
                value: callback(),
                tags: tags.clone(),
            });
        }
        observations
    }
}

impl fmt::Debug for ObserverResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverResult")
            .field("values", &self.values)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tracesink_common::tag;

    #[test]
    fn test_observe_last_write_wins() {
        let mut result = ObserverResult::new();
        result.observe(1.0, vec![tag!("state", "idle")]);
        result.observe(3.0, vec![tag!("state", "idle")]);
        result.observe(2.0, vec![tag!("state", "busy")]);

        let mut observations = result.collect();
        observations.sort_by(|a, b| a.value.partial_cmp(&b.value).unwrap());

        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].value, 2.0);
        assert_eq!(observations[0].tags, vec![tag!("state", "busy")]);
        assert_eq!(observations[1].value, 3.0);
        assert_eq!(observations[1].tags, vec![tag!("state", "idle")]);
    }

    #[test]
    fn test_direct_observations_drain_on_collect() {
        let mut result = ObserverResult::new();
        result.observe(1.0, vec![]);
        assert_eq!(result.collect().len(), 1);
        assert!(result.collect().is_empty());
        assert!(result.is_empty());
    }

    #[test]
    fn test_callbacks_survive_collection() {
        let counter = Arc::new(AtomicU64::new(0));
        let counter_clone = counter.clone();

        let mut result = ObserverResult::new();
        result.observe_with(
            move || counter_clone.fetch_add(1, Ordering::SeqCst) as f64,
            vec![tag!("kind", "callback")],
        );

        let first = result.collect();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].value, 0.0);

        let second = result.collect();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].value, 1.0);
        assert!(!result.is_empty());
    }

    #[test]
    fn test_mixed_collection() {
        let mut result = ObserverResult::new();
        result.observe(5.0, vec![tag!("source", "direct")]);
        result.observe_with(|| 7.0, vec![tag!("source", "deferred")]);

        let observations = result.collect();
        assert_eq!(observations.len(), 2);
        assert!(observations
            .iter()
            .any(|o| o.value == 5.0 && o.tags == vec![tag!("source", "direct")]));
        assert!(observations
            .iter()
            .any(|o| o.value == 7.0 && o.tags == vec![tag!("source", "deferred")]));
    }
}
