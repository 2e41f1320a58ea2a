//! Prometheus metric definitions for the topic engine.

use prometheus::{
    Counter, Histogram, Registry, register_counter_with_registry,
    register_histogram_with_registry,
};

/// Metric collector, registered against one registry at startup.
#[derive(Debug, Clone)]
pub struct Metrics {
    // Counters
    pub candidates_fetched: Counter,
    pub items_skipped_malformed: Counter,
    pub clusters_formed: Counter,
    pub clusters_discarded_small: Counter,
    pub clusters_dropped_stance: Counter,
    pub topics_emitted: Counter,
    pub topics_single_vector: Counter,
    pub classifier_fallbacks: Counter,
    pub summary_fallbacks: Counter,
    pub cache_hits: Counter,
    pub cache_misses: Counter,
    pub navigation_enters: Counter,
    pub navigation_exits: Counter,
    pub navigation_exit_regenerated: Counter,

    // Histograms
    pub discovery_duration: Histogram,
    pub clustering_duration: Histogram,
    pub stance_duration: Histogram,
    pub summary_duration: Histogram,
}

impl Metrics {
    /// Register every engine metric against `registry`.
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        Ok(Self {
            candidates_fetched: register_counter_with_registry!(
                "pulse_candidates_fetched_total",
                "Content items fetched as clustering candidates",
                registry
            )?,
            items_skipped_malformed: register_counter_with_registry!(
                "pulse_items_skipped_malformed_total",
                "Items skipped for empty or mismatched embeddings",
                registry
            )?,
            clusters_formed: register_counter_with_registry!(
                "pulse_clusters_formed_total",
                "Clusters emitted by the clustering pass",
                registry
            )?,
            clusters_discarded_small: register_counter_with_registry!(
                "pulse_clusters_discarded_small_total",
                "Cluster attempts discarded below the minimum size",
                registry
            )?,
            clusters_dropped_stance: register_counter_with_registry!(
                "pulse_clusters_dropped_stance_total",
                "Clusters dropped by the dual-stance policy",
                registry
            )?,
            topics_emitted: register_counter_with_registry!(
                "pulse_topics_emitted_total",
                "Topics assembled and returned",
                registry
            )?,
            topics_single_vector: register_counter_with_registry!(
                "pulse_topics_single_vector_total",
                "Topics demoted to a single stance vector",
                registry
            )?,
            classifier_fallbacks: register_counter_with_registry!(
                "pulse_classifier_fallbacks_total",
                "Stance classifications that defaulted to neutral",
                registry
            )?,
            summary_fallbacks: register_counter_with_registry!(
                "pulse_summary_fallbacks_total",
                "Topic summaries substituted with the deterministic fallback",
                registry
            )?,
            cache_hits: register_counter_with_registry!(
                "pulse_cache_hits_total",
                "Topic cache hits",
                registry
            )?,
            cache_misses: register_counter_with_registry!(
                "pulse_cache_misses_total",
                "Topic cache misses, including backend failures",
                registry
            )?,
            navigation_enters: register_counter_with_registry!(
                "pulse_navigation_enters_total",
                "Navigation enter transitions",
                registry
            )?,
            navigation_exits: register_counter_with_registry!(
                "pulse_navigation_exits_total",
                "Navigation exit transitions",
                registry
            )?,
            navigation_exit_regenerated: register_counter_with_registry!(
                "pulse_navigation_exit_regenerated_total",
                "Exits that regenerated a feed because no snapshot existed",
                registry
            )?,
            discovery_duration: register_histogram_with_registry!(
                "pulse_discovery_duration_seconds",
                "End-to-end discovery run duration",
                registry
            )?,
            clustering_duration: register_histogram_with_registry!(
                "pulse_clustering_duration_seconds",
                "Clustering pass duration",
                registry
            )?,
            stance_duration: register_histogram_with_registry!(
                "pulse_stance_duration_seconds",
                "Per-cluster stance split duration",
                registry
            )?,
            summary_duration: register_histogram_with_registry!(
                "pulse_summary_duration_seconds",
                "Per-topic summary generation duration",
                registry
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_register_cleanly() {
        let registry = Registry::new();
        let metrics = Metrics::new(&registry).unwrap();
        metrics.cache_hits.inc();
        metrics.discovery_duration.observe(0.05);
        assert!(!registry.gather().is_empty());
    }

    #[test]
    fn double_registration_fails() {
        let registry = Registry::new();
        let _first = Metrics::new(&registry).unwrap();
        assert!(Metrics::new(&registry).is_err());
    }
}
