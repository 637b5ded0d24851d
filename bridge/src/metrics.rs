// Copyright (c) Tablechain, Inc.
// SPDX-License-Identifier: Apache-2.0

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, HistogramVec,
    IntCounter, IntCounterVec, IntGauge, Registry,
};

const RPC_LATENCY_SEC_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Operational metrics for the settlement bridge. Never consensus-visible;
/// validators may expose or drop them freely.
#[derive(Clone, Debug)]
pub struct BridgeMetrics {
    pub(crate) deposits_synced: IntCounter,
    pub(crate) deposits_skipped: IntCounterVec,
    pub(crate) deposits_already_processed: IntCounter,
    pub(crate) scanner_runs: IntCounter,
    pub(crate) scanner_gap_fills: IntCounter,
    pub(crate) withdrawals_initiated: IntCounter,
    pub(crate) withdrawals_signed: IntCounter,
    pub(crate) withdrawals_completed: IntCounter,
    pub(crate) l2_rpc_errors: IntCounterVec,
    pub(crate) l2_rpc_latency: HistogramVec,
    pub(crate) last_processed_deposit_index: IntGauge,
    pub(crate) last_external_height: IntGauge,
}

impl BridgeMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            deposits_synced: register_int_counter_with_registry!(
                "bridge_deposits_synced",
                "Total number of deposit records credited",
                registry,
            )
            .unwrap(),
            deposits_skipped: register_int_counter_vec_with_registry!(
                "bridge_deposits_skipped",
                "Total number of deposit records deterministically skipped",
                &["reason"],
                registry,
            )
            .unwrap(),
            deposits_already_processed: register_int_counter_with_registry!(
                "bridge_deposits_already_processed",
                "Times an ingestion path met an already-processed record",
                registry,
            )
            .unwrap(),
            scanner_runs: register_int_counter_with_registry!(
                "bridge_scanner_runs",
                "Eligible batch scanner runs",
                registry,
            )
            .unwrap(),
            scanner_gap_fills: register_int_counter_with_registry!(
                "bridge_scanner_gap_fills",
                "Deposit records handled by the batch scanner",
                registry,
            )
            .unwrap(),
            withdrawals_initiated: register_int_counter_with_registry!(
                "bridge_withdrawals_initiated",
                "Withdrawal requests created",
                registry,
            )
            .unwrap(),
            withdrawals_signed: register_int_counter_with_registry!(
                "bridge_withdrawals_signed",
                "Withdrawal requests signed",
                registry,
            )
            .unwrap(),
            withdrawals_completed: register_int_counter_with_registry!(
                "bridge_withdrawals_completed",
                "Withdrawal requests marked completed",
                registry,
            )
            .unwrap(),
            l2_rpc_errors: register_int_counter_vec_with_registry!(
                "bridge_l2_rpc_errors",
                "L2 RPC failures by error type",
                &["error_type"],
                registry,
            )
            .unwrap(),
            l2_rpc_latency: register_histogram_vec_with_registry!(
                "bridge_l2_rpc_latency",
                "L2 RPC latency in seconds",
                &["method"],
                RPC_LATENCY_SEC_BUCKETS.to_vec(),
                registry,
            )
            .unwrap(),
            last_processed_deposit_index: register_int_gauge_with_registry!(
                "bridge_last_processed_deposit_index",
                "Sync cursor: last processed deposit index",
                registry,
            )
            .unwrap(),
            last_external_height: register_int_gauge_with_registry!(
                "bridge_last_external_height",
                "Sync cursor: last external height used for a credit",
                registry,
            )
            .unwrap(),
        }
    }

    pub fn new_for_testing() -> Self {
        let registry = Registry::new();
        Self::new(&registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_cleanly() {
        let registry = Registry::new();
        let metrics = BridgeMetrics::new(&registry);
        metrics.deposits_synced.inc();
        metrics
            .deposits_skipped
            .with_label_values(&["zero_value_deposit"])
            .inc();
        metrics.last_processed_deposit_index.set(5);
        assert_eq!(metrics.deposits_synced.get(), 1);
        assert!(!registry.gather().is_empty());
    }
}
