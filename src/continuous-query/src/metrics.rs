// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Prometheus monitoring metrics.

use std::future::Future;
use std::time::Instant;

use prometheus::core::Collector;
use prometheus::{Counter, CounterVec, IntCounter, IntCounterVec, Opts, Registry};

/// Prometheus monitoring metrics for the continuous query service.
///
/// Not Clone; share it behind an `Arc`.
pub struct Metrics {
    _vecs: MetricsVecs,

    pub create: ExternalOpMetrics,
    pub delete: ExternalOpMetrics,
    pub get_schemas: ExternalOpMetrics,
    pub test: ExternalOpMetrics,

    /// Schema probes whose failure was absorbed by discovery.
    pub probes_dropped: IntCounter,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Returns a new [Metrics] instance connected to the given registry.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let vecs = MetricsVecs::new(registry)?;
        let probes_dropped = register(
            registry,
            IntCounter::new(
                "cq_schema_probes_dropped_count",
                "count of schema probes that failed and were left out of discovery",
            )?,
        )?;

        Ok(Metrics {
            create: vecs.external_op_metrics("create"),
            delete: vecs.external_op_metrics("delete"),
            get_schemas: vecs.external_op_metrics("get_schemas"),
            test: vecs.external_op_metrics("test"),
            probes_dropped,
            _vecs: vecs,
        })
    }
}

#[derive(Debug)]
struct MetricsVecs {
    external_op_started: IntCounterVec,
    external_op_succeeded: IntCounterVec,
    external_op_failed: IntCounterVec,
    external_op_seconds: CounterVec,
}

impl MetricsVecs {
    fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        Ok(MetricsVecs {
            external_op_started: register(
                registry,
                IntCounterVec::new(
                    Opts::new("cq_started_count", "count of continuous query operations started"),
                    &["op"],
                )?,
            )?,
            external_op_succeeded: register(
                registry,
                IntCounterVec::new(
                    Opts::new(
                        "cq_succeeded_count",
                        "count of continuous query operations succeeded",
                    ),
                    &["op"],
                )?,
            )?,
            external_op_failed: register(
                registry,
                IntCounterVec::new(
                    Opts::new("cq_failed_count", "count of continuous query operations failed"),
                    &["op"],
                )?,
            )?,
            external_op_seconds: register(
                registry,
                CounterVec::new(
                    Opts::new("cq_seconds", "time spent in continuous query operations"),
                    &["op"],
                )?,
            )?,
        })
    }

    fn external_op_metrics(&self, op: &str) -> ExternalOpMetrics {
        ExternalOpMetrics {
            started: self.external_op_started.with_label_values(&[op]),
            succeeded: self.external_op_succeeded.with_label_values(&[op]),
            failed: self.external_op_failed.with_label_values(&[op]),
            seconds: self.external_op_seconds.with_label_values(&[op]),
        }
    }
}

fn register<C>(registry: &Registry, collector: C) -> Result<C, prometheus::Error>
where
    C: Collector + Clone + 'static,
{
    registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}

#[derive(Debug)]
pub struct ExternalOpMetrics {
    pub started: IntCounter,
    pub succeeded: IntCounter,
    pub failed: IntCounter,
    pub seconds: Counter,
}

impl ExternalOpMetrics {
    pub(crate) async fn run_op<R, E, F, OpFn>(&self, op_fn: OpFn) -> Result<R, E>
    where
        F: Future<Output = Result<R, E>>,
        OpFn: FnOnce() -> F,
    {
        self.started.inc();
        let start = Instant::now();
        let res = op_fn().await;
        let elapsed_seconds = start.elapsed().as_secs_f64();
        self.seconds.inc_by(elapsed_seconds);
        match res.as_ref() {
            Ok(_) => self.succeeded.inc(),
            Err(_) => self.failed.inc(),
        };
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_op_counts_outcomes() {
        let registry = Registry::new();
        let metrics = Metrics::new(&registry).unwrap();

        let ok: Result<u32, ()> = metrics.test.run_op(|| async { Ok(1) }).await;
        assert_eq!(ok, Ok(1));
        let err: Result<u32, ()> = metrics.test.run_op(|| async { Err(()) }).await;
        assert_eq!(err, Err(()));

        assert_eq!(metrics.test.started.get(), 2);
        assert_eq!(metrics.test.succeeded.get(), 1);
        assert_eq!(metrics.test.failed.get(), 1);
        assert_eq!(metrics.create.started.get(), 0);

        let families = registry.gather();
        assert!(families.iter().any(|f| f.get_name() == "cq_started_count"));
        assert!(families.iter().any(|f| f.get_name() == "cq_schema_probes_dropped_count"));
    }

    #[test]
    fn metrics_register_once_per_registry() {
        let registry = Registry::new();
        Metrics::new(&registry).unwrap();
        assert!(Metrics::new(&registry).is_err());
    }
}
