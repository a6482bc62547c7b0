//! Per-instance operation metrics.
//!
//! Validators and parsers each own a [`Metrics`] backed by a private
//! Prometheus [`Registry`], so two instances never share counts. Prometheus
//! keeps no minimum or maximum, so latency min/max and the largest input are
//! tracked next to the instruments. Everything sits behind one lock;
//! [`Metrics::snapshot`] returns a consistent copy.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use prometheus::core::Collector;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

const SUCCESS: &str = "success";
const FAILURE: &str = "failure";

struct Instruments {
    registry: Registry,
    /// Labelled by `outcome`.
    operations: IntCounterVec,
    /// Labelled by diagnostic `code`.
    diagnostics: IntCounterVec,
    latency: Histogram,
    size: Histogram,
    latency_min: Option<Duration>,
    latency_max: Duration,
    bytes_max: u64,
}

impl Instruments {
    fn new() -> prometheus::Result<Self> {
        let operations = IntCounterVec::new(
            Opts::new("feedseal_operations_total", "Operations by outcome"),
            &["outcome"],
        )?;
        let diagnostics = IntCounterVec::new(
            Opts::new("feedseal_diagnostics_total", "Diagnostics produced, by code"),
            &["code"],
        )?;
        let latency = Histogram::with_opts(
            HistogramOpts::new(
                "feedseal_operation_duration_seconds",
                "Operation duration in seconds",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        let size = Histogram::with_opts(
            HistogramOpts::new("feedseal_input_bytes", "Input size in bytes")
                .buckets(exponential_buckets(256.0, 4.0, 8)?),
        )?;

        let registry = Registry::new();
        registry.register(Box::new(operations.clone()))?;
        registry.register(Box::new(diagnostics.clone()))?;
        registry.register(Box::new(latency.clone()))?;
        registry.register(Box::new(size.clone()))?;

        Ok(Self {
            registry,
            operations,
            diagnostics,
            latency,
            size,
            latency_min: None,
            latency_max: Duration::ZERO,
            bytes_max: 0,
        })
    }

    fn fresh() -> Self {
        // Names, labels and buckets are fixed, so construction cannot fail
        Self::new().expect("metric definitions are valid")
    }
}

/// Thread-safe operation metrics.
pub struct Metrics {
    inner: Mutex<Instruments>,
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.snapshot();
        f.debug_struct("Metrics")
            .field("operations", &s.operations)
            .field("failures", &s.failures)
            .finish()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub operations: u64,
    pub successes: u64,
    pub failures: u64,
    /// Milliseconds.
    pub latency_min_ms: f64,
    pub latency_max_ms: f64,
    pub latency_avg_ms: f64,
    pub bytes_total: u64,
    pub bytes_max: u64,
    pub bytes_avg: f64,
    /// Occurrences of each diagnostic code.
    pub codes: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    /// Fraction of operations that succeeded, 0.0 when nothing ran.
    pub fn success_rate(&self) -> f64 {
        if self.operations == 0 {
            0.0
        } else {
            self.successes as f64 / self.operations as f64
        }
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Instruments::fresh()),
        }
    }

    /// Record one finished operation.
    ///
    /// `codes` are the diagnostic codes it produced; each one is counted.
    pub fn record<'a, I>(&self, success: bool, elapsed: Duration, size: usize, codes: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut m = self.inner.lock();
        let outcome = if success { SUCCESS } else { FAILURE };
        m.operations.with_label_values(&[outcome]).inc();
        m.latency.observe(elapsed.as_secs_f64());
        m.size.observe(size as f64);
        m.latency_min = Some(m.latency_min.map_or(elapsed, |min| min.min(elapsed)));
        m.latency_max = m.latency_max.max(elapsed);
        m.bytes_max = m.bytes_max.max(size as u64);
        for code in codes {
            m.diagnostics.with_label_values(&[code]).inc();
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let m = self.inner.lock();
        let successes = m.operations.with_label_values(&[SUCCESS]).get();
        let failures = m.operations.with_label_values(&[FAILURE]).get();
        let ops = successes + failures;
        let avg = |total: f64| if ops == 0 { 0.0 } else { total / ops as f64 };

        let mut codes = BTreeMap::new();
        for family in m.diagnostics.collect() {
            for metric in family.get_metric() {
                if let Some(label) = metric.get_label().first() {
                    codes.insert(
                        label.get_value().to_string(),
                        metric.get_counter().get_value() as u64,
                    );
                }
            }
        }

        let bytes_total = m.size.get_sample_sum() as u64;
        MetricsSnapshot {
            operations: ops,
            successes,
            failures,
            latency_min_ms: m.latency_min.map(millis).unwrap_or(0.0),
            latency_max_ms: millis(m.latency_max),
            latency_avg_ms: avg(m.latency.get_sample_sum() * 1000.0),
            bytes_total,
            bytes_max: m.bytes_max,
            bytes_avg: avg(bytes_total as f64),
            codes,
        }
    }

    /// This instance's metrics in the Prometheus text exposition format.
    pub fn export(&self) -> Result<String> {
        let families = self.inner.lock().registry.gather();
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buf)
            .map_err(|e| CoreError::Metrics(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| CoreError::Metrics(e.to_string()))
    }

    /// Zero every counter.
    pub fn reset(&self) {
        *self.inner.lock() = Instruments::fresh();
    }
}
