// Verification metrics
//
// Counters and a latency histogram covering verification outcomes, error
// kinds, classifier round-trips and packet checks. Rendered in Prometheus
// text format on demand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::types::{ErrorSeverity, VerifyError};

/// Monotonically increasing counter
#[derive(Debug)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct HistogramBucket {
    pub le: f64, // upper bound in seconds
    pub count: AtomicU64,
}

/// Cumulative latency histogram
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<HistogramBucket>,
    sum: AtomicU64, // microseconds
    count: AtomicU64,
}

impl Histogram {
    /// Buckets from 1ms to 30s; a classifier round-trip can take seconds
    pub fn new_latency() -> Self {
        let bucket_bounds = vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
        ];

        let buckets = bucket_bounds
            .into_iter()
            .map(|le| HistogramBucket {
                le,
                count: AtomicU64::new(0),
            })
            .collect();

        Self {
            buckets,
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, value: Duration) {
        let seconds = value.as_secs_f64();
        let micros = value.as_micros() as u64;

        self.sum.fetch_add(micros, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for bucket in &self.buckets {
            if seconds <= bucket.le {
                bucket.count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn get_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn get_sum_micros(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn get_bucket_count(&self, le: f64) -> u64 {
        self.buckets
            .iter()
            .find(|b| (b.le - le).abs() < 0.0001)
            .map(|b| b.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn reset(&self) {
        self.sum.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
        for bucket in &self.buckets {
            bucket.count.store(0, Ordering::Relaxed);
        }
    }
}

#[derive(Debug)]
pub struct MetricsRegistry {
    // Round outcomes
    pub verifications_total: Counter,
    pub verifications_winner: Counter,
    pub verifications_no_winner: Counter,
    pub verifications_error: Counter,

    // Errors by kind
    pub errors_missing_source: Counter,
    pub errors_invalid_evidence: Counter,
    pub errors_feature_consensus: Counter,
    pub errors_position_consensus: Counter,
    pub errors_inference: Counter,
    pub errors_packet_validation: Counter,
    pub errors_other: Counter,

    // Retry classification
    pub errors_retryable: Counter,
    pub errors_fatal: Counter,

    // Classifier
    pub classifier_calls: Counter,
    pub classifier_failures: Counter,
    pub classifier_tampered: Counter,

    // Packet validation per candidate
    pub packet_checks_passed: Counter,
    pub packet_checks_failed: Counter,

    pub verify_duration: Histogram,
    pub classifier_duration: Histogram,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            verifications_total: Counter::new(),
            verifications_winner: Counter::new(),
            verifications_no_winner: Counter::new(),
            verifications_error: Counter::new(),

            errors_missing_source: Counter::new(),
            errors_invalid_evidence: Counter::new(),
            errors_feature_consensus: Counter::new(),
            errors_position_consensus: Counter::new(),
            errors_inference: Counter::new(),
            errors_packet_validation: Counter::new(),
            errors_other: Counter::new(),

            errors_retryable: Counter::new(),
            errors_fatal: Counter::new(),

            classifier_calls: Counter::new(),
            classifier_failures: Counter::new(),
            classifier_tampered: Counter::new(),

            packet_checks_passed: Counter::new(),
            packet_checks_failed: Counter::new(),

            verify_duration: Histogram::new_latency(),
            classifier_duration: Histogram::new_latency(),
        }
    }

    /// Record a round that ended without error
    pub fn record_outcome(&self, winner: bool, duration: Duration) {
        self.verifications_total.inc();
        if winner {
            self.verifications_winner.inc();
        } else {
            self.verifications_no_winner.inc();
        }
        self.verify_duration.observe(duration);
    }

    pub fn record_error(&self, error: &VerifyError, duration: Duration) {
        self.verifications_total.inc();
        self.verifications_error.inc();
        self.verify_duration.observe(duration);

        match error {
            VerifyError::MissingSource(_) => self.errors_missing_source.inc(),
            VerifyError::InvalidEvidence(_) => self.errors_invalid_evidence.inc(),
            VerifyError::FeatureConsensusNotFound => self.errors_feature_consensus.inc(),
            VerifyError::PositionConsensusNotFound => self.errors_position_consensus.inc(),
            VerifyError::Inference(_) => self.errors_inference.inc(),
            VerifyError::PacketValidationFailed { .. } => self.errors_packet_validation.inc(),
            VerifyError::Config(_) | VerifyError::Io(_) => self.errors_other.inc(),
        }

        match error.severity() {
            ErrorSeverity::Retryable => self.errors_retryable.inc(),
            ErrorSeverity::Fatal => self.errors_fatal.inc(),
        }
    }

    pub fn record_classifier_call(&self, ok: bool, tampered: usize, duration: Duration) {
        self.classifier_calls.inc();
        if !ok {
            self.classifier_failures.inc();
        }
        self.classifier_tampered.add(tampered as u64);
        self.classifier_duration.observe(duration);
    }

    pub fn record_packet_check(&self, passed: bool) {
        if passed {
            self.packet_checks_passed.inc();
        } else {
            self.packet_checks_failed.inc();
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str("# HELP rendverify_verifications_total Verification rounds by outcome\n");
        output.push_str("# TYPE rendverify_verifications_total counter\n");
        for (outcome, counter) in [
            ("winner", &self.verifications_winner),
            ("no_winner", &self.verifications_no_winner),
            ("error", &self.verifications_error),
        ] {
            output.push_str(&format!(
                "rendverify_verifications_total{{outcome=\"{}\"}} {}\n",
                outcome,
                counter.get()
            ));
        }

        output.push_str("# HELP rendverify_errors_total Verification errors by kind\n");
        output.push_str("# TYPE rendverify_errors_total counter\n");
        for (kind, counter) in [
            ("missing_source", &self.errors_missing_source),
            ("invalid_evidence", &self.errors_invalid_evidence),
            ("feature_consensus_not_found", &self.errors_feature_consensus),
            ("position_consensus_not_found", &self.errors_position_consensus),
            ("inference_error", &self.errors_inference),
            ("packet_validation_failed", &self.errors_packet_validation),
            ("other", &self.errors_other),
        ] {
            output.push_str(&format!(
                "rendverify_errors_total{{kind=\"{}\"}} {}\n",
                kind,
                counter.get()
            ));
        }

        output.push_str("# HELP rendverify_errors_by_severity Errors by retry classification\n");
        output.push_str("# TYPE rendverify_errors_by_severity counter\n");
        output.push_str(&format!(
            "rendverify_errors_by_severity{{severity=\"retryable\"}} {}\n",
            self.errors_retryable.get()
        ));
        output.push_str(&format!(
            "rendverify_errors_by_severity{{severity=\"fatal\"}} {}\n",
            self.errors_fatal.get()
        ));

        output.push_str("# HELP rendverify_classifier_calls_total Tamper classifier requests\n");
        output.push_str("# TYPE rendverify_classifier_calls_total counter\n");
        output.push_str(&format!(
            "rendverify_classifier_calls_total {}\n",
            self.classifier_calls.get()
        ));
        output.push_str(&format!(
            "rendverify_classifier_failures_total {}\n",
            self.classifier_failures.get()
        ));
        output.push_str(&format!(
            "rendverify_classifier_tampered_total {}\n",
            self.classifier_tampered.get()
        ));

        output.push_str("# HELP rendverify_packet_checks_total Per-candidate packet validation\n");
        output.push_str("# TYPE rendverify_packet_checks_total counter\n");
        output.push_str(&format!(
            "rendverify_packet_checks_total{{result=\"pass\"}} {}\n",
            self.packet_checks_passed.get()
        ));
        output.push_str(&format!(
            "rendverify_packet_checks_total{{result=\"fail\"}} {}\n",
            self.packet_checks_failed.get()
        ));

        export_histogram(
            &mut output,
            "rendverify_verify_duration_seconds",
            "Verification latency",
            &self.verify_duration,
        );
        export_histogram(
            &mut output,
            "rendverify_classifier_duration_seconds",
            "Classifier round-trip latency",
            &self.classifier_duration,
        );

        output
    }
}

fn export_histogram(output: &mut String, name: &str, help: &str, histogram: &Histogram) {
    output.push_str(&format!("# HELP {} {}\n", name, help));
    output.push_str(&format!("# TYPE {} histogram\n", name));
    for bucket in &histogram.buckets {
        output.push_str(&format!(
            "{}_bucket{{le=\"{}\"}} {}\n",
            name,
            bucket.le,
            bucket.count.load(Ordering::Relaxed)
        ));
    }
    output.push_str(&format!(
        "{}_bucket{{le=\"+Inf\"}} {}\n",
        name,
        histogram.get_count()
    ));
    output.push_str(&format!(
        "{}_sum {}\n",
        name,
        histogram.get_sum_micros() as f64 / 1_000_000.0
    ));
    output.push_str(&format!("{}_count {}\n", name, histogram.get_count()));
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: once_cell::sync::Lazy<Arc<MetricsRegistry>> =
    once_cell::sync::Lazy::new(|| Arc::new(MetricsRegistry::new()));

pub fn get_metrics() -> Arc<MetricsRegistry> {
    Arc::clone(&METRICS)
}
