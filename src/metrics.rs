//! Connect metrics
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! every call is a no-op.

pub(crate) mod counters {
    /// A connect call started
    pub(crate) fn connect_attempt(tls: bool) {
        metrics::counter!("mongo_connect_attempts_total", "tls" => tls_label(tls)).increment(1);
    }

    /// A connect call returned a database handle
    pub(crate) fn connect_success(tls: bool) {
        metrics::counter!("mongo_connect_success_total", "tls" => tls_label(tls)).increment(1);
    }

    /// A connect call failed
    pub(crate) fn connect_failure(reason: &'static str) {
        metrics::counter!("mongo_connect_failures_total", "reason" => reason).increment(1);
    }

    /// TLS material loaded into a client config
    pub(crate) fn tls_material_loaded() {
        metrics::counter!("mongo_tls_material_loaded_total").increment(1);
    }

    fn tls_label(tls: bool) -> &'static str {
        if tls {
            "true"
        } else {
            "false"
        }
    }
}

pub(crate) mod histograms {
    /// Time from dial start to completed handshake
    pub(crate) fn dial_duration(millis: u64) {
        metrics::histogram!("mongo_dial_duration_ms").record(millis as f64);
    }
}
