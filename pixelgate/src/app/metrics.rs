use crate::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default, Serialize)]
pub struct Metrics {
    requests: AtomicUsize,
    streamed: AtomicUsize,
    not_modified: AtomicUsize,
    redirects: AtomicUsize,
    failures: AtomicUsize,
    bytes_out: AtomicUsize,
}

/// A point-in-time copy of [`Metrics`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub requests: usize,
    pub streamed: usize,
    pub not_modified: usize,
    pub redirects: usize,
    pub failures: usize,
    pub bytes_out: usize,
}

impl Metrics {
    pub fn add_request(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }

    pub fn add_streamed(&self) {
        self.streamed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn add_not_modified(&self) {
        self.not_modified.fetch_add(1, Ordering::SeqCst);
    }

    pub fn add_redirect(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }

    pub fn add_failure(&self) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }

    pub fn add_bytes_out(&self, value: usize) {
        self.bytes_out.fetch_add(value, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::SeqCst),
            streamed: self.streamed.load(Ordering::SeqCst),
            not_modified: self.not_modified.load(Ordering::SeqCst),
            redirects: self.redirects.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
            bytes_out: self.bytes_out.load(Ordering::SeqCst),
        }
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::result::Result<(), std::fmt::Error> {
        let s = self.snapshot();
        write!(
            f,
            "Requests: {}, Streamed: {}, Not modified: {}, Redirects: {}, Failures: {}, Out: {}",
            s.requests, s.streamed, s.not_modified, s.redirects, s.failures, s.bytes_out
        )
    }
}

#[cfg(test)]
mod test {
    use super::Metrics;

    #[test]
    fn serializes_counters() {
        let metrics = Metrics::default();
        metrics.add_request();
        metrics.add_request();
        metrics.add_bytes_out(512);
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["requests"], 2);
        assert_eq!(json["bytes_out"], 512);
        assert_eq!(json["failures"], 0);
        assert_eq!(metrics.snapshot().requests, 2);
    }
}
