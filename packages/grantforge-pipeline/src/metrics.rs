//! Prometheus metrics (lock-free atomics, zero allocation on hot path).

use std::sync::atomic::{AtomicU64, Ordering};

pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    // --- Actions ---
    pub actions_started: AtomicU64,
    pub actions_succeeded: AtomicU64,
    pub actions_failed: AtomicU64,
    pub actions_cancelled: AtomicU64,
    pub in_flight: AtomicU64,

    // --- Upstreams ---
    pub validator_rejections: AtomicU64,
    pub uploads_total: AtomicU64,
    pub upload_errors: AtomicU64,
    pub chain_submissions: AtomicU64,

    // --- Convergence ---
    pub poll_queries: AtomicU64,
    pub poll_timeouts: AtomicU64,
}

impl Metrics {
    const fn new() -> Self {
        Self {
            actions_started: AtomicU64::new(0),
            actions_succeeded: AtomicU64::new(0),
            actions_failed: AtomicU64::new(0),
            actions_cancelled: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
            validator_rejections: AtomicU64::new(0),
            uploads_total: AtomicU64::new(0),
            upload_errors: AtomicU64::new(0),
            chain_submissions: AtomicU64::new(0),
            poll_queries: AtomicU64::new(0),
            poll_timeouts: AtomicU64::new(0),
        }
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let started = self.actions_started.load(Ordering::Relaxed);
        let succeeded = self.actions_succeeded.load(Ordering::Relaxed);
        let failed = self.actions_failed.load(Ordering::Relaxed);
        let cancelled = self.actions_cancelled.load(Ordering::Relaxed);
        let in_flight = self.in_flight.load(Ordering::Relaxed);
        let rejections = self.validator_rejections.load(Ordering::Relaxed);
        let uploads = self.uploads_total.load(Ordering::Relaxed);
        let upload_errors = self.upload_errors.load(Ordering::Relaxed);
        let submissions = self.chain_submissions.load(Ordering::Relaxed);
        let poll_queries = self.poll_queries.load(Ordering::Relaxed);
        let poll_timeouts = self.poll_timeouts.load(Ordering::Relaxed);

        format!(
            "\
# HELP grantforge_actions_total Actions started.\n\
# TYPE grantforge_actions_total counter\n\
grantforge_actions_total {started}\n\
# HELP grantforge_actions_success_total Actions finished successfully.\n\
# TYPE grantforge_actions_success_total counter\n\
grantforge_actions_success_total {succeeded}\n\
# HELP grantforge_actions_failed_total Actions finished with an error.\n\
# TYPE grantforge_actions_failed_total counter\n\
grantforge_actions_failed_total {failed}\n\
# HELP grantforge_actions_cancelled_total Actions cancelled before finishing.\n\
# TYPE grantforge_actions_cancelled_total counter\n\
grantforge_actions_cancelled_total {cancelled}\n\
# HELP grantforge_actions_in_flight Actions currently running.\n\
# TYPE grantforge_actions_in_flight gauge\n\
grantforge_actions_in_flight {in_flight}\n\
# HELP grantforge_validator_rejections_total Documents rejected by the validator.\n\
# TYPE grantforge_validator_rejections_total counter\n\
grantforge_validator_rejections_total {rejections}\n\
# HELP grantforge_uploads_total Content-store uploads attempted.\n\
# TYPE grantforge_uploads_total counter\n\
grantforge_uploads_total {uploads}\n\
# HELP grantforge_upload_errors_total Content-store uploads failed.\n\
# TYPE grantforge_upload_errors_total counter\n\
grantforge_upload_errors_total {upload_errors}\n\
# HELP grantforge_chain_submissions_total Transactions broadcast.\n\
# TYPE grantforge_chain_submissions_total counter\n\
grantforge_chain_submissions_total {submissions}\n\
# HELP grantforge_poll_queries_total Convergence probe queries issued.\n\
# TYPE grantforge_poll_queries_total counter\n\
grantforge_poll_queries_total {poll_queries}\n\
# HELP grantforge_poll_timeouts_total Convergence polls that hit the budget.\n\
# TYPE grantforge_poll_timeouts_total counter\n\
grantforge_poll_timeouts_total {poll_timeouts}\n"
        )
    }
}
