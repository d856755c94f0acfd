pub use std::sync::atomic::{AtomicUsize, Ordering};

pub static DEBUG: DebugMetrics = DebugMetrics::new();

pub struct DebugMetrics {
    scrape_count: AtomicUsize,
    scrape_errors: AtomicUsize,
    scrape_timeouts: AtomicUsize,
    scrape_refusals: AtomicUsize,
    content_type_mismatches: AtomicUsize,
    response_bytes: AtomicUsize,
    frames_decoded: AtomicUsize,
    frames_failed: AtomicUsize,
    truncated_bytes: AtomicUsize,
}

impl DebugMetrics {
    pub const fn new() -> Self {
        DebugMetrics {
            scrape_count: AtomicUsize::new(0),
            scrape_errors: AtomicUsize::new(0),
            scrape_timeouts: AtomicUsize::new(0),
            scrape_refusals: AtomicUsize::new(0),
            content_type_mismatches: AtomicUsize::new(0),
            response_bytes: AtomicUsize::new(0),
            frames_decoded: AtomicUsize::new(0),
            frames_failed: AtomicUsize::new(0),
            truncated_bytes: AtomicUsize::new(0),
        }
    }

    pub fn scrape_succeeded(&self, bytes: usize) {
        self.scrape_count.fetch_add(1, Ordering::Relaxed);
        self.response_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn scrape_failed(&self) {
        self.scrape_count.fetch_add(1, Ordering::Relaxed);
        self.scrape_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn scrape_timeout(&self) {
        self.scrape_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn scrape_refused(&self) {
        self.scrape_refusals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn content_type_mismatch(&self) {
        self.content_type_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_decoded(&self, n: usize) {
        self.frames_decoded.fetch_add(n, Ordering::Relaxed);
    }

    pub fn frames_failed(&self, n: usize) {
        self.frames_failed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn stream_truncated(&self, bytes: usize) {
        self.truncated_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Summarize the current metrics and reset the counters
    pub fn take_summary(&self) -> String {
        let scrape_count = self.scrape_count.swap(0, Ordering::Relaxed);
        let scrape_errors = self.scrape_errors.swap(0, Ordering::Relaxed);
        let scrape_timeouts = self.scrape_timeouts.swap(0, Ordering::Relaxed);
        let scrape_refusals = self.scrape_refusals.swap(0, Ordering::Relaxed);
        let mismatches = self.content_type_mismatches.swap(0, Ordering::Relaxed);
        let response_bytes = self.response_bytes.swap(0, Ordering::Relaxed);
        let frames_decoded = self.frames_decoded.swap(0, Ordering::Relaxed);
        let frames_failed = self.frames_failed.swap(0, Ordering::Relaxed);
        let truncated_bytes = self.truncated_bytes.swap(0, Ordering::Relaxed);

        fn format_bytes(bytes: usize) -> String {
            const KI_B: f32 = 1024.;
            const MI_B: f32 = 1024. * 1024.;

            let bytes = bytes as f32;
            if bytes > MI_B {
                format!("{:.1} {}", bytes / MI_B, "MiB")
            } else {
                format!("{:.1} {}", bytes / KI_B, "KiB")
            }
        }

        format!(
            "Debug: scraped {} (errors {}, timeouts {}, refused {}, content-type mismatches {}) | received {} | frames {} (failed {}, truncated bytes {})",
            scrape_count,
            scrape_errors,
            scrape_timeouts,
            scrape_refusals,
            mismatches,
            format_bytes(response_bytes),
            frames_decoded,
            frames_failed,
            truncated_bytes,
        )
    }

    // Log the current metrics and reset the counters
    pub fn publish(&self) {
        eprintln!("{}", self.take_summary());
    }
}
