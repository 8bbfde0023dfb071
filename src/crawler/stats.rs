//! Crawl statistics
//!
//! Workers bump lock-free counters as they go; [`StatsRecorder::snapshot`]
//! freezes them into a [`CrawlStats`] value for reporting.

use std::sync::atomic::{AtomicU64, Ordering};

/// Crawl statistics summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// URLs taken from the frontier and processed
    pub dispatched: u64,

    /// Documents written to the corpus
    pub written: u64,

    /// URLs skipped because robots.txt disallowed them
    pub disallowed: u64,

    /// URLs abandoned because their domain's robots.txt could not be fetched
    pub robots_failures: u64,

    /// Page fetches that failed or timed out
    pub fetch_failures: u64,

    /// Responses with a non-success status or unsupported content type
    pub rejected: u64,

    /// Redirect responses; their targets are enqueued as discovered links
    pub redirected: u64,

    /// URLs that could not be parsed or had no crawlable domain
    pub invalid_urls: u64,

    /// Documents fetched but not written to the corpus
    pub write_failures: u64,

    /// Tasks cut short by shutdown while waiting for their domain's slot
    pub cancelled: u64,

    /// Tasks that panicked
    pub panicked: u64,

    /// Discovered links added to the frontier
    pub links_enqueued: u64,
}

impl CrawlStats {
    /// Tasks that ended without a written document
    pub fn abandoned(&self) -> u64 {
        self.dispatched.saturating_sub(self.written)
    }
}

/// Shared, concurrently updated counters behind [`CrawlStats`]
#[derive(Debug, Default)]
pub struct StatsRecorder {
    dispatched: AtomicU64,
    written: AtomicU64,
    disallowed: AtomicU64,
    robots_failures: AtomicU64,
    fetch_failures: AtomicU64,
    rejected: AtomicU64,
    redirected: AtomicU64,
    invalid_urls: AtomicU64,
    write_failures: AtomicU64,
    cancelled: AtomicU64,
    panicked: AtomicU64,
    links_enqueued: AtomicU64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disallowed(&self) {
        self.disallowed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_robots_failure(&self) {
        self.robots_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_redirected(&self) {
        self.redirected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_url(&self) {
        self.invalid_urls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_panicked(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_links_enqueued(&self, count: u64) {
        self.links_enqueued.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CrawlStats {
        CrawlStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            disallowed: self.disallowed.load(Ordering::Relaxed),
            robots_failures: self.robots_failures.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            redirected: self.redirected.load(Ordering::Relaxed),
            invalid_urls: self.invalid_urls.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            links_enqueued: self.links_enqueued.load(Ordering::Relaxed),
        }
    }
}

/// Prints a crawl summary to stdout
pub fn print_statistics(stats: &CrawlStats) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  URLs dispatched: {}", stats.dispatched);
    println!("  Documents written: {}", stats.written);
    println!("  Links enqueued: {}", stats.links_enqueued);
    println!();

    if stats.abandoned() > 0 {
        println!("Abandoned:");
        println!("  Disallowed by robots.txt: {}", stats.disallowed);
        println!("  robots.txt unavailable: {}", stats.robots_failures);
        println!("  Fetch failures: {}", stats.fetch_failures);
        println!("  Rejected responses: {}", stats.rejected);
        println!("  Redirects: {}", stats.redirected);
        println!("  Invalid URLs: {}", stats.invalid_urls);
        println!("  Write failures: {}", stats.write_failures);
        println!("  Cancelled by shutdown: {}", stats.cancelled);
        if stats.panicked > 0 {
            println!("  Panicked tasks: {}", stats.panicked);
        }
        println!();
    }

    let success_rate = if stats.dispatched > 0 {
        (stats.written as f64 / stats.dispatched as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} URLs archived)",
        success_rate, stats.written, stats.dispatched
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_snapshot_starts_empty() {
        assert_eq!(StatsRecorder::new().snapshot(), CrawlStats::default());
    }

    #[test]
    fn test_counters_accumulate() {
        let recorder = StatsRecorder::new();
        recorder.record_dispatched();
        recorder.record_dispatched();
        recorder.record_dispatched();
        recorder.record_written();
        recorder.record_disallowed();
        recorder.record_fetch_failure();
        recorder.record_links_enqueued(7);
        recorder.record_invalid_url();
        recorder.record_write_failure();
        recorder.record_write_failure();

        let stats = recorder.snapshot();
        assert_eq!(stats.dispatched, 3);
        assert_eq!(stats.written, 1);
        assert_eq!(stats.disallowed, 1);
        assert_eq!(stats.fetch_failures, 1);
        assert_eq!(stats.robots_failures, 0);
        assert_eq!(stats.links_enqueued, 7);
        assert_eq!(stats.invalid_urls, 1);
        assert_eq!(stats.write_failures, 2);
        assert_eq!(stats.cancelled, 0);
        assert_eq!(stats.panicked, 0);
        assert_eq!(stats.abandoned(), 2);
    }

    #[test]
    fn test_concurrent_updates() {
        let recorder = Arc::new(StatsRecorder::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let recorder = Arc::clone(&recorder);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        recorder.record_dispatched();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(recorder.snapshot().dispatched, 1000);
    }
}
