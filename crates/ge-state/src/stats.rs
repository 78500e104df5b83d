use std::sync::atomic::{AtomicU64, Ordering};

/// Per-engine counters for draw-state translation.
///
/// Updated on the render thread; safe to read from elsewhere for profiling overlays.
#[derive(Debug, Default)]
pub struct DrawStateStats {
    draws: AtomicU64,
    state_calls_issued: AtomicU64,
    state_calls_skipped: AtomicU64,
    framebuffer_copies: AtomicU64,
    framebuffer_copies_refused: AtomicU64,
    approximated_draws: AtomicU64,
}

impl DrawStateStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_draws(&self) {
        self.draws.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_state_call(&self, issued: bool) {
        let counter = if issued {
            &self.state_calls_issued
        } else {
            &self.state_calls_skipped
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_framebuffer_copies(&self) {
        self.framebuffer_copies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_framebuffer_copies_refused(&self) {
        self.framebuffer_copies_refused
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_approximated_draws(&self) {
        self.approximated_draws.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DrawStateStatsSnapshot {
        DrawStateStatsSnapshot {
            draws: self.draws.load(Ordering::Relaxed),
            state_calls_issued: self.state_calls_issued.load(Ordering::Relaxed),
            state_calls_skipped: self.state_calls_skipped.load(Ordering::Relaxed),
            framebuffer_copies: self.framebuffer_copies.load(Ordering::Relaxed),
            framebuffer_copies_refused: self.framebuffer_copies_refused.load(Ordering::Relaxed),
            approximated_draws: self.approximated_draws.load(Ordering::Relaxed),
        }
    }

    /// Returns a JSON object as a string.
    pub fn to_json(&self) -> String {
        self.snapshot().to_json()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStateStatsSnapshot {
    pub draws: u64,
    pub state_calls_issued: u64,
    pub state_calls_skipped: u64,
    pub framebuffer_copies: u64,
    pub framebuffer_copies_refused: u64,
    pub approximated_draws: u64,
}

impl DrawStateStatsSnapshot {
    pub fn to_json(self) -> String {
        // Hand-built to avoid pulling a serializer onto the render thread.
        format!(
            "{{\"draws\":{},\"state_calls_issued\":{},\"state_calls_skipped\":{},\"framebuffer_copies\":{},\"framebuffer_copies_refused\":{},\"approximated_draws\":{}}}",
            self.draws,
            self.state_calls_issued,
            self.state_calls_skipped,
            self.framebuffer_copies,
            self.framebuffer_copies_refused,
            self.approximated_draws,
        )
    }
}
