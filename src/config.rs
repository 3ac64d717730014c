use std::time::Duration;

/// An inclusive window of overs within an innings, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OversWindow {
    pub first: u32,
    pub last: u32,
}

impl OversWindow {
    pub fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }

    pub fn contains(&self, over: u32) -> bool {
        over >= self.first && over <= self.last
    }

    pub fn label(&self) -> String {
        format!("overs {}-{}", self.first, self.last)
    }
}

/// Engine tuning options. Every knob the calculators or the cache consult
/// lives here so behavior is configured in one place.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a cached result stays fresh.
    pub cache_ttl: Duration,
    /// Opening fielding-restriction window for the supported format.
    pub powerplay_overs: OversWindow,
    /// Closing overs window for the supported format.
    pub death_overs: OversWindow,
    /// Full allotment of overs per innings; substituted as the NRR
    /// denominator when a side is bowled out early.
    pub allotted_overs: u32,
    /// Row cap for leaderboard-style outputs.
    pub top_n: usize,
    /// Upper bound on a single store call before it fails as unavailable.
    pub query_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
            powerplay_overs: OversWindow::new(1, 6),
            death_overs: OversWindow::new(16, 20),
            allotted_overs: 20,
            top_n: 10,
            query_timeout: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    pub fn with_cache_ttl(mut self, secs: u64) -> Self {
        self.cache_ttl = Duration::from_secs(secs);
        self
    }

    pub fn with_query_timeout(mut self, secs: u64) -> Self {
        self.query_timeout = Duration::from_secs(secs);
        self
    }
}
