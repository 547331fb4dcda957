use std::collections::BTreeMap;

/// Per-label bookkeeping kept by the scheduler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesState {
    /// Timestamp of the last sample that carried a value
    pub last_success: Option<u64>,
    pub consecutive_failures: u32,
    /// Ticks on which no fetch was issued because the previous one was still running
    pub skipped_ticks: u64,
    pub degraded: bool,
    pub in_flight: bool,
    /// Identifies the registration; a label registered again gets a new one
    pub generation: u64,
}

/// Result of recording a completed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    /// The failure count just reached the threshold
    Degraded(u32),
    /// First success after being degraded
    Recovered,
}

/// Poll bookkeeping for one scheduler instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollState {
    pub tick_count: u64,
    pub series: BTreeMap<String, SeriesState>,
    generations: u64,
}

impl PollState {
    pub fn series(&self, label: &str) -> Option<&SeriesState> {
        self.series.get(label)
    }

    pub(crate) fn track(&mut self, label: &str) -> u64 {
        self.generations += 1;
        let series = SeriesState { generation: self.generations, ..SeriesState::default() };
        self.series.insert(label.to_string(), series);
        self.generations
    }

    /// Whether `generation` is the live registration of `label`.
    pub(crate) fn is_current(&self, label: &str, generation: u64) -> bool {
        self.series.get(label).is_some_and(|series| series.generation == generation)
    }

    pub(crate) fn forget(&mut self, label: &str) {
        self.series.remove(label);
    }

    pub(crate) fn begin_tick(&mut self) -> u64 {
        self.tick_count += 1;
        self.tick_count
    }

    /// Marks a fetch as started and returns the registration it belongs to, or counts a
    /// skipped tick if one is already outstanding.
    pub(crate) fn try_begin_fetch(&mut self, label: &str) -> Option<u64> {
        let series = self.series.get_mut(label)?;
        if series.in_flight {
            series.skipped_ticks += 1;
            return None;
        }
        series.in_flight = true;
        Some(series.generation)
    }

    pub(crate) fn finish_fetch(&mut self, label: &str, generation: u64) {
        if let Some(series) = self.series.get_mut(label) {
            if series.generation == generation {
                series.in_flight = false;
            }
        }
    }

    pub(crate) fn record_success(&mut self, label: &str, timestamp: u64) -> Transition {
        let Some(series) = self.series.get_mut(label) else {
            return Transition::None;
        };
        series.consecutive_failures = 0;
        series.last_success = Some(timestamp);
        if std::mem::take(&mut series.degraded) {
            Transition::Recovered
        } else {
            Transition::None
        }
    }

    pub(crate) fn record_failure(&mut self, label: &str, threshold: u32) -> Transition {
        let Some(series) = self.series.get_mut(label) else {
            return Transition::None;
        };
        series.consecutive_failures = series.consecutive_failures.saturating_add(1);
        if !series.degraded && series.consecutive_failures >= threshold {
            series.degraded = true;
            Transition::Degraded(series.consecutive_failures)
        } else {
            Transition::None
        }
    }
}
