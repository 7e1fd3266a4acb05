use std::ops::Range;

use crate::harmony::HarmonyEvent;

/// A maximal stretch of consecutive events sharing one bass degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// Absolute index of the first event in the phrase
    pub start: usize,
    pub len: usize,
    pub degree: u8,
}

impl Run {
    /// Absolute index of the last event.
    pub fn end(&self) -> usize {
        self.start + self.len - 1
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }
}

/// Run-length encode `events[start..]` by bass degree, stopping before run `limit + 1`.
fn collect_runs(events: &[HarmonyEvent], start: usize, limit: usize) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (offset, event) in events.iter().enumerate().skip(start) {
        let degree = event.bass_degree();
        match runs.last_mut() {
            Some(run) if run.degree == degree => run.len += 1,
            _ => {
                // one step too far: this event would open an extra run
                if runs.len() == limit {
                    break;
                }
                runs.push(Run {
                    start: offset,
                    len: 1,
                    degree,
                });
            }
        }
    }
    runs
}

/// Run-length encoding of a whole event sequence.
pub fn runs(events: &[HarmonyEvent]) -> Vec<Run> {
    collect_runs(events, 0, usize::MAX)
}

/// One window of the phrase reduced to at most `target_len` runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub start: usize,
    /// First index not consumed by this window
    pub next_index: usize,
    pub runs: Vec<Run>,
    /// First event of each run
    pub condensed: Vec<HarmonyEvent>,
}

impl Segment {
    /// Number of original events consumed.
    pub fn consumed(&self) -> usize {
        self.next_index - self.start
    }

    /// True when the window reduced to exactly the requested length.
    pub fn is_complete(&self, target_len: usize) -> bool {
        self.condensed.len() == target_len
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// Reduce the events from `start` onward to `target_len` condensed runs.
///
/// Consecutive events on the same bass degree collapse into one run
/// represented by its first event, so a bass line `1 5 5 5 1` condenses to
/// `1 5 1`. The window keeps extending until one more event would start run
/// `target_len + 1`; that event is left for the next window. Near the end
/// of the phrase fewer than `target_len` runs may come back.
pub fn segment(events: &[HarmonyEvent], target_len: usize, start: usize) -> Segment {
    let runs = collect_runs(events, start, target_len);
    let condensed = runs.iter().map(|r| events[r.start].clone()).collect();
    let next_index = runs.last().map(|r| r.start + r.len).unwrap_or(start);

    Segment {
        start,
        next_index,
        runs,
        condensed,
    }
}
