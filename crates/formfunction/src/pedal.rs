use serde::{Deserialize, Serialize};

use crate::harmony::HarmonyEvent;
use crate::segment::Run;

/// Figures that mark a pedal point over a held bass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedalFigures {
    /// Must appear in the resolving chord (5/3 by default)
    pub end: u8,
    /// Must appear somewhere in the decorated middle (6/4 by default)
    pub middle: u8,
}

impl Default for PedalFigures {
    fn default() -> Self {
        Self { end: 5, middle: 4 }
    }
}

/// Candidate pedal point, in absolute phrase indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PedalSpan {
    pub start: usize,
    /// Last event carrying the end figure
    pub end: usize,
    /// Last event carrying the middle figure
    pub middle: usize,
    pub degree: u8,
}

impl PedalSpan {
    /// Events from the pedal's onset through its resolution.
    pub fn event_count(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Relative index of the last event in `events` carrying `figure`.
fn last_with_figure(events: &[HarmonyEvent], figure: u8) -> Option<usize> {
    events.iter().rposition(|e| e.has_figure(figure))
}

/// Inspect one run for a pedal point.
///
/// Both signals are required: an event with the end figure (the pedal
/// resolves over the same bass) and an event with the middle figure. Each
/// is the occurrence closest to the end of the run, found independently.
pub fn pedal_in_run(
    events: &[HarmonyEvent],
    run: &Run,
    figures: PedalFigures,
) -> Option<PedalSpan> {
    let slice = events.get(run.range())?;
    let end = last_with_figure(slice, figures.end)?;
    let middle = last_with_figure(slice, figures.middle)?;

    Some(PedalSpan {
        start: run.start,
        end: run.start + end,
        middle: run.start + middle,
        degree: run.degree,
    })
}

/// Every pedal candidate among `runs`, in run order.
pub fn find_pedal_spans(
    events: &[HarmonyEvent],
    runs: &[Run],
    figures: PedalFigures,
) -> Vec<PedalSpan> {
    runs.iter()
        .filter_map(|run| pedal_in_run(events, run, figures))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::runs;
    use pretty_assertions::assert_eq;

    fn ev(degree: u8, figures: &str) -> HarmonyEvent {
        HarmonyEvent::figured(degree, figures).unwrap()
    }

    #[test]
    fn dominant_pedal_five_four_five() {
        let events = vec![ev(5, "5"), ev(5, "4"), ev(5, "5")];
        let spans = find_pedal_spans(&events, &runs(&events), PedalFigures::default());
        assert_eq!(
            spans,
            vec![PedalSpan {
                start: 0,
                end: 2,
                middle: 1,
                degree: 5
            }]
        );
    }

    #[test]
    fn no_resolution_no_pedal() {
        // held 6/4 that never resolves to 5/3
        let events = vec![ev(1, "64"), ev(1, "64")];
        let spans = find_pedal_spans(&events, &runs(&events), PedalFigures::default());
        assert!(spans.is_empty());
    }

    #[test]
    fn no_decoration_no_pedal() {
        let events = vec![ev(1, ""), ev(1, "6"), ev(1, "")];
        let spans = find_pedal_spans(&events, &runs(&events), PedalFigures::default());
        assert!(spans.is_empty());
    }

    #[test]
    fn end_is_last_resolution_in_run() {
        let events = vec![
            ev(2, ""),
            ev(1, ""),
            ev(1, "64"),
            ev(1, ""),
            ev(1, "64"),
            ev(1, ""),
            ev(1, "6"),
        ];
        let spans = find_pedal_spans(&events, &runs(&events), PedalFigures::default());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 1);
        assert_eq!(spans[0].end, 5);
        assert_eq!(spans[0].middle, 4);
        assert_eq!(spans[0].event_count(), 5);
    }

    #[test]
    fn middle_may_follow_end() {
        // the two figures are searched independently
        let events = vec![ev(5, ""), ev(5, "64")];
        let spans = find_pedal_spans(&events, &runs(&events), PedalFigures::default());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].end, 0);
        assert_eq!(spans[0].middle, 1);
    }

    #[test]
    fn each_run_checked_separately() {
        let events = vec![
            ev(1, ""),
            ev(1, "64"),
            ev(1, ""),
            ev(5, "7"),
            ev(5, "64"),
            ev(5, "7"),
        ];
        let spans = find_pedal_spans(&events, &runs(&events), PedalFigures::default());
        let starts: Vec<usize> = spans.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 3]);
    }

    #[test]
    fn custom_figures() {
        let events = vec![ev(1, ""), ev(1, "7"), ev(1, "6")];
        let figures = PedalFigures { end: 6, middle: 7 };
        let spans = find_pedal_spans(&events, &runs(&events), figures);
        assert_eq!(spans[0].end, 2);
    }
}
