use std::sync::Arc;

use crate::harmony::HarmonyEvent;
use crate::pedal::PedalSpan;
use crate::segment::Segment;
use crate::table::{FunctionTemplate, PatternTable};

/// Label given to a pedal point when the table has no pedal row for its degree.
pub const GENERIC_PEDAL_LABEL: &str = "Pedal Point";

/// A template matched against a concrete stretch of the phrase.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInstance {
    /// The condensed events the match was made against
    pub events: Vec<HarmonyEvent>,
    pub template: Option<Arc<FunctionTemplate>>,
    /// Every original event covered, including those collapsed into runs
    pub span: Vec<HarmonyEvent>,
    /// Index of the first covered event in the phrase
    pub start: usize,
    pub label: Option<String>,
    /// Sum of the condensed events' durations
    pub total_duration: f64,
}

impl FunctionInstance {
    /// Combine a match with the phrase events it covers.
    ///
    /// `end` is the inclusive index of the last covered event and must lie
    /// inside `phrase`. An explicit `label` replaces the template-derived one.
    pub fn new(
        events: Vec<HarmonyEvent>,
        template: Option<Arc<FunctionTemplate>>,
        phrase: &[HarmonyEvent],
        start: usize,
        end: usize,
        label: Option<String>,
    ) -> Self {
        debug_assert!(
            start <= end && end < phrase.len(),
            "span {}..={} outside phrase of {} events",
            start,
            end,
            phrase.len()
        );
        let span = phrase
            .get(start..=end)
            .map(<[HarmonyEvent]>::to_vec)
            .unwrap_or_default();
        let label = label.or_else(|| template.as_ref().map(|t| t.functional_label().to_string()));
        let total_duration = events.iter().map(HarmonyEvent::duration).sum();

        Self {
            events,
            template,
            span,
            start,
            label,
            total_duration,
        }
    }

    /// Instance for a segmented window and whatever the matcher found for it.
    pub fn from_segment(
        segment: &Segment,
        template: Option<Arc<FunctionTemplate>>,
        phrase: &[HarmonyEvent],
    ) -> Self {
        Self::new(
            segment.condensed.clone(),
            template,
            phrase,
            segment.start,
            segment.next_index.saturating_sub(1),
            None,
        )
    }

    /// Promote a pedal candidate to an instance.
    ///
    /// The pedal row for the run's degree supplies the template; the label
    /// always names the pedal, falling back to a generic one. A middle
    /// figure found after the resolution lies outside the span and is not
    /// one of the instance's events.
    pub fn from_pedal(pedal: &PedalSpan, table: &PatternTable, phrase: &[HarmonyEvent]) -> Self {
        let template = table.pedal_for_degree(pedal.degree).cloned();
        let label = template
            .as_ref()
            .map(|t| t.functional_label().to_string())
            .unwrap_or_else(|| GENERIC_PEDAL_LABEL.to_string());

        let mut landmarks = vec![pedal.start, pedal.middle, pedal.end];
        landmarks.retain(|i| (pedal.start..=pedal.end).contains(i));
        landmarks.sort_unstable();
        landmarks.dedup();
        let events = landmarks
            .into_iter()
            .filter_map(|i| phrase.get(i).cloned())
            .collect();

        Self::new(events, template, phrase, pedal.start, pedal.end, Some(label))
    }

    /// Inclusive index of the last covered event.
    pub fn end(&self) -> usize {
        (self.start + self.span.len()).saturating_sub(1)
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn is_pedal(&self) -> bool {
        self.label().is_some_and(|l| l.contains("Pedal"))
    }

    pub fn is_matched(&self) -> bool {
        self.template.is_some()
    }

    /// Duration of every covered event, including collapsed repeats.
    pub fn span_duration(&self) -> f64 {
        self.span.iter().map(HarmonyEvent::duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harmony::Figures;
    use crate::matcher::match_window;
    use crate::segment::segment;
    use pretty_assertions::assert_eq;

    fn ev(degree: u8, figures: &str, duration: f64) -> HarmonyEvent {
        HarmonyEvent::new(degree, Figures::from_shorthand(figures).unwrap(), duration).unwrap()
    }

    #[test]
    fn span_widens_over_collapsed_runs() {
        let phrase = vec![
            ev(1, "", 1.0),
            ev(2, "43", 0.5),
            ev(2, "43", 0.5),
            ev(3, "6", 2.0),
        ];
        let table = PatternTable::builtin().unwrap();
        let seg = segment(&phrase, 3, 0);
        let template = match_window(&table, &seg.condensed).cloned();
        let instance = FunctionInstance::from_segment(&seg, template, &phrase);

        assert_eq!(instance.events.len(), 3);
        assert_eq!(instance.span.len(), 4);
        assert_eq!(instance.end(), 3);
        assert_eq!(instance.label(), Some("Tonic Prolongation with Passing"));
        // condensed sum skips the collapsed repeat of degree 2
        assert_eq!(instance.total_duration, 3.5);
        assert_eq!(instance.span_duration(), 4.0);
    }

    #[test]
    fn unmatched_instance_has_no_label() {
        let phrase = vec![ev(1, "", 1.0), ev(6, "6", 1.0), ev(2, "", 1.0)];
        let seg = segment(&phrase, 3, 0);
        let instance = FunctionInstance::from_segment(&seg, None, &phrase);
        assert!(!instance.is_matched());
        assert_eq!(instance.label(), None);
        assert!(!instance.is_pedal());
    }

    #[test]
    fn override_label_wins() {
        let phrase = vec![ev(1, "", 1.0), ev(2, "43", 1.0), ev(3, "6", 1.0)];
        let table = PatternTable::builtin().unwrap();
        let template = match_window(&table, &phrase).cloned();
        let instance =
            FunctionInstance::new(phrase.clone(), template, &phrase, 0, 2, Some("Custom".into()));
        assert_eq!(instance.label(), Some("Custom"));
        assert!(instance.is_matched());
    }

    #[test]
    fn dominant_pedal_promotion() {
        let phrase = vec![ev(5, "5", 1.0), ev(5, "4", 1.0), ev(5, "5", 1.0)];
        let table = PatternTable::builtin().unwrap();
        let pedal = PedalSpan {
            start: 0,
            end: 2,
            middle: 1,
            degree: 5,
        };
        let instance = FunctionInstance::from_pedal(&pedal, &table, &phrase);
        assert_eq!(instance.label(), Some("Dominant Prolongation with Pedal"));
        assert!(instance.is_pedal());
        assert_eq!(instance.span.len(), 3);
        assert_eq!(instance.events.len(), 3);
    }

    #[test]
    fn pedal_events_stay_inside_span() {
        // 5/3 then 6/4: the middle figure comes after the resolution
        let phrase = vec![ev(5, "53", 1.0), ev(5, "64", 1.0)];
        let table = PatternTable::builtin().unwrap();
        let pedal = PedalSpan {
            start: 0,
            end: 0,
            middle: 1,
            degree: 5,
        };
        let instance = FunctionInstance::from_pedal(&pedal, &table, &phrase);

        assert_eq!(instance.end(), 0);
        assert_eq!(instance.span.len(), 1);
        assert_eq!(instance.events, vec![phrase[0].clone()]);
        assert_eq!(instance.total_duration, 1.0);
        assert!(instance.events.iter().all(|e| instance.span.contains(e)));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outside phrase")]
    fn span_past_phrase_end_panics_in_debug() {
        let phrase = vec![ev(1, "", 1.0), ev(5, "", 1.0)];
        FunctionInstance::new(phrase.clone(), None, &phrase, 0, 4, None);
    }

    #[test]
    fn pedal_without_table_row_gets_generic_label() {
        let phrase = vec![ev(4, "", 1.0), ev(4, "64", 1.0), ev(4, "", 1.0)];
        let table = PatternTable::builtin().unwrap();
        let pedal = PedalSpan {
            start: 0,
            end: 2,
            middle: 1,
            degree: 4,
        };
        let instance = FunctionInstance::from_pedal(&pedal, &table, &phrase);
        assert_eq!(instance.label(), Some(GENERIC_PEDAL_LABEL));
        assert!(instance.is_pedal());
        assert!(!instance.is_matched());
    }
}
