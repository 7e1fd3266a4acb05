use std::sync::Arc;

use crate::harmony::HarmonyEvent;
use crate::table::{FunctionTemplate, PatternTable};

/// Does `template` fit these condensed events?
///
/// Bass degrees must match exactly and in order. Every slot with a required
/// figure must find that figure over the corresponding event.
pub fn satisfies(template: &FunctionTemplate, events: &[HarmonyEvent]) -> bool {
    if template.bass_degrees.len() != events.len() {
        return false;
    }

    let degrees_match = template
        .bass_degrees
        .iter()
        .zip(events)
        .all(|(&degree, event)| degree == event.bass_degree());

    degrees_match
        && template
            .required_figures
            .iter()
            .zip(events)
            .all(|(required, event)| required.map_or(true, |f| event.has_figure(f)))
}

/// First template, in table order, that the condensed window satisfies.
///
/// Only windows of 3 or 4 events can match; anything else returns `None`.
pub fn match_window<'t>(
    table: &'t PatternTable,
    events: &[HarmonyEvent],
) -> Option<&'t Arc<FunctionTemplate>> {
    table
        .rows(events.len())
        .iter()
        .find(|template| satisfies(template, events))
}
