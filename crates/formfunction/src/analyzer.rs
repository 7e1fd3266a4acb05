use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::harmony::Phrase;
use crate::instance::FunctionInstance;
use crate::matcher::match_window;
use crate::pedal::{find_pedal_spans, PedalFigures};
use crate::reconcile::{AppendOutcome, Reconciler};
use crate::segment::segment;
use crate::table::PatternTable;

/// Tunables for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Condensed window lengths, one pass each, in order
    pub window_lengths: Vec<usize>,
    pub pedal: PedalFigures,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            window_lengths: vec![3, 4],
            pedal: PedalFigures::default(),
        }
    }
}

/// Reconciled first-order functions for a phrase.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    /// Accepted instances, in the order they were appended
    pub instances: Vec<FunctionInstance>,
    /// Full-length windows no template matched
    pub unmatched_windows: usize,
    /// Windows that ran out of phrase before reaching their length
    pub short_windows: usize,
    /// Pedal candidates seen, before deduplication
    pub pedal_candidates: usize,
}

impl Analysis {
    pub fn labels(&self) -> Vec<&str> {
        self.instances.iter().filter_map(|i| i.label()).collect()
    }

    /// See [`crate::reconcile::annotation_end`].
    pub fn annotation_end(&self, index: usize) -> Option<usize> {
        crate::reconcile::annotation_end(&self.instances, index)
    }

    /// See [`crate::reconcile::overlapping_pairs`].
    pub fn overlaps(&self) -> Vec<(usize, usize)> {
        crate::reconcile::overlapping_pairs(&self.instances)
    }
}

/// Trait for first-order form-function backends.
pub trait FunctionAnalyzer: Send + Sync {
    fn analyze(&self, phrase: &Phrase) -> Analysis;
}

/// Pattern-table analyzer: run-condensed windows matched against templates.
pub struct TableAnalyzer {
    table: Arc<PatternTable>,
    params: AnalysisParams,
}

impl TableAnalyzer {
    pub fn new(table: Arc<PatternTable>, params: AnalysisParams) -> Self {
        Self { table, params }
    }

    pub fn table(&self) -> &PatternTable {
        &self.table
    }

    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    /// One sweep over the phrase with windows of `window_len` runs.
    ///
    /// A matched window is appended before the pedal points found in its
    /// runs, so a pedal that concludes it sits right after it in the list.
    /// After a match the sweep resumes at the first unconsumed event;
    /// otherwise it slides forward by one run.
    fn sweep(
        &self,
        phrase: &Phrase,
        window_len: usize,
        reconciler: &mut Reconciler,
        analysis: &mut Analysis,
    ) {
        let events = phrase.events();
        let mut start = 0;

        while start < events.len() {
            let seg = segment(events, window_len, start);
            let pedals = find_pedal_spans(events, &seg.runs, self.params.pedal);
            analysis.pedal_candidates += pedals.len();

            let template = if seg.is_complete(window_len) {
                let found = match_window(&self.table, &seg.condensed).cloned();
                if found.is_none() {
                    trace!(start, window_len, "no template for window");
                    analysis.unmatched_windows += 1;
                }
                found
            } else {
                analysis.short_windows += 1;
                None
            };

            let matched = template.is_some();
            if matched {
                let instance = FunctionInstance::from_segment(&seg, template, events);
                if reconciler.append(instance) == AppendOutcome::Appended {
                    debug!(start, window_len, next = seg.next_index, "window matched");
                }
            }

            for pedal in &pedals {
                reconciler.append(FunctionInstance::from_pedal(pedal, &self.table, events));
            }

            start = if matched {
                seg.next_index
            } else {
                start + seg.runs.first().map_or(1, |r| r.len)
            };
        }
    }
}

impl FunctionAnalyzer for TableAnalyzer {
    fn analyze(&self, phrase: &Phrase) -> Analysis {
        let mut reconciler = Reconciler::new();
        let mut analysis = Analysis::default();

        for &window_len in &self.params.window_lengths {
            self.sweep(phrase, window_len, &mut reconciler, &mut analysis);
        }

        analysis.instances = reconciler.into_instances();
        for (a, b) in analysis.overlaps() {
            debug!(
                first = analysis.instances[a].label().unwrap_or("-"),
                second = analysis.instances[b].label().unwrap_or("-"),
                "overlapping instances kept"
            );
        }
        info!(
            events = phrase.len(),
            instances = analysis.instances.len(),
            unmatched = analysis.unmatched_windows,
            "form function analysis complete"
        );
        analysis
    }
}
