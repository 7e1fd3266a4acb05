use tracing::debug;

use crate::instance::FunctionInstance;

/// What happened to a candidate handed to [`Reconciler::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// Same start and label as an existing instance
    Duplicate,
    /// A pedal point lying inside an existing pedal point
    ContainedPedal,
}

/// Owns the ordered list of accepted function instances for one phrase.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    instances: Vec<FunctionInstance>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `candidate` unless an existing instance makes it redundant.
    pub fn append(&mut self, candidate: FunctionInstance) -> AppendOutcome {
        for existing in &self.instances {
            if pedal_contains(existing, &candidate) {
                debug!(
                    start = candidate.start,
                    end = candidate.end(),
                    "pedal point inside existing pedal, dropped"
                );
                return AppendOutcome::ContainedPedal;
            }
            if existing.start == candidate.start && existing.label == candidate.label {
                return AppendOutcome::Duplicate;
            }
        }

        debug!(
            start = candidate.start,
            end = candidate.end(),
            label = candidate.label().unwrap_or("-"),
            "function instance accepted"
        );
        self.instances.push(candidate);
        AppendOutcome::Appended
    }

    pub fn instances(&self) -> &[FunctionInstance] {
        &self.instances
    }

    pub fn into_instances(self) -> Vec<FunctionInstance> {
        self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Where the span drawn for instance `index` should end.
    ///
    /// See [`trailing_pedal_start`]; otherwise the instance's own last event.
    pub fn annotation_end(&self, index: usize) -> Option<usize> {
        annotation_end(&self.instances, index)
    }
}

/// Both pedal-labeled and `outer` covers all of `inner`.
fn pedal_contains(outer: &FunctionInstance, inner: &FunctionInstance) -> bool {
    outer.is_pedal()
        && inner.is_pedal()
        && outer.start <= inner.start
        && outer.end() >= inner.end()
}

/// Start of a pedal point that concludes instance `index`, if any.
///
/// The next instance in the list counts as a trailing pedal when it is
/// pedal-labeled and ends on the same event as instance `index`.
pub fn trailing_pedal_start(instances: &[FunctionInstance], index: usize) -> Option<usize> {
    let current = instances.get(index)?;
    let next = instances.get(index + 1)?;
    (next.is_pedal() && next.end() == current.end()).then_some(next.start)
}

/// Pairs of instances whose covered ranges share an event.
///
/// Reconciliation only drops duplicates and pedals nested in pedals, so a
/// window from the 4-event pass may still overlap one from the 3-event
/// pass. A trailing pedal and the instance it concludes are not reported.
pub fn overlapping_pairs(instances: &[FunctionInstance]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for (i, a) in instances.iter().enumerate() {
        for (j, b) in instances.iter().enumerate().skip(i + 1) {
            let shared = a.start <= b.end() && b.start <= a.end();
            let trailing = j == i + 1 && trailing_pedal_start(instances, i).is_some();
            if shared && !trailing {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

/// Last event of the span drawn for instance `index`.
///
/// A trailing pedal pulls the end back to the pedal's first event; the
/// label position (the instance start) never moves.
pub fn annotation_end(instances: &[FunctionInstance], index: usize) -> Option<usize> {
    let current = instances.get(index)?;
    Some(trailing_pedal_start(instances, index).unwrap_or_else(|| current.end()))
}
