//! Writing reconciled instances back onto the phrase.
//!
//! Each matched instance becomes one span annotation (styled by category)
//! plus its label at the first covered event. The span itself goes to a
//! [`ScoreSink`]; labels land in the phrase's per-event `LabelStatus`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::harmony::Phrase;
use crate::instance::FunctionInstance;
use crate::reconcile::annotation_end;
use crate::table::FormCategory;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Above,
    Below,
}

/// Visual style of a span. There is no medial style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanStyle {
    Prolongation,
    Cadential,
}

impl SpanStyle {
    pub fn placement(&self) -> Placement {
        match self {
            SpanStyle::Prolongation => Placement::Below,
            SpanStyle::Cadential => Placement::Above,
        }
    }
}

impl TryFrom<FormCategory> for SpanStyle {
    type Error = Error;

    fn try_from(category: FormCategory) -> Result<Self> {
        match category {
            FormCategory::Prolongation => Ok(SpanStyle::Prolongation),
            FormCategory::Cadential => Ok(SpanStyle::Cadential),
            other => Err(Error::InvalidAnnotationStyle(other.to_string())),
        }
    }
}

impl FromStr for SpanStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Prolongation" => Ok(SpanStyle::Prolongation),
            "Cadential" => Ok(SpanStyle::Cadential),
            other => Err(Error::InvalidAnnotationStyle(other.to_string())),
        }
    }
}

impl std::fmt::Display for SpanStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpanStyle::Prolongation => write!(f, "Prolongation"),
            SpanStyle::Cadential => write!(f, "Cadential"),
        }
    }
}

/// One span to draw, in phrase indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRequest {
    pub start: usize,
    /// Last form-defining event (inclusive)
    pub end: usize,
    pub style: SpanStyle,
    pub label: String,
    pub label_target: usize,
}

/// External score representation that receives span annotations.
pub trait ScoreSink {
    fn insert_span(&mut self, request: &AnnotationRequest) -> Result<()>;
}

/// Sink that just keeps every request, in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub requests: Vec<AnnotationRequest>,
}

impl ScoreSink for RecordingSink {
    fn insert_span(&mut self, request: &AnnotationRequest) -> Result<()> {
        self.requests.push(request.clone());
        Ok(())
    }
}

/// Build the request for instance `index`, or `None` if it has no template.
pub fn annotation_request(
    instances: &[FunctionInstance],
    index: usize,
) -> Result<Option<AnnotationRequest>> {
    let Some(instance) = instances.get(index) else {
        return Ok(None);
    };
    let Some(template) = instance.template.as_ref() else {
        return Ok(None);
    };

    let style = SpanStyle::try_from(template.category())?;
    let end = annotation_end(instances, index).unwrap_or_else(|| instance.end());
    let label = instance
        .label()
        .unwrap_or_else(|| template.functional_label())
        .to_string();

    Ok(Some(AnnotationRequest {
        start: instance.start,
        end,
        style,
        label,
        label_target: instance.start,
    }))
}

/// Draw instance `index` into `sink` and label it on `phrase`.
///
/// After the label is written every event the instance covers loses its
/// unassigned marker.
pub fn write_annotation(
    instances: &[FunctionInstance],
    index: usize,
    phrase: &mut Phrase,
    sink: &mut dyn ScoreSink,
) -> Result<Option<AnnotationRequest>> {
    let Some(request) = annotation_request(instances, index)? else {
        return Ok(None);
    };

    sink.insert_span(&request)?;
    phrase.assign_label(request.label_target, request.label.as_str());

    let instance = &instances[index];
    for i in instance.start..=instance.end() {
        phrase.clear_unassigned(i);
    }

    Ok(Some(request))
}

/// Write every instance in list order.
///
/// A failing instance is logged and skipped; the rest of the phrase is
/// still written.
pub fn write_annotations(
    instances: &[FunctionInstance],
    phrase: &mut Phrase,
    sink: &mut dyn ScoreSink,
) -> Vec<AnnotationRequest> {
    let mut written = Vec::new();
    for index in 0..instances.len() {
        match write_annotation(instances, index, phrase, sink) {
            Ok(Some(request)) => written.push(request),
            Ok(None) => {}
            Err(e) => warn!(index, error = %e, "annotation skipped"),
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harmony::{HarmonyEvent, LabelStatus};
    use crate::matcher::match_window;
    use crate::table::PatternTable;
    use pretty_assertions::assert_eq;

    fn ev(degree: u8, figures: &str) -> HarmonyEvent {
        HarmonyEvent::figured(degree, figures).unwrap()
    }

    struct FailingSink;

    impl ScoreSink for FailingSink {
        fn insert_span(&mut self, _request: &AnnotationRequest) -> Result<()> {
            Err(Error::InvalidAnnotationStyle("Medial".into()))
        }
    }

    fn passing_phrase() -> (Phrase, Vec<FunctionInstance>) {
        let events = vec![ev(1, ""), ev(2, "43"), ev(2, "43"), ev(3, "6"), ev(4, "")];
        let table = PatternTable::builtin().unwrap();
        let condensed = vec![events[0].clone(), events[1].clone(), events[3].clone()];
        let template = match_window(&table, &condensed).cloned();
        let instance = FunctionInstance::new(condensed, template, &events, 0, 3, None);
        (Phrase::new(events), vec![instance])
    }

    #[test]
    fn style_from_category() {
        assert_eq!(
            SpanStyle::try_from(FormCategory::Prolongation).unwrap(),
            SpanStyle::Prolongation
        );
        assert_eq!(SpanStyle::Cadential.placement(), Placement::Above);
        assert_eq!(SpanStyle::Prolongation.placement(), Placement::Below);
    }

    #[test]
    fn medial_and_sequence_styles_are_rejected() {
        assert!(matches!(
            "Medial".parse::<SpanStyle>(),
            Err(Error::InvalidAnnotationStyle(_))
        ));
        assert!(matches!(
            SpanStyle::try_from(FormCategory::Sequence),
            Err(Error::InvalidAnnotationStyle(_))
        ));
    }

    #[test]
    fn writes_label_and_clears_span() {
        let (mut phrase, instances) = passing_phrase();
        let mut sink = RecordingSink::default();
        let written = write_annotations(&instances, &mut phrase, &mut sink);

        assert_eq!(
            written,
            vec![AnnotationRequest {
                start: 0,
                end: 3,
                style: SpanStyle::Prolongation,
                label: "Tonic Prolongation with Passing".into(),
                label_target: 0,
            }]
        );
        assert_eq!(sink.requests, written);
        assert_eq!(
            phrase.label(0),
            Some(&LabelStatus::Assigned(vec![
                "Tonic Prolongation with Passing".into()
            ]))
        );
        assert_eq!(phrase.label(1), Some(&LabelStatus::Covered));
        assert_eq!(phrase.label(3), Some(&LabelStatus::Covered));
        // outside the span
        assert_eq!(phrase.label(4), Some(&LabelStatus::Unassigned));
    }

    #[test]
    fn unmatched_instances_are_not_drawn() {
        let events = vec![ev(1, ""), ev(6, "6"), ev(2, "")];
        let instance = FunctionInstance::new(events.clone(), None, &events, 0, 2, None);
        let mut phrase = Phrase::new(events);
        let mut sink = RecordingSink::default();

        let written = write_annotations(&[instance], &mut phrase, &mut sink);
        assert!(written.is_empty());
        assert_eq!(phrase.unassigned_count(), 3);
    }

    #[test]
    fn sink_failure_skips_instance() {
        let (mut phrase, instances) = passing_phrase();
        let written = write_annotations(&instances, &mut phrase, &mut FailingSink);
        assert!(written.is_empty());
        assert_eq!(phrase.unassigned_count(), 5);
    }
}
