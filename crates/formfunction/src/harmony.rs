use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Figured-bass numbers present over a bass note, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<u8>", from = "Vec<u8>")]
pub struct Figures(Vec<u8>);

impl Figures {
    pub fn new(numbers: impl IntoIterator<Item = u8>) -> Self {
        let mut out = Vec::new();
        for n in numbers {
            if !out.contains(&n) {
                out.push(n);
            }
        }
        Self(out)
    }

    /// Expand a figured-bass abbreviation into the full interval stack.
    ///
    /// `""` is a root-position triad (5/3), `"6"` a first inversion (6/3),
    /// `"43"` a second-inversion seventh (6/4/3), and so on. Anything not in
    /// the abbreviation list is read digit by digit.
    pub fn from_shorthand(shorthand: &str) -> Result<Self> {
        let s = shorthand.trim();
        let expanded: &[u8] = match s {
            "" | "5" | "53" => &[5, 3],
            "6" | "63" => &[6, 3],
            "64" => &[6, 4],
            "7" => &[7, 5, 3],
            "65" => &[6, 5, 3],
            "43" => &[6, 4, 3],
            "42" | "2" => &[6, 4, 2],
            _ => {
                let mut numbers = Vec::with_capacity(s.len());
                for c in s.chars() {
                    let digit = c
                        .to_digit(10)
                        .ok_or_else(|| Error::InvalidFigures(shorthand.to_string()))?;
                    numbers.push(digit as u8);
                }
                return Ok(Self::new(numbers));
            }
        };
        Ok(Self::new(expanded.iter().copied()))
    }

    pub fn contains(&self, figure: u8) -> bool {
        self.0.contains(&figure)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Figures {
    fn from(numbers: Vec<u8>) -> Self {
        Self::new(numbers)
    }
}

impl From<Figures> for Vec<u8> {
    fn from(figures: Figures) -> Self {
        figures.0
    }
}

impl std::fmt::Display for Figures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for n in &self.0 {
            write!(f, "{}", n)?;
        }
        Ok(())
    }
}

/// Figures as they arrive from outside: either explicit numbers or a shorthand string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FiguresInput {
    Numbers(Vec<u8>),
    Shorthand(String),
}

#[derive(Debug, Clone, Deserialize)]
struct RawHarmonyEvent {
    degree: u8,
    #[serde(default)]
    figures: Option<FiguresInput>,
    #[serde(default = "default_duration")]
    duration: f64,
}

fn default_duration() -> f64 {
    1.0
}

/// One harmony in a phrase, as supplied by the harmonic-analysis front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHarmonyEvent")]
pub struct HarmonyEvent {
    #[serde(rename = "degree")]
    bass_degree: u8,
    figures: Figures,
    /// Quarter lengths
    duration: f64,
}

impl HarmonyEvent {
    pub fn new(bass_degree: u8, figures: Figures, duration: f64) -> Result<Self> {
        if !(1..=7).contains(&bass_degree) {
            return Err(Error::InvalidDegree(bass_degree));
        }
        if !duration.is_finite() || duration < 0.0 {
            return Err(Error::InvalidDuration(duration));
        }
        Ok(Self {
            bass_degree,
            figures,
            duration,
        })
    }

    /// Shorthand constructor: one quarter long, figures from an abbreviation.
    pub fn figured(bass_degree: u8, shorthand: &str) -> Result<Self> {
        Self::new(bass_degree, Figures::from_shorthand(shorthand)?, 1.0)
    }

    pub fn bass_degree(&self) -> u8 {
        self.bass_degree
    }

    pub fn figures(&self) -> &Figures {
        &self.figures
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn has_figure(&self, figure: u8) -> bool {
        self.figures.contains(figure)
    }
}

impl TryFrom<RawHarmonyEvent> for HarmonyEvent {
    type Error = Error;

    fn try_from(raw: RawHarmonyEvent) -> Result<Self> {
        let figures = match raw.figures {
            Some(FiguresInput::Numbers(n)) => Figures::new(n),
            Some(FiguresInput::Shorthand(s)) => Figures::from_shorthand(&s)?,
            None => Figures::from_shorthand("")?,
        };
        HarmonyEvent::new(raw.degree, figures, raw.duration)
    }
}

/// Labeling state of a single event in the phrase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "labels")]
pub enum LabelStatus {
    /// No function has claimed this event yet
    #[default]
    Unassigned,
    /// Inside a labeled span, without a label of its own
    Covered,
    /// One or more functional labels start here
    Assigned(Vec<String>),
}

impl LabelStatus {
    pub fn is_unassigned(&self) -> bool {
        matches!(self, LabelStatus::Unassigned)
    }

    pub fn labels(&self) -> &[String] {
        match self {
            LabelStatus::Assigned(labels) => labels,
            _ => &[],
        }
    }
}

/// An ordered harmony sequence together with its per-event label state.
///
/// This is the "score" the annotation writer mutates: events themselves
/// are immutable, only their `LabelStatus` changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    events: Vec<HarmonyEvent>,
    labels: Vec<LabelStatus>,
}

impl Phrase {
    pub fn new(events: Vec<HarmonyEvent>) -> Self {
        let labels = vec![LabelStatus::Unassigned; events.len()];
        Self { events, labels }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[HarmonyEvent] {
        &self.events
    }

    pub fn labels(&self) -> &[LabelStatus] {
        &self.labels
    }

    pub fn label(&self, index: usize) -> Option<&LabelStatus> {
        self.labels.get(index)
    }

    /// Write a label at `index`, replacing the unassigned marker if present.
    pub fn assign_label(&mut self, index: usize, label: impl Into<String>) {
        if let Some(status) = self.labels.get_mut(index) {
            match status {
                LabelStatus::Assigned(labels) => labels.push(label.into()),
                _ => *status = LabelStatus::Assigned(vec![label.into()]),
            }
        }
    }

    /// Drop the unassigned marker at `index` without writing a label.
    pub fn clear_unassigned(&mut self, index: usize) {
        if let Some(status) = self.labels.get_mut(index) {
            if status.is_unassigned() {
                *status = LabelStatus::Covered;
            }
        }
    }

    pub fn unassigned_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_unassigned()).count()
    }
}

impl FromIterator<HarmonyEvent> for Phrase {
    fn from_iter<I: IntoIterator<Item = HarmonyEvent>>(iter: I) -> Self {
        Phrase::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn shorthand_expands_common_inversions() {
        assert_eq!(Figures::from_shorthand("").unwrap().as_slice(), &[5, 3]);
        assert_eq!(Figures::from_shorthand("6").unwrap().as_slice(), &[6, 3]);
        assert_eq!(Figures::from_shorthand("43").unwrap().as_slice(), &[6, 4, 3]);
        assert_eq!(Figures::from_shorthand("7").unwrap().as_slice(), &[7, 5, 3]);
        assert_eq!(Figures::from_shorthand("2").unwrap().as_slice(), &[6, 4, 2]);
    }

    #[test]
    fn shorthand_falls_back_to_digits() {
        let figures = Figures::from_shorthand("954").unwrap();
        assert_eq!(figures.as_slice(), &[9, 5, 4]);
    }

    #[test]
    fn shorthand_rejects_letters() {
        assert!(matches!(
            Figures::from_shorthand("6b"),
            Err(Error::InvalidFigures(_))
        ));
    }

    #[test]
    fn figures_deduplicate() {
        assert_eq!(Figures::new([5, 3, 5]).as_slice(), &[5, 3]);
    }

    #[test]
    fn event_rejects_out_of_range_degree() {
        assert!(matches!(
            HarmonyEvent::figured(8, ""),
            Err(Error::InvalidDegree(8))
        ));
        assert!(matches!(
            HarmonyEvent::figured(0, ""),
            Err(Error::InvalidDegree(0))
        ));
    }

    #[test]
    fn event_rejects_negative_duration() {
        let result = HarmonyEvent::new(1, Figures::default(), -0.5);
        assert!(matches!(result, Err(Error::InvalidDuration(_))));
    }

    #[test]
    fn event_deserializes_from_shorthand_and_numbers() {
        let json = r#"[
            {"degree": 1},
            {"degree": 2, "figures": "43", "duration": 0.5},
            {"degree": 3, "figures": [6, 3]}
        ]"#;
        let events: Vec<HarmonyEvent> = serde_json::from_str(json).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].figures().as_slice(), &[5, 3]);
        assert_eq!(events[1].figures().as_slice(), &[6, 4, 3]);
        assert_eq!(events[1].duration(), 0.5);
        assert_eq!(events[2].bass_degree(), 3);
    }

    #[test]
    fn event_deserialize_validates_degree() {
        let result: std::result::Result<HarmonyEvent, _> =
            serde_json::from_str(r#"{"degree": 9}"#);
        assert!(result.is_err());
    }

    #[test]
    fn phrase_starts_unassigned() {
        let phrase: Phrase = [1, 5, 1]
            .iter()
            .map(|&d| HarmonyEvent::figured(d, "").unwrap())
            .collect();
        assert_eq!(phrase.unassigned_count(), 3);
    }

    #[test]
    fn assign_replaces_marker_and_appends() {
        let mut phrase = Phrase::new(vec![HarmonyEvent::figured(1, "").unwrap()]);
        phrase.assign_label(0, "first");
        phrase.assign_label(0, "second");
        assert_eq!(
            phrase.label(0),
            Some(&LabelStatus::Assigned(vec!["first".into(), "second".into()]))
        );
    }

    #[test]
    fn clear_keeps_existing_labels() {
        let mut phrase = Phrase::new(vec![
            HarmonyEvent::figured(1, "").unwrap(),
            HarmonyEvent::figured(5, "").unwrap(),
        ]);
        phrase.assign_label(0, "label");
        phrase.clear_unassigned(0);
        phrase.clear_unassigned(1);
        assert_eq!(phrase.label(0).unwrap().labels(), &["label".to_string()]);
        assert_eq!(phrase.label(1), Some(&LabelStatus::Covered));
    }
}
