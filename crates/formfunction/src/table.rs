//! Harmonic-function templates (after Caplin 1998).
//!
//! Each template pairs a bass scale-degree pattern with the figures that
//! must be present over it. Templates are loaded once and shared by
//! reference into every match.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Bump when the built-in rows change.
pub const TABLE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormCategory {
    Prolongation,
    Cadential,
    /// Reserved for sequence patterns; no template may use it yet.
    Sequence,
}

impl std::fmt::Display for FormCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormCategory::Prolongation => write!(f, "Prolongation"),
            FormCategory::Cadential => write!(f, "Cadential"),
            FormCategory::Sequence => write!(f, "Sequence"),
        }
    }
}

impl FromStr for FormCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Prolongation" => Ok(FormCategory::Prolongation),
            "Cadential" => Ok(FormCategory::Cadential),
            "Sequence" => Ok(FormCategory::Sequence),
            other => Err(Error::Configuration(format!("unknown category '{}'", other))),
        }
    }
}

/// The harmony a prolongation sustains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProlongedHarmony {
    Tonic,
    #[serde(rename = "Pre-Dominant")]
    PreDominant,
    Subdominant,
    Dominant,
}

impl ProlongedHarmony {
    pub fn name(&self) -> &'static str {
        match self {
            ProlongedHarmony::Tonic => "Tonic",
            ProlongedHarmony::PreDominant => "Pre-Dominant",
            ProlongedHarmony::Subdominant => "Subdominant",
            ProlongedHarmony::Dominant => "Dominant",
        }
    }
}

impl std::fmt::Display for ProlongedHarmony {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProlongedHarmony {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Tonic" => Ok(ProlongedHarmony::Tonic),
            "Pre-Dominant" => Ok(ProlongedHarmony::PreDominant),
            "Subdominant" => Ok(ProlongedHarmony::Subdominant),
            "Dominant" => Ok(ProlongedHarmony::Dominant),
            other => Err(Error::Configuration(format!(
                "unknown prolonged harmony '{}'",
                other
            ))),
        }
    }
}

/// What a template means, as a closed set of variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category")]
pub enum FunctionKind {
    Prolongation {
        harmony: ProlongedHarmony,
        subtype: String,
    },
    Cadential {
        subtype: Option<String>,
    },
}

impl FunctionKind {
    /// Build from the loose row fields, rejecting anything unlabelable.
    pub fn new(
        category: FormCategory,
        harmony: Option<ProlongedHarmony>,
        subtype: Option<&str>,
    ) -> Result<Self> {
        match category {
            FormCategory::Prolongation => {
                let harmony = harmony.ok_or_else(|| {
                    Error::Configuration("prolongation without a prolonged harmony".into())
                })?;
                let subtype = subtype.filter(|s| !s.is_empty()).ok_or_else(|| {
                    Error::Configuration("prolongation without a subtype".into())
                })?;
                Ok(FunctionKind::Prolongation {
                    harmony,
                    subtype: subtype.to_string(),
                })
            }
            FormCategory::Cadential => Ok(FunctionKind::Cadential {
                subtype: subtype.filter(|s| !s.is_empty()).map(str::to_string),
            }),
            other => Err(Error::Configuration(format!(
                "category must be Prolongation or Cadential, got {}",
                other
            ))),
        }
    }

    pub fn category(&self) -> FormCategory {
        match self {
            FunctionKind::Prolongation { .. } => FormCategory::Prolongation,
            FunctionKind::Cadential { .. } => FormCategory::Cadential,
        }
    }

    pub fn subtype(&self) -> Option<&str> {
        match self {
            FunctionKind::Prolongation { subtype, .. } => Some(subtype),
            FunctionKind::Cadential { subtype } => subtype.as_deref(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            FunctionKind::Prolongation { harmony, subtype } => {
                format!("{} Prolongation with {}", harmony, subtype)
            }
            FunctionKind::Cadential { subtype: Some(s) } => {
                format!("{} Cadential Progression", s)
            }
            FunctionKind::Cadential { subtype: None } => "Cadential Progression".to_string(),
        }
    }

    pub fn short_label(&self) -> String {
        match self {
            FunctionKind::Prolongation { harmony, subtype } => format!(
                "{}-{}",
                initial(harmony.name()),
                initial(subtype)
            ),
            FunctionKind::Cadential { subtype: Some(s) } => {
                format!("Cad-{}", s.chars().take(4).collect::<String>())
            }
            FunctionKind::Cadential { subtype: None } => "Cad".to_string(),
        }
    }
}

fn initial(s: &str) -> char {
    s.chars().next().unwrap_or('?')
}

/// One row of the pattern table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionTemplate {
    pub bass_degrees: Vec<u8>,
    /// `None` slots carry no figure requirement
    pub required_figures: Vec<Option<u8>>,
    pub kind: FunctionKind,
    label: String,
    short_label: String,
}

impl FunctionTemplate {
    pub fn new(
        bass_degrees: Vec<u8>,
        required_figures: Vec<Option<u8>>,
        category: FormCategory,
        harmony: Option<ProlongedHarmony>,
        subtype: Option<&str>,
    ) -> Result<Self> {
        if !matches!(bass_degrees.len(), 3 | 4) {
            return Err(Error::Configuration(format!(
                "template must have 3 or 4 bass degrees, got {}",
                bass_degrees.len()
            )));
        }
        if required_figures.len() != bass_degrees.len() {
            return Err(Error::Configuration(format!(
                "template {:?} has {} figure slots for {} degrees",
                bass_degrees,
                required_figures.len(),
                bass_degrees.len()
            )));
        }
        if let Some(bad) = bass_degrees.iter().find(|d| !(1..=7).contains(*d)) {
            return Err(Error::Configuration(format!(
                "template {:?} has out-of-range degree {}",
                bass_degrees, bad
            )));
        }

        let kind = FunctionKind::new(category, harmony, subtype)?;
        let label = kind.label();
        let short_label = kind.short_label();

        Ok(Self {
            bass_degrees,
            required_figures,
            kind,
            label,
            short_label,
        })
    }

    pub fn len(&self) -> usize {
        self.bass_degrees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bass_degrees.is_empty()
    }

    pub fn category(&self) -> FormCategory {
        self.kind.category()
    }

    pub fn functional_label(&self) -> &str {
        &self.label
    }

    pub fn short_label(&self) -> &str {
        &self.short_label
    }

    pub fn is_pedal(&self) -> bool {
        self.kind.subtype() == Some("Pedal")
    }
}

/// Compact, const-constructible row used for the built-in table.
///
/// Figure slots use `0` for "no requirement" (0 is never a figure).
struct Row {
    degrees: &'static [u8],
    figures: &'static [u8],
    category: FormCategory,
    harmony: Option<ProlongedHarmony>,
    subtype: Option<&'static str>,
}

const fn prol(degrees: &'static [u8], figures: &'static [u8], subtype: &'static str) -> Row {
    Row {
        degrees,
        figures,
        category: FormCategory::Prolongation,
        harmony: Some(ProlongedHarmony::Tonic),
        subtype: Some(subtype),
    }
}

const fn pedal(degrees: &'static [u8], harmony: ProlongedHarmony) -> Row {
    Row {
        degrees,
        figures: &[5, 4, 5],
        category: FormCategory::Prolongation,
        harmony: Some(harmony),
        subtype: Some("Pedal"),
    }
}

const fn cad(degrees: &'static [u8], figures: &'static [u8], subtype: Option<&'static str>) -> Row {
    Row {
        degrees,
        figures,
        category: FormCategory::Cadential,
        harmony: None,
        subtype,
    }
}

/// Three-event rows, in match order.
static BUILTIN_THREE: &[Row] = &[
    // Tonic prolongations on scale-degree 1 (mostly rule-of-the-octave segments)
    prol(&[1, 2, 1], &[5, 6, 5], "Neighbor, Upper"),
    prol(&[1, 7, 1], &[5, 0, 5], "Neighbor, Lower"),
    prol(&[1, 4, 3], &[1, 4, 6], "Neighbor, Incomplete"),
    prol(&[1, 5, 1], &[5, 5, 5], "Harmonic"),
    prol(&[1, 4, 1], &[5, 5, 5], "Harmonic"),
    // Tonic prolongations on scale-degree 3
    prol(&[3, 2, 3], &[6, 6, 6], "Neighbor, Lower"),
    prol(&[3, 4, 3], &[6, 4, 6], "Neighbor, Upper"),
    // Tonic prolongations that change bass degree
    prol(&[1, 2, 3], &[5, 6, 6], "Passing"),
    prol(&[3, 2, 1], &[6, 6, 5], "Passing"),
    prol(&[1, 6, 3], &[5, 5, 6], "Arpeggiating"),
    prol(&[1, 6, 1], &[5, 5, 5], "Substitute"),
    // Pedals: ends on 5/3
    pedal(&[1, 1, 1], ProlongedHarmony::Tonic),
    pedal(&[5, 5, 5], ProlongedHarmony::Dominant),
    // Cadences
    cad(&[4, 5, 1], &[0, 7, 5], Some("Authentic")),
    cad(&[4, 5, 1], &[0, 5, 5], None),
    // Cadential deviations (leaving scale-degree 5)
    cad(&[5, 4, 3], &[5, 4, 6], Some("Abandoned")),
    cad(&[4, 5, 3], &[0, 5, 6], Some("Evasion")),
    cad(&[4, 5, 6], &[0, 5, 5], Some("Deceptive Resolution")),
];

/// Four-event rows, in match order.
static BUILTIN_FOUR: &[Row] = &[
    prol(&[1, 2, 7, 1], &[5, 6, 0, 5], "Neighbor, Double"),
    prol(&[1, 7, 2, 1], &[5, 0, 6, 5], "Neighbor, Double"),
    prol(&[3, 4, 2, 3], &[6, 4, 6, 6], "Neighbor, Double"),
    prol(&[3, 2, 4, 3], &[6, 6, 4, 6], "Neighbor, Double"),
    prol(&[1, 2, 4, 3], &[5, 6, 4, 6], "Cambiata"),
    prol(&[3, 2, 7, 1], &[6, 6, 0, 5], "Cambiata"),
    cad(&[3, 4, 5, 1], &[6, 0, 0, 5], Some("Complete")),
    cad(&[4, 5, 5, 1], &[0, 4, 5, 5], Some("Incomplete")),
];

fn slots(figures: &[u8]) -> Vec<Option<u8>> {
    figures.iter().map(|&f| (f != 0).then_some(f)).collect()
}

/// TOML shape of a custom table file.
#[derive(Debug, Deserialize)]
struct TableFile {
    version: u32,
    #[serde(default, rename = "template")]
    templates: Vec<TemplateRow>,
}

#[derive(Debug, Deserialize)]
struct TemplateRow {
    degrees: Vec<u8>,
    figures: Vec<u8>,
    category: String,
    harmony: Option<String>,
    subtype: Option<String>,
}

/// The ordered collection of templates, split by window length.
#[derive(Debug, Clone)]
pub struct PatternTable {
    version: u32,
    three: Vec<Arc<FunctionTemplate>>,
    four: Vec<Arc<FunctionTemplate>>,
}

impl PatternTable {
    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self> {
        let templates = BUILTIN_THREE
            .iter()
            .chain(BUILTIN_FOUR.iter())
            .map(|row| {
                FunctionTemplate::new(
                    row.degrees.to_vec(),
                    slots(row.figures),
                    row.category,
                    row.harmony,
                    row.subtype,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_templates(TABLE_VERSION, templates))
    }

    /// Build from templates in match order; each lands in its length's subset.
    pub fn from_templates(version: u32, templates: Vec<FunctionTemplate>) -> Self {
        let mut three = Vec::new();
        let mut four = Vec::new();
        for template in templates {
            match template.len() {
                3 => three.push(Arc::new(template)),
                _ => four.push(Arc::new(template)),
            }
        }
        debug!(
            version,
            three = three.len(),
            four = four.len(),
            "pattern table loaded"
        );
        Self {
            version,
            three,
            four,
        }
    }

    /// Parse a custom table from TOML.
    ///
    /// ```toml
    /// version = 2
    ///
    /// [[template]]
    /// degrees = [1, 2, 1]
    /// figures = [5, 6, 5]   # 0 = no requirement
    /// category = "Prolongation"
    /// harmony = "Tonic"
    /// subtype = "Neighbor, Upper"
    /// ```
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: TableFile =
            toml::from_str(contents).map_err(|e| Error::TableParse(e.to_string()))?;

        let mut templates = Vec::with_capacity(file.templates.len());
        for row in file.templates {
            let category: FormCategory = row.category.parse()?;
            let harmony = row
                .harmony
                .as_deref()
                .map(ProlongedHarmony::from_str)
                .transpose()?;
            templates.push(FunctionTemplate::new(
                row.degrees,
                slots(&row.figures),
                category,
                harmony,
                row.subtype.as_deref(),
            )?);
        }

        Ok(Self::from_templates(file.version, templates))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Templates of the given window length, in match order.
    pub fn rows(&self, len: usize) -> &[Arc<FunctionTemplate>] {
        match len {
            3 => &self.three,
            4 => &self.four,
            _ => &[],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<FunctionTemplate>> {
        self.three.iter().chain(self.four.iter())
    }

    pub fn len(&self) -> usize {
        self.three.len() + self.four.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First pedal row whose degrees all equal `degree`.
    pub fn pedal_for_degree(&self, degree: u8) -> Option<&Arc<FunctionTemplate>> {
        self.iter()
            .find(|t| t.is_pedal() && t.bass_degrees.iter().all(|&d| d == degree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_table_loads() {
        let table = PatternTable::builtin().unwrap();
        assert_eq!(table.version(), TABLE_VERSION);
        assert_eq!(table.rows(3).len(), BUILTIN_THREE.len());
        assert_eq!(table.rows(4).len(), BUILTIN_FOUR.len());
        assert!(table.rows(5).is_empty());
    }

    #[test]
    fn builtin_uses_a_small_vocabulary() {
        let prolongation_subtypes = [
            "Neighbor",
            "Neighbor, Upper",
            "Neighbor, Lower",
            "Neighbor, Incomplete",
            "Neighbor, Double",
            "Pedal",
            "Passing",
            "Substitute",
            "Arpeggiating",
            "Harmonic",
            "Cambiata",
        ];
        let cadential_subtypes = [
            "Complete",
            "Incomplete",
            "Authentic",
            "Inauthentic",
            "Embellished",
            "Expanded",
            "Abandoned",
            "Evasion",
            "Deceptive Resolution",
        ];

        let table = PatternTable::builtin().unwrap();
        for template in table.iter() {
            match &template.kind {
                FunctionKind::Prolongation { subtype, .. } => {
                    assert!(prolongation_subtypes.contains(&subtype.as_str()), "{}", subtype)
                }
                FunctionKind::Cadential { subtype } => {
                    if let Some(s) = subtype {
                        assert!(cadential_subtypes.contains(&s.as_str()), "{}", s)
                    }
                }
            }
        }
    }

    #[test]
    fn prolongation_labels() {
        let t = FunctionTemplate::new(
            vec![1, 2, 1],
            vec![Some(5), Some(6), Some(5)],
            FormCategory::Prolongation,
            Some(ProlongedHarmony::Tonic),
            Some("Neighbor, Upper"),
        )
        .unwrap();
        assert_eq!(t.functional_label(), "Tonic Prolongation with Neighbor, Upper");
        assert_eq!(t.short_label(), "T-N");
    }

    #[test]
    fn cadential_labels() {
        let t = FunctionTemplate::new(
            vec![4, 5, 1],
            vec![None, Some(7), Some(5)],
            FormCategory::Cadential,
            None,
            Some("Authentic"),
        )
        .unwrap();
        assert_eq!(t.functional_label(), "Authentic Cadential Progression");
        assert_eq!(t.short_label(), "Cad-Auth");

        let bare = FunctionKind::new(FormCategory::Cadential, None, None).unwrap();
        assert_eq!(bare.label(), "Cadential Progression");
        assert_eq!(bare.short_label(), "Cad");
    }

    #[test]
    fn cadential_short_labels_name_the_subtype() {
        let table = PatternTable::builtin().unwrap();
        let shorts: Vec<&str> = table
            .iter()
            .filter(|t| t.category() == FormCategory::Cadential)
            .map(|t| t.short_label())
            .collect();
        assert!(shorts.contains(&"Cad-Auth"));
        assert!(shorts.contains(&"Cad-Comp"));
        assert!(shorts.contains(&"Cad-Dece"));
        assert!(!shorts.contains(&"Cad-Cade"));
    }

    #[test]
    fn sequence_category_is_rejected() {
        let result = FunctionTemplate::new(
            vec![1, 2, 3],
            vec![None, None, None],
            FormCategory::Sequence,
            None,
            Some("Ascending"),
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn prolongation_needs_harmony() {
        let result = FunctionKind::new(FormCategory::Prolongation, None, Some("Passing"));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn mismatched_slot_count_is_rejected() {
        let result = FunctionTemplate::new(
            vec![1, 2, 1],
            vec![Some(5), Some(6)],
            FormCategory::Cadential,
            None,
            None,
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn pedal_lookup_by_degree() {
        let table = PatternTable::builtin().unwrap();
        let dominant = table.pedal_for_degree(5).unwrap();
        assert_eq!(dominant.functional_label(), "Dominant Prolongation with Pedal");
        let tonic = table.pedal_for_degree(1).unwrap();
        assert_eq!(tonic.functional_label(), "Tonic Prolongation with Pedal");
        assert!(table.pedal_for_degree(4).is_none());
    }

    #[test]
    fn custom_table_from_toml() {
        let toml = r#"
            version = 7

            [[template]]
            degrees = [1, 4, 1]
            figures = [5, 4, 5]
            category = "Prolongation"
            harmony = "Tonic"
            subtype = "Neighbor"

            [[template]]
            degrees = [2, 5, 5, 1]
            figures = [6, 0, 0, 5]
            category = "Cadential"
            subtype = "Expanded"
        "#;
        let table = PatternTable::from_toml_str(toml).unwrap();
        assert_eq!(table.version(), 7);
        assert_eq!(table.rows(3).len(), 1);
        assert_eq!(table.rows(4)[0].required_figures, vec![Some(6), None, None, Some(5)]);
        assert_eq!(
            table.rows(4)[0].functional_label(),
            "Expanded Cadential Progression"
        );
    }

    #[test]
    fn custom_table_rejects_unknown_category() {
        let toml = r#"
            version = 1

            [[template]]
            degrees = [1, 2, 1]
            figures = [0, 0, 0]
            category = "Medial"
        "#;
        assert!(matches!(
            PatternTable::from_toml_str(toml),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            PatternTable::from_toml_str("version = "),
            Err(Error::TableParse(_))
        ));
    }
}
