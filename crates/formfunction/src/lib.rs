//! First-order formal-function labels from a harmonic analysis.
//!
//! Given only bass scale degrees and figured-bass numbers per harmony, this
//! crate labels prolongations, cadential progressions and pedal points
//! (after Caplin's terminology). No score data beyond the harmonies is
//! needed.
//!
//! # Example
//!
//! ```
//! use formfunction::{FormFunctionEngine, HarmonyEvent, Phrase, RecordingSink};
//!
//! // I V43 I6
//! let mut phrase = Phrase::new(vec![
//!     HarmonyEvent::figured(1, "").unwrap(),
//!     HarmonyEvent::figured(2, "43").unwrap(),
//!     HarmonyEvent::figured(3, "6").unwrap(),
//! ]);
//!
//! let engine = FormFunctionEngine::builtin().unwrap();
//! let mut sink = RecordingSink::default();
//! let report = engine.annotate(&mut phrase, &mut sink);
//!
//! assert_eq!(report.annotations[0].label, "Tonic Prolongation with Passing");
//! ```

pub mod analyzer;
pub mod annotate;
pub mod harmony;
pub mod instance;
pub mod matcher;
pub mod pedal;
pub mod reconcile;
pub mod segment;
pub mod table;

pub use analyzer::{Analysis, AnalysisParams, FunctionAnalyzer, TableAnalyzer};
pub use annotate::{
    write_annotations, AnnotationRequest, Placement, RecordingSink, ScoreSink, SpanStyle,
};
pub use harmony::{Figures, HarmonyEvent, LabelStatus, Phrase};
pub use instance::FunctionInstance;
pub use matcher::match_window;
pub use pedal::{PedalFigures, PedalSpan};
pub use reconcile::{overlapping_pairs, AppendOutcome, Reconciler};
pub use segment::{segment, Run, Segment};
pub use table::{
    FormCategory, FunctionKind, FunctionTemplate, PatternTable, ProlongedHarmony, TABLE_VERSION,
};

use std::path::PathBuf;
use std::sync::Arc;

/// Errors from form-function analysis.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid template configuration: {0}")]
    Configuration(String),

    #[error("invalid annotation style '{0}': must be Prolongation or Cadential")]
    InvalidAnnotationStyle(String),

    #[error("bass scale degree {0} out of range 1-7")]
    InvalidDegree(u8),

    #[error("invalid duration {0}")]
    InvalidDuration(f64),

    #[error("invalid figured bass '{0}'")]
    InvalidFigures(String),

    #[error("pattern table parse error: {0}")]
    TableParse(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of analyzing and annotating one phrase.
#[derive(Debug, Clone)]
pub struct Report {
    pub analysis: Analysis,
    pub annotations: Vec<AnnotationRequest>,
}

/// Analysis plus write-back for whole phrases.
///
/// Reconciliation always finishes for the entire phrase before anything is
/// written, since trailing pedals need to see the next instance.
pub struct FormFunctionEngine {
    analyzer: Arc<dyn FunctionAnalyzer>,
}

impl FormFunctionEngine {
    /// Create with the table analyzer.
    pub fn new(table: PatternTable, params: AnalysisParams) -> Self {
        Self {
            analyzer: Arc::new(TableAnalyzer::new(Arc::new(table), params)),
        }
    }

    /// Built-in table, default parameters.
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(PatternTable::builtin()?, AnalysisParams::default()))
    }

    /// Create with a custom analyzer (for testing or another backend).
    pub fn with_analyzer(analyzer: Arc<dyn FunctionAnalyzer>) -> Self {
        Self { analyzer }
    }

    pub fn analyze(&self, phrase: &Phrase) -> Analysis {
        self.analyzer.analyze(phrase)
    }

    /// Analyze `phrase`, then write spans to `sink` and labels onto `phrase`.
    pub fn annotate(&self, phrase: &mut Phrase, sink: &mut dyn ScoreSink) -> Report {
        let analysis = self.analyzer.analyze(phrase);
        let annotations = write_annotations(&analysis.instances, phrase, sink);
        Report {
            analysis,
            annotations,
        }
    }
}
