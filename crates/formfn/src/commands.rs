//! CLI command implementations

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use formconf::{ConfigSources, FormConfig};
use formfunction::{
    AnalysisParams, AnnotationRequest, FormFunctionEngine, FunctionTemplate, LabelStatus,
    PatternTable, PedalFigures, Phrase, RecordingSink, Report,
};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::debug;

use crate::input::parse_events;

/// Output format for `analyze`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Custom table from `--table`, then config, else the built-in one.
pub fn load_table(config: &FormConfig, table_override: Option<&Path>) -> Result<PatternTable> {
    match table_override.or(config.table.path.as_deref()) {
        Some(path) => {
            debug!(path = %path.display(), "loading pattern table");
            PatternTable::from_path(path)
                .with_context(|| format!("Failed to load pattern table {}", path.display()))
        }
        None => Ok(PatternTable::builtin()?),
    }
}

pub fn analysis_params(config: &FormConfig) -> AnalysisParams {
    AnalysisParams {
        window_lengths: config.analysis.window_lengths.clone(),
        pedal: PedalFigures {
            end: config.analysis.pedal_end_figure,
            middle: config.analysis.pedal_middle_figure,
        },
    }
}

fn read_input(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read harmony events from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read {}", source))
    }
}

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    annotations: &'a [AnnotationRequest],
    labels: &'a [LabelStatus],
    unmatched_windows: usize,
}

/// Label a phrase and print the result.
pub fn analyze(
    config: &FormConfig,
    source: &str,
    table_override: Option<&Path>,
    format: OutputFormat,
    color: bool,
) -> Result<()> {
    let events = parse_events(&read_input(source)?)?;
    if events.is_empty() {
        bail!("No harmony events in {}", source);
    }

    let table = load_table(config, table_override)?;
    let engine = FormFunctionEngine::new(table, analysis_params(config));

    let mut phrase = Phrase::new(events);
    let mut sink = RecordingSink::default();
    let report = engine.annotate(&mut phrase, &mut sink);

    match format {
        OutputFormat::Json => {
            let output = AnalyzeOutput {
                annotations: &report.annotations,
                labels: phrase.labels(),
                unmatched_windows: report.analysis.unmatched_windows,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => print!("{}", render_text(&phrase, &report, color)),
    }

    Ok(())
}

fn render_text(phrase: &Phrase, report: &Report, color: bool) -> String {
    let mut out = String::new();

    out.push_str(&format!("Phrase: {} events\n", phrase.len()));
    for (i, (event, status)) in phrase.events().iter().zip(phrase.labels()).enumerate() {
        let status_text = match status {
            LabelStatus::Assigned(labels) => {
                let joined = labels.join("; ");
                if color {
                    joined.bright_green().to_string()
                } else {
                    joined
                }
            }
            LabelStatus::Covered => "·".to_string(),
            LabelStatus::Unassigned => {
                if color {
                    "unassigned".dimmed().to_string()
                } else {
                    "unassigned".to_string()
                }
            }
        };
        out.push_str(&format!(
            "  {:>3}  {} {:<5} {}\n",
            i,
            event.bass_degree(),
            event.figures().to_string(),
            status_text
        ));
    }

    out.push_str(&format!("\nAnnotations: {}\n", report.annotations.len()));
    for request in &report.annotations {
        let style = match request.style.placement() {
            formfunction::Placement::Above => "above",
            formfunction::Placement::Below => "below",
        };
        let span = format!("[{}-{}]", request.start, request.end);
        if color {
            out.push_str(&format!(
                "  {} {} {}\n",
                span.bright_cyan(),
                style.dimmed(),
                request.label.bold()
            ));
        } else {
            out.push_str(&format!("  {} {} {}\n", span, style, request.label));
        }
    }

    if report.analysis.unmatched_windows > 0 {
        out.push_str(&format!(
            "\nUnmatched windows: {}\n",
            report.analysis.unmatched_windows
        ));
    }

    out
}

fn render_template(template: &FunctionTemplate) -> String {
    let degrees: Vec<String> = template.bass_degrees.iter().map(|d| d.to_string()).collect();
    let figures: Vec<String> = template
        .required_figures
        .iter()
        .map(|f| f.map_or_else(|| "-".to_string(), |n| n.to_string()))
        .collect();
    format!(
        "{:<10} {:<10} {:<14} {}",
        degrees.join(" "),
        figures.join(" "),
        template.short_label(),
        template.functional_label()
    )
}

/// List the pattern table rows, optionally only one window length.
pub fn table(
    config: &FormConfig,
    table_override: Option<&Path>,
    length: Option<usize>,
    color: bool,
) -> Result<()> {
    let table = load_table(config, table_override)?;
    let lengths: Vec<usize> = match length {
        Some(n) if n == 3 || n == 4 => vec![n],
        Some(n) => bail!("No table rows of length {}: use 3 or 4", n),
        None => vec![3, 4],
    };

    println!("Pattern table v{}", table.version());
    for len in lengths {
        let heading = format!("{}-event templates", len);
        if color {
            println!("\n{}", heading.bright_cyan());
        } else {
            println!("\n{}", heading);
        }
        for template in table.rows(len) {
            println!("  {}", render_template(template));
        }
    }

    Ok(())
}

/// Print the effective configuration.
pub fn show_config(config: &FormConfig, sources: &ConfigSources) {
    for path in &sources.files {
        println!("# loaded: {}", path.display());
    }
    for var in &sources.env_overrides {
        println!("# env override: {}", var);
    }
    print!("{}", config.to_toml());
}
