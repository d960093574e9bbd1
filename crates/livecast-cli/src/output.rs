//! Output formatting for CLI

use console::style;
use livecast_core::{PlayerView, QualityOption};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// One variant row in a probe report
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct LevelRow {
    #[tabled(rename = "Index")]
    pub index: usize,
    #[tabled(rename = "Label")]
    pub label: String,
    #[tabled(rename = "Bandwidth (kbps)")]
    pub bandwidth_kbps: u64,
    #[tabled(rename = "URI")]
    pub uri: String,
}

/// What `probe` learned about a manifest
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub url: String,
    /// "multivariant" or "media"
    pub kind: &'static str,
    /// Only known from a media playlist
    pub live: Option<bool>,
    pub fragments: Option<usize>,
    pub levels: Vec<LevelRow>,
    /// `None` when the selector would be hidden
    pub selector: Option<Vec<QualityOption>>,
}

pub fn print_probe(report: &ProbeReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Table => {
            println!("{} ({})", style(&report.url).bold(), report.kind);
            if report.levels.is_empty() {
                println!("No variant streams");
            } else {
                println!("{}", Table::new(report.levels.iter().cloned()).with(Style::rounded()));
            }
            println!("Selector: {}", selector_summary(report.selector.as_deref()));
        }
        OutputFormat::Text => {
            println!("Manifest: {}", style(&report.url).bold());
            println!("  Type: {}", report.kind);
            if let Some(live) = report.live {
                println!("  Live: {}", live);
            }
            if let Some(fragments) = report.fragments {
                println!("  Fragments: {}", fragments);
            }
            println!("  Levels: {}", report.levels.len());
            for level in &report.levels {
                println!(
                    "    {}. {} - {} kbps",
                    level.index, level.label, level.bandwidth_kbps
                );
            }
            println!("  Selector: {}", selector_summary(report.selector.as_deref()));
        }
    }
    Ok(())
}

fn selector_summary(options: Option<&[QualityOption]>) -> String {
    match options {
        None => "hidden (no levels)".to_string(),
        Some(options) => options
            .iter()
            .map(|o| o.label.as_str())
            .collect::<Vec<_>>()
            .join(" | "),
    }
}

/// Prints what changed between successive player views
pub struct ViewReporter {
    format: OutputFormat,
    last: Option<PlayerView>,
}

impl ViewReporter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format, last: None }
    }

    pub fn report(&mut self, view: PlayerView) -> anyhow::Result<()> {
        if self.last.as_ref() == Some(&view) {
            return Ok(());
        }

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string(&view)?),
            OutputFormat::Text | OutputFormat::Table => self.print_changes(&view),
        }
        self.last = Some(view);
        Ok(())
    }

    fn print_changes(&self, view: &PlayerView) {
        let last = self.last.as_ref();

        if last.map(|l| l.state) != Some(view.state) {
            println!("{} {}", style("state").cyan(), view.state);
        }
        if last.map(|l| &l.overlay) != Some(&view.overlay) {
            match &view.overlay {
                Some(overlay) if overlay.terminal => {
                    println!("{} {} (retry available)", style("error").red().bold(), overlay.text)
                }
                Some(overlay) => println!("{} {}", style("notice").yellow(), overlay.text),
                None if last.is_some_and(|l| l.overlay.is_some()) => {
                    println!("{} recovered", style("notice").green())
                }
                None => {}
            }
        }
        if last.map(|l| &l.quality_options) != Some(&view.quality_options) {
            println!(
                "{} {}",
                style("selector").cyan(),
                selector_summary(view.quality_options.as_deref())
            );
        }
        if last.map(|l| l.current_quality) != Some(view.current_quality) {
            if let Some(level) = view.current_quality {
                println!("{} {}", style("quality").cyan(), level.label());
            }
        }
        if last.map(|l| l.autoplay) != Some(view.autoplay) {
            if let Some(outcome) = view.autoplay {
                println!("{} {:?}", style("autoplay").cyan(), outcome);
            }
        }
        if last.map(|l| l.is_playing) != Some(view.is_playing) {
            let label = if view.is_playing { "playing" } else { "paused" };
            println!("{} {}", style("transport").cyan(), label);
        }
        if last.map(|l| l.controls_visible) != Some(view.controls_visible) {
            let label = if view.controls_visible { "shown" } else { "hidden" };
            println!("{} {}", style("controls").dim(), label);
        }
    }
}
