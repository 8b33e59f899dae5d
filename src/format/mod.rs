//! Output formatting for listings and harvest reports (table, JSON).

use crate::commands::inspect::InspectReport;
use crate::config::OutputFormat;
use crate::engine::{CycleStats, SchedulerReport, StopReason};
use crate::listing::Listing;
use serde::Serialize;

/// Formats command output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a single stored listing.
    pub fn format_listing(&self, listing: &Listing) -> String {
        match self.format {
            OutputFormat::Json => json(listing),
            OutputFormat::Table => table_listing(listing),
        }
    }

    /// Formats the statistics of one cycle.
    pub fn format_cycle(&self, stats: &CycleStats) -> String {
        match self.format {
            OutputFormat::Json => json(stats),
            OutputFormat::Table => table_cycle(stats),
        }
    }

    /// Formats the summary of a scheduler run.
    pub fn format_scheduler(&self, report: &SchedulerReport) -> String {
        match self.format {
            OutputFormat::Json => json(report),
            OutputFormat::Table => [
                format!("Cycles:    {}", report.cycles_completed),
                format!("Faulted:   {}", report.cycles_faulted),
                format!("New saved: {}", report.listings_saved),
            ]
            .join("\n"),
        }
    }

    /// Formats a page diagnosis.
    pub fn format_inspect(&self, report: &InspectReport) -> String {
        match self.format {
            OutputFormat::Json => json(report),
            OutputFormat::Table => table_inspect(report),
        }
    }
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn table_listing(listing: &Listing) -> String {
    let mut lines = Vec::new();

    lines.push(format!("ID:       {}", listing.id));
    lines.push(format!("Title:    {}", listing.title));
    lines.push(format!("Price:    {}", listing.price));
    lines.push(format!("URL:      {}", if listing.url.is_empty() { "N/A" } else { listing.url.as_str() }));

    if !listing.location.is_empty() {
        lines.push(format!("Location: {}", listing.location));
    }
    if !listing.description.is_empty() {
        lines.push(format!("About:    {}", truncate(&listing.description, 120)));
    }
    if !listing.images.is_empty() {
        lines.push(format!("Images:   {}", listing.images.len()));
    }

    lines.push(format!("Seen:     {}", listing.created_at.format("%Y-%m-%d %H:%M:%S UTC")));

    lines.join("\n")
}

fn table_cycle(stats: &CycleStats) -> String {
    let stop = match &stats.stop_reason {
        StopReason::InsufficientListings { page, count } => {
            format!("page {} had {} listings", page, count)
        }
        StopReason::Blocked { page, keyword } => format!("page {} blocked ({})", page, keyword),
        StopReason::PageCeiling => "page limit reached".to_string(),
        StopReason::FailureCeiling => "too many failed pages".to_string(),
        StopReason::Cancelled => "cancelled".to_string(),
    };

    [
        format!("Pages processed:  {}", stats.pages_processed),
        format!("Pages skipped:    {}", stats.pages_skipped),
        format!("New listings:     {}", stats.new_listings_saved),
        format!("Duplicates:       {}", stats.duplicates),
        format!("Persist failures: {}", stats.persist_failures),
        format!("Stopped:          {}", stop),
    ]
    .join("\n")
}

fn table_inspect(report: &InspectReport) -> String {
    let selector_width = report.selectors.iter().map(|m| m.selector.len()).max().unwrap_or(8);

    let mut lines = Vec::new();
    lines.push(format!("URL:   {}", report.url));
    lines.push(format!("Title: {}", report.title.as_deref().unwrap_or("N/A")));
    lines.push(format!("Body:  {} chars", report.body_length));
    lines.push(String::new());

    lines.push(format!("{:<selector_width$}  {:>5}  {}", "Selector", "Count", "First element"));
    lines.push(format!("{:-<selector_width$}  {:-<5}  {:-<40}", "", "", ""));
    for found in &report.selectors {
        lines.push(format!(
            "{:<selector_width$}  {:>5}  {}",
            found.selector,
            found.count,
            found.preview.as_deref().unwrap_or("")
        ));
    }

    lines.push(String::new());
    if report.blocking_keywords.is_empty() {
        lines.push("No blocking indicators found.".to_string());
    } else {
        lines.push(format!(
            "WARNING: page might be blocked - found: {}",
            report.blocking_keywords.join(", ")
        ));
    }

    lines.join("\n")
}

/// Shortens `s` to at most `max` characters, marking the cut with `...`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max).collect();
    format!("{}...", kept)
}
