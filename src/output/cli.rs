use crate::model::{Category, ScanOutcome, ScanReport};
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt::Write;
use tabled::{settings::Style, Table, Tabled};

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

#[derive(Tabled)]
struct AppRow {
    #[tabled(rename = "Runtime")]
    category: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Running")]
    running: String,
    #[tabled(rename = "Path")]
    path: String,
}

pub fn print_cli_table(outcome: &ScanOutcome) -> Result<()> {
    print!("{}", render_table(outcome));
    Ok(())
}

pub(crate) fn render_table(outcome: &ScanOutcome) -> String {
    let mut out = String::new();

    match outcome {
        ScanOutcome::NothingFound {
            scan_time,
            hint,
            cancelled,
        } => {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "Scan completed at: {}",
                scan_time.format("%Y-%m-%d %H:%M:%S UTC")
            );
            let _ = writeln!(out);
            if *cancelled {
                let _ = writeln!(out, "Scan was cancelled before anything was found.");
            } else {
                let _ = writeln!(out, "{}", hint);
            }
        }
        ScanOutcome::Detected(report) => render_report(&mut out, report),
    }

    out
}

fn render_report(out: &mut String, report: &ScanReport) {
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Scan completed at: {}",
        report.scan_time.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Found {} Chromium-based applications ({}):",
        report.apps.len(),
        pretty_size(report.total_size)
    );
    let _ = writeln!(out);

    let rows: Vec<AppRow> = report
        .sorted_by_size()
        .into_iter()
        .map(|app| AppRow {
            category: app.category.display_name().to_string(),
            name: truncate(&app.name(), 32),
            size: pretty_size(app.size_bytes),
            running: if app.running { "yes" } else { "" }.to_string(),
            path: truncate_start(&app.path.display().to_string(), 60),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    let _ = writeln!(out, "{}", table);

    // Summary
    let mut by_category: BTreeMap<Category, usize> = BTreeMap::new();
    for app in &report.apps {
        *by_category.entry(app.category).or_default() += 1;
    }
    let running = report.apps.iter().filter(|a| a.running).count();

    let _ = writeln!(out);
    let _ = writeln!(out, "Summary:");
    let _ = writeln!(
        out,
        "  Total applications: {} ({})",
        report.apps.len(),
        pretty_size(report.total_size)
    );
    if by_category.len() > 1 {
        let breakdown: Vec<String> = by_category
            .iter()
            .map(|(c, n)| format!("{} {}", n, c.display_name()))
            .collect();
        let _ = writeln!(out, "  By runtime: {}", breakdown.join(", "));
    }
    if running > 0 {
        let _ = writeln!(out, "  Currently running: {}", running);
    }
    if report.cancelled {
        let _ = writeln!(out, "  Scan was cancelled; results are partial.");
    }
}

/// Formats a byte count with two decimals in base-1024 units.
pub fn pretty_size(bytes: u64) -> String {
    let mut len = bytes as f64;
    let mut order = 0;
    while len >= 1024.0 && order < SIZE_UNITS.len() - 1 {
        order += 1;
        len /= 1024.0;
    }
    format!("{:.2} {}", len, SIZE_UNITS[order])
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

/// Like `truncate`, but keeps the end: the tail of a path is the useful part.
fn truncate_start(s: &str, max_len: usize) -> String {
    let count = s.chars().count();
    if count <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().skip(count - (max_len - 3)).collect();
        format!("...{}", kept)
    }
}
