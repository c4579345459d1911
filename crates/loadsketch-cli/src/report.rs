//! Terminal rendering of traffic reports
//!
//! Applies ANSI colors with crossterm when enabled: overloaded components in
//! red, components within capacity in green.

use crossterm::style::{Color, Stylize};
use loadsketch::{format_rate, TrafficReport};

const OVERLOADED: &str = "OVERLOADED";
const WITHIN: &str = "ok";

fn paint(text: String, color: Color, colorize: bool) -> String {
    if colorize {
        format!("{}", text.with(color))
    } else {
        text
    }
}

/// Render a report as an aligned table
pub fn render_report(report: &TrafficReport, colorize: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Offered load: {} rps",
        format_rate(report.offered_load)
    ));
    lines.push(String::new());

    let name_width = report
        .nodes
        .iter()
        .map(|n| n.label.chars().count() + n.kind.as_str().len() + 3)
        .max()
        .unwrap_or(0);

    lines.push("Components".to_string());
    for node in &report.nodes {
        let name = format!("{} ({})", node.label, node.kind);
        let peak = node
            .peak
            .map(|p| format!("peak {}", format_rate(p)))
            .unwrap_or_else(|| "no peak".to_string());
        let status = if node.overloaded {
            paint(OVERLOADED.to_string(), Color::Red, colorize)
        } else {
            paint(WITHIN.to_string(), Color::Green, colorize)
        };
        lines.push(format!(
            "  #{:<4} {:<name_width$}  {:>12} rps  {:<16} {}",
            node.id,
            name,
            format_rate(node.inbound),
            peak,
            status,
        ));
    }

    if !report.edges.is_empty() {
        lines.push(String::new());
        lines.push("Connections".to_string());
        let label = |id| {
            report
                .node(id)
                .map(|n| n.label.as_str())
                .unwrap_or("Unknown")
        };
        for edge in &report.edges {
            lines.push(format!(
                "  #{:<4} {} → {}: {} rps",
                edge.id,
                label(edge.from),
                label(edge.to),
                format_rate(edge.rps),
            ));
        }
    }

    let overloaded = report.overloaded().count();
    lines.push(String::new());
    let summary = format!(
        "Overloaded: {} of {} components",
        overloaded,
        report.nodes.len()
    );
    lines.push(if overloaded > 0 {
        paint(summary, Color::Red, colorize)
    } else {
        summary
    });

    lines.join("\n")
}
