//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the analysis code stays clean and testable
//! - output changes are localized (important for future snapshot tests)
//!
//! Empty inputs render an explicit "no rows" line rather than an empty table.

use crate::analysis::{CrossTab, Detection, GroupSummary, Summary, TimeBucket};
use crate::domain::{Dataset, Dimension, Granularity};
use crate::io::ingest::LoadReport;

const EMPTY: &str = "(no rows match the current filters)\n";

const MAX_CHOICES: usize = 12;

/// Load diagnostics: row count, date format, invalid dates, ignored columns.
pub fn format_load_report(report: &LoadReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Loaded: {} rows | dates: {}\n",
        report.rows, report.date_format
    ));
    if report.invalid_dates > 0 {
        out.push_str(&format!(
            "Warning: {} row(s) with unparseable dates (excluded from date filters and time series)\n",
            report.invalid_dates
        ));
        for sample in &report.invalid_date_samples {
            out.push_str(&format!("  line {}: '{}'\n", sample.line, sample.raw));
        }
    }
    if !report.extra_columns.is_empty() {
        out.push_str(&format!("Ignored columns: {}\n", report.extra_columns.join(", ")));
    }
    out
}

/// KPI block.
pub fn format_summary(summary: &Summary) -> String {
    let mut out = String::new();
    out.push_str("=== Sales summary ===\n");
    if summary.records == 0 {
        out.push_str(EMPTY);
        return out;
    }

    let period = match (summary.first_date, summary.last_date) {
        (Some(lo), Some(hi)) => format!("{lo} .. {hi}"),
        _ => "-".to_string(),
    };
    out.push_str(&format!("Rows: {} | period: {period}\n", summary.records));
    out.push_str(&format!("Units sold:   {:>16}\n", summary.quantity));
    out.push_str(&format!("Total sales:  {:>16}\n", fmt_money(summary.total_sales)));
    out.push_str(&format!("Total cost:   {:>16}\n", fmt_money(summary.total_cost)));
    out.push_str(&format!("Profit:       {:>16}\n", fmt_money(summary.profit)));
    out.push_str(&format!(
        "Margin:       {:>16} (mean row margin {})\n",
        fmt_pct(summary.margin_pct),
        fmt_pct(summary.mean_margin_pct)
    ));
    out.push_str(&format!("ROI:          {:>16}\n", fmt_pct(summary.roi_pct)));
    if summary.invalid_dates > 0 {
        out.push_str(&format!("Rows without a valid date: {}\n", summary.invalid_dates));
    }
    out
}

/// Values each categorical filter can take, one line per dimension.
pub fn format_filter_choices(choices: &[(Dimension, Vec<String>)]) -> String {
    let mut out = String::from("Filter values:\n");
    for (dimension, values) in choices {
        let shown: Vec<&str> = values.iter().take(MAX_CHOICES).map(String::as_str).collect();
        let mut line = format!("  {:<16} {}", dimension.display_name(), shown.join(" | "));
        if values.len() > MAX_CHOICES {
            line.push_str(&format!(" (+{} more)", values.len() - MAX_CHOICES));
        }
        push_line(&mut out, line);
    }
    out
}

/// Chronological sales/profit table.
pub fn format_time_series(series: &[TimeBucket], granularity: Granularity) -> String {
    let mut out = String::new();
    out.push_str(&format!("Sales by {}:\n", granularity_name(granularity)));
    if series.is_empty() {
        out.push_str(EMPTY);
        return out;
    }

    push_line(
        &mut out,
        format!(
            "{:<10} {:>8} {:>16} {:>16} {:>9} {:>9}",
            "period", "units", "sales", "profit", "margin", "growth"
        ),
    );
    push_line(
        &mut out,
        format!("{:-<10} {:-<8} {:-<16} {:-<16} {:-<9} {:-<9}", "", "", "", "", "", ""),
    );
    for bucket in series {
        let s = &bucket.summary;
        push_line(
            &mut out,
            format!(
                "{:<10} {:>8} {:>16} {:>16} {:>9} {:>9}",
                bucket.label(),
                s.quantity,
                fmt_money(s.total_sales),
                fmt_money(s.profit),
                fmt_pct(s.margin_pct()),
                bucket.sales_growth_pct.map(fmt_pct).unwrap_or_else(|| "-".to_string()),
            ),
        );
    }
    out
}

/// Grouped figures for one dimension.
pub fn format_groups(title: &str, dimension: Dimension, groups: &[GroupSummary]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{title}:\n"));
    if groups.is_empty() {
        out.push_str(EMPTY);
        return out;
    }

    push_line(
        &mut out,
        format!(
            "{:<24} {:>6} {:>8} {:>16} {:>16} {:>9} {:>9} {:>9}",
            dimension.display_name(),
            "rows",
            "units",
            "sales",
            "profit",
            "margin",
            "avg mgn",
            "roi"
        ),
    );
    push_line(
        &mut out,
        format!(
            "{:-<24} {:-<6} {:-<8} {:-<16} {:-<16} {:-<9} {:-<9} {:-<9}",
            "", "", "", "", "", "", "", ""
        ),
    );
    for g in groups {
        push_line(
            &mut out,
            format!(
                "{:<24} {:>6} {:>8} {:>16} {:>16} {:>9} {:>9} {:>9}",
                truncate(&g.key, 24),
                g.records,
                g.quantity,
                fmt_money(g.total_sales),
                fmt_money(g.profit),
                fmt_pct(g.margin_pct()),
                fmt_pct(g.mean_margin_pct),
                fmt_pct(g.roi_pct()),
            ),
        );
    }
    out
}

/// Sales pivot table.
pub fn format_cross_tab(tab: &CrossTab) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Sales by {} x {}:\n",
        tab.rows.display_name(),
        tab.columns.display_name()
    ));
    if tab.row_keys.is_empty() {
        out.push_str(EMPTY);
        return out;
    }

    let mut header = format!("{:<20}", "");
    for key in &tab.column_keys {
        header.push_str(&format!(" {:>14}", truncate(key, 14)));
    }
    push_line(&mut out, header);
    for (key, cells) in tab.row_keys.iter().zip(&tab.cells) {
        let mut line = format!("{:<20}", truncate(key, 20));
        for v in cells {
            line.push_str(&format!(" {:>14}", fmt_money(*v)));
        }
        push_line(&mut out, line);
    }
    out
}

/// Opportunity and anomaly tables, at most `limit` rows each.
pub fn format_detection(detection: &Detection, limit: usize) -> String {
    let mut out = String::new();
    match &detection.thresholds {
        Some(t) => out.push_str(&format!(
            "Thresholds: margin >= {} and sales >= {} (opportunity); margin <= {} or price >= {} (anomaly)\n",
            fmt_pct(t.margin_high),
            fmt_money(t.sales_floor),
            fmt_pct(t.margin_low),
            fmt_money(t.price_high),
        )),
        None => out.push_str("Thresholds: not enough rows to rank (need at least 2)\n"),
    }
    out.push('\n');

    out.push_str(&format!("Opportunities ({}):\n", detection.opportunities.len()));
    out.push_str(&format_rows(&detection.opportunities, limit));
    out.push('\n');
    out.push_str(&format!("Anomalies ({}):\n", detection.anomalies.len()));
    out.push_str(&format_rows(&detection.anomalies, limit));
    out
}

fn format_rows(dataset: &Dataset, limit: usize) -> String {
    let mut out = String::new();
    if dataset.is_empty() {
        out.push_str("(none)\n");
        return out;
    }

    push_line(
        &mut out,
        format!(
            "{:<10} {:<20} {:<12} {:>6} {:>12} {:>14} {:>9}",
            "date", "product type", "country", "units", "price", "sales", "margin"
        ),
    );
    for row in dataset.iter().take(limit) {
        let r = row.record();
        let m = row.metrics();
        push_line(
            &mut out,
            format!(
                "{:<10} {:<20} {:<12} {:>6} {:>12} {:>14} {:>9}",
                r.date.map(|d| d.to_string()).unwrap_or_else(|| "?".to_string()),
                truncate(&r.product_type, 20),
                truncate(&r.country, 12),
                r.quantity,
                fmt_money(r.sale_price),
                fmt_money(m.total_sales),
                fmt_pct(m.margin_pct),
            ),
        );
    }
    if dataset.len() > limit {
        out.push_str(&format!("... {} more\n", dataset.len() - limit));
    }
    out
}

fn granularity_name(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Day => "day",
        Granularity::Week => "week",
        Granularity::Month => "month",
        Granularity::Quarter => "quarter",
        Granularity::Year => "year",
    }
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

/// `1234567.891` -> `1,234,567.89`.
fn fmt_money(v: f64) -> String {
    let text = format!("{:.2}", v.abs());
    let (int_part, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if v < 0.0 && text != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

fn fmt_pct(v: f64) -> String {
    format!("{v:.1}%")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{DetectorConfig, detect, group_by, group_by_time, summarize};
    use crate::domain::{Row, SaleRecord};
    use chrono::NaiveDate;

    fn dataset() -> Dataset {
        let row = |d: u32, country: &str, price: f64| {
            Row::new(SaleRecord {
                date: NaiveDate::from_ymd_opt(2024, 1, d),
                date_raw: String::new(),
                product_type: "Tents".to_string(),
                product_line: "Camping".to_string(),
                quantity: 10,
                sale_price: price,
                purchase_cost: 40.0,
                ordering_method: "Web".to_string(),
                country: country.to_string(),
            })
        };
        Dataset::from_rows(vec![row(1, "AR", 100.0), row(2, "MX", 50.0), row(3, "AR", 1000.0)])
    }

    #[test]
    fn money_is_grouped() {
        assert_eq!(fmt_money(1234567.891), "1,234,567.89");
        assert_eq!(fmt_money(12.5), "12.50");
        assert_eq!(fmt_money(-1000.0), "-1,000.00");
        assert_eq!(fmt_money(0.0), "0.00");
    }

    #[test]
    fn empty_inputs_render_an_empty_state() {
        let empty = Dataset::default();
        assert!(format_summary(&summarize(&empty)).contains("no rows"));
        assert!(format_time_series(&[], Granularity::Month).contains("no rows"));
        assert!(format_groups("By country", Dimension::Country, &[]).contains("no rows"));
        let text = format_detection(&detect(&empty, &DetectorConfig::default()), 5);
        assert!(text.contains("not enough rows"));
        assert!(text.contains("Opportunities (0)"));
        assert!(text.contains("Anomalies (0)"));
    }

    #[test]
    fn tables_list_every_group() {
        let ds = dataset();
        let text = format_groups("By country", Dimension::Country, &group_by(&ds, Dimension::Country));
        assert!(text.contains("AR"));
        assert!(text.contains("MX"));
        assert!(text.contains("11,000.00"));

        let series = format_time_series(&group_by_time(&ds, Granularity::Day), Granularity::Day);
        assert_eq!(series.lines().count(), 1 + 2 + 3);
    }

    #[test]
    fn filter_choices_list_values_per_dimension() {
        let ds = dataset();
        let many: Vec<String> = (0..15).map(|i| format!("C{i:02}")).collect();
        let text = format_filter_choices(&[
            (Dimension::Country, ds.distinct(Dimension::Country)),
            (Dimension::ProductLine, many),
        ]);
        assert!(text.contains("Country          AR | MX"));
        assert!(text.contains("C11 (+3 more)"));
        assert!(!text.contains("C12"));
    }

    #[test]
    fn long_names_are_truncated() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
