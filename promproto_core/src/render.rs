//! Formats decoded metric families as colorized, human-readable text.

use colored::Colorize;
use std::io::{self, Write};

use crate::histogram::{self, BucketRange, Layout, Sign};
use crate::model::{Histogram, LabelPair, Metric, MetricFamily, MetricValue, Summary};

/// The widest a bucket's bar may be drawn, in characters
pub const BAR_WIDTH: usize = 20;

/// Render every family, in the order they were scraped
pub fn render<W: Write>(out: &mut W, families: &[MetricFamily]) -> io::Result<()> {
    for family in families {
        render_family(out, family)?;
    }
    Ok(())
}

pub fn render_family<W: Write>(out: &mut W, family: &MetricFamily) -> io::Result<()> {
    writeln!(
        out,
        "{} {}",
        family.name.bold().cyan(),
        format!("({})", family.kind.as_str()).yellow()
    )?;
    if !family.help.is_empty() {
        writeln!(out, "  {}", family.help.bright_black())?;
    }
    for metric in &family.metrics {
        render_metric(out, metric)?;
    }
    writeln!(out)
}

fn render_metric<W: Write>(out: &mut W, metric: &Metric) -> io::Result<()> {
    let labels = format_labels(&metric.labels);
    let timestamp = match metric.timestamp_ms {
        Some(ms) => format!(" {}", format!("@{}", ms).bright_black()),
        None => String::new(),
    };
    match &metric.value {
        MetricValue::Counter(value) | MetricValue::Gauge(value) | MetricValue::Untyped(value) => {
            if labels.is_empty() {
                writeln!(out, "  {}{}", format_value(*value).green(), timestamp)
            } else {
                writeln!(out, "  {} {}{}", labels, format_value(*value).green(), timestamp)
            }
        }
        MetricValue::Summary(summary) => {
            if !labels.is_empty() || !timestamp.is_empty() {
                writeln!(out, "  {}{}", labels, timestamp)?;
            }
            render_summary(out, summary)
        }
        MetricValue::Histogram(histogram) => {
            if !labels.is_empty() || !timestamp.is_empty() {
                writeln!(out, "  {}{}", labels, timestamp)?;
            }
            render_histogram(out, histogram)
        }
    }
}

fn render_summary<W: Write>(out: &mut W, summary: &Summary) -> io::Result<()> {
    writeln!(
        out,
        "    count: {}  sum: {}",
        summary.sample_count.to_string().green(),
        format_value(summary.sample_sum).green()
    )?;
    for q in &summary.quantiles {
        writeln!(
            out,
            "    p{}: {}",
            (q.quantile * 100.0) as i64,
            format_value(q.value).green()
        )?;
    }
    Ok(())
}

fn render_histogram<W: Write>(out: &mut W, histogram: &Histogram) -> io::Result<()> {
    writeln!(
        out,
        "    count: {}  sum: {}",
        histogram.sample_count.to_string().green(),
        format_value(histogram.sample_sum).green()
    )?;
    match histogram::layout(histogram) {
        Layout::Native => render_native(out, histogram),
        Layout::Classic(buckets) => {
            writeln!(out, "    {}", "classic buckets:".bright_black())?;
            for bucket in histogram::classic_ranges(buckets) {
                writeln!(
                    out,
                    "      le={}: {} {}",
                    format_value(bucket.upper),
                    bar(bucket.count as f64, BAR_WIDTH),
                    bucket.count.to_string().green()
                )?;
            }
            Ok(())
        }
        Layout::Empty => Ok(()),
    }
}

fn render_native<W: Write>(out: &mut W, histogram: &Histogram) -> io::Result<()> {
    writeln!(
        out,
        "    {}",
        format!(
            "schema: {}  zero_threshold: {}",
            histogram.schema,
            format_value(histogram.zero_threshold)
        )
        .bright_black()
    )?;
    if histogram.zero_count > 0 {
        writeln!(out, "    zero: {}", histogram.zero_count.to_string().green())?;
    }
    if !histogram.negative.spans.is_empty() {
        writeln!(out, "    {}", "negative buckets:".bright_black())?;
        let ranges = histogram::native_ranges(&histogram.negative, histogram.schema, Sign::Negative);
        render_ranges(out, &ranges)?;
    }
    if !histogram.positive.spans.is_empty() {
        writeln!(out, "    {}", "positive buckets:".bright_black())?;
        let ranges = histogram::native_ranges(&histogram.positive, histogram.schema, Sign::Positive);
        render_ranges(out, &ranges)?;
    }
    Ok(())
}

fn render_ranges<W: Write>(out: &mut W, ranges: &[BucketRange]) -> io::Result<()> {
    for range in ranges {
        writeln!(
            out,
            "      [{}, {}): {} {}",
            format_value(range.lower),
            format_value(range.upper),
            bar(range.count as f64, BAR_WIDTH),
            range.count.to_string().green()
        )?;
    }
    Ok(())
}

/// Format labels as `{name="value", ...}`, keeping their declared order.
///
/// An empty label set formats as an empty string.
pub fn format_labels(labels: &[LabelPair]) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let pairs = labels
        .iter()
        .map(|label| format!("{}=\"{}\"", label.name.magenta(), label.value.blue()))
        .collect::<Vec<_>>();
    format!("{{{}}}", pairs.join(", "))
}

/// Format a number for display.
///
/// Magnitudes of at least 1000, or below 0.001, use scientific notation with three
/// decimals (`1.000e+04`); everything else uses four significant digits (`123.5`).
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        String::from(if value > 0.0 { "+Inf" } else { "-Inf" })
    } else if value.abs() >= 1000.0 || (value.abs() < 0.001 && value != 0.0) {
        format_scientific(value)
    } else {
        format_general(value)
    }
}

fn format_scientific(value: f64) -> String {
    let formatted = format!("{:.3e}", value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => formatted,
    }
}

fn format_general(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    // The exponent after rounding to 4 significant digits decides how many decimals remain
    let exponent = format!("{:.3e}", value)
        .split_once('e')
        .and_then(|(_, exp)| exp.parse::<i32>().ok())
        .unwrap_or(0);
    let decimals = (3 - exponent).max(0) as usize;
    let formatted = format!("{:.*}", decimals, value);
    if formatted.contains('.') {
        formatted.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        formatted
    }
}

/// The width of a bar for `value`, log-scaled so that each power of ten adds `max_width / 5`.
pub fn bar_width(value: f64, max_width: usize) -> usize {
    if !(value > 0.0) {
        return 0;
    }
    let width = ((value + 1.0).log10() * max_width as f64 / 5.0).floor();
    width.min(max_width as f64) as usize
}

pub fn bar(value: f64, max_width: usize) -> String {
    let width = bar_width(value, max_width);
    if width == 0 {
        return String::new();
    }
    "█".repeat(width).blue().to_string()
}
