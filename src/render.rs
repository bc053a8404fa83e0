use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use prettytable::{format, row, Table};

use crate::classifier::{FloorPoint, RarityScore, StructuredAnalysis};

const BAR_WIDTH: f64 = 40.0;

/// Render everything a structured analysis carries, table first.
pub fn render_analysis(analysis: &StructuredAnalysis) -> String {
    let mut out = String::new();
    if let Some(summary) = &analysis.summary {
        out.push_str(&format!("Summary: {}\n\n", summary));
    }
    if !analysis.rarity_scores.is_empty() {
        out.push_str("Rarity scores\n");
        out.push_str(&rarity_table(&analysis.rarity_scores));
        out.push('\n');
    }
    if !analysis.floor_history.is_empty() {
        out.push_str("Floor history\n");
        out.push_str(&floor_history(&analysis.floor_history));
    }
    out
}

pub fn rarity_table(scores: &[RarityScore]) -> String {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(row!["#", "token_id", "rank", "score", "traits", "image"]);

    for (idx, item) in scores.iter().enumerate() {
        table.add_row(row![
            idx + 1,
            item.token_id.as_deref().unwrap_or("-"),
            item.rank.map(|r| r.to_string()).unwrap_or_default(),
            item.score.map(|s| format!("{:.2}", s)).unwrap_or_default(),
            item.traits.join(", "),
            item.image.as_deref().unwrap_or("")
        ]);
    }

    table.to_string()
}

/// Floor prices as a horizontal bar series. Falls back to the raw points when
/// a timestamp cannot be understood.
pub fn floor_history(points: &[FloorPoint]) -> String {
    let parsed: Option<Vec<DateTime<Utc>>> =
        points.iter().map(|p| parse_timestamp(&p.timestamp)).collect();

    let Some(times) = parsed else {
        let raw: Vec<String> = points
            .iter()
            .map(|p| format!("{} {}", p.timestamp, price_label(p.floor_price)))
            .collect();
        return format!("Floor history (raw): {}\n", raw.join("; "));
    };

    let max = points
        .iter()
        .filter_map(|p| p.floor_price)
        .fold(0.0_f64, f64::max);

    let mut out = String::new();
    for (time, point) in times.iter().zip(points) {
        let width = match point.floor_price {
            Some(price) if max > 0.0 => ((price / max) * BAR_WIDTH).round().max(0.0) as usize,
            _ => 0,
        };
        out.push_str(&format!(
            "{}  {:>10}  {}\n",
            time.format("%Y-%m-%d %H:%M"),
            price_label(point.floor_price),
            "█".repeat(width)
        ));
    }
    out
}

fn price_label(price: Option<f64>) -> String {
    price.map(|p| format!("{:.4}", p)).unwrap_or_else(|| "-".to_string())
}

/// Accepts RFC 3339, `YYYY-MM-DD[ HH:MM:SS]`, and Unix seconds or milliseconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    if let Ok(number) = raw.parse::<f64>() {
        // Values past year 33658 in seconds are taken as milliseconds.
        let millis = if number.abs() >= 1e12 {
            number
        } else {
            number * 1000.0
        };
        return DateTime::from_timestamp_millis(millis as i64);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(ts: &str, price: f64) -> FloorPoint {
        FloorPoint {
            timestamp: ts.to_string(),
            floor_price: Some(price),
        }
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = "2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(parse_timestamp("2024-01-01T00:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01 00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01"), Some(expected));
        assert_eq!(parse_timestamp("1704067200"), Some(expected));
        assert_eq!(parse_timestamp("1704067200000"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_rarity_table_contains_rows() {
        let scores = vec![RarityScore {
            token_id: Some("7".into()),
            rank: Some(1),
            score: Some(99.1),
            traits: vec!["gold".into(), "hat".into()],
            image: None,
            price: Some(2.0),
        }];
        let table = rarity_table(&scores);
        assert!(table.contains("token_id"));
        assert!(table.contains("99.10"));
        assert!(table.contains("gold, hat"));
    }

    #[test]
    fn test_floor_history_bars_scale_to_max() {
        let out = floor_history(&[point("2024-01-01", 1.0), point("2024-01-02", 2.0)]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].matches('█').count(), 20);
        assert_eq!(lines[1].matches('█').count(), 40);
    }

    #[test]
    fn test_floor_history_raw_fallback() {
        let out = floor_history(&[point("last week", 1.0)]);
        assert!(out.starts_with("Floor history (raw):"));
        assert!(out.contains("last week"));
    }
}
