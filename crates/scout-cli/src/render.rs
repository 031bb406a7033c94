use std::time::{Duration, SystemTime};

use scout_core::models::{SearchResponse, SearchResult};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const HEADERS: [&str; 5] = ["NAME", "TITLE", "COMPANY", "LOCATION", "SCORE"];

pub fn json(response: &SearchResponse) -> serde_json::Result<String> {
    serde_json::to_string_pretty(response)
}

pub fn table(response: &SearchResponse) -> String {
    let rows: Vec<[String; 5]> = response.results.iter().map(row).collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_line(&HEADERS.map(str::to_string), &widths));
    lines.extend(rows.iter().map(|row| format_line(row, &widths)));
    lines.push(format!(
        "{} results for query {} in {:.2}s",
        response.total_results, response.query_id, response.execution_time
    ));
    lines.join("\n")
}

/// `1h 02m 03s`, `4m 05s` or `6s`.
pub fn countdown(remaining: Duration) -> String {
    let total = remaining.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

pub fn timestamp(at: SystemTime) -> String {
    OffsetDateTime::from(at)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}

fn row(result: &SearchResult) -> [String; 5] {
    [
        result.name.clone(),
        result.title.clone().unwrap_or_default(),
        result.company.clone().unwrap_or_default(),
        result.location.clone().unwrap_or_default(),
        format!("{:.2}", result.relevance_score),
    ]
}

fn format_line(cells: &[String; 5], widths: &[usize; 5]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::time::UNIX_EPOCH;

    use scout_core::transport::mock::fixture_candidates;

    use super::*;

    fn response() -> SearchResponse {
        SearchResponse {
            query_id: "abc1234".to_string(),
            total_results: 3,
            results: fixture_candidates(),
            execution_time: 0.5,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn table_aligns_columns_and_summarises() {
        let table = table(&response());
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("NAME"));
        assert!(lines[1].starts_with("John Doe    "));
        assert!(lines[1].ends_with("0.95"));
        assert_eq!(lines[4], "3 results for query abc1234 in 0.50s");
    }

    #[test]
    fn countdown_picks_the_largest_unit() {
        assert_eq!(countdown(Duration::from_secs(3723)), "1h 02m 03s");
        assert_eq!(countdown(Duration::from_secs(245)), "4m 05s");
        assert_eq!(countdown(Duration::from_secs(6)), "6s");
    }

    #[test]
    fn timestamps_are_rfc3339() {
        let at = UNIX_EPOCH + Duration::from_secs(1_710_928_800);
        assert_eq!(timestamp(at), "2024-03-20T10:00:00Z");
    }
}
