use std::path::Path;

use anyhow::{Context, Result};

use crate::types::ComparisonRow;

/// Summary report computed from a two-date comparison.
#[derive(Debug, Clone)]
pub struct ComparisonReport {
    pub date_a: String,
    pub date_b: String,

    // Counts
    pub contracts: usize,
    pub oi_gainers: usize,
    pub oi_losers: usize,

    // Aggregates
    pub total_oi_change: f64,
    pub avg_price_change: f64,

    // Extremes (contract, change)
    pub top_oi_gainer: Option<(String, f64)>,
    pub top_oi_loser: Option<(String, f64)>,
}

impl ComparisonReport {
    /// Build a report from comparison rows.
    pub fn from_rows(rows: &[ComparisonRow], date_a: &str, date_b: &str) -> Self {
        let contracts = rows.len();
        let oi_gainers = rows.iter().filter(|r| r.oi_change > 0.0).count();
        let oi_losers = rows.iter().filter(|r| r.oi_change < 0.0).count();

        let total_oi_change: f64 = rows.iter().map(|r| r.oi_change).sum();
        let avg_price_change = if contracts > 0 {
            rows.iter().map(|r| r.price_change).sum::<f64>() / contracts as f64
        } else {
            0.0
        };

        let top_oi_gainer = rows
            .iter()
            .max_by(|a, b| {
                a.oi_change
                    .partial_cmp(&b.oi_change)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .filter(|r| r.oi_change > 0.0)
            .map(|r| (r.contract.clone(), r.oi_change));
        let top_oi_loser = rows
            .iter()
            .min_by(|a, b| {
                a.oi_change
                    .partial_cmp(&b.oi_change)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .filter(|r| r.oi_change < 0.0)
            .map(|r| (r.contract.clone(), r.oi_change));

        Self {
            date_a: date_a.to_string(),
            date_b: date_b.to_string(),
            contracts,
            oi_gainers,
            oi_losers,
            total_oi_change,
            avg_price_change,
            top_oi_gainer,
            top_oi_loser,
        }
    }

    /// Print the full comparison table and summary to stdout.
    pub fn print(&self, rows: &[ComparisonRow]) {
        println!();
        println!("{}", "=".repeat(96));
        println!("  Comparison: {} vs {}", self.date_a, self.date_b);
        println!("{}", "=".repeat(96));
        println!();
        println!(
            "  {:<28} {:>12} {:>12} {:>12} {:>10} {:>10}",
            "Contract", "OI a", "OI b", "OI change", "Close a", "Px change"
        );
        println!("  {}", "-".repeat(90));
        for r in rows {
            println!(
                "  {:<28} {:>12.0} {:>12.0} {:>+12.0} {:>10.2} {:>+10.2}",
                r.contract, r.oi_a, r.oi_b, r.oi_change, r.close_a, r.price_change
            );
        }

        println!();
        println!("  Contracts:        {}", self.contracts);
        println!(
            "  OI gainers/losers: {} / {}",
            self.oi_gainers, self.oi_losers
        );
        println!("  Total OI change:  {:+.0}", self.total_oi_change);
        println!("  Avg price change: {:+.2}", self.avg_price_change);
        if let Some((ref c, chg)) = self.top_oi_gainer {
            println!("  Top OI gainer:    {} ({:+.0})", c, chg);
        }
        if let Some((ref c, chg)) = self.top_oi_loser {
            println!("  Top OI loser:     {} ({:+.0})", c, chg);
        }
        println!();
        println!("{}", "=".repeat(96));
        println!();
    }

    /// Export comparison rows to a CSV file (feeds external charting).
    pub fn export_csv(rows: &[ComparisonRow], path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create CSV at {}", path.display()))?;

        for r in rows {
            wtr.serialize(r)
                .with_context(|| format!("failed to write CSV row for {}", r.contract))?;
        }

        wtr.flush().context("failed to flush CSV")?;
        Ok(())
    }

    /// Render comparison rows as pretty JSON.
    pub fn to_json(rows: &[ComparisonRow]) -> Result<String> {
        serde_json::to_string_pretty(rows).context("failed to serialize comparison rows")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(contract: &str, oi_a: f64, oi_b: f64, close_a: f64, close_b: f64) -> ComparisonRow {
        ComparisonRow::new(contract.to_string(), oi_a, oi_b, close_a, close_b)
    }

    #[test]
    fn test_empty_rows() {
        let report = ComparisonReport::from_rows(&[], "2024-01-01", "2024-01-02");
        assert_eq!(report.contracts, 0);
        assert_eq!(report.oi_gainers, 0);
        assert_eq!(report.oi_losers, 0);
        assert_eq!(report.total_oi_change, 0.0);
        assert_eq!(report.avg_price_change, 0.0);
        assert!(report.top_oi_gainer.is_none());
        assert!(report.top_oi_loser.is_none());
    }

    #[test]
    fn test_aggregates() {
        let rows = vec![
            make_row("A", 100.0, 80.0, 50.0, 48.0), // oi +20, px +2
            make_row("B", 50.0, 90.0, 30.0, 33.0),  // oi -40, px -3
            make_row("C", 10.0, 10.0, 5.0, 5.0),    // flat
        ];
        let report = ComparisonReport::from_rows(&rows, "2024-01-01", "2024-01-02");

        assert_eq!(report.contracts, 3);
        assert_eq!(report.oi_gainers, 1);
        assert_eq!(report.oi_losers, 1);
        assert_eq!(report.total_oi_change, -20.0);
        assert!((report.avg_price_change - (-1.0 / 3.0)).abs() < 1e-9);
        assert_eq!(report.top_oi_gainer, Some(("A".to_string(), 20.0)));
        assert_eq!(report.top_oi_loser, Some(("B".to_string(), -40.0)));
    }

    #[test]
    fn test_all_flat_has_no_extremes() {
        let rows = vec![make_row("A", 10.0, 10.0, 5.0, 5.0)];
        let report = ComparisonReport::from_rows(&rows, "a", "b");
        assert!(report.top_oi_gainer.is_none());
        assert!(report.top_oi_loser.is_none());
    }

    #[test]
    fn test_export_csv() {
        let rows = vec![
            make_row("A", 100.0, 80.0, 50.0, 48.0),
            make_row("B", 50.0, 90.0, 30.0, 33.0),
        ];

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("compare.csv");
        ComparisonReport::export_csv(&rows, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        // Header + 2 data rows.
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("contract"));
        assert!(lines[0].contains("oi_change"));
        assert!(lines[1].starts_with("A,"));
    }

    #[test]
    fn test_to_json() {
        let rows = vec![make_row("A", 100.0, 80.0, 50.0, 48.0)];
        let json = ComparisonReport::to_json(&rows).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["contract"], "A");
        assert_eq!(parsed[0]["oi_change"], 20.0);
    }

    #[test]
    fn test_print_does_not_panic() {
        let rows = vec![make_row("A", 100.0, 80.0, 50.0, 48.0)];
        let report = ComparisonReport::from_rows(&rows, "2024-01-01", "2024-01-02");
        report.print(&rows);
    }
}
