use std::fmt;
use std::fs;
use std::path::Path;
use csv::Writer;

use crate::analysis::LeafMetrics;
use crate::config::Config;
use crate::errors::Result;

/// One CSV row: a single leaf and the frame it came from
#[derive(Debug, Clone, PartialEq)]
pub struct LeafRecord {
    pub filename: String,
    /// 1-based position of the leaf within its frame
    pub leaf_index: usize,
    pub total_leaves_in_image: usize,
    pub metrics: LeafMetrics,
}

impl LeafRecord {
    pub fn new(filename: &str, leaf_index: usize, total_leaves_in_image: usize, metrics: LeafMetrics) -> Self {
        Self {
            filename: filename.to_string(),
            leaf_index,
            total_leaves_in_image,
            metrics,
        }
    }
}

const RESULTS_HEADER: [&str; 10] = [
    "filename",
    "leaf_index",
    "total_leaves_in_image",
    "leaf_area_px",
    "healthy_area_px",
    "necrosis_area_px",
    "chlorosis_area_px",
    "percent_healthy",
    "percent_necrosis",
    "percent_chlorosis",
];

/// Write per-leaf results to CSV
pub fn write_results_csv<P: AsRef<Path>>(records: &[LeafRecord], output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();

    // Create directory if it doesn't exist
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(output_path)?;
    writer.write_record(RESULTS_HEADER)?;

    for record in records {
        let m = &record.metrics;
        writer.write_record(&[
            record.filename.clone(),
            record.leaf_index.to_string(),
            record.total_leaves_in_image.to_string(),
            m.leaf_area_px.to_string(),
            m.healthy_area_px.to_string(),
            m.necrosis_area_px.to_string(),
            m.chlorosis_area_px.to_string(),
            format!("{:.2}", m.percent_healthy),
            format!("{:.2}", m.percent_necrosis),
            format!("{:.2}", m.percent_chlorosis),
        ])?;
    }

    writer.flush()?;

    Ok(())
}

/// Aggregates over every leaf of a batch run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub total_leaves: usize,
    pub mean_percent_healthy: f64,
    pub mean_percent_necrosis: f64,
    pub mean_percent_chlorosis: f64,
    /// Leaf count per source file, in first-seen order
    pub leaves_per_file: Vec<(String, usize)>,
}

impl BatchSummary {
    /// Summarize records; `None` when there is nothing to summarize
    pub fn from_records(records: &[LeafRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let n = records.len() as f64;
        let mean = |f: fn(&LeafMetrics) -> f64| records.iter().map(|r| f(&r.metrics)).sum::<f64>() / n;

        let mut leaves_per_file: Vec<(String, usize)> = Vec::new();
        for record in records {
            match leaves_per_file.iter_mut().find(|(name, _)| *name == record.filename) {
                Some((_, count)) => *count += 1,
                None => leaves_per_file.push((record.filename.clone(), 1)),
            }
        }

        Some(Self {
            total_leaves: records.len(),
            mean_percent_healthy: mean(|m| m.percent_healthy),
            mean_percent_necrosis: mean(|m| m.percent_necrosis),
            mean_percent_chlorosis: mean(|m| m.percent_chlorosis),
            leaves_per_file,
        })
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total leaves: {}", self.total_leaves)?;
        writeln!(f, "Images with leaves: {}", self.leaves_per_file.len())?;
        writeln!(f, "Average healthy: {:.2}%", self.mean_percent_healthy)?;
        writeln!(f, "Average necrosis: {:.2}%", self.mean_percent_necrosis)?;
        writeln!(f, "Average chlorosis: {:.2}%", self.mean_percent_chlorosis)?;
        for (filename, count) in &self.leaves_per_file {
            writeln!(f, "{}: {} leaves", filename, count)?;
        }
        Ok(())
    }
}

/// Write the run summary plus the thresholds it was produced with
pub fn write_summary<P: AsRef<Path>>(
    summary: &BatchSummary,
    config: &Config,
    timestamp: &str,
    output_path: P,
) -> Result<()> {
    let mut content = format!("Leaf Necrosis Analysis Summary - {}\n", timestamp);
    content.push_str("----------------------------------------\n");
    content.push_str(&summary.to_string());
    content.push_str("----------------------------------------\n");
    content.push_str(&format!("Necrosis hue: {}\n", config.necrosis_hue));
    content.push_str(&format!("Chlorosis hue: {}\n", config.chlorosis_hue));
    content.push_str(&format!("Healthy hue: {}\n", config.healthy_hue));

    fs::write(output_path, content)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn record(filename: &str, index: usize, total: usize, necrosis: u64) -> LeafRecord {
        LeafRecord::new(filename, index, total, LeafMetrics::from_areas(1000, necrosis, 0))
    }

    #[test]
    fn test_summary_of_empty_batch() {
        assert!(BatchSummary::from_records(&[]).is_none());
    }

    #[test]
    fn test_summary_means_and_counts() {
        let records = vec![
            record("plate_b", 1, 2, 100),
            record("plate_b", 2, 2, 300),
            record("plate_a", 1, 1, 0),
        ];
        let summary = BatchSummary::from_records(&records).unwrap();

        assert_eq!(summary.total_leaves, 3);
        assert_approx_eq!(summary.mean_percent_necrosis, 40.0 / 3.0, 1e-9);
        assert_approx_eq!(summary.mean_percent_healthy, 260.0 / 3.0, 1e-9);
        assert_eq!(
            summary.leaves_per_file,
            vec![("plate_b".to_string(), 2), ("plate_a".to_string(), 1)]
        );

        let text = summary.to_string();
        assert!(text.contains("Total leaves: 3"));
        assert!(text.contains("plate_b: 2 leaves"));
    }

    #[test]
    fn test_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        write_results_csv(&[record("plate_a", 1, 1, 7)], &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next().unwrap(), RESULTS_HEADER.join(","));
        assert_eq!(lines.next().unwrap(), "plate_a,1,1,1000,993,7,0,99.30,0.70,0.00");
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_csv_half_hundredths_round_to_even() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let leaf = LeafRecord::new("plate_c", 1, 1, LeafMetrics::from_areas(32, 1, 0));
        write_results_csv(&[leaf], &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().nth(1).unwrap(), "plate_c,1,1,32,31,1,0,96.88,3.12,0.00");
    }

    #[test]
    fn test_summary_file_lists_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis_summary.txt");
        let summary = BatchSummary::from_records(&[record("plate_a", 1, 1, 0)]).unwrap();

        write_summary(&summary, &Config::default(), "20240101_120000", &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Leaf Necrosis Analysis Summary - 20240101_120000"));
        assert!(content.contains("Necrosis hue: 21"));
    }
}
