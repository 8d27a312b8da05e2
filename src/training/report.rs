//! Metrics log and confusion-matrix rendering

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::training::grid::SearchSummary;
use crate::training::metrics::{ConfusionMatrix, Evaluation};
use crate::Result;

/// Shades from empty to full, by share of the largest cell
const SHADES: [char; 5] = [' ', '░', '▒', '▓', '█'];

/// Append-only, human-readable metrics log
#[derive(Debug, Clone)]
pub struct ReportLog {
    path: PathBuf,
}

impl ReportLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ReportLog {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one evaluation block, with search results when present
    pub fn append(
        &self,
        heading: &str,
        evaluation: &Evaluation,
        search: Option<&SearchSummary>,
    ) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        writeln!(
            file,
            "=== {} | {} ===",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            heading
        )?;
        if let Some(search) = search {
            writeln!(file, "best params = {}", search.best_spec)?;
            writeln!(file, "best CV accuracy = {:.4}", search.best_score)?;
            writeln!(file, "candidates = {}", search.candidates.len())?;
        }
        writeln!(file, "accuracy = {:.4}", evaluation.accuracy)?;
        writeln!(file, "confusion matrix:")?;
        write!(file, "{}", evaluation.confusion)?;
        writeln!(file, "{}", evaluation)?;

        log::debug!("Appended '{}' to {}", heading, self.path.display());
        Ok(())
    }
}

/// Confusion matrix as a shaded text grid, true classes down the side
pub fn render_heatmap(confusion: &ConfusionMatrix, labels: &[&str]) -> String {
    let counts = confusion.counts();
    let max = counts.iter().copied().max().unwrap_or(0).max(1);
    let width = labels.iter().map(|l| l.len()).max().unwrap_or(0).max(5);

    let mut out = String::new();
    out.push_str(&format!("{:>width$} │", "true\\pred", width = width.max(9)));
    for label in labels {
        out.push_str(&format!(" {:^width$} ", label, width = width));
    }
    out.push('\n');

    for (class, row) in counts.rows().into_iter().enumerate() {
        let label = labels.get(class).copied().unwrap_or("?");
        out.push_str(&format!("{:>width$} │", label, width = width.max(9)));
        for &count in row.iter() {
            let level = (count * (SHADES.len() - 1) + max / 2) / max;
            let shade: String = std::iter::repeat(SHADES[level]).take(2).collect();
            out.push_str(&format!(" {}{:>w$} ", shade, count, w = width - 2));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::tempdir;

    fn evaluation() -> Evaluation {
        Evaluation::from_confusion(ConfusionMatrix::from_counts(array![[50, 10], [5, 35]]).unwrap())
    }

    #[test]
    fn test_append_accumulates() {
        let dir = tempdir().unwrap();
        let log = ReportLog::new(dir.path().join("reports").join("metrics.txt"));

        log.append("SVM | quantile", &evaluation(), None).unwrap();
        log.append("SVM | robust", &evaluation(), None).unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.matches("=== ").count(), 2);
        assert!(content.contains("SVM | robust"));
        assert!(content.contains("accuracy = 0.8500"));
        assert!(content.contains("precision"));
    }

    #[test]
    fn test_heatmap() {
        let matrix = ConfusionMatrix::from_counts(array![[50, 10], [5, 35]]).unwrap();
        let map = render_heatmap(&matrix, &["away win", "home win"]);
        let lines: Vec<&str> = map.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains('█'));
        assert!(lines[1].contains("50"));
        assert!(lines[2].contains("35"));
    }

    #[test]
    fn test_heatmap_empty_matrix() {
        let matrix = ConfusionMatrix::from_counts(array![[0, 0], [0, 0]]).unwrap();
        let map = render_heatmap(&matrix, &["a", "b"]);
        assert_eq!(map.lines().count(), 3);
    }
}
