//! Coverage report parsing
//!
//! The upload endpoint accepts the two text formats Pulse understands: Go's
//! `coverage.out` profiles and LCOV `lcov.info` tracefiles. Both parsers
//! return the total percentage plus a per-file breakdown.

use std::collections::BTreeMap;

use crate::domain::FileCoverage;

/// Coverage file format, detected from the uploaded filename
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageFormat {
    Go,
    Lcov,
}

/// Detect the format of an uploaded coverage file by its name
pub fn detect_format(filename: &str) -> Option<CoverageFormat> {
    let name = filename.to_lowercase();
    if name.ends_with("coverage.out") || name.contains("cover") {
        Some(CoverageFormat::Go)
    } else if name.ends_with("lcov.info") || name.contains("lcov") {
        Some(CoverageFormat::Lcov)
    } else {
        None
    }
}

/// Parse a report in the given format
pub fn parse(format: CoverageFormat, input: &str) -> (f64, Vec<FileCoverage>) {
    match format {
        CoverageFormat::Go => parse_go_coverage(input),
        CoverageFormat::Lcov => parse_lcov_coverage(input),
    }
}

/// Parse a Go `coverage.out` profile
///
/// Lines look like `path/file.go:10.2,12.5 3 1`: statement count, then hit
/// count. Statements from blocks with a non-zero hit count are covered.
pub fn parse_go_coverage(input: &str) -> (f64, Vec<FileCoverage>) {
    struct FileStat {
        total: i64,
        covered: i64,
    }

    let mut stats: BTreeMap<String, FileStat> = BTreeMap::new();

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("mode:") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }

        let Some(file_path) = parts[0].split(':').next() else {
            continue;
        };
        let stmts: i64 = parts[parts.len() - 2].parse().unwrap_or(0);
        let count: i64 = parts[parts.len() - 1].parse().unwrap_or(0);

        let stat = stats.entry(file_path.to_string()).or_insert(FileStat {
            total: 0,
            covered: 0,
        });
        stat.total += stmts;
        if count > 0 {
            stat.covered += stmts;
        }
    }

    let mut total_stmts = 0i64;
    let mut covered_stmts = 0i64;
    let mut breakdown = Vec::with_capacity(stats.len());
    for (path, stat) in stats {
        let percentage = if stat.total > 0 {
            stat.covered as f64 / stat.total as f64 * 100.0
        } else {
            0.0
        };
        breakdown.push(FileCoverage {
            file_path: path,
            percentage,
        });
        total_stmts += stat.total;
        covered_stmts += stat.covered;
    }

    let total = if total_stmts > 0 {
        covered_stmts as f64 / total_stmts as f64 * 100.0
    } else {
        0.0
    };

    (total, breakdown)
}

/// Parse an LCOV tracefile: `SF:` opens a file record, `LF:`/`LH:` carry
/// found/hit line counts, `end_of_record` closes it
pub fn parse_lcov_coverage(input: &str) -> (f64, Vec<FileCoverage>) {
    let mut breakdown = Vec::new();
    let mut current_file = String::new();
    let mut total_found = 0i64;
    let mut total_hit = 0i64;
    let mut file_found = 0i64;
    let mut file_hit = 0i64;

    for line in input.lines() {
        if let Some(path) = line.strip_prefix("SF:") {
            current_file = path.to_string();
            file_found = 0;
            file_hit = 0;
        } else if let Some(found) = line.strip_prefix("LF:") {
            file_found = found.trim().parse().unwrap_or(0);
            total_found += file_found;
        } else if let Some(hit) = line.strip_prefix("LH:") {
            file_hit = hit.trim().parse().unwrap_or(0);
            total_hit += file_hit;
        } else if line == "end_of_record" {
            let percentage = if file_found > 0 {
                file_hit as f64 / file_found as f64 * 100.0
            } else {
                0.0
            };
            breakdown.push(FileCoverage {
                file_path: current_file.clone(),
                percentage,
            });
        }
    }

    let total = if total_found > 0 {
        total_hit as f64 / total_found as f64 * 100.0
    } else {
        0.0
    };

    (total, breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("coverage.out"), Some(CoverageFormat::Go));
        assert_eq!(detect_format("ci/covered.txt"), Some(CoverageFormat::Go));
        assert_eq!(detect_format("lcov.info"), Some(CoverageFormat::Lcov));
        assert_eq!(detect_format("build/LCOV.info"), Some(CoverageFormat::Lcov));
        assert_eq!(detect_format("report.xml"), None);
    }

    #[test]
    fn test_go_coverage_totals() {
        let input = "mode: set\n\
                     example.com/pkg/a.go:3.1,5.2 2 1\n\
                     example.com/pkg/a.go:7.1,9.2 2 0\n\
                     example.com/pkg/b.go:1.1,2.2 4 3\n";
        let (total, files) = parse_go_coverage(input);

        // a.go: 2 of 4 statements, b.go: 4 of 4 => 6 of 8 overall
        assert!((total - 75.0).abs() < f64::EPSILON);
        assert_eq!(files.len(), 2);

        let a = files.iter().find(|f| f.file_path.ends_with("a.go")).unwrap();
        assert!((a.percentage - 50.0).abs() < f64::EPSILON);
        let b = files.iter().find(|f| f.file_path.ends_with("b.go")).unwrap();
        assert!((b.percentage - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_go_coverage_skips_malformed_lines() {
        let input = "mode: atomic\nnot a coverage line\nx.go:1.1,2.2 1 1\n";
        let (total, files) = parse_go_coverage(input);
        assert!((total - 100.0).abs() < f64::EPSILON);
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_go_coverage_empty_input() {
        let (total, files) = parse_go_coverage("");
        assert_eq!(total, 0.0);
        assert!(files.is_empty());
    }

    #[test]
    fn test_lcov_totals() {
        let input = "TN:\n\
                     SF:src/app.js\n\
                     LF:10\n\
                     LH:8\n\
                     end_of_record\n\
                     SF:src/util.js\n\
                     LF:10\n\
                     LH:2\n\
                     end_of_record\n";
        let (total, files) = parse_lcov_coverage(input);

        assert!((total - 50.0).abs() < f64::EPSILON);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_path, "src/app.js");
        assert!((files[0].percentage - 80.0).abs() < f64::EPSILON);
        assert!((files[1].percentage - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_lcov_file_without_lines() {
        let input = "SF:empty.js\nend_of_record\n";
        let (total, files) = parse_lcov_coverage(input);
        assert_eq!(total, 0.0);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].percentage, 0.0);
    }
}
