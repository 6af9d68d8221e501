use std::path::PathBuf;

use serde::Serialize;

use crate::date::{Fallback, FallbackMatch, PatternCatalog, RuleMatch};
use crate::scan;

/// How a filename would be classified, without parsing catalog formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Classification {
    Main { pattern: String, timestamp: String },
    Fallback { pattern: String, timestamp: String },
    None,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckEntry {
    pub filename: String,
    pub classification: Classification,
}

/// Read-only classification of every top-level file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub entries: Vec<CheckEntry>,
    pub total: u64,
    pub main: u64,
    pub fallback: u64,
    pub none: u64,
    /// Input directories that could not be listed
    pub unreadable: Vec<PathBuf>,
}

impl CheckReport {
    pub fn matched_total(&self) -> u64 {
        self.main + self.fallback
    }
}

/// A catalog rule counts as soon as its shape matches; a fallback only when
/// its date is real. Only the first matching rule is reported, with an empty
/// timestamp when its capture group took no part in the match.
pub fn classify(filename: &str, catalog: &PatternCatalog) -> Classification {
    for rule in catalog.rules() {
        let timestamp = match rule.capture(filename) {
            RuleMatch::NoMatch => continue,
            RuleMatch::Group(raw) => raw.to_string(),
            RuleMatch::EmptyGroup => String::new(),
        };
        return Classification::Main {
            pattern: rule.pattern().to_string(),
            timestamp,
        };
    }

    for fallback in Fallback::ALL {
        if let Some(FallbackMatch::Date(_, raw)) = fallback.apply(filename) {
            return Classification::Fallback {
                pattern: fallback.label().to_string(),
                timestamp: raw,
            };
        }
    }

    Classification::None
}

/// Classify every regular file in `directories`. Nothing is written or moved.
pub fn check_directories(directories: &[PathBuf], catalog: &PatternCatalog) -> CheckReport {
    let scan = scan::scan_directories(directories);
    let mut report = CheckReport {
        unreadable: scan.unreadable.into_iter().map(|(dir, _)| dir).collect(),
        ..Default::default()
    };

    for task in scan.tasks {
        let classification = classify(&task.filename, catalog);
        report.total += 1;
        match classification {
            Classification::Main { .. } => report.main += 1,
            Classification::Fallback { .. } => report.fallback += 1,
            Classification::None => report.none += 1,
        }
        report.entries.push(CheckEntry {
            filename: task.filename,
            classification,
        });
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_classify() {
        let catalog = PatternCatalog::builtin();
        assert!(matches!(
            classify("IMG__2023-05-01T143000Z.jpg", &catalog),
            Classification::Main { ref timestamp, .. } if timestamp == "2023-05-01T143000Z"
        ));
        assert_eq!(
            classify("230501-beach.jpg", &catalog),
            Classification::Fallback {
                pattern: "YYMMDD-".to_string(),
                timestamp: "2023-05-01".to_string()
            }
        );
        assert_eq!(classify("131301 x", &catalog), Classification::None);
        assert_eq!(classify("holiday.jpg", &catalog), Classification::None);
    }

    #[test]
    fn test_classify_reports_first_rule_with_empty_group() {
        let json = r#"{"patterns": [
            {"regex": "(X)?(\\d{8})", "group": 1, "formats": ["%Y"]},
            {"regex": "(\\d{8})", "group": 1, "formats": ["%Y%m%d"]}
        ]}"#;
        let catalog = PatternCatalog::from_json(json).unwrap();
        assert_eq!(
            classify("20230501.jpg", &catalog),
            Classification::Main {
                pattern: r"(X)?(\d{8})".to_string(),
                timestamp: String::new()
            }
        );
        assert_eq!(
            classify("X20230501.jpg", &catalog),
            Classification::Main {
                pattern: r"(X)?(\d{8})".to_string(),
                timestamp: "X".to_string()
            }
        );
    }

    #[test]
    fn test_check_leaves_files_alone() {
        let dir = tempdir().unwrap();
        for name in ["IMG__2023-05-01T143000Z.jpg", "230501 beach.jpg", "holiday.jpg"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("thumbnails")).unwrap();

        let report = check_directories(&[dir.path().to_path_buf()], &PatternCatalog::builtin());
        assert_eq!(report.total, 3);
        assert_eq!(report.main, 1);
        assert_eq!(report.fallback, 1);
        assert_eq!(report.none, 1);
        assert_eq!(report.matched_total(), 2);
        assert!(dir.path().join("holiday.jpg").exists());
        assert!(!dir.path().join("failed").exists());
    }
}
