// src/core/test_coverage.rs
use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use super::patterns::matches_any_regex;
use super::repository::{extension_of, is_vendored_path, RepositoryFile};

const CODE_EXTENSIONS: &[&str] = &[
    "js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts", "vue", "svelte", "py", "go", "rs", "java", "kt",
    "kts", "scala", "cs", "fs", "rb", "php", "swift", "dart", "ex", "exs", "c", "cc", "cpp", "h", "hpp",
];

static TEST_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\.(?:test|spec)\.[A-Za-z0-9]+$",
        r"(?i)(?:^|/)(?:test|tests|__tests__|spec|specs|e2e|testing|androidtest|uitests)/",
        r"(?:^|/)test_[^/]*\.py$",
        r"(?:^|/)conftest\.py$",
        r"_test\.py$",
        r"_test\.go$",
        r"_(?:spec|test)\.rb$",
        r"Tests?\.(?:java|cs|swift)$",
        r"Test\.kt$",
        r"_test\.(?:dart|exs)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid test pattern"))
    .collect()
});

static GENERATED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\.d\.ts$",
        r"\.min\.js$",
        r"\.pb\.go$",
        r"_pb2(?:_grpc)?\.py$",
        r"\.generated\.",
        r"\.g\.dart$",
        r"(?i)\.designer\.cs$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid generated-file pattern"))
    .collect()
});

/// Node test runners in detection priority order
const NODE_TEST_FRAMEWORKS: &[(&str, &str)] = &[
    ("vitest", "Vitest"),
    ("jest", "Jest"),
    ("mocha", "Mocha"),
    ("jasmine", "Jasmine"),
    ("ava", "AVA"),
    ("tap", "node-tap"),
    ("@playwright/test", "Playwright"),
    ("cypress", "Cypress"),
    ("karma", "Karma"),
    ("uvu", "uvu"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    /// Test files per source file, two decimals
    pub test_to_source_ratio: f64,
}

/// File-count approximation of test coverage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCoverageInsight {
    /// 0..=100
    pub percentage: u32,
    pub tested_files: usize,
    /// Number of source files
    pub total_files: usize,
    pub test_files: Vec<String>,
    #[serde(default)]
    pub test_framework: Option<String>,
    /// Truncated for display
    pub untested_files: Vec<String>,
    pub quality_metrics: QualityMetrics,
}

impl TestCoverageInsight {
    pub fn empty() -> Self {
        Self {
            percentage: 0,
            tested_files: 0,
            total_files: 0,
            test_files: Vec::new(),
            test_framework: None,
            untested_files: Vec::new(),
            quality_metrics: QualityMetrics {
                test_to_source_ratio: 0.0,
            },
        }
    }
}

fn is_code_file(path: &str) -> bool {
    extension_of(path).is_some_and(|ext| CODE_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_test_file(path: &str) -> bool {
    is_code_file(path) && !is_vendored_path(path) && matches_any_regex(path, &TEST_PATTERNS)
}

pub fn is_source_file(path: &str) -> bool {
    is_code_file(path)
        && !is_test_file(path)
        && !is_vendored_path(path)
        && !matches_any_regex(path, &GENERATED_PATTERNS)
}

/// Lowercased file name without its final extension
fn stem(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    stem.to_lowercase()
}

fn node_test_framework(files: &[RepositoryFile]) -> Option<&'static str> {
    let mut declared: BTreeSet<String> = BTreeSet::new();

    for file in files {
        if file.file_name() != "package.json" || is_vendored_path(&file.path) {
            continue;
        }
        let json: serde_json::Value = match serde_json::from_str(&file.content) {
            Ok(json) => json,
            Err(e) => {
                debug!("Ignoring {} for framework detection: {}", file.path, e);
                continue;
            }
        };
        for section in ["dependencies", "devDependencies"] {
            if let Some(entries) = json.get(section).and_then(|v| v.as_object()) {
                declared.extend(entries.keys().cloned());
            }
        }
    }

    NODE_TEST_FRAMEWORKS
        .iter()
        .find(|(package, _)| declared.contains(*package))
        .map(|(_, label)| *label)
}

fn any_file_named(files: &[RepositoryFile], predicate: impl Fn(&str) -> bool) -> bool {
    files.iter().any(|f| predicate(f.file_name()))
}

fn convention_test_framework(files: &[RepositoryFile]) -> Option<&'static str> {
    if any_file_named(files, |n| {
        n == "conftest.py" || (n.starts_with("test_") && n.ends_with(".py")) || n.ends_with("_test.py")
    }) {
        return Some("pytest");
    }
    if any_file_named(files, |n| n.ends_with("_test.go")) {
        return Some("Go testing");
    }
    if any_file_named(files, |n| n.ends_with("_spec.rb")) {
        return Some("RSpec");
    }
    if files
        .iter()
        .any(|f| f.path.ends_with(".rs") && f.content.contains("#[test]"))
    {
        return Some("cargo test");
    }
    if any_file_named(files, |n| {
        n.ends_with("Test.java") || n.ends_with("Tests.java") || n.ends_with("Test.kt")
    }) {
        return Some("JUnit");
    }
    None
}

/// Detect the test framework from Node manifests, then filename conventions
pub fn detect_test_framework(files: &[RepositoryFile]) -> Option<String> {
    node_test_framework(files)
        .or_else(|| convention_test_framework(files))
        .map(str::to_string)
}

pub struct TestCoverageEstimator {
    max_untested_files: usize,
}

impl TestCoverageEstimator {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            max_untested_files: config.max_untested_files,
        }
    }

    pub fn analyze(&self, files: &[RepositoryFile]) -> TestCoverageInsight {
        if files.is_empty() {
            return TestCoverageInsight::empty();
        }

        let test_files: Vec<String> = files
            .iter()
            .filter(|f| is_test_file(&f.path))
            .map(|f| f.path.clone())
            .collect();
        let source_files: Vec<&str> = files
            .iter()
            .filter(|f| is_source_file(&f.path))
            .map(|f| f.path.as_str())
            .collect();

        let tests = test_files.len();
        let sources = source_files.len();

        let percentage = if sources == 0 {
            0
        } else {
            ((100.0 * tests as f64 / sources as f64).round() as u32).min(100)
        };

        let lowercase_tests: Vec<String> = test_files.iter().map(|p| p.to_lowercase()).collect();
        let mut untested: Vec<String> = source_files
            .iter()
            .filter(|path| {
                let stem = stem(path);
                !lowercase_tests.iter().any(|test| test.contains(&stem))
            })
            .map(|path| path.to_string())
            .collect();

        let mut tested_files = sources - untested.len();
        if tests > 0 && sources > 0 {
            tested_files = tested_files.max(1);
        }

        let ratio = if sources == 0 {
            0.0
        } else {
            (tests as f64 / sources as f64 * 100.0).round() / 100.0
        };

        debug!(
            "Coverage: {} test files, {} source files, {} untested",
            tests,
            sources,
            untested.len()
        );
        untested.truncate(self.max_untested_files);

        TestCoverageInsight {
            percentage,
            tested_files,
            total_files: sources,
            test_files,
            test_framework: detect_test_framework(files),
            untested_files: untested,
            quality_metrics: QualityMetrics {
                test_to_source_ratio: ratio,
            },
        }
    }
}

impl Default for TestCoverageEstimator {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

/// Estimate coverage with the reference display cap
pub fn analyze_test_coverage(files: &[RepositoryFile]) -> TestCoverageInsight {
    TestCoverageEstimator::default().analyze(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> Vec<RepositoryFile> {
        paths.iter().map(|p| RepositoryFile::new(*p, "")).collect()
    }

    #[test]
    fn test_button_and_its_test() {
        let coverage = analyze_test_coverage(&files(&[
            "src/components/Button.tsx",
            "src/components/Button.test.tsx",
        ]));

        assert_eq!(coverage.test_files, vec!["src/components/Button.test.tsx"]);
        assert_eq!(coverage.total_files, 1);
        assert!(coverage.untested_files.is_empty());
        assert_eq!(coverage.tested_files, 1);
        assert_eq!(coverage.percentage, 100);
        assert_eq!(coverage.quality_metrics.test_to_source_ratio, 1.0);
    }

    #[test]
    fn test_classification() {
        assert!(is_test_file("tests/test_api.py"));
        assert!(is_test_file("pkg/server/handler_test.go"));
        assert!(is_test_file("spec/models/user_spec.rb"));
        assert!(is_test_file("src/test/java/com/acme/AppTest.java"));
        assert!(is_test_file("__tests__/util.js"));
        assert!(is_test_file("conftest.py"));
        assert!(!is_test_file("docs/testing.md"));
        assert!(!is_test_file("src/contest.ts"));

        assert!(is_source_file("src/index.ts"));
        assert!(!is_source_file("src/types.d.ts"));
        assert!(!is_source_file("public/vendor.min.js"));
        assert!(!is_source_file("node_modules/react/index.js"));
        assert!(!is_source_file("api/service.pb.go"));
        assert!(!is_source_file("README.md"));
    }

    #[test]
    fn test_percentage_bounds() {
        let many_tests = analyze_test_coverage(&files(&[
            "src/a.py",
            "tests/test_a.py",
            "tests/test_b.py",
            "tests/test_c.py",
        ]));
        assert_eq!(many_tests.percentage, 100);

        let third = analyze_test_coverage(&files(&["a.go", "b.go", "c.go", "a_test.go"]));
        assert_eq!(third.percentage, 33);
        assert_eq!(third.quality_metrics.test_to_source_ratio, 0.33);

        let no_sources = analyze_test_coverage(&files(&["tests/test_a.py"]));
        assert_eq!(no_sources.percentage, 0);
        assert_eq!(no_sources.tested_files, 0);
    }

    #[test]
    fn test_tested_floor_when_pairing_fails() {
        let coverage = analyze_test_coverage(&files(&["lib/parser.rb", "spec/smoke_spec.rb"]));
        assert_eq!(coverage.untested_files, vec!["lib/parser.rb"]);
        assert_eq!(coverage.tested_files, 1);
    }

    #[test]
    fn test_untested_list_is_capped() {
        let paths: Vec<String> = (0..30).map(|i| format!("src/mod{}.ts", i)).collect();
        let input: Vec<RepositoryFile> = paths.iter().map(|p| RepositoryFile::new(p.as_str(), "")).collect();
        let coverage = analyze_test_coverage(&input);
        assert_eq!(coverage.total_files, 30);
        assert_eq!(coverage.untested_files.len(), 20);
        assert_eq!(coverage.tested_files, 0);
        assert_eq!(coverage.percentage, 0);
    }

    #[test]
    fn test_framework_detection() {
        let input = vec![
            RepositoryFile::new("package.json", r#"{"devDependencies":{"jest":"29","vitest":"1"}}"#),
            RepositoryFile::new("src/a.test.ts", ""),
        ];
        assert_eq!(detect_test_framework(&input).as_deref(), Some("Vitest"));

        assert_eq!(detect_test_framework(&files(&["conftest.py"])).as_deref(), Some("pytest"));
        assert_eq!(detect_test_framework(&files(&["x_test.go"])).as_deref(), Some("Go testing"));

        let rust = vec![RepositoryFile::new("src/lib.rs", "#[test]\nfn it_works() {}\n")];
        assert_eq!(detect_test_framework(&rust).as_deref(), Some("cargo test"));

        assert_eq!(detect_test_framework(&files(&["main.c"])), None);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(analyze_test_coverage(&[]), TestCoverageInsight::empty());
    }
}
