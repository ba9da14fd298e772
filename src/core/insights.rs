// src/core/insights.rs
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AnalysisConfig;
use super::dependencies::{DependencyExtractor, DependencyInsight};
use super::repository::RepositoryFile;
use super::test_coverage::{TestCoverageEstimator, TestCoverageInsight};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsData {
    pub dependencies: Vec<DependencyInsight>,
    pub test_coverage: TestCoverageInsight,
}

/// Runs the dependency extractor and coverage estimator over one file set
pub struct InsightsAnalyzer {
    dependencies: DependencyExtractor,
    coverage: TestCoverageEstimator,
}

impl InsightsAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            dependencies: DependencyExtractor::new(config),
            coverage: TestCoverageEstimator::new(config),
        }
    }

    pub fn analyze(&self, files: &[RepositoryFile]) -> InsightsData {
        let dependencies = self.dependencies.extract(files);
        let test_coverage = self.coverage.analyze(files);

        info!(
            "🧪 Insights: {} dependencies, {}% estimated test coverage",
            dependencies.len(),
            test_coverage.percentage
        );

        InsightsData {
            dependencies,
            test_coverage,
        }
    }
}

impl Default for InsightsAnalyzer {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

pub fn analyze_insights(files: &[RepositoryFile]) -> InsightsData {
    InsightsAnalyzer::default().analyze(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_json_with_tests() {
        let files = vec![
            RepositoryFile::new(
                "package.json",
                r#"{"dependencies":{"react":"x"},"devDependencies":{"jest":"x"}}"#,
            ),
            RepositoryFile::new("src/components/Button.tsx", "import React from 'react';"),
            RepositoryFile::new("src/components/Button.test.tsx", "import { render } from '@testing-library/react';"),
        ];

        let insights = analyze_insights(&files);

        let react = insights.dependencies.iter().position(|d| d.name == "react").unwrap();
        let jest = insights.dependencies.iter().position(|d| d.name == "jest").unwrap();
        assert!(react < jest);

        assert_eq!(insights.test_coverage.test_files.len(), 1);
        assert!(insights.test_coverage.untested_files.is_empty());
        assert_eq!(insights.test_coverage.test_framework.as_deref(), Some("Jest"));
    }

    #[test]
    fn test_repeated_runs_agree() {
        let mut files = vec![
            RepositoryFile::new("package.json", r#"{"dependencies":{"react":"x","zod":"x"}}"#),
            RepositoryFile::new("requirements.txt", "flask==3.0\nrequests\n"),
            RepositoryFile::new("src/components/Button.tsx", "import React from 'react';"),
            RepositoryFile::new("src/components/Button.test.tsx", "import { render } from '@testing-library/react';"),
            RepositoryFile::new("src/utils/format.ts", "export const f = 1;"),
        ];
        // twenty imported packages, each referenced by exactly one file
        for i in 0..20 {
            files.push(RepositoryFile::new(
                format!("app/mod_{:02}.py", i),
                format!("import pkg_{:02}\n", 19 - i),
            ));
        }

        let first = analyze_insights(&files);
        let second = analyze_insights(&files);
        assert_eq!(first, second);

        let tied: Vec<&str> = first
            .dependencies
            .iter()
            .filter(|d| d.count == 1)
            .map(|d| d.name.as_str())
            .collect();
        let mut sorted = tied.clone();
        sorted.sort();
        assert_eq!(tied, sorted);
        let untested = &first.test_coverage.untested_files;
        assert!(untested.iter().any(|f| f == "src/utils/format.ts"));
        assert!(!untested.iter().any(|f| f == "src/components/Button.tsx"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(analyze_insights(&[])).unwrap();
        assert!(json["dependencies"].as_array().unwrap().is_empty());
        assert_eq!(json["testCoverage"]["percentage"], 0);
        assert_eq!(json["testCoverage"]["qualityMetrics"]["testToSourceRatio"], 0.0);
    }
}
