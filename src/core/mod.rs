// src/core/mod.rs
mod engine;
mod patterns;
mod repository;

// Analyses
mod dependencies;
mod insights;
mod subsystem_catalog;
mod subsystems;
mod test_coverage;
mod tree_builder;

// Output
mod report;

pub use repository::{
    is_vendored_path, language_for_path, primary_language, GitHubRepository, RepositoryFile,
    RepositoryLoader,
};
pub use patterns::PatternMatcher;
pub use tree_builder::{build_project_tree, NodeType, ProjectTree, TreeNode};
pub use subsystem_catalog::{PatternRule, SubsystemConfig, SubsystemType, SUBSYSTEM_CATALOG};
pub use subsystems::{
    analyze_subsystems, infer_project_type, SubsystemAnalysis, SubsystemClassifier, SubsystemInfo,
};
pub use dependencies::{
    import_language, referenced_packages, DependencyExtractor, DependencyInsight,
    DependencySource, Ecosystem, ImportLanguage, ManifestDependency,
};
pub use test_coverage::{
    analyze_test_coverage, detect_test_framework, is_source_file, is_test_file, QualityMetrics,
    TestCoverageEstimator, TestCoverageInsight,
};
pub use insights::{analyze_insights, InsightsAnalyzer, InsightsData};
pub use report::{content_fingerprint, render_tree, AnalysisReport, OutputFormat, ReportRenderer};

// Export the main engine
pub use engine::Engine;
