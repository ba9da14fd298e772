// src/core/subsystems.rs
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use super::patterns::PatternMatcher;
use super::repository::{is_vendored_path, GitHubRepository, RepositoryFile};
use super::subsystem_catalog::{SubsystemConfig, SubsystemType, SUBSYSTEM_CATALOG};

pub const UNKNOWN_PROJECT: &str = "Unknown Project";
pub const FALLBACK_PROJECT: &str = "Software Project";

/// A detected architectural subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsystemInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub subsystem_type: SubsystemType,
    /// Matched paths, deduplicated and sorted
    pub files: Vec<String>,
    /// Heuristic score in [0, 1]
    pub confidence: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsystemAnalysis {
    /// Sorted by descending confidence, at most one per type
    pub subsystems: Vec<SubsystemInfo>,
    pub project_type: String,
}

impl SubsystemAnalysis {
    pub fn empty() -> Self {
        Self {
            subsystems: Vec::new(),
            project_type: UNKNOWN_PROJECT.to_string(),
        }
    }
}

/// How a marker is recognised from a lowercase file name
#[derive(Clone, Copy)]
enum Marker {
    Named(&'static str),
    /// `next.config.js`, `vite.config.ts`
    Config(&'static str),
    Extension(&'static str),
    /// `requirements.txt`, `requirements-dev.txt`
    Requirements,
}

impl Marker {
    fn matches(self, name: &str) -> bool {
        match self {
            Marker::Named(marker) => name == marker,
            Marker::Config(marker) => name
                .strip_prefix(marker)
                .is_some_and(|rest| rest.starts_with('.')),
            Marker::Extension(ext) => name.ends_with(ext),
            Marker::Requirements => name.starts_with("requirements") && name.ends_with(".txt"),
        }
    }
}

/// Marker files checked in priority order; every marker in a set must be present
struct ProjectMarker {
    all_of: &'static [Marker],
    label: &'static str,
}

const PROJECT_MARKERS: &[ProjectMarker] = &[
    ProjectMarker { all_of: &[Marker::Named("package.json"), Marker::Config("next.config")], label: "Next.js Application" },
    ProjectMarker { all_of: &[Marker::Named("package.json"), Marker::Config("nuxt.config")], label: "Nuxt Application" },
    ProjectMarker { all_of: &[Marker::Named("package.json"), Marker::Named("angular.json")], label: "Angular Application" },
    ProjectMarker { all_of: &[Marker::Named("package.json"), Marker::Config("svelte.config")], label: "SvelteKit Application" },
    ProjectMarker { all_of: &[Marker::Named("package.json"), Marker::Config("gatsby-config")], label: "Gatsby Site" },
    ProjectMarker { all_of: &[Marker::Named("package.json"), Marker::Config("vite.config")], label: "Vite Application" },
    ProjectMarker { all_of: &[Marker::Named("package.json")], label: "Node.js Project" },
    ProjectMarker { all_of: &[Marker::Named("manage.py")], label: "Django Application" },
    ProjectMarker { all_of: &[Marker::Requirements], label: "Python Project" },
    ProjectMarker { all_of: &[Marker::Named("pyproject.toml")], label: "Python Project" },
    ProjectMarker { all_of: &[Marker::Named("setup.py")], label: "Python Project" },
    ProjectMarker { all_of: &[Marker::Named("pipfile")], label: "Python Project" },
    ProjectMarker { all_of: &[Marker::Named("cargo.toml")], label: "Rust Project" },
    ProjectMarker { all_of: &[Marker::Named("go.mod")], label: "Go Project" },
    ProjectMarker { all_of: &[Marker::Named("pom.xml")], label: "Java Project" },
    ProjectMarker { all_of: &[Marker::Named("build.gradle")], label: "Java Project" },
    ProjectMarker { all_of: &[Marker::Named("build.gradle.kts")], label: "Java Project" },
    ProjectMarker { all_of: &[Marker::Named("gemfile"), Marker::Named("routes.rb")], label: "Ruby on Rails Application" },
    ProjectMarker { all_of: &[Marker::Named("gemfile")], label: "Ruby Project" },
    ProjectMarker { all_of: &[Marker::Named("composer.json")], label: "PHP Project" },
    ProjectMarker { all_of: &[Marker::Extension(".csproj")], label: ".NET Project" },
    ProjectMarker { all_of: &[Marker::Extension(".sln")], label: ".NET Project" },
    ProjectMarker { all_of: &[Marker::Named("pubspec.yaml")], label: "Flutter Project" },
    ProjectMarker { all_of: &[Marker::Named("package.swift")], label: "Swift Project" },
];

/// Scores file paths against the subsystem catalog
pub struct SubsystemClassifier {
    threshold: f64,
    normalizer: f64,
}

impl SubsystemClassifier {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            threshold: config.confidence_threshold,
            normalizer: config.match_normalizer.max(1) as f64,
        }
    }

    /// Classify the repository's files into subsystems and infer a project type
    pub fn analyze(&self, repository: &GitHubRepository, files: &[RepositoryFile]) -> SubsystemAnalysis {
        if files.is_empty() {
            return SubsystemAnalysis::empty();
        }

        let matcher = PatternMatcher::new(files.iter().map(|f| f.path.as_str()));

        let mut by_type: BTreeMap<SubsystemType, SubsystemInfo> = BTreeMap::new();
        for config in SUBSYSTEM_CATALOG {
            let Some(info) = self.score_subsystem(config, &matcher) else {
                continue;
            };

            match by_type.get(&info.subsystem_type) {
                Some(existing) if existing.confidence >= info.confidence => {}
                _ => {
                    by_type.insert(info.subsystem_type, info);
                }
            }
        }

        let mut subsystems: Vec<SubsystemInfo> = by_type.into_values().collect();
        subsystems.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.subsystem_type.cmp(&b.subsystem_type))
        });

        SubsystemAnalysis {
            subsystems,
            project_type: infer_project_type(repository, files),
        }
    }

    fn score_subsystem(&self, config: &SubsystemConfig, matcher: &PatternMatcher) -> Option<SubsystemInfo> {
        let mut matched: BTreeSet<&str> = BTreeSet::new();
        let mut score = 0.0;

        for rule in config.patterns {
            let hits = matcher.paths_matching_any(rule.matches);
            if hits.is_empty() {
                continue;
            }
            score += rule.weight * (hits.len() as f64 / self.normalizer).min(1.0);
            matched.extend(hits);
        }

        let confidence = score.min(1.0);
        debug!(
            "Subsystem {} scored {:.2} over {} files",
            config.name,
            confidence,
            matched.len()
        );

        if matched.is_empty() || confidence < self.threshold {
            return None;
        }

        Some(SubsystemInfo {
            name: config.name.to_string(),
            subsystem_type: config.subsystem_type,
            files: matched.into_iter().map(str::to_string).collect(),
            confidence,
            description: config.description.to_string(),
        })
    }
}

impl Default for SubsystemClassifier {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

/// Classify with the reference thresholds
pub fn analyze_subsystems(repository: &GitHubRepository, files: &[RepositoryFile]) -> SubsystemAnalysis {
    SubsystemClassifier::default().analyze(repository, files)
}

/// Pick a project label from marker files, then the reported language
pub fn infer_project_type(repository: &GitHubRepository, files: &[RepositoryFile]) -> String {
    if files.is_empty() {
        return UNKNOWN_PROJECT.to_string();
    }

    let names: Vec<String> = files
        .iter()
        .filter(|f| !is_vendored_path(&f.path))
        .map(|f| f.file_name().to_lowercase())
        .collect();
    let present = |marker: Marker| names.iter().any(|name| marker.matches(name));

    for marker in PROJECT_MARKERS {
        if marker.all_of.iter().all(|&m| present(m)) {
            return marker.label.to_string();
        }
    }

    match repository.language.as_deref().map(str::trim) {
        Some(language) if !language.is_empty() => format!("{} Project", capitalize(language)),
        _ => FALLBACK_PROJECT.to_string(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> Vec<RepositoryFile> {
        paths.iter().map(|p| RepositoryFile::new(*p, "")).collect()
    }

    #[test]
    fn test_empty_input_is_unknown_project() {
        let analysis = analyze_subsystems(&GitHubRepository::default(), &[]);
        assert!(analysis.subsystems.is_empty());
        assert_eq!(analysis.project_type, "Unknown Project");
    }

    #[test]
    fn test_frontend_rule_saturates_after_five_matches() {
        let files = files(&[
            "components/A.tsx",
            "components/B.tsx",
            "pages/X.tsx",
            "components/C.tsx",
            "components/D.tsx",
            "components/E.tsx",
        ]);
        let analysis = analyze_subsystems(&GitHubRepository::default(), &files);

        let frontend = analysis
            .subsystems
            .iter()
            .find(|s| s.subsystem_type == SubsystemType::Frontend)
            .expect("frontend reported");
        assert_eq!(frontend.confidence, 1.0);
        assert_eq!(frontend.files.len(), 6);

        let json = serde_json::to_value(frontend).unwrap();
        assert_eq!(json["type"], "frontend");
    }

    #[test]
    fn test_single_weak_match_is_below_threshold() {
        // one .md file: 0.5 * 1/5 = 0.1
        let analysis = analyze_subsystems(&GitHubRepository::default(), &files(&["notes.md", "main.c"]));
        assert!(analysis
            .subsystems
            .iter()
            .all(|s| s.subsystem_type != SubsystemType::Documentation));
    }

    #[test]
    fn test_confidence_bounds_order_and_uniqueness() {
        let files = files(&[
            "docs/intro.md",
            "docs/setup.md",
            "docs/api.md",
            "src/api/users.ts",
            "src/api/orders.ts",
            "src/components/Nav.tsx",
            "tests/api.test.ts",
            "Dockerfile",
            ".github/workflows/ci.yml",
        ]);
        let analysis = analyze_subsystems(&GitHubRepository::default(), &files);

        let mut seen = BTreeSet::new();
        for pair in analysis.subsystems.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
        for s in &analysis.subsystems {
            assert!((0.0..=1.0).contains(&s.confidence));
            assert!(s.confidence >= 0.4);
            assert!(seen.insert(s.subsystem_type));
        }
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let files = files(&["src/server/app.py", "src/models/user.py", "migrations/001.sql", "README.md"]);
        let repo = GitHubRepository::default();
        assert_eq!(analyze_subsystems(&repo, &files), analyze_subsystems(&repo, &files));
    }

    #[test]
    fn test_project_type_priority() {
        let repo = GitHubRepository::default();
        assert_eq!(
            infer_project_type(&repo, &files(&["package.json", "next.config.js", "requirements.txt"])),
            "Next.js Application"
        );
        assert_eq!(infer_project_type(&repo, &files(&["package.json"])), "Node.js Project");
        assert_eq!(infer_project_type(&repo, &files(&["requirements-dev.txt"])), "Python Project");
        assert_eq!(infer_project_type(&repo, &files(&["Cargo.toml", "src/main.rs"])), "Rust Project");
        assert_eq!(infer_project_type(&repo, &files(&["src/App.csproj"])), ".NET Project");
    }

    #[test]
    fn test_markers_match_whole_names_outside_vendored_dirs() {
        let repo = GitHubRepository::default();
        assert_eq!(infer_project_type(&repo, &files(&["docs/requirements.md"])), "Software Project");
        assert_eq!(
            infer_project_type(&repo, &files(&["node_modules/left-pad/package.json", "main.py"])),
            "Software Project"
        );
        assert_eq!(infer_project_type(&repo, &files(&["package.json", "next.configure.md"])), "Node.js Project");
        assert_eq!(infer_project_type(&repo, &files(&["package.json", "vite.config.ts"])), "Vite Application");
        assert_eq!(infer_project_type(&repo, &files(&["app/build.gradle.kts"])), "Java Project");
    }

    #[test]
    fn test_repeated_path_counts_once() {
        let single = analyze_subsystems(&GitHubRepository::default(), &files(&["components/A.tsx"]));
        let repeated = analyze_subsystems(&GitHubRepository::default(), &files(&["components/A.tsx"; 5]));

        assert_eq!(single, repeated);
        assert!(repeated.subsystems.iter().all(|s| s.subsystem_type != SubsystemType::Frontend));
    }

    #[test]
    fn test_project_type_language_fallback() {
        let repo = GitHubRepository::local("demo", Some("haskell".to_string()));
        assert_eq!(infer_project_type(&repo, &files(&["Main.hs"])), "Haskell Project");

        let repo = GitHubRepository::default();
        assert_eq!(infer_project_type(&repo, &files(&["Main.hs"])), "Software Project");
    }
}
