//! Dependency extraction from manifests and import statements.
//!
//! Manifest weights and import counts share one scale: the larger of the two
//! wins when a package shows up in both.

pub mod imports;
pub mod manifests;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::core::repository::{is_vendored_path, RepositoryFile};

pub use imports::{import_language, referenced_packages, ImportLanguage};
pub use manifests::{descriptor_for, parse_manifest, Ecosystem, ManifestDependency};

/// Where a dependency was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencySource {
    Declared,
    Imported,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyInsight {
    pub name: String,
    /// Relative importance: manifest weight or number of importing files
    pub count: u32,
    pub source: DependencySource,
}

/// Name used to match the same package across manifests and imports
fn dependency_key(name: &str) -> String {
    name.to_lowercase().replace('_', "-")
}

fn rank(dependencies: &mut Vec<DependencyInsight>, limit: usize) {
    dependencies.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    dependencies.truncate(limit);
}

pub struct DependencyExtractor {
    max_dependencies: usize,
    max_import_dependencies: usize,
    max_import_files: usize,
}

impl DependencyExtractor {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            max_dependencies: config.max_dependencies,
            max_import_dependencies: config.max_import_dependencies,
            max_import_files: config.max_import_files,
        }
    }

    /// Ranked dependency list from manifests merged with import statements
    pub fn extract(&self, files: &[RepositoryFile]) -> Vec<DependencyInsight> {
        let declared = self.manifest_dependencies(files);
        let imported = self.import_dependencies(files);

        let mut merged: HashMap<String, DependencyInsight> = HashMap::new();

        for dependency in declared {
            merged
                .entry(dependency_key(&dependency.name))
                .and_modify(|existing| existing.count = existing.count.max(dependency.weight))
                .or_insert(DependencyInsight {
                    name: dependency.name,
                    count: dependency.weight,
                    source: DependencySource::Declared,
                });
        }

        for dependency in imported {
            merged
                .entry(dependency_key(&dependency.name))
                .and_modify(|existing| {
                    existing.count = existing.count.max(dependency.count);
                    existing.source = DependencySource::Both;
                })
                .or_insert(dependency);
        }

        let mut dependencies: Vec<DependencyInsight> = merged.into_values().collect();
        rank(&mut dependencies, self.max_dependencies);

        info!("📦 Ranked {} dependencies", dependencies.len());
        dependencies
    }

    /// Every manifest entry in input order; unparseable manifests are skipped
    pub fn manifest_dependencies(&self, files: &[RepositoryFile]) -> Vec<ManifestDependency> {
        let mut dependencies = Vec::new();

        for file in files {
            if is_vendored_path(&file.path) {
                continue;
            }
            let Some(descriptor) = descriptor_for(&file.path) else {
                continue;
            };

            match parse_manifest(descriptor, file) {
                Ok(found) => {
                    debug!("{} manifest {} declares {} dependencies", descriptor.ecosystem, file.path, found.len());
                    dependencies.extend(found);
                }
                Err(e) => warn!("Skipping manifest {}: {}", file.path, e),
            }
        }

        dependencies
    }

    /// Packages ranked by the number of files importing them
    pub fn import_dependencies(&self, files: &[RepositoryFile]) -> Vec<DependencyInsight> {
        let mut counts: HashMap<String, (String, u32)> = HashMap::new();

        let scanned = files
            .iter()
            .filter(|f| !is_vendored_path(&f.path) && import_language(&f.path).is_some())
            .take(self.max_import_files);

        for file in scanned {
            for package in referenced_packages(&file.path, &file.content) {
                counts
                    .entry(dependency_key(&package))
                    .or_insert_with(|| (package, 0))
                    .1 += 1;
            }
        }

        let mut dependencies: Vec<DependencyInsight> = counts
            .into_values()
            .map(|(name, count)| DependencyInsight {
                name,
                count,
                source: DependencySource::Imported,
            })
            .collect();
        rank(&mut dependencies, self.max_import_dependencies);
        dependencies
    }
}

impl Default for DependencyExtractor {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(deps: &[DependencyInsight]) -> Vec<&str> {
        deps.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_runtime_ranks_above_dev() {
        let files = vec![RepositoryFile::new(
            "package.json",
            r#"{"dependencies":{"react":"x"},"devDependencies":{"jest":"x"}}"#,
        )];
        let deps = DependencyExtractor::default().extract(&files);
        assert_eq!(names(&deps), vec!["react", "jest"]);
        assert!(deps[0].count > deps[1].count);
    }

    #[test]
    fn test_malformed_manifest_is_skipped() {
        let files = vec![
            RepositoryFile::new("web/package.json", "{ not json"),
            RepositoryFile::new("requirements.txt", "flask\n"),
        ];
        let deps = DependencyExtractor::default().extract(&files);
        assert_eq!(names(&deps), vec!["flask"]);
    }

    #[test]
    fn test_max_weight_across_manifests() {
        let files = vec![
            RepositoryFile::new("a/package.json", r#"{"devDependencies":{"typescript":"5"}}"#),
            RepositoryFile::new("b/package.json", r#"{"dependencies":{"typescript":"5"}}"#),
        ];
        let deps = DependencyExtractor::default().extract(&files);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].count, manifests::RUNTIME_WEIGHT);
    }

    #[test]
    fn test_imports_merge_with_declared_names() {
        let mut files = vec![RepositoryFile::new("requirements.txt", "python_dateutil==2.8\nflask\n")];
        for i in 0..12 {
            files.push(RepositoryFile::new(
                format!("app/mod{}.py", i),
                "import dateutil.parser\nimport requests\n",
            ));
        }

        let deps = DependencyExtractor::default().extract(&files);

        let dateutil = deps.iter().find(|d| d.name == "python_dateutil").unwrap();
        assert_eq!(dateutil.count, 12);
        assert_eq!(dateutil.source, DependencySource::Both);

        let requests = deps.iter().find(|d| d.name == "requests").unwrap();
        assert_eq!(requests.source, DependencySource::Imported);

        let flask = deps.iter().find(|d| d.name == "flask").unwrap();
        assert_eq!(flask.count, manifests::RUNTIME_WEIGHT);
        assert_eq!(flask.source, DependencySource::Declared);
    }

    #[test]
    fn test_import_counts_are_per_file_and_skip_vendored() {
        let files = vec![
            RepositoryFile::new("src/a.ts", "import x from 'axios';\nimport y from 'axios/lib';\n"),
            RepositoryFile::new("src/b.ts", "import x from 'axios';\n"),
            RepositoryFile::new("node_modules/z/index.js", "require('axios')"),
        ];
        let deps = DependencyExtractor::default().import_dependencies(&files);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].count, 2);
    }

    #[test]
    fn test_result_is_capped_and_ordered() {
        let body: String = (0..40).map(|i| format!("pkg{:02}\n", i)).collect();
        let files = vec![
            RepositoryFile::new("requirements.txt", body),
            RepositoryFile::new("requirements-dev.txt", "zzz-dev\n"),
        ];
        let deps = DependencyExtractor::default().extract(&files);

        assert_eq!(deps.len(), 20);
        for pair in deps.windows(2) {
            assert!(
                pair[0].count > pair[1].count
                    || (pair[0].count == pair[1].count && pair[0].name <= pair[1].name)
            );
        }
        assert!(!deps.iter().any(|d| d.name == "zzz-dev"));
    }

    #[test]
    fn test_import_only_results_are_capped() {
        let files: Vec<RepositoryFile> = (0..30)
            .map(|i| RepositoryFile::new(format!("src/f{}.js", i), format!("require('lib{}')", i)))
            .collect();
        let deps = DependencyExtractor::default().import_dependencies(&files);
        assert_eq!(deps.len(), 15);
    }

    #[test]
    fn test_empty_input() {
        assert!(DependencyExtractor::default().extract(&[]).is_empty());
    }

    #[test]
    fn test_source_serializes_lowercase() {
        let insight = DependencyInsight {
            name: "react".to_string(),
            count: 10,
            source: DependencySource::Both,
        };
        let json = serde_json::to_value(&insight).unwrap();
        assert_eq!(json["source"], "both");
    }
}
