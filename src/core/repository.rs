// src/core/repository.rs
use std::collections::HashMap;
use std::path::Path;

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::RepositoryConfig;
use crate::error::{ReposcopeError, Result};

/// A fetched source file, as handed to every analyzer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryFile {
    /// Repo-relative path, forward-slash separated
    pub path: String,

    /// Raw text content
    pub content: String,

    /// Size in bytes
    pub size: u64,

    /// Coarse language tag (e.g. "typescript", "python", "json")
    #[serde(rename = "type")]
    pub file_type: String,
}

impl RepositoryFile {
    /// Build a file whose language tag is derived from its extension
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let content = content.into();
        Self {
            file_type: language_for_path(&path).to_string(),
            size: content.len() as u64,
            path,
            content,
        }
    }

    /// Final path segment
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Repository descriptor supplied by the fetch collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubRepository {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    /// Primary language as reported by the host
    pub language: Option<String>,
    pub default_branch: String,
    pub html_url: String,
    pub clone_url: String,
}

impl GitHubRepository {
    /// Descriptor for a repository that only exists on local disk
    pub fn local(name: &str, language: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            full_name: name.to_string(),
            description: None,
            language,
            default_branch: "main".to_string(),
            html_url: String::new(),
            clone_url: String::new(),
        }
    }
}

/// Directories holding dependency caches, build output, or VCS metadata
const VENDORED_DIRS: &[&str] = &[
    "node_modules",
    "bower_components",
    "vendor",
    "dist",
    "build",
    "out",
    "target",
    "obj",
    "coverage",
    ".git",
    ".next",
    ".nuxt",
    ".svelte-kit",
    ".gradle",
    ".venv",
    "venv",
    "__pycache__",
    "pods",
    "generated",
];

/// Whether any directory segment of `path` is a vendored or build-output directory
pub fn is_vendored_path(path: &str) -> bool {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    segments.pop();
    segments
        .iter()
        .any(|segment| VENDORED_DIRS.contains(&segment.to_ascii_lowercase().as_str()))
}

pub(crate) fn extension_of(path: &str) -> Option<String> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Map a path to a coarse language tag
pub fn language_for_path(path: &str) -> &'static str {
    let file_name = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();

    match file_name.as_str() {
        "dockerfile" => return "dockerfile",
        "makefile" => return "makefile",
        "gemfile" | "rakefile" => return "ruby",
        "pipfile" => return "toml",
        _ => {}
    }

    let Some(ext) = extension_of(path) else {
        return "text";
    };

    match ext.as_str() {
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "ts" | "tsx" | "mts" | "cts" => "typescript",
        "py" | "pyi" => "python",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "scala" => "scala",
        "cs" => "csharp",
        "fs" => "fsharp",
        "vb" => "vb",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "dart" => "dart",
        "ex" | "exs" => "elixir",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" => "cpp",
        "vue" => "vue",
        "svelte" => "svelte",
        "html" | "htm" => "html",
        "css" | "scss" | "sass" | "less" => "css",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "xml" | "csproj" | "vbproj" | "fsproj" => "xml",
        "gradle" => "gradle",
        "md" | "mdx" => "markdown",
        "rst" | "adoc" | "txt" => "text",
        "sql" => "sql",
        "sh" | "bash" | "zsh" => "shell",
        "prisma" => "prisma",
        "graphql" | "gql" => "graphql",
        "proto" => "protobuf",
        "tf" => "terraform",
        _ => "text",
    }
}

/// Language tags that count as program code when picking a primary language
fn is_code_language(tag: &str) -> bool {
    !matches!(
        tag,
        "text" | "json" | "yaml" | "toml" | "xml" | "markdown" | "css" | "html" | "dockerfile"
            | "makefile" | "shell" | "sql" | "gradle" | "prisma" | "graphql" | "protobuf"
            | "terraform"
    )
}

/// Most frequent code language across the file set
pub fn primary_language(files: &[RepositoryFile]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for file in files {
        if is_code_language(&file.file_type) {
            *counts.entry(file.file_type.as_str()).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(language, _)| language.to_string())
}

/// Loads a local checkout into the same shape the fetch collaborator produces
pub struct RepositoryLoader {
    config: RepositoryConfig,
}

impl RepositoryLoader {
    pub fn new(config: &RepositoryConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Walk `root`, honouring .gitignore and configured ignore patterns
    pub fn load<P: AsRef<Path>>(&self, root: P) -> Result<Vec<RepositoryFile>> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ReposcopeError::FileSystem(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let mut overrides = OverrideBuilder::new(root);
        for pattern in &self.config.ignore_patterns {
            overrides
                .add(&format!("!{}", pattern))
                .map_err(|e| ReposcopeError::Config(format!("Bad ignore pattern {}: {}", pattern, e)))?;
        }
        let overrides = overrides
            .build()
            .map_err(|e| ReposcopeError::Config(e.to_string()))?;

        let walker = WalkBuilder::new(root)
            .hidden(!self.config.include_hidden)
            .git_ignore(true)
            .require_git(false)
            .overrides(overrides)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut files = Vec::new();

        for entry in walker {
            let entry = entry.map_err(|e| ReposcopeError::FileSystem(e.to_string()))?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            if files.len() >= self.config.max_files {
                warn!("File limit of {} reached, ignoring the rest of {}", self.config.max_files, root.display());
                break;
            }

            let metadata = entry
                .metadata()
                .map_err(|e| ReposcopeError::FileSystem(e.to_string()))?;
            if metadata.len() > self.config.max_file_size {
                debug!("Skipping oversized file {}", path.display());
                continue;
            }

            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    debug!("Skipping unreadable or binary file {}: {}", path.display(), e);
                    continue;
                }
            };

            let relative = path.strip_prefix(root).unwrap_or(path);
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            let mut file = RepositoryFile::new(relative, content);
            file.size = metadata.len();
            files.push(file);
        }

        debug!("Loaded {} files from {}", files.len(), root.display());
        Ok(files)
    }

    /// Build the repository descriptor for a local checkout
    pub fn describe<P: AsRef<Path>>(
        &self,
        root: P,
        files: &[RepositoryFile],
        language_override: Option<String>,
    ) -> GitHubRepository {
        let root = root.as_ref();
        let name = root
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .unwrap_or_else(|| "repository".to_string());

        let language = language_override.or_else(|| primary_language(files));
        GitHubRepository::local(&name, language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_language_for_path() {
        assert_eq!(language_for_path("src/App.jsx"), "javascript");
        assert_eq!(language_for_path("src/components/Button.tsx"), "typescript");
        assert_eq!(language_for_path("Dockerfile"), "dockerfile");
        assert_eq!(language_for_path("LICENSE"), "text");
        assert_eq!(language_for_path(".gitignore"), "text");
        assert_eq!(language_for_path("app/Api.CSPROJ"), "xml");
    }

    #[test]
    fn test_is_vendored_path() {
        assert!(is_vendored_path("web/node_modules/react/index.js"));
        assert!(is_vendored_path("Target/debug/build.rs"));
        assert!(!is_vendored_path("src/build.rs"));
        assert!(!is_vendored_path("dist"));
        assert!(!is_vendored_path("src/distance.ts"));
    }

    #[test]
    fn test_primary_language_ignores_data_files() {
        let files = vec![
            RepositoryFile::new("a.json", "{}"),
            RepositoryFile::new("b.json", "{}"),
            RepositoryFile::new("c.json", "{}"),
            RepositoryFile::new("main.go", "package main"),
        ];
        assert_eq!(primary_language(&files), Some("go".to_string()));
        assert_eq!(primary_language(&[]), None);
    }

    #[test]
    fn test_loader_reads_relative_forward_slash_paths() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("src/lib/util.py").write_str("import os\n").unwrap();
        temp.child("README.md").write_str("# Hello\n").unwrap();

        let loader = RepositoryLoader::new(&RepositoryConfig::default());
        let files = loader.load(temp.path()).unwrap();

        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "src/lib/util.py"]);
        assert_eq!(files[1].file_type, "python");
        assert_eq!(files[1].size, 10);
    }

    #[test]
    fn test_loader_respects_ignore_patterns_and_limits() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("node_modules/react/index.js").write_str("module.exports = {}").unwrap();
        temp.child("index.js").write_str("require('react')").unwrap();
        temp.child("big.txt").write_str(&"x".repeat(64)).unwrap();

        let config = RepositoryConfig {
            max_file_size: 32,
            ..RepositoryConfig::default()
        };
        let files = RepositoryLoader::new(&config).load(temp.path()).unwrap();

        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["index.js"]);
    }

    #[test]
    fn test_loader_rejects_missing_directory() {
        let loader = RepositoryLoader::new(&RepositoryConfig::default());
        assert!(matches!(
            loader.load("/no/such/dir"),
            Err(ReposcopeError::FileSystem(_))
        ));
    }
}
