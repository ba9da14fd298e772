// src/core/report.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tera::{Context, Tera};

use crate::config::OutputConfig;
use crate::error::{ReposcopeError, Result};
use super::dependencies::DependencyInsight;
use super::insights::InsightsData;
use super::repository::{GitHubRepository, RepositoryFile};
use super::subsystems::SubsystemAnalysis;
use super::test_coverage::TestCoverageInsight;
use super::tree_builder::{ProjectTree, TreeNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Markdown,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ReposcopeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            other => Err(ReposcopeError::Config(format!("Unsupported output format: {}", other))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Markdown => f.write_str("markdown"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Everything the engine derives from one repository snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub repository: GitHubRepository,
    pub tree: ProjectTree,
    pub subsystems: SubsystemAnalysis,
    pub insights: InsightsData,
    /// SHA-256 over the sorted (path, content) pairs of the input
    pub fingerprint: String,
    pub generated_at: DateTime<Utc>,
}

impl AnalysisReport {
    pub fn new(
        repository: GitHubRepository,
        files: &[RepositoryFile],
        tree: ProjectTree,
        subsystems: SubsystemAnalysis,
        insights: InsightsData,
    ) -> Self {
        Self {
            repository,
            tree,
            subsystems,
            insights,
            fingerprint: content_fingerprint(files),
            generated_at: Utc::now(),
        }
    }
}

/// Order-independent content hash of a file set
pub fn content_fingerprint(files: &[RepositoryFile]) -> String {
    let mut ordered: Vec<&RepositoryFile> = files.iter().collect();
    ordered.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.content.cmp(&b.content)));

    let mut hasher = Sha256::new();
    for file in ordered {
        hasher.update(file.path.as_bytes());
        hasher.update([0u8]);
        hasher.update(file.content.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

const REPORT_TEMPLATE: &str = r#"# {{ repository.name }}
{% if repository.description %}
{{ repository.description }}
{% endif %}
- **Project type:** {{ subsystems.projectType }}
{%- if repository.language %}
- **Primary language:** {{ repository.language }}
{%- endif %}
- **Files:** {{ tree.totalFiles }} in {{ tree.totalDirectories }} directories (max depth {{ tree.maxDepth }})
- **Fingerprint:** `{{ fingerprint }}`
- **Generated:** {{ generated_at }}
{% if tree_text %}
{% include "tree.md" %}
{%- endif %}
{% include "subsystems.md" %}
{% include "dependencies.md" %}
{% include "coverage.md" %}"#;

const TREE_TEMPLATE: &str = r#"## Project Tree

```
{{ tree_text }}```
"#;

const SUBSYSTEMS_TEMPLATE: &str = r#"## Subsystems
{% if subsystems.subsystems | length == 0 %}
No subsystems detected.
{% else %}
| Subsystem | Type | Confidence | Files | Description |
|-----------|------|------------|-------|-------------|
{% for s in subsystems.subsystems -%}
| {{ s.name }} | {{ s.type }} | {{ s.confidence | round(precision=2) }} | {{ s.files | length }} | {{ s.description }} |
{% endfor -%}
{% endif %}"#;

const DEPENDENCIES_TEMPLATE: &str = r#"## Dependencies
{% if dependencies | length == 0 %}
No dependencies detected.
{% else %}
| Package | Weight | Source |
|---------|--------|--------|
{% for d in dependencies -%}
| {{ d.name }} | {{ d.count }} | {{ d.source }} |
{% endfor -%}
{% endif %}"#;

const COVERAGE_TEMPLATE: &str = r#"## Test Coverage

Estimated coverage: **{{ coverage.percentage }}%** ({{ coverage.testFiles | length }} test files for {{ coverage.totalFiles }} source files, ratio {{ coverage.qualityMetrics.testToSourceRatio }})
{% if coverage.testFramework %}
Test framework: {{ coverage.testFramework }}
{% endif -%}
{% if coverage.untestedFiles | length > 0 %}
Untested files:

{% for f in coverage.untestedFiles -%}
- `{{ f }}`
{% endfor -%}
{% endif %}"#;

/// Renders reports as JSON or as Markdown through tera templates
pub struct ReportRenderer {
    tera: Tera,
    include_tree: bool,
    tree_depth: usize,
}

impl ReportRenderer {
    pub fn new(config: &OutputConfig) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("tree.md", TREE_TEMPLATE),
            ("subsystems.md", SUBSYSTEMS_TEMPLATE),
            ("dependencies.md", DEPENDENCIES_TEMPLATE),
            ("coverage.md", COVERAGE_TEMPLATE),
            ("report.md", REPORT_TEMPLATE),
        ])?;

        Ok(Self {
            tera,
            include_tree: config.include_tree,
            tree_depth: config.tree_depth,
        })
    }

    pub fn render(&self, report: &AnalysisReport, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Markdown => self.render_markdown(report),
        }
    }

    fn render_markdown(&self, report: &AnalysisReport) -> Result<String> {
        let mut context = Context::new();
        context.insert("repository", &report.repository);
        context.insert("tree", &report.tree);
        context.insert("subsystems", &report.subsystems);
        context.insert("dependencies", &report.insights.dependencies);
        context.insert("coverage", &report.insights.test_coverage);
        context.insert("fingerprint", &report.fingerprint);
        context.insert(
            "generated_at",
            &report.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );
        let tree_text = if self.include_tree {
            render_tree(&report.repository.name, &report.tree, self.tree_depth)
        } else {
            String::new()
        };
        context.insert("tree_text", &tree_text);

        Ok(self.tera.render("report.md", &context)?)
    }

    pub fn render_subsystems(&self, analysis: &SubsystemAnalysis) -> Result<String> {
        let mut context = Context::new();
        context.insert("subsystems", analysis);
        Ok(self.tera.render("subsystems.md", &context)?)
    }

    pub fn render_dependencies(&self, dependencies: &[DependencyInsight]) -> Result<String> {
        let mut context = Context::new();
        context.insert("dependencies", dependencies);
        Ok(self.tera.render("dependencies.md", &context)?)
    }

    pub fn render_coverage(&self, coverage: &TestCoverageInsight) -> Result<String> {
        let mut context = Context::new();
        context.insert("coverage", coverage);
        Ok(self.tera.render("coverage.md", &context)?)
    }
}

/// ASCII rendering of the tree; `max_depth` 0 means unlimited
pub fn render_tree(label: &str, tree: &ProjectTree, max_depth: usize) -> String {
    let label = if label.is_empty() { tree.root.name.as_str() } else { label };
    let mut out = format!("{}/\n", label);
    render_children(&tree.root, "", 1, max_depth, &mut out);
    out
}

fn render_children(node: &TreeNode, prefix: &str, depth: usize, max_depth: usize, out: &mut String) {
    let children = node.children();

    for (index, child) in children.iter().enumerate() {
        let last = index + 1 == children.len();
        let (branch, indent) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };

        out.push_str(prefix);
        out.push_str(branch);
        out.push_str(&child.name);
        if child.is_directory() {
            out.push('/');
        }
        if let Some(subsystem) = child.subsystem_type {
            out.push_str(&format!("  [{}]", subsystem));
        }
        out.push('\n');

        if child.is_directory() && !child.children().is_empty() {
            let nested = format!("{}{}", prefix, indent);
            if max_depth == 0 || depth < max_depth {
                render_children(child, &nested, depth + 1, max_depth, out);
            } else {
                out.push_str(&format!("{}└── ...\n", nested));
            }
        }
    }
}
