//! Declarative manifest parsers.
//!
//! Each ecosystem is described by a [`ManifestDescriptor`]: a basename matcher
//! plus one of four syntax families. Parsing dispatches on the family, never
//! on the ecosystem.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ReposcopeError, Result};
use crate::core::patterns::{captures_of, joined_captures};
use crate::core::repository::RepositoryFile;

/// Direct/runtime dependencies
pub const RUNTIME_WEIGHT: u32 = 10;
/// Dev, test, and build dependencies
pub const DEV_WEIGHT: u32 = 6;
/// Optional and peer dependencies
pub const OPTIONAL_WEIGHT: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ecosystem {
    Npm,
    Composer,
    PyPi,
    Cargo,
    Go,
    RubyGems,
    Maven,
    Gradle,
    NuGet,
    Pub,
    SwiftPm,
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Npm => "npm",
            Self::Composer => "composer",
            Self::PyPi => "pypi",
            Self::Cargo => "cargo",
            Self::Go => "go",
            Self::RubyGems => "rubygems",
            Self::Maven => "maven",
            Self::Gradle => "gradle",
            Self::NuGet => "nuget",
            Self::Pub => "pub",
            Self::SwiftPm => "swiftpm",
        };
        f.write_str(name)
    }
}

/// How a manifest is recognised from its lowercased basename
pub enum FileMatcher {
    Exact(&'static str),
    Pattern(Regex),
}

impl FileMatcher {
    fn matches(&self, basename: &str) -> bool {
        match self {
            Self::Exact(name) => basename == *name,
            Self::Pattern(re) => re.is_match(basename),
        }
    }
}

pub struct JsonSection {
    pub key: &'static str,
    pub weight: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionStyle {
    /// `[header]` tables with `key = value` entries
    Toml,
    /// Unindented `header:` keys with indented `key: value` entries
    Yaml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionMode {
    /// Every entry key is a dependency name
    Keys,
    /// Only the named key, whose value is an array of requirement strings
    ArrayKey(&'static str),
    /// Every key's value is an array of requirement strings
    AllArrays,
}

pub struct SectionRule {
    pub header: &'static str,
    pub weight: u32,
    pub mode: SectionMode,
}

/// Regex rule over raw text; `block` narrows the text to captured bodies first
pub struct LineRule {
    pub block: Option<Regex>,
    pub pattern: Regex,
    pub groups: &'static [usize],
    pub weight: u32,
}

pub enum TagRule {
    /// `<element>...<first>a</first>...<second>b</second>...</element>` joined as `a{sep}b`
    Pair {
        block: Regex,
        first: Regex,
        second: Regex,
        scope: Option<Regex>,
        separator: &'static str,
        weight: u32,
    },
    /// `<element attribute="name" ... />`
    Attribute { pattern: Regex, weight: u32 },
}

pub enum ManifestSyntax {
    JsonObject {
        sections: &'static [JsonSection],
        reserved: &'static [&'static str],
    },
    SectionedText {
        style: SectionStyle,
        sections: &'static [SectionRule],
        reserved: &'static [&'static str],
    },
    LinePattern { rules: Vec<LineRule> },
    TagMarkup { rules: Vec<TagRule> },
}

pub struct ManifestDescriptor {
    pub ecosystem: Ecosystem,
    pub matcher: FileMatcher,
    pub syntax: ManifestSyntax,
}

/// A dependency declared in a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDependency {
    pub name: String,
    pub weight: u32,
    pub ecosystem: Ecosystem,
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid manifest pattern")
}

fn line_rule(pattern: &str, groups: &'static [usize], weight: u32) -> LineRule {
    LineRule {
        block: None,
        pattern: regex(pattern),
        groups,
        weight,
    }
}

fn block_rule(block: &str, pattern: &str, weight: u32) -> LineRule {
    LineRule {
        block: Some(regex(block)),
        pattern: regex(pattern),
        groups: &[1],
        weight,
    }
}

fn tag_pair(element: &str, first: &str, second: &str, scope: Option<&str>, weight: u32) -> TagRule {
    let inner = |tag: &str| regex(&format!(r"(?s)<{tag}>\s*([^<]+?)\s*</{tag}>"));
    TagRule::Pair {
        block: regex(&format!(r"(?s)<{element}>(.*?)</{element}>")),
        first: inner(first),
        second: inner(second),
        scope: scope.map(inner),
        separator: ":",
        weight,
    }
}

fn tag_attribute(element: &str, attribute: &str, weight: u32) -> TagRule {
    TagRule::Attribute {
        pattern: regex(&format!(r#"<{element}\b[^>]*?\b{attribute}\s*=\s*"([^"]+)""#)),
        weight,
    }
}

const GEM_PATTERN: &str = r#"(?m)^[ \t]*gem[ \t]+['"]([^'"]+)['"]"#;
const GRADLE_COORDINATE: &str = r#"\s*\(?\s*['"]([^:'"\s]+):([^:'"\s]+)"#;

pub static MANIFEST_DESCRIPTORS: LazyLock<Vec<ManifestDescriptor>> = LazyLock::new(|| {
    vec![
        ManifestDescriptor {
            ecosystem: Ecosystem::Npm,
            matcher: FileMatcher::Exact("package.json"),
            syntax: ManifestSyntax::JsonObject {
                sections: &[
                    JsonSection { key: "dependencies", weight: RUNTIME_WEIGHT },
                    JsonSection { key: "devDependencies", weight: DEV_WEIGHT },
                    JsonSection { key: "peerDependencies", weight: OPTIONAL_WEIGHT },
                    JsonSection { key: "optionalDependencies", weight: OPTIONAL_WEIGHT },
                ],
                reserved: &[],
            },
        },
        ManifestDescriptor {
            ecosystem: Ecosystem::Composer,
            matcher: FileMatcher::Exact("composer.json"),
            syntax: ManifestSyntax::JsonObject {
                sections: &[
                    JsonSection { key: "require", weight: RUNTIME_WEIGHT },
                    JsonSection { key: "require-dev", weight: DEV_WEIGHT },
                ],
                reserved: &["php", "ext-", "lib-", "composer-plugin-api"],
            },
        },
        ManifestDescriptor {
            ecosystem: Ecosystem::PyPi,
            matcher: FileMatcher::Exact("pipfile"),
            syntax: ManifestSyntax::SectionedText {
                style: SectionStyle::Toml,
                sections: &[
                    SectionRule { header: "[packages]", weight: RUNTIME_WEIGHT, mode: SectionMode::Keys },
                    SectionRule { header: "[dev-packages]", weight: DEV_WEIGHT, mode: SectionMode::Keys },
                ],
                reserved: &["python_version"],
            },
        },
        ManifestDescriptor {
            ecosystem: Ecosystem::PyPi,
            matcher: FileMatcher::Exact("pyproject.toml"),
            syntax: ManifestSyntax::SectionedText {
                style: SectionStyle::Toml,
                sections: &[
                    SectionRule { header: "[project]", weight: RUNTIME_WEIGHT, mode: SectionMode::ArrayKey("dependencies") },
                    SectionRule { header: "[project.optional-dependencies]", weight: OPTIONAL_WEIGHT, mode: SectionMode::AllArrays },
                    SectionRule { header: "[tool.poetry.dependencies]", weight: RUNTIME_WEIGHT, mode: SectionMode::Keys },
                    SectionRule { header: "[tool.poetry.dev-dependencies]", weight: DEV_WEIGHT, mode: SectionMode::Keys },
                    SectionRule { header: "[tool.poetry.group.dev.dependencies]", weight: DEV_WEIGHT, mode: SectionMode::Keys },
                    SectionRule { header: "[tool.poetry.group.test.dependencies]", weight: DEV_WEIGHT, mode: SectionMode::Keys },
                ],
                reserved: &["python"],
            },
        },
        ManifestDescriptor {
            ecosystem: Ecosystem::PyPi,
            matcher: FileMatcher::Pattern(regex(
                r"^(?:requirements[-_.]?(?:dev|test|tests|testing|lint|docs)[^/]*|(?:dev|test)[-_]requirements)\.txt$",
            )),
            syntax: ManifestSyntax::LinePattern {
                rules: vec![line_rule(REQUIREMENT_LINE, &[1], DEV_WEIGHT)],
            },
        },
        ManifestDescriptor {
            ecosystem: Ecosystem::PyPi,
            matcher: FileMatcher::Pattern(regex(r"^requirements[^/]*\.txt$")),
            syntax: ManifestSyntax::LinePattern {
                rules: vec![line_rule(REQUIREMENT_LINE, &[1], RUNTIME_WEIGHT)],
            },
        },
        ManifestDescriptor {
            ecosystem: Ecosystem::Cargo,
            matcher: FileMatcher::Exact("cargo.toml"),
            syntax: ManifestSyntax::SectionedText {
                style: SectionStyle::Toml,
                sections: &[
                    SectionRule { header: "[dependencies]", weight: RUNTIME_WEIGHT, mode: SectionMode::Keys },
                    SectionRule { header: "[workspace.dependencies]", weight: RUNTIME_WEIGHT, mode: SectionMode::Keys },
                    SectionRule { header: "[dev-dependencies]", weight: DEV_WEIGHT, mode: SectionMode::Keys },
                    SectionRule { header: "[build-dependencies]", weight: DEV_WEIGHT, mode: SectionMode::Keys },
                ],
                reserved: &[],
            },
        },
        ManifestDescriptor {
            ecosystem: Ecosystem::Pub,
            matcher: FileMatcher::Exact("pubspec.yaml"),
            syntax: ManifestSyntax::SectionedText {
                style: SectionStyle::Yaml,
                sections: &[
                    SectionRule { header: "dependencies:", weight: RUNTIME_WEIGHT, mode: SectionMode::Keys },
                    SectionRule { header: "dev_dependencies:", weight: DEV_WEIGHT, mode: SectionMode::Keys },
                ],
                reserved: &["flutter", "flutter_test", "sdk"],
            },
        },
        ManifestDescriptor {
            ecosystem: Ecosystem::Go,
            matcher: FileMatcher::Exact("go.mod"),
            syntax: ManifestSyntax::LinePattern {
                rules: vec![
                    block_rule(r"(?s)\brequire\s*\((.*?)\)", r"(?m)^\s*([A-Za-z0-9][^\s]*)\s+v[0-9]", RUNTIME_WEIGHT),
                    line_rule(r"(?m)^\s*require\s+([^\s(]+)\s+v[0-9]", &[1], RUNTIME_WEIGHT),
                ],
            },
        },
        ManifestDescriptor {
            ecosystem: Ecosystem::RubyGems,
            matcher: FileMatcher::Exact("gemfile"),
            syntax: ManifestSyntax::LinePattern {
                rules: vec![
                    block_rule(r"(?ms)^[ \t]*group\b[^\n]*\bdo[ \t]*$(.*?)^[ \t]*end\b", GEM_PATTERN, DEV_WEIGHT),
                    line_rule(GEM_PATTERN, &[1], RUNTIME_WEIGHT),
                ],
            },
        },
        ManifestDescriptor {
            ecosystem: Ecosystem::Gradle,
            matcher: FileMatcher::Pattern(regex(r"^build\.gradle(?:\.kts)?$")),
            syntax: ManifestSyntax::LinePattern {
                rules: vec![
                    line_rule(
                        &format!(r"(?m)^\s*(?:testImplementation|testCompile|testRuntimeOnly|androidTestImplementation|debugImplementation){GRADLE_COORDINATE}"),
                        &[1, 2],
                        DEV_WEIGHT,
                    ),
                    line_rule(
                        &format!(r"(?m)^\s*(?:implementation|api|compile|runtimeOnly){GRADLE_COORDINATE}"),
                        &[1, 2],
                        RUNTIME_WEIGHT,
                    ),
                    line_rule(
                        &format!(r"(?m)^\s*(?:compileOnly|kapt|ksp|annotationProcessor){GRADLE_COORDINATE}"),
                        &[1, 2],
                        OPTIONAL_WEIGHT,
                    ),
                ],
            },
        },
        ManifestDescriptor {
            ecosystem: Ecosystem::Maven,
            matcher: FileMatcher::Exact("pom.xml"),
            syntax: ManifestSyntax::TagMarkup {
                rules: vec![tag_pair("dependency", "groupId", "artifactId", Some("scope"), RUNTIME_WEIGHT)],
            },
        },
        ManifestDescriptor {
            ecosystem: Ecosystem::NuGet,
            matcher: FileMatcher::Pattern(regex(r"\.(?:csproj|vbproj|fsproj)$")),
            syntax: ManifestSyntax::TagMarkup {
                rules: vec![tag_attribute("PackageReference", "Include", RUNTIME_WEIGHT)],
            },
        },
        ManifestDescriptor {
            ecosystem: Ecosystem::NuGet,
            matcher: FileMatcher::Exact("packages.config"),
            syntax: ManifestSyntax::TagMarkup {
                rules: vec![tag_attribute("package", "id", RUNTIME_WEIGHT)],
            },
        },
        ManifestDescriptor {
            ecosystem: Ecosystem::SwiftPm,
            matcher: FileMatcher::Exact("package.swift"),
            syntax: ManifestSyntax::LinePattern {
                rules: vec![line_rule(
                    r#"\.package\s*\([^)]*?url:\s*"[^"]*?/([A-Za-z0-9_.-]+?)(?:\.git)?""#,
                    &[1],
                    RUNTIME_WEIGHT,
                )],
            },
        },
    ]
});

const REQUIREMENT_LINE: &str =
    r"(?m)^[ \t]*([A-Za-z0-9][A-Za-z0-9._-]*)(?:[ \t]*\[[^\]\n]*\])?[ \t]*(?:[<>=!~;@ \t#]|$)";

static REQUIREMENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^\s*([A-Za-z0-9][A-Za-z0-9._-]*)"));
static QUOTED: LazyLock<Regex> = LazyLock::new(|| regex(r#""([^"]*)"|'([^']*)'"#));
static DEPENDENCY_KEY: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^[A-Za-z0-9@][A-Za-z0-9_.@/-]*$"));

/// Descriptor responsible for a path, if it names a known manifest
pub fn descriptor_for(path: &str) -> Option<&'static ManifestDescriptor> {
    let basename = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();
    MANIFEST_DESCRIPTORS
        .iter()
        .find(|descriptor| descriptor.matcher.matches(&basename))
}

/// Parse one manifest file. Within a file the first rule yielding a name wins.
pub fn parse_manifest(descriptor: &ManifestDescriptor, file: &RepositoryFile) -> Result<Vec<ManifestDependency>> {
    let raw = match &descriptor.syntax {
        ManifestSyntax::JsonObject { sections, reserved } => parse_json_object(file, sections, reserved)?,
        ManifestSyntax::SectionedText { style, sections, reserved } => {
            parse_sectioned_text(&file.content, *style, sections, reserved)
        }
        ManifestSyntax::LinePattern { rules } => parse_line_patterns(&file.content, rules),
        ManifestSyntax::TagMarkup { rules } => parse_tag_markup(file, rules)?,
    };

    let mut seen = HashSet::new();
    Ok(raw
        .into_iter()
        .filter(|(name, _)| seen.insert(name.to_lowercase()))
        .map(|(name, weight)| ManifestDependency {
            name,
            weight,
            ecosystem: descriptor.ecosystem,
        })
        .collect())
}

fn is_reserved(name: &str, reserved: &[&str]) -> bool {
    let lower = name.to_lowercase();
    reserved.iter().any(|r| {
        if r.ends_with('-') {
            lower.starts_with(r)
        } else {
            lower == *r
        }
    })
}

fn parse_json_object(
    file: &RepositoryFile,
    sections: &[JsonSection],
    reserved: &[&str],
) -> Result<Vec<(String, u32)>> {
    let json: serde_json::Value = serde_json::from_str(&file.content).map_err(|e| ReposcopeError::Manifest {
        path: file.path.clone(),
        reason: e.to_string(),
    })?;

    let Some(object) = json.as_object() else {
        return Err(ReposcopeError::Manifest {
            path: file.path.clone(),
            reason: "top-level value is not an object".to_string(),
        });
    };

    let mut deps = Vec::new();
    for section in sections {
        if let Some(entries) = object.get(section.key).and_then(|v| v.as_object()) {
            for name in entries.keys() {
                if !is_reserved(name, reserved) {
                    deps.push((name.clone(), section.weight));
                }
            }
        }
    }
    Ok(deps)
}

/// Name at the start of a PEP 508 style requirement string
fn requirement_name(spec: &str) -> Option<&str> {
    REQUIREMENT_NAME
        .captures(spec)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn quoted_strings(text: &str) -> Vec<&str> {
    QUOTED
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str())
        .collect()
}

fn strip_quotes(key: &str) -> (&str, bool) {
    let trimmed = key.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed.strip_prefix(quote).and_then(|k| k.strip_suffix(quote)) {
            return (inner, true);
        }
    }
    (trimmed, false)
}

/// `]` outside of quoted strings, so `"uvicorn[standard]"` does not end an array
fn closes_array(text: &str) -> bool {
    QUOTED.replace_all(text, "").contains(']')
}

fn is_section_header(raw: &str, style: SectionStyle) -> bool {
    let trimmed = raw.trim();
    match style {
        SectionStyle::Toml => trimmed.starts_with('['),
        SectionStyle::Yaml => !raw.starts_with([' ', '\t']) && !trimmed.starts_with('-'),
    }
}

/// `[dependencies.serde]` under a `[dependencies]` rule names `serde`
fn dotted_table_name<'a>(header: &'a str, rule_header: &str) -> Option<&'a str> {
    let inner = header.strip_prefix('[')?.strip_suffix(']')?;
    let rule_inner = rule_header.strip_prefix('[')?.strip_suffix(']')?;
    let rest = inner.strip_prefix(rule_inner)?.strip_prefix('.')?;
    let (name, _) = strip_quotes(rest);
    (!name.is_empty()).then_some(name)
}

fn entry_key(line: &str, style: SectionStyle) -> Option<&str> {
    let separator = match style {
        SectionStyle::Toml => '=',
        SectionStyle::Yaml => ':',
    };
    let (key, _) = line.split_once(separator)?;
    let (key, quoted) = strip_quotes(key);
    let key = if quoted || style == SectionStyle::Yaml {
        key
    } else {
        // serde.workspace = true
        key.split('.').next().unwrap_or(key)
    };
    DEPENDENCY_KEY.is_match(key).then_some(key)
}

fn parse_sectioned_text(
    content: &str,
    style: SectionStyle,
    sections: &[SectionRule],
    reserved: &[&str],
) -> Vec<(String, u32)> {
    let mut deps = Vec::new();
    let mut current: Option<&SectionRule> = None;
    let mut entry_indent: Option<usize> = None;
    // Some(weight) while inside a multi-line array whose items are collected
    let mut open_array: Option<Option<u32>> = None;

    let push = |deps: &mut Vec<(String, u32)>, name: &str, weight: u32| {
        if !is_reserved(name, reserved) {
            deps.push((name.to_string(), weight));
        }
    };

    for raw in content.lines() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(collect) = open_array {
            if let Some(weight) = collect {
                for item in quoted_strings(trimmed) {
                    if let Some(name) = requirement_name(item) {
                        push(&mut deps, name, weight);
                    }
                }
            }
            if closes_array(trimmed) {
                open_array = None;
            }
            continue;
        }

        if is_section_header(raw, style) {
            current = None;
            entry_indent = None;
            for rule in sections {
                if trimmed == rule.header {
                    current = Some(rule);
                } else if rule.mode == SectionMode::Keys {
                    if let Some(name) = dotted_table_name(trimmed, rule.header) {
                        push(&mut deps, name, rule.weight);
                    }
                }
            }
            continue;
        }

        let Some(rule) = current else {
            continue;
        };

        let indent = raw.len() - raw.trim_start().len();
        match entry_indent {
            Some(expected) if indent > expected => continue,
            Some(_) => {}
            None => entry_indent = Some(indent),
        }

        let Some(key) = entry_key(trimmed, style) else {
            continue;
        };
        let value = trimmed
            .split_once(if style == SectionStyle::Toml { '=' } else { ':' })
            .map(|(_, v)| v.trim())
            .unwrap_or("");

        let collect_items = match rule.mode {
            SectionMode::Keys => {
                push(&mut deps, key, rule.weight);
                None
            }
            SectionMode::ArrayKey(wanted) if key == wanted => Some(rule.weight),
            SectionMode::ArrayKey(_) => None,
            SectionMode::AllArrays => Some(rule.weight),
        };

        if value.starts_with('[') {
            if let Some(weight) = collect_items {
                for item in quoted_strings(value) {
                    if let Some(name) = requirement_name(item) {
                        push(&mut deps, name, weight);
                    }
                }
            }
            if !closes_array(value) {
                open_array = Some(collect_items);
            }
        }
    }

    deps
}

fn parse_line_patterns(content: &str, rules: &[LineRule]) -> Vec<(String, u32)> {
    let mut deps = Vec::new();

    for rule in rules {
        let bodies: Vec<&str> = match &rule.block {
            Some(block) => captures_of(block, content, 1),
            None => vec![content],
        };

        for body in bodies {
            let names: Vec<String> = if rule.groups.len() == 1 {
                captures_of(&rule.pattern, body, rule.groups[0])
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            } else {
                joined_captures(&rule.pattern, body, rule.groups, ":")
            };
            deps.extend(names.into_iter().map(|name| (name, rule.weight)));
        }
    }

    deps
}

fn parse_tag_markup(file: &RepositoryFile, rules: &[TagRule]) -> Result<Vec<(String, u32)>> {
    if !file.content.trim_start().starts_with('<') {
        return Err(ReposcopeError::Manifest {
            path: file.path.clone(),
            reason: "expected XML markup".to_string(),
        });
    }

    let mut deps = Vec::new();

    for rule in rules {
        match rule {
            TagRule::Pair { block, first, second, scope, separator, weight } => {
                for body in captures_of(block, &file.content, 1) {
                    let firsts = captures_of(first, body, 1);
                    let seconds = captures_of(second, body, 1);
                    let (Some(a), Some(b)) = (firsts.first(), seconds.first()) else {
                        continue;
                    };

                    let scoped_weight = scope
                        .as_ref()
                        .and_then(|re| captures_of(re, body, 1).first().map(|s| s.to_lowercase()))
                        .map(|s| match s.as_str() {
                            "test" | "provided" => DEV_WEIGHT,
                            "system" | "import" => OPTIONAL_WEIGHT,
                            _ => *weight,
                        })
                        .unwrap_or(*weight);

                    deps.push((format!("{}{}{}", a, separator, b), scoped_weight));
                }
            }
            TagRule::Attribute { pattern, weight } => {
                deps.extend(
                    captures_of(pattern, &file.content, 1)
                        .into_iter()
                        .map(|name| (name.to_string(), *weight)),
                );
            }
        }
    }

    Ok(deps)
}
