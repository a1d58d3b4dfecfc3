//! package.json reader and rewriter
//!
//! Handles:
//! - dependencies
//! - devDependencies
//! - peerDependencies
//! - optionalDependencies
//!
//! Rewriting is a text substitution scoped to each section object, so key
//! order, indentation and the trailing newline of the input survive.

use super::{DEPENDENCY_SECTIONS, MANIFEST_FILE};
use crate::domain::{DependencySpec, OutdatedEntry, VersionSpec};
use crate::error::ManifestError;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::ops::Range;

/// Manifest text after applying upgrades
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutatedManifest {
    /// New manifest text
    pub content: String,
    /// `name@version` for every package actually changed, de-duplicated
    pub changed: Vec<String>,
}

impl MutatedManifest {
    /// Returns true if nothing was rewritten
    pub fn is_unchanged(&self) -> bool {
        self.changed.is_empty()
    }
}

fn parse_root(content: &str) -> Result<Map<String, Value>, ManifestError> {
    let json: Value = serde_json::from_str(content)
        .map_err(|e| ManifestError::json_parse(MANIFEST_FILE, e.to_string()))?;
    match json {
        Value::Object(map) => Ok(map),
        _ => Err(ManifestError::NotAnObject {
            file: MANIFEST_FILE.to_string(),
        }),
    }
}

fn section<'a>(root: &'a Map<String, Value>, name: &str) -> Option<&'a Map<String, Value>> {
    root.get(name).and_then(Value::as_object)
}

/// Collect string-valued entries from every recognized section
///
/// A name declared in more than one section is reported once, from the
/// first section (in [`DEPENDENCY_SECTIONS`] order) that declares it.
pub fn parse_dependencies(content: &str) -> Result<Vec<DependencySpec>, ManifestError> {
    let root = parse_root(content)?;
    let mut seen = HashSet::new();
    let mut dependencies = Vec::new();

    for name in DEPENDENCY_SECTIONS {
        let Some(deps) = section(&root, name) else {
            continue;
        };
        for (package, range) in deps {
            if let Some(range) = range.as_str() {
                if seen.insert(package.clone()) {
                    dependencies.push(DependencySpec::new(package, range));
                }
            }
        }
    }

    Ok(dependencies)
}

/// Byte range of a section's `{...}` body in the manifest text
fn section_span(content: &str, name: &str) -> Result<Option<Range<usize>>, ManifestError> {
    let pattern = format!(r#""{}"\s*:\s*\{{[^{{}}]*\}}"#, regex::escape(name));
    let re = Regex::new(&pattern).map_err(|e| ManifestError::Rewrite {
        file: MANIFEST_FILE.to_string(),
        package: name.to_string(),
        message: format!("invalid regex pattern: {}", e),
    })?;
    let span = re
        .find_iter(content)
        .find(|m| nesting_at(content, m.start()) == Some(1))
        .map(|m| m.range());
    Ok(span)
}

/// Object/array nesting depth at `offset`, `None` when it falls inside a string
///
/// Keys of the root object sit at depth 1.
fn nesting_at(content: &str, offset: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for byte in content.as_bytes()[..offset].iter().copied() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    (!in_string).then_some(depth)
}

/// Replace one entry inside a section body, keeping the old operator prefix
///
/// Returns the rewritten body and whether the value changed.
fn rewrite_entry(
    body: &str,
    package: &str,
    new_version: &str,
) -> Result<(String, bool), ManifestError> {
    let pattern = format!(r#"("{}"\s*:\s*)"([^"]*)""#, regex::escape(package));
    let re = Regex::new(&pattern).map_err(|e| ManifestError::Rewrite {
        file: MANIFEST_FILE.to_string(),
        package: package.to_string(),
        message: format!("invalid regex pattern: {}", e),
    })?;

    let mut changed = false;
    let result = re.replace(body, |caps: &Captures| {
        let old = &caps[2];
        let new = VersionSpec::parse(old).format_updated(new_version);
        if new != old {
            changed = true;
        }
        format!(r#"{}"{}""#, &caps[1], new)
    });
    Ok((result.into_owned(), changed))
}

/// Bump every outdated entry in every section that declares it
///
/// With no outdated entries the input is returned unchanged.
pub fn apply_upgrades(
    content: &str,
    outdated: &[OutdatedEntry],
) -> Result<MutatedManifest, ManifestError> {
    let root = parse_root(content)?;
    let mut text = content.to_string();
    let mut changed = Vec::new();
    let mut expected: Vec<(&str, &str, String)> = Vec::new();

    for entry in outdated {
        let mut entry_changed = false;
        for name in DEPENDENCY_SECTIONS {
            let Some(old) = section(&root, name)
                .and_then(|deps| deps.get(&entry.name))
                .and_then(Value::as_str)
            else {
                continue;
            };

            let span = section_span(&text, name)?.ok_or_else(|| ManifestError::Rewrite {
                file: MANIFEST_FILE.to_string(),
                package: entry.name.clone(),
                message: format!("could not locate the \"{}\" block", name),
            })?;
            let (body, did_change) = rewrite_entry(&text[span.clone()], &entry.name, &entry.latest_version)?;
            text.replace_range(span, &body);

            entry_changed |= did_change;
            expected.push((
                name,
                entry.name.as_str(),
                VersionSpec::parse(old).format_updated(&entry.latest_version),
            ));
        }
        let label = entry.upgraded_name();
        if entry_changed && !changed.contains(&label) {
            changed.push(label);
        }
    }

    if changed.is_empty() {
        return Ok(MutatedManifest {
            content: content.to_string(),
            changed,
        });
    }

    // the substitution must leave valid JSON carrying exactly the new values
    let rewritten = parse_root(&text)?;
    for (name, package, value) in expected {
        let actual = section(&rewritten, name)
            .and_then(|deps| deps.get(package))
            .and_then(Value::as_str);
        if actual != Some(value.as_str()) {
            return Err(ManifestError::Rewrite {
                file: MANIFEST_FILE.to_string(),
                package: package.to_string(),
                message: format!(
                    "expected \"{}\" in {}, found {:?}",
                    value, name, actual
                ),
            });
        }
    }

    Ok(MutatedManifest {
        content: text,
        changed,
    })
}
