//! Turns a skill directory into a normalized [`Skill`] value (§4.1).
//!
//! The parser is the only component in this crate that touches the
//! filesystem; once [`parse`] returns, nothing else reads the skill
//! directory again (§5).

use crate::error::ParseError;
use crate::skill::{FileEntry, InstallStep, Language, Requires, Skill};
use crate::types::{Category, Finding, Severity};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::instrument;
use walkdir::WalkDir;

/// Maximum directory depth walked below the skill root.
const MAX_DEPTH: usize = 8;
/// Maximum number of files considered across the whole tree.
const MAX_FILES: usize = 2000;
/// Maximum cumulative size, in bytes, of every file under the root.
const MAX_TOTAL_BYTES: u64 = 50 * 1024 * 1024;
/// Per-file cap on text read into memory; larger files are recorded but
/// left empty.
const MAX_FILE_TEXT_BYTES: u64 = 1024 * 1024;
/// Sample size used to sniff for a NUL byte when classifying binary files.
const BINARY_SNIFF_BYTES: usize = 8 * 1024;

const SKIP_DIR_NAMES: &[&str] = &[".venv", "venv", "node_modules"];

/// Parses `root` into a [`Skill`], plus any degraded-but-non-fatal
/// `best_practices`/`info` findings observed along the way (large files
/// skipped, unreadable entries, and the like) — see §4.1 "Failure".
#[instrument(skip_all, fields(root = %root.display()))]
pub fn parse(root: &Path) -> Result<(Skill, Vec<Finding>), ParseError> {
    let manifest_path = root.join("SKILL.md");
    if !manifest_path.is_file() {
        return Err(ParseError::ManifestMissing {
            path: manifest_path,
        });
    }
    let manifest_text = std::fs::read_to_string(&manifest_path).map_err(|e| ParseError::Io {
        path: manifest_path.clone(),
        source: e,
    })?;

    let (header, body_markdown) = split_frontmatter(&manifest_text)?;
    let header: BTreeMap<String, JsonValue> = if header.trim().is_empty() {
        BTreeMap::new()
    } else {
        let yaml_value: serde_yaml::Value =
            serde_yaml::from_str(header).map_err(|e| ParseError::ManifestInvalid {
                message: format!("header is not valid YAML: {e}"),
            })?;
        yaml_to_json_map(yaml_value)?
    };

    let name = header
        .get("name")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| ParseError::ManifestInvalid {
            message: "manifest header is missing required key `name`".to_string(),
        })?;

    let description = header
        .get("description")
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string();
    let version = header
        .get("version")
        .and_then(JsonValue::as_str)
        .map(str::to_string);
    let author = header
        .get("author")
        .and_then(JsonValue::as_str)
        .map(str::to_string);
    let license = header
        .get("license")
        .and_then(JsonValue::as_str)
        .map(str::to_string);

    let requires = parse_requires(&header);
    let install_steps = parse_install_steps(&header);

    let mut metadata: BTreeMap<String, JsonValue> = BTreeMap::new();
    if let Some(JsonValue::Object(m)) = header.get("metadata") {
        for (k, v) in m {
            metadata.insert(k.clone(), v.clone());
        }
    }
    const KNOWN_KEYS: &[&str] = &[
        "name",
        "description",
        "version",
        "author",
        "license",
        "metadata",
        "requires",
        "install",
    ];
    for (k, v) in &header {
        if !KNOWN_KEYS.contains(&k.as_str()) {
            metadata.insert(k.clone(), v.clone());
        }
    }

    let (scripts, extra_files, parse_findings) = walk(root, &manifest_path)?;

    let skill = Skill {
        name,
        description,
        version,
        author,
        license,
        metadata,
        requires,
        install_steps,
        body_markdown,
        scripts,
        extra_files,
        root_path: root.to_path_buf(),
    };

    Ok((skill, parse_findings))
}

/// Splits a manifest into its `---`-delimited YAML header and markdown body.
fn split_frontmatter(text: &str) -> Result<(&str, String), ParseError> {
    let trimmed_start = text.trim_start_matches('\u{feff}');
    let Some(after_open) = trimmed_start.strip_prefix("---") else {
        return Err(ParseError::ManifestInvalid {
            message: "manifest does not begin with a `---` header delimiter".to_string(),
        });
    };
    // The delimiter line may be followed directly by a newline.
    let after_open = after_open.strip_prefix('\r').unwrap_or(after_open);
    let after_open = after_open.strip_prefix('\n').unwrap_or(after_open);

    let Some(close_idx) = find_closing_delimiter(after_open) else {
        return Err(ParseError::ManifestInvalid {
            message: "manifest header is missing a closing `---` delimiter".to_string(),
        });
    };

    let header = &after_open[..close_idx.start];
    let body = after_open[close_idx.end..].trim_start_matches(['\r', '\n']).to_string();
    Ok((header, body))
}

struct DelimiterSpan {
    start: usize,
    end: usize,
}

/// Finds a line containing only `---` (optionally trailing `\r`), returning
/// the byte range of the header content before it and where the body
/// resumes after it.
fn find_closing_delimiter(text: &str) -> Option<DelimiterSpan> {
    let mut offset = 0usize;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed == "---" {
            return Some(DelimiterSpan {
                start: offset,
                end: offset + line.len(),
            });
        }
        offset += line.len();
    }
    None
}

fn yaml_to_json_map(
    value: serde_yaml::Value,
) -> Result<BTreeMap<String, JsonValue>, ParseError> {
    let json = serde_json::to_value(value).map_err(|e| ParseError::ManifestInvalid {
        message: format!("header could not be normalized: {e}"),
    })?;
    match json {
        JsonValue::Object(map) => Ok(map.into_iter().collect()),
        JsonValue::Null => Ok(BTreeMap::new()),
        _ => Err(ParseError::ManifestInvalid {
            message: "manifest header must be a mapping".to_string(),
        }),
    }
}

fn parse_requires(header: &BTreeMap<String, JsonValue>) -> Requires {
    let Some(JsonValue::Object(req)) = header.get("requires") else {
        return Requires::default();
    };
    let string_list = |key: &str| -> Vec<String> {
        req.get(key)
            .and_then(JsonValue::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(JsonValue::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };
    let config = req
        .get("config")
        .and_then(JsonValue::as_object)
        .map(|m| m.clone().into_iter().collect())
        .unwrap_or_default();

    Requires {
        bins: string_list("bins"),
        env: string_list("env"),
        permissions: string_list("permissions"),
        config,
    }
}

fn parse_install_steps(header: &BTreeMap<String, JsonValue>) -> Vec<InstallStep> {
    let Some(JsonValue::Array(steps)) = header.get("install") else {
        return Vec::new();
    };
    steps
        .iter()
        .filter_map(|step| {
            let obj = step.as_object()?;
            let description = obj.get("description")?.as_str()?.to_string();
            let command = obj.get("command")?.as_str()?.to_string();
            Some(InstallStep {
                description,
                command,
            })
        })
        .collect()
}

fn classify_language(path: &Path, first_line: Option<&str>) -> Option<Language> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("py") => return Some(Language::Python),
        Some("sh") | Some("bash") => return Some(Language::Bash),
        Some("js") => return Some(Language::JavaScript),
        Some("ts") => return Some(Language::TypeScript),
        _ => {}
    }
    let shebang = first_line?.strip_prefix("#!")?;
    let interpreter = shebang.trim();
    if interpreter.contains("python") {
        Some(Language::Python)
    } else if interpreter.contains("bash") || interpreter.contains("/sh") || interpreter.ends_with("sh") {
        Some(Language::Bash)
    } else if interpreter.contains("node") {
        Some(Language::JavaScript)
    } else if !interpreter.is_empty() {
        Some(Language::Unknown)
    } else {
        None
    }
}

fn is_binary_sample(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(BINARY_SNIFF_BYTES)];
    sample.contains(&0u8)
}

#[allow(clippy::type_complexity)]
fn walk(
    root: &Path,
    manifest_path: &Path,
) -> Result<(Vec<crate::skill::Script>, Vec<FileEntry>, Vec<Finding>), ParseError> {
    let mut scripts = Vec::new();
    let mut extra_files = Vec::new();
    let mut parse_findings = Vec::new();
    let mut total_bytes: u64 = 0;
    let mut file_count: usize = 0;

    let walker = WalkDir::new(root)
        .max_depth(MAX_DEPTH)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            if name.starts_with('.') {
                return false;
            }
            if entry.file_type().is_dir() && SKIP_DIR_NAMES.contains(&name.as_ref()) {
                return false;
            }
            true
        });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path == manifest_path {
            continue;
        }

        file_count += 1;
        if file_count > MAX_FILES {
            return Err(ParseError::TooLarge {
                reason: format!("skill directory contains more than {MAX_FILES} files"),
            });
        }

        let metadata = entry
            .metadata()
            .map_err(|e| ParseError::Io {
                path: path.to_path_buf(),
                source: e.into(),
            })?;
        let size_bytes = metadata.len();
        total_bytes += size_bytes;
        if total_bytes > MAX_TOTAL_BYTES {
            return Err(ParseError::TooLarge {
                reason: format!(
                    "skill directory exceeds the {} MiB cumulative size bound",
                    MAX_TOTAL_BYTES / (1024 * 1024)
                ),
            });
        }

        let rel_path = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(_) => {
                parse_findings.push(skip_finding(&rel_path, "file could not be read"));
                continue;
            }
        };
        let is_binary = is_binary_sample(&bytes);
        let first_line = if is_binary {
            None
        } else {
            String::from_utf8_lossy(&bytes).lines().next().map(str::to_string)
        };

        let language = if is_binary {
            None
        } else {
            classify_language(path, first_line.as_deref())
        };

        if let Some(language) = language {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            scripts.push(crate::skill::Script {
                path: rel_path,
                language,
                text,
                size_bytes,
            });
            continue;
        }

        if is_binary {
            extra_files.push(FileEntry {
                path: rel_path,
                size_bytes,
                is_binary: true,
                text: None,
            });
            continue;
        }

        if size_bytes > MAX_FILE_TEXT_BYTES {
            parse_findings.push(skip_finding(
                &rel_path,
                "file exceeds the per-file text cap and was recorded without its contents",
            ));
            extra_files.push(FileEntry {
                path: rel_path,
                size_bytes,
                is_binary: false,
                text: None,
            });
            continue;
        }

        let text = String::from_utf8_lossy(&bytes).into_owned();
        extra_files.push(FileEntry {
            path: rel_path,
            size_bytes,
            is_binary: false,
            text: Some(text),
        });
    }

    Ok((scripts, extra_files, parse_findings))
}

fn skip_finding(path: &str, detail: &str) -> Finding {
    Finding {
        analyzer: "parser".to_string(),
        category: Category::BestPractices,
        severity: Severity::Info,
        title: "File skipped during parsing".to_string(),
        detail: detail.to_string(),
        file: Some(path.to_string()),
        line: None,
        evidence: None,
        cwe: None,
        recommendation: "No action required; informational only.".to_string(),
        suppressed: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_skill(dir: &Path, header: &str, body: &str) {
        fs::write(
            dir.join("SKILL.md"),
            format!("---\n{header}\n---\n{body}"),
        )
        .unwrap();
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = parse(tmp.path()).unwrap_err();
        assert!(matches!(err, ParseError::ManifestMissing { .. }));
    }

    #[test]
    fn missing_name_is_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "description: hi", "body");
        let err = parse(tmp.path()).unwrap_err();
        assert!(matches!(err, ParseError::ManifestInvalid { .. }));
    }

    #[test]
    fn minimal_skill_parses() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "name: demo\ndescription: a demo skill", "# Demo\n");
        let (skill, findings) = parse(tmp.path()).unwrap();
        assert_eq!(skill.name, "demo");
        assert_eq!(skill.description, "a demo skill");
        assert!(skill.body_markdown.contains("# Demo"));
        assert!(findings.is_empty());
    }

    #[test]
    fn requires_and_install_steps_parse() {
        let tmp = tempfile::tempdir().unwrap();
        let header = r#"name: demo
requires:
  bins: [curl, jq]
  env: [API_KEY]
  permissions: [network]
install:
  - description: "set up"
    command: "pip install -r requirements.txt""#;
        write_skill(tmp.path(), header, "body");
        let (skill, _) = parse(tmp.path()).unwrap();
        assert_eq!(skill.requires.bins, vec!["curl", "jq"]);
        assert_eq!(skill.requires.env, vec!["API_KEY"]);
        assert_eq!(skill.install_steps.len(), 1);
        assert_eq!(skill.install_steps[0].command, "pip install -r requirements.txt");
    }

    #[test]
    fn scripts_are_classified_by_extension_and_shebang() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "name: demo", "body");
        fs::write(tmp.path().join("setup.sh"), "#!/bin/bash\necho hi\n").unwrap();
        fs::write(tmp.path().join("run"), "#!/usr/bin/env python3\nprint(1)\n").unwrap();
        let (skill, _) = parse(tmp.path()).unwrap();
        assert_eq!(skill.scripts.len(), 2);
        assert!(skill
            .scripts
            .iter()
            .any(|s| s.path == "setup.sh" && matches!(s.language, Language::Bash)));
        assert!(skill
            .scripts
            .iter()
            .any(|s| s.path == "run" && matches!(s.language, Language::Python)));
    }

    #[test]
    fn hidden_and_venv_directories_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "name: demo", "body");
        fs::create_dir_all(tmp.path().join(".git")).unwrap();
        fs::write(tmp.path().join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        fs::create_dir_all(tmp.path().join("node_modules/pkg")).unwrap();
        fs::write(tmp.path().join("node_modules/pkg/index.js"), "module.exports={}").unwrap();
        let (skill, _) = parse(tmp.path()).unwrap();
        assert!(skill.extra_files.is_empty());
        assert!(skill.scripts.is_empty());
    }

    #[test]
    fn binary_files_are_detected() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "name: demo", "body");
        fs::write(tmp.path().join("blob.bin"), [0u8, 1, 2, 0, 3]).unwrap();
        let (skill, _) = parse(tmp.path()).unwrap();
        let entry = skill.extra_files.iter().find(|f| f.path == "blob.bin").unwrap();
        assert!(entry.is_binary);
        assert!(entry.text.is_none());
    }
}
