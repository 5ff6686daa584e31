//! Shell syntax-tree walk (§4.3): flags pipe-to-shell installers, privilege
//! escalation via `sudo`, and `eval` over interpolated strings.

use crate::types::{Category, Finding, Severity};
use tree_sitter::{Node, Parser};
use tree_sitter_bash::LANGUAGE as BASH;

const EVIDENCE_MAX_CHARS: usize = 200;
const SHELL_INTERPRETERS: &[&str] = &["sh", "bash", "zsh", "dash"];
const FETCH_COMMANDS: &[&str] = &["curl", "wget"];

pub fn analyze(path: &str, text: &str) -> Vec<Finding> {
    let mut parser = Parser::new();
    if parser.set_language(&BASH.into()).is_err() {
        return vec![super::unparseable_finding(path, "shell")];
    }
    let Some(tree) = parser.parse(text, None) else {
        return vec![super::unparseable_finding(path, "shell")];
    };
    if tree.root_node().has_error() {
        return vec![super::unparseable_finding(path, "shell")];
    }

    let mut findings = Vec::new();
    let mut downloaded_files: Vec<String> = Vec::new();
    let mut chmod_executed_files: Vec<String> = Vec::new();

    walk(tree.root_node(), &mut |node| {
        match node.kind() {
            "pipeline" => {
                let commands = command_names(node, text);
                if let Some(first) = commands.first() {
                    if FETCH_COMMANDS.contains(&first.as_str())
                        && commands
                            .iter()
                            .skip(1)
                            .any(|c| SHELL_INTERPRETERS.contains(&c.as_str()))
                    {
                        findings.push(Finding {
                            analyzer: "ast".to_string(),
                            category: Category::SocialEngineering,
                            severity: Severity::Critical,
                            title: "Downloaded script executed via direct pipe to shell"
                                .to_string(),
                            detail: format!("{path} pipes `{first}` output straight into a shell"),
                            file: Some(path.to_string()),
                            line: Some(node.start_position().row + 1),
                            evidence: Some(truncate(node_text(node, text))),
                            cwe: Some("CWE-494".to_string()),
                            recommendation:
                                "Download, verify, then execute scripts separately instead of piping into a shell."
                                    .to_string(),
                            suppressed: false,
                        });
                    }
                }
            }
            "command" => {
                let name = command_name(node, text);
                if name.as_deref() == Some("sudo") {
                    findings.push(Finding {
                        analyzer: "ast".to_string(),
                        category: Category::ExcessivePermissions,
                        severity: Severity::High,
                        title: "Elevated privileges requested via sudo".to_string(),
                        detail: format!("{path} invokes `sudo`"),
                        file: Some(path.to_string()),
                        line: Some(node.start_position().row + 1),
                        evidence: Some(truncate(node_text(node, text))),
                        cwe: Some("CWE-250".to_string()),
                        recommendation: "Avoid requiring root privileges for an agent skill.".to_string(),
                        suppressed: false,
                    });
                }
                if name.as_deref() == Some("eval") && node_text(node, text).contains('$') {
                    findings.push(Finding {
                        analyzer: "ast".to_string(),
                        category: Category::Malware,
                        severity: Severity::High,
                        title: "eval over an interpolated string".to_string(),
                        detail: format!("{path} evaluates a string built from variable expansion"),
                        file: Some(path.to_string()),
                        line: Some(node.start_position().row + 1),
                        evidence: Some(truncate(node_text(node, text))),
                        cwe: Some("CWE-95".to_string()),
                        recommendation: "Avoid eval over dynamically constructed shell input.".to_string(),
                        suppressed: false,
                    });
                }
                if let Some(name) = &name {
                    if FETCH_COMMANDS.contains(&name.as_str()) {
                        if let Some(output) = output_argument(node, text) {
                            downloaded_files.push(output);
                        }
                    } else if name == "chmod" && node_text(node, text).contains("+x") {
                        if let Some(target) = last_argument(node, text) {
                            chmod_executed_files.push(target.trim_start_matches("./").to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    });

    for file in &downloaded_files {
        if chmod_executed_files.iter().any(|f| f == file) {
            findings.push(Finding {
                analyzer: "ast".to_string(),
                category: Category::SocialEngineering,
                severity: Severity::Critical,
                title: "Downloaded file made executable and run".to_string(),
                detail: format!("{path} downloads `{file}`, chmods it +x, then executes it"),
                file: Some(path.to_string()),
                line: None,
                evidence: None,
                cwe: Some("CWE-494".to_string()),
                recommendation: "Verify downloaded artifacts before granting execute permission.".to_string(),
                suppressed: false,
            });
        }
    }

    findings
}

fn command_name(node: Node, text: &str) -> Option<String> {
    let name_node = node.child_by_field_name("name")?;
    Some(name_node.utf8_text(text.as_bytes()).ok()?.to_string())
}

fn command_names(pipeline: Node, text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cursor = pipeline.walk();
    for child in pipeline.named_children(&mut cursor) {
        if child.kind() == "command" {
            if let Some(name) = command_name(child, text) {
                out.push(name);
            }
        }
    }
    out
}

fn output_argument(command: Node, text: &str) -> Option<String> {
    let mut cursor = command.walk();
    let words: Vec<&str> = command
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "word")
        .filter_map(|c| c.utf8_text(text.as_bytes()).ok())
        .collect();
    for (idx, w) in words.iter().enumerate() {
        if (*w == "-o" || *w == "--output") && idx + 1 < words.len() {
            return Some(words[idx + 1].trim_start_matches("./").to_string());
        }
    }
    None
}

fn last_argument(command: Node, text: &str) -> Option<String> {
    let mut cursor = command.walk();
    command
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "word")
        .filter_map(|c| c.utf8_text(text.as_bytes()).ok())
        .last()
        .map(|s| s.to_string())
}

fn node_text<'a>(node: Node, text: &'a str) -> &'a str {
    node.utf8_text(text.as_bytes()).unwrap_or_default()
}

fn truncate(s: &str) -> String {
    Finding::truncate_evidence(s, EVIDENCE_MAX_CHARS)
}

fn walk<'a>(node: Node<'a>, visit: &mut impl FnMut(Node<'a>)) {
    visit(node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, visit);
    }
}
