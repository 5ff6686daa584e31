//! Python syntax-tree walk (§4.3): flags dynamic execution, shell-outs,
//! and the network-fetch-then-execute sequence that regexes alone can't
//! reliably distinguish from a legitimate `subprocess` or `requests` call.

use crate::types::{Category, Finding, Severity};
use tree_sitter::{Node, Parser};
use tree_sitter_python::LANGUAGE as PYTHON;

const EVIDENCE_MAX_CHARS: usize = 200;
const FETCH_CALLEES: &[&str] = &[
    "urlopen",
    "urlretrieve",
    "get",
    "post",
    "request",
];

pub fn analyze(path: &str, text: &str) -> Vec<Finding> {
    let mut parser = Parser::new();
    if parser.set_language(&PYTHON.into()).is_err() {
        return vec![super::unparseable_finding(path, "python")];
    }
    let Some(tree) = parser.parse(text, None) else {
        return vec![super::unparseable_finding(path, "python")];
    };
    if tree.root_node().has_error() {
        return vec![super::unparseable_finding(path, "python")];
    }

    let mut findings = Vec::new();
    let mut imports_socket = false;
    let mut reads_os_environ = false;
    let mut has_fetch_call = false;
    let mut has_dynamic_exec = false;

    walk(tree.root_node(), &mut |node| {
        match node.kind() {
            "import_statement" | "import_from_statement"
                if node.utf8_text(text.as_bytes()).unwrap_or_default().contains("socket") =>
            {
                imports_socket = true;
            }
            "attribute" => {
                let snippet = node.utf8_text(text.as_bytes()).unwrap_or_default();
                if snippet == "os.environ" || snippet.starts_with("os.environ.") {
                    reads_os_environ = true;
                }
            }
            "call" => {
                let Some(func) = node.child_by_field_name("function") else {
                    return;
                };
                let func_text = func.utf8_text(text.as_bytes()).unwrap_or_default();
                let callee = func_text.rsplit('.').next().unwrap_or(func_text);

                if matches!(callee, "eval" | "exec" | "compile" | "__import__") {
                    has_dynamic_exec = true;
                    findings.push(Finding {
                        analyzer: "ast".to_string(),
                        category: Category::Malware,
                        severity: Severity::Critical,
                        title: "Dynamic code execution".to_string(),
                        detail: format!("Call to `{callee}` in {path}"),
                        file: Some(path.to_string()),
                        line: Some(node.start_position().row + 1),
                        evidence: Some(truncate(node_text(node, text))),
                        cwe: Some("CWE-95".to_string()),
                        recommendation: "Avoid evaluating dynamically constructed code at runtime.".to_string(),
                        suppressed: false,
                    });
                }

                if func_text == "os.system" {
                    findings.push(Finding {
                        analyzer: "ast".to_string(),
                        category: Category::Malware,
                        severity: Severity::High,
                        title: "Shell command executed via os.system".to_string(),
                        detail: format!("Call to `os.system` in {path}"),
                        file: Some(path.to_string()),
                        line: Some(node.start_position().row + 1),
                        evidence: Some(truncate(node_text(node, text))),
                        cwe: Some("CWE-78".to_string()),
                        recommendation: "Use subprocess with an argument list instead of a shell string.".to_string(),
                        suppressed: false,
                    });
                }

                if func_text.starts_with("subprocess.") && call_has_shell_true(node, text) {
                    findings.push(Finding {
                        analyzer: "ast".to_string(),
                        category: Category::Malware,
                        severity: Severity::High,
                        title: "subprocess call with shell=True".to_string(),
                        detail: format!("Call to `{func_text}` in {path} sets shell=True"),
                        file: Some(path.to_string()),
                        line: Some(node.start_position().row + 1),
                        evidence: Some(truncate(node_text(node, text))),
                        cwe: Some("CWE-78".to_string()),
                        recommendation: "Pass arguments as a list and avoid shell=True.".to_string(),
                        suppressed: false,
                    });
                }

                if FETCH_CALLEES.contains(&callee)
                    && (func_text.starts_with("requests.")
                        || func_text.starts_with("urllib")
                        || func_text.starts_with("httpx.")
                        || func_text == "urlopen")
                {
                    has_fetch_call = true;
                }
            }
            _ => {}
        }
    });

    if imports_socket && reads_os_environ {
        findings.push(Finding {
            analyzer: "ast".to_string(),
            category: Category::NetworkExfiltration,
            severity: Severity::Critical,
            title: "Network socket combined with environment access".to_string(),
            detail: format!("{path} imports `socket` and reads `os.environ`"),
            file: Some(path.to_string()),
            line: None,
            evidence: None,
            cwe: Some("CWE-200".to_string()),
            recommendation: "Review why this script needs both raw sockets and environment secrets.".to_string(),
            suppressed: false,
        });
    }

    if has_fetch_call && has_dynamic_exec {
        findings.push(Finding {
            analyzer: "ast".to_string(),
            category: Category::Malware,
            severity: Severity::Critical,
            title: "Fetched content is dynamically executed".to_string(),
            detail: format!("{path} fetches remote content and also calls eval/exec/compile"),
            file: Some(path.to_string()),
            line: None,
            evidence: None,
            cwe: Some("CWE-494".to_string()),
            recommendation: "Never execute code retrieved from the network without verification.".to_string(),
            suppressed: false,
        });
    }

    findings
}

fn call_has_shell_true(call: Node, text: &str) -> bool {
    let Some(args) = call.child_by_field_name("arguments") else {
        return false;
    };
    let mut cursor = args.walk();
    for child in args.children(&mut cursor) {
        if child.kind() != "keyword_argument" {
            continue;
        }
        let Some(name) = child.child_by_field_name("name") else {
            continue;
        };
        if name.utf8_text(text.as_bytes()).unwrap_or_default() != "shell" {
            continue;
        }
        let Some(value) = child.child_by_field_name("value") else {
            continue;
        };
        if value.utf8_text(text.as_bytes()).unwrap_or_default() == "True" {
            return true;
        }
    }
    false
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_eval_call() {
        let findings = analyze("payload.py", "eval(user_input)\n");
        assert!(findings.iter().any(|f| f.title == "Dynamic code execution"));
    }

    #[test]
    fn flags_os_system() {
        let findings = analyze("payload.py", "import os\nos.system(cmd)\n");
        assert!(findings
            .iter()
            .any(|f| f.title == "Shell command executed via os.system"));
    }

    #[test]
    fn flags_subprocess_shell_true() {
        let findings = analyze(
            "payload.py",
            "import subprocess\nsubprocess.run(cmd, shell=True)\n",
        );
        assert!(findings
            .iter()
            .any(|f| f.title == "subprocess call with shell=True"));
    }

    #[test]
    fn flags_fetch_then_exec_combo() {
        let findings = analyze(
            "payload.py",
            "import requests\ncode = requests.get(url).text\nexec(code)\n",
        );
        assert!(findings
            .iter()
            .any(|f| f.title == "Fetched content is dynamically executed"));
    }

    #[test]
    fn flags_socket_plus_environ() {
        let findings = analyze(
            "payload.py",
            "import socket\nimport os\nleak(os.environ)\n",
        );
        assert!(findings
            .iter()
            .any(|f| f.title == "Network socket combined with environment access"));
    }

    #[test]
    fn benign_script_produces_no_findings() {
        let findings = analyze("helper.py", "def add(a, b):\n    return a + b\n");
        assert!(findings.is_empty());
    }

    #[test]
    fn unparseable_source_yields_best_practices_finding() {
        let findings = analyze("broken.py", "def ( :::: garbage\x00\x01");
        assert!(findings.iter().any(|f| f.category == Category::BestPractices));
    }
}
