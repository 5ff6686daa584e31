//! The bundled rule set (§4.2 "Required rules", plus supplemental
//! coverage recorded in SPEC_FULL.md §4.2).
//!
//! Regex-dialect rules are consumed by the Static Analyzer; pattern-dialect
//! rules are consumed by the Pattern Analyzer. Grouped by category for
//! readability; the category itself lives on each [`Rule`], not on the
//! grouping.

use super::dsl::{Condition, SubPattern};
use super::{PatternSpec, Rule, RuleKind};
use crate::types::{Category, Severity};
use regex::Regex;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("bundled rule regex `{pattern}` is invalid: {e}"))
}

fn regex_rule(
    id: &'static str,
    category: Category,
    severity: Severity,
    description: &'static str,
    cwe: Option<&'static str>,
    remediation: &'static str,
    pattern: &str,
) -> Rule {
    Rule {
        id,
        category,
        severity,
        description,
        cwe,
        remediation,
        kind: RuleKind::Regex(re(pattern)),
    }
}

/// A pattern-dialect rule whose condition fires when any named sub-pattern
/// alone is present (the common "single literal/regex family" case).
fn any_of_rule(
    id: &'static str,
    category: Category,
    severity: Severity,
    description: &'static str,
    cwe: Option<&'static str>,
    remediation: &'static str,
    patterns: Vec<(&'static str, SubPattern)>,
) -> Rule {
    let names: Vec<&'static str> = patterns.iter().map(|(n, _)| *n).collect();
    Rule {
        id,
        category,
        severity,
        description,
        cwe,
        remediation,
        kind: RuleKind::Pattern(PatternSpec {
            sub_patterns: patterns,
            condition: Condition::any_of(&names),
        }),
    }
}

pub fn bundled_rules() -> Vec<Rule> {
    let mut rules = Vec::new();
    rules.extend(credential_exposure_rules());
    rules.extend(prompt_injection_rules());
    rules.extend(memory_manipulation_rules());
    rules.extend(obfuscation_rules());
    rules.extend(network_exfiltration_rules());
    rules.extend(social_engineering_rules());
    rules.extend(supply_chain_rules());
    rules.extend(malware_rules());
    rules.extend(excessive_permissions_rules());
    rules
}

fn credential_exposure_rules() -> Vec<Rule> {
    vec![
        regex_rule(
            "cred/aws-access-key",
            Category::CredentialExposure,
            Severity::Critical,
            "AWS access key id literal",
            Some("CWE-798"),
            "Remove the hard-coded key and load credentials from the environment or a secrets manager.",
            r"AKIA[0-9A-Z]{16}",
        ),
        regex_rule(
            "cred/github-token",
            Category::CredentialExposure,
            Severity::Critical,
            "GitHub personal access token literal",
            Some("CWE-798"),
            "Revoke the token and load it from a secret store instead of embedding it in the skill.",
            r"gh[pousr]_[A-Za-z0-9]{20,}",
        ),
        regex_rule(
            "cred/pem-private-key",
            Category::CredentialExposure,
            Severity::Critical,
            "PEM private key banner",
            Some("CWE-798"),
            "Remove the private key material from the skill package entirely.",
            r"-----BEGIN (RSA |EC |OPENSSH |DSA |)PRIVATE KEY-----",
        ),
        regex_rule(
            "cred/env-harvest",
            Category::CredentialExposure,
            Severity::High,
            "Environment-variable harvesting (dumping or reading process environment)",
            Some("CWE-200"),
            "Avoid dumping the full environment; read only the specific variables the skill needs.",
            r"(?i)(cat\s+[^\n]*\.env\b|env\s*>|printenv\b|os\.environ\b|process\.env\b)",
        ),
        regex_rule(
            "cred/ssh-key-read",
            Category::CredentialExposure,
            Severity::Critical,
            "Reads a private SSH key from the user's home directory",
            Some("CWE-522"),
            "Never read `~/.ssh` key material from a skill script.",
            r"(?i)~/\.ssh/(id_rsa|id_ed25519|id_ecdsa)\b",
        ),
        regex_rule(
            "cred/aws-dir-read",
            Category::CredentialExposure,
            Severity::High,
            "Reads AWS credential files from the user's home directory",
            Some("CWE-522"),
            "Never read `~/.aws` credential material from a skill script.",
            r"(?i)~/\.aws/(credentials|config)\b",
        ),
        regex_rule(
            "cred/kube-dir-read",
            Category::CredentialExposure,
            Severity::High,
            "Reads Kubernetes credentials from the user's home directory",
            Some("CWE-522"),
            "Never read `~/.kube/config` from a skill script.",
            r"(?i)~/\.kube/config\b",
        ),
    ]
}

fn prompt_injection_rules() -> Vec<Rule> {
    let phrase = |id: &'static str, desc: &'static str, pattern: &str| {
        regex_rule(
            id,
            Category::PromptInjection,
            Severity::Critical,
            desc,
            Some("CWE-1427"),
            "Remove instructions that attempt to override the agent's system prompt or prior directives.",
            pattern,
        )
    };
    vec![
        phrase(
            "prompt/ignore-previous",
            "Phrase attempting to override prior instructions",
            r"(?i)ignore (all )?(previous|prior) instructions",
        ),
        phrase(
            "prompt/disregard-previous",
            "Phrase attempting to override prior instructions",
            r"(?i)disregard (all )?(previous|prior)",
        ),
        phrase(
            "prompt/system-prompt-override",
            "Explicit system prompt override phrase",
            r"(?i)system prompt override",
        ),
        phrase(
            "prompt/you-are-now",
            "Role-manipulation phrase reassigning the agent's identity",
            r"(?i)you are now\b",
        ),
        phrase(
            "prompt/core-directive",
            "Reference to a fabricated 'core directive' override mechanism",
            r"CORE DIRECTIVE",
        ),
        phrase(
            "prompt/skill-override",
            "Reference to a fabricated skill-override mechanism",
            r"SKILL_OVERRIDE",
        ),
    ]
}

fn memory_manipulation_rules() -> Vec<Rule> {
    vec![
        any_of_rule(
            "memory/stealth-memory-file-override",
            Category::PromptInjection,
            Severity::Critical,
            "Stealth phrasing combined with an instruction targeting a persistent-memory file",
            Some("CWE-1427"),
            "Remove instructions that silently rewrite persistent-memory files such as MEMORY.md.",
            vec![(
                "combo",
                SubPattern::Regex(re(
                    r"(?is)(do not mention|silently|never report)[^\n]{0,200}(HEARTBEAT|MEMORY|SOUL)\.md|(HEARTBEAT|MEMORY|SOUL)\.md[^\n]{0,200}(do not mention|silently|never report)",
                )),
            )],
        ),
        regex_rule(
            "memory/writes-to-memory-file",
            Category::MemoryManipulation,
            Severity::Medium,
            "Script writes to a persistent-memory file without an accompanying stealth phrase",
            None,
            "Confirm that writes to HEARTBEAT.md/MEMORY.md/SOUL.md are intentional and disclosed to the user.",
            r">>?\s*[^\n]*\b(HEARTBEAT|MEMORY|SOUL)\.md\b",
        ),
    ]
}

fn obfuscation_rules() -> Vec<Rule> {
    vec![
        any_of_rule(
            "obfuscation/decode-sigil",
            Category::Obfuscation,
            Severity::High,
            "Use of a base64/hex decode primitive commonly paired with dynamic execution",
            Some("CWE-506"),
            "Avoid decoding and running payloads that are not visible in plain text in the skill.",
            vec![(
                "decode",
                SubPattern::Regex(re(r"base64\.b64decode|atob\(|bytes\.fromhex")),
            )],
        ),
        regex_rule(
            "obfuscation/long-base64-string",
            Category::Obfuscation,
            Severity::Medium,
            "Long contiguous base64-looking string, often an embedded payload",
            Some("CWE-506"),
            "Replace embedded encoded payloads with plain, reviewable source.",
            r"[A-Za-z0-9+/]{100,}={0,2}",
        ),
        regex_rule(
            "obfuscation/string-concat-url",
            Category::Obfuscation,
            Severity::Medium,
            "URL built from concatenated string fragments, obscuring the destination",
            Some("CWE-506"),
            "Write URLs as a single literal so the destination is reviewable.",
            r#"(["'][\w:/.\-]*["']\s*\+\s*){2,}["']?"#,
        ),
    ]
}

fn network_exfiltration_rules() -> Vec<Rule> {
    vec![
        regex_rule(
            "netex/http-post-external",
            Category::NetworkExfiltration,
            Severity::High,
            "Outbound HTTP POST, potentially exfiltrating local data",
            Some("CWE-201"),
            "Confirm the destination is expected and document what data is sent.",
            r"(?i)(curl\s+[^\n]*-X\s*POST|curl\s+[^\n]*--request\s+POST|requests\.post\(|\.post\(\s*['\x22])",
        ),
        any_of_rule(
            "netex/paste-service",
            Category::NetworkExfiltration,
            Severity::Medium,
            "Reference to a public paste service, a common exfiltration drop point",
            None,
            "Avoid sending skill-generated data to public paste services.",
            vec![(
                "paste",
                SubPattern::Regex(re(r"(?i)pastebin\.com|hastebin\.com|dpaste\.org")),
            )],
        ),
        any_of_rule(
            "netex/url-shortener",
            Category::NetworkExfiltration,
            Severity::Medium,
            "Reference to a URL shortener, which can hide the true destination",
            None,
            "Use the unshortened destination URL so reviewers can see where data goes.",
            vec![(
                "shortener",
                SubPattern::Regex(re(r"(?i)bit\.ly/|tinyurl\.com/|\bt\.co/")),
            )],
        ),
        any_of_rule(
            "netex/webhook-url",
            Category::NetworkExfiltration,
            Severity::Medium,
            "Reference to a chat-webhook endpoint, a common exfiltration channel",
            None,
            "Confirm the webhook destination is expected and documented.",
            vec![(
                "webhook",
                SubPattern::Regex(re(r"(?i)discord\.com/api/webhooks|api\.telegram\.org/bot")),
            )],
        ),
        regex_rule(
            "netex/raw-ipv4",
            Category::NetworkExfiltration,
            Severity::Low,
            "Raw IPv4 address, bypassing hostname-based review/allowlisting",
            None,
            "Use a DNS name so the destination can be reviewed and allowlisted.",
            r"\b(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\b",
        ),
    ]
}

fn social_engineering_rules() -> Vec<Rule> {
    vec![regex_rule(
        "social/pipe-to-shell",
        Category::SocialEngineering,
        Severity::Critical,
        "Installer downloads a script and pipes it directly into a shell",
        Some("CWE-494"),
        "Download the script, let the user inspect it, then run it explicitly instead of piping to a shell.",
        r"(?i)(curl|wget)\s+[^\n|]*\|\s*(sudo\s+)?(bash|sh)\b",
    )]
}

fn supply_chain_rules() -> Vec<Rule> {
    vec![
        regex_rule(
            "supply/unpinned-npm",
            Category::SupplyChain,
            Severity::Low,
            "npm/bun package installed without a pinned version",
            None,
            "Pin an exact version instead of installing `@latest`.",
            r"(?i)(npm|bun)\s+(install|add)\s+[^\n]*@latest",
        ),
        regex_rule(
            "supply/unpinned-pip",
            Category::SupplyChain,
            Severity::Low,
            "Python package installed without a pinned version",
            None,
            "Pin an exact version with `==` instead of installing the latest release.",
            r"pip3?\s+install\s+[A-Za-z0-9_\-]+\s*$",
        ),
        regex_rule(
            "supply/non-default-registry",
            Category::SupplyChain,
            Severity::Medium,
            "Package install points at a non-default registry/index",
            None,
            "Verify the registry is trusted before installing from it.",
            r"(?i)(--index-url|--registry)\s*[=\s]\s*https?://\S+",
        ),
    ]
}

fn malware_rules() -> Vec<Rule> {
    vec![
        regex_rule(
            "malware/reverse-shell-netcat",
            Category::Malware,
            Severity::Critical,
            "Netcat reverse shell invocation",
            Some("CWE-78"),
            "Remove the reverse-shell invocation; it establishes a remote backdoor.",
            r"(?i)\bnc\s+[^\n]*-e\s+/bin/(ba)?sh",
        ),
        regex_rule(
            "malware/reverse-shell-dev-tcp",
            Category::Malware,
            Severity::Critical,
            "Bash /dev/tcp reverse shell",
            Some("CWE-78"),
            "Remove the reverse-shell invocation; it establishes a remote backdoor.",
            r"/dev/tcp/[^\n]+",
        ),
        regex_rule(
            "malware/destructive-rm",
            Category::Malware,
            Severity::Critical,
            "Recursive forced delete of the home or root directory",
            Some("CWE-732"),
            "Remove the destructive delete; never target $HOME or / with `rm -rf`.",
            r"rm\s+-[a-z]*r[a-z]*f[a-z]*\s+(\$HOME|~|/)(\s|$)",
        ),
    ]
}

fn excessive_permissions_rules() -> Vec<Rule> {
    vec![regex_rule(
        "perm/chmod-wide-open",
        Category::ExcessivePermissions,
        Severity::Medium,
        "chmod grants execute or world-writable permissions",
        Some("CWE-732"),
        "Grant the minimum permission needed instead of +x/755/777 on arbitrary paths.",
        r"chmod\s+(\+x\b|755\b|777\b)",
    )]
}
