// Clean caller-supplied document text before it is embedded in a prompt.
// Strips invisible Unicode, drops instruction-override lines, normalizes
// whitespace, and truncates.

/// Maximum document text sent to the inference service (characters).
pub const MAX_INPUT_LENGTH: usize = 50_000;

const TRUNCATION_MARKER: &str = "…[TRUNCATED]";

/// Sanitize document text for prompt embedding.
pub fn sanitize_document_text(raw: &str) -> String {
    let cleaned = remove_invisible_chars(raw);
    let (kept, removed) = remove_override_lines(&cleaned);

    if removed > 0 {
        // Count only: document content never goes to the log.
        tracing::warn!(
            removed_lines = removed,
            "Instruction override patterns removed from document text"
        );
    }

    let normalized = normalize_whitespace(&kept);
    truncate_to_max_chars(&normalized, MAX_INPUT_LENGTH)
}

/// Escape XML-like tag characters so document text cannot close the
/// `<document>` boundary of the prompt.
pub fn escape_xml_tags(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Remove zero-width, bidi-override and control characters.
/// Preserves space, newline, carriage return and tab.
fn remove_invisible_chars(text: &str) -> String {
    text.chars()
        .filter(|c| {
            if matches!(*c, ' ' | '\n' | '\t' | '\r') {
                return true;
            }
            if matches!(
                *c,
                '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}'..='\u{2064}' | '\u{FEFF}'
            ) {
                return false;
            }
            !c.is_control()
        })
        .collect()
}

/// Prompt-template tokens that never occur in a printed document.
const TEMPLATE_MARKERS: &[&str] = &["[system]", "[inst]", "[/inst]", "<<sys>>", "note to ai:"];

/// Role labels. "System: EGCS" is real certificate content, so these only
/// count together with an instruction cue.
const ROLE_PREFIXES: &[&str] = &["system:", "assistant:"];

const INSTRUCTION_CUES: &[&str] = &[
    "you are",
    "you must",
    "instruction",
    "respond with",
    "respond only",
    "classify this",
    "output only",
];

const OVERRIDES: &[&str] = &[
    "ignore previous instructions",
    "ignore all instructions",
    "ignore the above instructions",
    "disregard your instructions",
    "forget your instructions",
    "new instructions:",
];

fn is_override_line(lower: &str) -> bool {
    if TEMPLATE_MARKERS.iter().any(|m| lower.starts_with(m)) {
        return true;
    }
    if OVERRIDES.iter().any(|o| lower.contains(o)) {
        return true;
    }
    ROLE_PREFIXES.iter().any(|p| lower.starts_with(p))
        && INSTRUCTION_CUES.iter().any(|c| lower.contains(c))
}

/// Returns (kept_text, removed_line_count).
fn remove_override_lines(text: &str) -> (String, usize) {
    let mut kept = Vec::new();
    let mut removed = 0usize;

    for line in text.lines() {
        if is_override_line(&line.trim().to_lowercase()) {
            removed += 1;
        } else {
            kept.push(line);
        }
    }

    (kept.join("\n"), removed)
}

/// Collapse runs of blank lines, trim each line, drop leading/trailing blanks.
fn normalize_whitespace(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut prev_blank = true;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_blank {
                lines.push("");
            }
            prev_blank = true;
        } else {
            lines.push(trimmed);
            prev_blank = false;
        }
    }

    while lines.last() == Some(&"") {
        lines.pop();
    }

    lines.join("\n")
}

/// Truncate to `max_chars` characters, breaking at the last whitespace when possible.
fn truncate_to_max_chars(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };

    let head = &text[..cut];
    match head.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => format!("{}{TRUNCATION_MARKER}", &head[..pos]),
        _ => format!("{head}{TRUNCATION_MARKER}"),
    }
}
