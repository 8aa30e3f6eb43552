//! Speakable text for a sentence unit.
//!
//! The scheduler never changes unit ranges; it only decides what string to
//! send to the synthesis service for a unit. Manuscripts are often written in
//! light markup, and a voice reading "asterisk asterisk" aloud is useless, so
//! the markup layer can be stripped before the request goes out.

/// Turn a unit's source slice into the text sent for synthesis.
///
/// Whitespace (including line breaks inside the sentence) is collapsed to
/// single spaces and trimmed. With `strip_markup`, each line additionally
/// loses heading and list markers, blockquote arrows, emphasis markers,
/// inline-code backticks, link targets and HTML tags.
#[must_use]
pub fn prepare_for_speech(source: &str, strip_markup: bool) -> String {
    if !strip_markup {
        return collapse_whitespace(source);
    }

    let mut result = String::with_capacity(source.len());
    for line in source.lines() {
        if is_horizontal_rule(line.trim()) {
            continue;
        }
        let processed = strip_line_markup(line);
        let processed = processed.trim();
        if processed.is_empty() {
            continue;
        }
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(processed);
    }

    collapse_whitespace(&result)
}

fn is_horizontal_rule(line: &str) -> bool {
    let chars: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    chars.len() >= 3
        && chars.iter().all(|&c| c == '-' || c == '*' || c == '_')
        && chars.windows(2).all(|w| w[0] == w[1])
}

fn strip_line_markup(line: &str) -> String {
    let mut s = line.trim_start().to_string();

    while s.starts_with('>') {
        s = s.trim_start_matches('>').trim_start().to_string();
    }
    if s.starts_with('#') {
        s = s.trim_start_matches('#').trim_start().to_string();
    }

    s = strip_list_marker(&s);
    s = strip_links(&s);
    s = s.replace('`', "");
    s = strip_emphasis(&s);
    strip_html_tags(&s)
}

fn strip_list_marker(line: &str) -> String {
    if let Some(rest) = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("+ "))
    {
        return rest.to_string();
    }

    // Numbered: "1. item", "2) item"
    if let Some(pos) = line.find(|c: char| !c.is_ascii_digit()) {
        let after = &line[pos..];
        if pos > 0 && (after.starts_with(". ") || after.starts_with(") ")) {
            return after[2..].to_string();
        }
    }

    line.to_string()
}

/// `[text](target)` → `text`; `![alt](target)` → `alt`.
fn strip_links(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '!' && chars.peek() == Some(&'[') {
            continue;
        }
        if c != '[' {
            result.push(c);
            continue;
        }

        let label: String = chars.by_ref().take_while(|&c| c != ']').collect();
        if chars.peek() == Some(&'(') {
            chars.next();
            let _target: String = chars.by_ref().take_while(|&c| c != ')').collect();
            result.push_str(&label);
        } else {
            result.push('[');
            result.push_str(&label);
            result.push(']');
        }
    }

    result
}

fn strip_emphasis(text: &str) -> String {
    // Single underscores are left alone: they show up inside identifiers
    // and names far more often than as emphasis.
    text.replace("**", "")
        .replace("__", "")
        .replace("~~", "")
        .replace('*', "")
}

fn strip_html_tags(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;

    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }

    result
}

/// Join the words of `text` with single spaces.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
