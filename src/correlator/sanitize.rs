use std::path::Path;

pub const MAX_MESSAGE_CHARS: usize = 500;
pub const MIN_SECRET_RUN: usize = 24;

const CALLBACK_ID_PLACEHOLDER: &str = "<callback-id>";
const STORE_PLACEHOLDER: &str = "<store>";
const PATH_PLACEHOLDER: &str = "<path>";
const SECRET_PLACEHOLDER: &str = "<redacted>";

/// Scrubs an application-supplied error message before it reaches the
/// caller.
pub fn sanitize_message(message: &str, callback_id: &str, store_root: &Path) -> String {
    let mut text = message.to_string();
    if !callback_id.is_empty() {
        text = text.replace(callback_id, CALLBACK_ID_PLACEHOLDER);
    }
    let root = store_root.display().to_string();
    if root.len() > 1 {
        text = text.replace(&root, STORE_PLACEHOLDER);
    }

    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    for ch in text.chars() {
        if ch.is_whitespace() {
            push_word(&mut out, &word);
            word.clear();
            out.push(ch);
        } else {
            word.push(ch);
        }
    }
    push_word(&mut out, &word);
    truncate_chars(out.trim(), MAX_MESSAGE_CHARS)
}

fn push_word(out: &mut String, word: &str) {
    if word.is_empty() {
        return;
    }
    let leading = word.trim_start_matches(['(', '"', '\'', '[']);
    let bare = leading.trim_end_matches([')', '"', '\'', ']', ',', ';', ':']);
    if bare.len() > 1 && (bare.starts_with('/') || bare.starts_with("~/")) {
        out.push_str(&word[..word.len() - leading.len()]);
        out.push_str(PATH_PLACEHOLDER);
        out.push_str(&leading[bare.len()..]);
        return;
    }
    redact_secret_runs(out, word);
}

fn is_secret_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '+' | '/' | '=' | '-')
}

fn redact_secret_runs(out: &mut String, word: &str) {
    let mut run = String::new();
    let flush = |out: &mut String, run: &mut String| {
        if run.chars().count() >= MIN_SECRET_RUN {
            out.push_str(SECRET_PLACEHOLDER);
        } else {
            out.push_str(run);
        }
        run.clear();
    };
    for ch in word.chars() {
        if is_secret_char(ch) {
            run.push(ch);
        } else {
            flush(out, &mut run);
            out.push(ch);
        }
    }
    flush(out, &mut run);
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}
