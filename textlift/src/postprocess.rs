use std::sync::OnceLock;

use regex::Regex;

/// Shown instead of an empty result.
pub const NO_TEXT_SENTINEL: &str = "No text detected in the image.";

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Cleans raw engine output.
///
/// Collapses whitespace, reads `|` as `I`, and reads `0`/`5` as `O`/`S` when
/// wedged between two word characters (as in "C0DE" or "BU5Y"). Digits at the
/// edges of the text or next to punctuation are left alone.
pub fn post_process(raw: &str) -> String {
    let collapsed = whitespace_run().replace_all(raw, " ");
    let piped = collapsed.replace('|', "I");
    let zeros = replace_between_word_chars(&piped, '0', 'O');
    let fives = replace_between_word_chars(&zeros, '5', 'S');
    fives.trim().to_string()
}

/// Like [`post_process`], but an empty result becomes [`NO_TEXT_SENTINEL`].
pub fn finalize_text(raw: &str) -> String {
    let text = post_process(raw);
    if text.is_empty() {
        NO_TEXT_SENTINEL.to_string()
    } else {
        text
    }
}

// Neighbours are read from the input. Replacements are word characters
// themselves, so a second pass finds nothing new.
fn replace_between_word_chars(input: &str, from: char, to: char) -> String {
    let chars: Vec<char> = input.chars().collect();
    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let wedged = c == from
                && i > 0
                && i + 1 < chars.len()
                && is_word_char(chars[i - 1])
                && is_word_char(chars[i + 1]);
            if wedged {
                to
            } else {
                c
            }
        })
        .collect()
}
