//! Telegram MarkdownV2 escaping.

/// Characters MarkdownV2 treats as markup outside code entities.
const MARKDOWN_V2_RESERVED: &[char] = &[
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Longest sendMessage text Telegram accepts, counted in UTF-16 code units.
pub const MESSAGE_LIMIT: usize = 4096;

/// Length as Telegram counts it (UTF-16 code units).
pub fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

/// `s` cut to at most `max` UTF-16 units; a trailing `…` marks the cut.
pub fn clip(s: &str, max: usize) -> String {
    if utf16_len(s) <= max {
        return s.to_string();
    }
    let budget = max.saturating_sub(1);
    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        if used + c.len_utf16() > budget {
            break;
        }
        used += c.len_utf16();
        end = idx + c.len_utf8();
    }
    format!("{}…", &s[..end])
}

/// Escape text for use outside code entities.
pub fn escape_markdown_v2(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if MARKDOWN_V2_RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape text for use inside a ``` block: only backslash and backtick are special there.
pub fn escape_code_block(s: &str) -> String {
    s.replace('\\', "\\\\").replace('`', "\\`")
}

/// Fenced code block with a language tag, content escaped.
pub fn code_block(lang: &str, content: &str) -> String {
    format!("```{}\n{}\n```", lang, escape_code_block(content))
}
