//! Text formatting helpers for captions, cards and reports.

/// Groups digits in threes with commas: `1234567` → `"1,234,567"`.
#[must_use]
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Price with the won suffix used on cards and captions.
#[must_use]
pub fn format_won(price: u64) -> String {
    format!("{}원", group_thousands(price))
}

/// Returns at most `max_chars` characters of `text`, never splitting a
/// multi-byte character.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
