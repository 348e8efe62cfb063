//! Small text helpers shared by ingest and the record API

/// Lowercase with Turkish dotted/dotless I rules.
///
/// `str::to_lowercase` maps `I` to `i`, which breaks matching of words such as
/// "MAYIS" or "HAYIR" against their lowercase forms.
pub fn turkish_lowercase(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            'I' => out.push('ı'),
            'İ' => out.push('i'),
            other => out.extend(other.to_lowercase()),
        }
    }
    out
}

/// Trimmed copy of `s`, or `None` when it is blank
pub fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a yes/no answer as written in the fault sheets.
///
/// Blank and unrecognized answers are unknown (`None`).
pub fn parse_yes_no(s: &str) -> Option<bool> {
    match turkish_lowercase(s.trim()).as_str() {
        "evet" | "e" | "var" | "yes" | "y" | "true" | "1" => Some(true),
        "hayır" | "hayir" | "h" | "yok" | "no" | "n" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Inverse of [`parse_yes_no`] for display and export
pub fn yes_no_label(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "Evet",
        Some(false) => "Hayır",
        None => "",
    }
}
