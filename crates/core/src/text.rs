use std::sync::LazyLock;

use regex::Regex;

const MAX_FILENAME_BYTES: usize = 255;

static ILLEGAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[/?<>\\:*|"]"#).expect("illegal-char regex is valid"));
static CONTROL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x00-\x1f\x{80}-\x{9f}]").expect("control-char regex is valid")
});
static RESERVED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.+$").expect("reserved-name regex is valid"));
static WINDOWS_RESERVED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(con|prn|aux|nul|com[0-9]|lpt[0-9])(\..*)?$")
        .expect("windows-reserved regex is valid")
});
static WINDOWS_TRAILING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[. ]+$").expect("trailing regex is valid"));

/// Truncate `s` to at most `limit` characters.
///
/// When a cut is needed and the kept prefix contains a newline past the first
/// character, the result ends right after the last such newline so that no
/// line is split.
pub fn truncate_string(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        return s.to_owned();
    }
    let cut: String = s.chars().take(limit).collect();
    match cut.rfind('\n') {
        Some(idx) if idx > 0 => cut[..=idx].to_owned(),
        _ => cut,
    }
}

/// Make `name` safe to use as a file name on any common filesystem.
///
/// Strips path separators, reserved and control characters, reserved device
/// names and trailing dots/spaces, then caps the result at 255 bytes.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = ILLEGAL_RE.replace_all(name, "");
    let cleaned = CONTROL_RE.replace_all(&cleaned, "");
    let cleaned = RESERVED_RE.replace_all(&cleaned, "");
    let cleaned = WINDOWS_RESERVED_RE.replace_all(&cleaned, "");
    let cleaned = WINDOWS_TRAILING_RE.replace_all(&cleaned, "");

    let mut end = cleaned.len().min(MAX_FILENAME_BYTES);
    while !cleaned.is_char_boundary(end) {
        end -= 1;
    }
    cleaned[..end].to_owned()
}
