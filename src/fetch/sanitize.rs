//! Filename sanitization for remote display names.

/// Name used when nothing usable is left after sanitization.
pub const FALLBACK_FILENAME: &str = "unnamed_file";

/// Maximum filename length, in characters.
pub const MAX_FILENAME_CHARS: usize = 255;

/// Characters that are invalid on at least one common filesystem.
const UNSAFE_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maps an arbitrary remote filename to a filesystem-safe local filename.
///
/// - Replaces `< > : " / \ | ? *` with `_`
/// - Strips leading/trailing whitespace and dots
/// - Returns [`FALLBACK_FILENAME`] when the result is empty
/// - Truncates to [`MAX_FILENAME_CHARS`], keeping the extension when there is one
///
/// Total and deterministic; never fails.
#[must_use]
pub fn sanitize(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect();

    let trimmed = replaced.trim_matches(is_trimmed_char);
    if trimmed.is_empty() {
        return FALLBACK_FILENAME.to_string();
    }

    truncate_preserving_extension(trimmed, MAX_FILENAME_CHARS)
}

fn is_trimmed_char(c: char) -> bool {
    c.is_whitespace() || c == '.'
}

fn truncate_preserving_extension(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }

    // The first character is never a dot here, so a dot at index 0 cannot occur.
    if let Some(dot) = name.rfind('.').filter(|&pos| pos > 0) {
        let (stem, extension) = name.split_at(dot);
        let extension_chars = extension.chars().count();
        if extension_chars < max_chars {
            let mut out: String = stem.chars().take(max_chars - extension_chars).collect();
            out.push_str(extension);
            return out;
        }
    }

    let truncated: String = name.chars().take(max_chars).collect();
    truncated.trim_end_matches(is_trimmed_char).to_string()
}
