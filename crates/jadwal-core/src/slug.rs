//! Slug normalization for human-readable schedule identifiers.

/// Generate a URL-safe slug from free text.
///
/// Lowercases, replaces anything that is not ASCII alphanumeric with hyphens,
/// collapses runs of hyphens and trims them from both ends.
///
/// - "Tahfidz Kelas A" -> "tahfidz-kelas-a"
/// - "Fiqh (Pagi) & Sore" -> "fiqh-pagi-sore"
#[must_use]
pub fn generate_slug(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
