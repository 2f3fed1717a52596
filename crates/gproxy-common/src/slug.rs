use std::collections::HashSet;

#[derive(Debug, thiserror::Error)]
pub enum SlugError {
    #[error("slug must match ^[a-z0-9][a-z0-9-]{{0,48}}[a-z0-9]$")]
    InvalidFormat,
}

/// Validates a passthrough/proxy path slug: `^[a-z0-9][a-z0-9-]{0,48}[a-z0-9]$`.
///
/// A single-character slug (just `[a-z0-9]`) is also accepted, mirroring the
/// regex's `{0,48}` middle section collapsing to zero repeats.
pub fn validate_slug(value: &str) -> Result<(), SlugError> {
    let bytes = value.as_bytes();
    let len = bytes.len();
    if len == 0 || len > 50 {
        return Err(SlugError::InvalidFormat);
    }
    let is_alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !is_alnum(bytes[0]) || !is_alnum(bytes[len - 1]) {
        return Err(SlugError::InvalidFormat);
    }
    for &b in &bytes[1..len - 1] {
        if !is_alnum(b) && b != b'-' {
            return Err(SlugError::InvalidFormat);
        }
    }
    Ok(())
}

/// Appends `-2`, `-3`, … to `base` until the result is absent from `taken`.
///
/// `base` itself is returned unchanged if it is not already taken.
pub fn ensure_unique_slug(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_slugs() {
        assert!(validate_slug("openai").is_ok());
        assert!(validate_slug("a").is_ok());
        assert!(validate_slug("my-provider-1").is_ok());
        assert!(validate_slug(&"a".repeat(50)).is_ok());
    }

    #[test]
    fn rejects_malformed_slugs() {
        assert!(validate_slug("").is_err());
        assert!(validate_slug("-abc").is_err());
        assert!(validate_slug("abc-").is_err());
        assert!(validate_slug("Abc").is_err());
        assert!(validate_slug("abc_def").is_err());
        assert!(validate_slug(&"a".repeat(51)).is_err());
    }

    #[test]
    fn ensure_unique_slug_appends_suffix() {
        let mut taken = HashSet::new();
        taken.insert("openai".to_string());
        assert_eq!(ensure_unique_slug("openai", &taken), "openai-2");
        taken.insert("openai-2".to_string());
        assert_eq!(ensure_unique_slug("openai", &taken), "openai-3");
        assert_eq!(ensure_unique_slug("claude", &taken), "claude");
    }
}
