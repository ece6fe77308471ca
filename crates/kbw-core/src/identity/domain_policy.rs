//! Email domain allowlist hardened against normalization bypasses.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::TRACING_TARGET_IDENTITY;

/// Domain accepted when no other domain is configured.
pub const DEFAULT_ALLOWED_DOMAIN: &str = "kbw.vc";

/// Exactly one `@`, a non-empty local part and a non-empty domain, no whitespace.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@([^@\s]+)$").unwrap_or_else(|_| unreachable!("pattern is constant"))
});

/// Single-tenant email policy.
///
/// An address is allowed only when its domain equals the configured domain
/// after canonicalization. Suffix matches such as `evil-kbw.vc` are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainPolicy {
    domain: String,
}

impl DomainPolicy {
    /// Creates a policy accepting addresses from `domain`.
    pub fn new(domain: impl AsRef<str>) -> Self {
        Self {
            domain: canonicalize(domain.as_ref()),
        }
    }

    /// Returns the canonical allowed domain.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the canonical form of `email` if it satisfies the policy.
    pub fn normalize(&self, email: &str) -> Option<String> {
        let canonical = canonicalize(email);
        let captures = EMAIL_PATTERN.captures(&canonical)?;
        let domain = captures.get(1)?.as_str();
        (domain == self.domain).then_some(canonical)
    }

    /// Returns whether `email` may sign up, sign in or reset a password.
    pub fn is_allowed(&self, email: &str) -> bool {
        let allowed = self.normalize(email).is_some();
        if !allowed {
            tracing::debug!(target: TRACING_TARGET_IDENTITY, "Email rejected by domain policy");
        }
        allowed
    }
}

impl Default for DomainPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_DOMAIN)
    }
}

/// Strip invisible formatting characters, NFKC, trim, lowercase.
///
/// Stripping happens first so an invisible character cannot block composition.
fn canonicalize(input: &str) -> String {
    input
        .chars()
        .filter(|c| !is_invisible(*c))
        .nfkc()
        .filter(|c| !is_invisible(*c))
        .collect::<String>()
        .trim()
        .to_lowercase()
}

fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{FEFF}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exact_domain() {
        let policy = DomainPolicy::default();
        assert!(policy.is_allowed("writer@kbw.vc"));
        assert!(policy.is_allowed("  Writer@KBW.vc  "));
    }

    #[test]
    fn rejects_suffix_and_lookalike_domains() {
        let policy = DomainPolicy::default();
        assert!(!policy.is_allowed("writer@evil-kbw.vc"));
        assert!(!policy.is_allowed("writer@kbw.vc.evil.com"));
        assert!(!policy.is_allowed("writer@sub.kbw.vc"));
        assert!(!policy.is_allowed("writer@gmail.com"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        let policy = DomainPolicy::default();
        assert!(!policy.is_allowed(""));
        assert!(!policy.is_allowed("@kbw.vc"));
        assert!(!policy.is_allowed("writer"));
        assert!(!policy.is_allowed("a@b@kbw.vc"));
        assert!(!policy.is_allowed("wri ter@kbw.vc"));
    }

    #[test]
    fn invariant_under_case_width_and_invisible_characters() {
        let policy = DomainPolicy::default();
        let canonical = "writer@kbw.vc";
        let variants = [
            "WRITER@KBW.VC",
            // Fullwidth letters fold to ASCII under NFKC.
            "ｗｒｉｔｅｒ@ｋｂｗ.ｖｃ",
            "wri\u{200B}ter@kbw\u{200D}.vc",
            "\u{FEFF}writer@kbw.vc",
            "writer@k\u{00AD}bw.vc",
            "writer\u{2060}@kbw.vc",
        ];

        for variant in variants {
            assert_eq!(
                policy.is_allowed(variant),
                policy.is_allowed(canonical),
                "variant {variant:?}"
            );
            assert_eq!(policy.normalize(variant).as_deref(), Some(canonical));
        }
    }

    #[test]
    fn invisible_characters_cannot_forge_a_second_domain() {
        let policy = DomainPolicy::default();
        assert!(!policy.is_allowed("writer@evil\u{200B}-kbw.vc"));
    }

    #[test]
    fn custom_domain_is_canonicalized() {
        let policy = DomainPolicy::new(" Example.ORG ");
        assert_eq!(policy.domain(), "example.org");
        assert!(policy.is_allowed("me@example.org"));
        assert!(!policy.is_allowed("me@kbw.vc"));
    }
}
