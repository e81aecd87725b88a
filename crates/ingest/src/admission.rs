//! Post-parse language admission.

/// Whether a normalized base language is admitted by the configured
/// accepted-language string.
///
/// The check is substring containment, not set membership. That means an
/// empty language (unresolvable declaration) is always admitted, and a code
/// that happens to be a substring of an accepted entry slips through. The
/// upstream normalizer reduces declarations to two or three letter base
/// subtags, which keeps the looseness harmless in practice.
pub fn accepts(accepted: &str, language: &str) -> bool {
    accepted.contains(language)
}
