//! Genre tag canonicalization contract.

use std::collections::HashMap;

/// Maps a raw genre tag, as declared in a document, to its canonical
/// catalog code.
///
/// The pipeline applies this to every genre of every accepted record before
/// insertion; it never influences control flow.
pub trait GenreNormalizer: Send + Sync {
    fn transfer(&self, raw: &str) -> String;
}

/// Table-backed normalizer. Unknown tags pass through unchanged so that a
/// stale table never loses data.
#[derive(Debug, Default, Clone)]
pub struct GenreMap {
    codes: HashMap<String, String>,
}

impl GenreMap {
    pub fn new(codes: HashMap<String, String>) -> Self {
        Self { codes }
    }
}

impl FromIterator<(String, String)> for GenreMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self { codes: iter.into_iter().collect() }
    }
}

impl GenreNormalizer for GenreMap {
    fn transfer(&self, raw: &str) -> String {
        self.codes.get(raw).cloned().unwrap_or_else(|| raw.to_string())
    }
}

/// Identity normalizer, used when no taxonomy table is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughGenres;

impl GenreNormalizer for PassthroughGenres {
    fn transfer(&self, raw: &str) -> String {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_rewrites_known_tags() {
        let map: GenreMap = [("sf_fantasy".to_string(), "fantasy".to_string())].into_iter().collect();
        assert_eq!(map.transfer("sf_fantasy"), "fantasy");
    }

    #[test]
    fn map_passes_unknown_tags_through() {
        let map = GenreMap::default();
        assert_eq!(map.transfer("prose_classic"), "prose_classic");
    }

    #[test]
    fn passthrough_is_identity() {
        assert_eq!(PassthroughGenres.transfer("det_history"), "det_history");
    }
}
