//! Dispatch by file extension.

use std::path::Path;

/// The closed set of document formats the parser pipeline understands.
///
/// Selected by extension at dispatch time; adding a format means adding a
/// variant here and a parse arm in the ingestion step, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Fb2,
}

impl DocumentFormat {
    /// Classify a bare file name, `None` when no parser handles it.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.rsplit_once('.')?.1 {
            ext if ext.eq_ignore_ascii_case("fb2") => Some(Self::Fb2),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        Self::from_name(path.file_name()?.to_str()?)
    }

    /// The tag stored on catalog records for this format.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Fb2 => "fb2",
        }
    }
}

/// Whether the path looks like a zip container.
pub(crate) fn is_archive(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("book.fb2", Some(DocumentFormat::Fb2))]
    #[case("BOOK.FB2", Some(DocumentFormat::Fb2))]
    #[case("book.fb2.bak", None)]
    #[case("book.epub", None)]
    #[case("noextension", None)]
    #[case(".fb2", Some(DocumentFormat::Fb2))]
    fn classify_by_name(#[case] name: &str, #[case] expected: Option<DocumentFormat>) {
        assert_eq!(DocumentFormat::from_name(name), expected);
    }

    #[rstest]
    #[case("pack.zip", true)]
    #[case("pack.ZIP", true)]
    #[case("pack.fb2", false)]
    #[case("pack", false)]
    fn classify_archives(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_archive(Path::new(name)), expected);
    }
}
