//! Field normalization rules.
//!
//! These define the catalog's canonical form and are shared by every
//! ingestion path; a change here silently forks the identity of previously
//! ingested records, so the rules are pinned down by tests.

use crate::MAX_PLOT_BYTES;
use crate::models::{Author, RawAuthor};
use regex::Regex;
use std::sync::LazyLock;

/// Characters allowed through into the plot text: letters, punctuation,
/// digits, and a small whitelist of layout characters.
static PRINTABLES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{P}\p{N}\n\r\t </>]").expect("printables pattern compiles"));

static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \n\r\t]+").expect("spaces pattern compiles"));

const TRIMMED: &[char] = &['\n', '\t', ' '];

/// Leading articles stripped from sort titles, checked in this order,
/// case-sensitive, at most one removed.
const ARTICLES: &[&str] = &["An ", "A ", "The "];

/// Title with leading/trailing whitespace, newlines and tabs removed.
pub fn trim_title(title: &str) -> String {
    title.trim_matches(TRIMMED).to_string()
}

/// Sort key derived from a title: trimmed, one leading article stripped,
/// remainder uppercased.
pub fn sort_title(title: &str) -> String {
    let trimmed = title.trim_matches(TRIMMED);
    let mut rest = trimmed;
    for article in ARTICLES {
        if let Some(stripped) = trimmed.strip_prefix(article) {
            rest = stripped;
            break;
        }
    }
    rest.to_uppercase()
}

/// Publication year: prefer the explicit year field, fall back to the date
/// field, keep only the last four characters of longer values.
pub fn year(year: &str, date: &str) -> String {
    let chosen = if year.is_empty() { date } else { year };
    let chars: Vec<char> = chosen.chars().collect();
    let tail: String = if chars.len() > 4 { chars[chars.len() - 4..].iter().collect() } else { chosen.to_string() };
    tail.trim_matches(TRIMMED).to_string()
}

/// Annotation markup reduced to plain-ish text: printable characters only,
/// whitespace runs collapsed, bounded to [`MAX_PLOT_BYTES`].
pub fn plot(annotation: &str) -> String {
    let printable: String = PRINTABLES.find_iter(annotation).map(|m| m.as_str()).collect();
    let collapsed = collapse_spaces(&printable);
    truncate_to_boundary(&collapsed, MAX_PLOT_BYTES).to_string()
}

/// Cover reference with the leading `#` fragment marker stripped.
pub fn cover_id(href: &str) -> String {
    href.strip_prefix('#').unwrap_or(href).to_string()
}

/// Replace every run of spaces, tabs and newlines with a single space.
pub fn collapse_spaces(s: &str) -> String {
    SPACES.replace_all(s, " ").into_owned()
}

/// Cut `s` to at most `max_bytes` bytes without splitting a character.
pub fn truncate_to_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Reduce a declared language tag to its base language subtag, best-effort.
///
/// `"ru-RU"` and `"ru_RU"` both become `"ru"`; a tag whose primary subtag is
/// not a plausible ISO-639 code (2 or 3 letters) yields an empty string
/// rather than failing the record.
pub fn base_language(code: &str) -> String {
    let primary = code.trim().split(['-', '_']).next().unwrap_or("");
    if (2..=3).contains(&primary.len()) && primary.bytes().all(|b| b.is_ascii_alphabetic()) {
        primary.to_ascii_lowercase()
    } else {
        String::new()
    }
}

/// Placeholder credit for documents whose single declared author is really a
/// comma-mangled list of several people.
const WRITING_TEAM: &str = "Writing team";
const WRITING_TEAM_RU: &str = "Авторский коллектив";

/// Normalize the declared author list.
///
/// `lang` is the document's declared language and drives both the casing
/// rules and the localized placeholder; it is passed explicitly so the
/// normalizer has no process-wide locale state.
pub fn authors(raw: &[RawAuthor], lang: &str) -> Vec<Author> {
    if let [only] = raw
        && only.last_name.contains(',')
    {
        // A single author whose last name holds a comma is a known signal of
        // a mis-encoded multi-author credit; never surface the raw string.
        let name = if lang == "ru" { WRITING_TEAM_RU } else { WRITING_TEAM };
        return vec![Author { name: name.to_string(), sort: name.to_uppercase() }];
    }
    raw.iter()
        .map(|author| {
            let first = refine_name(&author.first_name, lang);
            let middle = refine_name(&author.middle_name, lang);
            let last = refine_name(&author.last_name, lang);
            let given = join_parts(&[&first, &middle]);
            let name = join_parts(&[&first, &middle, &last]);
            let sort = if last.is_empty() {
                given.clone()
            } else if given.is_empty() {
                last.clone()
            } else {
                format!("{last}, {given}")
            };
            Author { name, sort }
        })
        .collect()
}

fn join_parts(parts: &[&str]) -> String {
    parts.iter().filter(|p| !p.is_empty()).copied().collect::<Vec<_>>().join(" ")
}

/// Trim, lowercase and title-case one name part using the document's
/// declared language.
fn refine_name(part: &str, lang: &str) -> String {
    let lowered: String = part.trim().chars().flat_map(|c| lower_char(c, lang)).collect();
    let collapsed = collapse_spaces(&lowered);
    title_case(&collapsed, lang)
}

/// Uppercase the first letter of every word; words start after whitespace
/// and hyphens so "anna-maria" becomes "Anna-Maria".
fn title_case(s: &str, lang: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_whitespace() || c == '-' {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            out.extend(upper_char(c, lang));
            at_word_start = false;
        } else {
            out.push(c);
        }
    }
    out
}

// Turkic locales pair dotted and dotless I differently from every other
// Latin-script language; everything else follows the Unicode default
// mappings (which already handle Cyrillic, Greek, etc.).
fn is_turkic(lang: &str) -> bool {
    matches!(lang, "tr" | "az")
}

fn lower_char(c: char, lang: &str) -> impl Iterator<Item = char> {
    let turkic = match c {
        'I' if is_turkic(lang) => Some('ı'),
        'İ' if is_turkic(lang) => Some('i'),
        _ => None,
    };
    match turkic {
        Some(mapped) => Box::new(std::iter::once(mapped)) as Box<dyn Iterator<Item = char>>,
        None => Box::new(c.to_lowercase()),
    }
}

fn upper_char(c: char, lang: &str) -> impl Iterator<Item = char> {
    let turkic = match c {
        'i' if is_turkic(lang) => Some('İ'),
        'ı' if is_turkic(lang) => Some('I'),
        _ => None,
    };
    match turkic {
        Some(mapped) => Box::new(std::iter::once(mapped)) as Box<dyn Iterator<Item = char>>,
        None => Box::new(c.to_uppercase()),
    }
}
