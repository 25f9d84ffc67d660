use crate::search::cache::{CachedSearchData, SearchCache};

/// Longer input is cut to this many characters before parsing.
pub const MAX_QUERY_LENGTH: usize = 200;

/// Characters that split words besides whitespace, e.g. in `@scope/pkg:build_all-fast`.
pub const WORD_SEPARATORS: [char; 5] = ['@', '/', ':', '_', '-'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedQuery {
    /// Nothing typed: show everything.
    Empty,
    /// Text was typed but no term survived splitting (e.g. `"---"`): show no results.
    Unmatchable,
    Terms(Vec<String>),
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || WORD_SEPARATORS.contains(&c)
}

/// Lowercased, non-empty words of `text`.
pub fn split_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(is_separator)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_query(raw: &str) -> ParsedQuery {
    let truncated: String = raw.chars().take(MAX_QUERY_LENGTH).collect();
    let trimmed = truncated.trim();
    if trimmed.is_empty() {
        return ParsedQuery::Empty;
    }

    let terms = split_words(trimmed);
    if terms.is_empty() {
        ParsedQuery::Unmatchable
    } else {
        ParsedQuery::Terms(terms)
    }
}

/// True when every term is a prefix of at least one word.
pub fn all_terms_match(words: &[String], terms: &[String]) -> bool {
    terms
        .iter()
        .all(|term| words.iter().any(|word| word.starts_with(term.as_str())))
}

/// Word-prefix matcher with memoised text splitting.
#[derive(Debug)]
pub struct QueryMatcher {
    cache: SearchCache,
}

impl QueryMatcher {
    pub fn new(cache_max_bytes: usize) -> Self {
        Self {
            cache: SearchCache::new(cache_max_bytes),
        }
    }

    pub fn prepare(&mut self, text: &str) -> CachedSearchData {
        self.cache.get_or_compute(text, || CachedSearchData {
            lowercased: text.to_lowercase(),
            words: split_words(text),
        })
    }

    pub fn matches(&mut self, text: &str, terms: &[String]) -> bool {
        let prepared = self.prepare(text);
        all_terms_match(&prepared.words, terms)
    }

    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_and_blank_input_show_everything() {
        assert_eq!(parse_query(""), ParsedQuery::Empty);
        assert_eq!(parse_query("   \t "), ParsedQuery::Empty);
    }

    #[test]
    fn separator_only_input_is_unmatchable() {
        assert_eq!(parse_query("---"), ParsedQuery::Unmatchable);
        assert_eq!(parse_query(" @/ :_ "), ParsedQuery::Unmatchable);
    }

    #[test]
    fn splits_on_whitespace_and_naming_separators() {
        assert_eq!(
            parse_query("  Build   @My-Org/ui_kit:dev "),
            ParsedQuery::Terms(terms(&["build", "my", "org", "ui", "kit", "dev"]))
        );
    }

    #[test]
    fn truncates_long_input() {
        let long = "a".repeat(250);
        match parse_query(&long) {
            ParsedQuery::Terms(t) => assert_eq!(t, vec!["a".repeat(MAX_QUERY_LENGTH)]),
            other => panic!("unexpected {other:?}"),
        }

        // Whatever comes after the cut-off point is ignored.
        let padded = format!("{}build", " ".repeat(MAX_QUERY_LENGTH));
        assert_eq!(parse_query(&padded), ParsedQuery::Empty);
    }

    #[test]
    fn matches_word_prefixes_not_substrings() {
        let mut matcher = QueryMatcher::new(4096);
        assert!(!matcher.matches("demo-app", &terms(&["mo"])));
        assert!(matcher.matches("mobile-app", &terms(&["mob"])));
        assert!(matcher.matches("demo-app", &terms(&["app"])));
    }

    #[test]
    fn requires_every_term() {
        let mut matcher = QueryMatcher::new(4096);
        let text = "start @acme/mobile";
        assert!(matcher.matches(text, &terms(&["start", "mob"])));
        assert!(matcher.matches(text, &terms(&["mob", "start"])));
        assert!(!matcher.matches(text, &terms(&["start", "web"])));
    }

    #[test]
    fn prepared_text_is_cached() {
        let mut matcher = QueryMatcher::new(4096);
        let first = matcher.prepare("Lint @Acme/Web");
        assert_eq!(first.lowercased, "lint @acme/web");
        assert_eq!(first.words, terms(&["lint", "acme", "web"]));
        assert_eq!(matcher.cache().len(), 1);

        matcher.prepare("Lint @Acme/Web");
        assert_eq!(matcher.cache().len(), 1);
    }
}
