use crate::search::cache::CachedSearchData;
use crate::search::query::{parse_query, ParsedQuery, QueryMatcher};
use crate::types::{PackageInfo, ScriptQuickPickItem};
use std::cmp::Ordering;
use tracing::{debug, instrument};

/// Highest accepted ratio of edits to term length for a typo match.
///
/// One edit is tolerated from seven characters upwards, so `startt` does not find `start`.
pub const FUZZY_THRESHOLD: f64 = 0.15;

// Ranking tiers for single-term search, lower is better.
const SCORE_KEY_PREFIX: f64 = 0.0;
const SCORE_WORD_PREFIX: f64 = 0.01;
const SCORE_SUBSTRING: f64 = 0.02;
// Script names rank ahead of equally good package-name hits.
const PACKAGE_KEY_PENALTY: f64 = 0.005;

/// One item per script of every package that has both a name and scripts.
pub fn build_items(packages: &[PackageInfo]) -> Vec<ScriptQuickPickItem> {
    packages
        .iter()
        .filter_map(|pkg| match (&pkg.name, &pkg.scripts) {
            (Some(name), Some(scripts)) if !name.is_empty() && !scripts.is_empty() => {
                Some((pkg, name, scripts))
            }
            _ => None,
        })
        .flat_map(|(pkg, name, scripts)| {
            scripts.iter().map(move |(script_name, script_command)| ScriptQuickPickItem {
                label: script_name.clone(),
                description: name.clone(),
                detail: script_command.clone(),
                package_name: name.clone(),
                package_path: pkg.path.clone(),
                script_name: script_name.clone(),
                script_command: script_command.clone(),
                always_show: false,
            })
        })
        .collect()
}

#[derive(Debug)]
struct FuzzyKeys {
    script: CachedSearchData,
    package: CachedSearchData,
}

/// Searchable view over the picker items of one session.
///
/// A single term runs a typo-tolerant search over script and package names. Two or
/// more terms must each be a word prefix of `"<script> <package>"`, with no typo
/// tolerance.
#[derive(Debug)]
pub struct ScriptSearchIndex {
    items: Vec<ScriptQuickPickItem>,
    keys: Vec<FuzzyKeys>,
    matcher: QueryMatcher,
}

impl ScriptSearchIndex {
    pub fn new(items: Vec<ScriptQuickPickItem>, cache_max_bytes: usize) -> Self {
        let mut matcher = QueryMatcher::new(cache_max_bytes);
        let keys = items
            .iter()
            .map(|item| FuzzyKeys {
                script: matcher.prepare(&item.script_name),
                package: matcher.prepare(&item.package_name),
            })
            .collect();
        Self { items, keys, matcher }
    }

    pub fn from_packages(packages: &[PackageInfo], cache_max_bytes: usize) -> Self {
        Self::new(build_items(packages), cache_max_bytes)
    }

    pub fn items(&self) -> &[ScriptQuickPickItem] {
        &self.items
    }

    #[instrument(skip(self), fields(items = self.items.len()))]
    pub fn search(&mut self, query: &str) -> Vec<ScriptQuickPickItem> {
        let results = match parse_query(query) {
            ParsedQuery::Empty => return self.items.clone(),
            ParsedQuery::Unmatchable => Vec::new(),
            ParsedQuery::Terms(terms) if terms.len() == 1 => self.fuzzy_search(&terms[0]),
            ParsedQuery::Terms(terms) => self.prefix_search(&terms),
        };
        debug!(results = results.len(), "Search finished");

        if results.is_empty() {
            vec![ScriptQuickPickItem::no_results()]
        } else {
            results
        }
    }

    fn fuzzy_search(&self, term: &str) -> Vec<ScriptQuickPickItem> {
        let mut scored: Vec<(f64, &ScriptQuickPickItem)> = self
            .items
            .iter()
            .zip(&self.keys)
            .filter_map(|(item, keys)| {
                let script = score_key(term, &keys.script);
                let package = score_key(term, &keys.package).map(|s| s + PACKAGE_KEY_PENALTY);
                let best = match (script, package) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (a, b) => a.or(b),
                }?;
                Some((best, item))
            })
            .collect();

        // Stable, so equal scores keep list order.
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        scored.into_iter().map(|(_, item)| item.clone()).collect()
    }

    fn prefix_search(&mut self, terms: &[String]) -> Vec<ScriptQuickPickItem> {
        let mut results = Vec::new();
        for item in &self.items {
            let text = format!("{} {}", item.script_name, item.package_name);
            if self.matcher.matches(&text, terms) {
                results.push(item.clone());
            }
        }
        results
    }
}

/// Scores `term` against one key, `None` when it does not match at all.
fn score_key(term: &str, key: &CachedSearchData) -> Option<f64> {
    if key.lowercased.starts_with(term) {
        return Some(SCORE_KEY_PREFIX);
    }
    if key.words.iter().any(|w| w.starts_with(term)) || key.words.concat().starts_with(term) {
        return Some(SCORE_WORD_PREFIX);
    }
    if key.lowercased.contains(term) {
        return Some(SCORE_SUBSTRING);
    }

    let term_len = term.chars().count();
    let best_edits = key
        .words
        .iter()
        .map(|word| {
            let head: String = word.chars().take(term_len).collect();
            strsim::damerau_levenshtein(term, &head).min(strsim::damerau_levenshtein(term, word))
        })
        .min()?;

    let ratio = best_edits as f64 / term_len as f64;
    (ratio <= FUZZY_THRESHOLD).then_some(SCORE_SUBSTRING + ratio)
}
