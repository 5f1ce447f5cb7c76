//! Weighted multi-field keyword ranking.
//!
//! Each entry is scored against four fields. A field earns its phrase bonus
//! once when it contains the whole normalized query, and its term weight for
//! every whole-word occurrence of every query term. Entries scoring zero are
//! dropped; the rest are ordered by score with index order breaking ties.

use docsearch_types::DocumentRecord;

/// Document field participating in scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
    Path,
    Content,
}

impl Field {
    fn text(self, doc: &DocumentRecord) -> &str {
        match self {
            Field::Title => &doc.title,
            Field::Description => doc.description.as_deref().unwrap_or(""),
            Field::Path => &doc.path,
            Field::Content => &doc.content,
        }
    }
}

/// Scoring parameters for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldWeight {
    pub field: Field,
    /// Added once when the field contains the full query
    pub phrase_bonus: u64,
    /// Multiplied by the whole-word match count of each term
    pub term_weight: u64,
}

/// Per-field weights consulted by [`RankingEngine`], in scoring order.
pub type ScoringTable = Vec<FieldWeight>;

/// Default scoring table.
pub const DEFAULT_WEIGHTS: [FieldWeight; 4] = [
    FieldWeight {
        field: Field::Title,
        phrase_bonus: 1000,
        term_weight: 50,
    },
    FieldWeight {
        field: Field::Description,
        phrase_bonus: 500,
        term_weight: 25,
    },
    FieldWeight {
        field: Field::Path,
        phrase_bonus: 300,
        term_weight: 15,
    },
    FieldWeight {
        field: Field::Content,
        phrase_bonus: 100,
        term_weight: 1,
    },
];

/// Lowercased query phrase and its distinct terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    pub phrase: String,
    pub terms: Vec<String>,
}

impl NormalizedQuery {
    /// Returns `None` for an empty or whitespace-only query.
    pub fn parse(query: &str) -> Option<Self> {
        let phrase = query.trim().to_lowercase();
        if phrase.is_empty() {
            return None;
        }
        let mut terms: Vec<String> = Vec::new();
        for term in phrase.split_whitespace() {
            if !terms.iter().any(|t| t == term) {
                terms.push(term.to_string());
            }
        }
        Some(Self { phrase, terms })
    }
}

/// Ranks index entries against free-text queries.
#[derive(Debug, Clone)]
pub struct RankingEngine {
    weights: ScoringTable,
}

impl Default for RankingEngine {
    fn default() -> Self {
        Self::new(DEFAULT_WEIGHTS.to_vec())
    }
}

impl RankingEngine {
    pub fn new(weights: ScoringTable) -> Self {
        Self { weights }
    }

    /// Score one entry. Zero means no match.
    pub fn score(&self, doc: &DocumentRecord, query: &NormalizedQuery) -> u64 {
        self.weights
            .iter()
            .map(|weight| {
                let text = weight.field.text(doc).to_lowercase();
                let mut score = 0;
                if text.contains(&query.phrase) {
                    score += weight.phrase_bonus;
                }
                for term in &query.terms {
                    score += count_word_matches(&text, term) as u64 * weight.term_weight;
                }
                score
            })
            .sum()
    }

    /// Up to `max` entries matching `query`, best first.
    ///
    /// Returned records are copies carrying their score; `entries` is not
    /// modified.
    pub fn rank(&self, entries: &[DocumentRecord], query: &str, max: usize) -> Vec<DocumentRecord> {
        if max == 0 {
            return Vec::new();
        }
        let Some(query) = NormalizedQuery::parse(query) else {
            return Vec::new();
        };

        let mut scored: Vec<(u64, &DocumentRecord)> = entries
            .iter()
            .map(|doc| (self.score(doc, &query), doc))
            .filter(|(score, _)| *score > 0)
            .collect();

        // sort_by is stable: equal scores keep index order
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored
            .into_iter()
            .take(max)
            .map(|(score, doc)| doc.scored(score))
            .collect()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_boundary(before: Option<char>, after: Option<char>) -> bool {
    before.is_some_and(is_word_char) != after.is_some_and(is_word_char)
}

/// Non-overlapping occurrences of `term` in `text` that start and end on a
/// word boundary. Both inputs are expected to be lowercase.
pub fn count_word_matches(text: &str, term: &str) -> usize {
    if term.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut from = 0;
    while let Some(offset) = text[from..].find(term) {
        let start = from + offset;
        let end = start + term.len();
        let before = text[..start].chars().next_back();
        let first = term.chars().next();
        let last = term.chars().next_back();
        let after = text[end..].chars().next();

        if is_boundary(before, first) && is_boundary(last, after) {
            count += 1;
            from = end;
        } else {
            from = start + first.map_or(1, char::len_utf8);
        }
    }
    count
}
