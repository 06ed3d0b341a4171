//! Lemma relatedness.
//!
//! The compliance engine only needs to know whether a lemma and a rule
//! term are "the same word". [`RootPrefixMatcher`] answers that with a
//! truncated-prefix comparison. It is an approximation of stemming, not a
//! stemmer: "deceive" and "deception" relate, but so do unrelated words
//! that happen to share a long enough prefix, and irregular forms are
//! missed. A real lemmatizer can be plugged in through [`LemmaRelation`].

/// How a lemma relates to a rule term.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LemmaMatch {
    /// Equal after lowercasing.
    Exact,
    /// Same root; carries the two prefixes that were compared.
    Root { lemma_root: String, rule_root: String },
    /// Unrelated.
    None,
}

impl LemmaMatch {
    pub fn is_exact(&self) -> bool {
        matches!(self, LemmaMatch::Exact)
    }

    pub fn is_match(&self) -> bool {
        !matches!(self, LemmaMatch::None)
    }
}

/// Boolean "these two lemmas are related" predicate, refined into a
/// [`LemmaMatch`]. Both arguments arrive lowercased.
pub trait LemmaRelation: Send + Sync {
    fn relate(&self, lemma: &str, rule: &str) -> LemmaMatch;
}

/// Minimum lemma length considered at all.
pub const MIN_LEMMA_LEN: usize = 3;

/// Both words must be at least this long for a root comparison.
pub const MIN_ROOT_WORD_LEN: usize = 5;

/// Characters dropped from the shorter word before comparing prefixes.
pub const ROOT_SUFFIX_ALLOWANCE: usize = 3;

/// Shortest prefix that counts as a shared root.
pub const MIN_ROOT_LEN: usize = 4;

/// Truncated-prefix root matcher.
///
/// Lengths are counted in Unicode scalar values. The compared prefix is
/// `min(len(lemma), len(rule)) - 3` characters and must be at least 4.
#[derive(Clone, Copy, Debug, Default)]
pub struct RootPrefixMatcher;

impl LemmaRelation for RootPrefixMatcher {
    fn relate(&self, lemma: &str, rule: &str) -> LemmaMatch {
        let lemma_len = lemma.chars().count();
        if lemma_len < MIN_LEMMA_LEN {
            return LemmaMatch::None;
        }
        if lemma == rule {
            return LemmaMatch::Exact;
        }

        let rule_len = rule.chars().count();
        if lemma_len < MIN_ROOT_WORD_LEN || rule_len < MIN_ROOT_WORD_LEN {
            return LemmaMatch::None;
        }

        let root_len = lemma_len.min(rule_len) - ROOT_SUFFIX_ALLOWANCE;
        if root_len < MIN_ROOT_LEN {
            return LemmaMatch::None;
        }

        let lemma_root: String = lemma.chars().take(root_len).collect();
        let rule_root: String = rule.chars().take(root_len).collect();
        if lemma_root == rule_root {
            LemmaMatch::Root {
                lemma_root,
                rule_root,
            }
        } else {
            LemmaMatch::None
        }
    }
}
