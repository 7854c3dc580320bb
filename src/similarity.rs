//! # Similarity Booster
//!
//! TF-IDF term weighting over the full historical item corpus, scoring each
//! candidate item by its maximum cosine similarity to any of the reader's
//! previously-approved items.
//!
//! - Lowercased unigram + bigram features, English stop words removed.
//! - Vocabulary capped at 5000 terms by document frequency; ties resolve by
//!   term ordering so fitting is fully deterministic.
//! - Smoothed IDF `ln((1+n)/(1+df)) + 1`, L2-normalized vectors, cosine as a
//!   sparse dot product.
//! - Empty corpus ⇒ no model (cold start, all scores 0.0, not an error).
//! - A candidate sharing an id with a positive scores exactly 0.0: matching
//!   an item the reader already approved is not informative and would feed
//!   the booster its own output.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

const MAX_FEATURES: usize = 5000;

static RE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?u)\b\w+\b").expect("token regex"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "all", "an", "and", "any", "are", "as", "at",
        "be", "because", "been", "before", "being", "below", "between", "both", "but", "by",
        "can", "could", "did", "do", "does", "down", "during", "each", "few", "for", "from",
        "further", "had", "has", "have", "having", "he", "her", "here", "him", "his", "how",
        "i", "if", "in", "into", "is", "it", "its", "just", "me", "more", "most", "my", "no",
        "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other", "our", "out",
        "over", "own", "same", "she", "so", "some", "such", "than", "that", "the", "their",
        "them", "then", "there", "these", "they", "this", "those", "through", "to", "too",
        "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
        "while", "who", "why", "will", "with", "you", "your",
    ]
    .into_iter()
    .collect()
});

/// Lowercase word tokens with stop words removed.
fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    RE_TOKEN
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .filter(|t| !STOP_WORDS.contains(t.as_str()))
        .collect()
}

/// Unigrams plus adjacent bigrams over the stop-word-filtered token stream.
fn terms(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let mut out = Vec::with_capacity(tokens.len() * 2);
    for w in tokens.windows(2) {
        out.push(format!("{} {}", w[0], w[1]));
    }
    out.extend(tokens);
    out
}

/// Fitted term-weighting model. Pure data; scoring never mutates it.
#[derive(Debug, Clone)]
pub struct TfidfModel {
    vocab: HashMap<String, usize>,
    idf: Vec<f32>,
}

/// Sparse L2-normalized vector as sorted (term index, weight) pairs.
type SparseVec = Vec<(usize, f32)>;

impl TfidfModel {
    /// Fit over the historical corpus of `(id, text)` pairs.
    ///
    /// Returns `None` when the corpus is empty or every text tokenizes to
    /// nothing: the cold-start state, in which the booster is disabled.
    pub fn fit(corpus: &[(String, String)]) -> Option<Self> {
        let docs: Vec<Vec<String>> = corpus
            .iter()
            .map(|(_, text)| terms(text))
            .filter(|t| !t.is_empty())
            .collect();
        if docs.is_empty() {
            return None;
        }

        // Document frequency per term.
        let mut df: HashMap<&str, u32> = HashMap::new();
        for doc in &docs {
            let unique: HashSet<&str> = doc.iter().map(String::as_str).collect();
            for term in unique {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        // Cap the vocabulary: highest document frequency first, then term
        // ordering so the cut is reproducible run to run.
        let mut ranked: Vec<(&str, u32)> = df.iter().map(|(t, &c)| (*t, c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(MAX_FEATURES);

        let n = docs.len() as f32;
        let mut vocab = HashMap::with_capacity(ranked.len());
        let mut idf = Vec::with_capacity(ranked.len());
        for (i, (term, count)) in ranked.into_iter().enumerate() {
            vocab.insert(term.to_string(), i);
            idf.push(((1.0 + n) / (1.0 + count as f32)).ln() + 1.0);
        }

        Some(Self { vocab, idf })
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocab.len()
    }

    /// TF-IDF vector for a text, L2-normalized. Empty when no term is known.
    fn vectorize(&self, text: &str) -> SparseVec {
        let mut counts: HashMap<usize, f32> = HashMap::new();
        for term in terms(text) {
            if let Some(&idx) = self.vocab.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        if counts.is_empty() {
            return Vec::new();
        }

        let mut vec: SparseVec = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();
        vec.sort_by_key(|(idx, _)| *idx);

        let norm = vec.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in vec.iter_mut() {
                *w /= norm;
            }
        }
        vec
    }

    /// Max cosine similarity of each candidate to any positive example.
    ///
    /// Returns one score in [0, 1] per candidate id. Candidates identical (by
    /// id) to a positive score 0.0; blank texts score 0.0; no positives means
    /// every score is 0.0.
    pub fn score(
        &self,
        positives: &[(String, String)],
        candidates: &[(String, String)],
    ) -> HashMap<String, f32> {
        let mut out = HashMap::with_capacity(candidates.len());
        if positives.is_empty() {
            for (id, _) in candidates {
                out.insert(id.clone(), 0.0);
            }
            return out;
        }

        let positive_ids: HashSet<&str> = positives.iter().map(|(id, _)| id.as_str()).collect();
        let positive_vecs: Vec<SparseVec> = positives
            .iter()
            .map(|(_, text)| self.vectorize(text))
            .filter(|v| !v.is_empty())
            .collect();

        for (id, text) in candidates {
            if positive_ids.contains(id.as_str()) {
                out.insert(id.clone(), 0.0);
                continue;
            }
            let vec = self.vectorize(text);
            if vec.is_empty() {
                out.insert(id.clone(), 0.0);
                continue;
            }
            let best = positive_vecs
                .iter()
                .map(|p| sparse_dot(&vec, p))
                .fold(0.0f32, f32::max);
            out.insert(id.clone(), best.clamp(0.0, 1.0));
        }
        out
    }
}

/// Dot product of two index-sorted sparse vectors.
fn sparse_dot(a: &SparseVec, b: &SparseVec) -> f32 {
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}
