//! Drift metrics between the clean reference sentence and each translation
//!
//! Three measures are recorded per noise level:
//! - `semantic_distances`: cosine distance between TF-IDF embeddings
//! - `text_similarities`: Ratcliff/Obershelp character similarity
//! - `word_overlaps`: Jaccard overlap of lowercased word sets

use crate::error::{AnalysisError, Result};
use crate::results::{
    MetricSeries, NoiseLevel, ResultsBundle, NOISE_LEVELS, SEMANTIC_DISTANCES, TEXT_SIMILARITIES,
    WORD_OVERLAPS,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use trueno::Vector;

/// Reference sentence every noisy variant is derived from
pub const ORIGINAL_CLEAN: &str = "The artificial intelligence system can efficiently process natural language and understand complex semantic relationships within textual data.";

/// Final-stage output file inside each `noise_{level}` directory
pub const TRANSLATION_FILE_NAME: &str = "agent3_english.txt";

/// Character-level similarity ratio in [0, 1], case-insensitive
///
/// Ratio of matched characters `2·M / (|a| + |b|)`, where matches are found by
/// recursively taking the longest common block (Ratcliff/Obershelp).
pub fn calculate_text_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_block(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }
    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`, earliest in `a` on ties
fn longest_block(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0);
    // run[j] = length of the common suffix ending at a[i-1], b[j-1]
    let mut run = vec![0usize; bhi - blo + 1];
    for i in alo..ahi {
        let mut next = vec![0usize; bhi - blo + 1];
        for j in blo..bhi {
            if a[i] == b[j] {
                let k = run[j - blo] + 1;
                next[j - blo + 1] = k;
                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
            }
        }
        run = next;
    }
    best
}

/// Jaccard overlap of lowercased whitespace-separated words
///
/// An empty side yields 0.0.
pub fn calculate_word_overlap(a: &str, b: &str) -> f64 {
    let words = |s: &str| -> HashSet<String> {
        s.split_whitespace().map(str::to_lowercase).collect()
    };
    let (wa, wb) = (words(a), words(b));
    if wa.is_empty() || wb.is_empty() {
        return 0.0;
    }
    let intersection = wa.intersection(&wb).count();
    let union = wa.union(&wb).count();
    intersection as f64 / union as f64
}

/// Cosine distance `1 - cos(a, b)`, clamped to [0, 2]
///
/// A zero vector has no direction; its distance to anything is 1.0.
pub fn calculate_cosine_distance(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(AnalysisError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    if a.is_empty() {
        return Ok(1.0);
    }
    let mismatch = |_| AnalysisError::DimensionMismatch {
        left: a.len(),
        right: b.len(),
    };
    let va = Vector::from_slice(a);
    let vb = Vector::from_slice(b);
    let dot = va.dot(&vb).map_err(mismatch)? as f64;
    let norm_a = (va.dot(&va).map_err(mismatch)? as f64).sqrt();
    let norm_b = (vb.dot(&vb).map_err(mismatch)? as f64).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(1.0);
    }
    Ok((1.0 - dot / (norm_a * norm_b)).clamp(0.0, 2.0))
}

/// Two or more Unicode word characters between word boundaries
const WORD_TOKEN_PATTERN: &str = r"\b\w\w+\b";

fn word_tokens(text: &str) -> Result<Vec<&str>> {
    static WORD_TOKEN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    let pattern = WORD_TOKEN
        .get_or_init(|| Regex::new(WORD_TOKEN_PATTERN))
        .as_ref()
        .map_err(|e| AnalysisError::Corpus(format!("invalid token pattern: {e}")))?;
    Ok(pattern.find_iter(text).map(|m| m.as_str()).collect())
}

/// TF-IDF bag-of-n-grams embedder
///
/// Smooth IDF `ln((1 + n) / (1 + df)) + 1`, raw term counts and L2-normalised
/// rows. With `max_features` only the most frequent terms across the fitted
/// documents are kept, which sets the embedding dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TfidfEmbedder {
    pub max_features: Option<usize>,
    pub ngram_range: (usize, usize),
}

impl Default for TfidfEmbedder {
    fn default() -> Self {
        Self {
            max_features: None,
            ngram_range: (1, 1),
        }
    }
}

impl TfidfEmbedder {
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_ngram_range(mut self, lo: usize, hi: usize) -> Self {
        self.ngram_range = (lo, hi);
        self
    }

    fn terms(&self, document: &str) -> Result<Vec<String>> {
        let lowered = document.to_lowercase();
        let tokens = word_tokens(&lowered)?;
        let (lo, hi) = self.ngram_range;
        let mut terms = Vec::new();
        for n in lo.max(1)..=hi {
            if n > tokens.len() {
                break;
            }
            terms.extend(tokens.windows(n).map(|w| w.join(" ")));
        }
        Ok(terms)
    }

    /// Fit on `documents` and return one embedding row per document
    pub fn embed(&self, documents: &[&str]) -> Result<Vec<Vec<f32>>> {
        let counts = documents
            .iter()
            .map(|doc| -> Result<HashMap<String, usize>> {
                let mut counts = HashMap::new();
                for term in self.terms(doc)? {
                    *counts.entry(term).or_insert(0) += 1;
                }
                Ok(counts)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut corpus_frequency: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for doc in &counts {
            for (term, count) in doc {
                let entry = corpus_frequency.entry(term.as_str()).or_insert((0, 0));
                entry.0 += count;
                entry.1 += 1;
            }
        }

        let mut vocabulary: Vec<(&str, usize, usize)> = corpus_frequency
            .into_iter()
            .map(|(term, (tf, df))| (term, tf, df))
            .collect();
        if let Some(limit) = self.max_features {
            if vocabulary.len() > limit {
                vocabulary.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
                vocabulary.truncate(limit);
                vocabulary.sort_by(|a, b| a.0.cmp(b.0));
            }
        }

        let n_docs = documents.len() as f64;
        let idf: Vec<f64> = vocabulary
            .iter()
            .map(|(_, _, df)| ((1.0 + n_docs) / (1.0 + *df as f64)).ln() + 1.0)
            .collect();

        let rows: Vec<Vec<f32>> = counts
            .iter()
            .map(|doc| {
                let mut row: Vec<f64> = vocabulary
                    .iter()
                    .zip(&idf)
                    .map(|((term, _, _), w)| doc.get(*term).copied().unwrap_or(0) as f64 * w)
                    .collect();
                let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
                if norm > 0.0 {
                    row.iter_mut().for_each(|v| *v /= norm);
                }
                row.into_iter().map(|v| v as f32).collect()
            })
            .collect();
        Ok(rows)
    }
}

/// Final translations keyed by noise level, plus the clean reference
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationCorpus {
    reference: String,
    outputs: BTreeMap<NoiseLevel, String>,
}

impl TranslationCorpus {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, level: NoiseLevel, translation: impl Into<String>) {
        self.outputs.insert(level, translation.into());
    }

    /// Read `noise_{level}/agent3_english.txt` for every experiment level
    ///
    /// Levels without an output file are skipped; a corpus with no outputs at
    /// all is an error.
    pub fn load(outputs_dir: impl AsRef<Path>) -> Result<Self> {
        let outputs_dir = outputs_dir.as_ref();
        if !outputs_dir.is_dir() {
            return Err(AnalysisError::Corpus(format!(
                "outputs directory not found: {}",
                outputs_dir.display()
            )));
        }

        let mut corpus = Self::new(ORIGINAL_CLEAN);
        for level in NOISE_LEVELS {
            let path = outputs_dir
                .join(format!("noise_{level}"))
                .join(TRANSLATION_FILE_NAME);
            if !path.exists() {
                tracing::warn!("No translation for noise level {}%", level);
                continue;
            }
            let text = std::fs::read_to_string(&path)
                .map_err(|e| AnalysisError::Corpus(format!("{}: {}", path.display(), e)))?;
            corpus.insert(level, text.trim());
        }

        if corpus.is_empty() {
            return Err(AnalysisError::Corpus(format!(
                "no translation outputs in {}",
                outputs_dir.display()
            )));
        }
        tracing::debug!(
            "Loaded {} translations from {}",
            corpus.len(),
            outputs_dir.display()
        );
        Ok(corpus)
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn outputs(&self) -> impl Iterator<Item = (NoiseLevel, &str)> {
        self.outputs.iter().map(|(level, text)| (*level, text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Cosine distance from the reference for every level, embedding each
    /// reference/translation pair with `embedder`
    pub fn semantic_distances(&self, embedder: &TfidfEmbedder) -> Result<MetricSeries> {
        let mut series = MetricSeries::new();
        for (level, translation) in self.outputs() {
            let rows = embedder.embed(&[self.reference(), translation])?;
            let distance = calculate_cosine_distance(&rows[0], &rows[1])?;
            series.insert(level, distance);
        }
        Ok(series)
    }
}

/// The three standard metric series for a corpus
pub fn compute_results_bundle(corpus: &TranslationCorpus) -> Result<ResultsBundle> {
    let semantic = corpus.semantic_distances(&TfidfEmbedder::default())?;
    let text: MetricSeries = corpus
        .outputs()
        .map(|(level, t)| (level, calculate_text_similarity(corpus.reference(), t)))
        .collect();
    let words: MetricSeries = corpus
        .outputs()
        .map(|(level, t)| (level, calculate_word_overlap(corpus.reference(), t)))
        .collect();

    let mut bundle = ResultsBundle::new();
    bundle.insert(SEMANTIC_DISTANCES, semantic);
    bundle.insert(TEXT_SIMILARITIES, text);
    bundle.insert(WORD_OVERLAPS, words);
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_similarity_identity_and_case() {
        assert_eq!(calculate_text_similarity("The quick brown fox", "The quick brown fox"), 1.0);
        assert_eq!(calculate_text_similarity("Hello World", "hello world"), 1.0);
        assert_eq!(calculate_text_similarity("", ""), 1.0);
    }

    #[test]
    fn test_text_similarity_known_ratio() {
        // "abcd" vs "bcde": one block "bcd" → 2·3 / 8
        assert!((calculate_text_similarity("abcd", "bcde") - 0.75).abs() < 1e-12);
        assert_eq!(calculate_text_similarity("aaa", "bbb"), 0.0);
    }

    #[test]
    fn test_text_similarity_counts_blocks_on_both_sides() {
        // "ab" + "de" match around the differing middle
        let ratio = calculate_text_similarity("abXde", "abYde");
        assert!((ratio - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_word_overlap() {
        assert_eq!(calculate_word_overlap("the quick brown fox", "the quick brown fox"), 1.0);
        assert_eq!(calculate_word_overlap("hello world", "goodbye universe"), 0.0);
        assert_eq!(calculate_word_overlap("Hello World", "hello world"), 1.0);
        assert_eq!(calculate_word_overlap("", "test"), 0.0);
        // {the, brown} of {the, quick, brown, fox, lazy, dog}
        let overlap = calculate_word_overlap("the quick brown fox", "the lazy brown dog");
        assert!((overlap - 2.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_distance() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(calculate_cosine_distance(&v, &v).unwrap() < 0.01);
        let d = calculate_cosine_distance(&[1.0, 0.0, 0.0, 0.0], &[0.0, 1.0, 0.0, 0.0]).unwrap();
        assert!((d - 1.0).abs() < 1e-6);
        let opposite = calculate_cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]).unwrap();
        assert!((opposite - 2.0).abs() < 1e-6);
        assert_eq!(calculate_cosine_distance(&[0.0, 0.0], &[1.0, 1.0]).unwrap(), 1.0);
    }

    #[test]
    fn test_cosine_distance_dimension_mismatch() {
        assert!(matches!(
            calculate_cosine_distance(&[1.0, 2.0], &[1.0]),
            Err(AnalysisError::DimensionMismatch { left: 2, right: 1 })
        ));
    }

    #[test]
    fn test_tfidf_rows_are_unit_length() {
        let rows = TfidfEmbedder::default()
            .embed(&[
                "The quick brown fox jumps over the lazy dog",
                "A fast auburn fox leaps above a sleepy canine",
            ])
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), rows[1].len());
        for row in &rows {
            let norm: f32 = row.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_tfidf_max_features_caps_dimension() {
        let embedder = TfidfEmbedder::default().with_max_features(3);
        let rows = embedder.embed(&[ORIGINAL_CLEAN, "the system can process language"]).unwrap();
        assert_eq!(rows[0].len(), 3);
    }

    #[test]
    fn test_tfidf_ngrams_extend_vocabulary() {
        let unigrams = TfidfEmbedder::default().embed(&["red green blue"]).unwrap();
        let bigrams = TfidfEmbedder::default()
            .with_ngram_range(1, 2)
            .embed(&["red green blue"])
            .unwrap();
        assert_eq!(unigrams[0].len(), 3);
        assert_eq!(bigrams[0].len(), 5);
    }

    #[test]
    fn test_single_character_tokens_ignored() {
        let rows = TfidfEmbedder::default().embed(&["a b c"]).unwrap();
        assert!(rows[0].is_empty());
    }

    #[test]
    fn test_word_tokens_follow_unicode_word_characters() {
        // "naïve" spelled with a combining diaeresis stays one token
        let decomposed = "nai\u{0308}ve approach";
        assert_eq!(
            word_tokens(decomposed).unwrap(),
            vec!["nai\u{0308}ve", "approach"]
        );
        // Connector punctuation beyond '_' joins words
        assert_eq!(word_tokens("snake\u{203F}case x").unwrap(), vec!["snake\u{203F}case"]);
        assert_eq!(word_tokens("it's a re-run").unwrap(), vec!["it", "re", "run"]);

        let rows = TfidfEmbedder::default().embed(&[decomposed]).unwrap();
        assert_eq!(rows[0].len(), 2);
    }

    #[test]
    fn test_corpus_load_and_bundle() {
        let dir = tempfile::tempdir().unwrap();
        for (level, text) in [(0, ORIGINAL_CLEAN), (50, "The system processes words.")] {
            let noise_dir = dir.path().join(format!("noise_{level}"));
            std::fs::create_dir_all(&noise_dir).unwrap();
            std::fs::write(noise_dir.join(TRANSLATION_FILE_NAME), format!("{text}\n")).unwrap();
        }

        let corpus = TranslationCorpus::load(dir.path()).unwrap();
        assert_eq!(corpus.len(), 2);

        let bundle = compute_results_bundle(&corpus).unwrap();
        let semantic = bundle.metric(SEMANTIC_DISTANCES).unwrap();
        assert!(semantic.get(0).unwrap() < 1e-6);
        assert!(semantic.get(50).unwrap() > 0.1);
        assert_eq!(bundle.metric(TEXT_SIMILARITIES).unwrap().get(0), Some(1.0));
        assert_eq!(bundle.metric(WORD_OVERLAPS).unwrap().get(0), Some(1.0));
    }

    #[test]
    fn test_corpus_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            TranslationCorpus::load(dir.path()),
            Err(AnalysisError::Corpus(_))
        ));
        assert!(matches!(
            TranslationCorpus::load(dir.path().join("missing")),
            Err(AnalysisError::Corpus(_))
        ));
    }
}
