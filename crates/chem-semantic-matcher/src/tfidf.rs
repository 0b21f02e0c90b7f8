//! TF-IDF vector space over a small document corpus
//!
//! Terms are tokens of two or more characters. IDF is smoothed as if one
//! extra document contained every term: `ln((1 + n) / (1 + df)) + 1`.
//! Rows hold raw term counts times IDF and are L2-normalized.

use std::collections::BTreeMap;

use crate::similarity::normalize;

/// Fitted vocabulary and document rows
#[derive(Debug, Clone)]
pub struct TfidfMatrix {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f32>,
    rows: Vec<Vec<f32>>,
}

impl TfidfMatrix {
    /// Fit the vector space on `documents` (token lists) and transform them
    pub fn fit_transform<S: AsRef<str>>(documents: &[Vec<S>]) -> Self {
        let term_docs: Vec<Vec<&str>> = documents
            .iter()
            .map(|doc| {
                doc.iter()
                    .map(|t| t.as_ref())
                    .filter(|t| is_term(t))
                    .collect()
            })
            .collect();

        // Sorted vocabulary keeps column order stable across runs
        let mut vocabulary = BTreeMap::new();
        for doc in &term_docs {
            for term in doc {
                vocabulary.entry(term.to_string()).or_insert(0usize);
            }
        }
        for (column, index) in vocabulary.values_mut().enumerate() {
            *index = column;
        }

        let n_docs = term_docs.len() as f32;
        let mut df = vec![0usize; vocabulary.len()];
        for doc in &term_docs {
            let mut seen = vec![false; vocabulary.len()];
            for term in doc {
                let column = vocabulary[*term];
                if !seen[column] {
                    seen[column] = true;
                    df[column] += 1;
                }
            }
        }
        let idf: Vec<f32> = df
            .iter()
            .map(|&d| ((1.0 + n_docs) / (1.0 + d as f32)).ln() + 1.0)
            .collect();

        let rows = term_docs
            .iter()
            .map(|doc| {
                let mut row = vec![0.0f32; vocabulary.len()];
                for term in doc {
                    row[vocabulary[*term]] += 1.0;
                }
                for (value, weight) in row.iter_mut().zip(&idf) {
                    *value *= weight;
                }
                normalize(row)
            })
            .collect();

        Self {
            vocabulary,
            idf,
            rows,
        }
    }

    pub fn rows(&self) -> &[Vec<f32>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// IDF weight of a term, if it is in the vocabulary
    pub fn idf(&self, term: &str) -> Option<f32> {
        self.vocabulary.get(term).map(|&column| self.idf[column])
    }
}

/// Tokens shorter than two characters carry no signal
pub fn is_term(token: &str) -> bool {
    token.chars().count() >= 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::{cosine_similarity, l2_norm};

    fn docs(texts: &[&str]) -> Vec<Vec<String>> {
        texts
            .iter()
            .map(|t| t.split_whitespace().map(String::from).collect())
            .collect()
    }

    #[test]
    fn test_single_char_tokens_ignored() {
        let m = TfidfMatrix::fit_transform(&docs(&["a b pump", "pump"]));
        assert_eq!(m.vocabulary_len(), 1);
    }

    #[test]
    fn test_rows_are_unit_length() {
        let m = TfidfMatrix::fit_transform(&docs(&["prime pump", "transfer liquid zone"]));
        for row in m.rows() {
            assert!((l2_norm(row) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_empty_document_is_zero_row() {
        let m = TfidfMatrix::fit_transform(&docs(&["", "prime pump"]));
        assert_eq!(l2_norm(m.row(0).unwrap()), 0.0);
    }

    #[test]
    fn test_smoothed_idf() {
        let m = TfidfMatrix::fit_transform(&docs(&["pump", "pump", "zone"]));
        // df(pump)=2, n=3 -> ln(4/3)+1
        let expected = (4.0f32 / 3.0).ln() + 1.0;
        assert!((m.idf("pump").unwrap() - expected).abs() < 1e-6);
        // df(zone)=1 -> ln(4/2)+1
        let expected = 2.0f32.ln() + 1.0;
        assert!((m.idf("zone").unwrap() - expected).abs() < 1e-6);
        assert!(m.idf("needle").is_none());
    }

    #[test]
    fn test_shared_terms_score_higher() {
        let m = TfidfMatrix::fit_transform(&docs(&[
            "prime pump",
            "prime chemspeed pump",
            "execute liquid transfer source target zone",
        ]));
        let query = m.row(0).unwrap();
        let related = cosine_similarity(query, m.row(1).unwrap());
        let unrelated = cosine_similarity(query, m.row(2).unwrap());
        assert!(related > 0.5);
        assert_eq!(unrelated, 0.0);
    }
}
