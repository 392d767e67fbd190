//! Similarity kernel
//!
//! Five scalar measures over feature bundles, each in [0, 1]:
//! Jaccard on k-shingles, edit similarity on the compressed control stream,
//! and Jaccard on the identifier, loop-signature, and call sets. Cosine
//! over the token-frequency bags is computed alongside for reporters that
//! show it beside Jaccard.
//!
//! Empty-input conventions: two empty inputs are identical (1.0); one empty
//! input against a nonempty one scores 0.0.

use crate::types::{Breakdown, Features, PairMetrics, Weights};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Jaccard similarity: `|A∩B| / |A∪B|`
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Cosine similarity over token-frequency bags
pub fn cosine(a: &HashMap<String, u32>, b: &HashMap<String, u32>) -> f64 {
    let mut dot = 0.0;
    let mut mag_a_sq = 0.0;
    let mut mag_b_sq = 0.0;

    for (token, &count_a) in a {
        let ca = count_a as f64;
        mag_a_sq += ca * ca;
        if let Some(&count_b) = b.get(token) {
            dot += ca * count_b as f64;
        }
    }
    for &count_b in b.values() {
        let cb = count_b as f64;
        mag_b_sq += cb * cb;
    }

    let mag_a = mag_a_sq.sqrt();
    let mag_b = mag_b_sq.sqrt();

    if mag_a == 0.0 && mag_b == 0.0 {
        1.0
    } else if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

/// Length-normalized Levenshtein similarity over symbol sequences
///
/// `1 − edit(a,b) / max(|a|,|b|)`. Control streams are heavily compressed,
/// so the quadratic DP stays cheap.
pub fn edit_similarity(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let av: Vec<&String> = a.iter().collect();
    let bv: Vec<&String> = b.iter().collect();
    let distance = strsim::generic_levenshtein(&av, &bv);
    1.0 - distance as f64 / a.len().max(b.len()) as f64
}

/// Score one unordered pair: the five components, the weighted composite,
/// and the cosine side channel
pub fn compare_features(a: &Features, b: &Features, weights: &Weights) -> PairMetrics {
    let breakdown = Breakdown {
        jaccard: jaccard(&a.shingles, &b.shingles),
        control: edit_similarity(&a.control, &b.control),
        idents: jaccard(&a.idents, &b.idents),
        loops: jaccard(&a.loop_sigs, &b.loop_sigs),
        calls: jaccard(&a.calls, &b.calls),
    };
    PairMetrics {
        score: breakdown.composite(weights),
        breakdown,
        cosine: cosine(&a.token_freq, &b.token_freq),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::extract_from_source;
    use crate::types::AnalysisConfig;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn seq(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_jaccard_empty_rules() {
        let empty: HashSet<String> = HashSet::new();
        assert_eq!(jaccard(&empty, &empty), 1.0);
        assert_eq!(jaccard(&set(&["a"]), &empty), 0.0);
    }

    #[test]
    fn test_jaccard_properties() {
        let a = set(&["a", "b", "c"]);
        let b = set(&["b", "c", "d"]);
        assert_eq!(jaccard(&a, &a), 1.0);
        assert_eq!(jaccard(&a, &b), jaccard(&b, &a));
        assert!((jaccard(&a, &b) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_edit_similarity_empty_rules() {
        let empty: Vec<String> = Vec::new();
        assert_eq!(edit_similarity(&empty, &empty), 1.0);
        assert_eq!(edit_similarity(&seq(&["IF"]), &empty), 0.0);
    }

    #[test]
    fn test_edit_similarity_properties() {
        let a = seq(&["IF", "BRACE{", "SEMI", "BRACE}"]);
        let b = seq(&["IF", "BRACE{", "RETURN", "SEMI", "BRACE}"]);
        assert_eq!(edit_similarity(&a, &a), 1.0);
        assert_eq!(edit_similarity(&a, &b), edit_similarity(&b, &a));
        // One insertion against length 5.
        assert!((edit_similarity(&a, &b) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_empty_rules() {
        let empty: HashMap<String, u32> = HashMap::new();
        let mut bag = HashMap::new();
        bag.insert("int".to_string(), 3u32);
        assert_eq!(cosine(&empty, &empty), 1.0);
        assert_eq!(cosine(&bag, &empty), 0.0);
        assert!((cosine(&bag, &bag) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_orthogonal_bags() {
        let mut a = HashMap::new();
        a.insert("x".to_string(), 2u32);
        let mut b = HashMap::new();
        b.insert("y".to_string(), 5u32);
        assert_eq!(cosine(&a, &b), 0.0);
    }

    #[test]
    fn test_identical_sources_score_one() {
        let cfg = AnalysisConfig::default();
        let code = "int main(void) { int i; for (i = 0; i < 10; i++) { printf(\"%d\", i); } return 0; }";
        let a = extract_from_source(code, &cfg);
        let b = extract_from_source(code, &cfg);
        let m = compare_features(&a, &b, &cfg.weights);
        assert!((m.score - 1.0).abs() < 1e-12);
        assert!((m.cosine - 1.0).abs() < 1e-12);
        for c in m.breakdown.components() {
            assert!((c - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_renamed_identifiers_keep_shingle_jaccard() {
        let cfg = AnalysisConfig::default();
        let a = extract_from_source(
            "int soma(int a, int b) { int total = a + b; return total; }",
            &cfg,
        );
        let b = extract_from_source(
            "int soma(int x, int y) { int acc = x + y; return acc; }",
            &cfg,
        );
        let m = compare_features(&a, &b, &cfg.weights);
        assert!((m.breakdown.jaccard - 1.0).abs() < 1e-12);
        assert!(m.breakdown.idents < 1.0);
    }
}
