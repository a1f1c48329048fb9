//! Similarity primitives shared by the semantic cache and the context
//! optimizer.

use std::collections::HashSet;

/// Cosine similarity between two embedding vectors.
///
/// Returns `0.0` when either vector is empty, the lengths differ, or either
/// vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

/// Whitespace-separated words of `text`.
pub fn word_set(text: &str) -> HashSet<&str> {
    text.split_whitespace().collect()
}

/// Jaccard similarity of the word sets of two texts.
///
/// Two texts without any words are not considered similar.
pub fn jaccard_similarity(a: &str, b: &str) -> f32 {
    let words_a = word_set(a);
    let words_b = word_set(b);

    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();

    intersection as f32 / union as f32
}
