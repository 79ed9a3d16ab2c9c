//! Text normalization and edit-distance similarity.

use super::PARTIAL_WEIGHT;

/// Case-fold, strip punctuation and collapse whitespace
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Levenshtein distance over Unicode scalar values
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    edit_distance(&a, &b, false)
}

/// `1 - d(a, b) / max(|a|, |b|)`; two empty strings are identical
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - edit_distance(&a, &b, false) as f64 / longest as f64
}

/// How well `needle` aligns with the closest substring of `haystack`
pub fn partial_ratio(needle: &str, haystack: &str) -> f64 {
    let needle: Vec<char> = needle.chars().collect();
    let haystack: Vec<char> = haystack.chars().collect();
    if needle.is_empty() {
        return if haystack.is_empty() { 1.0 } else { 0.0 };
    }
    1.0 - edit_distance(&needle, &haystack, true) as f64 / needle.len() as f64
}

/// Similarity in [0, 1] between an already normalized query and line
pub fn similarity(query: &str, text: &str) -> f64 {
    let full = ratio(query, text);
    let partial = PARTIAL_WEIGHT * partial_ratio(query, text);
    full.max(partial).clamp(0.0, 1.0)
}

/// Edit distance between `a` and `b`.
///
/// With `substring` set, `a` may align against any substring of `b` for free
/// (leading and trailing characters of `b` cost nothing).
fn edit_distance(a: &[char], b: &[char], substring: bool) -> usize {
    // prev[j] = distance between a[..i] and b[..j]
    let mut prev: Vec<usize> = if substring {
        vec![0; b.len() + 1]
    } else {
        (0..=b.len()).collect()
    };
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            let deletion = prev[j + 1] + 1;
            let insertion = curr[j] + 1;
            curr[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    if substring {
        prev.into_iter().min().unwrap_or(a.len())
    } else {
        prev[b.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Hello,   World!  "), "hello world");
        assert_eq!(normalize("Don't\tstop\nme-now"), "dont stop menow");
        assert_eq!(normalize("Ça VA?"), "ça va");
        assert_eq!(normalize("...!?"), "");
        assert_eq!(normalize("snake_case"), "snake_case");
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("héllo", "hello"), 1);
    }

    #[test]
    fn test_ratio_bounds() {
        assert_eq!(ratio("same", "same"), 1.0);
        assert_eq!(ratio("", ""), 1.0);
        assert_eq!(ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_partial_ratio_finds_substring() {
        assert_eq!(partial_ratio("give you up", "never gonna give you up"), 1.0);
        assert_eq!(partial_ratio("gve you", "never gonna give you up"), 1.0 - 1.0 / 7.0);
        assert_eq!(partial_ratio("", "abc"), 0.0);
    }

    #[test]
    fn test_similarity_prefers_exact_over_contained() {
        let exact = similarity("never gonna give you up", "never gonna give you up");
        let contained = similarity("give you up", "never gonna give you up");
        assert_eq!(exact, 1.0);
        assert!(contained < exact);
        assert!((contained - PARTIAL_WEIGHT).abs() < 1e-9);
    }

    #[test]
    fn test_full_ratio_is_symmetric() {
        assert_eq!(ratio("never gonna give up", "never gonna give you up"), 1.0 - 4.0 / 23.0);
        assert_eq!(ratio("never gonna give you up", "never gonna give up"), 1.0 - 4.0 / 23.0);
    }
}
