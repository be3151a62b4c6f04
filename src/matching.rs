//! Pure word matching primitives shared by both game modes.

/// Split of a target word into the part already typed and the rest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixMatch {
    pub matched_prefix: String,
    pub remainder: String,
}

/// How the current input relates to the target word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchClass {
    Exact,
    Close,
    Wrong,
}

/// Levenshtein distance over chars; insertion, deletion and substitution each cost 1.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // single rolling row of the DP matrix
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for i in 1..=a.len() {
        let mut diagonal = row[0];
        row[0] = i;

        for j in 1..=b.len() {
            let above = row[j];
            let cost = usize::from(a[i - 1] != b[j - 1]);
            row[j] = (above + 1).min(row[j - 1] + 1).min(diagonal + cost);
            diagonal = above;
        }
    }

    row[b.len()]
}

/// Case-insensitive longest common prefix of `typed` and `target`, returned as a split of `target`.
pub fn match_prefix(typed: &str, target: &str) -> PrefixMatch {
    let matched_chars = typed
        .chars()
        .zip(target.chars())
        .take_while(|(t, w)| chars_eq_ignore_case(*t, *w))
        .count();

    let split_at = target
        .char_indices()
        .nth(matched_chars)
        .map_or(target.len(), |(idx, _)| idx);

    PrefixMatch {
        matched_prefix: target[..split_at].to_string(),
        remainder: target[split_at..].to_string(),
    }
}

pub fn is_exact_match(typed: &str, target: &str) -> bool {
    typed.to_lowercase() == target.to_lowercase()
}

/// True when `typed` is within `tolerance` edits of `target`, ignoring case.
pub fn is_fuzzy_match(typed: &str, target: &str, tolerance: usize) -> bool {
    edit_distance(&typed.to_lowercase(), &target.to_lowercase()) <= tolerance
}

pub fn classify(typed: &str, target: &str, tolerance: usize) -> MatchClass {
    if is_exact_match(typed, target) {
        MatchClass::Exact
    } else if is_fuzzy_match(typed, target, tolerance) {
        MatchClass::Close
    } else {
        MatchClass::Wrong
    }
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}
