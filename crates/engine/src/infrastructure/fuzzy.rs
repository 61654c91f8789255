//! Fuzzy name matching for "did you mean" suggestions.
//!
//! A candidate matches when every character of the query appears in it in
//! order, ignoring case. Matches are ranked by edit distance to the query.

/// Candidates matching `query`, best first. Ties keep candidate order.
pub fn rank_matches<'a>(query: &str, candidates: &'a [String]) -> Vec<&'a str> {
    let query = query.to_lowercase();
    let mut ranked: Vec<(usize, &str)> = candidates
        .iter()
        .filter_map(|candidate| {
            let folded = candidate.to_lowercase();
            is_subsequence(&query, &folded).then(|| (levenshtein(&query, &folded), candidate.as_str()))
        })
        .collect();
    ranked.sort_by_key(|(distance, _)| *distance);
    ranked.into_iter().map(|(_, name)| name).collect()
}

fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut hay = haystack.chars();
    needle.chars().all(|c| hay.any(|h| h == c))
}

pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("amiya", "amiya"), 0);
    }

    #[test]
    fn subsequence_is_case_insensitive() {
        let candidates = names(&["Amiya", "Amiya Guard", "Ansel", "Skadi"]);
        let ranked = rank_matches("AMI", &candidates);
        assert_eq!(ranked, vec!["Amiya", "Amiya Guard"]);
    }

    #[test]
    fn closer_names_rank_first() {
        let candidates = names(&["Lava the Purgatory", "Lava"]);
        let ranked = rank_matches("lav", &candidates);
        assert_eq!(ranked.first(), Some(&"Lava"));
    }

    #[test]
    fn no_match_yields_empty() {
        let candidates = names(&["Amiya"]);
        assert!(rank_matches("zzznotreal", &candidates).is_empty());
    }
}
