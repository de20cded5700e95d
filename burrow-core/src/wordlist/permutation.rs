use crate::error::{ConfigError, ConfigResult};

/// A URL template with one or more placeholder occurrences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermutationRequest {
    template: String,
    placeholder: String,
}

impl PermutationRequest {
    pub fn new(template: impl Into<String>, placeholder: impl Into<String>) -> ConfigResult<Self> {
        let template = template.into();
        let placeholder = placeholder.into();

        if placeholder.is_empty() {
            return Err(ConfigError::Validation("placeholder cannot be empty".to_string()));
        }
        if !template.contains(placeholder.as_str()) {
            return Err(ConfigError::PlaceholderMismatch {
                placeholder,
                found: 0,
                reason: "at least one is required".to_string(),
            });
        }

        Ok(Self {
            template,
            placeholder,
        })
    }

    /// Number of placeholder occurrences (the `k` of the permutation)
    pub fn arity(&self) -> usize {
        self.template.matches(self.placeholder.as_str()).count()
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// One word fills every occurrence; several words fill the occurrences
    /// left to right.
    pub fn substitute(&self, words: &[&str]) -> String {
        if let [word] = words {
            return self.template.replace(self.placeholder.as_str(), word);
        }

        let mut out = String::with_capacity(self.template.len());
        let mut pieces = self.template.split(self.placeholder.as_str());
        if let Some(first) = pieces.next() {
            out.push_str(first);
        }
        for (i, piece) in pieces.enumerate() {
            match words.get(i) {
                Some(word) => out.push_str(word),
                None => out.push_str(&self.placeholder),
            }
            out.push_str(piece);
        }
        out
    }
}

/// The final candidate space handed to the scheduler.
///
/// With `arity == 1` each pool word is one candidate. With `arity == k > 1`
/// every ordered arrangement of `k` distinct pool positions is a candidate.
/// Iteration is lazy and can be restarted any number of times.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    pool: Vec<String>,
    arity: usize,
}

impl CandidateSet {
    pub fn new(pool: Vec<String>, arity: usize) -> Self {
        Self {
            pool,
            arity: arity.max(1),
        }
    }

    pub fn pool(&self) -> &[String] {
        &self.pool
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// n! / (n - k)!, or zero when k > n
    pub fn len(&self) -> usize {
        let n = self.pool.len();
        if self.arity > n {
            return 0;
        }
        ((n - self.arity + 1)..=n).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        Permutations::new(self.pool.len(), self.arity)
            .map(move |indices| indices.iter().map(|&i| self.pool[i].as_str()).collect())
    }
}

/// Lexicographic k-permutations of `0..n`
#[derive(Debug, Clone)]
pub struct Permutations {
    n: usize,
    current: Option<Vec<usize>>,
}

impl Permutations {
    pub fn new(n: usize, k: usize) -> Self {
        let current = (k <= n).then(|| (0..k).collect());
        Self { n, current }
    }

    fn advance(&self, current: &[usize]) -> Option<Vec<usize>> {
        let k = current.len();
        for pos in (0..k).rev() {
            let prefix = &current[..pos];
            let next = (current[pos] + 1..self.n).find(|v| !prefix.contains(v));
            if let Some(value) = next {
                let mut arrangement = prefix.to_vec();
                arrangement.push(value);
                let fill: Vec<usize> = (0..self.n)
                    .filter(|v| !arrangement.contains(v))
                    .take(k - pos - 1)
                    .collect();
                arrangement.extend(fill);
                return Some(arrangement);
            }
        }
        None
    }
}

impl Iterator for Permutations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.take()?;
        self.current = self.advance(&current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_arity_counts_placeholders() {
        let request = PermutationRequest::new("http://x/$/$.$", "$").unwrap();
        assert_eq!(request.arity(), 3);
    }

    #[test]
    fn test_missing_placeholder_rejected() {
        assert!(matches!(
            PermutationRequest::new("http://x/", "FUZZ"),
            Err(ConfigError::PlaceholderMismatch { found: 0, .. })
        ));
    }

    #[test]
    fn test_substitute_single_word_fills_all() {
        let request = PermutationRequest::new("http://x/FUZZ/FUZZ.bak", "FUZZ").unwrap();
        assert_eq!(request.substitute(&["admin"]), "http://x/admin/admin.bak");
    }

    #[test]
    fn test_substitute_left_to_right() {
        let request = PermutationRequest::new("http://x/$/$", "$").unwrap();
        assert_eq!(request.substitute(&["a", "b"]), "http://x/a/b");
        assert_eq!(request.substitute(&["b", "a"]), "http://x/b/a");
    }

    #[test]
    fn test_permutation_count_and_distinctness() {
        for (n, k) in [(3, 2), (4, 2), (4, 3), (5, 1), (3, 3), (6, 2)] {
            let pool: Vec<String> = (0..n).map(|i| format!("w{}", i)).collect();
            let set = CandidateSet::new(pool, k);
            let all: Vec<Vec<&str>> = set.iter().collect();
            let expected: usize = ((n - k + 1)..=n).product();

            assert_eq!(all.len(), expected, "n={} k={}", n, k);
            assert_eq!(set.len(), expected);

            let unique: HashSet<&Vec<&str>> = all.iter().collect();
            assert_eq!(unique.len(), all.len(), "arrangements must be distinct");

            for arrangement in &all {
                let inner: HashSet<&&str> = arrangement.iter().collect();
                assert_eq!(inner.len(), k, "no word repeats inside an arrangement");
            }
        }
    }

    #[test]
    fn test_permutations_are_lexicographic() {
        let all: Vec<Vec<usize>> = Permutations::new(3, 2).collect();
        assert_eq!(
            all,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 2],
                vec![2, 0],
                vec![2, 1]
            ]
        );
    }

    #[test]
    fn test_arity_larger_than_pool_is_empty() {
        let set = CandidateSet::new(words(&["a", "b"]), 3);
        assert!(set.is_empty());
        assert_eq!(set.iter().count(), 0);
    }

    #[test]
    fn test_iteration_is_restartable() {
        let set = CandidateSet::new(words(&["a", "b", "c"]), 2);
        let first: Vec<Vec<&str>> = set.iter().collect();
        let second: Vec<Vec<&str>> = set.iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_arity_preserves_pool() {
        let set = CandidateSet::new(words(&["a", "b", "a"]), 1);
        let flat: Vec<&str> = set.iter().map(|c| c[0]).collect();
        assert_eq!(flat, vec!["a", "b", "a"]);
    }
}
