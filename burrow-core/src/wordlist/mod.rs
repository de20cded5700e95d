//! Wordlist loading and the filter -> transform -> permutation pipeline

mod permutation;
mod stage;

pub use permutation::{CandidateSet, PermutationRequest, Permutations};
pub use stage::{Transform, WordFilter};

use crate::error::{ConfigError, ConfigResult};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Load wordlist from file
pub fn load_wordlist(path: &Path) -> ConfigResult<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let words: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    if words.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Wordlist {} is empty or contains only comments",
            path.display()
        )));
    }

    Ok(words)
}

/// Ordered filter and transform stages
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    filters: Vec<WordFilter>,
    transforms: Vec<Transform>,
    unique: bool,
}

impl Pipeline {
    pub fn new(filters: Vec<WordFilter>, transforms: Vec<Transform>) -> Self {
        Self {
            filters,
            transforms,
            unique: false,
        }
    }

    pub fn parse<S: AsRef<str>>(filters: &[S], transforms: &[S]) -> ConfigResult<Self> {
        let filters = filters
            .iter()
            .map(|f| WordFilter::parse(f.as_ref()))
            .collect::<ConfigResult<Vec<_>>>()?;
        let transforms = transforms
            .iter()
            .map(|t| Transform::parse(t.as_ref()))
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(Self::new(filters, transforms))
    }

    /// Drop repeated words after transforming, keeping the first occurrence
    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Runs every filter, then every transform in declared order
    pub fn build(&self, raw: &[String]) -> Vec<String> {
        let transformed = raw
            .iter()
            .filter(|word| self.filters.iter().all(|f| f.keep(word)))
            .map(|word| {
                self.transforms
                    .iter()
                    .fold(word.clone(), |current, t| t.apply(&current))
            });

        let words: Vec<String> = if self.unique {
            let mut seen = HashSet::new();
            transformed.filter(|w| seen.insert(w.clone())).collect()
        } else {
            transformed.collect()
        };

        debug!(
            "Wordlist pipeline kept {} of {} words",
            words.len(),
            raw.len()
        );
        words
    }

    /// Builds the pool and wraps it as candidates for `arity` placeholders
    pub fn candidates(&self, raw: &[String], arity: usize) -> CandidateSet {
        CandidateSet::new(self.build(raw), arity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filter_stage() {
        let pipeline = Pipeline::parse(&["ends=.php"], &[]).unwrap();
        let out = pipeline.build(&words(&["index.php", "index.html", "a.php"]));
        assert_eq!(out, words(&["index.php", "a.php"]));
    }

    #[test]
    fn test_every_filter_must_hold() {
        let pipeline = Pipeline::parse(&["ends=.php", "starts=a"], &[]).unwrap();
        let out = pipeline.build(&words(&["index.php", "admin.php", "a.html"]));
        assert_eq!(out, words(&["admin.php"]));
    }

    #[test]
    fn test_transforms_apply_in_order() {
        let pipeline = Pipeline::parse::<&str>(&[], &["suffix:a", "replace:a=@"]).unwrap();
        assert_eq!(pipeline.build(&words(&["banan"])), words(&["b@n@n@"]));

        let pipeline = Pipeline::parse::<&str>(&[], &["replace:a=@", "suffix:a"]).unwrap();
        assert_eq!(pipeline.build(&words(&["banan"])), words(&["b@n@na"]));
    }

    #[test]
    fn test_filters_run_before_transforms() {
        // the filter sees the raw word, not the uppercased one
        let pipeline = Pipeline::parse(&["starts=a"], &["uppercase"]).unwrap();
        assert_eq!(pipeline.build(&words(&["admin", "root"])), words(&["ADMIN"]));
    }

    #[test]
    fn test_no_stages_is_identity() {
        let raw = words(&["b", "a", "b", "c"]);
        let out = Pipeline::default().build(&raw);

        let count = |list: &[String]| {
            let mut counts: HashMap<String, usize> = HashMap::new();
            for w in list {
                *counts.entry(w.clone()).or_default() += 1;
            }
            counts
        };
        assert_eq!(count(&out), count(&raw));
        assert_eq!(out, raw);
    }

    #[test]
    fn test_duplicates_kept_unless_unique() {
        let raw = words(&["Admin", "admin", "login"]);
        let lower = Pipeline::parse::<&str>(&[], &["lowercase"]).unwrap();
        assert_eq!(lower.build(&raw), words(&["admin", "admin", "login"]));

        let unique = lower.with_unique(true);
        assert_eq!(unique.build(&raw), words(&["admin", "login"]));
    }

    #[test]
    fn test_candidates_use_final_pool() {
        let pipeline = Pipeline::parse(&["!starts=x"], &["uppercase"]).unwrap();
        let set = pipeline.candidates(&words(&["a", "b", "x", "c"]), 2);
        assert_eq!(set.pool(), words(&["A", "B", "C"]).as_slice());
        assert_eq!(set.len(), 6);
    }

    #[test]
    fn test_load_wordlist_skips_comments_and_blanks() {
        let temp_dir = TempDir::new().unwrap();
        let wordlist_path = temp_dir.path().join("words.txt");
        fs::write(&wordlist_path, "# header\n  admin  \n\nlogin\n\t\n#skip\nsecret\n").unwrap();

        let loaded = load_wordlist(&wordlist_path).unwrap();
        assert_eq!(loaded, words(&["admin", "login", "secret"]));
    }

    #[test]
    fn test_load_wordlist_errors() {
        let temp_dir = TempDir::new().unwrap();
        let wordlist_path = temp_dir.path().join("empty.txt");
        fs::write(&wordlist_path, "# only comments\n\n").unwrap();

        assert!(matches!(
            load_wordlist(&wordlist_path),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            load_wordlist(Path::new("/nonexistent/words.txt")),
            Err(ConfigError::Io { .. })
        ));
    }
}
