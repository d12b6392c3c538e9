//! Line-indexed annotation store.
//!
//! Every directive the engine produces ends up here, keyed by the source line
//! it must be written before. A line accumulates distinct fragments in the
//! order they were first inserted; inserting text that is already part of the
//! line is a no-op, so recursive passes can revisit a loop without
//! duplicating its pragma.

pub mod pragmas;

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentMap(BTreeMap<u32, String>);

impl CommentMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Appends `fragment` to `line` unless the line already contains it.
    pub fn add(&mut self, line: u32, fragment: &str) {
        match self.0.get_mut(&line) {
            Some(text) if text.contains(fragment) => {}
            Some(text) => text.push_str(fragment),
            None => {
                self.0.insert(line, fragment.to_string());
            }
        }
    }

    /// Merges every line of `other`, each as a single fragment.
    pub fn merge(&mut self, other: &CommentMap) {
        for (line, text) in &other.0 {
            self.add(*line, text);
        }
    }

    pub fn get(&self, line: u32) -> Option<&str> {
        self.0.get(&line).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.0.iter().map(|(line, text)| (*line, text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl fmt::Display for CommentMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (line, text) in self.iter() {
            for fragment in text.lines() {
                writeln!(f, "{line}\t{fragment}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_add_deduplicates() {
        let mut map = CommentMap::new();
        map.add(4, "#pragma acc kernels\n");
        map.add(4, "#pragma acc kernels\n");
        assert_eq!(map.get(4), Some("#pragma acc kernels\n"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_add_keeps_insertion_order() {
        let mut map = CommentMap::new();
        map.add(7, "B\n");
        map.add(7, "A\n");
        map.add(7, "B\n");
        assert_eq!(map.get(7), Some("B\nA\n"));
    }

    #[test]
    fn test_substring_is_noop() {
        let mut map = CommentMap::new();
        map.add(1, "#pragma omp parallel for if(x)\n");
        map.add(1, "#pragma omp parallel for");
        assert_eq!(map.get(1), Some("#pragma omp parallel for if(x)\n"));
    }

    #[test]
    fn test_merge() {
        let mut out = CommentMap::new();
        out.add(2, "a\n");
        let mut other = CommentMap::new();
        other.add(2, "a\n");
        other.add(9, "}\n");
        out.merge(&other);
        assert_eq!(out.get(2), Some("a\n"));
        assert_eq!(out.get(9), Some("}\n"));
    }

    #[test]
    fn test_display() {
        let mut map = CommentMap::new();
        map.add(3, "x\ny\n");
        assert_eq!(map.to_string(), "3\tx\n3\ty\n");
    }

    #[test]
    fn test_iter_by_line() {
        let mut map = CommentMap::new();
        map.add(12, "}\n");
        map.add(4, "#pragma acc kernels\n");
        let lines: Vec<_> = map.iter().collect();
        assert_eq!(lines, vec![(4, "#pragma acc kernels\n"), (12, "}\n")]);
    }

    proptest! {
        #[test]
        fn prop_add_is_idempotent(line in 1u32..50, fragment in "[a-z ]{1,12}") {
            let mut once = CommentMap::new();
            once.add(line, &fragment);
            let mut twice = once.clone();
            twice.add(line, &fragment);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_first_insertion_wins_order(a in "[a-m]{3}", b in "[n-z]{3}") {
            let mut map = CommentMap::new();
            map.add(1, &a);
            map.add(1, &b);
            map.add(1, &a);
            prop_assert_eq!(map.get(1).unwrap().to_string(), format!("{a}{b}"));
        }
    }
}
