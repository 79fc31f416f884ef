use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Raw pattern occurrence counts
pub type PatternCounts = HashMap<String, u32>;

/// Patterns meeting the minimum-occurrence threshold, in lexicographic order
pub type FrequentPatternSet = BTreeSet<String>;

/// Count-weighted occurrences of each residue across frequent patterns
pub type ResidueTally = BTreeMap<char, u64>;
