use crate::types::*;

/// Occurrence counts of every pattern (k-mer) of one window size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternCountTable {
    counts: PatternCounts,
}

impl PatternCountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the count for `pattern`, replacing any previous value.
    pub fn insert(&mut self, pattern: impl Into<String>, count: u32) {
        self.counts.insert(pattern.into(), count);
    }

    /// Count for `pattern`, 0 if it never occurred
    pub fn get(&self, pattern: &str) -> u32 {
        self.counts.get(pattern).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts, i.e. the number of window positions
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| c as u64).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(p, &c)| (p.as_str(), c))
    }

    /// Unique patterns with their counts, sorted by pattern.
    pub fn sorted(&self) -> Vec<(&str, u32)> {
        let mut rows: Vec<_> = self.iter().collect();
        rows.sort_unstable_by(|a, b| a.0.cmp(b.0));
        rows
    }

    /// One entry per sliding step over `sequence`, in traversal order.
    ///
    /// `sequence` must be the one the table was counted from; repeated patterns
    /// appear once per occurrence, each with its total count.
    pub fn traversal<'a>(
        &'a self,
        sequence: &'a str,
        window_size: usize,
    ) -> impl Iterator<Item = (&'a str, u32)> + 'a {
        windows(sequence, window_size).map(move |pattern| (pattern, self.get(pattern)))
    }

    /// Entries whose count is at least `min_count`.
    pub fn frequent_counts(&self, min_count: u32) -> impl Iterator<Item = (&str, u32)> {
        self.iter().filter(move |&(_, c)| c >= min_count)
    }
}

impl FromIterator<(String, u32)> for PatternCountTable {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        PatternCountTable {
            counts: iter.into_iter().collect(),
        }
    }
}

/// Every contiguous substring of `window_size` characters, slid one residue at a time.
fn windows(sequence: &str, window_size: usize) -> impl Iterator<Item = &str> {
    let bounds: Vec<usize> = sequence
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(sequence.len()))
        .collect();
    let n_chars = bounds.len() - 1;
    let steps = if window_size == 0 || n_chars < window_size {
        0
    } else {
        n_chars - window_size + 1
    };
    (0..steps).map(move |i| &sequence[bounds[i]..bounds[i + window_size]])
}

/// Counts overlapping occurrences of each pattern of length `window_size`.
///
/// # Arguments
/// * `sequence` - Residue string; characters are treated as opaque symbols
/// * `window_size` - Pattern length k
///
/// # Returns
/// * `PatternCountTable` - Counts summing to `len(sequence) - window_size + 1`, or an
///   empty table when the sequence is shorter than the window (or the window is 0)
pub fn count_patterns(sequence: &str, window_size: usize) -> PatternCountTable {
    let mut table = PatternCountTable::new();
    for pattern in windows(sequence, window_size) {
        match table.counts.get_mut(pattern) {
            Some(count) => *count += 1,
            None => {
                table.counts.insert(pattern.to_string(), 1);
            }
        }
    }
    table
}

/// Patterns of `table` occurring at least `min_count` times.
pub fn filter_frequent(table: &PatternCountTable, min_count: u32) -> FrequentPatternSet {
    table
        .frequent_counts(min_count)
        .map(|(pattern, _)| pattern.to_string())
        .collect()
}

/// Adds each pattern's count to every residue it contains, once per occurrence
/// of that residue within the pattern.
///
/// # Example
/// ```
/// use tf_disorder_kmers::kmer::weigh_residues;
///
/// let tally = weigh_residues([("AAB", 4), ("BCD", 2)]);
/// assert_eq!(tally[&'A'], 8);
/// assert_eq!(tally[&'B'], 6);
/// ```
pub fn weigh_residues<'a, I>(pairs: I) -> ResidueTally
where
    I: IntoIterator<Item = (&'a str, u32)>,
{
    let mut tally = ResidueTally::new();
    for (pattern, count) in pairs {
        for residue in pattern.chars() {
            *tally.entry(residue).or_insert(0) += count as u64;
        }
    }
    tally
}
