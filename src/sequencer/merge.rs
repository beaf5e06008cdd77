use crate::source::reader::NormalizedLine;
use chrono::NaiveDateTime;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// All normalized lines of a run, kept as one run per source file.
///
/// Lines are only ever appended. [`Corpus::iter`] yields them in insertion
/// order (the combined log); [`Corpus::into_sorted`] consumes the corpus and
/// yields them in timestamp order.
#[derive(Debug, Default)]
pub struct Corpus {
    runs: Vec<Vec<NormalizedLine>>,
}

#[derive(Debug)]
struct HeapEntry {
    timestamp: NaiveDateTime,
    run: usize,
    line: NormalizedLine,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ties go to the earlier run, which keeps the merge stable
        self.timestamp
            .cmp(&other.timestamp)
            .then(self.run.cmp(&other.run))
    }
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one file's lines as a new run.
    pub fn append(&mut self, lines: Vec<NormalizedLine>) {
        if !lines.is_empty() {
            self.runs.push(lines);
        }
    }

    pub fn len(&self) -> usize {
        self.runs.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Number of non-empty runs appended so far.
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Lines in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &NormalizedLine> {
        self.runs.iter().flatten()
    }

    /// Consume the corpus into ascending timestamp order.
    ///
    /// Each run is stable-sorted on its own (log files are mostly in order
    /// already), then the runs are k-way merged through a min-heap. Equal
    /// timestamps keep insertion order: earlier file first, then earlier line.
    pub fn into_sorted(self) -> Vec<NormalizedLine> {
        let total = self.len();
        let mut runs: Vec<_> = self
            .runs
            .into_iter()
            .map(|mut run| {
                run.sort_by_key(NormalizedLine::instant);
                run.into_iter()
            })
            .collect();

        let mut heap = BinaryHeap::with_capacity(runs.len());
        for (run, lines) in runs.iter_mut().enumerate() {
            if let Some(line) = lines.next() {
                heap.push(Reverse(HeapEntry {
                    timestamp: line.instant(),
                    run,
                    line,
                }));
            }
        }

        let mut sorted = Vec::with_capacity(total);
        while let Some(Reverse(entry)) = heap.pop() {
            let run = entry.run;
            sorted.push(entry.line);
            if let Some(line) = runs[run].next() {
                heap.push(Reverse(HeapEntry {
                    timestamp: line.instant(),
                    run,
                    line,
                }));
            }
        }
        sorted
    }
}

impl FromIterator<Vec<NormalizedLine>> for Corpus {
    fn from_iter<I: IntoIterator<Item = Vec<NormalizedLine>>>(iter: I) -> Self {
        let mut corpus = Self::new();
        for lines in iter {
            corpus.append(lines);
        }
        corpus
    }
}
