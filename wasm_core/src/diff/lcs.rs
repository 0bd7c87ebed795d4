//! Longest-common-subsequence alignment over keyed items.
//!
//! Both lines and word tokens go through the same aligner; only the key is
//! compared, never the rendered text.

/// Anything that can be compared by a normalized key.
pub trait Keyed {
    fn key(&self) -> &str;
}

/// One step of an edit script.
#[derive(Debug, PartialEq, Eq)]
pub enum DiffOp<'a, T> {
    /// Present on both sides (keys equal).
    Unchanged { old: &'a T, new: &'a T },
    /// Only in the new sequence.
    Added(&'a T),
    /// Only in the old sequence.
    Removed(&'a T),
}

impl<T> Clone for DiffOp<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DiffOp<'_, T> {}

impl<'a, T> DiffOp<'a, T> {
    /// The item this op contributes to the old sequence, if any.
    pub fn old_side(&self) -> Option<&'a T> {
        match *self {
            DiffOp::Unchanged { old, .. } | DiffOp::Removed(old) => Some(old),
            DiffOp::Added(_) => None,
        }
    }

    /// The item this op contributes to the new sequence, if any.
    pub fn new_side(&self) -> Option<&'a T> {
        match *self {
            DiffOp::Unchanged { new, .. } | DiffOp::Added(new) => Some(new),
            DiffOp::Removed(_) => None,
        }
    }
}

/// Computes a minimal edit script turning `old` into `new`.
///
/// O(n*m) time and memory on the sequence lengths. The backtrack walks from
/// the end of both sequences: equal keys always take the diagonal, and on a
/// score tie the new-side item is consumed first. Because ops are collected
/// in reverse, removed items end up ahead of the added items they sit next to.
pub fn align<'a, T: Keyed>(old: &'a [T], new: &'a [T]) -> Vec<DiffOp<'a, T>> {
    let (n, m) = (old.len(), new.len());
    let width = m + 1;
    let mut table = vec![0u32; (n + 1) * width];
    for i in 1..=n {
        for j in 1..=m {
            table[i * width + j] = if old[i - 1].key() == new[j - 1].key() {
                table[(i - 1) * width + j - 1] + 1
            } else {
                table[(i - 1) * width + j].max(table[i * width + j - 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && old[i - 1].key() == new[j - 1].key() {
            ops.push(DiffOp::Unchanged {
                old: &old[i - 1],
                new: &new[j - 1],
            });
            i -= 1;
            j -= 1;
        } else if j > 0 && (i == 0 || table[i * width + j - 1] >= table[(i - 1) * width + j]) {
            ops.push(DiffOp::Added(&new[j - 1]));
            j -= 1;
        } else {
            ops.push(DiffOp::Removed(&old[i - 1]));
            i -= 1;
        }
    }
    ops.reverse();
    ops
}
