//! Minimal edit scripts between two arrays.
//!
//! [`diff`] runs Myers' O((N+M)D) search with the whole search history kept
//! in memory, so the script can be recovered by walking it backwards.

use std::{fmt::Write, ops::Deref};

use log::trace;
use quiver_common::{Result, error::Error};
use quiver_format::DataType;

use super::{EqualOptions, equal::Comparer};
use crate::{array::Array, data::ArrayData};

/// One step of an edit script.
///
/// Every edit except the first is a single insertion (of the next target
/// element) or deletion (of the next base element), followed by
/// `run_length` elements present in both arrays. The first edit is a pure
/// run and its `insert` flag is meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit {
    pub insert: bool,
    pub run_length: usize,
}

/// Edit script turning a base array into a target array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edits(Vec<Edit>);

impl Edits {
    pub fn into_vec(self) -> Vec<Edit> {
        self.0
    }

    /// Number of insertions and deletions in the script.
    pub fn edit_count(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// Renders the script as unified diff hunks: a `@@ -base, +target @@`
    /// header before each group of changes, then one `+` line per inserted
    /// target value and one `-` line per deleted base value.
    pub fn unified_diff(&self, base: &dyn Array, target: &dyn Array) -> String {
        let mut out = String::new();
        let (mut base_index, mut target_index) = (0, 0);
        let mut wrote_position = false;
        for (i, edit) in self.0.iter().enumerate() {
            if i > 0 {
                if !wrote_position {
                    let _ = writeln!(out, "@@ -{base_index}, +{target_index} @@");
                    wrote_position = true;
                }
                if edit.insert {
                    let _ = writeln!(out, "+{}", target.value_str(target_index));
                    target_index += 1;
                } else {
                    let _ = writeln!(out, "-{}", base.value_str(base_index));
                    base_index += 1;
                }
            }
            if edit.run_length > 0 {
                base_index += edit.run_length;
                target_index += edit.run_length;
                wrote_position = false;
            }
        }
        out
    }
}

impl Deref for Edits {
    type Target = [Edit];

    fn deref(&self) -> &[Edit] {
        &self.0
    }
}

/// Computes a minimal edit script from `base` to `target`.
///
/// Elements match when both are null or both are valid with exactly equal
/// values. Extension arrays are diffed through their storage.
///
/// # Errors
///
/// `TypeMismatch` when the arrays have different types, `NotImplemented`
/// for dictionary and run-end-encoded arrays.
pub fn diff(base: &dyn Array, target: &dyn Array) -> Result<Edits> {
    if base.data_type() != target.data_type() {
        return Err(Error::type_mismatch(
            "diff",
            base.data_type(),
            target.data_type(),
        ));
    }
    let storage = base.data_type().storage_type();
    match storage {
        DataType::Dictionary(..) | DataType::RunEndEncoded(..) => {
            return Err(Error::not_implemented(format!(
                "diffing {} arrays",
                base.data_type()
            )));
        }
        _ => {}
    }
    let opts = EqualOptions::exact();
    let search = Search {
        base: storage_data(base.data(), storage),
        target: storage_data(target.data(), storage),
        comparer: Comparer::new(&opts),
    };
    Ok(search.run())
}

fn storage_data(data: &ArrayData, storage: &DataType) -> ArrayData {
    if data.data_type() == storage {
        data.clone()
    } else {
        data.with_data_type(storage.clone())
    }
}

/// Furthest point reached with a given number of insertions, and whether
/// the last edit on the way there was an insertion.
#[derive(Debug, Clone, Copy)]
struct Endpoint {
    base: usize,
    target: usize,
    insert: bool,
}

struct Search<'a> {
    base: ArrayData,
    target: ArrayData,
    comparer: Comparer<'a>,
}

impl Search<'_> {
    fn run(&self) -> Edits {
        let (base_len, target_len) = (self.base.len(), self.target.len());
        let start = self.extend(Endpoint {
            base: 0,
            target: 0,
            insert: false,
        });
        // levels[d][k]: furthest endpoint after d edits, k of them insertions.
        let mut levels: Vec<Vec<Option<Endpoint>>> = vec![vec![Some(start)]];
        let mut finish = self.is_finished(&start).then_some(0);

        while finish.is_none() {
            let d = levels.len();
            let prev = &levels[d - 1];
            let mut level = Vec::with_capacity(d + 1);
            for k in 0..=d {
                let deletion = prev
                    .get(k)
                    .copied()
                    .flatten()
                    .filter(|p| p.base < base_len)
                    .map(|p| Endpoint {
                        base: p.base + 1,
                        target: p.target,
                        insert: false,
                    });
                let insertion = k
                    .checked_sub(1)
                    .and_then(|j| prev[j])
                    .filter(|p| p.target < target_len)
                    .map(|p| Endpoint {
                        base: p.base,
                        target: p.target + 1,
                        insert: true,
                    });
                let next = match (deletion, insertion) {
                    (Some(del), Some(ins)) if del.base > ins.base => Some(del),
                    (_, Some(ins)) => Some(ins),
                    (del, None) => del,
                };
                let next = next.map(|p| self.extend(p));
                if finish.is_none() && next.as_ref().is_some_and(|p| self.is_finished(p)) {
                    finish = Some(k);
                }
                level.push(next);
            }
            trace!(
                "diff: {d} edits reach base position {}",
                level.iter().flatten().map(|p| p.base).max().unwrap_or(0)
            );
            levels.push(level);
        }

        let k = finish.unwrap_or_default();
        let edits = reconstruct(&levels, k);
        trace!(
            "diff: {} base and {target_len} target elements differ by {} edits",
            base_len,
            edits.len() - 1
        );
        Edits(edits)
    }

    /// Follows the run of equal elements starting at `p`.
    fn extend(&self, mut p: Endpoint) -> Endpoint {
        while p.base < self.base.len()
            && p.target < self.target.len()
            && self
                .comparer
                .range_equal(&self.base, &self.target, p.base, p.target, 1)
        {
            p.base += 1;
            p.target += 1;
        }
        p
    }

    fn is_finished(&self, p: &Endpoint) -> bool {
        p.base == self.base.len() && p.target == self.target.len()
    }
}

/// Walks the search history back from `levels.last()[k]` to the start.
fn reconstruct(levels: &[Vec<Option<Endpoint>>], mut k: usize) -> Vec<Edit> {
    let endpoint = |d: usize, k: usize| {
        levels[d][k].unwrap_or_else(|| panic!("diff path has no endpoint at ({d}, {k})"))
    };
    let mut edits = Vec::with_capacity(levels.len());
    for d in (1..levels.len()).rev() {
        let here = endpoint(d, k);
        if here.insert {
            k -= 1;
        }
        let prev = endpoint(d - 1, k);
        let edited_base = if here.insert { prev.base } else { prev.base + 1 };
        edits.push(Edit {
            insert: here.insert,
            run_length: here.base - edited_base,
        });
    }
    edits.push(Edit {
        insert: false,
        run_length: endpoint(0, 0).base,
    });
    edits.reverse();
    edits
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quiver_common::error::ErrorKind;

    use super::*;
    use crate::{
        array::{ArrayRef, Int32Array, RunEndEncodedArray, StringArray},
        builder::DictionaryBuilder,
    };

    /// Rebuilds the target's text values from the base and the script.
    fn apply(edits: &Edits, base: &dyn Array, target: &dyn Array) -> Vec<String> {
        let mut out = Vec::new();
        let (mut b, mut t) = (0, 0);
        for (i, edit) in edits.iter().enumerate() {
            if i > 0 {
                if edit.insert {
                    out.push(target.value_str(t));
                    t += 1;
                } else {
                    b += 1;
                }
            }
            for _ in 0..edit.run_length {
                out.push(base.value_str(b));
                b += 1;
                t += 1;
            }
        }
        assert_eq!(b, base.len());
        assert_eq!(t, target.len());
        out
    }

    fn texts(array: &dyn Array) -> Vec<String> {
        (0..array.len()).map(|i| array.value_str(i)).collect()
    }

    #[test]
    fn test_minimal_script_reproduces_target() {
        let base = StringArray::from(vec!["h", "l", "l", "o", "o"]);
        let target = StringArray::from(vec!["h", "e", "l", "l", "o"]);
        let edits = diff(&base, &target).unwrap();
        assert_eq!(edits.edit_count(), 2);
        assert_eq!(edits[0], Edit { insert: false, run_length: 1 });
        assert_eq!(apply(&edits, &base, &target), texts(&target));
        assert_eq!(
            edits.unified_diff(&base, &target),
            "@@ -1, +1 @@\n+e\n@@ -4, +5 @@\n-o\n"
        );
    }

    #[test]
    fn test_equal_and_empty_inputs() {
        let a = Int32Array::from_values(vec![1, 2, 3]);
        let edits = diff(&a, &a).unwrap();
        assert_eq!(edits.into_vec(), vec![Edit { insert: false, run_length: 3 }]);

        let empty = Int32Array::from_values(Vec::<i32>::new());
        let edits = diff(&empty, &a).unwrap();
        assert_eq!(edits.edit_count(), 3);
        assert!(edits[1..].iter().all(|e| e.insert));
        assert_eq!(
            edits.unified_diff(&empty, &a),
            "@@ -0, +0 @@\n+1\n+2\n+3\n"
        );
    }

    #[test]
    fn test_nulls_match_only_nulls() {
        let base = Int32Array::from_options(vec![Some(1), None, Some(3)]);
        let target = Int32Array::from_options(vec![Some(1), Some(0), None, Some(3)]);
        let edits = diff(&base, &target).unwrap();
        assert_eq!(edits.edit_count(), 1);
        assert!(edits[1].insert);
        assert_eq!(apply(&edits, &base, &target), texts(&target));
    }

    #[test]
    fn test_type_errors() {
        let ints = Int32Array::from_values(vec![1]);
        let strings = StringArray::from(vec!["1"]);
        let err = diff(&ints, &strings).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TypeMismatch { .. }));

        let mut builder = DictionaryBuilder::new(DataType::dictionary_of(
            DataType::Int8,
            DataType::Utf8,
        ));
        builder.append_str("a").unwrap();
        let dict = builder.finish();
        let err = diff(&dict, &dict).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotImplemented { .. }));

        let run_ends: ArrayRef = Arc::new(Int32Array::from_values(vec![2]));
        let values: ArrayRef = Arc::new(StringArray::from(vec!["x"]));
        let ree = RunEndEncodedArray::try_new(run_ends, values).unwrap();
        let err = diff(&ree, &ree).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotImplemented { .. }));
    }
}
