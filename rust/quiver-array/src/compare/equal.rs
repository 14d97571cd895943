//! Structural equality of arrays.
//!
//! Two arrays are equal when they have the same type, length and null
//! count, the same validity at every position, and equal values at every
//! valid position. Values hidden behind nulls are never compared. All
//! comparisons below work on [`ArrayData`] ranges, with positions relative
//! to each data's offset.

use bytemuck::AnyBitPattern;
use half::f16;
use quiver_bits::{SetBitRunIterator, bits_equal, count_set_bits, get_bit};
use quiver_format::{DataType, UnionMode};

use super::EqualOptions;
use crate::{
    array::{Array, find_physical_index, run_end_at},
    data::ArrayData,
    dictionary::value_bytes,
    offset::{OffsetSize, integer_value},
};

/// Whether `left` and `right` are equal, with exact float comparison.
pub fn array_equal(left: &dyn Array, right: &dyn Array) -> bool {
    data_equal(left.data(), right.data(), &EqualOptions::exact())
}

/// Whether `left` and `right` are equal, comparing floats with the
/// tolerance and NaN rule of `opts`.
pub fn array_approx_equal(left: &dyn Array, right: &dyn Array, opts: &EqualOptions) -> bool {
    data_equal(left.data(), right.data(), opts)
}

/// Whether `left[left_start..left_end]` equals `right[right_start..right_end]`.
///
/// # Panics
///
/// Panics when a range is inverted or out of bounds.
pub fn slice_equal(
    left: &dyn Array,
    left_start: usize,
    left_end: usize,
    right: &dyn Array,
    right_start: usize,
    right_end: usize,
) -> bool {
    data_equal(
        &left.data().slice(left_start, left_end),
        &right.data().slice(right_start, right_end),
        &EqualOptions::exact(),
    )
}

/// Approximate variant of [`slice_equal`].
pub fn slice_approx_equal(
    left: &dyn Array,
    left_start: usize,
    left_end: usize,
    right: &dyn Array,
    right_start: usize,
    right_end: usize,
    opts: &EqualOptions,
) -> bool {
    data_equal(
        &left.data().slice(left_start, left_end),
        &right.data().slice(right_start, right_end),
        opts,
    )
}

fn data_equal(left: &ArrayData, right: &ArrayData, opts: &EqualOptions) -> bool {
    left.data_type() == right.data_type()
        && left.len() == right.len()
        && left.null_count() == right.null_count()
        && Comparer::new(opts).range_equal(left, right, 0, 0, left.len())
}

impl PartialEq for dyn Array {
    fn eq(&self, other: &dyn Array) -> bool {
        array_equal(self, other)
    }
}

/// Range comparison of two data of the same type.
pub(crate) struct Comparer<'a> {
    opts: &'a EqualOptions,
}

impl<'a> Comparer<'a> {
    pub(crate) fn new(opts: &'a EqualOptions) -> Comparer<'a> {
        Comparer { opts }
    }

    /// Whether `left[ls..ls + len]` equals `right[rs..rs + len]`. Both data
    /// must have the same type.
    pub(crate) fn range_equal(
        &self,
        left: &ArrayData,
        right: &ArrayData,
        ls: usize,
        rs: usize,
        len: usize,
    ) -> bool {
        if len == 0 {
            return true;
        }
        if !nulls_equal(left, right, ls, rs, len) {
            return false;
        }
        let (lo, ro) = (left.offset() + ls, right.offset() + rs);
        match left.data_type().storage_type() {
            DataType::Null => true,
            DataType::Boolean => each_valid(left, ls, len, |i| {
                get_bit(left.buffer(1), lo + i) == get_bit(right.buffer(1), ro + i)
            }),
            DataType::Float16 => self.floats_equal::<f16>(left, right, ls, rs, len),
            DataType::Float32 => self.floats_equal::<f32>(left, right, ls, rs, len),
            DataType::Float64 => self.floats_equal::<f64>(left, right, ls, rs, len),
            DataType::Utf8
            | DataType::LargeUtf8
            | DataType::Binary
            | DataType::LargeBinary
            | DataType::Utf8View
            | DataType::BinaryView => each_valid(left, ls, len, |i| {
                value_bytes(left, ls + i) == value_bytes(right, rs + i)
            }),
            DataType::Map(..) if self.opts.unordered_map_keys() => {
                self.maps_equal_unordered(left, right, ls, rs, len)
            }
            DataType::List(_) | DataType::Map(..) => {
                self.lists_equal::<i32>(left, right, ls, rs, len)
            }
            DataType::LargeList(_) => self.lists_equal::<i64>(left, right, ls, rs, len),
            DataType::ListView(_) => self.list_views_equal::<i32>(left, right, ls, rs, len),
            DataType::LargeListView(_) => self.list_views_equal::<i64>(left, right, ls, rs, len),
            DataType::FixedSizeList(_, size) => {
                let size = *size as usize;
                valid_runs(left, ls, len).all(|(start, end)| {
                    self.range_equal(
                        left.child(0),
                        right.child(0),
                        (lo + start) * size,
                        (ro + start) * size,
                        (end - start) * size,
                    )
                })
            }
            DataType::Struct(fields) => valid_runs(left, ls, len).all(|(start, end)| {
                (0..fields.len()).all(|c| {
                    self.range_equal(
                        left.child(c),
                        right.child(c),
                        lo + start,
                        ro + start,
                        end - start,
                    )
                })
            }),
            DataType::Union(fields, mode) => {
                let child_ids = fields.child_ids();
                let (lcodes, rcodes) = (left.typed_buffer::<i8>(1), right.typed_buffer::<i8>(1));
                (0..len).all(|i| {
                    let code = lcodes[lo + i];
                    if code != rcodes[ro + i] {
                        return false;
                    }
                    let child = usize::try_from(child_ids[code as u8 as usize])
                        .unwrap_or_else(|_| panic!("type code {code} is not part of the union"));
                    let (lv, rv) = match mode {
                        UnionMode::Sparse => (lo + i, ro + i),
                        UnionMode::Dense => (
                            left.typed_buffer::<i32>(2)[lo + i] as usize,
                            right.typed_buffer::<i32>(2)[ro + i] as usize,
                        ),
                    };
                    self.range_equal(left.child(child), right.child(child), lv, rv, 1)
                })
            }
            DataType::Dictionary(index_type, ..) => {
                let (Some(ldict), Some(rdict)) = (left.dictionary(), right.dictionary()) else {
                    panic!("dictionary data without a dictionary");
                };
                let shared = ldict.ptr_eq(rdict);
                each_valid(left, ls, len, |i| {
                    let a = integer_value(index_type, left.buffer(1), lo + i);
                    let b = integer_value(index_type, right.buffer(1), ro + i);
                    (shared && a == b) || self.range_equal(ldict, rdict, a as usize, b as usize, 1)
                })
            }
            DataType::RunEndEncoded(..) => self.runs_equal(left, right, lo, ro, len),
            DataType::Extension(_) => unreachable!("storage types are never extensions"),
            other => {
                let width = other
                    .primitive_width()
                    .unwrap_or_else(|| panic!("cannot compare {other} values"));
                let (lb, rb) = (left.buffer(1), right.buffer(1));
                valid_runs(left, ls, len).all(|(start, end)| {
                    let n = (end - start) * width;
                    let (l0, r0) = ((lo + start) * width, (ro + start) * width);
                    lb[l0..l0 + n] == rb[r0..r0 + n]
                })
            }
        }
    }

    fn floats_equal<T: AnyBitPattern + Into<f64>>(
        &self,
        left: &ArrayData,
        right: &ArrayData,
        ls: usize,
        rs: usize,
        len: usize,
    ) -> bool {
        let lv = &left.typed_buffer::<T>(1)[left.offset() + ls..];
        let rv = &right.typed_buffer::<T>(1)[right.offset() + rs..];
        each_valid(left, ls, len, |i| self.opts.floats_equal(lv[i].into(), rv[i].into()))
    }

    fn lists_equal<O: OffsetSize>(
        &self,
        left: &ArrayData,
        right: &ArrayData,
        ls: usize,
        rs: usize,
        len: usize,
    ) -> bool {
        let lo = &left.typed_buffer::<O>(1)[left.offset() + ls..];
        let ro = &right.typed_buffer::<O>(1)[right.offset() + rs..];
        each_valid(left, ls, len, |i| {
            let (a, a_end) = (lo[i].as_usize(), lo[i + 1].as_usize());
            let (b, b_end) = (ro[i].as_usize(), ro[i + 1].as_usize());
            a_end - a == b_end - b
                && self.range_equal(left.child(0), right.child(0), a, b, a_end - a)
        })
    }

    fn list_views_equal<O: OffsetSize>(
        &self,
        left: &ArrayData,
        right: &ArrayData,
        ls: usize,
        rs: usize,
        len: usize,
    ) -> bool {
        let (lo, ro) = (left.offset() + ls, right.offset() + rs);
        let (loffsets, lsizes) = (left.typed_buffer::<O>(1), left.typed_buffer::<O>(2));
        let (roffsets, rsizes) = (right.typed_buffer::<O>(1), right.typed_buffer::<O>(2));
        each_valid(left, ls, len, |i| {
            let size = lsizes[lo + i].as_usize();
            size == rsizes[ro + i].as_usize()
                && self.range_equal(
                    left.child(0),
                    right.child(0),
                    loffsets[lo + i].as_usize(),
                    roffsets[ro + i].as_usize(),
                    size,
                )
        })
    }

    /// Map slots match when every left entry pairs with a distinct equal
    /// right entry, in any order.
    fn maps_equal_unordered(
        &self,
        left: &ArrayData,
        right: &ArrayData,
        ls: usize,
        rs: usize,
        len: usize,
    ) -> bool {
        let lo = &left.typed_buffer::<i32>(1)[left.offset() + ls..];
        let ro = &right.typed_buffer::<i32>(1)[right.offset() + rs..];
        let (lentries, rentries) = (left.child(0), right.child(0));
        each_valid(left, ls, len, |i| {
            let (a, a_end) = (lo[i] as usize, lo[i + 1] as usize);
            let (b, b_end) = (ro[i] as usize, ro[i + 1] as usize);
            if a_end - a != b_end - b {
                return false;
            }
            let mut used = vec![false; b_end - b];
            (a..a_end).all(|entry| {
                let matched = (0..used.len())
                    .find(|&k| !used[k] && self.range_equal(lentries, rentries, entry, b + k, 1));
                match matched {
                    Some(k) => {
                        used[k] = true;
                        true
                    }
                    None => false,
                }
            })
        })
    }

    /// Walks both run sequences in step, so arrays with different run
    /// boundaries compare by logical value.
    fn runs_equal(
        &self,
        left: &ArrayData,
        right: &ArrayData,
        mut lpos: usize,
        mut rpos: usize,
        len: usize,
    ) -> bool {
        let (lruns, rruns) = (left.child(0), right.child(0));
        let (mut lj, mut rj) = (find_physical_index(lruns, lpos), find_physical_index(rruns, rpos));
        let end = lpos + len;
        while lpos < end {
            if !self.range_equal(left.child(1), right.child(1), lj, rj, 1) {
                return false;
            }
            let (lrun_end, rrun_end) = (run_end_at(lruns, lj), run_end_at(rruns, rj));
            let step = (lrun_end - lpos).min(rrun_end - rpos).min(end - lpos);
            lpos += step;
            rpos += step;
            if lpos == lrun_end {
                lj += 1;
            }
            if rpos == rrun_end {
                rj += 1;
            }
        }
        true
    }
}

fn nulls_equal(left: &ArrayData, right: &ArrayData, ls: usize, rs: usize, len: usize) -> bool {
    let (lo, ro) = (left.offset() + ls, right.offset() + rs);
    match (left.validity(), right.validity()) {
        (None, None) => true,
        (Some(lv), None) => count_set_bits(lv.as_slice(), lo, len) == len,
        (None, Some(rv)) => count_set_bits(rv.as_slice(), ro, len) == len,
        (Some(lv), Some(rv)) => bits_equal(lv.as_slice(), lo, rv.as_slice(), ro, len),
    }
}

/// Runs `(start, end)` of valid slots of `data[start..start + len]`,
/// relative to `start`.
fn valid_runs(data: &ArrayData, start: usize, len: usize) -> SetBitRunIterator<'_> {
    SetBitRunIterator::new(
        data.validity().map(|v| v.as_slice()),
        data.offset() + start,
        len,
    )
}

fn each_valid(data: &ArrayData, start: usize, len: usize, mut f: impl FnMut(usize) -> bool) -> bool {
    valid_runs(data, start, len).all(|(s, e)| (s..e).all(&mut f))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quiver_bytes::Buffer;
    use quiver_format::Field;

    use super::*;
    use crate::{
        array::{
            ArrayRef, Float32Array, Float64Array, Int32Array, RunEndEncodedArray, StringArray,
            make_array,
        },
        builder::{DictionaryBuilder, make_builder},
    };

    fn from_text(data_type: &DataType, values: &[&str]) -> ArrayRef {
        let mut builder = make_builder(data_type);
        for v in values {
            builder.append_value_from_str(v).unwrap();
        }
        builder.finish()
    }

    #[test]
    fn test_nulls_hide_values() {
        let a = Int32Array::from_options(vec![Some(1), None, Some(3)]);
        let b = Int32Array::from_data(ArrayData::new(
            DataType::Int32,
            3,
            0,
            None,
            vec![
                Some(Buffer::copy_from_slice(&[0b101])),
                Some(Buffer::from_typed_slice(&[1i32, 99, 3])),
            ],
            vec![],
        ));
        assert!(array_equal(&a, &b));
        assert!(!array_equal(&a, &Int32Array::from_values(vec![1, 2, 3])));
        assert!(!array_equal(&a, &Int32Array::from_options(vec![Some(1), None])));
    }

    #[test]
    fn test_slices_and_types() {
        let a = StringArray::from(vec!["a", "b", "c", "b"]);
        assert!(slice_equal(&a, 1, 2, &a, 3, 4));
        assert!(!slice_equal(&a, 0, 2, &a, 2, 4));

        let ints: ArrayRef = Arc::new(Int32Array::from_values(vec![7, 8]));
        let dates = make_array(ints.to_data().with_data_type(DataType::Date32));
        assert!(*ints.slice(0, 0) != *dates.slice(0, 0));
        assert!(*ints.slice(1, 2) == *Int32Array::from_values(vec![8]).slice(0, 1));
    }

    #[test]
    fn test_approx_floats() {
        let a = Float64Array::from_values(vec![1.0, f64::NAN]);
        let b = Float64Array::from_values(vec![1.0 + 1e-7, f64::NAN]);
        assert!(!array_equal(&a, &b));
        assert!(!array_approx_equal(&a, &b, &EqualOptions::default()));
        let opts = EqualOptions::default()
            .with_abs_tolerance(1e-5)
            .with_nans_equal(true);
        assert!(array_approx_equal(&a, &b, &opts));

        let c = Float32Array::from_values(vec![0.5, 0.25]);
        let d = Float32Array::from_values(vec![0.5, 0.2500001]);
        assert!(array_approx_equal(&c, &d, &EqualOptions::default()));
        assert!(!slice_approx_equal(&c, 0, 2, &d, 0, 1, &EqualOptions::default()));
    }

    #[test]
    fn test_nested_values() {
        let list_type = DataType::list_of(DataType::Int32);
        let a = from_text(&list_type, &["[1,2]", "(null)", "[]"]);
        let b = from_text(&list_type, &["[0]", "[1,2]", "(null)", "[]"]);
        assert!(slice_equal(a.as_ref(), 0, 3, b.as_ref(), 1, 4));
        assert!(!array_equal(a.as_ref(), b.as_ref()));

        let struct_type = DataType::Struct(
            vec![Field::new("x", DataType::Int32, true), Field::new("y", DataType::Utf8, true)]
                .into(),
        );
        let s1 = from_text(&struct_type, &[r#"{"x":1,"y":"a"}"#, "(null)"]);
        let s2 = from_text(&struct_type, &[r#"{"x":1,"y":"a"}"#, r#"{"x":5}"#]);
        assert!(!array_equal(s1.as_ref(), s2.as_ref()));
        assert!(slice_equal(s1.as_ref(), 0, 1, s2.as_ref(), 0, 1));
    }

    #[test]
    fn test_unordered_map_keys() {
        let map_type = DataType::map_of(DataType::Utf8, DataType::Int32, false);
        let a = from_text(&map_type, &[r#"[{"key":"a","value":1},{"key":"b","value":2}]"#]);
        let b = from_text(&map_type, &[r#"[{"key":"b","value":2},{"key":"a","value":1}]"#]);
        assert!(!array_equal(a.as_ref(), b.as_ref()));
        let opts = EqualOptions::default().with_unordered_map_keys(true);
        assert!(array_approx_equal(a.as_ref(), b.as_ref(), &opts));

        let c = from_text(&map_type, &[r#"[{"key":"b","value":2},{"key":"a","value":3}]"#]);
        assert!(!array_approx_equal(a.as_ref(), c.as_ref(), &opts));
    }

    #[test]
    fn test_run_boundaries_do_not_matter() {
        let ree = |ends: Vec<i32>, values: Vec<Option<&str>>| {
            let run_ends: ArrayRef = Arc::new(Int32Array::from_values(ends));
            let values: ArrayRef = Arc::new(StringArray::from(values));
            RunEndEncodedArray::try_new(run_ends, values).unwrap()
        };
        let a = ree(vec![2, 4], vec![Some("x"), None]);
        let b = ree(vec![1, 2, 3, 4], vec![Some("x"), Some("x"), None, None]);
        assert!(array_equal(&a, &b));
        assert!(slice_equal(&a, 1, 3, &b, 1, 3));
        let c = ree(vec![3, 4], vec![Some("x"), None]);
        assert!(!array_equal(&a, &c));
    }

    #[test]
    fn test_dictionaries_compare_values() {
        let dict_type = DataType::dictionary_of(DataType::Int8, DataType::Utf8);
        let mut b1 = DictionaryBuilder::new(dict_type.clone());
        let mut b2 = DictionaryBuilder::new(dict_type);
        b2.append_str("z").unwrap();
        b2.finish();
        for v in ["p", "q"] {
            b1.append_str(v).unwrap();
            b2.append_str(v).unwrap();
        }
        let (a, b) = (b1.finish(), b2.finish());
        assert_ne!(a.value_index(0), b.value_index(0));
        assert!(array_equal(&a, &b));
    }
}
