use std::any::Any;

use quiver_common::{Result, error::Error, verify_arg};
use quiver_format::DataType;

use super::{Array, ArrayRef, make_array};
use crate::{
    data::ArrayData,
    marshal::MarshalValue,
    offset::{integer_value, is_run_end_type},
};

/// Run-end encoded array: logical slot `i` holds `values[j]` for the first
/// run `j` with `run_ends[j] > i`.
///
/// Both children stay unsliced; a slice only moves the parent's offset and
/// length, and [`physical_offset`](Self::physical_offset) locates the first
/// run it touches.
#[derive(Debug, Clone)]
pub struct RunEndEncodedArray {
    data: ArrayData,
    run_ends: ArrayRef,
    values: ArrayRef,
}

impl RunEndEncodedArray {
    pub fn from_data(data: ArrayData) -> RunEndEncodedArray {
        assert!(
            matches!(data.data_type().storage_type(), DataType::RunEndEncoded(..)),
            "{} data cannot be viewed as a run-end encoded array",
            data.data_type()
        );
        RunEndEncodedArray {
            run_ends: make_array(data.child(0).clone()),
            values: make_array(data.child(1).clone()),
            data,
        }
    }

    /// Builds an array whose logical length is the last run end.
    pub fn try_new(run_ends: ArrayRef, values: ArrayRef) -> Result<RunEndEncodedArray> {
        if !is_run_end_type(run_ends.data_type()) {
            return Err(Error::invalid_arg(
                "run_ends",
                format!("run ends must be int16, int32 or int64, got {}", run_ends.data_type()),
            ));
        }
        verify_arg!(values, values.len() == run_ends.len());
        let len = match run_ends.len() {
            0 => 0,
            n => {
                let last = integer_value(
                    run_ends.data_type(),
                    run_ends.data().buffer(1),
                    run_ends.offset() + n - 1,
                );
                usize::try_from(last).map_err(|_| {
                    Error::invalid_data("run_ends", format!("negative run end {last}"))
                })?
            }
        };
        let data_type =
            DataType::run_end_encoded_of(run_ends.data_type().clone(), values.data_type().clone());
        let data = ArrayData::builder(data_type)
            .len(len)
            .buffers(vec![None])
            .children(vec![run_ends.to_data(), values.to_data()])
            .build_validated()?;
        Ok(RunEndEncodedArray::from_data(data))
    }

    pub fn run_ends(&self) -> &ArrayRef {
        &self.run_ends
    }

    pub fn values(&self) -> &ArrayRef {
        &self.values
    }

    /// Run end of physical run `j`.
    #[inline]
    pub fn run_end(&self, j: usize) -> usize {
        run_end_at(self.data.child(0), j)
    }

    /// Index of the first run covering this array's logical range.
    pub fn physical_offset(&self) -> usize {
        find_physical_offset(&self.data)
    }

    /// Number of runs covering this array's logical range.
    pub fn physical_length(&self) -> usize {
        find_physical_length(&self.data)
    }

    /// Run holding logical slot `i`.
    pub fn physical_index(&self, i: usize) -> usize {
        assert!(i < self.len(), "index {i} out of bounds for length {}", self.len());
        find_physical_index(self.data.child(0), self.data.offset() + i)
    }
}

/// Run end `j` of a run-ends child, widened to `usize`.
pub(crate) fn run_end_at(run_ends: &ArrayData, j: usize) -> usize {
    integer_value(run_ends.data_type(), run_ends.buffer(1), run_ends.offset() + j) as usize
}

/// First run whose end lies past logical position `pos`.
pub(crate) fn find_physical_index(run_ends: &ArrayData, pos: usize) -> usize {
    let (mut lo, mut hi) = (0, run_ends.len());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if run_end_at(run_ends, mid) <= pos {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

pub(crate) fn find_physical_offset(data: &ArrayData) -> usize {
    find_physical_index(data.child(0), data.offset())
}

pub(crate) fn find_physical_length(data: &ArrayData) -> usize {
    if data.is_empty() {
        return 0;
    }
    let first = find_physical_offset(data);
    let last = find_physical_index(data.child(0), data.offset() + data.len() - 1);
    last - first + 1
}

impl Array for RunEndEncodedArray {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data(&self) -> &ArrayData {
        &self.data
    }

    fn value_text(&self, i: usize) -> String {
        self.values.value_str(self.physical_index(i))
    }

    fn marshal_value(&self, i: usize) -> MarshalValue {
        self.values.get_one_for_marshal(self.physical_index(i))
    }

    fn display_value(&self, i: usize) -> String {
        self.values.display_value(self.physical_index(i))
    }
}
