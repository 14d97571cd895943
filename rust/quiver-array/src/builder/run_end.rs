use std::any::Any;

use quiver_common::{Result, error::Error};
use quiver_format::DataType;

use super::{ArrayBuilder, BufferBuilder, make_builder};
use crate::{
    array::{NULL_VALUE_STR, RunEndEncodedArray},
    data::ArrayData,
    offset::{integer_buffer, integer_max},
};

/// What the last run was started from, so that equal consecutive inputs
/// extend it instead of opening a new run.
#[derive(Debug, Clone, PartialEq)]
enum LastRun {
    Other,
    Null,
    Text(String),
    Json(serde_json::Value),
}

/// Builder of run-end encoded arrays.
///
/// Runs are opened explicitly with [`append_run`](Self::append_run), after
/// which exactly one value must be appended to [`values`](Self::values).
/// Nulls, and repeated values appended through the text or JSON paths,
/// extend the current run.
#[derive(Debug)]
pub struct RunEndEncodedBuilder {
    data_type: DataType,
    run_end_type: DataType,
    run_end_max: u64,
    run_ends: BufferBuilder<i64>,
    values: Box<dyn ArrayBuilder>,
    len: usize,
    last: LastRun,
}

impl RunEndEncodedBuilder {
    /// # Panics
    ///
    /// Panics when `data_type` is not a run-end encoded type.
    pub fn new(data_type: DataType) -> RunEndEncodedBuilder {
        let DataType::RunEndEncoded(run_ends, values) = &data_type else {
            panic!("{data_type} is not a run-end encoded type");
        };
        let run_end_type = run_ends.data_type().clone();
        let run_end_max = integer_max(&run_end_type)
            .unwrap_or_else(|| panic!("run ends must be integers, got {run_end_type}"));
        RunEndEncodedBuilder {
            values: make_builder(values.data_type()),
            run_end_type,
            run_end_max,
            run_ends: BufferBuilder::new(),
            len: 0,
            last: LastRun::Other,
            data_type,
        }
    }

    /// Builder of the run values, one per run.
    pub fn values(&mut self) -> &mut dyn ArrayBuilder {
        self.values.as_mut()
    }

    /// Number of runs appended so far.
    pub fn num_runs(&self) -> usize {
        self.run_ends.len()
    }

    /// Opens a run of `len` slots. The caller appends its value to
    /// [`values`](Self::values).
    pub fn append_run(&mut self, len: usize) -> Result<()> {
        let end = self.checked_end(len)?;
        self.run_ends.append(end as i64);
        self.len = end;
        self.last = LastRun::Other;
        Ok(())
    }

    /// Extends the current run by `n` slots.
    ///
    /// # Panics
    ///
    /// Panics when no run has been opened.
    pub fn continue_run(&mut self, n: usize) -> Result<()> {
        assert!(!self.run_ends.is_empty(), "no run to continue");
        let end = self.checked_end(n)?;
        let last = self.run_ends.len() - 1;
        self.run_ends.as_slice_mut()[last] = end as i64;
        self.len = end;
        Ok(())
    }

    pub fn finish(&mut self) -> RunEndEncodedArray {
        RunEndEncodedArray::from_data(self.finish_data())
    }

    fn checked_end(&self, n: usize) -> Result<usize> {
        self.len
            .checked_add(n)
            .filter(|&end| end as u64 <= self.run_end_max)
            .ok_or_else(|| {
                Error::overflow(format!(
                    "run end {} + {n} exceeds {} run ends",
                    self.len, self.run_end_type
                ))
            })
    }

    fn append_null_run(&mut self, n: usize) -> Result<()> {
        if self.last == LastRun::Null {
            return self.continue_run(n);
        }
        self.append_run(n)?;
        self.values.append_null();
        self.last = LastRun::Null;
        Ok(())
    }
}

impl ArrayBuilder for RunEndEncodedBuilder {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.len
    }

    fn capacity(&self) -> usize {
        self.run_ends.capacity()
    }

    /// Always zero: run-end encoded arrays carry no validity of their own.
    fn null_count(&self) -> usize {
        0
    }

    fn append_null(&mut self) {
        self.append_nulls(1);
    }

    fn append_nulls(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        if let Err(e) = self.append_null_run(n) {
            panic!("{e}");
        }
    }

    fn append_empty_value(&mut self) {
        if let Err(e) = self.append_run(1) {
            panic!("{e}");
        }
        self.values.append_empty_value();
    }

    fn reserve(&mut self, additional: usize) {
        self.run_ends.reserve(additional);
        self.values.reserve(additional);
    }

    fn resize(&mut self, len: usize) {
        if len >= self.len {
            self.reserve(len - self.len);
            return;
        }
        let runs = self.run_ends.as_slice().partition_point(|&end| (end as usize) < len);
        if len == 0 {
            self.run_ends.truncate(0);
            self.values.resize(0);
        } else {
            self.run_ends.truncate(runs + 1);
            self.run_ends.as_slice_mut()[runs] = len as i64;
            self.values.resize(runs + 1);
        }
        self.len = len;
        self.last = LastRun::Other;
    }

    /// # Panics
    ///
    /// Panics when the values builder does not hold one value per run.
    fn finish_data(&mut self) -> ArrayData {
        let runs = self.run_ends.len();
        let values = self.values.finish_data();
        assert_eq!(
            values.len(),
            runs,
            "run-end encoded builder has {} values for {runs} runs",
            values.len()
        );
        let run_ends = ArrayData::new(
            self.run_end_type.clone(),
            runs,
            0,
            Some(0),
            vec![
                None,
                Some(integer_buffer(&self.run_end_type, self.run_ends.as_slice().iter().copied())),
            ],
            vec![],
        );
        let data = ArrayData::new(
            self.data_type.clone(),
            self.len,
            0,
            Some(0),
            vec![None],
            vec![run_ends, values],
        );
        self.run_ends.truncate(0);
        self.len = 0;
        self.last = LastRun::Other;
        data
    }

    fn append_value_from_str(&mut self, s: &str) -> Result<()> {
        if s == NULL_VALUE_STR {
            return self.append_null_run(1);
        }
        if matches!(&self.last, LastRun::Text(last) if last == s) {
            return self.continue_run(1);
        }
        self.checked_end(1)?;
        self.values.append_value_from_str(s)?;
        self.append_run(1)?;
        self.last = LastRun::Text(s.to_string());
        Ok(())
    }

    fn append_json(&mut self, value: &serde_json::Value) -> Result<()> {
        if value.is_null() {
            return self.append_null_run(1);
        }
        if matches!(&self.last, LastRun::Json(last) if last == value) {
            return self.continue_run(1);
        }
        self.checked_end(1)?;
        self.values.append_json(value)?;
        self.append_run(1)?;
        self.last = LastRun::Json(value.clone());
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use quiver_common::error::ErrorKind;

    use super::*;
    use crate::{
        array::{Array, Int16Array},
        builder::{StringBuilder, downcast_builder_mut},
    };

    fn string_runs(run_ends: DataType) -> RunEndEncodedBuilder {
        RunEndEncodedBuilder::new(DataType::run_end_encoded_of(run_ends, DataType::Utf8))
    }

    #[test]
    fn test_explicit_runs() {
        let mut b = string_runs(DataType::Int32);
        b.append_run(2).unwrap();
        downcast_builder_mut::<StringBuilder>(b.values()).append_value("a");
        b.continue_run(1).unwrap();
        b.append_nulls(2);
        b.append_null();
        b.append_run(1).unwrap();
        downcast_builder_mut::<StringBuilder>(b.values()).append_value("b");
        assert_eq!((b.len(), b.num_runs()), (7, 3));

        let array = b.finish();
        assert_eq!(array.run_ends().to_string(), "[3 6 7]");
        assert_eq!(
            (&array as &dyn Array).to_string(),
            r#"["a" "a" "a" (null) (null) (null) "b"]"#
        );
        array.to_data().validate_full().unwrap();
        assert!(b.is_empty());
    }

    #[test]
    fn test_repeated_text_extends_run() {
        let mut b = string_runs(DataType::Int16);
        for s in ["x", "x", "(null)", "(null)", "x", "y"] {
            b.append_value_from_str(s).unwrap();
        }
        b.append_json(&serde_json::json!("y")).unwrap();
        let array = b.finish();
        let run_ends = array.run_ends().as_any().downcast_ref::<Int16Array>().unwrap();
        assert_eq!(run_ends.values(), &[2, 4, 5, 6, 7]);
        assert_eq!(array.values().len(), 5);
    }

    #[test]
    fn test_run_end_overflow() {
        let mut b = string_runs(DataType::Int16);
        b.append_run(i16::MAX as usize).unwrap();
        downcast_builder_mut::<StringBuilder>(b.values()).append_value("z");
        let err = b.continue_run(1).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Overflow { .. }));
        assert!(b.append_value_from_str("w").is_err());
        assert_eq!(b.values().len(), 1);
    }

    #[test]
    fn test_resize_cuts_inside_run() {
        let mut b = string_runs(DataType::Int64);
        for s in ["a", "a", "b", "b", "b"] {
            b.append_value_from_str(s).unwrap();
        }
        b.resize(3);
        let array = b.finish();
        assert_eq!(array.run_ends().to_string(), "[2 3]");
        assert_eq!(array.len(), 3);
    }

    #[test]
    #[should_panic(expected = "has 0 values for 1 runs")]
    fn test_missing_run_value_panics() {
        let mut b = string_runs(DataType::Int32);
        b.append_run(4).unwrap();
        b.finish_data();
    }
}
