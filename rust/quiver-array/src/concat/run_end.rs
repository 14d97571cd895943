use quiver_common::{Result, error::Error};
use quiver_format::DataType;

use crate::{
    array::{find_physical_length, find_physical_offset, run_end_at},
    data::ArrayData,
    offset::{integer_buffer, integer_max},
};

/// Concatenates run-end encoded inputs. Only the runs covering each
/// input's logical range are kept; their ends are clipped to the range and
/// shifted by the logical length of the preceding inputs.
pub(super) fn concat_run_end_encoded(
    data_type: &DataType,
    inputs: &[ArrayData],
) -> Result<ArrayData> {
    let DataType::RunEndEncoded(run_ends_field, values_field) = data_type else {
        unreachable!("dispatched on run-end encoded types only");
    };
    let run_end_type = run_ends_field.data_type();
    let max = integer_max(run_end_type).ok_or_else(|| {
        Error::invalid_arg("data_type", format!("run ends must be integers, got {run_end_type}"))
    })?;

    let mut ends = Vec::new();
    let mut values = Vec::with_capacity(inputs.len());
    let mut total = 0usize;
    for data in inputs {
        if data.is_empty() {
            continue;
        }
        let first = find_physical_offset(data);
        let runs = find_physical_length(data);
        let logical_end = data.offset() + data.len();
        for j in first..first + runs {
            let end = run_end_at(data.child(0), j).min(logical_end) - data.offset() + total;
            if end as u64 > max {
                return Err(Error::overflow(format!(
                    "concatenated run end {end} exceeds {run_end_type}"
                )));
            }
            ends.push(end as i64);
        }
        values.push(data.child(1).slice(first, first + runs));
        total += data.len();
    }

    let run_ends = ArrayData::new(
        run_end_type.clone(),
        ends.len(),
        0,
        Some(0),
        vec![None, Some(integer_buffer(run_end_type, ends.into_iter()))],
        vec![],
    );
    let values = match values.is_empty() {
        true => ArrayData::new_empty(values_field.data_type()),
        false => super::concat_data(&values)?,
    };
    Ok(ArrayData::new(
        data_type.clone(),
        total,
        0,
        Some(0),
        vec![None],
        vec![run_ends, values],
    ))
}
