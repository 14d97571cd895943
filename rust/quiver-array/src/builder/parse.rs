//! Text parsing of fixed-width scalar values.

use base64::Engine;
use half::f16;
use quiver_common::{Result, error::Error};
use quiver_format::{
    DataType, IntervalDayTime, IntervalMonthDayNano, IntervalUnit,
    decimal::parse_decimal,
    temporal::{parse_date32, parse_date64, parse_duration, parse_time, parse_timestamp},
};
use serde::Deserialize;

fn parse_err(s: &str, data_type: &DataType, msg: impl ToString) -> Error {
    Error::parse(s, data_type, msg.to_string())
}

fn parse_int<T: std::str::FromStr<Err = std::num::ParseIntError>>(
    s: &str,
    data_type: &DataType,
) -> Result<T> {
    s.trim().parse::<T>().map_err(|e| parse_err(s, data_type, e))
}

fn parse_float(s: &str, data_type: &DataType) -> Result<f64> {
    s.trim().parse::<f64>().map_err(|e| parse_err(s, data_type, e))
}

fn narrow<T: TryFrom<i64>>(v: i64, s: &str, data_type: &DataType) -> Result<T> {
    T::try_from(v).map_err(|_| parse_err(s, data_type, "out of range"))
}

#[derive(Deserialize)]
struct MonthsJson {
    months: i32,
}

#[derive(Deserialize)]
struct DayTimeJson {
    days: i32,
    milliseconds: i32,
}

#[derive(Deserialize)]
struct MonthDayNanoJson {
    months: i32,
    days: i32,
    nanoseconds: i64,
}

fn parse_json<'a, T: Deserialize<'a>>(s: &'a str, data_type: &DataType) -> Result<T> {
    serde_json::from_str(s).map_err(|e| parse_err(s, data_type, e))
}

/// Parses the text form of one value of a fixed-width type into its
/// little-endian bytes.
pub(crate) fn parse_fixed_width(data_type: &DataType, s: &str) -> Result<Vec<u8>> {
    let bytes = match data_type.storage_type() {
        DataType::Int8 => parse_int::<i8>(s, data_type)?.to_le_bytes().to_vec(),
        DataType::Int16 => parse_int::<i16>(s, data_type)?.to_le_bytes().to_vec(),
        DataType::Int32 => parse_int::<i32>(s, data_type)?.to_le_bytes().to_vec(),
        DataType::Int64 => parse_int::<i64>(s, data_type)?.to_le_bytes().to_vec(),
        DataType::UInt8 => parse_int::<u8>(s, data_type)?.to_le_bytes().to_vec(),
        DataType::UInt16 => parse_int::<u16>(s, data_type)?.to_le_bytes().to_vec(),
        DataType::UInt32 => parse_int::<u32>(s, data_type)?.to_le_bytes().to_vec(),
        DataType::UInt64 => parse_int::<u64>(s, data_type)?.to_le_bytes().to_vec(),
        DataType::Float16 => f16::from_f64(parse_float(s, data_type)?).to_le_bytes().to_vec(),
        DataType::Float32 => (parse_float(s, data_type)? as f32).to_le_bytes().to_vec(),
        DataType::Float64 => parse_float(s, data_type)?.to_le_bytes().to_vec(),
        DataType::Date32 => parse_date32(s)?.to_le_bytes().to_vec(),
        DataType::Date64 => parse_date64(s)?.to_le_bytes().to_vec(),
        DataType::Time32(unit) => {
            let v = parse_time(s, *unit, data_type)?;
            narrow::<i32>(v, s, data_type)?.to_le_bytes().to_vec()
        }
        DataType::Time64(unit) => parse_time(s, *unit, data_type)?.to_le_bytes().to_vec(),
        DataType::Timestamp(unit, _) => {
            parse_timestamp(s, *unit, data_type)?.to_le_bytes().to_vec()
        }
        DataType::Duration(unit) => parse_duration(s, *unit, data_type)?.to_le_bytes().to_vec(),
        DataType::Interval(IntervalUnit::YearMonth) => {
            let months = match s.trim().parse::<i32>() {
                Ok(v) => v,
                Err(_) => parse_json::<MonthsJson>(s, data_type)?.months,
            };
            months.to_le_bytes().to_vec()
        }
        DataType::Interval(IntervalUnit::DayTime) => {
            let v = parse_json::<DayTimeJson>(s, data_type)?;
            bytemuck::bytes_of(&IntervalDayTime::new(v.days, v.milliseconds)).to_vec()
        }
        DataType::Interval(IntervalUnit::MonthDayNano) => {
            let v = parse_json::<MonthDayNanoJson>(s, data_type)?;
            bytemuck::bytes_of(&IntervalMonthDayNano::new(v.months, v.days, v.nanoseconds))
                .to_vec()
        }
        DataType::Decimal32(precision, scale) => {
            let v = decimal_i128(s, *precision, *scale, data_type)?;
            i32::try_from(v)
                .map_err(|_| parse_err(s, data_type, "out of range"))?
                .to_le_bytes()
                .to_vec()
        }
        DataType::Decimal64(precision, scale) => {
            let v = decimal_i128(s, *precision, *scale, data_type)?;
            i64::try_from(v)
                .map_err(|_| parse_err(s, data_type, "out of range"))?
                .to_le_bytes()
                .to_vec()
        }
        DataType::Decimal128(precision, scale) => {
            decimal_i128(s, *precision, *scale, data_type)?.to_le_bytes().to_vec()
        }
        DataType::Decimal256(precision, scale) => {
            bytemuck::bytes_of(&parse_decimal(s, *precision, *scale)?).to_vec()
        }
        DataType::FixedSizeBinary(_) => decode_base64(s, data_type)?,
        other => {
            return Err(Error::not_implemented(format!(
                "parsing {other} values from text"
            )));
        }
    };
    Ok(bytes)
}

fn decimal_i128(s: &str, precision: u8, scale: i8, data_type: &DataType) -> Result<i128> {
    parse_decimal(s, precision, scale)?
        .to_i128()
        .ok_or_else(|| parse_err(s, data_type, "out of range"))
}

/// Decodes standard base64, the text form of binary values.
pub(crate) fn decode_base64(s: &str, data_type: &DataType) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| parse_err(s, data_type, e))
}

/// Parses boolean text: `true`/`false` in any of the usual spellings and
/// `1`/`0`.
pub(crate) fn parse_bool(s: &str) -> Result<bool> {
    match s.trim() {
        "1" | "t" | "T" | "true" | "True" | "TRUE" => Ok(true),
        "0" | "f" | "F" | "false" | "False" | "FALSE" => Ok(false),
        _ => Err(parse_err(s, &DataType::Boolean, "invalid boolean")),
    }
}
