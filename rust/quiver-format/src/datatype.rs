use std::{fmt, sync::Arc};

use serde::Serialize;

use crate::{
    extension::ExtensionRef,
    field::{Field, FieldRef, Fields, UnionFields},
};

/// Resolution of time-based types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TimeUnit {
    Second,
    Millisecond,
    Microsecond,
    Nanosecond,
}

impl TimeUnit {
    /// Number of units per second.
    pub fn multiplier(self) -> i64 {
        match self {
            TimeUnit::Second => 1,
            TimeUnit::Millisecond => 1_000,
            TimeUnit::Microsecond => 1_000_000,
            TimeUnit::Nanosecond => 1_000_000_000,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Second => "s",
            TimeUnit::Millisecond => "ms",
            TimeUnit::Microsecond => "us",
            TimeUnit::Nanosecond => "ns",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IntervalUnit {
    /// Number of elapsed whole months, as `i32`.
    YearMonth,
    /// Days and milliseconds, as [`IntervalDayTime`](crate::IntervalDayTime).
    DayTime,
    /// Months, days and nanoseconds, as [`IntervalMonthDayNano`](crate::IntervalMonthDayNano).
    MonthDayNano,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnionMode {
    /// Every child has the same length as the union.
    Sparse,
    /// Children are compact; a per-slot offset locates the value.
    Dense,
}

/// Compact discriminant of [`DataType`], without parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TypeId {
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    Float32,
    Float64,
    Utf8,
    LargeUtf8,
    Utf8View,
    Binary,
    LargeBinary,
    BinaryView,
    FixedSizeBinary,
    Date32,
    Date64,
    Time32,
    Time64,
    Timestamp,
    Duration,
    Interval,
    Decimal32,
    Decimal64,
    Decimal128,
    Decimal256,
    List,
    LargeList,
    ListView,
    LargeListView,
    FixedSizeList,
    Struct,
    Map,
    Union,
    Dictionary,
    RunEndEncoded,
    Extension,
}

/// Logical type of an array.
///
/// Equality is structural: nested fields, units, timezones, union codes and
/// dictionary parameters all take part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    Float32,
    Float64,
    Utf8,
    LargeUtf8,
    Utf8View,
    Binary,
    LargeBinary,
    BinaryView,
    /// Binary values of the given byte width.
    FixedSizeBinary(i32),
    /// Days since the UNIX epoch, as `i32`.
    Date32,
    /// Milliseconds since the UNIX epoch, as `i64`.
    Date64,
    /// Time of day in seconds or milliseconds, as `i32`.
    Time32(TimeUnit),
    /// Time of day in microseconds or nanoseconds, as `i64`.
    Time64(TimeUnit),
    /// Instant since the UNIX epoch with an optional timezone name.
    Timestamp(TimeUnit, Option<Arc<str>>),
    Duration(TimeUnit),
    Interval(IntervalUnit),
    /// Decimal with `(precision, scale)`, stored as `i32`.
    Decimal32(u8, i8),
    Decimal64(u8, i8),
    Decimal128(u8, i8),
    Decimal256(u8, i8),
    List(FieldRef),
    LargeList(FieldRef),
    ListView(FieldRef),
    LargeListView(FieldRef),
    FixedSizeList(FieldRef, i32),
    Struct(Fields),
    /// Entries field (a non-nullable struct of key and value) and whether the
    /// keys within each map are sorted.
    Map(FieldRef, bool),
    Union(UnionFields, UnionMode),
    /// Index type, value type and whether the dictionary is ordered.
    Dictionary(Box<DataType>, Box<DataType>, bool),
    /// Run-ends field (int16/32/64) and values field.
    RunEndEncoded(FieldRef, FieldRef),
    Extension(ExtensionRef),
}

impl DataType {
    pub fn type_id(&self) -> TypeId {
        match self {
            DataType::Null => TypeId::Null,
            DataType::Boolean => TypeId::Boolean,
            DataType::Int8 => TypeId::Int8,
            DataType::Int16 => TypeId::Int16,
            DataType::Int32 => TypeId::Int32,
            DataType::Int64 => TypeId::Int64,
            DataType::UInt8 => TypeId::UInt8,
            DataType::UInt16 => TypeId::UInt16,
            DataType::UInt32 => TypeId::UInt32,
            DataType::UInt64 => TypeId::UInt64,
            DataType::Float16 => TypeId::Float16,
            DataType::Float32 => TypeId::Float32,
            DataType::Float64 => TypeId::Float64,
            DataType::Utf8 => TypeId::Utf8,
            DataType::LargeUtf8 => TypeId::LargeUtf8,
            DataType::Utf8View => TypeId::Utf8View,
            DataType::Binary => TypeId::Binary,
            DataType::LargeBinary => TypeId::LargeBinary,
            DataType::BinaryView => TypeId::BinaryView,
            DataType::FixedSizeBinary(_) => TypeId::FixedSizeBinary,
            DataType::Date32 => TypeId::Date32,
            DataType::Date64 => TypeId::Date64,
            DataType::Time32(_) => TypeId::Time32,
            DataType::Time64(_) => TypeId::Time64,
            DataType::Timestamp(..) => TypeId::Timestamp,
            DataType::Duration(_) => TypeId::Duration,
            DataType::Interval(_) => TypeId::Interval,
            DataType::Decimal32(..) => TypeId::Decimal32,
            DataType::Decimal64(..) => TypeId::Decimal64,
            DataType::Decimal128(..) => TypeId::Decimal128,
            DataType::Decimal256(..) => TypeId::Decimal256,
            DataType::List(_) => TypeId::List,
            DataType::LargeList(_) => TypeId::LargeList,
            DataType::ListView(_) => TypeId::ListView,
            DataType::LargeListView(_) => TypeId::LargeListView,
            DataType::FixedSizeList(..) => TypeId::FixedSizeList,
            DataType::Struct(_) => TypeId::Struct,
            DataType::Map(..) => TypeId::Map,
            DataType::Union(..) => TypeId::Union,
            DataType::Dictionary(..) => TypeId::Dictionary,
            DataType::RunEndEncoded(..) => TypeId::RunEndEncoded,
            DataType::Extension(_) => TypeId::Extension,
        }
    }

    /// `list<item: T, nullable>`.
    pub fn list_of(data_type: DataType) -> DataType {
        DataType::List(Arc::new(Field::list_item(data_type)))
    }

    pub fn large_list_of(data_type: DataType) -> DataType {
        DataType::LargeList(Arc::new(Field::list_item(data_type)))
    }

    pub fn list_view_of(data_type: DataType) -> DataType {
        DataType::ListView(Arc::new(Field::list_item(data_type)))
    }

    pub fn large_list_view_of(data_type: DataType) -> DataType {
        DataType::LargeListView(Arc::new(Field::list_item(data_type)))
    }

    pub fn fixed_size_list_of(data_type: DataType, size: i32) -> DataType {
        DataType::FixedSizeList(Arc::new(Field::list_item(data_type)), size)
    }

    /// `map<K, V>` with the conventional `entries`, `key` and `value` names.
    pub fn map_of(key: DataType, value: DataType, keys_sorted: bool) -> DataType {
        let entries = Field::new(
            "entries",
            DataType::Struct(Fields::from(vec![
                Field::new("key", key, false),
                Field::new("value", value, true),
            ])),
            false,
        );
        DataType::Map(Arc::new(entries), keys_sorted)
    }

    pub fn dictionary_of(index: DataType, value: DataType) -> DataType {
        DataType::Dictionary(Box::new(index), Box::new(value), false)
    }

    pub fn run_end_encoded_of(run_ends: DataType, values: DataType) -> DataType {
        DataType::RunEndEncoded(
            Arc::new(Field::new("run_ends", run_ends, false)),
            Arc::new(Field::new("values", values, true)),
        )
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_signed_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    pub fn is_unsigned_integer(&self) -> bool {
        matches!(
            self,
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64
        )
    }

    pub fn is_floating(&self) -> bool {
        matches!(
            self,
            DataType::Float16 | DataType::Float32 | DataType::Float64
        )
    }

    pub fn is_decimal(&self) -> bool {
        matches!(
            self,
            DataType::Decimal32(..)
                | DataType::Decimal64(..)
                | DataType::Decimal128(..)
                | DataType::Decimal256(..)
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            DataType::Date32
                | DataType::Date64
                | DataType::Time32(_)
                | DataType::Time64(_)
                | DataType::Timestamp(..)
                | DataType::Duration(_)
                | DataType::Interval(_)
        )
    }

    /// Whether values are stored as offsets into a contiguous byte buffer.
    pub fn is_binary_like(&self) -> bool {
        matches!(
            self,
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Binary | DataType::LargeBinary
        )
    }

    pub fn is_view(&self) -> bool {
        matches!(self, DataType::Utf8View | DataType::BinaryView)
    }

    pub fn is_nested(&self) -> bool {
        matches!(
            self,
            DataType::List(_)
                | DataType::LargeList(_)
                | DataType::ListView(_)
                | DataType::LargeListView(_)
                | DataType::FixedSizeList(..)
                | DataType::Struct(_)
                | DataType::Map(..)
                | DataType::Union(..)
                | DataType::RunEndEncoded(..)
        )
    }

    /// Byte width of one value for fixed-width types, `None` otherwise.
    ///
    /// Booleans are bit-packed and report `None`.
    pub fn primitive_width(&self) -> Option<usize> {
        Some(match self {
            DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 | DataType::UInt16 | DataType::Float16 => 2,
            DataType::Int32
            | DataType::UInt32
            | DataType::Float32
            | DataType::Date32
            | DataType::Time32(_)
            | DataType::Decimal32(..)
            | DataType::Interval(IntervalUnit::YearMonth) => 4,
            DataType::Int64
            | DataType::UInt64
            | DataType::Float64
            | DataType::Date64
            | DataType::Time64(_)
            | DataType::Timestamp(..)
            | DataType::Duration(_)
            | DataType::Decimal64(..)
            | DataType::Interval(IntervalUnit::DayTime) => 8,
            DataType::Decimal128(..) | DataType::Interval(IntervalUnit::MonthDayNano) => 16,
            DataType::Decimal256(..) => 32,
            DataType::FixedSizeBinary(w) => *w as usize,
            _ => return None,
        })
    }

    /// The storage type for extension types, `self` otherwise.
    pub fn storage_type(&self) -> &DataType {
        match self {
            DataType::Extension(ext) => ext.storage_type().storage_type(),
            other => other,
        }
    }

    /// Decimal precision and scale.
    pub fn decimal_params(&self) -> Option<(u8, i8)> {
        match self {
            DataType::Decimal32(p, s)
            | DataType::Decimal64(p, s)
            | DataType::Decimal128(p, s)
            | DataType::Decimal256(p, s) => Some((*p, *s)),
            _ => None,
        }
    }

    /// Element field of list-like and map types.
    pub fn list_field(&self) -> Option<&FieldRef> {
        match self {
            DataType::List(f)
            | DataType::LargeList(f)
            | DataType::ListView(f)
            | DataType::LargeListView(f)
            | DataType::FixedSizeList(f, _)
            | DataType::Map(f, _) => Some(f),
            _ => None,
        }
    }

    /// Fields of the child arrays, in child order. Extension types report
    /// the children of their storage type.
    pub fn child_fields(&self) -> Vec<FieldRef> {
        match self {
            DataType::List(f)
            | DataType::LargeList(f)
            | DataType::ListView(f)
            | DataType::LargeListView(f)
            | DataType::FixedSizeList(f, _)
            | DataType::Map(f, _) => vec![f.clone()],
            DataType::Struct(fields) => fields.iter().cloned().collect(),
            DataType::Union(fields, _) => fields.fields().iter().cloned().collect(),
            DataType::RunEndEncoded(run_ends, values) => vec![run_ends.clone(), values.clone()],
            DataType::Extension(ext) => ext.storage_type().child_fields(),
            _ => Vec::new(),
        }
    }

    /// Index and value types of a dictionary type.
    pub fn dictionary_types(&self) -> Option<(&DataType, &DataType)> {
        match self {
            DataType::Dictionary(index, value, _) => Some((index, value)),
            _ => None,
        }
    }

    /// Type name without parameters, as used in error messages.
    pub fn name(&self) -> &'static str {
        match self.type_id() {
            TypeId::Null => "null",
            TypeId::Boolean => "bool",
            TypeId::Int8 => "int8",
            TypeId::Int16 => "int16",
            TypeId::Int32 => "int32",
            TypeId::Int64 => "int64",
            TypeId::UInt8 => "uint8",
            TypeId::UInt16 => "uint16",
            TypeId::UInt32 => "uint32",
            TypeId::UInt64 => "uint64",
            TypeId::Float16 => "float16",
            TypeId::Float32 => "float32",
            TypeId::Float64 => "float64",
            TypeId::Utf8 => "utf8",
            TypeId::LargeUtf8 => "large_utf8",
            TypeId::Utf8View => "string_view",
            TypeId::Binary => "binary",
            TypeId::LargeBinary => "large_binary",
            TypeId::BinaryView => "binary_view",
            TypeId::FixedSizeBinary => "fixed_size_binary",
            TypeId::Date32 => "date32",
            TypeId::Date64 => "date64",
            TypeId::Time32 => "time32",
            TypeId::Time64 => "time64",
            TypeId::Timestamp => "timestamp",
            TypeId::Duration => "duration",
            TypeId::Interval => "interval",
            TypeId::Decimal32 => "decimal32",
            TypeId::Decimal64 => "decimal64",
            TypeId::Decimal128 => "decimal128",
            TypeId::Decimal256 => "decimal256",
            TypeId::List => "list",
            TypeId::LargeList => "large_list",
            TypeId::ListView => "list_view",
            TypeId::LargeListView => "large_list_view",
            TypeId::FixedSizeList => "fixed_size_list",
            TypeId::Struct => "struct",
            TypeId::Map => "map",
            TypeId::Union => "union",
            TypeId::Dictionary => "dictionary",
            TypeId::RunEndEncoded => "run_end_encoded",
            TypeId::Extension => "extension",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::FixedSizeBinary(w) => write!(f, "fixed_size_binary[{w}]"),
            DataType::Time32(u) | DataType::Time64(u) | DataType::Duration(u) => {
                write!(f, "{}[{u}]", self.name())
            }
            DataType::Timestamp(u, None) => write!(f, "timestamp[{u}]"),
            DataType::Timestamp(u, Some(tz)) => write!(f, "timestamp[{u}, tz={tz}]"),
            DataType::Interval(IntervalUnit::YearMonth) => f.write_str("month_interval"),
            DataType::Interval(IntervalUnit::DayTime) => f.write_str("day_time_interval"),
            DataType::Interval(IntervalUnit::MonthDayNano) => {
                f.write_str("month_day_nano_interval")
            }
            DataType::Decimal32(p, s)
            | DataType::Decimal64(p, s)
            | DataType::Decimal128(p, s)
            | DataType::Decimal256(p, s) => write!(f, "{}({p}, {s})", self.name()),
            DataType::List(item)
            | DataType::LargeList(item)
            | DataType::ListView(item)
            | DataType::LargeListView(item) => write!(f, "{}<{item}>", self.name()),
            DataType::FixedSizeList(item, n) => write!(f, "fixed_size_list<{item}>[{n}]"),
            DataType::Struct(fields) => {
                f.write_str("struct<")?;
                write_fields(f, fields.iter().map(|f| f.as_ref()))?;
                f.write_str(">")
            }
            DataType::Map(entries, sorted) => {
                let (key, value) = match entries.data_type() {
                    DataType::Struct(kv) if kv.len() == 2 => {
                        (kv[0].data_type().clone(), kv[1].data_type().clone())
                    }
                    other => (other.clone(), DataType::Null),
                };
                write!(f, "map<{key}, {value}")?;
                if *sorted {
                    f.write_str(", keys_sorted")?;
                }
                f.write_str(">")
            }
            DataType::Union(fields, mode) => {
                let mode = match mode {
                    UnionMode::Sparse => "sparse",
                    UnionMode::Dense => "dense",
                };
                write!(f, "{mode}_union<")?;
                for (i, (code, field)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{field}={code}")?;
                }
                f.write_str(">")
            }
            DataType::Dictionary(index, value, ordered) => write!(
                f,
                "dictionary<values={value}, indices={index}, ordered={ordered}>"
            ),
            DataType::RunEndEncoded(run_ends, values) => write!(
                f,
                "run_end_encoded<run_ends: {}, values: {}>",
                run_ends.data_type(),
                values.data_type()
            ),
            DataType::Extension(ext) => write!(f, "extension<{}>", ext.name()),
            other => f.write_str(other.name()),
        }
    }
}

fn write_fields<'a>(
    f: &mut fmt::Formatter<'_>,
    fields: impl Iterator<Item = &'a Field>,
) -> fmt::Result {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{field}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(DataType::Int32.to_string(), "int32");
        assert_eq!(
            DataType::list_of(DataType::Utf8).to_string(),
            "list<item: utf8, nullable>"
        );
        assert_eq!(
            DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())).to_string(),
            "timestamp[ms, tz=UTC]"
        );
        assert_eq!(DataType::Decimal128(10, 2).to_string(), "decimal128(10, 2)");
        assert_eq!(
            DataType::dictionary_of(DataType::Int16, DataType::Utf8).to_string(),
            "dictionary<values=utf8, indices=int16, ordered=false>"
        );
        assert_eq!(
            DataType::map_of(DataType::Utf8, DataType::Int64, false).to_string(),
            "map<utf8, int64>"
        );
        assert_eq!(
            DataType::run_end_encoded_of(DataType::Int32, DataType::Float64).to_string(),
            "run_end_encoded<run_ends: int32, values: float64>"
        );
    }

    #[test]
    fn test_structural_equality() {
        let a = DataType::Struct(Fields::from(vec![Field::new("a", DataType::Int32, true)]));
        let b = DataType::Struct(Fields::from(vec![Field::new("a", DataType::Int32, true)]));
        let c = DataType::Struct(Fields::from(vec![Field::new("b", DataType::Int32, true)]));
        let d = DataType::Struct(Fields::from(vec![Field::new("a", DataType::Int32, false)]));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_ne!(
            DataType::Timestamp(TimeUnit::Second, None),
            DataType::Timestamp(TimeUnit::Second, Some("UTC".into()))
        );
        assert_ne!(
            DataType::dictionary_of(DataType::Int8, DataType::Utf8),
            DataType::dictionary_of(DataType::Int16, DataType::Utf8)
        );
    }

    #[test]
    fn test_primitive_width() {
        assert_eq!(DataType::Int16.primitive_width(), Some(2));
        assert_eq!(DataType::Decimal256(40, 0).primitive_width(), Some(32));
        assert_eq!(
            DataType::Interval(IntervalUnit::MonthDayNano).primitive_width(),
            Some(16)
        );
        assert_eq!(DataType::FixedSizeBinary(7).primitive_width(), Some(7));
        assert_eq!(DataType::Boolean.primitive_width(), None);
        assert_eq!(DataType::Utf8.primitive_width(), None);
    }

    #[test]
    fn test_predicates() {
        assert!(DataType::UInt8.is_integer());
        assert!(!DataType::UInt8.is_signed_integer());
        assert!(DataType::Float16.is_floating());
        assert!(DataType::list_view_of(DataType::Int8).is_nested());
        assert!(DataType::LargeBinary.is_binary_like());
        assert!(DataType::Utf8View.is_view());
        assert_eq!(DataType::Utf8View.type_id(), TypeId::Utf8View);
    }

    #[test]
    fn test_child_fields() {
        let ree = DataType::run_end_encoded_of(DataType::Int32, DataType::Utf8);
        let names: Vec<_> = ree.child_fields().iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, vec!["run_ends", "values"]);
        assert_eq!(DataType::list_of(DataType::Int8).child_fields().len(), 1);
        assert!(DataType::Utf8.child_fields().is_empty());
    }
}
