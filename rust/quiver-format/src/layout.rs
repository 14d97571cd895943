//! Physical buffer layouts of logical types.

use crate::datatype::{DataType, UnionMode};

/// Meaning of one buffer slot in an array's buffer list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Validity bitmap; may be absent when the array has no nulls.
    Validity,
    /// Slot that is always absent (null type, unions, run-end encoded).
    AlwaysNull,
    /// Bit-packed values.
    Bitmap,
    /// Fixed-width values of the given byte width.
    FixedWidth(usize),
    /// `len + 1` offsets of the given byte width.
    Offsets(usize),
    /// Variable-length value bytes addressed by the preceding offsets.
    Values,
    /// List-view sizes of the given byte width.
    Sizes(usize),
    /// 16-byte string/binary view headers.
    Views,
    /// 8-bit union type codes.
    TypeIds,
}

/// Fixed buffer layout of a logical type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTypeLayout {
    pub buffers: Vec<BufferKind>,
    /// Additional data buffers may follow the fixed ones (view types).
    pub variadic: bool,
}

impl DataTypeLayout {
    fn fixed(buffers: Vec<BufferKind>) -> DataTypeLayout {
        DataTypeLayout {
            buffers,
            variadic: false,
        }
    }

    /// Whether `count` buffers is a legal buffer count for this layout.
    pub fn accepts_buffer_count(&self, count: usize) -> bool {
        if self.variadic {
            count >= self.buffers.len()
        } else {
            count == self.buffers.len()
        }
    }
}

impl DataType {
    /// Buffer layout of arrays of this type.
    pub fn layout(&self) -> DataTypeLayout {
        use BufferKind::*;
        match self {
            DataType::Null | DataType::RunEndEncoded(..) => {
                DataTypeLayout::fixed(vec![AlwaysNull])
            }
            DataType::Boolean => DataTypeLayout::fixed(vec![Validity, Bitmap]),
            DataType::Utf8 | DataType::Binary => {
                DataTypeLayout::fixed(vec![Validity, Offsets(4), Values])
            }
            DataType::LargeUtf8 | DataType::LargeBinary => {
                DataTypeLayout::fixed(vec![Validity, Offsets(8), Values])
            }
            DataType::Utf8View | DataType::BinaryView => DataTypeLayout {
                buffers: vec![Validity, Views],
                variadic: true,
            },
            DataType::List(_) | DataType::Map(..) => {
                DataTypeLayout::fixed(vec![Validity, Offsets(4)])
            }
            DataType::LargeList(_) => DataTypeLayout::fixed(vec![Validity, Offsets(8)]),
            DataType::ListView(_) => {
                DataTypeLayout::fixed(vec![Validity, FixedWidth(4), Sizes(4)])
            }
            DataType::LargeListView(_) => {
                DataTypeLayout::fixed(vec![Validity, FixedWidth(8), Sizes(8)])
            }
            DataType::FixedSizeList(..) | DataType::Struct(_) => {
                DataTypeLayout::fixed(vec![Validity])
            }
            DataType::Union(_, UnionMode::Sparse) => {
                DataTypeLayout::fixed(vec![AlwaysNull, TypeIds])
            }
            DataType::Union(_, UnionMode::Dense) => {
                DataTypeLayout::fixed(vec![AlwaysNull, TypeIds, FixedWidth(4)])
            }
            DataType::Dictionary(index, ..) => DataTypeLayout::fixed(vec![
                Validity,
                FixedWidth(index.primitive_width().unwrap_or(0)),
            ]),
            DataType::Extension(ext) => ext.storage_type().layout(),
            other => {
                let width = other.primitive_width().unwrap_or(0);
                DataTypeLayout::fixed(vec![Validity, FixedWidth(width)])
            }
        }
    }

    /// Whether arrays of this type can carry a validity bitmap.
    pub fn has_validity_bitmap(&self) -> bool {
        self.layout().buffers.first() == Some(&BufferKind::Validity)
    }

    /// Number of child arrays an array of this type has.
    pub fn num_children(&self) -> usize {
        match self {
            DataType::List(_)
            | DataType::LargeList(_)
            | DataType::ListView(_)
            | DataType::LargeListView(_)
            | DataType::FixedSizeList(..)
            | DataType::Map(..) => 1,
            DataType::Struct(fields) => fields.len(),
            DataType::Union(fields, _) => fields.len(),
            DataType::RunEndEncoded(..) => 2,
            DataType::Extension(ext) => ext.storage_type().num_children(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{field::UnionFields, Field};

    #[test]
    fn test_layout_buffer_counts() {
        assert_eq!(DataType::Int32.layout().buffers.len(), 2);
        assert_eq!(
            DataType::Utf8.layout().buffers,
            vec![BufferKind::Validity, BufferKind::Offsets(4), BufferKind::Values]
        );
        assert_eq!(DataType::list_of(DataType::Int8).layout().buffers.len(), 2);
        assert_eq!(
            DataType::list_view_of(DataType::Int8).layout().buffers.len(),
            3
        );
        let s = DataType::Struct(vec![Field::new("a", DataType::Int8, true)].into());
        assert_eq!(s.layout().buffers, vec![BufferKind::Validity]);
        assert_eq!(s.num_children(), 1);
        let u = DataType::Union(
            UnionFields::from_fields(vec![Field::new("a", DataType::Int8, true)]),
            UnionMode::Dense,
        );
        assert_eq!(u.layout().buffers.len(), 3);
        assert!(!u.has_validity_bitmap());
    }

    #[test]
    fn test_variadic_layout() {
        let layout = DataType::Utf8View.layout();
        assert!(layout.accepts_buffer_count(2));
        assert!(layout.accepts_buffer_count(5));
        assert!(!layout.accepts_buffer_count(1));
        assert!(!DataType::Int8.layout().accepts_buffer_count(3));
    }

    #[test]
    fn test_dictionary_layout_uses_index_width() {
        let d = DataType::dictionary_of(DataType::Int16, DataType::Utf8);
        assert_eq!(
            d.layout().buffers,
            vec![BufferKind::Validity, BufferKind::FixedWidth(2)]
        );
    }
}
