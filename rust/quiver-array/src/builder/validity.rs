use quiver_bits::{BitmapBuilder, count_set_bits};
use quiver_bytes::Buffer;

/// Validity tracking shared by all builders.
///
/// Stays in an all-valid state, recording only a length, until the first
/// null is appended; then it materializes an LSB bitmap with every earlier
/// slot set.
#[derive(Debug, Default, Clone)]
pub struct ValidityBuilder {
    len: usize,
    null_count: usize,
    capacity: usize,
    bitmap: Option<BitmapBuilder>,
}

impl ValidityBuilder {
    pub fn new() -> ValidityBuilder {
        ValidityBuilder::default()
    }

    pub fn with_capacity(capacity: usize) -> ValidityBuilder {
        ValidityBuilder {
            capacity,
            ..Default::default()
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn null_count(&self) -> usize {
        self.null_count
    }

    pub fn capacity(&self) -> usize {
        self.capacity.max(self.len)
    }

    /// Whether slot `i` was appended as valid.
    pub fn is_valid(&self, i: usize) -> bool {
        assert!(i < self.len, "index {i} out of bounds for length {}", self.len);
        match &self.bitmap {
            Some(bitmap) => bitmap.get(i),
            None => true,
        }
    }

    pub fn reserve(&mut self, additional: usize) {
        self.capacity = self.capacity.max(self.len + additional);
        if let Some(bitmap) = &mut self.bitmap {
            bitmap.reserve(additional);
        }
    }

    #[inline]
    pub fn append(&mut self, valid: bool) {
        self.append_n(1, valid);
    }

    pub fn append_n(&mut self, n: usize, valid: bool) {
        if n == 0 {
            return;
        }
        if !valid {
            self.materialize();
            self.null_count += n;
        }
        if let Some(bitmap) = &mut self.bitmap {
            bitmap.append_n(n, valid);
        }
        self.len += n;
    }

    /// Appends `len` slots with the given validity. An empty `validity`
    /// marks all `len` slots valid.
    ///
    /// # Panics
    ///
    /// Panics when `validity` is neither empty nor `len` long.
    pub fn append_validity_slice(&mut self, len: usize, validity: &[bool]) {
        if validity.is_empty() {
            self.append_n(len, true);
            return;
        }
        assert_eq!(
            validity.len(),
            len,
            "validity slice length must match the number of values"
        );
        let nulls = validity.iter().filter(|v| !**v).count();
        if nulls == 0 {
            self.append_n(len, true);
            return;
        }
        self.materialize();
        if let Some(bitmap) = &mut self.bitmap {
            bitmap.append_slice(validity);
        }
        self.null_count += nulls;
        self.len += len;
    }

    /// Appends `len` slots copied from a packed bitmap starting at bit
    /// `offset`; `None` means all valid.
    pub fn append_packed(&mut self, validity: Option<&[u8]>, offset: usize, len: usize) {
        let Some(validity) = validity else {
            self.append_n(len, true);
            return;
        };
        let nulls = len - count_set_bits(validity, offset, len);
        if nulls == 0 {
            self.append_n(len, true);
            return;
        }
        self.materialize();
        if let Some(bitmap) = &mut self.bitmap {
            bitmap.append_packed_range(validity, offset, len);
        }
        self.null_count += nulls;
        self.len += len;
    }

    /// Drops slots past `len`.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        self.len = len;
        match &mut self.bitmap {
            Some(bitmap) => {
                bitmap.truncate(len);
                self.null_count = len - count_set_bits(bitmap.as_slice(), 0, len);
            }
            None => self.null_count = 0,
        }
    }

    /// Returns the bitmap (`None` when every slot is valid) and the null
    /// count, and resets the builder.
    pub fn finish(&mut self) -> (Option<Buffer>, usize) {
        let null_count = std::mem::take(&mut self.null_count);
        self.len = 0;
        self.capacity = 0;
        let bitmap = self.bitmap.take().map(|mut b| b.finish());
        match null_count {
            0 => (None, 0),
            n => (bitmap, n),
        }
    }

    fn materialize(&mut self) {
        if self.bitmap.is_some() {
            return;
        }
        log::debug!("materializing validity bitmap after {} valid slots", self.len);
        let mut bitmap = BitmapBuilder::with_capacity(self.capacity());
        bitmap.append_n(self.len, true);
        self.bitmap = Some(bitmap);
    }
}

#[cfg(test)]
mod tests {
    use quiver_bits::get_bit;

    use super::*;

    #[test]
    fn test_all_valid_has_no_bitmap() {
        let mut v = ValidityBuilder::new();
        v.append_n(100, true);
        v.append_validity_slice(5, &[]);
        assert_eq!(v.len(), 105);
        assert_eq!(v.finish(), (None, 0));
        assert!(v.is_empty());
    }

    #[test]
    fn test_first_null_materializes() {
        let mut v = ValidityBuilder::new();
        v.append_n(9, true);
        v.append(false);
        v.append_validity_slice(3, &[true, false, true]);
        assert_eq!(v.null_count(), 2);
        assert!(!v.is_valid(9));
        let (bitmap, nulls) = v.finish();
        let bitmap = bitmap.unwrap();
        assert_eq!(nulls, 2);
        assert!(get_bit(&bitmap, 8));
        assert!(!get_bit(&bitmap, 9));
        assert!(!get_bit(&bitmap, 11));
        assert!(get_bit(&bitmap, 12));
    }

    #[test]
    #[should_panic(expected = "validity slice length")]
    fn test_validity_length_mismatch() {
        ValidityBuilder::new().append_validity_slice(3, &[true]);
    }

    #[test]
    fn test_packed_and_truncate() {
        let mut v = ValidityBuilder::new();
        v.append_packed(Some(&[0b1111_0101]), 1, 4);
        assert_eq!(v.null_count(), 2);
        v.truncate(1);
        assert_eq!(v.null_count(), 1);
        v.truncate(0);
        assert_eq!(v.finish(), (None, 0));
    }
}
