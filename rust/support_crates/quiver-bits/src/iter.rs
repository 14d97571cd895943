use crate::bitmap::get_bit;

/// Iterates over the bits of `[offset, offset + len)` as booleans.
#[derive(Debug, Clone)]
pub struct BitIterator<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> BitIterator<'a> {
    pub fn new(data: &'a [u8], offset: usize, len: usize) -> BitIterator<'a> {
        assert!(
            (offset + len).div_ceil(8) <= data.len(),
            "bit range exceeds bitmap"
        );
        BitIterator {
            data,
            pos: offset,
            end: offset + len,
        }
    }
}

impl Iterator for BitIterator<'_> {
    type Item = bool;

    #[inline]
    fn next(&mut self) -> Option<bool> {
        if self.pos == self.end {
            return None;
        }
        let bit = get_bit(self.data, self.pos);
        self.pos += 1;
        Some(bit)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.pos;
        (n, Some(n))
    }
}

impl ExactSizeIterator for BitIterator<'_> {}

/// Yields the positions (relative to `offset`) of the set bits in
/// `[offset, offset + len)`. Zero bytes are skipped in one step.
#[derive(Debug, Clone)]
pub struct BitIndexIterator<'a> {
    data: &'a [u8],
    offset: usize,
    pos: usize,
    end: usize,
}

impl<'a> BitIndexIterator<'a> {
    pub fn new(data: &'a [u8], offset: usize, len: usize) -> BitIndexIterator<'a> {
        BitIndexIterator {
            data,
            offset,
            pos: offset,
            end: offset + len,
        }
    }
}

impl Iterator for BitIndexIterator<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.pos < self.end {
            if self.pos % 8 == 0 && self.pos + 8 <= self.end && self.data[self.pos / 8] == 0 {
                self.pos += 8;
                continue;
            }
            let i = self.pos;
            self.pos += 1;
            if get_bit(self.data, i) {
                return Some(i - self.offset);
            }
        }
        None
    }
}

/// Yields maximal runs `(start, end)` of set bits within `[offset, offset + len)`,
/// relative to `offset`.
#[derive(Debug, Clone)]
pub struct SetBitRunIterator<'a> {
    data: Option<&'a [u8]>,
    offset: usize,
    pos: usize,
    end: usize,
}

impl<'a> SetBitRunIterator<'a> {
    /// `None` for `data` stands for an all-set bitmap, yielding a single run.
    pub fn new(data: Option<&'a [u8]>, offset: usize, len: usize) -> SetBitRunIterator<'a> {
        SetBitRunIterator {
            data,
            offset,
            pos: offset,
            end: offset + len,
        }
    }

    fn bit(&self, i: usize) -> bool {
        match self.data {
            Some(data) => get_bit(data, i),
            None => true,
        }
    }
}

impl Iterator for SetBitRunIterator<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<(usize, usize)> {
        while self.pos < self.end && !self.bit(self.pos) {
            self.pos += 1;
        }
        if self.pos >= self.end {
            return None;
        }
        let start = self.pos;
        while self.pos < self.end && self.bit(self.pos) {
            self.pos += 1;
        }
        Some((start - self.offset, self.pos - self.offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_iterator() {
        let data = [0b0000_0101u8];
        let bits = BitIterator::new(&data, 0, 4).collect::<Vec<_>>();
        assert_eq!(bits, vec![true, false, true, false]);
        assert_eq!(BitIterator::new(&data, 1, 3).len(), 3);
    }

    #[test]
    fn test_bit_index_iterator() {
        let data = [0b0001_0010u8, 0, 0b1000_0000];
        let idx = BitIndexIterator::new(&data, 0, 24).collect::<Vec<_>>();
        assert_eq!(idx, vec![1, 4, 23]);
        let idx = BitIndexIterator::new(&data, 2, 20).collect::<Vec<_>>();
        assert_eq!(idx, vec![2]);
    }

    #[test]
    fn test_set_bit_runs() {
        let data = [0b1110_0111u8, 0b0000_0001];
        let runs = SetBitRunIterator::new(Some(&data), 0, 12).collect::<Vec<_>>();
        assert_eq!(runs, vec![(0, 3), (5, 9)]);
        let runs = SetBitRunIterator::new(Some(&data), 1, 5).collect::<Vec<_>>();
        assert_eq!(runs, vec![(0, 2), (4, 5)]);
        let runs = SetBitRunIterator::new(None, 3, 7).collect::<Vec<_>>();
        assert_eq!(runs, vec![(0, 7)]);
        assert_eq!(SetBitRunIterator::new(None, 0, 0).count(), 0);
    }
}
