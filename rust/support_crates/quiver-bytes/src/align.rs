/// Aligns a number up to the next multiple of the specified alignment.
///
/// If the input is already aligned, it is returned unchanged.
///
/// # Examples
///
/// ```
/// use quiver_bytes::align::align_up;
///
/// assert_eq!(align_up(0, 8), 0);
/// assert_eq!(align_up(1, 8), 8);
/// assert_eq!(align_up(8, 8), 8);
/// assert_eq!(align_up(9, 64), 64);
/// ```
///
/// # Panics
///
/// Panics in debug builds if `alignment` is not a non-zero power of two.
#[inline]
pub fn align_up(n: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (n + alignment - 1) & !(alignment - 1)
}

/// Aligns a number down to the previous multiple of the specified alignment.
///
/// ```
/// use quiver_bytes::align::align_down;
///
/// assert_eq!(align_down(7, 8), 0);
/// assert_eq!(align_down(8, 8), 8);
/// assert_eq!(align_down(130, 64), 128);
/// ```
#[inline]
pub fn align_down(n: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    n & !(alignment - 1)
}

/// Checks whether `n` is a multiple of `alignment`.
#[inline]
pub fn is_aligned(n: usize, alignment: usize) -> bool {
    debug_assert!(alignment.is_power_of_two());
    n & (alignment - 1) == 0
}

/// Checks whether the pointer is aligned to `alignment` bytes.
#[inline]
pub fn is_ptr_aligned<T>(ptr: *const T, alignment: usize) -> bool {
    is_aligned(ptr as usize, alignment)
}

/// Returns the smallest power of two greater than or equal to `n`, or `None`
/// on overflow.
///
/// ```
/// use quiver_bytes::align::round_up_to_power_of_two;
///
/// assert_eq!(round_up_to_power_of_two(0), Some(1));
/// assert_eq!(round_up_to_power_of_two(5), Some(8));
/// assert_eq!(round_up_to_power_of_two(64), Some(64));
/// assert_eq!(round_up_to_power_of_two(usize::MAX), None);
/// ```
#[inline]
pub fn round_up_to_power_of_two(n: usize) -> Option<usize> {
    n.checked_next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_roundtrip() {
        for n in 0..300usize {
            let up = align_up(n, 64);
            let down = align_down(n, 64);
            assert!(is_aligned(up, 64));
            assert!(is_aligned(down, 64));
            assert!(down <= n && n <= up);
            assert!(up - down == 0 || up - down == 64);
        }
    }

    #[test]
    fn test_is_ptr_aligned() {
        let v = [0u64; 4];
        assert!(is_ptr_aligned(v.as_ptr(), 8));
    }
}
