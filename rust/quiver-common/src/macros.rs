/// Returns an `Overflow` error from the enclosing function when the checked
/// arithmetic expression yields `None`.
///
/// ```
/// # use quiver_common::{checked_or_overflow, Result};
/// fn add(a: i32, b: i32) -> Result<i32> {
///     Ok(checked_or_overflow!(a.checked_add(b), "add"))
/// }
/// assert!(add(i32::MAX, 1).is_err());
/// assert_eq!(add(1, 2).unwrap(), 3);
/// ```
#[macro_export]
macro_rules! checked_or_overflow {
    ($expr:expr, $context:expr) => {
        match $expr {
            Some(value) => value,
            None => return Err($crate::error::Error::overflow($context)),
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{Result, error::ErrorKind};

    fn checked(a: i64, b: i64) -> Result<i64> {
        Ok(checked_or_overflow!(a.checked_mul(b), "multiply"))
    }

    #[test]
    fn test_checked_or_overflow() {
        assert_eq!(checked(3, 4).unwrap(), 12);
        let err = checked(i64::MAX, 2).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Overflow { context } if context == "multiply"));
    }
}
