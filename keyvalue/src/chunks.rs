use crate::error::{Error, Result};

/// Splits `items` into consecutive slices of at most `size` items.
///
/// A zero `size` is rejected rather than clamped.
pub fn chunks<T>(size: usize, items: &[T]) -> Result<std::slice::Chunks<'_, T>> {
    if size == 0 {
        return Err(Error::InvalidConfiguration(
            "chunk size must be positive".to_string(),
        ));
    }
    Ok(items.chunks(size))
}
