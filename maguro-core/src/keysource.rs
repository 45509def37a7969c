//! Key source abstractions for the maguro core runtime.

/// Abstraction over an ordered collection of 32-bit keys to build a table
/// from.
///
/// Keys are assumed unique; duplicates are not detected by the solver and
/// will surface as verifier collisions instead.
///
/// # Examples
/// ```
/// use maguro_core::KeySource;
///
/// struct Inline(Vec<u32>);
///
/// impl KeySource for Inline {
///     fn name(&self) -> &str { "inline" }
///     fn keys(&self) -> &[u32] { &self.0 }
/// }
///
/// let src = Inline(vec![3, 1, 4]);
/// assert_eq!(src.len(), 3);
/// assert!(!src.is_empty());
/// ```
pub trait KeySource {
    /// Returns a human-readable name for diagnostics.
    fn name(&self) -> &str;

    /// Returns the keys as a contiguous little-endian-ordered slice.
    fn keys(&self) -> &[u32];

    /// Returns the number of keys in the source.
    #[must_use]
    fn len(&self) -> usize {
        self.keys().len()
    }

    /// Returns whether the source contains no keys.
    #[must_use]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: KeySource + ?Sized> KeySource for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn keys(&self) -> &[u32] {
        (**self).keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::VecKeys;

    #[test]
    fn len_and_emptiness_follow_the_slice() {
        let empty = VecKeys::new("empty", Vec::new());
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);

        let keys = VecKeys::new("three", vec![1, 2, 3]);
        assert_eq!(keys.len(), 3);
        assert_eq!(keys.keys(), [1, 2, 3]);
    }
}
