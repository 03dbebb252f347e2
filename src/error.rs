use std::ops::{Range, RangeInclusive};

pub type Result<T> = std::result::Result<T, LineIndexError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineIndexError {
    /// An offset, length or line number fell outside of the valid range. Nothing was modified.
    OutOfRange {
        which: &'static str,
        given: usize,
        bound: Range<usize>,
    },
    /// The requested version was never created or has already been evicted from the cache.
    UnknownVersion {
        version: u64,
        retained: RangeInclusive<u64>,
    },
    InvalidVersionRange {
        old: u64,
        new: u64,
    },
}

impl LineIndexError {
    pub(crate) fn out_of_range(which: &'static str, given: usize, bound: Range<usize>) -> Self {
        LineIndexError::OutOfRange {
            which,
            given,
            bound,
        }
    }
}

impl std::fmt::Display for LineIndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use LineIndexError::*;
        match *self {
            OutOfRange {
                which,
                given,
                ref bound,
            } => {
                write!(f, "out of range: {which} given: {given}, bound: {bound:?}")
            }
            UnknownVersion {
                version,
                ref retained,
            } => {
                write!(f, "unknown version {version}, retained: {retained:?}")
            }
            InvalidVersionRange { old, new } => {
                write!(f, "invalid version range: {old} is newer than {new}")
            }
        }
    }
}

impl std::error::Error for LineIndexError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = LineIndexError::out_of_range("start", 12, 0..11);
        assert_eq!(err.to_string(), "out of range: start given: 12, bound: 0..11");

        let err = LineIndexError::UnknownVersion {
            version: 2,
            retained: 4..=9,
        };
        assert_eq!(err.to_string(), "unknown version 2, retained: 4..=9");
    }
}
