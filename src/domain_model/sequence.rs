use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;

/// Width of the zero-padded sequence part of a [`SequentialId`].
pub const SEQUENCE_WIDTH: usize = 8;

/// Date-scoped identifier, rendered as `YYYYMMDD` followed by the
/// zero-padded daily sequence, e.g. `2024010100000001`.
#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct SequentialId {
    pub day: NaiveDate,
    pub seq: u64,
}

impl SequentialId {
    pub fn new(day: NaiveDate, seq: u64) -> Self {
        Self { day, seq }
    }
}

/// `YYYYMMDD` form of a calendar day, shared by identifiers and counter keys.
pub fn day_stamp(day: NaiveDate) -> String {
    day.format("%Y%m%d").to_string()
}

impl fmt::Display for SequentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Padding only; sequences wider than the field are not truncated.
        write!(
            f,
            "{}{:0width$}",
            day_stamp(self.day),
            self.seq,
            width = SEQUENCE_WIDTH
        )
    }
}

impl Serialize for SequentialId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
