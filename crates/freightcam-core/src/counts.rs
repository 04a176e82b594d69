use serde::{Deserialize, Serialize};
use std::fmt;

/// The two objects the counter knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    A,
    B,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::A, Label::B];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::A => "A",
            Label::B => "B",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the per-label totals, serialized as `{"a": .., "b": ..}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub a: u64,
    pub b: u64,
}

impl Counts {
    pub fn get(&self, label: Label) -> u64 {
        match label {
            Label::A => self.a,
            Label::B => self.b,
        }
    }
}
