use serde::{Deserialize, Serialize};

/// An entity paired with the storage revision it was read at.
///
/// The revision is owned by the backend; callers pass it back on write so a
/// concurrent update is detected as a conflict rather than overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub value: T,
    pub revision: u64,
}

impl<T> Versioned<T> {
    pub fn new(value: T, revision: u64) -> Self {
        Self { value, revision }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Versioned<U> {
        Versioned {
            value: f(self.value),
            revision: self.revision,
        }
    }
}
