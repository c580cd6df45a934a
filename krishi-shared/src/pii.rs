use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps a farmer or vendor contact reference (usually a phone number) so that
/// `{:?}` and `{}` in tracing macros only ever print the last four characters.
/// Serialization is transparent: API responses and stored documents keep the real value.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

const VISIBLE_TAIL: usize = 4;

fn masked_tail(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    if chars.len() <= VISIBLE_TAIL {
        return "********".to_string();
    }
    let tail: String = chars[chars.len() - VISIBLE_TAIL..].iter().collect();
    format!("******{}", tail)
}

impl<T: fmt::Display> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", masked_tail(&self.0.to_string()))
    }
}

impl<T: fmt::Display> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", masked_tail(&self.0.to_string()))
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}
