use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::error::{AppError, AppResult};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database id, rejecting negative values
            pub fn new(value: i64) -> AppResult<Self> {
                if value < 0 {
                    return Err(AppError::InvalidInput(format!(
                        "{} must be non-negative, got {}",
                        $label, value
                    )));
                }
                Ok(Self(value))
            }

            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Identity of a registered user
    UserId,
    "user id"
);
numeric_id!(
    /// Identity of a spot row
    SpotId,
    "spot id"
);
numeric_id!(
    /// Identity of a post row
    PostId,
    "post id"
);
