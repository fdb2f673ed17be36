//! Authenticated caller identity forwarded by the gateway.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Principal {
    user_id: i64,
}

impl Principal {
    pub fn new(user_id: i64) -> Result<Self, DomainError> {
        if user_id <= 0 {
            return Err(DomainError::validation("principal id must be positive"));
        }
        Ok(Self { user_id })
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }
}

impl FromStr for Principal {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let user_id = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| DomainError::validation("principal id must be an integer"))?;
        Self::new(user_id)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user:{}", self.user_id)
    }
}
