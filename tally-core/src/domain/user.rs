//! User domain model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The owner of accounts, categories and transactions.
///
/// Names are unique; every read and write in the core is scoped to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_creation() {
        let user = User::new("alice");
        assert_eq!(user.name, "alice");
        assert_ne!(user.id, Uuid::nil());
    }
}
