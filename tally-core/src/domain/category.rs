//! Category domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TransactionKind;

/// Separator between parent and child in a category path ("Food\Restaurants")
pub const PATH_SEPARATOR: char = '\\';

/// A user-defined category, at most two levels deep
///
/// Categories are scoped by kind: "Salary" as income and "Salary" as expense
/// are different categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub user_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub kind: TransactionKind,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(
        user_id: Uuid,
        name: impl Into<String>,
        kind: TransactionKind,
        parent_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            parent_id,
            name: name.into(),
            kind,
            created_at: Utc::now(),
        }
    }

    /// Split a category path into trimmed parent and optional child names.
    ///
    /// Only the first separator splits; empty segments are dropped, so
    /// `"Food\"` is just `"Food"` and `"\Snacks"` is just `"Snacks"`.
    /// Returns `None` when nothing is left.
    pub fn split_path(path: &str) -> Option<(&str, Option<&str>)> {
        let (first, second) = match path.split_once(PATH_SEPARATOR) {
            Some((parent, child)) => (parent.trim(), child.trim()),
            None => (path.trim(), ""),
        };
        match (first.is_empty(), second.is_empty()) {
            (true, true) => None,
            (false, true) => Some((first, None)),
            (true, false) => Some((second, None)),
            (false, false) => Some((first, Some(second))),
        }
    }

    /// Human-readable label: "Parent" or "Parent > Child"
    pub fn label(parent: &str, child: Option<&str>) -> String {
        match child {
            Some(child) => format!("{} > {}", parent, child),
            None => parent.to_string(),
        }
    }

    /// Path in import/export syntax: "Parent" or "Parent\Child"
    pub fn path(parent: &str, child: Option<&str>) -> String {
        match child {
            Some(child) => format!("{}{}{}", parent, PATH_SEPARATOR, child),
            None => parent.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path() {
        assert_eq!(Category::split_path("Food"), Some(("Food", None)));
        assert_eq!(
            Category::split_path(" Food \\ Restaurants "),
            Some(("Food", Some("Restaurants")))
        );
        assert_eq!(Category::split_path("Food\\"), Some(("Food", None)));
        assert_eq!(Category::split_path("\\Snacks"), Some(("Snacks", None)));
        assert_eq!(Category::split_path("  "), None);
    }

    #[test]
    fn test_split_only_on_first_separator() {
        assert_eq!(
            Category::split_path("A\\B\\C"),
            Some(("A", Some("B\\C")))
        );
    }

    #[test]
    fn test_label_and_path() {
        assert_eq!(Category::label("Food", Some("Restaurants")), "Food > Restaurants");
        assert_eq!(Category::label("Food", None), "Food");
        assert_eq!(Category::path("Food", Some("Restaurants")), "Food\\Restaurants");
    }
}
