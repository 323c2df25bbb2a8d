use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are strings of the form `category:action` (e.g. `"edit:metadata"`).
/// Two wildcard forms exist on the granting side:
/// - `"*"` grants everything;
/// - `"category:*"` grants every action in that category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

/// Which rule of the grant law matched a requested permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantBasis {
    /// The holder has the universal wildcard `*`.
    Wildcard,
    /// The holder has exactly the requested permission.
    Exact,
    /// The holder has `category:*` for the requested permission's category.
    Category,
}

impl Permission {
    pub const WILDCARD: &'static str = "*";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == Self::WILDCARD
    }

    /// The substring before the first `:`, or the whole string if there is none.
    pub fn category(&self) -> &str {
        category_of(self.as_str())
    }

    /// `true` for `category:*` forms.
    pub fn is_category_wildcard(&self) -> bool {
        self.as_str()
            .split_once(':')
            .is_some_and(|(_, action)| action == "*")
    }

    /// Decide whether holding `self` grants `requested`, and by which rule.
    pub fn covers(&self, requested: &str) -> Option<GrantBasis> {
        if self.is_wildcard() {
            return Some(GrantBasis::Wildcard);
        }
        if self.as_str() == requested {
            return Some(GrantBasis::Exact);
        }
        if self.is_category_wildcard() && self.category() == category_of(requested) {
            return Some(GrantBasis::Category);
        }
        None
    }
}

/// Category part of a permission string.
pub fn category_of(permission: &str) -> &str {
    permission
        .split_once(':')
        .map(|(category, _)| category)
        .unwrap_or(permission)
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Permission {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
