//! Role-based collection visibility.
//!
//! A role is either a collection identifier (`Name-Version`, e.g. `S2_L2A-1`)
//! granting access to that internal collection, or the wildcard `*` granting
//! access to every collection.

use sea_query::{Expr, SimpleExpr};

use super::query::Collections;

/// Role granting unrestricted visibility.
pub const WILDCARD_ROLE: &str = "*";

/// Visibility predicate derived from the caller's roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Every collection is visible, public or not.
    Unrestricted,
    /// Public collections plus the listed collection identifiers.
    Restricted(Vec<String>),
}

impl AccessPolicy {
    /// Derive the policy from a caller's roles. No roles means public only.
    pub fn from_roles(roles: &[String]) -> Self {
        if roles.iter().any(|r| r == WILDCARD_ROLE) {
            AccessPolicy::Unrestricted
        } else {
            AccessPolicy::Restricted(roles.to_vec())
        }
    }

    /// Policy for anonymous callers.
    pub fn anonymous() -> Self {
        AccessPolicy::Restricted(Vec::new())
    }

    /// SQL predicate over the collections table, or `None` when unrestricted.
    pub fn condition(&self) -> Option<SimpleExpr> {
        let AccessPolicy::Restricted(roles) = self else {
            return None;
        };

        let public = Expr::col((Collections::Table, Collections::IsPublic)).eq(true);
        if roles.is_empty() {
            return Some(public);
        }

        Some(
            public.or(
                Expr::col((Collections::Table, Collections::Identifier)).is_in(roles.iter().cloned()),
            ),
        )
    }
}
