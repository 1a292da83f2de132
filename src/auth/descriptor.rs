//! Authorization descriptor attached to routes.

use std::collections::BTreeSet;

/// A named set of roles permitted to invoke a route.
///
/// An empty set means "any authenticated user"; a non-empty set requires
/// the user's roles to intersect it.
#[derive(Debug, Clone, Default)]
pub struct Authorization {
    roles: BTreeSet<String>,
}

impl Authorization {
    /// Require authentication without restricting roles.
    pub fn any_user() -> Self {
        Self::default()
    }

    /// Require one of the given roles.
    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allowed_roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Whether a user holding `user_roles` may pass.
    pub fn permits(&self, user_roles: &BTreeSet<String>) -> bool {
        self.roles.is_empty() || self.roles.intersection(user_roles).next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roleset(roles: &[&str]) -> BTreeSet<String> {
        roles.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_any_user_permits_all_roles() {
        let auth = Authorization::any_user();
        assert!(auth.permits(&roleset(&[])));
        assert!(auth.permits(&roleset(&["whatever"])));
    }

    #[test]
    fn test_intersecting_roles_permitted() {
        let auth = Authorization::roles(["testrole", "superrole"]);
        assert!(auth.permits(&roleset(&["testrole"])));
        assert!(auth.permits(&roleset(&["superrole", "other"])));
    }

    #[test]
    fn test_disjoint_roles_denied() {
        let auth = Authorization::roles(["superrole"]);
        assert!(!auth.permits(&roleset(&["testrole"])));
        assert!(!auth.permits(&roleset(&[])));
    }
}
