use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::permissions::{GrantBasis, Permission};

/// Role identifier used for RBAC.
///
/// Identifiers are opaque strings: a session may reference a role the
/// registry does not know, in which case it resolves to no permissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(Cow<'static, str>);

impl RoleId {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RoleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for RoleId {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RoleId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A named bundle of permissions plus dashboard-access policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,
    pub display_name: Cow<'static, str>,
    pub permissions: Vec<Permission>,
    pub dashboard_access: bool,
    pub default_section: Option<Cow<'static, str>>,
}

impl Role {
    fn reference(
        id: &'static str,
        display_name: &'static str,
        permissions: &[&'static str],
        dashboard_access: bool,
        default_section: Option<&'static str>,
    ) -> Self {
        Self {
            id: RoleId::new(id),
            display_name: Cow::Borrowed(display_name),
            permissions: permissions.iter().copied().map(Permission::new).collect(),
            dashboard_access,
            default_section: default_section.map(Cow::Borrowed),
        }
    }

    /// Resolve `requested` against this role's permission set.
    ///
    /// Precedence: wildcard, then exact, then category wildcard.
    pub fn resolve(&self, requested: &str) -> Option<GrantBasis> {
        let mut best: Option<GrantBasis> = None;
        for held in &self.permissions {
            match held.covers(requested) {
                Some(GrantBasis::Wildcard) => return Some(GrantBasis::Wildcard),
                Some(GrantBasis::Exact) => best = Some(GrantBasis::Exact),
                Some(GrantBasis::Category) if best.is_none() => best = Some(GrantBasis::Category),
                _ => {}
            }
        }
        best
    }

    pub fn grants(&self, requested: &str) -> bool {
        self.resolve(requested).is_some()
    }
}

/// Immutable registry of the roles known to the application.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    roles: Vec<Role>,
}

impl RoleRegistry {
    /// Build a registry from explicit role definitions.
    ///
    /// Later definitions with a duplicate identifier are ignored.
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        let mut unique: Vec<Role> = Vec::new();
        for role in roles {
            if !unique.iter().any(|r| r.id == role.id) {
                unique.push(role);
            }
        }
        Self { roles: unique }
    }

    /// The six roles of the collection-management dashboard.
    pub fn reference() -> Self {
        Self::new([
            Role::reference("guest", "Guest", &["view:public", "read:catalog"], false, None),
            Role::reference(
                "researcher",
                "Researcher",
                &["view:public", "read:catalog", "download:metadata"],
                false,
                None,
            ),
            Role::reference(
                "curator",
                "Curator",
                &[
                    "view:public",
                    "read:catalog",
                    "write:artifacts",
                    "edit:metadata",
                    "generate:reports",
                    "view:dashboard",
                    "export:data",
                    "propose:deaccession",
                ],
                true,
                Some("overview"),
            ),
            Role::reference(
                "board",
                "Board Member",
                &[
                    "view:public",
                    "read:catalog",
                    "view:dashboard",
                    "view:reports",
                    "approve:deaccession",
                    "view:financial",
                    "export:reports",
                    "audit:readonly",
                ],
                true,
                Some("reports"),
            ),
            Role::reference(
                "auditor",
                "Auditor",
                &[
                    "view:public",
                    "read:catalog",
                    "view:dashboard",
                    "audit:full",
                    "export:reports",
                    "view:compliance",
                ],
                true,
                Some("compliance"),
            ),
            Role::reference("admin", "Administrator", &["*"], true, Some("overview")),
        ])
    }

    pub fn get(&self, id: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.id.as_str() == id)
    }

    /// Roles in definition order.
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.iter()
    }

    /// Grant law without a session: unknown roles grant nothing.
    pub fn role_grants(&self, role: &str, permission: &str) -> bool {
        self.get(role).is_some_and(|r| r.grants(permission))
    }

    pub fn dashboard_access(&self, role: &str) -> bool {
        self.get(role).is_some_and(|r| r.dashboard_access)
    }

    pub fn default_section(&self, role: &str) -> Option<&str> {
        self.get(role).and_then(|r| r.default_section.as_deref())
    }
}

impl Default for RoleRegistry {
    fn default() -> Self {
        Self::reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn permission_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z]{1,10}:[a-z_]{1,12}",
            "[a-z]{1,10}",
            Just("view:dashboard".to_string()),
            Just("audit:full".to_string()),
            Just("approve:deaccession".to_string()),
        ]
    }

    #[test]
    fn reference_configuration_is_reproduced() {
        let registry = RoleRegistry::reference();
        let ids: Vec<&str> = registry.roles().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["guest", "researcher", "curator", "board", "auditor", "admin"]);

        let curator = registry.get("curator").unwrap();
        assert_eq!(curator.permissions.len(), 8);
        assert!(curator.dashboard_access);
        assert_eq!(curator.default_section.as_deref(), Some("overview"));

        assert!(!registry.dashboard_access("guest"));
        assert!(!registry.dashboard_access("researcher"));
        assert_eq!(registry.default_section("board"), Some("reports"));
        assert_eq!(registry.default_section("auditor"), Some("compliance"));
        assert_eq!(registry.default_section("admin"), Some("overview"));
        assert_eq!(registry.default_section("guest"), None);
    }

    #[test]
    fn unknown_role_grants_nothing() {
        let registry = RoleRegistry::reference();
        assert!(registry.get("janitor").is_none());
        assert!(!registry.role_grants("janitor", "view:public"));
        assert!(!registry.dashboard_access("janitor"));
    }

    #[test]
    fn category_wildcard_role_grants_category() {
        let registry = RoleRegistry::new([Role {
            id: RoleId::new("reporter"),
            display_name: Cow::Borrowed("Reporter"),
            permissions: vec![Permission::new("view:*")],
            dashboard_access: false,
            default_section: None,
        }]);

        let role = registry.get("reporter").unwrap();
        assert_eq!(role.resolve("view:financial"), Some(GrantBasis::Category));
        assert_eq!(role.resolve("export:reports"), None);
    }

    #[test]
    fn duplicate_role_ids_keep_first_definition() {
        let first = Role::reference("x", "First", &["a:b"], false, None);
        let second = Role::reference("x", "Second", &["*"], true, None);
        let registry = RoleRegistry::new([first, second]);

        assert_eq!(registry.roles().count(), 1);
        assert_eq!(registry.get("x").unwrap().display_name, "First");
    }

    proptest! {
        /// Property: a role grants P iff it holds `*`, P, or `category(P):*`.
        #[test]
        fn grant_law_holds_for_reference_roles(permission in permission_strategy()) {
            let registry = RoleRegistry::reference();
            let category_wildcard = format!("{}:*", crate::permissions::category_of(&permission));

            for role in registry.roles() {
                let held: Vec<&str> = role.permissions.iter().map(|p| p.as_str()).collect();
                let expected = held.contains(&"*")
                    || held.contains(&permission.as_str())
                    || held.contains(&category_wildcard.as_str());
                prop_assert_eq!(role.grants(&permission), expected);
            }
        }

        /// Property: admin grants every permission string.
        #[test]
        fn admin_grants_everything(permission in ".*") {
            let registry = RoleRegistry::reference();
            prop_assert!(registry.role_grants("admin", &permission));
        }
    }
}
