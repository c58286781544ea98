use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A named category of subtask behavior ("orchestrator", "coder", ...).
/// Roles are configuration data, not code structure: the set of roles and
/// their permissions comes from the delegation table.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentRole(String);

impl AgentRole {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentRole {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Capability pair carried on a spawned task's initial instruction, so the
/// new role knows at the protocol level whether it may itself spawn
/// subtasks. Both flags derive from the new role's own table entry,
/// independent of how deep the delegation chain already is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationFlags {
    pub can_delegate: bool,
    pub task_tools_enabled: bool,
}

impl DelegationFlags {
    pub fn enabled() -> Self {
        Self {
            can_delegate: true,
            task_tools_enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            can_delegate: false,
            task_tools_enabled: false,
        }
    }
}

/// Static role → allowed-roles capability graph. Loaded once from
/// configuration and immutable thereafter.
///
/// Resolution rules:
/// - the root role may spawn every known role;
/// - a role present in the table gets exactly its listed set (empty = leaf);
/// - a role absent from the table gets a single-role set holding only the
///   most restricted fallback role.
///
/// Leaf roles have empty allowed-sets, so no delegation path can loop back
/// to re-enable a role that was already marked leaf.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DelegationPolicy {
    root_role: AgentRole,
    fallback_role: AgentRole,
    table: HashMap<AgentRole, Vec<AgentRole>>,
}

impl DelegationPolicy {
    pub fn new(
        root_role: AgentRole,
        fallback_role: AgentRole,
        table: HashMap<AgentRole, Vec<AgentRole>>,
    ) -> Self {
        Self {
            root_role,
            fallback_role,
            table,
        }
    }

    pub fn root_role(&self) -> &AgentRole {
        &self.root_role
    }

    /// Every role the table knows about, root included, sorted.
    pub fn known_roles(&self) -> Vec<AgentRole> {
        let mut roles: Vec<AgentRole> = self.table.keys().cloned().collect();
        roles.push(self.root_role.clone());
        roles.sort();
        roles.dedup();
        roles
    }

    /// The set of roles `role` may spawn.
    pub fn allowed_for(&self, role: &AgentRole) -> Vec<AgentRole> {
        if *role == self.root_role {
            return self.known_roles();
        }
        match self.table.get(role) {
            Some(allowed) => allowed.clone(),
            None => vec![self.fallback_role.clone()],
        }
    }

    pub fn permits(&self, role: &AgentRole, candidate: &AgentRole) -> bool {
        self.allowed_for(role).contains(candidate)
    }

    /// Capability flags for a role, from its own table entry only.
    pub fn flags_for(&self, role: &AgentRole) -> DelegationFlags {
        if self.allowed_for(role).is_empty() {
            DelegationFlags::disabled()
        } else {
            DelegationFlags::enabled()
        }
    }
}

impl Default for DelegationPolicy {
    fn default() -> Self {
        let table = HashMap::from([
            (
                AgentRole::new("coder"),
                vec![AgentRole::new("searcher")],
            ),
            (
                AgentRole::new("reviewer"),
                vec![AgentRole::new("searcher")],
            ),
            (AgentRole::new("searcher"), vec![]),
        ]);
        Self::new(
            AgentRole::new("orchestrator"),
            AgentRole::new("searcher"),
            table,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_may_spawn_every_known_role() {
        let policy = DelegationPolicy::default();
        let root = policy.root_role().clone();
        for role in policy.known_roles() {
            assert!(policy.permits(&root, &role), "root should spawn {role}");
        }
    }

    #[test]
    fn leaf_role_permits_nothing() {
        let policy = DelegationPolicy::default();
        let leaf = AgentRole::new("searcher");
        assert!(policy.allowed_for(&leaf).is_empty());
        for role in policy.known_roles() {
            assert!(!policy.permits(&leaf, &role));
        }
    }

    #[test]
    fn unknown_role_defaults_to_fallback_set() {
        let policy = DelegationPolicy::default();
        let unknown = AgentRole::new("made-up-role");
        assert_eq!(
            policy.allowed_for(&unknown),
            vec![AgentRole::new("searcher")]
        );
        assert!(policy.permits(&unknown, &AgentRole::new("searcher")));
        assert!(!policy.permits(&unknown, &AgentRole::new("coder")));
    }

    #[test]
    fn flags_follow_allowed_set() {
        let policy = DelegationPolicy::default();
        assert_eq!(
            policy.flags_for(policy.root_role()),
            DelegationFlags::enabled()
        );
        assert_eq!(
            policy.flags_for(&AgentRole::new("searcher")),
            DelegationFlags::disabled()
        );
        // Unknown roles may still spawn the fallback role.
        assert_eq!(
            policy.flags_for(&AgentRole::new("made-up-role")),
            DelegationFlags::enabled()
        );
    }

    #[test]
    fn flags_independent_of_chain_depth() {
        // root → coder → searcher: the flags at each hop come from the
        // role's own entry, not the parent's.
        let policy = DelegationPolicy::default();
        let coder = AgentRole::new("coder");
        let searcher = AgentRole::new("searcher");
        assert!(policy.permits(policy.root_role(), &coder));
        assert!(policy.permits(&coder, &searcher));
        assert_eq!(policy.flags_for(&coder), DelegationFlags::enabled());
        assert_eq!(policy.flags_for(&searcher), DelegationFlags::disabled());
    }

    #[test]
    fn known_roles_sorted_and_include_root() {
        let policy = DelegationPolicy::default();
        let roles = policy.known_roles();
        assert!(roles.contains(&AgentRole::new("orchestrator")));
        let mut sorted = roles.clone();
        sorted.sort();
        assert_eq!(roles, sorted);
    }

    #[test]
    fn policy_serde_roundtrip() {
        let policy = DelegationPolicy::default();
        let json = serde_json::to_string(&policy).unwrap();
        let parsed: DelegationPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.root_role(), policy.root_role());
        assert_eq!(parsed.known_roles(), policy.known_roles());
    }

    #[test]
    fn role_serde_is_transparent() {
        let role = AgentRole::new("coder");
        assert_eq!(serde_json::to_string(&role).unwrap(), "\"coder\"");
    }
}
