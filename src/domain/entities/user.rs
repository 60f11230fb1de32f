use std::fmt;

/// Represents a chat user as seen by one adapter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    pub id: String,
    pub name: String,
    pub roles: Vec<String>,
    pub room: String,
    pub adapter_id: String,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        room: impl Into<String>,
        adapter_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            roles: Vec::new(),
            room: room.into(),
            adapter_id: adapter_id.into(),
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Case-insensitive role check against the roles loaded on this user
    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_check_ignores_case() {
        let user = User::new("1", "alice", "general", "console").with_roles(["Admin", "ops"]);
        assert!(user.is_in_role("admin"));
        assert!(user.is_in_role("OPS"));
        assert!(!user.is_in_role("dev"));
    }
}
