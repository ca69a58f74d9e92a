use railtrace_auth::Role;
use railtrace_core::UserId;

/// Authenticated identity for a request, derived from the bearer token.
///
/// Immutable; present on all routes behind the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    user_id: UserId,
    username: String,
    role: Role,
}

impl AuthContext {
    pub fn new(user_id: UserId, username: String, role: Role) -> Self {
        Self {
            user_id,
            username,
            role,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> Role {
        self.role
    }
}
