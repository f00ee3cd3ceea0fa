//! Who the cart currently belongs to.

use serde::{Deserialize, Serialize};

use super::UserId;

/// The current shopper, as far as the cart is concerned.
///
/// The auth provider is external; all the cart needs to know is whether
/// somebody is signed in and, if so, their stable user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum Identity {
    /// No user is signed in.
    #[default]
    Anonymous,
    /// A signed-in user.
    User(UserId),
}

impl Identity {
    /// Returns the user id, or `None` when anonymous.
    #[must_use]
    pub const fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Anonymous => None,
            Self::User(id) => Some(id),
        }
    }

    /// Returns `true` if no user is signed in.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

impl From<Option<UserId>> for Identity {
    fn from(user: Option<UserId>) -> Self {
        user.map_or(Self::Anonymous, Self::User)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::User(id) => write!(f, "user:{id}"),
        }
    }
}
