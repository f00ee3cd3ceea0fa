//! Signed-in user context and the capabilities it grants.
//!
//! Authentication itself is handled by the hosted backend. Whatever signs the
//! user in hands over an [`AuthenticatedUser`] (or nothing), and
//! [`SessionContext::resolve`] turns that into the [`Identity`] the cart keys
//! on plus the [`Capabilities`] the rest of the storefront checks. Resolution
//! happens once per sign-in or sign-out, not on every render.

use serde::{Deserialize, Serialize};

use shahi_core::{Identity, UserId};

/// User handed over by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    /// Staff flag from the user's profile.
    #[serde(default)]
    pub is_admin: bool,
}

/// What the current user may do beyond shopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Create, edit and deactivate catalog products.
    pub manage_catalog: bool,
    /// See and update every customer's orders.
    pub manage_orders: bool,
}

impl Capabilities {
    /// Capabilities for a staff member.
    #[must_use]
    pub const fn staff() -> Self {
        Self {
            manage_catalog: true,
            manage_orders: true,
        }
    }
}

/// Resolved identity and capabilities for the current session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionContext {
    identity: Identity,
    email: Option<String>,
    capabilities: Capabilities,
}

impl SessionContext {
    /// Resolve the session for a signed-in user, or an anonymous session.
    #[must_use]
    pub fn resolve(user: Option<AuthenticatedUser>) -> Self {
        match user {
            None => Self::default(),
            Some(user) => Self {
                identity: Identity::User(user.id),
                email: user.email,
                capabilities: if user.is_admin {
                    Capabilities::staff()
                } else {
                    Capabilities::default()
                },
            },
        }
    }

    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}
