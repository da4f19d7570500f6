//! Well-known collection names

use std::fmt;

/// Blob metadata
pub const BLOBS: &str = "blobs";

/// Reseller accounts
pub const RESELLERS: &str = "resellers";

/// User accounts
pub const USERS: &str = "users";

/// Billing subscriptions
pub const SUBSCRIPTIONS: &str = "bb_subscriptions";

/// Sites (stored under their historical `projects` name)
pub const SITES: &str = "projects";

/// Enumeration of the well-known collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// `blobs`
    Blobs,
    /// `resellers`
    Resellers,
    /// `users`
    Users,
    /// `bb_subscriptions`
    Subscriptions,
    /// `projects`
    Sites,
}

impl Collection {
    /// Every known collection
    pub const ALL: [Collection; 5] = [
        Collection::Blobs,
        Collection::Resellers,
        Collection::Users,
        Collection::Subscriptions,
        Collection::Sites,
    ];

    /// Collection name as stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Blobs => BLOBS,
            Collection::Resellers => RESELLERS,
            Collection::Users => USERS,
            Collection::Subscriptions => SUBSCRIPTIONS,
            Collection::Sites => SITES,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Collection {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
