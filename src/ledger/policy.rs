//! Authorization policy
//!
//! Admin status is an injected capability check rather than a list baked
//! into the code. `AllowListPolicy` covers the configured-identities case;
//! any `Fn(&str) -> bool` works as a policy too.

use std::collections::HashSet;

use crate::error::LedgerError;
use crate::models::Caller;

pub trait AuthorizationPolicy: Send + Sync {
    fn is_admin(&self, user_id: &str) -> bool;
}

impl<F> AuthorizationPolicy for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_admin(&self, user_id: &str) -> bool {
        self(user_id)
    }
}

/// Admins from a fixed set of identities (compared case-insensitively)
#[derive(Debug, Clone, Default)]
pub struct AllowListPolicy {
    admins: HashSet<String>,
}

impl AllowListPolicy {
    pub fn new<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let admins = admins
            .into_iter()
            .map(|a| a.as_ref().trim().to_lowercase())
            .filter(|a| !a.is_empty())
            .collect();
        Self { admins }
    }

    pub fn len(&self) -> usize {
        self.admins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}

impl AuthorizationPolicy for AllowListPolicy {
    fn is_admin(&self, user_id: &str) -> bool {
        self.admins.contains(&user_id.trim().to_lowercase())
    }
}

/// Owner-or-admin guard for offer mutations
pub fn ensure_owner_or_admin<'a>(
    policy: &dyn AuthorizationPolicy,
    caller: &'a Caller,
    owner_id: Option<&str>,
) -> Result<&'a str, LedgerError> {
    let user_id = caller.require_user()?;
    if owner_id == Some(user_id) || policy.is_admin(user_id) {
        return Ok(user_id);
    }
    Err(LedgerError::Forbidden(format!(
        "{} is neither the owner nor an admin",
        user_id
    )))
}

/// Admin-only guard
pub fn ensure_admin<'a>(
    policy: &dyn AuthorizationPolicy,
    caller: &'a Caller,
) -> Result<&'a str, LedgerError> {
    let user_id = caller.require_user()?;
    if policy.is_admin(user_id) {
        return Ok(user_id);
    }
    Err(LedgerError::Forbidden(format!("{} is not an admin", user_id)))
}
