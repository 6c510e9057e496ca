//! Method-level access control.
//!
//! Every inbound call is authorized here before its handler runs: the bearer
//! token is extracted from call metadata, verified, and the caller's role is
//! checked against a static, fully enumerated per-method allow-list. For
//! streaming calls this happens once, before any stream message is processed.

use std::collections::HashMap;
use std::sync::Arc;

use tonic::metadata::MetadataMap;

use super::token::{Claims, Role, TokenAuthority};
use crate::error::{Error, Result};

/// Access rule for one RPC method.
#[derive(Clone, Copy, Debug)]
pub enum MethodAccess {
    /// No token required.
    Open,
    /// A verified token is required. An empty role list admits any verified
    /// caller; otherwise the caller's role must appear in the list.
    Restricted(&'static [Role]),
}

/// Maps RPC method names to the roles permitted to invoke them.
pub struct AccessPolicy {
    authority: Arc<TokenAuthority>,
    rules: HashMap<&'static str, MethodAccess>,
}

impl AccessPolicy {
    /// Creates the policy for the catalog service's method table.
    pub fn new(authority: Arc<TokenAuthority>) -> Self {
        let rules = HashMap::from([
            ("Login", MethodAccess::Open),
            ("CreateLaptop", MethodAccess::Restricted(&[Role::Admin])),
            ("UploadImage", MethodAccess::Restricted(&[Role::Admin])),
            (
                "RateLaptop",
                MethodAccess::Restricted(&[Role::Admin, Role::User]),
            ),
            ("SearchLaptop", MethodAccess::Restricted(&[])),
        ]);

        Self { authority, rules }
    }

    /// Authorizes one call to `method`.
    ///
    /// Verification failures surface unchanged; an eligible role yields the
    /// verified claims (`None` for open methods). Methods absent from the
    /// table are denied.
    pub fn authorize(&self, method: &str, metadata: &MetadataMap) -> Result<Option<Claims>> {
        let rule = self
            .rules
            .get(method)
            .ok_or_else(|| Error::PermissionDenied(format!("unknown method '{method}'")))?;

        match rule {
            MethodAccess::Open => Ok(None),
            MethodAccess::Restricted(roles) => {
                let token = bearer_token(metadata)?;
                let claims = self.authority.verify(token)?;

                if roles.is_empty() || roles.contains(&claims.role) {
                    Ok(Some(claims))
                } else {
                    Err(Error::PermissionDenied(format!(
                        "role '{}' may not call {method}",
                        claims.role
                    )))
                }
            }
        }
    }
}

fn bearer_token(metadata: &MetadataMap) -> Result<&str> {
    let value = metadata
        .get("authorization")
        .ok_or_else(|| Error::MalformedToken("missing authorization metadata".to_string()))?
        .to_str()
        .map_err(|_| Error::MalformedToken("authorization metadata is not ASCII".to_string()))?;

    match value.strip_prefix("Bearer ").map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(Error::MalformedToken(
            "expected 'Bearer <token>' authorization metadata".to_string(),
        )),
    }
}
