//! Tenant guard.
//!
//! Every record carries a tenant id and every repository call takes a
//! [`TenantScope`], so an unscoped query does not compile. Records read
//! back are checked again with [`assert_tenant`].

use serde::Serialize;
use std::fmt;

use crate::error::{CoreError, CoreResult};

/// Length of a hyphenated UUID.
const TENANT_ID_LEN: usize = 36;

/// A validated tenant identifier that scopes every storage call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TenantScope(String);

impl TenantScope {
    /// Validates the identifier shape and builds a scope.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::tenant::TenantScope;
    ///
    /// assert!(TenantScope::new("00000000-0000-0000-0000-000000000001").is_ok());
    /// assert!(TenantScope::new("tenant-a").is_err());
    /// ```
    pub fn new(tenant_id: &str) -> CoreResult<Self> {
        check_shape(tenant_id)?;
        Ok(TenantScope(tenant_id.to_ascii_lowercase()))
    }

    /// The tenant id to bind in queries.
    #[inline]
    pub fn tenant_id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn check_shape(tenant_id: &str) -> CoreResult<()> {
    if tenant_id.trim().is_empty() {
        return Err(CoreError::tenant_mismatch("tenant id is absent"));
    }
    if tenant_id.len() != TENANT_ID_LEN || uuid::Uuid::parse_str(tenant_id).is_err() {
        return Err(CoreError::tenant_mismatch(format!(
            "tenant id '{tenant_id}' is malformed"
        )));
    }
    Ok(())
}

/// Implemented by every persisted entity.
pub trait TenantOwned {
    /// The tenant id stored on the record (empty when absent).
    fn tenant_id(&self) -> &str;
}

/// Fails with `TenantMismatch` unless `record` belongs to `scope`.
///
/// ## Example
/// ```rust
/// use till_core::tenant::{assert_tenant, TenantOwned, TenantScope};
///
/// struct Row { tenant_id: String }
/// impl TenantOwned for Row {
///     fn tenant_id(&self) -> &str { &self.tenant_id }
/// }
///
/// let scope = TenantScope::new("00000000-0000-0000-0000-000000000001").unwrap();
/// let mine = Row { tenant_id: scope.tenant_id().to_string() };
/// let theirs = Row { tenant_id: "00000000-0000-0000-0000-000000000002".into() };
///
/// assert!(assert_tenant(&mine, &scope).is_ok());
/// assert!(assert_tenant(&theirs, &scope).is_err());
/// ```
pub fn assert_tenant<R: TenantOwned + ?Sized>(record: &R, scope: &TenantScope) -> CoreResult<()> {
    let tenant_id = record.tenant_id();
    check_shape(tenant_id)?;
    if !tenant_id.eq_ignore_ascii_case(scope.tenant_id()) {
        return Err(CoreError::tenant_mismatch(format!(
            "record belongs to tenant '{tenant_id}', caller is '{scope}'"
        )));
    }
    Ok(())
}

/// Asserts every record in a collection.
pub fn assert_all<'a, R, I>(records: I, scope: &TenantScope) -> CoreResult<()>
where
    R: TenantOwned + 'a,
    I: IntoIterator<Item = &'a R>,
{
    records
        .into_iter()
        .try_for_each(|record| assert_tenant(record, scope))
}
