//! Nominal service types with declared supertypes.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The nominal type a service is registered under or requested as.
///
/// Rust has no subtyping between arbitrary types, so assignability is
/// declared explicitly: a `ServiceType` built with [`extends`](Self::extends)
/// is assignable to its parent and, transitively, to the parent's parents.
/// Identity is the underlying `TypeId`; the name is for diagnostics.
///
/// # Examples
///
/// ```rust
/// use shared_services::ServiceType;
///
/// trait CountingService {}
/// trait SubCountingService: CountingService {}
///
/// let base = ServiceType::of::<dyn CountingService>();
/// let sub = ServiceType::of::<dyn SubCountingService>().extends(base.clone());
///
/// assert!(sub.is_assignable_to(&base));
/// assert!(!base.is_assignable_to(&sub));
/// assert!(base.is_assignable_to(&base));
/// ```
#[derive(Clone)]
pub struct ServiceType {
    id: TypeId,
    name: &'static str,
    supertypes: Arc<[ServiceType]>,
}

impl ServiceType {
    /// Type for `T` with no declared supertypes.
    ///
    /// `T` may be unsized, so trait objects like `dyn Logger` work as markers.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            supertypes: Arc::from(Vec::new()),
        }
    }

    /// Declares `parent` as a supertype.
    pub fn extends(self, parent: ServiceType) -> Self {
        let mut supertypes: Vec<ServiceType> = self.supertypes.iter().cloned().collect();
        supertypes.push(parent);
        Self {
            supertypes: Arc::from(supertypes),
            ..self
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Directly declared supertypes.
    pub fn supertypes(&self) -> &[ServiceType] {
        &self.supertypes
    }

    /// Whether a service of this type can satisfy a request for `target`.
    pub fn is_assignable_to(&self, target: &ServiceType) -> bool {
        self.id == target.id || self.supertypes.iter().any(|s| s.is_assignable_to(target))
    }
}

impl PartialEq for ServiceType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceType {}

impl Hash for ServiceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.supertypes.is_empty() {
            write!(f, "{}", self.name)
        } else {
            let parents: Vec<&str> = self.supertypes.iter().map(|s| s.name).collect();
            write!(f, "{} : {}", self.name, parents.join(" + "))
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
