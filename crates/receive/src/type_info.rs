//! Requested-type descriptors.

use std::any::{Any, TypeId};
use std::fmt;

/// Describes the type a receive call asks for.
///
/// Built at a monomorphized call site with [`TypeInfo::of`], so the descriptor
/// identifies the full concrete type including generic parameters:
/// `TypeInfo::of::<Vec<String>>()` and `TypeInfo::of::<Vec<u8>>()` are
/// different descriptors.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(self) -> TypeId {
        self.id
    }

    /// Diagnostic name of the type. Not guaranteed to be stable across
    /// compiler versions; never compare on it.
    pub fn name(self) -> &'static str {
        self.name
    }

    /// Returns `true` if this descriptor is for `T`.
    pub fn is<T: Any>(self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Returns `true` if `value` is an instance of the described type.
    pub fn is_instance(self, value: &(dyn Any + Send)) -> bool {
        value.type_id() == self.id
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl std::hash::Hash for TypeInfo {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeInfo").field(&self.name).finish()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
