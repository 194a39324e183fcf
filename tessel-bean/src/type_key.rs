use core::any::TypeId;
use core::fmt;
use core::hash::{Hash, Hasher};

/// Identity and name of a Rust type.
///
/// Equality and hashing use the [`TypeId`] only.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// The key for `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: core::any::type_name::<T>(),
        }
    }

    /// The type id.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The full type name, as reported by [`core::any::type_name`].
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The last path segment without generic arguments: `Dog` for
    /// `zoo::animals::Dog<T>`.
    pub fn simple_name(&self) -> &'static str {
        let base = match self.name.find('<') {
            Some(end) => &self.name[..end],
            None => self.name,
        };
        match base.rfind("::") {
            Some(start) => &base[start + 2..],
            None => base,
        }
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
