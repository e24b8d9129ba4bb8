//! The value model for data crossing the host/script boundary.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Process-stable identity of a registered native object type.
///
/// Works for unsized types as well, which is how base types are usually
/// expressed (`TypeIdent::of::<dyn Shape>()`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeIdent {
    id: TypeId,
    name: &'static str,
}

impl TypeIdent {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Identity of a native object observed inside a script.
///
/// Carries the object's type identity and address for comparison and
/// printing only; it holds no ownership over the referent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectRef {
    ident: TypeIdent,
    address: usize,
}

impl ObjectRef {
    pub(crate) fn new(ident: TypeIdent, address: usize) -> Self {
        Self { ident, address }
    }

    /// Capture the identity of a shared reference without taking
    /// ownership, for comparison against values observed in scripts.
    pub fn from_shared<T>(handle: &Arc<T>) -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            ident: TypeIdent::of::<T>(),
            address: Arc::as_ptr(handle).cast::<()>() as usize,
        }
    }

    pub fn ident(&self) -> TypeIdent {
        self.ident
    }

    pub fn type_name(&self) -> &'static str {
        self.ident.name()
    }

    pub fn address(&self) -> usize {
        self.address
    }
}

/// A value that can cross the script boundary.
///
/// Matching on the enum is the visitor; equality is structural. Integer
/// construction widens every width to 64 bits, float construction to
/// `f64`.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Object(ObjectRef),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Object(r) => write!(f, "{}@{:#x}", r.type_name(), r.address()),
        }
    }
}

macro_rules! value_from_integer {
    ($($ty:ty)*) => {$(
        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Integer(value as i64)
            }
        }
    )*};
}

value_from_integer!(i8 i16 i32 i64 u8 u16 u32 u64 isize usize);

macro_rules! value_from_float {
    ($($ty:ty)*) => {$(
        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Float(value as f64)
            }
        }
    )*};
}

value_from_float!(f32 f64);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Value::Object(value)
    }
}

/// The open argument tail of a variadic native function.
///
/// May only appear as the last declared parameter; it absorbs every
/// remaining argument as a generic [`Value`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Variadic(pub Vec<Value>);

impl std::ops::Deref for Variadic {
    type Target = Vec<Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Value>> for Variadic {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl IntoIterator for Variadic {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<Value> for Variadic {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
