//! Compile-time field bindings for application records.
//!
//! A record type lists the fields that take part in persistence; every other
//! field is invisible to the binder and scanner. The [`record!`] macro writes
//! the [`Record`] impl:
//!
//! ```
//! #[derive(Debug, Default, Clone, PartialEq)]
//! struct User {
//!     id: i64,
//!     name: String,
//!     // not persisted
//!     session: Option<String>,
//! }
//!
//! strata::record!(User { id, name });
//!
//! use strata::Record;
//! let names: Vec<_> = User::bindings().fields().iter().map(|f| f.name()).collect();
//! assert_eq!(names, ["id", "name"]);
//! ```

use crate::query::{ConvertError, Value};

/// Reads a field as a [`Value`].
pub type Getter<R> = fn(&R) -> Value;

/// Writes a [`Value`] into a field.
pub type Setter<R> = fn(&mut R, Value) -> Result<(), ConvertError>;

/// Accessors for one persisted field.
pub struct FieldBinding<R> {
    name: String,
    get: Getter<R>,
    set: Setter<R>,
}

impl<R> FieldBinding<R> {
    /// Lower-cased field name, matched against column names.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, record: &R) -> Value {
        (self.get)(record)
    }

    pub fn set(&self, record: &mut R, value: Value) -> Result<(), ConvertError> {
        (self.set)(record, value)
    }
}

impl<R> std::fmt::Debug for FieldBinding<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBinding")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// The persisted fields of a record type, in declaration order.
#[derive(Debug)]
pub struct Bindings<R> {
    fields: Vec<FieldBinding<R>>,
}

impl<R> Bindings<R> {
    pub fn builder() -> BindingsBuilder<R> {
        BindingsBuilder { fields: Vec::new() }
    }

    pub fn fields(&self) -> &[FieldBinding<R>] {
        &self.fields
    }

    /// Position of the field named `name` (case-insensitive).
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn field(&self, name: &str) -> Option<&FieldBinding<R>> {
        self.position(name).map(|idx| &self.fields[idx])
    }
}

/// Builder for [`Bindings`].
pub struct BindingsBuilder<R> {
    fields: Vec<FieldBinding<R>>,
}

impl<R> BindingsBuilder<R> {
    /// Add a field. Names are lower-cased; a repeated name replaces the
    /// earlier binding in place.
    pub fn field(mut self, name: &str, get: Getter<R>, set: Setter<R>) -> Self {
        let name = name.to_lowercase();
        let binding = FieldBinding { name, get, set };
        match self.fields.iter_mut().find(|f| f.name == binding.name) {
            Some(existing) => *existing = binding,
            None => self.fields.push(binding),
        }
        self
    }

    pub fn build(self) -> Bindings<R> {
        Bindings {
            fields: self.fields,
        }
    }
}

/// A type whose fields can be bound to table columns.
pub trait Record: Sized + 'static {
    fn bindings() -> &'static Bindings<Self>;
}

/// Implement [`Record`] for a struct from an explicit list of its fields.
///
/// Each listed field must implement `Clone + Into<Value>` and
/// [`FromValue`](crate::FromValue).
#[macro_export]
macro_rules! record {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::Record for $ty {
            fn bindings() -> &'static $crate::Bindings<Self> {
                static BINDINGS: ::std::sync::OnceLock<$crate::Bindings<$ty>> =
                    ::std::sync::OnceLock::new();
                BINDINGS.get_or_init(|| {
                    $crate::Bindings::<$ty>::builder()
                        $(
                            .field(
                                stringify!($field),
                                |record: &$ty| {
                                    $crate::Value::from(::std::clone::Clone::clone(&record.$field))
                                },
                                |record: &mut $ty, value: $crate::Value| {
                                    record.$field = $crate::FromValue::from_value(value)?;
                                    ::std::result::Result::Ok(())
                                },
                            )
                        )*
                        .build()
                })
            }
        }
    };
}
