//! Statically declared parameter schemas for extensions.
//!
//! Each extension declares one or more [`Signature`]s up front. The binder
//! matches parsed arguments against them with a fixed compatibility table;
//! nothing is inspected at call time beyond the argument values themselves.

use std::fmt;
use std::sync::Arc;

/// Declared type of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    String,
    Integer,
    /// Accepts `Float` and (widened) `Integer` arguments.
    Float,
    Bool,
    /// An object literal whose keys match the record's fields.
    Record(Arc<RecordSchema>),
    /// An array literal whose elements all bind to the inner type.
    Array(Box<ParamType>),
}

impl ParamType {
    /// Shorthand for `ParamType::Array(Box::new(element))`.
    #[must_use]
    pub fn array_of(element: ParamType) -> Self {
        Self::Array(Box::new(element))
    }

    /// Shorthand for `ParamType::Record(Arc::new(schema))`.
    #[must_use]
    pub fn record(schema: RecordSchema) -> Self {
        Self::Record(Arc::new(schema))
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("String"),
            Self::Integer => f.write_str("Integer"),
            Self::Float => f.write_str("Float"),
            Self::Bool => f.write_str("Bool"),
            Self::Record(schema) => f.write_str(&schema.name),
            Self::Array(element) => write!(f, "Array<{element}>"),
        }
    }
}

/// A named structured value with typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// Type name used in error messages.
    pub name: String,
    /// Declared fields in order.
    pub fields: Vec<Field>,
}

impl RecordSchema {
    /// Create a record schema with no fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add a required field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
            required: true,
        });
        self
    }

    /// Add an optional field.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
            required: false,
        });
        self
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// One field of a [`RecordSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: ParamType,
    pub required: bool,
}

/// A named positional parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: ParamType,
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

/// One accepted positional parameter list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    pub params: Vec<Param>,
}

impl Signature {
    /// A signature taking no arguments.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.params.push(Param {
            name: name.into(),
            ty,
        });
        self
    }

    /// Number of parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}
