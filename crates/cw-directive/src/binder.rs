//! Argument binding.
//!
//! Selects the first declared [`Signature`] whose arity equals the argument
//! count and whose parameter types accept every argument, using a fixed,
//! asymmetric compatibility table:
//!
//! | argument  | parameter        | result                     |
//! |-----------|------------------|----------------------------|
//! | `Integer` | `Integer`        | bound as is                |
//! | `Integer` | `Float`          | widened to `Float`         |
//! | `Float`   | `Float`          | bound as is                |
//! | `Float`   | `Integer`        | rejected, even for `100.0` |
//! | `String`  | `String`         | bound as is                |
//! | `Bool`    | `Bool`           | bound as is                |
//! | `Object`  | `Record(schema)` | fields bound recursively   |
//! | `Array`   | `Array(T)`       | each element bound to `T`  |
//!
//! Every other pairing is rejected.

use serde::de::DeserializeOwned;

use crate::error::ExtensionError;
use crate::parser::Invocation;
use crate::schema::{ParamType, RecordSchema, Signature};
use crate::value::{Object, Value};

/// No declared signature accepts the directive's arguments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: cannot bind arguments of @{directive}: {message}")]
pub struct BindingError {
    /// Directive name as written.
    pub directive: String,
    /// 1-based line of the directive.
    pub line: usize,
    /// Which argument failed and why.
    pub message: String,
}

/// Arguments after a successful bind.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArguments {
    signature: usize,
    values: Vec<Value>,
}

impl BoundArguments {
    /// Index of the matched signature in the extension's declared list.
    #[must_use]
    pub fn signature(&self) -> usize {
        self.signature
    }

    /// Bound values, coerced to their parameter types.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of bound values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no values were bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the value at `index`, if present.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// String argument at `index`.
    pub fn string(&self, index: usize) -> Result<&str, ExtensionError> {
        match self.values.get(index) {
            Some(Value::String(s)) => Ok(s),
            other => Err(mismatch(index, "String", other)),
        }
    }

    /// Integer argument at `index`.
    pub fn integer(&self, index: usize) -> Result<i64, ExtensionError> {
        match self.values.get(index) {
            Some(Value::Integer(n)) => Ok(*n),
            other => Err(mismatch(index, "Integer", other)),
        }
    }

    /// Float argument at `index`.
    pub fn float(&self, index: usize) -> Result<f64, ExtensionError> {
        match self.values.get(index) {
            Some(Value::Float(n)) => Ok(*n),
            other => Err(mismatch(index, "Float", other)),
        }
    }

    /// Bool argument at `index`.
    pub fn bool(&self, index: usize) -> Result<bool, ExtensionError> {
        match self.values.get(index) {
            Some(Value::Bool(b)) => Ok(*b),
            other => Err(mismatch(index, "Bool", other)),
        }
    }

    /// Record argument at `index`.
    pub fn record(&self, index: usize) -> Result<&Object, ExtensionError> {
        match self.values.get(index) {
            Some(Value::Object(object)) => Ok(object),
            other => Err(mismatch(index, "Record", other)),
        }
    }

    /// Array argument at `index`.
    pub fn array(&self, index: usize) -> Result<&[Value], ExtensionError> {
        match self.values.get(index) {
            Some(Value::Array(items)) => Ok(items),
            other => Err(mismatch(index, "Array", other)),
        }
    }

    /// Deserialize the argument at `index` into a serde type.
    ///
    /// Useful for records and arrays of records:
    /// `args.deserialize::<Vec<Person>>(0)`.
    pub fn deserialize<T: DeserializeOwned>(&self, index: usize) -> Result<T, ExtensionError> {
        let value = self
            .values
            .get(index)
            .ok_or_else(|| ExtensionError::new(format!("missing argument {}", index + 1)))?;
        serde_json::from_value(value.to_json()).map_err(|e| {
            ExtensionError::new(format!("argument {} has unexpected shape: {e}", index + 1))
        })
    }
}

fn mismatch(index: usize, expected: &str, found: Option<&Value>) -> ExtensionError {
    match found {
        Some(value) => ExtensionError::new(format!(
            "argument {} is {}, expected {expected}",
            index + 1,
            value.kind()
        )),
        None => ExtensionError::new(format!("missing argument {}", index + 1)),
    }
}

/// Bind an invocation's arguments against declared signatures.
///
/// Signatures are tried in order; the first with matching arity and
/// compatible types wins.
///
/// # Errors
///
/// Returns [`BindingError`] naming the directive and the first offending
/// argument when no signature matches.
pub fn bind(
    invocation: &Invocation,
    signatures: &[Signature],
) -> Result<BoundArguments, BindingError> {
    let mut first_mismatch = None;

    for (index, signature) in signatures.iter().enumerate() {
        if signature.arity() != invocation.args.len() {
            continue;
        }
        match bind_signature(signature, &invocation.args) {
            Ok(values) => {
                return Ok(BoundArguments {
                    signature: index,
                    values,
                });
            }
            Err(message) => {
                first_mismatch.get_or_insert(message);
            }
        }
    }

    let message =
        first_mismatch.unwrap_or_else(|| arity_message(signatures, invocation.args.len()));
    Err(BindingError {
        directive: invocation.name.clone(),
        line: invocation.line,
        message,
    })
}

fn arity_message(signatures: &[Signature], given: usize) -> String {
    let mut arities: Vec<usize> = signatures.iter().map(Signature::arity).collect();
    arities.sort_unstable();
    arities.dedup();
    let expected = match arities.as_slice() {
        [] => "no signatures are declared".to_owned(),
        [only] => format!("expects {only} argument(s)"),
        many => {
            let list: Vec<String> = many.iter().map(ToString::to_string).collect();
            format!("expects {} argument(s)", list.join(" or "))
        }
    };
    format!("{expected}, got {given}")
}

fn bind_signature(signature: &Signature, args: &[Value]) -> Result<Vec<Value>, String> {
    signature
        .params
        .iter()
        .zip(args)
        .enumerate()
        .map(|(i, (param, arg))| {
            bind_value(arg, &param.ty).map_err(|reason| {
                format!(
                    "argument {} `{arg}` does not match `{param}`: {reason}",
                    i + 1
                )
            })
        })
        .collect()
}

fn bind_value(value: &Value, ty: &ParamType) -> Result<Value, String> {
    match (value, ty) {
        (Value::Integer(_), ParamType::Integer)
        | (Value::Float(_), ParamType::Float)
        | (Value::String(_), ParamType::String)
        | (Value::Bool(_), ParamType::Bool) => Ok(value.clone()),
        #[allow(clippy::cast_precision_loss)]
        (Value::Integer(n), ParamType::Float) => Ok(Value::Float(*n as f64)),
        (Value::Float(_), ParamType::Integer) => {
            Err("a Float is never narrowed to Integer".to_owned())
        }
        (Value::Array(items), ParamType::Array(element)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| bind_value(item, element).map_err(|e| format!("element {i}: {e}")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (Value::Object(object), ParamType::Record(schema)) => {
            bind_record(object, schema).map(Value::Object)
        }
        (value, ty) => Err(format!("expected {ty}, found {}", value.kind())),
    }
}

fn bind_record(object: &Object, schema: &RecordSchema) -> Result<Object, String> {
    if let Some(unknown) = object.keys().find(|key| schema.get(key).is_none()) {
        return Err(format!("unknown field `{unknown}` for {}", schema.name));
    }
    if let Some(missing) = schema
        .fields
        .iter()
        .find(|field| field.required && !object.contains_key(&field.name))
    {
        return Err(format!(
            "missing required field `{}` for {}",
            missing.name, schema.name
        ));
    }

    object
        .iter()
        .map(|(key, value)| {
            let field = schema
                .get(key)
                .ok_or_else(|| format!("unknown field `{key}` for {}", schema.name))?;
            bind_value(value, &field.ty)
                .map(|bound| (key.to_owned(), bound))
                .map_err(|e| format!("field `{key}`: {e}"))
        })
        .collect()
}
