//! Extension registry.
//!
//! Maps directive names (case-insensitively) to their declared signatures
//! and invoke functions. The registry is an explicit value owned by whoever
//! drives a build; it is mutated before a build starts and only read while
//! pages are expanded.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::binder::{BoundArguments, bind};
use crate::context::ExtensionContext;
use crate::error::{DirectiveError, ExtensionError};
use crate::parser::Invocation;
use crate::schema::Signature;

/// Produces text for one bound directive call.
///
/// Implemented for any `Fn(&BoundArguments, &ExtensionContext) -> Result<String, ExtensionError>`,
/// so closures can be registered directly.
pub trait Invoke: Send + Sync {
    /// Run the extension with bound arguments.
    fn invoke(&self, args: &BoundArguments, ctx: &ExtensionContext<'_>)
    -> Result<String, ExtensionError>;
}

impl<F> Invoke for F
where
    F: Fn(&BoundArguments, &ExtensionContext<'_>) -> Result<String, ExtensionError> + Send + Sync,
{
    fn invoke(
        &self,
        args: &BoundArguments,
        ctx: &ExtensionContext<'_>,
    ) -> Result<String, ExtensionError> {
        self(args, ctx)
    }
}

/// A self-describing extension.
///
/// # Example
///
/// ```
/// use cw_directive::{
///     BoundArguments, Extension, ExtensionContext, ExtensionError, ExtensionRegistry, Invoke,
///     ParamType, Signature,
/// };
///
/// struct Kbd;
///
/// impl Invoke for Kbd {
///     fn invoke(&self, args: &BoundArguments, _ctx: &ExtensionContext<'_>) -> Result<String, ExtensionError> {
///         Ok(format!("<kbd>{}</kbd>", args.string(0)?))
///     }
/// }
///
/// impl Extension for Kbd {
///     fn name(&self) -> &str { "Kbd" }
///     fn signatures(&self) -> Vec<Signature> {
///         vec![Signature::empty().param("keys", ParamType::String)]
///     }
/// }
///
/// let mut registry = ExtensionRegistry::new();
/// registry.register_extension(Kbd);
/// assert!(registry.resolve("kbd").is_some());
/// ```
pub trait Extension: Invoke {
    /// Directive name, matched case-insensitively.
    fn name(&self) -> &str;

    /// Accepted positional signatures, tried in order.
    fn signatures(&self) -> Vec<Signature>;
}

/// One registered extension.
#[derive(Clone)]
pub struct Registration {
    /// Name as registered (original case).
    pub name: String,
    /// Accepted signatures, tried in order.
    pub signatures: Vec<Signature>,
    invoker: Arc<dyn Invoke>,
}

impl Registration {
    /// Run the extension.
    pub fn invoke(
        &self,
        args: &BoundArguments,
        ctx: &ExtensionContext<'_>,
    ) -> Result<String, ExtensionError> {
        self.invoker.invoke(args, ctx)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("signatures", &self.signatures)
            .finish_non_exhaustive()
    }
}

/// Name → extension map.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    entries: HashMap<String, Registration>,
}

impl ExtensionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an invoke function under `name`.
    ///
    /// A previous registration under the same name (in any case) is replaced.
    pub fn register<I>(&mut self, name: impl Into<String>, signatures: Vec<Signature>, invoker: I)
    where
        I: Invoke + 'static,
    {
        let name = name.into();
        let key = name.to_lowercase();
        let registration = Registration {
            name,
            signatures,
            invoker: Arc::new(invoker),
        };
        if let Some(previous) = self.entries.insert(key, registration) {
            tracing::warn!(name = %previous.name, "Extension registration replaced");
        }
    }

    /// Register a self-describing extension.
    pub fn register_extension<E: Extension + 'static>(&mut self, extension: E) {
        let name = extension.name().to_owned();
        let signatures = extension.signatures();
        self.register(name, signatures, extension);
    }

    /// Look up an extension by name, ignoring case.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&Registration> {
        self.entries.get(&name.to_lowercase())
    }

    /// Remove every registration.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Number of registered extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names (original case), sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.values().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Resolve, bind and run one invocation.
    ///
    /// # Errors
    ///
    /// [`DirectiveError::UnknownExtension`], [`DirectiveError::Binding`] or
    /// [`DirectiveError::Extension`].
    pub fn invoke(
        &self,
        invocation: &Invocation,
        ctx: &ExtensionContext<'_>,
    ) -> Result<String, DirectiveError> {
        let registration =
            self.resolve(&invocation.name)
                .ok_or_else(|| DirectiveError::UnknownExtension {
                    name: invocation.name.clone(),
                    line: invocation.line,
                })?;
        let args = bind(invocation, &registration.signatures)?;
        registration
            .invoke(&args, &ctx.with_line(invocation.line))
            .map_err(|e| DirectiveError::Extension {
                name: invocation.name.clone(),
                line: invocation.line,
                message: e.to_string(),
            })
    }
}
