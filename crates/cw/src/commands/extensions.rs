//! `cw extensions` command implementation.

use cw_directive::{ExtensionRegistry, Registration, register_builtins};

use crate::output::Output;

/// Print every built-in directive with its accepted signatures.
pub(crate) fn execute() {
    let output = Output::new();
    let mut registry = ExtensionRegistry::new();
    register_builtins(&mut registry);

    for name in registry.names() {
        if let Some(registration) = registry.resolve(name) {
            for line in usage(registration) {
                output.info(&line);
            }
        }
    }
}

/// One `@Name(params)` line per signature.
fn usage(registration: &Registration) -> Vec<String> {
    registration
        .signatures
        .iter()
        .map(|signature| format!("@{}{signature}", registration.name))
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_usage_lists_each_signature() {
        let mut registry = ExtensionRegistry::new();
        register_builtins(&mut registry);

        let image = registry.resolve("image").unwrap();

        assert_eq!(
            usage(image),
            vec!["@Image(src: String)", "@Image(src: String, width: Float)"]
        );
    }
}
