//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// An unset variable without a default is an error naming `field`.
/// Bare `$VAR` is left alone.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, LookupError> {
        match std::env::var(var) {
            Ok(val) => Ok(Some(val)),
            Err(_) => Err(LookupError {
                var_name: var.to_owned(),
            }),
        }
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.var_name),
    })
}

struct LookupError {
    var_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_with_default_uses_value() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::set_var("CW_TEST_EXPAND_SITE", "public");
        }
        let result = expand_env("${CW_TEST_EXPAND_SITE:-site}", "build.output_dir").unwrap();
        assert_eq!(result, "public");
        unsafe {
            std::env::remove_var("CW_TEST_EXPAND_SITE");
        }
    }

    #[test]
    fn test_expand_with_default_uses_default() {
        let result = expand_env("${CW_TEST_EXPAND_UNSET:-content}", "docs.source_dir").unwrap();
        assert_eq!(result, "content");
    }

    #[test]
    fn test_expand_embedded_var() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::set_var("CW_TEST_EXPAND_COURSE", "rust-101");
        }
        let result = expand_env("courses/${CW_TEST_EXPAND_COURSE}/src", "docs.source_dir").unwrap();
        assert_eq!(result, "courses/rust-101/src");
        unsafe {
            std::env::remove_var("CW_TEST_EXPAND_COURSE");
        }
    }

    #[test]
    fn test_expand_missing_var_error() {
        let err = expand_env("${CW_TEST_EXPAND_MISSING}", "docs.source_dir").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("CW_TEST_EXPAND_MISSING"));
        assert!(err.to_string().contains("docs.source_dir"));
    }

    #[test]
    fn test_bare_dollar_not_expanded() {
        assert_eq!(
            expand_env("$HOME/site", "build.output_dir").unwrap(),
            "$HOME/site"
        );
    }
}
