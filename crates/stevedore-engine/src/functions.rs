//! Global template functions

use minijinja::value::Rest;
use minijinja::{Error, ErrorKind, Value};

/// Abort rendering with a message
///
/// Usage: {% if not ChartLocation %}{{ fail("ChartLocation is not set") }}{% endif %}
pub fn fail(message: String) -> Result<Value, Error> {
    Err(Error::new(ErrorKind::InvalidOperation, message))
}

/// Read an environment variable, with an optional fallback
///
/// Usage: namespace: {{ env("STEVEDORE_NAMESPACE", "default") }}
pub fn env(name: String, default: Option<String>) -> Result<String, Error> {
    match std::env::var(&name) {
        Ok(value) => Ok(value),
        Err(_) => default.ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("environment variable '{}' is not set", name),
            )
        }),
    }
}

/// First argument that is neither undefined, none nor an empty string
///
/// Usage: namespace: {{ coalesce(Namespace, "paas") }}
pub fn coalesce(args: Rest<Value>) -> Value {
    args.iter()
        .find(|v| !v.is_undefined() && !v.is_none() && v.as_str() != Some(""))
        .cloned()
        .unwrap_or(Value::UNDEFINED)
}
