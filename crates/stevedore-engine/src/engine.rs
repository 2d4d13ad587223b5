//! Template engine based on MiniJinja

use indexmap::IndexMap;
use minijinja::Environment;
use serde_json::{Map, Value as JsonValue};

use crate::error::{Result, TemplateError};
use crate::filters;
use crate::functions;

/// Template engine builder
pub struct EngineBuilder {
    strict_mode: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self { strict_mode: true }
    }

    /// Set strict mode (fail on undefined variables)
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    pub fn build(self) -> Engine {
        Engine::new(self.strict_mode)
    }
}

/// Renders manifest templates
///
/// Each override is visible both as a top-level variable and under
/// `values`, so `{{ ChartLocation }}` and `{{ values.ChartLocation }}` are
/// equivalent.
pub struct Engine {
    strict_mode: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Engine {
    pub fn new(strict_mode: bool) -> Self {
        Self { strict_mode }
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    fn create_environment(&self) -> Environment<'static> {
        let mut env = Environment::new();

        if self.strict_mode {
            env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        } else {
            env.set_undefined_behavior(minijinja::UndefinedBehavior::Lenient);
        }
        // Rendered output is YAML, not HTML
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);
        env.set_keep_trailing_newline(true);

        env.add_filter("toyaml", filters::toyaml);
        env.add_filter("tojson", filters::tojson);
        env.add_filter("quote", filters::quote);
        env.add_filter("squote", filters::squote);
        env.add_filter("required", filters::required);
        env.add_filter("trimprefix", filters::trimprefix);
        env.add_filter("trimsuffix", filters::trimsuffix);
        env.add_filter("trunc", filters::trunc);

        env.add_function("fail", functions::fail);
        env.add_function("env", functions::env);
        env.add_function("coalesce", functions::coalesce);

        env
    }

    /// Render a single template string against a set of overrides
    pub fn render_string(
        &self,
        template: &str,
        overrides: &IndexMap<String, String>,
        template_name: &str,
    ) -> Result<String> {
        let names: Vec<&str> = overrides.keys().map(String::as_str).collect();
        let to_error =
            |e: minijinja::Error| TemplateError::from_minijinja(e, template_name, template, &names);

        let mut env = self.create_environment();
        env.add_template_owned(template_name.to_string(), template.to_string())
            .map_err(to_error)?;
        let tmpl = env.get_template(template_name).map_err(to_error)?;

        tracing::debug!(template = %template_name, overrides = overrides.len(), "rendering manifest");
        let rendered = tmpl.render(build_context(overrides)).map_err(to_error)?;
        Ok(rendered)
    }
}

fn build_context(overrides: &IndexMap<String, String>) -> JsonValue {
    let values: Map<String, JsonValue> = overrides
        .iter()
        .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
        .collect();

    let mut ctx = values.clone();
    ctx.insert("values".to_string(), JsonValue::Object(values));
    JsonValue::Object(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, TemplateErrorKind};

    fn overrides(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_top_level_and_values_access() {
        let engine = Engine::builder().build();
        let ov = overrides(&[("ChartLocation", "/srv/charts")]);

        let out = engine
            .render_string(
                "a: {{ ChartLocation }}/redis.tgz\nb: {{ values.ChartLocation }}",
                &ov,
                "manifest.yaml",
            )
            .unwrap();
        assert_eq!(out, "a: /srv/charts/redis.tgz\nb: /srv/charts");
    }

    #[test]
    fn test_no_html_escaping() {
        let engine = Engine::default();
        let ov = overrides(&[("Locator", "oci://r.io/a?b=1&c=<2>")]);
        let out = engine.render_string("{{ Locator }}", &ov, "t").unwrap();
        assert_eq!(out, "oci://r.io/a?b=1&c=<2>");
    }

    #[test]
    fn test_trailing_newline_kept() {
        let engine = Engine::default();
        let out = engine
            .render_string("metadata:\n  name: m\n", &IndexMap::new(), "t")
            .unwrap();
        assert_eq!(out, "metadata:\n  name: m\n");
    }

    #[test]
    fn test_strict_undefined_suggests_override() {
        let engine = Engine::default();
        let ov = overrides(&[("ChartLocation", "/srv")]);

        let err = engine
            .render_string("chartLocator: {{ ChartLocaton }}", &ov, "manifest.yaml")
            .unwrap_err();
        match err {
            EngineError::Template(e) => {
                assert_eq!(e.kind(), TemplateErrorKind::UndefinedVariable);
                assert_eq!(e.suggestion.as_deref(), Some("Did you mean `ChartLocation`?"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_lenient_renders_empty() {
        let engine = Engine::builder().strict(false).build();
        let out = engine
            .render_string("ns: {{ Namespace }}", &IndexMap::new(), "t")
            .unwrap();
        assert_eq!(out, "ns: ");
    }

    #[test]
    fn test_default_filter() {
        let engine = Engine::default();
        let out = engine
            .render_string("ns: {{ Namespace | default('paas') }}", &IndexMap::new(), "t")
            .unwrap();
        assert_eq!(out, "ns: paas");
    }

    #[test]
    fn test_coalesce_takes_variadic_arguments() {
        let engine = Engine::default();
        let template = "ns: {{ coalesce(Namespace, \"paas\") }}";

        let out = engine
            .render_string(template, &overrides(&[("Namespace", "")]), "t")
            .unwrap();
        assert_eq!(out, "ns: paas");

        let out = engine
            .render_string(template, &overrides(&[("Namespace", "prod")]), "t")
            .unwrap();
        assert_eq!(out, "ns: prod");
    }

    #[test]
    fn test_unknown_filter() {
        let engine = Engine::default();
        let ov = overrides(&[("Release", "redis")]);
        let err = engine
            .render_string("name: {{ Release | qoute }}", &ov, "t")
            .unwrap_err();
        match err {
            EngineError::Template(e) => {
                assert_eq!(e.kind(), TemplateErrorKind::UnknownFilter);
                assert!(e.suggestion.unwrap().contains("`quote`"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_syntax_error() {
        let engine = Engine::default();
        let err = engine
            .render_string("name: {{ Release ", &IndexMap::new(), "t")
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Template(ref e) if e.kind() == TemplateErrorKind::SyntaxError
        ));
    }
}
