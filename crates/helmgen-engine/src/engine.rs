//! Template engine facade

use std::path::Path;

use crate::error::Result;
use crate::functions::{FunctionRegistry, FunctionResult};
use crate::template::Template;
use crate::values::Values;

/// The template engine: a function library plus compile-and-render
/// entry points. Templates are compiled per invocation, not cached.
pub struct Engine {
    functions: FunctionRegistry,
}

impl Engine {
    /// Create an engine with the built-in function library.
    pub fn new() -> Self {
        Self {
            functions: FunctionRegistry::with_builtins(),
        }
    }

    /// Register an additional template function.
    pub fn register<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&[serde_json::Value]) -> FunctionResult + Send + Sync + 'static,
    {
        self.functions.register(name, function);
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Compile and render template source against a value set.
    pub fn render_str(&self, source: &str, name: &str, values: &Values) -> Result<String> {
        let template = Template::compile(name, source)?;
        Ok(template.render(values, &self.functions)?)
    }

    /// Render a template file against a value set.
    pub fn render_file(&self, path: &Path, values: &Values) -> Result<String> {
        let source = std::fs::read_to_string(path)?;
        self.render_str(&source, &path.display().to_string(), values)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_render_str() {
        let engine = Engine::new();
        let values = Values::from_yaml("name: app").unwrap();
        let out = engine
            .render_str("hello {{ .name }}", "t", &values)
            .unwrap();
        assert_eq!(out, "hello app");
    }

    #[test]
    fn test_render_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cfg.yaml");
        std::fs::write(&path, "name: {{default \"helm\" .Namespace}}\n").unwrap();

        let engine = Engine::new();
        let out = engine.render_file(&path, &Values::new()).unwrap();
        assert_eq!(out, "name: helm\n");
    }

    #[test]
    fn test_registered_function_is_callable() {
        let mut engine = Engine::new();
        engine.register("greet", |args| {
            Ok(json!(format!(
                "hi {}",
                crate::functions::stringify(&args[0])
            )))
        });

        let out = engine
            .render_str("{{ greet .name }}", "t", &Values::from_yaml("name: ada").unwrap())
            .unwrap();
        assert_eq!(out, "hi ada");
    }

    #[test]
    fn test_compile_error_surfaces() {
        let engine = Engine::new();
        let result = engine.render_str("{{if .x}}open", "t", &Values::new());
        assert!(matches!(
            result,
            Err(crate::error::EngineError::Compile(_))
        ));
    }

    #[test]
    fn test_eval_error_surfaces() {
        let engine = Engine::new();
        let result = engine.render_str("{{ nosuchfn .x }}", "t", &Values::new());
        assert!(matches!(result, Err(crate::error::EngineError::Eval(_))));
    }
}
