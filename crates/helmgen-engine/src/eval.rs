//! Template evaluation
//!
//! Walks a compiled block tree against a value set. `.` is the cursor,
//! rebound by `range` and `with`; `$.` always addresses the root value.
//! Field lookups that miss resolve to nil rather than failing, so
//! `default` can supply fallbacks for absent keys.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use crate::ast::{Argument, Command, FieldAccess, Literal, Pipeline, RangeVars, Span};
use crate::error::{EvalErrorKind, TemplateEvalError};
use crate::functions::{self, FunctionRegistry};
use crate::template::{Node, Template};
use crate::values::Values;

pub(crate) fn render(
    template: &Template,
    values: &Values,
    functions: &FunctionRegistry,
) -> Result<String, TemplateEvalError> {
    let evaluator = Evaluator {
        template,
        functions,
        root: values.inner(),
    };
    let mut out = String::new();
    evaluator.render_nodes(&template.nodes, values.inner(), &HashMap::new(), &mut out)?;
    Ok(out)
}

type Vars = HashMap<String, JsonValue>;

struct Evaluator<'a> {
    template: &'a Template,
    functions: &'a FunctionRegistry,
    root: &'a JsonValue,
}

impl Evaluator<'_> {
    fn render_nodes(
        &self,
        nodes: &[Node],
        dot: &JsonValue,
        vars: &Vars,
        out: &mut String,
    ) -> Result<(), TemplateEvalError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Expr { pipeline, span } => {
                    let value = self.eval_pipeline(pipeline, dot, vars, *span)?;
                    out.push_str(&functions::stringify(&value));
                }
                Node::Cond { arms, fallback } => {
                    let mut taken = false;
                    for arm in arms {
                        let condition = self.eval_pipeline(&arm.condition, dot, vars, arm.span)?;
                        if functions::is_truthy(&condition) {
                            self.render_nodes(&arm.body, dot, vars, out)?;
                            taken = true;
                            break;
                        }
                    }
                    if !taken && let Some(fallback) = fallback {
                        self.render_nodes(fallback, dot, vars, out)?;
                    }
                }
                Node::Range {
                    vars: decl,
                    pipeline,
                    body,
                    fallback,
                    span,
                } => {
                    let subject = self.eval_pipeline(pipeline, dot, vars, *span)?;
                    self.render_range(decl, &subject, body, fallback, dot, vars, out, *span)?;
                }
                Node::With {
                    pipeline,
                    body,
                    fallback,
                    span,
                } => {
                    let value = self.eval_pipeline(pipeline, dot, vars, *span)?;
                    if functions::is_truthy(&value) {
                        self.render_nodes(body, &value, vars, out)?;
                    } else if let Some(fallback) = fallback {
                        self.render_nodes(fallback, dot, vars, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn render_range(
        &self,
        decl: &Option<RangeVars>,
        subject: &JsonValue,
        body: &[Node],
        fallback: &Option<Vec<Node>>,
        dot: &JsonValue,
        vars: &Vars,
        out: &mut String,
        span: Span,
    ) -> Result<(), TemplateEvalError> {
        let render_fallback = |out: &mut String| -> Result<(), TemplateEvalError> {
            if let Some(fallback) = fallback {
                self.render_nodes(fallback, dot, vars, out)?;
            }
            Ok(())
        };

        match subject {
            JsonValue::Array(items) => {
                if items.is_empty() {
                    return render_fallback(out);
                }
                for (index, item) in items.iter().enumerate() {
                    let scope = extend_vars(vars, decl, JsonValue::from(index), item.clone());
                    self.render_nodes(body, item, &scope, out)?;
                }
                Ok(())
            }
            JsonValue::Object(map) => {
                if map.is_empty() {
                    return render_fallback(out);
                }
                for (key, value) in map {
                    let scope = extend_vars(
                        vars,
                        decl,
                        JsonValue::String(key.clone()),
                        value.clone(),
                    );
                    self.render_nodes(body, value, &scope, out)?;
                }
                Ok(())
            }
            JsonValue::Null => render_fallback(out),
            other => Err(self.error(
                format!("cannot iterate over {}", type_name(other)),
                EvalErrorKind::TypeError,
                span,
            )),
        }
    }

    fn eval_pipeline(
        &self,
        pipeline: &Pipeline,
        dot: &JsonValue,
        vars: &Vars,
        span: Span,
    ) -> Result<JsonValue, TemplateEvalError> {
        let mut commands = pipeline.commands.iter();
        let first = commands.next().ok_or_else(|| {
            self.error("empty pipeline", EvalErrorKind::InvalidArguments, span)
        })?;

        let mut value = self.eval_command(first, None, dot, vars, span)?;
        for command in commands {
            value = self.eval_command(command, Some(value), dot, vars, span)?;
        }
        Ok(value)
    }

    fn eval_command(
        &self,
        command: &Command,
        piped: Option<JsonValue>,
        dot: &JsonValue,
        vars: &Vars,
        span: Span,
    ) -> Result<JsonValue, TemplateEvalError> {
        match command {
            Command::Function { name, args } => {
                let mut argv = Vec::with_capacity(args.len() + 1);
                for arg in args {
                    argv.push(self.eval_argument(arg, dot, vars, span)?);
                }
                if let Some(piped) = piped {
                    argv.push(piped);
                }
                self.call_function(name, &argv, span)
            }
            // Only function calls can receive a piped value.
            _ if piped.is_some() => Err(self.error(
                "only a function can follow `|` in a pipeline",
                EvalErrorKind::NotPipeable,
                span,
            )),
            Command::Field(field) => Ok(self.lookup_field(field, dot)),
            Command::Variable(name) => self.lookup_var(name, vars, span),
            Command::Literal(literal) => Ok(literal_value(literal)),
            Command::Parenthesized(inner) => self.eval_pipeline(inner, dot, vars, span),
        }
    }

    fn eval_argument(
        &self,
        argument: &Argument,
        dot: &JsonValue,
        vars: &Vars,
        span: Span,
    ) -> Result<JsonValue, TemplateEvalError> {
        match argument {
            Argument::Field(field) => Ok(self.lookup_field(field, dot)),
            Argument::Variable(name) => self.lookup_var(name, vars, span),
            Argument::Literal(literal) => Ok(literal_value(literal)),
            Argument::Pipeline(pipeline) => self.eval_pipeline(pipeline, dot, vars, span),
        }
    }

    fn call_function(
        &self,
        name: &str,
        argv: &[JsonValue],
        span: Span,
    ) -> Result<JsonValue, TemplateEvalError> {
        let Some(function) = self.functions.get(name) else {
            let names = self.functions.names();
            let mut err = self.error(
                format!("unknown function `{name}`"),
                EvalErrorKind::UnknownFunction,
                span,
            );
            if let Some(candidate) = functions::closest_match(name, &names) {
                err = err.with_suggestion(format!("Did you mean `{candidate}`?"));
            }
            return Err(err);
        };

        function(argv).map_err(|e| {
            self.error(
                format!("{name}: {e}"),
                EvalErrorKind::InvalidArguments,
                span,
            )
        })
    }

    fn lookup_field(&self, field: &FieldAccess, dot: &JsonValue) -> JsonValue {
        let mut current = if field.is_root { self.root } else { dot };
        for key in &field.path {
            current = match current {
                JsonValue::Object(map) => map.get(key).unwrap_or(&JsonValue::Null),
                _ => &JsonValue::Null,
            };
        }
        current.clone()
    }

    fn lookup_var(
        &self,
        name: &str,
        vars: &Vars,
        span: Span,
    ) -> Result<JsonValue, TemplateEvalError> {
        vars.get(name).cloned().ok_or_else(|| {
            self.error(
                format!("undefined variable `${name}`"),
                EvalErrorKind::UndefinedVariable,
                span,
            )
        })
    }

    fn error(&self, message: impl Into<String>, kind: EvalErrorKind, span: Span) -> TemplateEvalError {
        TemplateEvalError::new(
            message,
            kind,
            self.template.name(),
            self.template.source(),
            Some((span.start, span.end)),
        )
    }
}

fn extend_vars(
    vars: &Vars,
    decl: &Option<RangeVars>,
    index: JsonValue,
    value: JsonValue,
) -> Vars {
    let mut scope = vars.clone();
    if let Some(decl) = decl {
        if let Some(index_var) = &decl.index_var {
            scope.insert(index_var.clone(), index);
        }
        scope.insert(decl.value_var.clone(), value);
    }
    scope
}

fn literal_value(literal: &Literal) -> JsonValue {
    match literal {
        Literal::String(s) => JsonValue::String(s.clone()),
        Literal::Int(n) => JsonValue::from(*n),
        Literal::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Literal::Bool(b) => JsonValue::Bool(*b),
        Literal::Nil => JsonValue::Null,
    }
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "nil",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "sequence",
        JsonValue::Object(_) => "mapping",
    }
}
