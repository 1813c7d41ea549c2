//! Compiled template representation
//!
//! The parser yields a flat element list; this module folds it into a
//! block tree and applies whitespace trim markers. The result is an
//! immutable `Template`, compiled once per render invocation.

use crate::ast::{Action, ActionBody, Element, Pipeline, RangeVars, Span};
use crate::error::{TemplateCompileError, TemplateEvalError};
use crate::eval;
use crate::functions::FunctionRegistry;
use crate::parser;
use crate::values::Values;

/// An immutable compiled template.
#[derive(Debug)]
pub struct Template {
    name: String,
    source: String,
    pub(crate) nodes: Vec<Node>,
}

/// A node of the compiled block tree.
#[derive(Debug)]
pub(crate) enum Node {
    Text(String),
    Expr {
        pipeline: Pipeline,
        span: Span,
    },
    Cond {
        arms: Vec<CondArm>,
        fallback: Option<Vec<Node>>,
    },
    Range {
        vars: Option<RangeVars>,
        pipeline: Pipeline,
        body: Vec<Node>,
        fallback: Option<Vec<Node>>,
        span: Span,
    },
    With {
        pipeline: Pipeline,
        body: Vec<Node>,
        fallback: Option<Vec<Node>>,
        span: Span,
    },
}

#[derive(Debug)]
pub(crate) struct CondArm {
    pub(crate) condition: Pipeline,
    pub(crate) body: Vec<Node>,
    pub(crate) span: Span,
}

impl Template {
    /// Compile template source text.
    pub fn compile(name: &str, source: &str) -> Result<Self, TemplateCompileError> {
        let mut elements = parser::parse(source)
            .map_err(|e| TemplateCompileError::from_parse(&e, name, source))?;
        apply_trim(&mut elements);

        let mut builder = Builder {
            elements: elements.into_iter(),
            name,
            source,
        };
        let (nodes, end) = builder.block()?;
        match end {
            BlockEnd::Eof => Ok(Self {
                name: name.to_string(),
                source: source.to_string(),
                nodes,
            }),
            BlockEnd::End(span) => Err(builder.error("unexpected {{end}} with no open block", span)),
            BlockEnd::Else(span) | BlockEnd::ElseIf(_, span) => {
                Err(builder.error("unexpected {{else}} with no open block", span))
            }
        }
    }

    /// Evaluate against a value set with the given function library.
    pub fn render(
        &self,
        values: &Values,
        functions: &FunctionRegistry,
    ) -> Result<String, TemplateEvalError> {
        eval::render(self, values, functions)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// How a nested block run ended.
enum BlockEnd {
    Eof,
    End(Span),
    Else(Span),
    ElseIf(Pipeline, Span),
}

struct Builder<'a> {
    elements: std::vec::IntoIter<Element>,
    name: &'a str,
    source: &'a str,
}

impl Builder<'_> {
    fn block(&mut self) -> Result<(Vec<Node>, BlockEnd), TemplateCompileError> {
        let mut nodes = Vec::new();

        while let Some(element) = self.elements.next() {
            let action = match element {
                Element::RawText(text) => {
                    if !text.is_empty() {
                        nodes.push(Node::Text(text));
                    }
                    continue;
                }
                Element::Action(action) => action,
            };
            let Action { body, span, .. } = action;

            match body {
                ActionBody::Comment => {}
                ActionBody::Pipeline(pipeline) => nodes.push(Node::Expr { pipeline, span }),
                ActionBody::If(condition) => {
                    let node = self.cond(condition, span)?;
                    nodes.push(node);
                }
                ActionBody::Range { vars, pipeline } => {
                    let (body, fallback) = self.body_with_fallback(span, "range")?;
                    nodes.push(Node::Range {
                        vars,
                        pipeline,
                        body,
                        fallback,
                        span,
                    });
                }
                ActionBody::With(pipeline) => {
                    let (body, fallback) = self.body_with_fallback(span, "with")?;
                    nodes.push(Node::With {
                        pipeline,
                        body,
                        fallback,
                        span,
                    });
                }
                ActionBody::End => return Ok((nodes, BlockEnd::End(span))),
                ActionBody::Else => return Ok((nodes, BlockEnd::Else(span))),
                ActionBody::ElseIf(pipeline) => {
                    return Ok((nodes, BlockEnd::ElseIf(pipeline, span)));
                }
            }
        }

        Ok((nodes, BlockEnd::Eof))
    }

    /// Body of a `range` or `with` block, with its optional `{{else}}` arm.
    fn body_with_fallback(
        &mut self,
        open: Span,
        keyword: &str,
    ) -> Result<(Vec<Node>, Option<Vec<Node>>), TemplateCompileError> {
        let (body, end) = self.block()?;
        match end {
            BlockEnd::End(_) => Ok((body, None)),
            BlockEnd::Else(_) => {
                let (fallback, end) = self.block()?;
                match end {
                    BlockEnd::End(_) => Ok((body, Some(fallback))),
                    BlockEnd::Eof => Err(self.unclosed(keyword, open)),
                    BlockEnd::Else(span) | BlockEnd::ElseIf(_, span) => {
                        Err(self.error("unexpected {{else}} after {{else}}", span))
                    }
                }
            }
            BlockEnd::ElseIf(_, span) => Err(self.error(
                format!("{{{{else if}}}} is not valid in a {keyword} block"),
                span,
            )),
            BlockEnd::Eof => Err(self.unclosed(keyword, open)),
        }
    }

    fn cond(&mut self, condition: Pipeline, span: Span) -> Result<Node, TemplateCompileError> {
        let mut arms = Vec::new();
        let mut condition = condition;
        let mut arm_span = span;

        loop {
            let (body, end) = self.block()?;
            match end {
                BlockEnd::End(_) => {
                    arms.push(CondArm {
                        condition,
                        body,
                        span: arm_span,
                    });
                    return Ok(Node::Cond {
                        arms,
                        fallback: None,
                    });
                }
                BlockEnd::ElseIf(next, next_span) => {
                    arms.push(CondArm {
                        condition,
                        body,
                        span: arm_span,
                    });
                    condition = next;
                    arm_span = next_span;
                }
                BlockEnd::Else(_) => {
                    arms.push(CondArm {
                        condition,
                        body,
                        span: arm_span,
                    });
                    let (fallback, end) = self.block()?;
                    return match end {
                        BlockEnd::End(_) => Ok(Node::Cond {
                            arms,
                            fallback: Some(fallback),
                        }),
                        BlockEnd::Eof => Err(self.unclosed("if", span)),
                        BlockEnd::Else(s) | BlockEnd::ElseIf(_, s) => {
                            Err(self.error("unexpected {{else}} after {{else}}", s))
                        }
                    };
                }
                BlockEnd::Eof => return Err(self.unclosed("if", span)),
            }
        }
    }

    fn unclosed(&self, keyword: &str, span: Span) -> TemplateCompileError {
        self.error(format!("missing {{{{end}}}} for this {keyword} block"), span)
    }

    fn error(&self, message: impl Into<String>, span: Span) -> TemplateCompileError {
        TemplateCompileError::new(message, self.name, self.source, Some((span.start, span.end)))
    }
}

/// Apply `{{-` / `-}}` whitespace trimming to adjacent raw text.
fn apply_trim(elements: &mut [Element]) {
    for i in 0..elements.len() {
        let (trim_left, trim_right) = match &elements[i] {
            Element::Action(a) => (a.trim_left, a.trim_right),
            Element::RawText(_) => continue,
        };
        if trim_left && i > 0 {
            if let Element::RawText(text) = &mut elements[i - 1] {
                text.truncate(text.trim_end().len());
            }
        }
        if trim_right && i + 1 < elements.len() {
            if let Element::RawText(text) = &mut elements[i + 1] {
                *text = text.trim_start().to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_flat_template() {
        let t = Template::compile("t", "name: {{ .name }}\n").unwrap();
        assert_eq!(t.nodes.len(), 3);
        assert!(matches!(&t.nodes[0], Node::Text(s) if s == "name: "));
        assert!(matches!(&t.nodes[1], Node::Expr { .. }));
    }

    #[test]
    fn test_compile_if_block() {
        let t = Template::compile("t", "{{if .on}}a{{else if .off}}b{{else}}c{{end}}").unwrap();
        match &t.nodes[0] {
            Node::Cond { arms, fallback } => {
                assert_eq!(arms.len(), 2);
                assert!(fallback.is_some());
            }
            other => panic!("expected cond, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_nested_blocks() {
        let t = Template::compile(
            "t",
            "{{range .items}}{{if .on}}x{{end}}{{end}}",
        )
        .unwrap();
        match &t.nodes[0] {
            Node::Range { body, .. } => assert!(matches!(&body[0], Node::Cond { .. })),
            other => panic!("expected range, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_end_is_compile_error() {
        let err = Template::compile("t", "{{if .on}}a").unwrap_err();
        assert!(err.message.contains("missing {{end}}"));
    }

    #[test]
    fn test_stray_end_is_compile_error() {
        let err = Template::compile("t", "a{{end}}").unwrap_err();
        assert!(err.message.contains("unexpected {{end}}"));
    }

    #[test]
    fn test_stray_else_is_compile_error() {
        assert!(Template::compile("t", "{{else}}").is_err());
    }

    #[test]
    fn test_double_else_is_compile_error() {
        let err = Template::compile("t", "{{if .a}}1{{else}}2{{else}}3{{end}}").unwrap_err();
        assert!(err.message.contains("after {{else}}"));
    }

    #[test]
    fn test_syntax_error_reports_location() {
        let err = Template::compile("t", "ok {{ %bad }}").unwrap_err();
        assert!(err.span.is_some());
    }

    #[test]
    fn test_trim_markers_strip_whitespace() {
        let t = Template::compile("t", "a  {{- .x -}}  b").unwrap();
        assert!(matches!(&t.nodes[0], Node::Text(s) if s == "a"));
        assert!(matches!(&t.nodes[2], Node::Text(s) if s == "b"));
    }

    #[test]
    fn test_comment_produces_no_node() {
        let t = Template::compile("t", "a{{/* ignored */}}b").unwrap();
        assert_eq!(t.nodes.len(), 2);
    }
}
