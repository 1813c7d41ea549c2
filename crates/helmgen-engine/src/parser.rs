//! Template parser
//!
//! Parses the template surface syntax into a flat element list using
//! pest. Block structure (`if`/`range`/`with` ... `end`) is resolved by
//! the compiler in `template`, not here.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use thiserror::Error;

use crate::ast::*;

#[derive(Parser)]
#[grammar = "template.pest"]
struct TemplateParser;

/// Parser error
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{0}")]
    Pest(Box<pest::error::Error<Rule>>),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Unexpected rule: {0:?}")]
    UnexpectedRule(Rule),
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        ParseError::Pest(Box::new(e))
    }
}

impl ParseError {
    /// Byte range of the error in the source, when known.
    pub fn span(&self) -> Option<(usize, usize)> {
        match self {
            ParseError::Pest(e) => Some(match e.location {
                pest::error::InputLocation::Pos(p) => (p, p),
                pest::error::InputLocation::Span((start, end)) => (start, end),
            }),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Parse template source into a flat element list.
pub fn parse(input: &str) -> Result<Vec<Element>> {
    let pairs = TemplateParser::parse(Rule::template, input)?;

    let mut elements = Vec::new();
    for pair in pairs {
        if pair.as_rule() != Rule::template {
            continue;
        }
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::raw_text => {
                    elements.push(Element::RawText(inner.as_str().to_string()));
                }
                Rule::action => elements.push(Element::Action(parse_action(inner)?)),
                Rule::EOI => {}
                other => return Err(ParseError::UnexpectedRule(other)),
            }
        }
    }

    Ok(elements)
}

fn parse_action(pair: Pair<Rule>) -> Result<Action> {
    let span = Span {
        start: pair.as_span().start(),
        end: pair.as_span().end(),
    };
    let mut trim_left = false;
    let mut trim_right = false;
    let mut body = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::action_start => trim_left = inner.as_str().ends_with('-'),
            Rule::action_end => trim_right = inner.as_str().starts_with('-'),
            Rule::comment => body = Some(ActionBody::Comment),
            Rule::if_action => body = Some(ActionBody::If(inner_pipeline(inner)?)),
            Rule::else_if_action => body = Some(ActionBody::ElseIf(inner_pipeline(inner)?)),
            Rule::else_action => body = Some(ActionBody::Else),
            Rule::end_action => body = Some(ActionBody::End),
            Rule::with_action => body = Some(ActionBody::With(inner_pipeline(inner)?)),
            Rule::range_action => body = Some(parse_range(inner)?),
            Rule::pipeline => body = Some(ActionBody::Pipeline(parse_pipeline(inner)?)),
            other => return Err(ParseError::UnexpectedRule(other)),
        }
    }

    let body = body.ok_or(ParseError::UnexpectedRule(Rule::action))?;
    Ok(Action {
        trim_left,
        trim_right,
        body,
        span,
    })
}

/// Pull the pipeline out of a keyword action (`if`, `else if`, `with`).
fn inner_pipeline(pair: Pair<Rule>) -> Result<Pipeline> {
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::pipeline {
            return parse_pipeline(inner);
        }
    }
    Err(ParseError::UnexpectedRule(Rule::pipeline))
}

fn parse_range(pair: Pair<Rule>) -> Result<ActionBody> {
    let mut vars = None;
    let mut pipeline = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::range_clause => vars = Some(parse_range_clause(inner)),
            Rule::pipeline => pipeline = Some(parse_pipeline(inner)?),
            other => return Err(ParseError::UnexpectedRule(other)),
        }
    }

    let pipeline = pipeline.ok_or(ParseError::UnexpectedRule(Rule::range_action))?;
    Ok(ActionBody::Range { vars, pipeline })
}

fn parse_range_clause(pair: Pair<Rule>) -> RangeVars {
    let mut vars = Vec::new();

    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::range_vars {
            for var in inner.into_inner() {
                if var.as_rule() == Rule::variable {
                    vars.push(var.as_str().trim_start_matches('$').to_string());
                }
            }
        }
    }

    match vars.len() {
        0 | 1 => RangeVars {
            index_var: None,
            value_var: vars.pop().unwrap_or_else(|| "item".to_string()),
        },
        _ => RangeVars {
            index_var: Some(vars.remove(0)),
            value_var: vars.remove(0),
        },
    }
}

fn parse_pipeline(pair: Pair<Rule>) -> Result<Pipeline> {
    let mut commands = Vec::new();
    for inner in pair.into_inner() {
        commands.push(parse_command(inner)?);
    }
    Ok(Pipeline { commands })
}

fn parse_command(pair: Pair<Rule>) -> Result<Command> {
    match pair.as_rule() {
        Rule::parenthesized => {
            for inner in pair.into_inner() {
                if inner.as_rule() == Rule::pipeline {
                    return Ok(Command::Parenthesized(Box::new(parse_pipeline(inner)?)));
                }
            }
            Err(ParseError::UnexpectedRule(Rule::parenthesized))
        }
        Rule::function_call => {
            let mut name = String::new();
            let mut args = Vec::new();

            for inner in pair.into_inner() {
                if inner.as_rule() == Rule::identifier {
                    name = inner.as_str().to_string();
                } else {
                    args.push(parse_argument(inner)?);
                }
            }

            Ok(Command::Function { name, args })
        }
        Rule::variable => {
            let name = pair.as_str().trim_start_matches('$').to_string();
            Ok(Command::Variable(name))
        }
        Rule::field_chain => Ok(Command::Field(parse_field_chain(pair))),
        Rule::string_literal | Rule::number | Rule::boolean | Rule::nil => {
            Ok(Command::Literal(parse_literal(pair)?))
        }
        Rule::bare_identifier => {
            // A bare identifier is a function call with no arguments
            // (like `randAlphaNum` piped into, or a niladic helper).
            let name = pair
                .into_inner()
                .next()
                .map(|p| p.as_str().to_string())
                .unwrap_or_default();
            Ok(Command::Function { name, args: vec![] })
        }
        other => Err(ParseError::UnexpectedRule(other)),
    }
}

fn parse_argument(pair: Pair<Rule>) -> Result<Argument> {
    match pair.as_rule() {
        Rule::field_chain => Ok(Argument::Field(parse_field_chain(pair))),
        Rule::variable => Ok(Argument::Variable(
            pair.as_str().trim_start_matches('$').to_string(),
        )),
        Rule::string_literal | Rule::number | Rule::boolean | Rule::nil => {
            Ok(Argument::Literal(parse_literal(pair)?))
        }
        Rule::parenthesized => {
            for inner in pair.into_inner() {
                if inner.as_rule() == Rule::pipeline {
                    return Ok(Argument::Pipeline(Box::new(parse_pipeline(inner)?)));
                }
            }
            Err(ParseError::UnexpectedRule(Rule::parenthesized))
        }
        other => Err(ParseError::UnexpectedRule(other)),
    }
}

fn parse_field_chain(pair: Pair<Rule>) -> FieldAccess {
    let text = pair.as_str();
    let is_root = text.starts_with('$');

    let path_str = text
        .trim_start_matches('$')
        .trim_start_matches('.');

    let path: Vec<String> = path_str
        .split('.')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    FieldAccess { is_root, path }
}

fn parse_literal(pair: Pair<Rule>) -> Result<Literal> {
    match pair.as_rule() {
        Rule::string_literal => Ok(Literal::String(parse_string_literal(pair.as_str()))),
        Rule::number => {
            let text = pair.as_str();
            if text.contains('.') {
                let n: f64 = text
                    .parse()
                    .map_err(|_| ParseError::InvalidNumber(text.to_string()))?;
                Ok(Literal::Float(n))
            } else {
                let n: i64 = text
                    .parse()
                    .map_err(|_| ParseError::InvalidNumber(text.to_string()))?;
                Ok(Literal::Int(n))
            }
        }
        Rule::boolean => Ok(Literal::Bool(pair.as_str() == "true")),
        Rule::nil => Ok(Literal::Nil),
        other => Err(ParseError::UnexpectedRule(other)),
    }
}

fn parse_string_literal(text: &str) -> String {
    // Backtick strings are taken verbatim.
    if text.starts_with('`') {
        return text.trim_matches('`').to_string();
    }

    let inner = text
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(text);

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_pipeline(input: &str) -> Pipeline {
        let elements = parse(input).unwrap();
        assert_eq!(elements.len(), 1);
        match &elements[0] {
            Element::Action(Action {
                body: ActionBody::Pipeline(p),
                ..
            }) => p.clone(),
            other => panic!("expected pipeline action, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_raw_text() {
        let elements = parse("name: app\nkind: config").unwrap();
        assert_eq!(elements.len(), 1);
        assert!(matches!(&elements[0], Element::RawText(t) if t.contains("name: app")));
    }

    #[test]
    fn test_parse_field_access() {
        let p = single_pipeline("{{ .Namespace }}");
        assert_eq!(p.commands.len(), 1);
        match &p.commands[0] {
            Command::Field(f) => {
                assert!(!f.is_root);
                assert_eq!(f.path, vec!["Namespace"]);
            }
            other => panic!("expected field, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_nested_field_and_root() {
        let p = single_pipeline("{{ $.app.name }}");
        match &p.commands[0] {
            Command::Field(f) => {
                assert!(f.is_root);
                assert_eq!(f.path, vec!["app", "name"]);
            }
            other => panic!("expected field, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_dot() {
        let p = single_pipeline("{{ . }}");
        match &p.commands[0] {
            Command::Field(f) => {
                assert!(!f.is_root);
                assert!(f.path.is_empty());
            }
            other => panic!("expected field, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_function_call() {
        let p = single_pipeline(r#"{{default "helm" .Namespace}}"#);
        match &p.commands[0] {
            Command::Function { name, args } => {
                assert_eq!(name, "default");
                assert_eq!(args.len(), 2);
                assert_eq!(args[0], Argument::Literal(Literal::String("helm".into())));
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_pipeline_chain() {
        let p = single_pipeline(r#"{{ .name | upper | quote }}"#);
        assert_eq!(p.commands.len(), 3);
        assert!(matches!(&p.commands[1], Command::Function { name, args } if name == "upper" && args.is_empty()));
    }

    #[test]
    fn test_parse_parenthesized_argument() {
        let p = single_pipeline(r#"{{ default (randAlphaNum 8) .token }}"#);
        match &p.commands[0] {
            Command::Function { name, args } => {
                assert_eq!(name, "default");
                assert!(matches!(&args[0], Argument::Pipeline(_)));
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_literals() {
        let p = single_pipeline(r#"{{ printf "%s" 3 1.5 true nil }}"#);
        match &p.commands[0] {
            Command::Function { args, .. } => {
                assert_eq!(args[1], Argument::Literal(Literal::Int(3)));
                assert_eq!(args[2], Argument::Literal(Literal::Float(1.5)));
                assert_eq!(args[3], Argument::Literal(Literal::Bool(true)));
                assert_eq!(args[4], Argument::Literal(Literal::Nil));
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_string_escapes() {
        let p = single_pipeline(r#"{{ default "a\"b\n" .x }}"#);
        match &p.commands[0] {
            Command::Function { args, .. } => {
                assert_eq!(args[0], Argument::Literal(Literal::String("a\"b\n".into())));
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_trim_markers() {
        let elements = parse("a {{- .x -}} b").unwrap();
        match &elements[1] {
            Element::Action(action) => {
                assert!(action.trim_left);
                assert!(action.trim_right);
            }
            other => panic!("expected action, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_if_else_end() {
        let elements = parse("{{if .on}}yes{{else}}no{{end}}").unwrap();
        assert_eq!(elements.len(), 5);
        assert!(matches!(
            &elements[0],
            Element::Action(Action { body: ActionBody::If(_), .. })
        ));
        assert!(matches!(
            &elements[2],
            Element::Action(Action { body: ActionBody::Else, .. })
        ));
        assert!(matches!(
            &elements[4],
            Element::Action(Action { body: ActionBody::End, .. })
        ));
    }

    #[test]
    fn test_parse_range_with_vars() {
        let elements = parse("{{range $i, $v := .items}}{{ $v }}{{end}}").unwrap();
        match &elements[0] {
            Element::Action(Action {
                body: ActionBody::Range { vars, .. },
                ..
            }) => {
                let vars = vars.as_ref().unwrap();
                assert_eq!(vars.index_var.as_deref(), Some("i"));
                assert_eq!(vars.value_var, "v");
            }
            other => panic!("expected range, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_range_without_vars() {
        let elements = parse("{{range .items}}x{{end}}").unwrap();
        assert!(matches!(
            &elements[0],
            Element::Action(Action {
                body: ActionBody::Range { vars: None, .. },
                ..
            })
        ));
    }

    #[test]
    fn test_parse_comment() {
        let elements = parse("{{/* ignored */}}rest").unwrap();
        assert!(matches!(
            &elements[0],
            Element::Action(Action { body: ActionBody::Comment, .. })
        ));
        assert_eq!(elements[1], Element::RawText("rest".to_string()));
    }

    #[test]
    fn test_parse_keyword_prefixed_identifier() {
        // `endpoint` must not be mistaken for `end`.
        let p = single_pipeline("{{ endpoint }}");
        assert!(matches!(&p.commands[0], Command::Function { name, .. } if name == "endpoint"));
    }

    #[test]
    fn test_parse_error_on_unclosed_action() {
        assert!(parse("{{ .x ").is_err());
        assert!(parse("{{ }}").is_err());
    }
}
