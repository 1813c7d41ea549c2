//! AST for parsed template documents
//!
//! These structures represent a template after parsing: a flat sequence
//! of raw-text runs and `{{ }}` actions. The compiler in `template`
//! folds the flat sequence into a block tree for evaluation.

/// Byte range of a parsed construct in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// An element in a template: either raw text or an action.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Raw text (not inside `{{ }}`)
    RawText(String),
    /// An action (inside `{{ }}`)
    Action(Action),
}

/// An action (directive inside `{{ }}`)
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// Whether the action trims preceding whitespace (`{{-`)
    pub trim_left: bool,
    /// Whether the action trims following whitespace (`-}}`)
    pub trim_right: bool,
    /// The action body
    pub body: ActionBody,
    /// Location of the action in the source
    pub span: Span,
}

/// The body of an action
#[derive(Debug, Clone, PartialEq)]
pub enum ActionBody {
    /// Comment: `{{/* note */}}`; produces no output
    Comment,
    /// If: `{{if .X}}`
    If(Pipeline),
    /// Else-if: `{{else if .X}}`
    ElseIf(Pipeline),
    /// Else: `{{else}}`
    Else,
    /// End: `{{end}}`
    End,
    /// Range: `{{range .X}}` or `{{range $i, $v := .X}}`
    Range {
        /// Optional variable declarations (`$i`, `$v`)
        vars: Option<RangeVars>,
        /// The pipeline to iterate over
        pipeline: Pipeline,
    },
    /// With: `{{with .X}}`
    With(Pipeline),
    /// A pipeline expression (field access, function call, ...)
    Pipeline(Pipeline),
}

/// Variables in a range clause: `$i, $v := ...`
#[derive(Debug, Clone, PartialEq)]
pub struct RangeVars {
    /// Index variable (optional): `$i` in `range $i, $v := .X`
    pub index_var: Option<String>,
    /// Value variable: `$v`
    pub value_var: String,
}

/// A pipeline: a sequence of commands separated by `|`.
///
/// The first command produces a value; each later command is a function
/// call receiving the previous value as its final argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

/// A single command in a pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Field access: `.a.b`, `$.a`, `.` or `$`
    Field(FieldAccess),
    /// Variable reference: `$v`
    Variable(String),
    /// Literal value
    Literal(Literal),
    /// Function call: `default "x" .y`; a bare identifier is a call
    /// with no arguments
    Function { name: String, args: Vec<Argument> },
    /// Parenthesized pipeline: `(eq .a "x")`
    Parenthesized(Box<Pipeline>),
}

/// Field access relative to the cursor or the root
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAccess {
    /// True for `$.a.b` / `$` (always resolved from the root value)
    pub is_root: bool,
    /// Key path; empty for bare `.` or `$`
    pub path: Vec<String>,
}

/// An argument to a function call
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Field(FieldAccess),
    Variable(String),
    Literal(Literal),
    Pipeline(Box<Pipeline>),
}

/// A literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Nil,
}
