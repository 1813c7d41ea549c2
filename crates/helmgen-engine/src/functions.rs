//! Built-in template functions
//!
//! The function library is an open table from name to callable. The
//! engine seeds it with the builtins below; callers can register more
//! through `Engine::register`. Functions receive already-evaluated
//! arguments; in a pipeline the piped value arrives as the final
//! argument.

use std::collections::HashMap;
use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
use serde_json::Value as JsonValue;

/// Error raised inside a template function. The evaluator attaches the
/// failing action's source location.
#[derive(Debug)]
pub struct FunctionError(pub String);

impl fmt::Display for FunctionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for FunctionError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for FunctionError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

pub type FunctionResult = std::result::Result<JsonValue, FunctionError>;

/// A named callable in the function table.
pub type TemplateFunction = Box<dyn Fn(&[JsonValue]) -> FunctionResult + Send + Sync>;

/// Open registry mapping function names to callables.
pub struct FunctionRegistry {
    functions: HashMap<String, TemplateFunction>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// A registry seeded with the built-in function library.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("default", default);
        registry.register("b64enc", b64enc);
        registry.register("b64dec", b64dec);
        registry.register("randAlphaNum", rand_alpha_num);
        registry.register("upper", upper);
        registry.register("lower", lower);
        registry.register("title", title);
        registry.register("trim", trim);
        registry.register("trimPrefix", trim_prefix);
        registry.register("trimSuffix", trim_suffix);
        registry.register("quote", quote);
        registry.register("squote", squote);
        registry.register("repeat", repeat);
        registry.register("printf", printf);
        registry.register("len", len);
        registry.register("coalesce", coalesce);
        registry.register("eq", eq);
        registry.register("ne", ne);
        registry.register("not", not);
        registry.register("and", and);
        registry.register("or", or);
        registry
    }

    /// Register a function, replacing any previous binding of the name.
    pub fn register<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&[JsonValue]) -> FunctionResult + Send + Sync + 'static,
    {
        self.functions.insert(name.to_string(), Box::new(function));
    }

    pub fn get(&self, name: &str) -> Option<&TemplateFunction> {
        self.functions.get(name)
    }

    /// Registered names, sorted for stable messages.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

/// Closest registered name within a small edit distance, for
/// "did you mean" suggestions on unknown function names.
pub(crate) fn closest_match<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .map(|candidate| (strsim::levenshtein(input, candidate), candidate))
        .filter(|(distance, _)| *distance > 0 && *distance <= 3)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate)
}

/// String form of a value, as used for template output and the string
/// functions: strings bare, nil empty, everything else compact JSON.
pub fn stringify(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Truthiness: nil, false, zero, empty strings and empty collections are
/// falsy; everything else is truthy.
pub fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(items) => !items.is_empty(),
        JsonValue::Object(map) => !map.is_empty(),
    }
}

fn exactly(args: &[JsonValue], n: usize, usage: &str) -> Result<(), FunctionError> {
    if args.len() == n {
        Ok(())
    } else {
        Err(format!("expected {} argument(s), usage: {}", n, usage).into())
    }
}

fn at_least(args: &[JsonValue], n: usize, usage: &str) -> Result<(), FunctionError> {
    if args.len() >= n {
        Ok(())
    } else {
        Err(format!("expected at least {} argument(s), usage: {}", n, usage).into())
    }
}

/// Return the value if it is non-empty, else the fallback.
///
/// Usage: {{default "helm" .Namespace}}
fn default(args: &[JsonValue]) -> FunctionResult {
    exactly(args, 2, "default <fallback> <value>")?;
    if is_truthy(&args[1]) {
        Ok(args[1].clone())
    } else {
        Ok(args[0].clone())
    }
}

/// Base64-encode the string form of a value.
///
/// Usage: {{.password | b64enc}}
fn b64enc(args: &[JsonValue]) -> FunctionResult {
    exactly(args, 1, "b64enc <value>")?;
    Ok(JsonValue::String(STANDARD.encode(stringify(&args[0]))))
}

/// Base64-decode a string.
///
/// Usage: {{.encoded | b64dec}}
fn b64dec(args: &[JsonValue]) -> FunctionResult {
    exactly(args, 1, "b64dec <value>")?;
    let decoded = STANDARD
        .decode(stringify(&args[0]))
        .map_err(|e| FunctionError(format!("base64 decode error: {}", e)))?;
    let text = String::from_utf8(decoded)
        .map_err(|e| FunctionError(format!("UTF-8 decode error: {}", e)))?;
    Ok(JsonValue::String(text))
}

/// A freshly generated alphanumeric string of the given length.
/// Non-deterministic by design.
///
/// Usage: {{randAlphaNum 16}}
fn rand_alpha_num(args: &[JsonValue]) -> FunctionResult {
    exactly(args, 1, "randAlphaNum <n>")?;
    let n = args[0]
        .as_u64()
        .ok_or_else(|| FunctionError::from("randAlphaNum length must be a non-negative integer"))?;
    let generated: String = rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(n as usize)
        .map(char::from)
        .collect();
    Ok(JsonValue::String(generated))
}

/// Usage: {{.name | upper}}
fn upper(args: &[JsonValue]) -> FunctionResult {
    exactly(args, 1, "upper <value>")?;
    Ok(JsonValue::String(stringify(&args[0]).to_uppercase()))
}

/// Usage: {{.name | lower}}
fn lower(args: &[JsonValue]) -> FunctionResult {
    exactly(args, 1, "lower <value>")?;
    Ok(JsonValue::String(stringify(&args[0]).to_lowercase()))
}

/// Capitalize the first letter of each whitespace-separated word.
///
/// Usage: {{.name | title}}
fn title(args: &[JsonValue]) -> FunctionResult {
    exactly(args, 1, "title <value>")?;
    let text = stringify(&args[0]);
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.push(c);
        }
    }
    Ok(JsonValue::String(out))
}

/// Usage: {{.name | trim}}
fn trim(args: &[JsonValue]) -> FunctionResult {
    exactly(args, 1, "trim <value>")?;
    Ok(JsonValue::String(stringify(&args[0]).trim().to_string()))
}

/// Usage: {{.tag | trimPrefix "v"}}; the piped value is the last argument.
fn trim_prefix(args: &[JsonValue]) -> FunctionResult {
    exactly(args, 2, "trimPrefix <prefix> <value>")?;
    let prefix = stringify(&args[0]);
    let value = stringify(&args[1]);
    Ok(JsonValue::String(
        value.strip_prefix(&prefix).unwrap_or(&value).to_string(),
    ))
}

/// Usage: {{.file | trimSuffix ".yaml"}}
fn trim_suffix(args: &[JsonValue]) -> FunctionResult {
    exactly(args, 2, "trimSuffix <suffix> <value>")?;
    let suffix = stringify(&args[0]);
    let value = stringify(&args[1]);
    Ok(JsonValue::String(
        value.strip_suffix(&suffix).unwrap_or(&value).to_string(),
    ))
}

/// Double-quote the string form of a value.
///
/// Usage: {{.name | quote}}
fn quote(args: &[JsonValue]) -> FunctionResult {
    exactly(args, 1, "quote <value>")?;
    let text = stringify(&args[0]);
    Ok(JsonValue::String(format!(
        "\"{}\"",
        text.replace('\\', "\\\\").replace('"', "\\\"")
    )))
}

/// Single-quote the string form of a value.
///
/// Usage: {{.name | squote}}
fn squote(args: &[JsonValue]) -> FunctionResult {
    exactly(args, 1, "squote <value>")?;
    let text = stringify(&args[0]);
    Ok(JsonValue::String(format!("'{}'", text.replace('\'', "''"))))
}

/// Usage: {{repeat 3 "ab"}}
fn repeat(args: &[JsonValue]) -> FunctionResult {
    exactly(args, 2, "repeat <count> <value>")?;
    let count = args[0]
        .as_u64()
        .ok_or_else(|| FunctionError::from("repeat count must be a non-negative integer"))?;
    Ok(JsonValue::String(stringify(&args[1]).repeat(count as usize)))
}

/// Printf-style formatting supporting %s, %d, %f, %v and %%.
///
/// Usage: {{printf "%s-%d" .name .replicas}}
fn printf(args: &[JsonValue]) -> FunctionResult {
    at_least(args, 1, "printf <format> [args...]")?;
    let format = match &args[0] {
        JsonValue::String(s) => s.clone(),
        other => return Err(format!("printf format must be a string, got {}", type_name(other)).into()),
    };
    let rest = &args[1..];

    let mut result = String::with_capacity(format.len() + rest.len() * 10);
    let mut chars = format.chars();
    let mut arg_idx = 0;

    while let Some(c) = chars.next() {
        if c != '%' {
            result.push(c);
            continue;
        }

        let format_char = match chars.next() {
            Some(fc) => fc,
            None => {
                result.push('%');
                break;
            }
        };

        if format_char == '%' {
            result.push('%');
            continue;
        }

        if arg_idx >= rest.len() {
            return Err("not enough arguments for format string".into());
        }

        let arg = &rest[arg_idx];
        match format_char {
            's' | 'v' => result.push_str(&stringify(arg)),
            'd' => {
                if let Some(n) = arg.as_i64() {
                    result.push_str(&n.to_string());
                } else {
                    result.push_str(&stringify(arg));
                }
            }
            'f' => {
                if let Some(n) = arg.as_f64() {
                    result.push_str(&n.to_string());
                } else {
                    result.push_str(&stringify(arg));
                }
            }
            // Unknown specifier, treat as %v
            _ => result.push_str(&stringify(arg)),
        }
        arg_idx += 1;
    }

    Ok(JsonValue::String(result))
}

/// Length of a string, sequence or mapping.
///
/// Usage: {{len .items}}
fn len(args: &[JsonValue]) -> FunctionResult {
    exactly(args, 1, "len <value>")?;
    let n = match &args[0] {
        JsonValue::String(s) => s.chars().count(),
        JsonValue::Array(items) => items.len(),
        JsonValue::Object(map) => map.len(),
        other => return Err(format!("len of {}", type_name(other)).into()),
    };
    Ok(JsonValue::from(n))
}

/// First non-empty argument, or nil.
///
/// Usage: {{coalesce .override .default "fallback"}}
fn coalesce(args: &[JsonValue]) -> FunctionResult {
    for arg in args {
        if is_truthy(arg) {
            return Ok(arg.clone());
        }
    }
    Ok(JsonValue::Null)
}

/// True if the first argument equals any of the rest.
///
/// Usage: {{if eq .env "prod" "staging"}}
fn eq(args: &[JsonValue]) -> FunctionResult {
    at_least(args, 2, "eq <a> <b> [c...]")?;
    Ok(JsonValue::Bool(args[1..].iter().any(|v| v == &args[0])))
}

/// Usage: {{if ne .env "prod"}}
fn ne(args: &[JsonValue]) -> FunctionResult {
    exactly(args, 2, "ne <a> <b>")?;
    Ok(JsonValue::Bool(args[0] != args[1]))
}

/// Usage: {{if not .enabled}}
fn not(args: &[JsonValue]) -> FunctionResult {
    exactly(args, 1, "not <value>")?;
    Ok(JsonValue::Bool(!is_truthy(&args[0])))
}

/// First falsy argument, or the last one. Arguments are already
/// evaluated, so there is no short-circuiting.
///
/// Usage: {{if and .a .b}}
fn and(args: &[JsonValue]) -> FunctionResult {
    at_least(args, 1, "and <a> [b...]")?;
    for arg in args {
        if !is_truthy(arg) {
            return Ok(arg.clone());
        }
    }
    Ok(args[args.len() - 1].clone())
}

/// First truthy argument, or the last one.
///
/// Usage: {{if or .a .b}}
fn or(args: &[JsonValue]) -> FunctionResult {
    at_least(args, 1, "or <a> [b...]")?;
    for arg in args {
        if is_truthy(arg) {
            return Ok(arg.clone());
        }
    }
    Ok(args[args.len() - 1].clone())
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
