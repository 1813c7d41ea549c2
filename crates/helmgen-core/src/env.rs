//! Per-directive execution environment

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Settings shared by every directive in one generation run.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Home directory, exported as `HELM_HOME`.
    pub home: PathBuf,
    /// Default repository string, exported as `HELM_DEFAULT_REPO`.
    /// Consumed as an opaque value; alias resolution happens elsewhere.
    pub default_repo: String,
}

impl GenerateConfig {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(home: P, default_repo: S) -> Self {
        Self {
            home: home.into(),
            default_repo: default_repo.into(),
        }
    }
}

/// The environment for one directive's execution.
///
/// Holds every variable inherited from the invoking process plus four
/// fixed entries: `HELM_HOME`, `HELM_DEFAULT_REPO`, `HELM_GENERATE_FILE`
/// (the file that carried the directive) and `HELM_GENERATE_DIR` (the
/// chart root). Built fresh per directive; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    vars: HashMap<String, String>,
}

impl ExecutionContext {
    /// Build the context for a directive found in `file` under `chart_root`.
    pub fn build(chart_root: &Path, file: &Path, config: &GenerateConfig) -> Self {
        Self::with_inherited(std::env::vars().collect(), chart_root, file, config)
    }

    /// Build from an explicit inherited-variable map.
    ///
    /// The fixed entries are overlaid last, so they shadow inherited
    /// variables of the same name.
    pub fn with_inherited(
        mut vars: HashMap<String, String>,
        chart_root: &Path,
        file: &Path,
        config: &GenerateConfig,
    ) -> Self {
        vars.insert("HELM_HOME".to_string(), config.home.display().to_string());
        vars.insert(
            "HELM_DEFAULT_REPO".to_string(),
            config.default_repo.clone(),
        );
        vars.insert(
            "HELM_GENERATE_FILE".to_string(),
            file.display().to_string(),
        );
        vars.insert(
            "HELM_GENERATE_DIR".to_string(),
            chart_root.display().to_string(),
        );
        Self { vars }
    }

    /// Look up a variable.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// All variables, for handing to a child process.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Expand `$NAME` and `${NAME}` references in a token.
    ///
    /// Pure textual substitution: no globbing, quoting, command
    /// substitution or redirection. An undefined reference expands to the
    /// empty string. `$$` yields a literal `$`.
    pub fn expand(&self, token: &str) -> String {
        let mut out = String::with_capacity(token.len());
        let mut chars = token.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                out.push(c);
                continue;
            }
            match chars.peek() {
                Some(&'$') => {
                    chars.next();
                    out.push('$');
                }
                Some(&'{') => {
                    chars.next();
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if closed {
                        out.push_str(self.get(&name).unwrap_or(""));
                    } else {
                        // Unterminated reference: keep the text as written.
                        out.push_str("${");
                        out.push_str(&name);
                    }
                }
                Some(&c) if c.is_ascii_alphabetic() || c == '_' => {
                    let mut name = String::new();
                    while let Some(&c) = chars.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            name.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    out.push_str(self.get(&name).unwrap_or(""));
                }
                _ => out.push('$'),
            }
        }

        out
    }
}
