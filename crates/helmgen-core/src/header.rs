//! Generator directive discovery from file headers

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// One discovered generator instruction.
///
/// Command and arguments are the raw header tokens, before environment
/// expansion. Consumed once by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateDirective {
    /// File whose first line carried the directive.
    pub file: PathBuf,
    /// Command name token.
    pub command: String,
    /// Ordered argument tokens.
    pub args: Vec<String>,
}

/// Extract a directive's command text from a header line.
///
/// Exactly three forms are recognized, matched byte-for-byte against the
/// start of the line. Matching is case-sensitive with a single mandatory
/// space after the `helm:generate` token:
///
/// ```text
/// #helm:generate <command> [args...]
/// //helm:generate <command> [args...]
/// /*helm:generate <command> [args...]*/
/// ```
///
/// The rest of the line is split on whitespace; the first token is the
/// command name, the remainder the argument list. There is no quoting.
pub fn parse_line(line: &str) -> Option<(String, Vec<String>)> {
    let rest = if let Some(rest) = line.strip_prefix("#helm:generate ") {
        rest
    } else if let Some(rest) = line.strip_prefix("//helm:generate ") {
        rest
    } else if let Some(rest) = line.strip_prefix("/*helm:generate ") {
        rest.strip_suffix("*/").unwrap_or(rest)
    } else {
        return None;
    };

    let mut tokens = rest.split_whitespace().map(String::from);
    let command = tokens.next()?;
    Some((command, tokens.collect()))
}

/// Scan a file for a generator directive.
///
/// Only the literal first line is ever inspected; no other line can carry
/// a directive. Empty files and files whose first line is not valid UTF-8
/// are treated as "no directive", never as an error.
pub fn scan_file(path: &Path) -> Result<Option<GenerateDirective>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) => return Ok(None),
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::InvalidData => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let line = line.trim_end_matches(['\n', '\r']);

    Ok(parse_line(line).map(|(command, args)| GenerateDirective {
        file: path.to_path_buf(),
        command,
        args,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_all_three_forms_extract_identical_directives() {
        let expected = Some((
            "tpl".to_string(),
            vec!["-o".to_string(), "out.yaml".to_string()],
        ));

        assert_eq!(parse_line("#helm:generate tpl -o out.yaml"), expected);
        assert_eq!(parse_line("//helm:generate tpl -o out.yaml"), expected);
        assert_eq!(parse_line("/*helm:generate tpl -o out.yaml*/"), expected);
    }

    #[test]
    fn test_comment_suffix_stripped_before_tokenization() {
        let (command, args) = parse_line("/*helm:generate gen a b*/").unwrap();
        assert_eq!(command, "gen");
        assert_eq!(args, vec!["a", "b"]);

        // A space before the closing marker leaves the tokens unchanged.
        let (command, args) = parse_line("/*helm:generate gen a b */").unwrap();
        assert_eq!(command, "gen");
        assert_eq!(args, vec!["a", "b"]);
    }

    #[test]
    fn test_case_sensitive_match() {
        assert_eq!(parse_line("#Helm:Generate tpl"), None);
        assert_eq!(parse_line("#HELM:GENERATE tpl"), None);
        assert_eq!(parse_line("//helm:Generate tpl"), None);
    }

    #[test]
    fn test_space_is_mandatory_and_single() {
        assert_eq!(parse_line("# helm:generate tpl"), None);
        assert_eq!(parse_line("#helm:generate"), None);
        assert_eq!(parse_line(" #helm:generate tpl"), None);
        // Extra spaces after the mandatory one are argument whitespace.
        assert!(parse_line("#helm:generate  tpl").is_some());
    }

    #[test]
    fn test_no_command_token_is_no_directive() {
        assert_eq!(parse_line("#helm:generate "), None);
        assert_eq!(parse_line("#helm:generate    "), None);
        assert_eq!(parse_line("/*helm:generate */"), None);
    }

    #[test]
    fn test_non_matching_lines() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("name: value"), None);
        assert_eq!(parse_line("#!/bin/sh"), None);
        assert_eq!(parse_line("--helm:generate tpl"), None);
    }

    #[test]
    fn test_scan_only_first_line() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("late.yaml");
        std::fs::write(&path, "name: value\n#helm:generate tpl\n").unwrap();

        assert_eq!(scan_file(&path).unwrap(), None);
    }

    #[test]
    fn test_scan_matching_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gen.yaml");
        std::fs::write(&path, "//helm:generate gen --fast\nbody\n").unwrap();

        let directive = scan_file(&path).unwrap().unwrap();
        assert_eq!(directive.file, path);
        assert_eq!(directive.command, "gen");
        assert_eq!(directive.args, vec!["--fast"]);
    }

    #[test]
    fn test_scan_empty_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty");
        std::fs::write(&path, "").unwrap();

        assert_eq!(scan_file(&path).unwrap(), None);
    }

    #[test]
    fn test_scan_binary_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blob.bin");
        std::fs::write(&path, [0xffu8, 0xfe, 0x00, 0x01, b'\n']).unwrap();

        assert_eq!(scan_file(&path).unwrap(), None);
    }

    #[test]
    fn test_scan_crlf_line_ending() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("dos.yaml");
        std::fs::write(&path, "#helm:generate gen\r\nbody\r\n").unwrap();

        let directive = scan_file(&path).unwrap().unwrap();
        assert_eq!(directive.command, "gen");
        assert!(directive.args.is_empty());
    }
}
