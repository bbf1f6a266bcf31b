// command.rs — Structured command tokenizer and AST.
//
// Command strings name a class of agent work ("notion sync --workspace ops").
// The grammar is deliberately small: whitespace-separated tokens, double
// quotes group a token containing spaces, `--flag` and `--flag=value`
// tokens become flags, everything else is positional.
//
// The normalized form (tokens re-joined with single spaces) is the
// canonical representation hashed by both fingerprint families, so
// "notion  sync" and "notion sync" identify the same command class.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// Parsed command string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandLine {
    /// First token — the program or integration name.
    pub program: String,
    /// Positional arguments in order.
    pub args: Vec<String>,
    /// `--flag` / `--flag=value` pairs. Bare flags map to `None`.
    pub flags: BTreeMap<String, Option<String>>,
    /// All tokens in original order, quotes resolved.
    tokens: Vec<String>,
}

impl CommandLine {
    /// Tokenize and parse a command string.
    pub fn parse(input: &str) -> Result<Self, PlanError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(PlanError::EmptyCommand);
        }

        let program = tokens[0].clone();
        let mut args = Vec::new();
        let mut flags = BTreeMap::new();

        for token in &tokens[1..] {
            if let Some(flag) = token.strip_prefix("--") {
                match flag.split_once('=') {
                    Some((name, value)) => {
                        flags.insert(name.to_string(), Some(value.to_string()));
                    }
                    None => {
                        flags.insert(flag.to_string(), None);
                    }
                }
            } else {
                args.push(token.clone());
            }
        }

        Ok(Self {
            program,
            args,
            flags,
            tokens,
        })
    }

    /// Canonical single-space form of the command.
    ///
    /// Tokens containing whitespace are re-quoted so the normalized form
    /// round-trips through [`CommandLine::parse`].
    pub fn normalized(&self) -> String {
        self.tokens
            .iter()
            .map(|t| {
                if t.chars().any(char::is_whitespace) {
                    format!("\"{}\"", t)
                } else {
                    t.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Split an input string into tokens.
///
/// Whitespace separates tokens; a double quote opens a section in which
/// whitespace is literal. Quotes may appear mid-token ("foo"bar is the
/// token foobar). An unclosed quote is an error, not a silent truncation.
fn tokenize(input: &str) -> Result<Vec<String>, PlanError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quote = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quote = !in_quote;
                in_token = true;
            }
            c if c.is_whitespace() && !in_quote => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_quote {
        return Err(PlanError::UnterminatedQuote {
            input: input.to_string(),
        });
    }
    if in_token {
        tokens.push(current);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_program_args_and_flags() {
        let cmd = CommandLine::parse("notion sync --workspace=ops --force pages").unwrap();
        assert_eq!(cmd.program, "notion");
        assert_eq!(cmd.args, vec!["sync", "pages"]);
        assert_eq!(
            cmd.flags.get("workspace"),
            Some(&Some("ops".to_string()))
        );
        assert_eq!(cmd.flags.get("force"), Some(&None));
    }

    #[test]
    fn whitespace_is_normalized() {
        let a = CommandLine::parse("notion   sync\t pages").unwrap();
        let b = CommandLine::parse("notion sync pages").unwrap();
        assert_eq!(a.normalized(), b.normalized());
        assert_eq!(a.normalized(), "notion sync pages");
    }

    #[test]
    fn quotes_group_tokens() {
        let cmd = CommandLine::parse(r#"slack post "release notes for v2""#).unwrap();
        assert_eq!(cmd.args, vec!["post", "release notes for v2"]);
    }

    #[test]
    fn normalized_requotes_spaced_tokens() {
        let cmd = CommandLine::parse(r#"slack post "hello  world""#).unwrap();
        let normalized = cmd.normalized();
        assert_eq!(normalized, r#"slack post "hello  world""#);
        // The normalized form parses back to the same AST.
        let reparsed = CommandLine::parse(&normalized).unwrap();
        assert_eq!(reparsed, cmd);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(
            CommandLine::parse("   "),
            Err(PlanError::EmptyCommand)
        ));
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert!(matches!(
            CommandLine::parse(r#"slack post "oops"#),
            Err(PlanError::UnterminatedQuote { .. })
        ));
    }

    #[test]
    fn quote_can_join_mid_token() {
        let cmd = CommandLine::parse(r#"echo foo"bar baz""#).unwrap();
        assert_eq!(cmd.args, vec!["foobar baz"]);
    }

    #[test]
    fn flag_values_may_be_empty() {
        let cmd = CommandLine::parse("job run --tag=").unwrap();
        assert_eq!(cmd.flags.get("tag"), Some(&Some(String::new())));
    }
}
