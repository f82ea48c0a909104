//! Horn-clause program text
//!
//! Compiles a `ClauseDatabase` into Prolog-style text and reads it back.
//!
//! ```text
//! % CLAUSES:
//! 'Repair a flat tire' :-
//!     'Patch the tube';
//!     'Replace the tube'.
//! 'Patch the tube' :-
//!     'Find the leak',
//!     'Apply a patch'.
//! 'Find the leak'.
//! ```

use crate::clauses::{Body, ClauseDatabase};
use crate::types::{Goal, Model};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use thiserror::Error;

const INDENT: &str = "    ";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    #[error("malformed body for '{head}': fail mixed with other atoms {body:?}")]
    MalformedBody { head: String, body: Vec<String> },

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("failed to format program text")]
    Format(#[from] std::fmt::Error),
}

/// Rule connective, which also fixes the file suffix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Neck {
    /// `:-`, written to `.pro` files
    #[default]
    Prolog,
    /// `:`, written to `.nat` files
    Natural,
}

impl Neck {
    pub fn symbol(&self) -> &'static str {
        match self {
            Neck::Prolog => ":-",
            Neck::Natural => ":",
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Neck::Prolog => "pro",
            Neck::Natural => "nat",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "prolog" | ":-" | "pro" => Some(Neck::Prolog),
            "natural" | ":" | "nat" => Some(Neck::Natural),
            _ => None,
        }
    }
}

/// Quote an atom, doubling embedded single quotes
pub fn quote(atom: &Goal) -> String {
    format!("'{}'", atom.as_str().replace('\'', "''"))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProgramCompiler {
    neck: Neck,
}

impl ProgramCompiler {
    pub fn new(neck: Neck) -> Self {
        Self { neck }
    }

    pub fn neck(&self) -> Neck {
        self.neck
    }

    /// Render the database as program text
    ///
    /// First pass: one disjunctive rule per head over its non-empty,
    /// non-`fail` bodies. Second pass: a bare fact per empty body (or per
    /// head with no bodies at all) and a `fail` rule per blocked body.
    pub fn compile(&self, db: &ClauseDatabase) -> Result<String, ProgramError> {
        let mut out = String::from("% CLAUSES:\n");
        let neck = self.neck.symbol();

        for (head, bodies) in db.iter() {
            let rules: Vec<&Body> = bodies
                .iter()
                .filter(|body| !body.is_empty())
                .map(|body| check_body(head, body).map(|blocked| (body, blocked)))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .filter(|(_, blocked)| !blocked)
                .map(|(body, _)| body)
                .collect();

            if rules.is_empty() {
                continue;
            }

            writeln!(out, "{} {}", quote(head), neck)?;
            for (i, body) in rules.iter().enumerate() {
                let last_body = i + 1 == rules.len();
                for (j, atom) in body.iter().enumerate() {
                    let end = if j + 1 < body.len() {
                        ","
                    } else if last_body {
                        "."
                    } else {
                        ";"
                    };
                    writeln!(out, "{}{}{}", INDENT, quote(atom), end)?;
                }
            }
        }

        for (head, bodies) in db.iter() {
            if bodies.is_empty() {
                writeln!(out, "{}.", quote(head))?;
            }
            for body in bodies {
                if body.is_empty() {
                    writeln!(out, "{}.", quote(head))?;
                } else if check_body(head, body)? {
                    writeln!(out, "{} {} fail.", quote(head), neck)?;
                }
            }
        }

        Ok(out)
    }
}

/// `Ok(true)` for a blocked body (`[fail]`), error when `fail` is mixed in
fn check_body(head: &Goal, body: &Body) -> Result<bool, ProgramError> {
    match body.as_slice() {
        [only] if only.is_fail() => Ok(true),
        atoms if atoms.iter().any(Goal::is_fail) => Err(ProgramError::MalformedBody {
            head: head.to_string(),
            body: atoms.iter().map(|a| a.to_string()).collect(),
        }),
        _ => Ok(false),
    }
}

/// Render a model: header comment, then one fact per line, the initiator
/// flagged by a trailing comment
pub fn render_model(initiator: &Goal, model: &Model) -> String {
    let mut out = format!("% MODEL: {} facts\n", model.len());
    for fact in model.iter() {
        out.push_str(&quote(fact));
        out.push('.');
        if fact == initiator {
            out.push_str(" % <== initiator");
        }
        out.push('\n');
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Atom(Goal),
    Fail,
    Neck,
    Comma,
    Semicolon,
    Dot,
}

fn tokenize(text: &str) -> Result<Vec<(Token, usize)>, ProgramError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    let mut line = 1;

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '%' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                        break;
                    }
                }
            }
            '\'' => {
                let start = line;
                let mut atom = String::new();
                loop {
                    match chars.next() {
                        Some('\'') if chars.peek() == Some(&'\'') => {
                            chars.next();
                            atom.push('\'');
                        }
                        Some('\'') => break,
                        Some(c) => {
                            if c == '\n' {
                                line += 1;
                            }
                            atom.push(c);
                        }
                        None => {
                            return Err(ProgramError::Parse {
                                line: start,
                                message: "unterminated quoted atom".to_string(),
                            })
                        }
                    }
                }
                tokens.push((Token::Atom(Goal::verbatim(atom)), start));
            }
            ':' => {
                if chars.peek() == Some(&'-') {
                    chars.next();
                }
                tokens.push((Token::Neck, line));
            }
            ',' => tokens.push((Token::Comma, line)),
            ';' => tokens.push((Token::Semicolon, line)),
            '.' => tokens.push((Token::Dot, line)),
            c if c.is_alphabetic() => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if word == "fail" {
                    tokens.push((Token::Fail, line));
                } else {
                    return Err(ProgramError::Parse {
                        line,
                        message: format!("unquoted atom '{}'", word),
                    });
                }
            }
            other => {
                return Err(ProgramError::Parse {
                    line,
                    message: format!("unexpected character '{}'", other),
                })
            }
        }
    }

    Ok(tokens)
}

/// Read program text (either connective) back into a database
///
/// A disjunctive rule yields one body per `;`-separated conjunction, bare
/// facts yield empty bodies and `:- fail` yields a `[fail]` body.
pub fn parse_program(text: &str) -> Result<ClauseDatabase, ProgramError> {
    let tokens = tokenize(text)?;
    let mut db = ClauseDatabase::new();
    let mut pos = 0;

    let unexpected = |pos: usize, expected: &str| -> ProgramError {
        match tokens.get(pos) {
            Some((token, line)) => ProgramError::Parse {
                line: *line,
                message: format!("expected {}, found {:?}", expected, token),
            },
            None => ProgramError::Parse {
                line: tokens.last().map_or(1, |(_, line)| *line),
                message: format!("expected {}, found end of input", expected),
            },
        }
    };

    while pos < tokens.len() {
        let head = match &tokens[pos].0 {
            Token::Atom(atom) => atom.clone(),
            _ => return Err(unexpected(pos, "clause head")),
        };
        pos += 1;

        match tokens.get(pos).map(|(t, _)| t) {
            Some(Token::Dot) => {
                db.record(head, Vec::new());
                pos += 1;
            }
            Some(Token::Neck) => {
                pos += 1;
                if let Some(Token::Fail) = tokens.get(pos).map(|(t, _)| t) {
                    if tokens.get(pos + 1).map(|(t, _)| t) != Some(&Token::Dot) {
                        return Err(unexpected(pos + 1, "'.' after fail"));
                    }
                    db.record(head, vec![Goal::fail()]);
                    pos += 2;
                    continue;
                }

                let mut body = Vec::new();
                loop {
                    match tokens.get(pos).map(|(t, _)| t) {
                        Some(Token::Atom(atom)) => body.push(atom.clone()),
                        _ => return Err(unexpected(pos, "body atom")),
                    }
                    pos += 1;
                    match tokens.get(pos).map(|(t, _)| t) {
                        Some(Token::Comma) => {}
                        Some(Token::Semicolon) => {
                            db.record(head.clone(), std::mem::take(&mut body));
                        }
                        Some(Token::Dot) => {
                            db.record(head.clone(), std::mem::take(&mut body));
                            pos += 1;
                            break;
                        }
                        _ => return Err(unexpected(pos, "',', ';' or '.'")),
                    }
                    pos += 1;
                }
            }
            _ => return Err(unexpected(pos, "'.' or rule connective")),
        }
    }

    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(s: &str) -> Goal {
        Goal::verbatim(s)
    }

    fn body(atoms: &[&str]) -> Body {
        atoms.iter().map(|a| g(a)).collect()
    }

    #[test]
    fn test_disjunctive_rule_then_fact() {
        let mut db = ClauseDatabase::new();
        db.record(g("X"), body(&["a", "b"]));
        db.record(g("X"), Vec::new());

        let text = ProgramCompiler::default().compile(&db).unwrap();
        assert_eq!(text, "% CLAUSES:\n'X' :-\n    'a',\n    'b'.\n'X'.\n");
    }

    #[test]
    fn test_multiple_bodies_share_one_rule() {
        let mut db = ClauseDatabase::new();
        db.record(g("h"), body(&["a"]));
        db.record(g("h"), body(&["b", "c"]));

        let text = ProgramCompiler::default().compile(&db).unwrap();
        assert_eq!(text, "% CLAUSES:\n'h' :-\n    'a';\n    'b',\n    'c'.\n");
    }

    #[test]
    fn test_fail_body_and_natural_neck() {
        let mut db = ClauseDatabase::new();
        db.record(g("blocked"), vec![Goal::fail()]);
        db.record(g("h"), body(&["a"]));

        let compiler = ProgramCompiler::new(Neck::Natural);
        let text = compiler.compile(&db).unwrap();
        assert_eq!(
            text,
            "% CLAUSES:\n'h' :\n    'a'.\n'blocked' : fail.\n"
        );
        assert_eq!(compiler.neck().suffix(), "nat");
    }

    #[test]
    fn test_fail_mixed_into_body_is_rejected() {
        let mut db = ClauseDatabase::new();
        db.record(g("h"), vec![g("a"), Goal::fail()]);

        let err = ProgramCompiler::default().compile(&db).unwrap_err();
        assert!(matches!(err, ProgramError::MalformedBody { .. }));
    }

    #[test]
    fn test_format_failure_is_a_program_error() {
        let err: ProgramError = std::fmt::Error.into();
        assert_eq!(err, ProgramError::Format(std::fmt::Error));
        assert_eq!(err.to_string(), "failed to format program text");
    }

    #[test]
    fn test_quotes_are_escaped() {
        let mut db = ClauseDatabase::new();
        db.record(g("driver's seat"), Vec::new());
        let text = ProgramCompiler::default().compile(&db).unwrap();
        assert!(text.contains("'driver''s seat'."));

        let back = parse_program(&text).unwrap();
        assert_eq!(back, db);
    }

    #[test]
    fn test_round_trip_rules() {
        let mut db = ClauseDatabase::new();
        db.record(g("top"), body(&["one"]));
        db.record(g("top"), body(&["two"]));
        db.record(g("one"), body(&["x", "y"]));
        db.record(g("false"), body(&["one", "two"]));

        for neck in [Neck::Prolog, Neck::Natural] {
            let text = ProgramCompiler::new(neck).compile(&db).unwrap();
            assert_eq!(parse_program(&text).unwrap(), db);
        }
    }

    #[test]
    fn test_round_trip_moves_facts_after_rules() {
        let mut db = ClauseDatabase::new();
        db.record(g("leaf"), Vec::new());
        db.record(g("top"), Vec::new());
        db.record(g("top"), body(&["leaf"]));
        db.record(g("stop"), vec![Goal::fail()]);

        let text = ProgramCompiler::default().compile(&db).unwrap();
        let back = parse_program(&text).unwrap();

        // rule bodies come first, facts and fail rules follow per head
        assert_eq!(back.bodies(&g("top")).unwrap(), &[body(&["leaf"]), Body::new()]);
        assert_eq!(back.bodies(&g("leaf")).unwrap(), &[Body::new()]);
        assert_eq!(back.bodies(&g("stop")).unwrap(), &[vec![Goal::fail()]]);
        assert_eq!(back.clause_count(), db.clause_count());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_program("'a' :- 'b'"),
            Err(ProgramError::Parse { .. })
        ));
        assert!(matches!(
            parse_program("'a' :- b."),
            Err(ProgramError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            parse_program("% ok\n'a\n"),
            Err(ProgramError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_render_model_flags_initiator() {
        let model: Model = ["Fix it", "tool"].iter().map(|s| g(s)).collect();
        let text = render_model(&g("Fix it"), &model);
        assert_eq!(
            text,
            "% MODEL: 2 facts\n'Fix it'. % <== initiator\n'tool'.\n"
        );
    }
}
