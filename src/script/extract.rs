// src/script/extract.rs

//! Declaration extraction: script text -> [`DeclarationTable`].
//!
//! A feature unit is declared by an annotation line immediately followed by
//! a function header:
//!
//! ```text
//! @myFeature(requires=["t", "m"], provides=["avg"])
//! def avg_mag(t, m):
//!     return {"avg": sum(m) / len(m)}
//! ```
//!
//! Only these two lines are inspected; function bodies are never parsed or
//! evaluated, so extraction is safe on untrusted scripts.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use tracing::debug;

use crate::dag::{DeclarationTable, UnitDeclaration};
use crate::errors::{FeaturedagError, Result};
use crate::fs::FileSystem;
use crate::script::lexer::{self, Spanned, Token};

/// Annotation names recognised as dependency declarations.
pub const ANNOTATION_NAMES: [&str; 2] = ["myFeature", "feature"];

/// Parse a script's source text into a declaration table.
pub fn extract_declarations(source: &str) -> Result<DeclarationTable> {
    let lines: Vec<&str> = source.lines().collect();
    let mut declarations = Vec::new();
    let mut first_seen: HashMap<String, usize> = HashMap::new();

    for (idx, line) in lines.iter().enumerate() {
        if !is_annotation_line(line) {
            continue;
        }

        let line_no = idx + 1;
        let (requires, provides) = parse_annotation(line, line_no)?;

        let header_line = lines.get(idx + 1).ok_or_else(|| FeaturedagError::Parse {
            line: line_no,
            message: "annotation is not followed by a function header".to_string(),
        })?;
        let name = parse_header(header_line, line_no + 1)?;

        if let Some(first) = first_seen.get(&name) {
            return Err(FeaturedagError::Parse {
                line: line_no + 1,
                message: format!("duplicate unit '{name}' (first declared at line {first})"),
            });
        }
        first_seen.insert(name.clone(), line_no + 1);

        debug!(unit = %name, line = line_no, ?requires, ?provides, "extracted unit declaration");
        declarations.push(UnitDeclaration {
            name,
            requires,
            provides,
        });
    }

    DeclarationTable::from_declarations(declarations)
}

/// Read a script through the given filesystem and extract its declarations.
pub fn extract_from_path(fs: &dyn FileSystem, path: &Path) -> Result<DeclarationTable> {
    let source = fs.read_to_string(path)?;
    extract_declarations(&source)
}

/// Sorted list of every feature name a script provides.
pub fn list_features_provided(fs: &dyn FileSystem, path: &Path) -> Result<Vec<String>> {
    let table = extract_from_path(fs, path)?;
    Ok(table.all_provided().iter().cloned().collect())
}

/// Cheap pre-check so arbitrary script lines never reach the tokenizer.
fn is_annotation_line(line: &str) -> bool {
    let Some(rest) = line.trim_start().strip_prefix('@') else {
        return false;
    };
    let rest = rest.trim_start();
    ANNOTATION_NAMES.iter().any(|name| {
        rest.strip_prefix(name)
            .is_some_and(|after| !after.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
    })
}

fn parse_annotation(line: &str, line_no: usize) -> Result<(BTreeSet<String>, BTreeSet<String>)> {
    let tokens = lexer::tokenize(line).map_err(|e| FeaturedagError::Parse {
        line: line_no,
        message: format!("{} at column {}", e.token, e.span.start + 1),
    })?;
    AnnotationParser::new(tokens, line_no).parse()
}

/// Recursive-descent parser over one annotation line.
struct AnnotationParser {
    tokens: Vec<Spanned<Token>>,
    pos: usize,
    line: usize,
}

impl AnnotationParser {
    fn new(tokens: Vec<Spanned<Token>>, line: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            line,
        }
    }

    fn parse(mut self) -> Result<(BTreeSet<String>, BTreeSet<String>)> {
        self.expect(&Token::At)?;
        match self.next() {
            Some(Token::Ident(name)) if ANNOTATION_NAMES.contains(&name.as_str()) => {}
            other => return Err(self.unexpected(other, "annotation name")),
        }
        self.expect(&Token::LParen)?;

        let mut requires = None;
        let mut provides = None;

        loop {
            if self.peek() == Some(&Token::RParen) {
                self.pos += 1;
                break;
            }

            let key = match self.next() {
                Some(Token::Ident(key)) => key,
                other => return Err(self.unexpected(other, "'requires' or 'provides'")),
            };
            self.expect(&Token::Equals)?;
            let names = self.parse_list(&key)?;

            let slot = match key.as_str() {
                "requires" => &mut requires,
                "provides" => &mut provides,
                _ => return Err(self.error(format!("unknown annotation argument '{key}'"))),
            };
            if slot.replace(names).is_some() {
                return Err(self.error(format!("'{key}' given more than once")));
            }

            match self.next() {
                Some(Token::Comma) => {}
                Some(Token::RParen) => break,
                other => return Err(self.unexpected(other, "',' or ')'")),
            }
        }

        if let Some(extra) = self.next() {
            return Err(self.unexpected(Some(extra), "end of line"));
        }

        let requires = requires.ok_or_else(|| self.error("missing 'requires' list".into()))?;
        let provides = provides.ok_or_else(|| self.error("missing 'provides' list".into()))?;
        Ok((requires, provides))
    }

    /// `[ "a", "b", ]` or `( "a", )`
    fn parse_list(&mut self, key: &str) -> Result<BTreeSet<String>> {
        let close = match self.next() {
            Some(Token::LBracket) => Token::RBracket,
            Some(Token::LParen) => Token::RParen,
            other => return Err(self.unexpected(other, &format!("list literal for '{key}'"))),
        };

        let mut names = BTreeSet::new();
        loop {
            match self.next() {
                Some(tok) if tok == close => break,
                Some(Token::Str(name)) => {
                    if name.is_empty() {
                        return Err(self.error(format!("empty name in '{key}' list")));
                    }
                    names.insert(name);
                    match self.next() {
                        Some(Token::Comma) => {}
                        Some(tok) if tok == close => break,
                        other => {
                            return Err(self.unexpected(other, &format!("',' or {close}")));
                        }
                    }
                }
                other => {
                    return Err(
                        self.unexpected(other, &format!("string literal in '{key}' list"))
                    );
                }
            }
        }

        Ok(names)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).map(|s| s.token.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, want: &Token) -> Result<()> {
        match self.next() {
            Some(ref tok) if tok == want => Ok(()),
            other => Err(self.unexpected(other, &want.to_string())),
        }
    }

    fn unexpected(&self, found: Option<Token>, expected: &str) -> FeaturedagError {
        let found = found
            .map(|t| t.to_string())
            .unwrap_or_else(|| "end of line".to_string());
        self.error(format!("expected {expected}, found {found}"))
    }

    fn error(&self, message: String) -> FeaturedagError {
        FeaturedagError::Parse {
            line: self.line,
            message,
        }
    }
}

/// Parse `[async] def <name>(` and return the function name.
///
/// The remainder of the header (parameters, return annotation) is not
/// inspected, so parameter lists may span several lines.
fn parse_header(line: &str, line_no: usize) -> Result<String> {
    let not_a_header = |detail: String| FeaturedagError::Parse {
        line: line_no,
        message: format!("annotation must be followed by a function header: {detail}"),
    };

    let tokens = lexer::leading_tokens(line, 4)
        .map_err(|e| not_a_header(format!("{} at column {}", e.token, e.span.start + 1)))?;
    let mut iter = tokens.into_iter().map(|s| s.token).peekable();

    if matches!(iter.peek(), Some(Token::Ident(kw)) if kw == "async") {
        iter.next();
    }

    match iter.next() {
        Some(Token::Def) => {}
        other => return Err(not_a_header(describe(other, "'def'"))),
    }
    let name = match iter.next() {
        Some(Token::Ident(name)) => name,
        other => return Err(not_a_header(describe(other, "function name"))),
    };
    match iter.next() {
        Some(Token::LParen) => Ok(name),
        other => Err(not_a_header(describe(other, "'('"))),
    }
}

fn describe(found: Option<Token>, expected: &str) -> String {
    match found {
        Some(tok) => format!("expected {expected}, found {tok}"),
        None => format!("expected {expected}, found end of line"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_err(source: &str) -> (usize, String) {
        match extract_declarations(source) {
            Err(FeaturedagError::Parse { line, message }) => (line, message),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn extracts_units_and_ignores_plain_functions() {
        let src = r#"
import numpy as np

def helper(x):
    return x

@myFeature(requires=["t", "m"], provides=["avg"])
def avg_mag(t, m):
    return {"avg": np.mean(m)}

@feature(provides=('x', 'y',), requires=())
async def make_xy():
    return {"x": 1, "y": 2}
"#;
        let table = extract_declarations(src).unwrap();
        assert_eq!(table.len(), 2);

        let avg = table.get("avg_mag").unwrap();
        assert!(avg.requires.contains("t") && avg.requires.contains("m"));
        assert!(avg.provides.contains("avg"));

        let xy = table.get("make_xy").unwrap();
        assert!(xy.requires.is_empty());
        assert_eq!(xy.provides.len(), 2);
        assert!(table.get("helper").is_none());
    }

    #[test]
    fn other_decorators_are_ignored() {
        let src = "@staticmethod\ndef f():\n    pass\n@myFeatures_extra\ndef g(): pass\n";
        assert!(extract_declarations(src).unwrap().is_empty());
    }

    #[test]
    fn multi_line_parameters_are_accepted() {
        let src = "@myFeature(requires=['t'], provides=['n'])\n\
                   def count(\n    t,\n):\n    return {'n': len(t)}\n";
        let table = extract_declarations(src).unwrap();
        assert!(table.get("count").is_some());
    }

    #[test]
    fn non_literal_list_element_is_a_parse_error() {
        let (line, msg) = parse_err("@myFeature(requires=[t], provides=['x'])\ndef f(t): pass\n");
        assert_eq!(line, 1);
        assert!(msg.contains("string literal in 'requires' list"), "{msg}");
    }

    #[test]
    fn expressions_are_never_evaluated() {
        let (_, msg) = parse_err(
            "@myFeature(requires=__import__('os').listdir('.'), provides=['x'])\ndef f(): pass\n",
        );
        assert!(msg.contains("list literal for 'requires'"), "{msg}");
    }

    #[test]
    fn missing_header_points_at_the_following_line() {
        let (line, msg) = parse_err("x = 1\n@myFeature(requires=[], provides=['x'])\nx = 2\n");
        assert_eq!(line, 3);
        assert!(msg.contains("function header"), "{msg}");
    }

    #[test]
    fn annotation_on_last_line_is_a_parse_error() {
        let (line, _) = parse_err("@myFeature(requires=[], provides=['x'])");
        assert_eq!(line, 1);
    }

    #[test]
    fn missing_and_repeated_keywords_are_rejected() {
        let (_, msg) = parse_err("@myFeature(requires=['t'])\ndef f(t): pass\n");
        assert!(msg.contains("missing 'provides'"), "{msg}");

        let (_, msg) =
            parse_err("@myFeature(requires=['t'], requires=['m'], provides=[])\ndef f(t): pass\n");
        assert!(msg.contains("more than once"), "{msg}");

        let (_, msg) = parse_err("@myFeature(needs=['t'], provides=[])\ndef f(t): pass\n");
        assert!(msg.contains("unknown annotation argument 'needs'"), "{msg}");
    }

    #[test]
    fn duplicate_unit_names_are_rejected() {
        let src = "@myFeature(requires=[], provides=['a'])\ndef f(): pass\n\n\
                   @myFeature(requires=[], provides=['b'])\ndef f(): pass\n";
        let (line, msg) = parse_err(src);
        assert_eq!(line, 5);
        assert!(msg.contains("duplicate unit 'f'"), "{msg}");
        assert!(msg.contains("line 2"), "{msg}");
    }

    #[test]
    fn empty_names_and_trailing_garbage_are_rejected() {
        let (_, msg) = parse_err("@myFeature(requires=[''], provides=['x'])\ndef f(): pass\n");
        assert!(msg.contains("empty name"), "{msg}");

        let (_, msg) = parse_err("@myFeature(requires=[], provides=['x']) extra\ndef f(): pass\n");
        assert!(msg.contains("end of line"), "{msg}");
    }

    #[test]
    fn list_features_provided_reads_through_the_filesystem() {
        let fs = crate::fs::mock::MockFileSystem::new();
        fs.add_file(
            "feats.py",
            "@myFeature(requires=['t'], provides=['b', 'a'])\ndef f(t): pass\n",
        );
        let provided = list_features_provided(&fs, Path::new("feats.py")).unwrap();
        assert_eq!(provided, vec!["a".to_string(), "b".to_string()]);
    }
}
