//! Initialization script splitting
//!
//! DuckDB prepares one statement at a time, so a script is cut into
//! statements here. Only enough lexing is done to keep `;`, `--` and `/*`
//! inside string literals from being mistaken for delimiters.

/// One executable statement of a script, without terminator or comments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    index: usize,
    text: String,
}

impl Statement {
    /// 1-based position within the script
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Clone, PartialEq, Eq)]
enum Mode {
    Normal,
    Quoted(char),
    DollarQuoted(String),
    LineComment,
    BlockComment(usize),
}

type Chars<'a> = std::iter::Peekable<std::str::Chars<'a>>;

/// Split a script into statements.
///
/// Recognized syntax: `'...'` and `"..."` literals with a doubled quote as
/// escape, `$$...$$` and `$tag$...$tag$` bodies, `--` line comments and
/// nestable `/* */` block comments. Comments are stripped, whitespace-only
/// statements are dropped, and a final statement without a trailing `;` is
/// kept. Unterminated literals and block comments run to the end of the
/// input; nothing is validated here.
pub fn split_statements(script: &str) -> Vec<Statement> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut mode = Mode::Normal;
    let mut chars = script.chars().peekable();

    while let Some(c) = chars.next() {
        mode = match mode {
            Mode::Normal => match c {
                ';' => {
                    push_statement(&mut statements, &mut current);
                    Mode::Normal
                }
                '\'' | '"' => {
                    current.push(c);
                    Mode::Quoted(c)
                }
                '$' if !ends_with_identifier(&current) => match dollar_tag(&chars) {
                    Some(tag) => {
                        consume(&mut chars, tag.chars().count() + 1);
                        current.push('$');
                        current.push_str(&tag);
                        current.push('$');
                        Mode::DollarQuoted(tag)
                    }
                    None => {
                        current.push(c);
                        Mode::Normal
                    }
                },
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    Mode::LineComment
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    // keep tokens on either side of the comment apart
                    current.push(' ');
                    Mode::BlockComment(1)
                }
                _ => {
                    current.push(c);
                    Mode::Normal
                }
            },
            Mode::Quoted(quote) => {
                current.push(c);
                if c != quote {
                    Mode::Quoted(quote)
                } else if chars.peek() == Some(&quote) {
                    current.push(quote);
                    chars.next();
                    Mode::Quoted(quote)
                } else {
                    Mode::Normal
                }
            }
            Mode::DollarQuoted(tag) => {
                current.push(c);
                if c == '$' && closes_dollar_quote(&chars, &tag) {
                    consume(&mut chars, tag.chars().count() + 1);
                    current.push_str(&tag);
                    current.push('$');
                    Mode::Normal
                } else {
                    Mode::DollarQuoted(tag)
                }
            }
            Mode::LineComment => {
                if c == '\n' {
                    current.push('\n');
                    Mode::Normal
                } else {
                    Mode::LineComment
                }
            }
            Mode::BlockComment(depth) => match c {
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    Mode::BlockComment(depth + 1)
                }
                '*' if chars.peek() == Some(&'/') => {
                    chars.next();
                    if depth == 1 {
                        Mode::Normal
                    } else {
                        Mode::BlockComment(depth - 1)
                    }
                }
                _ => Mode::BlockComment(depth),
            },
        };
    }
    push_statement(&mut statements, &mut current);

    statements
}

/// `$` inside an identifier or after a word (`a$1`) does not open a body
fn ends_with_identifier(text: &str) -> bool {
    text.chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Tag of a dollar-quote opener whose leading `$` was just consumed
fn dollar_tag(chars: &Chars<'_>) -> Option<String> {
    let mut look = chars.clone();
    let mut tag = String::new();
    while let Some(c) = look.next() {
        match c {
            '$' => return Some(tag),
            c if c.is_alphanumeric() || c == '_' => {
                // `$1` is a positional parameter, not a tag
                if tag.is_empty() && c.is_ascii_digit() {
                    return None;
                }
                tag.push(c);
            }
            _ => return None,
        }
    }
    None
}

fn closes_dollar_quote(chars: &Chars<'_>, tag: &str) -> bool {
    let mut look = chars.clone();
    tag.chars().all(|t| look.next() == Some(t)) && look.next() == Some('$')
}

fn consume(chars: &mut Chars<'_>, count: usize) {
    for _ in 0..count {
        chars.next();
    }
}

fn push_statement(statements: &mut Vec<Statement>, current: &mut String) {
    let text = current.trim();
    if !text.is_empty() {
        statements.push(Statement {
            index: statements.len() + 1,
            text: text.to_string(),
        });
    }
    current.clear();
}
