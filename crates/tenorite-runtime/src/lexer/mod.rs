//! Lexical analysis (tokenization)
//!
//! A mode-stack scanner: main mode tokenizes code, string mode collects
//! the literal segments of an interpolated string. `#{…}` inside a string
//! pushes main mode so embedded expressions tokenize normally.

use crate::diagnostic::Diagnostic;
use crate::token::{ends_expression, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Main,
    Str,
}

/// Lexer state for tokenizing source code
pub struct Lexer {
    /// Characters of source code
    chars: Vec<char>,
    /// Current position in chars
    current: usize,
    /// Current line number (1-indexed)
    line: u32,
    /// Raw text of the token being scanned
    lexeme: String,
    /// Scanner mode stack
    mode: Vec<Mode>,
    /// Accumulated tokens
    tokens: Vec<Token>,
    /// Collected diagnostics
    diagnostics: Vec<Diagnostic>,
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_name_first(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_operator(c: char) -> bool {
    "\\-+*/^~<=>!;$%?".contains(c)
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: impl AsRef<str>) -> Self {
        Self {
            chars: source.as_ref().chars().collect(),
            current: 0,
            line: 1,
            lexeme: String::new(),
            mode: vec![Mode::Main],
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Tokenize the source code, returning tokens and any diagnostics
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        while !self.is_at_end() {
            match self.mode.last().copied().unwrap_or(Mode::Main) {
                Mode::Main => {
                    self.lexeme.clear();
                    self.scan_token();
                }
                Mode::Str => self.scan_string(),
            }
        }

        self.lexeme.clear();
        if self.mode.last() == Some(&Mode::Str) {
            self.report("Unterminated string.");
        }
        self.push(TokenKind::Eof);

        (self.tokens, self.diagnostics)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.current).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.current + 1).copied()
    }

    fn read(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.lexeme.push(c);
        self.current += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.read();
            true
        } else {
            false
        }
    }

    fn report(&mut self, message: &str) {
        self.diagnostics
            .push(Diagnostic::error(message, self.line).with_lexeme(self.lexeme.clone()));
    }

    fn push_literal(&mut self, kind: TokenKind, value: impl Into<String>) {
        self.tokens.push(Token {
            kind,
            lexeme: self.lexeme.clone(),
            value: value.into(),
            line: self.line,
        });
    }

    fn push(&mut self, kind: TokenKind) {
        self.push_literal(kind, "");
    }

    fn last_ends_expr(&self) -> bool {
        self.tokens
            .last()
            .is_some_and(|tk| ends_expression(tk.kind))
    }

    fn scan_token(&mut self) {
        let Some(tk) = self.read() else { return };
        match tk {
            ' ' | '\r' | '\t' => {}
            '\n' => {
                // `read` already bumped the line; terminate the statement
                // only if the previous token can end an expression.
                if self.last_ends_expr() {
                    self.tokens.push(Token {
                        kind: TokenKind::Terminator,
                        lexeme: "\n".to_string(),
                        value: String::new(),
                        line: self.line - 1,
                    });
                }
            }
            '(' => self.push(TokenKind::LeftParen),
            ')' => self.push(TokenKind::RightParen),
            '[' => self.push(TokenKind::LeftList),
            ']' => self.push(TokenKind::RightList),
            '|' => self.push(TokenKind::Pipe),
            ',' => self.push(TokenKind::Separator),
            '@' => self.push(TokenKind::At),
            '{' => {
                self.mode.push(Mode::Main);
                self.push(TokenKind::LeftBlock);
            }
            '}' => {
                self.mode.pop();
                self.push(TokenKind::RightBlock);
                self.lexeme.clear();
            }
            '&' => {
                if self.peek().is_some_and(is_name_first) {
                    let first = self.read().unwrap_or_default();
                    let name = self.scan_name(first);
                    self.push_literal(TokenKind::Field, name);
                } else {
                    self.report("Unexpected character.");
                    self.push(TokenKind::Illegal);
                }
            }
            ':' => {
                if self.match_char('=') {
                    self.push(TokenKind::Assign);
                } else if self.match_char('>') {
                    // A cascade continues the previous statement even
                    // across a newline.
                    if self.tokens.last().map(|tk| tk.kind) == Some(TokenKind::Terminator) {
                        self.tokens.pop();
                    }
                    self.push(TokenKind::Cascade);
                } else {
                    self.push(TokenKind::Colon);
                }
            }
            '.' => {
                if self.match_char('.') {
                    // Line comment
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.read();
                    }
                } else {
                    self.push(TokenKind::Terminator);
                }
            }
            '"' => {
                self.mode.push(Mode::Str);
                self.push(TokenKind::StringBegin);
                self.lexeme.clear();
            }
            '\'' => self.scan_symbol(),
            '#' => {
                if self.match_char('\'') {
                    if let Some(pattern) = self.scan_raw_string() {
                        self.push_literal(TokenKind::Regex, pattern);
                    }
                } else if self.peek() == Some('[') {
                    self.push(TokenKind::Hash);
                } else {
                    self.report("Unexpected character.");
                    self.push(TokenKind::Illegal);
                }
            }
            '-' => {
                if self.peek().is_some_and(is_digit) {
                    self.scan_number('-');
                } else {
                    let name = self.scan_operator('-');
                    self.push_literal(TokenKind::Operator, name);
                }
            }
            c if is_digit(c) => self.scan_number(c),
            c if is_operator(c) => {
                let name = self.scan_operator(c);
                self.push_literal(TokenKind::Operator, name);
            }
            c if is_name_first(c) => {
                let name = self.scan_name(c);
                if self.match_char(':') {
                    // A `name:` key, unless it is `name:=` or `name:>`
                    if self.peek() == Some('=') || self.peek() == Some('>') {
                        self.push_literal(TokenKind::Name, name);
                        // Reprocess the colon as its own token.
                        self.current -= 1;
                        self.lexeme.pop();
                        return;
                    }
                    self.push_literal(TokenKind::Key, format!("{}:", name));
                    return;
                }
                match name.as_str() {
                    "fn" => self.push(TokenKind::Fn),
                    "return" => self.push(TokenKind::Return),
                    "nonlocal" => self.push(TokenKind::Nonlocal),
                    "loop" => self.push(TokenKind::Loop),
                    "if" => self.push(TokenKind::If),
                    "import" => self.push(TokenKind::Import),
                    "type" => self.push(TokenKind::Type),
                    _ => self.push_literal(TokenKind::Name, name),
                }
            }
            _ => {
                self.report("Unexpected character.");
                self.push(TokenKind::Illegal);
            }
        }
    }

    /// One step of string mode: a literal segment, an escape, the start
    /// of an interpolation, or the closing quote.
    fn scan_string(&mut self) {
        match self.peek() {
            None => {
                // Unterminated; the tokenize loop exits and reports.
            }
            Some('"') => {
                let segment = std::mem::take(&mut self.lexeme);
                self.push_segment(segment);
                self.read();
                self.mode.pop();
                self.push(TokenKind::StringEnd);
                self.lexeme.clear();
            }
            Some('\\') => {
                let segment = std::mem::take(&mut self.lexeme);
                self.push_segment(segment);
                self.read();
                match self.read() {
                    Some('n') => self.push_escape("\n"),
                    Some('t') => self.push_escape("\t"),
                    Some('r') => self.push_escape("\r"),
                    Some('\\') => self.push_escape("\\"),
                    Some('"') => self.push_escape("\""),
                    Some('#') => self.push_escape("#"),
                    Some(_) => self.report("Invalid escape sequence."),
                    None => self.report("Unterminated string."),
                }
                self.lexeme.clear();
            }
            Some('#') => {
                if self.peek2() == Some('{') {
                    let segment = std::mem::take(&mut self.lexeme);
                    self.push_segment(segment);
                    self.read();
                    self.read();
                    self.mode.push(Mode::Main);
                    self.push(TokenKind::LeftBlock);
                    self.lexeme.clear();
                } else {
                    self.read();
                }
            }
            Some(_) => {
                self.read();
            }
        }
    }

    fn push_segment(&mut self, segment: String) {
        self.tokens.push(Token {
            kind: TokenKind::StringLiteral,
            lexeme: segment.clone(),
            value: segment,
            line: self.line,
        });
    }

    fn push_escape(&mut self, cooked: &str) {
        self.tokens.push(Token {
            kind: TokenKind::StringLiteral,
            lexeme: self.lexeme.clone(),
            value: cooked.to_string(),
            line: self.line,
        });
    }

    /// `'name`, `'op`, or `'key:key:…` symbol literal
    fn scan_symbol(&mut self) {
        match self.peek() {
            Some(c) if is_operator(c) => {
                self.read();
                let name = self.scan_operator(c);
                self.push_literal(TokenKind::Symbol, name);
            }
            Some(c) if is_name_first(c) => {
                self.read();
                let name = self.scan_name(c);
                if self.match_char(':') {
                    let mut keysel = format!("{}:", name);
                    while self.peek().is_some_and(is_name_first) {
                        let first = self.read().unwrap_or_default();
                        let part = self.scan_name(first);
                        if self.match_char(':') {
                            keysel.push_str(&part);
                            keysel.push(':');
                        } else {
                            self.report("Expected `:´ at key.");
                            return;
                        }
                    }
                    self.push_literal(TokenKind::Symbol, keysel);
                    return;
                }
                self.push_literal(TokenKind::Symbol, name);
            }
            _ => {
                self.report("Unexpected character.");
                self.push(TokenKind::Illegal);
            }
        }
    }

    /// Quote-delimited text after `#'`; doubled quotes escape a quote
    fn scan_raw_string(&mut self) -> Option<String> {
        let mut result = String::new();
        loop {
            match self.read() {
                None => {
                    self.report("Unterminated string.");
                    return None;
                }
                Some('\'') => {
                    if self.match_char('\'') {
                        result.push('\'');
                    } else {
                        return Some(result);
                    }
                }
                Some(c) => result.push(c),
            }
        }
    }

    fn scan_integer(&mut self, result: &mut String) {
        while let Some(c) = self.peek() {
            if c == '\'' {
                self.read();
                continue;
            }
            if !is_digit(c) {
                break;
            }
            result.push(c);
            self.read();
        }
    }

    fn scan_number(&mut self, first: char) {
        let mut result = String::new();
        result.push(first);
        self.scan_integer(&mut result);
        if self.peek() == Some('.') && self.peek2().is_some_and(is_digit) {
            self.read();
            result.push('.');
            self.scan_integer(&mut result);
        }
        self.push_literal(TokenKind::Number, result);
    }

    fn scan_name(&mut self, first: char) -> String {
        let mut result = String::new();
        result.push(first);
        while self.peek().is_some_and(is_name) {
            result.push(self.read().unwrap_or_default());
        }
        result
    }

    fn scan_operator(&mut self, first: char) -> String {
        let mut result = String::new();
        result.push(first);
        while self.peek().is_some_and(is_operator) {
            result.push(self.read().unwrap_or_default());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, diagnostics) = Lexer::new(source).tokenize();
        assert!(diagnostics.is_empty(), "diagnostics: {:?}", diagnostics);
        tokens.into_iter().map(|tk| tk.kind).collect()
    }

    fn values(source: &str) -> Vec<(TokenKind, String)> {
        let (tokens, diagnostics) = Lexer::new(source).tokenize();
        assert!(diagnostics.is_empty(), "diagnostics: {:?}", diagnostics);
        tokens.into_iter().map(|tk| (tk.kind, tk.value)).collect()
    }

    #[test]
    fn test_assignment_tokens() {
        assert_eq!(
            kinds("x := 1."),
            vec![
                TokenKind::Name,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Terminator,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keyword_selector() {
        let tokens = values("p x: 3 y: 4");
        assert_eq!(tokens[1], (TokenKind::Key, "x:".to_string()));
        assert_eq!(tokens[3], (TokenKind::Key, "y:".to_string()));
    }

    #[test]
    fn test_newline_terminator_only_after_expression() {
        assert_eq!(
            kinds("x := 1\ny := 2\n"),
            vec![
                TokenKind::Name,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Terminator,
                TokenKind::Name,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Terminator,
                TokenKind::Eof,
            ]
        );
        // No terminator after a trailing operator.
        assert_eq!(
            kinds("1 +\n2"),
            vec![
                TokenKind::Number,
                TokenKind::Operator,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_cascade_cancels_terminator() {
        assert_eq!(
            kinds("x\n:> string"),
            vec![
                TokenKind::Name,
                TokenKind::Cascade,
                TokenKind::Name,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comment_is_skipped() {
        assert_eq!(
            kinds(".. a comment\nx"),
            vec![TokenKind::Name, TokenKind::Eof]
        );
    }

    #[test]
    fn test_symbol_literals() {
        let tokens = values("'a 'at_: 'x:y: '+");
        assert_eq!(tokens[0], (TokenKind::Symbol, "a".to_string()));
        assert_eq!(tokens[1], (TokenKind::Symbol, "at_:".to_string()));
        assert_eq!(tokens[2], (TokenKind::Symbol, "x:y:".to_string()));
        assert_eq!(tokens[3], (TokenKind::Symbol, "+".to_string()));
    }

    #[test]
    fn test_field_token() {
        let tokens = values("&x := 1");
        assert_eq!(tokens[0], (TokenKind::Field, "x".to_string()));
        assert_eq!(tokens[1].0, TokenKind::Assign);
    }

    #[test]
    fn test_interpolated_string() {
        assert_eq!(
            kinds("\"a #{x} b\""),
            vec![
                TokenKind::StringBegin,
                TokenKind::StringLiteral,
                TokenKind::LeftBlock,
                TokenKind::Name,
                TokenKind::RightBlock,
                TokenKind::StringLiteral,
                TokenKind::StringEnd,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        let tokens = values("\"a\\nb\"");
        let literals: Vec<&str> = tokens
            .iter()
            .filter(|(kind, _)| *kind == TokenKind::StringLiteral)
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(literals, vec!["a", "\n", "b"]);
    }

    #[test]
    fn test_regex_literal() {
        let tokens = values("#'[a-z]+'");
        assert_eq!(tokens[0], (TokenKind::Regex, "[a-z]+".to_string()));
    }

    #[test]
    fn test_table_literal_tokens() {
        // `'a:` folds the colon into a one-segment keyword symbol; the
        // parser treats it as a key when it opens a table entry.
        assert_eq!(
            kinds("#['a: 1]"),
            vec![
                TokenKind::Hash,
                TokenKind::LeftList,
                TokenKind::Symbol,
                TokenKind::Number,
                TokenKind::RightList,
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("#[(1): 2]"),
            vec![
                TokenKind::Hash,
                TokenKind::LeftList,
                TokenKind::LeftParen,
                TokenKind::Number,
                TokenKind::RightParen,
                TokenKind::Colon,
                TokenKind::Number,
                TokenKind::RightList,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_number_forms() {
        let tokens = values("12 3.5 -4 1'000");
        assert_eq!(tokens[0], (TokenKind::Number, "12".to_string()));
        assert_eq!(tokens[1], (TokenKind::Number, "3.5".to_string()));
        assert_eq!(tokens[2], (TokenKind::Number, "-4".to_string()));
        assert_eq!(tokens[3], (TokenKind::Number, "1000".to_string()));
    }

    #[test]
    fn test_unterminated_string_reports() {
        let (_, diagnostics) = Lexer::new("\"abc").tokenize();
        assert!(!diagnostics.is_empty());
        assert!(diagnostics[0].message.contains("Unterminated"));
    }

    #[test]
    fn test_unexpected_character_reports() {
        let (_, diagnostics) = Lexer::new("`").tokenize();
        assert!(!diagnostics.is_empty());
    }
}
