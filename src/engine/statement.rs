use serde_json::Value;

use crate::error::EngineError;

/// One parsed SQL statement, limited to the surface the relation manager
/// emits: relation lifecycle, single-row inserts, full scans, and full
/// deletes.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable {
        relation: String,
        /// `(column name, column type text)` in declaration order.
        columns: Vec<(String, String)>,
    },
    DropTable {
        relation: String,
    },
    Insert {
        relation: String,
        columns: Vec<String>,
        values: Vec<InsertValue>,
        returning: bool,
    },
    SelectAll {
        relation: String,
    },
    DeleteAll {
        relation: String,
    },
}

/// A single value slot inside an INSERT statement.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertValue {
    /// `$n` placeholder, 1-based as written.
    Param(usize),
    /// Inline literal: quoted string, number, NULL, TRUE, or FALSE.
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    Number(String),
    Param(usize),
    LParen,
    RParen,
    Comma,
    Star,
}

fn syntax(message: impl Into<String>) -> EngineError {
    EngineError::Syntax(message.into())
}

fn tokenize(sql: &str) -> Result<Vec<Token>, EngineError> {
    let chars: Vec<char> = sql.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            _ if c.is_whitespace() => pos += 1,
            ';' => pos += 1,
            '(' => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                pos += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                pos += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                pos += 1;
            }
            '$' => {
                let start = pos + 1;
                let mut end = start;
                while end < chars.len() && chars[end].is_ascii_digit() {
                    end += 1;
                }
                if end == start {
                    return Err(syntax("expected a digit after $"));
                }
                let digits: String = chars[start..end].iter().collect();
                let n: usize = digits
                    .parse()
                    .map_err(|_| syntax(format!("invalid parameter ${digits}")))?;
                if n == 0 {
                    return Err(syntax("parameter numbering starts at $1"));
                }
                tokens.push(Token::Param(n));
                pos = end;
            }
            '\'' => {
                // single-quoted string, '' escapes a quote
                let mut text = String::new();
                pos += 1;
                loop {
                    if pos >= chars.len() {
                        return Err(syntax("unterminated string literal"));
                    }
                    if chars[pos] == '\'' {
                        if pos + 1 < chars.len() && chars[pos + 1] == '\'' {
                            text.push('\'');
                            pos += 2;
                            continue;
                        }
                        pos += 1;
                        break;
                    }
                    text.push(chars[pos]);
                    pos += 1;
                }
                tokens.push(Token::Str(text));
            }
            _ if c.is_ascii_digit() || (c == '-' && pos + 1 < chars.len() && chars[pos + 1].is_ascii_digit()) => {
                let start = pos;
                pos += 1;
                while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                    pos += 1;
                }
                tokens.push(Token::Number(chars[start..pos].iter().collect()));
            }
            _ if c.is_alphabetic() || c == '_' || c == '"' => {
                // bare or double-quoted identifier / keyword
                if c == '"' {
                    let mut text = String::new();
                    pos += 1;
                    while pos < chars.len() && chars[pos] != '"' {
                        text.push(chars[pos]);
                        pos += 1;
                    }
                    if pos >= chars.len() {
                        return Err(syntax("unterminated quoted identifier"));
                    }
                    pos += 1;
                    tokens.push(Token::Word(text));
                } else {
                    let start = pos;
                    while pos < chars.len()
                        && (chars[pos].is_alphanumeric() || chars[pos] == '_')
                    {
                        pos += 1;
                    }
                    tokens.push(Token::Word(chars[start..pos].iter().collect()));
                }
            }
            _ => return Err(syntax(format!("unexpected character {c:?}"))),
        }
    }

    Ok(tokens)
}

struct TokenCursor {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenCursor {
    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), EngineError> {
        match self.next() {
            Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword) => Ok(()),
            other => Err(syntax(format!("expected {keyword}, got {other:?}"))),
        }
    }

    fn expect_word(&mut self) -> Result<String, EngineError> {
        match self.next() {
            Some(Token::Word(w)) => Ok(w),
            other => Err(syntax(format!("expected an identifier, got {other:?}"))),
        }
    }

    fn expect_token(&mut self, expected: Token) -> Result<(), EngineError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            other => Err(syntax(format!("expected {expected:?}, got {other:?}"))),
        }
    }

    fn expect_eof(&self) -> Result<(), EngineError> {
        if self.eof() {
            Ok(())
        } else {
            Err(syntax(format!(
                "trailing tokens after statement: {:?}",
                self.tokens[self.pos..].to_vec()
            )))
        }
    }
}

impl Statement {
    /// Parse one statement of the supported surface out of raw SQL text.
    pub fn parse(sql: &str) -> Result<Statement, EngineError> {
        let mut cursor = TokenCursor {
            tokens: tokenize(sql)?,
            pos: 0,
        };

        let head = cursor.expect_word()?;
        let statement = if head.eq_ignore_ascii_case("create") {
            cursor.expect_keyword("table")?;
            let relation = cursor.expect_word()?;
            let columns = parse_column_defs(&mut cursor)?;
            Statement::CreateTable { relation, columns }
        } else if head.eq_ignore_ascii_case("drop") {
            cursor.expect_keyword("table")?;
            Statement::DropTable {
                relation: cursor.expect_word()?,
            }
        } else if head.eq_ignore_ascii_case("insert") {
            cursor.expect_keyword("into")?;
            let relation = cursor.expect_word()?;
            let columns = parse_name_list(&mut cursor)?;
            cursor.expect_keyword("values")?;
            let values = parse_value_list(&mut cursor)?;
            let returning = parse_returning(&mut cursor)?;
            Statement::Insert {
                relation,
                columns,
                values,
                returning,
            }
        } else if head.eq_ignore_ascii_case("select") {
            cursor.expect_token(Token::Star)?;
            cursor.expect_keyword("from")?;
            Statement::SelectAll {
                relation: cursor.expect_word()?,
            }
        } else if head.eq_ignore_ascii_case("delete") {
            cursor.expect_keyword("from")?;
            Statement::DeleteAll {
                relation: cursor.expect_word()?,
            }
        } else {
            return Err(syntax(format!("unsupported statement {head}")));
        };

        cursor.expect_eof()?;
        Ok(statement)
    }
}

fn parse_column_defs(cursor: &mut TokenCursor) -> Result<Vec<(String, String)>, EngineError> {
    cursor.expect_token(Token::LParen)?;
    let mut columns = Vec::new();

    loop {
        let name = cursor.expect_word()?;
        let mut type_text = String::new();
        let mut depth = 0usize;

        // the column type runs until a top-level comma or the closing paren
        loop {
            match cursor.peek() {
                Some(Token::Comma) if depth == 0 => {
                    cursor.next();
                    break;
                }
                Some(Token::RParen) if depth == 0 => {
                    cursor.next();
                    if type_text.is_empty() {
                        return Err(syntax(format!("column {name} has no type")));
                    }
                    columns.push((name, type_text));
                    return Ok(columns);
                }
                Some(Token::Comma) => {
                    // comma inside a type's parens, e.g. NUMERIC(10, 2)
                    type_text.push(',');
                    cursor.next();
                }
                Some(Token::LParen) => {
                    depth += 1;
                    type_text.push('(');
                    cursor.next();
                }
                Some(Token::RParen) => {
                    depth -= 1;
                    type_text.push(')');
                    cursor.next();
                }
                Some(Token::Word(w)) => {
                    if !type_text.is_empty() && !type_text.ends_with('(') {
                        type_text.push(' ');
                    }
                    type_text.push_str(w);
                    cursor.next();
                }
                Some(Token::Number(n)) => {
                    if !type_text.is_empty() && !type_text.ends_with('(') {
                        type_text.push(' ');
                    }
                    type_text.push_str(n);
                    cursor.next();
                }
                other => return Err(syntax(format!("unexpected token in column type: {other:?}"))),
            }
        }

        if type_text.is_empty() {
            return Err(syntax(format!("column {name} has no type")));
        }
        columns.push((name, type_text));
    }
}

fn parse_name_list(cursor: &mut TokenCursor) -> Result<Vec<String>, EngineError> {
    cursor.expect_token(Token::LParen)?;
    let mut names = Vec::new();
    loop {
        names.push(cursor.expect_word()?);
        match cursor.next() {
            Some(Token::Comma) => continue,
            Some(Token::RParen) => return Ok(names),
            other => return Err(syntax(format!("expected , or ), got {other:?}"))),
        }
    }
}

fn parse_value_list(cursor: &mut TokenCursor) -> Result<Vec<InsertValue>, EngineError> {
    cursor.expect_token(Token::LParen)?;
    let mut values = Vec::new();
    loop {
        let value = match cursor.next() {
            Some(Token::Param(n)) => InsertValue::Param(n),
            Some(Token::Str(text)) => InsertValue::Literal(Value::String(text)),
            Some(Token::Number(text)) => {
                let number = text
                    .parse::<serde_json::Number>()
                    .map_err(|_| syntax(format!("invalid number literal {text}")))?;
                InsertValue::Literal(Value::Number(number))
            }
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("null") => {
                InsertValue::Literal(Value::Null)
            }
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("true") => {
                InsertValue::Literal(Value::Bool(true))
            }
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("false") => {
                InsertValue::Literal(Value::Bool(false))
            }
            other => return Err(syntax(format!("unexpected value token {other:?}"))),
        };
        values.push(value);

        match cursor.next() {
            Some(Token::Comma) => continue,
            Some(Token::RParen) => return Ok(values),
            other => return Err(syntax(format!("expected , or ), got {other:?}"))),
        }
    }
}

fn parse_returning(cursor: &mut TokenCursor) -> Result<bool, EngineError> {
    match cursor.peek() {
        Some(Token::Word(w)) if w.eq_ignore_ascii_case("returning") => {
            cursor.next();
            cursor.expect_token(Token::Star)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}
