//! Recursive-descent parser for executable documents.

use super::ast::*;
use super::lexer::{Lexer, SyntaxError, Token, TokenKind};

/// Deepest combined nesting of selection sets, list/object values and list
/// types that a document may use.
const MAX_NESTING_DEPTH: usize = 64;

pub fn parse_query(source: &str) -> Result<Document, SyntaxError> {
    let mut parser = Parser::new(source)?;
    parser.parse_document()
}

struct Parser {
    lexer: Lexer,
    current: Token,
    depth: usize,
}

impl Parser {
    fn new(source: &str) -> Result<Self, SyntaxError> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            depth: 0,
        })
    }

    fn peek(&self) -> &TokenKind {
        &self.current.kind
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), TokenKind::Name(name) if name == keyword)
    }

    fn advance(&mut self) -> Result<Token, SyntaxError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn skip(&mut self, kind: &TokenKind) -> Result<bool, SyntaxError> {
        if self.peek() == kind {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, SyntaxError> {
        if *self.peek() == kind {
            self.advance()
        } else {
            Err(SyntaxError::new(
                format!("Expected {}, found {}.", kind, self.current.kind),
                self.current.pos,
            ))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), SyntaxError> {
        if self.peek_keyword(keyword) {
            self.advance()?;
            Ok(())
        } else {
            Err(SyntaxError::new(
                format!("Expected \"{}\", found {}.", keyword, self.current.kind),
                self.current.pos,
            ))
        }
    }

    fn expect_name(&mut self) -> Result<(String, Pos), SyntaxError> {
        let pos = self.current.pos;
        let name = match self.peek() {
            TokenKind::Name(name) => name.clone(),
            other => {
                return Err(SyntaxError::new(
                    format!("Expected Name, found {}.", other),
                    pos,
                ))
            }
        };
        self.advance()?;
        Ok((name, pos))
    }

    fn enter(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(SyntaxError::new(
                "Document exceeds maximum nesting depth.",
                self.current.pos,
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn unexpected(&self) -> SyntaxError {
        SyntaxError::new(
            format!("Unexpected {}.", self.current.kind),
            self.current.pos,
        )
    }

    fn parse_document(&mut self) -> Result<Document, SyntaxError> {
        let mut definitions = Vec::new();
        loop {
            definitions.push(self.parse_definition()?);
            if *self.peek() == TokenKind::Eof {
                return Ok(Document { definitions });
            }
        }
    }

    fn parse_definition(&mut self) -> Result<Definition, SyntaxError> {
        let starts_operation = *self.peek() == TokenKind::BraceL
            || ["query", "mutation", "subscription"]
                .iter()
                .any(|keyword| self.peek_keyword(keyword));

        if starts_operation {
            Ok(Definition::Operation(self.parse_operation_definition()?))
        } else if self.peek_keyword("fragment") {
            Ok(Definition::Fragment(self.parse_fragment_definition()?))
        } else {
            Err(self.unexpected())
        }
    }

    fn parse_operation_definition(&mut self) -> Result<OperationDefinition, SyntaxError> {
        let position = self.current.pos;

        if *self.peek() == TokenKind::BraceL {
            return Ok(OperationDefinition {
                position,
                operation_type: OperationType::Query,
                name: None,
                variable_definitions: Vec::new(),
                directives: Vec::new(),
                selection_set: self.parse_selection_set()?,
            });
        }

        let (keyword, _) = self.expect_name()?;
        let operation_type = match keyword.as_str() {
            "query" => OperationType::Query,
            "mutation" => OperationType::Mutation,
            "subscription" => OperationType::Subscription,
            _ => {
                return Err(SyntaxError::new(
                    format!("Unexpected Name \"{}\".", keyword),
                    position,
                ))
            }
        };

        let name = if matches!(self.peek(), TokenKind::Name(_)) {
            Some(self.expect_name()?.0)
        } else {
            None
        };

        Ok(OperationDefinition {
            position,
            operation_type,
            name,
            variable_definitions: self.parse_variable_definitions()?,
            directives: self.parse_directives(false)?,
            selection_set: self.parse_selection_set()?,
        })
    }

    fn parse_variable_definitions(&mut self) -> Result<Vec<VariableDefinition>, SyntaxError> {
        let mut definitions = Vec::new();
        if !self.skip(&TokenKind::ParenL)? {
            return Ok(definitions);
        }

        loop {
            let position = self.current.pos;
            self.expect(TokenKind::Dollar)?;
            let (name, _) = self.expect_name()?;
            self.expect(TokenKind::Colon)?;
            let var_type = self.parse_type()?;
            let default_value = if self.skip(&TokenKind::Equals)? {
                Some(self.parse_value(true)?)
            } else {
                None
            };
            // Variable directives are accepted but carry no meaning here.
            self.parse_directives(true)?;

            definitions.push(VariableDefinition {
                position,
                name,
                var_type,
                default_value,
            });

            if self.skip(&TokenKind::ParenR)? {
                return Ok(definitions);
            }
        }
    }

    fn parse_type(&mut self) -> Result<TypeRef, SyntaxError> {
        let inner = if self.skip(&TokenKind::BracketL)? {
            self.enter()?;
            let item = self.parse_type()?;
            self.expect(TokenKind::BracketR)?;
            self.leave();
            TypeRef::list(item)
        } else {
            TypeRef::Named(self.expect_name()?.0)
        };

        if self.skip(&TokenKind::Bang)? {
            Ok(TypeRef::non_null(inner))
        } else {
            Ok(inner)
        }
    }

    fn parse_selection_set(&mut self) -> Result<SelectionSet, SyntaxError> {
        self.expect(TokenKind::BraceL)?;
        self.enter()?;
        let mut items = Vec::new();
        loop {
            items.push(self.parse_selection()?);
            if self.skip(&TokenKind::BraceR)? {
                self.leave();
                return Ok(SelectionSet { items });
            }
        }
    }

    fn parse_selection(&mut self) -> Result<Selection, SyntaxError> {
        if *self.peek() == TokenKind::Spread {
            return self.parse_fragment();
        }
        if !matches!(self.peek(), TokenKind::Name(_)) {
            return Err(self.unexpected());
        }
        Ok(Selection::Field(self.parse_field()?))
    }

    fn parse_field(&mut self) -> Result<Field, SyntaxError> {
        let (first, position) = self.expect_name()?;
        let (alias, name) = if self.skip(&TokenKind::Colon)? {
            (Some(first), self.expect_name()?.0)
        } else {
            (None, first)
        };

        let arguments = self.parse_arguments(false)?;
        let directives = self.parse_directives(false)?;
        let selection_set = if *self.peek() == TokenKind::BraceL {
            self.parse_selection_set()?
        } else {
            SelectionSet::default()
        };

        Ok(Field {
            position,
            alias,
            name,
            arguments,
            directives,
            selection_set,
        })
    }

    fn parse_arguments(&mut self, is_const: bool) -> Result<Vec<(String, Value)>, SyntaxError> {
        let mut arguments = Vec::new();
        if !self.skip(&TokenKind::ParenL)? {
            return Ok(arguments);
        }
        loop {
            let (name, _) = self.expect_name()?;
            self.expect(TokenKind::Colon)?;
            arguments.push((name, self.parse_value(is_const)?));
            if self.skip(&TokenKind::ParenR)? {
                return Ok(arguments);
            }
        }
    }

    fn parse_directives(&mut self, is_const: bool) -> Result<Vec<Directive>, SyntaxError> {
        let mut directives = Vec::new();
        while *self.peek() == TokenKind::At {
            let position = self.current.pos;
            self.advance()?;
            let (name, _) = self.expect_name()?;
            directives.push(Directive {
                position,
                name,
                arguments: self.parse_arguments(is_const)?,
            });
        }
        Ok(directives)
    }

    fn parse_fragment(&mut self) -> Result<Selection, SyntaxError> {
        let position = self.current.pos;
        self.expect(TokenKind::Spread)?;

        let has_type_condition = self.peek_keyword("on");
        if !has_type_condition && matches!(self.peek(), TokenKind::Name(_)) {
            let (fragment_name, _) = self.expect_name()?;
            return Ok(Selection::FragmentSpread(FragmentSpread {
                position,
                fragment_name,
                directives: self.parse_directives(false)?,
            }));
        }

        let type_condition = if has_type_condition {
            self.advance()?;
            Some(self.expect_name()?.0)
        } else {
            None
        };

        Ok(Selection::InlineFragment(InlineFragment {
            position,
            type_condition,
            directives: self.parse_directives(false)?,
            selection_set: self.parse_selection_set()?,
        }))
    }

    fn parse_fragment_definition(&mut self) -> Result<FragmentDefinition, SyntaxError> {
        let position = self.current.pos;
        self.expect_keyword("fragment")?;

        if self.peek_keyword("on") {
            return Err(self.unexpected());
        }
        let (name, _) = self.expect_name()?;
        self.expect_keyword("on")?;
        let (type_condition, _) = self.expect_name()?;

        Ok(FragmentDefinition {
            position,
            name,
            type_condition,
            directives: self.parse_directives(false)?,
            selection_set: self.parse_selection_set()?,
        })
    }

    fn parse_value(&mut self, is_const: bool) -> Result<Value, SyntaxError> {
        let token_pos = self.current.pos;
        match self.peek().clone() {
            TokenKind::BracketL => {
                self.advance()?;
                self.enter()?;
                let mut items = Vec::new();
                while !self.skip(&TokenKind::BracketR)? {
                    items.push(self.parse_value(is_const)?);
                }
                self.leave();
                Ok(Value::List(items))
            }
            TokenKind::BraceL => {
                self.advance()?;
                self.enter()?;
                let mut fields = Vec::new();
                while !self.skip(&TokenKind::BraceR)? {
                    let (name, _) = self.expect_name()?;
                    self.expect(TokenKind::Colon)?;
                    fields.push((name, self.parse_value(is_const)?));
                }
                self.leave();
                Ok(Value::Object(fields))
            }
            TokenKind::Int(raw) => {
                self.advance()?;
                raw.parse::<i64>().map(Value::Int).map_err(|_| {
                    SyntaxError::new(format!("Integer value out of range: {}.", raw), token_pos)
                })
            }
            TokenKind::Float(raw) => {
                self.advance()?;
                raw.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(Value::Float)
                    .ok_or_else(|| {
                        SyntaxError::new(format!("Float value out of range: {}.", raw), token_pos)
                    })
            }
            TokenKind::String(s) | TokenKind::BlockString(s) => {
                self.advance()?;
                Ok(Value::String(s))
            }
            TokenKind::Name(name) => {
                self.advance()?;
                Ok(match name.as_str() {
                    "true" => Value::Boolean(true),
                    "false" => Value::Boolean(false),
                    "null" => Value::Null,
                    _ => Value::Enum(name),
                })
            }
            TokenKind::Dollar if !is_const => {
                self.advance()?;
                Ok(Value::Variable(self.expect_name()?.0))
            }
            _ => Err(self.unexpected()),
        }
    }
}
