use std::rc::Rc;

use log::debug;
use renzmc_core::{Diagnostic, Lexer, Literal, Token, Type};

use crate::ast::{
    contains_yield, Case, CatchClause, ClassDecl, Expr, FStringPart, FuncDecl, LoopTarget, Param,
    Program, Stmt, TypeHint, UnpackTarget,
};
use crate::limits::MAX_NESTING_DEPTH;

mod type_hint;

pub struct Parser {
    lexer: Lexer,
    current: Token,
    depth: usize,
}

// Helper alias for shorter return types
type BlockResult = Result<Vec<Stmt>, Diagnostic>;
type StmtResult = Result<Stmt, Diagnostic>;
type ExprResult = Result<Expr, Diagnostic>;
type ArgsResult = Result<(Vec<Expr>, Vec<(Token, Expr)>), Diagnostic>;

/// Parses a whole source text.
pub fn parse(source: &str) -> Result<Program, Diagnostic> {
    Parser::new(Lexer::new(source))?.parse()
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self, Diagnostic> {
        let current = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            depth: 0,
        })
    }

    pub fn parse(&mut self) -> Result<Program, Diagnostic> {
        let mut statements = Vec::new();
        loop {
            self.skip_newlines()?;
            if self.check(Type::Eof) {
                break;
            }
            statements.push(self.statement()?);
        }

        debug!("parsed {} top-level statements", statements.len());
        Ok(Program { statements })
    }

    fn statement(&mut self) -> StmtResult {
        match self.current.ty {
            Type::Identifier => self.identifier_statement(),
            Type::SelfKw => self.postfix_statement(),
            Type::Star => self.starred_assignment(),
            Type::Print => self.print_statement(),
            Type::If => self.if_statement(),
            Type::While => self.while_statement(),
            Type::For => self.for_statement(),
            Type::Function => {
                self.advance()?;
                self.function_declaration(false)
            }
            Type::Class => {
                self.advance()?;
                self.class_declaration()
            }
            Type::Make => self.make_statement(),
            Type::Async => self.async_declaration(),
            Type::Return => {
                if self.peek_type()? == Type::Is {
                    self.var_declaration()
                } else {
                    self.return_statement()
                }
            }
            Type::Yield => self.yield_statement(),
            Type::Break => Ok(Stmt::Break {
                token: self.advance()?,
            }),
            Type::Continue => Ok(Stmt::Continue {
                token: self.advance()?,
            }),
            Type::Store => self.store_statement(),
            Type::Import => self.import_statement(),
            Type::From => self.from_import_statement(),
            Type::ImportPython => self.python_import_statement(),
            Type::Call => self.call_statement(),
            Type::Try => self.try_statement(),
            Type::Match => self.switch_statement(),
            Type::With => self.with_statement(),
            Type::At => self.decorator_statement(),
            Type::TypeKw => self.type_alias_statement(),
            Type::End => Err(self.end_as_name_error()),
            Type::Catch
            | Type::Finally
            | Type::And
            | Type::Or
            | Type::In
            | Type::To
            | Type::Then
            | Type::Else
            | Type::When
            | Type::Each
            | Type::Extends
            | Type::Constructor
            | Type::Method
            | Type::Into
            | Type::As
            | Type::Case
            | Type::Default
            | Type::Is => Err(self.reserved_keyword_error()),
            _ => self.expression_statement(),
        }
    }

    fn identifier_statement(&mut self) -> StmtResult {
        match self.peek_type()? {
            Type::Is | Type::Colon => self.var_declaration(),
            Type::Comma => self.comma_statement(),
            _ => self.postfix_statement(),
        }
    }

    fn var_declaration(&mut self) -> StmtResult {
        let (name, type_hint, value) = self.declaration_parts()?;
        Ok(Stmt::var_decl(name, type_hint, value))
    }

    fn declaration_parts(&mut self) -> Result<(Token, Option<TypeHint>, Expr), Diagnostic> {
        // `hasil itu ...` declares a variable that happens to be spelled like the keyword
        let name = match self.current.ty {
            Type::Return => {
                let token = self.advance()?;
                Token::identifier_at(&token.lexeme, &token)
            }
            _ => self.expect_identifier()?,
        };

        let type_hint = if self.match_one(Type::Colon)? {
            Some(self.type_hint()?)
        } else {
            None
        };

        if !self.match_either(&[Type::Is, Type::Equal])? {
            return Err(self.expected("'itu' atau '='"));
        }

        let token = name.clone();
        let value = self.expression_list(&token)?;
        Ok((name, type_hint, value))
    }

    fn comma_statement(&mut self) -> StmtResult {
        let token = self.current.clone();
        let mut targets = vec![UnpackTarget::Normal(self.expect_identifier()?)];
        while self.match_one(Type::Comma)? {
            if self.match_one(Type::Star)? {
                targets.push(UnpackTarget::Starred(self.expect_identifier()?));
            } else {
                targets.push(UnpackTarget::Normal(self.expect_identifier()?));
            }
        }

        let starred = targets
            .iter()
            .any(|target| matches!(target, UnpackTarget::Starred(_)));

        if self.match_one(Type::Is)? {
            let value = self.expression_list(&token)?;
            let names = targets
                .into_iter()
                .map(|target| match target {
                    UnpackTarget::Normal(name) | UnpackTarget::Starred(name) => name,
                })
                .collect();
            Ok(Stmt::MultiVarDecl { names, value, token })
        } else if self.match_one(Type::Equal)? {
            let value = self.expression_list(&token)?;
            if starred {
                Ok(Stmt::ExtendedUnpacking {
                    targets,
                    value,
                    token,
                })
            } else {
                let targets = targets
                    .into_iter()
                    .map(|target| match target {
                        UnpackTarget::Normal(name) | UnpackTarget::Starred(name) => Expr::var(name),
                    })
                    .collect();
                Ok(Stmt::MultiAssign {
                    targets,
                    value,
                    token,
                })
            }
        } else {
            Err(self.expected("'itu' atau '='"))
        }
    }

    fn starred_assignment(&mut self) -> StmtResult {
        let token = self.advance()?;
        let mut targets = vec![UnpackTarget::Starred(self.expect_identifier()?)];
        while self.match_one(Type::Comma)? {
            if self.match_one(Type::Star)? {
                targets.push(UnpackTarget::Starred(self.expect_identifier()?));
            } else {
                targets.push(UnpackTarget::Normal(self.expect_identifier()?));
            }
        }

        self.consume(Type::Equal)?;
        let value = self.expression_list(&token)?;
        Ok(Stmt::ExtendedUnpacking {
            targets,
            value,
            token,
        })
    }

    /// Statements that begin with an expression: plain expressions, indexed or attribute
    /// assignment and compound assignment.
    fn postfix_statement(&mut self) -> StmtResult {
        let token = self.current.clone();
        let expr = self.expression()?;

        if self.check(Type::Equal) || self.check(Type::Is) {
            if !is_assignable(&expr) {
                return Err(Diagnostic::parser(&self.current, "Target assignment tidak valid"));
            }
            self.advance()?;
            let value = self.expression_list(&token)?;
            Ok(Stmt::Assign {
                target: expr,
                value,
                token,
            })
        } else if self.current.ty.is_compound_assign() {
            if !is_assignable(&expr) {
                return Err(Diagnostic::parser(&self.current, "Target assignment tidak valid"));
            }
            let operator = self.advance()?;
            let value = self.expression()?;
            Ok(Stmt::CompoundAssign {
                target: expr,
                operator,
                value,
            })
        } else {
            Ok(Stmt::expression(expr))
        }
    }

    fn expression_statement(&mut self) -> StmtResult {
        Ok(Stmt::expression(self.expression()?))
    }

    fn print_statement(&mut self) -> StmtResult {
        let token = self.advance()?;

        let parenthesized = self.check(Type::LeftParen);
        let first = self.expression()?;
        let mut values = match first {
            // `tampilkan(a, b)` prints its arguments, not a tuple
            Expr::Tuple { elements, .. } if parenthesized => elements,
            expr => vec![expr],
        };
        while self.match_one(Type::Comma)? {
            values.push(self.expression()?);
        }

        Ok(Stmt::print(values, token))
    }

    fn if_statement(&mut self) -> StmtResult {
        let token = self.advance()?;
        let stmt = self.if_chain(token)?;
        self.consume(Type::End)?;
        Ok(stmt)
    }

    // Parses everything after `jika` up to, but not including, the closing `selesai`.
    // `lainnya jika` nests exactly one `If` so the whole chain shares one terminator.
    fn if_chain(&mut self, token: Token) -> StmtResult {
        let condition = self.expression()?;
        self.match_one(Type::Then)?;
        self.match_one(Type::Colon)?;

        let then_branch = self.block_until(&[Type::Else, Type::When, Type::End])?;

        let has_else = if self.match_one(Type::Else)? {
            true
        } else if self.check(Type::When) && self.peek_type()? == Type::Not {
            self.advance()?;
            self.advance()?;
            true
        } else {
            false
        };

        let else_branch = if !has_else {
            Vec::new()
        } else {
            self.skip_newlines()?;
            if self.check(Type::If) {
                let nested = self.advance()?;
                vec![self.if_chain(nested)?]
            } else {
                self.match_one(Type::Colon)?;
                self.block_until(&[Type::End])?
            }
        };

        Ok(Stmt::if_(condition, then_branch, else_branch, token))
    }

    fn while_statement(&mut self) -> StmtResult {
        let token = self.advance()?;
        let condition = self.expression()?;
        self.match_one(Type::Colon)?;
        let body = self.block_until(&[Type::End])?;
        self.consume(Type::End)?;
        Ok(Stmt::while_(condition, body, token))
    }

    fn for_statement(&mut self) -> StmtResult {
        let token = self.advance()?;
        let each = self.match_one(Type::Each)?;
        let target = self.loop_target()?;

        let (range, iterable) = if self.match_one(Type::From)? {
            let start = self.expression()?;
            if self.match_one(Type::To)? {
                (Some((start, self.expression()?)), None)
            } else {
                (None, Some(start))
            }
        } else if !each && self.match_one(Type::In)? {
            (None, Some(self.expression()?))
        } else {
            return Err(self.expected("'dari' atau 'dalam'"));
        };

        self.match_one(Type::Colon)?;
        let body = Rc::from(self.block_until(&[Type::End])?);
        self.consume(Type::End)?;

        match (range, iterable, target) {
            (Some((start, end)), _, LoopTarget::Name(var)) => Ok(Stmt::For {
                var,
                start,
                end,
                body,
                token,
            }),
            (Some(_), _, LoopTarget::Tuple(_)) => Err(Diagnostic::parser(
                &token,
                "Destrukturisasi variabel hanya dapat digunakan pada perulangan koleksi",
            )),
            (None, Some(iterable), target) => Ok(Stmt::ForEach {
                target,
                iterable,
                body,
                token,
            }),
            (None, None, _) => Err(self.expected("ekspresi")),
        }
    }

    fn loop_target(&mut self) -> Result<LoopTarget, Diagnostic> {
        if self.match_one(Type::LeftParen)? {
            let mut names = vec![self.expect_identifier()?];
            while self.match_one(Type::Comma)? {
                names.push(self.expect_identifier()?);
            }
            self.consume(Type::RightParen)?;
            Ok(LoopTarget::Tuple(names))
        } else {
            Ok(LoopTarget::Name(self.expect_identifier()?))
        }
    }

    fn make_statement(&mut self) -> StmtResult {
        match self.peek_type()? {
            Type::Function => {
                self.advance()?;
                self.advance()?;
                self.function_declaration(false)
            }
            Type::Class => {
                self.advance()?;
                self.advance()?;
                self.class_declaration()
            }
            _ => {
                self.advance()?;
                Err(self.expected("'fungsi' atau 'kelas'"))
            }
        }
    }

    fn async_declaration(&mut self) -> StmtResult {
        let token = self.advance()?;
        self.match_one(Type::Make)?;
        if !self.match_one(Type::Function)? {
            return Err(Diagnostic::parser(
                &token,
                "Kata kunci 'asinkron' hanya dapat digunakan untuk deklarasi fungsi",
            ));
        }
        self.function_declaration(true)
    }

    // Called with the `fungsi` keyword already consumed.
    fn function_declaration(&mut self, is_async: bool) -> StmtResult {
        let name = self.expect_identifier()?;
        Ok(Stmt::FuncDecl(Rc::new(self.function_rest(name, is_async)?)))
    }

    fn function_rest(&mut self, name: Token, is_async: bool) -> Result<FuncDecl, Diagnostic> {
        let params = self.parameters()?;
        let return_type = if self.match_one(Type::Arrow)? {
            Some(self.type_hint()?)
        } else {
            None
        };
        self.match_one(Type::Colon)?;

        let body = self.block_until(&[Type::End])?;
        self.consume(Type::End)?;

        let is_generator = contains_yield(&body);
        Ok(FuncDecl {
            name,
            params,
            return_type,
            body: Rc::from(body),
            is_async,
            is_generator,
        })
    }

    fn parameters(&mut self) -> Result<Vec<Param>, Diagnostic> {
        let mut params = Vec::new();
        if self.match_one(Type::LeftParen)? {
            self.skip_newlines()?;
            while !self.check(Type::RightParen) {
                params.push(self.parameter()?);
                self.skip_newlines()?;
                if !self.match_one(Type::Comma)? {
                    break;
                }
                self.skip_newlines()?;
            }
            self.consume(Type::RightParen)?;
        } else if self.match_one(Type::With)? {
            params.push(self.parameter()?);
            while self.match_one(Type::Comma)? {
                params.push(self.parameter()?);
            }
        }
        Ok(params)
    }

    fn parameter(&mut self) -> Result<Param, Diagnostic> {
        let name = self.expect_identifier()?;
        let type_hint = if self.match_one(Type::Colon)? {
            Some(self.type_hint()?)
        } else {
            None
        };
        let default = if self.match_one(Type::Equal)? {
            Some(self.expression()?)
        } else {
            None
        };
        Ok(Param {
            name,
            type_hint,
            default,
        })
    }

    // Called with the `kelas` keyword already consumed.
    fn class_declaration(&mut self) -> StmtResult {
        let name = self.expect_identifier()?;
        let parent = if self.match_one(Type::Extends)? {
            Some(self.expect_identifier()?)
        } else if self.match_one(Type::LeftParen)? {
            let parent = self.expect_identifier()?;
            self.consume(Type::RightParen)?;
            Some(parent)
        } else {
            None
        };
        self.match_one(Type::Colon)?;

        let mut constructor = None;
        let mut methods = Vec::new();
        let mut attributes = Vec::new();
        loop {
            self.skip_newlines()?;
            let make_function = self.check(Type::Make) && self.peek_type()? == Type::Function;
            match self.current.ty {
                Type::End | Type::Eof => break,
                Type::Constructor => {
                    let token = self.advance()?;
                    constructor = Some(Rc::new(self.function_rest(token, false)?));
                }
                Type::Method | Type::Function => {
                    self.advance()?;
                    let name = self.expect_identifier()?;
                    methods.push(Rc::new(self.function_rest(name, false)?));
                }
                Type::Make if make_function => {
                    self.advance()?;
                    self.advance()?;
                    let name = self.expect_identifier()?;
                    methods.push(Rc::new(self.function_rest(name, false)?));
                }
                Type::Async => {
                    self.advance()?;
                    self.match_one(Type::Make)?;
                    if !self.match_one(Type::Method)? {
                        self.consume(Type::Function)?;
                    }
                    let name = self.expect_identifier()?;
                    methods.push(Rc::new(self.function_rest(name, true)?));
                }
                Type::Identifier => {
                    let (name, _, value) = self.declaration_parts()?;
                    attributes.push((name, value));
                }
                _ => return Err(self.expected("'konstruktor', 'metode' atau atribut kelas")),
            }
        }
        self.consume(Type::End)?;

        Ok(Stmt::ClassDecl(Rc::new(ClassDecl {
            name,
            parent,
            constructor,
            methods,
            attributes,
        })))
    }

    fn return_statement(&mut self) -> StmtResult {
        let token = self.advance()?;
        let value = if self.at_statement_end() {
            None
        } else {
            Some(self.expression_list(&token)?)
        };
        Ok(Stmt::return_(value, token))
    }

    fn yield_statement(&mut self) -> StmtResult {
        let token = self.advance()?;
        if self.match_one(Type::From)? {
            let value = self.expression()?;
            Ok(Stmt::YieldFrom { value, token })
        } else {
            let value = if self.at_statement_end() {
                None
            } else {
                Some(self.expression()?)
            };
            Ok(Stmt::Yield { value, token })
        }
    }

    fn store_statement(&mut self) -> StmtResult {
        let token = self.advance()?;
        let mut targets = vec![self.store_target()?];
        while self.match_one(Type::Comma)? {
            targets.push(self.store_target()?);
        }
        self.consume(Type::Into)?;
        let value = self.expression_list(&token)?;

        if targets.len() == 1 {
            let target = targets.remove(0);
            Ok(Stmt::Assign {
                target,
                value,
                token,
            })
        } else {
            Ok(Stmt::MultiAssign {
                targets,
                value,
                token,
            })
        }
    }

    fn store_target(&mut self) -> ExprResult {
        let target = self.postfix()?;
        if is_assignable(&target) {
            Ok(target)
        } else {
            Err(Diagnostic::parser(target.token(), "Target assignment tidak valid"))
        }
    }

    fn import_statement(&mut self) -> StmtResult {
        let token = self.advance()?;
        let module = self.module_name()?;
        let alias = if self.match_one(Type::As)? {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        Ok(Stmt::Import {
            module,
            alias,
            token,
        })
    }

    fn from_import_statement(&mut self) -> StmtResult {
        let token = self.advance()?;
        let module = self.module_name()?;
        self.consume(Type::Import)?;

        let mut names = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let alias = if self.match_one(Type::As)? {
                Some(self.expect_identifier()?)
            } else {
                None
            };
            names.push((name, alias));
            if !self.match_one(Type::Comma)? {
                break;
            }
        }

        Ok(Stmt::FromImport {
            module,
            names,
            token,
        })
    }

    fn python_import_statement(&mut self) -> StmtResult {
        let token = self.advance()?;
        let module = self.module_name()?;
        let alias = if self.match_one(Type::As)? {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        Ok(Stmt::PythonImport {
            module,
            alias,
            token,
        })
    }

    // A dotted module path or a string literal naming one.
    fn module_name(&mut self) -> Result<String, Diagnostic> {
        if self.check(Type::String) {
            let token = self.advance()?;
            return Ok(token.value.to_string());
        }

        let mut name = self.expect_identifier()?.lexeme;
        while self.match_one(Type::Dot)? {
            name.push('.');
            name.push_str(&self.expect_identifier()?.lexeme);
        }
        Ok(name)
    }

    fn call_statement(&mut self) -> StmtResult {
        let token = self.advance()?;
        let mut callee = Expr::var(self.expect_identifier()?);
        while self.match_one(Type::Dot)? {
            callee = Expr::attribute(callee, self.attribute_name()?);
        }

        let (args, kwargs) = if self.match_one(Type::LeftParen)? {
            self.arguments()?
        } else if self.match_one(Type::With)? {
            let mut args = vec![self.expression()?];
            while self.match_one(Type::Comma)? {
                args.push(self.expression()?);
            }
            (args, Vec::new())
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(Stmt::expression(self.make_call(callee, args, kwargs, token)))
    }

    fn try_statement(&mut self) -> StmtResult {
        let token = self.advance()?;
        self.match_one(Type::Colon)?;
        let body = self.block_until(&[Type::Catch, Type::Finally, Type::End])?;

        let mut handlers = Vec::new();
        while self.match_one(Type::Catch)? {
            let exception_type = if self.check(Type::Identifier) {
                let mut name = self.advance()?.lexeme;
                while self.match_one(Type::Dot)? {
                    name.push('.');
                    name.push_str(&self.attribute_name()?.lexeme);
                }
                Some(name)
            } else {
                None
            };
            let binding = if self.match_one(Type::As)? {
                Some(self.expect_identifier()?)
            } else {
                None
            };
            self.match_one(Type::Colon)?;
            let body = self.block_until(&[Type::Catch, Type::Finally, Type::End])?;
            handlers.push(CatchClause {
                exception_type,
                binding,
                body: Rc::from(body),
            });
        }

        let finally = if self.match_one(Type::Finally)? {
            self.match_one(Type::Colon)?;
            Some(Rc::from(self.block_until(&[Type::End])?))
        } else {
            None
        };

        if handlers.is_empty() && finally.is_none() {
            return Err(Diagnostic::parser(
                &token,
                "Blok 'coba' tidak lengkap: diperlukan 'tangkap' atau 'akhirnya'",
            ));
        }

        self.consume(Type::End)?;
        Ok(Stmt::TryCatch {
            body: Rc::from(body),
            handlers,
            finally,
            token,
        })
    }

    fn switch_statement(&mut self) -> StmtResult {
        let token = self.advance()?;
        let subject = self.expression()?;
        self.match_one(Type::Colon)?;
        self.skip_newlines()?;

        let mut cases = Vec::new();
        while self.check(Type::Case) {
            let case_token = self.advance()?;
            let mut values = vec![self.expression()?];
            while self.match_one(Type::Comma)? {
                values.push(self.expression()?);
            }
            self.match_one(Type::Colon)?;
            let body = self.block_until(&[Type::Case, Type::Default, Type::End])?;
            cases.push(Case {
                values,
                body: Rc::from(body),
                token: case_token,
            });
        }

        let default = if self.match_one(Type::Default)? {
            self.match_one(Type::Colon)?;
            Some(Rc::from(self.block_until(&[Type::End])?))
        } else {
            None
        };

        self.consume(Type::End)?;
        Ok(Stmt::Switch {
            subject,
            cases,
            default,
            token,
        })
    }

    fn with_statement(&mut self) -> StmtResult {
        let token = self.advance()?;
        let context = self.expression()?;
        let binding = if self.match_one(Type::As)? {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        self.match_one(Type::Colon)?;
        let body = self.block_until(&[Type::End])?;
        self.consume(Type::End)?;
        Ok(Stmt::With {
            context,
            binding,
            body: Rc::from(body),
            token,
        })
    }

    fn decorator_statement(&mut self) -> StmtResult {
        let token = self.advance()?;
        let mut name = self.expect_identifier()?.lexeme;
        while self.match_one(Type::Dot)? {
            name.push('.');
            name.push_str(&self.attribute_name()?.lexeme);
        }

        let args = if self.match_one(Type::LeftParen)? {
            self.arguments()?.0
        } else {
            Vec::new()
        };
        self.skip_newlines()?;

        let target = match self.current.ty {
            Type::Function | Type::Class | Type::Make | Type::Async | Type::At => self.statement()?,
            _ => {
                return Err(Diagnostic::parser(
                    &self.current,
                    "Dekorator hanya dapat diterapkan pada fungsi atau kelas",
                ))
            }
        };

        Ok(Stmt::Decorator {
            name,
            args,
            target: Box::new(target),
            token,
        })
    }

    fn type_alias_statement(&mut self) -> StmtResult {
        self.advance()?;
        let name = self.expect_identifier()?;
        if !self.match_either(&[Type::Equal, Type::Is])? {
            return Err(self.expected("'='"));
        }
        let hint = self.type_hint()?;
        Ok(Stmt::TypeAlias { name, hint })
    }

    // Parses statements until one of the terminators (or eof) is current. The terminator is
    // left for the caller to consume.
    fn block_until(&mut self, terminators: &[Type]) -> BlockResult {
        let mut stmts = Vec::new();
        loop {
            self.skip_newlines()?;
            if self.check(Type::End) && self.peek_type()? == Type::Is {
                return Err(self.end_as_name_error());
            }
            if self.check(Type::Eof) || terminators.contains(&self.current.ty) {
                break;
            }
            stmts.push(self.nested(Self::statement)?);
        }
        Ok(stmts)
    }

    fn expression_list(&mut self, token: &Token) -> ExprResult {
        let first = self.expression()?;
        if !self.check(Type::Comma) {
            return Ok(first);
        }

        let mut elements = vec![first];
        while self.match_one(Type::Comma)? {
            elements.push(self.expression()?);
        }
        Ok(Expr::Tuple {
            elements,
            token: token.clone(),
        })
    }

    pub(crate) fn expression(&mut self) -> ExprResult {
        self.nested(Self::ternary)
    }

    // Every self-recursive production goes through here so that hostile input ends in a
    // diagnostic instead of exhausting the native stack.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, Diagnostic>) -> Result<T, Diagnostic> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(Diagnostic::parser(
                &self.current,
                format!("Struktur bersarang terlalu dalam (maksimum {} tingkat)", MAX_NESTING_DEPTH),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn ternary(&mut self) -> ExprResult {
        let expr = self.or_expression()?;
        if !self.check(Type::If) {
            return Ok(expr);
        }

        let token = self.advance()?;
        let condition = self.or_expression()?;
        self.consume(Type::Else)?;
        let otherwise = self.nested(Self::ternary)?;
        Ok(Expr::Ternary {
            condition: Box::new(condition),
            then: Box::new(expr),
            otherwise: Box::new(otherwise),
            token,
        })
    }

    fn or_expression(&mut self) -> ExprResult {
        let mut expr = self.and_expression()?;
        while self.check(Type::Or) {
            let operator = self.advance()?;
            let right = self.and_expression()?;
            expr = Expr::logical(expr, operator, right);
        }
        Ok(expr)
    }

    fn and_expression(&mut self) -> ExprResult {
        let mut expr = self.not_expression()?;
        while self.check(Type::And) {
            let operator = self.advance()?;
            let right = self.not_expression()?;
            expr = Expr::logical(expr, operator, right);
        }
        Ok(expr)
    }

    fn not_expression(&mut self) -> ExprResult {
        if self.check(Type::Not) {
            let operator = self.advance()?;
            Ok(Expr::unary(operator, self.nested(Self::not_expression)?))
        } else {
            self.comparison()
        }
    }

    fn comparison(&mut self) -> ExprResult {
        let mut expr = self.bit_or()?;
        loop {
            if self.check(Type::Not) && self.peek_type()? == Type::In {
                // `a tidak dalam b` is `tidak (a dalam b)`
                let not = self.advance()?;
                let operator = self.advance()?;
                let right = self.bit_or()?;
                expr = Expr::unary(not, Expr::binary(expr, operator, right));
            } else if matches!(
                self.current.ty,
                Type::EqualEqual
                    | Type::BangEqual
                    | Type::Less
                    | Type::LessEqual
                    | Type::Greater
                    | Type::GreaterEqual
                    | Type::In
            ) {
                let operator = self.advance()?;
                let right = self.bit_or()?;
                expr = Expr::binary(expr, operator, right);
            } else {
                return Ok(expr);
            }
        }
    }

    fn bit_or(&mut self) -> ExprResult {
        let mut expr = self.bit_xor()?;
        while self.check(Type::Pipe) {
            let operator = self.advance()?;
            expr = Expr::binary(expr, operator, self.bit_xor()?);
        }
        Ok(expr)
    }

    fn bit_xor(&mut self) -> ExprResult {
        let mut expr = self.bit_and()?;
        while self.check(Type::Caret) {
            let operator = self.advance()?;
            expr = Expr::binary(expr, operator, self.bit_and()?);
        }
        Ok(expr)
    }

    fn bit_and(&mut self) -> ExprResult {
        let mut expr = self.shift()?;
        while self.check(Type::Amp) {
            let operator = self.advance()?;
            expr = Expr::binary(expr, operator, self.shift()?);
        }
        Ok(expr)
    }

    fn shift(&mut self) -> ExprResult {
        let mut expr = self.term()?;
        while self.check(Type::LessLess) || self.check(Type::GreaterGreater) {
            let operator = self.advance()?;
            expr = Expr::binary(expr, operator, self.term()?);
        }
        Ok(expr)
    }

    fn term(&mut self) -> ExprResult {
        let mut expr = self.factor()?;
        while self.check(Type::Plus) || self.check(Type::Minus) {
            let operator = self.advance()?;
            expr = Expr::binary(expr, operator, self.factor()?);
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ExprResult {
        let mut expr = self.unary()?;
        while matches!(
            self.current.ty,
            Type::Star | Type::Slash | Type::Percent | Type::SlashSlash
        ) {
            let operator = self.advance()?;
            expr = Expr::binary(expr, operator, self.unary()?);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ExprResult {
        if matches!(self.current.ty, Type::Minus | Type::Plus | Type::Tilde) {
            let operator = self.advance()?;
            Ok(Expr::unary(operator, self.nested(Self::unary)?))
        } else {
            self.power()
        }
    }

    fn power(&mut self) -> ExprResult {
        let base = self.await_expression()?;
        if self.check(Type::StarStar) {
            let operator = self.advance()?;
            // right associative, and binds tighter than a unary minus on its left
            let exponent = self.unary()?;
            Ok(Expr::binary(base, operator, exponent))
        } else {
            Ok(base)
        }
    }

    fn await_expression(&mut self) -> ExprResult {
        if self.check(Type::Await) {
            let token = self.advance()?;
            let value = self.nested(Self::await_expression)?;
            Ok(Expr::Await {
                value: Box::new(value),
                token,
            })
        } else {
            self.postfix()
        }
    }

    fn postfix(&mut self) -> ExprResult {
        let mut expr = self.primary()?;
        loop {
            if self.check(Type::LeftParen) {
                let token = self.advance()?;
                let (args, kwargs) = self.arguments()?;
                expr = self.make_call(expr, args, kwargs, token);
            } else if self.check(Type::LeftBracket) {
                let token = self.advance()?;
                expr = self.subscript(expr, token)?;
            } else if self.match_one(Type::Dot)? {
                expr = Expr::attribute(expr, self.attribute_name()?);
            } else {
                return Ok(expr);
            }
        }
    }

    fn make_call(&self, callee: Expr, args: Vec<Expr>, kwargs: Vec<(Token, Expr)>, token: Token) -> Expr {
        match callee {
            Expr::AttributeRef { object, name } => Expr::MethodCall {
                object,
                method: name,
                args,
                kwargs,
            },
            callee => Expr::call(callee, args, kwargs, token),
        }
    }

    // Called after '(' has been consumed; consumes the closing ')'.
    fn arguments(&mut self) -> ArgsResult {
        let mut args = Vec::new();
        let mut kwargs = Vec::new();

        self.skip_newlines()?;
        while !self.check(Type::RightParen) {
            if self.check(Type::Identifier) && self.peek_type()? == Type::Equal {
                let name = self.advance()?;
                self.advance()?;
                kwargs.push((name, self.expression()?));
            } else {
                args.push(self.expression()?);
            }

            self.skip_newlines()?;
            if !self.match_one(Type::Comma)? {
                break;
            }
            self.skip_newlines()?;
        }
        self.consume(Type::RightParen)?;

        Ok((args, kwargs))
    }

    // Called after '[' has been consumed.
    fn subscript(&mut self, object: Expr, token: Token) -> ExprResult {
        self.skip_newlines()?;
        let start = if self.check(Type::Colon) {
            None
        } else {
            Some(Box::new(self.expression()?))
        };

        if self.match_one(Type::Colon)? {
            let end = if self.check(Type::RightBracket) {
                None
            } else {
                Some(Box::new(self.expression()?))
            };
            self.skip_newlines()?;
            self.consume(Type::RightBracket)?;
            return Ok(Expr::Slice {
                object: Box::new(object),
                start,
                end,
                token,
            });
        }

        self.skip_newlines()?;
        self.consume(Type::RightBracket)?;
        match start {
            Some(index) => Ok(Expr::index(object, *index, token)),
            None => Err(self.expected("indeks")),
        }
    }

    // Attribute and method names may reuse keyword spellings, e.g. `obj.tipe`.
    fn attribute_name(&mut self) -> Result<Token, Diagnostic> {
        if self.check(Type::Identifier) {
            self.advance()
        } else if self.current.ty.is_keyword() {
            let token = self.advance()?;
            Ok(Token::identifier_at(&token.lexeme, &token))
        } else {
            Err(self.expected("nama atribut"))
        }
    }

    fn primary(&mut self) -> ExprResult {
        match self.current.ty {
            Type::Integer | Type::Float | Type::String | Type::True | Type::False | Type::Nil => {
                let token = self.advance()?;
                Ok(Expr::literal(token.value.clone(), token))
            }
            Type::FString => {
                let token = self.advance()?;
                self.fstring(token)
            }
            Type::Identifier => Ok(Expr::var(self.advance()?)),
            Type::SelfKw => Ok(Expr::SelfVar {
                token: self.advance()?,
            }),
            Type::LeftParen => self.parenthesized(),
            Type::LeftBracket => self.list_display(),
            Type::LeftBrace => self.dict_display(),
            Type::Lambda => self.lambda(),
            Type::CallPython => self.python_call(),
            _ => Err(self.expected("ekspresi")),
        }
    }

    fn parenthesized(&mut self) -> ExprResult {
        let token = self.advance()?;
        self.skip_newlines()?;
        if self.match_one(Type::RightParen)? {
            return Ok(Expr::Tuple {
                elements: Vec::new(),
                token,
            });
        }

        let first = self.expression()?;
        self.skip_newlines()?;
        if self.match_one(Type::RightParen)? {
            return Ok(first);
        }

        let mut elements = vec![first];
        while self.match_one(Type::Comma)? {
            self.skip_newlines()?;
            if self.check(Type::RightParen) {
                break;
            }
            elements.push(self.expression()?);
            self.skip_newlines()?;
        }
        self.consume(Type::RightParen)?;
        Ok(Expr::Tuple { elements, token })
    }

    fn list_display(&mut self) -> ExprResult {
        let token = self.advance()?;
        self.skip_newlines()?;
        if self.match_one(Type::RightBracket)? {
            return Ok(Expr::List {
                elements: Vec::new(),
                token,
            });
        }

        let first = self.expression()?;
        self.skip_newlines()?;

        if self.match_one(Type::For)? {
            self.match_one(Type::Each)?;
            let target = self.loop_target()?;
            if !self.match_either(&[Type::From, Type::In])? {
                return Err(self.expected("'dari' atau 'dalam'"));
            }
            let iterable = self.or_expression()?;
            let condition = if self.match_one(Type::If)? {
                Some(Box::new(self.or_expression()?))
            } else {
                None
            };
            self.skip_newlines()?;
            self.consume(Type::RightBracket)?;
            return Ok(Expr::ListComp {
                element: Box::new(first),
                target,
                iterable: Box::new(iterable),
                condition,
                token,
            });
        }

        let mut elements = vec![first];
        while self.match_one(Type::Comma)? {
            self.skip_newlines()?;
            if self.check(Type::RightBracket) {
                break;
            }
            elements.push(self.expression()?);
            self.skip_newlines()?;
        }
        self.consume(Type::RightBracket)?;
        Ok(Expr::List { elements, token })
    }

    fn dict_display(&mut self) -> ExprResult {
        let token = self.advance()?;
        let mut entries = Vec::new();
        self.skip_newlines()?;
        while !self.check(Type::RightBrace) {
            let key = self.expression()?;
            self.consume(Type::Colon)?;
            self.skip_newlines()?;
            let value = self.expression()?;
            entries.push((key, value));

            self.skip_newlines()?;
            if !self.match_one(Type::Comma)? {
                break;
            }
            self.skip_newlines()?;
        }
        self.consume(Type::RightBrace)?;
        Ok(Expr::Dict { entries, token })
    }

    fn lambda(&mut self) -> ExprResult {
        let token = self.advance()?;
        let mut params = Vec::new();
        if self.match_one(Type::LeftParen)? {
            while !self.check(Type::RightParen) {
                params.push(self.expect_identifier()?);
                if !self.match_one(Type::Comma)? {
                    break;
                }
            }
            self.consume(Type::RightParen)?;
        } else if self.match_one(Type::With)? {
            params.push(self.expect_identifier()?);
            while self.match_one(Type::Comma)? {
                params.push(self.expect_identifier()?);
            }
        }

        if !self.match_either(&[Type::Arrow, Type::Colon])? {
            return Err(self.expected("'->'"));
        }
        let body = self.expression()?;
        Ok(Expr::Lambda {
            params,
            body: Rc::new(body),
            token,
        })
    }

    fn python_call(&mut self) -> ExprResult {
        let token = self.advance()?;
        let mut callee = Expr::var(self.expect_identifier()?);
        while self.match_one(Type::Dot)? {
            callee = Expr::attribute(callee, self.attribute_name()?);
        }

        let (args, kwargs) = if self.match_one(Type::LeftParen)? {
            self.arguments()?
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(Expr::PythonCall {
            callee: Box::new(callee),
            args,
            kwargs,
            token,
        })
    }

    fn fstring(&mut self, token: Token) -> ExprResult {
        let text = match &token.value {
            Literal::Str(text) => text.clone(),
            _ => String::new(),
        };

        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = text.char_indices().peekable();
        while let Some((offset, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut depth = 1;
                    let mut source = String::new();
                    for (_, c) in chars.by_ref() {
                        match c {
                            '{' => depth += 1,
                            '}' => depth -= 1,
                            _ => {}
                        }
                        if depth == 0 {
                            break;
                        }
                        source.push(c);
                    }
                    if depth != 0 {
                        return Err(Diagnostic::parser(&token, "Kurung kurawal pada f-string tidak ditutup"));
                    }

                    if !literal.is_empty() {
                        parts.push(FStringPart::Text(std::mem::take(&mut literal)));
                    }
                    // 'f' and the opening quote precede the content
                    let column = token.column + 2 + text[..offset].chars().count() + 1;
                    let mut parser = Parser::new(Lexer::with_position(&source, token.line, column))?;
                    parser.depth = self.depth;
                    let expr = parser.expression()?;
                    if !parser.check(Type::Eof) {
                        return Err(parser.expected("'}'"));
                    }
                    parts.push(FStringPart::Expr(expr));
                }
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            parts.push(FStringPart::Text(literal));
        }

        Ok(Expr::FString { parts, token })
    }

    fn expect_identifier(&mut self) -> Result<Token, Diagnostic> {
        if self.check(Type::Identifier) {
            self.advance()
        } else if self.check(Type::End) {
            Err(self.end_as_name_error())
        } else if self.current.ty.is_keyword() {
            Err(self.reserved_keyword_error())
        } else {
            Err(self.expected(&Type::Identifier.to_string()))
        }
    }

    fn reserved_keyword_error(&self) -> Diagnostic {
        let keyword = &self.current.lexeme;
        Diagnostic::parser(
            &self.current,
            format!(
                "Kata kunci '{0}' tidak dapat digunakan sebagai nama variabel. \
                 Ini adalah reserved keyword dalam RenzmcLang. \
                 Gunakan nama yang berbeda (contoh: '{0}_value', '{0}_data', 'my_{0}', dll).",
                keyword
            ),
        )
    }

    fn end_as_name_error(&self) -> Diagnostic {
        Diagnostic::parser(
            &self.current,
            "Kata kunci 'akhir' atau 'selesai' tidak dapat digunakan sebagai nama variabel. \
             Ini adalah reserved keyword dalam RenzmcLang. \
             Gunakan nama yang berbeda seperti: 'akhir_waktu', 'waktu_akhir', 'end_time', 'akhir_data', dll.",
        )
    }

    fn expected(&self, what: &str) -> Diagnostic {
        let found = match self.current.ty {
            Type::Newline => String::from("baris baru"),
            Type::Eof => String::from("akhir file"),
            _ => format!("'{}'", self.current.lexeme),
        };
        Diagnostic::parser(&self.current, format!("Diharapkan {}, ditemukan {}", what, found))
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.current.ty,
            Type::Newline
                | Type::Eof
                | Type::End
                | Type::Else
                | Type::When
                | Type::Case
                | Type::Default
                | Type::Catch
                | Type::Finally
        )
    }

    fn skip_newlines(&mut self) -> Result<(), Diagnostic> {
        while self.check(Type::Newline) {
            self.advance()?;
        }
        Ok(())
    }

    fn check(&self, ty: Type) -> bool {
        self.current.ty == ty
    }

    fn peek_type(&mut self) -> Result<Type, Diagnostic> {
        Ok(self.lexer.peek_token()?.ty)
    }

    fn consume(&mut self, ty: Type) -> Result<Token, Diagnostic> {
        if self.check(ty) {
            self.advance()
        } else {
            Err(self.expected(&ty.to_string()))
        }
    }

    // Returns the token that was current before advancing.
    fn advance(&mut self) -> Result<Token, Diagnostic> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn match_either(&mut self, types: &[Type]) -> Result<bool, Diagnostic> {
        for ty in types {
            if self.match_one(*ty)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn match_one(&mut self, ty: Type) -> Result<bool, Diagnostic> {
        if self.check(ty) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Var { .. } | Expr::IndexAccess { .. } | Expr::AttributeRef { .. }
    )
}

#[cfg(test)]
mod tests {
    use renzmc_core::{ErrorKind, Literal, Token, Type};

    use crate::ast::{Expr, LoopTarget, Stmt, UnpackTarget};
    use crate::parser::parse;

    macro_rules! token {
        ($ty:ident, $lex:literal, $line:literal, $col:literal) => {
            Token::new(Type::$ty, String::from($lex), $line, $col, Literal::Nil)
        };
    }

    fn int(n: i64, line: usize, column: usize) -> Expr {
        let token = Token::new(Type::Integer, n.to_string(), line, column, Literal::Int(n));
        Expr::literal(n, token)
    }

    fn single(source: &str) -> Stmt {
        let mut program = parse(source).unwrap();
        assert_eq!(program.statements.len(), 1, "{:?}", program.statements);
        program.statements.remove(0)
    }

    #[test]
    fn test_statements() {
        let tests = [
            // declaration with a binary expression
            (
                "x itu 3 + 4",
                Stmt::var_decl(
                    token!(Identifier, "x", 1, 1),
                    None,
                    Expr::binary(int(3, 1, 7), token!(Plus, "+", 1, 9), int(4, 1, 11)),
                ),
            ),
            // power binds tighter than unary minus
            (
                "-2 ** 2",
                Stmt::expression(Expr::unary(
                    token!(Minus, "-", 1, 1),
                    Expr::binary(int(2, 1, 2), token!(StarStar, "**", 1, 4), int(2, 1, 7)),
                )),
            ),
            // logical operators
            (
                "a dan b atau c",
                Stmt::expression(Expr::logical(
                    Expr::logical(
                        Expr::var(token!(Identifier, "a", 1, 1)),
                        token!(And, "dan", 1, 3),
                        Expr::var(token!(Identifier, "b", 1, 7)),
                    ),
                    token!(Or, "atau", 1, 9),
                    Expr::var(token!(Identifier, "c", 1, 14)),
                )),
            ),
            // not in
            (
                "a tidak dalam b",
                Stmt::expression(Expr::unary(
                    token!(Not, "tidak", 1, 3),
                    Expr::binary(
                        Expr::var(token!(Identifier, "a", 1, 1)),
                        token!(In, "dalam", 1, 9),
                        Expr::var(token!(Identifier, "b", 1, 15)),
                    ),
                )),
            ),
            // print with several values
            (
                "tampilkan a, 1",
                Stmt::print(
                    vec![Expr::var(token!(Identifier, "a", 1, 11)), int(1, 1, 14)],
                    token!(Print, "tampilkan", 1, 1),
                ),
            ),
            // parenthesised print arguments are not a tuple
            (
                "tampilkan(a, 1)",
                Stmt::print(
                    vec![Expr::var(token!(Identifier, "a", 1, 11)), int(1, 1, 14)],
                    token!(Print, "tampilkan", 1, 1),
                ),
            ),
            // while loop
            (
                "selama x < 3\n  x += 1\nselesai",
                Stmt::while_(
                    Expr::binary(
                        Expr::var(token!(Identifier, "x", 1, 8)),
                        token!(Less, "<", 1, 10),
                        int(3, 1, 12),
                    ),
                    vec![Stmt::CompoundAssign {
                        target: Expr::var(token!(Identifier, "x", 2, 3)),
                        operator: token!(PlusEqual, "+=", 2, 5),
                        value: int(1, 2, 8),
                    }],
                    token!(While, "selama", 1, 1),
                ),
            ),
            // bare return
            ("hasil", Stmt::return_(None, token!(Return, "hasil", 1, 1))),
            // `hasil itu` declares a variable
            (
                "hasil itu 1",
                Stmt::var_decl(token!(Identifier, "hasil", 1, 1), None, int(1, 1, 11)),
            ),
        ];

        for (source, expected) in tests {
            assert_eq!(single(source), expected, "{}", source);
        }
    }

    #[test]
    fn test_else_if_chain_nests_one_if() {
        let source = "jika a maka\n  tampilkan 1\nlainnya jika b\n  tampilkan 2\nkalau tidak\n  tampilkan 3\nselesai";
        let stmt = single(source);

        let Stmt::If { else_branch, .. } = stmt else {
            panic!("expected if");
        };
        assert_eq!(else_branch.len(), 1);

        let Stmt::If {
            condition,
            then_branch,
            else_branch,
            ..
        } = &else_branch[0]
        else {
            panic!("expected nested if");
        };
        assert_eq!(condition, &Expr::var(token!(Identifier, "b", 3, 14)));
        assert_eq!(then_branch.len(), 1);
        assert_eq!(else_branch.len(), 1);
        assert!(matches!(else_branch[0], Stmt::Print { .. }));
    }

    #[test]
    fn test_assignment_forms() {
        assert!(matches!(
            single("a, b itu 1, 2"),
            Stmt::MultiVarDecl { ref names, value: Expr::Tuple { .. }, .. } if names.len() == 2
        ));
        assert!(matches!(
            single("a, b = b, a"),
            Stmt::MultiAssign { ref targets, .. } if targets.len() == 2
        ));
        assert!(matches!(single("x = 1"), Stmt::Assign { target: Expr::Var { .. }, .. }));
        assert!(matches!(
            single("d[\"k\"] itu 5"),
            Stmt::Assign { target: Expr::IndexAccess { .. }, .. }
        ));
        assert!(matches!(
            single("diri.nama = n"),
            Stmt::Assign { target: Expr::AttributeRef { .. }, .. }
        ));
        assert!(matches!(
            single("simpan x ke 5"),
            Stmt::Assign { target: Expr::Var { .. }, .. }
        ));
        assert!(matches!(
            single("simpan a, b ke 1, 2"),
            Stmt::MultiAssign { value: Expr::Tuple { .. }, .. }
        ));

        match single("a, *sisa = xs") {
            Stmt::ExtendedUnpacking { targets, .. } => {
                assert!(matches!(targets[0], UnpackTarget::Normal(_)));
                assert!(matches!(targets[1], UnpackTarget::Starred(_)));
            }
            other => panic!("unexpected {:?}", other),
        }

        let error = parse("f() = 1").unwrap_err();
        assert_eq!(error.message, "Target assignment tidak valid");
    }

    #[test]
    fn test_loops() {
        assert!(matches!(
            single("untuk i dari 1 sampai 3\n tampilkan i\nselesai"),
            Stmt::For { .. }
        ));
        assert!(matches!(
            single("untuk x dalam xs: tampilkan x selesai"),
            Stmt::ForEach { target: LoopTarget::Name(_), .. }
        ));
        assert!(matches!(
            single("untuk setiap (k, v) dari pasangan\n tampilkan k\nselesai"),
            Stmt::ForEach { target: LoopTarget::Tuple(ref names), .. } if names.len() == 2
        ));
    }

    #[test]
    fn test_functions_and_classes() {
        let source = "fungsi tambah(a: int, b = 2) -> int:\n  hasil a + b\nselesai";
        match single(source) {
            Stmt::FuncDecl(decl) => {
                assert_eq!(decl.name.lexeme, "tambah");
                assert_eq!(decl.params.len(), 2);
                assert_eq!(decl.params[0].type_hint.as_ref().unwrap().name, "int");
                assert!(decl.params[1].default.is_some());
                assert_eq!(decl.return_type.as_ref().unwrap().name, "int");
                assert!(!decl.is_generator);
            }
            other => panic!("unexpected {:?}", other),
        }

        match single("buat fungsi hitung dengan n\n  hasil_bertahap n\nselesai") {
            Stmt::FuncDecl(decl) => assert!(decl.is_generator),
            other => panic!("unexpected {:?}", other),
        }

        let class = "kelas Anjing warisi Hewan:\n  suara itu \"guk\"\n  konstruktor(nama)\n    diri.nama = nama\n  selesai\n  metode bicara()\n    hasil diri.suara\n  selesai\nselesai";
        match single(class) {
            Stmt::ClassDecl(decl) => {
                assert_eq!(decl.parent.as_ref().unwrap().lexeme, "Hewan");
                assert!(decl.constructor.is_some());
                assert_eq!(decl.methods.len(), 1);
                assert_eq!(decl.attributes.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }

        let class = "kelas Titik(Dasar)\n  buat fungsi geser(dx)\n    hasil dx\n  selesai\n  asinkron metode muat()\n    hasil 1\n  selesai\nselesai";
        match single(class) {
            Stmt::ClassDecl(decl) => {
                assert_eq!(decl.parent.as_ref().unwrap().lexeme, "Dasar");
                assert_eq!(decl.methods.len(), 2);
                assert_eq!(decl.methods[0].name.lexeme, "geser");
                assert!(decl.methods[1].is_async);
            }
            other => panic!("unexpected {:?}", other),
        }

        let error = parse("asinkron x itu 1").unwrap_err();
        assert_eq!(
            error.message,
            "Kata kunci 'asinkron' hanya dapat digunakan untuk deklarasi fungsi"
        );
    }

    #[test]
    fn test_try_switch_with_and_decorators() {
        let source = "coba\n  x itu 1 / 0\ntangkap ZeroDivisionError sebagai e\n  tampilkan e\nakhirnya\n  tampilkan 0\nselesai";
        match single(source) {
            Stmt::TryCatch {
                handlers, finally, ..
            } => {
                assert_eq!(handlers.len(), 1);
                assert_eq!(handlers[0].exception_type.as_deref(), Some("ZeroDivisionError"));
                assert_eq!(handlers[0].binding.as_ref().unwrap().lexeme, "e");
                assert!(finally.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }

        let source = "cocok x\n  kasus 1, 2:\n    tampilkan \"kecil\"\n  kasus 3\n    tampilkan \"tiga\"\n  bawaan:\n    tampilkan \"lain\"\nselesai";
        match single(source) {
            Stmt::Switch { cases, default, .. } => {
                assert_eq!(cases.len(), 2);
                assert_eq!(cases[0].values.len(), 2);
                assert!(default.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            single("dengan buka(\"f\") sebagai f\n  tampilkan f\nselesai"),
            Stmt::With { binding: Some(_), .. }
        ));

        match single("@cache.simpan(10)\nfungsi f()\n  hasil 1\nselesai") {
            Stmt::Decorator { name, args, target, .. } => {
                assert_eq!(name, "cache.simpan");
                assert_eq!(args.len(), 1);
                assert!(matches!(*target, Stmt::FuncDecl(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_incomplete_try_is_rejected() {
        let error = parse("coba\n  x itu 1\nselesai").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Parser);
        assert_eq!(
            error.message,
            "Blok 'coba' tidak lengkap: diperlukan 'tangkap' atau 'akhirnya'"
        );
        assert_eq!((error.line, error.column), (Some(1), Some(1)));
    }

    #[test]
    fn test_reserved_keywords_as_names() {
        let error = parse("selesai itu 5").unwrap_err();
        assert!(error
            .message
            .starts_with("Kata kunci 'akhir' atau 'selesai' tidak dapat digunakan sebagai nama variabel."));

        let error = parse("x itu 1\nselama benar\n  selesai itu 2\nselesai").unwrap_err();
        assert!(error.message.contains("'akhir_waktu'"));
        assert_eq!(error.line, Some(3));

        let error = parse("untuk kelas dalam xs\nselesai").unwrap_err();
        assert_eq!(
            error.message,
            "Kata kunci 'kelas' tidak dapat digunakan sebagai nama variabel. Ini adalah reserved keyword dalam RenzmcLang. Gunakan nama yang berbeda (contoh: 'kelas_value', 'kelas_data', 'my_kelas', dll)."
        );
    }

    #[test]
    fn test_expected_token_message() {
        let error = parse("jika x maka\n  tampilkan 1\n").unwrap_err();
        assert_eq!(error.message, "Diharapkan 'selesai', ditemukan akhir file");

        let error = parse("x itu (1 + 2").unwrap_err();
        assert_eq!(error.message, "Diharapkan ')', ditemukan akhir file");
        assert_eq!(error.line, Some(1));
    }

    #[test]
    fn test_nesting_depth_is_bounded() {
        let shallow = format!("tampilkan {}1{}", "(".repeat(40), ")".repeat(40));
        assert!(parse(&shallow).is_ok());

        let deep = format!("tampilkan {}1{}", "(".repeat(3000), ")".repeat(3000));
        let error = parse(&deep).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Parser);
        assert_eq!(error.message, "Struktur bersarang terlalu dalam (maksimum 64 tingkat)");
        assert_eq!((error.line, error.column), (Some(1), Some(75)));

        let negations = format!("x itu {}1", "- ".repeat(3000));
        assert!(parse(&negations).is_err());

        let mut blocks = String::new();
        for _ in 0..100 {
            blocks.push_str("jika benar\n");
        }
        for _ in 0..100 {
            blocks.push_str("selesai\n");
        }
        let error = parse(&blocks).unwrap_err();
        assert_eq!(error.message, "Struktur bersarang terlalu dalam (maksimum 64 tingkat)");
    }

    #[test]
    fn test_type_hints_are_canonical() {
        let hints = [
            ("x: int itu 1", "int"),
            ("x: int|str itu 1", "int | str"),
            ("x: daftar[int] itu []", "daftar[int]"),
            ("x: kamus[teks,int|float] itu {}", "kamus[teks, int | float]"),
            ("x: Literal[\"a\", 1] itu \"a\"", "Literal[\"a\", 1]"),
            ("x: TypedDict[\"nama\": str] itu {}", "TypedDict[\"nama\" : str]"),
            ("x: int? itu kosong", "int?"),
        ];

        for (source, expected) in hints {
            match single(source) {
                Stmt::VarDecl {
                    type_hint: Some(hint),
                    ..
                } => assert_eq!(hint.name, expected, "{}", source),
                other => panic!("unexpected {:?}", other),
            }
        }

        assert!(matches!(single("tipe Angka = int | float"), Stmt::TypeAlias { ref hint, .. } if hint.name == "int | float"));
    }

    #[test]
    fn test_expressions() {
        assert!(matches!(
            single("x itu a jika c lainnya b"),
            Stmt::VarDecl { value: Expr::Ternary { .. }, .. }
        ));
        assert!(matches!(
            single("x itu [n * 2 untuk setiap n dari xs jika n > 1]"),
            Stmt::VarDecl { value: Expr::ListComp { condition: Some(_), .. }, .. }
        ));
        assert!(matches!(
            single("x itu xs[1:]"),
            Stmt::VarDecl { value: Expr::Slice { start: Some(_), end: None, .. }, .. }
        ));
        assert!(matches!(
            single("x itu lambda dengan a, b -> a + b"),
            Stmt::VarDecl { value: Expr::Lambda { ref params, .. }, .. } if params.len() == 2
        ));
        assert!(matches!(
            single("xs.tambah(1)"),
            Stmt::Expression { expression: Expr::MethodCall { .. } }
        ));
        assert!(matches!(
            single("f(1, nama=2)"),
            Stmt::Expression { expression: Expr::FuncCall { ref kwargs, .. } } if kwargs.len() == 1
        ));
        assert!(matches!(
            single("panggil obj.m dengan 1, 2"),
            Stmt::Expression { expression: Expr::MethodCall { ref args, .. } } if args.len() == 2
        ));
        assert!(matches!(
            single("x itu panggil_python math.sqrt(16)"),
            Stmt::VarDecl { value: Expr::PythonCall { .. }, .. }
        ));
        assert!(matches!(
            single("d itu {\"a\": 1,\n \"b\": 2}"),
            Stmt::VarDecl { value: Expr::Dict { ref entries, .. }, .. } if entries.len() == 2
        ));

        match single("tampilkan f\"halo {nama}!\"") {
            Stmt::Print { values, .. } => match &values[0] {
                Expr::FString { parts, .. } => assert_eq!(parts.len(), 3),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }
}
