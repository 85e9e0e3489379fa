use std::rc::Rc;

use renzmc_core::{Diagnostic, Literal, Token};

// Blocks are shared slices so that callables and suspended generators can hold on to
// a function body without cloning the statements.
pub type Block = Rc<[Stmt]>;

#[derive(Debug, PartialEq, Clone)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

/// A declared type, kept in its canonical textual form.
#[derive(Debug, PartialEq, Clone)]
pub struct TypeHint {
    pub name: String,
    pub token: Token,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Param {
    pub name: Token,
    pub type_hint: Option<TypeHint>,
    pub default: Option<Expr>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct FuncDecl {
    pub name: Token,
    pub params: Vec<Param>,
    pub return_type: Option<TypeHint>,
    pub body: Block,
    pub is_async: bool,
    pub is_generator: bool,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ClassDecl {
    pub name: Token,
    pub parent: Option<Token>,
    pub constructor: Option<Rc<FuncDecl>>,
    pub methods: Vec<Rc<FuncDecl>>,
    pub attributes: Vec<(Token, Expr)>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct CatchClause {
    pub exception_type: Option<String>,
    pub binding: Option<Token>,
    pub body: Block,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Case {
    pub values: Vec<Expr>,
    pub body: Block,
    pub token: Token,
}

#[derive(Debug, PartialEq, Clone)]
pub enum LoopTarget {
    Name(Token),
    Tuple(Vec<Token>),
}

#[derive(Debug, PartialEq, Clone)]
pub enum UnpackTarget {
    Normal(Token),
    Starred(Token),
}

#[derive(Debug, PartialEq, Clone)]
pub enum FStringPart {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Literal {
        value: Literal,
        token: Token,
    },
    FString {
        parts: Vec<FStringPart>,
        token: Token,
    },
    Var {
        name: Token,
    },
    SelfVar {
        token: Token,
    },
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Unary {
        operator: Token,
        right: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
        token: Token,
    },
    List {
        elements: Vec<Expr>,
        token: Token,
    },
    Tuple {
        elements: Vec<Expr>,
        token: Token,
    },
    Dict {
        entries: Vec<(Expr, Expr)>,
        token: Token,
    },
    ListComp {
        element: Box<Expr>,
        target: LoopTarget,
        iterable: Box<Expr>,
        condition: Option<Box<Expr>>,
        token: Token,
    },
    Lambda {
        params: Vec<Token>,
        body: Rc<Expr>,
        token: Token,
    },
    FuncCall {
        callee: Box<Expr>,
        args: Vec<Expr>,
        kwargs: Vec<(Token, Expr)>,
        token: Token,
    },
    MethodCall {
        object: Box<Expr>,
        method: Token,
        args: Vec<Expr>,
        kwargs: Vec<(Token, Expr)>,
    },
    PythonCall {
        callee: Box<Expr>,
        args: Vec<Expr>,
        kwargs: Vec<(Token, Expr)>,
        token: Token,
    },
    IndexAccess {
        object: Box<Expr>,
        index: Box<Expr>,
        token: Token,
    },
    Slice {
        object: Box<Expr>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
        token: Token,
    },
    AttributeRef {
        object: Box<Expr>,
        name: Token,
    },
    Await {
        value: Box<Expr>,
        token: Token,
    },
}

pub(crate) type Kwargs = [(Token, Expr)];

pub(crate) trait ExprVisitor {
    type Item;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Item, Diagnostic> {
        match expr {
            Expr::Literal { value, .. } => self.visit_literal(value),
            Expr::FString { parts, .. } => self.visit_fstring(parts),
            Expr::Var { name } => self.visit_var(name),
            Expr::SelfVar { token } => self.visit_self(token),
            Expr::Binary {
                left,
                operator,
                right,
            } => self.visit_binary(left, operator, right),
            Expr::Logical {
                left,
                operator,
                right,
            } => self.visit_logical(left, operator, right),
            Expr::Unary { operator, right } => self.visit_unary(operator, right),
            Expr::Ternary {
                condition,
                then,
                otherwise,
                ..
            } => self.visit_ternary(condition, then, otherwise),
            Expr::List { elements, .. } => self.visit_list(elements),
            Expr::Tuple { elements, .. } => self.visit_tuple(elements),
            Expr::Dict { entries, .. } => self.visit_dict(entries),
            Expr::ListComp {
                element,
                target,
                iterable,
                condition,
                ..
            } => self.visit_list_comp(element, target, iterable, condition.as_deref()),
            Expr::Lambda { params, body, .. } => self.visit_lambda(params, body),
            Expr::FuncCall {
                callee,
                args,
                kwargs,
                token,
            } => self.visit_call(callee, args, kwargs, token),
            Expr::MethodCall {
                object,
                method,
                args,
                kwargs,
            } => self.visit_method_call(object, method, args, kwargs),
            Expr::PythonCall {
                callee,
                args,
                kwargs,
                token,
            } => self.visit_python_call(callee, args, kwargs, token),
            Expr::IndexAccess { object, index, .. } => self.visit_index(object, index),
            Expr::Slice {
                object, start, end, ..
            } => self.visit_slice(object, start.as_deref(), end.as_deref()),
            Expr::AttributeRef { object, name } => self.visit_attribute(object, name),
            Expr::Await { value, token } => self.visit_await(value, token),
        }
    }

    fn visit_literal(&mut self, value: &Literal) -> Result<Self::Item, Diagnostic>;
    fn visit_fstring(&mut self, parts: &[FStringPart]) -> Result<Self::Item, Diagnostic>;
    fn visit_var(&mut self, name: &Token) -> Result<Self::Item, Diagnostic>;
    fn visit_self(&mut self, token: &Token) -> Result<Self::Item, Diagnostic>;
    fn visit_binary(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Self::Item, Diagnostic>;
    fn visit_logical(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Self::Item, Diagnostic>;
    fn visit_unary(&mut self, operator: &Token, right: &Expr) -> Result<Self::Item, Diagnostic>;
    fn visit_ternary(
        &mut self,
        condition: &Expr,
        then: &Expr,
        otherwise: &Expr,
    ) -> Result<Self::Item, Diagnostic>;
    fn visit_list(&mut self, elements: &[Expr]) -> Result<Self::Item, Diagnostic>;
    fn visit_tuple(&mut self, elements: &[Expr]) -> Result<Self::Item, Diagnostic>;
    fn visit_dict(&mut self, entries: &[(Expr, Expr)]) -> Result<Self::Item, Diagnostic>;
    fn visit_list_comp(
        &mut self,
        element: &Expr,
        target: &LoopTarget,
        iterable: &Expr,
        condition: Option<&Expr>,
    ) -> Result<Self::Item, Diagnostic>;
    fn visit_lambda(&mut self, params: &[Token], body: &Rc<Expr>) -> Result<Self::Item, Diagnostic>;
    fn visit_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        kwargs: &Kwargs,
        token: &Token,
    ) -> Result<Self::Item, Diagnostic>;
    fn visit_method_call(
        &mut self,
        object: &Expr,
        method: &Token,
        args: &[Expr],
        kwargs: &Kwargs,
    ) -> Result<Self::Item, Diagnostic>;
    fn visit_python_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        kwargs: &Kwargs,
        token: &Token,
    ) -> Result<Self::Item, Diagnostic>;
    fn visit_index(&mut self, object: &Expr, index: &Expr) -> Result<Self::Item, Diagnostic>;
    fn visit_slice(
        &mut self,
        object: &Expr,
        start: Option<&Expr>,
        end: Option<&Expr>,
    ) -> Result<Self::Item, Diagnostic>;
    fn visit_attribute(&mut self, object: &Expr, name: &Token) -> Result<Self::Item, Diagnostic>;
    fn visit_await(&mut self, value: &Expr, token: &Token) -> Result<Self::Item, Diagnostic>;
}

impl Expr {
    pub(crate) fn literal<T>(value: T, token: Token) -> Self
    where
        Literal: From<T>,
    {
        Expr::Literal {
            value: Literal::from(value),
            token,
        }
    }

    pub(crate) fn var(name: Token) -> Self {
        Expr::Var { name }
    }

    pub(crate) fn binary(left: Expr, operator: Token, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    pub(crate) fn logical(left: Expr, operator: Token, right: Expr) -> Self {
        Expr::Logical {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    pub(crate) fn unary(operator: Token, right: Expr) -> Self {
        Expr::Unary {
            operator,
            right: Box::new(right),
        }
    }

    pub(crate) fn call(callee: Expr, args: Vec<Expr>, kwargs: Vec<(Token, Expr)>, token: Token) -> Self {
        Expr::FuncCall {
            callee: Box::new(callee),
            args,
            kwargs,
            token,
        }
    }

    pub(crate) fn index(object: Expr, index: Expr, token: Token) -> Self {
        Expr::IndexAccess {
            object: Box::new(object),
            index: Box::new(index),
            token,
        }
    }

    pub(crate) fn attribute(object: Expr, name: Token) -> Self {
        Expr::AttributeRef {
            object: Box::new(object),
            name,
        }
    }

    /// The token that anchors this node in the source.
    pub fn token(&self) -> &Token {
        match self {
            Expr::Var { name } => name,
            Expr::Binary { operator, .. }
            | Expr::Logical { operator, .. }
            | Expr::Unary { operator, .. } => operator,
            Expr::MethodCall { method, .. } => method,
            Expr::AttributeRef { name, .. } => name,
            Expr::Literal { token, .. }
            | Expr::FString { token, .. }
            | Expr::SelfVar { token }
            | Expr::Ternary { token, .. }
            | Expr::List { token, .. }
            | Expr::Tuple { token, .. }
            | Expr::Dict { token, .. }
            | Expr::ListComp { token, .. }
            | Expr::Lambda { token, .. }
            | Expr::FuncCall { token, .. }
            | Expr::PythonCall { token, .. }
            | Expr::IndexAccess { token, .. }
            | Expr::Slice { token, .. }
            | Expr::Await { token, .. } => token,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Stmt {
    VarDecl {
        name: Token,
        type_hint: Option<TypeHint>,
        value: Expr,
    },
    MultiVarDecl {
        names: Vec<Token>,
        value: Expr,
        token: Token,
    },
    Assign {
        target: Expr,
        value: Expr,
        token: Token,
    },
    MultiAssign {
        targets: Vec<Expr>,
        value: Expr,
        token: Token,
    },
    CompoundAssign {
        target: Expr,
        operator: Token,
        value: Expr,
    },
    ExtendedUnpacking {
        targets: Vec<UnpackTarget>,
        value: Expr,
        token: Token,
    },
    Expression {
        expression: Expr,
    },
    Print {
        values: Vec<Expr>,
        token: Token,
    },
    If {
        condition: Expr,
        then_branch: Block,
        else_branch: Block,
        token: Token,
    },
    While {
        condition: Expr,
        body: Block,
        token: Token,
    },
    For {
        var: Token,
        start: Expr,
        end: Expr,
        body: Block,
        token: Token,
    },
    ForEach {
        target: LoopTarget,
        iterable: Expr,
        body: Block,
        token: Token,
    },
    FuncDecl(Rc<FuncDecl>),
    ClassDecl(Rc<ClassDecl>),
    Return {
        value: Option<Expr>,
        token: Token,
    },
    Yield {
        value: Option<Expr>,
        token: Token,
    },
    YieldFrom {
        value: Expr,
        token: Token,
    },
    Break {
        token: Token,
    },
    Continue {
        token: Token,
    },
    Switch {
        subject: Expr,
        cases: Vec<Case>,
        default: Option<Block>,
        token: Token,
    },
    TryCatch {
        body: Block,
        handlers: Vec<CatchClause>,
        finally: Option<Block>,
        token: Token,
    },
    With {
        context: Expr,
        binding: Option<Token>,
        body: Block,
        token: Token,
    },
    Decorator {
        name: String,
        args: Vec<Expr>,
        target: Box<Stmt>,
        token: Token,
    },
    TypeAlias {
        name: Token,
        hint: TypeHint,
    },
    Import {
        module: String,
        alias: Option<Token>,
        token: Token,
    },
    FromImport {
        module: String,
        names: Vec<(Token, Option<Token>)>,
        token: Token,
    },
    PythonImport {
        module: String,
        alias: Option<Token>,
        token: Token,
    },
}

pub(crate) trait StmtVisitor {
    type Item;

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<Self::Item, Diagnostic> {
        match stmt {
            Stmt::VarDecl {
                name,
                type_hint,
                value,
            } => self.visit_var_decl(name, type_hint.as_ref(), value),
            Stmt::MultiVarDecl { names, value, .. } => self.visit_multi_var_decl(names, value),
            Stmt::Assign { target, value, .. } => self.visit_assign(target, value),
            Stmt::MultiAssign { targets, value, .. } => self.visit_multi_assign(targets, value),
            Stmt::CompoundAssign {
                target,
                operator,
                value,
            } => self.visit_compound_assign(target, operator, value),
            Stmt::ExtendedUnpacking { targets, value, .. } => {
                self.visit_extended_unpacking(targets, value)
            }
            Stmt::Expression { expression } => self.visit_expression(expression),
            Stmt::Print { values, .. } => self.visit_print(values),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => self.visit_if(condition, then_branch, else_branch),
            Stmt::While {
                condition, body, ..
            } => self.visit_while(condition, body),
            Stmt::For {
                var,
                start,
                end,
                body,
                ..
            } => self.visit_for(var, start, end, body),
            Stmt::ForEach {
                target,
                iterable,
                body,
                ..
            } => self.visit_for_each(target, iterable, body),
            Stmt::FuncDecl(decl) => self.visit_func_decl(decl),
            Stmt::ClassDecl(decl) => self.visit_class_decl(decl),
            Stmt::Return { value, token } => self.visit_return(value.as_ref(), token),
            Stmt::Yield { token, .. } | Stmt::YieldFrom { token, .. } => self.visit_yield(token),
            Stmt::Break { .. } => self.visit_break(),
            Stmt::Continue { .. } => self.visit_continue(),
            Stmt::Switch {
                subject,
                cases,
                default,
                ..
            } => self.visit_switch(subject, cases, default.as_ref()),
            Stmt::TryCatch {
                body,
                handlers,
                finally,
                ..
            } => self.visit_try(body, handlers, finally.as_ref()),
            Stmt::With {
                context,
                binding,
                body,
                ..
            } => self.visit_with(context, binding.as_ref(), body),
            Stmt::Decorator {
                name, args, target, ..
            } => self.visit_decorator(name, args, target),
            Stmt::TypeAlias { name, hint } => self.visit_type_alias(name, hint),
            Stmt::Import { module, alias, .. } => self.visit_import(module, alias.as_ref()),
            Stmt::FromImport { module, names, .. } => self.visit_from_import(module, names),
            Stmt::PythonImport { module, alias, .. } => {
                self.visit_python_import(module, alias.as_ref())
            }
        }
    }

    fn visit_var_decl(
        &mut self,
        name: &Token,
        type_hint: Option<&TypeHint>,
        value: &Expr,
    ) -> Result<Self::Item, Diagnostic>;
    fn visit_multi_var_decl(&mut self, names: &[Token], value: &Expr) -> Result<Self::Item, Diagnostic>;
    fn visit_assign(&mut self, target: &Expr, value: &Expr) -> Result<Self::Item, Diagnostic>;
    fn visit_multi_assign(&mut self, targets: &[Expr], value: &Expr) -> Result<Self::Item, Diagnostic>;
    fn visit_compound_assign(
        &mut self,
        target: &Expr,
        operator: &Token,
        value: &Expr,
    ) -> Result<Self::Item, Diagnostic>;
    fn visit_extended_unpacking(
        &mut self,
        targets: &[UnpackTarget],
        value: &Expr,
    ) -> Result<Self::Item, Diagnostic>;
    fn visit_expression(&mut self, expression: &Expr) -> Result<Self::Item, Diagnostic>;
    fn visit_print(&mut self, values: &[Expr]) -> Result<Self::Item, Diagnostic>;
    fn visit_if(
        &mut self,
        condition: &Expr,
        then_branch: &Block,
        else_branch: &Block,
    ) -> Result<Self::Item, Diagnostic>;
    fn visit_while(&mut self, condition: &Expr, body: &Block) -> Result<Self::Item, Diagnostic>;
    fn visit_for(
        &mut self,
        var: &Token,
        start: &Expr,
        end: &Expr,
        body: &Block,
    ) -> Result<Self::Item, Diagnostic>;
    fn visit_for_each(
        &mut self,
        target: &LoopTarget,
        iterable: &Expr,
        body: &Block,
    ) -> Result<Self::Item, Diagnostic>;
    fn visit_func_decl(&mut self, decl: &Rc<FuncDecl>) -> Result<Self::Item, Diagnostic>;
    fn visit_class_decl(&mut self, decl: &Rc<ClassDecl>) -> Result<Self::Item, Diagnostic>;
    fn visit_return(&mut self, value: Option<&Expr>, token: &Token) -> Result<Self::Item, Diagnostic>;
    fn visit_yield(&mut self, token: &Token) -> Result<Self::Item, Diagnostic>;
    fn visit_break(&mut self) -> Result<Self::Item, Diagnostic>;
    fn visit_continue(&mut self) -> Result<Self::Item, Diagnostic>;
    fn visit_switch(
        &mut self,
        subject: &Expr,
        cases: &[Case],
        default: Option<&Block>,
    ) -> Result<Self::Item, Diagnostic>;
    fn visit_try(
        &mut self,
        body: &Block,
        handlers: &[CatchClause],
        finally: Option<&Block>,
    ) -> Result<Self::Item, Diagnostic>;
    fn visit_with(
        &mut self,
        context: &Expr,
        binding: Option<&Token>,
        body: &Block,
    ) -> Result<Self::Item, Diagnostic>;
    fn visit_decorator(&mut self, name: &str, args: &[Expr], target: &Stmt) -> Result<Self::Item, Diagnostic>;
    fn visit_type_alias(&mut self, name: &Token, hint: &TypeHint) -> Result<Self::Item, Diagnostic>;
    fn visit_import(&mut self, module: &str, alias: Option<&Token>) -> Result<Self::Item, Diagnostic>;
    fn visit_from_import(
        &mut self,
        module: &str,
        names: &[(Token, Option<Token>)],
    ) -> Result<Self::Item, Diagnostic>;
    fn visit_python_import(&mut self, module: &str, alias: Option<&Token>) -> Result<Self::Item, Diagnostic>;
}

impl Stmt {
    pub(crate) fn expression(expression: Expr) -> Self {
        Stmt::Expression { expression }
    }

    pub(crate) fn var_decl(name: Token, type_hint: Option<TypeHint>, value: Expr) -> Self {
        Stmt::VarDecl {
            name,
            type_hint,
            value,
        }
    }

    pub(crate) fn if_(condition: Expr, then_branch: Vec<Stmt>, else_branch: Vec<Stmt>, token: Token) -> Self {
        Stmt::If {
            condition,
            then_branch: Rc::from(then_branch),
            else_branch: Rc::from(else_branch),
            token,
        }
    }

    pub(crate) fn while_(condition: Expr, body: Vec<Stmt>, token: Token) -> Self {
        Stmt::While {
            condition,
            body: Rc::from(body),
            token,
        }
    }

    pub(crate) fn print(values: Vec<Expr>, token: Token) -> Self {
        Stmt::Print { values, token }
    }

    pub(crate) fn return_(value: Option<Expr>, token: Token) -> Self {
        Stmt::Return { value, token }
    }

    /// The token that anchors this node in the source.
    pub fn token(&self) -> &Token {
        match self {
            Stmt::VarDecl { name, .. } => name,
            Stmt::CompoundAssign { operator, .. } => operator,
            Stmt::Expression { expression } => expression.token(),
            Stmt::FuncDecl(decl) => &decl.name,
            Stmt::ClassDecl(decl) => &decl.name,
            Stmt::TypeAlias { name, .. } => name,
            Stmt::MultiVarDecl { token, .. }
            | Stmt::Assign { token, .. }
            | Stmt::MultiAssign { token, .. }
            | Stmt::ExtendedUnpacking { token, .. }
            | Stmt::Print { token, .. }
            | Stmt::If { token, .. }
            | Stmt::While { token, .. }
            | Stmt::For { token, .. }
            | Stmt::ForEach { token, .. }
            | Stmt::Return { token, .. }
            | Stmt::Yield { token, .. }
            | Stmt::YieldFrom { token, .. }
            | Stmt::Break { token }
            | Stmt::Continue { token }
            | Stmt::Switch { token, .. }
            | Stmt::TryCatch { token, .. }
            | Stmt::With { token, .. }
            | Stmt::Decorator { token, .. }
            | Stmt::Import { token, .. }
            | Stmt::FromImport { token, .. }
            | Stmt::PythonImport { token, .. } => token,
        }
    }
}

/// Whether a function body suspends. Nested function and class bodies do not count.
pub(crate) fn contains_yield(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|stmt| match stmt {
        Stmt::Yield { .. } | Stmt::YieldFrom { .. } => true,
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => contains_yield(then_branch) || contains_yield(else_branch),
        Stmt::While { body, .. }
        | Stmt::For { body, .. }
        | Stmt::ForEach { body, .. }
        | Stmt::With { body, .. } => contains_yield(body),
        Stmt::TryCatch {
            body,
            handlers,
            finally,
            ..
        } => {
            contains_yield(body)
                || handlers.iter().any(|handler| contains_yield(&handler.body))
                || finally.as_ref().map_or(false, |block| contains_yield(block))
        }
        Stmt::Switch { cases, default, .. } => {
            cases.iter().any(|case| contains_yield(&case.body))
                || default.as_ref().map_or(false, |block| contains_yield(block))
        }
        _ => false,
    })
}
