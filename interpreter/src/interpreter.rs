use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use log::{debug, info, trace};
use renzmc_core::{Diagnostic, ErrorKind, Literal, Token, Type};

use crate::ast::{
    Block, Case, CatchClause, ClassDecl, Expr, ExprVisitor, FStringPart, FuncDecl, Kwargs, LoopTarget, Param,
    Program, Stmt, StmtVisitor, TypeHint, UnpackTarget,
};
use crate::builtins;
use crate::callable::{Callable, Class, Coroutine, Function, Instance, KwArgs, Lambda};
use crate::env::{Scope, ScopeManager};
use crate::error::{
    attribute_error, host_error, import_error, index_error, key_error, name_error, type_error, value_error,
};
use crate::generator::{Generator, Iter};
use crate::limits::{MAX_CALL_DEPTH, STACK_BUDGET};
use crate::ops;
use crate::parser::parse;
use crate::resolver::ModuleResolver;
use crate::types::TypeChecker;
use crate::value::{Dict, Module, Value};

/// An optional accelerator. It may hand back a replacement callable for a function, or
/// decline, in which case the function is interpreted.
pub trait JitCompiler {
    fn compile(&self, name: &str, params: &[Param], body: &Block) -> Option<Rc<dyn Callable>>;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub type_checking: bool,
    pub strict: bool,
    pub max_call_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            type_checking: true,
            strict: false,
            max_call_depth: MAX_CALL_DEPTH,
        }
    }
}

/// Cancels a running program from another thread. The interpreter polls it before every
/// statement and expression.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub(crate) enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// What a call replaced, to be put back when it returns.
pub(crate) struct SavedFrame {
    locals: Scope,
    instance: Option<Rc<Instance>>,
}

pub struct Interpreter {
    pub(crate) scopes: ScopeManager,
    pub(crate) instance: Option<Rc<Instance>>,
    checker: TypeChecker,
    config: Config,
    depth: usize,
    // Native stack address where the outermost `interpret` started.
    stack_base: Option<usize>,
    stdout: Rc<RefCell<dyn Write>>,
    interrupt: InterruptHandle,
    resolver: Option<Rc<dyn ModuleResolver>>,
    jit: Option<Rc<dyn JitCompiler>>,
    loading: Rc<RefCell<Vec<String>>>,
}

impl Interpreter {
    pub fn new(stdout: Rc<RefCell<dyn Write>>) -> Self {
        Interpreter::with_config(stdout, Config::default())
    }

    pub fn with_config(stdout: Rc<RefCell<dyn Write>>, config: Config) -> Self {
        let mut scopes = ScopeManager::new();
        builtins::install(&mut scopes);

        Interpreter {
            scopes,
            instance: None,
            checker: TypeChecker::new(config.type_checking, config.strict),
            config,
            depth: 0,
            stack_base: None,
            stdout,
            interrupt: InterruptHandle::default(),
            resolver: None,
            jit: None,
            loading: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn interpret(&mut self, program: &Program) -> Result<(), Diagnostic> {
        debug!("menjalankan {} pernyataan", program.statements.len());
        let outermost = self.stack_base.is_none();
        if outermost {
            self.stack_base = Some(stack_address());
        }

        let result = program
            .statements
            .iter()
            .try_for_each(|stmt| self.execute(stmt).map(|_| ()));

        if outermost {
            self.stack_base = None;
        }
        result
    }

    /// Parses and runs a whole program.
    pub fn run(&mut self, source: &str) -> Result<(), Diagnostic> {
        let program = parse(source)?;
        self.interpret(&program)
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    pub fn enable_type_checking(&mut self) {
        self.checker.enabled = true;
    }

    pub fn disable_type_checking(&mut self) {
        self.checker.enabled = false;
    }

    pub fn set_strict_mode(&mut self, strict: bool) {
        self.checker.strict = strict;
    }

    pub fn set_module_resolver(&mut self, resolver: Rc<dyn ModuleResolver>) {
        self.resolver = Some(resolver);
    }

    pub fn set_jit(&mut self, jit: Rc<dyn JitCompiler>) {
        self.jit = Some(jit);
    }

    fn check_interrupt(&self) -> Result<(), Diagnostic> {
        if self.interrupt.is_interrupted() {
            Err(Diagnostic::interrupted())
        } else {
            Ok(())
        }
    }

    // The only places where diagnostics pick up a position: the node being run supplies it
    // unless an inner node already did.
    pub(crate) fn execute(&mut self, stmt: &Stmt) -> Result<Flow, Diagnostic> {
        self.check_interrupt()?;
        self.visit_stmt(stmt).map_err(|e| e.locate(stmt.token()))
    }

    /// Evaluates a single expression against the current scopes.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, Diagnostic> {
        self.check_interrupt()?;
        self.visit_expr(expr).map_err(|e| e.locate(expr.token()))
    }

    pub(crate) fn execute_block(&mut self, stmts: &[Stmt]) -> Result<Flow, Diagnostic> {
        for stmt in stmts {
            match self.execute(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    pub(crate) fn assign_name(&mut self, name: &str, value: Value) {
        self.scopes.set_variable(name, value, false, self.instance.as_deref());
    }

    pub(crate) fn call_value(&mut self, callee: Value, args: Vec<Value>, kwargs: KwArgs) -> Result<Value, Diagnostic> {
        match callee {
            Value::Callable(callable) => callable.execute(self, args, kwargs),
            Value::Class(class) => class.execute(self, args, kwargs),
            other => Err(type_error(format!(
                "Objek '{}' tidak dapat dipanggil",
                other.type_name()
            ))),
        }
    }

    pub(crate) fn call_function(
        &mut self,
        function: &Rc<Function>,
        args: Vec<Value>,
        kwargs: KwArgs,
        instance: Option<Rc<Instance>>,
    ) -> Result<Value, Diagnostic> {
        let locals = function.bind(args, kwargs)?;
        for param in &function.decl.params {
            if let (Some(hint), Some(value)) = (&param.type_hint, locals.get(&param.name.lexeme)) {
                self.checker
                    .check_parameter(function.name(), &param.name.lexeme, value, &hint.name, &self.scopes)?;
            }
        }

        if function.decl.is_generator {
            Ok(Value::Generator(Generator::start(function, locals, instance)))
        } else if function.decl.is_async {
            Ok(Value::Coroutine(Coroutine::new(Rc::clone(function), locals, instance)))
        } else {
            self.run_function(function, locals, instance)
        }
    }

    pub(crate) fn run_function(
        &mut self,
        function: &Rc<Function>,
        locals: Scope,
        instance: Option<Rc<Instance>>,
    ) -> Result<Value, Diagnostic> {
        trace!("memanggil fungsi {}", function.name());
        let saved = self.push_call(locals, instance)?;
        let flow = self.execute_block(&function.decl.body);
        self.pop_call(saved);

        let value = match flow? {
            Flow::Return(value) => value,
            _ => Value::None,
        };
        if let Some(hint) = &function.decl.return_type {
            self.checker
                .check_return(function.name(), &value, &hint.name, &self.scopes)?;
        }
        Ok(value)
    }

    pub(crate) fn call_lambda(&mut self, body: &Expr, locals: Scope) -> Result<Value, Diagnostic> {
        let saved = self.push_call(locals, self.instance.clone())?;
        let value = self.evaluate(body);
        self.pop_call(saved);
        value
    }

    /// Installs a callee's local scope and receiver.
    pub(crate) fn push_call(
        &mut self,
        locals: Scope,
        instance: Option<Rc<Instance>>,
    ) -> Result<SavedFrame, Diagnostic> {
        let stack_used = self
            .stack_base
            .map_or(0, |base| base.abs_diff(stack_address()));
        if self.depth >= self.config.max_call_depth || stack_used > STACK_BUDGET {
            return Err(Diagnostic::runtime(format!(
                "Kedalaman rekursi maksimum ({}) terlampaui",
                self.config.max_call_depth
            )));
        }

        self.depth += 1;
        Ok(SavedFrame {
            locals: self.scopes.enter(locals),
            instance: std::mem::replace(&mut self.instance, instance),
        })
    }

    /// Restores the caller and returns the callee's final local scope.
    pub(crate) fn pop_call(&mut self, saved: SavedFrame) -> Scope {
        self.depth -= 1;
        self.instance = saved.instance;
        self.scopes.leave(saved.locals)
    }

    pub(crate) fn iterate(&mut self, value: Value) -> Result<Iter, Diagnostic> {
        match value {
            Value::Generator(generator) => Ok(Iter::Generator(generator)),
            other => other
                .sequence()
                .map(|values| Iter::Items(values.into_iter()))
                .ok_or_else(|| {
                    type_error(format!(
                        "Objek bertipe '{}' tidak dapat diiterasi",
                        other.type_name()
                    ))
                }),
        }
    }

    pub(crate) fn collect(&mut self, value: Value) -> Result<Vec<Value>, Diagnostic> {
        let mut iter = self.iterate(value)?;
        let mut values = Vec::new();
        while let Some(value) = iter.next(self)? {
            values.push(value);
        }
        Ok(values)
    }

    fn unpack(&mut self, value: Value, count: usize) -> Result<Vec<Value>, Diagnostic> {
        let values = self.collect(value)?;
        if values.len() != count {
            return Err(value_error(format!(
                "Jumlah nilai tidak sesuai untuk dibongkar: diharapkan {}, tetapi mendapat {}",
                count,
                values.len()
            )));
        }
        Ok(values)
    }

    pub(crate) fn bind_loop_target(&mut self, target: &LoopTarget, value: Value, local: bool) -> Result<(), Diagnostic> {
        match target {
            LoopTarget::Name(name) => {
                self.scopes
                    .set_variable(&name.lexeme, value, local, self.instance.as_deref());
            }
            LoopTarget::Tuple(names) => {
                let values = self.unpack(value, names.len())?;
                for (name, value) in names.iter().zip(values) {
                    self.scopes
                        .set_variable(&name.lexeme, value, local, self.instance.as_deref());
                }
            }
        }
        Ok(())
    }

    pub(crate) fn range_bounds(&mut self, start: &Expr, end: &Expr) -> Result<(i64, i64), Diagnostic> {
        let start = self.evaluate(start)?;
        let end = self.evaluate(end)?;
        match (start.as_int(), end.as_int()) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(type_error(format!(
                "Batas perulangan harus berupa bilangan bulat, bukan '{}' dan '{}'",
                start.type_name(),
                end.type_name()
            ))),
        }
    }

    pub(crate) fn select_case<'a>(
        &mut self,
        subject: &Expr,
        cases: &'a [Case],
        default: Option<&'a Block>,
    ) -> Result<Option<&'a Block>, Diagnostic> {
        let subject = self.evaluate(subject)?;
        for case in cases {
            for value in &case.values {
                if self.evaluate(value)? == subject {
                    return Ok(Some(&case.body));
                }
            }
        }
        Ok(default)
    }

    pub(crate) fn bind_error(&mut self, handler: &CatchClause, error: &Diagnostic) {
        if let Some(binding) = &handler.binding {
            self.assign_name(&binding.lexeme, Value::from(error.message.clone()));
        }
    }

    /// Runs `__enter__` when the context defines it. The result is what `sebagai` binds.
    pub(crate) fn enter_context(&mut self, context: &Value) -> Result<Value, Diagnostic> {
        match context {
            Value::Instance(instance) => match Instance::get(instance, "__enter__") {
                Some(enter) => self.call_value(enter, Vec::new(), Vec::new()),
                None => Ok(context.clone()),
            },
            other => Ok(other.clone()),
        }
    }

    pub(crate) fn exit_context(&mut self, context: &Value, error: Option<&Diagnostic>) -> Result<(), Diagnostic> {
        if let Value::Instance(instance) = context {
            if let Some(exit) = Instance::get(instance, "__exit__") {
                let args = match error {
                    Some(error) => vec![
                        Value::from(error.kind.label()),
                        Value::from(error.message.clone()),
                        Value::None,
                    ],
                    None => vec![Value::None, Value::None, Value::None],
                };
                self.call_value(exit, args, Vec::new())?;
            }
        }
        Ok(())
    }

    fn arguments(&mut self, args: &[Expr]) -> Result<Vec<Value>, Diagnostic> {
        args.iter().map(|arg| self.evaluate(arg)).collect()
    }

    fn keyword_arguments(&mut self, kwargs: &Kwargs) -> Result<KwArgs, Diagnostic> {
        kwargs
            .iter()
            .map(|(name, value)| Ok((name.lexeme.clone(), self.evaluate(value)?)))
            .collect()
    }

    fn function(&mut self, decl: &Rc<FuncDecl>, captured: Scope) -> Result<Function, Diagnostic> {
        let mut defaults = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            defaults.push(match &param.default {
                Some(default) => Some(self.evaluate(default)?),
                None => None,
            });
        }
        Ok(Function::new(Rc::clone(decl), defaults, captured))
    }

    // Resolves a dotted name such as `cache.simpan`.
    fn dotted(&mut self, name: &str) -> Result<Value, Diagnostic> {
        let mut segments = name.split('.');
        let first = segments.next().unwrap_or(name);
        let mut value = self.scopes.get_variable(first, self.instance.as_deref())?;
        for segment in segments {
            value = attribute(&value, segment)?;
        }
        Ok(value)
    }

    fn assign_target(&mut self, target: &Expr, value: Value) -> Result<(), Diagnostic> {
        match target {
            Expr::Var { name } => {
                self.assign_name(&name.lexeme, value);
                Ok(())
            }
            Expr::AttributeRef { object, name } => {
                let object = self.evaluate(object)?;
                set_attribute(&object, &name.lexeme, value)
            }
            Expr::IndexAccess { object, index, .. } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                set_index(&object, index, value)
            }
            other => Err(Diagnostic::new(ErrorKind::Syntax, "Target assignment tidak valid").locate(other.token())),
        }
    }

    fn load_module(&mut self, name: &str) -> Result<Rc<Module>, Diagnostic> {
        if let Some(module) = self.scopes.module(name) {
            return Ok(module);
        }

        let path = self
            .resolver
            .as_ref()
            .and_then(|resolver| resolver.resolve(name))
            .ok_or_else(|| import_error(format!("Modul '{}' tidak ditemukan", name)))?;
        if self.loading.borrow().iter().any(|loading| loading == name) {
            return Err(import_error(format!(
                "Impor melingkar terdeteksi pada modul '{}'",
                name
            )));
        }

        info!("memuat modul '{}' dari {}", name, path.display());
        let source = fs::read_to_string(&path).map_err(|e| {
            Diagnostic::new(
                ErrorKind::File,
                format!("Tidak dapat membaca modul '{}': {}", path.display(), e),
            )
        })?;

        let mut child = self.child();
        self.loading.borrow_mut().push(name.to_string());
        let result = parse(&source).and_then(|program| child.interpret(&program));
        self.loading.borrow_mut().pop();
        result.map_err(|e| {
            if e.source_code.is_none() && e.is_located() {
                e.with_source(source)
            } else {
                e
            }
        })?;

        let module = Module::new(name, child.scopes.take_globals());
        self.scopes.register_module(name, Rc::clone(&module));
        Ok(module)
    }

    // A fresh interpreter for a module body. It shares output, cancellation and collaborators
    // with this one.
    fn child(&self) -> Interpreter {
        let mut child = Interpreter::with_config(Rc::clone(&self.stdout), self.config.clone());
        child.checker = self.checker.clone();
        child.depth = self.depth;
        child.stack_base = self.stack_base;
        child.interrupt = self.interrupt.clone();
        child.resolver = self.resolver.clone();
        child.jit = self.jit.clone();
        child.loading = Rc::clone(&self.loading);
        child
    }
}

impl ExprVisitor for Interpreter {
    type Item = Value;

    fn visit_literal(&mut self, value: &Literal) -> Result<Value, Diagnostic> {
        Ok(Value::from(value.clone()))
    }

    fn visit_fstring(&mut self, parts: &[FStringPart]) -> Result<Value, Diagnostic> {
        let mut text = String::new();
        for part in parts {
            match part {
                FStringPart::Text(chunk) => text.push_str(chunk),
                FStringPart::Expr(expr) => text.push_str(&self.evaluate(expr)?.to_string()),
            }
        }
        Ok(Value::from(text))
    }

    fn visit_var(&mut self, name: &Token) -> Result<Value, Diagnostic> {
        self.scopes.get_variable(&name.lexeme, self.instance.as_deref())
    }

    fn visit_self(&mut self, _token: &Token) -> Result<Value, Diagnostic> {
        self.instance
            .clone()
            .map(Value::Instance)
            .ok_or_else(|| name_error("'diri' hanya dapat digunakan di dalam metode"))
    }

    fn visit_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value, Diagnostic> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;
        ops::binary(operator.ty, &left, &right)
    }

    fn visit_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value, Diagnostic> {
        let left = self.evaluate(left)?;
        let short_circuit = match operator.ty {
            Type::Or => left.is_truthy(),
            _ => !left.is_truthy(),
        };

        if short_circuit {
            Ok(left)
        } else {
            self.evaluate(right)
        }
    }

    fn visit_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value, Diagnostic> {
        let right = self.evaluate(right)?;
        ops::unary(operator.ty, &right)
    }

    fn visit_ternary(&mut self, condition: &Expr, then: &Expr, otherwise: &Expr) -> Result<Value, Diagnostic> {
        if self.evaluate(condition)?.is_truthy() {
            self.evaluate(then)
        } else {
            self.evaluate(otherwise)
        }
    }

    fn visit_list(&mut self, elements: &[Expr]) -> Result<Value, Diagnostic> {
        Ok(Value::list(self.arguments(elements)?))
    }

    fn visit_tuple(&mut self, elements: &[Expr]) -> Result<Value, Diagnostic> {
        Ok(Value::tuple(self.arguments(elements)?))
    }

    fn visit_dict(&mut self, entries: &[(Expr, Expr)]) -> Result<Value, Diagnostic> {
        let mut dict = Dict::new();
        for (key, value) in entries {
            let key = self.evaluate(key)?;
            let value = self.evaluate(value)?;
            dict.insert(key, value)?;
        }
        Ok(Value::dict(dict))
    }

    fn visit_list_comp(
        &mut self,
        element: &Expr,
        target: &LoopTarget,
        iterable: &Expr,
        condition: Option<&Expr>,
    ) -> Result<Value, Diagnostic> {
        let iterable = self.evaluate(iterable)?;
        let mut iter = self.iterate(iterable)?;

        // the loop variable lives in a copy of the current locals and disappears afterwards
        let locals = self.scopes.locals().clone();
        let saved = self.scopes.enter(locals);
        let mut results = Vec::new();
        let outcome = loop {
            let item = match iter.next(self) {
                Ok(Some(item)) => item,
                Ok(None) => break Ok(()),
                Err(error) => break Err(error),
            };
            if let Err(error) = self.comprehension_step(&mut results, element, target, condition, item) {
                break Err(error);
            }
        };
        self.scopes.leave(saved);

        outcome.map(|_| Value::list(results))
    }

    fn visit_lambda(&mut self, params: &[Token], body: &Rc<Expr>) -> Result<Value, Diagnostic> {
        Ok(Value::Callable(Rc::new(Lambda {
            params: params.to_vec(),
            body: Rc::clone(body),
            captured: self.scopes.locals().clone(),
        })))
    }

    fn visit_call(&mut self, callee: &Expr, args: &[Expr], kwargs: &Kwargs, _token: &Token) -> Result<Value, Diagnostic> {
        let callee = self.evaluate(callee)?;
        let args = self.arguments(args)?;
        let kwargs = self.keyword_arguments(kwargs)?;
        self.call_value(callee, args, kwargs)
    }

    fn visit_method_call(
        &mut self,
        object: &Expr,
        method: &Token,
        args: &[Expr],
        kwargs: &Kwargs,
    ) -> Result<Value, Diagnostic> {
        let receiver = self.evaluate(object)?;
        let mut args = self.arguments(args)?;
        let kwargs = self.keyword_arguments(kwargs)?;
        let name = method.lexeme.as_str();

        match &receiver {
            Value::Instance(_) | Value::Module(_) => {
                let callee = attribute(&receiver, name)?;
                self.call_value(callee, args, kwargs)
            }
            Value::Class(class) => match class.find_method(name) {
                // `Induk.metode(diri, ...)` runs an inherited method on an explicit receiver
                Some(function) => {
                    let instance = match args.first() {
                        Some(Value::Instance(instance)) if instance.class().is_subclass_of(class.name()) => {
                            Some(Rc::clone(instance))
                        }
                        _ => None,
                    };
                    if instance.is_some() {
                        args.remove(0);
                    }
                    self.call_function(&function, args, kwargs, instance)
                }
                None => {
                    let callee = attribute(&receiver, name)?;
                    self.call_value(callee, args, kwargs)
                }
            },
            _ => {
                if !kwargs.is_empty() {
                    return Err(type_error(format!(
                        "Metode '{}' tidak menerima argumen kata kunci",
                        name
                    )));
                }
                match builtins::call_method(self, &receiver, name, args) {
                    Some(result) => result,
                    None => Err(attribute_error(format!(
                        "Objek '{}' tidak memiliki metode '{}'",
                        receiver.type_name(),
                        name
                    ))),
                }
            }
        }
    }

    fn visit_python_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        kwargs: &Kwargs,
        _token: &Token,
    ) -> Result<Value, Diagnostic> {
        let callee = self.evaluate(callee)?;
        if !matches!(callee, Value::Callable(_) | Value::Class(_)) {
            return Err(host_error(format!(
                "Objek Python bertipe '{}' tidak dapat dipanggil",
                callee.type_name()
            )));
        }

        let args = self.arguments(args)?;
        let kwargs = self.keyword_arguments(kwargs)?;
        self.call_value(callee, args, kwargs).map_err(|error| match error.kind {
            ErrorKind::Interrupted | ErrorKind::PythonIntegration => error,
            _ => host_error(format!("Kesalahan saat memanggil fungsi Python: {}", error.message)),
        })
    }

    fn visit_index(&mut self, object: &Expr, index: &Expr) -> Result<Value, Diagnostic> {
        let object = self.evaluate(object)?;
        let index = self.evaluate(index)?;
        index_value(&object, &index)
    }

    fn visit_slice(&mut self, object: &Expr, start: Option<&Expr>, end: Option<&Expr>) -> Result<Value, Diagnostic> {
        let object = self.evaluate(object)?;
        let start = start.map(|start| self.evaluate(start)).transpose()?;
        let end = end.map(|end| self.evaluate(end)).transpose()?;
        slice_value(&object, start, end)
    }

    fn visit_attribute(&mut self, object: &Expr, name: &Token) -> Result<Value, Diagnostic> {
        let object = self.evaluate(object)?;
        attribute(&object, &name.lexeme)
    }

    fn visit_await(&mut self, value: &Expr, _token: &Token) -> Result<Value, Diagnostic> {
        match self.evaluate(value)? {
            Value::Coroutine(coroutine) => {
                let (locals, instance) = coroutine.start()?;
                self.run_function(coroutine.function(), locals, instance)
            }
            // awaiting a plain value yields it unchanged
            other => Ok(other),
        }
    }
}

impl Interpreter {
    fn comprehension_step(
        &mut self,
        results: &mut Vec<Value>,
        element: &Expr,
        target: &LoopTarget,
        condition: Option<&Expr>,
        item: Value,
    ) -> Result<(), Diagnostic> {
        self.bind_loop_target(target, item, true)?;
        let keep = match condition {
            Some(condition) => self.evaluate(condition)?.is_truthy(),
            None => true,
        };
        if keep {
            results.push(self.evaluate(element)?);
        }
        Ok(())
    }
}

impl StmtVisitor for Interpreter {
    type Item = Flow;

    fn visit_var_decl(&mut self, name: &Token, type_hint: Option<&TypeHint>, value: &Expr) -> Result<Flow, Diagnostic> {
        let value = self.evaluate(value)?;
        if let Some(hint) = type_hint {
            self.checker
                .check_variable(&name.lexeme, &value, &hint.name, &self.scopes)?;
        }
        self.assign_name(&name.lexeme, value);
        Ok(Flow::Normal)
    }

    fn visit_multi_var_decl(&mut self, names: &[Token], value: &Expr) -> Result<Flow, Diagnostic> {
        let value = self.evaluate(value)?;
        let values = self.unpack(value, names.len())?;
        for (name, value) in names.iter().zip(values) {
            self.assign_name(&name.lexeme, value);
        }
        Ok(Flow::Normal)
    }

    fn visit_assign(&mut self, target: &Expr, value: &Expr) -> Result<Flow, Diagnostic> {
        let value = self.evaluate(value)?;
        self.assign_target(target, value)?;
        Ok(Flow::Normal)
    }

    fn visit_multi_assign(&mut self, targets: &[Expr], value: &Expr) -> Result<Flow, Diagnostic> {
        let value = self.evaluate(value)?;
        let values = self.unpack(value, targets.len())?;
        for (target, value) in targets.iter().zip(values) {
            self.assign_target(target, value)?;
        }
        Ok(Flow::Normal)
    }

    // The target's object and index are evaluated once and reused for the write.
    fn visit_compound_assign(&mut self, target: &Expr, operator: &Token, value: &Expr) -> Result<Flow, Diagnostic> {
        let ty = operator.ty.binary_of_compound().unwrap_or(operator.ty);
        match target {
            Expr::AttributeRef { object, name } => {
                let object = self.evaluate(object)?;
                let current = attribute(&object, &name.lexeme).map_err(|e| e.locate(name))?;
                let operand = self.evaluate(value)?;
                let result = ops::binary(ty, &current, &operand).map_err(|e| e.locate(operator))?;
                set_attribute(&object, &name.lexeme, result)?;
            }
            Expr::IndexAccess { object, index, token } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                let current = index_value(&object, &index).map_err(|e| e.locate(token))?;
                let operand = self.evaluate(value)?;
                let result = ops::binary(ty, &current, &operand).map_err(|e| e.locate(operator))?;
                set_index(&object, index, result)?;
            }
            _ => {
                let current = self.evaluate(target)?;
                let operand = self.evaluate(value)?;
                let result = ops::binary(ty, &current, &operand).map_err(|e| e.locate(operator))?;
                self.assign_target(target, result)?;
            }
        }
        Ok(Flow::Normal)
    }

    fn visit_extended_unpacking(&mut self, targets: &[UnpackTarget], value: &Expr) -> Result<Flow, Diagnostic> {
        let value = self.evaluate(value)?;
        let mut values = self.collect(value)?;

        let starred: Vec<usize> = targets
            .iter()
            .enumerate()
            .filter(|(_, target)| matches!(target, UnpackTarget::Starred(_)))
            .map(|(i, _)| i)
            .collect();
        let star = match starred.as_slice() {
            [] => None,
            [star] => Some(*star),
            _ => return Err(value_error("Hanya satu target berbintang yang diizinkan")),
        };

        let required = targets.len() - star.map_or(0, |_| 1);
        if values.len() < required || (star.is_none() && values.len() != required) {
            return Err(value_error(format!(
                "Tidak cukup nilai untuk dibongkar: diharapkan {}{}, tetapi mendapat {}",
                if star.is_some() { "minimal " } else { "" },
                required,
                values.len()
            )));
        }

        let tail = star.map_or(0, |star| targets.len() - star - 1);
        let rest: Vec<Value> = match star {
            Some(star) => values.drain(star..values.len() - tail).collect(),
            None => Vec::new(),
        };
        let mut values = values.into_iter();
        let mut rest = Some(rest);
        for target in targets {
            match target {
                UnpackTarget::Normal(name) => {
                    let value = values.next().unwrap_or(Value::None);
                    self.assign_name(&name.lexeme, value);
                }
                UnpackTarget::Starred(name) => {
                    let value = Value::list(rest.take().unwrap_or_default());
                    self.assign_name(&name.lexeme, value);
                }
            }
        }
        Ok(Flow::Normal)
    }

    fn visit_expression(&mut self, expression: &Expr) -> Result<Flow, Diagnostic> {
        self.evaluate(expression)?;
        Ok(Flow::Normal)
    }

    fn visit_print(&mut self, values: &[Expr]) -> Result<Flow, Diagnostic> {
        let mut parts = Vec::with_capacity(values.len());
        for value in values {
            parts.push(self.evaluate(value)?.to_string());
        }

        writeln!(RefCell::borrow_mut(&self.stdout), "{}", parts.join(" ")).map_err(|e| {
            Diagnostic::new(ErrorKind::File, format!("Gagal menulis keluaran: {}", e))
        })?;
        Ok(Flow::Normal)
    }

    fn visit_if(&mut self, condition: &Expr, then_branch: &Block, else_branch: &Block) -> Result<Flow, Diagnostic> {
        if self.evaluate(condition)?.is_truthy() {
            self.execute_block(then_branch)
        } else {
            self.execute_block(else_branch)
        }
    }

    fn visit_while(&mut self, condition: &Expr, body: &Block) -> Result<Flow, Diagnostic> {
        while self.evaluate(condition)?.is_truthy() {
            match self.execute_block(body)? {
                Flow::Break => break,
                flow @ Flow::Return(_) => return Ok(flow),
                Flow::Normal | Flow::Continue => {}
            }
        }
        Ok(Flow::Normal)
    }

    fn visit_for(&mut self, var: &Token, start: &Expr, end: &Expr, body: &Block) -> Result<Flow, Diagnostic> {
        let (start, end) = self.range_bounds(start, end)?;
        for i in start..=end {
            self.assign_name(&var.lexeme, Value::Int(i));
            match self.execute_block(body)? {
                Flow::Break => break,
                flow @ Flow::Return(_) => return Ok(flow),
                Flow::Normal | Flow::Continue => {}
            }
        }
        Ok(Flow::Normal)
    }

    fn visit_for_each(&mut self, target: &LoopTarget, iterable: &Expr, body: &Block) -> Result<Flow, Diagnostic> {
        let iterable = self.evaluate(iterable)?;
        let mut iter = self.iterate(iterable)?;
        while let Some(item) = iter.next(self)? {
            self.bind_loop_target(target, item, false)?;
            match self.execute_block(body)? {
                Flow::Break => break,
                flow @ Flow::Return(_) => return Ok(flow),
                Flow::Normal | Flow::Continue => {}
            }
        }
        Ok(Flow::Normal)
    }

    fn visit_func_decl(&mut self, decl: &Rc<FuncDecl>) -> Result<Flow, Diagnostic> {
        let captured = self.scopes.locals().clone();
        let function = self.function(decl, captured)?;

        let compiled = match &self.jit {
            Some(jit) if !decl.is_generator && !decl.is_async => {
                jit.compile(&decl.name.lexeme, &decl.params, &decl.body)
            }
            _ => None,
        };
        let value = match compiled {
            Some(callable) => {
                debug!("fungsi {} dikompilasi oleh JIT", decl.name.lexeme);
                Value::Callable(callable)
            }
            None => Value::Callable(Rc::new(function)),
        };

        self.assign_name(&decl.name.lexeme, value);
        Ok(Flow::Normal)
    }

    fn visit_class_decl(&mut self, decl: &Rc<ClassDecl>) -> Result<Flow, Diagnostic> {
        let parent = match &decl.parent {
            Some(token) => match self
                .scopes
                .get_variable(&token.lexeme, self.instance.as_deref())
                .map_err(|e| e.locate(token))?
            {
                Value::Class(class) => Some(class),
                _ => {
                    return Err(type_error(format!("'{}' bukan sebuah kelas", token.lexeme)).locate(token))
                }
            },
            None => None,
        };

        let constructor = match &decl.constructor {
            Some(constructor) => Some(Rc::new(self.function(constructor, Scope::new())?)),
            None => None,
        };

        let mut methods = AHashMap::new();
        for method in &decl.methods {
            let function = self.function(method, Scope::new())?;
            methods.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let mut attributes = Vec::with_capacity(decl.attributes.len());
        for (name, value) in &decl.attributes {
            attributes.push((name.lexeme.clone(), self.evaluate(value)?));
        }

        let class = Class::new(&decl.name.lexeme, parent, constructor, methods, attributes);
        self.scopes.register_class(Rc::clone(&class));
        self.assign_name(&decl.name.lexeme, Value::Class(class));
        Ok(Flow::Normal)
    }

    fn visit_return(&mut self, value: Option<&Expr>, _token: &Token) -> Result<Flow, Diagnostic> {
        let value = match value {
            Some(value) => self.evaluate(value)?,
            None => Value::None,
        };
        Ok(Flow::Return(value))
    }

    fn visit_yield(&mut self, _token: &Token) -> Result<Flow, Diagnostic> {
        Err(Diagnostic::new(
            ErrorKind::Syntax,
            "'hasil_bertahap' hanya dapat digunakan di dalam fungsi",
        ))
    }

    fn visit_break(&mut self) -> Result<Flow, Diagnostic> {
        Ok(Flow::Break)
    }

    fn visit_continue(&mut self) -> Result<Flow, Diagnostic> {
        Ok(Flow::Continue)
    }

    fn visit_switch(&mut self, subject: &Expr, cases: &[Case], default: Option<&Block>) -> Result<Flow, Diagnostic> {
        match self.select_case(subject, cases, default)? {
            Some(block) => self.execute_block(block),
            None => Ok(Flow::Normal),
        }
    }

    fn visit_try(&mut self, body: &Block, handlers: &[CatchClause], finally: Option<&Block>) -> Result<Flow, Diagnostic> {
        let outcome = match self.execute_block(body) {
            Err(error) => match handler_for(handlers, &error) {
                Some(handler) => {
                    self.bind_error(handler, &error);
                    self.execute_block(&handler.body)
                }
                None => Err(error),
            },
            outcome => outcome,
        };

        match finally {
            // an abrupt finally overrides whatever the body did
            Some(finally) => match self.execute_block(finally)? {
                Flow::Normal => outcome,
                flow => Ok(flow),
            },
            None => outcome,
        }
    }

    fn visit_with(&mut self, context: &Expr, binding: Option<&Token>, body: &Block) -> Result<Flow, Diagnostic> {
        let context = self.evaluate(context)?;
        let bound = self.enter_context(&context)?;
        if let Some(binding) = binding {
            self.assign_name(&binding.lexeme, bound);
        }

        let outcome = self.execute_block(body);
        let exit = self.exit_context(&context, outcome.as_ref().err());
        exit.and(outcome)
    }

    fn visit_decorator(&mut self, name: &str, args: &[Expr], target: &Stmt) -> Result<Flow, Diagnostic> {
        self.execute(target)?;
        let declared = declared_name(target)
            .ok_or_else(|| type_error("Dekorator hanya dapat diterapkan pada fungsi atau kelas"))?;

        let mut decorator = self.dotted(name)?;
        if !args.is_empty() {
            let args = self.arguments(args)?;
            decorator = self.call_value(decorator, args, Vec::new())?;
        }

        let original = self.scopes.get_variable(declared, self.instance.as_deref())?;
        let decorated = self.call_value(decorator, vec![original], Vec::new())?;
        self.assign_name(declared, decorated);
        Ok(Flow::Normal)
    }

    fn visit_type_alias(&mut self, name: &Token, hint: &TypeHint) -> Result<Flow, Diagnostic> {
        self.scopes.define_type_alias(&name.lexeme, &hint.name);
        Ok(Flow::Normal)
    }

    fn visit_import(&mut self, module: &str, alias: Option<&Token>) -> Result<Flow, Diagnostic> {
        let loaded = self.load_module(module)?;
        let name = alias.map_or_else(|| last_segment(module), |alias| alias.lexeme.as_str());
        self.assign_name(name, Value::Module(loaded));
        Ok(Flow::Normal)
    }

    fn visit_from_import(&mut self, module: &str, names: &[(Token, Option<Token>)]) -> Result<Flow, Diagnostic> {
        let loaded = self.load_module(module)?;
        for (name, alias) in names {
            let value = loaded.get(&name.lexeme).ok_or_else(|| {
                import_error(format!(
                    "Tidak dapat mengimpor '{}' dari modul '{}'",
                    name.lexeme, module
                ))
                .locate(name)
            })?;
            let bound = alias.as_ref().unwrap_or(name);
            self.assign_name(&bound.lexeme, value);
        }
        Ok(Flow::Normal)
    }

    fn visit_python_import(&mut self, module: &str, alias: Option<&Token>) -> Result<Flow, Diagnostic> {
        let loaded = match self.scopes.module(module) {
            Some(loaded) => loaded,
            None => {
                let loaded = builtins::host_module(module)
                    .ok_or_else(|| host_error(format!("Modul Python '{}' tidak tersedia", module)))?;
                self.scopes.register_module(module, Rc::clone(&loaded));
                loaded
            }
        };

        let name = alias.map_or_else(|| last_segment(module), |alias| alias.lexeme.as_str());
        self.assign_name(name, Value::Module(loaded));
        Ok(Flow::Normal)
    }
}

/// The first handler that accepts `error`. Cancellation is never handled.
// Address of a local in the current frame. The stack grows in one direction, so the distance
// between two such addresses is the stack used in between.
#[inline(never)]
fn stack_address() -> usize {
    let marker = 0u8;
    std::hint::black_box(&marker) as *const u8 as usize
}

pub(crate) fn handler_for<'a>(handlers: &'a [CatchClause], error: &Diagnostic) -> Option<&'a CatchClause> {
    if error.kind == ErrorKind::Interrupted {
        return None;
    }
    handlers.iter().find(|handler| {
        handler
            .exception_type
            .as_deref()
            .map_or(true, |name| error.kind.caught_by(name))
    })
}

fn declared_name(stmt: &Stmt) -> Option<&str> {
    match stmt {
        Stmt::FuncDecl(decl) => Some(&decl.name.lexeme),
        Stmt::ClassDecl(decl) => Some(&decl.name.lexeme),
        Stmt::Decorator { target, .. } => declared_name(target),
        _ => None,
    }
}

fn last_segment(module: &str) -> &str {
    module.rsplit('.').next().unwrap_or(module)
}

pub(crate) fn attribute(object: &Value, name: &str) -> Result<Value, Diagnostic> {
    match object {
        Value::Instance(instance) => Instance::get(instance, name).ok_or_else(|| {
            attribute_error(format!(
                "Objek '{}' tidak memiliki atribut '{}'",
                instance.class().name(),
                name
            ))
        }),
        Value::Module(module) => module.get(name).ok_or_else(|| {
            attribute_error(format!(
                "Modul '{}' tidak memiliki atribut '{}'",
                module.name, name
            ))
        }),
        Value::Class(class) => class
            .attribute(name)
            .or_else(|| class.find_method(name).map(|method| Value::Callable(method)))
            .ok_or_else(|| {
                attribute_error(format!(
                    "Kelas '{}' tidak memiliki atribut '{}'",
                    class.name(),
                    name
                ))
            }),
        other => Err(attribute_error(format!(
            "Objek '{}' tidak memiliki atribut '{}'",
            other.type_name(),
            name
        ))),
    }
}

fn set_attribute(object: &Value, name: &str, value: Value) -> Result<(), Diagnostic> {
    match object {
        Value::Instance(instance) => instance.set_field(name, value),
        Value::Module(module) => module.set(name, value),
        other => {
            return Err(attribute_error(format!(
                "Tidak dapat menetapkan atribut '{}' pada objek '{}'",
                name,
                other.type_name()
            )))
        }
    }
    Ok(())
}

// Resolves a possibly negative index against a sequence length.
fn position(index: &Value, len: usize) -> Result<usize, Diagnostic> {
    let i = index.as_int().ok_or_else(|| {
        type_error(format!(
            "Indeks harus berupa bilangan bulat, bukan '{}'",
            index.type_name()
        ))
    })?;
    let resolved = if i < 0 { i + len as i64 } else { i };
    if resolved < 0 || resolved >= len as i64 {
        Err(index_error(format!("Indeks {} di luar jangkauan", i)))
    } else {
        Ok(resolved as usize)
    }
}

fn index_value(object: &Value, index: &Value) -> Result<Value, Diagnostic> {
    match object {
        Value::List(values) => {
            let values = values.borrow();
            Ok(values[position(index, values.len())?].clone())
        }
        Value::Tuple(values) => Ok(values[position(index, values.len())?].clone()),
        Value::Str(text) => {
            let chars: Vec<char> = text.chars().collect();
            Ok(Value::from(chars[position(index, chars.len())?].to_string()))
        }
        Value::Dict(dict) => dict
            .borrow()
            .get(index)?
            .ok_or_else(|| key_error(format!("Kunci {} tidak ditemukan", index.repr()))),
        other => Err(type_error(format!(
            "Objek '{}' tidak dapat diindeks",
            other.type_name()
        ))),
    }
}

fn set_index(object: &Value, index: Value, value: Value) -> Result<(), Diagnostic> {
    match object {
        Value::List(values) => {
            let mut values = values.borrow_mut();
            let i = position(&index, values.len())?;
            values[i] = value;
            Ok(())
        }
        Value::Dict(dict) => dict.borrow_mut().insert(index, value),
        other => Err(type_error(format!(
            "Objek '{}' tidak mendukung penetapan indeks",
            other.type_name()
        ))),
    }
}

fn slice_bound(bound: Option<Value>, len: usize, default: usize) -> Result<usize, Diagnostic> {
    match bound {
        None | Some(Value::None) => Ok(default),
        Some(bound) => {
            let i = bound.as_int().ok_or_else(|| {
                type_error(format!(
                    "Batas irisan harus berupa bilangan bulat, bukan '{}'",
                    bound.type_name()
                ))
            })?;
            let len = len as i64;
            Ok(if i < 0 { (i + len).max(0) } else { i.min(len) } as usize)
        }
    }
}

fn slice_value(object: &Value, start: Option<Value>, end: Option<Value>) -> Result<Value, Diagnostic> {
    fn range(len: usize, start: Option<Value>, end: Option<Value>) -> Result<std::ops::Range<usize>, Diagnostic> {
        let start = slice_bound(start, len, 0)?;
        let end = slice_bound(end, len, len)?;
        Ok(start..end.max(start))
    }

    match object {
        Value::List(values) => {
            let values = values.borrow();
            Ok(Value::list(values[range(values.len(), start, end)?].to_vec()))
        }
        Value::Tuple(values) => Ok(Value::tuple(values[range(values.len(), start, end)?].to_vec())),
        Value::Str(text) => {
            let chars: Vec<char> = text.chars().collect();
            Ok(Value::from(chars[range(chars.len(), start, end)?].iter().collect::<String>()))
        }
        other => Err(type_error(format!(
            "Objek '{}' tidak mendukung irisan",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::str;

    use renzmc_core::{format_error, Diagnostic, ErrorKind};

    use crate::callable::Native;
    use crate::interpreter::{Config, Interpreter};
    use crate::resolver::DirectoryResolver;
    use crate::value::Value;

    fn test_statements(src: &str, out: Option<&str>, err: Option<&str>) {
        println!("Testing source:\n{}", src);

        let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(output.clone());
        let result = interpreter.run(src);

        match (result, err) {
            (Err(error), Some(err)) => assert_eq!(err, error.message),
            (Err(error), None) => panic!("Not expecting any error, found '{}'", error),
            (Ok(_), Some(err)) => panic!("Expecting an error '{}', found none.", err),
            _ => {}
        }

        if let Some(out) = out {
            assert_eq!(str::from_utf8(&output.borrow()).unwrap(), out);
        }
        println!("\n\n");
    }

    #[test]
    fn test_programs() {
        let tests = [
            // arithmetic with precedence
            ("tampilkan (1 + 2) * 5 + 2", "17\n"),
            ("tampilkan 7 / 2, -7 % 3, 2 ** 3 ** 2", "3.5 2 512\n"),
            ("x itu 7\nx //= 2\ntampilkan x", "3\n"),
            ("tampilkan 10 / 5", "2.0\n"),
            // declarations and printing
            ("x itu 5\ntampilkan x", "5\n"),
            ("nama: teks itu \"Budi\"\ntampilkan f\"Halo {nama}!\"", "Halo Budi!\n"),
            ("a, b itu 1, 2\na, b = b, a\ntampilkan a, b", "2 1\n"),
            ("simpan a, b ke 3, 4\ntampilkan(a, b)", "3 4\n"),
            ("pertama, *sisa = [1, 2, 3]\ntampilkan pertama, sisa", "1 [2, 3]\n"),
            ("*awal, ujung = [1, 2, 3]\ntampilkan awal, ujung", "[1, 2] 3\n"),
            ("x itu 1\nx += 2\nx *= 3\ntampilkan x", "9\n"),
            // control flow
            (
                "x itu 3\njika x > 5\n    tampilkan \"besar\"\nlainnya jika x > 1\n    tampilkan \"sedang\"\nlainnya\n    tampilkan \"kecil\"\nselesai",
                "sedang\n",
            ),
            ("i itu 0\nselama i < 3\n    tampilkan i\n    i += 1\nselesai", "0\n1\n2\n"),
            ("untuk i dari 1 sampai 3\n    tampilkan i\nselesai", "1\n2\n3\n"),
            (
                "untuk setiap (k, v) dari [(1, \"a\"), (2, \"b\")]\n    tampilkan k, v\nselesai",
                "1 a\n2 b\n",
            ),
            (
                "untuk i dari 1 sampai 10\n    jika i == 2\n        lanjut\n    selesai\n    jika i == 4\n        berhenti\n    selesai\n    tampilkan i\nselesai",
                "1\n3\n",
            ),
            (
                "cocok 2\n    kasus 1, 3\n        tampilkan \"ganjil\"\n    kasus 2\n        tampilkan \"dua\"\n    bawaan\n        tampilkan \"lain\"\nselesai",
                "dua\n",
            ),
            // expressions
            ("tampilkan [x * x untuk setiap x dari rentang(1, 5) jika x % 2 == 0]", "[4, 16]\n"),
            ("kuadrat itu lambda dengan x -> x * x\ntampilkan kuadrat(4)", "16\n"),
            ("tampilkan \"ya\" jika 1 < 2 lainnya \"tidak\"", "ya\n"),
            ("d itu {\"a\": 1}\nd[\"b\"] = 2\ntampilkan d, panjang(d)", "{'a': 1, 'b': 2} 2\n"),
            ("xs itu [1, 2, 3, 4]\ntampilkan xs[-1], xs[1:3], \"renzmc\"[:3]", "4 [2, 3] ren\n"),
            ("tampilkan 2 dalam [1, 2], 5 tidak dalam [1, 2]", "benar benar\n"),
            ("tampilkan kosong atau \"bawaan\", 0 dan 1", "bawaan 0\n"),
        ];

        for (src, expected) in tests {
            test_statements(src, Some(expected), None);
        }
    }

    #[test]
    fn test_functions_and_classes() {
        let tests = [
            (
                "fungsi tambah(a, b=10)\n    hasil a + b\nselesai\ntampilkan tambah(1), tambah(1, b=2)",
                "11 3\n",
            ),
            (
                "fungsi fib(n)\n    jika n < 2\n        hasil n\n    selesai\n    hasil fib(n - 1) + fib(n - 2)\nselesai\ntampilkan fib(15)",
                "610\n",
            ),
            (
                "kelas Titik\n    konstruktor(x, y)\n        diri.x itu x\n        diri.y itu y\n    selesai\n    metode jarak()\n        hasil diri.x + diri.y\n    selesai\nselesai\np itu Titik(3, 4)\ntampilkan p.jarak(), p.x",
                "7 3\n",
            ),
            (
                "kelas Hewan\n    suara itu \"...\"\n    metode bicara()\n        hasil diri.suara\n    selesai\nselesai\nkelas Kucing warisi Hewan\n    suara itu \"meong\"\nselesai\ntampilkan Kucing().bicara(), Hewan().bicara()",
                "meong ...\n",
            ),
            (
                "fungsi log(f)\n    fungsi bungkus(x)\n        tampilkan \"panggil\"\n        hasil f(x)\n    selesai\n    hasil bungkus\nselesai\n@log\nfungsi dobel(x)\n    hasil x * 2\nselesai\ntampilkan dobel(4)",
                "panggil\n8\n",
            ),
            (
                "asinkron fungsi ambil()\n    hasil 42\nselesai\ntampilkan tunggu ambil()",
                "42\n",
            ),
            ("tipe Angka = int | float\nx: Angka itu 2.5\ntampilkan x", "2.5\n"),
        ];

        for (src, expected) in tests {
            test_statements(src, Some(expected), None);
        }
    }

    #[test]
    fn test_runtime_errors() {
        let tests = [
            ("tampilkan y", "Variabel 'y' tidak terdefinisi"),
            ("tampilkan 1 / 0", "Pembagian dengan nol"),
            ("tampilkan \"a\" - 1", "Operator - tidak dapat digunakan antara 'str' dan 'int'"),
            ("x: int itu \"lima\"", "Tipe tidak sesuai untuk variabel 'x': diharapkan 'int', tetapi mendapat 'str'"),
            (
                "fungsi f(a: int) -> int\n    hasil a\nselesai\nf(\"1\")",
                "Tipe tidak sesuai untuk parameter 'a' pada fungsi 'f': diharapkan 'int', tetapi mendapat 'str'",
            ),
            (
                "fungsi f() -> int\n    hasil \"a\"\nselesai\nf()",
                "Tipe nilai kembalian fungsi 'f' tidak sesuai: diharapkan 'int', tetapi mendapat 'str'",
            ),
            ("fungsi f(a)\n    hasil a\nselesai\nf()", "Fungsi 'f' membutuhkan argumen 'a'"),
            ("fungsi f(a)\n    hasil a\nselesai\nf(1, 2)", "Fungsi 'f' menerima 1 argumen, tetapi 2 diberikan"),
            ("fungsi f(a)\n    hasil a\nselesai\nf(b=1)", "Fungsi 'f' tidak memiliki parameter 'b'"),
            ("panjang(1, 2)", "Fungsi 'panjang' membutuhkan 1 argumen, tetapi 2 diberikan"),
            ("x itu [1]\nx[3]", "Indeks 3 di luar jangkauan"),
            ("d itu {}\nd[\"k\"]", "Kunci 'k' tidak ditemukan"),
            ("5()", "Objek 'int' tidak dapat dipanggil"),
            ("impor tidak_ada", "Modul 'tidak_ada' tidak ditemukan"),
            ("impor_python \"numpy\"", "Modul Python 'numpy' tidak tersedia"),
            (
                "asinkron fungsi f()\n    hasil 1\nselesai\nc itu f()\ntunggu c\ntunggu c",
                "Coroutine 'f' sudah ditunggu sebelumnya",
            ),
        ];

        for (src, expected) in tests {
            test_statements(src, None, Some(expected));
        }
    }

    #[test]
    fn test_errors_are_located_at_the_failing_node() {
        let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(output);
        let src = "x itu 1\ny itu x + z";
        let error = interpreter.run(src).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Name);
        assert_eq!((error.line, error.column), (Some(2), Some(11)));

        let rendered = format_error(&error, Some(src));
        assert!(rendered.contains("2 | y itu x + z"));
    }

    #[test]
    fn test_try_catch_finally() {
        let tests = [
            (
                "coba\n    x itu 1 / 0\ntangkap ZeroDivisionError sebagai e\n    tampilkan \"tertangkap:\", e\nakhirnya\n    tampilkan \"selesai\"\nselesai",
                "tertangkap: Pembagian dengan nol\nselesai\n",
            ),
            (
                "coba\n    coba\n        tampilkan y\n    tangkap IndexError\n        tampilkan \"salah tangkap\"\n    selesai\ntangkap Exception sebagai e\n    tampilkan e\nselesai",
                "Variabel 'y' tidak terdefinisi\n",
            ),
            (
                "fungsi f()\n    coba\n        hasil 1\n    akhirnya\n        tampilkan \"bersih\"\n    selesai\nselesai\ntampilkan f()",
                "bersih\n1\n",
            ),
        ];

        for (src, expected) in tests {
            test_statements(src, Some(expected), None);
        }
    }

    #[test]
    fn test_with_calls_enter_and_exit() {
        let src = "\
kelas Sumber
    metode __enter__()
        tampilkan \"buka\"
        hasil 7
    selesai
    metode __exit__(jenis, pesan, jejak)
        tampilkan \"tutup\", jenis
    selesai
selesai
coba
    dengan Sumber() sebagai n
        tampilkan n
        tampilkan 1 / 0
    selesai
tangkap
    tampilkan \"gagal\"
selesai
";
        test_statements(src, Some("buka\n7\ntutup DivisionByZero\ngagal\n"), None);
    }

    #[test]
    fn test_recursion_limit() {
        let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let config = Config {
            max_call_depth: 32,
            ..Config::default()
        };
        let mut interpreter = Interpreter::with_config(output, config);
        let error = interpreter
            .run("fungsi f(n)\n    hasil f(n + 1)\nselesai\nf(0)")
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::Runtime);
        assert_eq!(error.message, "Kedalaman rekursi maksimum (32) terlampaui");
    }

    #[test]
    fn test_compound_assignment_evaluates_its_target_once() {
        test_statements(
            "hitungan itu [0]\nxs itu [10, 20]\nfungsi idx()\n    hitungan[0] += 1\n    hasil 1\nselesai\nxs[idx()] += 5\ntampilkan xs, hitungan",
            Some("[10, 25] [1]\n"),
            None,
        );
        test_statements(
            "kelas Kotak\n    isi itu 1\nselesai\nk itu Kotak()\nfungsi ambil()\n    tampilkan \"ambil\"\n    hasil k\nselesai\nambil().isi += 2\ntampilkan k.isi",
            Some("ambil\n3\n"),
            None,
        );
        test_statements(
            "d itu {\"a\": 1}\nd[\"b\"] += 1",
            None,
            Some("Kunci 'b' tidak ditemukan"),
        );
    }

    #[test]
    fn test_default_recursion_limit_fits_a_test_thread() {
        let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(output.clone());
        let error = interpreter
            .run("fungsi f(n)\n    hasil f(n + 1)\nselesai\nf(0)")
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::Runtime);
        assert_eq!(error.message, "Kedalaman rekursi maksimum (256) terlampaui");

        let src = "fungsi genap(n)\n    hasil ganjil(n + 1)\nselesai\nfungsi ganjil(n)\n    hasil genap(n + 1)\nselesai\ncoba\n    genap(0)\ntangkap RecursionError\n    tampilkan \"terlalu dalam\"\nselesai\nfungsi hitung(n)\n    jika n == 0\n        hasil 0\n    selesai\n    hasil 1 + hitung(n - 1)\nselesai\ntampilkan hitung(20)";
        interpreter.run(src).unwrap();
        assert_eq!(str::from_utf8(&output.borrow()).unwrap(), "terlalu dalam\n20\n");
    }

    #[test]
    fn test_type_checking_toggles() {
        let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(output);
        assert!(interpreter.run("a: float itu 1").is_ok());

        interpreter.set_strict_mode(true);
        let error = interpreter.run("b: float itu 1").unwrap_err();
        assert_eq!(error.kind, ErrorKind::TypeHint);

        interpreter.disable_type_checking();
        assert!(interpreter.run("c: int itu \"bukan\"").is_ok());
    }

    #[test]
    fn test_scope_hysteresis_is_observable() {
        // inside a function without parameters, the first write has no local scope to land
        // in and becomes a global
        let src = "\
fungsi tulis()
    bocor itu 1
    lokal itu 2
selesai
tulis()
tampilkan bocor
";
        test_statements(src, Some("1\n"), None);
        test_statements(
            "fungsi tulis(p)\n    aman itu 1\nselesai\ntulis(0)\ntampilkan aman",
            None,
            Some("Variabel 'aman' tidak terdefinisi"),
        );
    }

    #[test]
    fn test_host_module() {
        test_statements(
            "impor_python \"math\"\ntampilkan math.sqrt(16), math.floor(2.7)\ntampilkan panggil_python math.pow(2, 3)",
            Some("4.0 2\n8.0\n"),
            None,
        );
    }

    #[test]
    fn test_imports_through_a_resolver() {
        let dir = std::env::temp_dir().join(format!("renzmc-import-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("alat")).unwrap();
        std::fs::write(
            dir.join("alat").join("hitung.rmc"),
            "tampilkan \"dimuat\"\nfungsi dobel(x)\n    hasil x * 2\nselesai\nbasis itu 10\n",
        )
        .unwrap();
        std::fs::write(dir.join("siklus_a.rmc"), "impor siklus_b\n").unwrap();
        std::fs::write(dir.join("siklus_b.rmc"), "impor siklus_a\n").unwrap();

        let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(output.clone());
        interpreter.set_module_resolver(Rc::new(DirectoryResolver::new(&dir)));

        let src = "\
impor alat.hitung
impor alat.hitung sebagai h
dari alat.hitung impor dobel, basis sebagai b
tampilkan hitung.dobel(2), h.basis, dobel(b)
";
        interpreter.run(src).unwrap();
        assert_eq!(str::from_utf8(&output.borrow()).unwrap(), "dimuat\n4 10 20\n");

        let error = interpreter.run("impor siklus_a").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Import);
        assert_eq!(error.message, "Impor melingkar terdeteksi pada modul 'siklus_a'");
        assert_eq!(error.source_code.as_deref(), Some("impor siklus_a\n"));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_interrupt_stops_a_running_loop() {
        let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(output.clone());
        let handle = interpreter.interrupt_handle();
        interpreter.scopes.define_builtin(
            "hentikan",
            Value::Callable(Rc::new(Native::new(
                "hentikan",
                0..=0,
                Box::new(move |_: &mut Interpreter, _: Vec<Value>| -> Result<Value, Diagnostic> {
                    handle.interrupt();
                    Ok(Value::None)
                }),
            ))),
        );

        let src = "\
i itu 0
coba
    selama benar
        i += 1
        jika i == 3
            hentikan()
        selesai
    selesai
tangkap Exception
    tampilkan \"tidak boleh tertangkap\"
selesai
";
        let error = interpreter.run(src).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Interrupted);
        assert!(output.borrow().is_empty());
        assert_eq!(
            format_error(&error, Some(src)),
            "✓ Program dihentikan oleh pengguna (Ctrl+C)"
        );
    }
}
