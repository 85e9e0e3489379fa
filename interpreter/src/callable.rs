use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::ops::RangeInclusive;
use std::rc::Rc;

use ahash::AHashMap;
use renzmc_core::{Diagnostic, Token};

use crate::ast::{Expr, FuncDecl};
use crate::env::Scope;
use crate::error::{async_error, type_error};
use crate::interpreter::Interpreter;
use crate::value::Value;

pub type KwArgs = Vec<(String, Value)>;

pub trait Callable {
    fn name(&self) -> &str;
    fn execute(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        kwargs: KwArgs,
    ) -> Result<Value, Diagnostic>;
}

impl Debug for dyn Callable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<fungsi {}>", self.name())
    }
}

pub type NativeFunction = Box<dyn Fn(&mut Interpreter, Vec<Value>) -> Result<Value, Diagnostic>>;

// `Native` bridges rust functions into the interpreter. Builtins and host module members are
// all natives.
pub struct Native {
    func: NativeFunction,
    name: String,
    arity: RangeInclusive<usize>,
}

impl Native {
    pub fn new(name: &str, arity: RangeInclusive<usize>, func: NativeFunction) -> Self {
        Native {
            func,
            name: String::from(name),
            arity,
        }
    }

    fn arity_error(&self, given: usize) -> Diagnostic {
        let (min, max) = (*self.arity.start(), *self.arity.end());
        let expected = if min == max {
            format!("{}", min)
        } else if max == usize::MAX {
            format!("minimal {}", min)
        } else {
            format!("{} sampai {}", min, max)
        };
        type_error(format!(
            "Fungsi '{}' membutuhkan {} argumen, tetapi {} diberikan",
            self.name, expected, given
        ))
    }
}

impl Callable for Native {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        kwargs: KwArgs,
    ) -> Result<Value, Diagnostic> {
        if !kwargs.is_empty() {
            return Err(type_error(format!(
                "Fungsi '{}' tidak menerima argumen kata kunci",
                self.name
            )));
        }
        if !self.arity.contains(&args.len()) {
            return Err(self.arity_error(args.len()));
        }
        (self.func)(interpreter, args)
    }
}

/// A user-defined function. Defaults are evaluated once, at declaration. `captured` holds the
/// local scope a nested function was declared in.
pub struct Function {
    pub(crate) decl: Rc<FuncDecl>,
    defaults: Vec<Option<Value>>,
    captured: Scope,
}

impl Function {
    pub(crate) fn new(decl: Rc<FuncDecl>, defaults: Vec<Option<Value>>, captured: Scope) -> Self {
        Function {
            decl,
            defaults,
            captured,
        }
    }

    /// Builds the callee's local scope. Positional arguments fill parameters in order, keyword
    /// arguments then override by name, and defaults fill whatever is left.
    pub(crate) fn bind(&self, args: Vec<Value>, kwargs: KwArgs) -> Result<Scope, Diagnostic> {
        let params = &self.decl.params;
        if args.len() > params.len() {
            return Err(type_error(format!(
                "Fungsi '{}' menerima {} argumen, tetapi {} diberikan",
                self.name(),
                params.len(),
                args.len()
            )));
        }

        let mut bound: Vec<Option<Value>> = args.into_iter().map(Some).collect();
        bound.resize(params.len(), None);

        for (name, value) in kwargs {
            match params.iter().position(|param| param.name.lexeme == name) {
                Some(position) => bound[position] = Some(value),
                None => {
                    return Err(type_error(format!(
                        "Fungsi '{}' tidak memiliki parameter '{}'",
                        self.name(),
                        name
                    )))
                }
            }
        }

        let mut scope = self.captured.clone();
        for ((param, value), default) in params.iter().zip(bound).zip(&self.defaults) {
            match value.or_else(|| default.clone()) {
                Some(value) => {
                    scope.insert(param.name.lexeme.clone(), value);
                }
                None => {
                    return Err(type_error(format!(
                        "Fungsi '{}' membutuhkan argumen '{}'",
                        self.name(),
                        param.name.lexeme
                    )))
                }
            }
        }

        Ok(scope)
    }
}

impl Callable for Function {
    fn name(&self) -> &str {
        &self.decl.name.lexeme
    }

    fn execute(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        kwargs: KwArgs,
    ) -> Result<Value, Diagnostic> {
        interpreter.call_function(&self, args, kwargs, None)
    }
}

pub struct Lambda {
    pub(crate) params: Vec<Token>,
    pub(crate) body: Rc<Expr>,
    pub(crate) captured: Scope,
}

impl Callable for Lambda {
    fn name(&self) -> &str {
        "lambda"
    }

    fn execute(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        kwargs: KwArgs,
    ) -> Result<Value, Diagnostic> {
        if !kwargs.is_empty() {
            return Err(type_error("Lambda tidak menerima argumen kata kunci"));
        }
        if args.len() != self.params.len() {
            return Err(type_error(format!(
                "Lambda membutuhkan {} argumen, tetapi {} diberikan",
                self.params.len(),
                args.len()
            )));
        }

        let mut locals = self.captured.clone();
        for (param, arg) in self.params.iter().zip(args) {
            locals.insert(param.lexeme.clone(), arg);
        }
        interpreter.call_lambda(&self.body, locals)
    }
}

// A method looked up on an instance. The function is shared with the class, only the
// receiver is attached here.
pub struct Method {
    function: Rc<Function>,
    instance: Rc<Instance>,
}

impl Method {
    pub(crate) fn bind(function: Rc<Function>, instance: Rc<Instance>) -> Self {
        Method { function, instance }
    }
}

impl Callable for Method {
    fn name(&self) -> &str {
        self.function.name()
    }

    fn execute(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        kwargs: KwArgs,
    ) -> Result<Value, Diagnostic> {
        interpreter.call_function(&self.function, args, kwargs, Some(Rc::clone(&self.instance)))
    }
}

pub struct Class {
    name: String,
    parent: Option<Rc<Class>>,
    constructor: Option<Rc<Function>>,
    methods: AHashMap<String, Rc<Function>>,
    attributes: Vec<(String, Value)>,
}

impl Class {
    pub(crate) fn new(
        name: &str,
        parent: Option<Rc<Class>>,
        constructor: Option<Rc<Function>>,
        methods: AHashMap<String, Rc<Function>>,
        attributes: Vec<(String, Value)>,
    ) -> Rc<Self> {
        Rc::new(Class {
            name: String::from(name),
            parent,
            constructor,
            methods,
            attributes,
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(fun) = self.methods.get(name) {
            Some(Rc::clone(fun))
        } else if let Some(parent) = &self.parent {
            parent.find_method(name)
        } else {
            None
        }
    }

    pub(crate) fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.clone())
            .or_else(|| self.parent.as_ref().and_then(|parent| parent.attribute(name)))
    }

    fn find_constructor(&self) -> Option<Rc<Function>> {
        match &self.constructor {
            Some(constructor) => Some(Rc::clone(constructor)),
            None => self.parent.as_ref().and_then(|parent| parent.find_constructor()),
        }
    }

    /// Whether this class is `name` or inherits from it.
    pub(crate) fn is_subclass_of(&self, name: &str) -> bool {
        self.name == name || self.parent.as_ref().map_or(false, |parent| parent.is_subclass_of(name))
    }

    fn initial_fields(&self, fields: &mut Scope) {
        if let Some(parent) = &self.parent {
            parent.initial_fields(fields);
        }
        for (name, value) in &self.attributes {
            fields.insert(name.clone(), value.clone());
        }
    }
}

impl Callable for Class {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        kwargs: KwArgs,
    ) -> Result<Value, Diagnostic> {
        let instance = Instance::new(Rc::clone(&self));
        match self.find_constructor() {
            Some(constructor) => {
                interpreter.call_function(&constructor, args, kwargs, Some(Rc::clone(&instance)))?;
            }
            None if !args.is_empty() || !kwargs.is_empty() => {
                return Err(type_error(format!(
                    "Kelas '{}' tidak memiliki konstruktor yang menerima argumen",
                    self.name
                )))
            }
            None => {}
        }

        Ok(Value::Instance(instance))
    }
}

/// An object. Its attribute map is the instance scope of the methods running on it.
pub struct Instance {
    class: Rc<Class>,
    fields: RefCell<Scope>,
}

impl Instance {
    pub(crate) fn new(class: Rc<Class>) -> Rc<Self> {
        let mut fields = Scope::new();
        class.initial_fields(&mut fields);
        Rc::new(Instance {
            class,
            fields: RefCell::new(fields),
        })
    }

    pub(crate) fn class(&self) -> &Rc<Class> {
        &self.class
    }

    pub(crate) fn field(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    pub(crate) fn set_field(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(String::from(name), value);
    }

    /// A field, or failing that a method bound to this instance.
    pub(crate) fn get(instance: &Rc<Self>, name: &str) -> Option<Value> {
        instance.field(name).or_else(|| {
            instance.class.find_method(name).map(|function| {
                Value::Callable(Rc::new(Method::bind(function, Rc::clone(instance))))
            })
        })
    }
}

enum CoroutineState {
    Pending(Scope, Option<Rc<Instance>>),
    Awaited,
}

/// The pending call produced by invoking an `asinkron` function. Awaiting it runs the body
/// to completion.
pub struct Coroutine {
    function: Rc<Function>,
    state: RefCell<CoroutineState>,
}

impl Coroutine {
    pub(crate) fn new(function: Rc<Function>, locals: Scope, instance: Option<Rc<Instance>>) -> Rc<Self> {
        Rc::new(Coroutine {
            function,
            state: RefCell::new(CoroutineState::Pending(locals, instance)),
        })
    }

    pub(crate) fn name(&self) -> &str {
        self.function.name()
    }

    pub(crate) fn function(&self) -> &Rc<Function> {
        &self.function
    }

    /// Hands out the bound call exactly once.
    pub(crate) fn start(&self) -> Result<(Scope, Option<Rc<Instance>>), Diagnostic> {
        match std::mem::replace(&mut *self.state.borrow_mut(), CoroutineState::Awaited) {
            CoroutineState::Pending(locals, instance) => Ok((locals, instance)),
            CoroutineState::Awaited => Err(async_error(format!(
                "Coroutine '{}' sudah ditunggu sebelumnya",
                self.name()
            ))),
        }
    }
}
