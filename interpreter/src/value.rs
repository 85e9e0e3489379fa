use std::cell::RefCell;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;

use ahash::AHashMap;
use renzmc_core::{Diagnostic, ErrorKind, Literal};

use crate::callable::{Callable, Class, Coroutine, Instance};
use crate::generator::Generator;

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<String>),
    List(Rc<RefCell<Vec<Value>>>),
    Tuple(Rc<Vec<Value>>),
    Dict(Rc<RefCell<Dict>>),
    Callable(Rc<dyn Callable>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    Module(Rc<Module>),
    Generator(Rc<RefCell<Generator>>),
    Coroutine(Rc<Coroutine>),
}

impl Value {
    pub fn list(values: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(values)))
    }

    pub fn tuple(values: Vec<Value>) -> Self {
        Value::Tuple(Rc::new(values))
    }

    pub fn dict(dict: Dict) -> Self {
        Value::Dict(Rc::new(RefCell::new(dict)))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(val) => *val,
            Value::Int(val) => *val != 0,
            Value::Float(val) => *val != 0.0,
            Value::Str(val) => !val.is_empty(),
            Value::List(val) => !val.borrow().is_empty(),
            Value::Tuple(val) => !val.is_empty(),
            Value::Dict(val) => !val.borrow().is_empty(),
            _ => true,
        }
    }

    /// The name `jenis()` reports and type diagnostics mention.
    pub fn type_name(&self) -> String {
        let name = match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Callable(_) => "function",
            Value::Class(_) => "type",
            Value::Instance(instance) => return instance.class().name().to_string(),
            Value::Module(_) => "module",
            Value::Generator(_) => "generator",
            Value::Coroutine(_) => "coroutine",
        };
        String::from(name)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(val) => Some(*val as f64),
            Value::Float(val) => Some(*val),
            Value::Bool(val) => Some(if *val { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(val) => Some(*val),
            Value::Bool(val) => Some(*val as i64),
            _ => None,
        }
    }

    /// Elements of the eagerly iterable values. Generators are driven by the interpreter.
    pub fn sequence(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(val) => Some(val.borrow().clone()),
            Value::Tuple(val) => Some(val.as_ref().clone()),
            Value::Str(val) => Some(val.chars().map(|c| Value::from(c.to_string())).collect()),
            Value::Dict(val) => Some(val.borrow().keys()),
            _ => None,
        }
    }

    /// Python-style representation: strings quoted, used inside containers.
    pub fn repr(&self) -> String {
        Repr(self).to_string()
    }

    // Containers already being rendered further up print as `[...]` or `{...}`.
    fn render(&self, f: &mut Formatter<'_>, quoted: bool, active: &mut Vec<usize>) -> std::fmt::Result {
        match self {
            Value::None => write!(f, "kosong"),
            Value::Bool(true) => write!(f, "benar"),
            Value::Bool(false) => write!(f, "salah"),
            Value::Int(val) => write!(f, "{}", val),
            Value::Float(val) => write!(f, "{}", format_float(*val)),
            Value::Str(val) if quoted => {
                let escaped = val
                    .replace('\\', "\\\\")
                    .replace('\'', "\\'")
                    .replace('\n', "\\n");
                write!(f, "'{}'", escaped)
            }
            Value::Str(val) => write!(f, "{}", val),
            Value::List(values) => {
                let id = Rc::as_ptr(values) as usize;
                if active.contains(&id) {
                    return write!(f, "[...]");
                }
                active.push(id);
                write!(f, "[")?;
                render_items(f, &values.borrow(), active)?;
                active.pop();
                write!(f, "]")
            }
            Value::Tuple(values) => {
                write!(f, "(")?;
                render_items(f, values, active)?;
                if values.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::Dict(dict) => {
                let id = Rc::as_ptr(dict) as usize;
                if active.contains(&id) {
                    return write!(f, "{{...}}");
                }
                active.push(id);
                write!(f, "{{")?;
                for (i, (key, value)) in dict.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    key.render(f, true, active)?;
                    write!(f, ": ")?;
                    value.render(f, true, active)?;
                }
                active.pop();
                write!(f, "}}")
            }
            Value::Callable(val) => write!(f, "<fungsi {}>", val.name()),
            Value::Class(class) => write!(f, "<kelas {}>", class.name()),
            Value::Instance(instance) => write!(f, "<objek {}>", instance.class().name()),
            Value::Module(module) => write!(f, "<modul {}>", module.name),
            Value::Generator(generator) => write!(f, "<generator {}>", generator.borrow().name()),
            Value::Coroutine(coroutine) => write!(f, "<coroutine {}>", coroutine.name()),
        }
    }

    pub(crate) fn key(&self) -> Result<Key, Diagnostic> {
        let key = match self {
            Value::None => Key::None,
            Value::Bool(val) => Key::Int(*val as i64),
            Value::Int(val) => Key::Int(*val),
            Value::Float(val) if val.fract() == 0.0 && val.abs() < i64::MAX as f64 => Key::Int(*val as i64),
            Value::Float(val) => Key::Float(val.to_bits()),
            Value::Str(val) => Key::Str(Rc::clone(val)),
            Value::Tuple(values) => Key::Tuple(values.iter().map(Value::key).collect::<Result<_, _>>()?),
            Value::Callable(val) => Key::Ptr(Rc::as_ptr(val) as *const u8 as usize),
            Value::Class(val) => Key::Ptr(Rc::as_ptr(val) as usize),
            Value::Instance(val) => Key::Ptr(Rc::as_ptr(val) as usize),
            other => {
                return Err(Diagnostic::new(
                    ErrorKind::Type,
                    format!("Tipe '{}' tidak dapat di-hash", other.type_name()),
                ))
            }
        };
        Ok(key)
    }
}

impl From<Literal> for Value {
    fn from(value: Literal) -> Self {
        match value {
            Literal::Str(val) => Value::Str(Rc::new(val)),
            Literal::Int(val) => Value::Int(val),
            Literal::Float(val) => Value::Float(val),
            Literal::Bool(val) => Value::Bool(val),
            Literal::Nil => Value::None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Rc::new(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Rc::new(String::from(value)))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::list(values)
    }
}

macro_rules! impl_from_int_for_value {
    ( $( $t:ident )* ) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Value {
                    Value::Int(n as i64)
                }
            }
        )*
    }
}

impl_from_int_for_value!(u8 i8 u16 i16 u32 i32 i64 usize isize);

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Int(lhs), Value::Int(rhs)) => lhs == rhs,
            (Value::Str(lhs), Value::Str(rhs)) => lhs == rhs,
            (Value::List(lhs), Value::List(rhs)) => Rc::ptr_eq(lhs, rhs) || *lhs.borrow() == *rhs.borrow(),
            (Value::Tuple(lhs), Value::Tuple(rhs)) => lhs == rhs,
            (Value::Dict(lhs), Value::Dict(rhs)) => Rc::ptr_eq(lhs, rhs) || *lhs.borrow() == *rhs.borrow(),
            (Value::Callable(lhs), Value::Callable(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Class(lhs), Value::Class(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Instance(lhs), Value::Instance(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Module(lhs), Value::Module(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Generator(lhs), Value::Generator(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Coroutine(lhs), Value::Coroutine(rhs)) => Rc::ptr_eq(lhs, rhs),
            // booleans compare as the numbers 0 and 1
            (lhs, rhs) => match (lhs.as_number(), rhs.as_number()) {
                (Some(lhs), Some(rhs)) => lhs == rhs,
                _ => false,
            },
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.repr())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.render(f, false, &mut Vec::new())
    }
}

struct Repr<'a>(&'a Value);

impl Display for Repr<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.render(f, true, &mut Vec::new())
    }
}

fn render_items(f: &mut Formatter<'_>, values: &[Value], active: &mut Vec<usize>) -> std::fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        value.render(f, true, active)?;
    }
    Ok(())
}

pub(crate) fn format_float(val: f64) -> String {
    if val.is_nan() {
        String::from("nan")
    } else if val.is_infinite() {
        String::from(if val > 0.0 { "inf" } else { "-inf" })
    } else if val.fract() == 0.0 && val.abs() < 1e16 {
        format!("{:.1}", val)
    } else {
        format!("{}", val)
    }
}

/// Hashable projection of a value. Numbers that compare equal share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Key {
    None,
    Int(i64),
    Float(u64),
    Str(Rc<String>),
    Tuple(Vec<Key>),
    Ptr(usize),
}

/// Insertion-ordered dictionary.
#[derive(Default, Clone)]
pub struct Dict {
    entries: Vec<(Value, Value)>,
    index: AHashMap<Key, usize>,
}

impl Dict {
    pub fn new() -> Self {
        Dict::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Result<Option<Value>, Diagnostic> {
        let key = key.key()?;
        Ok(self.index.get(&key).map(|&i| self.entries[i].1.clone()))
    }

    pub fn contains(&self, key: &Value) -> Result<bool, Diagnostic> {
        Ok(self.index.contains_key(&key.key()?))
    }

    pub fn insert(&mut self, key: Value, value: Value) -> Result<(), Diagnostic> {
        match self.index.get(&key.key()?) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.key()?, self.entries.len());
                self.entries.push((key, value));
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &Value) -> Result<Option<Value>, Diagnostic> {
        let position = match self.index.remove(&key.key()?) {
            Some(position) => position,
            None => return Ok(None),
        };

        let (_, value) = self.entries.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Ok(Some(value))
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Value, Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> Vec<Value> {
        self.entries.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.iter().map(|(_, value)| value.clone()).collect()
    }

    pub fn items(&self) -> Vec<Value> {
        self.entries
            .iter()
            .map(|(key, value)| Value::tuple(vec![key.clone(), value.clone()]))
            .collect()
    }
}

impl PartialEq for Dict {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.entries.iter().all(|(key, value)| match other.get(key) {
                Ok(Some(found)) => found == *value,
                _ => false,
            })
    }
}

/// A namespace produced by an import: either a source module or a host module.
pub struct Module {
    pub(crate) name: String,
    members: RefCell<AHashMap<String, Value>>,
}

impl Module {
    pub(crate) fn new(name: &str, members: AHashMap<String, Value>) -> Rc<Self> {
        Rc::new(Module {
            name: String::from(name),
            members: RefCell::new(members),
        })
    }

    pub(crate) fn get(&self, name: &str) -> Option<Value> {
        self.members.borrow().get(name).cloned()
    }

    pub(crate) fn set(&self, name: &str, value: Value) {
        self.members.borrow_mut().insert(String::from(name), value);
    }
}

#[cfg(test)]
mod tests {
    use crate::value::{Dict, Value};

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::list(vec![]).is_truthy());
        assert!(Value::from(0.5).is_truthy());
        assert!(Value::tuple(vec![Value::None]).is_truthy());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(2.0).to_string(), "2.0");
        assert_eq!(Value::from(0.1).to_string(), "0.1");
        assert_eq!(Value::from(true).to_string(), "benar");
        assert_eq!(Value::None.to_string(), "kosong");
        assert_eq!(
            Value::list(vec![Value::from(1), Value::from("a")]).to_string(),
            "[1, 'a']"
        );
        assert_eq!(Value::tuple(vec![Value::from(1)]).to_string(), "(1,)");
    }

    #[test]
    fn test_numeric_equality() {
        assert_eq!(Value::from(1), Value::from(1.0));
        assert_eq!(Value::from(true), Value::from(1));
        assert_ne!(Value::from("1"), Value::from(1));
    }

    #[test]
    fn test_dict_keeps_insertion_order() {
        let mut dict = Dict::new();
        dict.insert(Value::from("b"), Value::from(1)).unwrap();
        dict.insert(Value::from("a"), Value::from(2)).unwrap();
        dict.insert(Value::from(1), Value::from(3)).unwrap();
        dict.insert(Value::from("b"), Value::from(4)).unwrap();

        assert_eq!(Value::dict(dict.clone()).to_string(), "{'b': 4, 'a': 2, 1: 3}");
        assert_eq!(dict.get(&Value::from(1.0)).unwrap(), Some(Value::from(3)));

        dict.remove(&Value::from("b")).unwrap();
        assert_eq!(dict.keys(), vec![Value::from("a"), Value::from(1)]);
        assert_eq!(dict.get(&Value::from(1)).unwrap(), Some(Value::from(3)));
        assert!(dict.insert(Value::list(vec![]), Value::None).is_err());
    }

    #[test]
    fn test_self_referencing_containers() {
        let list = Value::list(vec![Value::from(1)]);
        if let Value::List(values) = &list {
            values.borrow_mut().push(list.clone());
        }
        assert_eq!(list.to_string(), "[1, [...]]");

        let dict = Value::dict(Dict::new());
        if let Value::Dict(entries) = &dict {
            entries.borrow_mut().insert(Value::from("k"), dict.clone()).unwrap();
            entries.borrow_mut().insert(Value::from("xs"), list.clone()).unwrap();
        }
        assert_eq!(dict.to_string(), "{'k': {...}, 'xs': [1, [...]]}");

        let shared = Value::list(vec![]);
        let twice = Value::tuple(vec![shared.clone(), shared]);
        assert_eq!(twice.to_string(), "([], [])");
    }
}
