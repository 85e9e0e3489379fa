use std::cmp::Ordering;
use std::ops::RangeInclusive;
use std::rc::Rc;

use ahash::AHashMap;
use renzmc_core::{Diagnostic, Type};

use crate::callable::Native;
use crate::env::ScopeManager;
use crate::error::{index_error, key_error, type_error, value_error};
use crate::generator::Generator;
use crate::interpreter::Interpreter;
use crate::ops;
use crate::value::{Dict, Module, Value};

type Builtin = fn(&mut Interpreter, Vec<Value>) -> Result<Value, Diagnostic>;

const ANY: usize = usize::MAX;

/// Every builtin, under its Indonesian name first and its English alias second.
const BUILTINS: &[(&str, &str, RangeInclusive<usize>, Builtin)] = &[
    ("panjang", "len", 1..=1, length),
    ("jenis", "type", 1..=1, type_of),
    ("teks", "str", 1..=1, to_text),
    ("bulat", "int", 1..=1, to_int),
    ("desimal", "float", 1..=1, to_float),
    ("daftar", "list", 0..=1, to_list),
    ("tupel", "tuple", 0..=1, to_tuple),
    ("rentang", "range", 1..=3, range),
    ("mutlak", "abs", 1..=1, absolute),
    ("minimum", "min", 1..=ANY, minimum),
    ("maksimum", "max", 1..=ANY, maximum),
    ("jumlah", "sum", 1..=2, sum),
    ("urutkan", "sorted", 1..=1, sorted),
    ("berikutnya", "next", 1..=2, next),
    ("bulatkan", "round", 1..=2, round),
    ("adalah_instance", "isinstance", 2..=2, is_instance),
];

pub(crate) fn install(scopes: &mut ScopeManager) {
    for (name, alias, arity, func) in BUILTINS {
        for name in [name, alias] {
            let native = Native::new(name, arity.clone(), Box::new(*func));
            scopes.define_builtin(name, Value::Callable(Rc::new(native)));
        }
    }
}

fn length(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Diagnostic> {
    let len = match &args[0] {
        Value::Str(text) => text.chars().count(),
        Value::List(values) => values.borrow().len(),
        Value::Tuple(values) => values.len(),
        Value::Dict(dict) => dict.borrow().len(),
        other => {
            return Err(type_error(format!(
                "Objek bertipe '{}' tidak memiliki panjang",
                other.type_name()
            )))
        }
    };
    Ok(Value::from(len))
}

fn type_of(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Diagnostic> {
    Ok(Value::from(args[0].type_name()))
}

fn to_text(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Diagnostic> {
    match &args[0] {
        text @ Value::Str(_) => Ok(text.clone()),
        other => Ok(Value::from(other.to_string())),
    }
}

fn to_int(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Diagnostic> {
    match &args[0] {
        Value::Int(val) => Ok(Value::Int(*val)),
        Value::Bool(val) => Ok(Value::Int(*val as i64)),
        Value::Float(val) if val.is_finite() => Ok(Value::Int(val.trunc() as i64)),
        Value::Str(text) => text.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            value_error(format!(
                "Tidak dapat mengonversi '{}' menjadi bilangan bulat",
                text
            ))
        }),
        other => Err(value_error(format!(
            "Tidak dapat mengonversi '{}' menjadi bilangan bulat",
            other
        ))),
    }
}

fn to_float(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Diagnostic> {
    match &args[0] {
        Value::Str(text) => text.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            value_error(format!(
                "Tidak dapat mengonversi '{}' menjadi bilangan desimal",
                text
            ))
        }),
        other => other.as_number().map(Value::Float).ok_or_else(|| {
            type_error(format!(
                "Tidak dapat mengonversi '{}' menjadi bilangan desimal",
                other.type_name()
            ))
        }),
    }
}

fn to_list(interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Diagnostic> {
    match args.into_iter().next() {
        Some(value) => Ok(Value::list(interpreter.collect(value)?)),
        None => Ok(Value::list(Vec::new())),
    }
}

fn to_tuple(interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Diagnostic> {
    match args.into_iter().next() {
        Some(value) => Ok(Value::tuple(interpreter.collect(value)?)),
        None => Ok(Value::tuple(Vec::new())),
    }
}

fn integer(function: &str, value: &Value) -> Result<i64, Diagnostic> {
    value.as_int().ok_or_else(|| {
        type_error(format!(
            "Fungsi '{}' membutuhkan bilangan bulat, bukan '{}'",
            function,
            value.type_name()
        ))
    })
}

fn number(function: &str, value: &Value) -> Result<f64, Diagnostic> {
    value.as_number().ok_or_else(|| {
        type_error(format!(
            "Fungsi '{}' membutuhkan angka, bukan '{}'",
            function,
            value.type_name()
        ))
    })
}

fn range(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Diagnostic> {
    let bounds = args
        .iter()
        .map(|arg| integer("rentang", arg))
        .collect::<Result<Vec<_>, _>>()?;
    let (start, stop, step) = match bounds.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => return Err(type_error("Fungsi 'rentang' membutuhkan 1 sampai 3 argumen")),
    };
    if step == 0 {
        return Err(value_error("Langkah rentang tidak boleh nol"));
    }

    let mut values = Vec::new();
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        values.push(Value::Int(current));
        current = match current.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(Value::list(values))
}

fn absolute(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Diagnostic> {
    match &args[0] {
        Value::Int(val) => val
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| value_error("Hasil operasi bilangan bulat terlalu besar")),
        Value::Bool(val) => Ok(Value::Int(*val as i64)),
        other => Ok(Value::Float(number("mutlak", other)?.abs())),
    }
}

// `min(a, b, ...)` compares its arguments, `min(xs)` the items of one iterable.
fn candidates(interpreter: &mut Interpreter, function: &str, args: Vec<Value>) -> Result<Vec<Value>, Diagnostic> {
    let values = if args.len() == 1 {
        let mut args = args;
        interpreter.collect(args.remove(0))?
    } else {
        args
    };

    if values.is_empty() {
        return Err(value_error(format!(
            "Fungsi '{}' tidak dapat menerima urutan kosong",
            function
        )));
    }
    Ok(values)
}

fn extreme(values: Vec<Value>, wanted: Ordering) -> Result<Value, Diagnostic> {
    let mut values = values.into_iter();
    let mut best = values.next().unwrap_or(Value::None);
    for value in values {
        if ops::ordering(&value, &best)? == wanted {
            best = value;
        }
    }
    Ok(best)
}

fn minimum(interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Diagnostic> {
    let values = candidates(interpreter, "minimum", args)?;
    extreme(values, Ordering::Less)
}

fn maximum(interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Diagnostic> {
    let values = candidates(interpreter, "maksimum", args)?;
    extreme(values, Ordering::Greater)
}

fn sum(interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Diagnostic> {
    let mut args = args.into_iter();
    let iterable = args.next().unwrap_or(Value::None);
    let mut total = args.next().unwrap_or(Value::Int(0));
    for value in interpreter.collect(iterable)? {
        total = ops::binary(Type::Plus, &total, &value)?;
    }
    Ok(total)
}

/// Stable sort that reports the first incomparable pair.
// Stable merge sort that stops at the first pair of values that cannot be compared.
fn sort_values(values: Vec<Value>) -> Result<Vec<Value>, Diagnostic> {
    if values.len() <= 1 {
        return Ok(values);
    }

    let mut left = values;
    let right = left.split_off(left.len() / 2);
    let left = sort_values(left)?;
    let right = sort_values(right)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(lhs), Some(rhs)) = (left.peek(), right.peek()) {
        let next = if ops::ordering(rhs, lhs)? == Ordering::Less {
            right.next()
        } else {
            left.next()
        };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

fn sorted(interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Diagnostic> {
    let values = interpreter.collect(args[0].clone())?;
    Ok(Value::list(sort_values(values)?))
}

fn next(interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Diagnostic> {
    let mut args = args.into_iter();
    let generator = match args.next() {
        Some(Value::Generator(generator)) => generator,
        other => {
            return Err(type_error(format!(
                "Objek '{}' bukan generator",
                other.map_or_else(|| String::from("NoneType"), |value| value.type_name())
            )))
        }
    };

    match Generator::resume(&generator, interpreter)? {
        Some(value) => Ok(value),
        None => args.next().ok_or_else(|| {
            Diagnostic::runtime(format!(
                "Generator '{}' sudah habis",
                generator.borrow().name()
            ))
        }),
    }
}

// Rounds half to even, the way the language's numbers have always rounded.
fn round_half_even(val: f64) -> f64 {
    if (val - val.trunc()).abs() == 0.5 {
        2.0 * (val / 2.0).round()
    } else {
        val.round()
    }
}

fn round(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Diagnostic> {
    match (&args[0], args.get(1)) {
        (Value::Int(val), _) => Ok(Value::Int(*val)),
        (value, None) => {
            let rounded = round_half_even(number("bulatkan", value)?);
            if rounded.is_finite() {
                Ok(Value::Int(rounded as i64))
            } else {
                Err(value_error(format!(
                    "Tidak dapat membulatkan {} menjadi bilangan bulat",
                    value
                )))
            }
        }
        (value, Some(digits)) => {
            let val = number("bulatkan", value)?;
            let factor = 10f64.powi(integer("bulatkan", digits)?.clamp(-308, 308) as i32);
            Ok(Value::Float(round_half_even(val * factor) / factor))
        }
    }
}

fn is_instance(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Diagnostic> {
    match (&args[0], &args[1]) {
        (Value::Instance(instance), Value::Class(class)) => {
            Ok(Value::Bool(instance.class().is_subclass_of(class.name())))
        }
        (_, Value::Class(_)) => Ok(Value::Bool(false)),
        (value, Value::Str(name)) => Ok(Value::Bool(value.type_name() == name.as_str())),
        (_, other) => Err(type_error(format!(
            "Argumen kedua 'adalah_instance' harus berupa kelas, bukan '{}'",
            other.type_name()
        ))),
    }
}

fn check_arity(method: &str, args: &[Value], arity: RangeInclusive<usize>) -> Result<(), Diagnostic> {
    if arity.contains(&args.len()) {
        return Ok(());
    }
    let (min, max) = (*arity.start(), *arity.end());
    let expected = if min == max {
        format!("{}", min)
    } else {
        format!("{} sampai {}", min, max)
    };
    Err(type_error(format!(
        "Metode '{}' membutuhkan {} argumen, tetapi {} diberikan",
        method,
        expected,
        args.len()
    )))
}

fn text_arg(method: &str, value: &Value) -> Result<Rc<String>, Diagnostic> {
    match value {
        Value::Str(text) => Ok(Rc::clone(text)),
        other => Err(type_error(format!(
            "Metode '{}' membutuhkan teks, bukan '{}'",
            method,
            other.type_name()
        ))),
    }
}

/// Methods on the builtin value types. `None` when the receiver has no such method.
pub(crate) fn call_method(
    interpreter: &mut Interpreter,
    receiver: &Value,
    name: &str,
    args: Vec<Value>,
) -> Option<Result<Value, Diagnostic>> {
    match receiver {
        Value::Str(text) => text_method(interpreter, text, name, args),
        Value::List(values) => list_method(interpreter, values, name, args),
        Value::Dict(dict) => dict_method(interpreter, dict, name, args),
        _ => None,
    }
}

fn text_method(
    interpreter: &mut Interpreter,
    text: &Rc<String>,
    name: &str,
    args: Vec<Value>,
) -> Option<Result<Value, Diagnostic>> {
    let result = match name {
        "huruf_besar" | "upper" => check_arity(name, &args, 0..=0).map(|_| Value::from(text.to_uppercase())),
        "huruf_kecil" | "lower" => check_arity(name, &args, 0..=0).map(|_| Value::from(text.to_lowercase())),
        "hapus_spasi" | "strip" => check_arity(name, &args, 0..=0).map(|_| Value::from(text.trim())),
        "pisah" | "split" => check_arity(name, &args, 0..=1).and_then(|_| {
            let parts: Vec<Value> = match args.first() {
                Some(separator) => {
                    let separator = text_arg(name, separator)?;
                    if separator.is_empty() {
                        return Err(value_error("Pemisah tidak boleh kosong"));
                    }
                    text.split(separator.as_str()).map(Value::from).collect()
                }
                None => text.split_whitespace().map(Value::from).collect(),
            };
            Ok(Value::list(parts))
        }),
        "gabung" | "join" => check_arity(name, &args, 1..=1).and_then(|_| {
            let items = interpreter.collect(args[0].clone())?;
            let parts = items
                .iter()
                .map(|item| text_arg(name, item).map(|part| part.to_string()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::from(parts.join(text.as_str())))
        }),
        "ganti" | "replace" => check_arity(name, &args, 2..=2).and_then(|_| {
            let from = text_arg(name, &args[0])?;
            let to = text_arg(name, &args[1])?;
            Ok(Value::from(text.replace(from.as_str(), to.as_str())))
        }),
        "mulai_dengan" | "startswith" => check_arity(name, &args, 1..=1)
            .and_then(|_| Ok(Value::Bool(text.starts_with(text_arg(name, &args[0])?.as_str())))),
        "akhir_dengan" | "endswith" => check_arity(name, &args, 1..=1)
            .and_then(|_| Ok(Value::Bool(text.ends_with(text_arg(name, &args[0])?.as_str())))),
        "cari" | "find" => check_arity(name, &args, 1..=1).and_then(|_| {
            let needle = text_arg(name, &args[0])?;
            let position = text
                .find(needle.as_str())
                .map_or(-1, |byte| text[..byte].chars().count() as i64);
            Ok(Value::Int(position))
        }),
        "hitung" | "count" => check_arity(name, &args, 1..=1).and_then(|_| {
            let needle = text_arg(name, &args[0])?;
            if needle.is_empty() {
                return Ok(Value::from(text.chars().count() + 1));
            }
            Ok(Value::from(text.matches(needle.as_str()).count()))
        }),
        _ => return None,
    };
    Some(result)
}

fn list_method(
    interpreter: &mut Interpreter,
    values: &Rc<std::cell::RefCell<Vec<Value>>>,
    name: &str,
    args: Vec<Value>,
) -> Option<Result<Value, Diagnostic>> {
    let result = match name {
        "tambah" | "append" => check_arity(name, &args, 1..=1).map(|_| {
            values.borrow_mut().extend(args);
            Value::None
        }),
        "perluas" | "extend" => check_arity(name, &args, 1..=1).and_then(|_| {
            let items = interpreter.collect(args[0].clone())?;
            values.borrow_mut().extend(items);
            Ok(Value::None)
        }),
        "sisipkan" | "insert" => check_arity(name, &args, 2..=2).and_then(|_| {
            let mut values = values.borrow_mut();
            let len = values.len() as i64;
            let index = integer(name, &args[0])?;
            let index = if index < 0 { (index + len).max(0) } else { index.min(len) };
            values.insert(index as usize, args[1].clone());
            Ok(Value::None)
        }),
        "hapus" | "remove" => check_arity(name, &args, 1..=1).and_then(|_| {
            // comparing may borrow this very list, so search before mutating
            let position = values.borrow().iter().position(|value| *value == args[0]);
            match position {
                Some(index) => {
                    values.borrow_mut().remove(index);
                    Ok(Value::None)
                }
                None => Err(value_error(format!(
                    "Nilai {} tidak ada dalam daftar",
                    args[0].repr()
                ))),
            }
        }),
        "ambil" | "pop" => check_arity(name, &args, 0..=1).and_then(|_| {
            let mut values = values.borrow_mut();
            if values.is_empty() {
                return Err(index_error("Tidak dapat mengambil dari daftar kosong"));
            }
            let len = values.len() as i64;
            let index = match args.first() {
                Some(index) => integer(name, index)?,
                None => len - 1,
            };
            let resolved = if index < 0 { index + len } else { index };
            if resolved < 0 || resolved >= len {
                return Err(index_error(format!("Indeks {} di luar jangkauan", index)));
            }
            Ok(values.remove(resolved as usize))
        }),
        "indeks" | "index" => check_arity(name, &args, 1..=1).and_then(|_| {
            values
                .borrow()
                .iter()
                .position(|value| *value == args[0])
                .map(Value::from)
                .ok_or_else(|| value_error(format!("Nilai {} tidak ada dalam daftar", args[0].repr())))
        }),
        "hitung" | "count" => check_arity(name, &args, 1..=1)
            .map(|_| Value::from(values.borrow().iter().filter(|value| **value == args[0]).count())),
        "urutkan" | "sort" => check_arity(name, &args, 0..=0).and_then(|_| {
            // comparing may borrow this very list, so sort a snapshot
            let sorted = sort_values(values.borrow().clone())?;
            *values.borrow_mut() = sorted;
            Ok(Value::None)
        }),
        "balik" | "reverse" => check_arity(name, &args, 0..=0).map(|_| {
            values.borrow_mut().reverse();
            Value::None
        }),
        "bersihkan" | "clear" => check_arity(name, &args, 0..=0).map(|_| {
            values.borrow_mut().clear();
            Value::None
        }),
        "salin" | "copy" => check_arity(name, &args, 0..=0).map(|_| Value::list(values.borrow().clone())),
        _ => return None,
    };
    Some(result)
}

fn dict_method(
    interpreter: &mut Interpreter,
    dict: &Rc<std::cell::RefCell<Dict>>,
    name: &str,
    args: Vec<Value>,
) -> Option<Result<Value, Diagnostic>> {
    let result = match name {
        "kunci" | "keys" => check_arity(name, &args, 0..=0).map(|_| Value::list(dict.borrow().keys())),
        "nilai" | "values" => check_arity(name, &args, 0..=0).map(|_| Value::list(dict.borrow().values())),
        "item" | "items" => check_arity(name, &args, 0..=0).map(|_| Value::list(dict.borrow().items())),
        "dapatkan" | "get" => check_arity(name, &args, 1..=2).and_then(|_| {
            let found = dict.borrow().get(&args[0])?;
            Ok(found.unwrap_or_else(|| args.get(1).cloned().unwrap_or(Value::None)))
        }),
        "ambil" | "pop" => check_arity(name, &args, 1..=2).and_then(|_| {
            let removed = dict.borrow_mut().remove(&args[0])?;
            match (removed, args.get(1)) {
                (Some(value), _) => Ok(value),
                (None, Some(default)) => Ok(default.clone()),
                (None, None) => Err(key_error(format!(
                    "Kunci {} tidak ditemukan",
                    args[0].repr()
                ))),
            }
        }),
        "perbarui" | "update" => check_arity(name, &args, 1..=1).and_then(|_| {
            let entries = match &args[0] {
                Value::Dict(other) => other.borrow().iter().cloned().collect::<Vec<_>>(),
                other => {
                    let mut entries = Vec::new();
                    for item in interpreter.collect(other.clone())? {
                        match item.sequence().as_deref() {
                            Some([key, value]) => entries.push((key.clone(), value.clone())),
                            _ => {
                                return Err(value_error(
                                    "Setiap elemen untuk 'perbarui' harus berupa pasangan kunci dan nilai",
                                ))
                            }
                        }
                    }
                    entries
                }
            };
            let mut dict = dict.borrow_mut();
            for (key, value) in entries {
                dict.insert(key, value)?;
            }
            Ok(Value::None)
        }),
        "bersihkan" | "clear" => check_arity(name, &args, 0..=0).map(|_| {
            *dict.borrow_mut() = Dict::new();
            Value::None
        }),
        "salin" | "copy" => check_arity(name, &args, 0..=0).map(|_| Value::dict(dict.borrow().clone())),
        _ => return None,
    };
    Some(result)
}

fn unary_math(name: &'static str, func: fn(f64) -> f64) -> Value {
    let native = Native::new(
        name,
        1..=1,
        Box::new(move |_: &mut Interpreter, args: Vec<Value>| -> Result<Value, Diagnostic> {
            Ok(Value::Float(func(number(name, &args[0])?)))
        }),
    );
    Value::Callable(Rc::new(native))
}

fn math_module() -> Rc<Module> {
    let mut members = AHashMap::new();
    members.insert(String::from("pi"), Value::Float(std::f64::consts::PI));
    members.insert(String::from("e"), Value::Float(std::f64::consts::E));
    members.insert(String::from("sin"), unary_math("sin", f64::sin));
    members.insert(String::from("cos"), unary_math("cos", f64::cos));
    members.insert(String::from("tan"), unary_math("tan", f64::tan));

    let sqrt = Native::new(
        "sqrt",
        1..=1,
        Box::new(|_: &mut Interpreter, args: Vec<Value>| -> Result<Value, Diagnostic> {
            let val = number("sqrt", &args[0])?;
            if val < 0.0 {
                return Err(value_error("Kesalahan domain matematika"));
            }
            Ok(Value::Float(val.sqrt()))
        }),
    );
    members.insert(String::from("sqrt"), Value::Callable(Rc::new(sqrt)));

    for (name, func) in [("floor", f64::floor as fn(f64) -> f64), ("ceil", f64::ceil)] {
        let native = Native::new(
            name,
            1..=1,
            Box::new(move |_: &mut Interpreter, args: Vec<Value>| -> Result<Value, Diagnostic> {
                match &args[0] {
                    Value::Int(val) => Ok(Value::Int(*val)),
                    other => {
                        let val = func(number(name, other)?);
                        if val.is_finite() {
                            Ok(Value::Int(val as i64))
                        } else {
                            Err(value_error(format!("Tidak dapat mengonversi {} menjadi bilangan bulat", val)))
                        }
                    }
                }
            }),
        );
        members.insert(String::from(name), Value::Callable(Rc::new(native)));
    }

    let pow = Native::new(
        "pow",
        2..=2,
        Box::new(|_: &mut Interpreter, args: Vec<Value>| -> Result<Value, Diagnostic> {
            Ok(Value::Float(number("pow", &args[0])?.powf(number("pow", &args[1])?)))
        }),
    );
    members.insert(String::from("pow"), Value::Callable(Rc::new(pow)));

    let log = Native::new(
        "log",
        1..=2,
        Box::new(|_: &mut Interpreter, args: Vec<Value>| -> Result<Value, Diagnostic> {
            let val = number("log", &args[0])?;
            if val <= 0.0 {
                return Err(value_error("Kesalahan domain matematika"));
            }
            match args.get(1) {
                Some(base) => Ok(Value::Float(val.ln() / number("log", base)?.ln())),
                None => Ok(Value::Float(val.ln())),
            }
        }),
    );
    members.insert(String::from("log"), Value::Callable(Rc::new(log)));

    Module::new("math", members)
}

/// Native modules reachable through `impor_python`.
pub(crate) fn host_module(name: &str) -> Option<Rc<Module>> {
    match name {
        "math" => Some(math_module()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::str;

    use crate::interpreter::Interpreter;

    fn test_output(src: &str, expected: &str) {
        let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(output.clone());
        if let Err(error) = interpreter.run(src) {
            panic!("unexpected error for '{}': {}", src, error);
        }
        assert_eq!(str::from_utf8(&output.borrow()).unwrap(), expected);
    }

    fn test_error(src: &str, expected: &str) {
        let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(output);
        match interpreter.run(src) {
            Ok(_) => panic!("expecting '{}' from '{}'", expected, src),
            Err(error) => assert_eq!(error.message, expected),
        }
    }

    #[test]
    fn test_builtin_functions() {
        let tests = [
            ("tampilkan panjang(\"héllo\"), len([1, 2]), panjang({\"a\": 1})", "5 2 1\n"),
            ("tampilkan jenis(1), type(\"a\"), jenis(kosong)", "int str NoneType\n"),
            ("tampilkan bulat(\"42\") + 1, bulat(3.9), desimal(\"2.5\")", "43 3 2.5\n"),
            ("tampilkan teks(12) + \"!\"", "12!\n"),
            ("tampilkan rentang(3), rentang(1, 4), rentang(5, 0, -2)", "[0, 1, 2] [1, 2, 3] [5, 3, 1]\n"),
            ("tampilkan mutlak(-3), abs(-2.5)", "3 2.5\n"),
            ("tampilkan minimum(3, 1, 2), maksimum([4, 9, 2])", "1 9\n"),
            ("tampilkan jumlah([1, 2, 3]), jumlah([0.5, 0.5], 1)", "6 2.0\n"),
            ("tampilkan urutkan([3, 1, 2]), sorted(\"cab\")", "[1, 2, 3] ['a', 'b', 'c']\n"),
            ("tampilkan bulatkan(2.5), bulatkan(3.5), bulatkan(2.675, 1)", "2 4 2.7\n"),
            ("tampilkan daftar((1, 2)), tupel([1]), daftar()", "[1, 2] (1,) []\n"),
        ];

        for (src, expected) in tests {
            test_output(src, expected);
        }
    }

    #[test]
    fn test_methods() {
        let tests = [
            ("tampilkan \"Halo\".huruf_besar(), \"Halo\".lower()", "HALO halo\n"),
            ("tampilkan \"a,b,c\".pisah(\",\"), \" x y \".split()", "['a', 'b', 'c'] ['x', 'y']\n"),
            ("tampilkan \"-\".gabung([\"a\", \"b\"]), \"aXa\".ganti(\"a\", \"o\")", "a-b oXo\n"),
            ("tampilkan \"renzmc\".cari(\"z\"), \"banana\".hitung(\"an\")", "3 2\n"),
            ("xs itu [3, 1]\nxs.tambah(2)\nxs.urutkan()\ntampilkan xs, xs.pop(), xs", "[1, 2, 3] 3 [1, 2]\n"),
            ("xs itu [1, 2, 3]\nxs.hapus(2)\nxs.sisipkan(0, 9)\ntampilkan xs, xs.indeks(3)", "[9, 1, 3] 2\n"),
            ("d itu {\"a\": 1}\ntampilkan d.kunci(), d.nilai(), d.items()", "['a'] [1] [('a', 1)]\n"),
            ("d itu {\"a\": 1}\ntampilkan d.dapatkan(\"b\", 0), d.ambil(\"a\"), d", "0 1 {}\n"),
            ("d itu {}\nd.perbarui([(\"x\", 1)])\ntampilkan d", "{'x': 1}\n"),
        ];

        for (src, expected) in tests {
            test_output(src, expected);
        }
    }

    #[test]
    fn test_builtin_errors() {
        let tests = [
            ("panjang(5)", "Objek bertipe 'int' tidak memiliki panjang"),
            ("bulat(\"x\")", "Tidak dapat mengonversi 'x' menjadi bilangan bulat"),
            ("rentang(1, 5, 0)", "Langkah rentang tidak boleh nol"),
            ("minimum([])", "Fungsi 'minimum' tidak dapat menerima urutan kosong"),
            ("berikutnya([1])", "Objek 'list' bukan generator"),
            ("[].pop()", "Tidak dapat mengambil dari daftar kosong"),
            ("\"a\".terbang()", "Objek 'str' tidak memiliki metode 'terbang'"),
            ("\"a\".upper(1)", "Metode 'upper' membutuhkan 0 argumen, tetapi 1 diberikan"),
        ];

        for (src, expected) in tests {
            test_error(src, expected);
        }
    }

    #[test]
    fn test_sorting_mixed_types_fails() {
        let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(output);
        let error = interpreter.run("urutkan([1, \"a\", 2])").unwrap_err();
        assert!(error.message.starts_with("Tidak dapat membandingkan"));
    }

    #[test]
    fn test_list_methods_on_a_list_that_contains_itself() {
        test_output("xs itu [1, 2]\nxs.tambah(xs)\nxs.hapus(xs)\ntampilkan xs", "[1, 2]\n");
        test_output(
            "xs itu [[1]]\ncoba\n    xs.hapus(xs)\ntangkap ValueError sebagai e\n    tampilkan e\nselesai",
            "Nilai [[1]] tidak ada dalam daftar\n",
        );
        test_output(
            "xs itu [[2], [1]]\nxs.tambah(xs)\ncoba\n    xs.urutkan()\ntangkap TypeError\n    tampilkan \"gagal\", panjang(xs)\nselesai\ntampilkan xs",
            "gagal 3\n[[2], [1], [...]]\n",
        );
    }

    #[test]
    fn test_exhausted_generator() {
        test_error(
            "fungsi g()\n    hasil_bertahap 1\nselesai\nx itu g()\nberikutnya(x)\nberikutnya(x)",
            "Generator 'g' sudah habis",
        );
    }
}
