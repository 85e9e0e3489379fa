use renzmc_core::{Diagnostic, ErrorKind};

// Shorthands for the unlocated diagnostics raised while evaluating. The dispatch boundary
// attaches the position of the node that was being evaluated.

pub(crate) fn name_error(msg: impl Into<String>) -> Diagnostic {
    Diagnostic::new(ErrorKind::Name, msg)
}

pub(crate) fn type_error(msg: impl Into<String>) -> Diagnostic {
    Diagnostic::new(ErrorKind::Type, msg)
}

pub(crate) fn value_error(msg: impl Into<String>) -> Diagnostic {
    Diagnostic::new(ErrorKind::Value, msg)
}

pub(crate) fn index_error(msg: impl Into<String>) -> Diagnostic {
    Diagnostic::new(ErrorKind::Index, msg)
}

pub(crate) fn key_error(msg: impl Into<String>) -> Diagnostic {
    Diagnostic::new(ErrorKind::Key, msg)
}

pub(crate) fn attribute_error(msg: impl Into<String>) -> Diagnostic {
    Diagnostic::new(ErrorKind::Attribute, msg)
}

pub(crate) fn zero_division(msg: impl Into<String>) -> Diagnostic {
    Diagnostic::new(ErrorKind::DivisionByZero, msg)
}

pub(crate) fn type_hint_error(msg: impl Into<String>) -> Diagnostic {
    Diagnostic::new(ErrorKind::TypeHint, msg)
}

pub(crate) fn import_error(msg: impl Into<String>) -> Diagnostic {
    Diagnostic::new(ErrorKind::Import, msg)
}

pub(crate) fn host_error(msg: impl Into<String>) -> Diagnostic {
    Diagnostic::new(ErrorKind::PythonIntegration, msg)
}

pub(crate) fn async_error(msg: impl Into<String>) -> Diagnostic {
    Diagnostic::new(ErrorKind::Async, msg)
}

pub(crate) fn operand_error(operator: impl std::fmt::Display, left: &str, right: &str) -> Diagnostic {
    type_error(format!(
        "Operator {} tidak dapat digunakan antara '{}' dan '{}'",
        operator, left, right
    ))
}
