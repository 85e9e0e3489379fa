use renzmc_core::Diagnostic;

use crate::env::ScopeManager;
use crate::error::type_hint_error;
use crate::limits::MAX_ALIAS_DEPTH;
use crate::value::Value;

/// Runtime checks of declared types against values. Hints arrive in the canonical textual
/// form produced by the parser and are interpreted here.
#[derive(Debug, Clone)]
pub(crate) struct TypeChecker {
    pub(crate) enabled: bool,
    pub(crate) strict: bool,
}

impl TypeChecker {
    pub(crate) fn new(enabled: bool, strict: bool) -> Self {
        TypeChecker { enabled, strict }
    }

    pub(crate) fn check_variable(
        &self,
        name: &str,
        value: &Value,
        hint: &str,
        scopes: &ScopeManager,
    ) -> Result<(), Diagnostic> {
        if !self.enabled || self.matches(value, hint, scopes, 0) {
            return Ok(());
        }
        Err(type_hint_error(format!(
            "Tipe tidak sesuai untuk variabel '{}': diharapkan '{}', tetapi mendapat '{}'",
            name,
            hint,
            value.type_name()
        )))
    }

    pub(crate) fn check_parameter(
        &self,
        function: &str,
        param: &str,
        value: &Value,
        hint: &str,
        scopes: &ScopeManager,
    ) -> Result<(), Diagnostic> {
        if !self.enabled || self.matches(value, hint, scopes, 0) {
            return Ok(());
        }
        Err(type_hint_error(format!(
            "Tipe tidak sesuai untuk parameter '{}' pada fungsi '{}': diharapkan '{}', tetapi mendapat '{}'",
            param,
            function,
            hint,
            value.type_name()
        )))
    }

    /// A `kosong` return is never checked.
    pub(crate) fn check_return(
        &self,
        function: &str,
        value: &Value,
        hint: &str,
        scopes: &ScopeManager,
    ) -> Result<(), Diagnostic> {
        if !self.enabled || matches!(value, Value::None) || self.matches(value, hint, scopes, 0) {
            return Ok(());
        }
        Err(type_hint_error(format!(
            "Tipe nilai kembalian fungsi '{}' tidak sesuai: diharapkan '{}', tetapi mendapat '{}'",
            function,
            hint,
            value.type_name()
        )))
    }

    fn matches(&self, value: &Value, hint: &str, scopes: &ScopeManager, depth: usize) -> bool {
        let hint = hint.trim();
        let members = split_top_level(hint, '|');
        if members.len() > 1 {
            return members
                .iter()
                .any(|member| self.matches(value, member, scopes, depth));
        }

        if let Some(inner) = hint.strip_suffix('?') {
            return matches!(value, Value::None) || self.matches(value, inner, scopes, depth);
        }

        let (name, args) = match hint.find('[') {
            Some(open) if hint.ends_with(']') => (
                hint[..open].trim(),
                split_top_level(&hint[open + 1..hint.len() - 1], ','),
            ),
            _ => (hint, Vec::new()),
        };

        match name {
            "Any" | "any" | "apapun" | "object" => true,
            "int" | "bilangan_bulat" => match value {
                Value::Int(_) => true,
                Value::Bool(_) => !self.strict,
                _ => false,
            },
            "float" | "desimal" => match value {
                Value::Float(_) => true,
                Value::Int(_) => !self.strict,
                _ => false,
            },
            "str" | "teks" => matches!(value, Value::Str(_)),
            "bool" | "boolean" => matches!(value, Value::Bool(_)),
            "None" | "kosong" | "NoneType" => matches!(value, Value::None),
            "callable" | "Callable" | "fungsi" => matches!(value, Value::Callable(_) | Value::Class(_)),
            "generator" | "Generator" => matches!(value, Value::Generator(_)),
            "list" | "List" | "daftar" => match value {
                Value::List(values) => match args.first() {
                    Some(element) => values
                        .borrow()
                        .iter()
                        .all(|value| self.matches(value, element, scopes, depth)),
                    None => true,
                },
                _ => false,
            },
            "tuple" | "Tuple" | "tupel" => match value {
                Value::Tuple(values) => match args.len() {
                    0 => true,
                    1 => values.iter().all(|value| self.matches(value, args[0], scopes, depth)),
                    n => {
                        n == values.len()
                            && values
                                .iter()
                                .zip(&args)
                                .all(|(value, hint)| self.matches(value, hint, scopes, depth))
                    }
                },
                _ => false,
            },
            "dict" | "Dict" | "kamus" => match value {
                Value::Dict(dict) => match (args.first(), args.get(1)) {
                    (Some(key), Some(val)) => dict.borrow().iter().all(|(k, v)| {
                        self.matches(k, key, scopes, depth) && self.matches(v, val, scopes, depth)
                    }),
                    _ => true,
                },
                _ => false,
            },
            "Optional" => {
                matches!(value, Value::None)
                    || args
                        .first()
                        .map_or(true, |inner| self.matches(value, inner, scopes, depth))
            }
            "Union" => args.iter().any(|member| self.matches(value, member, scopes, depth)),
            "Literal" => args.iter().any(|literal| literal_value(literal).map_or(false, |lit| lit == *value)),
            name => self.matches_named(value, name, scopes, depth),
        }
    }

    // Aliases first, then user classes. Unknown names only pass in lenient mode.
    fn matches_named(&self, value: &Value, name: &str, scopes: &ScopeManager, depth: usize) -> bool {
        if let Some(alias) = scopes.type_alias(name) {
            return depth < MAX_ALIAS_DEPTH && self.matches(value, alias, scopes, depth + 1);
        }

        match value {
            Value::Instance(instance) if instance.class().is_subclass_of(name) => true,
            _ if scopes.is_class(name) => false,
            _ => !self.strict,
        }
    }
}

// Splits on `separator` outside brackets and quotes.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, c) if c == separator && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }

    let last = text[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts
}

fn literal_value(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix('"') {
        let end = rest.find('"')?;
        return Some(Value::from(&rest[..end]));
    }
    match text {
        "benar" | "True" => Some(Value::Bool(true)),
        "salah" | "False" => Some(Value::Bool(false)),
        "kosong" | "None" => Some(Value::None),
        _ => text
            .parse::<i64>()
            .map(Value::Int)
            .ok()
            .or_else(|| text.parse::<f64>().map(Value::Float).ok()),
    }
}

#[cfg(test)]
mod tests {
    use ahash::AHashMap;
    use renzmc_core::ErrorKind;

    use crate::callable::{Class, Instance};
    use crate::env::ScopeManager;
    use crate::types::{split_top_level, TypeChecker};
    use crate::value::{Dict, Value};

    fn accepts(checker: &TypeChecker, scopes: &ScopeManager, value: Value, hint: &str) -> bool {
        checker.check_variable("x", &value, hint, scopes).is_ok()
    }

    #[test]
    fn test_builtin_hints() {
        let scopes = ScopeManager::new();
        let checker = TypeChecker::new(true, false);

        let list = Value::list(vec![Value::from(1), Value::from(2)]);
        let mut dict = Dict::new();
        dict.insert(Value::from("a"), Value::from(1)).unwrap();
        let dict = Value::dict(dict);

        let cases = [
            (Value::from(1), "int", true),
            (Value::from(1), "bilangan_bulat", true),
            (Value::from("a"), "int", false),
            (Value::from("a"), "teks", true),
            (Value::None, "kosong", true),
            (Value::None, "int?", true),
            (Value::from(1), "int | str", true),
            (Value::from(1.5), "int | str", false),
            (list.clone(), "daftar[int]", true),
            (list.clone(), "list[str]", false),
            (dict.clone(), "kamus[str, int]", true),
            (dict, "dict[str, str]", false),
            (Value::tuple(vec![Value::from(1), Value::from("a")]), "tuple[int, str]", true),
            (Value::from("a"), "Optional[str]", true),
            (Value::from(2.0), "Union[int, float]", true),
            (Value::from("merah"), "Literal[\"merah\", \"biru\"]", true),
            (Value::from("hijau"), "Literal[\"merah\", \"biru\"]", false),
            (Value::from(3), "Literal[1, 2, 3]", true),
            (list, "apapun", true),
        ];

        for (value, hint, expected) in cases {
            assert_eq!(
                accepts(&checker, &scopes, value.clone(), hint),
                expected,
                "{:?} as {}",
                value,
                hint
            );
        }
    }

    #[test]
    fn test_lenient_coercions_are_rejected_in_strict_mode() {
        let scopes = ScopeManager::new();
        let lenient = TypeChecker::new(true, false);
        let strict = TypeChecker::new(true, true);

        assert!(accepts(&lenient, &scopes, Value::from(1), "float"));
        assert!(accepts(&lenient, &scopes, Value::from(true), "int"));
        assert!(accepts(&lenient, &scopes, Value::from(1), "TipeTakDikenal"));

        assert!(!accepts(&strict, &scopes, Value::from(1), "float"));
        assert!(!accepts(&strict, &scopes, Value::from(true), "int"));
        assert!(!accepts(&strict, &scopes, Value::from(1), "TipeTakDikenal"));
    }

    #[test]
    fn test_aliases_and_classes() {
        let mut scopes = ScopeManager::new();
        scopes.define_type_alias("Angka", "int | float");
        scopes.define_type_alias("Lingkar", "Lingkar");

        let hewan = Class::new("Hewan", None, None, AHashMap::new(), Vec::new());
        let kucing = Class::new("Kucing", Some(hewan.clone()), None, AHashMap::new(), Vec::new());
        scopes.register_class(hewan);
        scopes.register_class(kucing.clone());

        let checker = TypeChecker::new(true, false);
        assert!(accepts(&checker, &scopes, Value::from(2.5), "Angka"));
        assert!(!accepts(&checker, &scopes, Value::from("a"), "Angka"));
        assert!(!accepts(&checker, &scopes, Value::from(1), "Lingkar"));

        let instance = Value::Instance(Instance::new(kucing));
        assert!(accepts(&checker, &scopes, instance.clone(), "Hewan"));
        assert!(accepts(&checker, &scopes, instance, "Kucing"));
        assert!(!accepts(&checker, &scopes, Value::from(1), "Hewan"));
    }

    #[test]
    fn test_messages() {
        let scopes = ScopeManager::new();
        let checker = TypeChecker::new(true, false);

        let error = checker
            .check_variable("umur", &Value::from("tua"), "int", &scopes)
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::TypeHint);
        assert_eq!(
            error.message,
            "Tipe tidak sesuai untuk variabel 'umur': diharapkan 'int', tetapi mendapat 'str'"
        );

        let error = checker
            .check_parameter("tambah", "a", &Value::from("1"), "int", &scopes)
            .unwrap_err();
        assert_eq!(
            error.message,
            "Tipe tidak sesuai untuk parameter 'a' pada fungsi 'tambah': diharapkan 'int', tetapi mendapat 'str'"
        );

        assert!(checker.check_return("f", &Value::None, "int", &scopes).is_ok());
        assert!(checker.check_return("f", &Value::from("a"), "int", &scopes).is_err());
    }

    #[test]
    fn test_disabled_checker_accepts_everything() {
        let scopes = ScopeManager::new();
        let checker = TypeChecker::new(false, true);
        assert!(accepts(&checker, &scopes, Value::from("a"), "int"));
    }

    #[test]
    fn test_split_ignores_nested_separators() {
        assert_eq!(
            split_top_level("dict[str, int | None], \"a, b\"", ','),
            vec!["dict[str, int | None]", "\"a, b\""]
        );
        assert_eq!(split_top_level("int | list[str | int]", '|'), vec!["int", "list[str | int]"]);
    }
}
