use std::rc::Rc;

use ahash::AHashMap;
use renzmc_core::Diagnostic;

use crate::callable::{Class, Instance};
use crate::error::name_error;
use crate::value::{Module, Value};

pub(crate) type Scope = AHashMap<String, Value>;

/// Variable storage for one program: a global scope, the local scope of the running call,
/// builtins, and the registries for classes, loaded modules and type aliases. The instance
/// scope belongs to the instance itself and is passed in by the caller.
#[derive(Default)]
pub(crate) struct ScopeManager {
    globals: Scope,
    locals: Scope,
    builtins: Scope,
    classes: AHashMap<String, Rc<Class>>,
    modules: AHashMap<String, Rc<Module>>,
    type_registry: AHashMap<String, String>,
}

impl ScopeManager {
    pub(crate) fn new() -> Self {
        ScopeManager::default()
    }

    pub(crate) fn define_builtin(&mut self, name: &str, value: Value) {
        self.builtins.insert(String::from(name), value);
    }

    /// Looks a name up in the instance, local, global and builtin scopes, in that order.
    pub(crate) fn get_variable(&self, name: &str, instance: Option<&Instance>) -> Result<Value, Diagnostic> {
        if let Some(value) = instance.and_then(|instance| instance.field(name)) {
            return Ok(value);
        }

        self.locals
            .get(name)
            .or_else(|| self.globals.get(name))
            .or_else(|| self.builtins.get(name))
            .cloned()
            .ok_or_else(|| name_error(format!("Variabel '{}' tidak terdefinisi", name)))
    }

    /// Writes a variable. Inside a method, non-local writes land on the instance. Otherwise
    /// the write is local when asked for or when a local scope is active, and global when
    /// no local scope exists yet.
    pub(crate) fn set_variable(&mut self, name: &str, value: Value, is_local: bool, instance: Option<&Instance>) {
        match instance {
            Some(instance) if !is_local => instance.set_field(name, value),
            _ if is_local || !self.locals.is_empty() => {
                self.locals.insert(String::from(name), value);
            }
            _ => {
                self.globals.insert(String::from(name), value);
            }
        }
    }

    /// Installs a fresh local scope and returns the one it replaces.
    pub(crate) fn enter(&mut self, locals: Scope) -> Scope {
        std::mem::replace(&mut self.locals, locals)
    }

    /// Restores a saved local scope and returns the scope that was active.
    pub(crate) fn leave(&mut self, saved: Scope) -> Scope {
        std::mem::replace(&mut self.locals, saved)
    }

    pub(crate) fn locals(&self) -> &Scope {
        &self.locals
    }

    pub(crate) fn take_globals(&mut self) -> Scope {
        std::mem::take(&mut self.globals)
    }

    pub(crate) fn register_class(&mut self, class: Rc<Class>) {
        self.classes.insert(class.name().to_string(), class);
    }

    pub(crate) fn is_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub(crate) fn register_module(&mut self, name: &str, module: Rc<Module>) {
        self.modules.insert(String::from(name), module);
    }

    pub(crate) fn module(&self, name: &str) -> Option<Rc<Module>> {
        self.modules.get(name).cloned()
    }

    pub(crate) fn define_type_alias(&mut self, name: &str, hint: &str) {
        self.type_registry.insert(String::from(name), String::from(hint));
    }

    pub(crate) fn type_alias(&self, name: &str) -> Option<&str> {
        self.type_registry.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use ahash::AHashMap;
    use renzmc_core::ErrorKind;

    use crate::callable::{Class, Instance};
    use crate::env::{Scope, ScopeManager};
    use crate::value::Value;

    #[test]
    fn test_first_write_goes_global_until_a_local_scope_exists() {
        let mut scopes = ScopeManager::new();
        scopes.set_variable("x", Value::from(1), false, None);

        let saved = scopes.enter(Scope::new());
        // the local scope is still empty, so this also lands in globals
        scopes.set_variable("y", Value::from(2), false, None);
        scopes.set_variable("a", Value::from(3), true, None);
        // now that a local exists, plain writes stay local
        scopes.set_variable("z", Value::from(4), false, None);

        let locals = scopes.leave(saved);
        assert!(locals.contains_key("a"));
        assert!(locals.contains_key("z"));
        assert!(!locals.contains_key("y"));

        assert_eq!(scopes.get_variable("x", None).unwrap(), Value::from(1));
        assert_eq!(scopes.get_variable("y", None).unwrap(), Value::from(2));
        assert!(scopes.get_variable("z", None).is_err());
    }

    #[test]
    fn test_lookup_order() {
        let mut scopes = ScopeManager::new();
        scopes.define_builtin("n", Value::from("builtin"));
        assert_eq!(scopes.get_variable("n", None).unwrap(), Value::from("builtin"));

        scopes.set_variable("n", Value::from("global"), false, None);
        assert_eq!(scopes.get_variable("n", None).unwrap(), Value::from("global"));

        let mut locals = Scope::new();
        locals.insert(String::from("n"), Value::from("local"));
        scopes.enter(locals);
        assert_eq!(scopes.get_variable("n", None).unwrap(), Value::from("local"));

        let class = Class::new("Titik", None, None, AHashMap::new(), Vec::new());
        let instance = Instance::new(class);
        instance.set_field("n", Value::from("instance"));
        assert_eq!(
            scopes.get_variable("n", Some(&instance)).unwrap(),
            Value::from("instance")
        );
    }

    #[test]
    fn test_instance_receives_non_local_writes() {
        let mut scopes = ScopeManager::new();
        let class = Class::new("Titik", None, None, AHashMap::new(), Vec::new());
        let instance = Instance::new(class);

        scopes.set_variable("x", Value::from(1), false, Some(&instance));
        scopes.set_variable("p", Value::from(2), true, Some(&instance));

        assert_eq!(instance.field("x"), Some(Value::from(1)));
        assert_eq!(instance.field("p"), None);
        assert_eq!(scopes.locals().get("p"), Some(&Value::from(2)));
    }

    #[test]
    fn test_undefined_variable() {
        let scopes = ScopeManager::new();
        let error = scopes.get_variable("hilang", None).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Name);
        assert_eq!(error.message, "Variabel 'hilang' tidak terdefinisi");
        assert!(!error.is_located());
    }
}
