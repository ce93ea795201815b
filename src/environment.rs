//! Variable environment for SecLang
//!
//! Handles scoped variable storage with constant tracking, plus the table
//! of channels a program may use. A scope only holds a weak reference to
//! its parent. Environments are `Send`, so each session may run on its
//! own thread.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;

use crate::ast::{AccessMode, VarType};
use crate::channel::Channel;
use crate::config::SecLangConfig;
use crate::error::{ErrorKind, Result, SecLangError};
use crate::security::SecurityLabel;
use crate::store::{ChannelStore, FileStore, MemoryStore};
use crate::value::RuntimeValue;

/// A binding in the environment
#[derive(Debug, Clone)]
struct Binding {
    value: RuntimeValue,
    declared_type: VarType,
    constant: bool,
}

/// One variable as shown to the outside world
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableInfo {
    pub name: String,
    pub label_level: u8,
    pub label_name: &'static str,
    pub constant: bool,
}

/// Variable environment with lexical scoping
#[derive(Debug)]
pub struct Environment {
    values: HashMap<String, Binding>,
    order: Vec<String>,
    parent: Option<Weak<Mutex<Environment>>>,
    channels: HashMap<String, Channel>,
    supported: Vec<String>,
    store: Box<dyn ChannelStore>,
    session: Option<String>,
}

impl Environment {
    /// Create a top-level environment. Every supported channel starts
    /// closed.
    pub fn new(
        config: &SecLangConfig,
        store: Box<dyn ChannelStore>,
        session: Option<String>,
    ) -> Result<Self> {
        let mut channels = HashMap::new();
        for name in &config.supported_channels {
            let location = store.locate(name, session.as_deref())?;
            let channel = Channel::new(name, location).ok_or_else(|| {
                SecLangError::new(ErrorKind::UnsupportedChannel(name.clone()), None)
            })?;
            channels.insert(name.clone(), channel);
        }

        Ok(Self {
            values: HashMap::new(),
            order: Vec::new(),
            parent: None,
            channels,
            supported: config.supported_channels.clone(),
            store,
            session,
        })
    }

    /// Channels backed by files laid out per the configuration
    pub fn with_file_store(config: &SecLangConfig, session: Option<String>) -> Result<Self> {
        Self::new(config, Box::new(FileStore::from_config(config)), session)
    }

    /// Channels backed by memory only
    pub fn in_memory(config: &SecLangConfig) -> Result<Self> {
        Self::new(config, Box::new(MemoryStore::new()), None)
    }

    /// Make this a child scope of `parent`
    pub fn with_parent(mut self, parent: &Arc<Mutex<Environment>>) -> Self {
        self.parent = Some(Arc::downgrade(parent));
        self
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Run `f` against the parent scope, if it is still alive
    fn in_parent<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Environment) -> Result<T>,
    ) -> Result<T> {
        let Some(parent) = self.parent.as_ref().and_then(Weak::upgrade) else {
            return Err(undefined(name));
        };
        let mut scope = lock(&parent);
        f(&mut scope)
    }

    // ==================== Variables ====================

    /// Define a new variable in this scope
    pub fn declare(
        &mut self,
        name: &str,
        value: RuntimeValue,
        declared_type: VarType,
        constant: bool,
    ) -> Result<RuntimeValue> {
        if self.values.contains_key(name) {
            return Err(SecLangError::new(ErrorKind::AlreadyDeclared(name.to_string()), None));
        }

        self.values.insert(name.to_string(), Binding {
            value: value.clone(),
            declared_type,
            constant,
        });
        self.order.push(name.to_string());
        Ok(value)
    }

    /// Get a variable's value
    pub fn lookup(&self, name: &str) -> Result<RuntimeValue> {
        if let Some(binding) = self.values.get(name) {
            Ok(binding.value.clone())
        } else {
            self.in_parent(name, |parent| parent.lookup(name))
        }
    }

    /// The declared type of a variable
    pub fn declared_type(&self, name: &str) -> Result<VarType> {
        if let Some(binding) = self.values.get(name) {
            Ok(binding.declared_type)
        } else {
            self.in_parent(name, |parent| parent.declared_type(name))
        }
    }

    /// How many scopes up the chain `name` is defined, 0 being this one
    pub fn resolve(&self, name: &str) -> Result<usize> {
        if self.values.contains_key(name) {
            Ok(0)
        } else {
            self.in_parent(name, |parent| parent.resolve(name)).map(|depth| depth + 1)
        }
    }

    /// Assign to an existing variable. Constants are refused, the type
    /// must match, and the value's label may not exceed the label the
    /// variable currently holds.
    pub fn assign(&mut self, name: &str, value: RuntimeValue) -> Result<RuntimeValue> {
        self.with_binding(name, |binding| {
            if binding.constant {
                return Err(SecLangError::new(
                    ErrorKind::ConstantReassignment(name.to_string()),
                    None,
                ));
            }
            if !binding.value.is_null() && binding.value.value.var_type() != value.value.var_type() {
                return Err(SecLangError::new(
                    ErrorKind::AssignmentTypeMismatch {
                        expected: binding.value.type_name().to_string(),
                        found: value.type_name().to_string(),
                    },
                    None,
                ));
            }
            if !value.label.flows_to(binding.value.label) {
                return Err(SecLangError::new(
                    ErrorKind::AssignmentFlow { name: name.to_string(), label: value.label },
                    None,
                ));
            }
            binding.value = value.clone();
            Ok(value)
        })
    }

    /// Replace a variable's value without any checks, for relabeling
    pub fn rebind(&mut self, name: &str, value: RuntimeValue) -> Result<()> {
        self.with_binding(name, |binding| {
            binding.value = value;
            Ok(())
        })
    }

    fn with_binding<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Binding) -> Result<T>,
    ) -> Result<T> {
        if let Some(binding) = self.values.get_mut(name) {
            f(binding)
        } else {
            self.in_parent(name, |parent| parent.with_binding(name, f))
        }
    }

    /// Variables of this scope in declaration order
    pub fn variables(&self) -> Vec<VariableInfo> {
        self.order
            .iter()
            .filter_map(|name| self.values.get(name).map(|binding| (name, binding)))
            .map(|(name, binding)| VariableInfo {
                name: name.clone(),
                label_level: binding.value.label.level(),
                label_name: binding.value.label.name(),
                constant: binding.constant,
            })
            .collect()
    }

    // ==================== Channels ====================

    pub fn supported_channels(&self) -> &[String] {
        &self.supported
    }

    pub fn channel(&self, name: &str) -> Result<&Channel> {
        self.channels.get(name).ok_or_else(|| unsupported(name))
    }

    /// The security class a channel carries
    pub fn channel_label(&self, name: &str) -> Result<SecurityLabel> {
        self.channel(name).map(Channel::class)
    }

    pub fn open_channel(&mut self, name: &str, mode: AccessMode) -> Result<()> {
        let channel = self.channels.get_mut(name).ok_or_else(|| unsupported(name))?;
        channel.open(mode, self.store.as_mut())
    }

    pub fn close_channel(&mut self, name: &str) -> Result<()> {
        let channel = self.channels.get_mut(name).ok_or_else(|| unsupported(name))?;
        channel.close(self.store.as_mut())
    }

    pub fn read_channel(&mut self, name: &str) -> Result<String> {
        let channel = self.channels.get_mut(name).ok_or_else(|| unsupported(name))?;
        channel.read(self.store.as_mut())
    }

    pub fn write_channel(&mut self, name: &str, text: &str) -> Result<bool> {
        let channel = self.channels.get_mut(name).ok_or_else(|| unsupported(name))?;
        channel.write(text, self.store.as_mut())
    }

    /// Full stored content of every supported channel
    pub fn channel_contents(&self) -> Result<Vec<(String, String)>> {
        let mut contents = Vec::with_capacity(self.supported.len());
        for name in &self.supported {
            let channel = self.channel(name)?;
            let text = self.store.contents(channel.location()).map_err(|err| {
                SecLangError::new(
                    ErrorKind::ChannelStore(format!("channel '{}': {}", name, err)),
                    None,
                )
            })?;
            contents.push((name.clone(), text));
        }
        Ok(contents)
    }
}

/// A poisoned parent still holds consistent bindings; every update is a
/// single field write
fn lock(env: &Mutex<Environment>) -> MutexGuard<'_, Environment> {
    env.lock().unwrap_or_else(PoisonError::into_inner)
}

fn undefined(name: &str) -> SecLangError {
    SecLangError::new(ErrorKind::UndefinedVariable(name.to_string()), None)
}

fn unsupported(name: &str) -> SecLangError {
    SecLangError::new(ErrorKind::UnsupportedChannel(name.to_string()), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::value::Value;

    fn env() -> Environment {
        Environment::in_memory(&SecLangConfig::default()).unwrap()
    }

    #[test]
    fn test_declare_and_lookup() {
        let mut env = env();
        env.declare("x", RuntimeValue::int(1, SecurityLabel::Secret), VarType::Int, false)
            .unwrap();
        let x = env.lookup("x").unwrap();
        assert_eq!(x.value, Value::Int(1));
        assert_eq!(x.label, SecurityLabel::Secret);
        assert_eq!(env.declared_type("x").unwrap(), VarType::Int);
    }

    #[test]
    fn test_redeclare_fails() {
        let mut env = env();
        env.declare("x", RuntimeValue::int(1, SecurityLabel::Unclassified), VarType::Int, false)
            .unwrap();
        let err = env
            .declare("x", RuntimeValue::int(2, SecurityLabel::Unclassified), VarType::Int, false)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyDeclared("x".to_string()));
        assert_eq!(err.category(), ErrorCategory::Resolution);
    }

    #[test]
    fn test_undefined_variable() {
        let err = env().lookup("nope").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedVariable("nope".to_string()));
    }

    #[test]
    fn test_assign_checks() {
        let mut env = env();
        env.declare("c", RuntimeValue::int(1, SecurityLabel::Unclassified), VarType::Int, true)
            .unwrap();
        env.declare("x", RuntimeValue::int(1, SecurityLabel::Confidential), VarType::Int, false)
            .unwrap();

        let err = env.assign("c", RuntimeValue::int(2, SecurityLabel::Unclassified)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConstantReassignment("c".to_string()));

        let err = env.assign("x", RuntimeValue::string("a", SecurityLabel::Unclassified)).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Type);

        let err = env.assign("x", RuntimeValue::int(2, SecurityLabel::Secret)).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Security);

        // A lower label is accepted and becomes the variable's new label
        env.assign("x", RuntimeValue::int(3, SecurityLabel::Unclassified)).unwrap();
        assert_eq!(env.lookup("x").unwrap().label, SecurityLabel::Unclassified);
    }

    #[test]
    fn test_parent_scope() {
        let parent = Arc::new(Mutex::new(env()));
        lock(&parent)
            .declare("g", RuntimeValue::int(7, SecurityLabel::Unclassified), VarType::Int, false)
            .unwrap();

        let mut child = env().with_parent(&parent);
        assert_eq!(child.lookup("g").unwrap().value, Value::Int(7));
        assert_eq!(child.resolve("g").unwrap(), 1);

        child.assign("g", RuntimeValue::int(8, SecurityLabel::Unclassified)).unwrap();
        assert_eq!(lock(&parent).lookup("g").unwrap().value, Value::Int(8));

        child
            .declare("g", RuntimeValue::int(1, SecurityLabel::Unclassified), VarType::Int, false)
            .unwrap();
        assert_eq!(child.resolve("g").unwrap(), 0);
    }

    #[test]
    fn test_dropped_parent_is_not_resolved() {
        let parent = Arc::new(Mutex::new(env()));
        lock(&parent)
            .declare("g", RuntimeValue::int(7, SecurityLabel::Unclassified), VarType::Int, false)
            .unwrap();
        let child = env().with_parent(&parent);
        drop(parent);
        assert!(child.lookup("g").is_err());
    }

    #[test]
    fn test_variables_in_declaration_order() {
        let mut env = env();
        env.declare("b", RuntimeValue::int(0, SecurityLabel::TopSecret), VarType::Int, true)
            .unwrap();
        env.declare("a", RuntimeValue::bool(true, SecurityLabel::Unclassified), VarType::Bool, false)
            .unwrap();
        let vars = env.variables();
        assert_eq!(vars, vec![
            VariableInfo { name: "b".into(), label_level: 3, label_name: "TopSecret", constant: true },
            VariableInfo { name: "a".into(), label_level: 0, label_name: "Unclassified", constant: false },
        ]);
    }

    #[test]
    fn test_variable_info_serializes() {
        let mut env = env();
        env.declare("b", RuntimeValue::int(0, SecurityLabel::TopSecret), VarType::Int, true)
            .unwrap();
        let rendered = toml::to_string(&env.variables()[0]).unwrap();
        assert!(rendered.contains("name = \"b\""), "{rendered}");
        assert!(rendered.contains("label_level = 3"), "{rendered}");
        assert!(rendered.contains("label_name = \"TopSecret\""), "{rendered}");
        assert!(rendered.contains("constant = true"), "{rendered}");
    }

    #[test]
    fn test_unsupported_channel() {
        let config = SecLangConfig {
            supported_channels: vec!["Unclassified".to_string()],
            ..SecLangConfig::default()
        };
        let mut env = Environment::in_memory(&config).unwrap();
        let err = env.open_channel("Secret", AccessMode::Read).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedChannel("Secret".to_string()));
        let err = env.open_channel("NotSupportedCh", AccessMode::Read).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Channel);
    }

    #[test]
    fn test_channel_contents() {
        let mut env = env();
        env.open_channel("Secret", AccessMode::Write).unwrap();
        assert!(env.write_channel("Secret", "hidden").unwrap());
        env.close_channel("Secret").unwrap();

        let contents = env.channel_contents().unwrap();
        assert_eq!(contents.len(), 4);
        assert_eq!(contents[2], ("Secret".to_string(), "hidden\n".to_string()));
        assert_eq!(contents[0].1, "");
    }

    #[test]
    fn test_prod_store_requires_session() {
        let config = SecLangConfig {
            mode: crate::config::RunMode::Prod,
            ..SecLangConfig::default()
        };
        let err = Environment::with_file_store(&config, None).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Config);
    }
}
