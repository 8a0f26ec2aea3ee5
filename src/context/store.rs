//! Named, chainable property stores.
//!
//! A context resolves a key by checking its built-in attributes, then its own
//! properties, then walking its `base` chain; values shadow, they never merge.
//! Temp attributes are looked up only after the whole chain came up empty,
//! innermost level last.
//!
//! Contexts are shared handles (`ContextRef`) because a re-derived view must
//! be able to write back into the context it was derived from. Which fields
//! are shared and which are copied:
//! - `properties`: copied into a view by `re_context`; writes through `set`
//!   on the view echo into its `origin`.
//! - `temp`: never copied, never echoed. Temp attributes are scratch space
//!   for one effect and are isolated from the persistent properties.
//! - `base`, `owner`: rebound / carried over by `re_context`.
//!
//! Under a character (any chain with an owner), `<attr>_am` and `<attr>_save`
//! resolve to the ability modifier of `<attr>` when nothing defines them.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use ahash::AHashMap;

use super::value::{Value, ValueMap};

const MODIFIER_SUFFIX: &str = "_am";
const SAVE_SUFFIX: &str = "_save";

#[derive(Debug, Default)]
pub struct Context {
    name: String,
    /// Character this context acts for, if any
    owner: Option<String>,
    properties: AHashMap<String, Value>,
    temp: AHashMap<String, Value>,
    base: Option<ContextRef>,
    /// Context a view was derived from; `set` echoes into it
    origin: Option<ContextRef>,
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_properties(mut self, properties: ValueMap) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_base(mut self, base: &ContextRef) -> Self {
        self.base = Some(base.clone());
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn into_ref(self) -> ContextRef {
        ContextRef(Rc::new(RefCell::new(self)))
    }
}

/// Shared handle to a context. Equality and hashing go by name only.
#[derive(Clone)]
pub struct ContextRef(Rc<RefCell<Context>>);

impl ContextRef {
    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    pub fn base(&self) -> Option<ContextRef> {
        self.0.borrow().base.clone()
    }

    pub fn set_base(&self, base: Option<ContextRef>) {
        self.0.borrow_mut().base = base;
    }

    pub fn ptr_eq(&self, other: &ContextRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// This context followed by its bases, stopping at the first repeat
    pub fn chain(&self) -> Vec<ContextRef> {
        let mut chain: Vec<ContextRef> = Vec::new();
        let mut current = Some(self.clone());

        while let Some(ctx) = current {
            if chain.iter().any(|seen| seen.ptr_eq(&ctx)) {
                break;
            }
            current = ctx.base();
            chain.push(ctx);
        }

        chain
    }

    /// Resolve a key through built-ins, properties, the base chain, temps,
    /// then derived ability modifiers.
    /// Returns `Value::Null` when nothing along the chain has it.
    pub fn get(&self, key: &str) -> Value {
        let value = self.lookup(key);
        if value.is_null() {
            self.ability_modifier(key).unwrap_or(value)
        } else {
            value
        }
    }

    fn lookup(&self, key: &str) -> Value {
        let chain = self.chain();

        for ctx in &chain {
            let inner = ctx.0.borrow();
            if key == "name" {
                return Value::Text(inner.name.clone());
            }
            if let Some(value) = inner.properties.get(key) {
                if !value.is_null() {
                    return value.clone();
                }
            }
        }

        for ctx in chain.iter().rev() {
            if let Some(value) = ctx.0.borrow().temp.get(key) {
                return value.clone();
            }
        }

        Value::Null
    }

    /// `floor((attr - 10) / 2)`, plus `proficiency_bonus` for a save whose
    /// attribute is listed in `proficiencies`
    fn ability_modifier(&self, key: &str) -> Option<Value> {
        let (attribute, save) = match key.strip_suffix(MODIFIER_SUFFIX) {
            Some(attribute) => (attribute, false),
            None => (key.strip_suffix(SAVE_SUFFIX)?, true),
        };
        if attribute.is_empty() || self.owner().is_none() {
            return None;
        }

        let score = self.get(attribute).as_number()?;
        let mut modifier = ((score - 10.0) / 2.0).floor();
        if save {
            let proficient = match self.get("proficiencies") {
                Value::List(items) => items.iter().any(|item| item.as_str() == Some(attribute)),
                _ => false,
            };
            if proficient {
                modifier += self.get("proficiency_bonus").as_number().unwrap_or(0.0);
            }
        }
        Some(Value::Number(modifier))
    }

    pub fn get_local(&self, key: &str) -> Option<Value> {
        self.0.borrow().properties.get(key).cloned()
    }

    /// Write a property locally and echo it into the origin of a derived view
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();

        let origin = {
            let mut inner = self.0.borrow_mut();
            inner.properties.insert(key.clone(), value.clone());
            inner.origin.clone()
        };

        if let Some(origin) = origin {
            origin.set(key, value);
        }
    }

    /// Write an ephemeral attribute, returning whatever it replaced
    pub fn set_temp(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.borrow_mut().temp.insert(key.into(), value.into())
    }

    pub fn get_temp(&self, key: &str) -> Option<Value> {
        self.0.borrow().temp.get(key).cloned()
    }

    pub fn clear_temp(&self, key: &str) -> Option<Value> {
        self.0.borrow_mut().temp.remove(key)
    }

    /// Put back a temp attribute saved from `set_temp`
    pub fn restore_temp(&self, key: &str, previous: Option<Value>) {
        match previous {
            Some(value) => {
                self.set_temp(key, value);
            }
            None => {
                self.clear_temp(key);
            }
        }
    }

    /// Name of the nearest character along the chain
    pub fn owner(&self) -> Option<String> {
        self.chain()
            .iter()
            .find_map(|ctx| ctx.0.borrow().owner.clone())
    }

    /// Sorted snapshot of the local properties
    pub fn properties(&self) -> ValueMap {
        self.0
            .borrow()
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Wrap nested data as a context scoped under this one
    pub fn child(&self, name: impl Into<String>, properties: ValueMap) -> ContextRef {
        Context::new(name)
            .with_properties(properties)
            .with_base(self)
            .into_ref()
    }

    /// Derive a view of `source` that resolves relative to this context.
    ///
    /// The view copies the source's properties, fills gaps from the source's
    /// immediate base (one level, nested maps merged), and takes this context
    /// as its base. Writes through `set` on the view echo into `source`.
    pub fn re_context(&self, source: &ContextRef) -> ContextRef {
        let view = {
            let inner = source.0.borrow();
            let mut properties = inner.properties.clone();
            if let Some(base) = &inner.base {
                if !base.ptr_eq(source) {
                    deep_fill(&mut properties, &base.0.borrow().properties);
                }
            }

            Context {
                name: inner.name.clone(),
                owner: inner.owner.clone(),
                properties,
                temp: AHashMap::new(),
                base: Some(self.clone()),
                origin: Some(source.clone()),
            }
        };

        view.into_ref()
    }
}

fn deep_fill(target: &mut AHashMap<String, Value>, update: &AHashMap<String, Value>) {
    for (key, value) in update {
        match target.get_mut(key) {
            None | Some(Value::Null) => {
                target.insert(key.clone(), value.clone());
            }
            Some(Value::Map(existing)) => {
                if let Value::Map(incoming) = value {
                    deep_fill_map(existing, incoming);
                }
            }
            Some(_) => {}
        }
    }
}

fn deep_fill_map(target: &mut ValueMap, update: &ValueMap) {
    for (key, value) in update {
        match target.get_mut(key) {
            None | Some(Value::Null) => {
                target.insert(key.clone(), value.clone());
            }
            Some(Value::Map(existing)) => {
                if let Value::Map(incoming) = value {
                    deep_fill_map(existing, incoming);
                }
            }
            Some(_) => {}
        }
    }
}

impl PartialEq for ContextRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.name() == other.name()
    }
}

impl Eq for ContextRef {}

impl Hash for ContextRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl fmt::Debug for ContextRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(inner) => write!(f, "ContextRef({})", inner.name),
            Err(_) => write!(f, "ContextRef(<borrowed>)"),
        }
    }
}
