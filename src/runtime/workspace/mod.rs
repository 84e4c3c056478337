//! Environment and workspace
//!
//! One [`Workspace`] holds the full mutable state of an interpreter
//! session: the scope stack (dynamic scoping, global floor), the procedure
//! registry, property lists, modules/classes, and the Logo-level call
//! stack used for error traces. Resetting clears everything but
//! re-establishes the global scope.

use crate::runtime::except::{ErrorCode, EvalResult, Flow, LogoError};
use crate::runtime::value::{Procedure, Value};
use crate::util::span::SrcRef;
use indexmap::IndexMap;
use std::rc::Rc;
use tracing::debug;

/// A property list: name → value, insertion-ordered
pub type Plist = IndexMap<String, Value>;

/// Maximum Logo call depth before the engine gives up
pub const MAX_CALL_DEPTH: usize = 1024;

/// One scope frame
///
/// A binding of `None` is declared-but-unbound (`local "x` before any
/// assignment); looking it up still raises `NoValue`.
#[derive(Debug, Default, Clone)]
pub struct Scope {
    vars: IndexMap<String, Option<Value>>,
    /// Flag set by `test`, read by `iftrue`/`iffalse`
    test: Option<bool>,
}

/// One Logo call-stack frame, for error reporting only
#[derive(Debug, Clone)]
pub struct Frame {
    /// Procedure being executed
    pub proc_name: String,
    /// Call site, when known
    pub at: Option<SrcRef>,
}

/// A module, or a class (a module with inheritance)
#[derive(Debug, Default)]
pub struct Module {
    /// Lowercased module name
    pub name: String,
    /// Classes are modules that can inherit and dispatch
    pub is_class: bool,
    /// Superclass name for classes
    pub isa: Option<String>,
    /// Names visible to importers
    pub exports: Vec<String>,
    /// Procedures/methods defined in this module
    pub methods: IndexMap<String, Rc<Procedure>>,
    /// Property lists scoped to this module (when enabled)
    pub plists: IndexMap<String, Plist>,
}

/// A procedure resolved through the namespace rules
#[derive(Debug, Clone)]
pub struct Resolved {
    pub proc: Rc<Procedure>,
    /// Class the method was found on, for `super.` resolution
    pub class: Option<String>,
}

/// The aggregate mutable state of one interpreter session
#[derive(Debug)]
pub struct Workspace {
    scopes: Vec<Scope>,
    procs: IndexMap<String, Rc<Procedure>>,
    plists: IndexMap<String, Plist>,
    modules: IndexMap<String, Module>,
    /// Module currently being defined (`module`/`class` … `endmodule`)
    current_module: Option<String>,
    /// Class of the method currently executing, for `super.` lookups
    dispatch_class: Option<String>,
    call_stack: Vec<Frame>,
    stamp: u64,
    /// Bumped on every (re)definition; compiled-chunk caches key on it
    generation: u64,
    /// Property lists live on the defining class instead of one global table
    scoped_plists: bool,
}

impl Workspace {
    /// Create a workspace with one (global) scope
    pub fn new(scoped_plists: bool) -> Self {
        Self {
            scopes: vec![Scope::default()],
            procs: IndexMap::new(),
            plists: IndexMap::new(),
            modules: IndexMap::new(),
            current_module: None,
            dispatch_class: None,
            call_stack: Vec::new(),
            stamp: 0,
            generation: 0,
            scoped_plists,
        }
    }

    /// Clear everything, re-establishing the global scope
    pub fn reset(&mut self) {
        self.scopes = vec![Scope::default()];
        self.procs.clear();
        self.plists.clear();
        self.modules.clear();
        self.current_module = None;
        self.dispatch_class = None;
        self.call_stack.clear();
        self.generation += 1;
    }

    /// Next registration stamp (unique per workspace lifetime)
    pub fn next_stamp(&mut self) -> u64 {
        self.stamp += 1;
        self.stamp
    }

    /// Definition generation; changes whenever any procedure is
    /// (re)defined or erased
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    /// Push a fresh scope (procedure or lambda invocation)
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Pop the innermost scope; the global scope is never popped
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        } else {
            debug_assert!(false, "attempted to pop the global scope");
        }
    }

    /// Current scope depth (1 = only the global scope)
    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Look a variable up, innermost scope outward
    pub fn get(&self, name: &str) -> Option<Value> {
        let name = name.to_lowercase();
        for scope in self.scopes.iter().rev() {
            if let Some(binding) = scope.vars.get(&name) {
                return binding.clone();
            }
        }
        None
    }

    /// Look a variable up or raise `NoValue`
    pub fn get_or_err(&self, name: &str) -> EvalResult<Value> {
        self.get(name)
            .ok_or_else(|| Flow::Err(LogoError::new(ErrorCode::NoValue, [name])))
    }

    /// `make`: bind in the nearest scope that already has the name,
    /// otherwise create the binding in the global scope
    pub fn make(&mut self, name: &str, value: Value) {
        let name = name.to_lowercase();
        for scope in self.scopes.iter_mut().rev() {
            if let Some(binding) = scope.vars.get_mut(&name) {
                *binding = Some(value);
                return;
            }
        }
        if let Some(global) = self.scopes.first_mut() {
            global.vars.insert(name, Some(value));
        }
    }

    /// `local`: declare (unbound) in the innermost scope only
    pub fn local(&mut self, name: &str) {
        let name = name.to_lowercase();
        if let Some(scope) = self.scopes.last_mut() {
            scope.vars.entry(name).or_insert(None);
        }
    }

    /// `localmake`: bind in the innermost scope only
    pub fn local_make(&mut self, name: &str, value: Value) {
        let name = name.to_lowercase();
        if let Some(scope) = self.scopes.last_mut() {
            scope.vars.insert(name, Some(value));
        }
    }

    /// Snapshot the innermost scope's bindings
    ///
    /// Callers of STASH_LOCAL_VAR primitives save and restore around the
    /// call, because the primitive may run Logo code that rebinds the
    /// same names through this workspace.
    pub fn snapshot_locals(&self) -> Scope {
        self.scopes.last().cloned().unwrap_or_default()
    }

    /// Restore a snapshot taken by [`Workspace::snapshot_locals`]
    pub fn restore_locals(&mut self, snapshot: Scope) {
        if let Some(scope) = self.scopes.last_mut() {
            *scope = snapshot;
        }
    }

    /// Record the `test` flag in the innermost scope
    pub fn set_test(&mut self, value: bool) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.test = Some(value);
        }
    }

    /// Read the nearest recorded `test` flag
    pub fn get_test(&self) -> Option<bool> {
        self.scopes.iter().rev().find_map(|s| s.test)
    }

    // ------------------------------------------------------------------
    // Procedures and namespaces
    // ------------------------------------------------------------------

    /// Is this name a built-in primitive?
    pub fn is_primitive(&self, name: &str) -> bool {
        crate::runtime::primitives::lookup(name).is_some()
    }

    /// Register a procedure, replacing any previous definition
    ///
    /// Inside a `module`/`class` block the definition lands on that
    /// module; otherwise it is global. Replacement is what invalidates a
    /// compiled chunk: the stamp changes with the definition.
    pub fn define(&mut self, proc: Rc<Procedure>) {
        self.generation += 1;
        let name = proc.name.clone();
        match self.current_module.as_ref() {
            Some(m) => {
                if let Some(module) = self.modules.get_mut(m) {
                    module.methods.insert(name, proc);
                }
            }
            None => {
                self.procs.insert(name, proc);
            }
        }
    }

    /// Remove a global procedure definition
    pub fn erase(&mut self, name: &str) -> bool {
        self.generation += 1;
        self.procs.shift_remove(&name.to_lowercase()).is_some()
    }

    /// Names of all globally defined procedures, in definition order
    pub fn procedure_names(&self) -> Vec<String> {
        self.procs.keys().cloned().collect()
    }

    /// Look a user procedure up through the namespace rules:
    /// `super.` methods, the active class's method chain, the module
    /// being defined, then the global registry.
    pub fn resolve(&self, name: &str) -> Option<Resolved> {
        let name = name.to_lowercase();

        if let Some(rest) = name.strip_prefix("super.") {
            let class = self.dispatch_class.as_ref()?;
            let parent = self.modules.get(class)?.isa.as_ref()?;
            return self.resolve_method(parent, rest);
        }

        if let Some(class) = &self.dispatch_class {
            if let Some(found) = self.resolve_method(class, &name) {
                return Some(found);
            }
        }
        if let Some(m) = &self.current_module {
            if let Some(found) = self.resolve_method(m, &name) {
                return Some(found);
            }
        }
        self.procs.get(&name).map(|p| Resolved {
            proc: p.clone(),
            class: None,
        })
    }

    /// Dispatch keyed by (class, method), walking the `isa` chain
    pub fn resolve_method(&self, class: &str, method: &str) -> Option<Resolved> {
        let mut cur = Some(class.to_lowercase());
        let mut hops = 0;
        while let Some(cname) = cur {
            let module = self.modules.get(&cname)?;
            if let Some(proc) = module.methods.get(method) {
                return Some(Resolved {
                    proc: proc.clone(),
                    class: Some(cname),
                });
            }
            cur = module.isa.clone();
            hops += 1;
            if hops > self.modules.len() {
                // inheritance cycle; treat as not found
                return None;
            }
        }
        None
    }

    /// Enter a `module` / `class` definition block
    pub fn begin_module(
        &mut self,
        name: &str,
        is_class: bool,
        isa: Option<String>,
    ) -> EvalResult<()> {
        let name = name.to_lowercase();
        let isa = isa.map(|s| s.to_lowercase());
        if let Some(parent) = &isa {
            if !self.modules.contains_key(parent) {
                return Err(Flow::Err(LogoError::new(
                    ErrorCode::UnknownModule,
                    [parent.clone()],
                )));
            }
        }
        let module = self.modules.entry(name.clone()).or_default();
        module.name = name.clone();
        module.is_class |= is_class;
        if isa.is_some() {
            module.isa = isa;
        }
        debug!("entering module {}", name);
        self.current_module = Some(name);
        Ok(())
    }

    /// Leave the current module block
    pub fn end_module(&mut self) -> EvalResult<()> {
        if self.current_module.take().is_none() {
            return Err(Flow::err_with(ErrorCode::CantUseHere, ["endmodule"]));
        }
        Ok(())
    }

    /// Mark names of the current module as visible to importers
    pub fn export(&mut self, names: &[String]) -> EvalResult<()> {
        let Some(m) = self.current_module.as_ref() else {
            return Err(Flow::err_with(ErrorCode::CantUseHere, ["export"]));
        };
        if let Some(module) = self.modules.get_mut(m) {
            for n in names {
                let n = n.to_lowercase();
                if !module.exports.contains(&n) {
                    module.exports.push(n);
                }
            }
        }
        Ok(())
    }

    /// Import exported names from a module into the current namespace
    pub fn import(&mut self, from: &str, names: Option<&[String]>) -> EvalResult<()> {
        let from = from.to_lowercase();
        let Some(module) = self.modules.get(&from) else {
            return Err(Flow::err_with(ErrorCode::UnknownModule, [from]));
        };
        let wanted: Vec<String> = match names {
            Some(ns) => ns.iter().map(|n| n.to_lowercase()).collect(),
            None => module.exports.clone(),
        };
        let mut imported = Vec::with_capacity(wanted.len());
        for n in &wanted {
            if !module.exports.contains(n) {
                return Err(Flow::err_with(
                    ErrorCode::NotExported,
                    [from.clone(), n.clone()],
                ));
            }
            match module.methods.get(n) {
                Some(p) => imported.push(p.clone()),
                None => {
                    return Err(Flow::err_with(
                        ErrorCode::NotExported,
                        [from.clone(), n.clone()],
                    ))
                }
            }
        }
        for p in imported {
            let name = p.name.clone();
            match self.current_module.as_ref() {
                Some(m) => {
                    if let Some(module) = self.modules.get_mut(m) {
                        module.methods.insert(name, p);
                    }
                }
                None => {
                    self.procs.insert(name, p);
                }
            }
        }
        Ok(())
    }

    /// The class context of the currently executing method
    pub fn dispatch_class(&self) -> Option<&str> {
        self.dispatch_class.as_deref()
    }

    /// Swap the method-dispatch class context, returning the previous one
    pub fn swap_dispatch_class(&mut self, class: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.dispatch_class, class)
    }

    /// Does a module with this name exist?
    pub fn has_module(&self, name: &str) -> bool {
        self.modules.contains_key(&name.to_lowercase())
    }

    // ------------------------------------------------------------------
    // Property lists
    // ------------------------------------------------------------------

    fn plist_table(&mut self) -> &mut IndexMap<String, Plist> {
        if self.scoped_plists {
            let key = self
                .dispatch_class
                .clone()
                .or_else(|| self.current_module.clone());
            if let Some(key) = key {
                if let Some(module) = self.modules.get_mut(&key) {
                    return &mut module.plists;
                }
            }
        }
        &mut self.plists
    }

    /// `pprop`: set a property
    pub fn put_prop(&mut self, list: &str, prop: &str, value: Value) {
        let (list, prop) = (list.to_lowercase(), prop.to_lowercase());
        self.plist_table().entry(list).or_default().insert(prop, value);
    }

    /// `gprop`: read a property (empty list when absent)
    pub fn get_prop(&mut self, list: &str, prop: &str) -> Value {
        let (list, prop) = (list.to_lowercase(), prop.to_lowercase());
        self.plist_table()
            .get(&list)
            .and_then(|p| p.get(&prop))
            .cloned()
            .unwrap_or_else(Value::empty_list)
    }

    /// `remprop`: remove a property
    pub fn rem_prop(&mut self, list: &str, prop: &str) {
        let (list, prop) = (list.to_lowercase(), prop.to_lowercase());
        if let Some(p) = self.plist_table().get_mut(&list) {
            p.shift_remove(&prop);
        }
    }

    /// `plist`: the property list as alternating name/value pairs
    pub fn plist_pairs(&mut self, list: &str) -> Vec<Value> {
        let list = list.to_lowercase();
        self.plist_table()
            .get(&list)
            .map(|p| {
                p.iter()
                    .flat_map(|(k, v)| [Value::word(k.as_str()), v.clone()])
                    .collect()
            })
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Call stack (error reporting)
    // ------------------------------------------------------------------

    /// Push a Logo call frame; errors once the stack is too deep
    pub fn push_frame(&mut self, proc_name: &str, at: Option<SrcRef>) -> EvalResult<()> {
        if self.call_stack.len() >= MAX_CALL_DEPTH {
            return Err(Flow::err_with(ErrorCode::StackOverflow, [proc_name]));
        }
        self.call_stack.push(Frame {
            proc_name: proc_name.to_string(),
            at,
        });
        Ok(())
    }

    /// Pop the innermost Logo call frame
    pub fn pop_frame(&mut self) {
        self.call_stack.pop();
    }

    /// Name of the innermost frame, for error attribution
    pub fn current_proc(&self) -> Option<&str> {
        self.call_stack.last().map(|f| f.proc_name.as_str())
    }

    /// Formatted call chain, innermost first
    pub fn trace(&self) -> Vec<String> {
        self.call_stack
            .iter()
            .rev()
            .map(|f| match f.at {
                Some(at) => format!("{} at {}", f.proc_name, at),
                None => f.proc_name.clone(),
            })
            .collect()
    }

    /// Drop all Logo frames (after a top-level error report)
    pub fn clear_frames(&mut self) {
        self.call_stack.clear();
    }
}

#[cfg(test)]
mod tests;
