//! Primitive registry
//!
//! The built-in procedures, grouped the way the manual groups them. Each
//! entry declares its arity envelope (minimum, default outside parens,
//! maximum) and its attribute bits; the evaluator and the code generator
//! both consult those when arranging a call.
//!
//! Control primitives live here too, but their semantics are implemented
//! once in [`crate::vm::control`], shared with the compiled path.

use crate::runtime::except::EvalResult;
use crate::runtime::value::{ProcAttrs, Value};
use crate::vm::interp::Evaluator;
use crate::vm::LocalFuture;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Synchronous primitive implementation
pub type SyncPrim = fn(&mut Evaluator<'_>, Vec<Value>) -> EvalResult<Option<Value>>;

/// Suspending primitive implementation
pub type AsyncPrim =
    for<'a, 'b> fn(&'a mut Evaluator<'b>, Vec<Value>) -> LocalFuture<'a, EvalResult<Option<Value>>>;

/// A primitive's implementation
pub enum PrimFn {
    Sync(SyncPrim),
    Async(AsyncPrim),
}

/// One registry entry
pub struct Primitive {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    /// Fewest arguments accepted (paren form)
    pub min: usize,
    /// Arguments consumed outside parentheses
    pub def: usize,
    /// Most arguments accepted; `None` is unbounded
    pub max: Option<usize>,
    pub attrs: ProcAttrs,
    pub f: PrimFn,
}

macro_rules! prim {
    ($name:literal, ($min:expr, $def:expr, $max:expr), $f:expr) => {
        Primitive {
            name: $name,
            aliases: &[],
            min: $min,
            def: $def,
            max: $max,
            attrs: crate::runtime::value::ProcAttrs::empty(),
            f: $f,
        }
    };
    ($name:literal / $aliases:expr, ($min:expr, $def:expr, $max:expr), $f:expr) => {
        Primitive {
            name: $name,
            aliases: $aliases,
            min: $min,
            def: $def,
            max: $max,
            attrs: crate::runtime::value::ProcAttrs::empty(),
            f: $f,
        }
    };
    ($name:literal, ($min:expr, $def:expr, $max:expr), $f:expr, $attrs:expr) => {
        Primitive {
            name: $name,
            aliases: &[],
            min: $min,
            def: $def,
            max: $max,
            attrs: $attrs,
            f: $f,
        }
    };
    ($name:literal / $aliases:expr, ($min:expr, $def:expr, $max:expr), $f:expr, $attrs:expr) => {
        Primitive {
            name: $name,
            aliases: $aliases,
            min: $min,
            def: $def,
            max: $max,
            attrs: $attrs,
            f: $f,
        }
    };
}

pub mod control;
pub mod define;
pub mod graphics;
pub mod io;
pub mod math;
pub mod vars;
pub mod words;

static REGISTRY: Lazy<HashMap<&'static str, &'static Primitive>> = Lazy::new(|| {
    let mut map = HashMap::new();
    let tables: [&[Primitive]; 7] = [
        control::PRIMS,
        define::PRIMS,
        graphics::PRIMS,
        io::PRIMS,
        math::PRIMS,
        vars::PRIMS,
        words::PRIMS,
    ];
    for table in tables {
        for p in table {
            map.insert(p.name, p);
            for alias in p.aliases {
                map.insert(*alias, p);
            }
        }
    }
    map
});

/// Look up a primitive by (lowercased) name or alias
pub fn lookup(name: &str) -> Option<&'static Primitive> {
    REGISTRY.get(name).copied()
}

/// All registered primitive names (for workspace listings)
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<_> = REGISTRY.keys().copied().collect();
    names.sort_unstable();
    names
}
