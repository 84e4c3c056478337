//! Runtime value model for HaiGui
//!
//! Everything a Logo program touches is one of four tagged shapes: a
//! `Word` (text, number or boolean scalar), a `List` (growable, 1-based,
//! optionally carrying a source map), an `Array` (fixed size, configurable
//! origin), or a `Procedure`. Token streams are themselves Lists of Words,
//! which is what makes list-as-code (`run`, `repeat` bodies) work without
//! a separate AST.
//!
//! Values are session-local; cheap sharing goes through `Rc`.

use crate::runtime::except::{ErrorCode, EvalResult, Flow, LogoError};
use crate::util::span::Srcmap;
use bitflags::bitflags;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

// ============================================================================
// Words
// ============================================================================

/// A Logo scalar: text, number, or boolean
///
/// Numbers and booleans are freely coercible to and from their text forms;
/// the variants only record what the value *is* right now, not the only
/// thing it can act as.
#[derive(Debug, Clone)]
pub enum Word {
    /// Uninterpreted text
    Text(Rc<str>),
    /// A number produced by arithmetic
    Num(f64),
    /// A boolean produced by comparison or logic
    Bool(bool),
}

impl Word {
    /// The text form of this word
    pub fn text(&self) -> Rc<str> {
        match self {
            Word::Text(s) => s.clone(),
            Word::Num(n) => format_number(*n).into(),
            Word::Bool(b) => if *b { "true" } else { "false" }.into(),
        }
    }

    /// Numeric interpretation, if this word has one
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Word::Num(n) => Some(*n),
            Word::Text(s) => parse_number(s),
            Word::Bool(_) => None,
        }
    }

    /// Boolean interpretation, if this word has one
    pub fn to_boolean(&self) -> Option<bool> {
        match self {
            Word::Bool(b) => Some(*b),
            Word::Text(s) => {
                if s.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    None
                }
            }
            Word::Num(_) => None,
        }
    }
}

/// Parse a word's text as a number (scientific notation allowed)
pub fn parse_number(text: &str) -> Option<f64> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }
    // f64::from_str also accepts "inf"/"nan", which are not Logo numbers
    let mut chars = t.chars();
    let first = chars.next()?;
    if !(first.is_ascii_digit() || first == '-' || first == '+' || first == '.') {
        return None;
    }
    if !t[1..]
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return None;
    }
    t.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Canonical string form of a number
///
/// Rendered at up to 15 significant digits, then re-shortened, so that
/// float noise in the final digits (`0.1 + 0.2`) never leaks into output.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if n == n.trunc() && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    let rounded: f64 = format!("{:.14e}", n).parse().unwrap_or(n);
    let a = rounded.abs();
    if a >= 1e21 || (a > 0.0 && a < 1e-6) {
        format!("{:e}", rounded)
    } else {
        format!("{}", rounded)
    }
}

// ============================================================================
// Lists and arrays
// ============================================================================

/// An ordered, growable, 1-indexed sequence
///
/// A list built by the parser carries a source map (one entry per item)
/// and caches its re-tokenized form once it has been used as code.
#[derive(Debug, Default)]
pub struct List {
    /// The items, in order
    pub items: Vec<Value>,
    /// Parallel source positions; same length as `items` when present
    pub srcmap: Option<Srcmap>,
    /// Cache filled by `parse_block` the first time this list runs as code
    pub parsed: RefCell<Option<Rc<List>>>,
}

impl List {
    /// An empty list with no source map
    pub fn empty() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Build a plain list from values
    pub fn from_values(items: Vec<Value>) -> Rc<Self> {
        Rc::new(Self {
            items,
            srcmap: None,
            parsed: RefCell::new(None),
        })
    }

    /// Build a source-mapped list
    pub fn with_srcmap(items: Vec<Value>, srcmap: Srcmap) -> Rc<Self> {
        debug_assert_eq!(items.len(), srcmap.len());
        Rc::new(Self {
            items,
            srcmap: Some(srcmap),
            parsed: RefCell::new(None),
        })
    }

    /// Number of items
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the list has no items
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 1-based item access
    #[inline]
    pub fn item(&self, index: usize) -> Option<&Value> {
        if index == 0 {
            None
        } else {
            self.items.get(index - 1)
        }
    }
}

impl PartialEq for List {
    /// Structural equality; source maps and parse caches are invisible
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self.items.iter().zip(&other.items).all(|(a, b)| a.equals(b))
    }
}

/// A fixed-size sequence with a configurable integer origin
#[derive(Debug)]
pub struct LogoArray {
    /// The cells; length never changes after construction
    pub cells: RefCell<Vec<Value>>,
    /// Index of the first cell (1 unless built with `@origin`)
    pub origin: i64,
}

impl LogoArray {
    /// Build an array of `size` empty-list cells
    pub fn new(size: usize, origin: i64) -> Rc<Self> {
        Rc::new(Self {
            cells: RefCell::new(vec![Value::empty_list(); size]),
            origin,
        })
    }

    /// Build an array from existing values
    pub fn from_values(values: Vec<Value>, origin: i64) -> Rc<Self> {
        Rc::new(Self {
            cells: RefCell::new(values),
            origin,
        })
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.cells.borrow().len()
    }

    /// True when the array has no cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Translate a Logo index into a cell offset
    pub fn offset_of(&self, index: i64) -> Option<usize> {
        let off = index.checked_sub(self.origin)?;
        if off < 0 || off as usize >= self.len() {
            None
        } else {
            Some(off as usize)
        }
    }
}

// ============================================================================
// Procedures
// ============================================================================

bitflags! {
    /// Behavior attributes of a procedure or primitive
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ProcAttrs: u8 {
        /// Output list is re-run in the caller's context
        const MACRO = 1 << 0;
        /// May invoke Logo code sharing the caller's local-variable names;
        /// callers snapshot and restore local bindings around the call
        const STASH_LOCAL_VAR = 1 << 1;
        /// `stop`/`output` raised in a Logo-code argument are absorbed at
        /// this call instead of unwinding past it
        const RETURNS_IN_LAMBDA = 1 << 2;
    }
}

/// A formal parameter
#[derive(Debug, Clone)]
pub struct Formal {
    /// Parameter name, lowercased
    pub name: String,
    /// Default-value template, evaluated at call time when the caller
    /// supplies no value (`[:name template...]` in the `to` line)
    pub default: Option<Rc<List>>,
}

/// A user-defined procedure
///
/// Owned by the workspace; replaced wholesale on redefinition, which is
/// also what invalidates any compiled chunk (chunks are cached under the
/// procedure's `stamp`).
#[derive(Debug)]
pub struct Procedure {
    /// Procedure name, lowercased
    pub name: String,
    /// Required parameters followed by optional (defaulted) ones
    pub formals: Vec<Formal>,
    /// Rest parameter collecting extra arguments into a list
    pub rest: Option<String>,
    /// Arity used outside parentheses
    pub default_arity: usize,
    /// The body, a token list (with its own source map)
    pub body: Rc<List>,
    /// Source positions of the formals on the `to` line
    pub formal_srcmap: Option<Srcmap>,
    /// Attribute bits
    pub attrs: ProcAttrs,
    /// Registration stamp; unique per (re)definition
    pub stamp: u64,
}

impl Procedure {
    /// Number of required parameters
    pub fn min_arity(&self) -> usize {
        self.formals.iter().filter(|f| f.default.is_none()).count()
    }

    /// Maximum accepted arguments, `None` when a rest parameter exists
    pub fn max_arity(&self) -> Option<usize> {
        if self.rest.is_some() {
            None
        } else {
            Some(self.formals.len())
        }
    }
}

// ============================================================================
// Values
// ============================================================================

/// A tagged Logo value
#[derive(Debug, Clone)]
pub enum Value {
    /// Scalar
    Word(Word),
    /// 1-based growable sequence
    List(Rc<List>),
    /// Fixed-size sequence with origin
    Array(Rc<LogoArray>),
    /// User procedure (appears in token streams after `to … end` extraction)
    Procedure(Rc<Procedure>),
}

impl Value {
    /// Text word constructor
    pub fn word<S: Into<Rc<str>>>(s: S) -> Self {
        Value::Word(Word::Text(s.into()))
    }

    /// Number word constructor
    pub fn num(n: f64) -> Self {
        Value::Word(Word::Num(n))
    }

    /// Boolean word constructor
    pub fn bool(b: bool) -> Self {
        Value::Word(Word::Bool(b))
    }

    /// The empty list
    pub fn empty_list() -> Self {
        Value::List(List::empty())
    }

    // ------------------------------------------------------------------
    // Predicates
    // ------------------------------------------------------------------

    /// Is this a word?
    pub fn is_word(&self) -> bool {
        matches!(self, Value::Word(_))
    }

    /// Is this a list?
    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Is this an array?
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Is this a word with a numeric interpretation?
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Word(w) if w.to_number().is_some())
    }

    /// Is this a word with a boolean interpretation?
    pub fn is_boolean(&self) -> bool {
        matches!(self, Value::Word(w) if w.to_boolean().is_some())
    }

    // ------------------------------------------------------------------
    // Validated accessors
    //
    // Each raises InvalidInput naming the requesting procedure and the
    // offending value, so primitives can simply `?` through them.
    // ------------------------------------------------------------------

    fn reject(&self, who: &str) -> Flow {
        Flow::Err(LogoError::new(
            ErrorCode::InvalidInput,
            [who.to_string(), self.show_string()],
        ))
    }

    /// This value as a word
    pub fn as_word(&self, who: &str) -> EvalResult<&Word> {
        match self {
            Value::Word(w) => Ok(w),
            _ => Err(self.reject(who)),
        }
    }

    /// This value as word text
    pub fn as_text(&self, who: &str) -> EvalResult<Rc<str>> {
        Ok(self.as_word(who)?.text())
    }

    /// This value as a number
    pub fn as_number(&self, who: &str) -> EvalResult<f64> {
        self.as_word(who)?
            .to_number()
            .ok_or_else(|| self.reject(who))
    }

    /// This value as an integer
    pub fn as_integer(&self, who: &str) -> EvalResult<i64> {
        let n = self.as_number(who)?;
        if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
            Ok(n as i64)
        } else {
            Err(self.reject(who))
        }
    }

    /// This value as a boolean
    pub fn as_boolean(&self, who: &str) -> EvalResult<bool> {
        self.as_word(who)?
            .to_boolean()
            .ok_or_else(|| self.reject(who))
    }

    /// This value as a list
    pub fn as_list(&self, who: &str) -> EvalResult<Rc<List>> {
        match self {
            Value::List(l) => Ok(l.clone()),
            _ => Err(self.reject(who)),
        }
    }

    /// This value as an array
    pub fn as_array(&self, who: &str) -> EvalResult<Rc<LogoArray>> {
        match self {
            Value::Array(a) => Ok(a.clone()),
            _ => Err(self.reject(who)),
        }
    }

    /// This value as a procedure
    pub fn as_procedure(&self, who: &str) -> EvalResult<Rc<Procedure>> {
        match self {
            Value::Procedure(p) => Ok(p.clone()),
            _ => Err(self.reject(who)),
        }
    }

    // ------------------------------------------------------------------
    // Equality
    // ------------------------------------------------------------------

    /// Structural Logo equality
    ///
    /// Numeric text coerces (`"5"` equals `5`), booleans compare by boolean
    /// semantics, other words compare case-insensitively, lists compare
    /// element-wise, arrays and procedures by identity.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Word(a), Value::Word(b)) => {
                if let (Some(x), Some(y)) = (a.to_number(), b.to_number()) {
                    return x == y;
                }
                if let (Some(x), Some(y)) = (a.to_boolean(), b.to_boolean()) {
                    return x == y;
                }
                a.text().eq_ignore_ascii_case(&b.text())
            }
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Procedure(a), Value::Procedure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // String conversion
    // ------------------------------------------------------------------

    /// `print` form: words raw, top-level list brackets stripped
    pub fn display_string(&self) -> String {
        match self {
            Value::Word(w) => w.text().to_string(),
            Value::List(l) => join_items(&l.items),
            Value::Array(a) => format!("{{{}}}", join_items(&a.cells.borrow())),
            Value::Procedure(p) => p.name.clone(),
        }
    }

    /// `show` form: composite values keep their delimiters
    pub fn show_string(&self) -> String {
        match self {
            Value::Word(w) => w.text().to_string(),
            Value::List(l) => format!("[{}]", join_items(&l.items)),
            Value::Array(a) => format!("{{{}}}", join_items(&a.cells.borrow())),
            Value::Procedure(p) => p.name.clone(),
        }
    }
}

fn join_items(items: &[Value]) -> String {
    items
        .iter()
        .map(Value::show_string)
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.show_string())
    }
}

#[cfg(test)]
mod tests;
