//! Parser module
//!
//! Assembles the flat raw-token stream into Logo structures: nested lists
//! and arrays (with parallel source maps), inline `(`/`)` word tokens, and
//! procedures extracted from bracket-depth-zero `to`/`.macro` … `end`
//! regions. A procedure's signature is registered in the workspace as soon
//! as its `to` line closes, before the body is parsed, so recursive and
//! forward calls resolve.
//!
//! Open brackets, bars and `to` regions at end of input are reported as
//! [`Parsed::Incomplete`], never as errors; a mismatched closer is an
//! immediate [`ErrorCode::UnexpectedToken`].

use crate::frontend::lexer::{Op, RawKind, RawToken};
use crate::runtime::except::{ErrorCode, LogoError};
use crate::runtime::value::{Formal, List, LogoArray, ProcAttrs, Procedure, Value};
use crate::runtime::workspace::Workspace;
use crate::util::span::{SrcRef, Srcmap, TokenSrc};
use smallvec::SmallVec;
use std::rc::Rc;
use tracing::debug;

/// Result of assembling one chunk of input
#[derive(Debug)]
pub enum Parsed {
    /// A complete top-level token stream, procedures extracted
    Complete(Rc<List>),
    /// A bracket, paren or `to` region is still open; feed more input
    Incomplete,
}

/// Assemble raw tokens into a top-level token stream
pub fn parse(tokens: &[RawToken], ws: &mut Workspace) -> Result<Parsed, LogoError> {
    let mut asm = Assembler {
        ws,
        stack: Vec::new(),
        parens: Vec::new(),
        out: Vec::new(),
        out_map: Vec::new(),
        pending_to: None,
    };

    let mut i = 0;
    while i < tokens.len() {
        let tok = &tokens[i];
        match &tok.kind {
            RawKind::LBracket => asm.stack.push(Coll::new(CollKind::List, tok.at)),
            RawKind::LBrace => asm.stack.push(Coll::new(CollKind::Array, tok.at)),
            RawKind::RBracket => match asm.stack.pop() {
                Some(c) if c.kind == CollKind::List => {
                    let v = Value::List(List::with_srcmap(c.items, c.map));
                    asm.route(v, src_of(tok), tok.logical_line)?;
                }
                _ => return Err(unexpected("]", tok.at)),
            },
            RawKind::RBrace => match asm.stack.pop() {
                Some(c) if c.kind == CollKind::Array => {
                    // a `{…}@origin` suffix immediately after the brace
                    let mut origin = 1i64;
                    if let Some(next) = tokens.get(i + 1) {
                        if let Some(o) = origin_suffix(next) {
                            origin = o;
                            i += 1;
                        }
                    }
                    let v = Value::Array(LogoArray::from_values(c.items, origin));
                    asm.route(v, src_of(tok), tok.logical_line)?;
                }
                _ => return Err(unexpected("}", tok.at)),
            },
            RawKind::LParen => {
                asm.parens.push(tok.at);
                asm.route(Value::word("("), src_of(tok), tok.logical_line)?;
            }
            RawKind::RParen => {
                if asm.parens.pop().is_none() {
                    return Err(unexpected(")", tok.at));
                }
                asm.route(Value::word(")"), src_of(tok), tok.logical_line)?;
            }
            RawKind::Operator(op) => {
                asm.route(Value::word(op.text()), src_of(tok), tok.logical_line)?;
            }
            RawKind::Word(w) => {
                if asm.at_root() && tok.is_keyword("end") {
                    asm.finish_procedure(tok.at)?;
                } else if asm.at_root() && (tok.is_keyword("to") || tok.is_keyword(".macro")) {
                    let is_macro = tok.is_keyword(".macro");
                    let name = tokens
                        .get(i + 1)
                        .filter(|t| t.logical_line == tok.logical_line)
                        .and_then(RawToken::word)
                        .ok_or_else(|| {
                            LogoError::new(ErrorCode::NotEnoughInputs, [w.clone()]).at(tok.at)
                        })?;
                    i += 1;
                    asm.begin_procedure(name, is_macro, tok.at, tok.logical_line)?;
                } else {
                    asm.route(Value::word(w.as_str()), src_of(tok), tok.logical_line)?;
                }
            }
        }
        i += 1;
    }

    if asm.pending_to.is_some() || !asm.stack.is_empty() || !asm.parens.is_empty() {
        return Ok(Parsed::Incomplete);
    }
    Ok(Parsed::Complete(List::with_srcmap(asm.out, asm.out_map)))
}

fn unexpected(what: &str, at: SrcRef) -> LogoError {
    LogoError::new(ErrorCode::UnexpectedToken, [what]).at(at)
}

fn src_of(tok: &RawToken) -> TokenSrc {
    TokenSrc {
        at: tok.at,
        mask: tok.mask.clone(),
        escapes: tok.escapes.clone(),
    }
}

/// `@n` immediately after a closing brace sets the array origin
fn origin_suffix(tok: &RawToken) -> Option<i64> {
    let w = tok.word()?;
    if !tok.mask.is_empty() {
        return None;
    }
    w.strip_prefix('@')?.parse::<i64>().ok()
}

#[derive(Debug, PartialEq, Eq)]
enum CollKind {
    List,
    Array,
}

struct Coll {
    kind: CollKind,
    items: Vec<Value>,
    map: Srcmap,
    #[allow(dead_code)]
    open_at: SrcRef,
}

impl Coll {
    fn new(kind: CollKind, open_at: SrcRef) -> Self {
        Self {
            kind,
            items: Vec::new(),
            map: Vec::new(),
            open_at,
        }
    }
}

struct ToBuilder {
    name: String,
    is_macro: bool,
    at: SrcRef,
    to_line: u32,
    formals: Vec<Formal>,
    formal_map: Srcmap,
    rest: Option<String>,
    explicit_arity: Option<usize>,
    signature_done: bool,
    body: Vec<Value>,
    body_map: Srcmap,
}

struct Assembler<'w> {
    ws: &'w mut Workspace,
    stack: Vec<Coll>,
    parens: Vec<SrcRef>,
    out: Vec<Value>,
    out_map: Srcmap,
    pending_to: Option<ToBuilder>,
}

impl Assembler<'_> {
    /// Outside every bracket and paren (where `to`/`end` are keywords)
    fn at_root(&self) -> bool {
        self.stack.is_empty() && self.parens.is_empty()
    }

    fn route(&mut self, v: Value, src: TokenSrc, logical: u32) -> Result<(), LogoError> {
        if let Some(c) = self.stack.last_mut() {
            c.items.push(v);
            c.map.push(src);
            return Ok(());
        }
        if self.pending_to.is_some() {
            let on_to_line = self
                .pending_to
                .as_ref()
                .is_some_and(|tb| !tb.signature_done && logical == tb.to_line);
            if on_to_line {
                return self.add_formal(v, src);
            }
            self.ensure_signature()?;
            if let Some(tb) = &mut self.pending_to {
                tb.body.push(v);
                tb.body_map.push(src);
            }
            return Ok(());
        }
        self.out.push(v);
        self.out_map.push(src);
        Ok(())
    }

    fn begin_procedure(
        &mut self,
        name: &str,
        is_macro: bool,
        at: SrcRef,
        to_line: u32,
    ) -> Result<(), LogoError> {
        if self.pending_to.is_some() {
            return Err(LogoError::new(ErrorCode::CantUseHere, ["to"]).at(at));
        }
        let lname = name.to_lowercase();
        if self.ws.is_primitive(&lname) {
            return Err(LogoError::new(ErrorCode::IsPrimitive, [lname]).at(at));
        }
        if crate::runtime::value::parse_number(&lname).is_some() {
            return Err(LogoError::new(ErrorCode::InvalidInput, ["to", lname.as_str()]).at(at));
        }
        self.pending_to = Some(ToBuilder {
            name: lname,
            is_macro,
            at,
            to_line,
            formals: Vec::new(),
            formal_map: Vec::new(),
            rest: None,
            explicit_arity: None,
            signature_done: false,
            body: Vec::new(),
            body_map: Vec::new(),
        });
        Ok(())
    }

    /// Classify one token of the `to` line
    fn add_formal(&mut self, v: Value, src: TokenSrc) -> Result<(), LogoError> {
        let Some(tb) = &mut self.pending_to else {
            return Ok(());
        };
        match &v {
            Value::Word(w) => {
                let text = w.text();
                if let Some(name) = text.strip_prefix(':').filter(|n| !n.is_empty()) {
                    tb.formals.push(Formal {
                        name: name.to_lowercase(),
                        default: None,
                    });
                    tb.formal_map.push(src);
                    return Ok(());
                }
                if let Some(n) = w.to_number() {
                    if n.fract() == 0.0 && n >= 0.0 {
                        tb.explicit_arity = Some(n as usize);
                        return Ok(());
                    }
                }
            }
            Value::List(l) => {
                let first = l.item(1).and_then(|x| match x {
                    Value::Word(w) => Some(w.text()),
                    _ => None,
                });
                if let Some(name) = first.as_deref().and_then(|t| t.strip_prefix(':')) {
                    let name = name.to_lowercase();
                    if l.len() == 1 {
                        // `[:name]` with nothing else is the rest parameter
                        tb.rest = Some(name);
                    } else {
                        let template = List::with_srcmap(
                            l.items[1..].to_vec(),
                            l.srcmap
                                .as_ref()
                                .map(|m| m[1..].to_vec())
                                .unwrap_or_else(|| vec![TokenSrc::default(); l.len() - 1]),
                        );
                        tb.formals.push(Formal {
                            name,
                            default: Some(template),
                        });
                        tb.formal_map.push(src);
                    }
                    return Ok(());
                }
            }
            _ => {}
        }
        Err(LogoError::new(ErrorCode::InvalidInput, ["to".to_string(), v.show_string()])
            .at(src.at))
    }

    /// Register the procedure's signature (empty body) so recursive and
    /// forward calls inside the body can resolve while it is being read
    fn ensure_signature(&mut self) -> Result<(), LogoError> {
        let Some(tb) = &mut self.pending_to else {
            return Ok(());
        };
        if tb.signature_done {
            return Ok(());
        }
        tb.signature_done = true;
        let proc = Rc::new(Procedure {
            name: tb.name.clone(),
            formals: tb.formals.clone(),
            rest: tb.rest.clone(),
            default_arity: arity_of(tb),
            body: List::empty(),
            formal_srcmap: Some(tb.formal_map.clone()),
            attrs: if tb.is_macro {
                ProcAttrs::MACRO
            } else {
                ProcAttrs::empty()
            },
            stamp: self.ws.next_stamp(),
        });
        debug!("registered signature of {} ({} formals)", proc.name, proc.formals.len());
        self.ws.define(proc);
        Ok(())
    }

    /// `end` seen at depth zero: slice out the body and replace the whole
    /// region by a Procedure value in the output stream
    fn finish_procedure(&mut self, at: SrcRef) -> Result<(), LogoError> {
        self.ensure_signature()?;
        let Some(tb) = self.pending_to.take() else {
            return Err(unexpected("end", at));
        };
        let default_arity = arity_of(&tb);
        let body = List::with_srcmap(tb.body, tb.body_map);
        let proc = Rc::new(Procedure {
            name: tb.name.clone(),
            default_arity,
            formals: tb.formals,
            rest: tb.rest,
            body,
            formal_srcmap: Some(tb.formal_map),
            attrs: if tb.is_macro {
                ProcAttrs::MACRO
            } else {
                ProcAttrs::empty()
            },
            stamp: self.ws.next_stamp(),
        });
        debug!("defined procedure {}", proc.name);
        self.ws.define(proc.clone());
        self.out.push(Value::Procedure(proc));
        self.out_map.push(TokenSrc::plain(tb.at));
        Ok(())
    }
}

fn arity_of(tb: &ToBuilder) -> usize {
    tb.explicit_arity
        .unwrap_or_else(|| tb.formals.iter().filter(|f| f.default.is_none()).count())
}

// ============================================================================
// parse_block: list-as-code re-tokenization
// ============================================================================

/// Re-tokenize an already-bracketed list for use as code
///
/// Words that came in through list brackets are still compound (`2+3` is
/// one word); this splits them into operator-level tokens, offsetting the
/// recorded source positions and skipping protected (bar/escape) ranges.
/// An `if … else …` pair is folded into a single `ifelse` token. The
/// result is cached on the list.
pub fn parse_block(list: &Rc<List>) -> Rc<List> {
    if let Some(cached) = list.parsed.borrow().as_ref() {
        return cached.clone();
    }

    let mut items: Vec<Value> = Vec::with_capacity(list.len());
    let mut map: Srcmap = Vec::with_capacity(list.len());
    let mut last_if: Option<usize> = None;

    for (idx, item) in list.items.iter().enumerate() {
        let src = list
            .srcmap
            .as_ref()
            .and_then(|m| m.get(idx))
            .cloned()
            .unwrap_or_default();
        match item {
            Value::Word(w) => {
                let text = w.text();
                for (piece, psrc) in split_word(&text, &src) {
                    let lowered = piece.to_lowercase();
                    if psrc.mask.is_empty() && lowered == "else" {
                        if let Some(fi) = last_if.take() {
                            items[fi] = Value::word("ifelse");
                            continue;
                        }
                    }
                    if psrc.mask.is_empty() && lowered == "if" {
                        last_if = Some(items.len());
                    }
                    items.push(Value::word(piece));
                    map.push(psrc);
                }
            }
            other => {
                items.push(other.clone());
                map.push(src);
            }
        }
    }

    let parsed = List::with_srcmap(items, map);
    *list.parsed.borrow_mut() = Some(parsed.clone());
    parsed
}

/// Split one compound word into operator-level tokens
///
/// Mirrors the lexer's code-mode rules: quoted words stay whole, masked
/// ranges never split, multi-character operators use lookahead, exponent
/// signs and operand-free leading minus glue to their number.
fn split_word(text: &str, src: &TokenSrc) -> SmallVec<[(String, TokenSrc); 1]> {
    let mut out: SmallVec<[(String, TokenSrc); 1]> = SmallVec::new();
    if text.starts_with('"') {
        out.push((text.to_string(), src.clone()));
        return out;
    }

    let chars: Vec<char> = text.chars().collect();
    let mut start = 0usize;
    let mut i = 0usize;

    let mut push_piece = |from: usize, to: usize, out: &mut SmallVec<[(String, TokenSrc); 1]>| {
        if from < to {
            let piece: String = chars[from..to].iter().collect();
            out.push((piece, sub_src(src, from, to)));
        }
    };

    while i < chars.len() {
        let c = chars[i];
        let op_char = matches!(c, '+' | '-' | '*' | '/' | '=' | '<' | '>' | '(' | ')');
        if !op_char || src.is_masked(i) {
            i += 1;
            continue;
        }
        // exponent sign inside a numeric literal
        if (c == '-' || c == '+') && sci_continues(&chars, start, i) {
            i += 1;
            continue;
        }
        // operand-free leading minus glued to a number
        if c == '-'
            && start == i
            && no_operand_before(&out)
            && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit() || *d == '.')
        {
            i += 1;
            continue;
        }
        push_piece(start, i, &mut out);
        let oplen = match (c, chars.get(i + 1)) {
            ('<', Some('=')) | ('<', Some('>')) | ('>', Some('=')) => 2,
            _ => 1,
        };
        let opstr: String = chars[i..i + oplen].iter().collect();
        out.push((opstr, sub_src(src, i, i + oplen)));
        i += oplen;
        start = i;
    }
    push_piece(start, chars.len(), &mut out);
    out
}

fn no_operand_before(out: &SmallVec<[(String, TokenSrc); 1]>) -> bool {
    match out.last() {
        None => true,
        Some((piece, src)) => {
            src.mask.is_empty()
                && (piece == "(" || Op::from_text(piece).is_some())
        }
    }
}

fn sci_continues(chars: &[char], start: usize, i: usize) -> bool {
    if i == start || !matches!(chars[i - 1], 'e' | 'E') {
        return false;
    }
    let mant = &chars[start..i - 1];
    let mant = if mant.first() == Some(&'-') { &mant[1..] } else { mant };
    !mant.is_empty()
        && mant.iter().all(|d| d.is_ascii_digit() || *d == '.')
        && mant.iter().any(|d| d.is_ascii_digit())
        && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())
}

/// Source metadata for a sub-range of a split word
fn sub_src(src: &TokenSrc, from: usize, to: usize) -> TokenSrc {
    let (from16, to16) = (from as u16, to as u16);
    TokenSrc {
        at: src.ref_of(from),
        mask: src
            .mask
            .iter()
            .filter(|&&(s, e)| e > from16 && s < to16)
            .map(|&(s, e)| (s.max(from16) - from16, e.min(to16) - from16))
            .collect(),
        escapes: src
            .escapes
            .iter()
            .filter(|&&(at, _)| at >= from16 && at < to16)
            .map(|&(at, n)| (at - from16, n))
            .collect(),
    }
}

#[cfg(test)]
mod tests;
