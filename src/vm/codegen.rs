//! Code generator
//!
//! 把一个已解析的过程编译为缓存的指令块。生成的代码是后缀形式：参数先逐个
//! 求值压入显式操作数栈，然后才发出调用，因此任何一条指令都可以在挂起点
//! `await` 而不需要改写外层表达式。
//!
//! Control primitives whose body arguments are literal lists compile into
//! nested sub-chunks; dynamic bodies fall back to the generic call path,
//! which routes through the same primitive implementations the
//! interpreter uses. Around calls to STASH_LOCAL_VAR primitives the
//! generator emits explicit save/restore of the live local bindings.
//!
//! A chunk is compiled once per procedure definition and cached under the
//! definition stamp; any redefinition in the workspace advances its
//! generation and drops the cache.

use crate::frontend::lexer::Op;
use crate::frontend::parser::parse_block;
use crate::runtime::except::ErrorCode;
use crate::runtime::primitives;
use crate::runtime::value::{List, ProcAttrs, Procedure, Value, Word};
use crate::runtime::workspace::Workspace;
use crate::util::span::SrcRef;
use crate::vm::interp::Cursor;
use std::rc::Rc;

/// One compiled instruction
///
/// The operand stack holds `(Option<Value>, who)` slots: calls push their
/// (possibly absent) result, consumers validate presence and report
/// "didn't output to" with the producer's name.
#[derive(Debug, Clone)]
pub enum Insn {
    /// Push a constant
    Const(u16),
    /// Push a variable's value (name in the constant table)
    Load { name: u16, at: SrcRef },
    /// Define a procedure value carried as a constant
    Define(u16),
    /// Push an absent value (statements that never produce one)
    PushNone { who: u16 },
    /// Negate the top of stack
    Neg { who: u16, at: SrcRef },
    /// Fold one infix operator over the top two slots
    Bin { op: Op, who: u16, at: SrcRef },
    /// Call in expression position; result is validated by the consumer
    CallExpr { name: u16, argc: u8, paren: bool, at: SrcRef },
    /// Call in statement position
    CallStmt { name: u16, argc: u8, paren: bool, at: SrcRef },
    /// Snapshot the innermost scope (before a STASH_LOCAL_VAR call)
    SaveLocals,
    /// Restore the matching snapshot
    RestoreLocals,
    /// Discard a statement result; a present value is `DontSayWhatToDo`
    Sink,
    /// Pop the final statement's result as the chunk's return value
    ReturnTail,
    /// `repeat` with a compiled body; count on the stack
    Repeat { body: u16, who: u16, at: SrcRef },
    /// `forever` with a compiled body
    Forever { body: u16, who: u16, at: SrcRef },
    /// `if` with a compiled body; condition on the stack
    IfTrue { body: u16, who: u16, at: SrcRef },
    /// `ifelse` with compiled branches; condition on the stack
    IfElse { then_body: u16, else_body: u16, who: u16, at: SrcRef },
    /// `while`/`until` with compiled condition and body chunks
    WhileLoop { cond: u16, body: u16, negate: bool, who: u16, at: SrcRef },
    /// `for` with its control list as a constant and a compiled body
    ForLoop { spec: u16, body: u16, who: u16, at: SrcRef },
    /// `catch` with a compiled body; tag on the stack
    CatchTag { body: u16, who: u16, at: SrcRef },
    /// Structural error discovered at compile time, raised when reached
    Fail { code: ErrorCode, arg: u16, at: SrcRef },
}

/// A compiled procedure body or block
#[derive(Debug)]
pub struct Chunk {
    /// Name of the procedure this chunk belongs to (for diagnostics)
    pub name: String,
    pub code: Vec<Insn>,
    pub consts: Vec<Value>,
    /// Nested blocks: control bodies and conditions
    pub subs: Vec<Rc<Chunk>>,
    /// Compiled default-value templates, parallel to the formals
    pub defaults: Vec<Option<Rc<Chunk>>>,
}

/// Compile a procedure into a chunk, default templates included
pub fn compile_procedure(proc: &Rc<Procedure>, ws: &Workspace) -> Rc<Chunk> {
    let mut chunk = compile_raw(&proc.body, &proc.name, ws);
    chunk.defaults = proc
        .formals
        .iter()
        .map(|f| {
            f.default
                .as_ref()
                .map(|tpl| Rc::new(compile_raw(tpl, &proc.name, ws)))
        })
        .collect();
    Rc::new(chunk)
}

/// Compile a token list as a block of statements
///
/// The block's trailing expression value, if any, becomes the chunk's
/// return value, mirroring the interpreter's stream semantics.
pub fn compile_block(list: &Rc<List>, name: &str, ws: &Workspace) -> Rc<Chunk> {
    Rc::new(compile_raw(list, name, ws))
}

fn compile_raw(list: &Rc<List>, name: &str, ws: &Workspace) -> Chunk {
    let parsed = parse_block(list);
    let mut comp = Compiler {
        name: name.to_string(),
        ws,
        code: Vec::new(),
        consts: Vec::new(),
        subs: Vec::new(),
    };
    let mut cursor = Cursor::new(parsed);
    comp.gen_statements(&mut cursor);
    Chunk {
        name: comp.name,
        code: comp.code,
        consts: comp.consts,
        subs: comp.subs,
        defaults: Vec::new(),
    }
}

/// Compilation stops at a structural error; the emitted `Fail` raises it
/// at run time, after any side effects that precede it
struct Abort;

type Gen<T> = Result<T, Abort>;

struct Compiler<'w> {
    name: String,
    ws: &'w Workspace,
    code: Vec<Insn>,
    consts: Vec<Value>,
    subs: Vec<Rc<Chunk>>,
}

impl Compiler<'_> {
    fn konst(&mut self, v: Value) -> u16 {
        self.consts.push(v);
        (self.consts.len() - 1) as u16
    }

    fn word_const(&mut self, text: &str) -> u16 {
        self.konst(Value::word(text.to_string()))
    }

    fn sub_block(&mut self, list: &Rc<List>) -> u16 {
        let chunk = Rc::new(compile_raw(list, &self.name.clone(), self.ws));
        self.subs.push(chunk);
        (self.subs.len() - 1) as u16
    }

    fn fail(&mut self, code: ErrorCode, arg: &str, at: SrcRef) -> Abort {
        let idx = self.word_const(arg);
        self.code.push(Insn::Fail { code, arg: idx, at });
        Abort
    }

    fn gen_statements(&mut self, c: &mut Cursor) {
        while !c.at_end() {
            if self.gen_statement(c).is_err() {
                // structural error; everything past it is unreachable
                return;
            }
            if c.at_end() {
                self.code.push(Insn::ReturnTail);
            } else {
                self.code.push(Insn::Sink);
            }
        }
    }

    fn gen_statement(&mut self, c: &mut Cursor) -> Gen<()> {
        if let Some(Value::Procedure(p)) = c.peek() {
            let p = p.clone();
            c.take();
            let idx = self.konst(Value::Procedure(p));
            self.code.push(Insn::Define(idx));
            let who = self.word_const("to");
            self.code.push(Insn::PushNone { who });
            return Ok(());
        }
        self.gen_expression(c, 0, true)
    }

    /// Compile one expression with precedence climbing
    ///
    /// In statement position the top-level call, if the expression is one
    /// and no operator folded over it, becomes a `CallStmt`.
    fn gen_expression(&mut self, c: &mut Cursor, min_prec: u8, stmt_top: bool) -> Gen<()> {
        let mut top_call = self.gen_operand(c)?;
        while let Some(op) = c.peek_op() {
            if op.precedence() <= min_prec {
                break;
            }
            let op_at = c.next_src();
            c.take();
            self.gen_expression(c, op.precedence(), false)?;
            let who = self.word_const(op.text());
            self.code.push(Insn::Bin { op, who, at: op_at });
            top_call = None;
        }
        if stmt_top {
            if let Some(i) = top_call {
                if let Insn::CallExpr { name, argc, paren, at } = &self.code[i] {
                    let (name, argc, paren, at) = (*name, *argc, *paren, *at);
                    self.code[i] = Insn::CallStmt { name, argc, paren, at };
                }
            }
        }
        Ok(())
    }

    /// Compile one operand; returns the index of its top-level call
    /// instruction when the operand is a plain call
    fn gen_operand(&mut self, c: &mut Cursor) -> Gen<Option<usize>> {
        let at = c.next_src();
        let Some(token) = c.take() else {
            let name = self.name.clone();
            return Err(self.fail(ErrorCode::NotEnoughInputs, &name, at));
        };
        match token {
            Value::List(l) => {
                let idx = self.konst(Value::List(l));
                self.code.push(Insn::Const(idx));
                Ok(None)
            }
            Value::Array(a) => {
                let idx = self.konst(Value::Array(a));
                self.code.push(Insn::Const(idx));
                Ok(None)
            }
            Value::Procedure(_) => Err(self.fail(ErrorCode::CantUseHere, "to", at)),
            Value::Word(w) => self.gen_word(c, w, at),
        }
    }

    fn gen_word(&mut self, c: &mut Cursor, w: Word, at: SrcRef) -> Gen<Option<usize>> {
        let text = w.text();
        if let Some(body) = text.strip_prefix('"') {
            let idx = self.konst(Value::word(body.to_string()));
            self.code.push(Insn::Const(idx));
            return Ok(None);
        }
        if let Some(name) = text.strip_prefix(':').filter(|n| !n.is_empty()) {
            let idx = self.word_const(&name.to_lowercase());
            self.code.push(Insn::Load { name: idx, at });
            return Ok(None);
        }
        if text.starts_with('?')
            && (text.len() == 1 || text[1..].chars().all(|d| d.is_ascii_digit()))
        {
            let slot = if text.len() == 1 { "?1".to_string() } else { text.to_string() };
            let idx = self.word_const(&slot);
            self.code.push(Insn::Load { name: idx, at });
            return Ok(None);
        }
        if let Some(n) = w.to_number() {
            let idx = self.konst(Value::num(n));
            self.code.push(Insn::Const(idx));
            return Ok(None);
        }
        match &*text {
            "(" => self.gen_paren(c, at),
            ")" => Err(self.fail(ErrorCode::UnexpectedToken, ")", at)),
            "end" => Err(self.fail(ErrorCode::CantUseHere, "end", at)),
            "-" => {
                self.gen_operand(c)?;
                let who = self.word_const("-");
                self.code.push(Insn::Neg { who, at });
                Ok(None)
            }
            _ => self.gen_call(c, &text.to_lowercase(), at),
        }
    }

    fn gen_paren(&mut self, c: &mut Cursor, open_at: SrcRef) -> Gen<Option<usize>> {
        let callable = !c.next_masked()
            && matches!(c.peek(), Some(Value::Word(Word::Text(t)))
                if !t.starts_with(['"', ':', '?'])
                    && Op::from_text(t).is_none()
                    && !matches!(&**t, "(" | ")")
                    && Word::Text(t.clone()).to_number().is_none());

        if callable {
            let call_at = c.next_src();
            let name = match c.take() {
                Some(Value::Word(w)) => w.text().to_lowercase(),
                _ => return Err(self.fail(ErrorCode::UnexpectedToken, "(", open_at)),
            };
            let mut argc: u8 = 0;
            loop {
                match c.peek() {
                    None => {
                        return Err(self.fail(
                            ErrorCode::UnexpectedToken,
                            "end of input",
                            open_at,
                        ))
                    }
                    Some(Value::Word(Word::Text(t))) if &**t == ")" && !c.next_masked() => {
                        c.take();
                        break;
                    }
                    _ => {
                        self.gen_expression(c, 0, false)?;
                        argc += 1;
                    }
                }
            }
            Ok(Some(self.emit_call(&name, argc, true, call_at)))
        } else {
            self.gen_expression(c, 0, false)?;
            match c.peek() {
                Some(Value::Word(Word::Text(t))) if &**t == ")" && !c.next_masked() => {
                    c.take();
                    Ok(None)
                }
                _ => Err(self.fail(ErrorCode::UnexpectedToken, ")", open_at)),
            }
        }
    }

    /// Compile a call at default arity, turning control primitives with
    /// literal list bodies into dedicated instructions
    ///
    /// When a special form's body turns out not to be a literal list,
    /// the arguments compiled so far stay on the stack and the generic
    /// call path finishes the job at the same positions.
    fn gen_call(&mut self, c: &mut Cursor, name: &str, at: SrcRef) -> Gen<Option<usize>> {
        let mut compiled_args = 0usize;
        match name {
            "repeat" | "forever" => {
                if name == "repeat" {
                    self.gen_expression(c, 0, false)?;
                    compiled_args = 1;
                }
                if let Some(body_list) = peek_literal(c, 0) {
                    c.take();
                    let body = self.sub_block(&body_list);
                    let who = self.word_const(name);
                    self.code.push(if name == "repeat" {
                        Insn::Repeat { body, who, at }
                    } else {
                        Insn::Forever { body, who, at }
                    });
                    return Ok(None);
                }
            }
            "if" => {
                self.gen_expression(c, 0, false)?;
                compiled_args = 1;
                if let Some(body_list) = peek_literal(c, 0) {
                    c.take();
                    let body = self.sub_block(&body_list);
                    let who = self.word_const("if");
                    self.code.push(Insn::IfTrue { body, who, at });
                    return Ok(None);
                }
            }
            "ifelse" => {
                self.gen_expression(c, 0, false)?;
                compiled_args = 1;
                if let (Some(then_list), Some(else_list)) =
                    (peek_literal(c, 0), peek_literal(c, 1))
                {
                    c.take();
                    c.take();
                    let then_body = self.sub_block(&then_list);
                    let else_body = self.sub_block(&else_list);
                    let who = self.word_const("ifelse");
                    self.code.push(Insn::IfElse { then_body, else_body, who, at });
                    return Ok(None);
                }
            }
            "while" | "until" => {
                if let (Some(cond_list), Some(body_list)) =
                    (peek_literal(c, 0), peek_literal(c, 1))
                {
                    c.take();
                    c.take();
                    let cond = self.sub_block(&cond_list);
                    let body = self.sub_block(&body_list);
                    let who = self.word_const(name);
                    self.code.push(Insn::WhileLoop {
                        cond,
                        body,
                        negate: name == "until",
                        who,
                        at,
                    });
                    return Ok(None);
                }
            }
            "for" => {
                if let (Some(spec_list), Some(body_list)) =
                    (peek_literal(c, 0), peek_literal(c, 1))
                {
                    c.take();
                    c.take();
                    let spec = self.konst(Value::List(spec_list));
                    let body = self.sub_block(&body_list);
                    let who = self.word_const("for");
                    // `for` is STASH_LOCAL_VAR: the loop variable it binds
                    // in the caller's scope must not survive the loop
                    self.code.push(Insn::SaveLocals);
                    self.code.push(Insn::ForLoop { spec, body, who, at });
                    self.code.push(Insn::RestoreLocals);
                    return Ok(None);
                }
            }
            "catch" => {
                self.gen_expression(c, 0, false)?;
                compiled_args = 1;
                if let Some(body_list) = peek_literal(c, 0) {
                    c.take();
                    let body = self.sub_block(&body_list);
                    let who = self.word_const("catch");
                    self.code.push(Insn::CatchTag { body, who, at });
                    return Ok(None);
                }
            }
            _ => {}
        }
        self.gen_generic_call(c, name, at, compiled_args)
    }

    fn gen_generic_call(
        &mut self,
        c: &mut Cursor,
        name: &str,
        at: SrcRef,
        compiled_args: usize,
    ) -> Gen<Option<usize>> {
        // arity resolved against the workspace as it stands at compile
        // time; a name unknown until run time compiles at zero arity and
        // raises DontKnowHow when reached
        let argc = self
            .ws
            .resolve(name)
            .map(|r| r.proc.default_arity)
            .or_else(|| primitives::lookup(name).map(|p| p.def))
            .unwrap_or(0)
            .max(compiled_args);
        for _ in compiled_args..argc {
            self.gen_expression(c, 0, false)?;
        }
        Ok(Some(self.emit_call(name, argc as u8, false, at)))
    }

    fn emit_call(&mut self, name: &str, argc: u8, paren: bool, at: SrcRef) -> usize {
        let stash = primitives::lookup(name)
            .is_some_and(|p| p.attrs.contains(ProcAttrs::STASH_LOCAL_VAR));
        if stash {
            self.code.push(Insn::SaveLocals);
        }
        let name_idx = self.word_const(name);
        let idx = self.code.len();
        self.code.push(Insn::CallExpr { name: name_idx, argc, paren, at });
        if stash {
            self.code.push(Insn::RestoreLocals);
        }
        idx
    }
}

fn peek_literal(c: &Cursor, ahead: usize) -> Option<Rc<List>> {
    match c.peek_ahead(ahead) {
        Some(Value::List(l)) => Some(l.clone()),
        _ => None,
    }
}
