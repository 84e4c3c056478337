//! Tree-walking interpreter
//!
//! Evaluates parsed token streams directly, left to right, folding infix
//! operators by precedence climbing: after an operand, while the next
//! token is an operator binding tighter than the current minimum, consume
//! it, evaluate the right side at that operator's level, and fold.
//!
//! One [`Evaluator`] is one top-level evaluation context: it owns the
//! loop-counter stack and borrows the session, so interleaved suspensions
//! of sibling sessions cannot touch each other's state.

use crate::frontend::parser::parse_block;
use crate::frontend::{parse, tokenize, Lexed, Parsed};
use crate::runtime::except::{ErrorCode, EvalResult, Flow, LogoError};
use crate::runtime::primitives::{self, PrimFn, Primitive};
use crate::runtime::value::{List, ProcAttrs, Procedure, Value, Word};
use crate::runtime::workspace::Resolved;
use crate::util::config::ExecMode;
use crate::util::span::SrcRef;
use crate::vm::session::Session;
use crate::vm::LocalFuture;
use std::rc::Rc;
use tracing::debug;

pub use crate::frontend::lexer::Op;

/// Read cursor over a parsed token list
#[derive(Debug, Clone)]
pub struct Cursor {
    list: Rc<List>,
    pos: usize,
}

impl Cursor {
    /// Cursor over an already `parse_block`ed list
    pub fn new(parsed: Rc<List>) -> Self {
        Self { list: parsed, pos: 0 }
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.pos >= self.list.len()
    }

    #[inline]
    pub fn peek(&self) -> Option<&Value> {
        self.list.items.get(self.pos)
    }

    /// Source position of the next token
    pub fn next_src(&self) -> SrcRef {
        self.list
            .srcmap
            .as_ref()
            .and_then(|m| m.get(self.pos))
            .map(|t| t.at)
            .unwrap_or_else(SrcRef::dummy)
    }

    /// Look `n` tokens past the cursor without consuming
    pub fn peek_ahead(&self, n: usize) -> Option<&Value> {
        self.list.items.get(self.pos + n)
    }

    /// Is the next token a word with a protected (masked) range?
    pub fn next_masked(&self) -> bool {
        self.list
            .srcmap
            .as_ref()
            .and_then(|m| m.get(self.pos))
            .is_some_and(|t| !t.mask.is_empty())
    }

    #[inline]
    pub fn take(&mut self) -> Option<Value> {
        let v = self.list.items.get(self.pos).cloned();
        if v.is_some() {
            self.pos += 1;
        }
        v
    }

    /// The next token as an infix operator, if it is one
    pub fn peek_op(&self) -> Option<Op> {
        if self.next_masked() {
            return None;
        }
        match self.peek()? {
            Value::Word(Word::Text(t)) => Op::from_text(t),
            _ => None,
        }
    }
}

/// An evaluated operand plus the name of whatever produced it, for
/// "didn't output to" reporting
struct Opnd {
    value: Option<Value>,
    who: String,
}

/// One top-level evaluation context
pub struct Evaluator<'s> {
    pub s: &'s mut Session,
    /// Iteration counters of active `repeat`/`forever` loops
    pub loops: Vec<u64>,
}

fn dont_say(v: &Value) -> Flow {
    Flow::Err(LogoError::new(ErrorCode::DontSayWhatToDo, [v.show_string()]))
}

fn no_output(who: &str, to: &str) -> Flow {
    Flow::Err(LogoError::new(ErrorCode::NoOutput, [who, to]))
}

impl<'s> Evaluator<'s> {
    pub fn new(s: &'s mut Session) -> Self {
        Self { s, loops: Vec::new() }
    }

    /// Run a top-level stream; a trailing unconsumed value is an error
    pub async fn run_toplevel(&mut self, stream: &Rc<List>) -> EvalResult<()> {
        match self.run_list(stream).await? {
            None => Ok(()),
            Some(v) => Err(dont_say(&v)),
        }
    }

    /// Evaluate a list as code
    ///
    /// Returns the trailing expression value, if the stream ends with one;
    /// an unused value anywhere earlier raises `DontSayWhatToDo`.
    pub fn run_list<'a>(&'a mut self, list: &Rc<List>) -> LocalFuture<'a, EvalResult<Option<Value>>> {
        let parsed = parse_block(list);
        Box::pin(async move {
            let mut c = Cursor::new(parsed);
            let mut last: Option<Value> = None;
            while !c.at_end() {
                if let Some(v) = last.take() {
                    return Err(dont_say(&v));
                }
                last = self.statement(&mut c).await?;
            }
            Ok(last)
        })
    }

    /// Tokenize, parse and run a whole source text (used by `load`)
    pub async fn exec_source(&mut self, text: &str) -> EvalResult<()> {
        let index = self.s.add_source(text);
        let tokens = match tokenize(text, index) {
            Lexed::Complete(tokens) => tokens,
            Lexed::Incomplete => {
                return Err(Flow::err_with(ErrorCode::UnexpectedToken, ["end of file"]));
            }
        };
        match parse(&tokens, &mut self.s.ws).map_err(Flow::Err)? {
            Parsed::Complete(stream) => self.run_toplevel(&stream).await,
            Parsed::Incomplete => {
                Err(Flow::err_with(ErrorCode::UnexpectedToken, ["end of file"]))
            }
        }
    }

    async fn statement(&mut self, c: &mut Cursor) -> EvalResult<Option<Value>> {
        if let Some(Value::Procedure(p)) = c.peek() {
            // a `to … end` region the parser replaced in place
            let p = p.clone();
            c.take();
            self.s.ws.define(p);
            return Ok(None);
        }
        let opnd = self.expression(c, 0).await?;
        Ok(opnd.value)
    }

    // ------------------------------------------------------------------
    // Precedence climbing
    // ------------------------------------------------------------------

    fn expression<'a>(
        &'a mut self,
        c: &'a mut Cursor,
        min_prec: u8,
    ) -> LocalFuture<'a, EvalResult<Opnd>> {
        Box::pin(async move {
            let mut left = self.operand(c).await?;
            while let Some(op) = c.peek_op() {
                if op.precedence() <= min_prec {
                    break;
                }
                let at = c.next_src();
                c.take();
                let lv = left
                    .value
                    .take()
                    .ok_or_else(|| no_output(&left.who, op.text()))?;
                let rv = self.expression_value(c, op.precedence(), op.text()).await?;
                left = Opnd {
                    value: Some(apply_op(op, lv, rv, at)?),
                    who: op.text().to_string(),
                };
            }
            Ok(left)
        })
    }

    /// An expression that must produce a value (argument, right operand)
    pub async fn expression_value(
        &mut self,
        c: &mut Cursor,
        min_prec: u8,
        for_whom: &str,
    ) -> EvalResult<Value> {
        if c.at_end() {
            return Err(Flow::err_with(ErrorCode::NotEnoughInputs, [for_whom]));
        }
        let opnd = self.expression(c, min_prec).await?;
        opnd.value.ok_or_else(|| no_output(&opnd.who, for_whom))
    }

    fn operand<'a>(&'a mut self, c: &'a mut Cursor) -> LocalFuture<'a, EvalResult<Opnd>> {
        Box::pin(async move {
            let at = c.next_src();
            let Some(token) = c.take() else {
                return Err(Flow::err_with(ErrorCode::NotEnoughInputs, ["run"]));
            };
            match token {
                Value::List(l) => Ok(Opnd {
                    value: Some(Value::List(l)),
                    who: "[]".into(),
                }),
                Value::Array(a) => Ok(Opnd {
                    value: Some(Value::Array(a)),
                    who: "{}".into(),
                }),
                Value::Procedure(_) => {
                    Err(Flow::Err(LogoError::new(ErrorCode::CantUseHere, ["to"]).at(at)))
                }
                Value::Word(w) => self.word_operand(c, w, at).await,
            }
        })
    }

    async fn word_operand(&mut self, c: &mut Cursor, w: Word, at: SrcRef) -> EvalResult<Opnd> {
        let text = w.text();
        // literal word
        if let Some(body) = text.strip_prefix('"') {
            return Ok(Opnd {
                value: Some(Value::word(body.to_string())),
                who: "\"".into(),
            });
        }
        // variable reference
        if let Some(name) = text.strip_prefix(':').filter(|n| !n.is_empty()) {
            let v = self.s.ws.get_or_err(name).map_err(|f| f_at(f, at))?;
            return Ok(Opnd {
                value: Some(v),
                who: text.to_string(),
            });
        }
        // template slot: `?` is `?1`
        if text.starts_with('?')
            && (text.len() == 1 || text[1..].chars().all(|d| d.is_ascii_digit()))
        {
            let slot = if text.len() == 1 { "?1".to_string() } else { text.to_string() };
            let v = self.s.ws.get_or_err(&slot).map_err(|f| f_at(f, at))?;
            return Ok(Opnd {
                value: Some(v),
                who: text.to_string(),
            });
        }
        // numeric literal
        if let Some(n) = w.to_number() {
            return Ok(Opnd {
                value: Some(Value::num(n)),
                who: "number".into(),
            });
        }
        match &*text {
            "(" => self.paren(c, at).await,
            ")" => Err(Flow::Err(
                LogoError::new(ErrorCode::UnexpectedToken, [")"]).at(at),
            )),
            "-" => {
                // unary minus: binds tighter than any infix operator,
                // applying to the immediately following operand
                let opnd = self.operand(c).await?;
                let v = opnd.value.ok_or_else(|| no_output(&opnd.who, "-"))?;
                let n = v.as_number("-").map_err(|f| f_at(f, at))?;
                Ok(Opnd {
                    value: Some(Value::num(-n)),
                    who: "-".into(),
                })
            }
            "end" => Err(Flow::Err(
                LogoError::new(ErrorCode::CantUseHere, ["end"]).at(at),
            )),
            _ => self.call_name(c, &text, at).await,
        }
    }

    /// Call a procedure or primitive at its default arity
    async fn call_name(&mut self, c: &mut Cursor, name: &str, at: SrcRef) -> EvalResult<Opnd> {
        let lname = name.to_lowercase();
        if let Some(resolved) = self.s.ws.resolve(&lname) {
            let argc = resolved.proc.default_arity;
            let args = self.collect_args(c, argc, &lname).await?;
            let value = self.apply_procedure(resolved, args, at, false).await?;
            return Ok(Opnd { value, who: lname });
        }
        if let Some(prim) = primitives::lookup(&lname) {
            let args = self.collect_args(c, prim.def, prim.name).await?;
            let value = self.invoke_primitive(prim, args, at, true).await?;
            return Ok(Opnd { value, who: lname });
        }
        Err(Flow::Err(
            LogoError::new(ErrorCode::DontKnowHow, [lname]).at(at),
        ))
    }

    async fn collect_args(
        &mut self,
        c: &mut Cursor,
        n: usize,
        who: &str,
    ) -> EvalResult<Vec<Value>> {
        let mut args = Vec::with_capacity(n);
        for _ in 0..n {
            args.push(self.expression_value(c, 0, who).await?);
        }
        Ok(args)
    }

    /// `(name arg arg …)` explicit-arity call, or `(expression)` grouping
    async fn paren(&mut self, c: &mut Cursor, open_at: SrcRef) -> EvalResult<Opnd> {
        let callable = match c.peek() {
            Some(Value::Word(Word::Text(t))) => {
                !c.next_masked()
                    && !t.starts_with(['"', ':', '?'])
                    && Op::from_text(t).is_none()
                    && !matches!(&**t, "(" | ")")
                    && Word::Text(t.clone()).to_number().is_none()
            }
            _ => false,
        } && !c.next_masked();

        if callable {
            let at = c.next_src();
            let name = match c.take() {
                Some(Value::Word(w)) => w.text().to_lowercase(),
                _ => return Err(Flow::err(ErrorCode::Fatal)),
            };
            let mut args = Vec::new();
            loop {
                match c.peek() {
                    None => {
                        return Err(Flow::Err(
                            LogoError::new(ErrorCode::UnexpectedToken, ["end of input"])
                                .at(open_at),
                        ))
                    }
                    Some(Value::Word(Word::Text(t))) if &**t == ")" && !c.next_masked() => {
                        c.take();
                        break;
                    }
                    _ => args.push(self.expression_value(c, 0, &name).await?),
                }
            }
            let value = self.apply_named(&name, args, at, true, true).await?;
            return Ok(Opnd { value, who: name });
        }

        // grouped expression
        let opnd = self.expression(c, 0).await?;
        match c.peek() {
            Some(Value::Word(Word::Text(t))) if &**t == ")" && !c.next_masked() => {
                c.take();
                Ok(opnd)
            }
            Some(other) => Err(Flow::Err(LogoError::new(
                ErrorCode::UnexpectedToken,
                [other.show_string()],
            )
            .at(c.next_src()))),
            None => Err(Flow::Err(
                LogoError::new(ErrorCode::UnexpectedToken, ["end of input"]).at(open_at),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    /// Call by name with pre-evaluated arguments
    ///
    /// `explicit` marks paren-form calls, which check arity bounds.
    /// `stash` is false on the compiled path, where save/restore around
    /// STASH_LOCAL_VAR primitives is emitted as instructions instead.
    pub async fn apply_named(
        &mut self,
        name: &str,
        args: Vec<Value>,
        at: SrcRef,
        explicit: bool,
        stash: bool,
    ) -> EvalResult<Option<Value>> {
        let lname = name.to_lowercase();
        if let Some(resolved) = self.s.ws.resolve(&lname) {
            return self.apply_procedure(resolved, args, at, explicit).await;
        }
        if let Some(prim) = primitives::lookup(&lname) {
            if explicit {
                if args.len() < prim.min {
                    return Err(Flow::err_with(ErrorCode::NotEnoughInputs, [prim.name]));
                }
                if prim.max.is_some_and(|m| args.len() > m) {
                    return Err(Flow::err_with(ErrorCode::TooManyInputs, [prim.name]));
                }
            }
            return self.invoke_primitive(prim, args, at, stash).await;
        }
        Err(Flow::Err(
            LogoError::new(ErrorCode::DontKnowHow, [lname]).at(at),
        ))
    }

    /// Invoke a primitive, snapshotting locals around STASH_LOCAL_VAR
    ///
    /// The compiled path passes `stash = false`: the generator emits its
    /// own save/restore instructions around the call.
    pub fn invoke_primitive<'a>(
        &'a mut self,
        prim: &'static Primitive,
        args: Vec<Value>,
        at: SrcRef,
        stash: bool,
    ) -> LocalFuture<'a, EvalResult<Option<Value>>> {
        Box::pin(async move {
            let saved = (stash && prim.attrs.contains(ProcAttrs::STASH_LOCAL_VAR))
                .then(|| self.s.ws.snapshot_locals());
            let result = match &prim.f {
                PrimFn::Sync(f) => f(self, args),
                PrimFn::Async(f) => f(self, args).await,
            };
            if let Some(snapshot) = saved {
                self.s.ws.restore_locals(snapshot);
            }
            result.map_err(|f| f_at(f, at))
        })
    }

    /// Call a user procedure: bind formals, run the body, convert
    /// stop/output at this boundary, then expand macros in the caller
    pub fn apply_procedure<'a>(
        &'a mut self,
        resolved: Resolved,
        args: Vec<Value>,
        at: SrcRef,
        explicit: bool,
    ) -> LocalFuture<'a, EvalResult<Option<Value>>> {
        Box::pin(async move {
            let proc = resolved.proc.clone();
            if explicit {
                if args.len() < proc.min_arity() {
                    return Err(Flow::err_with(ErrorCode::NotEnoughInputs, [proc.name.as_str()]));
                }
                if proc.max_arity().is_some_and(|m| args.len() > m) {
                    return Err(Flow::err_with(ErrorCode::TooManyInputs, [proc.name.as_str()]));
                }
            }
            debug!("calling {} with {} args", proc.name, args.len());

            self.s.ws.push_frame(&proc.name, Some(at))?;
            self.s.ws.push_scope();
            let prev_class = self.s.ws.swap_dispatch_class(resolved.class.clone());

            let mut result = self.bind_and_run(&proc, args).await;
            if let Err(Flow::Err(e)) = &mut result {
                if e.chain.is_empty() {
                    e.chain = self.s.ws.trace();
                }
                if e.proc_name.is_none() {
                    e.proc_name = Some(proc.name.clone());
                }
            }

            self.s.ws.swap_dispatch_class(prev_class);
            self.s.ws.pop_scope();
            self.s.ws.pop_frame();

            let outcome = match result {
                Ok(Some(v)) => Err(dont_say(&v)),
                Ok(None) => Ok(None),
                Err(Flow::Stop) => Ok(None),
                Err(Flow::Output(v)) => Ok(Some(v)),
                Err(other) => Err(other),
            }?;

            if proc.attrs.contains(ProcAttrs::MACRO) {
                // a macro outputs a list that is re-run where it was called
                let expansion = match outcome {
                    Some(Value::List(l)) => l,
                    Some(other) => {
                        return Err(Flow::err_with(
                            ErrorCode::InvalidInput,
                            [proc.name.clone(), other.show_string()],
                        ))
                    }
                    None => return Err(no_output(&proc.name, "run")),
                };
                return self.run_list(&expansion).await;
            }
            Ok(outcome)
        })
    }

    async fn bind_and_run(
        &mut self,
        proc: &Rc<Procedure>,
        args: Vec<Value>,
    ) -> EvalResult<Option<Value>> {
        let mut supplied = args.into_iter();
        match self.s.config.exec.mode {
            ExecMode::Compile => {
                let chunk = self.chunk_for(proc);
                for (i, formal) in proc.formals.iter().enumerate() {
                    let value = match supplied.next() {
                        Some(v) => v,
                        None => match chunk.defaults.get(i).and_then(|d| d.clone()) {
                            Some(d) => self
                                .run_chunk(&d)
                                .await?
                                .ok_or_else(|| no_output(&formal.name, &proc.name))?,
                            None => {
                                return Err(Flow::err_with(
                                    ErrorCode::NotEnoughInputs,
                                    [proc.name.as_str()],
                                ))
                            }
                        },
                    };
                    self.s.ws.local_make(&formal.name, value);
                }
                self.bind_rest(proc, supplied)?;
                self.run_chunk(&chunk).await
            }
            ExecMode::Interpret => {
                for formal in &proc.formals {
                    let value = match supplied.next() {
                        Some(v) => v,
                        None => match &formal.default {
                            Some(tpl) => self
                                .run_list(tpl)
                                .await?
                                .ok_or_else(|| no_output(&formal.name, &proc.name))?,
                            None => {
                                return Err(Flow::err_with(
                                    ErrorCode::NotEnoughInputs,
                                    [proc.name.as_str()],
                                ))
                            }
                        },
                    };
                    self.s.ws.local_make(&formal.name, value);
                }
                self.bind_rest(proc, supplied)?;
                self.run_list(&proc.body).await
            }
        }
    }

    fn bind_rest(
        &mut self,
        proc: &Procedure,
        leftover: impl Iterator<Item = Value>,
    ) -> EvalResult<()> {
        let extra: Vec<Value> = leftover.collect();
        match &proc.rest {
            Some(rest) => {
                self.s
                    .ws
                    .local_make(rest, Value::List(List::from_values(extra)));
                Ok(())
            }
            None if extra.is_empty() => Ok(()),
            None => Err(Flow::err_with(ErrorCode::TooManyInputs, [proc.name.as_str()])),
        }
    }

    /// Fetch or build the compiled chunk for a procedure
    ///
    /// Keyed by the definition stamp, so redefinition naturally misses
    /// the cache and old chunks are never run again.
    pub fn chunk_for(&mut self, proc: &Rc<Procedure>) -> Rc<crate::vm::codegen::Chunk> {
        if let Some(chunk) = self.s.chunk_cache(proc.stamp) {
            return chunk;
        }
        debug!("compiling {}", proc.name);
        let chunk = crate::vm::codegen::compile_procedure(proc, &self.s.ws);
        self.s.cache_chunk(proc.stamp, chunk.clone());
        chunk
    }

    // ------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------

    /// Run a template (a code list, optionally `[[params] body…]`) with
    /// positional arguments bound as `?1 ?2 …`
    ///
    /// With `intercept` set (RETURNS_IN_LAMBDA callers), `stop` and
    /// `output` end the template instead of unwinding past the caller.
    pub fn run_template<'a>(
        &'a mut self,
        template: Rc<List>,
        args: Vec<Value>,
        who: &'a str,
        intercept: bool,
    ) -> LocalFuture<'a, EvalResult<Option<Value>>> {
        Box::pin(async move {
            let (body, names): (Rc<List>, Option<Vec<String>>) = match template.item(1) {
                Some(Value::List(params)) if template.len() >= 2 => {
                    let mut names = Vec::with_capacity(params.len());
                    for p in &params.items {
                        names.push(p.as_text(who)?.to_lowercase());
                    }
                    (
                        List::from_values(template.items[1..].to_vec()),
                        Some(names),
                    )
                }
                _ => (template.clone(), None),
            };

            self.s.ws.push_frame(who, None)?;
            self.s.ws.push_scope();
            match &names {
                Some(names) => {
                    for (name, value) in names.iter().zip(args.iter()) {
                        self.s.ws.local_make(name, value.clone());
                    }
                    if args.len() < names.len() {
                        self.s.ws.pop_scope();
                        self.s.ws.pop_frame();
                        return Err(Flow::err_with(ErrorCode::NotEnoughInputs, [who]));
                    }
                }
                None => {
                    for (i, value) in args.iter().enumerate() {
                        self.s.ws.local_make(&format!("?{}", i + 1), value.clone());
                    }
                }
            }

            let result = self.run_list(&body).await;
            self.s.ws.pop_scope();
            self.s.ws.pop_frame();

            match result {
                Err(Flow::Stop) if intercept => Ok(None),
                Err(Flow::Output(v)) if intercept => Ok(Some(v)),
                other => other,
            }
        })
    }
}

/// Attach a position to a flowing error if it has none
fn f_at(f: Flow, at: SrcRef) -> Flow {
    f.with_at(at)
}

/// Fold one infix operator application
pub fn apply_op(op: Op, left: Value, right: Value, at: SrcRef) -> EvalResult<Value> {
    let who = op.text();
    let value = match op {
        Op::Equal => Value::bool(left.equals(&right)),
        Op::NotEqual => Value::bool(!left.equals(&right)),
        Op::Sum | Op::Difference | Op::Product | Op::Quotient => {
            let (l, r) = (
                left.as_number(who).map_err(|f| f_at(f, at))?,
                right.as_number(who).map_err(|f| f_at(f, at))?,
            );
            let n = match op {
                Op::Sum => l + r,
                Op::Difference => l - r,
                Op::Product => l * r,
                Op::Quotient => {
                    if r == 0.0 {
                        return Err(Flow::Err(
                            LogoError::bare(ErrorCode::DivisionByZero).at(at),
                        ));
                    }
                    l / r
                }
                _ => 0.0,
            };
            Value::num(n)
        }
        Op::Less | Op::LessEqual | Op::Greater | Op::GreaterEqual => {
            let (l, r) = (
                left.as_number(who).map_err(|f| f_at(f, at))?,
                right.as_number(who).map_err(|f| f_at(f, at))?,
            );
            Value::bool(match op {
                Op::Less => l < r,
                Op::LessEqual => l <= r,
                Op::Greater => l > r,
                Op::GreaterEqual => l >= r,
                _ => false,
            })
        }
    };
    Ok(value)
}
