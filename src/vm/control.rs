//! Shared control-structure semantics
//!
//! `repeat`, `for`, `while`, `catch` and friends exist twice in the
//! engine: as primitives the interpreter calls with list bodies, and as
//! instructions the code generator emits with compiled bodies. Both
//! paths funnel into the functions here, over an abstract [`Body`], so
//! the two implementations cannot drift apart.

use crate::frontend::parser::parse_block;
use crate::runtime::except::{ErrorCode, EvalResult, Flow, LogoError};
use crate::runtime::value::{List, Value};
use crate::vm::codegen::Chunk;
use crate::vm::interp::{Cursor, Evaluator};
use std::rc::Rc;

/// A runnable body: a token list (interpreted) or a compiled sub-chunk
#[derive(Debug, Clone)]
pub enum Body {
    List(Rc<List>),
    Chunk(Rc<Chunk>),
}

impl Evaluator<'_> {
    /// Run a body, returning its trailing value
    pub async fn run_body(&mut self, body: &Body) -> EvalResult<Option<Value>> {
        match body {
            Body::List(l) => self.run_list(l).await,
            Body::Chunk(c) => self.run_chunk(c).await,
        }
    }

    /// Run a body in statement position: a trailing value is an error
    async fn run_body_stmt(&mut self, body: &Body) -> EvalResult<()> {
        match self.run_body(body).await? {
            None => Ok(()),
            Some(v) => Err(Flow::Err(LogoError::new(
                ErrorCode::DontSayWhatToDo,
                [v.show_string()],
            ))),
        }
    }

    /// Run a body that must produce a value (loop conditions)
    async fn run_body_value(&mut self, body: &Body, who: &str) -> EvalResult<Value> {
        self.run_body(body).await?.ok_or_else(|| {
            Flow::Err(LogoError::new(ErrorCode::NoOutput, [who, who]))
        })
    }
}

/// `repeat n body` — body runs n times; `repcount` counts from 1
pub async fn repeat(ev: &mut Evaluator<'_>, count: f64, body: Body) -> EvalResult<()> {
    if count < 0.0 || count.fract() != 0.0 {
        return Err(Flow::err_with(
            ErrorCode::InvalidInput,
            ["repeat".to_string(), crate::runtime::value::format_number(count)],
        ));
    }
    ev.loops.push(0);
    let result = async {
        for i in 1..=count as u64 {
            if let Some(last) = ev.loops.last_mut() {
                *last = i;
            }
            ev.run_body_stmt(&body).await?;
        }
        Ok(())
    }
    .await;
    ev.loops.pop();
    result
}

/// `forever body` — runs until stop/output/throw unwinds out
pub async fn forever(ev: &mut Evaluator<'_>, body: Body) -> EvalResult<()> {
    ev.loops.push(0);
    let result = async {
        loop {
            if let Some(last) = ev.loops.last_mut() {
                *last += 1;
            }
            ev.run_body_stmt(&body).await?;
        }
    }
    .await;
    ev.loops.pop();
    result
}

/// `if cond body` — passes the body's trailing value through
pub async fn if_then(
    ev: &mut Evaluator<'_>,
    cond: bool,
    body: Body,
) -> EvalResult<Option<Value>> {
    if cond {
        ev.run_body(&body).await
    } else {
        Ok(None)
    }
}

/// `ifelse cond then else`
pub async fn if_else(
    ev: &mut Evaluator<'_>,
    cond: bool,
    then_body: Body,
    else_body: Body,
) -> EvalResult<Option<Value>> {
    if cond {
        ev.run_body(&then_body).await
    } else {
        ev.run_body(&else_body).await
    }
}

/// `while cond body` / `until cond body`
///
/// The condition body is re-run before every iteration and must output
/// a boolean.
pub async fn while_loop(
    ev: &mut Evaluator<'_>,
    cond: Body,
    body: Body,
    negate: bool,
) -> EvalResult<()> {
    let who = if negate { "until" } else { "while" };
    loop {
        let test = ev.run_body_value(&cond, who).await?.as_boolean(who)?;
        if test == negate {
            return Ok(());
        }
        ev.run_body_stmt(&body).await?;
    }
}

/// `for [var start limit step?] body`
///
/// Direction is inferred from start/limit ordering when no step is
/// given; the condition is re-checked after every step so the loop never
/// overshoots the bound in either direction.
pub async fn for_loop(ev: &mut Evaluator<'_>, spec: Rc<List>, body: Body) -> EvalResult<()> {
    let parsed = parse_block(&spec);
    let mut c = Cursor::new(parsed);
    let var = match c.take() {
        Some(Value::Word(w)) => {
            let t = w.text();
            t.strip_prefix(':').unwrap_or(&t).to_lowercase()
        }
        _ => {
            return Err(Flow::err_with(
                ErrorCode::InvalidInput,
                ["for".to_string(), Value::List(spec.clone()).show_string()],
            ))
        }
    };
    let start = ev.expression_value(&mut c, 0, "for").await?.as_number("for")?;
    let limit = ev.expression_value(&mut c, 0, "for").await?.as_number("for")?;
    let step = if c.at_end() {
        if start <= limit {
            1.0
        } else {
            -1.0
        }
    } else {
        ev.expression_value(&mut c, 0, "for").await?.as_number("for")?
    };

    let mut current = start;
    loop {
        let in_range = if step >= 0.0 {
            current <= limit
        } else {
            current >= limit
        };
        if !in_range {
            return Ok(());
        }
        ev.s.ws.local_make(&var, Value::num(current));
        ev.run_body_stmt(&body).await?;
        current += step;
    }
}

/// `catch tag body`
///
/// A matching `throw` yields its carried value; `catch "error` swallows
/// any error (recording it for the `error` primitive). Stop and output
/// are control signals and always pass through, as do non-matching tags.
pub async fn catch(
    ev: &mut Evaluator<'_>,
    tag: &str,
    body: Body,
) -> EvalResult<Option<Value>> {
    match ev.run_body(&body).await {
        Err(Flow::Throw { tag: thrown, value, .. }) if thrown.eq_ignore_ascii_case(tag) => {
            Ok(value)
        }
        Err(Flow::Err(e)) if tag.eq_ignore_ascii_case("error") => {
            ev.s.remember_error(e);
            Ok(None)
        }
        other => other,
    }
}
