//! Control-flow primitives
//!
//! Thin argument-unpacking shims over [`crate::vm::control`], which holds
//! the semantics shared with compiled code.

use super::{PrimFn, Primitive};
use crate::runtime::except::{ErrorCode, EvalResult, Flow};
use crate::runtime::value::{List, ProcAttrs, Value};
use crate::vm::control::{self, Body};
use crate::vm::interp::Evaluator;
use crate::vm::LocalFuture;
use std::rc::Rc;

type Out = EvalResult<Option<Value>>;

fn arg(args: &[Value], i: usize, who: &str) -> EvalResult<Value> {
    args.get(i)
        .cloned()
        .ok_or_else(|| Flow::err_with(ErrorCode::NotEnoughInputs, [who]))
}

fn prim_repeat<'a, 'b>(ev: &'a mut Evaluator<'b>, args: Vec<Value>) -> LocalFuture<'a, Out> {
    Box::pin(async move {
        let n = arg(&args, 0, "repeat")?.as_number("repeat")?;
        let body = arg(&args, 1, "repeat")?.as_list("repeat")?;
        control::repeat(ev, n, Body::List(body)).await?;
        Ok(None)
    })
}

fn prim_forever<'a, 'b>(ev: &'a mut Evaluator<'b>, args: Vec<Value>) -> LocalFuture<'a, Out> {
    Box::pin(async move {
        let body = arg(&args, 0, "forever")?.as_list("forever")?;
        control::forever(ev, Body::List(body)).await?;
        Ok(None)
    })
}

fn prim_repcount(ev: &mut Evaluator<'_>, _args: Vec<Value>) -> Out {
    let n = ev.loops.last().map(|&n| n as f64).unwrap_or(-1.0);
    Ok(Some(Value::num(n)))
}

fn prim_if<'a, 'b>(ev: &'a mut Evaluator<'b>, args: Vec<Value>) -> LocalFuture<'a, Out> {
    Box::pin(async move {
        let cond = arg(&args, 0, "if")?.as_boolean("if")?;
        let then_body = Body::List(arg(&args, 1, "if")?.as_list("if")?);
        match args.get(2) {
            // paren form with three inputs behaves as ifelse
            Some(else_arg) => {
                let else_body = Body::List(else_arg.as_list("if")?);
                control::if_else(ev, cond, then_body, else_body).await
            }
            None => control::if_then(ev, cond, then_body).await,
        }
    })
}

fn prim_ifelse<'a, 'b>(ev: &'a mut Evaluator<'b>, args: Vec<Value>) -> LocalFuture<'a, Out> {
    Box::pin(async move {
        let cond = arg(&args, 0, "ifelse")?.as_boolean("ifelse")?;
        let then_body = Body::List(arg(&args, 1, "ifelse")?.as_list("ifelse")?);
        let else_body = Body::List(arg(&args, 2, "ifelse")?.as_list("ifelse")?);
        control::if_else(ev, cond, then_body, else_body).await
    })
}

fn prim_test(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let flag = arg(&args, 0, "test")?.as_boolean("test")?;
    ev.s.ws.set_test(flag);
    Ok(None)
}

fn prim_iftrue<'a, 'b>(ev: &'a mut Evaluator<'b>, args: Vec<Value>) -> LocalFuture<'a, Out> {
    Box::pin(async move { run_tested(ev, args, true).await })
}

fn prim_iffalse<'a, 'b>(ev: &'a mut Evaluator<'b>, args: Vec<Value>) -> LocalFuture<'a, Out> {
    Box::pin(async move { run_tested(ev, args, false).await })
}

async fn run_tested(ev: &mut Evaluator<'_>, args: Vec<Value>, wanted: bool) -> Out {
    let who = if wanted { "iftrue" } else { "iffalse" };
    let body = Body::List(arg(&args, 0, who)?.as_list(who)?);
    let Some(flag) = ev.s.ws.get_test() else {
        return Err(Flow::err_with(ErrorCode::CantUseHere, [who]));
    };
    control::if_then(ev, flag == wanted, body).await
}

fn prim_while<'a, 'b>(ev: &'a mut Evaluator<'b>, args: Vec<Value>) -> LocalFuture<'a, Out> {
    Box::pin(async move {
        let cond = Body::List(arg(&args, 0, "while")?.as_list("while")?);
        let body = Body::List(arg(&args, 1, "while")?.as_list("while")?);
        control::while_loop(ev, cond, body, false).await?;
        Ok(None)
    })
}

fn prim_until<'a, 'b>(ev: &'a mut Evaluator<'b>, args: Vec<Value>) -> LocalFuture<'a, Out> {
    Box::pin(async move {
        let cond = Body::List(arg(&args, 0, "until")?.as_list("until")?);
        let body = Body::List(arg(&args, 1, "until")?.as_list("until")?);
        control::while_loop(ev, cond, body, true).await?;
        Ok(None)
    })
}

fn prim_for<'a, 'b>(ev: &'a mut Evaluator<'b>, args: Vec<Value>) -> LocalFuture<'a, Out> {
    Box::pin(async move {
        let spec = arg(&args, 0, "for")?.as_list("for")?;
        let body = Body::List(arg(&args, 1, "for")?.as_list("for")?);
        control::for_loop(ev, spec, body).await?;
        Ok(None)
    })
}

fn prim_run<'a, 'b>(ev: &'a mut Evaluator<'b>, args: Vec<Value>) -> LocalFuture<'a, Out> {
    Box::pin(async move {
        let body = arg(&args, 0, "run")?.as_list("run")?;
        ev.run_list(&body).await
    })
}

fn prim_runresult<'a, 'b>(ev: &'a mut Evaluator<'b>, args: Vec<Value>) -> LocalFuture<'a, Out> {
    Box::pin(async move {
        let body = arg(&args, 0, "runresult")?.as_list("runresult")?;
        let items = match ev.run_list(&body).await? {
            Some(v) => vec![v],
            None => Vec::new(),
        };
        Ok(Some(Value::List(List::from_values(items))))
    })
}

fn prim_apply<'a, 'b>(ev: &'a mut Evaluator<'b>, args: Vec<Value>) -> LocalFuture<'a, Out> {
    Box::pin(async move {
        let template = arg(&args, 0, "apply")?;
        let inputs = arg(&args, 1, "apply")?.as_list("apply")?;
        invoke_template(ev, template, inputs.items.clone(), "apply").await
    })
}

fn prim_invoke<'a, 'b>(ev: &'a mut Evaluator<'b>, args: Vec<Value>) -> LocalFuture<'a, Out> {
    Box::pin(async move {
        let mut args = args;
        if args.is_empty() {
            return Err(Flow::err_with(ErrorCode::NotEnoughInputs, ["invoke"]));
        }
        let template = args.remove(0);
        invoke_template(ev, template, args, "invoke").await
    })
}

/// Shared by `apply`/`invoke`: a word names a procedure, a list is a
/// lambda run with `?` slots (or explicit parameters)
async fn invoke_template(
    ev: &mut Evaluator<'_>,
    template: Value,
    inputs: Vec<Value>,
    who: &str,
) -> Out {
    match template {
        Value::List(tpl) => ev.run_template(tpl, inputs, who, true).await,
        Value::Word(w) => {
            let name = w.text();
            ev.apply_named(&name, inputs, crate::util::span::SrcRef::dummy(), true, true)
                .await
        }
        other => Err(Flow::err_with(
            ErrorCode::InvalidInput,
            [who.to_string(), other.show_string()],
        )),
    }
}

fn prim_foreach<'a, 'b>(ev: &'a mut Evaluator<'b>, args: Vec<Value>) -> LocalFuture<'a, Out> {
    Box::pin(async move {
        let items = arg(&args, 0, "foreach")?;
        let template = arg(&args, 1, "foreach")?.as_list("foreach")?;
        let items: Vec<Value> = match items {
            Value::List(l) => l.items.clone(),
            Value::Word(w) => w
                .text()
                .chars()
                .map(|c| Value::word(c.to_string()))
                .collect(),
            other => {
                return Err(Flow::err_with(
                    ErrorCode::InvalidInput,
                    ["foreach".to_string(), other.show_string()],
                ))
            }
        };
        for item in items {
            ev.run_template(template.clone(), vec![item], "foreach", true)
                .await?;
        }
        Ok(None)
    })
}

fn prim_catch<'a, 'b>(ev: &'a mut Evaluator<'b>, args: Vec<Value>) -> LocalFuture<'a, Out> {
    Box::pin(async move {
        let tag = arg(&args, 0, "catch")?.as_text("catch")?;
        let body = Body::List(arg(&args, 1, "catch")?.as_list("catch")?);
        control::catch(ev, &tag, body).await
    })
}

fn prim_throw(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let tag = arg(&args, 0, "throw")?.as_text("throw")?;
    Err(Flow::Throw {
        tag: Rc::from(&*tag),
        value: args.get(1).cloned(),
        from: ev.s.ws.current_proc().map(str::to_string),
    })
}

fn prim_error(ev: &mut Evaluator<'_>, _args: Vec<Value>) -> Out {
    let items = match ev.s.take_error() {
        Some(e) => vec![
            Value::num(e.code.number() as f64),
            Value::word(e.render()),
            e.proc_name
                .map(Value::word)
                .unwrap_or_else(Value::empty_list),
        ],
        None => Vec::new(),
    };
    Ok(Some(Value::List(List::from_values(items))))
}

fn prim_stop(_ev: &mut Evaluator<'_>, _args: Vec<Value>) -> Out {
    Err(Flow::Stop)
}

fn prim_output(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    Err(Flow::Output(arg(&args, 0, "output")?))
}

fn prim_ignore(_ev: &mut Evaluator<'_>, _args: Vec<Value>) -> Out {
    Ok(None)
}

fn prim_bye(_ev: &mut Evaluator<'_>, _args: Vec<Value>) -> Out {
    Err(Flow::Bye)
}

fn prim_wait<'a, 'b>(_ev: &'a mut Evaluator<'b>, args: Vec<Value>) -> LocalFuture<'a, Out> {
    Box::pin(async move {
        let ticks = arg(&args, 0, "wait")?.as_number("wait")?;
        if ticks < 0.0 {
            return Err(Flow::err_with(
                ErrorCode::InvalidInput,
                ["wait".to_string(), crate::runtime::value::format_number(ticks)],
            ));
        }
        // ticks are sixtieths of a second
        tokio::time::sleep(std::time::Duration::from_secs_f64(ticks / 60.0)).await;
        Ok(None)
    })
}

pub static PRIMS: &[Primitive] = &[
    prim!("repeat", (2, 2, Some(2)), PrimFn::Async(prim_repeat)),
    prim!("forever", (1, 1, Some(1)), PrimFn::Async(prim_forever)),
    prim!("repcount", (0, 0, Some(0)), PrimFn::Sync(prim_repcount)),
    prim!("if", (2, 2, Some(3)), PrimFn::Async(prim_if)),
    prim!("ifelse", (3, 3, Some(3)), PrimFn::Async(prim_ifelse)),
    prim!("test", (1, 1, Some(1)), PrimFn::Sync(prim_test)),
    prim!("iftrue" / &["ift"], (1, 1, Some(1)), PrimFn::Async(prim_iftrue)),
    prim!("iffalse" / &["iff"], (1, 1, Some(1)), PrimFn::Async(prim_iffalse)),
    prim!("while", (2, 2, Some(2)), PrimFn::Async(prim_while)),
    prim!("until", (2, 2, Some(2)), PrimFn::Async(prim_until)),
    prim!(
        "for",
        (2, 2, Some(2)),
        PrimFn::Async(prim_for),
        ProcAttrs::STASH_LOCAL_VAR
    ),
    prim!("run", (1, 1, Some(1)), PrimFn::Async(prim_run)),
    prim!("runresult", (1, 1, Some(1)), PrimFn::Async(prim_runresult)),
    prim!(
        "apply",
        (2, 2, Some(2)),
        PrimFn::Async(prim_apply),
        ProcAttrs::RETURNS_IN_LAMBDA
    ),
    prim!(
        "invoke",
        (1, 2, None),
        PrimFn::Async(prim_invoke),
        ProcAttrs::RETURNS_IN_LAMBDA
    ),
    prim!(
        "foreach",
        (2, 2, Some(2)),
        PrimFn::Async(prim_foreach),
        ProcAttrs::RETURNS_IN_LAMBDA
    ),
    prim!("catch", (2, 2, Some(2)), PrimFn::Async(prim_catch)),
    prim!("throw", (1, 1, Some(2)), PrimFn::Sync(prim_throw)),
    prim!("error", (0, 0, Some(0)), PrimFn::Sync(prim_error)),
    prim!("stop", (0, 0, Some(0)), PrimFn::Sync(prim_stop)),
    prim!("output" / &["op"], (1, 1, Some(1)), PrimFn::Sync(prim_output)),
    prim!("ignore", (1, 1, Some(1)), PrimFn::Sync(prim_ignore)),
    prim!("bye", (0, 0, Some(0)), PrimFn::Sync(prim_bye)),
    prim!("wait", (1, 1, Some(1)), PrimFn::Async(prim_wait)),
];
