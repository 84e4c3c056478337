//! Console I/O primitives
//!
//! `readword`/`readlist` are the engine's blocking-input suspension
//! points: they await the input queue without blocking sibling sessions.

use super::{PrimFn, Primitive};
use crate::frontend::{parse, tokenize, Lexed, Parsed};
use crate::runtime::except::EvalResult;
use crate::runtime::value::{List, Value};
use crate::vm::interp::Evaluator;
use crate::vm::LocalFuture;
use std::rc::Rc;

type Out = EvalResult<Option<Value>>;

fn prim_print(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let text = args
        .iter()
        .map(Value::display_string)
        .collect::<Vec<_>>()
        .join(" ");
    ev.s.io.stdout(&text);
    Ok(None)
}

fn prim_show(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let text = args
        .iter()
        .map(Value::show_string)
        .collect::<Vec<_>>()
        .join(" ");
    ev.s.io.stdout(&text);
    Ok(None)
}

fn prim_type(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    for a in &args {
        ev.s.io.stdoutn(&a.display_string());
    }
    Ok(None)
}

fn prim_cleartext(ev: &mut Evaluator<'_>, _args: Vec<Value>) -> Out {
    ev.s.io.cleartext();
    Ok(None)
}

fn prim_readword<'a, 'b>(ev: &'a mut Evaluator<'b>, _args: Vec<Value>) -> LocalFuture<'a, Out> {
    Box::pin(async move {
        match ev.s.input.take_line().await {
            Some(line) => Ok(Some(Value::word(line))),
            None => Ok(Some(Value::empty_list())),
        }
    })
}

fn prim_readlist<'a, 'b>(ev: &'a mut Evaluator<'b>, _args: Vec<Value>) -> LocalFuture<'a, Out> {
    Box::pin(async move {
        match ev.s.input.take_line().await {
            Some(line) => Ok(Some(parse_input_line(ev, &line))),
            None => Ok(Some(Value::word(""))),
        }
    })
}

/// Parse one input line as list data; on any structural trouble the raw
/// line becomes a single-word list
fn parse_input_line(ev: &mut Evaluator<'_>, line: &str) -> Value {
    let wrapped = format!("[{}]", line);
    if let Lexed::Complete(tokens) = tokenize(&wrapped, u32::MAX) {
        if let Ok(Parsed::Complete(stream)) = parse(&tokens, &mut ev.s.ws) {
            if let Some(Value::List(l)) = stream.items.first() {
                if stream.len() == 1 {
                    return Value::List(l.clone());
                }
            }
        }
    }
    Value::List(List::from_values(vec![Value::word(line.to_string())]))
}

fn prim_load<'a, 'b>(ev: &'a mut Evaluator<'b>, args: Vec<Value>) -> LocalFuture<'a, Out> {
    Box::pin(async move {
        use crate::runtime::except::{ErrorCode, Flow};
        let path: Rc<str> = match args.first() {
            Some(v) => v.as_text("load")?,
            None => return Err(Flow::err_with(ErrorCode::NotEnoughInputs, ["load"])),
        };
        let text = ev
            .s
            .loader
            .read_file(&path)
            .map_err(|_| Flow::err_with(ErrorCode::CantOpenFile, [&*path]))?;
        ev.exec_source(&text).await?;
        Ok(None)
    })
}

pub static PRIMS: &[Primitive] = &[
    prim!("print" / &["pr"], (0, 1, None), PrimFn::Sync(prim_print)),
    prim!("show", (0, 1, None), PrimFn::Sync(prim_show)),
    prim!("type", (0, 1, None), PrimFn::Sync(prim_type)),
    prim!("cleartext" / &["ct"], (0, 0, Some(0)), PrimFn::Sync(prim_cleartext)),
    prim!("readword" / &["rw"], (0, 0, Some(0)), PrimFn::Async(prim_readword)),
    prim!("readlist" / &["rl"], (0, 0, Some(0)), PrimFn::Async(prim_readlist)),
    prim!("load", (1, 1, Some(1)), PrimFn::Async(prim_load)),
];
