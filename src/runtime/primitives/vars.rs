//! Variable and property-list primitives

use super::{PrimFn, Primitive};
use crate::runtime::except::{ErrorCode, EvalResult, Flow};
use crate::runtime::value::{List, Value};
use crate::vm::interp::Evaluator;

type Out = EvalResult<Option<Value>>;

fn arg(args: &[Value], i: usize, who: &str) -> EvalResult<Value> {
    args.get(i)
        .cloned()
        .ok_or_else(|| Flow::err_with(ErrorCode::NotEnoughInputs, [who]))
}

fn prim_make(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let name = arg(&args, 0, "make")?.as_text("make")?;
    let value = arg(&args, 1, "make")?;
    ev.s.ws.make(&name, value);
    Ok(None)
}

/// `name value varname` — make with the operands reversed
fn prim_name(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let value = arg(&args, 0, "name")?;
    let name = arg(&args, 1, "name")?.as_text("name")?;
    ev.s.ws.make(&name, value);
    Ok(None)
}

fn prim_local(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    for a in &args {
        match a {
            Value::List(l) => {
                for item in &l.items {
                    ev.s.ws.local(&item.as_text("local")?);
                }
            }
            other => ev.s.ws.local(&other.as_text("local")?),
        }
    }
    Ok(None)
}

fn prim_localmake(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let name = arg(&args, 0, "localmake")?.as_text("localmake")?;
    let value = arg(&args, 1, "localmake")?;
    ev.s.ws.local_make(&name, value);
    Ok(None)
}

fn prim_thing(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let name = arg(&args, 0, "thing")?.as_text("thing")?;
    Ok(Some(ev.s.ws.get_or_err(&name)?))
}

fn prim_pprop(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let list = arg(&args, 0, "pprop")?.as_text("pprop")?;
    let prop = arg(&args, 1, "pprop")?.as_text("pprop")?;
    let value = arg(&args, 2, "pprop")?;
    ev.s.ws.put_prop(&list, &prop, value);
    Ok(None)
}

fn prim_gprop(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let list = arg(&args, 0, "gprop")?.as_text("gprop")?;
    let prop = arg(&args, 1, "gprop")?.as_text("gprop")?;
    Ok(Some(ev.s.ws.get_prop(&list, &prop)))
}

fn prim_remprop(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let list = arg(&args, 0, "remprop")?.as_text("remprop")?;
    let prop = arg(&args, 1, "remprop")?.as_text("remprop")?;
    ev.s.ws.rem_prop(&list, &prop);
    Ok(None)
}

fn prim_plist(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let list = arg(&args, 0, "plist")?.as_text("plist")?;
    Ok(Some(Value::List(List::from_values(
        ev.s.ws.plist_pairs(&list),
    ))))
}

fn prim_erase(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    for a in &args {
        match a {
            Value::List(l) => {
                for item in &l.items {
                    ev.s.ws.erase(&item.as_text("erase")?);
                }
            }
            other => {
                ev.s.ws.erase(&other.as_text("erase")?);
            }
        }
    }
    Ok(None)
}

fn prim_erall(ev: &mut Evaluator<'_>, _args: Vec<Value>) -> Out {
    ev.s.ws.reset();
    Ok(None)
}

pub static PRIMS: &[Primitive] = &[
    prim!("make", (2, 2, Some(2)), PrimFn::Sync(prim_make)),
    prim!("name", (2, 2, Some(2)), PrimFn::Sync(prim_name)),
    prim!("local", (1, 1, None), PrimFn::Sync(prim_local)),
    prim!("localmake", (2, 2, Some(2)), PrimFn::Sync(prim_localmake)),
    prim!("thing", (1, 1, Some(1)), PrimFn::Sync(prim_thing)),
    prim!("pprop", (3, 3, Some(3)), PrimFn::Sync(prim_pprop)),
    prim!("gprop", (2, 2, Some(2)), PrimFn::Sync(prim_gprop)),
    prim!("remprop", (2, 2, Some(2)), PrimFn::Sync(prim_remprop)),
    prim!("plist", (1, 1, Some(1)), PrimFn::Sync(prim_plist)),
    prim!("erase" / &["er"], (1, 1, None), PrimFn::Sync(prim_erase)),
    prim!("erall", (0, 0, Some(0)), PrimFn::Sync(prim_erall)),
];
