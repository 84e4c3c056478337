//! Procedure definition and namespace primitives

use super::{PrimFn, Primitive};
use crate::runtime::except::{ErrorCode, EvalResult, Flow, LogoError};
use crate::runtime::value::{Formal, List, ProcAttrs, Procedure, Value};
use crate::vm::interp::Evaluator;
use std::rc::Rc;

type Out = EvalResult<Option<Value>>;

fn arg(args: &[Value], i: usize, who: &str) -> EvalResult<Value> {
    args.get(i)
        .cloned()
        .ok_or_else(|| Flow::err_with(ErrorCode::NotEnoughInputs, [who]))
}

fn bad(who: &str, v: &Value) -> Flow {
    Flow::Err(LogoError::new(
        ErrorCode::InvalidInput,
        [who.to_string(), v.show_string()],
    ))
}

/// Build a procedure from `[[params…] [line…] …]` list form
fn build_procedure(
    ev: &mut Evaluator<'_>,
    name: &str,
    text: &Rc<List>,
    attrs: ProcAttrs,
    who: &str,
) -> EvalResult<Rc<Procedure>> {
    let name = name.to_lowercase();
    if ev.s.ws.is_primitive(&name) {
        return Err(Flow::err_with(ErrorCode::IsPrimitive, [name]));
    }
    let params = match text.item(1) {
        Some(Value::List(l)) => l.clone(),
        _ => return Err(bad(who, &Value::List(text.clone()))),
    };

    let mut formals = Vec::new();
    let mut rest = None;
    for p in &params.items {
        match p {
            Value::Word(w) => {
                let t = w.text();
                formals.push(Formal {
                    name: t.strip_prefix(':').unwrap_or(&t).to_lowercase(),
                    default: None,
                });
            }
            Value::List(spec) if !spec.is_empty() => {
                let pname = spec.items[0].as_text(who)?;
                let pname = pname.strip_prefix(':').unwrap_or(&pname).to_lowercase();
                if spec.len() == 1 {
                    rest = Some(pname);
                } else {
                    formals.push(Formal {
                        name: pname,
                        default: Some(List::from_values(spec.items[1..].to_vec())),
                    });
                }
            }
            other => return Err(bad(who, other)),
        }
    }

    let mut body_items = Vec::new();
    for line in &text.items[1..] {
        match line {
            Value::List(l) => body_items.extend(l.items.iter().cloned()),
            other => return Err(bad(who, other)),
        }
    }

    let default_arity = formals.iter().filter(|f| f.default.is_none()).count();
    Ok(Rc::new(Procedure {
        name,
        formals,
        rest,
        default_arity,
        body: List::from_values(body_items),
        formal_srcmap: None,
        attrs,
        stamp: ev.s.ws.next_stamp(),
    }))
}

fn prim_define(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let name = arg(&args, 0, "define")?.as_text("define")?;
    let text = arg(&args, 1, "define")?.as_list("define")?;
    let proc = build_procedure(ev, &name, &text, ProcAttrs::empty(), "define")?;
    ev.s.ws.define(proc);
    Ok(None)
}

fn prim_defmacro(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let name = arg(&args, 0, ".defmacro")?.as_text(".defmacro")?;
    let text = arg(&args, 1, ".defmacro")?.as_list(".defmacro")?;
    let proc = build_procedure(ev, &name, &text, ProcAttrs::MACRO, ".defmacro")?;
    ev.s.ws.define(proc);
    Ok(None)
}

/// `text "name` — the list form `define` accepts
fn prim_text(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let name = arg(&args, 0, "text")?.as_text("text")?;
    let resolved = ev
        .s
        .ws
        .resolve(&name)
        .ok_or_else(|| Flow::err_with(ErrorCode::DontKnowHow, [&*name]))?;
    let proc = resolved.proc;

    let mut params: Vec<Value> = proc
        .formals
        .iter()
        .map(|f| match &f.default {
            None => Value::word(f.name.clone()),
            Some(d) => {
                let mut items = vec![Value::word(f.name.clone())];
                items.extend(d.items.iter().cloned());
                Value::List(List::from_values(items))
            }
        })
        .collect();
    if let Some(rest) = &proc.rest {
        params.push(Value::List(List::from_values(vec![Value::word(
            rest.clone(),
        )])));
    }

    Ok(Some(Value::List(List::from_values(vec![
        Value::List(List::from_values(params)),
        Value::List(List::from_values(proc.body.items.clone())),
    ]))))
}

fn prim_copydef(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let newname = arg(&args, 0, "copydef")?.as_text("copydef")?.to_lowercase();
    let oldname = arg(&args, 1, "copydef")?.as_text("copydef")?;
    if ev.s.ws.is_primitive(&newname) {
        return Err(Flow::err_with(ErrorCode::IsPrimitive, [newname]));
    }
    let old = ev
        .s
        .ws
        .resolve(&oldname)
        .ok_or_else(|| Flow::err_with(ErrorCode::DontKnowHow, [&*oldname]))?
        .proc;
    let copy = Rc::new(Procedure {
        name: newname,
        formals: old.formals.clone(),
        rest: old.rest.clone(),
        default_arity: old.default_arity,
        body: old.body.clone(),
        formal_srcmap: old.formal_srcmap.clone(),
        attrs: old.attrs,
        stamp: ev.s.ws.next_stamp(),
    });
    ev.s.ws.define(copy);
    Ok(None)
}

fn prim_procedurep(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let name = arg(&args, 0, "procedurep")?.as_text("procedurep")?;
    let known = ev.s.ws.resolve(&name).is_some() || ev.s.ws.is_primitive(&name.to_lowercase());
    Ok(Some(Value::bool(known)))
}

fn prim_definedp(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let name = arg(&args, 0, "definedp")?.as_text("definedp")?;
    Ok(Some(Value::bool(ev.s.ws.resolve(&name).is_some())))
}

fn prim_primitivep(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let name = arg(&args, 0, "primitivep")?.as_text("primitivep")?;
    Ok(Some(Value::bool(ev.s.ws.is_primitive(&name.to_lowercase()))))
}

// ----------------------------------------------------------------------
// Modules and classes
// ----------------------------------------------------------------------

fn prim_module(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let name = arg(&args, 0, "module")?.as_text("module")?;
    ev.s.ws.begin_module(&name, false, None)?;
    Ok(None)
}

fn prim_endmodule(ev: &mut Evaluator<'_>, _args: Vec<Value>) -> Out {
    ev.s.ws.end_module()?;
    Ok(None)
}

fn prim_class(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let name = arg(&args, 0, "class")?.as_text("class")?;
    let isa = match args.get(1) {
        Some(parent) => Some(parent.as_text("class")?.to_string()),
        None => None,
    };
    ev.s.ws.begin_module(&name, true, isa)?;
    Ok(None)
}

fn prim_endclass(ev: &mut Evaluator<'_>, _args: Vec<Value>) -> Out {
    ev.s.ws.end_module()?;
    Ok(None)
}

fn prim_export(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let mut names = Vec::new();
    for a in &args {
        match a {
            Value::List(l) => {
                for item in &l.items {
                    names.push(item.as_text("export")?.to_string());
                }
            }
            other => names.push(other.as_text("export")?.to_string()),
        }
    }
    ev.s.ws.export(&names)?;
    Ok(None)
}

fn prim_import(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let from = arg(&args, 0, "import")?.as_text("import")?;
    let names: Option<Vec<String>> = match args.get(1) {
        Some(Value::List(l)) => {
            let mut names = Vec::with_capacity(l.len());
            for item in &l.items {
                names.push(item.as_text("import")?.to_string());
            }
            Some(names)
        }
        Some(other) => Some(vec![other.as_text("import")?.to_string()]),
        None => None,
    };
    ev.s.ws.import(&from, names.as_deref())?;
    Ok(None)
}

pub static PRIMS: &[Primitive] = &[
    prim!("define", (2, 2, Some(2)), PrimFn::Sync(prim_define)),
    prim!(".defmacro", (2, 2, Some(2)), PrimFn::Sync(prim_defmacro)),
    prim!("text", (1, 1, Some(1)), PrimFn::Sync(prim_text)),
    prim!("copydef", (2, 2, Some(2)), PrimFn::Sync(prim_copydef)),
    prim!("procedurep" / &["procedure?"], (1, 1, Some(1)), PrimFn::Sync(prim_procedurep)),
    prim!("definedp" / &["defined?"], (1, 1, Some(1)), PrimFn::Sync(prim_definedp)),
    prim!("primitivep" / &["primitive?"], (1, 1, Some(1)), PrimFn::Sync(prim_primitivep)),
    prim!("module", (1, 1, Some(1)), PrimFn::Sync(prim_module)),
    prim!("endmodule", (0, 0, Some(0)), PrimFn::Sync(prim_endmodule)),
    prim!("class", (1, 1, Some(2)), PrimFn::Sync(prim_class)),
    prim!("endclass", (0, 0, Some(0)), PrimFn::Sync(prim_endclass)),
    prim!("export", (1, 1, None), PrimFn::Sync(prim_export)),
    prim!("import", (1, 1, Some(2)), PrimFn::Sync(prim_import)),
];
