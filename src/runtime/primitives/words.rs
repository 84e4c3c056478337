//! Word, list and array primitives

use super::{PrimFn, Primitive};
use crate::runtime::except::{ErrorCode, EvalResult, Flow, LogoError};
use crate::runtime::value::{List, LogoArray, Value};
use crate::vm::interp::Evaluator;

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

fn prim_word(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let mut text = String::new();
    for a in &args {
        text.push_str(&a.as_text("word")?);
    }
    Ok(Some(Value::word(text)))
}

fn prim_list(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    Ok(Some(Value::List(List::from_values(args))))
}

fn prim_sentence(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let mut items = Vec::new();
    for a in args {
        match a {
            Value::List(l) => items.extend(l.items.iter().cloned()),
            other => items.push(other),
        }
    }
    Ok(Some(Value::List(List::from_values(items))))
}

fn prim_fput(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let item = arg(&args, 0, "fput")?;
    match arg(&args, 1, "fput")? {
        Value::List(l) => {
            let mut items = Vec::with_capacity(l.len() + 1);
            items.push(item);
            items.extend(l.items.iter().cloned());
            Ok(Some(Value::List(List::from_values(items))))
        }
        Value::Word(w) => Ok(Some(Value::word(format!(
            "{}{}",
            item.as_text("fput")?,
            w.text()
        )))),
        other => Err(bad("fput", &other)),
    }
}

fn prim_lput(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let item = arg(&args, 0, "lput")?;
    match arg(&args, 1, "lput")? {
        Value::List(l) => {
            let mut items = l.items.clone();
            items.push(item);
            Ok(Some(Value::List(List::from_values(items))))
        }
        Value::Word(w) => Ok(Some(Value::word(format!(
            "{}{}",
            w.text(),
            item.as_text("lput")?
        )))),
        other => Err(bad("lput", &other)),
    }
}

fn prim_first(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let v = arg(&args, 0, "first")?;
    match &v {
        Value::List(l) => l.item(1).cloned().ok_or_else(|| bad("first", &v)),
        Value::Word(w) => w
            .text()
            .chars()
            .next()
            .map(|c| Value::word(c.to_string()))
            .ok_or_else(|| bad("first", &v)),
        _ => Err(bad("first", &v)),
    }
    .map(Some)
}

fn prim_last(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let v = arg(&args, 0, "last")?;
    match &v {
        Value::List(l) => l.items.last().cloned().ok_or_else(|| bad("last", &v)),
        Value::Word(w) => w
            .text()
            .chars()
            .last()
            .map(|c| Value::word(c.to_string()))
            .ok_or_else(|| bad("last", &v)),
        _ => Err(bad("last", &v)),
    }
    .map(Some)
}

fn prim_butfirst(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let v = arg(&args, 0, "butfirst")?;
    match &v {
        Value::List(l) if !l.is_empty() => Ok(Some(Value::List(List::from_values(
            l.items[1..].to_vec(),
        )))),
        Value::Word(w) => {
            let t = w.text();
            let mut chars = t.chars();
            if chars.next().is_none() {
                return Err(bad("butfirst", &v));
            }
            Ok(Some(Value::word(chars.as_str().to_string())))
        }
        _ => Err(bad("butfirst", &v)),
    }
}

fn prim_butlast(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let v = arg(&args, 0, "butlast")?;
    match &v {
        Value::List(l) if !l.is_empty() => Ok(Some(Value::List(List::from_values(
            l.items[..l.len() - 1].to_vec(),
        )))),
        Value::Word(w) => {
            let t = w.text();
            if t.is_empty() {
                return Err(bad("butlast", &v));
            }
            let mut chars: Vec<char> = t.chars().collect();
            chars.pop();
            Ok(Some(Value::word(chars.into_iter().collect::<String>())))
        }
        _ => Err(bad("butlast", &v)),
    }
}

fn prim_item(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let index = arg(&args, 0, "item")?.as_integer("item")?;
    let v = arg(&args, 1, "item")?;
    match &v {
        Value::List(l) => {
            if index < 1 {
                return Err(index_err(index));
            }
            l.item(index as usize)
                .cloned()
                .ok_or_else(|| index_err(index))
        }
        Value::Word(w) => {
            if index < 1 {
                return Err(index_err(index));
            }
            w.text()
                .chars()
                .nth(index as usize - 1)
                .map(|c| Value::word(c.to_string()))
                .ok_or_else(|| index_err(index))
        }
        Value::Array(a) => {
            let off = a.offset_of(index).ok_or_else(|| index_err(index))?;
            Ok(a.cells.borrow()[off].clone())
        }
        _ => Err(bad("item", &v)),
    }
    .map(Some)
}

fn index_err(index: i64) -> Flow {
    Flow::err_with(ErrorCode::IndexOutOfRange, [index.to_string()])
}

fn prim_setitem(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let index = arg(&args, 0, "setitem")?.as_integer("setitem")?;
    let array = arg(&args, 1, "setitem")?.as_array("setitem")?;
    let value = arg(&args, 2, "setitem")?;
    let off = array.offset_of(index).ok_or_else(|| index_err(index))?;
    array.cells.borrow_mut()[off] = value;
    Ok(None)
}

fn prim_count(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let v = arg(&args, 0, "count")?;
    let n = match &v {
        Value::List(l) => l.len(),
        Value::Word(w) => w.text().chars().count(),
        Value::Array(a) => a.len(),
        _ => return Err(bad("count", &v)),
    };
    Ok(Some(Value::num(n as f64)))
}

fn prim_emptyp(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let v = arg(&args, 0, "emptyp")?;
    let empty = match &v {
        Value::List(l) => l.is_empty(),
        Value::Word(w) => w.text().is_empty(),
        _ => false,
    };
    Ok(Some(Value::bool(empty)))
}

fn prim_wordp(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    Ok(Some(Value::bool(arg(&args, 0, "wordp")?.is_word())))
}

fn prim_listp(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    Ok(Some(Value::bool(arg(&args, 0, "listp")?.is_list())))
}

fn prim_arrayp(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    Ok(Some(Value::bool(arg(&args, 0, "arrayp")?.is_array())))
}

fn prim_numberp(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    Ok(Some(Value::bool(arg(&args, 0, "numberp")?.is_number())))
}

fn prim_memberp(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let item = arg(&args, 0, "memberp")?;
    let v = arg(&args, 1, "memberp")?;
    let found = match &v {
        Value::List(l) => l.items.iter().any(|x| x.equals(&item)),
        Value::Word(w) => {
            let needle = item.as_text("memberp")?;
            w.text().to_lowercase().contains(&needle.to_lowercase())
        }
        _ => return Err(bad("memberp", &v)),
    };
    Ok(Some(Value::bool(found)))
}

fn prim_equalp(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let a = arg(&args, 0, "equalp")?;
    let b = arg(&args, 1, "equalp")?;
    Ok(Some(Value::bool(a.equals(&b))))
}

fn prim_notequalp(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let a = arg(&args, 0, "notequalp")?;
    let b = arg(&args, 1, "notequalp")?;
    Ok(Some(Value::bool(!a.equals(&b))))
}

fn prim_array(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let size = arg(&args, 0, "array")?.as_integer("array")?;
    if size < 0 {
        return Err(bad("array", &args[0]));
    }
    let origin = match args.get(1) {
        Some(v) => v.as_integer("array")?,
        None => 1,
    };
    Ok(Some(Value::Array(LogoArray::new(size as usize, origin))))
}

fn prim_listtoarray(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let l = arg(&args, 0, "listtoarray")?.as_list("listtoarray")?;
    let origin = match args.get(1) {
        Some(v) => v.as_integer("listtoarray")?,
        None => 1,
    };
    Ok(Some(Value::Array(LogoArray::from_values(
        l.items.clone(),
        origin,
    ))))
}

fn prim_arraytolist(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let a = arg(&args, 0, "arraytolist")?.as_array("arraytolist")?;
    let cells = a.cells.borrow().clone();
    Ok(Some(Value::List(List::from_values(cells))))
}

fn prim_lowercase(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let t = arg(&args, 0, "lowercase")?.as_text("lowercase")?;
    Ok(Some(Value::word(t.to_lowercase())))
}

fn prim_uppercase(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let t = arg(&args, 0, "uppercase")?.as_text("uppercase")?;
    Ok(Some(Value::word(t.to_uppercase())))
}

pub static PRIMS: &[Primitive] = &[
    prim!("word", (0, 2, None), PrimFn::Sync(prim_word)),
    prim!("list", (0, 2, None), PrimFn::Sync(prim_list)),
    prim!("sentence" / &["se"], (0, 2, None), PrimFn::Sync(prim_sentence)),
    prim!("fput", (2, 2, Some(2)), PrimFn::Sync(prim_fput)),
    prim!("lput", (2, 2, Some(2)), PrimFn::Sync(prim_lput)),
    prim!("first", (1, 1, Some(1)), PrimFn::Sync(prim_first)),
    prim!("last", (1, 1, Some(1)), PrimFn::Sync(prim_last)),
    prim!("butfirst" / &["bf"], (1, 1, Some(1)), PrimFn::Sync(prim_butfirst)),
    prim!("butlast" / &["bl"], (1, 1, Some(1)), PrimFn::Sync(prim_butlast)),
    prim!("item", (2, 2, Some(2)), PrimFn::Sync(prim_item)),
    prim!("setitem", (3, 3, Some(3)), PrimFn::Sync(prim_setitem)),
    prim!("count", (1, 1, Some(1)), PrimFn::Sync(prim_count)),
    prim!("emptyp" / &["empty?"], (1, 1, Some(1)), PrimFn::Sync(prim_emptyp)),
    prim!("wordp" / &["word?"], (1, 1, Some(1)), PrimFn::Sync(prim_wordp)),
    prim!("listp" / &["list?"], (1, 1, Some(1)), PrimFn::Sync(prim_listp)),
    prim!("arrayp" / &["array?"], (1, 1, Some(1)), PrimFn::Sync(prim_arrayp)),
    prim!("numberp" / &["number?"], (1, 1, Some(1)), PrimFn::Sync(prim_numberp)),
    prim!("memberp" / &["member?"], (2, 2, Some(2)), PrimFn::Sync(prim_memberp)),
    prim!("equalp" / &["equal?"], (2, 2, Some(2)), PrimFn::Sync(prim_equalp)),
    prim!(
        "notequalp" / &["notequal?"],
        (2, 2, Some(2)),
        PrimFn::Sync(prim_notequalp)
    ),
    prim!("array", (1, 1, Some(2)), PrimFn::Sync(prim_array)),
    prim!("listtoarray", (1, 1, Some(2)), PrimFn::Sync(prim_listtoarray)),
    prim!("arraytolist", (1, 1, Some(1)), PrimFn::Sync(prim_arraytolist)),
    prim!("lowercase", (1, 1, Some(1)), PrimFn::Sync(prim_lowercase)),
    prim!("uppercase", (1, 1, Some(1)), PrimFn::Sync(prim_uppercase)),
];
