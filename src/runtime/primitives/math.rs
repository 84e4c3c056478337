//! Arithmetic and logic primitives
//!
//! The infix operators are folded by the evaluator itself; these are the
//! prefix spellings plus what has no operator form.

use super::{PrimFn, Primitive};
use crate::runtime::except::{ErrorCode, EvalResult, Flow};
use crate::runtime::value::{format_number, Value};
use crate::vm::interp::Evaluator;
use rand::Rng;

type Out = EvalResult<Option<Value>>;

fn arg(args: &[Value], i: usize, who: &str) -> EvalResult<Value> {
    args.get(i)
        .cloned()
        .ok_or_else(|| Flow::err_with(ErrorCode::NotEnoughInputs, [who]))
}

fn num(v: Option<Value>) -> Out {
    Ok(v)
}

fn prim_sum(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let mut total = 0.0;
    for a in &args {
        total += a.as_number("sum")?;
    }
    num(Some(Value::num(total)))
}

fn prim_difference(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let l = arg(&args, 0, "difference")?.as_number("difference")?;
    let r = arg(&args, 1, "difference")?.as_number("difference")?;
    num(Some(Value::num(l - r)))
}

fn prim_minus(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let n = arg(&args, 0, "minus")?.as_number("minus")?;
    num(Some(Value::num(-n)))
}

fn prim_product(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let mut total = 1.0;
    for a in &args {
        total *= a.as_number("product")?;
    }
    num(Some(Value::num(total)))
}

fn prim_quotient(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let l = arg(&args, 0, "quotient")?.as_number("quotient")?;
    let r = arg(&args, 1, "quotient")?.as_number("quotient")?;
    if r == 0.0 {
        return Err(Flow::err(ErrorCode::DivisionByZero));
    }
    num(Some(Value::num(l / r)))
}

fn prim_remainder(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let l = arg(&args, 0, "remainder")?.as_number("remainder")?;
    let r = arg(&args, 1, "remainder")?.as_number("remainder")?;
    if r == 0.0 {
        return Err(Flow::err(ErrorCode::DivisionByZero));
    }
    // truncated like the dividend's sign
    num(Some(Value::num(l % r)))
}

fn prim_power(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let b = arg(&args, 0, "power")?.as_number("power")?;
    let e = arg(&args, 1, "power")?.as_number("power")?;
    num(Some(Value::num(b.powf(e))))
}

fn prim_sqrt(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let n = arg(&args, 0, "sqrt")?.as_number("sqrt")?;
    if n < 0.0 {
        return Err(Flow::err_with(
            ErrorCode::InvalidInput,
            ["sqrt".to_string(), format_number(n)],
        ));
    }
    num(Some(Value::num(n.sqrt())))
}

fn prim_abs(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let n = arg(&args, 0, "abs")?.as_number("abs")?;
    num(Some(Value::num(n.abs())))
}

fn prim_int(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let n = arg(&args, 0, "int")?.as_number("int")?;
    num(Some(Value::num(n.trunc())))
}

fn prim_round(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let n = arg(&args, 0, "round")?.as_number("round")?;
    num(Some(Value::num(n.round())))
}

fn prim_random(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let a = arg(&args, 0, "random")?.as_integer("random")?;
    let mut rng = rand::rng();
    let n = match args.get(1) {
        // (random low high) picks from the inclusive range
        Some(high) => {
            let b = high.as_integer("random")?;
            if b < a {
                return Err(Flow::err_with(
                    ErrorCode::InvalidInput,
                    ["random".to_string(), b.to_string()],
                ));
            }
            rng.random_range(a..=b)
        }
        None => {
            if a <= 0 {
                return Err(Flow::err_with(
                    ErrorCode::InvalidInput,
                    ["random".to_string(), a.to_string()],
                ));
            }
            rng.random_range(0..a)
        }
    };
    num(Some(Value::num(n as f64)))
}

fn prim_and(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    for a in &args {
        if !a.as_boolean("and")? {
            return num(Some(Value::bool(false)));
        }
    }
    num(Some(Value::bool(true)))
}

fn prim_or(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    for a in &args {
        if a.as_boolean("or")? {
            return num(Some(Value::bool(true)));
        }
    }
    num(Some(Value::bool(false)))
}

fn prim_not(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let b = arg(&args, 0, "not")?.as_boolean("not")?;
    num(Some(Value::bool(!b)))
}

fn compare(args: &[Value], who: &str, f: fn(f64, f64) -> bool) -> Out {
    let l = arg(args, 0, who)?.as_number(who)?;
    let r = arg(args, 1, who)?.as_number(who)?;
    Ok(Some(Value::bool(f(l, r))))
}

fn prim_lessp(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    compare(&args, "lessp", |l, r| l < r)
}

fn prim_greaterp(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    compare(&args, "greaterp", |l, r| l > r)
}

fn prim_lessequalp(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    compare(&args, "lessequalp", |l, r| l <= r)
}

fn prim_greaterequalp(_ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    compare(&args, "greaterequalp", |l, r| l >= r)
}

pub static PRIMS: &[Primitive] = &[
    prim!("sum", (0, 2, None), PrimFn::Sync(prim_sum)),
    prim!("difference", (2, 2, Some(2)), PrimFn::Sync(prim_difference)),
    prim!("minus", (1, 1, Some(1)), PrimFn::Sync(prim_minus)),
    prim!("product", (0, 2, None), PrimFn::Sync(prim_product)),
    prim!("quotient", (2, 2, Some(2)), PrimFn::Sync(prim_quotient)),
    prim!("remainder", (2, 2, Some(2)), PrimFn::Sync(prim_remainder)),
    prim!("power", (2, 2, Some(2)), PrimFn::Sync(prim_power)),
    prim!("sqrt", (1, 1, Some(1)), PrimFn::Sync(prim_sqrt)),
    prim!("abs", (1, 1, Some(1)), PrimFn::Sync(prim_abs)),
    prim!("int", (1, 1, Some(1)), PrimFn::Sync(prim_int)),
    prim!("round", (1, 1, Some(1)), PrimFn::Sync(prim_round)),
    prim!("random", (1, 1, Some(2)), PrimFn::Sync(prim_random)),
    prim!("and", (0, 2, None), PrimFn::Sync(prim_and)),
    prim!("or", (0, 2, None), PrimFn::Sync(prim_or)),
    prim!("not", (1, 1, Some(1)), PrimFn::Sync(prim_not)),
    prim!("lessp" / &["less?"], (2, 2, Some(2)), PrimFn::Sync(prim_lessp)),
    prim!("greaterp" / &["greater?"], (2, 2, Some(2)), PrimFn::Sync(prim_greaterp)),
    prim!("lessequalp", (2, 2, Some(2)), PrimFn::Sync(prim_lessequalp)),
    prim!(
        "greaterequalp",
        (2, 2, Some(2)),
        PrimFn::Sync(prim_greaterequalp)
    ),
];
