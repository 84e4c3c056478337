//! Turtle graphics primitives
//!
//! The engine tracks the turtle pose itself and emits resolved absolute
//! drawing commands; whatever renders them lives on the far side of the
//! [`crate::host::DrawSink`].

use super::{PrimFn, Primitive};
use crate::host::DrawOp;
use crate::runtime::except::{ErrorCode, EvalResult, Flow};
use crate::runtime::value::{List, Value};
use crate::vm::interp::Evaluator;

type Out = EvalResult<Option<Value>>;

fn arg(args: &[Value], i: usize, who: &str) -> EvalResult<Value> {
    args.get(i)
        .cloned()
        .ok_or_else(|| Flow::err_with(ErrorCode::NotEnoughInputs, [who]))
}

fn send_pose(ev: &mut Evaluator<'_>) {
    let t = &ev.s.turtle;
    let (x, y, h) = (t.x, t.y, t.heading);
    ev.s.draw.send_cmd(DrawOp::Pose, &[x, y, h]);
}

/// Move the turtle `dist` units along its heading, drawing if the pen
/// is down
fn slide(ev: &mut Evaluator<'_>, dist: f64) {
    let rad = ev.s.turtle.heading.to_radians();
    let nx = ev.s.turtle.x + rad.sin() * dist;
    let ny = ev.s.turtle.y + rad.cos() * dist;
    move_to(ev, nx, ny);
}

fn move_to(ev: &mut Evaluator<'_>, nx: f64, ny: f64) {
    let (x, y, pen) = (ev.s.turtle.x, ev.s.turtle.y, ev.s.turtle.pen_down);
    if pen {
        ev.s.draw.send_cmd(DrawOp::Line, &[x, y, nx, ny]);
    } else {
        ev.s.draw.send_cmd(DrawOp::MoveTo, &[nx, ny]);
    }
    ev.s.turtle.x = nx;
    ev.s.turtle.y = ny;
    send_pose(ev);
}

fn turn(ev: &mut Evaluator<'_>, degrees: f64) {
    let h = (ev.s.turtle.heading + degrees).rem_euclid(360.0);
    ev.s.turtle.heading = h;
    send_pose(ev);
}

fn prim_forward(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let d = arg(&args, 0, "forward")?.as_number("forward")?;
    slide(ev, d);
    Ok(None)
}

fn prim_back(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let d = arg(&args, 0, "back")?.as_number("back")?;
    slide(ev, -d);
    Ok(None)
}

fn prim_left(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let d = arg(&args, 0, "left")?.as_number("left")?;
    turn(ev, -d);
    Ok(None)
}

fn prim_right(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let d = arg(&args, 0, "right")?.as_number("right")?;
    turn(ev, d);
    Ok(None)
}

fn prim_setheading(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let h = arg(&args, 0, "setheading")?.as_number("setheading")?;
    ev.s.turtle.heading = h.rem_euclid(360.0);
    send_pose(ev);
    Ok(None)
}

fn prim_setxy(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let x = arg(&args, 0, "setxy")?.as_number("setxy")?;
    let y = arg(&args, 1, "setxy")?.as_number("setxy")?;
    move_to(ev, x, y);
    Ok(None)
}

fn prim_setpos(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let pos = arg(&args, 0, "setpos")?.as_list("setpos")?;
    let x = pos
        .item(1)
        .ok_or_else(|| Flow::err_with(ErrorCode::InvalidInput, ["setpos", "[]"]))?
        .as_number("setpos")?;
    let y = pos
        .item(2)
        .ok_or_else(|| Flow::err_with(ErrorCode::InvalidInput, ["setpos", "[]"]))?
        .as_number("setpos")?;
    move_to(ev, x, y);
    Ok(None)
}

fn prim_pos(ev: &mut Evaluator<'_>, _args: Vec<Value>) -> Out {
    let (x, y) = (ev.s.turtle.x, ev.s.turtle.y);
    Ok(Some(Value::List(List::from_values(vec![
        Value::num(x),
        Value::num(y),
    ]))))
}

fn prim_heading(ev: &mut Evaluator<'_>, _args: Vec<Value>) -> Out {
    Ok(Some(Value::num(ev.s.turtle.heading)))
}

fn prim_home(ev: &mut Evaluator<'_>, _args: Vec<Value>) -> Out {
    move_to(ev, 0.0, 0.0);
    ev.s.turtle.heading = 0.0;
    send_pose(ev);
    Ok(None)
}

fn prim_clearscreen(ev: &mut Evaluator<'_>, _args: Vec<Value>) -> Out {
    ev.s.turtle.x = 0.0;
    ev.s.turtle.y = 0.0;
    ev.s.turtle.heading = 0.0;
    ev.s.draw.send_cmd(DrawOp::Clear, &[]);
    send_pose(ev);
    Ok(None)
}

fn prim_clean(ev: &mut Evaluator<'_>, _args: Vec<Value>) -> Out {
    ev.s.draw.send_cmd(DrawOp::Clean, &[]);
    Ok(None)
}

fn prim_penup(ev: &mut Evaluator<'_>, _args: Vec<Value>) -> Out {
    ev.s.turtle.pen_down = false;
    Ok(None)
}

fn prim_pendown(ev: &mut Evaluator<'_>, _args: Vec<Value>) -> Out {
    ev.s.turtle.pen_down = true;
    Ok(None)
}

fn prim_pendownp(ev: &mut Evaluator<'_>, _args: Vec<Value>) -> Out {
    Ok(Some(Value::bool(ev.s.turtle.pen_down)))
}

fn prim_setpencolor(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let v = arg(&args, 0, "setpencolor")?;
    match v.as_word("setpencolor")?.to_number() {
        Some(n) => ev.s.draw.send_cmd(DrawOp::PenColor, &[n]),
        None => {
            let name = v.as_text("setpencolor")?;
            ev.s.draw.send_cmd_as_string(DrawOp::PenColor, &[&name]);
        }
    }
    Ok(None)
}

fn prim_setpensize(ev: &mut Evaluator<'_>, args: Vec<Value>) -> Out {
    let w = arg(&args, 0, "setpensize")?.as_number("setpensize")?;
    ev.s.turtle.pen_size = w;
    ev.s.draw.send_cmd(DrawOp::PenSize, &[w]);
    Ok(None)
}

fn prim_showturtle(ev: &mut Evaluator<'_>, _args: Vec<Value>) -> Out {
    ev.s.turtle.visible = true;
    ev.s.draw.send_cmd(DrawOp::ShowTurtle, &[1.0]);
    Ok(None)
}

fn prim_hideturtle(ev: &mut Evaluator<'_>, _args: Vec<Value>) -> Out {
    ev.s.turtle.visible = false;
    ev.s.draw.send_cmd(DrawOp::ShowTurtle, &[0.0]);
    Ok(None)
}

pub static PRIMS: &[Primitive] = &[
    prim!("forward" / &["fd"], (1, 1, Some(1)), PrimFn::Sync(prim_forward)),
    prim!("back" / &["bk"], (1, 1, Some(1)), PrimFn::Sync(prim_back)),
    prim!("left" / &["lt"], (1, 1, Some(1)), PrimFn::Sync(prim_left)),
    prim!("right" / &["rt"], (1, 1, Some(1)), PrimFn::Sync(prim_right)),
    prim!("setheading" / &["seth"], (1, 1, Some(1)), PrimFn::Sync(prim_setheading)),
    prim!("setxy", (2, 2, Some(2)), PrimFn::Sync(prim_setxy)),
    prim!("setpos", (1, 1, Some(1)), PrimFn::Sync(prim_setpos)),
    prim!("pos", (0, 0, Some(0)), PrimFn::Sync(prim_pos)),
    prim!("heading", (0, 0, Some(0)), PrimFn::Sync(prim_heading)),
    prim!("home", (0, 0, Some(0)), PrimFn::Sync(prim_home)),
    prim!("clearscreen" / &["cs"], (0, 0, Some(0)), PrimFn::Sync(prim_clearscreen)),
    prim!("clean", (0, 0, Some(0)), PrimFn::Sync(prim_clean)),
    prim!("penup" / &["pu"], (0, 0, Some(0)), PrimFn::Sync(prim_penup)),
    prim!("pendown" / &["pd"], (0, 0, Some(0)), PrimFn::Sync(prim_pendown)),
    prim!("pendownp" / &["pendown?"], (0, 0, Some(0)), PrimFn::Sync(prim_pendownp)),
    prim!("setpencolor" / &["setpc"], (1, 1, Some(1)), PrimFn::Sync(prim_setpencolor)),
    prim!("setpensize", (1, 1, Some(1)), PrimFn::Sync(prim_setpensize)),
    prim!("showturtle" / &["st"], (0, 0, Some(0)), PrimFn::Sync(prim_showturtle)),
    prim!("hideturtle" / &["ht"], (0, 0, Some(0)), PrimFn::Sync(prim_hideturtle)),
];
