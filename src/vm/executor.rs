//! Chunk executor
//!
//! 指令块执行器。操作数栈上的每个槽位是 `(Option<Value>, 生产者)`：调用把
//! 自己的（可能缺失的）结果压栈，消费者校验存在性并用生产者名字报
//! "didn't output to"。执行循环本身是 async 的，挂起原语在 `CallExpr`
//! 内部 `await`，栈和局部状态原地保留。

use crate::runtime::except::{ErrorCode, EvalResult, Flow, LogoError};
use crate::runtime::value::{Value, Word};
use crate::runtime::workspace::Scope;
use crate::vm::codegen::{Chunk, Insn};
use crate::vm::control::{self, Body};
use crate::vm::interp::{apply_op, Evaluator};
use crate::vm::LocalFuture;
use smallvec::SmallVec;
use std::rc::Rc;

/// One operand slot: the value (absent for command results) plus the
/// constant-table index of whatever produced it
type Slot = (Option<Value>, u16);

impl Evaluator<'_> {
    /// Execute a compiled chunk, returning its trailing value
    pub fn run_chunk<'a>(&'a mut self, chunk: &Rc<Chunk>) -> LocalFuture<'a, EvalResult<Option<Value>>> {
        let chunk = chunk.clone();
        Box::pin(async move { self.exec_chunk(&chunk).await })
    }

    async fn exec_chunk(&mut self, chunk: &Chunk) -> EvalResult<Option<Value>> {
        let mut stashed: Vec<Scope> = Vec::new();
        let result = self.exec_insns(chunk, &mut stashed).await;
        if result.is_err() {
            // unwinding skipped the RestoreLocals instructions; put every
            // outstanding snapshot back, innermost first
            while let Some(snapshot) = stashed.pop() {
                self.s.ws.restore_locals(snapshot);
            }
        }
        result
    }

    async fn exec_insns(
        &mut self,
        chunk: &Chunk,
        stashed: &mut Vec<Scope>,
    ) -> EvalResult<Option<Value>> {
        let mut stack: SmallVec<[Slot; 8]> = SmallVec::new();
        let mut ret: Option<Value> = None;

        for insn in &chunk.code {
            match insn {
                Insn::Const(i) => stack.push((Some(chunk.consts[*i as usize].clone()), *i)),
                Insn::Load { name, at } => {
                    let var = const_text(chunk, *name);
                    let v = self.s.ws.get_or_err(&var).map_err(|f| f.with_at(*at))?;
                    stack.push((Some(v), *name));
                }
                Insn::Define(i) => {
                    if let Value::Procedure(p) = &chunk.consts[*i as usize] {
                        self.s.ws.define(p.clone());
                    }
                }
                Insn::PushNone { who } => stack.push((None, *who)),
                Insn::Neg { who, at } => {
                    let v = need(chunk, pop(&mut stack)?, "-")?;
                    let n = v.as_number("-").map_err(|f| f.with_at(*at))?;
                    stack.push((Some(Value::num(-n)), *who));
                }
                Insn::Bin { op, who, at } => {
                    let rhs = need(chunk, pop(&mut stack)?, op.text())?;
                    let lhs = need(chunk, pop(&mut stack)?, op.text())?;
                    let v = apply_op(*op, lhs, rhs, *at)?;
                    stack.push((Some(v), *who));
                }
                Insn::CallExpr { name, argc, paren, at }
                | Insn::CallStmt { name, argc, paren, at } => {
                    let cname = const_text(chunk, *name);
                    let mut args = Vec::with_capacity(*argc as usize);
                    for _ in 0..*argc {
                        args.push(need(chunk, pop(&mut stack)?, &cname)?);
                    }
                    args.reverse();
                    let result = self.apply_named(&cname, args, *at, *paren, false).await?;
                    stack.push((result, *name));
                }
                Insn::SaveLocals => stashed.push(self.s.ws.snapshot_locals()),
                Insn::RestoreLocals => {
                    if let Some(snapshot) = stashed.pop() {
                        self.s.ws.restore_locals(snapshot);
                    }
                }
                Insn::Sink => {
                    if let (Some(v), _) = pop(&mut stack)? {
                        return Err(Flow::Err(LogoError::new(
                            ErrorCode::DontSayWhatToDo,
                            [v.show_string()],
                        )));
                    }
                }
                Insn::ReturnTail => {
                    ret = pop(&mut stack)?.0;
                }
                Insn::Repeat { body, who, at } => {
                    let n = need(chunk, pop(&mut stack)?, "repeat")?
                        .as_number("repeat")
                        .map_err(|f| f.with_at(*at))?;
                    let body = Body::Chunk(chunk.subs[*body as usize].clone());
                    control::repeat(self, n, body)
                        .await
                        .map_err(|f| f.with_at(*at))?;
                    stack.push((None, *who));
                }
                Insn::Forever { body, who, at } => {
                    let body = Body::Chunk(chunk.subs[*body as usize].clone());
                    control::forever(self, body)
                        .await
                        .map_err(|f| f.with_at(*at))?;
                    stack.push((None, *who));
                }
                Insn::IfTrue { body, who, at } => {
                    let cond = need(chunk, pop(&mut stack)?, "if")?
                        .as_boolean("if")
                        .map_err(|f| f.with_at(*at))?;
                    let body = Body::Chunk(chunk.subs[*body as usize].clone());
                    let r = control::if_then(self, cond, body)
                        .await
                        .map_err(|f| f.with_at(*at))?;
                    stack.push((r, *who));
                }
                Insn::IfElse { then_body, else_body, who, at } => {
                    let cond = need(chunk, pop(&mut stack)?, "ifelse")?
                        .as_boolean("ifelse")
                        .map_err(|f| f.with_at(*at))?;
                    let then_body = Body::Chunk(chunk.subs[*then_body as usize].clone());
                    let else_body = Body::Chunk(chunk.subs[*else_body as usize].clone());
                    let r = control::if_else(self, cond, then_body, else_body)
                        .await
                        .map_err(|f| f.with_at(*at))?;
                    stack.push((r, *who));
                }
                Insn::WhileLoop { cond, body, negate, who, at } => {
                    let cond = Body::Chunk(chunk.subs[*cond as usize].clone());
                    let body = Body::Chunk(chunk.subs[*body as usize].clone());
                    control::while_loop(self, cond, body, *negate)
                        .await
                        .map_err(|f| f.with_at(*at))?;
                    stack.push((None, *who));
                }
                Insn::ForLoop { spec, body, who, at } => {
                    let spec = chunk.consts[*spec as usize].as_list("for")?;
                    let body = Body::Chunk(chunk.subs[*body as usize].clone());
                    control::for_loop(self, spec, body)
                        .await
                        .map_err(|f| f.with_at(*at))?;
                    stack.push((None, *who));
                }
                Insn::CatchTag { body, who, at } => {
                    let tag = need(chunk, pop(&mut stack)?, "catch")?
                        .as_text("catch")
                        .map_err(|f| f.with_at(*at))?;
                    let body = Body::Chunk(chunk.subs[*body as usize].clone());
                    let r = control::catch(self, &tag, body).await?;
                    stack.push((r, *who));
                }
                Insn::Fail { code, arg, at } => {
                    return Err(Flow::Err(
                        LogoError::new(*code, [const_text(chunk, *arg)]).at(*at),
                    ));
                }
            }
        }
        debug_assert!(stack.is_empty(), "unbalanced chunk in {}", chunk.name);
        Ok(ret)
    }
}

fn pop(stack: &mut SmallVec<[Slot; 8]>) -> EvalResult<Slot> {
    stack
        .pop()
        .ok_or_else(|| Flow::err_with(ErrorCode::Fatal, ["operand stack underflow"]))
}

/// Validate a slot holds a value, naming producer and consumer otherwise
fn need(chunk: &Chunk, slot: Slot, consumer: &str) -> EvalResult<Value> {
    match slot.0 {
        Some(v) => Ok(v),
        None => Err(Flow::Err(LogoError::new(
            ErrorCode::NoOutput,
            [const_text(chunk, slot.1), consumer.to_string()],
        ))),
    }
}

fn const_text(chunk: &Chunk, idx: u16) -> String {
    match chunk.consts.get(idx as usize) {
        Some(Value::Word(Word::Text(t))) => t.to_string(),
        Some(other) => other.show_string(),
        None => "?".to_string(),
    }
}
