//! Evaluation of parsed rows against the shared environment.

use rand::Rng;

use crate::control::ExecContext;
use crate::env::Environment;
use crate::error::ExecError;
use crate::semaphore::QueueDiscipline;
use crate::value::{Builtin, Number, Value};

use super::ast::{BinOp, BoolOp, CmpOp, Const, Expr, Line, Stmt, UnaryOp};
use super::parser::parse_line;

/// Execute one row on behalf of `ctx.thread`.
///
/// Returns `true` when the cursor should move to the next row: the row was a
/// statement, or an `if` header whose guard held. Returns `false` when an
/// `if` guard was false and the block below it must be skipped.
pub fn exec_line(
    source: &str,
    env: &mut Environment,
    ctx: &mut ExecContext<'_>,
) -> Result<bool, ExecError> {
    let source = source.trim();
    let line = parse_line(source).map_err(|reason| ExecError::malformed(source, reason))?;
    let mut eval = Evaluator { env, ctx };
    match line {
        Line::Statement(stmt) => {
            eval.exec(&stmt)?;
            Ok(true)
        }
        Line::IfHeader(condition) => Ok(eval.eval(&condition)?.is_truthy()),
    }
}

struct Evaluator<'e, 'c, 'a> {
    env: &'e mut Environment,
    ctx: &'c mut ExecContext<'a>,
}

impl Evaluator<'_, '_, '_> {
    fn exec(&mut self, stmt: &Stmt) -> Result<(), ExecError> {
        match stmt {
            Stmt::Pass => {}
            Stmt::If { condition, body } => {
                if self.eval(condition)?.is_truthy() {
                    self.exec(body)?;
                }
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
            }
            Stmt::Assign { targets, value } => {
                let value = self.eval(value)?;
                for target in targets {
                    self.env.set(target.clone(), value.clone());
                }
            }
            Stmt::AugAssign { target, op, value } => {
                let current = self
                    .env
                    .get(target)
                    .cloned()
                    .ok_or_else(|| ExecError::name(target.clone()))?;
                let rhs = self.eval(value)?;
                let result = binary_op(*op, &current, &rhs)?;
                self.env.set(target.clone(), result);
            }
            Stmt::Print(args) => {
                let mut parts = Vec::with_capacity(args.len());
                for arg in args {
                    let value = self.eval(arg)?;
                    parts.push(self.env.render(&value));
                }
                let line = parts.join(" ");
                log::info!(
                    "[{}] {}",
                    self.ctx.control.thread_name(self.ctx.thread).unwrap_or("?"),
                    line
                );
                self.ctx.output.push(line);
            }
        }
        Ok(())
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, ExecError> {
        match expr {
            Expr::Const(c) => Ok(match c {
                Const::None => Value::None,
                Const::Bool(b) => Value::Bool(*b),
                Const::Int(i) => Value::Int(*i),
                Const::Float(f) => Value::Float(*f),
                Const::Str(s) => Value::Str(s.clone()),
            }),
            Expr::Name(name) => self.lookup(name),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Neg => match value.as_number() {
                        Some(Number::Int(i)) => i
                            .checked_neg()
                            .map(Value::Int)
                            .ok_or_else(|| ExecError::type_error("integer overflow")),
                        Some(Number::Float(f)) => Ok(Value::Float(-f)),
                        None => Err(ExecError::type_error(format!(
                            "bad operand type for unary -: '{}'",
                            value.type_name()
                        ))),
                    },
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary_op(*op, &lhs, &rhs)
            }
            Expr::Compare { first, rest } => {
                let mut lhs = self.eval(first)?;
                for (op, rhs) in rest {
                    let rhs = self.eval(rhs)?;
                    if !compare(*op, &lhs, &rhs)? {
                        return Ok(Value::Bool(false));
                    }
                    lhs = rhs;
                }
                Ok(Value::Bool(true))
            }
            Expr::Bool { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                match (op, lhs.is_truthy()) {
                    (BoolOp::And, false) | (BoolOp::Or, true) => Ok(lhs),
                    _ => self.eval(rhs),
                }
            }
            Expr::Call { callee, args } => {
                if let Expr::Attribute { object, name } = callee.as_ref() {
                    let receiver = self.eval(object)?;
                    let args = self.eval_args(args)?;
                    return self.call_method(&receiver, name, args);
                }
                let callee = self.eval(callee)?;
                let args = self.eval_args(args)?;
                match callee {
                    Value::Builtin(builtin) => self.call_builtin(builtin, args),
                    other => Err(ExecError::type_error(format!(
                        "'{}' object is not callable",
                        other.type_name()
                    ))),
                }
            }
            Expr::Attribute { object, name } => {
                let object = self.eval(object)?;
                self.attribute(&object, name)
            }
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, ExecError> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    fn lookup(&self, name: &str) -> Result<Value, ExecError> {
        if let Some(value) = self.env.get(name) {
            return Ok(value.clone());
        }
        Builtin::lookup(name)
            .map(Value::Builtin)
            .ok_or_else(|| ExecError::name(name))
    }

    fn attribute(&self, object: &Value, name: &str) -> Result<Value, ExecError> {
        match (object, name) {
            (Value::Semaphore(id), "n") => self
                .env
                .objects()
                .semaphore(*id)
                .map(|s| Value::Int(s.value()))
                .ok_or_else(|| ExecError::attribute("Semaphore", name)),
            (Value::Lightswitch(id), "counter") => self
                .env
                .objects()
                .lightswitch(*id)
                .map(|l| Value::Int(l.counter() as i64))
                .ok_or_else(|| ExecError::attribute("Lightswitch", name)),
            _ => Err(ExecError::attribute(object.type_name(), name)),
        }
    }

    fn call_method(
        &mut self,
        receiver: &Value,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, ExecError> {
        let ctx = &mut *self.ctx;
        match (receiver, method) {
            (Value::Semaphore(id), "wait") => {
                expect_arity("wait", &args, 0, 0)?;
                let sem = self
                    .env
                    .objects_mut()
                    .semaphore_mut(*id)
                    .ok_or_else(|| ExecError::attribute("Semaphore", method))?;
                Ok(Value::Int(sem.wait(ctx.thread, &mut *ctx.control)))
            }
            (Value::Semaphore(id), "signal") => {
                expect_arity("signal", &args, 0, 1)?;
                let count = match args.first() {
                    Some(v) => non_negative_int("signal", v)? as u32,
                    None => 1,
                };
                let sem = self
                    .env
                    .objects_mut()
                    .semaphore_mut(*id)
                    .ok_or_else(|| ExecError::attribute("Semaphore", method))?;
                sem.signal(count, &mut *ctx.control, &mut *ctx.rng);
                Ok(Value::None)
            }
            (Value::Lightswitch(switch), "lock" | "unlock") => {
                expect_arity(method, &args, 1, 1)?;
                let Value::Semaphore(sem) = args[0] else {
                    return Err(ExecError::argument(
                        method,
                        format!("expected a Semaphore, got '{}'", args[0].type_name()),
                    ));
                };
                let objects = self.env.objects_mut();
                let done = if method == "lock" {
                    objects.lock(*switch, sem, ctx.thread, &mut *ctx.control, &mut *ctx.rng)
                } else {
                    objects.unlock(*switch, sem, ctx.thread, &mut *ctx.control, &mut *ctx.rng)
                };
                done.map(|_| Value::None)
                    .ok_or_else(|| ExecError::attribute("Lightswitch", method))
            }
            _ => Err(ExecError::attribute(receiver.type_name(), method)),
        }
    }

    fn call_builtin(&mut self, builtin: Builtin, args: Vec<Value>) -> Result<Value, ExecError> {
        let name = builtin.name();
        match builtin {
            Builtin::Semaphore | Builtin::RandomSemaphore => {
                expect_arity(name, &args, 0, 1)?;
                let n = match args.first() {
                    Some(v) => int_arg(name, v)?,
                    None => 0,
                };
                let discipline = if builtin == Builtin::Semaphore {
                    QueueDiscipline::Fifo
                } else {
                    QueueDiscipline::Random
                };
                let id = self.env.objects_mut().add_semaphore(n, discipline);
                Ok(Value::Semaphore(id))
            }
            Builtin::Lightswitch => {
                expect_arity(name, &args, 0, 0)?;
                Ok(Value::Lightswitch(self.env.objects_mut().add_lightswitch()))
            }
            Builtin::Pid => {
                expect_arity(name, &args, 0, 0)?;
                let pid = self
                    .ctx
                    .control
                    .thread_name(self.ctx.thread)
                    .unwrap_or_default()
                    .to_string();
                Ok(Value::Str(pid))
            }
            Builtin::NumThreads => {
                expect_arity(name, &args, 0, 0)?;
                Ok(Value::Int(self.ctx.control.thread_count() as i64))
            }
            Builtin::Len => {
                expect_arity(name, &args, 1, 1)?;
                match &args[0] {
                    Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                    other => Err(ExecError::type_error(format!(
                        "object of type '{}' has no len()",
                        other.type_name()
                    ))),
                }
            }
            Builtin::Str => {
                expect_arity(name, &args, 0, 1)?;
                Ok(Value::Str(
                    args.first().map(|v| self.env.render(v)).unwrap_or_default(),
                ))
            }
            Builtin::Int => {
                expect_arity(name, &args, 0, 1)?;
                match args.first() {
                    None => Ok(Value::Int(0)),
                    Some(Value::Float(f)) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
                    Some(Value::Str(s)) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                        ExecError::argument(name, format!("invalid literal '{}'", s))
                    }),
                    Some(v) => int_arg(name, v).map(Value::Int),
                }
            }
            Builtin::Abs => {
                expect_arity(name, &args, 1, 1)?;
                match args[0].as_number() {
                    Some(Number::Int(i)) => i
                        .checked_abs()
                        .map(Value::Int)
                        .ok_or_else(|| ExecError::type_error("integer overflow")),
                    Some(Number::Float(f)) => Ok(Value::Float(f.abs())),
                    None => Err(ExecError::type_error(format!(
                        "bad operand type for abs(): '{}'",
                        args[0].type_name()
                    ))),
                }
            }
            Builtin::Min | Builtin::Max => {
                if args.len() < 2 {
                    return Err(ExecError::argument(name, "expected at least 2 arguments"));
                }
                let want = if builtin == Builtin::Min { CmpOp::Lt } else { CmpOp::Gt };
                let mut best = args[0].clone();
                for candidate in &args[1..] {
                    if compare(want, candidate, &best)? {
                        best = candidate.clone();
                    }
                }
                Ok(best)
            }
            Builtin::Random => {
                expect_arity(name, &args, 0, 0)?;
                Ok(Value::Float(self.ctx.rng.gen::<f64>()))
            }
            Builtin::Randint => {
                expect_arity(name, &args, 2, 2)?;
                let lo = int_arg(name, &args[0])?;
                let hi = int_arg(name, &args[1])?;
                if lo > hi {
                    return Err(ExecError::argument(
                        name,
                        format!("empty range ({}, {})", lo, hi),
                    ));
                }
                Ok(Value::Int(self.ctx.rng.gen_range(lo..=hi)))
            }
        }
    }
}

fn expect_arity(function: &str, args: &[Value], min: usize, max: usize) -> Result<(), ExecError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("{}", min)
        } else {
            format!("{} to {}", min, max)
        };
        return Err(ExecError::argument(
            function,
            format!("takes {} argument(s) ({} given)", expected, args.len()),
        ));
    }
    Ok(())
}

fn int_arg(function: &str, value: &Value) -> Result<i64, ExecError> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Bool(b) => Ok(*b as i64),
        other => Err(ExecError::argument(
            function,
            format!("expected an integer, got '{}'", other.type_name()),
        )),
    }
}

fn non_negative_int(function: &str, value: &Value) -> Result<i64, ExecError> {
    let n = int_arg(function, value)?;
    if n < 0 || n > u32::MAX as i64 {
        return Err(ExecError::argument(function, format!("count out of range: {}", n)));
    }
    Ok(n)
}

/// Longest string a row may build, in bytes.
pub(crate) const MAX_STR_LEN: usize = 1 << 20;

fn checked_str_len(len: Option<usize>) -> Result<usize, ExecError> {
    len.filter(|&len| len <= MAX_STR_LEN)
        .ok_or_else(|| ExecError::type_error("resulting string is too long"))
}

pub(crate) fn binary_op(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, ExecError> {
    match (op, lhs, rhs) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => {
            checked_str_len(a.len().checked_add(b.len()))?;
            return Ok(Value::Str(format!("{}{}", a, b)));
        }
        (BinOp::Mul, Value::Str(s), Value::Int(n)) | (BinOp::Mul, Value::Int(n), Value::Str(s)) => {
            let times = usize::try_from((*n).max(0)).unwrap_or(usize::MAX);
            checked_str_len(s.len().checked_mul(times))?;
            return Ok(Value::Str(s.repeat(times)));
        }
        _ => {}
    }

    let (a, b) = match (lhs.as_number(), rhs.as_number()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(ExecError::type_error(format!(
                "unsupported operand type(s) for {}: '{}' and '{}'",
                op_symbol(op),
                lhs.type_name(),
                rhs.type_name()
            )))
        }
    };

    let overflow = || ExecError::type_error("integer overflow");
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => match op {
            BinOp::Add => x.checked_add(y).map(Value::Int).ok_or_else(overflow),
            BinOp::Sub => x.checked_sub(y).map(Value::Int).ok_or_else(overflow),
            BinOp::Mul => x.checked_mul(y).map(Value::Int).ok_or_else(overflow),
            BinOp::Div => {
                if y == 0 {
                    return Err(ExecError::ZeroDivision);
                }
                Ok(Value::Float(x as f64 / y as f64))
            }
            BinOp::FloorDiv => {
                if y == 0 {
                    return Err(ExecError::ZeroDivision);
                }
                let q = x.checked_div(y).ok_or_else(overflow)?;
                if x % y != 0 && ((x < 0) != (y < 0)) {
                    Ok(Value::Int(q - 1))
                } else {
                    Ok(Value::Int(q))
                }
            }
            BinOp::Mod => {
                if y == 0 {
                    return Err(ExecError::ZeroDivision);
                }
                let r = x.checked_rem(y).ok_or_else(overflow)?;
                if r != 0 && ((r < 0) != (y < 0)) {
                    Ok(Value::Int(r + y))
                } else {
                    Ok(Value::Int(r))
                }
            }
        },
        (a, b) => {
            let (x, y) = (a.as_f64(), b.as_f64());
            let result = match op {
                BinOp::Add => x + y,
                BinOp::Sub => x - y,
                BinOp::Mul => x * y,
                BinOp::Div | BinOp::FloorDiv | BinOp::Mod if y == 0.0 => {
                    return Err(ExecError::ZeroDivision)
                }
                BinOp::Div => x / y,
                BinOp::FloorDiv => (x / y).floor(),
                BinOp::Mod => x - y * (x / y).floor(),
            };
            Ok(Value::Float(result))
        }
    }
}

fn op_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::FloorDiv => "//",
        BinOp::Mod => "%",
    }
}

pub(crate) fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<bool, ExecError> {
    use std::cmp::Ordering;

    let ordering = match (lhs.as_number(), rhs.as_number(), lhs, rhs) {
        (Some(a), Some(b), _, _) => match (a, b) {
            (Number::Int(x), Number::Int(y)) => Some(x.cmp(&y)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        },
        (_, _, Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => None,
    };

    match op {
        CmpOp::Eq => Ok(match ordering {
            Some(o) => o == Ordering::Equal,
            None => lhs == rhs,
        }),
        CmpOp::NotEq => Ok(match ordering {
            Some(o) => o != Ordering::Equal,
            None => lhs != rhs,
        }),
        _ => {
            let Some(o) = ordering else {
                // NaN comparisons are false rather than errors.
                if lhs.as_number().is_some() && rhs.as_number().is_some() {
                    return Ok(false);
                }
                return Err(ExecError::type_error(format!(
                    "ordering not supported between '{}' and '{}'",
                    lhs.type_name(),
                    rhs.type_name()
                )));
            };
            Ok(match op {
                CmpOp::Lt => o == Ordering::Less,
                CmpOp::Le => o != Ordering::Greater,
                CmpOp::Gt => o == Ordering::Greater,
                CmpOp::Ge => o != Ordering::Less,
                CmpOp::Eq => o == Ordering::Equal,
                CmpOp::NotEq => o != Ordering::Equal,
            })
        }
    }
}
