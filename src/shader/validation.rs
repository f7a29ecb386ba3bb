//! Parsing and evaluation of PostScript calculator (Type 4) programs.
//!
//! Generated function code is checked here before it leaves the compiler in
//! tests and in the command line tool, and evaluated to compare sampled
//! colors against the stops that produced it.

use std::collections::HashMap;
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow, bail};

/// Operand stack depth limit imposed on Type 4 functions.
pub const MAX_STACK_DEPTH: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Real(f32),
    Bool(bool),
}

impl Value {
    fn as_real(self) -> Result<f32> {
        match self {
            Value::Int(v) => Ok(v as f32),
            Value::Real(v) => Ok(v),
            Value::Bool(_) => bail!("typecheck: expected number, got boolean"),
        }
    }

    fn as_int(self) -> Result<i64> {
        match self {
            Value::Int(v) => Ok(v),
            other => bail!("typecheck: expected integer, got {other:?}"),
        }
    }

    fn as_bool(self) -> Result<bool> {
        match self {
            Value::Bool(v) => Ok(v),
            other => bail!("typecheck: expected boolean, got {other:?}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Abs,
    Add,
    Atan,
    Ceiling,
    Cos,
    Cvi,
    Cvr,
    Div,
    Exp,
    Floor,
    Idiv,
    Ln,
    Log,
    Mod,
    Mul,
    Neg,
    Round,
    Sin,
    Sqrt,
    Sub,
    Truncate,
    And,
    Eq,
    Ge,
    Gt,
    Le,
    Lt,
    Ne,
    Not,
    Or,
    Xor,
    Copy,
    Dup,
    Exch,
    Index,
    Pop,
    Roll,
}

fn operator_table() -> &'static HashMap<&'static str, Operator> {
    static TABLE: OnceLock<HashMap<&'static str, Operator>> = OnceLock::new();
    TABLE.get_or_init(|| {
        use Operator::*;
        HashMap::from([
            ("abs", Abs),
            ("add", Add),
            ("atan", Atan),
            ("ceiling", Ceiling),
            ("cos", Cos),
            ("cvi", Cvi),
            ("cvr", Cvr),
            ("div", Div),
            ("exp", Exp),
            ("floor", Floor),
            ("idiv", Idiv),
            ("ln", Ln),
            ("log", Log),
            ("mod", Mod),
            ("mul", Mul),
            ("neg", Neg),
            ("round", Round),
            ("sin", Sin),
            ("sqrt", Sqrt),
            ("sub", Sub),
            ("truncate", Truncate),
            ("and", And),
            ("eq", Eq),
            ("ge", Ge),
            ("gt", Gt),
            ("le", Le),
            ("lt", Lt),
            ("ne", Ne),
            ("not", Not),
            ("or", Or),
            ("xor", Xor),
            ("copy", Copy),
            ("dup", Dup),
            ("exch", Exch),
            ("index", Index),
            ("pop", Pop),
            ("roll", Roll),
        ])
    })
}

#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    Push(Value),
    Call(Operator),
    If(Vec<Op>),
    IfElse(Vec<Op>, Vec<Op>),
}

/// A parsed calculator program: the body of its outermost `{ ... }`.
#[derive(Clone, Debug, PartialEq)]
pub struct CalculatorProgram {
    pub ops: Vec<Op>,
}

impl CalculatorProgram {
    /// Maximum `if`/`ifelse` nesting depth.
    pub fn max_branch_depth(&self) -> usize {
        fn depth(ops: &[Op]) -> usize {
            ops.iter()
                .map(|op| match op {
                    Op::If(body) => 1 + depth(body),
                    Op::IfElse(a, b) => 1 + depth(a).max(depth(b)),
                    _ => 0,
                })
                .max()
                .unwrap_or(0)
        }
        depth(&self.ops)
    }

    /// Run the program with `inputs` pushed in order; returns the final stack.
    pub fn evaluate(&self, inputs: &[f32]) -> Result<Vec<f32>> {
        let mut stack: Vec<Value> = inputs.iter().copied().map(Value::Real).collect();
        run(&self.ops, &mut stack)?;
        stack.into_iter().map(Value::as_real).collect()
    }
}

fn tokenize(source: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (i, ch) in source.char_indices() {
        if ch.is_whitespace() || ch == '{' || ch == '}' {
            if let Some(s) = start.take() {
                tokens.push(&source[s..i]);
            }
            if ch == '{' || ch == '}' {
                tokens.push(&source[i..i + 1]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(&source[s..]);
    }
    tokens
}

fn parse_number(token: &str) -> Option<Value> {
    if let Ok(v) = token.parse::<i64>() {
        return Some(Value::Int(v));
    }
    let looks_numeric = token
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    if !looks_numeric {
        return None;
    }
    token.parse::<f32>().ok().map(Value::Real)
}

fn parse_block(tokens: &mut std::vec::IntoIter<&str>) -> Result<Vec<Op>> {
    let mut ops = Vec::new();
    loop {
        let Some(token) = tokens.next() else {
            bail!("unterminated procedure: missing '}}'");
        };
        match token {
            "}" => return Ok(ops),
            "{" => {
                let first = parse_block(tokens)?;
                match tokens.next() {
                    Some("if") => ops.push(Op::If(first)),
                    Some("{") => {
                        let second = parse_block(tokens)?;
                        match tokens.next() {
                            Some("ifelse") => ops.push(Op::IfElse(first, second)),
                            other => bail!("expected 'ifelse' after two procedures, got {other:?}"),
                        }
                    }
                    other => bail!("expected 'if' or a second procedure, got {other:?}"),
                }
            }
            "true" => ops.push(Op::Push(Value::Bool(true))),
            "false" => ops.push(Op::Push(Value::Bool(false))),
            "if" | "ifelse" => bail!("'{token}' without a preceding procedure"),
            _ => {
                if let Some(v) = parse_number(token) {
                    ops.push(Op::Push(v));
                } else if let Some(op) = operator_table().get(token) {
                    ops.push(Op::Call(*op));
                } else {
                    bail!("unknown operator '{token}'");
                }
            }
        }
    }
}

/// Parse a calculator program.
///
/// The source must be a single outermost procedure `{ ... }` containing only
/// numbers, booleans, the Type 4 operators, and procedures consumed by `if`
/// or `ifelse`.
pub fn validate_program(source: &str) -> Result<CalculatorProgram> {
    parse_program(source).map_err(|e| {
        anyhow!(
            "calculator program validation failed:\n  {e}\n{}",
            numbered_source(source)
        )
    })
}

/// Validate and name the component that generated the program.
pub fn validate_program_with_context(source: &str, context: &str) -> Result<CalculatorProgram> {
    validate_program(source).with_context(|| format!("{context} generated an invalid program"))
}

/// Parse and evaluate in one step.
pub fn evaluate_program(source: &str, inputs: &[f32]) -> Result<Vec<f32>> {
    validate_program(source)?.evaluate(inputs)
}

fn parse_program(source: &str) -> Result<CalculatorProgram> {
    let mut tokens = tokenize(source).into_iter();
    match tokens.next() {
        Some("{") => {}
        other => bail!("program must start with '{{', got {other:?}"),
    }
    let ops = parse_block(&mut tokens)?;
    if let Some(extra) = tokens.next() {
        bail!("trailing token after program body: '{extra}'");
    }
    Ok(CalculatorProgram { ops })
}

fn numbered_source(source: &str) -> String {
    let mut output = String::from("\nGenerated program:\n---\n");
    for (line_num, line) in source.lines().enumerate() {
        output.push_str(&format!("{:4} | {}\n", line_num + 1, line));
    }
    output.push_str("---\n");
    output
}

fn pop(stack: &mut Vec<Value>) -> Result<Value> {
    stack.pop().ok_or_else(|| anyhow!("stackunderflow"))
}

fn push(stack: &mut Vec<Value>, v: Value) -> Result<()> {
    if stack.len() >= MAX_STACK_DEPTH {
        bail!("stackoverflow");
    }
    stack.push(v);
    Ok(())
}

fn arith(
    a: Value,
    b: Value,
    int_op: fn(i64, i64) -> Option<i64>,
    real_op: fn(f32, f32) -> f32,
) -> Result<Value> {
    if let (Value::Int(x), Value::Int(y)) = (a, b) {
        if let Some(v) = int_op(x, y) {
            return Ok(Value::Int(v));
        }
    }
    Ok(Value::Real(real_op(a.as_real()?, b.as_real()?)))
}

fn compare(a: Value, b: Value, op: Operator) -> Result<bool> {
    if let (Value::Bool(x), Value::Bool(y)) = (a, b) {
        return match op {
            Operator::Eq => Ok(x == y),
            Operator::Ne => Ok(x != y),
            _ => bail!("typecheck: ordered comparison of booleans"),
        };
    }
    let (x, y) = (a.as_real()?, b.as_real()?);
    Ok(match op {
        Operator::Eq => x == y,
        Operator::Ne => x != y,
        Operator::Ge => x >= y,
        Operator::Gt => x > y,
        Operator::Le => x <= y,
        Operator::Lt => x < y,
        _ => unreachable!("not a comparison operator"),
    })
}

fn map_number(v: Value, real_op: fn(f32) -> f32) -> Result<Value> {
    match v {
        Value::Int(i) => Ok(Value::Int(i)),
        Value::Real(r) => Ok(Value::Real(real_op(r))),
        Value::Bool(_) => bail!("typecheck: expected number, got boolean"),
    }
}

fn logical(
    a: Value,
    b: Value,
    bool_op: fn(bool, bool) -> bool,
    int_op: fn(i64, i64) -> i64,
) -> Result<Value> {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => Ok(Value::Bool(bool_op(x, y))),
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(int_op(x, y))),
        _ => bail!("typecheck: mismatched operands for logical operator"),
    }
}

fn count_operand(v: Value, stack_len: usize) -> Result<usize> {
    let n = v.as_int()?;
    if n < 0 || n as usize > stack_len {
        bail!("rangecheck: count {n} with {stack_len} operands");
    }
    Ok(n as usize)
}

fn call(op: Operator, stack: &mut Vec<Value>) -> Result<()> {
    use Operator::*;
    match op {
        Add | Sub | Mul => {
            let b = pop(stack)?;
            let a = pop(stack)?;
            let v = match op {
                Add => arith(a, b, i64::checked_add, |x, y| x + y)?,
                Sub => arith(a, b, i64::checked_sub, |x, y| x - y)?,
                _ => arith(a, b, i64::checked_mul, |x, y| x * y)?,
            };
            push(stack, v)
        }
        Div => {
            let b = pop(stack)?.as_real()?;
            let a = pop(stack)?.as_real()?;
            if b == 0.0 {
                bail!("undefinedresult: division by zero");
            }
            push(stack, Value::Real(a / b))
        }
        Idiv | Mod => {
            let b = pop(stack)?.as_int()?;
            let a = pop(stack)?.as_int()?;
            if b == 0 {
                bail!("undefinedresult: integer division by zero");
            }
            push(stack, Value::Int(if op == Idiv { a / b } else { a % b }))
        }
        Neg => {
            let v = pop(stack)?;
            let v = match v {
                Value::Int(i) => i.checked_neg().map_or(Value::Real(-(i as f32)), Value::Int),
                other => Value::Real(-other.as_real()?),
            };
            push(stack, v)
        }
        Abs => {
            let v = pop(stack)?;
            let v = match v {
                Value::Int(i) => i.checked_abs().map_or(Value::Real((i as f32).abs()), Value::Int),
                other => Value::Real(other.as_real()?.abs()),
            };
            push(stack, v)
        }
        Sqrt => {
            let v = pop(stack)?.as_real()?;
            if v < 0.0 {
                bail!("rangecheck: sqrt of negative number");
            }
            push(stack, Value::Real(v.sqrt()))
        }
        Atan => {
            let den = pop(stack)?.as_real()?;
            let num = pop(stack)?.as_real()?;
            if num == 0.0 && den == 0.0 {
                bail!("undefinedresult: atan of 0/0");
            }
            let deg = num.atan2(den).to_degrees();
            let deg = if deg < 0.0 { deg + 360.0 } else { deg };
            push(stack, Value::Real(deg))
        }
        Sin | Cos => {
            let v = pop(stack)?.as_real()?.to_radians();
            let r = if op == Sin { v.sin() } else { v.cos() };
            push(stack, Value::Real(r))
        }
        Exp => {
            let e = pop(stack)?.as_real()?;
            let b = pop(stack)?.as_real()?;
            push(stack, Value::Real(b.powf(e)))
        }
        Ln | Log => {
            let v = pop(stack)?.as_real()?;
            if v <= 0.0 {
                bail!("rangecheck: logarithm of non-positive number");
            }
            let r = if op == Ln { v.ln() } else { v.log10() };
            push(stack, Value::Real(r))
        }
        Truncate => {
            let v = map_number(pop(stack)?, f32::trunc)?;
            push(stack, v)
        }
        Floor => {
            let v = map_number(pop(stack)?, f32::floor)?;
            push(stack, v)
        }
        Ceiling => {
            let v = map_number(pop(stack)?, f32::ceil)?;
            push(stack, v)
        }
        Round => {
            let v = map_number(pop(stack)?, |r| (r + 0.5).floor())?;
            push(stack, v)
        }
        Cvi => {
            let v = pop(stack)?.as_real()?;
            if !v.is_finite() {
                bail!("rangecheck: cvi of non-finite number");
            }
            push(stack, Value::Int(v.trunc() as i64))
        }
        Cvr => {
            let v = pop(stack)?.as_real()?;
            push(stack, Value::Real(v))
        }
        Eq | Ne | Ge | Gt | Le | Lt => {
            let b = pop(stack)?;
            let a = pop(stack)?;
            let v = compare(a, b, op)?;
            push(stack, Value::Bool(v))
        }
        And | Or | Xor => {
            let b = pop(stack)?;
            let a = pop(stack)?;
            let v = match op {
                And => logical(a, b, |x, y| x && y, |x, y| x & y)?,
                Or => logical(a, b, |x, y| x || y, |x, y| x | y)?,
                _ => logical(a, b, |x, y| x ^ y, |x, y| x ^ y)?,
            };
            push(stack, v)
        }
        Not => {
            let v = match pop(stack)? {
                Value::Bool(b) => Value::Bool(!b),
                Value::Int(i) => Value::Int(!i),
                Value::Real(_) => bail!("typecheck: not of a real"),
            };
            push(stack, v)
        }
        Dup => {
            let v = *stack.last().ok_or_else(|| anyhow!("stackunderflow"))?;
            push(stack, v)
        }
        Exch => {
            let b = pop(stack)?;
            let a = pop(stack)?;
            push(stack, b)?;
            push(stack, a)
        }
        Pop => pop(stack).map(|_| ()),
        Copy => {
            let n = pop(stack)?;
            let n = count_operand(n, stack.len())?;
            let start = stack.len() - n;
            for i in start..start + n {
                let v = stack[i];
                push(stack, v)?;
            }
            Ok(())
        }
        Index => {
            let n = pop(stack)?.as_int()?;
            if n < 0 || n as usize >= stack.len() {
                bail!("rangecheck: index {n} with {} operands", stack.len());
            }
            let v = stack[stack.len() - 1 - n as usize];
            push(stack, v)
        }
        Roll => {
            let j = pop(stack)?.as_int()?;
            let n = pop(stack)?;
            let n = count_operand(n, stack.len())?;
            if n > 0 {
                let start = stack.len() - n;
                let shift = j.rem_euclid(n as i64) as usize;
                stack[start..].rotate_right(shift);
            }
            Ok(())
        }
    }
}

fn run(ops: &[Op], stack: &mut Vec<Value>) -> Result<()> {
    for op in ops {
        match op {
            Op::Push(v) => push(stack, *v)?,
            Op::Call(o) => call(*o, stack).with_context(|| format!("executing {o:?}"))?,
            Op::If(body) => {
                if pop(stack)?.as_bool()? {
                    run(body, stack)?;
                }
            }
            Op::IfElse(a, b) => {
                if pop(stack)?.as_bool()? {
                    run(a, stack)?;
                } else {
                    run(b, stack)?;
                }
            }
        }
    }
    Ok(())
}
