//! PostScript calculator functions.

use crate::error::{Result, bail, err};
use crate::function::Values;
use crate::lexer::{Lexer, Token};
use log::trace;

const STACK_SIZE: usize = 100;
const MAX_NESTING: usize = 64;

/// A value on the operand stack.
#[derive(Debug, Copy, Clone, PartialEq)]
enum Value {
    Int(i32),
    Real(f32),
    Bool(bool),
}

impl Value {
    fn as_f32(self) -> Result<f32> {
        match self {
            Self::Int(i) => Ok(i as f32),
            Self::Real(r) => Ok(r),
            Self::Bool(_) => bail!(TypeCheck, "expected a number, found a boolean"),
        }
    }

    fn as_int(self) -> Result<i32> {
        match self {
            Self::Int(i) => Ok(i),
            _ => bail!(TypeCheck, "expected an integer, found {self:?}"),
        }
    }

    fn as_bool(self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(b),
            _ => bail!(TypeCheck, "expected a boolean, found {self:?}"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Operator {
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
    Bitshift,
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

impl Operator {
    fn from_name(name: &[u8]) -> Option<Self> {
        Some(match name {
            b"abs" => Self::Abs,
            b"add" => Self::Add,
            b"atan" => Self::Atan,
            b"ceiling" => Self::Ceiling,
            b"cos" => Self::Cos,
            b"cvi" => Self::Cvi,
            b"cvr" => Self::Cvr,
            b"div" => Self::Div,
            b"exp" => Self::Exp,
            b"floor" => Self::Floor,
            b"idiv" => Self::Idiv,
            b"ln" => Self::Ln,
            b"log" => Self::Log,
            b"mod" => Self::Mod,
            b"mul" => Self::Mul,
            b"neg" => Self::Neg,
            b"round" => Self::Round,
            b"sin" => Self::Sin,
            b"sqrt" => Self::Sqrt,
            b"sub" => Self::Sub,
            b"truncate" => Self::Truncate,
            b"and" => Self::And,
            b"bitshift" => Self::Bitshift,
            b"eq" => Self::Eq,
            b"ge" => Self::Ge,
            b"gt" => Self::Gt,
            b"le" => Self::Le,
            b"lt" => Self::Lt,
            b"ne" => Self::Ne,
            b"not" => Self::Not,
            b"or" => Self::Or,
            b"xor" => Self::Xor,
            b"copy" => Self::Copy,
            b"dup" => Self::Dup,
            b"exch" => Self::Exch,
            b"index" => Self::Index,
            b"pop" => Self::Pop,
            b"roll" => Self::Roll,
            _ => return None,
        })
    }
}

/// An instruction of a compiled program. Jumps are relative and always go
/// forward.
#[derive(Debug, Copy, Clone, PartialEq)]
enum Instruction {
    Push(Value),
    Op(Operator),
    /// Pop a boolean and skip the given number of instructions if it is false.
    JumpUnless(usize),
    /// Skip the given number of instructions.
    Jump(usize),
}

/// A type 4 function (PostScript calculator function).
#[derive(Debug)]
pub(crate) struct PostScript {
    program: Vec<Instruction>,
}

impl PostScript {
    pub(crate) fn new(data: &[u8]) -> Result<Self> {
        let mut lexer = Lexer::new(data);

        match lexer.next_token()? {
            Token::BraceOpen => {}
            other => bail!(
                SyntaxError,
                "calculator function must start with '{{', found {other:?}"
            ),
        }

        let program = compile_block(&mut lexer, 0)?;

        Ok(Self { program })
    }

    pub(crate) fn evaluate(&self, input: &[f32], outputs: usize) -> Result<Values> {
        let mut stack = Stack::default();

        for x in input {
            stack.push(Value::Real(*x))?;
        }

        let mut pc = 0;

        while let Some(instruction) = self.program.get(pc) {
            pc += 1;

            match *instruction {
                Instruction::Push(value) => stack.push(value)?,
                Instruction::Op(op) => execute(op, &mut stack)?,
                Instruction::JumpUnless(skip) => {
                    if !stack.pop()?.as_bool()? {
                        pc += skip;
                    }
                }
                Instruction::Jump(skip) => pc += skip,
            }
        }

        if stack.len() < outputs {
            bail!(
                StackUnderflow,
                "calculator function left {} values, expected {outputs}",
                stack.len()
            );
        }

        if stack.len() > outputs {
            trace!("calculator function left {} extra values", stack.len() - outputs);
        }

        stack.values[stack.len() - outputs..]
            .iter()
            .map(|v| v.as_f32())
            .collect()
    }
}

/// Compile the tokens up to the closing brace of the current block.
fn compile_block(lexer: &mut Lexer<'_>, depth: usize) -> Result<Vec<Instruction>> {
    if depth > MAX_NESTING {
        bail!(SyntaxError, "calculator function is nested too deeply");
    }

    let mut program = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::BraceClose => return Ok(program),
            Token::Int(i) => program.push(Instruction::Push(match i32::try_from(i) {
                Ok(i) => Value::Int(i),
                Err(_) => Value::Real(i as f32),
            })),
            Token::Real(r) => program.push(Instruction::Push(Value::Real(r as f32))),
            Token::BraceOpen => {
                let then = compile_block(lexer, depth + 1)?;

                let otherwise = if matches!(lexer.peek()?, Token::BraceOpen) {
                    lexer.next_token()?;
                    Some(compile_block(lexer, depth + 1)?)
                } else {
                    None
                };

                let keyword = lexer.next_token()?;

                match otherwise {
                    None if keyword.is_keyword(b"if") => {
                        program.push(Instruction::JumpUnless(then.len()));
                        program.extend(then);
                    }
                    Some(otherwise) if keyword.is_keyword(b"ifelse") => {
                        program.push(Instruction::JumpUnless(then.len() + 1));
                        program.extend(then);
                        program.push(Instruction::Jump(otherwise.len()));
                        program.extend(otherwise);
                    }
                    _ => bail!(
                        SyntaxError,
                        "procedure in calculator function is not followed by if/ifelse"
                    ),
                }
            }
            Token::Keyword(k) => match &*k {
                b"true" => program.push(Instruction::Push(Value::Bool(true))),
                b"false" => program.push(Instruction::Push(Value::Bool(false))),
                name => {
                    let op = Operator::from_name(name).ok_or_else(|| {
                        err!(
                            SyntaxError,
                            "unknown calculator operator {}",
                            String::from_utf8_lossy(name)
                        )
                    })?;

                    program.push(Instruction::Op(op));
                }
            },
            Token::Eof => bail!(SyntaxError, "unterminated calculator function"),
            other => bail!(SyntaxError, "unexpected {other:?} in calculator function"),
        }
    }
}

#[derive(Default)]
struct Stack {
    values: Vec<Value>,
}

impl Stack {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn push(&mut self, value: Value) -> Result<()> {
        if self.values.len() >= STACK_SIZE {
            bail!(StackOverflow, "calculator stack exceeds {STACK_SIZE} entries");
        }

        self.values.push(value);

        Ok(())
    }

    fn pop(&mut self) -> Result<Value> {
        self.values
            .pop()
            .ok_or_else(|| err!(StackUnderflow, "calculator stack is empty"))
    }

    fn pop_f32(&mut self) -> Result<f32> {
        self.pop()?.as_f32()
    }

    fn pop_int(&mut self) -> Result<i32> {
        self.pop()?.as_int()
    }

    /// The index of the `n`th value from the top.
    fn from_top(&self, n: i32) -> Result<usize> {
        usize::try_from(n)
            .ok()
            .and_then(|n| self.values.len().checked_sub(n + 1))
            .ok_or_else(|| err!(StackUnderflow, "calculator stack has no entry {n}"))
    }
}

fn real_or_int(value: f64) -> Value {
    if value >= i32::MIN as f64 && value <= i32::MAX as f64 {
        Value::Int(value as i32)
    } else {
        Value::Real(value as f32)
    }
}

fn arithmetic(
    stack: &mut Stack,
    int: fn(i32, i32) -> Option<i32>,
    real: fn(f32, f32) -> f32,
) -> Result<()> {
    let b = stack.pop()?;
    let a = stack.pop()?;

    let result = match (a, b) {
        (Value::Int(a), Value::Int(b)) => match int(a, b) {
            Some(r) => Value::Int(r),
            None => Value::Real(real(a as f32, b as f32)),
        },
        _ => Value::Real(real(a.as_f32()?, b.as_f32()?)),
    };

    stack.push(result)
}

fn compare(stack: &mut Stack, cmp: fn(f32, f32) -> bool) -> Result<()> {
    let b = stack.pop_f32()?;
    let a = stack.pop_f32()?;

    stack.push(Value::Bool(cmp(a, b)))
}

fn logic(stack: &mut Stack, int: fn(i32, i32) -> i32, bool: fn(bool, bool) -> bool) -> Result<()> {
    let b = stack.pop()?;
    let a = stack.pop()?;

    let result = match (a, b) {
        (Value::Int(a), Value::Int(b)) => Value::Int(int(a, b)),
        (Value::Bool(a), Value::Bool(b)) => Value::Bool(bool(a, b)),
        _ => bail!(TypeCheck, "operands of a logical operator must both be integers or booleans"),
    };

    stack.push(result)
}

fn round_op(stack: &mut Stack, round: fn(f32) -> f32) -> Result<()> {
    match stack.pop()? {
        Value::Int(i) => stack.push(Value::Int(i)),
        Value::Real(r) => stack.push(Value::Real(round(r))),
        Value::Bool(_) => bail!(TypeCheck, "cannot round a boolean"),
    }
}

fn execute(op: Operator, stack: &mut Stack) -> Result<()> {
    match op {
        Operator::Abs => match stack.pop()? {
            Value::Int(i) => stack.push(i.checked_abs().map_or(Value::Real((i as f32).abs()), Value::Int)),
            v => stack.push(Value::Real(v.as_f32()?.abs())),
        },
        Operator::Neg => match stack.pop()? {
            Value::Int(i) => stack.push(i.checked_neg().map_or(Value::Real(-(i as f32)), Value::Int)),
            v => stack.push(Value::Real(-v.as_f32()?)),
        },
        Operator::Add => arithmetic(stack, i32::checked_add, |a, b| a + b),
        Operator::Sub => arithmetic(stack, i32::checked_sub, |a, b| a - b),
        Operator::Mul => arithmetic(stack, i32::checked_mul, |a, b| a * b),
        Operator::Div => {
            let b = stack.pop_f32()?;
            let a = stack.pop_f32()?;

            if b == 0.0 {
                bail!(UndefinedResult, "division by zero");
            }

            stack.push(Value::Real(a / b))
        }
        Operator::Idiv | Operator::Mod => {
            let b = stack.pop_int()?;
            let a = stack.pop_int()?;

            if b == 0 {
                bail!(UndefinedResult, "integer division by zero");
            }

            let result = if op == Operator::Idiv {
                a.wrapping_div(b)
            } else {
                a.wrapping_rem(b)
            };

            stack.push(Value::Int(result))
        }
        Operator::Atan => {
            let den = stack.pop_f32()?;
            let num = stack.pop_f32()?;

            if num == 0.0 && den == 0.0 {
                bail!(UndefinedResult, "atan of 0/0");
            }

            let angle = num.atan2(den).to_degrees();
            stack.push(Value::Real(if angle < 0.0 { angle + 360.0 } else { angle }))
        }
        Operator::Cos => {
            let x = stack.pop_f32()?;
            stack.push(Value::Real(x.to_radians().cos()))
        }
        Operator::Sin => {
            let x = stack.pop_f32()?;
            stack.push(Value::Real(x.to_radians().sin()))
        }
        Operator::Exp => {
            let exponent = stack.pop_f32()?;
            let base = stack.pop_f32()?;
            let result = base.powf(exponent);

            if !result.is_finite() {
                bail!(UndefinedResult, "{base} exp {exponent} is not finite");
            }

            stack.push(Value::Real(result))
        }
        Operator::Ln | Operator::Log => {
            let x = stack.pop_f32()?;

            if x <= 0.0 {
                bail!(UndefinedResult, "logarithm of {x}");
            }

            stack.push(Value::Real(if op == Operator::Ln { x.ln() } else { x.log10() }))
        }
        Operator::Sqrt => {
            let x = stack.pop_f32()?;

            if x < 0.0 {
                bail!(UndefinedResult, "square root of {x}");
            }

            stack.push(Value::Real(x.sqrt()))
        }
        Operator::Ceiling => round_op(stack, f32::ceil),
        Operator::Floor => round_op(stack, f32::floor),
        Operator::Round => round_op(stack, |x| (x + 0.5).floor()),
        Operator::Truncate => round_op(stack, f32::trunc),
        Operator::Cvi => {
            let x = stack.pop_f32()?;
            stack.push(real_or_int(f64::from(x.trunc())))
        }
        Operator::Cvr => {
            let x = stack.pop_f32()?;
            stack.push(Value::Real(x))
        }
        Operator::And => logic(stack, |a, b| a & b, |a, b| a & b),
        Operator::Or => logic(stack, |a, b| a | b, |a, b| a | b),
        Operator::Xor => logic(stack, |a, b| a ^ b, |a, b| a ^ b),
        Operator::Not => match stack.pop()? {
            Value::Int(i) => stack.push(Value::Int(!i)),
            Value::Bool(b) => stack.push(Value::Bool(!b)),
            Value::Real(_) => bail!(TypeCheck, "not of a real number"),
        },
        Operator::Bitshift => {
            let shift = stack.pop_int()?;
            let value = stack.pop_int()?;

            let result = if shift >= 0 {
                value.checked_shl(shift as u32).unwrap_or(0)
            } else {
                ((value as u32).checked_shr(shift.unsigned_abs()).unwrap_or(0)) as i32
            };

            stack.push(Value::Int(result))
        }
        Operator::Eq | Operator::Ne => {
            let b = stack.pop()?;
            let a = stack.pop()?;

            let equal = match (a, b) {
                (Value::Bool(a), Value::Bool(b)) => a == b,
                (Value::Bool(_), _) | (_, Value::Bool(_)) => false,
                (a, b) => a.as_f32()? == b.as_f32()?,
            };

            stack.push(Value::Bool(equal == (op == Operator::Eq)))
        }
        Operator::Ge => compare(stack, |a, b| a >= b),
        Operator::Gt => compare(stack, |a, b| a > b),
        Operator::Le => compare(stack, |a, b| a <= b),
        Operator::Lt => compare(stack, |a, b| a < b),
        Operator::Dup => {
            let top = *stack
                .values
                .last()
                .ok_or_else(|| err!(StackUnderflow, "dup on an empty stack"))?;
            stack.push(top)
        }
        Operator::Exch => {
            let b = stack.pop()?;
            let a = stack.pop()?;
            stack.push(b)?;
            stack.push(a)
        }
        Operator::Pop => stack.pop().map(|_| ()),
        Operator::Copy => {
            let n = stack.pop_int()?;

            if n == 0 {
                return Ok(());
            }

            let start = stack.from_top(n.saturating_sub(1))?;
            let copied = stack.values[start..].to_vec();

            for value in copied {
                stack.push(value)?;
            }

            Ok(())
        }
        Operator::Index => {
            let n = stack.pop_int()?;
            let value = stack.values[stack.from_top(n)?];
            stack.push(value)
        }
        Operator::Roll => {
            let j = stack.pop_int()?;
            let n = stack.pop_int()?;

            if n == 0 {
                return Ok(());
            }

            let start = stack.from_top(n.saturating_sub(1))?;
            let window = &mut stack.values[start..];
            let shift = j.rem_euclid(n) as usize;

            window.rotate_right(shift);

            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::function::tests::stream_function;

    fn run(program: &str, input: &[f32], outputs: usize) -> Result<Vec<f32>> {
        PostScript::new(program.as_bytes())?
            .evaluate(input, outputs)
            .map(|v| v.to_vec())
    }

    #[test]
    fn arithmetic() {
        assert_eq!(run("{ 2 mul 1 add }", &[3.0], 1).unwrap(), [7.0]);
        assert_eq!(run("{ 7 2 idiv 7 2 mod }", &[], 2).unwrap(), [3.0, 1.0]);
        assert_eq!(run("{ 1 2 div }", &[], 1).unwrap(), [0.5]);
        assert_eq!(run("{ -3 abs 4 neg }", &[], 2).unwrap(), [3.0, -4.0]);
        assert_eq!(run("{ 16 sqrt 2 3 exp }", &[], 2).unwrap(), [4.0, 8.0]);
        assert_eq!(run("{ 0 1 atan 90 cos }", &[], 2).unwrap()[0], 0.0);
        assert!((run("{ 1 0 atan }", &[], 1).unwrap()[0] - 90.0).abs() < 1e-4);
    }

    #[test]
    fn rounding() {
        assert_eq!(
            run("{ 2.5 round -2.5 round 2.7 truncate -2.7 floor 2.1 ceiling }", &[], 5).unwrap(),
            [3.0, -2.0, 2.0, -3.0, 3.0]
        );
        assert_eq!(run("{ 3.9 cvi 2 cvr }", &[], 2).unwrap(), [3.0, 2.0]);
    }

    #[test]
    fn stack_operators() {
        assert_eq!(run("{ 1 2 exch }", &[], 2).unwrap(), [2.0, 1.0]);
        assert_eq!(run("{ 1 2 3 2 copy }", &[], 5).unwrap(), [1.0, 2.0, 3.0, 2.0, 3.0]);
        assert_eq!(run("{ 1 2 3 2 index }", &[], 4).unwrap(), [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(run("{ 1 2 3 3 1 roll }", &[], 3).unwrap(), [3.0, 1.0, 2.0]);
        assert_eq!(run("{ 1 2 3 3 -1 roll }", &[], 3).unwrap(), [2.0, 3.0, 1.0]);
        assert_eq!(run("{ 1 dup pop }", &[], 1).unwrap(), [1.0]);
    }

    #[test]
    fn conditionals() {
        let program = "{ dup 0.5 gt { pop 1 } { pop 0 } ifelse }";
        assert_eq!(run(program, &[0.7], 1).unwrap(), [1.0]);
        assert_eq!(run(program, &[0.2], 1).unwrap(), [0.0]);

        let program = "{ dup 0 lt { neg } if }";
        assert_eq!(run(program, &[-0.25], 1).unwrap(), [0.25]);
        assert_eq!(run(program, &[0.75], 1).unwrap(), [0.75]);

        let nested = "{ dup 0.5 lt { dup 0.25 lt { pop 1 } { pop 2 } ifelse } { pop 3 } ifelse }";
        assert_eq!(run(nested, &[0.1], 1).unwrap(), [1.0]);
        assert_eq!(run(nested, &[0.3], 1).unwrap(), [2.0]);
        assert_eq!(run(nested, &[0.9], 1).unwrap(), [3.0]);
    }

    #[test]
    fn logic() {
        assert_eq!(run("{ 12 10 and 12 10 or 12 10 xor }", &[], 3).unwrap(), [8.0, 14.0, 6.0]);
        assert_eq!(run("{ 1 3 bitshift 16 -2 bitshift }", &[], 2).unwrap(), [8.0, 4.0]);
        assert_eq!(
            run("{ true false and { 1 } { 0 } ifelse 1 1.0 eq { 1 } { 0 } ifelse }", &[], 2).unwrap(),
            [0.0, 1.0]
        );
    }

    #[test]
    fn errors() {
        let kind = |program: &str| run(program, &[], 1).unwrap_err().kind();

        assert_eq!(kind("{ 1 0 div }"), ErrorKind::UndefinedResult);
        assert_eq!(kind("{ 1 0 idiv }"), ErrorKind::UndefinedResult);
        assert_eq!(kind("{ add }"), ErrorKind::StackUnderflow);
        assert_eq!(kind("{ true 1 add }"), ErrorKind::TypeCheck);
        assert_eq!(kind("{ 1.5 2 idiv }"), ErrorKind::TypeCheck);
        assert_eq!(kind("{ 1 { 2 } if }"), ErrorKind::TypeCheck);
        assert_eq!(kind("{ 1 foo }"), ErrorKind::SyntaxError);
        assert_eq!(kind("{ 1 { 2 } }"), ErrorKind::SyntaxError);
        assert_eq!(kind("{ 1 2"), ErrorKind::SyntaxError);
        assert_eq!(kind("{ true }"), ErrorKind::TypeCheck);
        assert_eq!(kind("{ -1 copy }"), ErrorKind::StackUnderflow);
        assert_eq!(kind("{ -2147483648 copy }"), ErrorKind::StackUnderflow);
        assert_eq!(kind("{ 1 -2147483648 0 roll }"), ErrorKind::StackUnderflow);
    }

    #[test]
    fn stack_overflow() {
        let program = format!("{{ {} }}", "1 ".repeat(101));

        let err = run(&program, &[], 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StackOverflow);
    }

    #[test]
    fn as_function() {
        let f = stream_function(
            "<< /FunctionType 4 /Domain [0 1 0 1] /Range [0 1] >>",
            b"{ add 2 div }",
        )
        .unwrap();

        assert_eq!(f.evaluate(&[0.5, 1.0]).unwrap().as_slice(), &[0.75]);
        assert_eq!(f.evaluate(&[3.0, 1.0]).unwrap().as_slice(), &[1.0]);
    }
}
