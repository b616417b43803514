//! Arithmetic expression evaluation for math instructions.
//!
//! A small shunting-yard evaluator over f64: `+ - * / % ^`, unary minus,
//! parentheses. Results print without a fractional part when integral.

/// Evaluate an arithmetic expression.
pub fn eval(expr: &str) -> Result<f64, String> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    evaluate(&tokens)
}

/// Render a result the way it appears in output: integral values without a
/// fractional part, everything else in shortest form.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Op(Op),
    LParen,
    RParen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Neg,
}

impl Op {
    fn precedence(self) -> u8 {
        match self {
            Op::Add | Op::Sub => 1,
            Op::Mul | Op::Div | Op::Rem => 2,
            Op::Neg => 3,
            Op::Pow => 4,
        }
    }

    fn right_assoc(self) -> bool {
        matches!(self, Op::Pow | Op::Neg)
    }
}

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();
    // Tracks whether a `-` is a unary minus or a subtraction.
    let mut expect_operand = true;

    while let Some(&ch) = chars.peek() {
        match ch {
            ' ' | '\t' => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        literal.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value: f64 = literal
                    .parse()
                    .map_err(|_| format!("bad number literal '{literal}'"))?;
                tokens.push(Token::Number(value));
                expect_operand = false;
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
                expect_operand = true;
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
                expect_operand = false;
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                chars.next();
                let op = match ch {
                    '+' => Op::Add,
                    '-' if expect_operand => Op::Neg,
                    '-' => Op::Sub,
                    '*' => Op::Mul,
                    '/' => Op::Div,
                    '%' => Op::Rem,
                    _ => Op::Pow,
                };
                tokens.push(Token::Op(op));
                expect_operand = true;
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }
    Ok(tokens)
}

fn evaluate(tokens: &[Token]) -> Result<f64, String> {
    let mut output: Vec<f64> = Vec::new();
    let mut ops: Vec<Token> = Vec::new();

    fn apply(output: &mut Vec<f64>, op: Op) -> Result<(), String> {
        if op == Op::Neg {
            let a = output.pop().ok_or("missing operand")?;
            output.push(-a);
            return Ok(());
        }
        let b = output.pop().ok_or("missing operand")?;
        let a = output.pop().ok_or("missing operand")?;
        let value = match op {
            Op::Add => a + b,
            Op::Sub => a - b,
            Op::Mul => a * b,
            Op::Div => {
                if b == 0.0 {
                    return Err("division by zero".to_string());
                }
                a / b
            }
            Op::Rem => {
                if b == 0.0 {
                    return Err("division by zero".to_string());
                }
                a % b
            }
            Op::Pow => a.powf(b),
            Op::Neg => unreachable!(),
        };
        output.push(value);
        Ok(())
    }

    for &token in tokens {
        match token {
            Token::Number(n) => output.push(n),
            Token::Op(op) => {
                while let Some(&Token::Op(top)) = ops.last() {
                    let tighter = top.precedence() > op.precedence()
                        || (top.precedence() == op.precedence() && !op.right_assoc());
                    if !tighter {
                        break;
                    }
                    ops.pop();
                    apply(&mut output, top)?;
                }
                ops.push(Token::Op(op));
            }
            Token::LParen => ops.push(Token::LParen),
            Token::RParen => {
                loop {
                    match ops.pop() {
                        Some(Token::Op(op)) => apply(&mut output, op)?,
                        Some(Token::LParen) => break,
                        _ => return Err("unbalanced parentheses".to_string()),
                    }
                }
            }
        }
    }
    while let Some(token) = ops.pop() {
        match token {
            Token::Op(op) => apply(&mut output, op)?,
            _ => return Err("unbalanced parentheses".to_string()),
        }
    }
    match output.as_slice() {
        [value] => Ok(*value),
        _ => Err("malformed expression".to_string()),
    }
}
