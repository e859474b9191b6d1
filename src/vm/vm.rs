//! The stack-based virtual machine.

use std::io::{BufRead, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bytecode::{Code, Op};
use crate::error::RuntimeError;

use super::input::Input;
use super::value::Value;

/// One activation: the top-level program or a single function call.
struct Frame {
    code: Rc<Code>,
    stack: Vec<Value>,
    env: IndexMap<String, Value>,
    /// Index of the calling frame; dot-prefixed names climb this chain.
    parent: Option<usize>,
}

impl Frame {
    fn new(code: Rc<Code>, stack: Vec<Value>, parent: Option<usize>) -> Self {
        Self {
            code,
            stack,
            env: IndexMap::new(),
            parent,
        }
    }
}

/// The virtual machine. Owns the frame arena and the I/O handles shared by
/// every frame.
pub struct Vm<R, W> {
    frames: Vec<Frame>,
    input: Input<R>,
    output: W,
    rng: StdRng,
}

impl<R: BufRead, W: Write> Vm<R, W> {
    /// A VM with the RNG seeded from wall-clock time.
    pub fn new(input: R, output: W) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::with_seed(input, output, seed)
    }

    /// A VM with a fixed RNG seed, for reproducible runs.
    pub fn with_seed(input: R, output: W, seed: u64) -> Self {
        Self {
            frames: Vec::new(),
            input: Input::new(input),
            output,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Execute a compiled program to completion.
    pub fn run(&mut self, code: Rc<Code>) -> Result<(), RuntimeError> {
        self.frames.push(Frame::new(code, Vec::new(), None));
        let result = self.run_frame(0);
        self.frames.pop();
        result.map(|_| ())
    }

    /// Run one frame until a `Return` or until the instruction pointer runs
    /// off the end of its code (equivalent to a void return).
    fn run_frame(&mut self, fi: usize) -> Result<Option<Value>, RuntimeError> {
        let code = Rc::clone(&self.frames[fi].code);
        let mut ip = 0;
        while ip < code.len() {
            match &code[ip] {
                Op::PushInt(n) => self.push(fi, Value::Int(*n)),
                Op::PushFloat(n) => self.push(fi, Value::Float(*n)),
                Op::PushBool(b) => self.push(fi, Value::Bool(*b)),
                Op::PushString(s) => self.push(fi, Value::Str(s.clone())),
                Op::PushFunction(body) => self.push(fi, Value::Function(Rc::clone(body))),

                Op::LoadName(name) => {
                    let value = self.load(fi, name)?;
                    self.push(fi, value);
                }
                Op::StoreName(name) => {
                    let value = self.pop(fi)?;
                    self.store(fi, name, value)?;
                }
                Op::LoadDynamic => {
                    let name = self.pop_name(fi)?;
                    let value = self.load(fi, &name)?;
                    self.push(fi, value);
                }
                Op::StoreDynamic => {
                    let value = self.pop(fi)?;
                    let name = self.pop_name(fi)?;
                    self.store(fi, &name, value)?;
                }

                op @ (Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Mod) => {
                    let b = self.pop(fi)?;
                    let a = self.pop(fi)?;
                    let result = arithmetic(op, a, b)?;
                    self.push(fi, result);
                }
                Op::Neg => {
                    let negated = match self.pop(fi)? {
                        Value::Int(n) => Value::Int(n.wrapping_neg()),
                        Value::Float(n) => Value::Float(-n),
                        other => {
                            return Err(RuntimeError::type_error(format!(
                                "cannot negate a {}",
                                other.type_name()
                            )))
                        }
                    };
                    self.push(fi, negated);
                }

                Op::Or => {
                    let b = self.pop_bool(fi, "||")?;
                    let a = self.pop_bool(fi, "||")?;
                    self.push(fi, Value::Bool(a || b));
                }
                Op::And => {
                    let b = self.pop_bool(fi, "&&")?;
                    let a = self.pop_bool(fi, "&&")?;
                    self.push(fi, Value::Bool(a && b));
                }
                Op::Not => {
                    let value = self.pop_bool(fi, "!")?;
                    self.push(fi, Value::Bool(!value));
                }

                op @ (Op::Eq | Op::Neq | Op::Less | Op::Greater | Op::Leq | Op::Geq) => {
                    let b = self.pop(fi)?;
                    let a = self.pop(fi)?;
                    let result = compare(op, a, b)?;
                    self.push(fi, Value::Bool(result));
                }

                Op::Jump(offset) => {
                    ip = jump_target(ip, *offset)?;
                    continue;
                }
                Op::JumpIfFalse(offset) => {
                    let condition = match self.pop(fi)? {
                        Value::Bool(b) => b,
                        other => {
                            return Err(RuntimeError::type_error(format!(
                                "condition must be a bool, got {}",
                                other.type_name()
                            )))
                        }
                    };
                    if !condition {
                        ip = jump_target(ip, *offset)?;
                        continue;
                    }
                }

                Op::Call(argc) => {
                    let mut args = Vec::with_capacity(*argc);
                    // Reversed on purpose: the callee's prefix StoreName ops
                    // pop the arguments back into source order.
                    for _ in 0..*argc {
                        let arg = self.pop(fi)?;
                        args.push(arg);
                    }
                    let body = match self.pop(fi)? {
                        Value::Function(body) => body,
                        other => return Err(RuntimeError::NotCallable(other.type_name())),
                    };
                    let child = self.frames.len();
                    self.frames.push(Frame::new(body, args, Some(fi)));
                    let result = self.run_frame(child);
                    self.frames.pop();
                    self.push(fi, result?.unwrap_or(Value::Void));
                }
                Op::Return(with_value) => {
                    if *with_value {
                        return Ok(Some(self.pop(fi)?));
                    }
                    return Ok(None);
                }
                Op::Pop => {
                    self.pop(fi)?;
                }

                Op::ReadInt => {
                    let n = self.input.read_int()?;
                    self.push(fi, Value::Int(n));
                }
                Op::ReadFloat => {
                    let n = self.input.read_float()?;
                    self.push(fi, Value::Float(n));
                }
                Op::ReadString => {
                    let word = self.input.read_token()?;
                    self.push(fi, Value::Str(word));
                }
                Op::ReadLine => {
                    let line = self.input.read_line()?;
                    self.push(fi, Value::Str(line));
                }
                Op::ReadChar => {
                    let c = self.input.read_char()?;
                    self.push(fi, Value::Str(c.to_string()));
                }
                Op::Print(n) => self.print(fi, *n, false)?,
                Op::Println(n) => self.print(fi, *n, true)?,
                Op::Rnd => {
                    let n = self.rng.gen_range(0..=i64::MAX);
                    self.push(fi, Value::Int(n));
                }
            }
            ip += 1;
        }
        Ok(None)
    }

    fn push(&mut self, fi: usize, value: Value) {
        self.frames[fi].stack.push(value);
    }

    fn pop(&mut self, fi: usize) -> Result<Value, RuntimeError> {
        self.frames[fi]
            .stack
            .pop()
            .ok_or(RuntimeError::StackUnderflow)
    }

    fn pop_bool(&mut self, fi: usize, operator: &str) -> Result<bool, RuntimeError> {
        match self.pop(fi)? {
            Value::Bool(b) => Ok(b),
            other => Err(RuntimeError::type_error(format!(
                "operator '{}' expects bools, got {}",
                operator,
                other.type_name()
            ))),
        }
    }

    fn pop_name(&mut self, fi: usize) -> Result<String, RuntimeError> {
        match self.pop(fi)? {
            Value::Str(name) => Ok(name),
            other => Err(RuntimeError::type_error(format!(
                "variable name must be a string, got {}",
                other.type_name()
            ))),
        }
    }

    fn load(&mut self, fi: usize, name: &str) -> Result<Value, RuntimeError> {
        let (target, bare) = self.resolve(fi, name)?;
        self.frames[target]
            .env
            .get(bare)
            .cloned()
            .ok_or_else(|| RuntimeError::undefined_variable(name))
    }

    fn store(&mut self, fi: usize, name: &str, value: Value) -> Result<(), RuntimeError> {
        let (target, bare) = self.resolve(fi, name)?;
        self.frames[target].env.insert(bare.to_string(), value);
        Ok(())
    }

    /// Strip leading dots from the name, climbing one parent frame per dot.
    fn resolve<'n>(&self, fi: usize, name: &'n str) -> Result<(usize, &'n str), RuntimeError> {
        let mut frame = fi;
        let mut bare = name;
        while let Some(rest) = bare.strip_prefix('.') {
            frame = self.frames[frame]
                .parent
                .ok_or_else(|| RuntimeError::DotOverflow(name.to_string()))?;
            bare = rest;
        }
        if bare.is_empty() {
            return Err(RuntimeError::EmptyName);
        }
        Ok((frame, bare))
    }

    /// Pop `count` values (order preserved), join them with single spaces
    /// and write the result out.
    fn print(&mut self, fi: usize, count: usize, newline: bool) -> Result<(), RuntimeError> {
        let stack = &mut self.frames[fi].stack;
        if count > stack.len() {
            return Err(RuntimeError::StackUnderflow);
        }
        let values = stack.split_off(stack.len() - count);
        let mut text = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        if newline {
            text.push('\n');
        }
        self.output.write_all(text.as_bytes())?;
        self.output.flush()?;
        Ok(())
    }
}

fn jump_target(ip: usize, offset: i64) -> Result<usize, RuntimeError> {
    let target = ip as i64 + offset;
    if target < 0 {
        return Err(RuntimeError::JumpOutOfRange(target));
    }
    Ok(target as usize)
}

/// `-`, `*`, `/` and `%` over numbers, with int-to-float promotion; `+`
/// additionally concatenates when either side is a string.
fn arithmetic(op: &Op, a: Value, b: Value) -> Result<Value, RuntimeError> {
    if let Op::Add = op {
        return add(a, b);
    }
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => int_arithmetic(op, a, b),
        (Value::Int(a), Value::Float(b)) => float_arithmetic(op, a as f64, b),
        (Value::Float(a), Value::Int(b)) => float_arithmetic(op, a, b as f64),
        (Value::Float(a), Value::Float(b)) => float_arithmetic(op, a, b),
        (a, b) => Err(RuntimeError::type_error(format!(
            "operator '{}' expects numbers, got {} and {}",
            op_symbol(op),
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn add(a: Value, b: Value) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(b))),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(a as f64 + b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a + b as f64)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
        (Value::Int(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (Value::Float(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (Value::Str(a), Value::Int(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (Value::Str(a), Value::Float(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (Value::Str(mut a), Value::Str(b)) => {
            a.push_str(&b);
            Ok(Value::Str(a))
        }
        (a, b) => Err(RuntimeError::type_error(format!(
            "cannot add {} and {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn int_arithmetic(op: &Op, a: i64, b: i64) -> Result<Value, RuntimeError> {
    let result = match op {
        Op::Sub => a.wrapping_sub(b),
        Op::Mul => a.wrapping_mul(b),
        Op::Div => {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            a.wrapping_div(b)
        }
        Op::Mod => {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            a.wrapping_rem(b)
        }
        _ => unreachable!("not an arithmetic opcode"),
    };
    Ok(Value::Int(result))
}

fn float_arithmetic(op: &Op, a: f64, b: f64) -> Result<Value, RuntimeError> {
    let result = match op {
        Op::Sub => a - b,
        Op::Mul => a * b,
        Op::Div => a / b,
        Op::Mod => {
            return Err(RuntimeError::type_error(
                "operator '%' is not defined on floats",
            ))
        }
        _ => unreachable!("not an arithmetic opcode"),
    };
    Ok(Value::Float(result))
}

/// Comparison dispatch: ints and floats compare with promotion, bools only
/// for equality, strings lexicographically. Everything else is an error.
fn compare(op: &Op, a: Value, b: Value) -> Result<bool, RuntimeError> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Ok(ordered_compare(op, a, b)),
        (Value::Int(a), Value::Float(b)) => Ok(ordered_compare(op, a as f64, b)),
        (Value::Float(a), Value::Int(b)) => Ok(ordered_compare(op, a, b as f64)),
        (Value::Float(a), Value::Float(b)) => Ok(ordered_compare(op, a, b)),
        (Value::Bool(a), Value::Bool(b)) => match op {
            Op::Eq => Ok(a == b),
            Op::Neq => Ok(a != b),
            _ => Err(RuntimeError::type_error(format!(
                "operator '{}' is not defined on bools",
                op_symbol(op)
            ))),
        },
        (Value::Str(a), Value::Str(b)) => Ok(ordered_compare(op, a.as_str(), b.as_str())),
        (a, b) => Err(RuntimeError::type_error(format!(
            "cannot compare {} and {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn ordered_compare<T: PartialOrd>(op: &Op, a: T, b: T) -> bool {
    match op {
        Op::Eq => a == b,
        Op::Neq => a != b,
        Op::Less => a < b,
        Op::Greater => a > b,
        Op::Leq => a <= b,
        Op::Geq => a >= b,
        _ => unreachable!("not a comparison opcode"),
    }
}

fn op_symbol(op: &Op) -> &'static str {
    match op {
        Op::Add => "+",
        Op::Sub => "-",
        Op::Mul => "*",
        Op::Div => "/",
        Op::Mod => "%",
        Op::Eq => "==",
        Op::Neq => "!=",
        Op::Less => "<",
        Op::Greater => ">",
        Op::Leq => "<=",
        Op::Geq => ">=",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::error::{RuntimeError, YailError};
    use crate::{interpret, interpret_with_seed};

    fn run(source: &str, input: &str) -> String {
        let mut output = Vec::new();
        interpret(source, Cursor::new(input.as_bytes()), &mut output).expect("program failed");
        String::from_utf8(output).expect("output is not UTF-8")
    }

    fn run_err(source: &str, input: &str) -> RuntimeError {
        let mut output = Vec::new();
        match interpret(source, Cursor::new(input.as_bytes()), &mut output) {
            Err(YailError::Runtime(err)) => err,
            other => panic!("expected a runtime error, got {:?}", other),
        }
    }

    #[test]
    fn test_hello_world() {
        assert_eq!(
            run(r#"@println("Labas, pasauli!")"#, ""),
            "Labas, pasauli!\n"
        );
    }

    #[test]
    fn test_for_loop_prints_pairs() {
        assert_eq!(
            run("for i = 0; i < 5; i = i + 2 { @println(i, i + 1) }", ""),
            "0 1\n2 3\n4 5\n"
        );
    }

    #[test]
    fn test_factorial_through_parent_frame() {
        let source = r#"fun = (x) { fun = .fun
            if x == 0 { return 1 } else { return x * fun(x - 1) } }
        @print(fun(5))"#;
        assert_eq!(run(source, ""), "120");
    }

    #[test]
    fn test_sieve_of_eratosthenes() {
        let source = r#"MAX = 100
        for i = 2; i < MAX; i = i + 1 {
            isPrime[i] = true
        }
        numPrimes = 0
        for i = 2; i < MAX; i = i + 1 {
            if isPrime[i] {
                primes[numPrimes] = i
                numPrimes = numPrimes + 1
                for j = i * 2; j < MAX; j = j + i {
                    isPrime[j] = false
                }
            }
        }
        for i = 0; i < numPrimes; i = i + 1 {
            @println(primes[i])
        }"#;
        let primes = [
            2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79,
            83, 89, 97,
        ];
        let expected: String = primes.iter().map(|p| format!("{}\n", p)).collect();
        assert_eq!(run(source, ""), expected);
    }

    #[test]
    fn test_mixed_arithmetic() {
        let output = run("a = 5 + 4 * (3 - 7.2 / 2) ; @print(a)", "");
        let value: f64 = output.parse().expect("output is not a float");
        assert!((value - 2.6).abs() < 1e-9, "got {}", value);
    }

    #[test]
    fn test_while_reads_until_nonpositive() {
        let source = "while @int > 0 { @println(\"still positive\") }\n@println(\"end\")";
        assert_eq!(run(source, "3 0"), "still positive\nend\n");
    }

    #[test]
    fn test_dot_prefix_addresses_parent_frame() {
        let source = r#"x = 1
        f = (y) { x = 99
            .x = .x + y
            return x }
        r = f(5)
        @println(x, r)"#;
        assert_eq!(run(source, ""), "6 99\n");
    }

    #[test]
    fn test_void_call_in_statement_context() {
        let source = r#"greet = () { @println("hi")
            return }
        greet()
        @println("done")"#;
        assert_eq!(run(source, ""), "hi\ndone\n");
    }

    #[test]
    fn test_string_concat_coercion() {
        assert_eq!(
            run(r#"s = "a" + 1 + 2.5 ; t = 1 + "b" ; @println(s, t)"#, ""),
            "a12.5 1b\n"
        );
    }

    #[test]
    fn test_string_comparison() {
        assert_eq!(
            run(r#"@println("abc" < "abd", "x" == "x", "a" >= "b")"#, ""),
            "true true false\n"
        );
    }

    #[test]
    fn test_eager_logic_has_no_short_circuit() {
        // Both operands evaluate: the read on the right side consumes input
        // even though the left side already decides the answer.
        assert_eq!(
            run("a = false && @int > 0\nb = @int\n@println(a, b)", "1 7"),
            "false 7\n"
        );
    }

    #[test]
    fn test_read_line_and_char() {
        assert_eq!(
            run("c = @char\nrest = @line\n@print(c, rest)", "abc\n"),
            "a bc\n"
        );
    }

    #[test]
    fn test_read_string_word() {
        assert_eq!(run("w = @string\n@println(w)", "labas pasauli"), "labas\n");
    }

    #[test]
    fn test_indexed_variables_are_name_keys() {
        assert_eq!(
            run("i = 3\na[i] = 7\na[i + 1] = 8\n@println(a[3], a[4])", ""),
            "7 8\n"
        );
    }

    #[test]
    fn test_unary_minus_and_not() {
        assert_eq!(
            run("@println(-5 + 3, !(1 > 2), - -2)", ""),
            "-2 true 2\n"
        );
    }

    #[test]
    fn test_integer_division_truncates_toward_zero() {
        assert_eq!(run("@println(7 / 2, -7 / 2, 7 % 3, -7 % 3)", ""), "3 -3 1 -1\n");
    }

    #[test]
    fn test_seeded_rnd_is_deterministic() {
        let source = "a = @rnd\nb = @rnd\n@println(a, b)";
        let mut first = Vec::new();
        let mut second = Vec::new();
        interpret_with_seed(source, Cursor::new(&b""[..]), &mut first, 42).unwrap();
        interpret_with_seed(source, Cursor::new(&b""[..]), &mut second, 42).unwrap();
        assert_eq!(first, second);
        let text = String::from_utf8(first).unwrap();
        for word in text.split_whitespace() {
            let value: i64 = word.parse().expect("rnd output is not an int");
            assert!(value >= 0);
        }
    }

    #[test]
    fn test_undefined_variable() {
        assert!(matches!(
            run_err("@print(x)", ""),
            RuntimeError::UndefinedVariable(name) if name == "x"
        ));
    }

    #[test]
    fn test_dot_overflow_at_top_level() {
        assert!(matches!(
            run_err(".x = 5", ""),
            RuntimeError::DotOverflow(name) if name == ".x"
        ));
    }

    #[test]
    fn test_type_error_in_operator() {
        assert!(matches!(
            run_err("a = 1 + true", ""),
            RuntimeError::Type { .. }
        ));
    }

    #[test]
    fn test_mixed_string_number_comparison_fails() {
        assert!(matches!(
            run_err(r#"a = 1 < "b""#, ""),
            RuntimeError::Type { .. }
        ));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(
            run_err("a = 1 / 0", ""),
            RuntimeError::DivisionByZero
        ));
    }

    #[test]
    fn test_float_modulo_fails() {
        assert!(matches!(
            run_err("a = 1.5 % 2", ""),
            RuntimeError::Type { .. }
        ));
    }

    #[test]
    fn test_read_failure_on_empty_input() {
        assert!(matches!(run_err("a = @int", ""), RuntimeError::Read { .. }));
    }

    #[test]
    fn test_calling_a_non_function() {
        assert!(matches!(
            run_err("a = 5\na()", ""),
            RuntimeError::NotCallable("int")
        ));
    }
}
