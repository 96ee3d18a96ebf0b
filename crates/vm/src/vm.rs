//! The stack-based bytecode interpreter (`spec.md` §4.6).
//!
//! Grounded on the reference implementation's function-enabled `_cw_run`
//! dispatch loop (the canonical iteration per `spec.md` §9 — an earlier
//! iteration with no `OP_CALL`/`OP_CLOSURE` exists in the same source
//! tree but is not what this targets). `BINARY_OP`-style C macros become
//! the `binary_numeric_op` helper below, the same de-macro-ing the
//! teacher's own arithmetic helpers do.

use crate::error::RuntimeError;
use crate::natives;
use clockwork_compiler::compile;
use clockwork_core::{Obj, ObjClosure, ObjFunction, ObjNative, OpCode, Table, Value};
use std::rc::Rc;
use std::time::Instant;

const FRAMES_MAX: usize = 64;
const STACK_MAX: usize = FRAMES_MAX * 256;

struct CallFrame {
    closure: Rc<ObjClosure>,
    ip: usize,
    slot_base: usize,
}

/// What interpreting a whole program, or one REPL line, can fail with.
pub enum InterpretError {
    Compile(Vec<clockwork_compiler::CompileError>),
    Runtime(RuntimeError),
}

/// A Clockwork virtual machine: operand stack, call frames, globals, and
/// the string intern table shared with the compiler.
pub struct Vm {
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    globals: Table,
    strings: Table,
    /// Contract-surface "every allocation is reachable from the VM"
    /// list (`spec.md` §9 Design Notes). Actual deallocation happens
    /// when the last `Rc` referencing an object drops; this `Vec` is not
    /// what frees memory, it mirrors the reference implementation's
    /// intrusive object list so a future collector could walk it without
    /// changing any call site that pushes into it.
    objects: Vec<Obj>,
    start_time: Instant,
}

impl Vm {
    pub fn new() -> Self {
        let mut vm = Vm {
            stack: Vec::with_capacity(STACK_MAX),
            frames: Vec::with_capacity(FRAMES_MAX),
            globals: Table::new(),
            strings: Table::new(),
            objects: Vec::new(),
            start_time: Instant::now(),
        };
        natives::install(&mut vm);
        vm
    }

    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    /// Compile and run `source` to completion. A REPL driver calls this
    /// once per line against one long-lived `Vm`; a file driver calls it
    /// once against a fresh one.
    pub fn interpret(&mut self, source: &str) -> Result<(), InterpretError> {
        let function = compile(source, &mut self.strings).map_err(InterpretError::Compile)?;
        let closure = Rc::new(ObjClosure { function });
        self.objects.push(Obj::Closure(closure.clone()));
        self.stack.push(Value::Object(Obj::Closure(closure.clone())));
        self.frames.push(CallFrame {
            closure,
            ip: 0,
            slot_base: 0,
        });
        self.run().map_err(|error| {
            // `_cw_reset_stack`: a runtime error unwinds past any live
            // frames and operands. Without this, a persistent REPL `Vm`
            // would carry stale frames/slots into the next line.
            self.reset_stack();
            InterpretError::Runtime(error)
        })
    }

    fn reset_stack(&mut self) {
        self.stack.clear();
        self.frames.clear();
    }

    pub fn define_native(&mut self, name: &str, func: impl Fn(&[Value]) -> Value + 'static) {
        let name = self.strings.intern(name.as_bytes().to_vec());
        let native = Rc::new(ObjNative {
            name: name.clone(),
            func: Rc::new(func),
        });
        self.objects.push(Obj::Native(native.clone()));
        self.globals.insert(&name, Value::Object(Obj::Native(native)));
    }

    // --- frame/stack plumbing -------------------------------------------

    fn frame_mut(&mut self) -> &mut CallFrame {
        self.frames.last_mut().unwrap()
    }

    fn read_byte(&mut self) -> u8 {
        let frame = self.frame_mut();
        let byte = frame.closure.function.chunk.code()[frame.ip];
        frame.ip += 1;
        byte
    }

    fn read_short(&mut self) -> u16 {
        let hi = self.read_byte() as u16;
        let lo = self.read_byte() as u16;
        (hi << 8) | lo
    }

    fn read_constant(&mut self) -> Value {
        let index = self.read_byte() as usize;
        let frame = self.frames.last().unwrap();
        frame.closure.function.chunk.constant(index).clone()
    }

    fn read_string(&mut self) -> Rc<clockwork_core::ObjString> {
        match self.read_constant() {
            Value::Object(Obj::String(s)) => s,
            _ => unreachable!("compiler only emits string constants for name operands"),
        }
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("stack underflow: compiler bug")
    }

    fn peek(&self, distance: usize) -> &Value {
        &self.stack[self.stack.len() - 1 - distance]
    }

    fn runtime_error(&self, message: impl Into<String>) -> RuntimeError {
        let mut trace = Vec::new();
        for frame in self.frames.iter().rev() {
            let function = &frame.closure.function;
            // `ip` has already advanced past the failing instruction's
            // opcode (and any operands), so the line for the instruction
            // that raised the error is the one just before it.
            let line = function.chunk.line_at(frame.ip.saturating_sub(1));
            trace.push(format!("[line {}] in {}", line, function.display_name()));
        }
        RuntimeError {
            message: message.into(),
            trace,
        }
    }

    // --- dispatch loop ----------------------------------------------

    fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            #[cfg(feature = "debug_trace")]
            {
                let frame = self.frames.last().unwrap();
                clockwork_core::chunk::disassembler::disassemble_instruction(
                    &frame.closure.function.chunk,
                    frame.ip,
                );
            }

            let op = OpCode::from_byte(self.read_byte());
            match op {
                OpCode::Constant => {
                    let value = self.read_constant();
                    self.push(value);
                }
                OpCode::Nil => self.push(Value::Nil),
                OpCode::True => self.push(Value::Bool(true)),
                OpCode::False => self.push(Value::Bool(false)),
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::GetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.frames.last().unwrap().slot_base;
                    let value = self.stack[base + slot].clone();
                    self.push(value);
                }
                OpCode::SetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.frames.last().unwrap().slot_base;
                    let value = self.peek(0).clone();
                    self.stack[base + slot] = value;
                }
                OpCode::GetGlobal => {
                    let name = self.read_string();
                    match self.globals.get(&name) {
                        Some(value) => {
                            let value = value.clone();
                            self.push(value);
                        }
                        None => {
                            return Err(self.runtime_error(format!(
                                "Undefined variable '{}'.",
                                name.as_str()
                            )))
                        }
                    }
                }
                OpCode::DefineGlobal => {
                    let name = self.read_string();
                    let value = self.pop();
                    self.globals.insert(&name, value);
                }
                OpCode::SetGlobal => {
                    let name = self.read_string();
                    let value = self.peek(0).clone();
                    let is_new = self.globals.insert(&name, value);
                    if is_new {
                        self.globals.delete(&name);
                        return Err(self.runtime_error(format!(
                            "Undefined variable '{}'.",
                            name.as_str()
                        )));
                    }
                }
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(a == b));
                }
                OpCode::Greater => self.binary_compare(|a, b| a > b)?,
                OpCode::Less => self.binary_compare(|a, b| a < b)?,
                OpCode::Add => self.add()?,
                OpCode::Subtract => self.binary_numeric_op(|a, b| a - b)?,
                OpCode::Multiply => self.binary_numeric_op(|a, b| a * b)?,
                OpCode::Divide => self.binary_numeric_op(|a, b| a / b)?,
                OpCode::Not => {
                    let value = self.pop();
                    self.push(Value::Bool(value.is_falsey()));
                }
                OpCode::Negate => {
                    if !self.peek(0).is_number() {
                        return Err(self.runtime_error("Operand must be a number."));
                    }
                    let n = self.pop().as_number().unwrap();
                    self.push(Value::Number(-n));
                }
                OpCode::Print => {
                    let value = self.pop();
                    println!("{}", value);
                }
                OpCode::Jump => {
                    let offset = self.read_short();
                    self.frame_mut().ip += offset as usize;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_short();
                    if self.peek(0).is_falsey() {
                        self.frame_mut().ip += offset as usize;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_short();
                    self.frame_mut().ip -= offset as usize;
                }
                OpCode::Call => {
                    let arg_count = self.read_byte() as usize;
                    self.call_value(arg_count)?;
                }
                OpCode::Closure => {
                    let value = self.read_constant();
                    let function = match value {
                        Value::Object(Obj::Function(f)) => f,
                        _ => unreachable!("OP_CLOSURE constant must be a function"),
                    };
                    let closure = Rc::new(ObjClosure { function });
                    self.objects.push(Obj::Closure(closure.clone()));
                    self.push(Value::Object(Obj::Closure(closure)));
                }
                OpCode::Return => {
                    let result = self.pop();
                    let frame = self.frames.pop().unwrap();
                    if self.frames.is_empty() {
                        self.pop();
                        return Ok(());
                    }
                    self.stack.truncate(frame.slot_base);
                    self.push(result);
                }
            }
        }
    }

    fn add(&mut self) -> Result<(), RuntimeError> {
        let b = self.peek(0).clone();
        let a = self.peek(1).clone();
        match (&a, &b) {
            (Value::Number(x), Value::Number(y)) => {
                self.pop();
                self.pop();
                self.push(Value::Number(x + y));
            }
            (Value::Object(Obj::String(x)), Value::Object(Obj::String(y))) => {
                self.pop();
                self.pop();
                let mut bytes = x.as_bytes().to_vec();
                bytes.extend_from_slice(y.as_bytes());
                let interned = self.strings.intern(bytes);
                self.objects.push(Obj::String(interned.clone()));
                self.push(Value::Object(Obj::String(interned)));
            }
            _ => return Err(self.runtime_error("Operands must be two numbers or two strings.")),
        }
        Ok(())
    }

    fn binary_numeric_op(&mut self, op: impl Fn(f64, f64) -> f64) -> Result<(), RuntimeError> {
        if !self.peek(0).is_number() || !self.peek(1).is_number() {
            return Err(self.runtime_error("Operands must be numbers."));
        }
        let b = self.pop().as_number().unwrap();
        let a = self.pop().as_number().unwrap();
        self.push(Value::Number(op(a, b)));
        Ok(())
    }

    fn binary_compare(&mut self, op: impl Fn(f64, f64) -> bool) -> Result<(), RuntimeError> {
        if !self.peek(0).is_number() || !self.peek(1).is_number() {
            return Err(self.runtime_error("Operands must be numbers."));
        }
        let b = self.pop().as_number().unwrap();
        let a = self.pop().as_number().unwrap();
        self.push(Value::Bool(op(a, b)));
        Ok(())
    }

    fn call_value(&mut self, arg_count: usize) -> Result<(), RuntimeError> {
        let callee = self.peek(arg_count).clone();
        match callee {
            Value::Object(Obj::Closure(closure)) => self.call_closure(closure, arg_count),
            Value::Object(Obj::Native(native)) => {
                let args_start = self.stack.len() - arg_count;
                let result = (native.func)(&self.stack[args_start..]);
                self.stack.truncate(args_start - 1);
                self.push(result);
                Ok(())
            }
            _ => Err(self.runtime_error("Can only call functions and classes.")),
        }
    }

    fn call_closure(&mut self, closure: Rc<ObjClosure>, arg_count: usize) -> Result<(), RuntimeError> {
        let arity = closure.function.arity as usize;
        if arg_count != arity {
            return Err(self.runtime_error(format!(
                "Expected {} arguments but got {}.",
                arity, arg_count
            )));
        }
        if self.frames.len() >= FRAMES_MAX {
            return Err(self.runtime_error("Stack overflow."));
        }
        let slot_base = self.stack.len() - arg_count - 1;
        self.frames.push(CallFrame {
            closure,
            ip: 0,
            slot_base,
        });
        Ok(())
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> Result<(), InterpretError> {
        let mut vm = Vm::new();
        vm.interpret(source)
    }

    #[test]
    fn arithmetic_precedence() {
        assert!(run("print 1 + 2 * 3;").is_ok());
    }

    #[test]
    fn string_concatenation() {
        assert!(run("print \"foo\" + \"bar\";").is_ok());
    }

    #[test]
    fn while_loop_runs_to_completion() {
        assert!(run("var i = 0; while (i < 3) { i = i + 1; } print i;").is_ok());
    }

    #[test]
    fn function_call_and_return() {
        let result = run("fun add(a, b) { return a + b; } print add(1, 2);");
        assert!(result.is_ok());
    }

    #[test]
    fn undefined_variable_is_runtime_error() {
        let result = run("print missing;");
        assert!(matches!(result, Err(InterpretError::Runtime(_))));
    }

    #[test]
    fn arity_mismatch_is_runtime_error() {
        let result = run("fun f(a) { return a; } f(1, 2);");
        match result {
            Err(InterpretError::Runtime(e)) => {
                assert!(e.message.contains("Expected 1 arguments but got 2"));
            }
            _ => panic!("expected runtime error"),
        }
    }

    #[test]
    fn calling_a_non_callable_is_runtime_error() {
        let result = run("var x = 1; x();");
        assert!(matches!(result, Err(InterpretError::Runtime(_))));
    }

    #[test]
    fn clock_native_returns_a_number() {
        assert!(run("print clock();").is_ok());
    }

    #[test]
    fn repeated_interpret_calls_share_one_vm_state() {
        let mut vm = Vm::new();
        assert!(vm.interpret("var counter = 1;").is_ok());
        assert!(vm.interpret("counter = counter + 1;").is_ok());
        assert!(vm.interpret("print counter;").is_ok());
    }

    #[test]
    fn runtime_error_resets_stack_and_frames_for_next_line() {
        let mut vm = Vm::new();
        // Fails mid-call, leaving a call frame and its locals on the
        // stack if they aren't cleared.
        assert!(matches!(
            vm.interpret("fun f(a) { return missing + a; } f(1);"),
            Err(InterpretError::Runtime(_))
        ));
        // A persistent REPL `Vm` must recover as if nothing happened: no
        // stale frame or operand survives into the next line.
        assert!(vm.interpret("var x = 1; print x;").is_ok());
    }
}
