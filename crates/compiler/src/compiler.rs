//! Single-pass Pratt compiler: parses source directly into bytecode, with
//! no separate AST stage (`spec.md` §4.5, §9 Design Notes).
//!
//! State that the reference implementation keeps in module-level globals
//! (`current_compiler`, the scanner singleton) is threaded here as
//! explicit fields on [`Compiler`], per `spec.md` §9's directive that the
//! compiler be re-entrant. Nested `fun` bodies push a [`FunctionState`]
//! onto an explicit stack rather than chaining through an `enclosing`
//! pointer.

use crate::error::{CompileError, ErrorLocation};
use crate::scanner::Scanner;
use crate::token::{Token, TokenKind};
use clockwork_core::{Chunk, ObjFunction, ObjString, OpCode, Table, Value};
use std::rc::Rc;

const MAX_LOCALS: usize = 256;
const MAX_CONSTANTS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // . ()
    Primary,
}

impl Precedence {
    fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call => Precedence::Primary,
            Precedence::Primary => Precedence::Primary,
        }
    }
}

fn rule_precedence(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::Minus | TokenKind::Plus => Precedence::Term,
        TokenKind::Slash | TokenKind::Star => Precedence::Factor,
        TokenKind::BangEqual | TokenKind::EqualEqual => Precedence::Equality,
        TokenKind::Greater | TokenKind::GreaterEqual | TokenKind::Less | TokenKind::LessEqual => {
            Precedence::Comparison
        }
        TokenKind::And => Precedence::And,
        TokenKind::Or => Precedence::Or,
        TokenKind::LeftParen => Precedence::Call,
        _ => Precedence::None,
    }
}

struct Local<'src> {
    name: &'src str,
    depth: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    Script,
    Function,
}

struct FunctionState<'src> {
    function: ObjFunction,
    kind: FunctionKind,
    locals: Vec<Local<'src>>,
    scope_depth: u32,
}

impl<'src> FunctionState<'src> {
    fn new(kind: FunctionKind, name: Option<Rc<ObjString>>) -> Self {
        // Slot 0 is reserved for the VM's own bookkeeping (the calling
        // convention always leaves the callee itself there), matching
        // `spec.md` §4.6's call frame layout.
        FunctionState {
            function: ObjFunction::new(name),
            kind,
            locals: vec![Local { name: "", depth: Some(0) }],
            scope_depth: 0,
        }
    }
}

/// The result of compiling one translation unit: either the top-level
/// script function (always named `None`, arity 0), or the diagnostics
/// collected along the way.
pub fn compile(source: &str, strings: &mut Table) -> Result<Rc<ObjFunction>, Vec<CompileError>> {
    let mut compiler = Compiler::new(source, strings);
    compiler.run()
}

struct Compiler<'src, 'tab> {
    scanner: Scanner<'src>,
    previous: Token<'src>,
    current: Token<'src>,
    had_error: bool,
    panic_mode: bool,
    errors: Vec<CompileError>,
    states: Vec<FunctionState<'src>>,
    strings: &'tab mut Table,
}

impl<'src, 'tab> Compiler<'src, 'tab> {
    fn new(source: &'src str, strings: &'tab mut Table) -> Self {
        let eof = Token::synthetic(TokenKind::Eof, "", 0);
        Compiler {
            scanner: Scanner::new(source),
            previous: eof,
            current: eof,
            had_error: false,
            panic_mode: false,
            errors: Vec::new(),
            states: vec![FunctionState::new(FunctionKind::Script, None)],
            strings,
        }
    }

    fn run(mut self) -> Result<Rc<ObjFunction>, Vec<CompileError>> {
        self.advance();
        while !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::Eof, "Expect end of expression.");
        let function = self.end_compiler();
        if self.had_error {
            Err(self.errors)
        } else {
            Ok(Rc::new(function))
        }
    }

    // --- token stream -----------------------------------------------

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            let message = self.current.lexeme.to_string();
            self.error_at_current(&message);
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    // --- error reporting ----------------------------------------------

    fn error_at_current(&mut self, message: &str) {
        let token = self.current;
        self.error_at(token, message);
    }

    fn error(&mut self, message: &str) {
        let token = self.previous;
        self.error_at(token, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        let where_ = if token.kind == TokenKind::Eof {
            ErrorLocation::End
        } else if token.kind == TokenKind::Error {
            ErrorLocation::End
        } else {
            ErrorLocation::Lexeme(token.lexeme.to_string())
        };
        self.errors.push(CompileError {
            line: token.line,
            where_,
            message: message.to_string(),
        });
        self.had_error = true;
    }

    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {}
            }
            self.advance();
        }
    }

    // --- chunk emission -------------------------------------------------

    fn current_state(&self) -> &FunctionState<'src> {
        self.states.last().unwrap()
    }

    fn current_state_mut(&mut self) -> &mut FunctionState<'src> {
        self.states.last_mut().unwrap()
    }

    fn current_chunk(&mut self) -> &mut Chunk {
        &mut self.current_state_mut().function.chunk
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.current_chunk().write_byte(byte, line);
    }

    fn emit_op(&mut self, op: OpCode) {
        let line = self.previous.line;
        self.current_chunk().write_op(op, line);
    }

    fn emit_ops(&mut self, a: OpCode, b: OpCode) {
        self.emit_op(a);
        self.emit_op(b);
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_op(OpCode::Constant);
        self.emit_byte(index);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        let index = self.current_chunk().add_constant(value);
        if index >= MAX_CONSTANTS {
            self.error("Too many constants in one chunk.");
            return 0;
        }
        index as u8
    }

    /// Emit a jump instruction with a placeholder operand; returns the
    /// offset of the first operand byte so [`Self::patch_jump`] can back
    /// fill it once the target is known.
    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.current_chunk().len() - 2
    }

    fn patch_jump(&mut self, offset: usize) {
        let jump = self.current_chunk().len() - offset - 2;
        if jump > u16::MAX as usize {
            self.error("Too much code to jump over.");
        }
        let hi = ((jump >> 8) & 0xff) as u8;
        let lo = (jump & 0xff) as u8;
        self.current_chunk().patch_byte(offset, hi);
        self.current_chunk().patch_byte(offset + 1, lo);
    }

    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(OpCode::Loop);
        let offset = self.current_chunk().len() - loop_start + 2;
        if offset > u16::MAX as usize {
            self.error("Loop body too large.");
        }
        self.emit_byte(((offset >> 8) & 0xff) as u8);
        self.emit_byte((offset & 0xff) as u8);
    }

    fn end_compiler(&mut self) -> ObjFunction {
        self.emit_op(OpCode::Nil);
        self.emit_op(OpCode::Return);
        let state = self.states.pop().unwrap();
        state.function
    }

    // --- scopes ----------------------------------------------------------

    fn begin_scope(&mut self) {
        self.current_state_mut().scope_depth += 1;
    }

    /// Closes the innermost scope, popping every local that belonged to
    /// it (one `OP_POP` per local) exactly as the reference compiler's
    /// `endScope` does.
    fn end_scope(&mut self) {
        let state = self.current_state_mut();
        state.scope_depth -= 1;
        let depth = state.scope_depth;
        let mut pop_count = 0;
        while let Some(local) = state.locals.last() {
            if local.depth.map_or(false, |d| d > depth) {
                state.locals.pop();
                pop_count += 1;
            } else {
                break;
            }
        }
        for _ in 0..pop_count {
            self.emit_op(OpCode::Pop);
        }
    }

    // --- declarations ------------------------------------------------

    fn declaration(&mut self) {
        if self.match_token(TokenKind::Class) {
            self.class_declaration();
        } else if self.match_token(TokenKind::Fun) {
            self.fun_declaration();
        } else if self.match_token(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }
        if self.panic_mode {
            self.synchronize();
        }
    }

    /// `class` is a reserved token (`spec.md` §9): declare it a dedicated
    /// compile error rather than let it fall through to the generic
    /// "Expect expression." a `class` keyword would otherwise trip in
    /// `statement()`/`expression_statement()`.
    fn class_declaration(&mut self) {
        self.error("Class declarations are not supported.");
    }

    fn fun_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.");
        self.mark_initialized();
        self.function(FunctionKind::Function);
        self.define_variable(global);
    }

    fn function(&mut self, kind: FunctionKind) {
        let name = self.intern_lexeme(self.previous.lexeme);
        self.states.push(FunctionState::new(kind, Some(name)));
        self.begin_scope();

        self.consume(TokenKind::LeftParen, "Expect '(' after function name.");
        if !self.check(TokenKind::RightParen) {
            loop {
                let state = self.current_state_mut();
                state.function.arity += 1;
                if state.function.arity > 255 {
                    self.error_at_current("Can't have more than 255 parameters.");
                }
                let constant = self.parse_variable("Expect parameter name.");
                self.define_variable(constant);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.");
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.");
        self.block();

        let function = self.end_compiler();
        let value = Value::Object(clockwork_core::Obj::Function(Rc::new(function)));
        let constant = self.make_constant(value);
        // Every compiled function value is wrapped at OP_CLOSURE time
        // (spec.md §4.6), matching the reference compiler's
        // `emitBytes(OP_CLOSURE, makeConstant(...))` rather than plain
        // OP_CONSTANT.
        self.emit_op(OpCode::Closure);
        self.emit_byte(constant);
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");
        if self.match_token(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.");
        self.define_variable(global);
    }

    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);
        self.declare_variable();
        if self.current_state().scope_depth > 0 {
            return 0;
        }
        let name = self.intern_lexeme(self.previous.lexeme);
        self.make_constant(Value::Object(clockwork_core::Obj::String(name)))
    }

    fn declare_variable(&mut self) {
        if self.current_state().scope_depth == 0 {
            return;
        }
        let name = self.previous.lexeme;
        let depth = self.current_state().scope_depth;
        let mut redeclared = false;
        for local in self.current_state().locals.iter().rev() {
            if let Some(d) = local.depth {
                if d < depth {
                    break;
                }
            }
            if local.name == name {
                redeclared = true;
                break;
            }
        }
        if redeclared {
            self.error("Already a variable with this name in this scope.");
        }
        if self.current_state().locals.len() >= MAX_LOCALS {
            self.error("Too many local variables in function.");
            return;
        }
        self.current_state_mut().locals.push(Local { name, depth: None });
    }

    fn mark_initialized(&mut self) {
        let state = self.current_state_mut();
        if state.scope_depth == 0 {
            return;
        }
        let depth = state.scope_depth;
        if let Some(local) = state.locals.last_mut() {
            local.depth = Some(depth);
        }
    }

    fn define_variable(&mut self, global: u8) {
        if self.current_state().scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_op(OpCode::DefineGlobal);
        self.emit_byte(global);
    }

    fn resolve_local(&mut self, name: &str) -> Option<u8> {
        let state = self.current_state();
        let mut found: Option<(usize, bool)> = None;
        for (i, local) in state.locals.iter().enumerate().rev() {
            if local.name == name {
                found = Some((i, local.depth.is_none()));
                break;
            }
        }
        match found {
            Some((i, uninitialized)) => {
                if uninitialized {
                    self.error("Can't read local variable in its own initializer.");
                }
                Some(i as u8)
            }
            None => None,
        }
    }

    // --- statements --------------------------------------------------

    fn statement(&mut self) {
        if self.match_token(TokenKind::Print) {
            self.print_statement();
        } else if self.match_token(TokenKind::If) {
            self.if_statement();
        } else if self.match_token(TokenKind::While) {
            self.while_statement();
        } else if self.match_token(TokenKind::For) {
            self.for_statement();
        } else if self.match_token(TokenKind::Return) {
            self.return_statement();
        } else if self.match_token(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.");
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    fn return_statement(&mut self) {
        if self.current_state().kind == FunctionKind::Script {
            self.error("Can't return from top-level code.");
        }
        if self.match_token(TokenKind::Semicolon) {
            self.emit_op(OpCode::Nil);
            self.emit_op(OpCode::Return);
        } else {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after return value.");
            self.emit_op(OpCode::Return);
        }
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    fn if_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();

        let else_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(then_jump);
        self.emit_op(OpCode::Pop);

        if self.match_token(TokenKind::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.current_chunk().len();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);
    }

    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.");
        if self.match_token(TokenKind::Semicolon) {
            // no initializer
        } else if self.match_token(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.current_chunk().len();
        let mut exit_jump: Option<usize> = None;
        if !self.match_token(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.");
            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
            self.emit_op(OpCode::Pop);
        }

        if !self.match_token(TokenKind::RightParen) {
            let body_jump = self.emit_jump(OpCode::Jump);
            let increment_start = self.current_chunk().len();
            self.expression();
            self.emit_op(OpCode::Pop);
            self.consume(TokenKind::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_op(OpCode::Pop);
        }
        self.end_scope();
    }

    // --- expressions (Pratt parser) --------------------------------------

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let can_assign = precedence <= Precedence::Assignment;
        if !self.prefix(self.previous.kind, can_assign) {
            self.error("Expect expression.");
            return;
        }

        while precedence <= rule_precedence(self.current.kind) {
            self.advance();
            self.infix(self.previous.kind, can_assign);
        }

        if can_assign && self.match_token(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    /// Dispatches on the just-consumed token's kind to parse a prefix
    /// expression (literal, unary op, grouping, variable reference, ...).
    /// A `match` here stands in for the reference compiler's array of
    /// function pointers indexed by token kind — `spec.md` §9 sanctions
    /// either shape.
    fn prefix(&mut self, kind: TokenKind, can_assign: bool) -> bool {
        match kind {
            TokenKind::LeftParen => self.grouping(),
            TokenKind::Minus | TokenKind::Bang => self.unary(),
            TokenKind::Number => self.number(),
            TokenKind::String => self.string(),
            TokenKind::True | TokenKind::False | TokenKind::Nil => self.literal(kind),
            TokenKind::Identifier => self.variable(can_assign),
            TokenKind::Class => {
                self.error("Class declarations are not supported.");
                true
            }
            TokenKind::Super => {
                self.error("'super' is not supported.");
                true
            }
            TokenKind::This => {
                self.error("'this' is not supported.");
                true
            }
            _ => return false,
        }
        true
    }

    fn infix(&mut self, kind: TokenKind, can_assign: bool) {
        match kind {
            TokenKind::Minus
            | TokenKind::Plus
            | TokenKind::Slash
            | TokenKind::Star
            | TokenKind::BangEqual
            | TokenKind::EqualEqual
            | TokenKind::Greater
            | TokenKind::GreaterEqual
            | TokenKind::Less
            | TokenKind::LessEqual => self.binary(kind),
            TokenKind::And => self.and(),
            TokenKind::Or => self.or(),
            TokenKind::LeftParen => self.call(),
            _ => {
                let _ = can_assign;
            }
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self) {
        let kind = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match kind {
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            TokenKind::Bang => self.emit_op(OpCode::Not),
            _ => unreachable!(),
        }
    }

    fn binary(&mut self, kind: TokenKind) {
        let precedence = rule_precedence(kind);
        self.parse_precedence(precedence.next());
        match kind {
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            TokenKind::BangEqual => self.emit_ops(OpCode::Equal, OpCode::Not),
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::GreaterEqual => self.emit_ops(OpCode::Less, OpCode::Not),
            TokenKind::Less => self.emit_op(OpCode::Less),
            TokenKind::LessEqual => self.emit_ops(OpCode::Greater, OpCode::Not),
            _ => unreachable!(),
        }
    }

    fn and(&mut self) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    fn or(&mut self) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(else_jump);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    fn call(&mut self) {
        let arg_count = self.argument_list();
        self.emit_op(OpCode::Call);
        self.emit_byte(arg_count);
    }

    fn argument_list(&mut self) -> u8 {
        let mut count: u32 = 0;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression();
                if count == 255 {
                    self.error("Can't have more than 255 arguments.");
                }
                count += 1;
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after arguments.");
        count as u8
    }

    fn number(&mut self) {
        let value: f64 = self.previous.lexeme.parse().unwrap_or(0.0);
        self.emit_constant(Value::Number(value));
    }

    fn string(&mut self) {
        let lexeme = self.previous.lexeme;
        let bytes = lexeme[1..lexeme.len() - 1].as_bytes().to_vec();
        let interned = self.strings.intern(bytes);
        self.emit_constant(Value::Object(clockwork_core::Obj::String(interned)));
    }

    fn literal(&mut self, kind: TokenKind) {
        match kind {
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::True => self.emit_op(OpCode::True),
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            _ => unreachable!(),
        }
    }

    fn variable(&mut self, can_assign: bool) {
        let name = self.previous.lexeme;
        let (get_op, set_op, arg) = if let Some(slot) = self.resolve_local(name) {
            (OpCode::GetLocal, OpCode::SetLocal, slot)
        } else {
            let interned = self.intern_lexeme(name);
            let constant = self.make_constant(Value::Object(clockwork_core::Obj::String(interned)));
            (OpCode::GetGlobal, OpCode::SetGlobal, constant)
        };

        if can_assign && self.match_token(TokenKind::Equal) {
            self.expression();
            self.emit_op(set_op);
            self.emit_byte(arg);
        } else {
            self.emit_op(get_op);
            self.emit_byte(arg);
        }
    }

    fn intern_lexeme(&mut self, lexeme: &str) -> Rc<ObjString> {
        self.strings.intern(lexeme.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_ok(source: &str) -> Rc<ObjFunction> {
        let mut table = Table::new();
        compile(source, &mut table).expect("expected compile to succeed")
    }

    #[test]
    fn compiles_print_statement() {
        let function = compile_ok("print 1 + 2;");
        assert!(!function.chunk.is_empty());
    }

    #[test]
    fn reports_unterminated_string_as_compile_error() {
        let mut table = Table::new();
        let errors = compile("print \"abc;", &mut table).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn reports_error_at_end() {
        let mut table = Table::new();
        let errors = compile("print 1 +", &mut table).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("Error at end")));
    }

    #[test]
    fn reserved_tokens_are_rejected() {
        let mut table = Table::new();
        assert!(compile("class Foo {}", &mut table).is_err());
        assert!(compile("print this;", &mut table).is_err());
        assert!(compile("print super;", &mut table).is_err());
    }

    #[test]
    fn reserved_tokens_get_dedicated_messages() {
        let mut table = Table::new();
        let errors = compile("class Foo {}", &mut table).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("Class declarations are not supported.")));

        let mut table = Table::new();
        let errors = compile("print this;", &mut table).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("'this' is not supported.")));

        let mut table = Table::new();
        let errors = compile("print super;", &mut table).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("'super' is not supported.")));
    }

    #[test]
    fn same_literal_string_interns_to_one_object() {
        let mut table = Table::new();
        let function = compile("print \"hi\"; print \"hi\";", &mut table).unwrap();
        let mut strings = Vec::new();
        for i in 0..function.chunk.constant_count() {
            if let Value::Object(clockwork_core::Obj::String(s)) = function.chunk.constant(i) {
                strings.push(s.clone());
            }
        }
        assert_eq!(strings.len(), 2);
        assert!(Rc::ptr_eq(&strings[0], &strings[1]));
    }
}
