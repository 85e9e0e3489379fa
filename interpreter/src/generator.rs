use std::cell::RefCell;
use std::ops::RangeInclusive;
use std::rc::Rc;

use log::trace;
use renzmc_core::Diagnostic;

use crate::ast::{contains_yield, Block, CatchClause, Expr, LoopTarget, Stmt};
use crate::callable::{Callable, Function, Instance};
use crate::env::Scope;
use crate::error::value_error;
use crate::interpreter::{handler_for, Flow, Interpreter};
use crate::value::Value;

/// A suspended generator function. Each resumption runs the body up to the next
/// `hasil_bertahap` and hands back the yielded value.
pub struct Generator {
    name: String,
    state: State,
}

enum State {
    Suspended(Box<Machine>),
    Running,
    Done,
}

impl Generator {
    pub(crate) fn start(function: &Rc<Function>, locals: Scope, instance: Option<Rc<Instance>>) -> Rc<RefCell<Self>> {
        let machine = Machine {
            locals,
            instance,
            frames: vec![Frame::Block {
                stmts: Rc::clone(&function.decl.body),
                pc: 0,
            }],
        };

        Rc::new(RefCell::new(Generator {
            name: function.name().to_string(),
            state: State::Suspended(Box::new(machine)),
        }))
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Runs the generator to its next yield. `None` once the body has finished.
    pub(crate) fn resume(
        generator: &Rc<RefCell<Self>>,
        interpreter: &mut Interpreter,
    ) -> Result<Option<Value>, Diagnostic> {
        // the machine leaves the cell while it runs so the body may touch the generator value
        let mut machine = {
            let mut generator = generator.borrow_mut();
            match std::mem::replace(&mut generator.state, State::Running) {
                State::Suspended(machine) => machine,
                State::Running => {
                    return Err(value_error(format!(
                        "Generator '{}' sedang berjalan",
                        generator.name
                    )))
                }
                State::Done => {
                    generator.state = State::Done;
                    return Ok(None);
                }
            }
        };

        trace!("melanjutkan generator {}", generator.borrow().name);
        let result = machine.resume(interpreter);
        generator.borrow_mut().state = match result {
            Ok(Some(_)) => State::Suspended(machine),
            _ => State::Done,
        };
        result
    }
}

/// Source of values for loops, comprehensions and `hasil_bertahap dari`.
pub(crate) enum Iter {
    Items(std::vec::IntoIter<Value>),
    Generator(Rc<RefCell<Generator>>),
}

impl Iter {
    pub(crate) fn next(&mut self, interpreter: &mut Interpreter) -> Result<Option<Value>, Diagnostic> {
        match self {
            Iter::Items(items) => Ok(items.next()),
            Iter::Generator(generator) => Generator::resume(generator, interpreter),
        }
    }
}

struct Machine {
    locals: Scope,
    instance: Option<Rc<Instance>>,
    frames: Vec<Frame>,
}

// Statements that cannot suspend run through the interpreter directly. Only the statements
// on the path to a yield get frames here.
enum Frame {
    Block {
        stmts: Block,
        pc: usize,
    },
    While {
        condition: Expr,
        body: Block,
    },
    Range {
        var: String,
        values: RangeInclusive<i64>,
        body: Block,
    },
    Each {
        target: LoopTarget,
        iter: Iter,
        body: Block,
    },
    Try {
        handlers: Vec<CatchClause>,
        finally: Option<Block>,
        phase: Phase,
    },
    With {
        context: Value,
    },
    Delegate {
        iter: Iter,
    },
}

enum Phase {
    Body,
    Handler,
    Finally(Option<Completion>),
}

enum Completion {
    Break,
    Continue,
    Return,
    Error(Diagnostic),
}

enum Control {
    Next,
    Yield(Value),
    Finished,
    Abrupt(Completion),
}

impl Machine {
    fn resume(&mut self, interpreter: &mut Interpreter) -> Result<Option<Value>, Diagnostic> {
        let saved = interpreter.push_call(std::mem::take(&mut self.locals), self.instance.clone())?;
        let result = self.run(interpreter);
        self.locals = interpreter.pop_call(saved);
        result
    }

    fn run(&mut self, interpreter: &mut Interpreter) -> Result<Option<Value>, Diagnostic> {
        loop {
            let control = self
                .step(interpreter)
                .unwrap_or_else(|error| Control::Abrupt(Completion::Error(error)));

            match control {
                Control::Next => {}
                Control::Yield(value) => return Ok(Some(value)),
                Control::Finished => return Ok(None),
                Control::Abrupt(completion) => match self.unwind(interpreter, completion) {
                    None => {}
                    Some(Completion::Error(error)) => return Err(error),
                    // a return value of a generator is dropped
                    Some(_) => {
                        self.frames.clear();
                        return Ok(None);
                    }
                },
            }
        }
    }

    fn step(&mut self, interpreter: &mut Interpreter) -> Result<Control, Diagnostic> {
        let frame = match self.frames.last_mut() {
            Some(frame) => frame,
            None => return Ok(Control::Finished),
        };

        match frame {
            Frame::Block { stmts, pc } => {
                if *pc == stmts.len() {
                    self.frames.pop();
                    return Ok(Control::Next);
                }
                let stmts = Rc::clone(stmts);
                let index = *pc;
                *pc += 1;
                self.statement(interpreter, &stmts[index])
            }
            Frame::While { condition, body } => {
                let body = Rc::clone(body);
                let running = interpreter.evaluate(condition)?.is_truthy();
                self.loop_step(running.then_some(body));
                Ok(Control::Next)
            }
            Frame::Range { var, values, body } => {
                let body = Rc::clone(body);
                let next = values.next();
                if let Some(value) = next {
                    interpreter.assign_name(var, Value::Int(value));
                }
                self.loop_step(next.map(|_| body));
                Ok(Control::Next)
            }
            Frame::Each { target, iter, body } => {
                let body = Rc::clone(body);
                let next = iter.next(interpreter)?;
                let running = next.is_some();
                if let Some(value) = next {
                    interpreter.bind_loop_target(target, value, false)?;
                }
                self.loop_step(running.then_some(body));
                Ok(Control::Next)
            }
            Frame::Try { finally, phase, .. } => match phase {
                Phase::Body | Phase::Handler => {
                    match finally.clone() {
                        Some(block) => {
                            *phase = Phase::Finally(None);
                            self.push_block(block);
                        }
                        None => {
                            self.frames.pop();
                        }
                    }
                    Ok(Control::Next)
                }
                Phase::Finally(pending) => {
                    let pending = pending.take();
                    self.frames.pop();
                    Ok(pending.map_or(Control::Next, Control::Abrupt))
                }
            },
            Frame::With { context } => {
                let context = context.clone();
                self.frames.pop();
                interpreter.exit_context(&context, None)?;
                Ok(Control::Next)
            }
            Frame::Delegate { iter } => match iter.next(interpreter)? {
                Some(value) => Ok(Control::Yield(value)),
                None => {
                    self.frames.pop();
                    Ok(Control::Next)
                }
            },
        }
    }

    fn loop_step(&mut self, body: Option<Block>) {
        match body {
            Some(body) => self.push_block(body),
            None => {
                self.frames.pop();
            }
        }
    }

    fn push_block(&mut self, stmts: Block) {
        self.frames.push(Frame::Block { stmts, pc: 0 });
    }

    fn statement(&mut self, interpreter: &mut Interpreter, stmt: &Stmt) -> Result<Control, Diagnostic> {
        if !contains_yield(std::slice::from_ref(stmt)) {
            return interpreter.execute(stmt).map(|flow| match flow {
                Flow::Normal => Control::Next,
                Flow::Break => Control::Abrupt(Completion::Break),
                Flow::Continue => Control::Abrupt(Completion::Continue),
                Flow::Return(_) => Control::Abrupt(Completion::Return),
            });
        }

        match stmt {
            Stmt::Yield { value, .. } => {
                let value = match value {
                    Some(expr) => interpreter.evaluate(expr)?,
                    None => Value::None,
                };
                return Ok(Control::Yield(value));
            }
            Stmt::YieldFrom { value, token } => {
                let iterable = interpreter.evaluate(value)?;
                let iter = interpreter.iterate(iterable).map_err(|e| e.locate(token))?;
                self.frames.push(Frame::Delegate { iter });
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let branch = if interpreter.evaluate(condition)?.is_truthy() {
                    then_branch
                } else {
                    else_branch
                };
                self.push_block(Rc::clone(branch));
            }
            Stmt::While { condition, body, .. } => {
                self.frames.push(Frame::While {
                    condition: condition.clone(),
                    body: Rc::clone(body),
                });
            }
            Stmt::For {
                var,
                start,
                end,
                body,
                token,
            } => {
                let (start, end) = interpreter.range_bounds(start, end).map_err(|e| e.locate(token))?;
                self.frames.push(Frame::Range {
                    var: var.lexeme.clone(),
                    values: start..=end,
                    body: Rc::clone(body),
                });
            }
            Stmt::ForEach {
                target,
                iterable,
                body,
                token,
            } => {
                let iterable = interpreter.evaluate(iterable)?;
                let iter = interpreter.iterate(iterable).map_err(|e| e.locate(token))?;
                self.frames.push(Frame::Each {
                    target: target.clone(),
                    iter,
                    body: Rc::clone(body),
                });
            }
            Stmt::Switch {
                subject,
                cases,
                default,
                ..
            } => {
                if let Some(block) = interpreter.select_case(subject, cases, default.as_ref())? {
                    self.push_block(Rc::clone(block));
                }
            }
            Stmt::TryCatch {
                body,
                handlers,
                finally,
                ..
            } => {
                self.frames.push(Frame::Try {
                    handlers: handlers.clone(),
                    finally: finally.clone(),
                    phase: Phase::Body,
                });
                self.push_block(Rc::clone(body));
            }
            Stmt::With {
                context,
                binding,
                body,
                token,
            } => {
                let context = interpreter.evaluate(context)?;
                let bound = interpreter.enter_context(&context).map_err(|e| e.locate(token))?;
                if let Some(binding) = binding {
                    interpreter.assign_name(&binding.lexeme, bound);
                }
                self.frames.push(Frame::With { context });
                self.push_block(Rc::clone(body));
            }
            other => {
                interpreter.execute(other)?;
            }
        }
        Ok(Control::Next)
    }

    /// Pops frames until one absorbs the completion. Returns the completion when nothing
    /// does.
    fn unwind(&mut self, interpreter: &mut Interpreter, mut completion: Completion) -> Option<Completion> {
        while let Some(frame) = self.frames.last_mut() {
            match frame {
                Frame::Block { .. } | Frame::Delegate { .. } => {}
                Frame::While { .. } | Frame::Range { .. } | Frame::Each { .. } => match completion {
                    Completion::Break => {
                        self.frames.pop();
                        return None;
                    }
                    Completion::Continue => return None,
                    _ => {}
                },
                Frame::Try {
                    handlers,
                    finally,
                    phase,
                } => {
                    if matches!(phase, Phase::Body) {
                        if let Completion::Error(error) = &completion {
                            if let Some(handler) = handler_for(handlers, error) {
                                let body = Rc::clone(&handler.body);
                                interpreter.bind_error(handler, error);
                                *phase = Phase::Handler;
                                self.push_block(body);
                                return None;
                            }
                        }
                    }
                    if !matches!(phase, Phase::Finally(_)) {
                        if let Some(block) = finally.clone() {
                            *phase = Phase::Finally(Some(completion));
                            self.push_block(block);
                            return None;
                        }
                    }
                }
                Frame::With { context } => {
                    let context = context.clone();
                    self.frames.pop();
                    let error = match &completion {
                        Completion::Error(error) => Some(error),
                        _ => None,
                    };
                    if let Err(error) = interpreter.exit_context(&context, error) {
                        completion = Completion::Error(error);
                    }
                    continue;
                }
            }
            self.frames.pop();
        }
        Some(completion)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::interpreter::Interpreter;

    fn run(src: &str) -> String {
        let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(output.clone());
        if let Err(error) = interpreter.run(src) {
            panic!("unexpected error: {}", error);
        }
        let out = String::from_utf8(output.borrow().clone()).unwrap();
        out
    }

    #[test]
    fn test_generator_yields_lazily() {
        let src = "\
fungsi hitung(n)
    tampilkan \"mulai\"
    i itu 0
    selama i < n
        hasil_bertahap i
        i += 1
    selesai
    tampilkan \"habis\"
selesai
g itu hitung(2)
tampilkan \"dibuat\"
tampilkan berikutnya(g)
tampilkan berikutnya(g)
tampilkan berikutnya(g, \"kosong\")
";
        assert_eq!(run(src), "dibuat\nmulai\n0\n1\nhabis\nkosong\n");
    }

    #[test]
    fn test_generator_in_for_each_and_nested_loops() {
        let src = "\
fungsi pasangan()
    untuk i dari 1 sampai 2
        untuk setiap c dari \"ab\"
            hasil_bertahap f\"{i}{c}\"
        selesai
    selesai
selesai
untuk setiap p dari pasangan()
    tampilkan p
selesai
";
        assert_eq!(run(src), "1a\n1b\n2a\n2b\n");
    }

    #[test]
    fn test_break_and_continue_inside_generator() {
        let src = "\
fungsi ganjil()
    untuk i dari 1 sampai 100
        jika i % 2 == 0
            lanjut
        selesai
        jika i > 7
            berhenti
        selesai
        hasil_bertahap i
    selesai
selesai
tampilkan daftar(ganjil())
";
        assert_eq!(run(src), "[1, 3, 5, 7]\n");
    }

    #[test]
    fn test_yield_from_and_return() {
        let src = "\
fungsi bagian()
    hasil_bertahap 1
    hasil_bertahap 2
selesai
fungsi luar()
    hasil_bertahap dari bagian()
    hasil_bertahap dari [3, 4]
    hasil 99
    hasil_bertahap 5
selesai
tampilkan daftar(luar())
";
        assert_eq!(run(src), "[1, 2, 3, 4]\n");
    }

    #[test]
    fn test_try_finally_across_yields() {
        let src = "\
fungsi aman()
    coba
        hasil_bertahap 1
        x itu 1 / 0
        hasil_bertahap 2
    tangkap ZeroDivisionError sebagai e
        hasil_bertahap e
    akhirnya
        tampilkan \"bersih\"
    selesai
selesai
untuk setiap v dari aman()
    tampilkan v
selesai
";
        assert_eq!(run(src), "1\nPembagian dengan nol\nbersih\n");
    }

    #[test]
    fn test_error_inside_generator_propagates() {
        let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(output);
        let src = "\
fungsi rusak()
    hasil_bertahap 1
    hasil_bertahap tidak_ada
selesai
g itu rusak()
berikutnya(g)
berikutnya(g)
";
        let error = interpreter.run(src).unwrap_err();
        assert_eq!(error.message, "Variabel 'tidak_ada' tidak terdefinisi");
        assert_eq!((error.line, error.column), (Some(3), Some(20)));
    }
}
