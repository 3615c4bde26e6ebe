//! Small LIR interpreter used by the codegen tests
//!
//! Executes LirRoutine bodies directly, with the runtime intrinsics modeled
//! over Rc<RefCell<..>> handles. This lets the tests check observable
//! behavior (value semantics, alias sharing, global visibility) rather than
//! just instruction sequences.
//!
//! Handle identity matters: LocalGet of an externref local pushes a clone of
//! the same Rc, so tests can distinguish "independent copy" from "same
//! underlying value" exactly the way the real runtime would.

use crate::compiler::codegen::lir::{LirInst, LirRoutine, LirType, RuntimeFn};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// One runtime Fern value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

pub(crate) type Handle = Rc<RefCell<Value>>;
pub(crate) type CellHandle = Rc<RefCell<Handle>>;

pub(crate) fn handle(v: Value) -> Handle {
    Rc::new(RefCell::new(v))
}

/// One operand stack slot. Ref and Cell are both externref at the WASM
/// level; the interpreter keeps them apart to catch stack discipline bugs.
#[derive(Debug, Clone)]
pub(crate) enum StackVal {
    I32(i32),
    I64(i64),
    F64(f64),
    Ref(Handle),
    Cell(CellHandle),
}

impl StackVal {
    fn default_for(ty: LirType) -> StackVal {
        match ty {
            LirType::I32 => StackVal::I32(0),
            LirType::I64 => StackVal::I64(0),
            LirType::F64 => StackVal::F64(0.0),
            LirType::ExternRef => StackVal::Ref(handle(Value::Null)),
        }
    }
}

/// Process-wide runtime storage shared across routine runs: one cell per
/// GlobalTable slot plus the four superglobal bindings.
pub(crate) struct RuntimeState {
    globals: RefCell<FxHashMap<u32, CellHandle>>,
    superglobals: RefCell<[Handle; 4]>,
    pub(crate) str_literals: Vec<String>,
}

impl RuntimeState {
    pub(crate) fn new() -> RuntimeState {
        RuntimeState {
            globals: RefCell::new(FxHashMap::default()),
            superglobals: RefCell::new([
                handle(Value::Array(Vec::new())),
                handle(Value::Array(Vec::new())),
                handle(Value::Array(Vec::new())),
                handle(Value::Array(Vec::new())),
            ]),
            str_literals: Vec::new(),
        }
    }

    /// The stable cell behind a global slot, created empty on first touch.
    pub(crate) fn global_cell(&self, slot: u32) -> CellHandle {
        self.globals
            .borrow_mut()
            .entry(slot)
            .or_insert_with(|| Rc::new(RefCell::new(handle(Value::Null))))
            .clone()
    }

    pub(crate) fn global_value(&self, slot: u32) -> Value {
        let cell = self.global_cell(slot);
        let v = cell.borrow();
        let v = v.borrow();
        v.clone()
    }

    pub(crate) fn superglobal_value(&self, selector: i32) -> Value {
        let v = self.superglobals.borrow()[selector as usize].clone();
        let v = v.borrow();
        v.clone()
    }
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Str(s) => !s.is_empty() && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}

fn to_int(v: &Value) -> i64 {
    match v {
        Value::Null => 0,
        Value::Bool(b) => *b as i64,
        Value::Int(i) => *i,
        Value::Float(f) => *f as i64,
        Value::Str(s) => s.trim().parse().unwrap_or(0),
        Value::Array(_) | Value::Object(_) => truthy(v) as i64,
    }
}

fn to_float(v: &Value) -> f64 {
    match v {
        Value::Float(f) => *f,
        Value::Str(s) => s.trim().parse().unwrap_or(0.0),
        other => to_int(other) as f64,
    }
}

fn to_str(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Bool(b) => (if *b { "1" } else { "" }).to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) => s.clone(),
        Value::Array(_) => "Array".to_string(),
        Value::Object(_) => "Object".to_string(),
    }
}

struct Machine<'a> {
    state: &'a RuntimeState,
    stack: Vec<StackVal>,
}

impl<'a> Machine<'a> {
    fn pop(&mut self) -> StackVal {
        self.stack.pop().expect("operand stack underflow")
    }

    fn pop_i32(&mut self) -> i32 {
        match self.pop() {
            StackVal::I32(v) => v,
            other => panic!("expected i32 on stack, got {other:?}"),
        }
    }

    fn pop_i64(&mut self) -> i64 {
        match self.pop() {
            StackVal::I64(v) => v,
            other => panic!("expected i64 on stack, got {other:?}"),
        }
    }

    fn pop_f64(&mut self) -> f64 {
        match self.pop() {
            StackVal::F64(v) => v,
            other => panic!("expected f64 on stack, got {other:?}"),
        }
    }

    fn pop_ref(&mut self) -> Handle {
        match self.pop() {
            StackVal::Ref(h) => h,
            other => panic!("expected value handle on stack, got {other:?}"),
        }
    }

    fn pop_cell(&mut self) -> CellHandle {
        match self.pop() {
            StackVal::Cell(c) => c,
            other => panic!("expected alias cell on stack, got {other:?}"),
        }
    }

    fn push_ref(&mut self, v: Value) {
        self.stack.push(StackVal::Ref(handle(v)));
    }

    fn call(&mut self, f: RuntimeFn) {
        match f {
            RuntimeFn::ValueEmpty => self.push_ref(Value::Null),
            RuntimeFn::ValueFromBool => {
                let v = self.pop_i32();
                self.push_ref(Value::Bool(v != 0));
            }
            RuntimeFn::ValueFromInt => {
                let v = self.pop_i64();
                self.push_ref(Value::Int(v));
            }
            RuntimeFn::ValueFromFloat => {
                let v = self.pop_f64();
                self.push_ref(Value::Float(v));
            }
            // Strings, arrays and objects are handle-shaped in both their
            // narrow and boxed forms; boxing preserves identity
            RuntimeFn::ValueFromStr | RuntimeFn::ValueFromArray | RuntimeFn::ValueFromObject => {}
            RuntimeFn::ValueFromNumber => {
                let bits = self.pop_i64();
                let tag = self.pop_i32();
                let v = if tag == 0 {
                    Value::Int(bits)
                } else {
                    Value::Float(f64::from_bits(bits as u64))
                };
                self.push_ref(v);
            }
            RuntimeFn::ValueToBool => {
                let h = self.pop_ref();
                let v = truthy(&h.borrow());
                self.stack.push(StackVal::I32(v as i32));
            }
            RuntimeFn::ValueToInt => {
                let h = self.pop_ref();
                let v = to_int(&h.borrow());
                self.stack.push(StackVal::I64(v));
            }
            RuntimeFn::ValueToFloat => {
                let h = self.pop_ref();
                let v = to_float(&h.borrow());
                self.stack.push(StackVal::F64(v));
            }
            RuntimeFn::ValueToStr => {
                let h = self.pop_ref();
                let converted = match &*h.borrow() {
                    Value::Str(_) => None,
                    other => Some(Value::Str(to_str(other))),
                };
                match converted {
                    // Already a string: identity, same handle
                    None => self.stack.push(StackVal::Ref(h)),
                    Some(v) => self.push_ref(v),
                }
            }
            RuntimeFn::ValueToArray => {
                let h = self.pop_ref();
                let converted = match &*h.borrow() {
                    Value::Array(_) => None,
                    Value::Null => Some(Value::Array(Vec::new())),
                    other => Some(Value::Array(vec![other.clone()])),
                };
                match converted {
                    None => self.stack.push(StackVal::Ref(h)),
                    Some(v) => self.push_ref(v),
                }
            }
            RuntimeFn::ValueToObject => {
                let h = self.pop_ref();
                let converted = match &*h.borrow() {
                    Value::Object(_) => None,
                    other => Some(Value::Object(vec![("scalar".to_string(), other.clone())])),
                };
                match converted {
                    None => self.stack.push(StackVal::Ref(h)),
                    Some(v) => self.push_ref(v),
                }
            }
            RuntimeFn::ValueToNumber => {
                let h = self.pop_ref();
                let (tag, bits) = match &*h.borrow() {
                    Value::Float(f) => (1, f.to_bits() as i64),
                    other => (0, to_int(other)),
                };
                self.stack.push(StackVal::I32(tag));
                self.stack.push(StackVal::I64(bits));
            }
            RuntimeFn::NumberFromInt => {
                let v = self.pop_i64();
                self.stack.push(StackVal::I32(0));
                self.stack.push(StackVal::I64(v));
            }
            RuntimeFn::NumberFromFloat => {
                let v = self.pop_f64();
                self.stack.push(StackVal::I32(1));
                self.stack.push(StackVal::I64(v.to_bits() as i64));
            }
            RuntimeFn::ValueCopy | RuntimeFn::ArrayCopy => {
                let h = self.pop_ref();
                let copy = h.borrow().clone();
                self.push_ref(copy);
            }
            RuntimeFn::ValueIsSet => {
                let h = self.pop_ref();
                let set = !matches!(&*h.borrow(), Value::Null);
                self.stack.push(StackVal::I32(set as i32));
            }
            RuntimeFn::AliasNew => {
                let seed = self.pop_ref();
                self.stack.push(StackVal::Cell(Rc::new(RefCell::new(seed))));
            }
            RuntimeFn::AliasGet => {
                let cell = self.pop_cell();
                let value = cell.borrow().clone();
                self.stack.push(StackVal::Ref(value));
            }
            RuntimeFn::AliasSet => {
                let value = self.pop_ref();
                let cell = self.pop_cell();
                *cell.borrow_mut() = value;
            }
            RuntimeFn::StrLiteral => {
                let id = self.pop_i32();
                let s = self.state.str_literals[id as usize].clone();
                self.push_ref(Value::Str(s));
            }
            RuntimeFn::GlobalCell => {
                let slot = self.pop_i32();
                self.stack
                    .push(StackVal::Cell(self.state.global_cell(slot as u32)));
            }
            RuntimeFn::SuperglobalLoad => {
                let selector = self.pop_i32();
                let value = self.state.superglobals.borrow()[selector as usize].clone();
                self.stack.push(StackVal::Ref(value));
            }
            RuntimeFn::SuperglobalStore => {
                let value = self.pop_ref();
                let selector = self.pop_i32();
                self.state.superglobals.borrow_mut()[selector as usize] = value;
            }
        }
    }
}

/// Execute one routine with the given arguments; returns whatever is left
/// on the operand stack when the body ends.
pub(crate) fn run_routine(
    state: &RuntimeState,
    routine: &LirRoutine,
    args: Vec<StackVal>,
) -> Vec<StackVal> {
    assert_eq!(
        args.len(),
        routine.params.len(),
        "argument count mismatch for routine '{}'",
        routine.name
    );

    let mut locals = args;
    for &ty in &routine.locals {
        locals.push(StackVal::default_for(ty));
    }

    let mut m = Machine {
        state,
        stack: Vec::new(),
    };

    for inst in &routine.body {
        match inst {
            LirInst::I32Const(v) => m.stack.push(StackVal::I32(*v)),
            LirInst::I64Const(v) => m.stack.push(StackVal::I64(*v)),
            LirInst::F64Const(v) => m.stack.push(StackVal::F64(*v)),
            LirInst::LocalGet(id) => m.stack.push(locals[id.0 as usize].clone()),
            LirInst::LocalSet(id) => {
                let v = m.pop();
                locals[id.0 as usize] = v;
            }
            LirInst::LocalTee(id) => {
                let v = m.pop();
                locals[id.0 as usize] = v.clone();
                m.stack.push(v);
            }
            LirInst::Call(f) => m.call(*f),
            LirInst::I64ReinterpretF64 => {
                let v = m.pop_f64();
                m.stack.push(StackVal::I64(v.to_bits() as i64));
            }
            LirInst::F64ReinterpretI64 => {
                let v = m.pop_i64();
                m.stack.push(StackVal::F64(f64::from_bits(v as u64)));
            }
            LirInst::Drop => {
                m.pop();
            }
            LirInst::Return => break,
        }
    }

    m.stack
}
