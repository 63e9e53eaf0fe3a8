use crate::{object::Object, AmlError};
use alloc::{vec, vec::Vec};

pub const NUM_LOCALS: usize = 8;
pub const NUM_ARGS: usize = 7;

/// The locals and arguments of one method invocation. Locals start uninitialized; the
/// arguments come from the caller and any slots past the supplied ones are
/// uninitialized too.
#[derive(Clone, Debug)]
pub struct StackFrame {
    locals: [Object; NUM_LOCALS],
    args: [Object; NUM_ARGS],
}

impl StackFrame {
    pub fn new() -> StackFrame {
        StackFrame {
            locals: core::array::from_fn(|_| Object::Uninitialized),
            args: core::array::from_fn(|_| Object::Uninitialized),
        }
    }

    pub fn with_args(args: Vec<Object>) -> Result<StackFrame, AmlError> {
        if args.len() > NUM_ARGS {
            return Err(AmlError::MethodArgCountIncorrect);
        }
        let mut frame = StackFrame::new();
        for (slot, arg) in frame.args.iter_mut().zip(args) {
            *slot = arg;
        }
        Ok(frame)
    }

    pub fn local(&self, index: u8) -> Result<&Object, AmlError> {
        self.locals.get(index as usize).ok_or(AmlError::InvalidLocal(index))
    }

    pub fn local_mut(&mut self, index: u8) -> Result<&mut Object, AmlError> {
        self.locals.get_mut(index as usize).ok_or(AmlError::InvalidLocal(index))
    }

    pub fn arg(&self, index: u8) -> Result<&Object, AmlError> {
        self.args.get(index as usize).ok_or(AmlError::InvalidArg(index))
    }

    pub fn arg_mut(&mut self, index: u8) -> Result<&mut Object, AmlError> {
        self.args.get_mut(index as usize).ok_or(AmlError::InvalidArg(index))
    }
}

/// The per-interpreter stack of invocation frames. One frame is pushed per method call
/// and popped when it returns, whatever way it returns.
#[derive(Debug)]
pub struct LocalStack {
    frames: Vec<StackFrame>,
}

impl LocalStack {
    pub fn new() -> LocalStack {
        LocalStack { frames: vec![] }
    }

    pub fn push(&mut self, frame: StackFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current(&self) -> Result<&StackFrame, AmlError> {
        self.frames.last().ok_or(AmlError::NoCurrentFrame)
    }

    pub fn current_mut(&mut self) -> Result<&mut StackFrame, AmlError> {
        self.frames.last_mut().ok_or(AmlError::NoCurrentFrame)
    }
}
