//! `aml-eval` is an evaluation engine for AML, the bytecode that ACPI tables describe
//! their namespaces and control methods in. It maintains a namespace of tagged objects,
//! executes control methods against it, and mediates all hardware access through a
//! [`Handler`] supplied by the embedding kernel or bootloader.
//!
//! The crate is `no_std` (it requires `alloc`) and does no locking of its own; the
//! entry points take `&mut self` and embedders serialize access however suits them.
//!
//! ### Usage
//! - Construct an [`Interpreter`] around your [`Handler`].
//! - Feed it each table's AML with [`Interpreter::load_table`].
//! - Evaluate objects and invoke methods with [`Interpreter::invoke`],
//!   [`Interpreter::invoke_by_name`], and [`Interpreter::eval_simple`].

#![no_std]

extern crate alloc;
#[cfg(test)]
extern crate std;

pub mod eval;
pub mod namespace;
pub mod object;
pub mod op_region;
pub mod opcode;
pub mod parser;
pub mod stack;
#[cfg(test)]
pub(crate) mod test_utils;

pub use namespace::{AmlName, Namespace};
pub use object::{Object, ObjectType};

use crate::{op_region::RegionSpace, stack::LocalStack};

/// Fatal evaluation errors. Conditions AML treats as ordinary outcomes (an absent
/// optional object, indexing past the end of a package) are not errors; they surface as
/// domain values instead.
#[derive(Clone, PartialEq, Debug)]
pub enum AmlError {
    RunOutOfStream,
    IllegalOpcode(u16),
    InvalidString,

    InvalidNameSeg([u8; 4]),
    EmptyNamesAreInvalid,
    InvalidNormalizedName(AmlName),
    RootHasNoParent,
    ObjectDoesNotExist(AmlName),
    StaleNode,
    ResolutionDidNotConverge,

    InvalidLocal(u8),
    InvalidArg(u8),
    NoCurrentFrame,
    MethodArgCountIncorrect,

    UnsupportedObjectKind(ObjectType),
    IncompatibleValueConversion,
    InvalidStoreTarget,

    InvalidFieldFlags,
    FieldRegionIsNotOpRegion,
    FieldInvalidAddress,
    FieldInvalidAccessSize,
    UnsupportedRegionSpace(RegionSpace),
}

/// The interface through which the interpreter touches hardware. Region reads and
/// writes land here; the embedder maps them onto real physical memory and port I/O.
pub trait Handler {
    fn read_u8(&mut self, address: usize) -> u8;
    fn read_u16(&mut self, address: usize) -> u16;
    fn read_u32(&mut self, address: usize) -> u32;
    fn read_u64(&mut self, address: usize) -> u64;

    fn write_u8(&mut self, address: usize, value: u8);
    fn write_u16(&mut self, address: usize, value: u16);
    fn write_u32(&mut self, address: usize, value: u32);
    fn write_u64(&mut self, address: usize, value: u64);

    fn read_io_u8(&mut self, port: u16) -> u8;
    fn read_io_u16(&mut self, port: u16) -> u16;
    fn read_io_u32(&mut self, port: u16) -> u32;

    fn write_io_u8(&mut self, port: u16, value: u8);
    fn write_io_u16(&mut self, port: u16, value: u16);
    fn write_io_u32(&mut self, port: u16, value: u32);
}

/// An AML evaluation engine: a namespace, a stack of invocation frames, and the
/// embedder's hardware handler.
pub struct Interpreter<H>
where
    H: Handler,
{
    pub namespace: Namespace,
    pub(crate) handler: H,
    pub(crate) stack: LocalStack,
}

impl<H> Interpreter<H>
where
    H: Handler,
{
    pub fn new(handler: H) -> Interpreter<H> {
        Interpreter { namespace: Namespace::new(), handler, stack: LocalStack::new() }
    }

    pub fn handler(&mut self) -> &mut H {
        &mut self.handler
    }
}
