use crate::{
    namespace::AmlName,
    op_region::OpRegion,
    AmlError,
};
use alloc::{string::String, vec::Vec};
use bit_field::BitField;
use core::fmt;

/// A value stored in the namespace or flowing through an evaluation. Every node in the
/// namespace carries exactly one of these; evaluation operates on owned copies, so
/// mutating a local never aliases a namespace node.
#[derive(Clone, PartialEq, Debug)]
pub enum Object {
    /// The state of a node that has been created but not yet assigned a value, and of
    /// locals that have not been stored to.
    Uninitialized,
    Integer(u64),
    String(String),
    Buffer(Vec<u8>),
    Package(Vec<Object>),
    /// A name held as data. Evaluating it re-resolves and evaluates the named object.
    NameString(AmlName),
    Reference {
        kind: ReferenceKind,
    },
    Method {
        flags: MethodFlags,
        code: Vec<u8>,
    },
    OpRegion(OpRegion),
    FieldUnit(FieldUnit),
    /// A bit-range view over a named buffer, created by the `CreateField` family.
    BufferField {
        buffer: AmlName,
        offset_bits: usize,
        length_bits: usize,
    },
    /// The value of a field read wider than 32 bits. Carried opaquely rather than
    /// truncated; arithmetic on it is not supported.
    Register(u64),
    Debug,
}

/// The two flavours of reference object. `Element` points into a package or buffer and
/// dereferences to the addressed element; `Alias` stands for the named object itself.
#[derive(Clone, PartialEq, Debug)]
pub enum ReferenceKind {
    Element { target: AmlName, index: u64 },
    Alias(AmlName),
}

#[derive(Clone, PartialEq, Debug)]
pub struct FieldUnit {
    pub kind: FieldUnitKind,
    pub flags: FieldFlags,
    pub bit_index: usize,
    pub bit_length: usize,
}

/// Normal field units read their operation region directly. Index fields reach their
/// region indirectly: a store to the index field selects the register, then the data
/// field carries the value.
#[derive(Clone, PartialEq, Debug)]
pub enum FieldUnitKind {
    Normal { region: AmlName },
    Index { index: AmlName, data: AmlName },
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct FieldFlags(pub u8);

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum FieldAccessType {
    Any,
    Byte,
    Word,
    DWord,
    QWord,
    Buffer,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum FieldUpdateRule {
    Preserve,
    WriteAsOnes,
    WriteAsZeros,
}

impl FieldFlags {
    pub fn access_type(&self) -> Result<FieldAccessType, AmlError> {
        match self.0.get_bits(0..4) {
            0 => Ok(FieldAccessType::Any),
            1 => Ok(FieldAccessType::Byte),
            2 => Ok(FieldAccessType::Word),
            3 => Ok(FieldAccessType::DWord),
            4 => Ok(FieldAccessType::QWord),
            5 => Ok(FieldAccessType::Buffer),
            _ => Err(AmlError::InvalidFieldFlags),
        }
    }

    /// The smallest access width the declared access type permits, in bits.
    pub fn minimum_access_size(&self) -> Result<usize, AmlError> {
        match self.access_type()? {
            FieldAccessType::Any => Ok(8),
            FieldAccessType::Byte | FieldAccessType::Buffer => Ok(8),
            FieldAccessType::Word => Ok(16),
            FieldAccessType::DWord => Ok(32),
            FieldAccessType::QWord => Ok(64),
        }
    }

    pub fn update_rule(&self) -> FieldUpdateRule {
        match self.0.get_bits(5..7) {
            0 => FieldUpdateRule::Preserve,
            1 => FieldUpdateRule::WriteAsOnes,
            _ => FieldUpdateRule::WriteAsZeros,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct MethodFlags(pub u8);

impl MethodFlags {
    pub fn arg_count(&self) -> usize {
        self.0.get_bits(0..3) as usize
    }

    pub fn serialized(&self) -> bool {
        self.0.get_bit(3)
    }

    pub fn sync_level(&self) -> u8 {
        self.0.get_bits(4..8)
    }
}

/// The coarse kind of an object, used for type checks and for reporting which kind an
/// operation could not handle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ObjectType {
    Uninitialized,
    Integer,
    String,
    Buffer,
    Package,
    NameString,
    Reference,
    Method,
    OpRegion,
    FieldUnit,
    BufferField,
    Register,
    Debug,
}

impl Object {
    pub fn type_of(&self) -> ObjectType {
        match self {
            Object::Uninitialized => ObjectType::Uninitialized,
            Object::Integer(_) => ObjectType::Integer,
            Object::String(_) => ObjectType::String,
            Object::Buffer(_) => ObjectType::Buffer,
            Object::Package(_) => ObjectType::Package,
            Object::NameString(_) => ObjectType::NameString,
            Object::Reference { .. } => ObjectType::Reference,
            Object::Method { .. } => ObjectType::Method,
            Object::OpRegion(_) => ObjectType::OpRegion,
            Object::FieldUnit(_) => ObjectType::FieldUnit,
            Object::BufferField { .. } => ObjectType::BufferField,
            Object::Register(_) => ObjectType::Register,
            Object::Debug => ObjectType::Debug,
        }
    }

    /// Interpret this object as an integer, applying the implicit conversions: buffers
    /// are read little-endian (up to 8 bytes), strings are parsed as hex.
    pub fn as_integer(&self) -> Result<u64, AmlError> {
        match self {
            Object::Integer(value) => Ok(*value),
            Object::Register(value) => Ok(*value),
            Object::Buffer(bytes) => {
                let mut value = 0u64;
                for &byte in bytes.iter().take(8).rev() {
                    value = (value << 8) | byte as u64;
                }
                Ok(value)
            }
            Object::String(string) => {
                u64::from_str_radix(string.trim_start_matches("0x"), 16)
                    .map_err(|_| AmlError::IncompatibleValueConversion)
            }
            _ => Err(AmlError::IncompatibleValueConversion),
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Uninitialized => write!(f, "[uninitialized]"),
            Object::Integer(value) => write!(f, "{:#x}", value),
            Object::String(string) => write!(f, "{:?}", string),
            Object::Buffer(bytes) => write!(f, "Buffer({} bytes)", bytes.len()),
            Object::Package(elements) => write!(f, "Package({} elements)", elements.len()),
            Object::NameString(name) => write!(f, "Name({})", name),
            Object::Reference { kind: ReferenceKind::Element { target, index } } => {
                write!(f, "Reference({}[{}])", target, index)
            }
            Object::Reference { kind: ReferenceKind::Alias(target) } => write!(f, "Reference({})", target),
            Object::Method { flags, .. } => write!(f, "Method({} args)", flags.arg_count()),
            Object::OpRegion(region) => write!(f, "{:?}", region),
            Object::FieldUnit(field) => {
                write!(f, "FieldUnit(bits {}..{})", field.bit_index, field.bit_index + field.bit_length)
            }
            Object::BufferField { buffer, offset_bits, length_bits } => {
                write!(f, "BufferField({} bits {}..{})", buffer, offset_bits, offset_bits + length_bits)
            }
            Object::Register(value) => write!(f, "Register({:#x})", value),
            Object::Debug => write!(f, "Debug"),
        }
    }
}

/// Copy `length` bits from `src` (starting at `src_index`) into `dst` (starting at
/// `dst_index`). Bits past the end of `src` read as zero, so a narrow source
/// zero-extends into a wider destination.
pub(crate) fn copy_bits(src: &[u8], src_index: usize, dst: &mut [u8], dst_index: usize, length: usize) {
    for i in 0..length {
        let bit = src
            .get((src_index + i) / 8)
            .map_or(false, |byte| byte.get_bit((src_index + i) % 8));
        if let Some(byte) = dst.get_mut((dst_index + i) / 8) {
            byte.set_bit((dst_index + i) % 8, bit);
        }
    }
}
