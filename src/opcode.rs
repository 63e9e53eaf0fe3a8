//! Encoded AML opcode bytes. Extended opcodes are prefixed with `EXT_PREFIX` and carried
//! in the high byte of the combined `u16` form the stream decoder produces.

pub const ZERO_OP: u8 = 0x00;
pub const ONE_OP: u8 = 0x01;
pub const ALIAS_OP: u8 = 0x06;
pub const NAME_OP: u8 = 0x08;
pub const BYTE_PREFIX: u8 = 0x0a;
pub const WORD_PREFIX: u8 = 0x0b;
pub const DWORD_PREFIX: u8 = 0x0c;
pub const STRING_PREFIX: u8 = 0x0d;
pub const QWORD_PREFIX: u8 = 0x0e;
pub const SCOPE_OP: u8 = 0x10;
pub const BUFFER_OP: u8 = 0x11;
pub const PACKAGE_OP: u8 = 0x12;
pub const METHOD_OP: u8 = 0x14;
pub const EXT_PREFIX: u8 = 0x5b;
pub const ROOT_CHAR: u8 = 0x5c;
pub const PARENT_PREFIX_CHAR: u8 = 0x5e;
pub const LOCAL0_OP: u8 = 0x60;
pub const ARG0_OP: u8 = 0x68;
pub const STORE_OP: u8 = 0x70;
pub const REF_OF_OP: u8 = 0x71;
pub const ADD_OP: u8 = 0x72;
pub const SUBTRACT_OP: u8 = 0x74;
pub const INCREMENT_OP: u8 = 0x75;
pub const DECREMENT_OP: u8 = 0x76;
pub const MULTIPLY_OP: u8 = 0x77;
pub const SHIFT_LEFT_OP: u8 = 0x79;
pub const SHIFT_RIGHT_OP: u8 = 0x7a;
pub const AND_OP: u8 = 0x7b;
pub const OR_OP: u8 = 0x7d;
pub const XOR_OP: u8 = 0x7f;
pub const NOT_OP: u8 = 0x80;
pub const DEREF_OF_OP: u8 = 0x83;
pub const SIZE_OF_OP: u8 = 0x87;
pub const INDEX_OP: u8 = 0x88;
pub const CREATE_DWORD_FIELD_OP: u8 = 0x8a;
pub const CREATE_WORD_FIELD_OP: u8 = 0x8b;
pub const CREATE_BYTE_FIELD_OP: u8 = 0x8c;
pub const CREATE_BIT_FIELD_OP: u8 = 0x8d;
pub const CREATE_QWORD_FIELD_OP: u8 = 0x8f;
pub const L_AND_OP: u8 = 0x90;
pub const L_OR_OP: u8 = 0x91;
pub const L_NOT_OP: u8 = 0x92;
pub const L_EQUAL_OP: u8 = 0x93;
pub const L_GREATER_OP: u8 = 0x94;
pub const L_LESS_OP: u8 = 0x95;
pub const TO_BUFFER_OP: u8 = 0x96;
pub const TO_INTEGER_OP: u8 = 0x99;
pub const CONTINUE_OP: u8 = 0x9f;
pub const IF_OP: u8 = 0xa0;
pub const ELSE_OP: u8 = 0xa1;
pub const WHILE_OP: u8 = 0xa2;
pub const NOOP_OP: u8 = 0xa3;
pub const RETURN_OP: u8 = 0xa4;
pub const BREAK_OP: u8 = 0xa5;
pub const BREAKPOINT_OP: u8 = 0xcc;
pub const ONES_OP: u8 = 0xff;

pub const DUAL_NAME_PREFIX: u8 = 0x2e;
pub const MULTI_NAME_PREFIX: u8 = 0x2f;
pub const NULL_NAME: u8 = 0x00;

// Extended (0x5b-prefixed) opcodes, as combined u16 values
pub const EXT_DEBUG_OP: u16 = ext(0x31);
pub const EXT_OP_REGION_OP: u16 = ext(0x80);
pub const EXT_FIELD_OP: u16 = ext(0x81);
pub const EXT_DEVICE_OP: u16 = ext(0x82);
pub const EXT_INDEX_FIELD_OP: u16 = ext(0x86);

const fn ext(op: u8) -> u16 {
    ((EXT_PREFIX as u16) << 8) | op as u16
}
