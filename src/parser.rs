use crate::{
    namespace::{AmlName, NameComponent, NameSeg},
    opcode::*,
    AmlError,
};
use alloc::{string::String, vec::Vec};
use byteorder::{ByteOrder, LittleEndian};

/// A cursor over one stream of encoded AML, together with the scope names inside it are
/// resolved against. One of these exists per table load and per method invocation.
pub struct MethodContext<'a> {
    stream: &'a [u8],
    pub pc: usize,
    pub scope: AmlName,
}

impl<'a> MethodContext<'a> {
    pub fn new(stream: &'a [u8], scope: AmlName) -> MethodContext<'a> {
        assert!(scope.is_absolute());
        MethodContext { stream, pc: 0, scope }
    }

    pub fn len(&self) -> usize {
        self.stream.len()
    }

    pub fn slice(&self, start: usize, end: usize) -> Result<&'a [u8], AmlError> {
        self.stream.get(start..end).ok_or(AmlError::RunOutOfStream)
    }

    pub fn peek(&self) -> Result<u8, AmlError> {
        self.stream.get(self.pc).copied().ok_or(AmlError::RunOutOfStream)
    }

    pub fn next(&mut self) -> Result<u8, AmlError> {
        let byte = self.peek()?;
        self.pc += 1;
        Ok(byte)
    }

    pub fn next_u16(&mut self) -> Result<u16, AmlError> {
        let bytes = self.slice(self.pc, self.pc + 2)?;
        self.pc += 2;
        Ok(LittleEndian::read_u16(bytes))
    }

    pub fn next_u32(&mut self) -> Result<u32, AmlError> {
        let bytes = self.slice(self.pc, self.pc + 4)?;
        self.pc += 4;
        Ok(LittleEndian::read_u32(bytes))
    }

    pub fn next_u64(&mut self) -> Result<u64, AmlError> {
        let bytes = self.slice(self.pc, self.pc + 8)?;
        self.pc += 8;
        Ok(LittleEndian::read_u64(bytes))
    }

    /// Decode the next opcode. Extended opcodes are two bytes and come back with
    /// `EXT_PREFIX` in the high byte; everything else is the single byte zero-extended.
    pub fn opcode(&mut self) -> Result<u16, AmlError> {
        let first = self.next()?;
        if first == EXT_PREFIX {
            Ok(((EXT_PREFIX as u16) << 8) | self.next()? as u16)
        } else {
            Ok(first as u16)
        }
    }

    /// Decode a bare PkgLength-encoded number. Field lists use this form for bit counts.
    pub fn pkglength(&mut self) -> Result<usize, AmlError> {
        let lead = self.next()?;
        let following = (lead >> 6) as usize;

        if following == 0 {
            Ok((lead & 0x3f) as usize)
        } else {
            let mut length = (lead & 0x0f) as usize;
            for i in 0..following {
                length |= (self.next()? as usize) << (4 + i * 8);
            }
            Ok(length)
        }
    }

    /// Decode a PkgLength that delimits a package and return the pc one past its end. The
    /// encoded length counts from the first PkgLength byte, so the end is relative to the
    /// pc on entry.
    pub fn pkglength_end(&mut self) -> Result<usize, AmlError> {
        let start = self.pc;
        let length = self.pkglength()?;
        let end = start + length;
        if end > self.stream.len() {
            return Err(AmlError::RunOutOfStream);
        }
        Ok(end)
    }

    /// Decode an encoded NameString: optional root or parent-prefix anchors followed by
    /// zero, one, two, or `MULTI_NAME_PREFIX`-counted name segments.
    pub fn namestring(&mut self) -> Result<AmlName, AmlError> {
        let mut components = Vec::new();

        match self.peek()? {
            ROOT_CHAR => {
                self.next()?;
                components.push(NameComponent::Root);
            }
            PARENT_PREFIX_CHAR => {
                while self.peek()? == PARENT_PREFIX_CHAR {
                    self.next()?;
                    components.push(NameComponent::Prefix);
                }
            }
            _ => (),
        }

        let seg_count = match self.peek()? {
            NULL_NAME => {
                self.next()?;
                0
            }
            DUAL_NAME_PREFIX => {
                self.next()?;
                2
            }
            MULTI_NAME_PREFIX => {
                self.next()?;
                self.next()? as usize
            }
            _ => 1,
        };

        for _ in 0..seg_count {
            let bytes = [self.next()?, self.next()?, self.next()?, self.next()?];
            components.push(NameComponent::Segment(NameSeg::from_bytes(bytes)?));
        }

        if components.is_empty() {
            return Err(AmlError::EmptyNamesAreInvalid);
        }
        Ok(AmlName::from_components(components))
    }

    /// Read a NUL-terminated ASCII string (the payload of `STRING_PREFIX`).
    pub fn ascii_string(&mut self) -> Result<String, AmlError> {
        let mut string = String::new();
        loop {
            match self.next()? {
                0 => return Ok(string),
                byte if byte.is_ascii() => string.push(byte as char),
                _ => return Err(AmlError::InvalidString),
            }
        }
    }
}
