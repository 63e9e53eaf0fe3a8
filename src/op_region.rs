use crate::{
    object::{copy_bits, FieldFlags, FieldUpdateRule, Object},
    AmlError, Handler,
};
use log::trace;

/// A declared operation region: a window of `length` bytes at `base` in some address
/// space. Field units address bit ranges within it; all hardware access goes through the
/// [`Handler`].
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct OpRegion {
    pub space: RegionSpace,
    pub base: u64,
    pub length: u64,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegionSpace {
    SystemMemory,
    SystemIo,
    PciConfig,
    EmbeddedControl,
    SmBus,
    SystemCmos,
    PciBarTarget,
    Ipmi,
    GeneralPurposeIo,
    GenericSerialBus,
    Oem(u8),
}

impl RegionSpace {
    pub fn from_byte(byte: u8) -> RegionSpace {
        match byte {
            0 => RegionSpace::SystemMemory,
            1 => RegionSpace::SystemIo,
            2 => RegionSpace::PciConfig,
            3 => RegionSpace::EmbeddedControl,
            4 => RegionSpace::SmBus,
            5 => RegionSpace::SystemCmos,
            6 => RegionSpace::PciBarTarget,
            7 => RegionSpace::Ipmi,
            8 => RegionSpace::GeneralPurposeIo,
            9 => RegionSpace::GenericSerialBus,
            other => RegionSpace::Oem(other),
        }
    }
}

impl OpRegion {
    /// Read a whole field unit out of this region, as an integer. The access width is the
    /// larger of the field's declared minimum and the smallest power-of-two that covers
    /// the field; reads at that width are then assembled bit by bit.
    pub fn read_field(
        &self,
        flags: FieldFlags,
        bit_index: usize,
        bit_length: usize,
        handler: &mut dyn Handler,
    ) -> Result<Object, AmlError> {
        let access_size_bits = self.access_size_bits(flags, bit_length)?;

        let mut result = [0u8; 8];
        let mut bits_read = 0;
        while bits_read < bit_length {
            let aligned_bit = (bit_index + bits_read) & !(access_size_bits - 1);
            let raw = self.read(aligned_bit / 8, access_size_bits, handler)?;

            let offset_in_access = (bit_index + bits_read) - aligned_bit;
            let bits_this_access = usize::min(bit_length - bits_read, access_size_bits - offset_in_access);
            copy_bits(&raw.to_le_bytes(), offset_in_access, &mut result, bits_read, bits_this_access);
            bits_read += bits_this_access;
        }

        let result = u64::from_le_bytes(result);
        if bit_length > 32 {
            Ok(Object::Register(result))
        } else {
            Ok(Object::Integer(result))
        }
    }

    /// Write `value` into a field unit. Accesses that only partially cover the field obey
    /// the field's update rule for their untouched bits.
    pub fn write_field(
        &self,
        flags: FieldFlags,
        bit_index: usize,
        bit_length: usize,
        value: u64,
        handler: &mut dyn Handler,
    ) -> Result<(), AmlError> {
        let access_size_bits = self.access_size_bits(flags, bit_length)?;

        let mut bits_written = 0;
        while bits_written < bit_length {
            let aligned_bit = (bit_index + bits_written) & !(access_size_bits - 1);
            let offset_in_access = (bit_index + bits_written) - aligned_bit;
            let bits_this_access = usize::min(bit_length - bits_written, access_size_bits - offset_in_access);

            let whole_access = offset_in_access == 0 && bits_this_access == access_size_bits;
            let merged = if whole_access {
                0
            } else {
                match flags.update_rule() {
                    FieldUpdateRule::Preserve => self.read(aligned_bit / 8, access_size_bits, handler)?,
                    FieldUpdateRule::WriteAsOnes => u64::MAX,
                    FieldUpdateRule::WriteAsZeros => 0,
                }
            };

            let mut merged = merged.to_le_bytes();
            copy_bits(&value.to_le_bytes(), bits_written, &mut merged, offset_in_access, bits_this_access);
            self.write(aligned_bit / 8, access_size_bits, u64::from_le_bytes(merged), handler)?;
            bits_written += bits_this_access;
        }

        Ok(())
    }

    fn access_size_bits(&self, flags: FieldFlags, bit_length: usize) -> Result<usize, AmlError> {
        let minimum = flags.minimum_access_size()?;
        let size = usize::max(minimum, bit_length.next_power_of_two());
        if size > 64 {
            return Err(AmlError::FieldInvalidAccessSize);
        }
        Ok(size)
    }

    /// A single aligned access of `length_bits` at byte `offset` within the region.
    pub fn read(&self, offset: usize, length_bits: usize, handler: &mut dyn Handler) -> Result<u64, AmlError> {
        if (offset + length_bits / 8) as u64 > self.length {
            return Err(AmlError::FieldInvalidAddress);
        }
        let address = self.base as usize + offset;

        let value = match self.space {
            RegionSpace::SystemMemory => match length_bits {
                8 => handler.read_u8(address) as u64,
                16 => handler.read_u16(address) as u64,
                32 => handler.read_u32(address) as u64,
                64 => handler.read_u64(address),
                _ => return Err(AmlError::FieldInvalidAccessSize),
            },
            RegionSpace::SystemIo => match length_bits {
                8 => handler.read_io_u8(address as u16) as u64,
                16 => handler.read_io_u16(address as u16) as u64,
                32 => handler.read_io_u32(address as u16) as u64,
                _ => return Err(AmlError::FieldInvalidAccessSize),
            },
            space => {
                trace!("Read from unsupported region space: {:?}", space);
                return Err(AmlError::UnsupportedRegionSpace(space));
            }
        };

        trace!("Read {:#x} ({} bits) from {:?} offset {:#x}", value, length_bits, self.space, offset);
        Ok(value)
    }

    pub fn write(
        &self,
        offset: usize,
        length_bits: usize,
        value: u64,
        handler: &mut dyn Handler,
    ) -> Result<(), AmlError> {
        if (offset + length_bits / 8) as u64 > self.length {
            return Err(AmlError::FieldInvalidAddress);
        }
        let address = self.base as usize + offset;
        trace!("Write {:#x} ({} bits) to {:?} offset {:#x}", value, length_bits, self.space, offset);

        match self.space {
            RegionSpace::SystemMemory => match length_bits {
                8 => handler.write_u8(address, value as u8),
                16 => handler.write_u16(address, value as u16),
                32 => handler.write_u32(address, value as u32),
                64 => handler.write_u64(address, value),
                _ => return Err(AmlError::FieldInvalidAccessSize),
            },
            RegionSpace::SystemIo => match length_bits {
                8 => handler.write_io_u8(address as u16, value as u8),
                16 => handler.write_io_u16(address as u16, value as u16),
                32 => handler.write_io_u32(address as u16, value as u32),
                _ => return Err(AmlError::FieldInvalidAccessSize),
            },
            space => {
                trace!("Write to unsupported region space: {:?}", space);
                return Err(AmlError::UnsupportedRegionSpace(space));
            }
        }
        Ok(())
    }
}
