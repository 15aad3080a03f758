use std::fmt;

use super::opcodes::*;

/// One of the two SRAM buffers on the chip.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Buffer {
	One,
	Two,
}

impl Buffer {
	/// `1` selects buffer 1; anything else selects the other buffer.
	pub fn from_number(number: u8) -> Self {
		if number == 1 { Buffer::One } else { Buffer::Two }
	}

	pub fn number(&self) -> u8 {
		match self {
			Buffer::One => 1,
			Buffer::Two => 2,
		}
	}

	pub(crate) fn read_opcode(&self) -> u8 {
		match self {
			Buffer::One => BUFFER_1_READ,
			Buffer::Two => BUFFER_2_READ,
		}
	}

	pub(crate) fn write_opcode(&self) -> u8 {
		match self {
			Buffer::One => BUFFER_1_WRITE,
			Buffer::Two => BUFFER_2_WRITE,
		}
	}

	pub(crate) fn transfer_opcode(&self) -> u8 {
		match self {
			Buffer::One => PAGE_TO_BUFFER_1_TRANSFER,
			Buffer::Two => PAGE_TO_BUFFER_2_TRANSFER,
		}
	}

	pub(crate) fn program_with_erase_opcode(&self) -> u8 {
		match self {
			Buffer::One => BUFFER_1_TO_PAGE_WITH_ERASE,
			Buffer::Two => BUFFER_2_TO_PAGE_WITH_ERASE,
		}
	}

	pub(crate) fn program_without_erase_opcode(&self) -> u8 {
		match self {
			Buffer::One => BUFFER_1_TO_PAGE_WITHOUT_ERASE,
			Buffer::Two => BUFFER_2_TO_PAGE_WITHOUT_ERASE,
		}
	}

	pub(crate) fn page_program_opcode(&self) -> u8 {
		match self {
			Buffer::One => PAGE_PROGRAM_THROUGH_BUFFER_1,
			Buffer::Two => PAGE_PROGRAM_THROUGH_BUFFER_2,
		}
	}

	pub(crate) fn compare_opcode(&self) -> u8 {
		match self {
			Buffer::One => PAGE_TO_BUFFER_1_COMPARE,
			Buffer::Two => PAGE_TO_BUFFER_2_COMPARE,
		}
	}

	pub(crate) fn auto_rewrite_opcode(&self) -> u8 {
		match self {
			Buffer::One => AUTO_PAGE_REWRITE_BUFFER_1,
			Buffer::Two => AUTO_PAGE_REWRITE_BUFFER_2,
		}
	}
}

impl fmt::Display for Buffer {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "buffer {}", self.number())
	}
}

/// Page layout of a DataFlash part.
///
/// The 24-bit address of a page command is `page << page_bits | offset`, so
/// `page_bits` also is the width of the in-page (buffer) offset.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Geometry {
	pub page_bits: u8,
	pub page_size: u16,
	pub page_count: u16,
	/// density code reported in the status register
	pub device_id: u8,
}

impl Geometry {
	/// 4-Mbit part fitted to the Butterfly
	pub const AT45DB041: Geometry = Geometry {
		page_bits: 9,
		page_size: 264,
		page_count: 2048,
		device_id: 0b0111,
	};

	pub fn capacity(&self) -> usize {
		self.page_size as usize * self.page_count as usize
	}

	pub fn contains_page(&self, page: u16) -> bool {
		page < self.page_count
	}

	/// whether `len` bytes starting at `offset` fit into one buffer
	pub fn contains_range(&self, offset: u16, len: usize) -> bool {
		(offset as usize) + len <= self.page_size as usize
	}

	/// upper and lower address byte of a page command; the third address
	/// byte is don't care
	pub fn encode_page(&self, page: u16) -> [u8; 2] {
		debug_assert!(self.page_bits >= 8 && self.page_bits <= 16);
		[
			(page >> (16 - self.page_bits)) as u8,
			(page << (self.page_bits - 8)) as u8,
		]
	}

	/// full 24-bit address of the array read commands; the lowest page
	/// bits share a byte with the offset's high bits
	pub fn encode_array_address(&self, page: u16, offset: u16) -> [u8; 3] {
		let [high, low] = self.encode_page(page);
		[
			high,
			low.wrapping_add((offset >> 8) as u8),
			offset as u8,
		]
	}

	/// how the chip splits a received 24-bit address into page and offset
	pub fn decode_address(&self, address: [u8; 3]) -> (u16, u16) {
		let raw = (address[0] as u32) << 16 | (address[1] as u32) << 8 | address[2] as u32;
		let offset_mask = (1u32 << self.page_bits) - 1;
		let page = (raw >> self.page_bits) % self.page_count as u32;
		(page as u16, (raw & offset_mask) as u16)
	}
}

impl Default for Geometry {
	fn default() -> Self {
		Geometry::AT45DB041
	}
}
