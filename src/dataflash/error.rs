use std::fmt;

use super::{
	Buffer,
	Status,
};

/// Open-decoder modes; while one is active the chip interprets every
/// exchanged byte as data of that command.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Session {
	BufferRead(Buffer),
	BufferWrite(Buffer),
	PageProgram(Buffer),
	ArrayRead,
	PageRead,
}

impl fmt::Display for Session {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Session::BufferRead(b) => write!(f, "{} read", b),
			Session::BufferWrite(b) => write!(f, "{} write", b),
			Session::PageProgram(b) => write!(f, "page program through {}", b),
			Session::ArrayRead => write!(f, "continuous array read"),
			Session::PageRead => write!(f, "main memory page read"),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Fail)]
pub enum DataFlashError {
	#[fail(display = "device unresponsive: still busy after {} status polls (status {})", polls, status)]
	Unresponsive {
		polls: u32,
		status: Status,
	},
	#[fail(display = "page {} out of range (device has {} pages)", page, page_count)]
	PageOutOfRange {
		page: u16,
		page_count: u16,
	},
	#[fail(display = "buffer range {}+{} exceeds the page size {}", offset, len, page_size)]
	OffsetOutOfRange {
		offset: u16,
		len: usize,
		page_size: u16,
	},
	#[fail(display = "{} still open; deactivate before issuing another command", _0)]
	SessionOpen(Session),
	#[fail(display = "no open session to transfer data in")]
	NoSession,
	#[fail(display = "unexpected device id 0b{:04b} (expected 0b{:04b})", found, expected)]
	DeviceMismatch {
		found: u8,
		expected: u8,
	},
}

impl DataFlashError {
	/// caller broke the command protocol contract (as opposed to the chip
	/// not responding)
	pub fn is_precondition_violation(&self) -> bool {
		match self {
			DataFlashError::Unresponsive { .. } => false,
			DataFlashError::DeviceMismatch { .. } => false,
			_ => true,
		}
	}
}

/// `DataFlashError` behind a `failure::Error`, if that's what it is
pub fn dataflash_error(e: &failure::Error) -> Option<&DataFlashError> {
	e.downcast_ref::<DataFlashError>()
}
