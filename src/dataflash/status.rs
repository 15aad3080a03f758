use std::fmt;

const STATUS_READY:          u8 = 0x80;
const STATUS_COMPARE:        u8 = 0x40; // set: buffer and page differ
const STATUS_DEVICE_ID_MASK: u8 = 0x3c;
const STATUS_DEVICE_ID_SHIFT: u8 = 2;

/// Status register of the DataFlash; read fresh with every status query.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Status(pub u8);

impl Status {
	/// build a status byte the way the chip reports it
	pub fn new(ready: bool, mismatch: bool, device_id: u8) -> Self {
		let mut value = (device_id << STATUS_DEVICE_ID_SHIFT) & STATUS_DEVICE_ID_MASK;
		if ready { value |= STATUS_READY; }
		if mismatch { value |= STATUS_COMPARE; }
		Status(value)
	}

	pub fn is_ready(&self) -> bool {
		self.0 & STATUS_READY != 0
	}

	pub fn is_busy(&self) -> bool {
		!self.is_ready()
	}

	// only meaningful right after a compare command finished
	pub fn is_mismatch(&self) -> bool {
		self.0 & STATUS_COMPARE != 0
	}

	/// density code; the Butterfly's AT45DB041 reports 0b0111
	pub fn device_id(&self) -> u8 {
		(self.0 & STATUS_DEVICE_ID_MASK) >> STATUS_DEVICE_ID_SHIFT
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x}", self.0)
	}
}

impl fmt::Debug for Status {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x} (device id: 0b{:04b}", self.0, self.device_id())?;
		if self.is_ready() { write!(f, " [READY]")?; } else { write!(f, " [BUSY]")?; }
		if self.is_mismatch() { write!(f, " [MISMATCH]")?; }
		write!(f, ")")
	}
}
