use std::fmt;

/// Clock polarity/phase and speed of the serial bus.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ClockMode {
	/// CPOL: clock line is high while idle
	pub idle_high: bool,
	/// CPHA: data is sampled on the trailing clock edge
	pub sample_trailing: bool,
	pub speed_hz: u32,
}

impl ClockMode {
	// SPI_CPHA | SPI_CPOL, linux/spi/spidev.h numbering
	const CPHA: u8 = 0x01;
	const CPOL: u8 = 0x02;

	/// Mode 3 (CPOL = 1, CPHA = 1), what the Butterfly runs the DataFlash with.
	pub const fn mode3(speed_hz: u32) -> Self {
		ClockMode {
			idle_high: true,
			sample_trailing: true,
			speed_hz,
		}
	}

	pub const fn mode0(speed_hz: u32) -> Self {
		ClockMode {
			idle_high: false,
			sample_trailing: false,
			speed_hz,
		}
	}

	/// SPI mode number (0..=3)
	pub fn mode_bits(&self) -> u8 {
		let cpol = if self.idle_high { Self::CPOL } else { 0 };
		let cpha = if self.sample_trailing { Self::CPHA } else { 0 };
		cpol | cpha
	}

	/// The AT45D series only supports modes 0 and 3.
	pub fn is_dataflash_compatible(&self) -> bool {
		self.idle_high == self.sample_trailing
	}
}

impl Default for ClockMode {
	fn default() -> Self {
		// Butterfly: SPI2X with fosc/4 on an 8 MHz system clock
		ClockMode::mode3(4_000_000)
	}
}

impl fmt::Display for ClockMode {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "mode {} @ {} Hz", self.mode_bits(), self.speed_hz)
	}
}

/// A half-duplex view of a synchronous serial bus plus one chip select line.
///
/// Not reentrant: a byte exchange must not be interrupted by another command
/// on the same bus (e.g. from an interrupt handler).
pub trait Transport {
	/// Set up the bus as master with the given clock settings.
	fn configure(&mut self, mode: ClockMode) -> crate::AResult<()>;

	/// `true` asserts CHIP SELECT (drives the line low), `false` releases it.
	fn select_device(&mut self, active: bool) -> crate::AResult<()>;

	/// Shift `output` out while shifting one byte in; blocks until done.
	fn exchange_byte(&mut self, output: u8) -> crate::AResult<u8>;
}

impl<'a, T: ?Sized + Transport> Transport for &'a mut T {
	fn configure(&mut self, mode: ClockMode) -> crate::AResult<()> {
		T::configure(*self, mode)
	}
	fn select_device(&mut self, active: bool) -> crate::AResult<()> {
		T::select_device(*self, active)
	}
	fn exchange_byte(&mut self, output: u8) -> crate::AResult<u8> {
		T::exchange_byte(*self, output)
	}
}
