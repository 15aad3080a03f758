/// Byte-wide synchronous serial transport, as used by the AT45D DataFlash.
///
/// The chip talks SPI mode 3 (or 0), MSB first. Every command starts with a
/// falling CHIP SELECT edge, which resets the command decoder on the chip;
/// commands that program, erase, compare or transfer a page only start
/// executing on the rising edge.
///
/// Framing of a command:
/// - 8-bit opcode
/// - 24 bits of address / don't care
/// - optional further don't care bytes
/// - data phase (send or receive), as long as CHIP SELECT stays low
///
/// Only `Transport` needs to be implemented by a back-end; `LowLevel` adds
/// the framing helpers on top of any transport.

mod hardware;
mod low_level;

pub use self::hardware::{
	ClockMode,
	Transport,
};

pub use self::low_level::LowLevel;
