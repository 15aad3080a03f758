// Linux host back-end: spidev for the bus, sysfs GPIO for chip select.
//
// The spidev chip select can't be held across ioctl calls the way the
// DataFlash needs it (commands spanning many single byte exchanges), so the
// device is run with SPI_NO_CS and CS is driven as a plain GPIO.

mod gpio;
mod spidev;

pub use self::gpio::GpioLine;
pub use self::spidev::Spidev;
