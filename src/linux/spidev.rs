use std::fs;
use std::io;
use std::mem;
use std::os::unix::io::AsRawFd;

use libc::ioctl;

use crate::spi::{
	ClockMode,
	Transport,
};

use super::GpioLine;

/* linux/spi/spidev.h */

const SPI_IOC_MAGIC: u32 = b'k' as u32;
const SPI_NO_CS: u8 = 0x40;

// _IOW(SPI_IOC_MAGIC, nr, size)
const fn spi_iow(nr: u32, size: usize) -> u32 {
	(1 << 30) | ((size as u32) << 16) | (SPI_IOC_MAGIC << 8) | nr
}

const SPI_IOC_MESSAGE_1: u32 = spi_iow(0, mem::size_of::<SpiIocTransfer>());
const SPI_IOC_WR_MODE: u32 = spi_iow(1, mem::size_of::<u8>());
const SPI_IOC_WR_BITS_PER_WORD: u32 = spi_iow(3, mem::size_of::<u8>());
const SPI_IOC_WR_MAX_SPEED_HZ: u32 = spi_iow(4, mem::size_of::<u32>());

#[repr(C)]
#[derive(Default)]
struct SpiIocTransfer {
	tx_buf: u64,
	rx_buf: u64,
	len: u32,
	speed_hz: u32,
	delay_usecs: u16,
	bits_per_word: u8,
	cs_change: u8,
	tx_nbits: u8,
	rx_nbits: u8,
	word_delay_usecs: u8,
	pad: u8,
}

/// `/dev/spidevB.C` with a separate GPIO as (active low) chip select.
pub struct Spidev {
	file: fs::File,
	chip_select: GpioLine,
	speed_hz: u32,
}

impl Spidev {
	pub fn open(path: &str, cs_gpio: u32) -> io::Result<Self> {
		let file = fs::OpenOptions::new()
			.read(true)
			.write(true)
			.open(path)?;
		// deselected until the first command
		let chip_select = GpioLine::open_output(cs_gpio, true)?;

		Ok(Spidev {
			file,
			chip_select,
			speed_hz: 0,
		})
	}

	fn write_setting<V>(&self, request: u32, value: &V) -> io::Result<()> {
		let res = unsafe {
			ioctl(self.file.as_raw_fd(), request as _, value as *const V)
		};
		if res < 0 {
			return Err(io::Error::last_os_error());
		}
		Ok(())
	}
}

impl Transport for Spidev {
	fn configure(&mut self, mode: ClockMode) -> crate::AResult<()> {
		let mode_bits = mode.mode_bits() | SPI_NO_CS;
		self.write_setting(SPI_IOC_WR_MODE, &mode_bits)?;
		self.write_setting(SPI_IOC_WR_BITS_PER_WORD, &8u8)?;
		self.write_setting(SPI_IOC_WR_MAX_SPEED_HZ, &mode.speed_hz)?;
		self.speed_hz = mode.speed_hz;
		debug!("spidev configured: {}", mode);
		Ok(())
	}

	fn select_device(&mut self, active: bool) -> crate::AResult<()> {
		self.chip_select.set(!active)?;
		Ok(())
	}

	fn exchange_byte(&mut self, output: u8) -> crate::AResult<u8> {
		let tx = [output];
		let mut rx = [0u8];
		let transfer = SpiIocTransfer {
			tx_buf: tx.as_ptr() as u64,
			rx_buf: rx.as_mut_ptr() as u64,
			len: 1,
			speed_hz: self.speed_hz,
			bits_per_word: 8,
			..SpiIocTransfer::default()
		};
		let res = unsafe {
			ioctl(self.file.as_raw_fd(), SPI_IOC_MESSAGE_1 as _, &transfer as *const SpiIocTransfer)
		};
		if res < 0 {
			return Err(io::Error::last_os_error().into());
		}
		Ok(rx[0])
	}
}
