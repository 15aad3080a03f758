use std::io;

use crate::spi::{
	LowLevel,
	Transport,
};

use super::{
	Buffer,
	DataFlash,
	Session,
	Status,
};

fn into_io_error(e: failure::Error) -> io::Error {
	io::Error::new(io::ErrorKind::Other, format!("{}", e))
}

// Every session keeps CHIP SELECT asserted while alive. Dropping it releases
// CHIP SELECT again, unless `leave_open` hands the open decoder over to the
// `DataFlash` (which then only accepts `transfer` and `deactivate`).

pub struct BufferReader<'a, T: Transport + 'a> {
	flash: &'a mut DataFlash<T>,
	buffer: Buffer,
	position: u16,
	open: bool,
}

impl<'a, T: Transport> BufferReader<'a, T> {
	pub(super) fn new(flash: &'a mut DataFlash<T>, buffer: Buffer, offset: u16) -> Self {
		BufferReader {
			flash,
			buffer,
			position: offset,
			open: true,
		}
	}

	pub fn buffer(&self) -> Buffer {
		self.buffer
	}

	/// offset of the next byte to read
	pub fn offset(&self) -> u16 {
		self.position
	}

	/// bytes left until the end of the buffer
	pub fn remaining(&self) -> usize {
		(self.flash.geometry().page_size - self.position) as usize
	}

	pub fn read_byte(&mut self) -> crate::AResult<u8> {
		let mut data = [0u8];
		self.read(&mut data)?;
		Ok(data[0])
	}

	pub fn read(&mut self, target: &mut [u8]) -> crate::AResult<()> {
		self.flash.check_range(self.position, target.len())?;
		self.flash.transport.receive(target)?;
		self.position += target.len() as u16;
		Ok(())
	}

	pub fn finish(mut self) -> crate::AResult<()> {
		self.open = false;
		self.flash.close_session()
	}

	pub fn leave_open(mut self) {
		self.open = false;
		debug!("leaving {} read open", self.buffer);
		self.flash.session = Some(Session::BufferRead(self.buffer));
	}
}

impl<'a, T: Transport> Drop for BufferReader<'a, T> {
	fn drop(&mut self) {
		if self.open {
			if let Err(e) = self.flash.close_session() {
				warn!("Couldn't end {} read: {}", self.buffer, e);
			}
		}
	}
}

impl<'a, T: Transport> Iterator for BufferReader<'a, T> {
	type Item = crate::AResult<u8>;

	// stops at the end of the buffer
	fn next(&mut self) -> Option<Self::Item> {
		if self.remaining() == 0 {
			return None;
		}
		Some(self.read_byte())
	}
}

impl<'a, T: Transport> io::Read for BufferReader<'a, T> {
	fn read(&mut self, target: &mut [u8]) -> io::Result<usize> {
		let len = target.len().min(self.remaining());
		BufferReader::read(self, &mut target[..len]).map_err(into_io_error)?;
		Ok(len)
	}
}

pub struct BufferWriter<'a, T: Transport + 'a> {
	flash: &'a mut DataFlash<T>,
	buffer: Buffer,
	position: u16,
	open: bool,
}

impl<'a, T: Transport> BufferWriter<'a, T> {
	pub(super) fn new(flash: &'a mut DataFlash<T>, buffer: Buffer, offset: u16) -> Self {
		BufferWriter {
			flash,
			buffer,
			position: offset,
			open: true,
		}
	}

	pub fn buffer(&self) -> Buffer {
		self.buffer
	}

	/// offset the next byte gets written to
	pub fn offset(&self) -> u16 {
		self.position
	}

	pub fn write_byte(&mut self, data: u8) -> crate::AResult<()> {
		self.write(&[data])
	}

	pub fn write(&mut self, data: &[u8]) -> crate::AResult<()> {
		self.flash.check_range(self.position, data.len())?;
		self.flash.transport.send_all(data)?;
		self.position += data.len() as u16;
		Ok(())
	}

	pub fn finish(mut self) -> crate::AResult<()> {
		self.open = false;
		self.flash.close_session()
	}

	/// Keep the chip in continuous write mode; further bytes can be sent
	/// with `DataFlash::transfer` until `DataFlash::deactivate`.
	pub fn leave_open(mut self) {
		self.open = false;
		debug!("leaving {} write open", self.buffer);
		self.flash.session = Some(Session::BufferWrite(self.buffer));
	}
}

impl<'a, T: Transport> Drop for BufferWriter<'a, T> {
	fn drop(&mut self) {
		if self.open {
			if let Err(e) = self.flash.close_session() {
				warn!("Couldn't end {} write: {}", self.buffer, e);
			}
		}
	}
}

impl<'a, T: Transport> io::Write for BufferWriter<'a, T> {
	fn write(&mut self, data: &[u8]) -> io::Result<usize> {
		BufferWriter::write(self, data).map_err(into_io_error)?;
		Ok(data.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

/// Sequential main memory read (continuous array read or main memory page
/// read); has no end, the chip keeps sending data while CHIP SELECT is low.
pub struct ArrayReader<'a, T: Transport + 'a> {
	flash: &'a mut DataFlash<T>,
	session: Session,
	open: bool,
}

impl<'a, T: Transport> ArrayReader<'a, T> {
	pub(super) fn new(flash: &'a mut DataFlash<T>, session: Session) -> Self {
		ArrayReader {
			flash,
			session,
			open: true,
		}
	}

	pub fn read_byte(&mut self) -> crate::AResult<u8> {
		self.flash.transport.receive_byte()
	}

	pub fn read(&mut self, target: &mut [u8]) -> crate::AResult<()> {
		self.flash.transport.receive(target)
	}

	pub fn finish(mut self) -> crate::AResult<()> {
		self.open = false;
		self.flash.close_session()
	}

	pub fn leave_open(mut self) {
		self.open = false;
		debug!("leaving {} open", self.session);
		self.flash.session = Some(self.session);
	}
}

impl<'a, T: Transport> Drop for ArrayReader<'a, T> {
	fn drop(&mut self) {
		if self.open {
			if let Err(e) = self.flash.close_session() {
				warn!("Couldn't end {}: {}", self.session, e);
			}
		}
	}
}

impl<'a, T: Transport> Iterator for ArrayReader<'a, T> {
	type Item = crate::AResult<u8>;

	fn next(&mut self) -> Option<Self::Item> {
		Some(self.read_byte())
	}
}

impl<'a, T: Transport> io::Read for ArrayReader<'a, T> {
	fn read(&mut self, target: &mut [u8]) -> io::Result<usize> {
		ArrayReader::read(self, target).map_err(into_io_error)?;
		Ok(target.len())
	}
}

/// Buffer write that gets programmed into a page (with built-in erase) when
/// CHIP SELECT is released.
pub struct PageProgrammer<'a, T: Transport + 'a> {
	flash: &'a mut DataFlash<T>,
	buffer: Buffer,
	position: u16,
	open: bool,
}

impl<'a, T: Transport> PageProgrammer<'a, T> {
	pub(super) fn new(flash: &'a mut DataFlash<T>, buffer: Buffer, offset: u16) -> Self {
		PageProgrammer {
			flash,
			buffer,
			position: offset,
			open: true,
		}
	}

	pub fn offset(&self) -> u16 {
		self.position
	}

	pub fn write_byte(&mut self, data: u8) -> crate::AResult<()> {
		self.write(&[data])
	}

	pub fn write(&mut self, data: &[u8]) -> crate::AResult<()> {
		self.flash.check_range(self.position, data.len())?;
		self.flash.transport.send_all(data)?;
		self.position += data.len() as u16;
		Ok(())
	}

	/// start programming and wait until the page is written
	pub fn finish(mut self) -> crate::AResult<Status> {
		self.open = false;
		self.program()
	}

	/// Keep feeding the buffer with `DataFlash::transfer`; programming
	/// starts (and is waited for) on `DataFlash::deactivate`.
	pub fn leave_open(mut self) {
		self.open = false;
		debug!("leaving page program through {} open", self.buffer);
		self.flash.session = Some(Session::PageProgram(self.buffer));
	}

	fn program(&mut self) -> crate::AResult<Status> {
		self.flash.close_session()?;
		self.flash.wait_until_ready()
	}
}

impl<'a, T: Transport> Drop for PageProgrammer<'a, T> {
	fn drop(&mut self) {
		if self.open {
			if let Err(e) = self.program() {
				warn!("Couldn't program page through {}: {}", self.buffer, e);
			}
		}
	}
}
