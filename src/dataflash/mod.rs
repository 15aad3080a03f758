/* Atmel AT45D DataFlash: main memory pages plus two SRAM page buffers */

/* The Butterfly carries an AT45DB041 (2048 pages of 264 bytes) */

use crate::spi::{
	ClockMode,
	LowLevel,
	Transport,
};

mod error;
mod geometry;
pub mod opcodes;
mod session;
mod status;
mod wait;

pub use self::error::{
	DataFlashError,
	Session,
	dataflash_error,
};

pub use self::geometry::{
	Buffer,
	Geometry,
};

pub use self::session::{
	ArrayReader,
	BufferReader,
	BufferWriter,
	PageProgrammer,
};

pub use self::status::Status;

pub use self::wait::{
	Readiness,
	WaitLimit,
	WaitOutcome,
};

use self::opcodes::*;

// page commands: 2 address bytes, then one don't care byte
const PAGE_ADDRESS_DONT_CARE: usize = 1;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Config {
	pub geometry: Geometry,
	pub wait_limit: WaitLimit,
	pub clock: ClockMode,
	/// `DataFlash::open` fails unless the status register reports the
	/// geometry's device id
	pub verify_device_id: bool,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			geometry: Geometry::AT45DB041,
			wait_limit: WaitLimit::default(),
			clock: ClockMode::default(),
			verify_device_id: true,
		}
	}
}

pub struct DataFlash<T: Transport> {
	transport: T,
	config: Config,
	device_id: Option<u8>,
	session: Option<Session>,
}

impl<T: Transport> DataFlash<T> {
	/// Configure the bus for the chip and leave CHIP SELECT released; doesn't
	/// talk to the chip.
	pub fn new(mut transport: T, config: Config) -> crate::AResult<Self> {
		ensure!(config.clock.is_dataflash_compatible(), "DataFlash requires SPI mode 0 or 3, got {}", config.clock);
		transport.configure(config.clock)?;
		transport.select_device(false)?;

		Ok(DataFlash {
			transport,
			config,
			device_id: None,
			session: None,
		})
	}

	/// Like `new`, but also read the status register and check the device id.
	pub fn open(transport: T, config: Config) -> crate::AResult<Self> {
		let mut flash = Self::new(transport, config)?;
		let status = flash.read_status()?;
		let expected = config.geometry.device_id;
		if status.device_id() != expected {
			if config.verify_device_id {
				return Err(DataFlashError::DeviceMismatch {
					found: status.device_id(),
					expected,
				}.into());
			}
			warn!("DataFlash reports device id 0b{:04b}, expected 0b{:04b}", status.device_id(), expected);
		}
		debug!("DataFlash ready: {:?}", status);
		Ok(flash)
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn geometry(&self) -> Geometry {
		self.config.geometry
	}

	pub fn set_wait_limit(&mut self, wait_limit: WaitLimit) {
		self.config.wait_limit = wait_limit;
	}

	/// device id decoded from the most recent status read
	pub fn device_id(&self) -> Option<u8> {
		self.device_id
	}

	/// session left open with `leave_open`, if any
	pub fn session(&self) -> Option<Session> {
		self.session
	}

	pub fn transport(&self) -> &T {
		&self.transport
	}

	/// Raw bus access bypasses the session bookkeeping.
	pub fn transport_mut(&mut self) -> &mut T {
		&mut self.transport
	}

	pub fn into_inner(self) -> T {
		self.transport
	}

	/// Assert CHIP SELECT.
	pub fn activate(&mut self) -> crate::AResult<()> {
		self.transport.select_device(true)
	}

	/// Release CHIP SELECT; also terminates an open session. Doing this twice
	/// in a row is the documented decoder reset.
	///
	/// Terminating a page program session starts programming the page, and
	/// waits until it's done.
	pub fn deactivate(&mut self) -> crate::AResult<()> {
		let session = self.session.take();
		if let Some(session) = session {
			debug!("closing {}", session);
		}
		self.transport.select_device(false)?;
		if let Some(Session::PageProgram(_)) = session {
			self.wait_until_ready()?;
		}
		Ok(())
	}

	/// Exchange one raw byte within a session left open by `leave_open`; the
	/// chip interprets it as data of that session's command.
	pub fn transfer(&mut self, output: u8) -> crate::AResult<u8> {
		if self.session.is_none() {
			return Err(DataFlashError::NoSession.into());
		}
		self.transport.exchange_byte(output)
	}

	pub fn read_status(&mut self) -> crate::AResult<Status> {
		self.ensure_idle()?;
		self.query_status()
	}

	/// single status query
	pub fn poll_ready(&mut self) -> crate::AResult<Readiness> {
		Ok(Readiness::from_status(self.read_status()?))
	}

	/// Query the status until the chip is ready or `limit` is exhausted;
	/// issues at least one query.
	pub fn wait_ready(&mut self, limit: WaitLimit) -> crate::AResult<WaitOutcome> {
		self.ensure_idle()?;
		self.poll_until_ready(limit)
	}

	/// Load a main memory page into a buffer.
	pub fn page_to_buffer(&mut self, page: u16, buffer: Buffer) -> crate::AResult<()> {
		self.page_command(buffer.transfer_opcode(), page)?;
		Ok(())
	}

	/// Program a page from a buffer, erasing the page first.
	pub fn buffer_to_page(&mut self, buffer: Buffer, page: u16) -> crate::AResult<()> {
		self.page_command(buffer.program_with_erase_opcode(), page)?;
		Ok(())
	}

	/// Program a page from a buffer without erasing; bits only go 1 -> 0.
	pub fn buffer_to_page_without_erase(&mut self, buffer: Buffer, page: u16) -> crate::AResult<()> {
		self.page_command(buffer.program_without_erase_opcode(), page)?;
		Ok(())
	}

	/// Rewrite a page with its own content through a buffer (refresh after
	/// many program cycles in the same sector).
	pub fn auto_rewrite(&mut self, page: u16, buffer: Buffer) -> crate::AResult<()> {
		self.page_command(buffer.auto_rewrite_opcode(), page)?;
		Ok(())
	}

	/// Set all bytes in the page to 0xff.
	pub fn erase_page(&mut self, page: u16) -> crate::AResult<()> {
		self.page_command(PAGE_ERASE, page)?;
		Ok(())
	}

	/// Returns `true` if page and buffer differ.
	pub fn compare_page_to_buffer(&mut self, buffer: Buffer, page: u16) -> crate::AResult<bool> {
		let status = self.page_command(buffer.compare_opcode(), page)?;
		Ok(status.is_mismatch())
	}

	pub fn buffer_reader<'a>(&'a mut self, buffer: Buffer, offset: u16) -> crate::AResult<BufferReader<'a, T>> {
		self.ensure_idle()?;
		self.check_offset(offset)?;
		self.transport.start_command(buffer.read_opcode(), &buffer_address(offset))?;
		self.transport.send_dont_care(BUFFER_READ_DONT_CARE)?;
		Ok(BufferReader::new(self, buffer, offset))
	}

	pub fn read_byte(&mut self, buffer: Buffer, offset: u16) -> crate::AResult<u8> {
		self.check_range(offset, 1)?;
		self.buffer_reader(buffer, offset)?.read_byte()
	}

	/// Fill `target` from the buffer starting at `offset`; an empty target
	/// only sends the command.
	pub fn read_stream(&mut self, buffer: Buffer, offset: u16, target: &mut [u8]) -> crate::AResult<()> {
		self.check_range(offset, target.len())?;
		self.buffer_reader(buffer, offset)?.read(target)
	}

	/// Start writing to a buffer at `offset`; the buffer's internal address
	/// increments with every byte written through the returned writer.
	pub fn enable_buffer_write<'a>(&'a mut self, buffer: Buffer, offset: u16) -> crate::AResult<BufferWriter<'a, T>> {
		self.ensure_idle()?;
		self.check_offset(offset)?;
		self.transport.start_command(buffer.write_opcode(), &buffer_address(offset))?;
		Ok(BufferWriter::new(self, buffer, offset))
	}

	pub fn write_byte(&mut self, buffer: Buffer, offset: u16, data: u8) -> crate::AResult<()> {
		self.write_stream(buffer, offset, &[data])
	}

	pub fn write_stream(&mut self, buffer: Buffer, offset: u16, data: &[u8]) -> crate::AResult<()> {
		self.check_range(offset, data.len())?;
		let mut writer = self.enable_buffer_write(buffer, offset)?;
		writer.write(data)?;
		writer.finish()
	}

	/// Read the main memory sequentially, starting at `offset` in `page`,
	/// without going through the buffers. Crosses page boundaries and wraps
	/// around at the end of the array.
	pub fn continuous_read<'a>(&'a mut self, page: u16, offset: u16) -> crate::AResult<ArrayReader<'a, T>> {
		self.array_read(CONTINUOUS_ARRAY_READ, page, offset)?;
		Ok(ArrayReader::new(self, Session::ArrayRead))
	}

	/// Read a single main memory page directly; wraps around within the page.
	pub fn read_page<'a>(&'a mut self, page: u16, offset: u16) -> crate::AResult<ArrayReader<'a, T>> {
		self.array_read(MAIN_MEMORY_PAGE_READ, page, offset)?;
		Ok(ArrayReader::new(self, Session::PageRead))
	}

	/// Write data into a buffer and program it into `page` (with built-in
	/// erase) once the returned programmer finishes.
	pub fn program_through_buffer<'a>(&'a mut self, buffer: Buffer, page: u16, offset: u16) -> crate::AResult<PageProgrammer<'a, T>> {
		self.ensure_idle()?;
		self.check_page(page)?;
		self.check_offset(offset)?;
		let address = self.config.geometry.encode_array_address(page, offset);
		self.transport.start_command(buffer.page_program_opcode(), &address)?;
		Ok(PageProgrammer::new(self, buffer, offset))
	}

	fn array_read(&mut self, opcode: u8, page: u16, offset: u16) -> crate::AResult<()> {
		self.ensure_idle()?;
		self.check_page(page)?;
		self.check_offset(offset)?;
		let address = self.config.geometry.encode_array_address(page, offset);
		self.transport.start_command(opcode, &address)?;
		// initialize the address pointers on the chip
		self.transport.send_dont_care(ARRAY_READ_DONT_CARE)
	}

	// send a page addressed command, start it and wait until done
	fn page_command(&mut self, opcode: u8, page: u16) -> crate::AResult<Status> {
		self.ensure_idle()?;
		self.check_page(page)?;
		let address = self.config.geometry.encode_page(page);
		self.transport.start_command(opcode, &address)?;
		self.transport.send_dont_care(PAGE_ADDRESS_DONT_CARE)?;
		self.transport.execute()?;
		self.wait_until_ready()
	}

	fn query_status(&mut self) -> crate::AResult<Status> {
		self.transport.start_command(STATUS_REGISTER_READ, &[])?;
		let status = Status(self.transport.receive_byte()?);
		self.transport.execute()?;
		self.device_id = Some(status.device_id());
		Ok(status)
	}

	fn poll_until_ready(&mut self, limit: WaitLimit) -> crate::AResult<WaitOutcome> {
		let mut budget = limit.start();
		loop {
			let status = self.query_status()?;
			let may_continue = budget.record();
			if status.is_ready() {
				return Ok(WaitOutcome::Ready {
					status,
					polls: budget.polls(),
				});
			}
			if !may_continue {
				return Ok(WaitOutcome::TimedOut {
					status,
					polls: budget.polls(),
				});
			}
		}
	}

	pub(crate) fn wait_until_ready(&mut self) -> crate::AResult<Status> {
		match self.poll_until_ready(self.config.wait_limit)? {
			WaitOutcome::Ready { status, polls } => {
				debug!("ready after {} status polls: {:?}", polls, status);
				Ok(status)
			},
			WaitOutcome::TimedOut { status, polls } => {
				warn!("DataFlash still busy after {} status polls: {:?}", polls, status);
				Err(DataFlashError::Unresponsive { polls, status }.into())
			},
		}
	}

	pub(crate) fn close_session(&mut self) -> crate::AResult<()> {
		self.session = None;
		self.transport.select_device(false)
	}

	fn ensure_idle(&self) -> crate::AResult<()> {
		match self.session {
			Some(session) => Err(DataFlashError::SessionOpen(session).into()),
			None => Ok(()),
		}
	}

	fn check_page(&self, page: u16) -> crate::AResult<()> {
		let geometry = self.config.geometry;
		if !geometry.contains_page(page) {
			return Err(DataFlashError::PageOutOfRange {
				page,
				page_count: geometry.page_count,
			}.into());
		}
		Ok(())
	}

	// a command can't start beyond the last byte of the buffer
	fn check_offset(&self, offset: u16) -> crate::AResult<()> {
		let geometry = self.config.geometry;
		if offset >= geometry.page_size {
			return Err(DataFlashError::OffsetOutOfRange {
				offset,
				len: 0,
				page_size: geometry.page_size,
			}.into());
		}
		Ok(())
	}

	pub(crate) fn check_range(&self, offset: u16, len: usize) -> crate::AResult<()> {
		let geometry = self.config.geometry;
		if !geometry.contains_range(offset, len) {
			return Err(DataFlashError::OffsetOutOfRange {
				offset,
				len,
				page_size: geometry.page_size,
			}.into());
		}
		Ok(())
	}
}

// buffer commands: one don't care byte, then the 16-bit offset
fn buffer_address(offset: u16) -> [u8; 3] {
	[0x00, (offset >> 8) as u8, offset as u8]
}
