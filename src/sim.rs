/* In-memory AT45D DataFlash, speaking the wire protocol */

use crate::dataflash::{
	Buffer,
	Geometry,
	Status,
	opcodes::*,
};
use crate::spi::{
	ClockMode,
	Transport,
};

// what the host reads while the chip doesn't drive its output
const FLOATING: u8 = 0xff;
const ERASED: u8 = 0xff;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Kind {
	Status,
	BufferRead(Buffer),
	BufferWrite(Buffer),
	PageProgram(Buffer),
	ArrayRead,
	PageRead,
	// executes on the rising CHIP SELECT edge
	PageOperation,
	Unknown,
}

fn classify(opcode: u8) -> Kind {
	match opcode {
		STATUS_REGISTER_READ => Kind::Status,
		BUFFER_1_READ => Kind::BufferRead(Buffer::One),
		BUFFER_2_READ => Kind::BufferRead(Buffer::Two),
		BUFFER_1_WRITE => Kind::BufferWrite(Buffer::One),
		BUFFER_2_WRITE => Kind::BufferWrite(Buffer::Two),
		PAGE_PROGRAM_THROUGH_BUFFER_1 => Kind::PageProgram(Buffer::One),
		PAGE_PROGRAM_THROUGH_BUFFER_2 => Kind::PageProgram(Buffer::Two),
		CONTINUOUS_ARRAY_READ => Kind::ArrayRead,
		MAIN_MEMORY_PAGE_READ => Kind::PageRead,
		PAGE_TO_BUFFER_1_TRANSFER | PAGE_TO_BUFFER_2_TRANSFER
		| AUTO_PAGE_REWRITE_BUFFER_1 | AUTO_PAGE_REWRITE_BUFFER_2
		| PAGE_TO_BUFFER_1_COMPARE | PAGE_TO_BUFFER_2_COMPARE
		| PAGE_ERASE
		| BUFFER_1_TO_PAGE_WITH_ERASE | BUFFER_2_TO_PAGE_WITH_ERASE
		| BUFFER_1_TO_PAGE_WITHOUT_ERASE | BUFFER_2_TO_PAGE_WITHOUT_ERASE
			=> Kind::PageOperation,
		_ => Kind::Unknown,
	}
}

impl Kind {
	// bytes between opcode and data phase
	fn header_len(&self) -> usize {
		match self {
			Kind::Status => 0,
			Kind::BufferRead(_) => 3 + BUFFER_READ_DONT_CARE,
			Kind::BufferWrite(_) | Kind::PageProgram(_) | Kind::PageOperation => 3,
			Kind::ArrayRead | Kind::PageRead => 3 + ARRAY_READ_DONT_CARE,
			Kind::Unknown => usize::max_value(),
		}
	}
}

// buffer a program/erase/transfer/compare opcode works with
fn operation_buffer(opcode: u8) -> Option<Buffer> {
	match opcode {
		PAGE_PROGRAM_THROUGH_BUFFER_1 | PAGE_TO_BUFFER_1_TRANSFER
		| AUTO_PAGE_REWRITE_BUFFER_1 | PAGE_TO_BUFFER_1_COMPARE
		| BUFFER_1_TO_PAGE_WITH_ERASE | BUFFER_1_TO_PAGE_WITHOUT_ERASE
			=> Some(Buffer::One),
		PAGE_PROGRAM_THROUGH_BUFFER_2 | PAGE_TO_BUFFER_2_TRANSFER
		| AUTO_PAGE_REWRITE_BUFFER_2 | PAGE_TO_BUFFER_2_COMPARE
		| BUFFER_2_TO_PAGE_WITH_ERASE | BUFFER_2_TO_PAGE_WITHOUT_ERASE
			=> Some(Buffer::Two),
		_ => None,
	}
}

fn buffer_index(buffer: Buffer) -> usize {
	match buffer {
		Buffer::One => 0,
		Buffer::Two => 1,
	}
}

/// Counters of what the host did on the bus.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct BusStatistics {
	/// falling CHIP SELECT edges
	pub selects: usize,
	pub exchanges: usize,
	/// status register read commands
	pub status_queries: usize,
	/// commands started by a rising CHIP SELECT edge
	pub executed: usize,
	/// commands dropped because the chip was busy or didn't know them
	pub ignored: usize,
}

/// A simulated DataFlash chip implementing `Transport`.
///
/// Content changes take effect immediately when a command executes; the
/// chip then reports BUSY for the configured number of status reads. While
/// busy it only answers status reads and accesses to the buffer the running
/// operation doesn't use (both buffers during a page erase); everything else
/// is ignored.
pub struct SimulatedChip {
	geometry: Geometry,
	device_id: u8,
	memory: Vec<u8>,
	buffers: [Vec<u8>; 2],
	clock: Option<ClockMode>,
	selected: bool,
	// opcode and header bytes of the current command
	frame: Vec<u8>,
	data_index: usize,
	ignoring: bool,
	busy_polls: u32,
	busy_remaining: u32,
	busy_buffer: Option<Buffer>,
	stuck: bool,
	mismatch: bool,
	stats: BusStatistics,
}

impl SimulatedChip {
	/// erased chip with empty (0xff) buffers, never busy
	pub fn new(geometry: Geometry) -> Self {
		let page_size = geometry.page_size as usize;
		SimulatedChip {
			geometry,
			device_id: geometry.device_id,
			memory: vec![ERASED; geometry.capacity()],
			buffers: [vec![ERASED; page_size], vec![ERASED; page_size]],
			clock: None,
			selected: false,
			frame: Vec::new(),
			data_index: 0,
			ignoring: false,
			busy_polls: 0,
			busy_remaining: 0,
			busy_buffer: None,
			stuck: false,
			mismatch: false,
			stats: BusStatistics::default(),
		}
	}

	/// report BUSY for `polls` status reads after each executed command
	pub fn set_busy_polls(&mut self, polls: u32) {
		self.busy_polls = polls;
	}

	/// a stuck chip never becomes ready again
	pub fn set_stuck(&mut self, stuck: bool) {
		self.stuck = stuck;
	}

	/// density code reported in the status register
	pub fn set_device_id(&mut self, device_id: u8) {
		self.device_id = device_id;
	}

	pub fn geometry(&self) -> Geometry {
		self.geometry
	}

	pub fn clock(&self) -> Option<ClockMode> {
		self.clock
	}

	pub fn is_selected(&self) -> bool {
		self.selected
	}

	pub fn is_busy(&self) -> bool {
		self.stuck || self.busy_remaining > 0
	}

	pub fn statistics(&self) -> BusStatistics {
		self.stats
	}

	pub fn reset_statistics(&mut self) {
		self.stats = BusStatistics::default();
	}

	pub fn status(&self) -> Status {
		Status::new(!self.is_busy(), self.mismatch, self.device_id)
	}

	pub fn memory(&self) -> &[u8] {
		&self.memory
	}

	pub fn page(&self, page: u16) -> &[u8] {
		let range = self.page_range(page);
		&self.memory[range]
	}

	pub fn buffer(&self, buffer: Buffer) -> &[u8] {
		&self.buffers[buffer_index(buffer)]
	}

	/// preload a page, bypassing the protocol; shorter data is padded with
	/// the erased value
	pub fn load_page(&mut self, page: u16, data: &[u8]) {
		let range = self.page_range(page);
		let target = &mut self.memory[range];
		assert!(data.len() <= target.len(), "page data too long");
		for (i, t) in target.iter_mut().enumerate() {
			*t = data.get(i).cloned().unwrap_or(ERASED);
		}
	}

	fn page_range(&self, page: u16) -> std::ops::Range<usize> {
		assert!(self.geometry.contains_page(page), "page {} out of range", page);
		let size = self.geometry.page_size as usize;
		let start = page as usize * size;
		start..start + size
	}

	fn kind(&self) -> Option<Kind> {
		self.frame.first().map(|opcode| classify(*opcode))
	}

	fn address(&self) -> (u16, u16) {
		self.geometry.decode_address([self.frame[1], self.frame[2], self.frame[3]])
	}

	fn available_while_busy(&self, kind: Kind) -> bool {
		match kind {
			Kind::Status => true,
			Kind::BufferRead(buffer) | Kind::BufferWrite(buffer) => self.busy_buffer != Some(buffer),
			_ => false,
		}
	}

	fn header_complete(&self, kind: Kind) -> bool {
		self.frame.len() > kind.header_len()
	}

	fn status_output(&mut self) -> u8 {
		let status = self.status();
		if self.busy_remaining > 0 {
			self.busy_remaining -= 1;
		}
		status.0
	}

	// data phase byte `index`: output of the chip for this exchange, and
	// what it does with the input
	fn data_phase(&mut self, kind: Kind, input: u8) -> u8 {
		let index = self.data_index;
		self.data_index += 1;
		let page_size = self.geometry.page_size as usize;
		match kind {
			Kind::Status => self.status_output(),
			Kind::BufferRead(buffer) => {
				let (_, offset) = self.address();
				self.buffers[buffer_index(buffer)][(offset as usize + index) % page_size]
			},
			Kind::BufferWrite(buffer) | Kind::PageProgram(buffer) => {
				let (_, offset) = self.address();
				self.buffers[buffer_index(buffer)][(offset as usize + index) % page_size] = input;
				FLOATING
			},
			Kind::ArrayRead => {
				let (page, offset) = self.address();
				let start = page as usize * page_size + offset as usize;
				self.memory[(start + index) % self.memory.len()]
			},
			Kind::PageRead => {
				let (page, offset) = self.address();
				let range = self.page_range(page);
				self.memory[range.start + (offset as usize + index) % page_size]
			},
			// nothing left to send after the address
			Kind::PageOperation | Kind::Unknown => FLOATING,
		}
	}

	fn execute(&mut self) {
		let kind = match self.kind() {
			Some(kind) => kind,
			None => return,
		};
		match kind {
			Kind::PageProgram(_) | Kind::PageOperation => (),
			// reads and status don't execute anything
			_ => return,
		}
		if self.ignoring || !self.header_complete(kind) {
			return;
		}
		let opcode = self.frame[0];
		let (page, _) = self.address();
		let range = self.page_range(page);
		match (kind, opcode) {
			(Kind::PageProgram(buffer), _) => {
				self.memory[range].copy_from_slice(&self.buffers[buffer_index(buffer)]);
			},
			(Kind::PageOperation, PAGE_TO_BUFFER_1_TRANSFER) | (Kind::PageOperation, AUTO_PAGE_REWRITE_BUFFER_1) => {
				self.buffers[0].copy_from_slice(&self.memory[range]);
			},
			(Kind::PageOperation, PAGE_TO_BUFFER_2_TRANSFER) | (Kind::PageOperation, AUTO_PAGE_REWRITE_BUFFER_2) => {
				self.buffers[1].copy_from_slice(&self.memory[range]);
			},
			(Kind::PageOperation, PAGE_TO_BUFFER_1_COMPARE) => {
				self.mismatch = self.memory[range] != self.buffers[0][..];
			},
			(Kind::PageOperation, PAGE_TO_BUFFER_2_COMPARE) => {
				self.mismatch = self.memory[range] != self.buffers[1][..];
			},
			(Kind::PageOperation, PAGE_ERASE) => {
				for b in &mut self.memory[range] {
					*b = ERASED;
				}
			},
			(Kind::PageOperation, BUFFER_1_TO_PAGE_WITH_ERASE) => {
				self.memory[range].copy_from_slice(&self.buffers[0]);
			},
			(Kind::PageOperation, BUFFER_2_TO_PAGE_WITH_ERASE) => {
				self.memory[range].copy_from_slice(&self.buffers[1]);
			},
			(Kind::PageOperation, BUFFER_1_TO_PAGE_WITHOUT_ERASE) => {
				for (m, b) in self.memory[range].iter_mut().zip(self.buffers[0].iter()) {
					*m &= *b;
				}
			},
			(Kind::PageOperation, BUFFER_2_TO_PAGE_WITHOUT_ERASE) => {
				for (m, b) in self.memory[range].iter_mut().zip(self.buffers[1].iter()) {
					*m &= *b;
				}
			},
			_ => return,
		}
		trace!("simulated DataFlash executed 0x{:02x} on page {}", opcode, page);
		self.stats.executed += 1;
		self.busy_remaining = self.busy_polls;
		self.busy_buffer = operation_buffer(opcode);
	}
}

impl Transport for SimulatedChip {
	fn configure(&mut self, mode: ClockMode) -> crate::AResult<()> {
		ensure!(mode.is_dataflash_compatible(), "simulated DataFlash doesn't support SPI {}", mode);
		self.clock = Some(mode);
		Ok(())
	}

	fn select_device(&mut self, active: bool) -> crate::AResult<()> {
		match (self.selected, active) {
			(false, true) => {
				// falling edge resets the command decoder
				self.stats.selects += 1;
				self.frame.clear();
				self.data_index = 0;
				self.ignoring = false;
			},
			(true, false) => {
				self.execute();
				self.frame.clear();
			},
			_ => (),
		}
		self.selected = active;
		Ok(())
	}

	fn exchange_byte(&mut self, output: u8) -> crate::AResult<u8> {
		self.stats.exchanges += 1;
		ensure!(self.clock.is_some(), "simulated DataFlash: bus not configured");
		if !self.selected {
			return Ok(FLOATING);
		}

		let kind = match self.kind() {
			None => {
				let kind = classify(output);
				if kind == Kind::Status {
					self.stats.status_queries += 1;
				} else if kind == Kind::Unknown || (self.is_busy() && !self.available_while_busy(kind)) {
					debug!("simulated DataFlash ignoring opcode 0x{:02x}", output);
					self.stats.ignored += 1;
					self.ignoring = true;
				}
				self.frame.push(output);
				return Ok(FLOATING);
			},
			Some(kind) => kind,
		};

		if self.ignoring {
			return Ok(FLOATING);
		}
		if !self.header_complete(kind) {
			self.frame.push(output);
			return Ok(FLOATING);
		}
		Ok(self.data_phase(kind, output))
	}
}
