#![allow(dead_code)]

use std::collections::VecDeque;

use butterfly_dataflash::spi::{
	ClockMode,
	Transport,
};
use butterfly_dataflash::AResult;

pub const READY: u8 = 0x9c;
pub const BUSY: u8 = 0x1c;
pub const READY_MISMATCH: u8 = 0xdc;

pub fn init_logging() {
	let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Event {
	Select(bool),
	/// byte sent by the host
	Exchange(u8),
}

/// Records everything the driver does on the bus and answers exchanges
/// from a script; once the script runs out every exchange returns
/// `idle_response`.
pub struct ScriptedBus {
	pub events: Vec<Event>,
	pub responses: VecDeque<u8>,
	pub idle_response: u8,
	pub clock: Option<ClockMode>,
}

impl ScriptedBus {
	pub fn new() -> Self {
		ScriptedBus {
			events: Vec::new(),
			responses: VecDeque::new(),
			idle_response: READY,
			clock: None,
		}
	}

	pub fn respond(&mut self, data: &[u8]) {
		self.responses.extend(data.iter().cloned());
	}

	pub fn clear(&mut self) {
		self.events.clear();
	}

	pub fn is_selected(&self) -> bool {
		self.events.iter().rev().filter_map(|e| match e {
			Event::Select(active) => Some(*active),
			_ => None,
		}).next().unwrap_or(false)
	}

	/// bytes sent while CHIP SELECT was asserted, one entry per assertion
	/// (empty assertions left out)
	pub fn frames(&self) -> Vec<Vec<u8>> {
		let mut frames = Vec::new();
		let mut current: Option<Vec<u8>> = None;
		for e in &self.events {
			match *e {
				Event::Select(true) => {
					if let Some(frame) = current.take() {
						frames.push(frame);
					}
					current = Some(Vec::new());
				},
				Event::Select(false) => {
					if let Some(frame) = current.take() {
						frames.push(frame);
					}
				},
				Event::Exchange(b) => {
					if let Some(frame) = current.as_mut() {
						frame.push(b);
					}
				},
			}
		}
		if let Some(frame) = current {
			frames.push(frame);
		}
		frames.into_iter().filter(|f| !f.is_empty()).collect()
	}

	pub fn status_queries(&self) -> usize {
		self.frames().iter().filter(|f| f[0] == 0x57).count()
	}
}

impl Transport for ScriptedBus {
	fn configure(&mut self, mode: ClockMode) -> AResult<()> {
		self.clock = Some(mode);
		Ok(())
	}

	fn select_device(&mut self, active: bool) -> AResult<()> {
		self.events.push(Event::Select(active));
		Ok(())
	}

	fn exchange_byte(&mut self, output: u8) -> AResult<u8> {
		self.events.push(Event::Exchange(output));
		Ok(self.responses.pop_front().unwrap_or(self.idle_response))
	}
}
