use super::Transport;

// value clocked out while only receiving
const DONT_CARE: u8 = 0x00;

pub trait LowLevel: Transport {
	// toggle CS: a falling edge puts the command decoder back into its idle
	// state, whatever it was doing before
	fn reset_decoder(&mut self) -> crate::AResult<()> {
		self.select_device(false)?;
		self.select_device(true)
	}

	// start a new command: reset decoder, then opcode and address bytes
	fn start_command(&mut self, opcode: u8, address: &[u8]) -> crate::AResult<()> {
		self.reset_decoder()?;
		trace!("command 0x{:02x} address {:02x?}", opcode, address);
		self.send_byte(opcode)?;
		self.send_all(address)
	}

	// rising CS edge: starts execution of program/erase/transfer commands
	fn execute(&mut self) -> crate::AResult<()> {
		self.select_device(false)
	}

	// the byte shifted in while sending is meaningless here
	fn send_byte(&mut self, data: u8) -> crate::AResult<()> {
		self.exchange_byte(data)?;
		Ok(())
	}

	fn send_all(&mut self, data: &[u8]) -> crate::AResult<()> {
		for b in data {
			self.send_byte(*b)?;
		}
		Ok(())
	}

	fn send_dont_care(&mut self, count: usize) -> crate::AResult<()> {
		for _ in 0..count {
			self.send_byte(DONT_CARE)?;
		}
		Ok(())
	}

	fn receive_byte(&mut self) -> crate::AResult<u8> {
		self.exchange_byte(DONT_CARE)
	}

	fn receive(&mut self, target: &mut [u8]) -> crate::AResult<()> {
		for t in target.iter_mut() {
			*t = self.receive_byte()?;
		}
		Ok(())
	}
}

impl<T: Transport + ?Sized> LowLevel for T {
}
