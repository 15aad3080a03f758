use std::fs;
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;

const GPIO_ROOT: &str = "/sys/class/gpio";

/// Output GPIO line through the sysfs interface.
pub struct GpioLine {
	value: fs::File,
	number: u32,
	level: bool,
}

impl GpioLine {
	/// Export the line if necessary and make it an output driving `initial`.
	pub fn open_output(number: u32, initial: bool) -> io::Result<Self> {
		let dir = format!("{}/gpio{}", GPIO_ROOT, number);
		if !Path::new(&dir).exists() {
			fs::write(format!("{}/export", GPIO_ROOT), number.to_string())?;
		}
		// "high"/"low" set direction and level without glitching
		let direction = if initial { "high" } else { "low" };
		fs::write(format!("{}/direction", dir), direction)?;

		let value = fs::OpenOptions::new()
			.read(true)
			.write(true)
			.open(format!("{}/value", dir))?;

		Ok(GpioLine {
			value,
			number,
			level: initial,
		})
	}

	pub fn number(&self) -> u32 {
		self.number
	}

	/// last level written
	pub fn level(&self) -> bool {
		self.level
	}

	pub fn set(&mut self, level: bool) -> io::Result<()> {
		if level == self.level {
			return Ok(());
		}
		let data: &[u8] = if level { b"1" } else { b"0" };
		let l = self.value.write_at(data, 0)?;
		if l != data.len() {
			return Err(io::Error::new(io::ErrorKind::Other, "failed to write GPIO value"));
		}
		self.level = level;
		Ok(())
	}
}
