//! Real time clock driven by a 32768 Hz watch crystal on timer 2, which
//! overflows once per second. Each overflow calls `Clock::tick`.
//!
//! No formatting (12/24 hours, strings); that's up to the user interface.
//! The tick callback runs in the context of the timer interrupt and should
//! return quickly. Alternatively poll `time_changed`, which counts ticks
//! until the user resets it.

pub type TickCallback = Box<dyn FnMut() + Send>;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct DateTime {
	pub year: u16,
	pub month: u8,
	pub day: u8,
	pub hour: u8,
	pub minute: u8,
	pub second: u8,
}

impl Default for DateTime {
	fn default() -> Self {
		DateTime {
			year: 2000,
			month: 1,
			day: 1,
			hour: 0,
			minute: 0,
			second: 0,
		}
	}
}

fn is_leap_year(year: u16) -> bool {
	(year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: u16, month: u8) -> u8 {
	match month {
		2 => if is_leap_year(year) { 29 } else { 28 },
		4 | 6 | 9 | 11 => 30,
		_ => 31,
	}
}

impl DateTime {
	/// advance by one second; fields out of range roll over like their
	/// maximum does
	pub fn advance(&mut self) {
		if self.second < 59 { self.second += 1; return; }
		self.second = 0;

		if self.minute < 59 { self.minute += 1; return; }
		self.minute = 0;

		if self.hour < 23 { self.hour += 1; return; }
		self.hour = 0;

		if self.day < days_in_month(self.year, self.month) { self.day += 1; return; }
		self.day = 1;

		if self.month < 12 { self.month += 1; return; }
		self.month = 1;

		self.year = self.year.wrapping_add(1);
	}
}

pub struct Clock {
	now: DateTime,
	time_changed: u8,
	callback: Option<TickCallback>,
}

impl Clock {
	pub fn new(callback: Option<TickCallback>) -> Self {
		Clock::starting_at(DateTime::default(), callback)
	}

	pub fn starting_at(now: DateTime, callback: Option<TickCallback>) -> Self {
		Clock {
			now,
			time_changed: 0,
			callback,
		}
	}

	pub fn now(&self) -> DateTime {
		self.now
	}

	pub fn set(&mut self, now: DateTime) {
		self.now = now;
	}

	/// ticks since the counter was last reset
	pub fn time_changed(&self) -> u8 {
		self.time_changed
	}

	/// read and reset the tick counter
	pub fn take_time_changed(&mut self) -> u8 {
		let changed = self.time_changed;
		self.time_changed = 0;
		changed
	}

	/// one timer overflow
	pub fn tick(&mut self) {
		self.now.advance();
		self.time_changed = self.time_changed.wrapping_add(1);
		if let Some(callback) = self.callback.as_mut() {
			callback();
		}
	}
}
