#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

macro_rules! with_context {
	(( $fmt:tt $($t:tt)* ), $e:expr) => {{
		use failure::Error;

		match (|| { $e })() {
			Ok(v) => Ok(v),
			Err(e) => {
				let e: Error = e;
				let msg = format!(concat!($fmt, ": {}") $($t)*, e);
				Err(Error::from(e.context(msg)))
			}
		}
	}};

	($msg:expr, $e:expr) => {
		with_context!(("{}", $msg), $e)
	};
}

pub type AResult<T> = Result<T, failure::Error>;

pub mod dataflash;
pub mod lcd;
pub mod linux;
pub mod rtc;
pub mod sim;
pub mod spi;
pub mod temp;

pub use self::dataflash::{
	Buffer,
	Config,
	DataFlash,
	DataFlashError,
	Geometry,
	Status,
	WaitLimit,
};

/// Open the DataFlash behind a Linux spidev device, with chip select on a
/// sysfs GPIO line.
pub fn open_spidev(path: &str, cs_gpio: u32, config: Config) -> AResult<DataFlash<linux::Spidev>> {
	with_context!(("DataFlash on {} (chip select GPIO {})", path, cs_gpio), {
		let spidev = linux::Spidev::open(path, cs_gpio)?;
		DataFlash::open(spidev, config)
	})
}

/// Open a simulated (erased) DataFlash.
pub fn open_simulated(config: Config) -> AResult<DataFlash<sim::SimulatedChip>> {
	DataFlash::open(sim::SimulatedChip::new(config.geometry), config)
}
