//! Temperature from the NTC thermistor on ADC channel 0.
//!
//! The conversion uses descending lookup tables of ADC readings, one entry
//! per degree: positive Celsius from 0 up, negative Celsius from 0 down and
//! Fahrenheit from 0 up. The tables depend on the board and are supplied by
//! the caller.

/// Where raw ADC readings come from.
pub trait SampleSource {
	/// One conversion of the thermistor channel (10 bits on the Butterfly).
	fn read_sample(&mut self) -> crate::AResult<u16>;
}

impl<'a, S: ?Sized + SampleSource> SampleSource for &'a mut S {
	fn read_sample(&mut self) -> crate::AResult<u16> {
		S::read_sample(*self)
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Units {
	Celsius,
	Fahrenheit,
	/// ADC reading, unconverted
	Raw,
}

/// Descending ADC readings, indexed by degree.
#[derive(Clone, Copy, Debug)]
pub struct Tables {
	pub celsius_positive: &'static [u16],
	pub celsius_negative: &'static [u16],
	pub fahrenheit_positive: &'static [u16],
}

// readings above are below 0 °C, readings below are above; in between is 0
const NEGATIVE_ABOVE: u16 = 810;
const POSITIVE_BELOW: u16 = 800;

// degrees covered by each table search
const CELSIUS_NEGATIVE_ENTRIES: usize = 26;
const CELSIUS_POSITIVE_ENTRIES: usize = 100;
const FAHRENHEIT_ENTRIES: usize = 142;

const OVERSAMPLE: u32 = 8;

/// Degrees Celsius for an ADC reading; 0 if no table entry matches.
pub fn celsius(tables: &Tables, a2d: u16) -> i16 {
	if a2d > NEGATIVE_ABOVE {
		tables.celsius_negative.iter()
			.take(CELSIUS_NEGATIVE_ENTRIES)
			.position(|&t| a2d <= t)
			.map_or(0, |i| -(i as i16))
	} else if a2d < POSITIVE_BELOW {
		tables.celsius_positive.iter()
			.take(CELSIUS_POSITIVE_ENTRIES)
			.position(|&t| a2d >= t)
			.map_or(0, |i| i as i16)
	} else {
		0
	}
}

/// Degrees Fahrenheit for an ADC reading; readings beyond the table end up
/// at the last searched degree plus one.
pub fn fahrenheit(tables: &Tables, a2d: u16) -> i16 {
	let table = tables.fahrenheit_positive;
	let searched = table.len().min(FAHRENHEIT_ENTRIES);
	table[..searched].iter()
		.position(|&t| a2d > t)
		.unwrap_or(searched) as i16
}

pub struct TempSensor<S> {
	source: S,
	tables: Tables,
	units: Units,
	oversample: bool,
}

impl<S: SampleSource> TempSensor<S> {
	/// single sample per reading; see `set_oversample`
	pub fn new(source: S, tables: Tables, units: Units) -> Self {
		TempSensor {
			source,
			tables,
			units,
			oversample: false,
		}
	}

	pub fn units(&self) -> Units {
		self.units
	}

	pub fn set_units(&mut self, units: Units) {
		self.units = units;
	}

	pub fn oversample(&self) -> bool {
		self.oversample
	}

	/// Average 8 samples per reading.
	pub fn set_oversample(&mut self, oversample: bool) {
		self.oversample = oversample;
	}

	pub fn into_inner(self) -> S {
		self.source
	}

	/// ADC reading, averaged if oversampling is enabled
	pub fn read_raw(&mut self) -> crate::AResult<u16> {
		if !self.oversample {
			return self.source.read_sample();
		}
		let mut sum = 0u32;
		for _ in 0..OVERSAMPLE {
			sum += u32::from(self.source.read_sample()?);
		}
		trace!("thermistor samples sum up to {}", sum);
		Ok((sum / OVERSAMPLE) as u16)
	}

	/// Temperature in the configured units.
	pub fn temperature(&mut self) -> crate::AResult<i16> {
		let units = self.units;
		self.temperature_in(units)
	}

	pub fn temperature_in(&mut self, units: Units) -> crate::AResult<i16> {
		let a2d = self.read_raw()?;
		let value = match units {
			Units::Celsius => celsius(&self.tables, a2d),
			Units::Fahrenheit => fahrenheit(&self.tables, a2d),
			Units::Raw => a2d as i16,
		};
		debug!("thermistor reading {} is {} ({:?})", a2d, value, units);
		Ok(value)
	}
}
