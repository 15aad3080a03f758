#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate butterfly_dataflash;
use butterfly_dataflash::*;

use failure::ResultExt;
use std::fs;
use std::io::{
	self,
	Read,
	Write,
};
use std::process::exit;

use butterfly_dataflash::spi::{
	ClockMode,
	Transport,
};

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid paramater {}: {}", name, e);
		e.context(msg).into()
	})
}

fn get_optional_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<Option<T>>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	if matches.is_present(name) {
		Ok(Some(get_param(matches, name)?))
	} else {
		Ok(None)
	}
}

fn get_buffer(matches: &clap::ArgMatches) -> AResult<Buffer> {
	Ok(Buffer::from_number(get_optional_param(matches, "buffer")?.unwrap_or(1)))
}

fn hexdump(start: usize, data: &[u8]) {
	for (i, b) in data.iter().enumerate() {
		if i % 16 == 0 {
			print!("{:08x} ", start + i);
		} else if i % 8 == 0 {
			print!(" ");
		}
		print!(" {:02x}", b);
		if i % 16 == 15 {
			println!("");
		}
	}
	if data.len() % 16 != 0 {
		println!("");
	}
}

fn status<T: Transport>(flash: &mut DataFlash<T>) -> AResult<()> {
	let status = flash.read_status()?;
	println!("status: {:?}", status);
	let geometry = flash.geometry();
	println!(
		"geometry: {} pages of {} bytes ({} page address bits)",
		geometry.page_count,
		geometry.page_size,
		geometry.page_bits,
	);
	Ok(())
}

fn dump<T: Transport>(flash: &mut DataFlash<T>, sub_m: &clap::ArgMatches) -> AResult<()> {
	let page: u16 = get_optional_param(sub_m, "page")?.unwrap_or(0);
	let offset: u16 = get_optional_param(sub_m, "offset")?.unwrap_or(0);
	let capacity = flash.geometry().capacity();
	let length: usize = get_optional_param(sub_m, "length")?.unwrap_or(capacity);

	let mut data = vec![0u8; length];
	flash.continuous_read(page, offset)?.read(&mut data)?;
	io::stdout().write_all(&data)?;
	Ok(())
}

fn read_page<T: Transport>(flash: &mut DataFlash<T>, sub_m: &clap::ArgMatches) -> AResult<()> {
	let page: u16 = get_param(sub_m, "PAGE")?;
	let buffer = get_buffer(sub_m)?;
	let page_size = flash.geometry().page_size as usize;

	flash.page_to_buffer(page, buffer)?;
	let mut data = vec![0u8; page_size];
	flash.read_stream(buffer, 0, &mut data)?;

	if sub_m.is_present("raw") {
		io::stdout().write_all(&data)?;
	} else {
		hexdump(page as usize * page_size, &data);
	}
	Ok(())
}

fn write_page<T: Transport>(flash: &mut DataFlash<T>, sub_m: &clap::ArgMatches) -> AResult<()> {
	let page: u16 = get_param(sub_m, "PAGE")?;
	let buffer = get_buffer(sub_m)?;
	let page_size = flash.geometry().page_size as usize;

	let mut data = Vec::new();
	match sub_m.value_of("FILE") {
		Some(path) if path != "-" => {
			fs::File::open(path)
				.and_then(|mut f| f.read_to_end(&mut data))
				.with_context(|e| format!("reading {}: {}", path, e))?;
		},
		_ => {
			io::stdin().read_to_end(&mut data)?;
		},
	}
	ensure!(data.len() <= page_size, "page data too long: {} bytes (page size {})", data.len(), page_size);
	data.resize(page_size, 0xff);

	flash.write_stream(buffer, 0, &data)?;
	flash.buffer_to_page(buffer, page)?;
	ensure!(!flash.compare_page_to_buffer(buffer, page)?, "Verify failed: page {} differs from {}", page, buffer);
	info!("page {} written and verified", page);
	Ok(())
}

fn erase<T: Transport>(flash: &mut DataFlash<T>, sub_m: &clap::ArgMatches) -> AResult<()> {
	let page: u16 = get_param(sub_m, "PAGE")?;
	flash.erase_page(page)?;
	info!("page {} erased", page);
	Ok(())
}

fn compare<T: Transport>(flash: &mut DataFlash<T>, sub_m: &clap::ArgMatches) -> AResult<()> {
	let page: u16 = get_param(sub_m, "PAGE")?;
	let buffer = get_buffer(sub_m)?;
	if flash.compare_page_to_buffer(buffer, page)? {
		println!("page {} differs from {}", page, buffer);
		exit(2);
	}
	println!("page {} matches {}", page, buffer);
	Ok(())
}

// write a pattern to a scratch page through both buffers and read it back
fn selftest<T: Transport>(flash: &mut DataFlash<T>, sub_m: &clap::ArgMatches) -> AResult<()> {
	let page: u16 = get_param(sub_m, "PAGE")?;
	let page_size = flash.geometry().page_size as usize;

	flash.erase_page(page)?;
	flash.page_to_buffer(page, Buffer::One)?;
	let mut data = vec![0u8; page_size];
	flash.read_stream(Buffer::One, 0, &mut data)?;
	ensure!(data.iter().all(|b| *b == 0xff), "page {} not erased", page);

	let pattern: Vec<u8> = (0..page_size).map(|i| (i * 7) as u8).collect();
	flash.write_stream(Buffer::One, 0, &pattern)?;
	flash.buffer_to_page(Buffer::One, page)?;
	flash.page_to_buffer(page, Buffer::Two)?;
	flash.read_stream(Buffer::Two, 0, &mut data)?;
	ensure!(data == pattern, "page {} read back through buffer 2 differs", page);
	ensure!(!flash.compare_page_to_buffer(Buffer::One, page)?, "compare reports mismatch on page {}", page);

	flash.erase_page(page)?;
	println!("selftest on page {} passed", page);
	Ok(())
}

fn run<T: Transport>(mut flash: DataFlash<T>, matches: &clap::ArgMatches) -> AResult<()> {
	let flash = &mut flash;
	match matches.subcommand() {
		("status", _) => status(flash),
		("dump", Some(sub_m)) => dump(flash, sub_m),
		("read_page", Some(sub_m)) => read_page(flash, sub_m),
		("write_page", Some(sub_m)) => write_page(flash, sub_m),
		("erase", Some(sub_m)) => erase(flash, sub_m),
		("compare", Some(sub_m)) => compare(flash, sub_m),
		("selftest", Some(sub_m)) => selftest(flash, sub_m),
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg simulate: -s --simulate conflicts_with[spidev] "use a simulated (erased) DataFlash")
		(@arg spidev: -d --spidev +takes_value requires[cs_gpio] "spidev device (e.g. /dev/spidev0.0)")
		(@arg cs_gpio: -c --cs_gpio +takes_value "sysfs GPIO number driving chip select")
		(@arg speed: --speed +takes_value "SPI clock in Hz")
		(@arg max_polls: --max_polls +takes_value conflicts_with[no_timeout] "give up after that many status polls")
		(@arg no_timeout: --no_timeout "wait for the chip forever")
		(@arg any_device: --any_device "don't check the device id")
		(@subcommand status =>
			(about: "show status register")
		)
		(@subcommand dump =>
			(about: "continuous array read to stdout")
			(@arg page: --page +takes_value "start page")
			(@arg offset: --offset +takes_value "start offset in page")
			(@arg length: --length +takes_value "bytes to read (default: whole device)")
		)
		(@subcommand read_page =>
			(about: "load page into a buffer and show it")
			(@arg buffer: -b --buffer +takes_value "buffer to use (1 or 2)")
			(@arg raw: -r --raw "write binary to stdout")
			(@arg PAGE: +required "page number")
		)
		(@subcommand write_page =>
			(about: "program a page (padded with 0xff) and verify")
			(@arg buffer: -b --buffer +takes_value "buffer to use (1 or 2)")
			(@arg PAGE: +required "page number")
			(@arg FILE: "data to write (default: stdin)")
		)
		(@subcommand erase =>
			(about: "erase a page")
			(@arg PAGE: +required "page number")
		)
		(@subcommand compare =>
			(about: "compare page with buffer content")
			(@arg buffer: -b --buffer +takes_value "buffer to use (1 or 2)")
			(@arg PAGE: +required "page number")
		)
		(@subcommand selftest =>
			(about: "program and verify a pattern on a scratch page (erases it)")
			(@arg PAGE: +required "scratch page number")
		)
	).get_matches();

	let mut config = Config::default();
	if let Some(speed) = get_optional_param(&matches, "speed")? {
		config.clock = ClockMode::mode3(speed);
	}
	if matches.is_present("no_timeout") {
		config.wait_limit = WaitLimit::Unbounded;
	} else if let Some(polls) = get_optional_param(&matches, "max_polls")? {
		config.wait_limit = WaitLimit::Polls(polls);
	}
	config.verify_device_id = !matches.is_present("any_device");

	if matches.is_present("simulate") {
		run(open_simulated(config)?, &matches)
	} else {
		let path = match matches.value_of("spidev") {
			Some(path) => path,
			None => bail!("need either --spidev or --simulate"),
		};
		let cs_gpio: u32 = get_param(&matches, "cs_gpio")?;
		run(open_spidev(path, cs_gpio, config)?, &matches)
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
