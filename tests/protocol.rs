mod common;

use butterfly_dataflash::dataflash::{
	dataflash_error,
	DataFlashError,
	Readiness,
	Session,
	WaitOutcome,
};
use butterfly_dataflash::spi::ClockMode;
use butterfly_dataflash::*;
use pretty_assertions::assert_eq;

use crate::common::{
	Event,
	ScriptedBus,
	BUSY,
	READY,
	READY_MISMATCH,
};

fn flash(bus: &mut ScriptedBus) -> DataFlash<&mut ScriptedBus> {
	common::init_logging();
	let mut flash = DataFlash::new(bus, Config::default()).unwrap();
	flash.transport_mut().clear();
	flash
}

fn error_of<T>(result: AResult<T>) -> DataFlashError {
	match result {
		Ok(_) => panic!("expected an error"),
		Err(e) => dataflash_error(&e).cloned().expect("not a DataFlashError"),
	}
}

mod setup {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn new_configures_and_releases_chip_select() {
		let mut bus = ScriptedBus::new();
		DataFlash::new(&mut bus, Config::default()).unwrap();
		assert_eq!(bus.clock, Some(ClockMode::mode3(4_000_000)));
		assert_eq!(bus.events, vec![Event::Select(false)]);
	}

	#[test]
	fn rejects_incompatible_clock_mode() {
		let mut bus = ScriptedBus::new();
		let config = Config {
			clock: ClockMode { idle_high: true, sample_trailing: false, speed_hz: 1_000_000 },
			..Config::default()
		};
		assert!(DataFlash::new(&mut bus, config).is_err());
		assert_eq!(bus.clock, None);
		assert!(bus.events.is_empty());
	}

	#[test]
	fn open_checks_device_id() {
		let mut bus = ScriptedBus::new();
		// 0b1001: some other density
		bus.respond(&[0x00, 0xa4]);
		let err = error_of(DataFlash::open(&mut bus, Config::default()));
		assert_eq!(err, DataFlashError::DeviceMismatch { found: 0b1001, expected: 0b0111 });
		assert!(!err.is_precondition_violation());

		let mut bus = ScriptedBus::new();
		bus.respond(&[0x00, 0xa4]);
		let config = Config { verify_device_id: false, ..Config::default() };
		let flash = DataFlash::open(&mut bus, config).unwrap();
		assert_eq!(flash.device_id(), Some(0b1001));
	}
}

mod status {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn read_status_is_a_complete_command() {
		let mut bus = ScriptedBus::new();
		bus.respond(&[0xff, READY]);
		let mut flash = flash(&mut bus);
		assert_eq!(flash.device_id(), None);
		assert_eq!(flash.read_status().unwrap(), Status(READY));
		assert_eq!(flash.device_id(), Some(0b0111));
		assert_eq!(bus.events, vec![
			Event::Select(false),
			Event::Select(true),
			Event::Exchange(0x57),
			Event::Exchange(0x00),
			Event::Select(false),
		]);
	}

	#[test]
	fn poll_ready_is_a_single_query() {
		let mut bus = ScriptedBus::new();
		bus.respond(&[0, BUSY, 0, READY]);
		let mut flash = flash(&mut bus);
		assert_eq!(flash.poll_ready().unwrap(), Readiness::Busy(Status(BUSY)));
		assert_eq!(flash.poll_ready().unwrap(), Readiness::Ready(Status(READY)));
		assert_eq!(bus.frames(), vec![vec![0x57, 0x00]; 2]);
	}

	#[test]
	fn wait_ready_counts_polls() {
		let mut bus = ScriptedBus::new();
		bus.respond(&[0, BUSY, 0, BUSY, 0, READY]);
		let mut flash = flash(&mut bus);
		let outcome = flash.wait_ready(WaitLimit::Unbounded).unwrap();
		assert_eq!(outcome, WaitOutcome::Ready { status: Status(READY), polls: 3 });
		assert_eq!(bus.frames(), vec![vec![0x57, 0x00]; 3]);
	}

	#[test]
	fn wait_ready_gives_up() {
		let mut bus = ScriptedBus::new();
		bus.idle_response = BUSY;
		let mut flash = flash(&mut bus);
		let outcome = flash.wait_ready(WaitLimit::Polls(4)).unwrap();
		assert_eq!(outcome, WaitOutcome::TimedOut { status: Status(BUSY), polls: 4 });
		assert_eq!(bus.status_queries(), 4);
	}

	#[test]
	fn busy_replies_cost_one_query_each() {
		for &k in [0usize, 1, 5].iter() {
			let mut bus = ScriptedBus::new();
			// opcode and page address of the erase
			bus.respond(&[0; 4]);
			for _ in 0..k {
				bus.respond(&[0, BUSY]);
			}
			bus.respond(&[0, READY]);
			let mut flash = flash(&mut bus);
			flash.erase_page(5).unwrap();
			assert_eq!(bus.status_queries(), k + 1, "{} busy replies", k);
			assert!(!bus.is_selected());
		}
	}

	#[test]
	fn unresponsive_chip_times_out() {
		let mut bus = ScriptedBus::new();
		bus.idle_response = BUSY;
		let mut flash = flash(&mut bus);
		flash.set_wait_limit(WaitLimit::Polls(3));
		let err = error_of(flash.erase_page(5));
		assert_eq!(err, DataFlashError::Unresponsive { polls: 3, status: Status(BUSY) });
		assert_eq!(bus.status_queries(), 3);
		assert!(!bus.is_selected());
	}
}

mod page_commands {
	use super::*;
	use pretty_assertions::assert_eq;

	fn single_command<F>(f: F) -> Vec<Vec<u8>>
	where
		F: FnOnce(&mut DataFlash<&mut ScriptedBus>) -> AResult<()>,
	{
		let mut bus = ScriptedBus::new();
		let mut flash = flash(&mut bus);
		f(&mut flash).unwrap();
		assert!(!bus.is_selected());
		bus.frames()
	}

	#[test]
	fn opcodes_and_addresses() {
		let status = vec![0x57, 0x00];
		assert_eq!(
			single_command(|f| f.erase_page(5)),
			vec![vec![0x81, 0x00, 0x0a, 0x00], status.clone()],
		);
		assert_eq!(
			single_command(|f| f.page_to_buffer(5, Buffer::One)),
			vec![vec![0x53, 0x00, 0x0a, 0x00], status.clone()],
		);
		assert_eq!(
			single_command(|f| f.page_to_buffer(2047, Buffer::Two)),
			vec![vec![0x55, 0x0f, 0xfe, 0x00], status.clone()],
		);
		assert_eq!(
			single_command(|f| f.buffer_to_page(Buffer::One, 0x80)),
			vec![vec![0x83, 0x01, 0x00, 0x00], status.clone()],
		);
		assert_eq!(
			single_command(|f| f.buffer_to_page(Buffer::Two, 5)),
			vec![vec![0x86, 0x00, 0x0a, 0x00], status.clone()],
		);
		assert_eq!(
			single_command(|f| f.buffer_to_page_without_erase(Buffer::One, 5)),
			vec![vec![0x88, 0x00, 0x0a, 0x00], status.clone()],
		);
		assert_eq!(
			single_command(|f| f.buffer_to_page_without_erase(Buffer::Two, 5)),
			vec![vec![0x89, 0x00, 0x0a, 0x00], status.clone()],
		);
		assert_eq!(
			single_command(|f| f.auto_rewrite(5, Buffer::Two)),
			vec![vec![0x59, 0x00, 0x0a, 0x00], status.clone()],
		);
		assert_eq!(
			single_command(|f| f.compare_page_to_buffer(Buffer::Two, 5).map(|_| ())),
			vec![vec![0x61, 0x00, 0x0a, 0x00], status.clone()],
		);
	}

	#[test]
	fn compare_reports_mismatch_bit() {
		let mut bus = ScriptedBus::new();
		bus.respond(&[0, 0, 0, 0, 0, READY_MISMATCH]);
		bus.respond(&[0, 0, 0, 0, 0, READY]);
		let mut flash = flash(&mut bus);
		assert_eq!(flash.compare_page_to_buffer(Buffer::One, 5).unwrap(), true);
		assert_eq!(flash.compare_page_to_buffer(Buffer::One, 5).unwrap(), false);
		assert_eq!(bus.frames()[0], vec![0x60, 0x00, 0x0a, 0x00]);
	}

	#[test]
	fn page_out_of_range() {
		let mut bus = ScriptedBus::new();
		let mut flash = flash(&mut bus);
		let err = error_of(flash.erase_page(2048));
		assert_eq!(err, DataFlashError::PageOutOfRange { page: 2048, page_count: 2048 });
		assert!(err.is_precondition_violation());
		assert!(error_of(flash.page_to_buffer(0xffff, Buffer::One)).is_precondition_violation());
		assert!(bus.events.is_empty());
	}
}

mod buffers {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn read_stream_wire_format() {
		let mut bus = ScriptedBus::new();
		bus.respond(&[0; 5]);
		bus.respond(&[1, 2, 3]);
		let mut flash = flash(&mut bus);
		let mut data = [0u8; 3];
		flash.read_stream(Buffer::Two, 261, &mut data).unwrap();
		assert_eq!(data, [1, 2, 3]);
		assert_eq!(bus.frames(), vec![vec![0x56, 0x00, 0x01, 0x05, 0x00, 0x00, 0x00, 0x00]]);
		assert!(!bus.is_selected());
	}

	#[test]
	fn write_stream_wire_format() {
		let mut bus = ScriptedBus::new();
		let mut flash = flash(&mut bus);
		flash.write_stream(Buffer::One, 10, &[0xab, 0xcd]).unwrap();
		flash.write_byte(Buffer::Two, 263, 0x5a).unwrap();
		assert_eq!(bus.frames(), vec![
			vec![0x84, 0x00, 0x00, 0x0a, 0xab, 0xcd],
			vec![0x87, 0x00, 0x01, 0x07, 0x5a],
		]);
		// no status polling for buffer accesses
		assert_eq!(bus.status_queries(), 0);
		assert!(!bus.is_selected());
	}

	#[test]
	fn empty_read_only_sends_command() {
		let mut bus = ScriptedBus::new();
		let mut flash = flash(&mut bus);
		flash.read_stream(Buffer::One, 0, &mut []).unwrap();
		assert_eq!(bus.frames(), vec![vec![0x54, 0x00, 0x00, 0x00, 0x00]]);
	}

	#[test]
	fn ranges_beyond_the_buffer() {
		let mut bus = ScriptedBus::new();
		let mut flash = flash(&mut bus);
		let mut data = vec![0u8; 265];
		let err = error_of(flash.read_stream(Buffer::One, 0, &mut data));
		assert_eq!(err, DataFlashError::OffsetOutOfRange { offset: 0, len: 265, page_size: 264 });
		assert!(error_of(flash.write_stream(Buffer::One, 200, &[0u8; 65])).is_precondition_violation());
		assert!(error_of(flash.read_byte(Buffer::Two, 264)).is_precondition_violation());
		assert!(bus.events.is_empty());
	}

	#[test]
	fn reader_stops_at_buffer_end() {
		let mut bus = ScriptedBus::new();
		bus.respond(&[0; 5]);
		bus.respond(&[0x10, 0x11, 0x12]);
		let mut flash = flash(&mut bus);
		let data = flash.buffer_reader(Buffer::One, 261).unwrap()
			.collect::<AResult<Vec<u8>>>().unwrap();
		assert_eq!(data, vec![0x10, 0x11, 0x12]);
		assert!(!bus.is_selected());
	}

	#[test]
	fn dropped_writer_releases_chip_select() {
		let mut bus = ScriptedBus::new();
		let mut flash = flash(&mut bus);
		{
			let mut writer = flash.enable_buffer_write(Buffer::One, 0).unwrap();
			writer.write_byte(0x01).unwrap();
			assert_eq!(writer.offset(), 1);
		}
		assert!(!flash.transport().is_selected());
		assert_eq!(flash.session(), None);
		assert_eq!(bus.frames(), vec![vec![0x84, 0x00, 0x00, 0x00, 0x01]]);
	}
}

mod array {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn continuous_read_wire_format() {
		let mut bus = ScriptedBus::new();
		bus.respond(&[0; 8]);
		bus.respond(&[7, 8]);
		let mut flash = flash(&mut bus);
		let mut reader = flash.continuous_read(5, 10).unwrap();
		let mut data = [0u8; 2];
		reader.read(&mut data).unwrap();
		reader.finish().unwrap();
		assert_eq!(data, [7, 8]);
		assert_eq!(bus.frames(), vec![
			vec![0x68, 0x00, 0x0a, 0x0a, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
		]);
		assert!(!bus.is_selected());
	}

	#[test]
	fn page_read_packs_offset_into_address() {
		let mut bus = ScriptedBus::new();
		let mut flash = flash(&mut bus);
		flash.read_page(2047, 263).unwrap().read_byte().unwrap();
		assert_eq!(bus.frames(), vec![
			vec![0x52, 0x0f, 0xff, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00],
		]);
	}

	#[test]
	fn program_through_buffer_waits_for_completion() {
		let mut bus = ScriptedBus::new();
		let mut flash = flash(&mut bus);
		let mut programmer = flash.program_through_buffer(Buffer::Two, 5, 0).unwrap();
		programmer.write(&[1, 2]).unwrap();
		assert_eq!(programmer.finish().unwrap(), Status(READY));
		assert_eq!(bus.frames(), vec![
			vec![0x85, 0x00, 0x0a, 0x00, 0x01, 0x02],
			vec![0x57, 0x00],
		]);
	}
}

mod sessions {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn double_deactivate_is_harmless() {
		let mut bus = ScriptedBus::new();
		let mut flash = flash(&mut bus);
		flash.deactivate().unwrap();
		flash.deactivate().unwrap();
		assert_eq!(bus.events, vec![Event::Select(false), Event::Select(false)]);
	}

	#[test]
	fn open_session_blocks_commands() {
		let mut bus = ScriptedBus::new();
		let mut flash = flash(&mut bus);
		flash.enable_buffer_write(Buffer::One, 0).unwrap().leave_open();
		assert_eq!(flash.session(), Some(Session::BufferWrite(Buffer::One)));
		assert!(flash.transport().is_selected());

		let open = DataFlashError::SessionOpen(Session::BufferWrite(Buffer::One));
		assert_eq!(error_of(flash.erase_page(5)), open);
		assert_eq!(error_of(flash.read_status()), open);
		assert_eq!(error_of(flash.write_stream(Buffer::Two, 0, &[0])), open);
		assert!(error_of(flash.continuous_read(0, 0)).is_precondition_violation());

		// continuous write mode
		flash.transfer(0x42).unwrap();
		flash.transfer(0x43).unwrap();
		flash.deactivate().unwrap();
		assert_eq!(flash.session(), None);
		assert_eq!(error_of(flash.transfer(0x44)), DataFlashError::NoSession);

		assert_eq!(bus.frames(), vec![vec![0x84, 0x00, 0x00, 0x00, 0x42, 0x43]]);
		assert!(!bus.is_selected());
	}

	#[test]
	fn open_page_program_waits_on_deactivate() {
		let mut bus = ScriptedBus::new();
		// opcode and address, one data byte, one transfer, then busy once
		bus.respond(&[0; 6]);
		bus.respond(&[0, BUSY, 0, READY]);
		let mut flash = flash(&mut bus);
		{
			let mut programmer = flash.program_through_buffer(Buffer::One, 5, 0).unwrap();
			programmer.write_byte(0x11).unwrap();
			programmer.leave_open();
		}
		assert_eq!(flash.session(), Some(Session::PageProgram(Buffer::One)));
		assert_eq!(
			error_of(flash.erase_page(5)),
			DataFlashError::SessionOpen(Session::PageProgram(Buffer::One)),
		);
		flash.transfer(0x22).unwrap();
		flash.deactivate().unwrap();
		assert_eq!(flash.session(), None);

		assert_eq!(bus.frames(), vec![
			vec![0x82, 0x00, 0x0a, 0x00, 0x11, 0x22],
			vec![0x57, 0x00],
			vec![0x57, 0x00],
		]);
		assert!(!bus.is_selected());
	}

	#[test]
	fn raw_command_through_activate() {
		let mut bus = ScriptedBus::new();
		let mut flash = flash(&mut bus);
		flash.activate().unwrap();
		assert_eq!(error_of(flash.transfer(0x57)), DataFlashError::NoSession);
		flash.deactivate().unwrap();
		assert_eq!(bus.events, vec![Event::Select(true), Event::Select(false)]);
	}
}
