//! Integration tests against a pseudo-terminal pair.
//!
//! The port under test opens the pty slave; the test drives the master side
//! as the "far end" of a loopback cable.

#![cfg(target_os = "linux")]

use std::fs::File;
use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;
use std::thread;
use std::time::{Duration, Instant};

use nix::fcntl::OFlag;
use nix::pty::{PtyMaster, grantpt, posix_openpt, ptsname_r, unlockpt};
use nix::sys::resource::{Resource, getrlimit, setrlimit};
use ttyline::{ControlLine, Error, OperationError, READLINE_CAPACITY, SerialPort};

struct Loopback {
    master: PtyMaster,
    path: String,
}

impl Loopback {
    fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY).expect("posix_openpt");
        grantpt(&master).expect("grantpt");
        unlockpt(&master).expect("unlockpt");
        let path = ptsname_r(&master).expect("ptsname_r");
        Self { master, path }
    }

    fn port(&self, baud_rate: u32, timeout: f64) -> SerialPort {
        SerialPort::new(self.path.clone(), baud_rate, timeout)
    }

    fn open_port(&self, timeout: f64) -> SerialPort {
        let mut port = self.port(115200, timeout);
        port.open().expect("open pty slave");
        port
    }

    fn send(&mut self, data: &[u8]) {
        self.master.write_all(data).expect("write to pty master");
    }

    fn receive(&mut self, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.master.read_exact(&mut buf).expect("read from pty master");
        buf
    }
}

fn settle() {
    thread::sleep(Duration::from_millis(50));
}

// ---- Lifecycle ----

#[test]
fn open_close_every_supported_baud_rate() {
    let pty = Loopback::new();
    for rate in ttyline::supported_baud_rates() {
        let mut port = pty.port(rate, 1.0);
        port.open().unwrap_or_else(|e| panic!("open at {rate} Bd: {e}"));
        assert!(port.is_open());
        port.close().unwrap_or_else(|e| panic!("close at {rate} Bd: {e}"));
        assert!(!port.is_open());
    }
}

#[test]
fn unsupported_baud_rate_rejected_at_open() {
    let pty = Loopback::new();
    for rate in [0, 1200, 4800, 230400, 921600] {
        let mut port = pty.port(rate, 1.0);
        assert!(matches!(
            port.open(),
            Err(Error::Operation(OperationError::UnsupportedBaudRate(r))) if r == rate
        ));
        assert!(!port.is_open());
    }

    // The failed attempts must not leave the device locked.
    let mut port = pty.port(9600, 1.0);
    port.open().expect("open after rejected baud rates");
}

#[test]
fn second_open_fails_already_open() {
    let pty = Loopback::new();
    let mut port = pty.open_port(1.0);
    assert!(matches!(
        port.open(),
        Err(Error::Operation(OperationError::AlreadyOpen))
    ));
    assert!(port.is_open());
}

#[test]
fn close_twice_fails_already_closed() {
    let pty = Loopback::new();
    let mut port = pty.open_port(1.0);
    port.close().expect("first close");
    assert!(matches!(
        port.close(),
        Err(Error::Operation(OperationError::AlreadyClosed))
    ));
}

#[test]
fn second_instance_sees_port_locked() {
    let pty = Loopback::new();
    let _owner = pty.open_port(1.0);

    let mut other = pty.port(115200, 1.0);
    match other.open() {
        Err(Error::Operation(OperationError::PortLocked { path, .. })) => {
            assert_eq!(path, pty.path);
        },
        other => panic!("expected PortLocked, got {other:?}"),
    }
    assert!(!other.is_open());
}

#[test]
fn drop_releases_lock() {
    let pty = Loopback::new();
    {
        let _port = pty.open_port(1.0);
    }
    let mut again = pty.port(115200, 1.0);
    again.open().expect("reopen after drop");
}

#[test]
fn setters_do_not_touch_open_handle() {
    let mut pty = Loopback::new();
    let mut port = pty.open_port(1.0);

    port.set_baud_rate(12345);
    port.set_path("/dev/ttyline-does-not-exist");
    assert!(port.is_open());

    pty.send(b"ok");
    assert_eq!(port.read(2).expect("read after setters"), b"ok");

    port.close().expect("close");
    assert!(matches!(
        port.open(),
        Err(Error::Operation(OperationError::OpenFailed { .. }))
    ));
}

#[test]
fn display_reports_open_status() {
    let pty = Loopback::new();
    let port = pty.open_port(-1.0);
    let text = port.to_string();
    assert!(text.starts_with(&format!("Port name: {}\n", pty.path)));
    assert!(text.contains("Baudrate: 115200 Bd\n"));
    assert!(text.contains("Timeout: None\n"));
    assert!(text.ends_with("Status: Open"));
}

// ---- Reads and writes ----

#[test]
fn read_returns_written_bytes() {
    let mut pty = Loopback::new();
    let mut port = pty.open_port(1.0);

    pty.send(b"AB\n");
    assert_eq!(port.read(3).expect("read 3"), vec![0x41, 0x42, 0x0A]);
}

#[test]
fn read_is_binary_transparent() {
    let mut pty = Loopback::new();
    let mut port = pty.open_port(1.0);

    let all: Vec<u8> = (0..=255).collect();
    pty.send(&all);
    assert_eq!(port.read(all.len()).expect("read all byte values"), all);
}

#[test]
fn read_accumulates_across_rounds() {
    let mut pty = Loopback::new();
    let mut port = pty.open_port(1.0);

    let master = &mut pty.master;
    let data = thread::scope(|s| {
        s.spawn(move || {
            for chunk in [&b"01"[..], b"234", b"56789"] {
                master.write_all(chunk).expect("write chunk");
                thread::sleep(Duration::from_millis(30));
            }
        });
        port.read(10)
    });
    assert_eq!(data.expect("read 10"), b"0123456789");
}

#[test]
fn read_zero_returns_immediately() {
    let pty = Loopback::new();
    let mut port = pty.open_port(-1.0);

    let start = Instant::now();
    assert!(port.read(0).expect("read 0").is_empty());
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[test]
fn read_times_out_after_configured_timeout() {
    let pty = Loopback::new();
    let mut port = pty.open_port(0.5);

    let start = Instant::now();
    assert!(matches!(port.read(1), Err(Error::Timeout)));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(450), "too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "too late: {elapsed:?}");
}

#[test]
fn zero_timeout_fails_without_waiting() {
    let pty = Loopback::new();
    let mut port = pty.open_port(0.0);

    let start = Instant::now();
    assert!(matches!(port.read(1), Err(Error::Timeout)));
    assert!(start.elapsed() < Duration::from_millis(200));
}

#[test]
fn negative_timeout_waits_for_data() {
    let mut pty = Loopback::new();
    let mut port = pty.open_port(-1.0);

    let master = &mut pty.master;
    let data = thread::scope(|s| {
        s.spawn(move || {
            thread::sleep(Duration::from_millis(300));
            master.write_all(b"late").expect("write late data");
        });
        port.read(4)
    });
    assert_eq!(data.expect("blocking read"), b"late");
}

#[test]
fn partial_read_is_discarded_on_timeout() {
    let mut pty = Loopback::new();
    let mut port = pty.open_port(0.2);

    pty.send(b"A");
    assert!(matches!(port.read(2), Err(Error::Timeout)));

    pty.send(b"BC");
    assert_eq!(port.read(2).expect("read after timeout"), b"BC");
}

#[test]
fn timeout_change_applies_to_next_read() {
    let pty = Loopback::new();
    let mut port = pty.open_port(5.0);
    port.set_timeout(0.1);

    let start = Instant::now();
    assert!(matches!(port.read(1), Err(Error::Timeout)));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn write_reports_accepted_count() {
    let mut pty = Loopback::new();
    let mut port = pty.open_port(1.0);

    assert_eq!(port.write("xyz").expect("write str"), 3);
    assert_eq!(port.write(vec![20u8, 21, 22, b'\n']).expect("write vec"), 4);
    assert_eq!(pty.receive(7), b"xyz\x14\x15\x16\n");
}

#[test]
fn write_empty_is_noop() {
    let pty = Loopback::new();
    let mut port = pty.open_port(1.0);
    assert_eq!(port.write(b"").expect("empty write"), 0);
}

#[test]
fn io_works_with_descriptor_above_fd_setsize() {
    const FD_FLOOR: i32 = 1100;
    const NOFILE: u64 = 4096;

    let (soft, hard) = getrlimit(Resource::RLIMIT_NOFILE).expect("getrlimit");
    if soft < NOFILE {
        if hard < NOFILE {
            eprintln!("skipped: RLIMIT_NOFILE hard limit {hard} is below {NOFILE}");
            return;
        }
        setrlimit(Resource::RLIMIT_NOFILE, NOFILE, hard).expect("raise RLIMIT_NOFILE");
    }

    // Occupy every low descriptor so the port lands above FD_SETSIZE.
    let mut filler = Vec::new();
    loop {
        let file = File::open("/dev/null").expect("open /dev/null");
        let fd = file.as_raw_fd();
        filler.push(file);
        if fd >= FD_FLOOR {
            break;
        }
    }

    let mut pty = Loopback::new();
    let mut port = pty.open_port(1.0);

    pty.send(b"hi");
    assert_eq!(port.read(2).expect("read on high descriptor"), b"hi");

    pty.send(b"line\n");
    settle();
    assert_eq!(port.readline().expect("readline on high descriptor"), "line\n");

    port.close().expect("close");
    drop(filler);
}

// ---- Line reads ----

#[test]
fn readline_returns_complete_line() {
    let mut pty = Loopback::new();
    let mut port = pty.open_port(1.0);

    pty.send(b"hello\n");
    settle();
    assert_eq!(port.readline().expect("readline"), "hello\n");
}

#[test]
fn readline_returns_one_line_per_call() {
    let mut pty = Loopback::new();
    let mut port = pty.open_port(0.2);

    // Switch to canonical mode first so the driver splits the lines.
    assert!(matches!(port.readline(), Err(Error::Timeout)));
    pty.send(b"first\nsecond\n");
    settle();

    assert_eq!(port.readline().expect("first line"), "first\n");
    assert_eq!(port.readline().expect("second line"), "second\n");
}

#[test]
fn readline_times_out_without_data() {
    let pty = Loopback::new();
    let mut port = pty.open_port(0.2);
    assert!(matches!(port.readline(), Err(Error::Timeout)));
}

#[test]
fn readline_rejects_overlong_line() {
    let mut pty = Loopback::new();
    let mut port = pty.open_port(1.0);

    let mut line = vec![b'a'; 300];
    line.push(b'\n');
    pty.send(&line);
    settle();

    assert!(matches!(
        port.readline(),
        Err(Error::Operation(OperationError::BufferOverflow { capacity }))
            if capacity == READLINE_CAPACITY
    ));
}

#[test]
fn readline_accepts_longest_fitting_line() {
    let mut pty = Loopback::new();
    let mut port = pty.open_port(1.0);

    let mut line = vec![b'z'; READLINE_CAPACITY - 2];
    line.push(b'\n');
    pty.send(&line);
    settle();

    let text = port.readline().expect("255-byte line");
    assert_eq!(text.len(), READLINE_CAPACITY - 1);
    assert!(text.ends_with('\n'));
}

// ---- Buffers and control lines ----

#[test]
fn reset_input_buffer_discards_pending_bytes() {
    let mut pty = Loopback::new();
    let mut port = pty.open_port(0.1);

    pty.send(b"junk");
    settle();
    port.reset_input_buffer().expect("reset input");
    assert!(matches!(port.read(1), Err(Error::Timeout)));
}

#[test]
fn reset_output_buffer_succeeds() {
    let pty = Loopback::new();
    let mut port = pty.open_port(0.1);
    port.reset_output_buffer().expect("reset output");
}

#[test]
fn pty_has_no_modem_lines() {
    let pty = Loopback::new();
    let mut port = pty.open_port(1.0);

    assert!(matches!(
        port.set_rts(true),
        Err(Error::Operation(OperationError::ControlLineFailed {
            line: ControlLine::Rts,
            ..
        }))
    ));
    assert!(matches!(
        port.cts(),
        Err(Error::Operation(OperationError::ControlLineFailed {
            line: ControlLine::Cts,
            ..
        }))
    ));
}
