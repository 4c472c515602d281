//! hiltest-dummy - In-memory test bench for pipeline testing
//!
//! This crate provides fake hardware for exercising the pipeline without a
//! physical target: a GPIO controller that records every level it is asked
//! to drive, and a serial channel that replays a script of timed byte
//! bursts against real elapsed time, so capture-timing behavior can be
//! tested with millisecond budgets.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use hiltest_core::error::{GpioError, SerialError};
use hiltest_core::gpio::{GpioController, PinLevel, PinNumbering};
use hiltest_core::pipeline::TestBench;
use hiltest_core::serial::SerialChannel;

/// Shared trace of pin operations, inspectable after the pipeline has
/// dropped its GPIO handle
pub type GpioLog = Arc<Mutex<Vec<(u8, PinLevel)>>>;

/// Recording GPIO controller
///
/// Every `set_pin` lands in the shared log. Can be armed to fail after a
/// fixed number of operations to simulate a handle going unusable
/// mid-sequence.
pub struct DummyGpio {
    log: GpioLog,
    ops: usize,
    fail_after: Option<usize>,
}

impl DummyGpio {
    /// New controller writing into `log`
    pub fn new(log: GpioLog) -> Self {
        Self {
            log,
            ops: 0,
            fail_after: None,
        }
    }

    /// Fail every operation once `n` have succeeded
    pub fn failing_after(log: GpioLog, n: usize) -> Self {
        Self {
            log,
            ops: 0,
            fail_after: Some(n),
        }
    }
}

impl GpioController for DummyGpio {
    fn set_pin(&mut self, pin: u8, level: PinLevel) -> Result<(), GpioError> {
        if self.fail_after == Some(self.ops) {
            return Err(GpioError::SetPin {
                pin,
                reason: "dummy GPIO armed to fail".into(),
            });
        }
        self.ops += 1;
        log::debug!("dummy gpio: pin {} -> {:?}", pin, level);
        self.log.lock().expect("gpio log poisoned").push((pin, level));
        Ok(())
    }
}

/// One scheduled burst: readable once `at` has elapsed since the first read
pub type ScriptEvent = (Duration, Vec<u8>);

/// Serial channel that replays a time-based script
///
/// The clock starts on the first `read_chunk` call. Each poll either sleeps
/// until the next due event and delivers it, or sleeps out its timeout and
/// returns 0, which is exactly the contract the capture engine polls
/// against.
pub struct ScriptedSerial {
    events: Vec<ScriptEvent>,
    next: usize,
    started: Option<Instant>,
    err_after: Option<Duration>,
}

impl ScriptedSerial {
    /// Channel that will replay `events` (must be in ascending time order)
    pub fn new(events: Vec<ScriptEvent>) -> Self {
        Self {
            events,
            next: 0,
            started: None,
            err_after: None,
        }
    }

    /// Channel that never produces a byte
    pub fn silent() -> Self {
        Self::new(Vec::new())
    }

    /// Raise an I/O error on the first read reaching `at`; events scheduled
    /// earlier are still delivered
    pub fn failing_after(mut self, at: Duration) -> Self {
        self.err_after = Some(at);
        self
    }
}

impl SerialChannel for ScriptedSerial {
    fn read_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, SerialError> {
        let started = *self.started.get_or_insert_with(Instant::now);
        let now = started.elapsed();

        if let Some((at, data)) = self.events.get(self.next) {
            let before_error = self.err_after.map_or(true, |err_at| *at < err_at);
            if before_error && *at <= now + timeout {
                if *at > now {
                    thread::sleep(*at - now);
                }
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                self.next += 1;
                return Ok(n);
            }
        }

        if let Some(err_at) = self.err_after {
            if err_at <= now + timeout {
                if err_at > now {
                    thread::sleep(err_at - now);
                }
                return Err(SerialError::Io("dummy serial armed to fail".into()));
            }
        }

        thread::sleep(timeout);
        Ok(0)
    }
}

/// In-memory test bench
///
/// Counts every handle it opens so tests can assert which hardware was (or
/// was not) touched, and can be armed to fail either open call.
pub struct DummyBench {
    gpio_log: GpioLog,
    serial_script: Vec<ScriptEvent>,
    gpio_fail: bool,
    gpio_fail_after: Option<usize>,
    serial_fail: bool,
    serial_err_after: Option<Duration>,
    /// Number of GPIO handles opened so far
    pub gpio_opens: usize,
    /// Number of serial channels opened so far
    pub serial_opens: usize,
}

impl DummyBench {
    /// Bench with a silent serial channel
    pub fn new() -> Self {
        Self {
            gpio_log: Arc::new(Mutex::new(Vec::new())),
            serial_script: Vec::new(),
            gpio_fail: false,
            gpio_fail_after: None,
            serial_fail: false,
            serial_err_after: None,
            gpio_opens: 0,
            serial_opens: 0,
        }
    }

    /// Bench whose serial channel replays `events`
    pub fn with_serial_script(events: Vec<ScriptEvent>) -> Self {
        let mut bench = Self::new();
        bench.serial_script = events;
        bench
    }

    /// Fail GPIO initialization outright
    pub fn failing_gpio_init(mut self) -> Self {
        self.gpio_fail = true;
        self
    }

    /// Let `n` pin operations succeed, then fail the handle
    pub fn failing_gpio_after(mut self, n: usize) -> Self {
        self.gpio_fail_after = Some(n);
        self
    }

    /// Fail serial connection outright
    pub fn failing_serial(mut self) -> Self {
        self.serial_fail = true;
        self
    }

    /// Connect fine, deliver the script until `at`, then error on read
    pub fn failing_serial_after(mut self, at: Duration) -> Self {
        self.serial_err_after = Some(at);
        self
    }

    /// Snapshot of the pin operations applied so far
    pub fn gpio_log(&self) -> Vec<(u8, PinLevel)> {
        self.gpio_log.lock().expect("gpio log poisoned").clone()
    }
}

impl Default for DummyBench {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBench for DummyBench {
    type Gpio = DummyGpio;
    type Serial = ScriptedSerial;

    fn open_gpio(&mut self, _numbering: PinNumbering) -> Result<Self::Gpio, GpioError> {
        self.gpio_opens += 1;
        if self.gpio_fail {
            return Err(GpioError::Init("dummy GPIO armed to fail".into()));
        }
        Ok(match self.gpio_fail_after {
            Some(n) => DummyGpio::failing_after(self.gpio_log.clone(), n),
            None => DummyGpio::new(self.gpio_log.clone()),
        })
    }

    fn open_serial(&mut self, port: &str, _baud_rate: u32) -> Result<Self::Serial, SerialError> {
        self.serial_opens += 1;
        if self.serial_fail {
            return Err(SerialError::Connect {
                port: port.to_string(),
                reason: "dummy serial armed to fail".into(),
            });
        }
        let chan = ScriptedSerial::new(self.serial_script.clone());
        Ok(match self.serial_err_after {
            Some(at) => chan.failing_after(at),
            None => chan,
        })
    }
}
