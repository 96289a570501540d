use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bm257s_frame::{Frame, FrameError, FrameReader};
use bm257s_transport::ByteSource;
use tracing::{debug, error, info, warn};

use crate::buffer::{Retention, RollingBuffer};
use crate::error::{AcquireError, BoxError, Result};
use crate::sink::FrameSink;
use crate::slot::ErrorSlot;

const THREAD_NAME: &str = "bm257s-reader";

/// What the worker owns while it runs and hands back when it stops.
struct Parts<S> {
    reader: FrameReader<S>,
    sink: Option<Box<dyn FrameSink>>,
}

enum State<S> {
    Stopped(Parts<S>),
    Running(JoinHandle<Parts<S>>),
    /// The worker died and its failure has been reported.
    Failed(JoinHandle<Parts<S>>),
    /// The worker thread could not be joined or spawned.
    Lost,
}

/// Background read/decode loop feeding a [`RollingBuffer`] of frames.
///
/// ```text
/// Stopped --start()--> Running --stop()--> Stopped
///                         |                   ^
///            worker error | reported once     | stop()
///                         v                   |
///                       Failed ---------------+
/// ```
pub struct Acquisition<S: ByteSource + 'static> {
    state: State<S>,
    buffer: Arc<RollingBuffer<Frame>>,
    errors: Arc<ErrorSlot>,
    cancel: Arc<AtomicBool>,
}

impl<S: ByteSource + 'static> Acquisition<S> {
    pub fn new(reader: FrameReader<S>, retention: Retention) -> Self {
        Self {
            state: State::Stopped(Parts { reader, sink: None }),
            buffer: Arc::new(RollingBuffer::from_retention(retention)),
            errors: Arc::new(ErrorSlot::new()),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Record every decoded frame to `sink`.
    pub fn with_sink(mut self, sink: impl FrameSink + 'static) -> Self {
        if let State::Stopped(parts) = &mut self.state {
            parts.sink = Some(Box::new(sink));
        }
        self
    }

    /// Replace the frame sink. Only possible while stopped.
    pub fn set_sink(&mut self, sink: Option<Box<dyn FrameSink>>) -> Result<()> {
        match &mut self.state {
            State::Stopped(parts) => {
                parts.sink = sink;
                Ok(())
            }
            State::Lost => Err(AcquireError::SourceLost),
            _ => Err(AcquireError::AlreadyRunning),
        }
    }

    /// Launch the worker. Clears the buffer and any unreported failure.
    pub fn start(&mut self) -> Result<()> {
        let mut parts = match std::mem::replace(&mut self.state, State::Lost) {
            State::Stopped(parts) => parts,
            running @ (State::Running(_) | State::Failed(_)) => {
                self.state = running;
                return Err(AcquireError::AlreadyRunning);
            }
            State::Lost => return Err(AcquireError::SourceLost),
        };

        self.buffer.clear();
        self.errors.clear();
        self.cancel.store(false, Ordering::SeqCst);
        parts.reader.reset();

        let buffer = Arc::clone(&self.buffer);
        let errors = Arc::clone(&self.errors);
        let cancel = Arc::clone(&self.cancel);
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                let outcome =
                    panic::catch_unwind(AssertUnwindSafe(|| run(&mut parts, &buffer, &cancel)));
                let cause: BoxError = match outcome {
                    Ok(Ok(())) => {
                        debug!("reader thread exiting");
                        return parts;
                    }
                    Ok(Err(err)) => err.into(),
                    Err(payload) => panic_message(payload).into(),
                };
                error!(error = %cause, "reader thread stopped");
                errors.set(cause);
                parts
            })
            .map_err(AcquireError::Spawn)?;

        self.state = State::Running(handle);
        info!("acquisition started");
        Ok(())
    }

    /// Signal the worker to stop and wait for its current read to finish.
    pub fn stop(&mut self) -> Result<()> {
        let handle = match std::mem::replace(&mut self.state, State::Lost) {
            State::Running(handle) | State::Failed(handle) => handle,
            stopped @ State::Stopped(_) => {
                self.state = stopped;
                return Err(AcquireError::NotRunning);
            }
            State::Lost => return Err(AcquireError::NotRunning),
        };

        self.cancel.store(true, Ordering::SeqCst);
        match handle.join() {
            Ok(parts) => {
                self.state = State::Stopped(parts);
                info!("acquisition stopped");
                Ok(())
            }
            Err(_) => {
                error!("reader thread could not be joined");
                Err(AcquireError::SourceLost)
            }
        }
    }

    /// True while the worker thread is alive.
    pub fn is_running(&self) -> bool {
        matches!(&self.state, State::Running(handle) if !handle.is_finished())
    }

    /// Block until a frame is buffered or `timeout` elapses.
    pub fn wait(&mut self, timeout: Duration) -> Result<bool> {
        self.check_worker()?;
        Ok(self.buffer.wait(timeout))
    }

    /// The newest frame, if any.
    pub fn latest(&mut self, clear: bool) -> Result<Option<Frame>> {
        self.check_worker()?;
        match self.buffer.read_latest(clear) {
            Ok(frame) => Ok(Some(frame)),
            Err(AcquireError::EmptyBuffer) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Every buffered frame, oldest first.
    pub fn all(&mut self, clear: bool) -> Result<Vec<Frame>> {
        self.check_worker()?;
        Ok(self.buffer.read_all(clear))
    }

    /// Shared handle to the frame buffer.
    pub fn buffer(&self) -> Arc<RollingBuffer<Frame>> {
        Arc::clone(&self.buffer)
    }

    fn check_worker(&mut self) -> Result<()> {
        if matches!(self.state, State::Failed(_)) {
            return Err(AcquireError::ReaderStopped);
        }
        let Some(cause) = self.errors.take() else {
            return Ok(());
        };
        if matches!(self.state, State::Running(_)) {
            if let State::Running(handle) = std::mem::replace(&mut self.state, State::Lost) {
                self.state = State::Failed(handle);
            }
        }
        Err(AcquireError::AcquisitionFailed(cause))
    }
}

impl<S: ByteSource + 'static> Drop for Acquisition<S> {
    fn drop(&mut self) {
        if matches!(self.state, State::Running(_) | State::Failed(_)) {
            let _ = self.stop();
        }
    }
}

impl<S: ByteSource + 'static> std::fmt::Debug for Acquisition<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            State::Stopped(_) => "stopped",
            State::Running(_) => "running",
            State::Failed(_) => "failed",
            State::Lost => "lost",
        };
        f.debug_struct("Acquisition")
            .field("state", &state)
            .field("buffer", &self.buffer)
            .finish()
    }
}

fn run<S: ByteSource>(
    parts: &mut Parts<S>,
    buffer: &RollingBuffer<Frame>,
    cancel: &AtomicBool,
) -> std::result::Result<(), FrameError> {
    while !cancel.load(Ordering::SeqCst) {
        let Some(frame) = parts.reader.poll_frame()? else {
            continue;
        };
        if let Some(sink) = parts.sink.as_mut() {
            if let Err(err) = sink.record(&frame.raw, frame.timestamp) {
                warn!(error = %err, "failed to record raw frame");
            }
        }
        buffer.append(frame);
    }
    Ok(())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("reader thread panicked: {detail}")
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;

    use bm257s_frame::parse_hex_window;
    use bm257s_transport::{Result as TransportResult, TransportError};
    use parking_lot::Mutex;

    use super::*;
    use crate::sink::FrameLog;

    const VOLTS: &str = "02 1A 20 3C 47 50 6A 78 8F 9F A7 B0 C0 D0 E5";
    const OHMS: &str = "02 18 20 3e 4b 50 6a 7e 8b 9b ad b0 c4 d0 e1";

    enum Step {
        Bytes(Vec<u8>),
        Fail,
        Panic,
    }

    /// Plays a script, then idles like a serial port with nothing to say.
    struct Script(VecDeque<Step>);

    impl Script {
        fn frames(hexes: &[&str]) -> Self {
            Self(
                hexes
                    .iter()
                    .map(|hex| Step::Bytes(parse_hex_window(hex).unwrap().to_vec()))
                    .collect(),
            )
        }

        fn then(mut self, step: Step) -> Self {
            self.0.push_back(step);
            self
        }
    }

    impl ByteSource for Script {
        fn read_chunk(&mut self, max_len: usize) -> TransportResult<Vec<u8>> {
            match self.0.pop_front() {
                Some(Step::Bytes(mut bytes)) => {
                    if bytes.len() > max_len {
                        let rest = bytes.split_off(max_len);
                        self.0.push_front(Step::Bytes(rest));
                    }
                    Ok(bytes)
                }
                Some(Step::Fail) => Err(TransportError::Io(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "unplugged",
                ))),
                Some(Step::Panic) => panic!("driver bug"),
                None => {
                    thread::sleep(Duration::from_millis(5));
                    Ok(Vec::new())
                }
            }
        }
    }

    fn acquisition(script: Script, retention: Retention) -> Acquisition<Script> {
        Acquisition::new(FrameReader::new(script), retention)
    }

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn frames_arrive_in_order() {
        let mut acq = acquisition(Script::frames(&[VOLTS, OHMS, VOLTS]), Retention::Count(10));
        acq.start().unwrap();
        assert!(acq.wait(Duration::from_secs(5)).unwrap());

        let mut frames = Vec::new();
        for _ in 0..500 {
            frames.extend(acq.all(true).unwrap());
            if frames.len() == 3 {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
        acq.stop().unwrap();

        let hex: Vec<String> = frames.iter().map(|f| f.raw_hex()).collect();
        assert_eq!(hex, vec![VOLTS.to_lowercase(), OHMS.to_string(), VOLTS.to_lowercase()]);
    }

    #[test]
    fn latest_on_empty_buffer_is_none() {
        let mut acq = acquisition(Script(VecDeque::new()), Retention::default());
        assert!(acq.latest(false).unwrap().is_none());
        assert!(!acq.wait(Duration::from_millis(10)).unwrap());
    }

    #[test]
    fn start_and_stop_are_paired() {
        let mut acq = acquisition(Script(VecDeque::new()), Retention::default());
        assert!(matches!(acq.stop(), Err(AcquireError::NotRunning)));
        acq.start().unwrap();
        assert!(acq.is_running());
        assert!(matches!(acq.start(), Err(AcquireError::AlreadyRunning)));
        acq.stop().unwrap();
        assert!(!acq.is_running());
        acq.start().unwrap();
        acq.stop().unwrap();
    }

    #[test]
    fn restart_clears_buffer() {
        let mut acq = acquisition(Script::frames(&[VOLTS]), Retention::Count(4));
        acq.start().unwrap();
        assert!(acq.wait(Duration::from_secs(5)).unwrap());
        acq.stop().unwrap();
        assert!(acq.latest(false).unwrap().is_some());

        acq.start().unwrap();
        assert!(acq.latest(false).unwrap().is_none());
        acq.stop().unwrap();
    }

    #[test]
    fn source_failure_reported_once() {
        let script = Script::frames(&[VOLTS]).then(Step::Fail);
        let mut acq = acquisition(script, Retention::default());
        acq.start().unwrap();

        let mut failure = None;
        for _ in 0..500 {
            match acq.latest(false) {
                Err(err) => {
                    failure = Some(err);
                    break;
                }
                Ok(_) => thread::sleep(Duration::from_millis(2)),
            }
        }
        let failure = failure.expect("worker failure was never reported");
        assert!(matches!(failure, AcquireError::AcquisitionFailed(_)));
        assert!(failure.to_string().contains("unplugged"));

        assert!(matches!(acq.latest(false), Err(AcquireError::ReaderStopped)));
        assert!(matches!(acq.all(false), Err(AcquireError::ReaderStopped)));
        assert!(matches!(
            acq.wait(Duration::ZERO),
            Err(AcquireError::ReaderStopped)
        ));

        acq.stop().unwrap();
        acq.start().unwrap();
        assert!(acq.latest(false).is_ok());
        acq.stop().unwrap();
    }

    #[test]
    fn panic_in_source_is_captured() {
        let mut acq = acquisition(Script(VecDeque::from([Step::Panic])), Retention::default());
        acq.start().unwrap();

        let mut failure = None;
        for _ in 0..500 {
            if let Err(err) = acq.wait(Duration::from_millis(2)) {
                failure = Some(err);
                break;
            }
        }
        let failure = failure.expect("panic was never reported");
        assert!(failure.to_string().contains("driver bug"));

        // The reader survives the panic and can be restarted.
        acq.stop().unwrap();
        acq.start().unwrap();
        acq.stop().unwrap();
    }

    #[test]
    fn sink_records_every_frame() {
        let log = Shared::default();
        let mut acq = acquisition(Script::frames(&[VOLTS, OHMS]), Retention::Count(8))
            .with_sink(FrameLog::new(log.clone()));
        acq.start().unwrap();
        for _ in 0..500 {
            if acq.buffer().len() == 2 {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
        acq.stop().unwrap();

        let text = String::from_utf8(log.0.lock().clone()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().nth(1).unwrap().ends_with(OHMS));
    }

    #[test]
    fn sink_cannot_change_while_running() {
        let mut acq = acquisition(Script(VecDeque::new()), Retention::default());
        acq.start().unwrap();
        assert!(matches!(acq.set_sink(None), Err(AcquireError::AlreadyRunning)));
        acq.stop().unwrap();
        acq.set_sink(None).unwrap();
    }
}
