use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bm257s::transport::{ByteSource, SerialConfig};
use bm257s::{Error, Multimeter, MultimeterConfig};
use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::cmd::{parse_duration, MonitorArgs};
use crate::exit::{meter_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT};
use crate::output::{print_readings, OutputFormat, Reading};

/// How often the loop checks for new frames and Ctrl-C.
const POLL: Duration = Duration::from_millis(100);

struct Watch {
    window: Option<Duration>,
    idle_timeout: Duration,
    count: Option<usize>,
}

/// Tracks how long the newest buffered frame has stayed the same.
///
/// Frames still held in an averaging window do not count as activity; only a
/// frame with a new timestamp resets the clock.
struct IdleWatch {
    newest: Option<DateTime<Local>>,
    since: Instant,
    limit: Duration,
}

impl IdleWatch {
    fn new(limit: Duration, now: Instant) -> Self {
        Self {
            newest: None,
            since: now,
            limit,
        }
    }

    /// Record the newest buffered frame; true once none arrived for `limit`.
    fn observe(&mut self, newest: Option<DateTime<Local>>, now: Instant) -> bool {
        if newest.is_some() && newest != self.newest {
            self.newest = newest;
            self.since = now;
        }
        now.saturating_duration_since(self.since) >= self.limit
    }
}

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let read_timeout = parse_duration(&args.read_timeout)?;
    let watch = Watch {
        window: args.window.as_deref().map(parse_duration).transpose()?,
        idle_timeout: parse_duration(&args.idle_timeout)?,
        count: args.count,
    };

    let serial = SerialConfig {
        read_timeout,
        ..SerialConfig::for_port(&args.port)
    };
    let config = MultimeterConfig {
        window: watch.window,
        log: args.log,
    };
    let mut meter =
        Multimeter::open(&serial, config).map_err(|err| meter_error("open failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    meter
        .start()
        .map_err(|err| meter_error("start failed", err))?;
    let outcome = watch_meter(&mut meter, &watch, &running, format);
    let closed = meter
        .close()
        .map_err(|err| meter_error("close failed", err));
    info!(port = %args.port, "monitor stopped");

    let code = outcome?;
    closed?;
    Ok(code)
}

/// Print readings until Ctrl-C, `count` readings, or an error.
///
/// With a window, each printed line is the mean of the frames received since
/// the previous line.
fn watch_meter<S: ByteSource + 'static>(
    meter: &mut Multimeter<S>,
    watch: &Watch,
    running: &AtomicBool,
    format: OutputFormat,
) -> CliResult<i32> {
    let mut printed = 0usize;
    let mut idle = IdleWatch::new(watch.idle_timeout, Instant::now());
    let mut next_report = Instant::now() + watch.window.unwrap_or_default();

    while running.load(Ordering::SeqCst) {
        let buffered = meter
            .wait(POLL)
            .map_err(|err| meter_error("read failed", err))?;
        if idle.observe(meter.last_frame_at(), Instant::now()) {
            return Err(CliError::new(
                TIMEOUT,
                format!("no frame received for {:?}", watch.idle_timeout),
            ));
        }
        if !buffered {
            continue;
        }

        let shown = match watch.window {
            Some(span) => {
                let now = Instant::now();
                if now < next_report {
                    thread::sleep(POLL.min(next_report - now));
                    continue;
                }
                next_report = now + span;
                match skip_bad_reading(meter.average(true))? {
                    Some(Some(avg)) => {
                        print_readings(&[Reading::averaged(&avg)], format);
                        true
                    }
                    _ => false,
                }
            }
            None => match skip_bad_reading(meter.read(true))? {
                Some(Some(reading)) => {
                    print_readings(&[Reading::single(&reading)], format);
                    true
                }
                _ => false,
            },
        };

        if shown {
            printed = printed.saturating_add(1);
            if watch.count.is_some_and(|count| printed >= count) {
                return Ok(SUCCESS);
            }
        }
    }

    Ok(SUCCESS)
}

/// A frame the parser rejects is logged and skipped; the meter shows such
/// displays briefly while switching modes.
fn skip_bad_reading<T>(result: bm257s::Result<T>) -> CliResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::Measure(err)) => {
            warn!(error = %err, "skipping unreadable display");
            Ok(None)
        }
        Err(err) => Err(meter_error("read failed", err)),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: Duration = Duration::from_secs(2);

    #[test]
    fn idle_without_any_frame() {
        let start = Instant::now();
        let mut idle = IdleWatch::new(LIMIT, start);
        assert!(!idle.observe(None, start + Duration::from_secs(1)));
        assert!(idle.observe(None, start + LIMIT));
    }

    #[test]
    fn unchanged_frame_does_not_reset_idle() {
        let start = Instant::now();
        let stamp = Local::now();
        let mut idle = IdleWatch::new(LIMIT, start);

        assert!(!idle.observe(Some(stamp), start + Duration::from_secs(1)));
        // The same frame sits in the window; only time since it arrived counts.
        assert!(!idle.observe(Some(stamp), start + Duration::from_secs(2)));
        assert!(idle.observe(Some(stamp), start + Duration::from_secs(3)));
    }

    #[test]
    fn new_frame_resets_idle() {
        let start = Instant::now();
        let stamp = Local::now();
        let mut idle = IdleWatch::new(LIMIT, start);

        idle.observe(Some(stamp), start);
        let later = stamp + chrono::Duration::milliseconds(500);
        assert!(!idle.observe(Some(later), start + Duration::from_millis(1900)));
        assert!(!idle.observe(Some(later), start + Duration::from_millis(3800)));
        assert!(idle.observe(Some(later), start + Duration::from_millis(3900)));
    }

    #[test]
    fn cleared_buffer_keeps_idle_clock() {
        let start = Instant::now();
        let stamp = Local::now();
        let mut idle = IdleWatch::new(LIMIT, start);

        idle.observe(Some(stamp), start);
        assert!(!idle.observe(None, start + Duration::from_secs(1)));
        assert!(idle.observe(None, start + LIMIT));
    }
}
