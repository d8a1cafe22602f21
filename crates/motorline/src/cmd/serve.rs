use std::fs::OpenOptions;
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use motorline_command::{AxisControl, Device, Dispatcher, Session};
use tracing::{debug, info, warn};

use crate::cmd::ServeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::sim::{SimConfig, SimDevice};

const READ_CHUNK_SIZE: usize = 256;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

enum Input {
    Chunk(Vec<u8>),
    Eof,
    Failed(std::io::Error),
}

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if args.checksum {
        config.dispatch.checksum_responses = true;
    }
    if let Some(axes) = args.axes {
        config.axis_count = axes;
    }

    let (source, sink): (Box<dyn Read + Send>, Box<dyn Write>) = match &args.device {
        Some(path) => {
            let context = format!("open {}", path.display());
            let device = OpenOptions::new()
                .read(true)
                .write(true)
                .open(path)
                .map_err(|err| io_error(&context, err))?;
            let reader = device.try_clone().map_err(|err| io_error(&context, err))?;
            (Box::new(reader), Box::new(device))
        }
        None => (Box::new(std::io::stdin()), Box::new(std::io::stdout())),
    };

    info!(
        axes = config.axis_count,
        checksum = config.dispatch.checksum_responses,
        max_line_length = config.frame.max_line_length,
        device = ?args.device,
        "serving simulated device"
    );

    let dispatcher = Dispatcher::with_config(SimDevice::new(&config), config.dispatch);
    let mut session = Session::with_frame_config(dispatcher, sink, config.frame.into());

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;
    let input = spawn_reader(source)?;

    let mut dispatched = 0usize;
    while running.load(Ordering::SeqCst) {
        match input.recv_timeout(POLL_INTERVAL) {
            Ok(Input::Chunk(chunk)) => {
                dispatched += session
                    .process_bytes(&chunk)
                    .map_err(|err| frame_error("write failed", err))?;
            }
            Ok(Input::Eof) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(Input::Failed(err)) => return Err(io_error("read failed", err)),
            Err(RecvTimeoutError::Timeout) => continue,
        }
    }

    let stats = session.stats();
    info!(
        lines = stats.lines,
        dispatched,
        resyncs = stats.resyncs,
        overflows = stats.overflows,
        "input closed"
    );
    for axis in session.dispatcher().device().axes() {
        debug!(
            axis = axis.index,
            pos = axis.pos_estimate(),
            vel = axis.vel_estimate(),
            watchdog_feeds = axis.watchdog_feeds,
            "axis final state"
        );
    }

    Ok(SUCCESS)
}

/// Blocking reads happen on their own thread so Ctrl-C is noticed between chunks.
fn spawn_reader(mut source: Box<dyn Read + Send>) -> CliResult<Receiver<Input>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("serial-rx".into())
        .spawn(move || {
            let mut buf = [0u8; READ_CHUNK_SIZE];
            loop {
                let message = match source.read(&mut buf) {
                    Ok(0) => Input::Eof,
                    Ok(n) => Input::Chunk(buf[..n].to_vec()),
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(err) => Input::Failed(err),
                };
                let done = !matches!(message, Input::Chunk(_));
                if tx.send(message).is_err() || done {
                    break;
                }
            }
        })
        .map_err(|err| io_error("spawn reader", err))?;
    Ok(rx)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        if running.swap(false, Ordering::SeqCst) {
            warn!("interrupt received, stopping");
        }
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
