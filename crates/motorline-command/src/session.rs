use std::collections::VecDeque;
use std::io::Write;

use bytes::Bytes;
use motorline_frame::{escape_bytes, FrameAssembler, FrameConfig, FrameStats, ResponseWriter};
use tracing::trace;

use crate::device::Device;
use crate::dispatcher::Dispatcher;

/// One protocol stream: assembler, dispatcher, and response sink.
///
/// Owns the framing state explicitly, so two streams never share a line buffer.
pub struct Session<D, W> {
    assembler: FrameAssembler,
    dispatcher: Dispatcher<D>,
    writer: ResponseWriter<W>,
    pending: VecDeque<Bytes>,
}

impl<D: Device, W: Write> Session<D, W> {
    pub fn new(dispatcher: Dispatcher<D>, sink: W) -> Self {
        Self::with_frame_config(dispatcher, sink, FrameConfig::default())
    }

    pub fn with_frame_config(dispatcher: Dispatcher<D>, sink: W, config: FrameConfig) -> Self {
        Self {
            assembler: FrameAssembler::with_config(config),
            dispatcher,
            writer: ResponseWriter::new(sink),
            pending: VecDeque::new(),
        }
    }

    /// Feed a chunk of raw input, dispatch every line it completes, and write the
    /// responses in order.
    ///
    /// Returns the number of lines dispatched. Only sink errors are returned; framing
    /// errors are absorbed by the assembler. When a write fails, the lines after the
    /// failing one stay queued and are dispatched first on the next call.
    pub fn process_bytes(&mut self, chunk: &[u8]) -> motorline_frame::Result<usize> {
        self.pending.extend(self.assembler.feed(chunk));

        let mut dispatched = 0;
        while let Some(line) = self.pending.pop_front() {
            let responses = self.dispatcher.dispatch(&line);
            dispatched += 1;
            trace!(
                line = %escape_bytes(&line),
                responses = responses.len(),
                "line handled"
            );
            self.writer.write_all(&responses)?;
        }
        Ok(dispatched)
    }

    /// Complete lines still waiting for dispatch after a failed write.
    pub fn pending_lines(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> FrameStats {
        self.assembler.stats()
    }

    pub fn dispatcher(&self) -> &Dispatcher<D> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<D> {
        &mut self.dispatcher
    }

    pub fn sink(&self) -> &W {
        self.writer.get_ref()
    }

    /// Discard any partial line and return to idle. Queued complete lines are kept.
    pub fn reset(&mut self) {
        self.assembler.reset();
    }

    pub fn into_parts(self) -> (Dispatcher<D>, W) {
        (self.dispatcher, self.writer.into_inner())
    }
}
