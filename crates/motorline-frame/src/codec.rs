//! `tokio_util` codec adapter for async serial transports.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::assembler::{FrameAssembler, FrameConfig, FrameStats};
use crate::envelope::{encode_response, Response};
use crate::error::FrameError;
use crate::escape::escape_bytes;

/// Decodes command lines and encodes responses on a byte stream.
///
/// Decoding drives a [`FrameAssembler`], so framing state is kept across reads and
/// framing errors resynchronize instead of ending the stream.
#[derive(Debug, Default)]
pub struct LineCodec {
    assembler: FrameAssembler,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            assembler: FrameAssembler::with_config(config),
        }
    }

    pub fn stats(&self) -> FrameStats {
        self.assembler.stats()
    }
}

impl Decoder for LineCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut consumed = 0usize;
        let mut line = None;
        for &byte in src.iter() {
            consumed += 1;
            match self.assembler.push(byte) {
                Ok(Some(done)) => {
                    tracing::trace!(line = %escape_bytes(&done), "line decoded");
                    line = Some(done);
                    break;
                }
                Ok(None) => {}
                Err(err) => tracing::debug!(error = %err, "framing error, resynchronizing"),
            }
        }
        src.advance(consumed);
        Ok(line)
    }
}

impl Encoder<Response> for LineCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_response(&item, dst)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use tokio_util::codec::FramedRead;

    use super::*;

    #[test]
    fn decode_keeps_state_between_calls() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"\x01\x00p 0 "[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());

        buf.extend_from_slice(b"1.5\n\x01\x02hi");
        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.as_ref(), b"p 0 1.5\n");
        assert_eq!(buf.as_ref(), b"\x01\x02hi");

        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.as_ref(), b"hi");
        assert_eq!(codec.stats().lines, 2);
    }

    #[test]
    fn decode_skips_bad_length_frames() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"\x01\xffxx\x01\x01z"[..]);
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(line.as_ref(), b"z");
        assert_eq!(codec.stats().resyncs, 1);
    }

    #[test]
    fn encode_writes_envelope() {
        let mut codec = LineCodec::new();
        let mut dst = BytesMut::new();
        codec
            .encode(Response::text(&b"ok"[..]).with_checksum(true), &mut dst)
            .unwrap();
        assert_eq!(dst.as_ref(), b"\x01\x00ok*4\r\n");
    }

    #[tokio::test]
    async fn framed_read_yields_lines() {
        let wire: &[u8] = b"\x01\x00h\n\x01\x00i\n\x01\x03abc";
        let lines: Vec<Bytes> = FramedRead::new(wire, LineCodec::new())
            .map(|line| line.unwrap())
            .collect()
            .await;
        assert_eq!(
            lines,
            vec![
                Bytes::from_static(b"h\n"),
                Bytes::from_static(b"i\n"),
                Bytes::from_static(b"abc"),
            ]
        );
    }
}
