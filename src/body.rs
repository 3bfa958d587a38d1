use crate::codec::Codec;
use crate::error::{BoxError, Error};
use bytes::{Buf, Bytes};
use compression_codecs::DecodeV2;
use compression_core::util::{PartialBuffer, WriteBuffer};
use http_body::{Body, Frame};
use pin_project_lite::pin_project;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

const OUTPUT_BUFFER_SIZE: usize = 8 * 1024; // 8KB output buffer

pin_project! {
    /// A request body that may be decompressed.
    ///
    /// This type wraps an inner body and either decodes it using the
    /// specified codec or passes it through unchanged.
    #[project = DecompressionBodyProj]
    #[allow(missing_docs)]
    pub enum DecompressionBody<B> {
        /// Compressed body being decoded.
        Decoded {
            #[pin]
            inner: B,
            state: DecodedBody,
        },
        /// Passthrough body without decoding.
        Passthrough {
            #[pin]
            inner: B,
        },
    }
}

/// State and buffers for an actively decoded body.
pub(crate) struct DecodedBody {
    codec: Codec,
    decoder: Box<dyn DecodeV2 + Send>,
    output_buffer: Vec<u8>,
    input: Bytes,
    received_input: bool,
    stream_ended: bool,
    state: DecodeState,
    pending_trailers: Option<http::HeaderMap>,
}

/// State machine for decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodeState {
    /// Reading compressed data from the inner body and decoding it.
    Reading,
    /// Draining the decoder after the inner body is done.
    Finishing,
    /// Emitting buffered trailers.
    Trailers,
    /// Decoding is complete.
    Done,
}

impl DecodedBody {
    fn new(codec: Codec) -> Self {
        Self {
            codec,
            decoder: codec.decoder(),
            output_buffer: vec![0u8; OUTPUT_BUFFER_SIZE],
            input: Bytes::new(),
            received_input: false,
            stream_ended: false,
            state: DecodeState::Reading,
            pending_trailers: None,
        }
    }

    /// Returns the current decoding state.
    pub(crate) fn state(&self) -> DecodeState {
        self.state
    }

    fn decode_error(&mut self, source: io::Error) -> Poll<Option<Result<Frame<Bytes>, Error>>> {
        self.state = DecodeState::Done;
        Poll::Ready(Some(Err(Error::Decode {
            encoding: self.codec.content_encoding(),
            source,
        })))
    }

    fn after_finish(&self) -> DecodeState {
        if self.pending_trailers.is_some() {
            DecodeState::Trailers
        } else {
            DecodeState::Done
        }
    }

    /// Polls the inner body and decodes data.
    fn poll_decoded<B>(
        &mut self,
        cx: &mut Context<'_>,
        mut inner: Pin<&mut B>,
    ) -> Poll<Option<Result<Frame<Bytes>, Error>>>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        loop {
            match self.state {
                DecodeState::Done => return Poll::Ready(None),

                DecodeState::Trailers => {
                    self.state = DecodeState::Done;
                    return match self.pending_trailers.take() {
                        Some(trailers) => Poll::Ready(Some(Ok(Frame::trailers(trailers)))),
                        None => Poll::Ready(None),
                    };
                }

                DecodeState::Finishing => {
                    // An empty body carries no compressed stream to drain
                    if self.stream_ended || !self.received_input {
                        self.state = self.after_finish();
                        continue;
                    }

                    // Drain output the decoder still holds
                    match self.decode_chunk() {
                        Ok(Some(data)) => return Poll::Ready(Some(Ok(Frame::data(data)))),
                        Ok(None) => continue,
                        Err(e) => return self.decode_error(e),
                    }
                }

                DecodeState::Reading => {
                    if !self.input.is_empty() {
                        if self.stream_ended {
                            // Trailing bytes after a complete stream are ignored
                            self.input.clear();
                            continue;
                        }
                        match self.decode_chunk() {
                            Ok(Some(data)) => return Poll::Ready(Some(Ok(Frame::data(data)))),
                            Ok(None) => continue,
                            Err(e) => return self.decode_error(e),
                        }
                    }

                    // Poll inner body for compressed data
                    match inner.as_mut().poll_frame(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(None) => {
                            self.state = DecodeState::Finishing;
                        }
                        Poll::Ready(Some(Err(e))) => {
                            self.state = DecodeState::Done;
                            return Poll::Ready(Some(Err(Error::from_body(e))));
                        }
                        Poll::Ready(Some(Ok(frame))) => match frame.into_data() {
                            Ok(mut data) => {
                                let len = data.remaining();
                                if len > 0 {
                                    self.received_input = true;
                                    self.input = data.copy_to_bytes(len);
                                }
                            }
                            Err(frame) => {
                                if let Ok(trailers) = frame.into_trailers() {
                                    // Buffer trailers and finish decoding first
                                    self.pending_trailers = Some(trailers);
                                    self.state = DecodeState::Finishing;
                                }
                            }
                        },
                    }
                }
            }
        }
    }

    /// Decodes buffered input into the output buffer.
    ///
    /// With no buffered input this drains output the decoder is still holding.
    /// Returns `None` when the decoder made progress without producing output.
    fn decode_chunk(&mut self) -> io::Result<Option<Bytes>> {
        let mut input_buf = PartialBuffer::new(&self.input[..]);
        let mut output = WriteBuffer::new_initialized(self.output_buffer.as_mut_slice());

        let done = self.decoder.decode(&mut input_buf, &mut output)?;
        let consumed = input_buf.written_len();
        let written = output.written_len();

        if done {
            self.stream_ended = true;
        } else if consumed == 0 && written == 0 {
            return Err(if self.input.is_empty() {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "compressed body ended before the end of the stream",
                )
            } else {
                io::Error::new(io::ErrorKind::InvalidData, "decoder made no progress")
            });
        }

        self.input.advance(consumed);

        if written > 0 {
            Ok(Some(Bytes::copy_from_slice(&self.output_buffer[..written])))
        } else {
            Ok(None)
        }
    }
}

impl<B> DecompressionBody<B> {
    /// Creates a body that decodes the inner body with the given codec.
    pub fn decoded(inner: B, codec: Codec) -> Self {
        Self::Decoded {
            inner,
            state: DecodedBody::new(codec),
        }
    }

    /// Creates a passthrough body without decoding.
    pub fn passthrough(inner: B) -> Self {
        Self::Passthrough { inner }
    }

    /// Returns the codec used to decode this body, if any.
    pub fn codec(&self) -> Option<Codec> {
        match self {
            DecompressionBody::Decoded { state, .. } => Some(state.codec),
            DecompressionBody::Passthrough { .. } => None,
        }
    }
}

impl<B> Body for DecompressionBody<B>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    type Data = Bytes;
    type Error = Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            DecompressionBodyProj::Passthrough { inner } => match inner.poll_frame(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Ready(Some(Ok(frame))) => {
                    let frame = frame.map_data(|mut data| data.copy_to_bytes(data.remaining()));
                    Poll::Ready(Some(Ok(frame)))
                }
                Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(Error::from_body(e)))),
            },
            DecompressionBodyProj::Decoded { inner, state } => state.poll_decoded(cx, inner),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            DecompressionBody::Passthrough { inner } => inner.is_end_stream(),
            DecompressionBody::Decoded { state, .. } => state.state() == DecodeState::Done,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            DecompressionBody::Passthrough { inner } => inner.size_hint(),
            // Decoded size is unknown
            DecompressionBody::Decoded { .. } => http_body::SizeHint::default(),
        }
    }
}
