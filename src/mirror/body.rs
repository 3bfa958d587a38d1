use crate::error::{BoxError, Error};
use crate::mirror::observer::CopyObserver;
use bytes::{Buf, Bytes};
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

pin_project! {
    /// A response body echoing a request body.
    ///
    /// Either the whole body was already read into memory, or the request body
    /// is copied through a bounded buffer as the response is written.
    #[project = MirrorBodyProj]
    #[allow(missing_docs)]
    pub enum MirrorBody<B> {
        /// Body read in one go.
        Full {
            data: Option<Bytes>,
        },
        /// Body copied through a buffer of fixed size.
        Streamed {
            #[pin]
            inner: B,
            state: CopyState,
        },
    }
}

/// Buffer and counters of a streamed copy.
pub(crate) struct CopyState {
    buffer: Vec<u8>,
    input: Bytes,
    total: u64,
    done: bool,
    observer: Arc<dyn CopyObserver>,
}

impl CopyState {
    fn new(buffer_size: usize, observer: Arc<dyn CopyObserver>) -> Self {
        Self {
            buffer: vec![0u8; buffer_size],
            input: Bytes::new(),
            total: 0,
            done: false,
            observer,
        }
    }

    /// Copies at most one buffer of pending input through the buffer.
    ///
    /// The emitted chunk owns exactly the bytes read, so queued chunks never
    /// hold on to the buffer.
    fn read(&mut self) -> Bytes {
        let n = self.input.len().min(self.buffer.len());
        self.buffer[..n].copy_from_slice(&self.input[..n]);
        self.input.advance(n);

        self.total += n as u64;
        self.observer.on_read(n, self.total);

        Bytes::copy_from_slice(&self.buffer[..n])
    }

    /// Polls the inner body until there is a chunk to write.
    ///
    /// End of stream is the inner body returning `Poll::Ready(None)`.
    fn poll_copy<B>(
        &mut self,
        cx: &mut Context<'_>,
        mut inner: Pin<&mut B>,
    ) -> Poll<Option<Result<Frame<Bytes>, Error>>>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        loop {
            if self.done {
                return Poll::Ready(None);
            }

            if !self.input.is_empty() {
                return Poll::Ready(Some(Ok(Frame::data(self.read()))));
            }

            match inner.as_mut().poll_frame(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    self.done = true;
                    self.observer.on_complete(self.total);
                    tracing::info!(total = self.total, "finished mirroring request");
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Err(e))) => {
                    self.done = true;
                    return Poll::Ready(Some(Err(Error::from_body(e))));
                }
                Poll::Ready(Some(Ok(frame))) => {
                    // Only data is mirrored
                    if let Ok(mut data) = frame.into_data() {
                        self.input = data.copy_to_bytes(data.remaining());
                    }
                }
            }
        }
    }
}

impl<B> MirrorBody<B> {
    /// Creates a body holding data that was read in full.
    pub fn full(data: Bytes) -> Self {
        Self::Full { data: Some(data) }
    }

    /// Creates an empty body.
    pub fn empty() -> Self {
        Self::Full { data: None }
    }

    /// Creates a body copying `inner` through a buffer of `buffer_size` bytes.
    ///
    /// `buffer_size` must be positive.
    pub fn streamed(inner: B, buffer_size: usize, observer: Arc<dyn CopyObserver>) -> Self {
        debug_assert!(buffer_size > 0, "streamed copy needs a non-empty buffer");
        Self::Streamed {
            inner,
            state: CopyState::new(buffer_size.max(1), observer),
        }
    }
}

impl<B> Body for MirrorBody<B>
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
            MirrorBodyProj::Full { data } => {
                Poll::Ready(data.take().filter(|d| !d.is_empty()).map(|d| Ok(Frame::data(d))))
            }
            MirrorBodyProj::Streamed { inner, state } => state.poll_copy(cx, inner),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            MirrorBody::Full { data } => data.as_ref().is_none_or(|d| d.is_empty()),
            MirrorBody::Streamed { state, .. } => state.done,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            MirrorBody::Full { data } => {
                SizeHint::with_exact(data.as_ref().map_or(0, |d| d.len() as u64))
            }
            // Length is only known once the copy is complete
            MirrorBody::Streamed { .. } => SizeHint::default(),
        }
    }
}
