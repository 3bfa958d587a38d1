//! Helpers shared by the unit tests.

use crate::codec::Codec;
use bytes::Bytes;
use http_body::{Body, Frame};
use std::collections::VecDeque;
use std::io::Write;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

/// A test body that yields predefined frames.
pub(crate) struct TestBody {
    frames: VecDeque<Result<Frame<Bytes>, std::io::Error>>,
}

impl TestBody {
    pub(crate) fn new(frames: Vec<Frame<Bytes>>) -> Self {
        Self {
            frames: frames.into_iter().map(Ok).collect(),
        }
    }

    /// A body that yields `frames` and then fails.
    pub(crate) fn failing_after(frames: Vec<Frame<Bytes>>) -> Self {
        let mut body = Self::new(frames);
        body.frames
            .push_back(Err(std::io::Error::other("connection reset")));
        body
    }
}

impl Body for TestBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(self.frames.pop_front())
    }
}

pub(crate) fn poll_body<B: Body + Unpin>(body: &mut B) -> Option<Result<Frame<B::Data>, B::Error>> {
    let waker = std::task::Waker::noop();
    let mut cx = Context::from_waker(waker);
    match Pin::new(body).poll_frame(&mut cx) {
        Poll::Ready(result) => result,
        Poll::Pending => None,
    }
}

/// Compresses `payload` the way a client would before sending it.
pub(crate) fn compress(codec: Option<Codec>, payload: &[u8]) -> Vec<u8> {
    match codec {
        #[cfg(feature = "gzip")]
        Some(Codec::Gzip) => {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(payload).unwrap();
            encoder.finish().unwrap()
        }
        #[cfg(feature = "deflate")]
        Some(Codec::Deflate) => {
            let mut encoder =
                flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(payload).unwrap();
            encoder.finish().unwrap()
        }
        None => payload.to_vec(),
    }
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Runs `f` and returns everything it logged, formatted without colors.
pub(crate) fn capture_logs(f: impl FnOnce()) -> String {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, f);

    let logs = buffer.0.lock().unwrap();
    String::from_utf8_lossy(&logs).into_owned()
}
