use crate::error::{BoxError, Error};
use crate::mirror::body::MirrorBody;
use crate::mirror::observer::CopyObserver;
use http::{Response, response};
use http_body::Body;
use http_body_util::combinators::Collect;
use pin_project_lite::pin_project;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

pin_project! {
    /// Future for mirror service responses.
    #[project = MirrorFutureProj]
    #[allow(missing_docs)]
    pub enum MirrorFuture<B: Body> {
        /// Reading the whole request body before responding.
        Collecting {
            #[pin]
            collect: Collect<B>,
            head: Option<response::Parts>,
            observer: Arc<dyn CopyObserver>,
        },
        /// The response is ready, its body streams the request body.
        Ready {
            response: Option<Response<MirrorBody<B>>>,
        },
    }
}

impl<B: Body> MirrorFuture<B> {
    pub(crate) fn collecting(
        collect: Collect<B>,
        head: response::Parts,
        observer: Arc<dyn CopyObserver>,
    ) -> Self {
        Self::Collecting {
            collect,
            head: Some(head),
            observer,
        }
    }

    pub(crate) fn ready(response: Response<MirrorBody<B>>) -> Self {
        Self::Ready {
            response: Some(response),
        }
    }
}

impl<B> Future for MirrorFuture<B>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    type Output = Result<Response<MirrorBody<B>>, Infallible>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            MirrorFutureProj::Ready { response } => Poll::Ready(Ok(response
                .take()
                .expect("MirrorFuture polled after completion"))),
            MirrorFutureProj::Collecting {
                collect,
                head,
                observer,
            } => {
                let collected = ready!(collect.poll(cx));
                let head = head.take().expect("MirrorFuture polled after completion");

                let response = match collected {
                    Ok(collected) => {
                        let data = collected.to_bytes();
                        let total = data.len() as u64;
                        observer.on_read(data.len(), total);
                        observer.on_complete(total);
                        tracing::info!(total, "finished mirroring request");
                        Response::from_parts(head, MirrorBody::full(data))
                    }
                    Err(e) => error_response(head, Error::from_body(e)),
                };
                Poll::Ready(Ok(response))
            }
        }
    }
}

/// Replaces the mirrored response with an empty error response.
fn error_response<B>(mut head: response::Parts, err: Error) -> Response<MirrorBody<B>> {
    tracing::warn!(error = %err, "failed to read request body");

    head.status = err.status_code();
    head.headers.clear();
    Response::from_parts(head, MirrorBody::empty())
}
