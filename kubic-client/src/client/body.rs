// Adapts an http_body::Body into a Stream of its data frames so differing
// middleware body types can be funneled back into hyper::Body.
use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::Stream;
use http_body::Body as HttpBody;

pub(crate) trait BodyStreamExt: HttpBody + Sized {
    fn into_stream(self) -> BodyDataStream<Self> {
        BodyDataStream { body: self }
    }
}

impl<B: HttpBody> BodyStreamExt for B {}

pub(crate) struct BodyDataStream<B> {
    body: B,
}

impl<B> Stream for BodyDataStream<B>
where
    B: HttpBody + Unpin,
{
    type Item = Result<B::Data, B::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().body).poll_data(cx)
    }
}
