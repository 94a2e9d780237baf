//! A single request/response exchange as seen by application code.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use content::ContentType;
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri};

use crate::transform::request_content_type;
use crate::{Attributes, ByteReadChannel, CallId, ReceiveError, ReceivePipeline};

/// One incoming request plus the per-request state the receive accessors need.
///
/// The transport builds a call from the parsed request head and a body channel;
/// application code then uses the `receive*` accessors (see
/// [`ApplicationCall::receive`]) to materialize the body. All accessors take
/// `&mut self`, so receive calls on one request never overlap.
pub struct ApplicationCall {
    id: CallId,
    head: Parts,
    body: Option<ByteReadChannel>,
    attributes: Attributes,
    pipeline: Arc<ReceivePipeline>,
}

impl ApplicationCall {
    pub fn new(head: Parts, body: ByteReadChannel, pipeline: Arc<ReceivePipeline>) -> Self {
        Self {
            id: CallId::new_random(),
            head,
            body: Some(body),
            attributes: Attributes::new(),
            pipeline,
        }
    }

    /// Builds a call from a request whose body is already in memory.
    pub fn from_request(request: Request<Bytes>, pipeline: Arc<ReceivePipeline>) -> Self {
        let (head, body) = request.into_parts();
        Self::new(head, ByteReadChannel::from_bytes(body), pipeline)
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.head.method
    }

    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// The parsed `Content-Type` header. A malformed header is reported as
    /// [`ReceiveError::BadContent`].
    pub fn content_type(&self) -> Result<Option<ContentType>, ReceiveError> {
        request_content_type(&self.head.headers)
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    pub fn pipeline(&self) -> &Arc<ReceivePipeline> {
        &self.pipeline
    }

    /// Hands out the raw body channel; `None` once it has been taken.
    pub(crate) fn take_body(&mut self) -> Option<ByteReadChannel> {
        self.body.take()
    }

    /// Splits the borrows a pipeline run needs: the shared headers and the
    /// mutable attribute map.
    pub(crate) fn receive_parts(&mut self) -> (&HeaderMap, &mut Attributes) {
        (&self.head.headers, &mut self.attributes)
    }
}

impl fmt::Debug for ApplicationCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationCall")
            .field("id", &self.id)
            .field("method", &self.head.method)
            .field("uri", &self.head.uri)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}
