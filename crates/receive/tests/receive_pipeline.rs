use std::io::{self, Read};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use content::Parameters;
use http::Request;
use receive::{
    ApplicationCall, ByteReadChannel, DoubleReceive, InputStream, PartData, ReceiveConfig,
    ReceiveContext, ReceiveError, ReceivePhase, ReceivePipeline, ReceiveRequest, ReceiveStep,
    StepOutcome,
};
use tokio::io::{AsyncRead, ReadBuf};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn default_pipeline() -> Arc<ReceivePipeline> {
    Arc::new(ReceivePipeline::with_defaults(ReceiveConfig::default()))
}

fn call_with(content_type: &str, body: &'static [u8], pipeline: Arc<ReceivePipeline>) -> ApplicationCall {
    let request = Request::post("/submit")
        .header("content-type", content_type)
        .body(Bytes::from_static(body))
        .unwrap();
    ApplicationCall::from_request(request, pipeline)
}

/// Body source that counts how many bytes the pipeline pulled from it.
struct CountingReader {
    data: io::Cursor<&'static [u8]>,
    read: Arc<AtomicUsize>,
}

impl AsyncRead for CountingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut chunk = vec![0u8; buf.remaining()];
        let n = self.data.read(&mut chunk)?;
        self.read.fetch_add(n, Ordering::SeqCst);
        buf.put_slice(&chunk[..n]);
        Poll::Ready(Ok(()))
    }
}

fn counting_call(body: &'static [u8], pipeline: Arc<ReceivePipeline>) -> (ApplicationCall, Arc<AtomicUsize>) {
    let read = Arc::new(AtomicUsize::new(0));
    let reader = CountingReader {
        data: io::Cursor::new(body),
        read: Arc::clone(&read),
    };
    let (head, ()) = Request::post("/submit")
        .header("content-type", "text/plain")
        .body(())
        .unwrap()
        .into_parts();
    let call = ApplicationCall::new(head, ByteReadChannel::from_reader(reader), pipeline);
    (call, read)
}

#[derive(Debug, PartialEq)]
struct Order;

/// Parses a decimal body into a `u64`, for calls that ask for one.
struct ParseNumber;

#[async_trait]
impl ReceiveStep for ParseNumber {
    async fn process(
        &self,
        _context: &mut ReceiveContext<'_>,
        request: ReceiveRequest,
    ) -> Result<StepOutcome, ReceiveError> {
        if !request.type_info().is::<u64>() {
            return Ok(StepOutcome::Proceed(request));
        }
        let (type_info, channel) = match request.take_value::<ByteReadChannel>() {
            Ok(taken) => taken,
            Err(request) => return Ok(StepOutcome::Proceed(request)),
        };
        let bytes = channel.read_remaining(Some(32)).await?;
        let text = std::str::from_utf8(&bytes).map_err(|e| ReceiveError::bad_content("not text", e))?;
        let number: u64 = text
            .trim()
            .parse()
            .map_err(|e| ReceiveError::bad_content("not a number", e))?;
        Ok(StepOutcome::Finish(ReceiveRequest::new(type_info, Some(Box::new(number)), true)))
    }
}

/// Records whether the final candidate had the requested type.
struct Audit(Arc<Mutex<Vec<bool>>>);

#[async_trait]
impl ReceiveStep for Audit {
    async fn process(
        &self,
        _context: &mut ReceiveContext<'_>,
        request: ReceiveRequest,
    ) -> Result<StepOutcome, ReceiveError> {
        self.0.lock().unwrap().push(request.is_complete());
        Ok(StepOutcome::Proceed(request))
    }
}

// ---------------------------------------------------------------------------
// Single consumption
// ---------------------------------------------------------------------------

#[tokio::test]
async fn text_is_received_once() {
    let mut call = call_with("text/plain; charset=utf-8", b"hello", default_pipeline());

    assert_eq!(call.receive::<String>().await.unwrap(), "hello");
    let err = call.receive::<String>().await.unwrap_err();
    assert!(matches!(err, ReceiveError::AlreadyConsumed), "{err:?}");
}

#[tokio::test]
async fn nullable_form_returns_none_on_second_receive() {
    let mut call = call_with("text/plain", b"hello", default_pipeline());

    assert_eq!(call.receive_or_none::<String>().await.unwrap().as_deref(), Some("hello"));
    assert_eq!(call.receive_or_none::<String>().await.unwrap(), None);
}

#[tokio::test]
async fn convenience_accessors_share_the_guard() {
    let mut call = call_with("application/x-www-form-urlencoded", b"a=1", default_pipeline());

    let params = call.receive_parameters().await.unwrap();
    assert_eq!(params.get("a"), Some("1"));
    assert!(matches!(call.receive_text().await, Err(ReceiveError::AlreadyConsumed)));
    assert!(matches!(call.receive_channel().await, Err(ReceiveError::AlreadyConsumed)));
    assert!(matches!(call.receive_stream().await, Err(ReceiveError::AlreadyConsumed)));
}

#[tokio::test]
async fn failed_transformation_still_consumes_the_body() {
    let mut call = call_with("text/plain; charset=utf-8", b"\xff", default_pipeline());

    assert!(matches!(call.receive_text().await, Err(ReceiveError::BadContent { .. })));
    assert!(matches!(call.receive::<Bytes>().await, Err(ReceiveError::AlreadyConsumed)));
}

// ---------------------------------------------------------------------------
// Usage and transformation failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn receiving_the_pipeline_request_type_reads_nothing() {
    let (mut call, read) = counting_call(b"payload", default_pipeline());

    let err = call.receive::<ReceiveRequest>().await.unwrap_err();
    assert!(matches!(err, ReceiveError::Usage { .. }));
    assert_eq!(read.load(Ordering::SeqCst), 0);

    // The guard did not trip: the body is still available.
    assert_eq!(call.receive_text().await.unwrap(), "payload");
}

#[tokio::test]
async fn usage_error_propagates_from_nullable_form() {
    let mut call = call_with("text/plain", b"x", default_pipeline());
    assert!(matches!(
        call.receive_or_none::<ReceiveRequest>().await,
        Err(ReceiveError::Usage { .. })
    ));
}

#[tokio::test]
async fn unknown_type_cannot_be_transformed_and_body_is_unread() {
    let (mut call, read) = counting_call(b"{\"id\": 7}", default_pipeline());

    let err = call.receive::<Order>().await.unwrap_err();
    match err {
        ReceiveError::CannotTransform { type_info } => assert!(type_info.is::<Order>()),
        other => panic!("expected CannotTransform, got {other:?}"),
    }
    assert_eq!(read.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn nullable_form_swallows_cannot_transform() {
    let mut call = call_with("text/plain", b"x", default_pipeline());
    assert_eq!(call.receive_or_none::<Order>().await.unwrap(), None);
}

#[tokio::test]
async fn io_errors_propagate_from_nullable_form() {
    struct Reset;
    impl AsyncRead for Reset {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
        }
    }

    let (head, ()) = Request::post("/").body(()).unwrap().into_parts();
    let mut call = ApplicationCall::new(head, ByteReadChannel::from_reader(Reset), default_pipeline());
    assert!(matches!(call.receive_or_none::<String>().await, Err(ReceiveError::Io(_))));
}

#[tokio::test]
async fn payload_limit_propagates_from_nullable_form() {
    let pipeline = Arc::new(ReceivePipeline::with_defaults(ReceiveConfig {
        max_body_size: Some(2),
        ..ReceiveConfig::default()
    }));
    let mut call = call_with("text/plain", b"abc", pipeline);
    assert!(matches!(
        call.receive_or_none::<String>().await,
        Err(ReceiveError::PayloadTooLarge { limit: 2 })
    ));
}

// ---------------------------------------------------------------------------
// Pipeline composition
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_pipeline_only_yields_the_raw_channel() {
    let mut call = call_with("text/plain", b"raw", Arc::new(ReceivePipeline::new()));
    let channel = call.receive_channel().await.unwrap();
    assert_eq!(&channel.read_remaining(None).await.unwrap()[..], b"raw");

    let mut call = call_with("text/plain", b"raw", Arc::new(ReceivePipeline::new()));
    assert!(matches!(
        call.receive_text().await,
        Err(ReceiveError::CannotTransform { .. })
    ));
}

#[tokio::test]
async fn custom_steps_extend_the_transform_phase() {
    let audit = Arc::new(Mutex::new(Vec::new()));
    let mut pipeline = ReceivePipeline::with_defaults(ReceiveConfig::default());
    pipeline
        .intercept(ReceivePhase::Transform, ParseNumber)
        .intercept(ReceivePhase::After, Audit(Arc::clone(&audit)));
    let pipeline = Arc::new(pipeline);

    let mut call = call_with("text/plain", b" 42\n", Arc::clone(&pipeline));
    assert_eq!(call.receive::<u64>().await.unwrap(), 42);
    // ParseNumber finished the pipeline, so the After phase never ran.
    assert!(audit.lock().unwrap().is_empty());

    let mut call = call_with("text/plain", b"42", pipeline);
    assert_eq!(call.receive_text().await.unwrap(), "42");
    assert_eq!(*audit.lock().unwrap(), [true]);
}

#[tokio::test]
async fn stream_and_multipart_accessors() {
    let mut call = call_with("application/octet-stream", b"stream me", default_pipeline());
    let mut stream: InputStream = call.receive_stream().await.unwrap();
    let mut out = String::new();
    stream.read_to_string(&mut out).unwrap();
    assert_eq!(out, "stream me");

    let body: &'static [u8] = b"--sep\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nreport\r\n--sep--\r\n";
    let mut call = call_with("multipart/form-data; boundary=sep", body, default_pipeline());
    let mut multipart = call.receive_multipart().await.unwrap();
    match multipart.read_part() {
        Some(PartData::FormItem { name, value, .. }) => {
            assert_eq!(name.as_deref(), Some("title"));
            assert_eq!(value, "report");
        }
        other => panic!("unexpected part {other:?}"),
    }
}

#[tokio::test]
async fn parameters_need_a_form_content_type() {
    let mut call = call_with("text/plain", b"a=1", default_pipeline());
    assert!(matches!(
        call.receive::<Parameters>().await,
        Err(ReceiveError::CannotTransform { .. })
    ));
}

// ---------------------------------------------------------------------------
// DoubleReceive
// ---------------------------------------------------------------------------

fn double_receive_pipeline(step: DoubleReceive) -> Arc<ReceivePipeline> {
    let mut pipeline = ReceivePipeline::with_defaults(ReceiveConfig::default());
    pipeline.intercept(ReceivePhase::Before, step);
    Arc::new(pipeline)
}

#[tokio::test]
async fn double_receive_allows_repeated_and_retyped_reads() {
    let mut call = call_with(
        "application/x-www-form-urlencoded",
        b"name=ferry",
        double_receive_pipeline(DoubleReceive::new()),
    );

    assert_eq!(call.receive_text().await.unwrap(), "name=ferry");
    assert_eq!(call.receive_text().await.unwrap(), "name=ferry");
    let params = call.receive_parameters().await.unwrap();
    assert_eq!(params.get("name"), Some("ferry"));
    let bytes: Bytes = call.receive().await.unwrap();
    assert_eq!(&bytes[..], b"name=ferry");
}

#[tokio::test]
async fn double_receive_serves_fresh_channels() {
    let mut call = call_with("text/plain", b"abc", double_receive_pipeline(DoubleReceive::new()));

    let first = call.receive_channel().await.unwrap();
    let second = call.receive_channel().await.unwrap();
    assert_eq!(&first.read_remaining(None).await.unwrap()[..], b"abc");
    assert_eq!(&second.read_remaining(None).await.unwrap()[..], b"abc");
}

#[tokio::test]
async fn double_receive_limit_applies_to_the_cache() {
    let mut call = call_with(
        "text/plain",
        b"too long",
        double_receive_pipeline(DoubleReceive::new().with_limit(3)),
    );
    assert!(matches!(
        call.receive_text().await,
        Err(ReceiveError::PayloadTooLarge { limit: 3 })
    ));
    // The body was consumed by the failed attempt and nothing was cached.
    assert!(matches!(call.receive_text().await, Err(ReceiveError::AlreadyConsumed)));
}

#[tokio::test]
async fn double_receive_follows_the_pipeline_body_limit() {
    let mut pipeline = ReceivePipeline::with_defaults(ReceiveConfig {
        max_body_size: Some(4),
        ..ReceiveConfig::default()
    });
    pipeline.intercept(ReceivePhase::Before, DoubleReceive::new());
    let mut call = call_with("text/plain", b"0123456789", Arc::new(pipeline));

    assert!(matches!(
        call.receive_text().await,
        Err(ReceiveError::PayloadTooLarge { limit: 4 })
    ));
    assert!(matches!(call.receive_text().await, Err(ReceiveError::AlreadyConsumed)));
}
