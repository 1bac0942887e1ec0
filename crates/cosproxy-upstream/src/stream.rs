use std::io;

use bytes::BytesMut;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use cosproxy_protocol::cosine::{FinishEvent, StreamEvent, decode_line};

use crate::client::ByteStream;

const EVENT_BUFFER: usize = 100;
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Runs the line decoder over `body` in a dedicated task and hands decoded
/// events to the consumer through a bounded channel.
///
/// Events arrive in the exact order their lines were read. A transport error
/// is delivered at most once on the second channel, after every event decoded
/// before it. When the consumer drops its receiver the producer stops even
/// while parked on a read, which releases the upstream body mid-stream. A
/// single line longer than `MAX_LINE_BYTES` ends the stream with an error.
pub fn decode_stream(body: ByteStream) -> (mpsc::Receiver<StreamEvent>, mpsc::Receiver<io::Error>) {
    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
    let (err_tx, err_rx) = mpsc::channel(1);

    tokio::spawn(async move {
        let mut body = body;
        let mut buf = BytesMut::new();

        loop {
            let chunk = tokio::select! {
                _ = event_tx.closed() => return,
                chunk = body.next() => chunk,
            };
            let chunk = match chunk {
                Some(Ok(chunk)) => chunk,
                Some(Err(err)) => {
                    let _ = err_tx.send(err).await;
                    return;
                }
                None => break,
            };
            buf.extend_from_slice(&chunk);

            while let Some(pos) = buf.iter().position(|&byte| byte == b'\n') {
                let line = buf.split_to(pos + 1);
                if !forward_line(&line[..pos], &event_tx).await {
                    return;
                }
            }

            if buf.len() > MAX_LINE_BYTES {
                let err = io::Error::new(io::ErrorKind::InvalidData, "stream line exceeds 64KiB");
                let _ = err_tx.send(err).await;
                return;
            }
        }

        // A final line without a trailing newline still counts.
        if !buf.is_empty() {
            forward_line(&buf, &event_tx).await;
        }
    });

    (event_rx, err_rx)
}

async fn forward_line(raw: &[u8], event_tx: &mpsc::Sender<StreamEvent>) -> bool {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches('\r');
    if line.is_empty() {
        return !event_tx.is_closed();
    }

    match decode_line(line) {
        StreamEvent::Ignored => !event_tx.is_closed(),
        event => event_tx.send(event).await.is_ok(),
    }
}

/// Aggregate mode: drains the whole stream, concatenating content fragments
/// in arrival order and keeping the last finish event.
pub async fn collect_response(
    body: ByteStream,
) -> Result<(String, Option<FinishEvent>), io::Error> {
    let (mut events, mut errors) = decode_stream(body);

    let mut content = String::new();
    let mut finish = None;

    while let Some(event) = events.recv().await {
        match event {
            StreamEvent::Content(fragment) => content.push_str(&fragment),
            StreamEvent::Finish(event) => finish = Some(event),
            StreamEvent::Ignored => {}
        }
    }

    if let Some(err) = errors.recv().await {
        return Err(err);
    }

    Ok((content, finish))
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::task::{Context, Poll};
    use std::time::Duration;

    use bytes::Bytes;
    use futures_util::{Stream, StreamExt, stream};

    use super::*;

    /// One line, then stalls forever; flags when the reader lets go of it.
    struct StallingBody {
        sent: bool,
        released: Arc<AtomicBool>,
    }

    impl Stream for StallingBody {
        type Item = Result<Bytes, io::Error>;

        fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            if self.sent {
                Poll::Pending
            } else {
                self.sent = true;
                Poll::Ready(Some(Ok(Bytes::from_static(b"0:\"first\"\n"))))
            }
        }
    }

    impl Drop for StallingBody {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn ok_body(chunks: &'static [&'static str]) -> ByteStream {
        stream::iter(chunks.iter().map(|chunk| Ok(Bytes::from_static(chunk.as_bytes())))).boxed()
    }

    #[tokio::test]
    async fn aggregate_concatenates_content_and_keeps_last_finish() {
        let body = ok_body(&["0:\"Hi\"\n", "0:\" there\"\n", "e:{\"finishReason\":\"stop\"}\n"]);

        let (content, finish) = collect_response(body).await.unwrap();
        assert_eq!(content, "Hi there");
        assert_eq!(finish.unwrap().finish_reason, "stop");
    }

    #[tokio::test]
    async fn lines_split_across_chunks_are_reassembled() {
        let body = ok_body(&["0:\"he", "llo\"\n0:\"wo", "rld\"\n"]);

        let (content, finish) = collect_response(body).await.unwrap();
        assert_eq!(content, "helloworld");
        assert!(finish.is_none());
    }

    #[tokio::test]
    async fn push_mode_preserves_arrival_order() {
        let body = ok_body(&[
            "0:\"a\"\n",
            "2:{\"ignored\":true}\n",
            "\n",
            "0:\"b\"\n",
            "e:{\"finishReason\":\"length\"}\n",
        ]);

        let (mut events, _errors) = decode_stream(body);
        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            seen.push(event);
        }

        assert_eq!(
            seen,
            vec![
                StreamEvent::Content("a".to_string()),
                StreamEvent::Content("b".to_string()),
                StreamEvent::Finish(FinishEvent {
                    finish_reason: "length".to_string(),
                    ..FinishEvent::default()
                }),
            ]
        );
    }

    #[tokio::test]
    async fn trailing_line_without_newline_is_decoded() {
        let body = ok_body(&["0:\"tail\""]);

        let (content, _) = collect_response(body).await.unwrap();
        assert_eq!(content, "tail");
    }

    #[tokio::test]
    async fn transport_error_is_reported_once_after_decoded_events() {
        let chunks: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"0:\"partial\"\n")),
            Err(io::Error::other("connection reset")),
        ];
        let body = stream::iter(chunks).boxed();

        let (mut events, mut errors) = decode_stream(body);
        assert_eq!(
            events.recv().await,
            Some(StreamEvent::Content("partial".to_string()))
        );
        assert!(events.recv().await.is_none());

        let err = errors.recv().await.unwrap();
        assert_eq!(err.to_string(), "connection reset");
        assert!(errors.recv().await.is_none());
    }

    #[tokio::test]
    async fn aggregate_surfaces_transport_errors() {
        let chunks: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"0:\"lost\"\n")),
            Err(io::Error::other("broken pipe")),
        ];
        let body = stream::iter(chunks).boxed();

        let err = collect_response(body).await.unwrap_err();
        assert_eq!(err.to_string(), "broken pipe");
    }

    #[tokio::test]
    async fn dropping_the_consumer_stops_the_producer() {
        let lines: Vec<Result<Bytes, io::Error>> = (0..1000)
            .map(|i| Ok(Bytes::from(format!("0:\"chunk {i}\"\n"))))
            .collect();
        let body = stream::iter(lines).boxed();

        let (mut events, _errors) = decode_stream(body);
        assert!(events.recv().await.is_some());
        drop(events);

        // Give the producer a chance to observe the closed channel; nothing
        // to assert beyond not hanging.
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn dropping_the_consumer_releases_a_stalled_body() {
        let released = Arc::new(AtomicBool::new(false));
        let body = StallingBody {
            sent: false,
            released: released.clone(),
        }
        .boxed();

        let (mut events, errors) = decode_stream(body);
        assert_eq!(
            events.recv().await,
            Some(StreamEvent::Content("first".to_string()))
        );

        drop(events);
        drop(errors);

        // The producer is parked on a read that never completes; closing the
        // event channel must still wake it and drop the body.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        while !released.load(Ordering::SeqCst) {
            assert!(tokio::time::Instant::now() < deadline, "body never released");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn oversized_line_without_newline_is_an_error() {
        let line = format!("0:\"{}\"", "x".repeat(MAX_LINE_BYTES + 1));
        let chunks: Vec<Result<Bytes, io::Error>> = vec![Ok(Bytes::from(line))];
        let body = stream::iter(chunks).boxed();

        let err = collect_response(body).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
