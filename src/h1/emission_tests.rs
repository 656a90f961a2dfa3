use std::cell::Cell;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::lazy;
use http::StatusCode;

use crate::body::ByteSource;
use crate::config::ServiceConfig;
use crate::conn::{BufferedConnection, WriteFrame};
use crate::response::Response;
use crate::test::{TestConnection, TestSource};

use super::emission::{EmitOutcome, Emission};

fn ok_response() -> Response {
    Response::build(StatusCode::OK).finish().unwrap()
}

fn config(buffer: usize, throughput: u64, timeout: Duration) -> ServiceConfig {
    ServiceConfig::new(buffer, throughput, timeout, true)
}

/// Poll until ready; every poll must make progress against the mocks.
fn drive<S>(
    emission: &mut Emission<S, TestConnection>,
    cx: &mut Context<'_>,
) -> (TestConnection, EmitOutcome)
where
    S: ByteSource + Unpin,
{
    for _ in 0..1000 {
        if let Poll::Ready(out) = Pin::new(&mut *emission).poll(cx) {
            return out;
        }
    }
    panic!("emission stopped making progress");
}

const MINIMAL_HEAD: &[u8] = b"HTTP/1.1 200 OK\r\n\r\n";

fn wire_with(body: &[u8]) -> Vec<u8> {
    [MINIMAL_HEAD, body].concat()
}

#[actix_rt::test]
async fn minimal_200_ok() {
    lazy(|cx| {
        let mut emission = Emission::new(
            &ok_response(),
            (),
            TestConnection::new(),
            ServiceConfig::default(),
            false,
        );

        let (conn, outcome) = match Pin::new(&mut emission).poll(cx) {
            Poll::Ready(out) => out,
            Poll::Pending => panic!("minimal response did not finish in one poll"),
        };

        assert!(outcome.is_ok());
        assert!(!outcome.last);
        assert_eq!(outcome.body_len, 0);
        assert_eq!(conn.wire(), MINIMAL_HEAD);
        assert!(conn.plain_end());
    })
    .await;
}

#[actix_rt::test]
async fn fixed_length_body() {
    lazy(|cx| {
        let source = TestSource::sized(5).chunk("hello");
        let mut emission = Emission::new(
            &ok_response(),
            source,
            TestConnection::new(),
            ServiceConfig::default(),
            false,
        );

        let (conn, outcome) = drive(&mut emission, cx);

        assert!(outcome.is_ok());
        assert_eq!(outcome.body_len, 5);
        assert_eq!(conn.wire(), &wire_with(b"hello")[..]);
        assert!(conn.plain_end());
    })
    .await;
}

#[actix_rt::test]
async fn last_response_appends_terminators_in_order() {
    lazy(|cx| {
        let source = TestSource::sized(5).chunk("hello");
        let mut emission = Emission::new(
            &ok_response(),
            source,
            TestConnection::new(),
            ServiceConfig::default(),
            true,
        );

        let (conn, outcome) = drive(&mut emission, cx);

        assert!(outcome.is_ok());
        assert!(outcome.last);
        assert_eq!(conn.wire(), &wire_with(b"hello")[..]);
        assert!(conn.ends_with_terminators());
    })
    .await;
}

#[actix_rt::test]
async fn head_flushes_while_the_source_stalls() {
    lazy(|cx| {
        let source = TestSource::sized(5).stall().chunk("hello");
        let mut emission = Emission::new(
            &ok_response(),
            source,
            TestConnection::new(),
            ServiceConfig::default(),
            false,
        );

        // first poll parks on the read, but the head must already be out
        assert!(Pin::new(&mut emission).poll(cx).is_pending());
        assert_eq!(emission.conn_ref().wire(), MINIMAL_HEAD);

        let (conn, outcome) = drive(&mut emission, cx);

        assert!(outcome.is_ok());
        assert_eq!(conn.wire(), &wire_with(b"hello")[..]);
    })
    .await;
}

#[actix_rt::test]
async fn short_body_is_a_framing_violation() {
    lazy(|cx| {
        let source = TestSource::sized(5).chunk("hi");
        let mut emission = Emission::new(
            &ok_response(),
            source,
            TestConnection::new(),
            ServiceConfig::default(),
            false,
        );

        let (conn, outcome) = drive(&mut emission, cx);

        match outcome.body_error {
            Some(crate::error::BodyError::Short { sent, declared }) => {
                assert_eq!((sent, declared), (2, 5));
            }
            other => panic!("expected short body error, got {:?}", other),
        }
        assert!(outcome.last, "a corrupt stream forces close");
        assert_eq!(outcome.body_len, 2);

        // everything queued before the fault still reaches the client,
        // followed by the terminators
        assert_eq!(conn.wire(), &wire_with(b"hi")[..]);
        assert!(conn.ends_with_terminators());
    })
    .await;
}

#[actix_rt::test]
async fn overrun_sends_at_most_the_declared_length() {
    lazy(|cx| {
        let source = TestSource::sized(2).chunk("hello");
        let mut emission = Emission::new(
            &ok_response(),
            source,
            TestConnection::new(),
            ServiceConfig::default(),
            false,
        );

        let (conn, outcome) = drive(&mut emission, cx);

        assert!(matches!(
            outcome.body_error,
            Some(crate::error::BodyError::Overrun { declared: 2 })
        ));
        assert!(outcome.last);
        assert_eq!(outcome.body_len, 2);
        assert_eq!(conn.wire(), &wire_with(b"he")[..]);
        assert!(conn.ends_with_terminators());
    })
    .await;
}

#[actix_rt::test]
async fn unknown_length_ends_at_eof() {
    lazy(|cx| {
        let source = TestSource::streamed().chunk("a").chunk("bc");
        let mut emission = Emission::new(
            &ok_response(),
            source,
            TestConnection::new(),
            ServiceConfig::default(),
            false,
        );

        let (conn, outcome) = drive(&mut emission, cx);

        assert!(outcome.is_ok());
        assert_eq!(outcome.body_len, 3);
        assert_eq!(conn.wire(), &wire_with(b"abc")[..]);
    })
    .await;
}

#[actix_rt::test]
async fn empty_chunks_are_noops() {
    lazy(|cx| {
        let source = TestSource::sized(5).chunk("").chunk("hello");
        let mut emission = Emission::new(
            &ok_response(),
            source,
            TestConnection::new(),
            ServiceConfig::default(),
            false,
        );

        let (conn, outcome) = drive(&mut emission, cx);

        assert!(outcome.is_ok());
        assert_eq!(outcome.body_len, 5);
        assert_eq!(conn.wire(), &wire_with(b"hello")[..]);
    })
    .await;
}

#[actix_rt::test]
async fn zero_declared_length_reads_eof_and_finishes() {
    lazy(|cx| {
        let source = TestSource::sized(0);
        let mut emission = Emission::new(
            &ok_response(),
            source,
            TestConnection::new(),
            ServiceConfig::default(),
            false,
        );

        let (conn, outcome) = drive(&mut emission, cx);

        assert!(outcome.is_ok());
        assert_eq!(outcome.body_len, 0);
        assert_eq!(conn.wire(), MINIMAL_HEAD);
    })
    .await;
}

#[actix_rt::test]
async fn benign_source_error_flushes_queued_bytes() {
    lazy(|cx| {
        let source = TestSource::streamed()
            .chunk("partial")
            .error(io::Error::new(io::ErrorKind::ConnectionAborted, "backend"));
        let mut emission = Emission::new(
            &ok_response(),
            source,
            TestConnection::new(),
            ServiceConfig::default(),
            false,
        );

        let (conn, outcome) = drive(&mut emission, cx);

        assert!(matches!(
            outcome.body_error,
            Some(crate::error::BodyError::Stream(_))
        ));
        assert!(outcome.last);
        assert_eq!(conn.wire(), &wire_with(b"partial")[..]);
        assert!(conn.ends_with_terminators());
    })
    .await;
}

#[actix_rt::test]
async fn fatal_source_error_aborts_without_flush() {
    lazy(|cx| {
        let source = TestSource::streamed().chunk("partial").error("handler bug");
        let mut emission = Emission::new(
            &ok_response(),
            source,
            TestConnection::new(),
            ServiceConfig::default(),
            false,
        );

        let (conn, outcome) = drive(&mut emission, cx);

        assert!(matches!(
            outcome.body_error,
            Some(crate::error::BodyError::Fatal(_))
        ));
        assert!(outcome.last);

        // nothing was ever driven into the transport
        assert!(conn.wire().is_empty());
        assert!(conn.plain_end());
    })
    .await;
}

#[actix_rt::test]
async fn sink_error_ends_the_emission() {
    lazy(|cx| {
        let source = TestSource::sized(5).chunk("hello");
        let conn = TestConnection::new()
            .fail_next(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"));
        let mut emission = Emission::new(
            &ok_response(),
            source,
            conn,
            ServiceConfig::default(),
            false,
        );

        let (_conn, outcome) = drive(&mut emission, cx);

        assert!(outcome.body_error.is_none());
        let err = outcome.conn_error.unwrap();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(outcome.last);
    })
    .await;
}

#[actix_rt::test]
async fn body_and_sink_errors_are_both_reported() {
    lazy(|cx| {
        let source = TestSource::sized(5).chunk("hi");
        let conn =
            TestConnection::new().fail_next(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        let mut emission = Emission::new(
            &ok_response(),
            source,
            conn,
            ServiceConfig::default(),
            false,
        );

        let (_conn, outcome) = drive(&mut emission, cx);

        assert!(matches!(
            outcome.body_error,
            Some(crate::error::BodyError::Short { .. })
        ));
        assert!(outcome.conn_error.is_some());
        assert!(outcome.last);
    })
    .await;
}

#[actix_rt::test]
async fn source_is_closed_on_every_path() {
    lazy(|cx| {
        // clean end
        let closed = Rc::new(Cell::new(false));
        let source = TestSource::sized(5).chunk("hello").on_close(closed.clone());
        let mut emission = Emission::new(
            &ok_response(),
            source,
            TestConnection::new(),
            ServiceConfig::default(),
            false,
        );
        drive(&mut emission, cx);
        assert!(closed.get());

        // framing violation
        let closed = Rc::new(Cell::new(false));
        let source = TestSource::sized(5).chunk("hi").on_close(closed.clone());
        let mut emission = Emission::new(
            &ok_response(),
            source,
            TestConnection::new(),
            ServiceConfig::default(),
            false,
        );
        drive(&mut emission, cx);
        assert!(closed.get());

        // fatal source error
        let closed = Rc::new(Cell::new(false));
        let source = TestSource::streamed().error("bug").on_close(closed.clone());
        let mut emission = Emission::new(
            &ok_response(),
            source,
            TestConnection::new(),
            ServiceConfig::default(),
            false,
        );
        drive(&mut emission, cx);
        assert!(closed.get());

        // connection failure
        let closed = Rc::new(Cell::new(false));
        let source = TestSource::sized(5).chunk("hello").on_close(closed.clone());
        let conn = TestConnection::new().fail_next(io::Error::new(io::ErrorKind::BrokenPipe, ""));
        let mut emission = Emission::new(
            &ok_response(),
            source,
            conn,
            ServiceConfig::default(),
            false,
        );
        drive(&mut emission, cx);
        assert!(closed.get());
    })
    .await;
}

#[actix_rt::test]
async fn drains_at_the_high_watermark() {
    lazy(|cx| {
        let source = TestSource::streamed()
            .chunk("aaaaaaaa")
            .chunk("bbbbbbbb")
            .chunk("cccccccc")
            .chunk("dddddddd");
        // tiny watermark, congested peer: the pipeline has to alternate
        // between reading and draining
        let conn = TestConnection::with_budget(4);
        let mut emission = Emission::new(
            &ok_response(),
            source,
            conn,
            config(8, 0, Duration::from_secs(30)),
            false,
        );

        let (conn, outcome) = drive(&mut emission, cx);

        assert!(outcome.is_ok());
        assert_eq!(outcome.body_len, 32);
        assert_eq!(
            conn.wire(),
            &wire_with(b"aaaaaaaabbbbbbbbccccccccdddddddd")[..]
        );
    })
    .await;
}

#[actix_rt::test]
async fn write_timeout_drops_the_connection() {
    tokio::time::pause();

    let source = TestSource::sized(5).stall().stall().stall();
    let conn = TestConnection::with_budget(0);
    let mut emission = Emission::new(
        &ok_response(),
        source,
        conn,
        config(16 * 1024, 0, Duration::from_secs(1)),
        false,
    );

    // parks on the stalled read with the head stuck in the queue
    lazy(|cx| assert!(Pin::new(&mut emission).poll(cx).is_pending())).await;

    tokio::time::advance(Duration::from_millis(1100)).await;

    lazy(|cx| {
        let (conn, outcome) = drive(&mut emission, cx);
        let err = outcome.conn_error.unwrap();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert_eq!(err.to_string(), "write timeout");
        assert!(outcome.last);
        assert!(conn.wire().is_empty());
    })
    .await;
}

#[actix_rt::test]
async fn slow_client_is_dropped_after_the_warmup() {
    tokio::time::pause();

    let source = TestSource::sized(100_000).chunk(Bytes::from(vec![b'x'; 100_000]));
    let conn = TestConnection::with_budget(10);
    let mut emission = Emission::new(
        &ok_response(),
        source,
        conn,
        config(16 * 1024, 1024, Duration::ZERO),
        false,
    );

    // inside the warmup nothing fires
    lazy(|cx| assert!(Pin::new(&mut emission).poll(cx).is_pending())).await;

    tokio::time::advance(Duration::from_secs(11)).await;

    lazy(|cx| {
        let (_conn, outcome) = drive(&mut emission, cx);
        let err = outcome.conn_error.unwrap();
        assert_eq!(err.to_string(), "client too slow");
        assert!(outcome.last);
    })
    .await;
}

#[actix_rt::test]
async fn emits_over_a_buffered_connection() {
    let res = ok_response();
    let source = Bytes::from_static(b"hello");
    let conn = BufferedConnection::new(Vec::new());

    let (conn, outcome) =
        Emission::new(&res, source, conn, ServiceConfig::default(), true).await;

    assert!(outcome.is_ok());
    assert!(outcome.last);
    assert_eq!(conn.into_inner(), wire_with(b"hello"));
}

#[actix_rt::test]
async fn frames_stay_in_fifo_order() {
    lazy(|cx| {
        let source = TestSource::streamed().chunk("one").chunk("two");
        let mut emission = Emission::new(
            &ok_response(),
            source,
            TestConnection::new(),
            ServiceConfig::default(),
            true,
        );

        let (conn, outcome) = drive(&mut emission, cx);
        assert!(outcome.is_ok());

        let data_frames: Vec<_> = conn
            .frames
            .iter()
            .filter_map(|f| match f {
                WriteFrame::Data(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(data_frames.len(), 3);
        assert_eq!(&data_frames[1][..], b"one");
        assert_eq!(&data_frames[2][..], b"two");
        assert_eq!(
            conn.frames[conn.frames.len() - 2..],
            [WriteFrame::CloseNotify, WriteFrame::Fin]
        );
    })
    .await;
}
