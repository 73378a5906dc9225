//! Reader and writer tasks for one client connection.
//!
//! The reader turns frames into [`Event`]s for the arbiter; the writer
//! drains the connection's bounded outbound queue. Neither touches server
//! state.

use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::ipc::{read_frame, write_frame, ClientMessage, ServerMessage, MAX_CLIENT_FRAME};
use crate::state::{ConnId, Event};

/// Starts both tasks for an accepted stream. Returns the writer task, which
/// ends once the outbound queue is closed and flushed.
pub fn spawn_connection<S>(
    conn: ConnId,
    stream: S,
    outbound: mpsc::Receiver<ServerMessage>,
    events: mpsc::Sender<Event>,
) -> JoinHandle<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    tokio::spawn(read_loop(conn, read_half, events));
    tokio::spawn(write_loop(conn, write_half, outbound))
}

async fn read_loop<R>(conn: ConnId, reader: R, events: mpsc::Sender<Event>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let error = loop {
        match read_frame::<_, ClientMessage>(&mut reader, MAX_CLIENT_FRAME).await {
            Ok(Some(message)) => {
                trace!("connection {conn} sent {message:?}");
                if events.send(Event::Message { conn, message }).await.is_err() {
                    return;
                }
            }
            Ok(None) => break None,
            Err(e) => break Some(e),
        }
    };
    let _ = events.send(Event::Disconnected { conn, error }).await;
}

async fn write_loop<W>(conn: ConnId, mut writer: W, mut outbound: mpsc::Receiver<ServerMessage>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outbound.recv().await {
        if let Err(e) = write_frame(&mut writer, &message).await {
            debug!("connection {conn} write failed: {e}");
            return;
        }
    }
    // queue closed: detached or server stopping
    let _ = writer.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::{encode_frame, ProtocolError};
    use pretty_assertions::assert_eq;
    use tokio::io::AsyncWriteExt;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn test_truncated_frame_disconnects() {
        block_on(async {
            let (mut client, server) = tokio::io::duplex(4096);
            let (events_tx, mut events) = mpsc::channel(16);
            let (_out_tx, out_rx) = mpsc::channel(4);
            spawn_connection(7, server, out_rx, events_tx);

            let frame = encode_frame(&ClientMessage::Resize { rows: 30, cols: 100 }).unwrap();
            client.write_all(&frame).await.unwrap();
            client.write_all(br#"{"type":"Inp"#).await.unwrap();
            drop(client);

            match events.recv().await {
                Some(Event::Message { conn, message }) => {
                    assert_eq!(conn, 7);
                    assert_eq!(message, ClientMessage::Resize { rows: 30, cols: 100 });
                }
                other => panic!("unexpected: {other:?}"),
            }
            match events.recv().await {
                Some(Event::Disconnected { conn: 7, error }) => {
                    assert!(matches!(error, Some(ProtocolError::Truncated)));
                }
                other => panic!("unexpected: {other:?}"),
            }
        });
    }

    #[test]
    fn test_writer_flushes_then_closes() {
        block_on(async {
            let (client, server) = tokio::io::duplex(4096);
            let (events_tx, _events) = mpsc::channel(16);
            let (out_tx, out_rx) = mpsc::channel(4);
            let writer = spawn_connection(1, server, out_rx, events_tx);

            out_tx
                .send(ServerMessage::Detached {
                    reason: "detached".to_string(),
                })
                .await
                .unwrap();
            drop(out_tx);

            let mut reader = BufReader::new(client);
            let first: Option<ServerMessage> = read_frame(&mut reader, 1024).await.unwrap();
            assert_eq!(
                first,
                Some(ServerMessage::Detached {
                    reason: "detached".to_string()
                })
            );
            let end: Option<ServerMessage> = read_frame(&mut reader, 1024).await.unwrap();
            assert_eq!(end, None);
            writer.await.unwrap();
        });
    }
}
