//! Per-pane I/O thread that reads pty output and hands it to the arbiter.
//!
//! Each pane gets its own OS thread because pty reads are blocking. Chunks
//! go over the shared event channel in the order they were read; a full
//! channel blocks the thread, which in turn stops reading from the child.

use std::io::{self, Read};

use log::{debug, trace};
use tokio::sync::mpsc;

use weft_mux::PaneId;

use crate::state::Event;

const READ_BUFFER: usize = 65536;

/// Start the read loop for a pane on a dedicated OS thread.
pub fn start_io_thread(pane: PaneId, reader: Box<dyn Read + Send>, events: mpsc::Sender<Event>) -> io::Result<()> {
    std::thread::Builder::new()
        .name(format!("pty-io-{pane}"))
        .spawn(move || io_loop(pane, reader, &events))?;
    Ok(())
}

fn io_loop(pane: PaneId, mut reader: Box<dyn Read + Send>, events: &mpsc::Sender<Event>) {
    let mut buf = vec![0u8; READ_BUFFER];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            // EIO once the child side closes
            Err(e) => {
                debug!("pane {pane} read ended: {e}");
                break;
            }
        };
        trace!("pane {pane} read {n} bytes");
        let event = Event::PaneOutput {
            pane,
            data: buf[..n].to_vec(),
        };
        if events.blocking_send(event).is_err() {
            // arbiter gone
            return;
        }
    }
    let _ = events.blocking_send(Event::PaneEof { pane });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_forwards_chunks_then_eof() {
        let (tx, mut rx) = mpsc::channel(8);
        let pane = PaneId::from_raw(4);
        let reader: Box<dyn Read + Send> = Box::new(io::Cursor::new(b"hello".to_vec()));
        start_io_thread(pane, reader, tx).unwrap();

        let mut data = Vec::new();
        loop {
            match rx.blocking_recv() {
                Some(Event::PaneOutput { pane: p, data: chunk }) => {
                    assert_eq!(p, pane);
                    data.extend(chunk);
                }
                Some(Event::PaneEof { pane: p }) => {
                    assert_eq!(p, pane);
                    break;
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!(data, b"hello".to_vec());
        // the sender was dropped with the thread
        assert!(rx.blocking_recv().is_none());
    }
}
