// Upstream input reader
//
// Reads newline-delimited records from stdin on a dedicated OS thread and
// forwards each raw line to the hub. A blocking read on a plain thread never
// holds up runtime shutdown.

use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};

use super::errors::{BridgeError, BridgeResult};
use super::HubHandle;

/// Starts forwarding stdin to the hub
pub fn spawn_stdin_reader(hub: HubHandle) -> BridgeResult<JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            match pump(stdin.lock(), &hub) {
                Ok(lines) => tracing::debug!(lines, "stdin reader finished"),
                Err(BridgeError::HubClosed) => tracing::debug!("hub closed, stdin reader stopping"),
                Err(err) => tracing::warn!(error = %err, "stdin reader stopped"),
            }
        })
        .map_err(BridgeError::Input)
}

/// Forwards every line of `reader` to the hub, then signals end of stream
///
/// Lines are forwarded as raw bytes without their terminator; decoding is
/// the hub's job. A read error ends the stream like EOF does. Returns the
/// number of lines forwarded.
pub fn pump(mut reader: impl BufRead, hub: &HubHandle) -> BridgeResult<u64> {
    let mut forwarded = 0;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                hub.push_line(buf.clone())?;
                forwarded += 1;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read input, treating as end of stream");
                break;
            }
        }
    }
    hub.end_stream()?;
    Ok(forwarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::Command;
    use std::io::Cursor;
    use tokio::sync::mpsc;

    fn hub() -> (HubHandle, mpsc::UnboundedReceiver<Command>) {
        let (commands, inbox) = mpsc::unbounded_channel();
        (HubHandle { commands }, inbox)
    }

    fn lines(inbox: &mut mpsc::UnboundedReceiver<Command>) -> (Vec<Vec<u8>>, bool) {
        let mut lines = Vec::new();
        let mut ended = false;
        while let Ok(command) = inbox.try_recv() {
            match command {
                Command::Line(line) => lines.push(line),
                Command::StreamEnded => ended = true,
                other => panic!("Unexpected command {other:?}"),
            }
        }
        (lines, ended)
    }

    #[test]
    fn forwards_lines_then_end_of_stream() {
        let (hub, mut inbox) = hub();
        let input = Cursor::new(b"{\"type\":\"result\"}\nnot json\n\xff\xfe\nlast".to_vec());

        let forwarded = pump(input, &hub).unwrap();

        let (lines, ended) = lines(&mut inbox);
        assert_eq!(forwarded, 4);
        assert_eq!(lines[0], b"{\"type\":\"result\"}");
        assert_eq!(lines[1], b"not json");
        assert_eq!(lines[2], b"\xff\xfe");
        assert_eq!(lines[3], b"last");
        assert!(ended);
    }

    #[test]
    fn empty_input_only_ends_stream() {
        let (hub, mut inbox) = hub();

        let forwarded = pump(Cursor::new(Vec::new()), &hub).unwrap();

        let (lines, ended) = lines(&mut inbox);
        assert_eq!(forwarded, 0);
        assert!(lines.is_empty());
        assert!(ended);
    }

    #[test]
    fn stops_when_hub_is_gone() {
        let (hub, inbox) = hub();
        drop(inbox);

        let result = pump(Cursor::new(b"a\nb\n".to_vec()), &hub);

        assert!(matches!(result, Err(BridgeError::HubClosed)));
    }
}
