use log::{debug, error, info};
use std::{
    io::{self, Read},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};

const READ_BUFFER_LEN: usize = 1024;

/// Turns raw serial bytes into text, carrying a multi-byte character that
/// was cut between two reads over to the next one.
///
/// Invalid sequences become U+FFFD so one bad byte never stalls the stream.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut text = String::new();
        let mut input = self.pending.as_slice();

        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    text.push_str(valid);
                    input = &[];
                    break;
                }
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));

                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        // Incomplete character at the end: wait for more.
                        None => {
                            input = rest;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = input.to_vec();
        text
    }

    /// Flushes a character left incomplete when the stream ended.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }
}

/// Reads `reader` on a blocking thread and forwards text chunks to `tx`.
///
/// The thread ends on end of stream, on a read error, when `stop` is set or
/// when the receiver is dropped. Dropping `tx` is how the station learns the
/// link is gone. Read timeouts only give the thread a chance to check `stop`.
pub fn spawn_reader<R>(
    mut reader: R,
    tx: UnboundedSender<String>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut buf = [0u8; READ_BUFFER_LEN];
        let mut decoder = Utf8Decoder::default();

        while !stop.load(Ordering::Relaxed) {
            match reader.read(&mut buf) {
                Ok(0) => {
                    info!("[READER] End of stream");
                    break;
                }
                Ok(n) => {
                    debug!("[READER] {} bytes", n);

                    let text = decoder.decode(&buf[..n]);
                    if !text.is_empty() && tx.send(text).is_err() {
                        break;
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                    ) =>
                {
                    continue;
                }
                Err(e) => {
                    error!("[READER] Read failed: {}", e);
                    break;
                }
            }
        }

        let rest = decoder.finish();
        if !rest.is_empty() {
            let _ = tx.send(rest);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::sync::mpsc;

    /// Yields a timeout between every chunk, like an idle serial port.
    struct SlowPort {
        chunks: Vec<Vec<u8>>,
        idle: bool,
    }

    impl Read for SlowPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.idle = !self.idle;
            if self.idle {
                return Err(io::ErrorKind::TimedOut.into());
            }
            if self.chunks.is_empty() {
                return Ok(0);
            }
            let chunk = self.chunks.remove(0);
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }

    async fn collect(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
        let mut text = String::new();
        while let Some(chunk) = rx.recv().await {
            text.push_str(&chunk);
        }
        text
    }

    #[test]
    fn multibyte_character_split_between_reads() {
        let mut decoder = Utf8Decoder::default();
        let bytes = "40.0°C".as_bytes();

        let first = decoder.decode(&bytes[..5]);
        let second = decoder.decode(&bytes[5..]);

        assert_eq!(first, "40.0");
        assert_eq!(second, "°C");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn invalid_bytes_are_replaced() {
        let mut decoder = Utf8Decoder::default();

        let text = decoder.decode(b"{\"a\":\xff1}");

        assert_eq!(text, "{\"a\":\u{FFFD}1}");
    }

    #[test]
    fn truncated_character_at_end_of_stream() {
        let mut decoder = Utf8Decoder::default();

        assert_eq!(decoder.decode(&"°".as_bytes()[..1]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[tokio::test]
    async fn reader_forwards_until_end_of_stream() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let stop = Arc::new(AtomicBool::new(false));

        let handle = spawn_reader(
            Cursor::new(br#"{"temperature":40}{"accel":[1]}"#.to_vec()),
            tx,
            stop,
        );

        assert_eq!(collect(&mut rx).await, r#"{"temperature":40}{"accel":[1]}"#);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn reader_survives_timeouts() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let stop = Arc::new(AtomicBool::new(false));
        let port = SlowPort {
            chunks: vec![b"{\"tempe".to_vec(), b"rature\":40}".to_vec()],
            idle: false,
        };

        spawn_reader(port, tx, stop);

        assert_eq!(collect(&mut rx).await, r#"{"temperature":40}"#);
    }

    #[tokio::test]
    async fn stop_flag_ends_reader() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let stop = Arc::new(AtomicBool::new(true));

        spawn_reader(Cursor::new(b"{}".to_vec()), tx, stop).await.unwrap();

        assert_eq!(rx.recv().await, None);
    }
}
