//! Line source
//!
//! Reads newline-terminated sentences from a serial device, a recorded log
//! or stdin. Every read is bounded by a timeout so the ingestion loop can
//! observe shutdown between sentences.

use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Split};
use tracing::{debug, instrument};

use crate::error::{IngestionError, Result};

/// Outcome of one read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// One line, trailing `\r\n` stripped
    Line(String),
    /// Nothing arrived within the read timeout
    Idle,
    /// End of input
    Closed,
}

type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;

/// Timed line reader
pub struct LineSource {
    origin: String,
    lines: Split<BufReader<BoxedReader>>,
    read_timeout: Duration,
}

impl LineSource {
    /// Open a device or file; `-` reads stdin
    #[instrument(name = "line_source_open", skip_all, fields(path = %path.display()))]
    pub async fn open(path: &Path, read_timeout: Duration) -> Result<Self> {
        if path.as_os_str() == "-" {
            return Ok(Self::from_reader("stdin", tokio::io::stdin(), read_timeout));
        }

        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| IngestionError::OpenFailed {
                path: path.display().to_string(),
                source,
            })?;
        debug!("input opened");
        Ok(Self::from_reader(
            path.display().to_string(),
            file,
            read_timeout,
        ))
    }

    /// Wrap any async reader
    pub fn from_reader(
        origin: impl Into<String>,
        reader: impl AsyncRead + Unpin + Send + 'static,
        read_timeout: Duration,
    ) -> Self {
        let reader: BoxedReader = Box::new(reader);
        Self {
            origin: origin.into(),
            lines: BufReader::new(reader).split(b'\n'),
            read_timeout,
        }
    }

    /// Where the lines come from
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Read the next line
    ///
    /// Bytes that are not valid UTF-8 are replaced rather than rejected; the
    /// decoder's checksum catches line noise.
    pub async fn next_event(&mut self) -> Result<LineEvent> {
        match tokio::time::timeout(self.read_timeout, self.lines.next_segment()).await {
            Err(_) => Ok(LineEvent::Idle),
            Ok(Ok(None)) => Ok(LineEvent::Closed),
            Ok(Ok(Some(bytes))) => {
                let line = String::from_utf8_lossy(&bytes);
                Ok(LineEvent::Line(line.trim_end_matches(['\r', '\n']).to_string()))
            }
            Ok(Err(e)) => Err(IngestionError::Read(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_lines_then_closes() {
        let data: &[u8] = b"$GPGGA,1\r\n\r\n$GPVTG,2\n";
        let mut source = LineSource::from_reader("mem", data, Duration::from_millis(100));

        assert_eq!(
            source.next_event().await.unwrap(),
            LineEvent::Line("$GPGGA,1".into())
        );
        assert_eq!(source.next_event().await.unwrap(), LineEvent::Line(String::new()));
        assert_eq!(
            source.next_event().await.unwrap(),
            LineEvent::Line("$GPVTG,2".into())
        );
        assert_eq!(source.next_event().await.unwrap(), LineEvent::Closed);
    }

    #[tokio::test]
    async fn idle_on_timeout() {
        let (_writer, reader) = tokio::io::duplex(64);
        let mut source = LineSource::from_reader("pipe", reader, Duration::from_millis(20));
        assert_eq!(source.next_event().await.unwrap(), LineEvent::Idle);
    }

    #[tokio::test]
    async fn missing_file_reports_path() {
        let result = LineSource::open(Path::new("/nonexistent/ttyUSB9"), Duration::from_millis(10)).await;
        assert!(matches!(result, Err(IngestionError::OpenFailed { .. })));
    }
}
