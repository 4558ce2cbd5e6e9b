// Device readers used by the binary
// Decision: The panel decoder runs out of process and hands us one JSON
//           DeviceMessage per line, on stdin or through a file/FIFO
// Decision: --mock swaps in a simulated panel so the stack runs without hardware

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::time::{interval, Interval, MissedTickBehavior};

use alarmrelay_core::{DeviceMessage, DeviceReader, RelayError, Result};

/// Interval between simulated panel messages
pub const MOCK_INTERVAL: Duration = Duration::from_secs(5);

/// Pause after the feed reaches end of input
const EOF_BACKOFF: Duration = Duration::from_secs(1);

// ============================================
// Mock panel
// ============================================

/// Simulated panel: a random "foo N" keypad line every few seconds, with
/// alarm and fire flags each raised one time in ten.
pub struct MockDeviceReader {
    ticker: Interval,
}

impl MockDeviceReader {
    pub fn new(period: Duration) -> Self {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { ticker }
    }

    fn generate() -> DeviceMessage {
        let mut rng = rand::thread_rng();
        DeviceMessage {
            keypad_message: format!("foo {}", rng.gen_range(0..100)),
            alarm_sounding: rng.gen_bool(0.1),
            fire: rng.gen_bool(0.1),
            ..Default::default()
        }
    }
}

impl Default for MockDeviceReader {
    fn default() -> Self {
        Self::new(MOCK_INTERVAL)
    }
}

#[async_trait]
impl DeviceReader for MockDeviceReader {
    async fn read(&mut self) -> Result<DeviceMessage> {
        self.ticker.tick().await;
        Ok(Self::generate())
    }
}

// ============================================
// JSON lines feed
// ============================================

/// Reads one JSON-encoded DeviceMessage per line.
pub struct JsonLinesReader<R> {
    lines: Lines<R>,
}

impl<R> JsonLinesReader<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl JsonLinesReader<BufReader<Box<dyn tokio::io::AsyncRead + Unpin + Send>>> {
    /// Open `path`, with "-" meaning stdin.
    pub async fn open(path: &str) -> Result<Self> {
        let source: Box<dyn tokio::io::AsyncRead + Unpin + Send> = if path == "-" {
            Box::new(tokio::io::stdin())
        } else {
            let file = tokio::fs::File::open(Path::new(path))
                .await
                .map_err(|e| RelayError::device(format!("cannot open {}: {}", path, e)))?;
            Box::new(file)
        };
        Ok(Self::new(BufReader::new(source)))
    }
}

#[async_trait]
impl<R> DeviceReader for JsonLinesReader<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn read(&mut self) -> Result<DeviceMessage> {
        loop {
            match self.lines.next_line().await? {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => {
                    return serde_json::from_str(&line)
                        .map_err(|e| RelayError::device(format!("malformed message: {}", e)));
                }
                None => {
                    tokio::time::sleep(EOF_BACKOFF).await;
                    return Err(RelayError::device("end of input"));
                }
            }
        }
    }
}
