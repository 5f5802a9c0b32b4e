use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use pitboard_types::{events::DeviceEvent, Result};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    net::TcpStream,
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{device_error, DeviceEventSource, CHANNEL_CAPACITY};

/// Gate reached through a serial-to-TCP bridge that forwards one signal per
/// line.
pub struct LineDevice {
    address: String,
    rx: Option<broadcast::Receiver<DeviceEvent>>,
    reader: Option<JoinHandle<()>>,
}

impl LineDevice {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            rx: None,
            reader: None,
        }
    }

    /// Starts reading signals from an already-open byte stream.
    pub fn attach<R>(&mut self, reader: R)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        self.stop_reader();
        let (tx, rx) = broadcast::channel(CHANNEL_CAPACITY);
        self.rx = Some(rx);
        self.reader = Some(tokio::spawn(read_signals(reader, tx)));
    }

    fn stop_reader(&mut self) {
        if let Some(handle) = self.reader.take() {
            handle.abort();
        }
        self.rx = None;
    }
}

async fn read_signals<R>(reader: R, tx: broadcast::Sender<DeviceEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                info!("Gate link closed by peer");
                break;
            }
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match DeviceEvent::parse(line) {
                    Ok(event) => {
                        debug!("Gate signal {:?}", event);
                        let _ = tx.send(event);
                    }
                    Err(err) => warn!("Ignoring gate signal '{}': {err}", line.escape_debug()),
                }
            }
            Err(err) => {
                warn!("Gate link read error: {err}");
                break;
            }
        }
    }
}

#[async_trait]
impl DeviceEventSource for LineDevice {
    async fn connect(&mut self) -> Result<()> {
        info!("Connecting to timing gate at {}", self.address);
        let stream = TcpStream::connect(&self.address).await.map_err(|err| {
            device_error(format!("unable to reach gate at {}: {err}", self.address))
        })?;
        self.attach(stream);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.reader.is_some() {
            info!("Disconnecting timing gate at {}", self.address);
        }
        self.stop_reader();
        Ok(())
    }

    fn subscribe(&self) -> BoxStream<'static, DeviceEvent> {
        let Some(rx) = &self.rx else {
            return futures::stream::empty().boxed();
        };
        let mut rx = rx.resubscribe();
        async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Dropped {} gate signals while busy", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
        .boxed()
    }

    fn is_connected(&self) -> bool {
        self.reader
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.address)
    }
}

impl Drop for LineDevice {
    fn drop(&mut self) {
        self.stop_reader();
    }
}
