//! Timing gate transports feeding [`DeviceEvent`]s to the console.

mod line;

use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use pitboard_types::{
    config::{DeviceConfig, DeviceKind},
    events::DeviceEvent,
    PitboardError, Result,
};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info};

pub use line::LineDevice;

const CHANNEL_CAPACITY: usize = 64;

/// Capability the console needs from a timing gate. Pairing and discovery
/// stay behind `connect`.
#[async_trait]
pub trait DeviceEventSource: Send + Sync {
    async fn connect(&mut self) -> Result<()>;
    async fn disconnect(&mut self) -> Result<()>;
    /// Events received after this call. The stream ends when the link drops.
    fn subscribe(&self) -> BoxStream<'static, DeviceEvent>;
    fn is_connected(&self) -> bool;
    fn describe(&self) -> String;
}

#[async_trait]
impl<T> DeviceEventSource for Box<T>
where
    T: DeviceEventSource + ?Sized,
{
    async fn connect(&mut self) -> Result<()> {
        (**self).connect().await
    }

    async fn disconnect(&mut self) -> Result<()> {
        (**self).disconnect().await
    }

    fn subscribe(&self) -> BoxStream<'static, DeviceEvent> {
        (**self).subscribe()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// In-process gate backed by a broadcast channel. Used when no hardware is
/// attached and for driving the console in tests.
#[derive(Clone)]
pub struct LocalDevice {
    tx: broadcast::Sender<DeviceEvent>,
    connected: bool,
}

impl LocalDevice {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            connected: false,
        }
    }

    /// Handle that can push events into the same channel after the device
    /// has been moved into the console.
    pub fn injector(&self) -> DeviceInjector {
        DeviceInjector {
            tx: self.tx.clone(),
        }
    }
}

impl Default for LocalDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceEventSource for LocalDevice {
    async fn connect(&mut self) -> Result<()> {
        info!("Local timing gate connected");
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.connected {
            info!("Local timing gate disconnected");
        }
        self.connected = false;
        Ok(())
    }

    fn subscribe(&self) -> BoxStream<'static, DeviceEvent> {
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(|event| async move { event.ok() })
            .boxed()
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn describe(&self) -> String {
        "local".into()
    }
}

#[derive(Clone)]
pub struct DeviceInjector {
    tx: broadcast::Sender<DeviceEvent>,
}

impl DeviceInjector {
    pub fn send(&self, event: DeviceEvent) {
        if self.tx.send(event).is_err() {
            debug!("No subscriber for injected {:?}", event);
        }
    }

    /// Parses and forwards a textual signal such as `TIME:12.345`.
    pub fn send_signal(&self, signal: &str) -> Result<()> {
        let event = DeviceEvent::parse(signal)?;
        self.send(event);
        Ok(())
    }
}

/// Builds the transport selected in the configuration.
pub fn device_from_config(config: &DeviceConfig) -> Result<Box<dyn DeviceEventSource>> {
    match config.kind {
        DeviceKind::None => Ok(Box::new(LocalDevice::new())),
        DeviceKind::Tcp => {
            let address = config
                .address
                .clone()
                .ok_or_else(|| device_error("device.address is not set"))?;
            Ok(Box::new(LineDevice::new(address)))
        }
    }
}

pub fn device_error(message: impl Into<String>) -> PitboardError {
    PitboardError::Device(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_device_forwards_injected_events() {
        let mut device = LocalDevice::new();
        device.connect().await.expect("connect");
        let mut events = device.subscribe();
        let injector = device.injector();

        injector.send(DeviceEvent::Start);
        injector.send_signal("TIME:9.876").expect("signal");

        assert_eq!(events.next().await, Some(DeviceEvent::Start));
        assert_eq!(events.next().await, Some(DeviceEvent::TimeReport(9.876)));
        assert!(injector.send_signal("BOGUS").is_err());
    }

    #[tokio::test]
    async fn config_selects_transport() {
        let mut config = pitboard_types::config::PitboardConfig::default().device;
        let device = device_from_config(&config).expect("local device");
        assert_eq!(device.describe(), "local");

        config.kind = DeviceKind::Tcp;
        assert!(device_from_config(&config).is_err());
        config.address = Some("127.0.0.1:3333".into());
        let device = device_from_config(&config).expect("tcp device");
        assert_eq!(device.describe(), "tcp://127.0.0.1:3333");
        assert!(!device.is_connected());
    }
}
