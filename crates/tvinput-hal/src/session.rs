//! Consumer-side session over a TV input device
//!
//! [`TvInputSession`] keeps what the consumer is obliged to track: which
//! devices are available, the last stream configuration snapshot of each one
//! and the streams opened from it. A configuration change notification drops
//! the snapshot and forgets the open streams of that device, so stream ids
//! from an older snapshot are rejected until the configurations are queried
//! again.
//!
//! The session never holds its lock while calling into the device, which
//! lets the implementation notify synchronously from inside any operation.

use crate::{
    DeviceId, DeviceInfo, Event, EventCallback, HalError, Stream, StreamConfig, StreamId,
    TvInputDevice,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// What the session knows about one available device
struct TrackedDevice {
    info: DeviceInfo,
    /// Bumped on every configuration change
    generation: u64,
    snapshot: Option<Vec<StreamConfig>>,
    open: BTreeMap<StreamId, Stream>,
}

#[derive(Default)]
struct SessionState {
    devices: BTreeMap<DeviceId, TrackedDevice>,
    next_generation: u64,
}

impl SessionState {
    fn bump(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn apply(&mut self, event: &Event) {
        match event {
            Event::DeviceAvailable(info) => {
                let generation = self.bump();
                let previous = self.devices.insert(
                    info.device_id,
                    TrackedDevice {
                        info: *info,
                        generation,
                        snapshot: None,
                        open: BTreeMap::new(),
                    },
                );
                if previous.is_some() {
                    tracing::warn!("Device {} announced twice, state reset", info.device_id);
                } else {
                    tracing::info!(
                        "Device {} available ({})",
                        info.device_id,
                        info.input_type.name()
                    );
                }
            }
            Event::DeviceUnavailable { device_id } => match self.devices.remove(device_id) {
                Some(device) => tracing::info!(
                    "Device {} unavailable, {} open stream(s) dropped",
                    device_id,
                    device.open.len()
                ),
                None => tracing::warn!("Unknown device {} reported unavailable", device_id),
            },
            Event::StreamConfigurationsChanged { device_id } => {
                let generation = self.bump();
                match self.devices.get_mut(device_id) {
                    Some(device) => {
                        tracing::info!(
                            "Stream configurations of device {} changed, {} open stream(s) closed",
                            device_id,
                            device.open.len()
                        );
                        device.generation = generation;
                        device.snapshot = None;
                        device.open.clear();
                    }
                    None => tracing::warn!(
                        "Configuration change for unknown device {}",
                        device_id
                    ),
                }
            }
        }
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Callback handed to the device: update session state, then forward
struct SessionCallback {
    state: Arc<Mutex<SessionState>>,
    downstream: Arc<dyn EventCallback>,
}

impl EventCallback for SessionCallback {
    fn notify(&self, event: &Event) {
        lock(&self.state).apply(event);
        self.downstream.notify(event);
    }
}

pub struct TvInputSession {
    device: Box<dyn TvInputDevice>,
    state: Arc<Mutex<SessionState>>,
}

impl TvInputSession {
    pub fn new(device: Box<dyn TvInputDevice>) -> Self {
        Self {
            device,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    /// Underlying device
    pub fn device(&self) -> &dyn TvInputDevice {
        self.device.as_ref()
    }

    /// Initialize the device; every notification is forwarded to `callback`
    /// after the session has recorded it
    pub fn initialize(&self, callback: Arc<dyn EventCallback>) -> crate::Result<()> {
        let session_callback = SessionCallback {
            state: Arc::clone(&self.state),
            downstream: callback,
        };
        self.device.initialize(Arc::new(session_callback))?;

        tracing::info!(
            "Session initialized, {} device(s) available",
            lock(&self.state).devices.len()
        );
        Ok(())
    }

    /// Devices currently available, by id
    pub fn available_devices(&self) -> Vec<DeviceInfo> {
        lock(&self.state).devices.values().map(|d| d.info).collect()
    }

    /// Query the stream configurations of a device and keep them as the
    /// current snapshot
    pub fn stream_configurations(&self, device_id: DeviceId) -> crate::Result<Vec<StreamConfig>> {
        let generation = self.generation(device_id)?;
        let configs = self.device.get_stream_configurations(device_id)?;

        let mut state = lock(&self.state);
        match state.devices.get_mut(&device_id) {
            Some(device) if device.generation == generation => {
                device.snapshot = Some(configs.clone());
            }
            _ => tracing::debug!(
                "Device {} changed while querying configurations, snapshot discarded",
                device_id
            ),
        }
        Ok(configs)
    }

    /// Last snapshot taken with [`TvInputSession::stream_configurations`],
    /// if still current
    pub fn current_configurations(&self, device_id: DeviceId) -> Option<Vec<StreamConfig>> {
        lock(&self.state)
            .devices
            .get(&device_id)
            .and_then(|d| d.snapshot.clone())
    }

    /// Open a stream of the current snapshot
    ///
    /// Fails with [`HalError::InvalidArgument`] without reaching the device
    /// when the device is not available, no current snapshot exists, or the
    /// stream id is not part of it.
    pub fn open_stream(&self, device_id: DeviceId, stream_id: StreamId) -> crate::Result<Stream> {
        let generation = {
            let state = lock(&self.state);
            let device = state
                .devices
                .get(&device_id)
                .ok_or_else(|| HalError::invalid_device(device_id))?;
            let snapshot = device.snapshot.as_ref().ok_or_else(|| {
                HalError::InvalidArgument(format!(
                    "no current stream configurations for device {device_id}"
                ))
            })?;
            if !snapshot.iter().any(|c| c.stream_id == stream_id) {
                return Err(HalError::invalid_stream(device_id, stream_id));
            }
            device.generation
        };

        let stream = self.device.open_stream(device_id, stream_id)?;

        let mut state = lock(&self.state);
        match state.devices.get_mut(&device_id) {
            Some(device) if device.generation == generation => {
                device.open.insert(stream_id, stream.clone());
            }
            _ => tracing::debug!(
                "Device {} changed while opening stream {}, stream already closed",
                device_id,
                stream_id
            ),
        }
        Ok(stream)
    }

    /// Close a stream; the session forgets it whenever the device no longer
    /// has it open
    pub fn close_stream(&self, device_id: DeviceId, stream_id: StreamId) -> crate::Result<()> {
        let result = self.device.close_stream(device_id, stream_id);

        if matches!(result, Ok(()) | Err(HalError::NotFound)) {
            if let Some(device) = lock(&self.state).devices.get_mut(&device_id) {
                device.open.remove(&stream_id);
            }
        }
        result
    }

    /// Streams the session considers open on a device
    pub fn open_streams(&self, device_id: DeviceId) -> Vec<Stream> {
        lock(&self.state)
            .devices
            .get(&device_id)
            .map(|d| d.open.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_stream_open(&self, device_id: DeviceId, stream_id: StreamId) -> bool {
        lock(&self.state)
            .devices
            .get(&device_id)
            .is_some_and(|d| d.open.contains_key(&stream_id))
    }

    /// Close every stream the session considers open
    ///
    /// Keeps going after a failure and returns the first error.
    pub fn close_all(&self) -> crate::Result<()> {
        let open: Vec<(DeviceId, StreamId)> = lock(&self.state)
            .devices
            .iter()
            .flat_map(|(id, d)| d.open.keys().map(move |s| (*id, *s)))
            .collect();

        let mut first_error = None;
        for (device_id, stream_id) in open {
            if let Err(err) = self.close_stream(device_id, stream_id) {
                tracing::warn!("Failed to close stream {}/{}: {}", device_id, stream_id, err);
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Close all streams, then the device
    pub fn close(&self) -> crate::Result<()> {
        let streams = self.close_all();
        self.device.close()?;
        lock(&self.state).devices.clear();
        streams
    }

    fn generation(&self, device_id: DeviceId) -> crate::Result<u64> {
        lock(&self.state)
            .devices
            .get(&device_id)
            .map(|d| d.generation)
            .ok_or_else(|| HalError::invalid_device(device_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockProfile, MockTvInput};
    use crate::{InputType, event_channel};

    fn session(profile: MockProfile) -> (TvInputSession, MockTvInput) {
        let hardware = MockTvInput::new(profile);
        let session = TvInputSession::new(Box::new(hardware.clone()));
        session.initialize(Arc::new(|_: &Event| {})).unwrap();
        (session, hardware)
    }

    #[test]
    fn test_tracks_available_devices() {
        let (session, hardware) = session(MockProfile::TunerBox);

        assert_eq!(
            session.available_devices(),
            vec![
                DeviceInfo::new(0, InputType::BuiltInTuner),
                DeviceInfo::new(1, InputType::Hdmi),
            ]
        );

        hardware.unplug_device(0).unwrap();
        assert_eq!(
            session.available_devices(),
            vec![DeviceInfo::new(1, InputType::Hdmi)]
        );
    }

    #[test]
    fn test_forwards_events() {
        let hardware = MockTvInput::new(MockProfile::HdmiPorts);
        let session = TvInputSession::new(Box::new(hardware.clone()));
        let (sender, mut rx) = event_channel();

        session.initialize(Arc::new(sender)).unwrap();
        hardware.unplug_device(2).unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 4);
        assert_eq!(events[3], Event::DeviceUnavailable { device_id: 2 });
    }

    #[test]
    fn test_open_requires_snapshot() {
        let (session, hardware) = session(MockProfile::HdmiPorts);

        assert!(matches!(
            session.open_stream(1, 1),
            Err(HalError::InvalidArgument(_))
        ));
        assert_eq!(hardware.open_stream_count(), 0);

        session.stream_configurations(1).unwrap();
        assert!(session.open_stream(1, 1).is_ok());
        assert!(session.is_stream_open(1, 1));
    }

    #[test]
    fn test_open_rejects_ids_outside_snapshot() {
        let (session, _hardware) = session(MockProfile::HdmiPorts);
        session.stream_configurations(1).unwrap();

        assert!(matches!(
            session.open_stream(1, 7),
            Err(HalError::InvalidArgument(_))
        ));
        assert!(matches!(
            session.open_stream(99, 1),
            Err(HalError::InvalidArgument(_))
        ));
        assert!(matches!(
            session.stream_configurations(99),
            Err(HalError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_configuration_change_invalidates_snapshot() {
        let (session, hardware) = session(MockProfile::Passthrough);
        session.stream_configurations(0).unwrap();
        session.open_stream(0, 1).unwrap();

        hardware
            .replace_stream_configurations(
                0,
                vec![StreamConfig::video(1, 1280, 720), StreamConfig::video(2, 1920, 1080)],
            )
            .unwrap();

        assert!(session.current_configurations(0).is_none());
        assert!(session.open_streams(0).is_empty());
        assert!(matches!(
            session.open_stream(0, 2),
            Err(HalError::InvalidArgument(_))
        ));

        session.stream_configurations(0).unwrap();
        assert!(session.open_stream(0, 1).is_ok());
    }

    #[test]
    fn test_close_forgets_stream() {
        let (session, _hardware) = session(MockProfile::HdmiPorts);
        session.stream_configurations(2).unwrap();
        session.open_stream(2, 1).unwrap();

        session.close_stream(2, 1).unwrap();
        assert!(!session.is_stream_open(2, 1));
        assert!(matches!(session.close_stream(2, 1), Err(HalError::NotFound)));
    }

    #[test]
    fn test_close_all_and_device() {
        let (session, hardware) = session(MockProfile::HdmiPorts);
        for id in 1..=3 {
            session.stream_configurations(id).unwrap();
            session.open_stream(id, 1).unwrap();
        }

        session.close_all().unwrap();
        assert_eq!(hardware.open_stream_count(), 0);

        session.close().unwrap();
        assert!(hardware.is_closed());
        assert!(session.available_devices().is_empty());
    }
}
