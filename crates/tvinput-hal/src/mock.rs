//! Mock implementation for testing without real hardware
//!
//! [`MockTvInput`] keeps the whole hardware model in memory and honors every
//! documented outcome of the operation table. Tests and tools drive it like
//! real hardware: plug and unplug inputs, replace stream configurations,
//! lower the number of streams that may be open at once.
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//! use tvinput_hal::mock::{MockProfile, MockTvInput};
//! use tvinput_hal::{DeviceInfo, InputType, StreamConfig};
//!
//! // Create a box with a built-in tuner and an HDMI port
//! let device = MockTvInput::new(MockProfile::TunerBox);
//!
//! // Or describe the hardware in a file
//! let custom = MockTvInput::from_profile_file(Path::new("hardware/living-room.toml"));
//!
//! // Simulate hotplug
//! device
//!     .plug_device(
//!         DeviceInfo::new(7, InputType::Hdmi),
//!         vec![StreamConfig::video(1, 1920, 1080)],
//!     )
//!     .unwrap();
//! ```

use crate::{
    ApiVersion, DeviceId, DeviceInfo, Event, EventCallback, HAL_API_VERSION, HalError,
    HardwareModule, InputType, ModuleInfo, SidebandHandle, Stream, StreamConfig, StreamHandle,
    StreamId, StreamType, TV_INPUT_DEFAULT_DEVICE, TV_INPUT_DEVICE_API_VERSION_0_1,
    TV_INPUT_HARDWARE_MODULE_ID, TV_INPUT_MODULE_API_VERSION_0_1, TvInputDevice,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// First file descriptor number handed out in sideband handles
const FIRST_SIDEBAND_FD: i32 = 100;

/// Pre-defined mock hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockProfile {
    /// Three HDMI ports
    HdmiPorts,
    /// Built-in tuner plus one HDMI port, one stream at a time
    TunerBox,
    /// Single passthrough input with two configurations
    Passthrough,
    /// Nothing connected
    Empty,
}

impl MockProfile {
    /// Get the hardware description for this mock
    pub fn to_description(self) -> HardwareDescription {
        match self {
            MockProfile::HdmiPorts => HardwareDescription {
                max_open_streams: 3,
                devices: (1..=3)
                    .map(|id| DeviceDescription {
                        device_id: id,
                        input_type: InputType::Hdmi,
                        configs: vec![StreamConfig::video(1, 1920, 1080)],
                    })
                    .collect(),
            },
            MockProfile::TunerBox => HardwareDescription {
                max_open_streams: 1,
                devices: vec![
                    DeviceDescription {
                        device_id: 0,
                        input_type: InputType::BuiltInTuner,
                        configs: vec![
                            StreamConfig::video(1, 1920, 1080),
                            StreamConfig::video(2, 720, 576),
                        ],
                    },
                    DeviceDescription {
                        device_id: 1,
                        input_type: InputType::Hdmi,
                        configs: vec![StreamConfig::video(1, 3840, 2160)],
                    },
                ],
            },
            MockProfile::Passthrough => HardwareDescription {
                max_open_streams: 2,
                devices: vec![DeviceDescription {
                    device_id: 0,
                    input_type: InputType::Passthrough,
                    configs: vec![
                        StreamConfig::video(1, 1280, 720),
                        StreamConfig::video(2, 1920, 1080),
                    ],
                }],
            },
            MockProfile::Empty => HardwareDescription {
                max_open_streams: default_max_open_streams(),
                devices: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MockProfile::HdmiPorts => "hdmi_ports",
            MockProfile::TunerBox => "tuner_box",
            MockProfile::Passthrough => "passthrough",
            MockProfile::Empty => "empty",
        }
    }

    /// Get profile from string name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().replace('-', "_").as_str() {
            "hdmi" | "hdmi_ports" => Some(MockProfile::HdmiPorts),
            "tuner" | "tuner_box" => Some(MockProfile::TunerBox),
            "passthrough" => Some(MockProfile::Passthrough),
            "empty" | "none" => Some(MockProfile::Empty),
            _ => None,
        }
    }

    /// List all available mock profiles
    pub fn all() -> &'static [MockProfile] {
        &[
            MockProfile::HdmiPorts,
            MockProfile::TunerBox,
            MockProfile::Passthrough,
            MockProfile::Empty,
        ]
    }
}

/// Hardware present at start-up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareDescription {
    /// Streams that may be open at the same time across all devices
    #[serde(default = "default_max_open_streams")]
    pub max_open_streams: usize,
    #[serde(default)]
    pub devices: Vec<DeviceDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescription {
    pub device_id: DeviceId,
    #[serde(rename = "type")]
    pub input_type: InputType,
    #[serde(default)]
    pub configs: Vec<StreamConfig>,
}

fn default_max_open_streams() -> usize {
    4
}

impl HardwareDescription {
    /// Parse a TOML description
    pub fn from_toml_str(contents: &str) -> crate::Result<Self> {
        let description: Self =
            toml::from_str(contents).map_err(|e| HalError::Description(e.to_string()))?;
        description.validate()?;
        Ok(description)
    }

    /// Load a TOML description file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.max_open_streams == 0 {
            return Err(HalError::Description(
                "max_open_streams must be at least 1".into(),
            ));
        }

        let mut seen = BTreeSet::new();
        for device in &self.devices {
            if !seen.insert(device.device_id) {
                return Err(HalError::Description(format!(
                    "duplicate device id {}",
                    device.device_id
                )));
            }
            check_device(device.device_id, &device.configs)
                .map_err(|e| HalError::Description(e.to_string()))?;
        }

        Ok(())
    }
}

/// Validate the id and configurations of one device
fn check_device(device_id: DeviceId, configs: &[StreamConfig]) -> crate::Result<()> {
    if device_id < 0 {
        return Err(HalError::invalid_device(device_id));
    }

    let mut seen = BTreeSet::new();
    for config in configs {
        if config.stream_id < 0 || !seen.insert(config.stream_id) {
            return Err(HalError::InvalidArgument(format!(
                "bad or duplicate stream id {} on device {}",
                config.stream_id, device_id
            )));
        }
        if config.stream_type != StreamType::IndependentVideoSource {
            return Err(HalError::InvalidArgument(format!(
                "stream {} on device {}: only independent video sources are supported",
                config.stream_id, device_id
            )));
        }
    }

    Ok(())
}

/// A connected input
#[derive(Debug, Clone)]
struct PresentDevice {
    info: DeviceInfo,
    configs: Vec<StreamConfig>,
}

/// Shared mock state
struct MockState {
    api_version: ApiVersion,
    initialized: bool,
    closed: bool,
    callback: Option<Arc<dyn EventCallback>>,
    devices: BTreeMap<DeviceId, PresentDevice>,
    open_streams: BTreeMap<(DeviceId, StreamId), SidebandHandle>,
    max_open_streams: usize,
    next_fd: i32,
    /// Events raised but not yet delivered, in the order they happened
    pending: VecDeque<Event>,
    /// Set while one thread is draining `pending`
    delivering: bool,
}

impl MockState {
    fn new(description: HardwareDescription) -> Self {
        let devices = description
            .devices
            .into_iter()
            .map(|d| {
                (
                    d.device_id,
                    PresentDevice {
                        info: DeviceInfo::new(d.device_id, d.input_type),
                        configs: d.configs,
                    },
                )
            })
            .collect();

        Self {
            api_version: TV_INPUT_DEVICE_API_VERSION_0_1,
            initialized: false,
            closed: false,
            callback: None,
            devices,
            open_streams: BTreeMap::new(),
            max_open_streams: description.max_open_streams,
            next_fd: FIRST_SIDEBAND_FD,
            pending: VecDeque::new(),
            delivering: false,
        }
    }

    fn check_ready(&self) -> crate::Result<()> {
        if self.closed {
            return Err(HalError::Closed);
        }
        if !self.initialized {
            return Err(HalError::NotInitialized);
        }
        Ok(())
    }

    /// Look up a device and one of its configurations
    fn config(&self, device_id: DeviceId, stream_id: StreamId) -> crate::Result<StreamConfig> {
        let device = self
            .devices
            .get(&device_id)
            .ok_or_else(|| HalError::invalid_device(device_id))?;

        device
            .configs
            .iter()
            .find(|c| c.stream_id == stream_id)
            .copied()
            .ok_or_else(|| HalError::invalid_stream(device_id, stream_id))
    }

    /// Drop every open stream of a device, returning how many were open
    fn drop_streams(&mut self, device_id: DeviceId) -> usize {
        let before = self.open_streams.len();
        self.open_streams.retain(|(d, _), _| *d != device_id);
        before - self.open_streams.len()
    }

    /// Callback to notify, if any
    fn listener(&self) -> Option<Arc<dyn EventCallback>> {
        if self.initialized && !self.closed {
            self.callback.clone()
        } else {
            None
        }
    }

    /// Queue an event behind the ones already raised; must be called under
    /// the same lock as the change it reports
    fn raise(&mut self, event: Event) {
        if self.listener().is_some() {
            self.pending.push_back(event);
        }
    }

    fn take_fd(&mut self) -> i32 {
        let fd = self.next_fd;
        self.next_fd = fd.checked_add(1).unwrap_or(FIRST_SIDEBAND_FD);
        fd
    }
}

/// In-memory TV input hardware
///
/// Clones share the same hardware, so a test can keep one clone to simulate
/// hardware changes while the consumer owns another.
#[derive(Clone)]
pub struct MockTvInput {
    state: Arc<RwLock<MockState>>,
}

impl MockTvInput {
    /// Create a new mock device with the given profile
    pub fn new(profile: MockProfile) -> Self {
        Self::with_state(MockState::new(profile.to_description()))
    }

    pub fn from_description(description: HardwareDescription) -> crate::Result<Self> {
        description.validate()?;
        Ok(Self::with_state(MockState::new(description)))
    }

    /// Create from a TOML hardware description file
    pub fn from_profile_file(path: &Path) -> crate::Result<Self> {
        let description = HardwareDescription::load(path)?;
        tracing::info!(
            "[MOCK] Loaded {} device(s) from {}",
            description.devices.len(),
            path.display()
        );
        Ok(Self::with_state(MockState::new(description)))
    }

    fn with_state(state: MockState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MockState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MockState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver queued events in order, with no lock held
    ///
    /// One thread delivers at a time. Events raised meanwhile, from another
    /// thread or from inside the callback, are delivered by that thread
    /// after the one in flight.
    fn deliver(&self) {
        {
            let mut state = self.write();
            if state.delivering {
                return;
            }
            state.delivering = true;
        }

        loop {
            let next = {
                let mut state = self.write();
                match (state.listener(), state.pending.pop_front()) {
                    (Some(callback), Some(event)) => Some((callback, event)),
                    _ => {
                        state.pending.clear();
                        state.delivering = false;
                        None
                    }
                }
            };

            let Some((callback, event)) = next else {
                return;
            };
            tracing::debug!("[MOCK] Notifying {:?}", event);
            callback.notify(&event);
        }
    }

    /// Report a different device API version
    pub fn set_api_version(&self, version: ApiVersion) {
        self.write().api_version = version;
    }

    /// Change how many streams may be open at once
    pub fn set_max_open_streams(&self, max: usize) {
        self.write().max_open_streams = max;
        tracing::debug!("[MOCK] Max open streams set to {}", max);
    }

    pub fn is_initialized(&self) -> bool {
        self.read().initialized
    }

    pub fn is_closed(&self) -> bool {
        self.read().closed
    }

    /// Devices currently connected
    pub fn present_devices(&self) -> Vec<DeviceInfo> {
        self.read().devices.values().map(|d| d.info).collect()
    }

    /// Number of streams currently open across all devices
    pub fn open_stream_count(&self) -> usize {
        self.read().open_streams.len()
    }

    pub fn is_stream_open(&self, device_id: DeviceId, stream_id: StreamId) -> bool {
        self.read().open_streams.contains_key(&(device_id, stream_id))
    }

    /// Simulate connecting an input
    pub fn plug_device(&self, info: DeviceInfo, configs: Vec<StreamConfig>) -> crate::Result<()> {
        check_device(info.device_id, &configs)?;
        {
            let mut state = self.write();
            if state.devices.contains_key(&info.device_id) {
                return Err(HalError::InvalidArgument(format!(
                    "device {} already present",
                    info.device_id
                )));
            }
            state
                .devices
                .insert(info.device_id, PresentDevice { info, configs });
            state.raise(Event::DeviceAvailable(info));
        }

        tracing::info!(
            "[MOCK] Device {} plugged ({})",
            info.device_id,
            info.input_type.name()
        );
        self.deliver();
        Ok(())
    }

    /// Simulate disconnecting an input; its open streams go away with it
    pub fn unplug_device(&self, device_id: DeviceId) -> crate::Result<()> {
        let dropped = {
            let mut state = self.write();
            if state.devices.remove(&device_id).is_none() {
                return Err(HalError::invalid_device(device_id));
            }
            state.raise(Event::DeviceUnavailable { device_id });
            state.drop_streams(device_id)
        };

        tracing::info!(
            "[MOCK] Device {} unplugged, {} stream(s) dropped",
            device_id,
            dropped
        );
        self.deliver();
        Ok(())
    }

    /// Simulate a configuration change; closes every open stream of the device
    pub fn replace_stream_configurations(
        &self,
        device_id: DeviceId,
        configs: Vec<StreamConfig>,
    ) -> crate::Result<()> {
        check_device(device_id, &configs)?;
        let dropped = {
            let mut state = self.write();
            let device = state
                .devices
                .get_mut(&device_id)
                .ok_or_else(|| HalError::invalid_device(device_id))?;
            device.configs = configs;
            state.raise(Event::StreamConfigurationsChanged { device_id });
            state.drop_streams(device_id)
        };

        tracing::info!(
            "[MOCK] Stream configurations of device {} replaced, {} stream(s) closed",
            device_id,
            dropped
        );
        self.deliver();
        Ok(())
    }
}

impl TvInputDevice for MockTvInput {
    fn api_version(&self) -> ApiVersion {
        self.read().api_version
    }

    fn initialize(&self, callback: Arc<dyn EventCallback>) -> crate::Result<()> {
        let announced = {
            let mut state = self.write();
            if state.closed {
                return Err(HalError::Closed);
            }
            if state.initialized {
                return Err(HalError::AlreadyInitialized);
            }
            state.initialized = true;
            state.callback = Some(callback);

            let present: Vec<DeviceInfo> = state.devices.values().map(|d| d.info).collect();
            for info in &present {
                state.raise(Event::DeviceAvailable(*info));
            }
            present.len()
        };

        tracing::info!("[MOCK] Initialized with {} device(s) present", announced);
        self.deliver();
        Ok(())
    }

    fn get_stream_configurations(&self, device_id: DeviceId) -> crate::Result<Vec<StreamConfig>> {
        let state = self.read();
        state.check_ready()?;

        let device = state
            .devices
            .get(&device_id)
            .ok_or_else(|| HalError::invalid_device(device_id))?;
        tracing::debug!(
            "[MOCK] Device {} has {} configuration(s)",
            device_id,
            device.configs.len()
        );
        Ok(device.configs.clone())
    }

    fn open_stream(&self, device_id: DeviceId, stream_id: StreamId) -> crate::Result<Stream> {
        let mut state = self.write();
        state.check_ready()?;

        let config = state.config(device_id, stream_id)?;
        if state.open_streams.contains_key(&(device_id, stream_id)) {
            tracing::warn!("[MOCK] Stream {}/{} already open", device_id, stream_id);
            return Err(HalError::AlreadyOpen);
        }
        if state.open_streams.len() >= state.max_open_streams {
            tracing::warn!(
                "[MOCK] Cannot open stream {}/{}: {} stream(s) already open",
                device_id,
                stream_id,
                state.open_streams.len()
            );
            return Err(HalError::Busy);
        }

        let fd = state.take_fd();
        let handle = SidebandHandle::new(vec![fd], vec![device_id, stream_id]);
        state
            .open_streams
            .insert((device_id, stream_id), handle.clone());

        tracing::debug!("[MOCK] Opened stream {}/{} (fd {})", device_id, stream_id, fd);
        Ok(Stream {
            stream_id,
            stream_type: config.stream_type,
            handle: StreamHandle::Sideband(handle),
        })
    }

    fn close_stream(&self, device_id: DeviceId, stream_id: StreamId) -> crate::Result<()> {
        let mut state = self.write();
        state.check_ready()?;

        state.config(device_id, stream_id)?;
        if state.open_streams.remove(&(device_id, stream_id)).is_none() {
            return Err(HalError::NotFound);
        }

        tracing::debug!("[MOCK] Closed stream {}/{}", device_id, stream_id);
        Ok(())
    }

    fn close(&self) -> crate::Result<()> {
        let mut state = self.write();
        if state.closed {
            return Err(HalError::Closed);
        }
        state.closed = true;
        state.callback = None;
        state.pending.clear();
        state.open_streams.clear();

        tracing::info!("[MOCK] Device closed");
        Ok(())
    }
}

/// Mock module exposing a [`MockTvInput`] under the TV input module id
#[derive(Clone)]
pub struct MockModule {
    info: ModuleInfo,
    device: MockTvInput,
}

impl MockModule {
    pub fn new(profile: MockProfile) -> Self {
        Self::with_device(MockTvInput::new(profile))
    }

    pub fn with_device(device: MockTvInput) -> Self {
        Self {
            info: ModuleInfo {
                id: TV_INPUT_HARDWARE_MODULE_ID.into(),
                name: "Mock TV input module".into(),
                author: "TV Input HAL Contributors".into(),
                module_api_version: TV_INPUT_MODULE_API_VERSION_0_1,
                hal_api_version: HAL_API_VERSION,
            },
            device,
        }
    }

    /// Handle on the simulated hardware
    pub fn device(&self) -> MockTvInput {
        self.device.clone()
    }
}

impl HardwareModule for MockModule {
    fn info(&self) -> &ModuleInfo {
        &self.info
    }

    fn open(&self, name: &str) -> crate::Result<Box<dyn TvInputDevice>> {
        if name != TV_INPUT_DEFAULT_DEVICE {
            return Err(HalError::InvalidArgument(format!("unknown device '{name}'")));
        }
        Ok(Box::new(self.device.clone()))
    }
}
