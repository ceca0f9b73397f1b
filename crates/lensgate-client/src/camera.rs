//! Camera enumeration and capability-driven option lists.

use async_trait::async_trait;
use lensgate_common::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Common resolutions offered to the user, smallest first.
pub const RESOLUTION_PRESETS: [Resolution; 6] = [
    Resolution::new(320, 240),
    Resolution::new(640, 480),
    Resolution::new(1280, 720),
    Resolution::new(1920, 1080),
    Resolution::new(2560, 1440),
    Resolution::new(3840, 2160),
];

pub const FRAME_RATE_PRESETS: [u32; 5] = [10, 15, 24, 30, 60];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDevice {
    pub device_id: String,
    #[serde(default)]
    pub label: String,
}

impl CameraDevice {
    /// Label shown in the picker; browsers hide labels until permission is granted.
    pub fn display_label(&self, index: usize) -> String {
        if self.label.trim().is_empty() {
            format!("Camera {}", index + 1)
        } else {
            self.label.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapabilityRange {
    pub min: f64,
    pub max: f64,
}

impl CapabilityRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Capability ranges reported by a device. A missing range means the device
/// did not report it and every preset is considered acceptable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCapabilities {
    pub width: Option<CapabilityRange>,
    pub height: Option<CapabilityRange>,
    pub frame_rate: Option<CapabilityRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn label(&self) -> String {
        match (self.width, self.height) {
            (1280, 720) => "1280x720 (HD)".to_string(),
            (1920, 1080) => "1920x1080 (Full HD)".to_string(),
            (3840, 2160) => "3840x2160 (4K)".to_string(),
            (w, h) => format!("{w}x{h}"),
        }
    }
}

fn within(range: Option<&CapabilityRange>, value: f64) -> bool {
    range.map_or(true, |r| r.contains(value))
}

pub fn resolution_options(caps: &DeviceCapabilities) -> Vec<Resolution> {
    RESOLUTION_PRESETS
        .iter()
        .copied()
        .filter(|res| {
            within(caps.width.as_ref(), f64::from(res.width))
                && within(caps.height.as_ref(), f64::from(res.height))
        })
        .collect()
}

pub fn frame_rate_options(caps: &DeviceCapabilities) -> Vec<u32> {
    FRAME_RATE_PRESETS
        .iter()
        .copied()
        .filter(|fps| within(caps.frame_rate.as_ref(), f64::from(*fps)))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraOptions {
    pub resolutions: Vec<Resolution>,
    pub frame_rates: Vec<u32>,
}

/// Source of camera devices and their capabilities.
#[async_trait]
pub trait CameraCatalog: Send + Sync {
    async fn list_devices(&self) -> Result<Vec<CameraDevice>>;
    async fn capabilities(&self, device_id: &str) -> Result<DeviceCapabilities>;
}

/// Option lists for one device. A capability query failure degrades to the
/// unfiltered presets instead of failing the picker.
pub async fn camera_options<C>(catalog: &C, device_id: &str) -> CameraOptions
where
    C: CameraCatalog + ?Sized,
{
    let caps = match catalog.capabilities(device_id).await {
        Ok(caps) => caps,
        Err(err) => {
            tracing::warn!("capability query for {} failed: {}", device_id, err);
            DeviceCapabilities::default()
        }
    };
    CameraOptions {
        resolutions: resolution_options(&caps),
        frame_rates: frame_rate_options(&caps),
    }
}

/// The user's camera choice, rendered as media constraints for capture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraConstraints {
    pub device_id: Option<String>,
    pub resolution: Option<Resolution>,
    pub frame_rate: Option<u32>,
}

impl CameraConstraints {
    /// `getUserMedia`-shaped constraints: exact device, ideal size and rate, no audio.
    pub fn to_media_constraints(&self) -> Value {
        let mut video = Map::new();
        if let Some(device_id) = &self.device_id {
            video.insert("deviceId".into(), json!({ "exact": device_id }));
        }
        if let Some(res) = self.resolution {
            video.insert("width".into(), json!({ "ideal": res.width }));
            video.insert("height".into(), json!({ "ideal": res.height }));
        }
        if let Some(fps) = self.frame_rate {
            video.insert("frameRate".into(), json!({ "ideal": fps }));
        }

        let video = if video.is_empty() {
            Value::Bool(true)
        } else {
            Value::Object(video)
        };
        json!({ "video": video, "audio": false })
    }
}
