/// 蓝牙广播观测数据结构
///
/// 包括：
/// - 广播事件 `Advertisement`（由扫描层解析后传入）
/// - iBeacon 厂商数据解析
/// - 设备匿名标识（标识符的 SHA-256 单向哈希）
/// - 观测记录 `BleSample` 及其统计

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::algorithms::RSSIModel;

/// Apple 公司 ID（小端序写在厂商数据开头）
pub const APPLE_COMPANY_ID: u16 = 0x004C;
/// iBeacon 类型字节
pub const IBEACON_TYPE: u8 = 0x02;
/// iBeacon 数据长度字节
pub const IBEACON_DATA_LENGTH: u8 = 0x15;
/// 完整 iBeacon 厂商数据长度：公司 ID(2) + 类型/长度(2) + UUID(16) + major(2) + minor(2) + 发射功率(1)
pub const IBEACON_PAYLOAD_LEN: usize = 25;

/// 单次广播事件
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advertisement {
    /// 设备的稳定标识符（蓝牙地址等）
    pub identifier: String,
    /// 信号强度 (dBm)
    pub rssi: i16,
    /// 广播的本地名称
    pub local_name: Option<String>,
    /// 厂商数据，包含公司 ID 前缀
    pub manufacturer_data: Option<Vec<u8>>,
}

impl Advertisement {
    pub fn new(identifier: impl Into<String>, rssi: i16) -> Self {
        Advertisement {
            identifier: identifier.into(),
            rssi,
            local_name: None,
            manufacturer_data: None,
        }
    }

    pub fn with_local_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = Some(name.into());
        self
    }

    pub fn with_manufacturer_data(mut self, payload: Vec<u8>) -> Self {
        self.manufacturer_data = Some(payload);
        self
    }
}

/// iBeacon 广播内容
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IBeaconFrame {
    pub uuid: Uuid,
    pub major: u16,
    pub minor: u16,
    /// 1 米处的校准功率 (dBm)
    pub measured_power: i8,
}

impl IBeaconFrame {
    /// 解析厂商数据
    ///
    /// 长度不足或公司 ID/类型/长度不匹配时返回 None，不视为错误。
    pub fn decode(payload: &[u8]) -> Option<Self> {
        if payload.len() < IBEACON_PAYLOAD_LEN {
            return None;
        }

        let [company_lo, company_hi] = APPLE_COMPANY_ID.to_le_bytes();
        if payload[0] != company_lo
            || payload[1] != company_hi
            || payload[2] != IBEACON_TYPE
            || payload[3] != IBEACON_DATA_LENGTH
        {
            return None;
        }

        let uuid = Uuid::from_slice(&payload[4..20]).ok()?;
        let major = u16::from_be_bytes([payload[20], payload[21]]);
        let minor = u16::from_be_bytes([payload[22], payload[23]]);
        let measured_power = payload[24] as i8;

        Some(IBeaconFrame {
            uuid,
            major,
            minor,
            measured_power,
        })
    }
}

/// 设备匿名标识：标识符的 SHA-256 十六进制摘要
pub fn device_key(identifier: &str) -> String {
    hex::encode(Sha256::digest(identifier.as_bytes()))
}

/// 单条蓝牙观测记录，写入后不可变
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BleSample {
    pub session_id: String,
    /// 相对采集开始的毫秒偏移
    pub offset_ms: u64,
    /// 匿名设备标识，作为主键使用
    pub device_key: String,
    /// 原始标识符，仅用于调试
    pub identifier: String,
    pub rssi: i16,
    pub local_name: Option<String>,
    pub ibeacon: Option<IBeaconFrame>,
}

impl BleSample {
    pub fn from_advertisement(session_id: String, offset_ms: u64, ad: &Advertisement) -> Self {
        let ibeacon = ad
            .manufacturer_data
            .as_deref()
            .and_then(IBeaconFrame::decode);

        BleSample {
            session_id,
            offset_ms,
            device_key: device_key(&ad.identifier),
            identifier: ad.identifier.clone(),
            rssi: ad.rssi,
            local_name: ad.local_name.clone(),
            ibeacon,
        }
    }

    pub fn is_ibeacon(&self) -> bool {
        self.ibeacon.is_some()
    }

    /// 按 iBeacon 校准功率估算距离（米），非 iBeacon 返回 None
    pub fn estimated_distance_m(&self) -> Option<f64> {
        self.ibeacon
            .as_ref()
            .map(|frame| RSSIModel::for_ibeacon(frame.measured_power).rssi_to_distance(self.rssi))
    }
}

/// 蓝牙观测统计
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BleStats {
    pub unique_devices: usize,
    pub total_samples: usize,
    pub ibeacon_samples: usize,
}

impl BleStats {
    pub fn from_samples(samples: &[BleSample]) -> Self {
        let unique: HashSet<&str> = samples.iter().map(|s| s.device_key.as_str()).collect();
        BleStats {
            unique_devices: unique.len(),
            total_samples: samples.len(),
            ibeacon_samples: samples.iter().filter(|s| s.is_ibeacon()).count(),
        }
    }
}
