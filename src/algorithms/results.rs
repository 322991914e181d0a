/// 位置估计结果数据结构
///
/// 包含地图像素坐标、所用的估计方法以及相关元数据

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 估计方法（按优先级排列）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimateMethod {
    /// Wi-Fi 指纹匹配
    WifiFingerprint,
    /// 与最近校准点几乎重合，直接取其像素
    NearestCalibration,
    /// 反距离平方加权插值
    WeightedInterpolation,
    /// 只有一个校准点
    SinglePoint,
    /// 两个参考锚点的线性比例变换
    AnchorTransform,
    /// 锚点退化（经纬度差过小）
    Degenerate,
    /// 无可用数据
    Unknown,
}

impl EstimateMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimateMethod::WifiFingerprint => "wifi_fingerprint",
            EstimateMethod::NearestCalibration => "nearest_calibration",
            EstimateMethod::WeightedInterpolation => "weighted_interpolation",
            EstimateMethod::SinglePoint => "single_point",
            EstimateMethod::AnchorTransform => "anchor_transform",
            EstimateMethod::Degenerate => "degenerate",
            EstimateMethod::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EstimateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 位置估计结果
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionEstimate {
    /// 地图像素 X
    pub x: f64,
    /// 地图像素 Y
    pub y: f64,
    /// 使用的方法
    pub method: EstimateMethod,
    /// 参与计算的校准点/锚点数量
    pub point_count: usize,
    /// Wi-Fi 指纹差异分数（仅指纹匹配时有值）
    pub wifi_score: Option<f64>,
    /// 时间戳
    pub timestamp: DateTime<Utc>,
}

impl PositionEstimate {
    pub fn new(x: f64, y: f64, method: EstimateMethod, point_count: usize) -> Self {
        PositionEstimate {
            x,
            y,
            method,
            point_count,
            wifi_score: None,
            timestamp: Utc::now(),
        }
    }

    /// 未知位置，返回原点
    pub fn unknown() -> Self {
        Self::new(0.0, 0.0, EstimateMethod::Unknown, 0)
    }

    /// 输入退化，返回原点
    pub fn degenerate(point_count: usize) -> Self {
        Self::new(0.0, 0.0, EstimateMethod::Degenerate, point_count)
    }

    pub fn with_wifi_score(mut self, score: f64) -> Self {
        self.wifi_score = Some(score);
        self
    }

    /// 是否得到了有效位置
    pub fn is_known(&self) -> bool {
        !matches!(
            self.method,
            EstimateMethod::Unknown | EstimateMethod::Degenerate
        )
    }

    /// 获取 2D 坐标
    pub fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// 与另一结果的 2D 距离（像素）
    pub fn distance_2d_to(&self, other: &PositionEstimate) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl Default for PositionEstimate {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for PositionEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}) [{}]", self.x, self.y, self.method)
    }
}
