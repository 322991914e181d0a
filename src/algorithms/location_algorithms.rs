/// 实时位置估计
///
/// 按优先级依次尝试：
/// 1. Wi-Fi 指纹匹配（分数低于阈值时直接采用）
/// 2. 反距离平方加权插值（至少 2 个校准点）
/// 3. 单个校准点
/// 4. 两个参考锚点的线性比例变换
/// 5. 无数据，返回原点
///
/// 估计是尽力而为的，任何输入都不会产生错误。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::algorithms::{EstimateMethod, PositionEstimate};

/// 地球平均半径（米）
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
/// 没有任何 AP 匹配时的分数
pub const NO_MATCH_SCORE: f64 = 1.0e9;

// ============================================================================
// 输入数据结构
// ============================================================================

/// Wi-Fi 指纹：AP 标识 -> RSSI
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WifiFingerprint {
    readings: HashMap<String, i16>,
}

impl WifiFingerprint {
    pub fn new() -> Self {
        WifiFingerprint {
            readings: HashMap::new(),
        }
    }

    /// 从 (AP 标识, RSSI) 对的向量创建
    pub fn from_pairs(pairs: Vec<(&str, i16)>) -> Self {
        let mut fingerprint = WifiFingerprint::new();
        for (ap, rssi) in pairs {
            fingerprint.add(ap.to_string(), rssi);
        }
        fingerprint
    }

    pub fn add(&mut self, ap: String, rssi: i16) {
        self.readings.insert(ap, rssi);
    }

    pub fn get(&self, ap: &str) -> Option<i16> {
        self.readings.get(ap).copied()
    }

    pub fn all(&self) -> &HashMap<String, i16> {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// GPS 坐标（度）
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GpsCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GpsCoordinate {
            latitude,
            longitude,
        }
    }

    /// 大圆距离（米，haversine 公式）
    pub fn distance_m(&self, other: &GpsCoordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }
}

/// 地图像素坐标
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        PixelPoint { x, y }
    }
}

/// 校准点：GPS 与像素的对应关系，可附带 Wi-Fi 指纹
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub gps: GpsCoordinate,
    pub pixel: PixelPoint,
    #[serde(default)]
    pub wifi: WifiFingerprint,
}

impl CalibrationPoint {
    pub fn new(gps: GpsCoordinate, pixel: PixelPoint) -> Self {
        CalibrationPoint {
            gps,
            pixel,
            wifi: WifiFingerprint::new(),
        }
    }

    pub fn with_wifi(mut self, wifi: WifiFingerprint) -> Self {
        self.wifi = wifi;
        self
    }
}

/// 固定参考锚点
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceAnchor {
    pub gps: GpsCoordinate,
    pub pixel: PixelPoint,
}

impl ReferenceAnchor {
    pub fn new(gps: GpsCoordinate, pixel: PixelPoint) -> Self {
        ReferenceAnchor { gps, pixel }
    }
}

// ============================================================================
// 位置估计器
// ============================================================================

/// 位置估计器参数
#[derive(Clone, Debug)]
pub struct PositionEstimator {
    /// 指纹分数低于该值时采用指纹结果
    pub wifi_match_threshold: f64,
    /// 实时扫描中有、校准指纹中没有的 AP 的惩罚
    pub missing_ap_penalty: f64,
    /// 与最近校准点距离小于该值（米）时直接返回其像素
    pub exact_match_radius_m: f64,
    /// 插值使用的最近校准点数量上限
    pub max_neighbours: usize,
    /// 锚点经纬度差的最小值（度）
    pub anchor_epsilon_deg: f64,
}

impl Default for PositionEstimator {
    fn default() -> Self {
        PositionEstimator {
            wifi_match_threshold: 30.0,
            missing_ap_penalty: 100.0,
            exact_match_radius_m: 0.5,
            max_neighbours: 3,
            anchor_epsilon_deg: 1e-9,
        }
    }
}

impl PositionEstimator {
    /// 估计当前像素位置
    ///
    /// # 参数
    /// - `gps`: 当前 GPS 坐标
    /// - `calibration`: 校准点
    /// - `anchors`: 没有校准点时使用的固定参考锚点
    /// - `wifi`: 当前 Wi-Fi 扫描结果
    pub fn estimate(
        &self,
        gps: Option<GpsCoordinate>,
        calibration: &[CalibrationPoint],
        anchors: &[ReferenceAnchor],
        wifi: Option<&WifiFingerprint>,
    ) -> PositionEstimate {
        if let Some(scan) = wifi {
            if let Some(estimate) = self.wifi_snap(scan, calibration) {
                return estimate;
            }
        }

        match (calibration.len(), gps) {
            (0, Some(gps)) if anchors.len() >= 2 => self.anchor_transform(gps, &anchors[0], &anchors[1]),
            (0, _) => PositionEstimate::unknown(),
            (1, _) => {
                let pixel = calibration[0].pixel;
                PositionEstimate::new(pixel.x, pixel.y, EstimateMethod::SinglePoint, 1)
            }
            (_, Some(gps)) => self.weighted_interpolation(gps, calibration),
            (_, None) => PositionEstimate::unknown(),
        }
    }

    /// 指纹差异分数
    ///
    /// 对实时扫描中的每个 AP：校准指纹中存在则累加 RSSI 差的绝对值并计数，
    /// 不存在则累加固定惩罚。总和除以匹配数（不是 AP 总数）。
    pub fn wifi_score(&self, live: &WifiFingerprint, calibrated: &WifiFingerprint) -> f64 {
        let mut total = 0.0;
        let mut matches = 0usize;

        for (ap, live_rssi) in live.all() {
            match calibrated.get(ap) {
                Some(cal_rssi) => {
                    total += (*live_rssi as f64 - cal_rssi as f64).abs();
                    matches += 1;
                }
                None => total += self.missing_ap_penalty,
            }
        }

        if matches == 0 {
            NO_MATCH_SCORE
        } else {
            total / matches as f64
        }
    }

    fn wifi_snap(
        &self,
        live: &WifiFingerprint,
        calibration: &[CalibrationPoint],
    ) -> Option<PositionEstimate> {
        let (score, best) = calibration
            .iter()
            .filter(|point| !point.wifi.is_empty())
            .map(|point| (self.wifi_score(live, &point.wifi), point))
            .min_by(|a, b| a.0.total_cmp(&b.0))?;

        if score < self.wifi_match_threshold {
            Some(
                PositionEstimate::new(best.pixel.x, best.pixel.y, EstimateMethod::WifiFingerprint, 1)
                    .with_wifi_score(score),
            )
        } else {
            None
        }
    }

    /// 反距离平方加权插值，weight_i = 1 / d_i²
    fn weighted_interpolation(
        &self,
        gps: GpsCoordinate,
        calibration: &[CalibrationPoint],
    ) -> PositionEstimate {
        let mut by_distance: Vec<(f64, &CalibrationPoint)> = calibration
            .iter()
            .map(|point| (gps.distance_m(&point.gps), point))
            .collect();
        by_distance.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (nearest_distance, nearest) = by_distance[0];
        if nearest_distance < self.exact_match_radius_m {
            return PositionEstimate::new(
                nearest.pixel.x,
                nearest.pixel.y,
                EstimateMethod::NearestCalibration,
                1,
            );
        }

        let k = self.max_neighbours.max(1).min(by_distance.len());
        let mut sum_w = 0.0;
        let mut sum_wx = 0.0;
        let mut sum_wy = 0.0;
        for (distance, point) in &by_distance[..k] {
            let weight = 1.0 / (distance * distance);
            sum_w += weight;
            sum_wx += weight * point.pixel.x;
            sum_wy += weight * point.pixel.y;
        }

        PositionEstimate::new(
            sum_wx / sum_w,
            sum_wy / sum_w,
            EstimateMethod::WeightedInterpolation,
            k,
        )
    }

    /// 两锚点线性比例变换：经度对应 X，纬度对应 Y
    fn anchor_transform(
        &self,
        gps: GpsCoordinate,
        first: &ReferenceAnchor,
        second: &ReferenceAnchor,
    ) -> PositionEstimate {
        let dlon = second.gps.longitude - first.gps.longitude;
        let dlat = second.gps.latitude - first.gps.latitude;
        if dlon.abs() < self.anchor_epsilon_deg || dlat.abs() < self.anchor_epsilon_deg {
            return PositionEstimate::degenerate(2);
        }

        let ratio_x = (gps.longitude - first.gps.longitude) / dlon;
        let ratio_y = (gps.latitude - first.gps.latitude) / dlat;

        let x = first.pixel.x + ratio_x * (second.pixel.x - first.pixel.x);
        let y = first.pixel.y + ratio_y * (second.pixel.y - first.pixel.y);

        PositionEstimate::new(x, y, EstimateMethod::AnchorTransform, 2)
    }
}
