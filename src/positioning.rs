/// 实时定位
///
/// 支持的功能：
/// - 校准点的追加式存储
/// - 结合最新 GPS、Wi-Fi 扫描、校准点与参考锚点估计当前像素位置
/// - 定时估计并通过 `watch` 通道发布最新结果

use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{debug, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::algorithms::{
    CalibrationPoint, GpsCoordinate, PixelPoint, PositionEstimate, PositionEstimator, ReferenceAnchor,
};
use crate::sensors::SensorHub;

/// 校准点集合（只追加）
#[derive(Clone, Debug, Default)]
pub struct CalibrationStore {
    points: Vec<CalibrationPoint>,
}

impl CalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: Vec<CalibrationPoint>) -> Self {
        CalibrationStore { points }
    }

    pub fn add(&mut self, point: CalibrationPoint) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

struct PositioningState {
    calibration: CalibrationStore,
    anchors: Vec<ReferenceAnchor>,
}

/// 实时定位服务
#[derive(Clone)]
pub struct LivePositioning {
    hub: SensorHub,
    state: Arc<RwLock<PositioningState>>,
    estimator: PositionEstimator,
}

impl LivePositioning {
    pub fn new(hub: SensorHub) -> Self {
        Self::with_estimator(hub, PositionEstimator::default())
    }

    pub fn with_estimator(hub: SensorHub, estimator: PositionEstimator) -> Self {
        LivePositioning {
            hub,
            state: Arc::new(RwLock::new(PositioningState {
                calibration: CalibrationStore::new(),
                anchors: Vec::new(),
            })),
            estimator,
        }
    }

    /// 用已持久化的校准点和锚点初始化
    pub fn restore(&self, calibration: CalibrationStore, anchors: Vec<ReferenceAnchor>) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.calibration = calibration;
        state.anchors = anchors;
    }

    pub fn add_calibration_point(&self, point: CalibrationPoint) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.calibration.add(point);
        debug!("新增校准点，共 {} 个", state.calibration.len());
    }

    /// 以当前 GPS 与 Wi-Fi 扫描在给定像素处登记校准点；没有 GPS 时返回 None
    pub fn calibrate_here(&self, pixel_x: f64, pixel_y: f64) -> Option<CalibrationPoint> {
        let fix = self.hub.latest_gps()?;
        let mut point = CalibrationPoint::new(
            GpsCoordinate::new(fix.latitude, fix.longitude),
            PixelPoint::new(pixel_x, pixel_y),
        );
        if let Some(scan) = self.hub.latest_wifi_scan() {
            point = point.with_wifi(scan);
        }
        self.add_calibration_point(point.clone());
        Some(point)
    }

    pub fn set_reference_anchors(&self, anchors: Vec<ReferenceAnchor>) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.anchors = anchors;
    }

    pub fn calibration_points(&self) -> Vec<CalibrationPoint> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.calibration.points().to_vec()
    }

    pub fn reference_anchors(&self) -> Vec<ReferenceAnchor> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.anchors.clone()
    }

    /// 按当前传感器读数估计一次
    pub fn current_estimate(&self) -> PositionEstimate {
        let gps = self
            .hub
            .latest_gps()
            .map(|fix| GpsCoordinate::new(fix.latitude, fix.longitude));
        let wifi = self.hub.latest_wifi_scan();

        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        self.estimator.estimate(
            gps,
            state.calibration.points(),
            &state.anchors,
            wifi.as_ref(),
        )
    }

    /// 定时估计并发布，直到取消
    pub async fn run(
        self,
        interval: Duration,
        publisher: watch::Sender<PositionEstimate>,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("实时定位启动，间隔 {} ms", interval.as_millis());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let estimate = self.current_estimate();
                    debug!("位置估计: {}", estimate);
                    publisher.send_replace(estimate);
                }
                _ = cancel.cancelled() => break,
            }
        }

        debug!("实时定位停止");
    }

    /// 在后台启动定位循环，返回结果接收端
    pub fn spawn(
        self,
        interval: Duration,
        cancel: CancellationToken,
    ) -> (watch::Receiver<PositionEstimate>, JoinHandle<()>) {
        let (tx, rx) = watch::channel(PositionEstimate::unknown());
        let handle = tokio::spawn(self.run(interval, tx, cancel));
        (rx, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{EstimateMethod, GpsFix, WifiFingerprint};

    #[test]
    fn test_calibration_store_is_append_only() {
        let mut store = CalibrationStore::new();
        assert!(store.is_empty());
        store.add(CalibrationPoint::new(GpsCoordinate::new(31.0, 121.0), PixelPoint::new(1.0, 2.0)));
        store.add(CalibrationPoint::new(GpsCoordinate::new(31.1, 121.1), PixelPoint::new(3.0, 4.0)));
        assert_eq!(store.len(), 2);
        assert_eq!(store.points()[0].pixel, PixelPoint::new(1.0, 2.0));
    }

    #[test]
    fn test_estimate_without_data_is_unknown() {
        let positioning = LivePositioning::new(SensorHub::new());
        let estimate = positioning.current_estimate();
        assert_eq!(estimate.method, EstimateMethod::Unknown);
        assert_eq!(estimate.xy(), (0.0, 0.0));
    }

    #[test]
    fn test_calibrate_here_uses_latest_readings() {
        let hub = SensorHub::new();
        let positioning = LivePositioning::new(hub.clone());
        assert!(positioning.calibrate_here(10.0, 20.0).is_none());

        hub.publish_gps(GpsFix::new(31.0, 121.0));
        hub.publish_wifi_scan(WifiFingerprint::from_pairs(vec![("ap-1", -50)]));
        let point = positioning.calibrate_here(10.0, 20.0).unwrap();
        assert_eq!(point.wifi.get("ap-1"), Some(-50));

        // 单个校准点：直接返回其像素
        let estimate = positioning.current_estimate();
        assert_eq!(estimate.xy(), (10.0, 20.0));
    }
}
