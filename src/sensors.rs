/// 传感器最新值与定频采样
///
/// 每个传感器用一个 `watch` 通道保存最新读数，生产者覆盖写入；
/// 采样任务按固定频率非阻塞地读取各通道当前值，组装成 `Sample` 写入缓冲区。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::algorithms::{BarometerReading, GpsFix, Sample, SampleBuffer, Vector3, WifiFingerprint};

struct SensorChannels {
    gps: watch::Sender<Option<GpsFix>>,
    magnetometer: watch::Sender<Option<Vector3>>,
    gyroscope: watch::Sender<Option<Vector3>>,
    barometer: watch::Sender<Option<BarometerReading>>,
    wifi: watch::Sender<Option<WifiFingerprint>>,
}

/// 各传感器的最新读数
#[derive(Clone)]
pub struct SensorHub {
    channels: Arc<SensorChannels>,
}

impl SensorHub {
    pub fn new() -> Self {
        SensorHub {
            channels: Arc::new(SensorChannels {
                gps: watch::Sender::new(None),
                magnetometer: watch::Sender::new(None),
                gyroscope: watch::Sender::new(None),
                barometer: watch::Sender::new(None),
                wifi: watch::Sender::new(None),
            }),
        }
    }

    /// 写入 GPS，负的速度/航向视为缺失
    pub fn publish_gps(&self, fix: GpsFix) {
        self.channels.gps.send_replace(Some(fix.sanitized()));
    }

    pub fn publish_magnetometer(&self, field_ut: Vector3) {
        self.channels.magnetometer.send_replace(Some(field_ut));
    }

    pub fn publish_gyroscope(&self, rate_rad_s: Vector3) {
        self.channels.gyroscope.send_replace(Some(rate_rad_s));
    }

    pub fn publish_barometer(&self, reading: BarometerReading) {
        self.channels.barometer.send_replace(Some(reading));
    }

    pub fn publish_wifi_scan(&self, scan: WifiFingerprint) {
        self.channels.wifi.send_replace(Some(scan));
    }

    /// GPS 失效（例如进入室内后丢失定位）
    pub fn clear_gps(&self) {
        self.channels.gps.send_replace(None);
    }

    pub fn latest_gps(&self) -> Option<GpsFix> {
        *self.channels.gps.borrow()
    }

    pub fn latest_magnetometer(&self) -> Option<Vector3> {
        *self.channels.magnetometer.borrow()
    }

    pub fn latest_gyroscope(&self) -> Option<Vector3> {
        *self.channels.gyroscope.borrow()
    }

    pub fn latest_barometer(&self) -> Option<BarometerReading> {
        *self.channels.barometer.borrow()
    }

    pub fn latest_wifi_scan(&self) -> Option<WifiFingerprint> {
        self.channels.wifi.borrow().clone()
    }

    /// 组装当前时刻的快照
    pub fn snapshot(&self, timestamp: DateTime<Utc>) -> Sample {
        let mut sample = Sample::empty(timestamp);
        if let Some(fix) = self.latest_gps() {
            sample = sample.with_gps(fix);
        }
        if let Some(field) = self.latest_magnetometer() {
            sample = sample.with_magnetic_field(field);
        }
        if let Some(rate) = self.latest_gyroscope() {
            sample = sample.with_angular_rate(rate);
        }
        if let Some(reading) = self.latest_barometer() {
            sample = sample.with_barometer(reading);
        }
        sample
    }
}

impl Default for SensorHub {
    fn default() -> Self {
        Self::new()
    }
}

/// 定频采样循环，直到取消
pub async fn run_sampler(
    hub: SensorHub,
    buffer: Arc<Mutex<SampleBuffer>>,
    interval: Duration,
    cancel: CancellationToken,
) -> usize {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut appended = 0;

    info!("采样任务启动，间隔 {} ms", interval.as_millis());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let sample = hub.snapshot(Utc::now());
                buffer.lock().await.append(sample);
                appended += 1;
            }
            _ = cancel.cancelled() => {
                debug!("采样任务停止，共写入 {} 个样本", appended);
                break;
            }
        }
    }

    appended
}

pub fn spawn_sampler(
    hub: SensorHub,
    buffer: Arc<Mutex<SampleBuffer>>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<usize> {
    tokio::spawn(run_sampler(hub, buffer, interval, cancel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reads_latest_values() {
        let hub = SensorHub::new();
        assert_eq!(hub.snapshot(Utc::now()).latitude, None);

        hub.publish_gps(GpsFix::new(31.0, 121.0).with_motion(-1.0, 90.0));
        hub.publish_gps(GpsFix::new(31.5, 121.5).with_motion(-1.0, 90.0));
        hub.publish_magnetometer(Vector3::new(3.0, 4.0, 0.0));

        let sample = hub.snapshot(Utc::now());
        assert_eq!(sample.latitude, Some(31.5));
        assert_eq!(sample.speed_mps, None);
        assert_eq!(sample.course_deg, Some(90.0));
        assert_eq!(sample.magnetic_norm(), Some(5.0));
        assert_eq!(sample.pressure_kpa, None);

        hub.clear_gps();
        assert_eq!(hub.snapshot(Utc::now()).latitude, None);
    }
}
