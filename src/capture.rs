/// 单次位置采集
///
/// 流程：
/// 1. 检查并设置“采集中”标记，已有采集时直接拒绝
/// 2. 以新的会话 ID 启动指纹采集
/// 3. 非阻塞等待采集时长
/// 4. 停止指纹采集，读取 [开始 - 预热, 结束] 的样本并汇总
/// 5. 并入位置集合
///
/// 采集一旦开始就会执行完毕，调用方放弃时丢弃结果即可。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::info;
use tokio::sync::Mutex;
use tokio::time::sleep;
use uuid::Uuid;

use crate::algorithms::{BleStats, CaptureSession, LocationAggregator, MapAnchor, SampleBuffer, WindowSummarizer};
use crate::collector::CollectorHandle;
use crate::config::SurveyConfig;
use crate::dataset::LocationStore;
use crate::error::{Result, SurveyError};

/// 采集中标记，离开作用域时自动清除
struct CaptureGuard<'a>(&'a AtomicBool);

impl<'a> CaptureGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CaptureGuard(flag))
    }
}

impl Drop for CaptureGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct CaptureController {
    buffer: Arc<Mutex<SampleBuffer>>,
    collector: CollectorHandle,
    locations: LocationStore,
    summarizer: WindowSummarizer,
    aggregator: LocationAggregator,
    capture_duration: Duration,
    prewarm: chrono::Duration,
    capturing: AtomicBool,
}

impl CaptureController {
    pub fn new(
        config: &SurveyConfig,
        buffer: Arc<Mutex<SampleBuffer>>,
        collector: CollectorHandle,
        locations: LocationStore,
    ) -> Self {
        CaptureController {
            buffer,
            collector,
            locations,
            summarizer: WindowSummarizer::new(config.window_count),
            aggregator: LocationAggregator::new(config.proximity_threshold_m, config.meters_per_unit),
            capture_duration: config.capture_duration(),
            prewarm: config.prewarm(),
            capturing: AtomicBool::new(false),
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Acquire)
    }

    pub fn locations(&self) -> &LocationStore {
        &self.locations
    }

    /// 在给定锚点采集一次，返回合并后的位置记录
    pub async fn capture(&self, anchor: MapAnchor) -> Result<CaptureSession> {
        let _guard = CaptureGuard::acquire(&self.capturing).ok_or(SurveyError::CaptureInProgress)?;

        let session_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        self.collector.start(session_id.clone()).await?;
        info!(
            "开始采集 {} @ {} ({:.1}, {:.1})",
            session_id, anchor.page_id, anchor.x, anchor.y
        );

        sleep(self.capture_duration).await;

        let ble_samples = self.collector.stop().await?;
        let ended_at = Utc::now();
        let samples = self
            .buffer
            .lock()
            .await
            .slice(started_at - self.prewarm, ended_at);

        let stats = BleStats::from_samples(&ble_samples);
        let summary = self.summarizer.summarize(&samples).with_ble(&stats);
        info!(
            "采集 {} 完成: {} 个样本, {} 个蓝牙设备, {} 条蓝牙观测",
            session_id, summary.sample_count, stats.unique_devices, stats.total_samples
        );

        let session = CaptureSession::new(session_id, started_at, anchor, summary, samples, ble_samples);
        let merged = self.locations.merge(&self.aggregator, session).await;
        if merged.averaged_from_count > 1 {
            info!(
                "与已有位置合并，累计 {} 次采集",
                merged.averaged_from_count
            );
        }

        Ok(merged)
    }
}
