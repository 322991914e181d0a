/// 单点采集程序
///
/// 启动蓝牙扫描与传感器采样，在固定锚点采集一次，输出合并后的位置记录（JSON）。
/// 用法：blusurvey [配置文件路径]

use std::sync::Arc;

use blusurvey::algorithms::{MapAnchor, SampleBuffer};
use blusurvey::{
    BleScanner, CaptureController, CollectorHandle, Dataset, LivePositioning, LocationStore, SensorHub, SurveyConfig,
};
use log::{error, info};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> blusurvey::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => SurveyConfig::load(path)?,
        None => SurveyConfig::default(),
    };
    info!("配置: {:?}", config);

    let cancel = CancellationToken::new();
    let hub = SensorHub::new();
    let buffer = Arc::new(Mutex::new(SampleBuffer::new(config.retention())));
    let collector = CollectorHandle::spawn();

    let sampler = blusurvey::sensors::spawn_sampler(
        hub.clone(),
        buffer.clone(),
        config.sample_interval(),
        cancel.clone(),
    );

    let scanner = BleScanner::new(collector.clone(), &config)?;
    let scan_cancel = cancel.clone();
    let scan_task = tokio::spawn(async move { scanner.run(scan_cancel).await });

    let positioning = LivePositioning::new(hub.clone());
    let (estimates, positioning_task) = positioning
        .clone()
        .spawn(config.estimate_interval(), cancel.clone());

    let controller = CaptureController::new(&config, buffer, collector, LocationStore::new());
    let result = controller.capture(MapAnchor::new("survey", 0.0, 0.0)).await;

    info!("采集结束时的位置估计: {}", *estimates.borrow());

    cancel.cancel();
    if let Err(e) = sampler.await {
        error!("采样任务退出异常: {}", e);
    }
    if let Err(e) = positioning_task.await {
        error!("定位任务退出异常: {}", e);
    }
    match scan_task.await {
        Ok(Err(e)) => error!("蓝牙扫描异常: {}", e),
        Err(e) => error!("扫描任务退出异常: {}", e),
        Ok(Ok(_)) => {}
    }

    let session = result?;
    let dataset = Dataset::new(
        controller.locations().sessions().await,
        positioning.calibration_points(),
        positioning.reference_anchors(),
    );
    info!("已记录 {} 个位置，共 {} 次采集", dataset.sessions.len(), dataset.total_visits());
    println!("{}", serde_json::to_string_pretty(&session)?);

    Ok(())
}
