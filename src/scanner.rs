/// 蓝牙扫描接入
///
/// 使用 btleplug 扫描周围设备，定期读取外设属性并作为广播事件投递给指纹采集任务。
/// 扫描启动成功后通知采集任务硬件就绪，结束时通知不可用。

use std::collections::HashMap;
use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager as PlatformManager};
use log::{info, warn};
use regex::Regex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::algorithms::{Advertisement, APPLE_COMPANY_ID};
use crate::collector::CollectorHandle;
use crate::config::SurveyConfig;
use crate::error::{Result, SurveyError};

/// 蓝牙扫描器
pub struct BleScanner {
    collector: CollectorHandle,
    name_filter: Option<Regex>,
    poll_interval: Duration,
}

impl BleScanner {
    pub fn new(collector: CollectorHandle, config: &SurveyConfig) -> Result<Self> {
        let name_filter = config
            .name_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()?;

        Ok(BleScanner {
            collector,
            name_filter,
            poll_interval: config.scan_poll_interval(),
        })
    }

    /// 按设备名称过滤；设置了过滤条件时，没有名称的设备被丢弃
    pub fn accepts(&self, local_name: Option<&str>) -> bool {
        match (&self.name_filter, local_name) {
            (None, _) => true,
            (Some(pattern), Some(name)) => pattern.is_match(name),
            (Some(_), None) => false,
        }
    }

    /// 持续扫描直到取消，返回投递的广播事件数
    pub async fn run(self, cancel: CancellationToken) -> Result<usize> {
        let manager = PlatformManager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters.into_iter().next().ok_or(SurveyError::NoAdapter)?;

        adapter.start_scan(ScanFilter::default()).await?;
        self.collector.mark_ready().await?;
        info!("蓝牙扫描已启动");

        let result = self.poll_peripherals(&adapter, &cancel).await;

        if let Err(e) = adapter.stop_scan().await {
            warn!("停止蓝牙扫描失败: {}", e);
        }
        self.collector.mark_unavailable().await?;

        let forwarded = result?;
        info!("蓝牙扫描结束，共投递 {} 条广播", forwarded);
        Ok(forwarded)
    }

    async fn poll_peripherals(&self, adapter: &Adapter, cancel: &CancellationToken) -> Result<usize> {
        let mut forwarded = 0;

        while !cancel.is_cancelled() {
            let peripherals = adapter.peripherals().await?;

            for peripheral in peripherals {
                // 单个设备查询失败，继续处理其他设备
                let Ok(Some(props)) = peripheral.properties().await else {
                    continue;
                };
                let Some(rssi) = props.rssi else {
                    continue;
                };
                if !self.accepts(props.local_name.as_deref()) {
                    continue;
                }

                let ad = advertisement_from_parts(
                    props.address.to_string(),
                    rssi,
                    props.local_name,
                    &props.manufacturer_data,
                );
                self.collector.advertise(ad).await?;
                forwarded += 1;
            }

            tokio::select! {
                _ = sleep(self.poll_interval) => {}
                _ = cancel.cancelled() => {}
            }
        }

        Ok(forwarded)
    }
}

/// 由外设属性组装广播事件
///
/// btleplug 的厂商数据按公司 ID 分组且去掉了 ID 前缀，这里优先取 Apple 的数据并补回
/// 小端序公司 ID，使其与原始广播的厂商数据布局一致。
pub fn advertisement_from_parts(
    identifier: String,
    rssi: i16,
    local_name: Option<String>,
    manufacturer_data: &HashMap<u16, Vec<u8>>,
) -> Advertisement {
    let payload = manufacturer_data
        .get(&APPLE_COMPANY_ID)
        .map(|data| (APPLE_COMPANY_ID, data))
        .or_else(|| manufacturer_data.iter().next().map(|(id, data)| (*id, data)))
        .map(|(company_id, data)| {
            let mut payload = company_id.to_le_bytes().to_vec();
            payload.extend_from_slice(data);
            payload
        });

    Advertisement {
        identifier,
        rssi,
        local_name,
        manufacturer_data: payload,
    }
}
