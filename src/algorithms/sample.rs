/// 传感器采样数据结构
///
/// 一个 `Sample` 表示某一时刻所有传感器的快照，各字段相互独立、均可缺失。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 三轴向量（磁场 µT / 角速度 rad/s）
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vector3 { x, y, z }
    }

    /// 欧几里得范数
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// GPS 定位结果
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
    /// 水平精度（米）
    pub horizontal_accuracy_m: Option<f64>,
    /// 速度（米/秒）
    pub speed_mps: Option<f64>,
    /// 航向（度）
    pub course_deg: Option<f64>,
}

impl GpsFix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GpsFix {
            latitude,
            longitude,
            horizontal_accuracy_m: None,
            speed_mps: None,
            course_deg: None,
        }
    }

    pub fn with_accuracy(mut self, horizontal_accuracy_m: f64) -> Self {
        self.horizontal_accuracy_m = Some(horizontal_accuracy_m);
        self
    }

    pub fn with_motion(mut self, speed_mps: f64, course_deg: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self.course_deg = Some(course_deg);
        self
    }

    /// 平台用负值表示速度/航向无效，这里统一转换为缺失
    pub fn sanitized(mut self) -> Self {
        self.speed_mps = self.speed_mps.filter(|v| *v >= 0.0);
        self.course_deg = self.course_deg.filter(|v| *v >= 0.0);
        self
    }
}

/// 气压计读数
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BarometerReading {
    /// 气压（kPa）
    pub pressure_kpa: f64,
    /// 相对高度（米）
    pub relative_altitude_m: f64,
}

/// 单个时刻的传感器快照，写入后不可变
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub horizontal_accuracy_m: Option<f64>,
    pub speed_mps: Option<f64>,
    pub course_deg: Option<f64>,
    /// 三轴磁场（µT）
    pub magnetic_field: Option<Vector3>,
    /// 三轴角速度（rad/s）
    pub angular_rate: Option<Vector3>,
    pub pressure_kpa: Option<f64>,
    pub relative_altitude_m: Option<f64>,
}

impl Sample {
    /// 创建不含任何传感器数据的样本
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Sample {
            timestamp,
            latitude: None,
            longitude: None,
            horizontal_accuracy_m: None,
            speed_mps: None,
            course_deg: None,
            magnetic_field: None,
            angular_rate: None,
            pressure_kpa: None,
            relative_altitude_m: None,
        }
    }

    pub fn with_gps(mut self, fix: GpsFix) -> Self {
        let fix = fix.sanitized();
        self.latitude = Some(fix.latitude);
        self.longitude = Some(fix.longitude);
        self.horizontal_accuracy_m = fix.horizontal_accuracy_m;
        self.speed_mps = fix.speed_mps;
        self.course_deg = fix.course_deg;
        self
    }

    pub fn with_magnetic_field(mut self, field: Vector3) -> Self {
        self.magnetic_field = Some(field);
        self
    }

    pub fn with_angular_rate(mut self, rate: Vector3) -> Self {
        self.angular_rate = Some(rate);
        self
    }

    pub fn with_barometer(mut self, reading: BarometerReading) -> Self {
        self.pressure_kpa = Some(reading.pressure_kpa);
        self.relative_altitude_m = Some(reading.relative_altitude_m);
        self
    }

    /// 单个样本的磁场强度（三轴范数）
    pub fn magnetic_norm(&self) -> Option<f64> {
        self.magnetic_field.map(|field| field.norm())
    }
}
