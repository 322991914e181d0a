/// RSSI 到距离转换模型
///
/// 对数距离路径损耗模型：RSSI(d) = A + B * log10(d)，d 以米为单位。
/// 仅用于 iBeacon 的粗略距离估计，不做参数优化。

/// 室内默认路径损耗指数
pub const DEFAULT_PATH_LOSS_EXPONENT: f64 = 2.0;

/// RSSI 转距离模型
#[derive(Clone, Debug, PartialEq)]
pub struct RSSIModel {
    /// 截距 A (dBm) - 1 米处的参考功率
    pub a: f64,
    /// 斜率 B - 衰减速率
    pub b: f64,
    /// 路径损耗指数 n
    pub n: f64,
}

impl RSSIModel {
    /// 由参考功率和路径损耗指数创建模型，B = -10 * n
    pub fn log_normal_shadow(a: f64, n: f64) -> Self {
        RSSIModel { a, b: -10.0 * n, n }
    }

    /// 以 iBeacon 广播中的校准功率作为参考功率
    pub fn for_ibeacon(measured_power: i8) -> Self {
        Self::log_normal_shadow(measured_power as f64, DEFAULT_PATH_LOSS_EXPONENT)
    }

    /// 根据 RSSI 计算距离（米）
    ///
    /// 反解公式：d = 10^((RSSI - A) / B)
    pub fn rssi_to_distance(&self, rssi: i16) -> f64 {
        let exponent = (rssi as f64 - self.a) / self.b;
        10_f64.powf(exponent)
    }
}
