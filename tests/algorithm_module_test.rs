/// 算法模块综合测试
///
/// 覆盖样本汇总、iBeacon 解析、位置合并与位置估计的组合使用

#[cfg(test)]
mod tests {
    use blusurvey::algorithms::*;
    use chrono::{Duration, TimeZone, Utc};

    fn ibeacon_payload(major: u16, minor: u16, measured_power: i8) -> Vec<u8> {
        let mut payload = vec![0x4C, 0x00, 0x02, 0x15];
        payload.extend_from_slice(&[
            0xE2, 0xC5, 0x6D, 0xB5, 0xDF, 0xFB, 0x48, 0xD2, 0xB0, 0x60, 0xD0, 0xF5, 0xA7, 0x10, 0x96,
            0xE0,
        ]);
        payload.extend_from_slice(&major.to_be_bytes());
        payload.extend_from_slice(&minor.to_be_bytes());
        payload.push(measured_power as u8);
        payload
    }

    #[test]
    fn test_algorithm_module_buffer_to_summary() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut buffer = SampleBuffer::default();

        // 5 秒、20 Hz，其中一个 GPS 跳点
        for i in 0..100 {
            let ts = start + Duration::milliseconds(i * 50);
            let latitude = if i == 42 { 45.0 } else { 31.2304 };
            let sample = Sample::empty(ts)
                .with_gps(GpsFix::new(latitude, 121.4737).with_accuracy(5.0))
                .with_magnetic_field(Vector3::new(30.0, 40.0, 0.0));
            buffer.append(sample);
        }
        assert_eq!(buffer.len(), 100);

        let samples = buffer.slice(start, start + Duration::seconds(5));
        let summary = WindowSummarizer::default().summarize(&samples);

        println!("汇总: {:?}", summary);
        assert_eq!(summary.sample_count, 100);
        assert!((summary.latitude.unwrap() - 31.2304).abs() < 1e-9);
        assert_eq!(summary.magnetic_norm_ut, Some(50.0));
        assert_eq!(summary.pressure_kpa, None);
    }

    #[test]
    fn test_algorithm_module_ibeacon_sample() {
        let ad = Advertisement::new("20:A7:16:5E:C5:D6", -65)
            .with_local_name("RFstar_C5D6")
            .with_manufacturer_data(ibeacon_payload(100, 7, -59));

        let sample = BleSample::from_advertisement("session-1".to_string(), 120, &ad);
        let frame = sample.ibeacon.as_ref().unwrap();
        assert_eq!(frame.major, 100);
        assert_eq!(frame.minor, 7);
        assert_eq!(frame.measured_power, -59);
        assert_eq!(sample.device_key, device_key("20:A7:16:5E:C5:D6"));
        assert_eq!(sample.device_key.len(), 64);

        let distance = sample.estimated_distance_m().unwrap();
        println!("估算距离: {:.2} m", distance);
        assert!(distance > 1.0);

        // 长度不足的厂商数据不是 iBeacon
        let short = Advertisement::new("x", -70).with_manufacturer_data(vec![0x4C, 0x00, 0x02]);
        assert!(!BleSample::from_advertisement("s".into(), 0, &short).is_ibeacon());
    }

    #[test]
    fn test_algorithm_module_collector_session() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut collector = FingerprintCollector::new();

        collector.start("pending", t0);
        assert!(matches!(collector.state(), CollectorState::PendingStart { .. }));
        assert!(collector.record(&Advertisement::new("a", -60), t0).is_none());

        assert!(collector.mark_ready(t0 + Duration::milliseconds(300)));
        collector.record(&Advertisement::new("a", -60), t0 + Duration::milliseconds(400));
        collector.record(&Advertisement::new("a", -61), t0 + Duration::milliseconds(500));
        collector.record(
            &Advertisement::new("b", -70).with_manufacturer_data(ibeacon_payload(1, 2, -59)),
            t0 + Duration::milliseconds(600),
        );

        let stats = collector.stats();
        assert_eq!(stats, BleStats { unique_devices: 2, total_samples: 3, ibeacon_samples: 1 });

        let samples = collector.stop();
        assert_eq!(samples[0].offset_ms, 100);
        assert!(samples.iter().all(|s| s.session_id == "pending"));
        assert_eq!(collector.state(), &CollectorState::Idle);
    }

    #[test]
    fn test_algorithm_module_merge_two_visits() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let aggregator = LocationAggregator::default();

        let first = CaptureSession::new(
            "visit-1",
            t0,
            MapAnchor::new("floor-1", 100.0, 100.0),
            CaptureSummary {
                horizontal_accuracy_m: Some(10.0),
                ble_total_samples: 4,
                sample_count: 100,
                ..Default::default()
            },
            Vec::new(),
            Vec::new(),
        );
        let second = CaptureSession::new(
            "visit-2",
            t0 + Duration::minutes(5),
            MapAnchor::new("floor-1", 110.0, 100.0),
            CaptureSummary {
                horizontal_accuracy_m: Some(20.0),
                ble_total_samples: 6,
                sample_count: 100,
                ..Default::default()
            },
            Vec::new(),
            Vec::new(),
        );

        let outcome = aggregator.merge_into(vec![first], second);
        assert_eq!(outcome.locations.len(), 1);

        let merged = outcome.merged;
        assert_eq!(merged.id, "visit-2");
        assert_eq!(merged.averaged_from_count, 2);
        assert_eq!(merged.anchor, MapAnchor::new("floor-1", 105.0, 100.0));
        assert_eq!(merged.summary.horizontal_accuracy_m, Some(15.0));
        assert_eq!(merged.summary.ble_total_samples, 10);
        assert_eq!(merged.summary.sample_count, 200);

        // 另一楼层的相同坐标不合并
        let other_floor = CaptureSession::new(
            "visit-3",
            t0,
            MapAnchor::new("floor-2", 105.0, 100.0),
            CaptureSummary::default(),
            Vec::new(),
            Vec::new(),
        );
        let outcome = aggregator.merge_into(outcome.locations, other_floor);
        assert_eq!(outcome.locations.len(), 2);
        assert_eq!(outcome.merged.averaged_from_count, 1);
    }

    #[test]
    fn test_algorithm_module_interpolation_inside_triangle() {
        let estimator = PositionEstimator::default();
        let calibration = vec![
            CalibrationPoint::new(GpsCoordinate::new(31.2300, 121.4700), PixelPoint::new(0.0, 0.0)),
            CalibrationPoint::new(GpsCoordinate::new(31.2300, 121.4710), PixelPoint::new(100.0, 0.0)),
            CalibrationPoint::new(GpsCoordinate::new(31.2310, 121.4700), PixelPoint::new(0.0, 100.0)),
        ];

        let centroid = GpsCoordinate::new(31.2303, 121.4703);
        let estimate = estimator.estimate(Some(centroid), &calibration, &[], None);

        println!("插值结果: {}", estimate);
        assert_eq!(estimate.method, EstimateMethod::WeightedInterpolation);
        assert_eq!(estimate.point_count, 3);
        assert!(estimate.x > 0.0 && estimate.x < 100.0);
        assert!(estimate.y > 0.0 && estimate.y < 100.0);
        assert!(estimate.x + estimate.y < 100.0);
    }

    #[test]
    fn test_algorithm_module_wifi_overrides_gps() {
        let estimator = PositionEstimator::default();
        let scan = WifiFingerprint::from_pairs(vec![("aa:bb", -45), ("cc:dd", -70)]);
        let calibration = vec![
            CalibrationPoint::new(GpsCoordinate::new(31.2300, 121.4700), PixelPoint::new(0.0, 0.0)),
            CalibrationPoint::new(GpsCoordinate::new(31.2400, 121.4800), PixelPoint::new(500.0, 300.0))
                .with_wifi(scan.clone()),
        ];

        // GPS 就在第一个点上，但 Wi-Fi 指纹完全一致的第二个点优先
        let gps = GpsCoordinate::new(31.2300, 121.4700);
        let estimate = estimator.estimate(Some(gps), &calibration, &[], Some(&scan));

        assert_eq!(estimate.method, EstimateMethod::WifiFingerprint);
        assert_eq!(estimate.xy(), (500.0, 300.0));
        assert_eq!(estimate.wifi_score, Some(0.0));
    }

    #[test]
    fn test_algorithm_module_anchor_fallback() {
        let estimator = PositionEstimator::default();
        let anchors = [
            ReferenceAnchor::new(GpsCoordinate::new(31.0, 121.0), PixelPoint::new(0.0, 0.0)),
            ReferenceAnchor::new(GpsCoordinate::new(32.0, 122.0), PixelPoint::new(1000.0, 2000.0)),
        ];

        let estimate = estimator.estimate(Some(GpsCoordinate::new(31.5, 121.25)), &[], &anchors, None);
        assert_eq!(estimate.method, EstimateMethod::AnchorTransform);
        assert!((estimate.x - 250.0).abs() < 1e-6);
        assert!((estimate.y - 1000.0).abs() < 1e-6);

        let unknown = estimator.estimate(None, &[], &anchors, None);
        assert!(!unknown.is_known());
    }
}
