//! Mock GNSS 接收机
//!
//! 按固定航向/航速生成完整的 NMEA 历元（GSV × N、GGA、VTG、GSA、RMC），
//! 用于无硬件环境的测试与 replay 演示。

use std::io::Cursor;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use tracing::trace;

use crate::coord::decimal_to_nmea;
use crate::nmea::frame;
use crate::source::LineSource;

/// 每节对应的米/秒
const METERS_PER_SECOND_PER_KNOT: f64 = 1852.0 / 3600.0;
/// 纬度 1° 对应的米数（近似）
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Mock 接收机配置
#[derive(Debug, Clone)]
pub struct MockReceiverConfig {
    /// 起点纬度
    pub start_lat: f64,
    /// 起点经度
    pub start_lon: f64,
    /// 航向 (度)
    pub course: f64,
    /// 航速 (节)
    pub speed_knots: f64,
    /// 海拔 (米)
    pub altitude: f64,
    /// 历元间隔
    pub interval: Duration,
    /// 首个历元的 UTC 时间
    pub start_time: NaiveDateTime,
    /// 每个历元的 GSV 分片数
    pub satellite_parts: u8,
}

impl Default for MockReceiverConfig {
    fn default() -> Self {
        let start_time = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .unwrap_or_else(|| DateTime::UNIX_EPOCH.naive_utc());
        Self {
            start_lat: 51.5074,
            start_lon: -0.1278,
            course: 90.0,
            speed_knots: 20.0,
            altitude: 35.0,
            interval: Duration::from_secs(1),
            start_time,
            satellite_parts: 3,
        }
    }
}

/// Mock 接收机
///
/// 每次调用 [`MockReceiver::next_epoch`] 推进一个历元。
#[derive(Debug, Clone)]
pub struct MockReceiver {
    config: MockReceiverConfig,
    lat: f64,
    lon: f64,
    time: NaiveDateTime,
    epochs: u64,
}

impl MockReceiver {
    /// 创建新的 Mock 接收机
    pub fn new(config: MockReceiverConfig) -> Self {
        Self {
            lat: config.start_lat,
            lon: config.start_lon,
            time: config.start_time,
            epochs: 0,
            config,
        }
    }

    /// 停在原地的接收机
    pub fn parked(lat: f64, lon: f64) -> Self {
        Self::new(MockReceiverConfig {
            start_lat: lat,
            start_lon: lon,
            speed_knots: 0.0,
            ..Default::default()
        })
    }

    /// 修改航速 (节)
    pub fn set_speed(&mut self, knots: f64) {
        self.config.speed_knots = knots;
    }

    /// 修改航向 (度)
    pub fn set_course(&mut self, course: f64) {
        self.config.course = course;
    }

    /// 当前位置
    pub fn position(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }

    /// 已生成的历元数
    pub fn epochs(&self) -> u64 {
        self.epochs
    }

    /// 生成一个历元的全部语句，然后推进位置与时间
    pub fn next_epoch(&mut self) -> Vec<String> {
        let parts = self.config.satellite_parts.max(1);
        let in_view = u16::from(parts) * 4;
        let mut lines: Vec<String> = (1..=parts)
            .map(|i| {
                let sats: Vec<String> = (0..4u16)
                    .map(|s| {
                        let prn = (u16::from(i) - 1) * 4 + s + 1;
                        format!("{prn:02},{:02},{:03},{:02}", 10 + s * 15, prn * 20 % 360, 30 + s)
                    })
                    .collect();
                frame(&format!("GPGSV,{parts},{i},{in_view:02},{}", sats.join(",")))
            })
            .collect();

        let (lat, lat_dir) = decimal_to_nmea(self.lat, true, 4);
        let (lon, lon_dir) = decimal_to_nmea(self.lon, false, 4);
        let hms = self.time.format("%H%M%S%.3f");
        let date = self.time.format("%d%m%y");
        let speed = self.config.speed_knots;
        let course = self.config.course;

        lines.push(frame(&format!(
            "GPGGA,{hms},{lat},{lat_dir},{lon},{lon_dir},1,{in_view:02},0.9,{:.1},M,46.9,M,,",
            self.config.altitude
        )));
        lines.push(frame(&format!(
            "GPVTG,{course:05.1},T,,M,{speed:05.1},N,{:05.1},K,A",
            speed * 1.852
        )));
        lines.push(frame("GPGSA,A,3,01,02,03,04,05,06,,,,,,,1.8,0.9,1.5"));
        lines.push(frame(&format!(
            "GPRMC,{hms},A,{lat},{lat_dir},{lon},{lon_dir},{speed:05.1},{course:05.1},{date},,"
        )));

        trace!(epoch = self.epochs, lat = self.lat, lon = self.lon, "mock epoch generated");
        self.advance();
        lines
    }

    /// 生成 `count` 个历元，历元之间以空行分隔
    pub fn lines(&mut self, count: usize) -> Vec<String> {
        let mut lines = Vec::new();
        for _ in 0..count {
            lines.extend(self.next_epoch());
            lines.push(String::new());
        }
        lines
    }

    /// 把 `count` 个历元包装成 [`LineSource`]
    pub fn into_source(mut self, count: usize, read_timeout: Duration) -> LineSource {
        let mut text = self.lines(count).join("\n");
        text.push('\n');
        LineSource::from_reader("mock", Cursor::new(text.into_bytes()), read_timeout)
    }

    fn advance(&mut self) {
        let seconds = self.config.interval.as_secs_f64();
        let meters = self.config.speed_knots * METERS_PER_SECOND_PER_KNOT * seconds;
        let course = self.config.course.to_radians();

        self.lat += meters * course.cos() / METERS_PER_DEGREE;
        self.lon += meters * course.sin() / (METERS_PER_DEGREE * self.lat.to_radians().cos());
        self.time += TimeDelta::from_std(self.config.interval).unwrap_or(TimeDelta::seconds(1));
        self.epochs += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::decode;
    use crate::source::LineEvent;
    use contracts::Sentence;

    #[test]
    fn epoch_has_every_sentence_kind() {
        let mut receiver = MockReceiver::new(MockReceiverConfig::default());
        let lines = receiver.next_epoch();
        let kinds: Vec<String> = lines
            .iter()
            .map(|l| decode(l).unwrap().kind().to_string())
            .collect();
        assert_eq!(kinds, ["GSV", "GSV", "GSV", "GGA", "VTG", "GSA", "RMC"]);
    }

    #[test]
    fn gga_carries_start_position() {
        let mut receiver = MockReceiver::new(MockReceiverConfig::default());
        let lines = receiver.next_epoch();
        let Sentence::Gga(fix) = decode(&lines[3]).unwrap() else {
            panic!("expected GGA");
        };
        assert_eq!(fix.lat.as_deref(), Some("5130.4440"));
        assert_eq!(fix.lon.as_deref(), Some("00007.6680"));
        assert_eq!(fix.lon_dir, Some('W'));
    }

    #[test]
    fn moving_receiver_advances() {
        let mut receiver = MockReceiver::new(MockReceiverConfig {
            course: 0.0,
            ..Default::default()
        });
        let (lat0, lon0) = receiver.position();
        receiver.lines(10);
        let (lat1, lon1) = receiver.position();
        assert!(lat1 > lat0);
        assert!((lon1 - lon0).abs() < 1e-9);
        assert_eq!(receiver.epochs(), 10);
    }

    #[tokio::test]
    async fn source_yields_all_lines() {
        let receiver = MockReceiver::parked(48.0, 11.0);
        let mut source = receiver.into_source(2, Duration::from_millis(50));
        let mut count = 0;
        while let LineEvent::Line(_) = source.next_event().await.unwrap() {
            count += 1;
        }
        assert_eq!(count, 16);
    }
}
