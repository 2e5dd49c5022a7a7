//! # avcparse-codec
//!
//! H.264 参数集解析库, 不依赖完整解码器即可从 AVCC 码流中提取播放参数.
//!
//! ## 功能
//!
//! - **NAL 扫描**: 在长度前缀数据包中定位 SPS/PPS, 检测 IDR 关键帧
//! - **SPS 解析**: profile/level/隔行/最大参考帧数/裁剪后尺寸
//! - **avcC**: 由 SPS/PPS 构建 AVCDecoderConfigurationRecord, 以及反向解析
//!
//! ## 使用示例
//!
//! ```rust
//! use avcparse_codec::{SpsFields, build_avcc_config, parse_avcc_extradata};
//!
//! let sps = [0x67, 0x42, 0x00, 0x1E, 0xAB, 0x40, 0x50, 0x1E, 0xD0, 0x80];
//! let pps = [0x68, 0xCE, 0x3C, 0x80];
//! let avcc = build_avcc_config(&sps, &pps).unwrap();
//! assert_eq!(&avcc[..6], &[0x01, 0x42, 0x00, 0x1E, 0xFF, 0xE1]);
//!
//! let report = parse_avcc_extradata(&avcc, SpsFields::PROFILE | SpsFields::LEVEL).unwrap();
//! assert_eq!(report.profile, Some(66));
//! assert_eq!(report.level, Some(30));
//! ```

pub mod parsers;

// 重导出常用类型
pub use parsers::h264::{
    AvccConfig, AvccNalIter, NalUnit, NalUnitType, Sps, SpsFields, SpsPps, SpsReport,
    avcc_config_capacity, build_avcc_config, find_sps_pps, is_idr, parse_avcc_config,
    parse_avcc_extradata, parse_sps, parse_sps_report, validate_avcc_extradata, write_avcc_config,
};
