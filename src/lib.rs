//! # avcparse
//!
//! 纯 Rust 实现的 H.264 参数集解析库, 无需完整解码器即可获取播放参数.
//!
//! avcparse 面向 AVCC (长度前缀) 封装的 H.264 码流:
//! - **NAL 扫描**: 定位 SPS/PPS, 检测 IDR 关键帧
//! - **SPS 解析**: profile、level、隔行、最大参考帧数、裁剪后尺寸
//! - **avcC**: 构建与解析 AVCDecoderConfigurationRecord
//!
//! # 快速开始
//!
//! ```rust
//! use avcparse::codec::{SpsFields, find_sps_pps, is_idr, parse_sps_report};
//!
//! let packet = [
//!     0x00, 0x00, 0x00, 0x0A, 0x67, 0x42, 0x00, 0x1E, 0xAB, 0x40, 0x50, 0x1E, 0xD0, 0x80,
//!     0x00, 0x00, 0x00, 0x04, 0x68, 0xCE, 0x3C, 0x80,
//! ];
//! let pair = find_sps_pps(&packet).unwrap();
//! let report = parse_sps_report(pair.sps.payload(), SpsFields::WIDTH | SpsFields::HEIGHT);
//! assert_eq!((report.width, report.height), (Some(640), Some(480)));
//! assert!(!is_idr(&packet));
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `avcparse-core` | 错误类型, 比特流读写 |
//! | `avcparse-codec` | H.264 NAL/SPS/avcC 解析 |

/// 核心类型与工具
pub use avcparse_core as core;

/// H.264 参数集解析
pub use avcparse_codec as codec;

/// 获取 avcparse 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
