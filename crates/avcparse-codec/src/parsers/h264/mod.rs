//! H.264/AVC 参数集解析器.
//!
//! 面向 AVCC (长度前缀) 封装的 H.264 码流:
//! - Exp-Golomb 解码
//! - NAL 单元扫描, SPS/PPS 定位与 IDR 检测
//! - SPS (Sequence Parameter Set) 解析与裁剪尺寸计算
//! - avcC (AVCDecoderConfigurationRecord) 构建与解析
//! - 按字段输出的 SPS 报告

pub mod avcc;
pub mod golomb;
pub mod nal;
pub mod report;
pub mod sps;

#[cfg(test)]
mod test_helpers;

pub use avcc::{
    AvccConfig, avcc_config_capacity, build_avcc_config, parse_avcc_config, write_avcc_config,
};
pub use nal::{
    AvccNalIter, NalUnit, NalUnitType, SpsPps, add_emulation_prevention, find_sps_pps, is_idr,
    remove_emulation_prevention,
};
pub use report::{
    SpsFields, SpsReport, parse_avcc_extradata, parse_sps_report, validate_avcc_extradata,
};
pub use sps::{Sps, parse_sps};
