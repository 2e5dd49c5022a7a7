//! SPS 播放参数报告.
//!
//! 从 SPS 载荷或 avcC extradata 中按需提取 profile/level/隔行/参考帧数/尺寸,
//! 调用方通过 [`SpsFields`] 选择需要的输出, 未选择的字段为 `None`.

use avcparse_core::{AvcError, AvcResult};
use bitflags::bitflags;
use log::debug;

use super::sps::{Sps, parse_sps};

/// extradata 中 SPS 长度字段的偏移 (跳过 6 字节 avcC 头部)
const EXTRADATA_SPS_LEN_OFFSET: usize = 6;

/// extradata 中 SPS NAL 头部的偏移
const EXTRADATA_SPS_NAL_OFFSET: usize = EXTRADATA_SPS_LEN_OFFSET + 2;

bitflags! {
    /// 需要输出的 SPS 字段集合
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SpsFields: u8 {
        /// level_idc
        const LEVEL          = 1 << 0;
        /// profile_idc
        const PROFILE        = 1 << 1;
        /// 是否隔行
        const INTERLACED     = 1 << 2;
        /// 最大参考帧数
        const MAX_REF_FRAMES = 1 << 3;
        /// 裁剪后宽度
        const WIDTH          = 1 << 4;
        /// 裁剪后高度
        const HEIGHT         = 1 << 5;
    }
}

/// SPS 报告, 仅包含请求的字段
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpsReport {
    /// level_idc
    pub level: Option<u8>,
    /// profile_idc
    pub profile: Option<u8>,
    /// 是否隔行 (场编码)
    pub interlaced: Option<bool>,
    /// 最大参考帧数
    pub max_ref_frames: Option<u32>,
    /// 裁剪后宽度, 非正时为 `None`
    pub width: Option<u32>,
    /// 裁剪后高度, 非正时为 `None`
    pub height: Option<u32>,
}

impl SpsReport {
    /// 从已解析的 SPS 按字段掩码生成报告
    pub fn from_sps(sps: &Sps, fields: SpsFields) -> Self {
        Self {
            level: fields.contains(SpsFields::LEVEL).then_some(sps.level_idc),
            profile: fields.contains(SpsFields::PROFILE).then_some(sps.profile_idc),
            interlaced: fields
                .contains(SpsFields::INTERLACED)
                .then_some(sps.interlaced()),
            max_ref_frames: fields
                .contains(SpsFields::MAX_REF_FRAMES)
                .then_some(sps.max_num_ref_frames),
            width: if fields.contains(SpsFields::WIDTH) {
                sps.width()
            } else {
                None
            },
            height: if fields.contains(SpsFields::HEIGHT) {
                sps.height()
            } else {
                None
            },
        }
    }
}

/// 解析 SPS 载荷 (NAL 头部之后的字节) 并生成报告
pub fn parse_sps_report(sps_payload: &[u8], fields: SpsFields) -> SpsReport {
    SpsReport::from_sps(&parse_sps(sps_payload), fields)
}

/// 从 avcC extradata 中读取第一个 SPS 并生成报告
///
/// 只依赖 extradata 的前 8 字节与第一个 SPS, 不校验 PPS 部分.
pub fn parse_avcc_extradata(extradata: &[u8], fields: SpsFields) -> AvcResult<SpsReport> {
    let sps_payload = locate_extradata_sps(extradata)?;
    Ok(parse_sps_report(sps_payload, fields))
}

/// 校验 avcC extradata 是否为逐行码流, 同时按需输出 SPS 字段
///
/// 码流为隔行或无法定位 SPS 时返回 `false`, 定位失败时报告为空.
pub fn validate_avcc_extradata(extradata: &[u8], fields: SpsFields) -> (bool, SpsReport) {
    match locate_extradata_sps(extradata) {
        Ok(sps_payload) => {
            let sps = parse_sps(sps_payload);
            (!sps.interlaced(), SpsReport::from_sps(&sps, fields))
        }
        Err(err) => {
            debug!("H.264: extradata 中未能定位 SPS, {}", err);
            (false, SpsReport::default())
        }
    }
}

/// 返回 extradata 中第一个 SPS 的载荷 (跳过 NAL 头部)
fn locate_extradata_sps(extradata: &[u8]) -> AvcResult<&[u8]> {
    if extradata.len() < EXTRADATA_SPS_NAL_OFFSET {
        return Err(AvcError::InvalidData(format!(
            "H.264: extradata 太短, len={}",
            extradata.len()
        )));
    }

    let sps_len = usize::from(u16::from_be_bytes([
        extradata[EXTRADATA_SPS_LEN_OFFSET],
        extradata[EXTRADATA_SPS_LEN_OFFSET + 1],
    ]));
    if sps_len == 0 {
        return Err(AvcError::InvalidData(
            "H.264: extradata SPS 长度非法, len=0".into(),
        ));
    }

    let sps_end = EXTRADATA_SPS_NAL_OFFSET + sps_len;
    if sps_end > extradata.len() {
        return Err(AvcError::InvalidData(format!(
            "H.264: extradata SPS 数据截断, declared_len={}, remain={}",
            sps_len,
            extradata.len() - EXTRADATA_SPS_NAL_OFFSET
        )));
    }

    Ok(&extradata[EXTRADATA_SPS_NAL_OFFSET + 1..sps_end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::h264::avcc::build_avcc_config;
    use crate::parsers::h264::test_helpers::TestSps;

    const PPS: [u8; 4] = [0x68, 0xCE, 0x3C, 0x80];

    fn extradata_for(params: &TestSps) -> Vec<u8> {
        build_avcc_config(&params.nal(), &PPS).expect("构建 avcC 失败")
    }

    #[test]
    fn test_report_all_fields() {
        let report = parse_sps_report(&TestSps::default().payload(), SpsFields::all());

        assert_eq!(
            report,
            SpsReport {
                level: Some(30),
                profile: Some(66),
                interlaced: Some(false),
                max_ref_frames: Some(4),
                width: Some(1920),
                height: Some(1080),
            }
        );
    }

    #[test]
    fn test_report_respects_field_mask() {
        let payload = TestSps::default().payload();

        let report = parse_sps_report(&payload, SpsFields::LEVEL | SpsFields::WIDTH);
        assert_eq!(report.level, Some(30));
        assert_eq!(report.width, Some(1920));
        assert_eq!(report.profile, None, "未请求的字段应为 None");
        assert_eq!(report.interlaced, None);
        assert_eq!(report.max_ref_frames, None);
        assert_eq!(report.height, None);

        let report = parse_sps_report(&payload, SpsFields::empty());
        assert_eq!(report, SpsReport::default());
    }

    #[test]
    fn test_report_invalid_geometry_yields_none() {
        let params = TestSps {
            pic_width_in_mbs_minus1: 0,
            crop: Some((4, 4, 0, 0)),
            ..TestSps::default()
        };
        let report = parse_sps_report(&params.payload(), SpsFields::all());

        assert_eq!(report.width, None, "宽度非正时应为 None");
        assert_eq!(report.height, Some(1088), "高度与宽度独立校验");
        assert_eq!(report.profile, Some(66), "其余字段不受影响");
    }

    #[test]
    fn test_report_height_only_with_invalid_width() {
        let params = TestSps {
            pic_width_in_mbs_minus1: 0,
            crop: Some((4, 4, 0, 0)),
            ..TestSps::default()
        };
        let report = parse_sps_report(&params.payload(), SpsFields::HEIGHT);

        assert_eq!(report.height, Some(1088), "仅请求高度时不受非法宽度影响");
        assert_eq!(report.width, None);
    }

    #[test]
    fn test_report_width_only_with_invalid_height() {
        let params = TestSps {
            pic_height_in_map_units_minus1: 0,
            crop: Some((0, 0, 4, 4)),
            ..TestSps::default()
        };
        let report = parse_sps_report(&params.payload(), SpsFields::WIDTH | SpsFields::HEIGHT);

        assert_eq!(report.width, Some(1920), "宽度与高度独立校验");
        assert_eq!(report.height, None, "高度非正时应为 None");
    }

    #[test]
    fn test_parse_avcc_extradata() {
        let params = TestSps {
            profile_idc: 100,
            level_idc: 41,
            max_num_ref_frames: 2,
            pic_width_in_mbs_minus1: 79,
            pic_height_in_map_units_minus1: 44,
            crop: None,
            ..TestSps::default()
        };
        let report =
            parse_avcc_extradata(&extradata_for(&params), SpsFields::all()).expect("解析失败");

        assert_eq!(report.profile, Some(100));
        assert_eq!(report.level, Some(41));
        assert_eq!(report.max_ref_frames, Some(2));
        assert_eq!(report.width, Some(1280));
        assert_eq!(report.height, Some(720));
    }

    #[test]
    fn test_validate_avcc_extradata_progressive() {
        let (progressive, report) =
            validate_avcc_extradata(&extradata_for(&TestSps::default()), SpsFields::INTERLACED);

        assert!(progressive, "逐行码流应通过校验");
        assert_eq!(report.interlaced, Some(false));
    }

    #[test]
    fn test_validate_avcc_extradata_interlaced() {
        let params = TestSps {
            frame_mbs_only_flag: false,
            pic_height_in_map_units_minus1: 33,
            crop: Some((0, 0, 0, 2)),
            ..TestSps::default()
        };
        let (progressive, report) = validate_avcc_extradata(&extradata_for(&params), SpsFields::all());

        assert!(!progressive, "隔行码流不应通过校验");
        assert_eq!(report.interlaced, Some(true));
        assert_eq!(report.height, Some(536), "隔行时仍应输出请求的字段");
    }

    #[test]
    fn test_validate_avcc_extradata_missing_sps() {
        let data = [0x01, 0x42, 0x00, 0x1E, 0xFF, 0xE1, 0x00, 0x00, 0x01];
        let (progressive, report) = validate_avcc_extradata(&data, SpsFields::all());

        assert!(!progressive, "无法定位 SPS 时视为隔行");
        assert_eq!(report, SpsReport::default());
    }

    #[test]
    fn test_parse_avcc_extradata_reject_short_input() {
        let err = parse_avcc_extradata(&[0x01, 0x42, 0x00], SpsFields::all())
            .expect_err("extradata 太短应返回错误");
        let msg = format!("{err}");
        assert!(msg.contains("extradata 太短"), "错误信息应包含 extradata 太短, actual={}", msg);
    }

    #[test]
    fn test_parse_avcc_extradata_reject_overrun_sps_len() {
        let data = [0x01, 0x42, 0x00, 0x1E, 0xFF, 0xE1, 0x00, 0x20, 0x67, 0x42];
        let err =
            parse_avcc_extradata(&data, SpsFields::all()).expect_err("SPS 越界应返回错误");
        let msg = format!("{err}");
        assert!(
            msg.contains("SPS 数据截断"),
            "错误信息应包含 SPS 数据截断, actual={}",
            msg
        );
    }

    #[test]
    fn test_parse_avcc_extradata_header_only_sps() {
        // SPS 只有 NAL 头部: 载荷为空, 解析容忍并返回全零字段
        let data = [0x01, 0x42, 0x00, 0x1E, 0xFF, 0xE1, 0x00, 0x01, 0x67];
        let report = parse_avcc_extradata(&data, SpsFields::PROFILE | SpsFields::INTERLACED)
            .expect("SPS 长度有效时应成功");

        assert_eq!(report.profile, Some(0));
        assert_eq!(report.interlaced, Some(true));
    }
}
