//! H.264 SPS (Sequence Parameter Set) 解析器.
//!
//! 只解析计算以下输出所需的 SPS 前半部分语法元素:
//! - Profile / Level (编码规格)
//! - 是否隔行 (frame_mbs_only_flag)
//! - 最大参考帧数
//! - 裁剪后的图像宽度和高度
//!
//! 解析到 frame cropping 字段为止, 不解析 VUI.
//!
//! 解析器对截断或越界输入采取容忍策略: 比特流耗尽后后续字段为 0,
//! 超出规范范围的字段仅记录告警, 不中止解析, 前面已读出的字段依然可用.

use avcparse_core::BitReader;
use log::{debug, warn};

use super::golomb::{read_se, read_ue};

/// SPS 解析结果
///
/// 字段名与 H.264 语法元素一致, 未出现的字段保持缺省值:
/// `chroma_format_idc` 为 1 (4:2:0), 其余为 0 (或 false).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sps {
    /// profile_idc (编码规格, 如 66=Baseline, 77=Main, 100=High)
    pub profile_idc: u8,
    /// level_idc (编码级别, 如 30=3.0, 41=4.1)
    pub level_idc: u8,
    /// seq_parameter_set_id
    pub sps_id: u32,
    /// 色度格式 (0=单色, 1=4:2:0, 2=4:2:2, 3=4:4:4), 非 High 系列 profile 时为 1
    pub chroma_format_idc: u32,
    /// 4:4:4 时三个颜色分量是否分别编码
    pub separate_colour_plane_flag: bool,
    /// 亮度位深 - 8
    pub bit_depth_luma_minus8: u32,
    /// 色度位深 - 8
    pub bit_depth_chroma_minus8: u32,
    /// QP'Y 为 0 时是否跳过变换
    pub qpprime_y_zero_transform_bypass_flag: bool,
    /// 是否携带序列级量化矩阵
    pub seq_scaling_matrix_present_flag: bool,
    /// seq_scaling_list_present_flag[i], 第 i 位对应第 i 个槽位
    pub seq_scaling_list_present_mask: u16,
    /// log2(MaxFrameNum) - 4
    pub log2_max_frame_num_minus4: u32,
    /// 图像顺序计数类型 (0, 1, 2)
    pub pic_order_cnt_type: u32,
    /// 仅 pic_order_cnt_type==0
    pub log2_max_pic_order_cnt_lsb_minus4: u32,
    /// 最大参考帧数
    pub max_num_ref_frames: u32,
    /// 是否允许 frame_num 不连续
    pub gaps_in_frame_num_value_allowed_flag: bool,
    /// 宏块列数 - 1
    pub pic_width_in_mbs_minus1: u32,
    /// map unit 行数 - 1 (场编码时为场内宏块行数)
    pub pic_height_in_map_units_minus1: u32,
    /// 是否为帧编码 (非场编码)
    pub frame_mbs_only_flag: bool,
    /// 帧内宏块级帧/场自适应 (MBAFF)
    pub mb_adaptive_frame_field_flag: bool,
    /// B_Skip/B_Direct 运动矢量推导粒度
    pub direct_8x8_inference_flag: bool,
    /// 是否携带裁剪偏移
    pub frame_cropping_flag: bool,
    /// cropping 偏移
    pub frame_crop_left_offset: u32,
    /// cropping 偏移
    pub frame_crop_right_offset: u32,
    /// cropping 偏移
    pub frame_crop_top_offset: u32,
    /// cropping 偏移
    pub frame_crop_bottom_offset: u32,
}

impl Default for Sps {
    fn default() -> Self {
        Self {
            profile_idc: 0,
            level_idc: 0,
            sps_id: 0,
            chroma_format_idc: 1,
            separate_colour_plane_flag: false,
            bit_depth_luma_minus8: 0,
            bit_depth_chroma_minus8: 0,
            qpprime_y_zero_transform_bypass_flag: false,
            seq_scaling_matrix_present_flag: false,
            seq_scaling_list_present_mask: 0,
            log2_max_frame_num_minus4: 0,
            pic_order_cnt_type: 0,
            log2_max_pic_order_cnt_lsb_minus4: 0,
            max_num_ref_frames: 0,
            gaps_in_frame_num_value_allowed_flag: false,
            pic_width_in_mbs_minus1: 0,
            pic_height_in_map_units_minus1: 0,
            frame_mbs_only_flag: false,
            mb_adaptive_frame_field_flag: false,
            direct_8x8_inference_flag: false,
            frame_cropping_flag: false,
            frame_crop_left_offset: 0,
            frame_crop_right_offset: 0,
            frame_crop_top_offset: 0,
            frame_crop_bottom_offset: 0,
        }
    }
}

/// 从 SPS 载荷 (NAL 头部之后的字节, 可含防竞争字节) 解析 SPS
///
/// 从不失败: 数据不足时未读到的字段为 0.
pub fn parse_sps(payload: &[u8]) -> Sps {
    let mut br = BitReader::new(payload);
    let mut sps = Sps {
        profile_idc: br.read_bits(8) as u8,
        ..Sps::default()
    };

    br.skip_bits(4); // constraint_set0..3_flag
    br.skip_bits(4); // reserved_zero_4bits
    sps.level_idc = br.read_bits(8) as u8;
    sps.sps_id = read_ue(&mut br);

    if is_high_profile(sps.profile_idc) {
        sps.chroma_format_idc = read_ue(&mut br);
        if sps.chroma_format_idc > 3 {
            warn!(
                "H.264: chroma_format_idc 超出范围, value={}",
                sps.chroma_format_idc
            );
        }
        if sps.chroma_format_idc == 3 {
            sps.separate_colour_plane_flag = br.read_flag();
        }
        sps.bit_depth_luma_minus8 = read_ue(&mut br);
        sps.bit_depth_chroma_minus8 = read_ue(&mut br);
        sps.qpprime_y_zero_transform_bypass_flag = br.read_flag();

        sps.seq_scaling_matrix_present_flag = br.read_flag();
        if sps.seq_scaling_matrix_present_flag {
            sps.seq_scaling_list_present_mask =
                skip_seq_scaling_lists(&mut br, sps.chroma_format_idc);
        }
    }

    sps.log2_max_frame_num_minus4 = read_ue(&mut br);
    if sps.log2_max_frame_num_minus4 > 12 {
        // profile/level/隔行/参考帧数可能仍然有效, 继续解析
        warn!(
            "H.264: log2_max_frame_num_minus4 超出范围, value={}",
            sps.log2_max_frame_num_minus4
        );
    }

    sps.pic_order_cnt_type = read_ue(&mut br);
    match sps.pic_order_cnt_type {
        0 => sps.log2_max_pic_order_cnt_lsb_minus4 = read_ue(&mut br),
        1 => {
            // offset_for_non_ref_pic 等字段未解析, 后续字段位置不可信
            debug!("H.264: pic_order_cnt_type=1 的附加字段未解析, 后续字段可能错位");
        }
        2 => {}
        other => warn!("H.264: pic_order_cnt_type 非法, value={}", other),
    }

    sps.max_num_ref_frames = read_ue(&mut br);
    sps.gaps_in_frame_num_value_allowed_flag = br.read_flag();
    sps.pic_width_in_mbs_minus1 = read_ue(&mut br);
    sps.pic_height_in_map_units_minus1 = read_ue(&mut br);

    sps.frame_mbs_only_flag = br.read_flag();
    if !sps.frame_mbs_only_flag {
        sps.mb_adaptive_frame_field_flag = br.read_flag();
    }

    sps.direct_8x8_inference_flag = br.read_flag();

    sps.frame_cropping_flag = br.read_flag();
    if sps.frame_cropping_flag {
        sps.frame_crop_left_offset = read_ue(&mut br);
        sps.frame_crop_right_offset = read_ue(&mut br);
        sps.frame_crop_top_offset = read_ue(&mut br);
        sps.frame_crop_bottom_offset = read_ue(&mut br);
    }

    if br.eos() {
        // 完整的 SPS 在 cropping 之后至少还有 vui 标志和 RBSP 尾部
        debug!(
            "H.264: SPS 数据在 frame cropping 之前耗尽, len={}",
            payload.len()
        );
    }

    sps
}

impl Sps {
    /// 是否为隔行 (场编码) 码流
    pub fn interlaced(&self) -> bool {
        !self.frame_mbs_only_flag
    }

    /// 按裁剪参数计算的图像宽度 (像素), 可能为非正数
    pub fn raw_width(&self) -> i64 {
        let hsub = if matches!(self.chroma_format_idc, 1 | 2) {
            1
        } else {
            0
        };
        let step_x = 1i64 << hsub;
        let width = (i64::from(self.pic_width_in_mbs_minus1) + 1) * 16;
        let crop = i64::from(self.frame_crop_left_offset) + i64::from(self.frame_crop_right_offset);
        width - crop * step_x
    }

    /// 按裁剪参数计算的图像高度 (像素), 可能为非正数
    ///
    /// 高度按 map unit 计算, 场编码时不乘 2.
    pub fn raw_height(&self) -> i64 {
        let vsub = if self.chroma_format_idc == 1 { 1 } else { 0 };
        let step_y = (2 - i64::from(self.frame_mbs_only_flag)) << vsub;
        let height = (i64::from(self.pic_height_in_map_units_minus1) + 1) * 16;
        let crop = i64::from(self.frame_crop_top_offset) + i64::from(self.frame_crop_bottom_offset);
        height - crop * step_y
    }

    /// 裁剪后的宽度, 非正或超出 u32 时返回 `None`
    pub fn width(&self) -> Option<u32> {
        self.checked_dimension("宽度", self.raw_width())
    }

    /// 裁剪后的高度, 非正或超出 u32 时返回 `None`
    pub fn height(&self) -> Option<u32> {
        self.checked_dimension("高度", self.raw_height())
    }

    /// 裁剪后的图像尺寸 (宽, 高)
    ///
    /// 任一维度非法时返回 `None`, 单独获取某一维度请使用 [`Sps::width`] / [`Sps::height`].
    pub fn picture_size(&self) -> Option<(u32, u32)> {
        Some((self.width()?, self.height()?))
    }

    fn checked_dimension(&self, name: &str, value: i64) -> Option<u32> {
        match u32::try_from(value) {
            Ok(v) if v > 0 => Some(v),
            _ => {
                warn!(
                    "H.264: 图像{}非法, value={}, crop=({}, {}, {}, {})",
                    name,
                    value,
                    self.frame_crop_left_offset,
                    self.frame_crop_right_offset,
                    self.frame_crop_top_offset,
                    self.frame_crop_bottom_offset
                );
                None
            }
        }
    }
}

/// 是否为带 chroma_format_idc 等扩展字段的 High 系列 profile
fn is_high_profile(profile_idc: u8) -> bool {
    matches!(profile_idc, 100 | 110 | 122 | 244 | 44 | 83 | 86)
}

/// 跳过 seq_scaling_list, 返回各槽位 present 标志的位掩码
///
/// 只消耗比特, 不保存量化矩阵.
fn skip_seq_scaling_lists(br: &mut BitReader, chroma_format_idc: u32) -> u16 {
    let list_count = if chroma_format_idc != 3 { 8 } else { 12 };
    let mut present_mask = 0u16;
    for list_idx in 0..list_count {
        if br.read_flag() {
            present_mask |= 1 << list_idx;
            let size = if list_idx < 6 { 16 } else { 64 };
            skip_scaling_list(br, size);
        }
    }
    present_mask
}

fn skip_scaling_list(br: &mut BitReader, size: usize) {
    let mut last_scale = 8i32;
    let mut next_scale = 8i32;
    for idx in 0..size {
        if next_scale != 0 {
            let delta_scale = read_se(br);
            next_scale = last_scale.wrapping_add(delta_scale) & 0xFF;
            if idx == 0 && next_scale == 0 {
                // useDefaultScalingMatrixFlag
                break;
            }
        }
        if next_scale != 0 {
            last_scale = next_scale;
        }
    }
}
