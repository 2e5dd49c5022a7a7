//! H.264 参数集测试辅助: 按字段构造 SPS NAL.

use avcparse_core::BitWriter;

use super::nal::add_emulation_prevention;

/// 测试用 SPS 字段, 按语法顺序写出
#[derive(Debug, Clone)]
pub(crate) struct TestSps {
    pub profile_idc: u8,
    pub constraint_flags: u8,
    pub level_idc: u8,
    pub sps_id: u32,
    pub chroma_format_idc: u32,
    pub separate_colour_plane_flag: bool,
    pub bit_depth_luma_minus8: u32,
    pub bit_depth_chroma_minus8: u32,
    /// `Some` 表示 seq_scaling_matrix_present_flag=1, 每个槽位为 `None` (未出现) 或 delta_scale 列表
    pub scaling_lists: Option<Vec<Option<Vec<i32>>>>,
    pub log2_max_frame_num_minus4: u32,
    pub pic_order_cnt_type: u32,
    pub log2_max_pic_order_cnt_lsb_minus4: u32,
    /// pic_order_cnt_type==1 时写出的 offset_for_ref_frame 列表
    pub poc_cycle_offsets: Vec<i32>,
    pub max_num_ref_frames: u32,
    pub gaps_in_frame_num_value_allowed_flag: bool,
    pub pic_width_in_mbs_minus1: u32,
    pub pic_height_in_map_units_minus1: u32,
    pub frame_mbs_only_flag: bool,
    pub mb_adaptive_frame_field_flag: bool,
    pub direct_8x8_inference_flag: bool,
    /// (left, right, top, bottom)
    pub crop: Option<(u32, u32, u32, u32)>,
}

impl Default for TestSps {
    fn default() -> Self {
        Self {
            profile_idc: 66,
            constraint_flags: 0xC0,
            level_idc: 30,
            sps_id: 0,
            chroma_format_idc: 1,
            separate_colour_plane_flag: false,
            bit_depth_luma_minus8: 0,
            bit_depth_chroma_minus8: 0,
            scaling_lists: None,
            log2_max_frame_num_minus4: 0,
            pic_order_cnt_type: 0,
            log2_max_pic_order_cnt_lsb_minus4: 2,
            poc_cycle_offsets: Vec::new(),
            max_num_ref_frames: 4,
            gaps_in_frame_num_value_allowed_flag: false,
            pic_width_in_mbs_minus1: 119,
            pic_height_in_map_units_minus1: 67,
            frame_mbs_only_flag: true,
            mb_adaptive_frame_field_flag: false,
            direct_8x8_inference_flag: true,
            crop: Some((0, 0, 0, 4)),
        }
    }
}

impl TestSps {
    /// 写出 RBSP (不含 NAL 头部, 不含防竞争字节)
    pub fn rbsp(&self) -> Vec<u8> {
        let mut bw = BitWriter::new();
        bw.write_bits(u32::from(self.profile_idc), 8);
        bw.write_bits(u32::from(self.constraint_flags), 8);
        bw.write_bits(u32::from(self.level_idc), 8);
        bw.write_ue(self.sps_id);

        if matches!(self.profile_idc, 100 | 110 | 122 | 244 | 44 | 83 | 86) {
            bw.write_ue(self.chroma_format_idc);
            if self.chroma_format_idc == 3 {
                bw.write_flag(self.separate_colour_plane_flag);
            }
            bw.write_ue(self.bit_depth_luma_minus8);
            bw.write_ue(self.bit_depth_chroma_minus8);
            bw.write_flag(false); // qpprime_y_zero_transform_bypass_flag
            match &self.scaling_lists {
                Some(lists) => {
                    bw.write_flag(true);
                    for slot in lists {
                        match slot {
                            Some(deltas) => {
                                bw.write_flag(true);
                                for &delta in deltas {
                                    bw.write_se(delta);
                                }
                            }
                            None => bw.write_flag(false),
                        }
                    }
                }
                None => bw.write_flag(false),
            }
        }

        bw.write_ue(self.log2_max_frame_num_minus4);
        bw.write_ue(self.pic_order_cnt_type);
        match self.pic_order_cnt_type {
            0 => bw.write_ue(self.log2_max_pic_order_cnt_lsb_minus4),
            1 => {
                bw.write_flag(false); // delta_pic_order_always_zero_flag
                bw.write_se(-2); // offset_for_non_ref_pic
                bw.write_se(1); // offset_for_top_to_bottom_field
                bw.write_ue(self.poc_cycle_offsets.len() as u32);
                for &offset in &self.poc_cycle_offsets {
                    bw.write_se(offset);
                }
            }
            _ => {}
        }

        bw.write_ue(self.max_num_ref_frames);
        bw.write_flag(self.gaps_in_frame_num_value_allowed_flag);
        bw.write_ue(self.pic_width_in_mbs_minus1);
        bw.write_ue(self.pic_height_in_map_units_minus1);
        bw.write_flag(self.frame_mbs_only_flag);
        if !self.frame_mbs_only_flag {
            bw.write_flag(self.mb_adaptive_frame_field_flag);
        }
        bw.write_flag(self.direct_8x8_inference_flag);
        match self.crop {
            Some((left, right, top, bottom)) => {
                bw.write_flag(true);
                bw.write_ue(left);
                bw.write_ue(right);
                bw.write_ue(top);
                bw.write_ue(bottom);
            }
            None => bw.write_flag(false),
        }
        bw.write_flag(false); // vui_parameters_present_flag
        bw.write_rbsp_trailing_bits();
        bw.finish()
    }

    /// SPS 载荷 (NAL 头部之后, 已插入防竞争字节)
    pub fn payload(&self) -> Vec<u8> {
        add_emulation_prevention(&self.rbsp())
    }

    /// 完整 SPS NAL (含 0x67 头部)
    pub fn nal(&self) -> Vec<u8> {
        let mut nal = vec![0x67];
        nal.extend_from_slice(&self.payload());
        nal
    }
}

/// 以 4 字节长度前缀拼接 NAL 单元
pub(crate) fn build_avcc_packet(nalus: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for nal in nalus {
        out.extend_from_slice(&(nal.len() as u32).to_be_bytes());
        out.extend_from_slice(nal);
    }
    out
}
