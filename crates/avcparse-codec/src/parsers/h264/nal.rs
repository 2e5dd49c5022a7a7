//! H.264 NAL (Network Abstraction Layer) 单元扫描.
//!
//! # NAL 头部 (1 字节)
//! ```text
//! ┌─────────────────────────────────┐
//! │ forbidden(1) | ref_idc(2) | type(5) │
//! └─────────────────────────────────┘
//! ```
//!
//! # AVCC 格式
//!
//! AVCC (也称 AVC length-prefixed) 使用大端长度前缀分隔 NAL 单元,
//! 长度前缀通常为 4 字节:
//! ```text
//! [length: 4 bytes BE] [NAL data: length bytes] [length] [NAL data] ...
//! ```
//!
//! 扫描器只返回指向调用方缓冲区的切片, 从不拷贝 NAL 数据.
//! 每次移动偏移前都会校验长度前缀与载荷不越过缓冲区末尾.

use std::ops::Range;

use avcparse_core::{AvcError, AvcResult};
use log::{debug, trace};

/// AVCC 码流中长度前缀的默认字节数
pub const AVCC_LENGTH_SIZE: usize = 4;

/// 可扫描的最小数据包长度 (4 字节长度前缀 + 1 字节 NAL 头)
pub const MIN_PACKET_LEN: usize = AVCC_LENGTH_SIZE + 1;

/// NAL 单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum NalUnitType {
    /// 非 IDR 图像切片 (P/B slice)
    Slice,
    /// 数据分区 A (DPA)
    SliceDpa,
    /// 数据分区 B (DPB)
    SliceDpb,
    /// 数据分区 C (DPC)
    SliceDpc,
    /// IDR 图像切片 (关键帧)
    SliceIdr,
    /// 增补增强信息 (SEI)
    Sei,
    /// 序列参数集 (SPS)
    Sps,
    /// 图像参数集 (PPS)
    Pps,
    /// 访问单元分隔符 (AUD)
    Aud,
    /// 序列结束
    EndOfSequence,
    /// 流结束
    EndOfStream,
    /// 填充数据
    FillerData,
    /// SPS 扩展
    SpsExtension,
    /// 辅助图像切片
    AuxiliarySlice,
    /// 未知类型
    Unknown(u8),
}

impl NalUnitType {
    /// 从 NAL 类型编号创建
    pub fn from_type_id(type_id: u8) -> Self {
        match type_id {
            1 => Self::Slice,
            2 => Self::SliceDpa,
            3 => Self::SliceDpb,
            4 => Self::SliceDpc,
            5 => Self::SliceIdr,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::Aud,
            10 => Self::EndOfSequence,
            11 => Self::EndOfStream,
            12 => Self::FillerData,
            13 => Self::SpsExtension,
            19 => Self::AuxiliarySlice,
            _ => Self::Unknown(type_id),
        }
    }

    /// 从 NAL 头部字节提取类型 (低 5 位)
    pub fn from_header(header: u8) -> Self {
        Self::from_type_id(header & 0x1F)
    }

    /// 获取类型编号
    pub fn type_id(&self) -> u8 {
        match self {
            Self::Slice => 1,
            Self::SliceDpa => 2,
            Self::SliceDpb => 3,
            Self::SliceDpc => 4,
            Self::SliceIdr => 5,
            Self::Sei => 6,
            Self::Sps => 7,
            Self::Pps => 8,
            Self::Aud => 9,
            Self::EndOfSequence => 10,
            Self::EndOfStream => 11,
            Self::FillerData => 12,
            Self::SpsExtension => 13,
            Self::AuxiliarySlice => 19,
            Self::Unknown(id) => *id,
        }
    }

    /// 是否为 VCL (Video Coding Layer) NAL
    pub fn is_vcl(&self) -> bool {
        matches!(
            self,
            Self::Slice | Self::SliceDpa | Self::SliceDpb | Self::SliceDpc | Self::SliceIdr
        )
    }

    /// 是否为关键帧 (IDR)
    pub fn is_idr(&self) -> bool {
        matches!(self, Self::SliceIdr)
    }
}

impl std::fmt::Display for NalUnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Slice => write!(f, "Slice"),
            Self::SliceDpa => write!(f, "SliceDPA"),
            Self::SliceDpb => write!(f, "SliceDPB"),
            Self::SliceDpc => write!(f, "SliceDPC"),
            Self::SliceIdr => write!(f, "IDR"),
            Self::Sei => write!(f, "SEI"),
            Self::Sps => write!(f, "SPS"),
            Self::Pps => write!(f, "PPS"),
            Self::Aud => write!(f, "AUD"),
            Self::EndOfSequence => write!(f, "EndOfSeq"),
            Self::EndOfStream => write!(f, "EndOfStream"),
            Self::FillerData => write!(f, "Filler"),
            Self::SpsExtension => write!(f, "SPSExt"),
            Self::AuxiliarySlice => write!(f, "AuxSlice"),
            Self::Unknown(id) => write!(f, "Unknown({id})"),
        }
    }
}

/// 借用调用方缓冲区的 NAL 单元视图
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalUnit<'a> {
    /// NAL 单元类型
    pub nal_type: NalUnitType,
    /// nal_ref_idc (参考重要性, 0-3)
    pub ref_idc: u8,
    /// NAL 数据在所属数据包中的起始偏移 (跳过长度前缀后)
    pub offset: usize,
    /// NAL 单元原始数据 (不含长度前缀, 含 NAL 头部字节)
    pub data: &'a [u8],
}

impl<'a> NalUnit<'a> {
    /// 从 NAL 数据 (含头部字节) 解析
    pub fn parse(data: &'a [u8]) -> AvcResult<Self> {
        let Some(&header) = data.first() else {
            return Err(AvcError::InvalidData("H.264: NAL 单元数据为空".into()));
        };

        let forbidden = (header >> 7) & 1;
        if forbidden != 0 {
            return Err(AvcError::InvalidData(format!(
                "H.264: forbidden_zero_bit 非法, value={}",
                forbidden
            )));
        }

        Ok(Self::classify(0, header, data))
    }

    fn classify(offset: usize, header: u8, data: &'a [u8]) -> Self {
        Self {
            nal_type: NalUnitType::from_header(header),
            ref_idc: (header >> 5) & 0x03,
            offset,
            data,
        }
    }

    /// NAL 头部之后的载荷 (仍可能含防竞争字节)
    pub fn payload(&self) -> &'a [u8] {
        self.data.get(1..).unwrap_or(&[])
    }

    /// NAL 数据在所属数据包中的字节范围
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.data.len()
    }
}

/// AVCC (length-prefixed) NAL 单元迭代器
///
/// 遇到截断的长度前缀、越界的载荷或长度为 0 的 NAL 时停止,
/// 并通过 [`AvccNalIter::is_malformed`] 报告.
#[derive(Debug, Clone)]
pub struct AvccNalIter<'a> {
    data: &'a [u8],
    pos: usize,
    length_size: usize,
    finished: bool,
    malformed: bool,
}

impl<'a> AvccNalIter<'a> {
    /// 创建迭代器
    ///
    /// `length_size` 通常为 4 (来自 AVCDecoderConfigurationRecord 的 lengthSizeMinusOne + 1),
    /// 取值不在 1..=4 时不产出任何单元.
    pub fn new(data: &'a [u8], length_size: usize) -> Self {
        let valid = (1..=4).contains(&length_size);
        if !valid {
            debug!("H.264: AVCC 长度前缀大小非法, length_size={}", length_size);
        }
        Self {
            data,
            pos: 0,
            length_size,
            finished: !valid,
            malformed: !valid,
        }
    }

    /// 扫描是否因畸形数据提前终止
    pub fn is_malformed(&self) -> bool {
        self.malformed
    }

    fn stop(&mut self, malformed: bool) -> Option<NalUnit<'a>> {
        self.finished = true;
        self.malformed |= malformed;
        None
    }
}

impl<'a> Iterator for AvccNalIter<'a> {
    type Item = NalUnit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let remaining = self.data.len() - self.pos;
        if remaining == 0 {
            return self.stop(false);
        }
        // 至少需要长度前缀 + 1 字节 NAL 头
        if remaining <= self.length_size {
            debug!(
                "H.264: AVCC 长度前缀截断, offset={}, remain={}",
                self.pos, remaining
            );
            return self.stop(true);
        }

        let prefix = &self.data[self.pos..self.pos + self.length_size];
        let nal_len = prefix
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
        let start = self.pos + self.length_size;

        if nal_len == 0 {
            debug!("H.264: AVCC NAL 长度为 0, offset={}", self.pos);
            return self.stop(true);
        }
        if nal_len > self.data.len() - start {
            debug!(
                "H.264: AVCC NAL 数据越界, offset={}, declared_len={}, remain={}",
                self.pos,
                nal_len,
                self.data.len() - start
            );
            return self.stop(true);
        }

        let end = start + nal_len;
        let data = &self.data[start..end];
        let unit = NalUnit::classify(start, data[0], data);
        trace!(
            "H.264: NAL offset={}, len={}, type={}",
            start, nal_len, unit.nal_type
        );
        self.pos = end;
        Some(unit)
    }
}

/// 从数据包中找到的 SPS/PPS 对
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpsPps<'a> {
    /// 首个 SPS NAL (含头部字节)
    pub sps: NalUnit<'a>,
    /// 首个 PPS NAL (含头部字节)
    pub pps: NalUnit<'a>,
}

/// 在 AVCC 数据包 (4 字节长度前缀) 中查找首个 SPS 与首个 PPS
///
/// 两者都找到时立即返回; 数据包短于 5 字节、长度前缀越界或扫描结束仍未集齐时返回 `None`.
pub fn find_sps_pps(packet: &[u8]) -> Option<SpsPps<'_>> {
    if packet.len() < MIN_PACKET_LEN {
        return None;
    }

    let mut sps = None;
    let mut pps = None;
    for nal in AvccNalIter::new(packet, AVCC_LENGTH_SIZE) {
        match nal.nal_type {
            NalUnitType::Sps if sps.is_none() => sps = Some(nal),
            NalUnitType::Pps if pps.is_none() => pps = Some(nal),
            _ => {}
        }
        if let (Some(sps), Some(pps)) = (sps, pps) {
            return Some(SpsPps { sps, pps });
        }
    }

    None
}

/// AVCC 数据包 (4 字节长度前缀) 中是否包含 IDR 切片
pub fn is_idr(packet: &[u8]) -> bool {
    if packet.len() < MIN_PACKET_LEN {
        return false;
    }
    AvccNalIter::new(packet, AVCC_LENGTH_SIZE).any(|nal| nal.nal_type.is_idr())
}

/// 移除 emulation prevention 字节 (0x00 0x00 0x03 → 0x00 0x00)
///
/// H.264 规范要求在 RBSP 中, 如果出现连续两个 0x00,
/// 后面必须插入 0x03 以防止与起始码混淆.
/// 解析时需要移除这些 0x03 字节.
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut rbsp = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let is_emulation_prevention =
            i + 2 < data.len() && data[i] == 0x00 && data[i + 1] == 0x00 && data[i + 2] == 0x03;
        if is_emulation_prevention {
            rbsp.push(0x00);
            rbsp.push(0x00);
            i += 3; // 跳过 0x03
        } else {
            rbsp.push(data[i]);
            i += 1;
        }
    }

    rbsp
}

/// 插入 emulation prevention 字节, 将 RBSP 转换为 NAL 载荷
///
/// 连续两个 0x00 之后若出现 0x00..=0x03, 先插入一个 0x03.
pub fn add_emulation_prevention(rbsp: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rbsp.len() + rbsp.len() / 64 + 1);
    let mut zeros = 0usize;

    for &byte in rbsp {
        if zeros >= 2 && byte <= 0x03 {
            out.push(0x03);
            zeros = 0;
        }
        out.push(byte);
        zeros = if byte == 0x00 { zeros + 1 } else { 0 };
    }

    out
}
