//! AVCDecoderConfigurationRecord (MP4 avcC box 内容) 的构建与解析.
//!
//! 单 SPS / 单 PPS 记录布局:
//! ```text
//! [01] [profile] [compat] [level] [FF] [E1]
//! [sps_len: 2 bytes BE] [SPS NAL ...]
//! [01] [pps_len: 2 bytes BE] [PPS NAL ...]
//! ```
//!
//! `0xFF` 表示 lengthSizeMinusOne=3 (4 字节长度前缀), `0xE1` 表示 1 个 SPS.

use avcparse_core::{AvcError, AvcResult};
use log::debug;

/// avcC 头部固定字节数 (version/profile/compat/level/lengthSize/numSps)
const AVCC_HEADER_LEN: usize = 6;

/// 写出时预留的额外字节数
///
/// 实际写出 `sps + pps + 11` 字节, 缓冲区按 `sps + pps + 16` 分配, 余量保持为 0.
const AVCC_RESERVED_LEN: usize = 16;

/// 单个参数集允许的最大长度 (2 字节长度字段)
const MAX_PARAM_SET_LEN: usize = u16::MAX as usize;

/// avcC 配置解析结果, SPS/PPS 均借用输入缓冲区
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvccConfig<'a> {
    /// configurationVersion (通常为 1)
    pub version: u8,
    /// AVCProfileIndication
    pub profile_idc: u8,
    /// profile_compatibility
    pub profile_compat: u8,
    /// AVCLevelIndication
    pub level_idc: u8,
    /// NAL 长度前缀大小 (字节)
    pub length_size: usize,
    /// SPS 列表 (含 NAL 头部)
    pub sps_list: Vec<&'a [u8]>,
    /// PPS 列表 (含 NAL 头部)
    pub pps_list: Vec<&'a [u8]>,
}

/// 写出 avcC 所需的缓冲区容量
pub fn avcc_config_capacity(sps: &[u8], pps: &[u8]) -> usize {
    sps.len() + pps.len() + AVCC_RESERVED_LEN
}

/// 将一对 SPS/PPS NAL 写为 avcC 记录
///
/// `sps` 与 `pps` 均含 1 字节 NAL 头部. 返回实际写出的字节数.
/// 容量检查先于任何写入, 失败时 `dst` 保持不变.
pub fn write_avcc_config(dst: &mut [u8], sps: &[u8], pps: &[u8]) -> AvcResult<usize> {
    check_param_sets(sps, pps)?;

    let required = avcc_config_capacity(sps, pps);
    if dst.len() < required {
        return Err(AvcError::BufferTooSmall {
            required,
            available: dst.len(),
        });
    }

    dst[..AVCC_HEADER_LEN].copy_from_slice(&[
        1,      // configurationVersion
        sps[1], // profile_idc
        sps[2], // profile_compatibility
        sps[3], // level_idc
        0xFF,   // 6 bits reserved + lengthSizeMinusOne=3
        0xE1,   // 3 bits reserved + numOfSequenceParameterSets=1
    ]);
    let mut pos = AVCC_HEADER_LEN;
    pos = write_param_set(dst, pos, sps);

    dst[pos] = 1; // numOfPictureParameterSets
    pos += 1;
    pos = write_param_set(dst, pos, pps);

    debug!(
        "H.264: 写出 avcC, sps_len={}, pps_len={}, written={}",
        sps.len(),
        pps.len(),
        pos
    );
    Ok(pos)
}

/// 分配 `avcc_config_capacity` 字节并写入 avcC 记录
///
/// 返回的缓冲区长度为 `sps + pps + 16`, 写出内容之后的字节为 0.
pub fn build_avcc_config(sps: &[u8], pps: &[u8]) -> AvcResult<Vec<u8>> {
    let mut out = vec![0u8; avcc_config_capacity(sps, pps)];
    write_avcc_config(&mut out, sps, pps)?;
    Ok(out)
}

/// 解析 AVCDecoderConfigurationRecord
///
/// 支持多个 SPS/PPS, 不拷贝参数集数据. PPS 之后的尾部字节 (如 High profile
/// 扩展字段或写出时的填充) 被忽略.
pub fn parse_avcc_config(data: &[u8]) -> AvcResult<AvccConfig<'_>> {
    if data.len() < AVCC_HEADER_LEN + 1 {
        return Err(AvcError::InvalidData(format!(
            "H.264: avcC 数据太短, len={}",
            data.len()
        )));
    }

    let length_size = usize::from(data[4] & 0x03) + 1;
    let num_sps = usize::from(data[5] & 0x1F);
    let mut pos = AVCC_HEADER_LEN;

    let mut sps_list = Vec::with_capacity(num_sps);
    for index in 0..num_sps {
        let (sps, next) = read_param_set(data, pos, "SPS", index)?;
        sps_list.push(sps);
        pos = next;
    }

    let Some(&num_pps) = data.get(pos) else {
        return Err(AvcError::InvalidData(
            "H.264: avcC 缺少 numOfPictureParameterSets 字段".into(),
        ));
    };
    pos += 1;

    let mut pps_list = Vec::with_capacity(usize::from(num_pps));
    for index in 0..usize::from(num_pps) {
        let (pps, next) = read_param_set(data, pos, "PPS", index)?;
        pps_list.push(pps);
        pos = next;
    }

    Ok(AvccConfig {
        version: data[0],
        profile_idc: data[1],
        profile_compat: data[2],
        level_idc: data[3],
        length_size,
        sps_list,
        pps_list,
    })
}

fn check_param_sets(sps: &[u8], pps: &[u8]) -> AvcResult<()> {
    if sps.len() < 4 {
        return Err(AvcError::InvalidArgument(format!(
            "H.264: SPS 数据太短, 无法读取 profile/level, len={}",
            sps.len()
        )));
    }
    if sps.len() > MAX_PARAM_SET_LEN {
        return Err(AvcError::InvalidArgument(format!(
            "H.264: SPS 超出 avcC 长度字段范围, len={}",
            sps.len()
        )));
    }
    if pps.len() > MAX_PARAM_SET_LEN {
        return Err(AvcError::InvalidArgument(format!(
            "H.264: PPS 超出 avcC 长度字段范围, len={}",
            pps.len()
        )));
    }
    Ok(())
}

/// 写入 2 字节大端长度与参数集数据, 返回新的写入位置
///
/// 调用方已保证容量与长度范围.
fn write_param_set(dst: &mut [u8], pos: usize, param_set: &[u8]) -> usize {
    let len = param_set.len() as u16;
    dst[pos..pos + 2].copy_from_slice(&len.to_be_bytes());
    let start = pos + 2;
    dst[start..start + param_set.len()].copy_from_slice(param_set);
    start + param_set.len()
}

/// 读取一个带 2 字节长度前缀的参数集, 返回 (数据, 下一个位置)
fn read_param_set<'a>(
    data: &'a [u8],
    pos: usize,
    kind: &str,
    index: usize,
) -> AvcResult<(&'a [u8], usize)> {
    let Some(len_bytes) = data.get(pos..pos + 2) else {
        return Err(AvcError::InvalidData(format!(
            "H.264: avcC {} 长度字段截断, index={}",
            kind, index
        )));
    };
    let len = usize::from(u16::from_be_bytes([len_bytes[0], len_bytes[1]]));
    if len == 0 {
        return Err(AvcError::InvalidData(format!(
            "H.264: avcC {} 长度非法, index={}, len=0",
            kind, index
        )));
    }

    let start = pos + 2;
    match data.get(start..start + len) {
        Some(param_set) => Ok((param_set, start + len)),
        None => Err(AvcError::InvalidData(format!(
            "H.264: avcC {} 数据截断, index={}, declared_len={}, remain={}",
            kind,
            index,
            len,
            data.len().saturating_sub(start)
        ))),
    }
}
