//! avcparse-probe - H.264 参数集探测工具
//!
//! 读取 AVCC 数据包或 avcC extradata 文件, 输出 NAL 单元列表、
//! SPS 播放参数 (profile/level/隔行/参考帧数/尺寸) 与 avcC 记录.

use clap::{Parser, ValueEnum};
use log::debug;
use serde::Serialize;
use std::path::Path;
use std::process;

use avcparse_codec::{
    AvccNalIter, NalUnitType, SpsFields, SpsReport, build_avcc_config, find_sps_pps, is_idr,
    parse_avcc_config, parse_sps_report, validate_avcc_extradata,
};
use avcparse_core::{AvcError, AvcResult};

/// AVCC 数据包使用的长度前缀大小
const PACKET_LENGTH_SIZE: usize = 4;

/// H.264 参数集探测工具
#[derive(Parser, Debug)]
#[command(name = "avcparse-probe", version, about = "H.264 参数集探测工具")]
struct Cli {
    /// 输入文件路径
    input: Option<String>,

    /// 输入类型
    #[arg(long, value_enum, default_value_t = InputMode::Auto)]
    mode: InputMode,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 静默模式 (只输出探测结果)
    #[arg(short, long)]
    quiet: bool,
}

/// 输入数据类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum InputMode {
    /// 按内容自动识别
    Auto,
    /// 4 字节长度前缀的 AVCC 数据包
    Packet,
    /// avcC extradata (AVCDecoderConfigurationRecord)
    Extradata,
}

impl InputMode {
    fn name(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Packet => "packet",
            Self::Extradata => "extradata",
        }
    }
}

// ============================================================
// JSON 输出结构体
// ============================================================

/// 完整探测结果
#[derive(Serialize, Debug)]
struct ProbeOutput {
    filename: String,
    mode: &'static str,
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    packet: Option<PacketInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extradata: Option<ExtradataInfo>,
}

/// 数据包探测结果
#[derive(Serialize, Debug)]
struct PacketInfo {
    nal_units: Vec<NalInfo>,
    malformed: bool,
    is_idr: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    sps: Option<SpsInfo>,
    /// 由首个 SPS/PPS 构建的 avcC 记录 (十六进制)
    #[serde(skip_serializing_if = "Option::is_none")]
    avcc: Option<String>,
}

/// NAL 单元信息
#[derive(Serialize, Debug)]
struct NalInfo {
    offset: usize,
    size: usize,
    nal_type: String,
    type_id: u8,
    ref_idc: u8,
}

/// extradata 探测结果
#[derive(Serialize, Debug)]
struct ExtradataInfo {
    version: u8,
    profile_idc: u8,
    level_idc: u8,
    length_size: usize,
    nb_sps: usize,
    nb_pps: usize,
    /// 逐行码流且 SPS 可定位
    progressive: bool,
    sps: SpsInfo,
}

/// SPS 播放参数
#[derive(Serialize, Debug, PartialEq, Eq)]
struct SpsInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interlaced: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_ref_frames: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
}

impl From<SpsReport> for SpsInfo {
    fn from(report: SpsReport) -> Self {
        Self {
            profile: report.profile,
            level: report.level,
            interlaced: report.interlaced,
            max_ref_frames: report.max_ref_frames,
            width: report.width,
            height: report.height,
        }
    }
}

// ============================================================
// 主逻辑
// ============================================================

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let Some(input_path) = cli.input.as_deref() else {
        print_banner();
        return;
    };

    if !cli.quiet {
        eprintln!(
            "avcparse-probe 版本 {} -- H.264 参数集探测工具",
            env!("CARGO_PKG_VERSION")
        );
        eprintln!("输入文件: {input_path}");
    }

    let data = match read_input(Path::new(input_path)) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("错误: 无法读取文件 '{input_path}': {e}");
            process::exit(1);
        }
    };

    let output = match probe(input_path, &data, cli.mode) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("错误: {e}");
            process::exit(1);
        }
    };

    if !cli.quiet {
        eprintln!("输入类型: {}", output.mode);
    }

    if cli.json {
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("错误: JSON 序列化失败: {e}");
                process::exit(1);
            }
        }
    } else {
        print_output_text(&output);
    }
}

/// 读取整个输入文件
fn read_input(path: &Path) -> AvcResult<Vec<u8>> {
    let data = std::fs::read(path)?;
    if data.is_empty() {
        return Err(AvcError::InvalidData("输入文件为空".into()));
    }
    Ok(data)
}

/// 按输入类型探测, 无可解析内容时返回错误
fn probe(filename: &str, data: &[u8], mode: InputMode) -> AvcResult<ProbeOutput> {
    let mode = match mode {
        InputMode::Auto => detect_mode(data),
        other => other,
    };
    debug!("探测模式: {}, size={}", mode.name(), data.len());

    let mut output = ProbeOutput {
        filename: filename.to_string(),
        mode: mode.name(),
        size: data.len(),
        packet: None,
        extradata: None,
    };
    if mode == InputMode::Extradata {
        output.extradata = Some(probe_extradata(data)?);
    } else {
        output.packet = Some(probe_packet(data)?);
    }
    Ok(output)
}

/// 识别输入类型
///
/// avcC 记录以 configurationVersion=1 开头, 第 5 字节高 6 位为保留位 (全 1).
fn detect_mode(data: &[u8]) -> InputMode {
    match data {
        [0x01, _, _, _, length_size, ..] if length_size & 0xFC == 0xFC => InputMode::Extradata,
        _ => InputMode::Packet,
    }
}

/// 探测 AVCC 数据包
fn probe_packet(data: &[u8]) -> AvcResult<PacketInfo> {
    let mut iter = AvccNalIter::new(data, PACKET_LENGTH_SIZE);
    let units: Vec<_> = iter.by_ref().collect();
    let malformed = iter.is_malformed();

    if units.is_empty() {
        return Err(AvcError::InvalidData(
            "H.264: 数据包中未找到任何 NAL 单元".into(),
        ));
    }

    let sps = units
        .iter()
        .find(|nal| nal.nal_type == NalUnitType::Sps)
        .map(|nal| SpsInfo::from(parse_sps_report(nal.payload(), SpsFields::all())));

    let avcc = match find_sps_pps(data) {
        Some(pair) => Some(to_hex(&build_avcc_config(pair.sps.data, pair.pps.data)?)),
        None => None,
    };

    let nal_units = units
        .iter()
        .map(|nal| NalInfo {
            offset: nal.offset,
            size: nal.data.len(),
            nal_type: nal.nal_type.to_string(),
            type_id: nal.nal_type.type_id(),
            ref_idc: nal.ref_idc,
        })
        .collect();

    Ok(PacketInfo {
        nal_units,
        malformed,
        is_idr: is_idr(data),
        sps,
        avcc,
    })
}

/// 探测 avcC extradata
fn probe_extradata(data: &[u8]) -> AvcResult<ExtradataInfo> {
    let config = parse_avcc_config(data)?;
    if config.sps_list.is_empty() {
        return Err(AvcError::InvalidData("H.264: avcC 中没有 SPS".into()));
    }

    let (progressive, report) = validate_avcc_extradata(data, SpsFields::all());
    Ok(ExtradataInfo {
        version: config.version,
        profile_idc: config.profile_idc,
        level_idc: config.level_idc,
        length_size: config.length_size,
        nb_sps: config.sps_list.len(),
        nb_pps: config.pps_list.len(),
        progressive,
        sps: report.into(),
    })
}

/// 以空格分隔的大写十六进制
fn to_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// 文本输出
fn print_output_text(output: &ProbeOutput) {
    println!("[INPUT]");
    println!("  文件名       : {}", output.filename);
    println!("  类型         : {}", output.mode);
    println!("  大小         : {} 字节", output.size);
    println!("[/INPUT]");
    println!();

    if let Some(ref packet) = output.packet {
        print_packet_text(packet);
    }
    if let Some(ref extradata) = output.extradata {
        print_extradata_text(extradata);
    }
}

/// 文本输出: 数据包信息
fn print_packet_text(packet: &PacketInfo) {
    for (index, nal) in packet.nal_units.iter().enumerate() {
        println!("[NAL #{index}]");
        println!("  类型         : {} ({})", nal.nal_type, nal.type_id);
        println!("  ref_idc      : {}", nal.ref_idc);
        println!("  偏移         : {}", nal.offset);
        println!("  大小         : {} 字节", nal.size);
        println!("[/NAL]");
        println!();
    }

    println!("[PACKET]");
    println!("  NAL 数量     : {}", packet.nal_units.len());
    println!("  关键帧 (IDR) : {}", if packet.is_idr { "是" } else { "否" });
    if packet.malformed {
        println!("  警告         : 数据包尾部畸形, 扫描提前终止");
    }
    if let Some(ref avcc) = packet.avcc {
        println!("  avcC         : {avcc}");
    }
    println!("[/PACKET]");
    println!();

    if let Some(ref sps) = packet.sps {
        print_sps_text(sps);
    }
}

/// 文本输出: extradata 信息
fn print_extradata_text(info: &ExtradataInfo) {
    println!("[EXTRADATA]");
    println!("  版本         : {}", info.version);
    println!("  profile      : {}", info.profile_idc);
    println!("  level        : {}", info.level_idc);
    println!("  长度前缀     : {} 字节", info.length_size);
    println!("  SPS/PPS 数量 : {}/{}", info.nb_sps, info.nb_pps);
    println!("  逐行         : {}", if info.progressive { "是" } else { "否" });
    println!("[/EXTRADATA]");
    println!();

    print_sps_text(&info.sps);
}

/// 文本输出: SPS 参数
fn print_sps_text(sps: &SpsInfo) {
    println!("[SPS]");
    if let Some(profile) = sps.profile {
        println!("  profile      : {profile}");
    }
    if let Some(level) = sps.level {
        println!("  level        : {}.{}", level / 10, level % 10);
    }
    if let Some(interlaced) = sps.interlaced {
        println!("  隔行         : {}", if interlaced { "是" } else { "否" });
    }
    if let Some(refs) = sps.max_ref_frames {
        println!("  最大参考帧   : {refs}");
    }
    if let (Some(w), Some(h)) = (sps.width, sps.height) {
        println!("  分辨率       : {w}x{h}");
    }
    println!("[/SPS]");
    println!();
}

/// 打印版本横幅
fn print_banner() {
    println!(
        "avcparse-probe 版本 {} -- H.264 参数集探测工具",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("用法: avcparse-probe [选项] <输入文件>");
    println!();
    println!("选项:");
    println!("  --mode <MODE>     输入类型: auto, packet, extradata (默认 auto)");
    println!("  --json            以 JSON 格式输出");
    println!("  -q, --quiet       静默模式");
    println!();
    println!("使用 --help 查看完整用法.");
}
