//! NAL 比特流读取器.
//!
//! 直接在 NAL 载荷 (非 RBSP) 上按位读取, 读取过程中透明地去除
//! emulation prevention 字节 (`00 00 03` 中的 `03`), 无需预先拷贝出 RBSP.
//!
//! 按大端位序读取 (MSB first). 读取器对截断输入采取容忍策略:
//! 数据不足时只返回实际可用的位, 数据耗尽后返回 0, 从不报错.

/// emulation_prevention_three_byte
const EMULATION_PREVENTION_BYTE: u8 = 0x03;

/// NAL 比特流读取器
///
/// 内部维护最多 64 位的缓存, 按字节补充. 补充时跟踪已入缓存的连续 0 字节数,
/// 当连续两个 0x00 之后出现 0x03 时, 该字节被丢弃且不进入缓存.
///
/// # 示例
/// ```
/// use avcparse_core::bitreader::BitReader;
///
/// // 00 00 03 01: 中间的 0x03 为防竞争字节
/// let data = [0x00, 0x00, 0x03, 0x01];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(24), 0x000001);
/// assert!(br.eos());
/// ```
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    /// 源数据 (NAL 载荷, 可能含防竞争字节)
    data: &'a [u8],
    /// 下一个待读取的原始字节索引
    pos: usize,
    /// 位缓存, 低 `head` 位有效
    cache: u64,
    /// 缓存中有效位数
    head: u32,
    /// 最近进入缓存的连续 0x00 字节数
    zero_run: u8,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            cache: 0,
            head: 0,
            zero_run: 0,
        }
    }

    /// 读取 N 个位 (最多 32 位, 超出部分按 32 处理)
    ///
    /// 剩余数据不足 N 位时只返回实际可用的位 (结果宽度相应变窄),
    /// 数据耗尽后返回 0 且不再移动位置.
    pub fn read_bits(&mut self, n: u32) -> u32 {
        let mut n = n.min(32);
        if n == 0 {
            return 0;
        }

        while self.head < n {
            match self.next_cache_byte() {
                Some(byte) => {
                    self.cache = (self.cache << 8) | u64::from(byte);
                    self.head += 8;
                }
                None => {
                    // 已到末尾, 最多只能产出 head 位
                    n = self.head;
                    break;
                }
            }
        }

        let shift = self.head - n;
        let value = (self.cache >> shift) & low_mask(n);
        self.head = shift;
        value as u32
    }

    /// 读取 1 个位
    pub fn read_bit(&mut self) -> u32 {
        self.read_bits(1)
    }

    /// 读取 1 位标志
    pub fn read_flag(&mut self) -> bool {
        self.read_bits(1) == 1
    }

    /// 跳过 N 个位
    pub fn skip_bits(&mut self, n: u32) {
        let mut remaining = n;
        while remaining > 0 && !self.eos() {
            let step = remaining.min(32);
            self.read_bits(step);
            remaining -= step;
        }
    }

    /// 是否已耗尽 (原始数据读完且缓存为空)
    pub fn eos(&self) -> bool {
        self.pos >= self.data.len() && self.head == 0
    }

    /// 已消耗的原始字节数 (含被丢弃的防竞争字节和缓存中的未读位所在字节)
    pub fn bytes_consumed(&self) -> usize {
        self.pos
    }

    /// 当前是否位于 RBSP 字节边界
    pub fn is_byte_aligned(&self) -> bool {
        self.head % 8 == 0
    }

    /// 获取底层数据的引用
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// 取下一个进入缓存的字节, 期间丢弃至多一个防竞争字节
    fn next_cache_byte(&mut self) -> Option<u8> {
        let mut byte = *self.data.get(self.pos)?;
        self.pos += 1;

        if byte == EMULATION_PREVENTION_BYTE && self.zero_run >= 2 {
            // 按 H.264 语法, 跳过 0x03 后零计数清零, 其后的字节无条件进入缓存.
            // 与只看缓存中最近 16 位的窗口判断不同: `00 00 03 00 03` 中第二个 0x03 被保留.
            self.zero_run = 0;
            byte = *self.data.get(self.pos)?;
            self.pos += 1;
        }

        self.zero_run = if byte == 0 {
            self.zero_run.saturating_add(1)
        } else {
            0
        };
        Some(byte)
    }
}

fn low_mask(n: u32) -> u64 {
    if n >= 64 { u64::MAX } else { (1u64 << n) - 1 }
}
