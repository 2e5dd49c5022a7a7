//! 比特流写入器.
//!
//! 提供向字节缓冲区按位写入数据的能力, 用于构造 SPS 等参数集的 RBSP.
//!
//! 按大端位序写入 (MSB first), 与 BitReader 对应.
//!
//! 解析路径不依赖本模块. 它是构造测试码流的工具: 本 workspace 的单元测试与
//! `tests/` 集成测试用它按字段写出 SPS, 下游 crate 也可以用它生成测试输入.

/// 比特流写入器
///
/// 向字节缓冲区按位写入数据, 使用大端位序 (MSB first).
///
/// # 示例
/// ```
/// use avcparse_core::bitwriter::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_bits(0b1011, 4);
/// bw.write_ue(0); // "1"
/// bw.write_ue(1); // "010"
/// let data = bw.finish();
/// assert_eq!(data, vec![0b10111010]);
/// ```
pub struct BitWriter {
    /// 输出缓冲区
    data: Vec<u8>,
    /// 当前字节 (正在填充)
    current_byte: u8,
    /// 当前字节中已填充的位数 (0-7)
    bit_count: u8,
}

impl BitWriter {
    /// 创建新的比特流写入器
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            current_byte: 0,
            bit_count: 0,
        }
    }

    /// 获取已写入的总位数
    pub fn bits_written(&self) -> usize {
        self.data.len() * 8 + self.bit_count as usize
    }

    /// 写入 1 个位
    pub fn write_bit(&mut self, bit: u32) {
        self.current_byte = (self.current_byte << 1) | (bit & 1) as u8;
        self.bit_count += 1;
        if self.bit_count >= 8 {
            self.data.push(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// 写入 1 位标志
    pub fn write_flag(&mut self, flag: bool) {
        self.write_bit(u32::from(flag));
    }

    /// 写入 N 个位 (最多 32 位)
    ///
    /// 值的低 N 位被写入, 高位在前 (大端).
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "write_bits: n={} 超过 32 位", n);

        for i in (0..n).rev() {
            self.write_bit((value >> i) & 1);
        }
    }

    /// 写入无符号 Exp-Golomb 编码值 ue(v)
    ///
    /// 编码为 `M` 个前导 0, 一个 1, 再跟 `value + 1` 去掉最高位后的 `M` 位.
    pub fn write_ue(&mut self, value: u32) {
        let code = u64::from(value) + 1;
        let len = 63 - code.leading_zeros();
        for _ in 0..len {
            self.write_bit(0);
        }
        for i in (0..=len).rev() {
            self.write_bit(((code >> i) & 1) as u32);
        }
    }

    /// 写入有符号 Exp-Golomb 编码值 se(v)
    ///
    /// 映射: 0→0, 1→1, -1→2, 2→3, -2→4, ...
    pub fn write_se(&mut self, value: i32) {
        let code = if value > 0 {
            (value as u32) * 2 - 1
        } else {
            value.unsigned_abs().saturating_mul(2)
        };
        self.write_ue(code);
    }

    /// 对齐到字节边界 (用 0 填充)
    pub fn align_to_byte(&mut self) {
        if self.bit_count > 0 {
            let pad = 8 - self.bit_count;
            self.current_byte <<= pad;
            self.data.push(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// 写入 RBSP 尾部 (rbsp_stop_one_bit + 对齐 0)
    pub fn write_rbsp_trailing_bits(&mut self) {
        self.write_bit(1);
        self.align_to_byte();
    }

    /// 完成写入, 返回字节数据
    ///
    /// 如果当前不在字节边界, 自动用 0 填充.
    pub fn finish(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.data
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}
