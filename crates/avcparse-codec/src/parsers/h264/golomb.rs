//! Exp-Golomb 可变长编码读取.
//!
//! SPS 中大量使用 Exp-Golomb 可变长编码:
//! - `ue(v)`: 无符号 Exp-Golomb
//! - `se(v)`: 有符号 Exp-Golomb
//!
//! 码流按顺序读取且没有再同步点, 此处的任何偏差都会破坏后续所有字段.

use avcparse_core::BitReader;

/// 前导零个数上限, 防止畸形输入导致无界循环
const MAX_LEADING_ZEROS: u32 = 32;

/// 读取无符号 Exp-Golomb 编码值 ue(v)
///
/// 逐位统计前导零, 直到读到 1、读取器耗尽或前导零达到 32 个;
/// 再读取同样位数的后缀, 返回 `(1 << i) - 1 + suffix`.
/// 前导零达到上限时结果超出 u32, 饱和为 `u32::MAX`.
pub fn read_ue(br: &mut BitReader) -> u32 {
    let mut leading_zeros = 0u32;
    while br.read_bit() == 0 && !br.eos() && leading_zeros < MAX_LEADING_ZEROS {
        leading_zeros += 1;
    }

    let suffix = u64::from(br.read_bits(leading_zeros));
    let value = (1u64 << leading_zeros) - 1 + suffix;
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// 读取有符号 Exp-Golomb 编码值 se(v)
pub fn read_se(br: &mut BitReader) -> i32 {
    let code = read_ue(br);
    // 映射: 0→0, 1→1, 2→-1, 3→2, 4→-2, ...
    let magnitude = i64::from(code.div_ceil(2));
    let value = if code & 1 == 0 { -magnitude } else { magnitude };
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::h264::nal::add_emulation_prevention;
    use avcparse_core::BitWriter;

    #[test]
    fn test_exp_golomb_ue() {
        // ue(v) 编码: 1 → 0, 010 → 1, 011 → 2, 00100 → 3
        let data = [0b10000000];
        let mut br = BitReader::new(&data);
        assert_eq!(read_ue(&mut br), 0);

        let data = [0b01000000];
        let mut br = BitReader::new(&data);
        assert_eq!(read_ue(&mut br), 1);

        let data = [0b01100000];
        let mut br = BitReader::new(&data);
        assert_eq!(read_ue(&mut br), 2);

        let data = [0b00100000];
        let mut br = BitReader::new(&data);
        assert_eq!(read_ue(&mut br), 3);

        // 7 → "0001000"
        let data = [0b00010000];
        let mut br = BitReader::new(&data);
        assert_eq!(read_ue(&mut br), 7);
    }

    #[test]
    fn test_exp_golomb_se() {
        let cases: [(u8, i32); 5] = [
            (0b10000000, 0),
            (0b01000000, 1),
            (0b01100000, -1),
            (0b00100000, 2),
            (0b00101000, -2),
        ];
        for (byte, expected) in cases {
            let data = [byte];
            let mut br = BitReader::new(&data);
            assert_eq!(read_se(&mut br), expected, "se(v) 解码错误, byte=0b{:08b}", byte);
        }
    }

    #[test]
    fn test_exp_golomb_ue_roundtrip_all_20bit_values() {
        let mut bw = BitWriter::new();
        for value in 0..(1u32 << 20) {
            bw.write_ue(value);
        }
        bw.write_rbsp_trailing_bits();
        let payload = add_emulation_prevention(&bw.finish());

        let mut br = BitReader::new(&payload);
        for value in 0..(1u32 << 20) {
            let decoded = read_ue(&mut br);
            assert_eq!(decoded, value, "ue(v) 往返失败: value={}", value);
        }
    }

    #[test]
    fn test_exp_golomb_se_roundtrip() {
        let values = [0, 1, -1, 2, -2, 127, -128, 255, -256, 65535, -65536];
        let mut bw = BitWriter::new();
        for &v in &values {
            bw.write_se(v);
        }
        let payload = add_emulation_prevention(&bw.finish());

        let mut br = BitReader::new(&payload);
        for &v in &values {
            assert_eq!(read_se(&mut br), v, "se(v) 往返失败: value={}", v);
        }
    }

    #[test]
    fn test_exp_golomb_empty_input() {
        let mut br = BitReader::new(&[]);
        assert_eq!(read_ue(&mut br), 0);
        assert!(br.eos());
    }

    #[test]
    fn test_exp_golomb_eos_mid_prefix() {
        // 全零字节: 第 8 位读完后读取器耗尽, 前导零计数停在 7
        let data = [0x00];
        let mut br = BitReader::new(&data);
        assert_eq!(read_ue(&mut br), 127);
        assert!(br.eos());
    }

    #[test]
    fn test_exp_golomb_prefix_capped_at_32() {
        let data = [0x00u8; 1000];
        let mut br = BitReader::new(&data);
        let value = read_ue(&mut br);
        assert_eq!(value, u32::MAX, "前导零达到上限时应饱和");
        assert!(
            br.bytes_consumed() <= 9,
            "前导零扫描应在 32 次内终止, consumed={}",
            br.bytes_consumed()
        );
    }
}
