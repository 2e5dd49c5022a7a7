//! # avcparse-core
//!
//! avcparse 核心库, 提供统一错误类型与比特流读写工具.
//!
//! 比特流读取器直接工作在 NAL 载荷上, 读取时透明去除 emulation prevention 字节.

pub mod bitreader;
pub mod bitwriter;
pub mod error;

// 重导出常用类型
pub use bitreader::BitReader;
pub use bitwriter::BitWriter;
pub use error::{AvcError, AvcResult};
