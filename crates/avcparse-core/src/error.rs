//! 统一错误类型定义.
//!
//! 所有 avcparse crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

/// avcparse 统一错误类型
#[derive(Debug, Error)]
pub enum AvcError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 无效数据 (损坏或截断的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 输出缓冲区容量不足
    #[error("缓冲区容量不足: 需要 {required} 字节, 实际 {available} 字节")]
    BufferTooSmall {
        /// 需要的字节数
        required: usize,
        /// 实际可用的字节数
        available: usize,
    },

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// avcparse 统一 Result 类型
pub type AvcResult<T> = Result<T, AvcError>;
