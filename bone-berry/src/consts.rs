//! 通用常量.

use crate::data::Connectivity;
use crate::error::ParticleError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 单通道二值体素值.
pub mod gray {
    /// 二值体数据中, 背景的体素值.
    pub const BACKGROUND: u8 = 0b_0000_0000;

    /// 二值体数据中, 前景 (骨骼) 的体素值.
    pub const FOREGROUND: u8 = 0b_1111_1111;

    /// 体素是否是前景?
    #[inline]
    pub const fn is_foreground(p: u8) -> bool {
        matches!(p, FOREGROUND)
    }

    /// 体素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, BACKGROUND)
    }

    /// 体素值是否合法 (前景或背景)?
    #[inline]
    pub const fn is_binary(p: u8) -> bool {
        matches!(p, FOREGROUND | BACKGROUND)
    }
}

/// 默认每个分块包含的水平切片个数. 2 在一般情况下就足够好.
pub const DEFAULT_SLICES_PER_CHUNK: usize = 2;

/// 背景 / 空标签. 其它标签都代表某个粒子.
pub const NO_PARTICLE: u32 = 0;

/// 旧接口中前景的整数编码.
pub const LEGACY_FOREGROUND: i32 = -1;

/// 旧接口中背景的整数编码.
pub const LEGACY_BACKGROUND: i32 = 0;

/// 待标记的体素相 (phase).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Phase {
    /// `FOREGROUND`, 按 26-邻域连通.
    #[default]
    Foreground,

    /// `BACKGROUND`, 按 6-邻域连通.
    Background,
}

impl Phase {
    /// 是否为前景.
    #[inline]
    pub fn is_foreground(&self) -> bool {
        matches!(self, Self::Foreground)
    }

    /// 是否为背景.
    #[inline]
    pub fn is_background(&self) -> bool {
        !self.is_foreground()
    }

    /// 体素值 `p` 是否属于该相.
    #[inline]
    pub fn matches(&self, p: u8) -> bool {
        match self {
            Self::Foreground => gray::is_foreground(p),
            Self::Background => gray::is_background(p),
        }
    }

    /// 该相使用的连通规则. 前景为 26-邻域, 背景为 6-邻域.
    #[inline]
    pub fn connectivity(&self) -> Connectivity {
        match self {
            Self::Foreground => Connectivity::Full26,
            Self::Background => Connectivity::Face6,
        }
    }

    /// 该相对应的体素值.
    #[inline]
    pub fn gray(&self) -> u8 {
        match self {
            Self::Foreground => gray::FOREGROUND,
            Self::Background => gray::BACKGROUND,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Foreground => f.write_str("foreground"),
            Self::Background => f.write_str("background"),
        }
    }
}

/// 兼容旧接口的整数编码 (`-1` 前景, `0` 背景).
impl TryFrom<i32> for Phase {
    type Error = ParticleError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            LEGACY_FOREGROUND => Ok(Self::Foreground),
            LEGACY_BACKGROUND => Ok(Self::Background),
            v => Err(ParticleError::UnknownPhase(v)),
        }
    }
}
