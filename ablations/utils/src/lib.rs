//! 消融实验依赖的通用组件.

use std::num::NonZeroUsize;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 简单分隔线.
#[inline]
pub fn sep_to<W: std::io::Write>(mut w: W) -> std::io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 获得可并行核心数, 作为标记配置中的工作线程数.
#[inline]
pub fn workers() -> NonZeroUsize {
    NonZeroUsize::new(cpus()).unwrap_or(NonZeroUsize::MIN)
}
