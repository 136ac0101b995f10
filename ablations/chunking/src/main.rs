//! 分块厚度与连接方法的消融实验.
//!
//! 外部掩膜通过环境变量 `$BONE_MASK_PATH` 指定.

mod profile;
mod result;
mod runner;

fn main() -> std::io::Result<()> {
    simple_logger::init_with_level(log::Level::Info).ok();
    runner::run().analyze()
}
