//! 体数据加载器. 提供合成体数据, 以及可选的 nii 掩膜.

use bone_berry::prelude::*;
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::env;
use std::path::PathBuf;

/// 获取外部二值掩膜路径.
///
/// 若环境变量 `$BONE_MASK_PATH` 非空, 则返回其值; 否则返回 `None`.
pub fn mask_path_from_env() -> Option<PathBuf> {
    env::var("BONE_MASK_PATH")
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

/// 以固定种子生成多孔体数据, 每个体素以概率 `density` 为前景.
pub fn sponge(shape: Idx3d, density: f64, seed: u64) -> BinaryVolume {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = Array3::from_shape_fn(shape, |_| {
        if rng.random_bool(density) {
            FOREGROUND
        } else {
            BACKGROUND
        }
    });
    BinaryVolume::new(data, Calibration::default()).unwrap()
}

/// 规则排列的实心球, 球心间距为 `spacing`.
pub fn spheres(shape: Idx3d, spacing: usize, radius: f64) -> BinaryVolume {
    let (d, h, w) = shape;
    let mut phantom = Phantom::new(shape);
    for z in (spacing / 2..d).step_by(spacing) {
        for y in (spacing / 2..h).step_by(spacing) {
            for x in (spacing / 2..w).step_by(spacing) {
                phantom = phantom.sphere((z, y, x), radius);
            }
        }
    }
    phantom.build(Calibration::default()).unwrap()
}

/// 实验用体数据: 合成体数据, 以及 `$BONE_MASK_PATH` 指向的掩膜 (如果有).
pub fn volumes() -> Vec<(String, BinaryVolume)> {
    let mut v = vec![
        ("sponge-0.30".to_string(), sponge((96, 96, 96), 0.30, 1)),
        ("sponge-0.45".to_string(), sponge((96, 96, 96), 0.45, 2)),
        ("spheres".to_string(), spheres((128, 96, 96), 12, 4.5)),
    ];
    if let Some(path) = mask_path_from_env() {
        let name = path.display().to_string();
        match BinaryVolume::open(&path) {
            Ok(mask) => v.push((name, mask)),
            Err(e) => eprintln!("Cannot open {name}: {e:?}"),
        }
    }
    v
}
