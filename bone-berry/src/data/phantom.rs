//! 合成体数据, 用于测试与基准.

use super::{BinaryVolume, Calibration};
use crate::consts::gray::FOREGROUND;
use crate::error::ParticleResult;
use crate::Idx3d;
use ndarray::{s, Array3};

/// 合成二值体数据构建器. 初始全部为背景.
///
/// 所有坐标均为 `(z, y, x)`, 超出体数据的部分会被裁剪.
#[derive(Debug, Clone)]
pub struct Phantom {
    data: Array3<u8>,
}

impl Phantom {
    /// 创建形状为 `shape` 的全背景体数据.
    pub fn new(shape: Idx3d) -> Self {
        Self {
            data: Array3::zeros(shape),
        }
    }

    /// 将单个体素设为前景.
    pub fn voxel(mut self, pos: Idx3d) -> Self {
        if let Some(p) = self.data.get_mut(pos) {
            *p = FOREGROUND;
        }
        self
    }

    /// 以 `min` 为起点, 边长为 `side` 的立方体.
    pub fn cube(self, min: Idx3d, side: usize) -> Self {
        self.cuboid(min, (side, side, side))
    }

    /// 以 `min` 为起点, 尺寸为 `(深, 高, 宽)` 的长方体.
    pub fn cuboid(mut self, (z, y, x): Idx3d, (d, h, w): Idx3d) -> Self {
        let (zd, yd, xd) = self.data.dim();
        let (z1, y1, x1) = ((z + d).min(zd), (y + h).min(yd), (x + w).min(xd));
        if z < z1 && y < y1 && x < x1 {
            self.data.slice_mut(s![z..z1, y..y1, x..x1]).fill(FOREGROUND);
        }
        self
    }

    /// 以 `center` 为球心, 半径为 `radius` (体素) 的实心球.
    pub fn sphere(mut self, center: Idx3d, radius: f64) -> Self {
        let (cz, cy, cx) = (center.0 as f64, center.1 as f64, center.2 as f64);
        let r2 = radius * radius;
        self.data.indexed_iter_mut().for_each(|((z, y, x), p)| {
            let dz = z as f64 - cz;
            let dy = y as f64 - cy;
            let dx = x as f64 - cx;
            if dz * dz + dy * dy + dx * dx <= r2 {
                *p = FOREGROUND;
            }
        });
        self
    }

    /// 生成二值体数据.
    pub fn build(self, calibration: Calibration) -> ParticleResult<BinaryVolume> {
        BinaryVolume::new(self.data, calibration)
    }
}

#[cfg(test)]
mod tests {
    use super::Phantom;
    use crate::consts::Phase;
    use crate::data::Calibration;

    #[test]
    fn test_phantom_shapes() {
        let v = Phantom::new((6, 6, 6))
            .cube((0, 0, 0), 2)
            .cuboid((4, 4, 4), (5, 5, 1))
            .voxel((3, 0, 5))
            .voxel((10, 10, 10))
            .build(Calibration::default())
            .unwrap();
        // 8 + 2 * 2 * 1 + 1
        assert_eq!(v.count(Phase::Foreground), 13);
        assert!(v.is_phase((1, 1, 1), Phase::Foreground));
        assert!(v.is_phase((5, 5, 4), Phase::Foreground));
        assert!(v.is_phase((5, 5, 5), Phase::Background));
    }

    #[test]
    fn test_phantom_sphere() {
        let v = Phantom::new((5, 5, 5))
            .sphere((2, 2, 2), 1.0)
            .build(Calibration::default())
            .unwrap();
        assert_eq!(v.count(Phase::Foreground), 7);
    }
}
