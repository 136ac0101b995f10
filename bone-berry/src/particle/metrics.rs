//! 从最终标签中统计每个粒子的体素个数, 质心, 包围盒与表面接触.

use super::{BoundingBox, Face, FaceSet, Particle};
use crate::data::{Calibration, LabelVolume};
use crate::error::{ParticleError, ParticleResult};
use log::debug;
use ndarray::Axis;

/// 每个标签的统计量. 各数组下标均为标签值, 长度为最大标签 + 1.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleMetrics {
    /// 体素个数.
    pub sizes: Vec<usize>,

    /// 质心的实际坐标 `[x, y, z]`.
    pub centroids: Vec<[f64; 3]>,

    /// 包围盒.
    pub limits: Vec<BoundingBox>,

    /// 接触到的外表面.
    pub faces: Vec<FaceSet>,
}

impl ParticleMetrics {
    /// 对 `labels` 做一次全体扫描 (个数, 坐标和, 包围盒) 和一次外表面扫描.
    ///
    /// 质心坐标按 `calibration` 换算. 标签 0 与其它标签以相同方式统计.
    pub fn extract(labels: &LabelVolume, calibration: &Calibration) -> Self {
        let n = labels.max_label() as usize + 1;
        let mut sizes = vec![0usize; n];
        let mut sums = vec![[0f64; 3]; n];
        let mut limits = vec![BoundingBox::EMPTY; n];

        for ((z, y, x), &l) in labels.view().indexed_iter() {
            let l = l as usize;
            sizes[l] += 1;
            let s = &mut sums[l];
            s[0] += x as f64;
            s[1] += y as f64;
            s[2] += z as f64;
            limits[l].include((z, y, x));
        }

        let centroids = sizes
            .iter()
            .zip(sums)
            .map(|(&cnt, [x, y, z])| {
                let cnt = cnt as f64;
                calibration.scale([x / cnt, y / cnt, z / cnt])
            })
            .collect();
        let faces = touched_faces(labels, n);

        debug!("Extracted metrics of {} labels", n);
        Self {
            sizes,
            centroids,
            limits,
            faces,
        }
    }

    /// 生成粒子记录, 见 [`create_particle_list`].
    pub fn into_particles(self, calibration: &Calibration) -> ParticleResult<Vec<Particle>> {
        create_particle_list(
            &self.sizes,
            &self.centroids,
            &self.limits,
            &self.faces,
            calibration,
        )
    }
}

/// 扫描体数据的六个外表面, 记录每个标签接触到的表面.
fn touched_faces(labels: &LabelVolume, n: usize) -> Vec<FaceSet> {
    let view = labels.view();
    let (d, h, w) = labels.shape();
    let mut faces = vec![FaceSet::EMPTY; n];
    let planes = [
        (Face::Top, Axis(0), 0),
        (Face::Bottom, Axis(0), d - 1),
        (Face::North, Axis(1), 0),
        (Face::South, Axis(1), h - 1),
        (Face::West, Axis(2), 0),
        (Face::East, Axis(2), w - 1),
    ];
    for (face, axis, index) in planes {
        view.index_axis(axis, index)
            .iter()
            .for_each(|&l| faces[l as usize].insert(face));
    }
    faces
}

/// 由各标签的统计量生成粒子记录, 第 `i` 条记录对应标签 `i`.
///
/// 四个数组长度不一致时返回 `Err(ParticleError::InconsistentLengths)`.
pub fn create_particle_list(
    sizes: &[usize],
    centroids: &[[f64; 3]],
    limits: &[BoundingBox],
    faces: &[FaceSet],
    calibration: &Calibration,
) -> ParticleResult<Vec<Particle>> {
    let n = sizes.len();
    if centroids.len() != n || limits.len() != n || faces.len() != n {
        return Err(ParticleError::InconsistentLengths {
            sizes: n,
            centroids: centroids.len(),
            limits: limits.len(),
            faces: faces.len(),
        });
    }
    let voxel_volume = calibration.voxel_volume();
    sizes
        .iter()
        .zip(centroids)
        .zip(limits)
        .zip(faces)
        .enumerate()
        .map(|(i, (((&size, &centroid), &bounds), &faces))| {
            let id = u32::try_from(i).map_err(|_| ParticleError::LabelOverflow)?;
            Ok(Particle {
                id,
                name: format!("Particle {id}"),
                size,
                volume: size as f64 * voxel_volume,
                centroid,
                bounds,
                faces,
            })
        })
        .collect()
}
