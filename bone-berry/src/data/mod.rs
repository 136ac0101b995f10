use std::ops::Index;
use std::path::Path;

use ndarray::{Array3, ArrayView, ArrayView2, Axis, Ix3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::consts::{gray::*, Phase};
use crate::error::{ParticleError, ParticleResult};
use crate::Idx3d;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub(crate) mod label;
mod neighbour;
pub mod phantom;

pub use label::LabelVolume;
pub use neighbour::{Connectivity, Offset3d};

/// 体素尺寸 (标定信息), 单位由调用者决定 (一般为毫米或微米).
///
/// 仅在计算质心和体积时作为乘法系数使用.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Calibration {
    pixel_width: f64,
    pixel_height: f64,
    pixel_depth: f64,
}

impl Default for Calibration {
    /// 各向同性的单位体素.
    #[inline]
    fn default() -> Self {
        Self {
            pixel_width: 1.0,
            pixel_height: 1.0,
            pixel_depth: 1.0,
        }
    }
}

impl Calibration {
    /// 以宽 (x), 高 (y), 深 (z) 三个方向的体素尺寸构建标定信息.
    ///
    /// 三个值都必须是正的有限值, 否则返回 `Err`.
    pub fn new(pixel_width: f64, pixel_height: f64, pixel_depth: f64) -> ParticleResult<Self> {
        let dims = [pixel_width, pixel_height, pixel_depth];
        if dims.iter().all(|v| v.is_finite() && *v > 0.0) {
            Ok(Self {
                pixel_width,
                pixel_height,
                pixel_depth,
            })
        } else {
            Err(ParticleError::InvalidCalibration(dims))
        }
    }

    /// 从 nifti header 的 `pixdim` 读取标定信息.
    fn from_header(h: &NiftiHeader) -> ParticleResult<Self> {
        let [_, w, h, z, ..] = h.pixdim;
        Self::new(w as f64, h as f64, z as f64)
    }

    /// x 方向体素尺寸.
    #[inline]
    pub fn pixel_width(&self) -> f64 {
        self.pixel_width
    }

    /// y 方向体素尺寸.
    #[inline]
    pub fn pixel_height(&self) -> f64 {
        self.pixel_height
    }

    /// z 方向体素尺寸.
    #[inline]
    pub fn pixel_depth(&self) -> f64 {
        self.pixel_depth
    }

    /// 单个体素的实际体积.
    #[inline]
    pub fn voxel_volume(&self) -> f64 {
        self.pixel_width * self.pixel_height * self.pixel_depth
    }

    /// 将体素坐标 `(x, y, z)` (可以是非整数, 如坐标平均值) 换算为实际坐标.
    #[inline]
    pub fn scale(&self, [x, y, z]: [f64; 3]) -> [f64; 3] {
        [
            x * self.pixel_width,
            y * self.pixel_height,
            z * self.pixel_depth,
        ]
    }
}

/// 将 (W, H, z) 转换成 (z, H, W). 以后均按照该模式访问.
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

/// 三维二值体数据, 每个体素为 `FOREGROUND` 或 `BACKGROUND`.
///
/// 数据按 `(z, y, x)` 即 `(深, 高, 宽)` 行优先连续存储.
/// 标记过程中该结构只读.
#[derive(Debug, Clone)]
pub struct BinaryVolume {
    data: Array3<u8>,
    calibration: Calibration,
}

impl Index<Idx3d> for BinaryVolume {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl BinaryVolume {
    /// 由 `(z, y, x)` 格式的二值数组直接创建.
    ///
    /// # 返回值
    ///
    /// - 任一维度为 0 时, 返回 `Err(ParticleError::EmptyVolume)`;
    /// - 存在既非前景又非背景的体素时, 返回 `Err(ParticleError::NonBinaryVoxel)`;
    /// - 其他情况下成功.
    pub fn new(data: Array3<u8>, calibration: Calibration) -> ParticleResult<Self> {
        check_not_empty(data.dim())?;
        if let Some((pos, &value)) = data.indexed_iter().find(|(_, p)| !is_binary(**p)) {
            return Err(ParticleError::NonBinaryVoxel { pos, value });
        }
        Ok(Self { data, calibration })
    }

    /// 将任意 `u8` 数组二值化后创建: 非零体素为前景, 零为背景.
    pub fn from_mask(data: Array3<u8>, calibration: Calibration) -> ParticleResult<Self> {
        Self::from_predicate(data, calibration, |p| p != 0)
    }

    /// 将任意 `u8` 数组按谓词 `pred` 二值化后创建: 满足谓词的体素为前景.
    pub fn from_predicate<F>(
        mut data: Array3<u8>,
        calibration: Calibration,
        pred: F,
    ) -> ParticleResult<Self>
    where
        F: Fn(u8) -> bool,
    {
        check_not_empty(data.dim())?;
        data.mapv_inplace(|p| if pred(p) { FOREGROUND } else { BACKGROUND });
        Ok(Self { data, calibration })
    }

    /// 打开 nii 文件格式的三维二值掩膜. 非零体素被视为前景,
    /// header 中的 `pixdim` 被用作标定信息.
    ///
    /// 如果文件打开失败, 或掩膜为空, 或 `pixdim` 非法, 则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OpenVolumeError> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let header = obj.header().clone();

        // [W, H, z] -> [z, H, W]
        // hint: 原第一维向右增长, 原第二维向下增长.
        let data = obj
            .into_volume()
            .into_ndarray::<u8>()?
            .permuted_axes([2, 1, 0].as_slice());

        // The nature of nifti data field layout.
        debug_assert!(data.is_standard_layout());

        let data = mask_from_raw(get_shape_from_header(&header), data.into_raw_vec())?;
        let calibration = Calibration::from_header(&header)?;
        Ok(Self::from_mask(data, calibration)?)
    }

    /// 获取数据形状 `(深, 高, 宽)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 宽 (x 方向体素个数).
    #[inline]
    pub fn width(&self) -> usize {
        self.shape().2
    }

    /// 高 (y 方向体素个数).
    #[inline]
    pub fn height(&self) -> usize {
        self.shape().1
    }

    /// 深 (水平切片个数).
    #[inline]
    pub fn depth(&self) -> usize {
        self.shape().0
    }

    /// 获取体素个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 检查索引是否合法.
    #[inline]
    pub fn check(&self, (z0, y0, x0): Idx3d) -> bool {
        let (z, y, x) = self.shape();
        z0 < z && y0 < y && x0 < x
    }

    /// 获取给定位置的体素值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx3d) -> Option<u8> {
        self.data.get(pos).copied()
    }

    /// 给定位置的体素是否属于 `phase`. 越界时返回 `false`.
    #[inline]
    pub fn is_phase(&self, pos: Idx3d, phase: Phase) -> bool {
        self.get(pos).is_some_and(|p| phase.matches(p))
    }

    /// 统计属于 `phase` 的体素个数.
    #[inline]
    pub fn count(&self, phase: Phase) -> usize {
        self.data.iter().filter(|p| phase.matches(**p)).count()
    }

    /// 标定信息.
    #[inline]
    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// 替换标定信息.
    #[inline]
    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }

    /// 获取第 `z_index` 层水平切片视图.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> ArrayView2<'_, u8> {
        self.data.index_axis(Axis(0), z_index)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u8, Ix3> {
        self.data.view()
    }

    /// 前景与背景互换, 标定信息不变.
    pub fn inverted(&self) -> Self {
        Self {
            data: self.data.mapv(|p| {
                if is_foreground(p) {
                    BACKGROUND
                } else {
                    FOREGROUND
                }
            }),
            calibration: self.calibration,
        }
    }
}

/// 打开 nii 掩膜错误.
#[derive(Debug)]
pub enum OpenVolumeError {
    /// 读取 nii 文件错误.
    Nifti(nifti::NiftiError),

    /// 文件内容不构成合法的体数据.
    Invalid(ParticleError),
}

impl From<nifti::NiftiError> for OpenVolumeError {
    #[inline]
    fn from(e: nifti::NiftiError) -> Self {
        Self::Nifti(e)
    }
}

impl From<ParticleError> for OpenVolumeError {
    #[inline]
    fn from(e: ParticleError) -> Self {
        Self::Invalid(e)
    }
}

/// 体数据不允许出现长度为 0 的维度.
#[inline]
/// 按 header 给出的形状重排原始体素. 体素个数不符 (如第四维大于 1) 时返回 `Err`.
fn mask_from_raw(shape: Idx3d, raw: Vec<u8>) -> ParticleResult<Array3<u8>> {
    let len = raw.len();
    Array3::<u8>::from_shape_vec(shape, raw)
        .map_err(|_| ParticleError::ShapeMismatch { shape, len })
}

fn check_not_empty(shape: Idx3d) -> ParticleResult<()> {
    match shape {
        (0, _, _) | (_, 0, _) | (_, _, 0) => Err(ParticleError::EmptyVolume(shape)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{mask_from_raw, BinaryVolume, Calibration};
    use crate::consts::{gray::*, Phase};
    use crate::error::ParticleError;
    use ndarray::Array3;

    #[test]
    fn test_calibration_validation() {
        assert!(Calibration::new(1.0, 2.0, 3.0).is_ok());
        assert_eq!(
            Calibration::new(0.0, 1.0, 1.0),
            Err(ParticleError::InvalidCalibration([0.0, 1.0, 1.0]))
        );
        assert!(Calibration::new(1.0, f64::NAN, 1.0).is_err());
        assert!(Calibration::new(1.0, 1.0, f64::INFINITY).is_err());

        let cal = Calibration::new(0.5, 2.0, 4.0).unwrap();
        assert_eq!(cal.voxel_volume(), 4.0);
        assert_eq!(cal.scale([2.0, 1.0, 0.5]), [1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_volume_rejects_non_binary() {
        let mut data = Array3::<u8>::zeros((2, 2, 2));
        data[(1, 0, 1)] = 7;
        let err = BinaryVolume::new(data.clone(), Calibration::default()).unwrap_err();
        assert_eq!(
            err,
            ParticleError::NonBinaryVoxel {
                pos: (1, 0, 1),
                value: 7
            }
        );

        let v = BinaryVolume::from_mask(data, Calibration::default()).unwrap();
        assert_eq!(v[(1, 0, 1)], FOREGROUND);
        assert_eq!(v.count(Phase::Foreground), 1);
        assert_eq!(v.count(Phase::Background), 7);
    }

    #[test]
    fn test_volume_rejects_empty() {
        let data = Array3::<u8>::zeros((3, 0, 2));
        assert_eq!(
            BinaryVolume::new(data, Calibration::default()).unwrap_err(),
            ParticleError::EmptyVolume((3, 0, 2))
        );
    }

    #[test]
    fn test_volume_accessors() {
        let mut data = Array3::<u8>::zeros((4, 3, 2));
        data[(3, 2, 1)] = FOREGROUND;
        let v = BinaryVolume::new(data, Calibration::default()).unwrap();
        assert_eq!((v.depth(), v.height(), v.width()), (4, 3, 2));
        assert_eq!(v.size(), 24);
        assert!(v.check((3, 2, 1)));
        assert!(!v.check((4, 0, 0)));
        assert_eq!(v.get((9, 9, 9)), None);
        assert!(v.is_phase((3, 2, 1), Phase::Foreground));
        assert!(!v.is_phase((9, 9, 9), Phase::Background));

        let inv = v.inverted();
        assert!(inv.is_phase((3, 2, 1), Phase::Background));
        assert_eq!(inv.count(Phase::Foreground), 23);
    }

    #[test]
    fn test_mask_shape_mismatch() {
        // 4-D 掩膜 (`dim[4] = 2`) 的体素个数是三维形状的两倍.
        let err = mask_from_raw((2, 3, 4), vec![0; 48]).unwrap_err();
        assert_eq!(
            err,
            ParticleError::ShapeMismatch {
                shape: (2, 3, 4),
                len: 48
            }
        );
        assert_eq!(
            err.to_string(),
            "volume header shape (2, 3, 4) does not match 48 voxels"
        );

        let mask = mask_from_raw((2, 3, 4), (0..24).collect()).unwrap();
        assert_eq!(mask[(1, 2, 3)], 23);
    }
}
