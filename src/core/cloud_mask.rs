use crate::types::{ClassImage, PipelineError, PipelineResult, RealImage, NO_DATA};
use ndarray::Zip;
use serde::{Deserialize, Serialize};

/// Sentinel-2 L2A scene classification codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SceneClass {
    NoData = 0,
    SaturatedOrDefective = 1,
    DarkArea = 2,
    CloudShadow = 3,
    Vegetation = 4,
    NotVegetated = 5,
    Water = 6,
    Unclassified = 7,
    CloudMediumProbability = 8,
    CloudHighProbability = 9,
    ThinCirrus = 10,
    SnowIce = 11,
}

impl SceneClass {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        use SceneClass::*;
        Some(match code {
            0 => NoData,
            1 => SaturatedOrDefective,
            2 => DarkArea,
            3 => CloudShadow,
            4 => Vegetation,
            5 => NotVegetated,
            6 => Water,
            7 => Unclassified,
            8 => CloudMediumProbability,
            9 => CloudHighProbability,
            10 => ThinCirrus,
            11 => SnowIce,
            _ => return None,
        })
    }
}

/// Which classification codes invalidate an index pixel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudMaskParams {
    pub excluded_classes: Vec<u8>,
}

impl Default for CloudMaskParams {
    fn default() -> Self {
        Self {
            excluded_classes: vec![
                SceneClass::CloudShadow.code(),
                SceneClass::CloudMediumProbability.code(),
                SceneClass::CloudHighProbability.code(),
                SceneClass::ThinCirrus.code(),
                SceneClass::SnowIce.code(),
            ],
        }
    }
}

impl CloudMaskParams {
    pub fn is_excluded(&self, code: u8) -> bool {
        self.excluded_classes.contains(&code)
    }
}

/// Cast a classification window read as floats to class codes; no-data -> 0
pub fn to_class_codes(raw: &RealImage) -> ClassImage {
    raw.mapv(|v| if v.is_finite() && v >= 0.0 && v <= 255.0 { v as u8 } else { 0 })
}

/// Copy of `index` with excluded-class positions set to no-data.
///
/// `classes` must already be on the index grid.
pub fn apply_cloud_mask(
    index: &RealImage,
    classes: &ClassImage,
    params: &CloudMaskParams,
) -> PipelineResult<(RealImage, usize)> {
    if index.dim() != classes.dim() {
        return Err(PipelineError::Processing(format!(
            "classification grid {:?} does not match index grid {:?}",
            classes.dim(),
            index.dim()
        )));
    }

    // 256-entry lookup instead of a set probe per pixel
    let mut excluded = [false; 256];
    for &code in &params.excluded_classes {
        excluded[code as usize] = true;
    }

    let mut masked_count = 0usize;
    let masked = Zip::from(index).and(classes).map_collect(|&v, &c| {
        if excluded[c as usize] {
            masked_count += 1;
            NO_DATA
        } else {
            v
        }
    });

    Ok((masked, masked_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_default_excluded_codes() {
        let params = CloudMaskParams::default();
        assert_eq!(params.excluded_classes, vec![3, 8, 9, 10, 11]);
        assert!(params.is_excluded(9));
        assert!(!params.is_excluded(4));
    }

    #[test]
    fn test_fully_cloudy_is_all_nodata() {
        let index = Array2::from_elem((4, 4), 0.5f32);
        let classes = Array2::from_elem((4, 4), SceneClass::CloudHighProbability.code());
        let (masked, count) = apply_cloud_mask(&index, &classes, &CloudMaskParams::default()).unwrap();
        assert!(masked.iter().all(|v| v.is_nan()));
        assert_eq!(count, 16);
    }

    #[test]
    fn test_clear_scene_is_unchanged() {
        let index = array![[0.1f32, -0.3], [0.9, 0.0]];
        let classes = Array2::from_elem((2, 2), SceneClass::Vegetation.code());
        let (masked, count) = apply_cloud_mask(&index, &classes, &CloudMaskParams::default()).unwrap();
        assert_eq!(masked, index);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_class_code_conversion() {
        let raw = array![[4.0f32, f32::NAN], [11.0, 300.0]];
        assert_eq!(to_class_codes(&raw), array![[4u8, 0], [11, 0]]);
        assert_eq!(SceneClass::from_code(10), Some(SceneClass::ThinCirrus));
        assert_eq!(SceneClass::from_code(42), None);
    }
}
