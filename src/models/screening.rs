use serde::{Deserialize, Serialize};

use super::enums::{LesionClass, ScreeningModel};

/// Decoded outcome of one lesion classification request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub lesion_class: LesionClass,
    /// Probability of `lesion_class`, in `[0, 1]`.
    pub confidence: f64,
    pub model_used: ScreeningModel,
    /// Grad-CAM overlay as JPEG bytes.
    #[serde(skip)]
    pub visualization_jpeg: Vec<u8>,
}

impl ScreeningResult {
    pub fn needs_expedited_follow_up(&self) -> bool {
        self.lesion_class.is_malignant()
    }
}
