//! Class label tables.
//!
//! A label file holds one class name per line; line `n` (0-based) names class id `n`.

use anyhow::{anyhow, Context, Result};
use std::path::Path;

/// Label the person filter keys on.
pub const PERSON_LABEL: &str = "person";

const COCO_LABELS: [&str; 80] = [
    "person", "bicycle", "car", "motorbike", "aeroplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "sofa", "pottedplant",
    "bed", "diningtable", "toilet", "tvmonitor", "laptop", "mouse", "remote", "keyboard",
    "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase",
    "scissors", "teddy bear", "hair drier", "toothbrush",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelTable {
    names: Vec<String>,
}

impl LabelTable {
    /// The 80 COCO class names, in darknet order.
    pub fn coco() -> Self {
        Self {
            names: COCO_LABELS.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read label file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid label file {}", path.display()))
    }

    /// Parse newline-separated names. Trailing blank lines are ignored.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut names: Vec<String> = raw.lines().map(|line| line.trim().to_string()).collect();
        while names.last().is_some_and(|name| name.is_empty()) {
            names.pop();
        }
        if names.is_empty() {
            return Err(anyhow!("label table is empty"));
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, class_id: u32) -> Option<&str> {
        self.names.get(class_id as usize).map(String::as_str)
    }

    pub fn class_id(&self, name: &str) -> Option<u32> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .map(|idx| idx as u32)
    }

    /// Class id the table maps to "person". Resolved once at startup.
    pub fn person_class_id(&self) -> Result<u32> {
        self.class_id(PERSON_LABEL)
            .ok_or_else(|| anyhow!("label table has no '{}' entry", PERSON_LABEL))
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::coco()
    }
}
