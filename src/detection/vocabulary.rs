// src/detection/vocabulary.rs

/// COCO class ids relevant to road traffic.
const COCO_TRAFFIC_CLASSES: [(u32, &str); 8] = [
    (0, "person"),
    (1, "bicycle"),
    (2, "car"),
    (3, "motorcycle"),
    (4, "airplane"),
    (5, "bus"),
    (6, "train"),
    (7, "truck"),
];

pub fn label_for_class_id(class_id: u32) -> Option<&'static str> {
    COCO_TRAFFIC_CLASSES
        .iter()
        .find(|(id, _)| *id == class_id)
        .map(|(_, name)| *name)
}
