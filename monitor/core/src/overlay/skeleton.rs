//! Keypoint topology
//!
//! COCO keypoint names and the pairs connected when drawing a skeleton.

/// Keypoint pairs joined by a line, when both ends are present
pub const SKELETON_EDGES: [(&str, &str); 16] = [
    // torso
    ("left_shoulder", "right_shoulder"),
    ("left_shoulder", "left_hip"),
    ("right_shoulder", "right_hip"),
    ("left_hip", "right_hip"),
    // arms
    ("left_shoulder", "left_elbow"),
    ("right_shoulder", "right_elbow"),
    ("left_elbow", "left_wrist"),
    ("right_elbow", "right_wrist"),
    // legs
    ("left_hip", "left_knee"),
    ("left_knee", "left_ankle"),
    ("right_hip", "right_knee"),
    ("right_knee", "right_ankle"),
    // face
    ("nose", "left_eye"),
    ("nose", "right_eye"),
    ("left_eye", "left_ear"),
    ("right_eye", "right_ear"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_edges_are_unique_and_cover_coco_names() {
        let unique: HashSet<_> = SKELETON_EDGES.iter().collect();
        assert_eq!(unique.len(), SKELETON_EDGES.len());

        let names: HashSet<&str> = SKELETON_EDGES.iter().flat_map(|(a, b)| [*a, *b]).collect();
        assert_eq!(names.len(), 17);
    }
}
