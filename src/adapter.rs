//! Face-mesh landmark adapter
//!
//! Converts a face-mesh landmark frame (468 face points plus 10 refined iris
//! points) into the tracking sample consumed by the question tracker, and
//! rates the lighting of raw camera frames.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::GameError;
use crate::types::{Point, TrackingQuality, TrackingSample};

/// Right eye contour indices (corner, upper, upper, corner, lower, lower, ...)
const RIGHT_EYE: [usize; 8] = [33, 133, 160, 159, 158, 144, 145, 153];

/// Left eye contour indices
const LEFT_EYE: [usize; 8] = [362, 263, 387, 386, 385, 380, 374, 373];

/// Right iris indices; the first is the iris center
const RIGHT_IRIS: [usize; 4] = [469, 470, 471, 472];

/// Left iris indices; the first is the iris center
const LEFT_IRIS: [usize; 4] = [474, 475, 476, 477];

/// Landmarks in a refined face mesh
pub const FACE_MESH_LANDMARKS: usize = 478;

/// Eye aspect ratio under which the eyes count as closed
const EAR_BLINK_THRESHOLD: f64 = 0.2;

/// Normalized gaze offset beyond which the player is looking away
const LOOK_AWAY_THRESHOLD: f64 = 0.7;

/// Scale from mean iris depth to lost confidence points
const DEPTH_CONFIDENCE_SCALE: f64 = 1000.0;

/// Perceived luminance weights for red, green and blue
const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// A single normalized face-mesh landmark
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// One frame of face-mesh output; `face` is None when no face was found
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub face: Option<Vec<Landmark>>,
}

/// Parse a landmark frame from JSON
pub fn parse_frame(json: &str) -> Result<LandmarkFrame, GameError> {
    serde_json::from_str(json).map_err(GameError::Json)
}

/// Convert a landmark frame into a tracking sample
///
/// Frames without a face, or with a truncated mesh, become no-face samples.
pub fn frame_to_sample(frame: &LandmarkFrame) -> TrackingSample {
    let Some(landmarks) = frame.face.as_deref() else {
        return TrackingSample::no_face();
    };
    if landmarks.len() < FACE_MESH_LANDMARKS {
        warn!(
            landmarks = landmarks.len(),
            expected = FACE_MESH_LANDMARKS,
            "truncated face mesh treated as no face"
        );
        return TrackingSample::no_face();
    }

    let left_iris = landmarks[LEFT_IRIS[0]].point();
    let right_iris = landmarks[RIGHT_IRIS[0]].point();

    let left_ear = eye_aspect_ratio(&LEFT_EYE.map(|i| landmarks[i].point()));
    let right_ear = eye_aspect_ratio(&RIGHT_EYE.map(|i| landmarks[i].point()));
    let is_blinking = (left_ear + right_ear) / 2.0 < EAR_BLINK_THRESHOLD;

    let gaze = Point::new(
        ((left_iris.x + right_iris.x) / 2.0 - 0.5) * 2.0,
        ((left_iris.y + right_iris.y) / 2.0 - 0.5) * 2.0,
    );
    let is_looking_away = gaze.x.abs() > LOOK_AWAY_THRESHOLD || gaze.y.abs() > LOOK_AWAY_THRESHOLD;

    let confidence = tracking_confidence(&LEFT_IRIS.map(|i| landmarks[i]));

    TrackingSample {
        left_iris: Some(left_iris),
        right_iris: Some(right_iris),
        gaze: Some(gaze),
        is_blinking,
        is_looking_away,
        tracking_quality: quality_from_confidence(confidence),
    }
}

/// Eye aspect ratio: `(|p1 - p5| + |p2 - p4|) / (2 * |p0 - p3|)`
pub fn eye_aspect_ratio(eye: &[Point]) -> f64 {
    if eye.len() < 6 {
        return 0.0;
    }
    let vertical_a = eye[1].distance(&eye[5]);
    let vertical_b = eye[2].distance(&eye[4]);
    let horizontal = eye[0].distance(&eye[3]);
    if horizontal == 0.0 {
        return 0.0;
    }
    (vertical_a + vertical_b) / (2.0 * horizontal)
}

/// Confidence (0-100) from the depth spread of the iris landmarks
pub fn tracking_confidence(iris: &[Landmark]) -> f64 {
    if iris.is_empty() {
        return 0.0;
    }
    let mean_depth = iris.iter().map(|l| l.z.abs()).sum::<f64>() / iris.len() as f64;
    (100.0 - mean_depth * DEPTH_CONFIDENCE_SCALE).clamp(0.0, 100.0)
}

pub fn quality_from_confidence(confidence: f64) -> TrackingQuality {
    if confidence >= 80.0 {
        TrackingQuality::Excellent
    } else if confidence >= 60.0 {
        TrackingQuality::Good
    } else if confidence >= 40.0 {
        TrackingQuality::Fair
    } else {
        TrackingQuality::Poor
    }
}

/// Lighting check over one camera frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrightnessReading {
    /// Mean perceived luminance, 0-100
    pub brightness: f64,
    /// Brightness reaches the configured minimum
    pub is_acceptable: bool,
    pub quality: TrackingQuality,
}

/// Rate the brightness of an RGBA frame buffer
///
/// A trailing partial pixel is ignored; an empty buffer reads as black.
pub fn frame_brightness(rgba: &[u8], min_acceptable: f64) -> BrightnessReading {
    let pixels = rgba.chunks_exact(4);
    let count = pixels.len();
    let mean_luma = if count == 0 {
        0.0
    } else {
        pixels
            .map(|px| {
                LUMA_WEIGHTS[0] * px[0] as f64
                    + LUMA_WEIGHTS[1] * px[1] as f64
                    + LUMA_WEIGHTS[2] * px[2] as f64
            })
            .sum::<f64>()
            / count as f64
    };
    brightness_reading((mean_luma / 255.0 * 100.0).round(), min_acceptable)
}

/// Classify a normalized brightness (0-100)
pub fn brightness_reading(brightness: f64, min_acceptable: f64) -> BrightnessReading {
    let quality = if brightness >= 60.0 {
        TrackingQuality::Excellent
    } else if brightness >= 45.0 {
        TrackingQuality::Good
    } else if brightness >= 30.0 {
        TrackingQuality::Fair
    } else {
        TrackingQuality::Poor
    };
    BrightnessReading {
        brightness,
        is_acceptable: brightness >= min_acceptable,
        quality,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A mesh with open eyes looking at `(iris_x, iris_y)` and iris depth `z`
    fn make_mesh(iris_x: f64, iris_y: f64, eye_opening: f64, z: f64) -> Vec<Landmark> {
        let mut mesh = vec![Landmark::default(); FACE_MESH_LANDMARKS];

        for (eye, center_x) in [(LEFT_EYE, 0.6), (RIGHT_EYE, 0.4)] {
            // Corners 0.1 apart, lids `eye_opening` apart
            mesh[eye[0]] = Landmark { x: center_x - 0.05, y: 0.5, z: 0.0 };
            mesh[eye[3]] = Landmark { x: center_x + 0.05, y: 0.5, z: 0.0 };
            mesh[eye[1]] = Landmark { x: center_x - 0.02, y: 0.5 - eye_opening / 2.0, z: 0.0 };
            mesh[eye[5]] = Landmark { x: center_x - 0.02, y: 0.5 + eye_opening / 2.0, z: 0.0 };
            mesh[eye[2]] = Landmark { x: center_x + 0.02, y: 0.5 - eye_opening / 2.0, z: 0.0 };
            mesh[eye[4]] = Landmark { x: center_x + 0.02, y: 0.5 + eye_opening / 2.0, z: 0.0 };
        }
        for i in LEFT_IRIS {
            mesh[i] = Landmark { x: iris_x + 0.1, y: iris_y, z };
        }
        for i in RIGHT_IRIS {
            mesh[i] = Landmark { x: iris_x - 0.1, y: iris_y, z };
        }
        mesh
    }

    #[test]
    fn test_no_face_frame() {
        let sample = frame_to_sample(&LandmarkFrame { face: None });
        assert_eq!(sample, TrackingSample::no_face());
        assert!(sample.is_looking_away);
    }

    #[test]
    fn test_truncated_mesh_is_no_face() {
        let frame = LandmarkFrame {
            face: Some(vec![Landmark::default(); 468]),
        };
        assert!(!frame_to_sample(&frame).face_detected());
    }

    #[test]
    fn test_forward_gaze_with_open_eyes() {
        let frame = LandmarkFrame {
            face: Some(make_mesh(0.5, 0.5, 0.04, 0.0)),
        };
        let sample = frame_to_sample(&frame);

        assert!(sample.face_detected());
        assert!(!sample.is_blinking);
        assert!(!sample.is_looking_away);
        let gaze = sample.gaze.unwrap();
        assert!(gaze.x.abs() < 1e-9 && gaze.y.abs() < 1e-9);
        assert_eq!(sample.tracking_quality, TrackingQuality::Excellent);
    }

    #[test]
    fn test_closed_eyes_blink() {
        // EAR = (0.01 + 0.01) / (2 * 0.1) = 0.1
        let frame = LandmarkFrame {
            face: Some(make_mesh(0.5, 0.5, 0.01, 0.0)),
        };
        assert!(frame_to_sample(&frame).is_blinking);
    }

    #[test]
    fn test_gaze_far_to_the_side_is_looking_away() {
        let frame = LandmarkFrame {
            face: Some(make_mesh(0.9, 0.5, 0.04, 0.0)),
        };
        let sample = frame_to_sample(&frame);
        assert!((sample.gaze.unwrap().x - 0.8).abs() < 1e-9);
        assert!(sample.is_looking_away);
    }

    #[test]
    fn test_iris_depth_lowers_quality() {
        assert_eq!(
            quality_from_confidence(tracking_confidence(&[Landmark { x: 0.0, y: 0.0, z: 0.03 }])),
            TrackingQuality::Good
        );
        assert_eq!(
            quality_from_confidence(tracking_confidence(&[Landmark { x: 0.0, y: 0.0, z: -0.05 }])),
            TrackingQuality::Fair
        );
        assert_eq!(
            quality_from_confidence(tracking_confidence(&[Landmark { x: 0.0, y: 0.0, z: 0.2 }])),
            TrackingQuality::Poor
        );
    }

    #[test]
    fn test_eye_aspect_ratio_degenerate() {
        assert_eq!(eye_aspect_ratio(&[Point::default(); 3]), 0.0);
        assert_eq!(eye_aspect_ratio(&[Point::default(); 6]), 0.0);
    }

    #[test]
    fn test_parse_frame_without_face() {
        let frame = parse_frame(r#"{ "face": null }"#).unwrap();
        assert!(frame.face.is_none());
        assert!(parse_frame("not json").is_err());
    }

    fn solid_frame(r: u8, g: u8, b: u8, pixels: usize) -> Vec<u8> {
        [r, g, b, 255].repeat(pixels)
    }

    #[test]
    fn test_brightness_tiers() {
        assert_eq!(brightness_reading(60.0, 30.0).quality, TrackingQuality::Excellent);
        assert_eq!(brightness_reading(59.0, 30.0).quality, TrackingQuality::Good);
        assert_eq!(brightness_reading(45.0, 30.0).quality, TrackingQuality::Good);
        assert_eq!(brightness_reading(44.0, 30.0).quality, TrackingQuality::Fair);
        assert_eq!(brightness_reading(30.0, 30.0).quality, TrackingQuality::Fair);
        assert_eq!(brightness_reading(29.0, 30.0).quality, TrackingQuality::Poor);
    }

    #[test]
    fn test_brightness_acceptance_threshold() {
        assert!(brightness_reading(30.0, 30.0).is_acceptable);
        assert!(!brightness_reading(29.0, 30.0).is_acceptable);
        assert!(!brightness_reading(50.0, 55.0).is_acceptable);
    }

    #[test]
    fn test_frame_brightness_extremes() {
        let white = frame_brightness(&solid_frame(255, 255, 255, 16), 30.0);
        assert_eq!(white.brightness, 100.0);
        assert_eq!(white.quality, TrackingQuality::Excellent);

        let black = frame_brightness(&solid_frame(0, 0, 0, 16), 30.0);
        assert_eq!(black.brightness, 0.0);
        assert!(!black.is_acceptable);

        let empty = frame_brightness(&[], 30.0);
        assert_eq!(empty.quality, TrackingQuality::Poor);
    }

    #[test]
    fn test_frame_brightness_uses_luminance_weights() {
        // Pure red: 0.299 * 255 -> 29.9 -> 30
        let red = frame_brightness(&solid_frame(255, 0, 0, 4), 30.0);
        assert_eq!(red.brightness, 30.0);
        assert_eq!(red.quality, TrackingQuality::Fair);
        assert!(red.is_acceptable);

        // Pure blue: 0.114 * 255 -> 11.4 -> 11
        let blue = frame_brightness(&solid_frame(0, 0, 255, 4), 30.0);
        assert_eq!(blue.brightness, 11.0);
        assert_eq!(blue.quality, TrackingQuality::Poor);
    }

    #[test]
    fn test_frame_brightness_averages_pixels() {
        // One white and one black pixel average to 50
        let mut frame = solid_frame(255, 255, 255, 1);
        frame.extend(solid_frame(0, 0, 0, 1));
        // Trailing partial pixel is ignored
        frame.extend([255, 255]);
        let reading = frame_brightness(&frame, 30.0);
        assert_eq!(reading.brightness, 50.0);
        assert_eq!(reading.quality, TrackingQuality::Good);
    }
}
