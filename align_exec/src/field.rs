//! # Field layout
//!
//! The field layout gives the surveyed pose of every fiducial landmark on the field. It is loaded
//! once at startup from a JSON file in the params directory and is read only from then on.
//!
//! The file uses the common FRC layout format, where each tag has a 3D translation and a
//! quaternion rotation. Only the planar part of each pose is kept.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::{Quaternion, UnitQuaternion};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Internal
use comms_if::geom::Pose2D;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A fixed fiducial marker on the field.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Landmark {
    pub id: u32,

    /// Pose of the marker in the field frame, with the heading pointing out of the marker's face.
    pub field_pose: Pose2D,
}

/// The set of landmarks on the field, keyed by ID.
#[derive(Debug, Clone, Default)]
pub struct FieldLayout {
    landmarks: BTreeMap<u32, Landmark>,

    /// Units: meters
    pub length_m: f64,

    /// Units: meters
    pub width_m: f64,
}

#[derive(Deserialize)]
struct LayoutFile {
    tags: Vec<TagEntry>,
    field: FieldSize,
}

#[derive(Deserialize)]
struct TagEntry {
    #[serde(rename = "ID")]
    id: u32,
    pose: TagPose,
}

#[derive(Deserialize)]
struct TagPose {
    translation: Translation,
    rotation: Rotation,
}

#[derive(Deserialize)]
struct Translation {
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
struct Rotation {
    quaternion: QuaternionEntry,
}

#[derive(Deserialize)]
#[serde(rename_all = "UPPERCASE")]
struct QuaternionEntry {
    w: f64,
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Deserialize)]
struct FieldSize {
    length: f64,
    width: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The alliance the vehicle is playing for, which decides the landmarks it aligns to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alliance {
    Blue,
    Red,
}

/// Errors which can occur while loading the field layout.
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("Could not find the layout file: {0}")]
    PathError(util::params::LoadError),

    #[error("Could not read the layout file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Could not parse the layout file: {0}")]
    ParseError(serde_json::Error),

    #[error("Landmark {0} appears more than once in the layout")]
    DuplicateId(u32),

    #[error("Landmark {0} has a non-finite pose")]
    InvalidPose(u32),

    #[error("Invalid field dimensions {0} x {1} m")]
    InvalidSize(f64, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl std::str::FromStr for Alliance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blue" => Ok(Alliance::Blue),
            "red" => Ok(Alliance::Red),
            _ => Err(format!("Unknown alliance \"{}\", expected blue or red", s)),
        }
    }
}

impl FieldLayout {
    /// Build a layout from a set of landmarks.
    pub fn new<I>(landmarks: I, length_m: f64, width_m: f64) -> Result<Self, FieldError>
    where
        I: IntoIterator<Item = Landmark>,
    {
        if !(length_m.is_finite() && width_m.is_finite() && length_m > 0.0 && width_m > 0.0) {
            return Err(FieldError::InvalidSize(length_m, width_m));
        }

        let mut map = BTreeMap::new();
        for landmark in landmarks {
            let pose = &landmark.field_pose;
            if !(pose.x().is_finite() && pose.y().is_finite() && pose.heading_rad.is_finite()) {
                return Err(FieldError::InvalidPose(landmark.id));
            }

            if map.insert(landmark.id, landmark).is_some() {
                return Err(FieldError::DuplicateId(landmark.id));
            }
        }

        Ok(Self {
            landmarks: map,
            length_m,
            width_m,
        })
    }

    /// Load the layout from a file relative to the params directory.
    pub fn load(layout_file: &str) -> Result<Self, FieldError> {
        let path = util::params::params_path(layout_file).map_err(FieldError::PathError)?;
        let json_str = std::fs::read_to_string(&path).map_err(FieldError::FileLoadError)?;

        let layout = Self::from_json_str(&json_str)?;

        debug!(
            "Loaded {} landmarks from {:?}",
            layout.landmarks.len(),
            path
        );

        Ok(layout)
    }

    /// Parse a layout from its JSON representation.
    pub fn from_json_str(json_str: &str) -> Result<Self, FieldError> {
        let file: LayoutFile = serde_json::from_str(json_str).map_err(FieldError::ParseError)?;

        let landmarks = file.tags.iter().map(|tag| {
            let q = &tag.pose.rotation.quaternion;
            let rot = UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z));
            let (_, _, yaw) = rot.euler_angles();

            Landmark {
                id: tag.id,
                field_pose: Pose2D::new(tag.pose.translation.x, tag.pose.translation.y, yaw),
            }
        });

        Self::new(landmarks, file.field.length, file.field.width)
    }

    /// Get a landmark by its ID.
    pub fn landmark(&self, id: u32) -> Option<&Landmark> {
        self.landmarks.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.landmarks.contains_key(&id)
    }

    /// Iterate over the landmarks in ascending ID order.
    pub fn landmarks(&self) -> impl Iterator<Item = &Landmark> {
        self.landmarks.values()
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Mirror a pose onto the other alliance's half of the field.
    ///
    /// The field is rotationally symmetric about its centre, so mirroring is a half turn about
    /// the centre point.
    pub fn mirror(&self, pose: &Pose2D) -> Pose2D {
        Pose2D::new(
            self.length_m - pose.x(),
            self.width_m - pose.y(),
            pose.heading_rad + std::f64::consts::PI,
        )
    }
}
