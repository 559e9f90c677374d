//! # Goal module
//!
//! Goals are the poses the vehicle aligns onto. Each goal is derived from one landmark: it sits a
//! fixed distance out in front of the landmark's face, optionally shifted to the left or right,
//! and faces back towards the landmark. The full set of goals is built once from the field layout
//! and cached in a [`GoalCatalog`], which can then be searched for the goal nearest the vehicle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;
use serde::{Deserialize, Serialize};

// Internal
pub use params::Params;
use crate::field::{Alliance, FieldLayout, Landmark};
use comms_if::geom::Pose2D;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A target pose derived from a landmark.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct GoalPose {
    /// The landmark this goal was derived from.
    pub landmark_id: u32,

    pub variant: GoalVariant,

    pub pose: Pose2D,
}

/// All goals available during a match, in a fixed order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalCatalog {
    goals: Vec<GoalPose>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Position of a goal across the face of its landmark, from the point of view of the vehicle
/// once it is aligned.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalVariant {
    Left,
    Right,
    Center,
}

/// The result of searching the catalog.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Selection {
    /// The nearest goal.
    Goal(GoalPose),

    /// No goals were available. Contains the pose the search was made from.
    NoTargets(Pose2D),
}

/// Errors which can occur while building the catalog.
#[derive(Debug, thiserror::Error)]
pub enum GoalError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Landmark {0} is not in the field layout")]
    UnknownLandmark(u32),

    #[error("Goal offsets must be finite")]
    InvalidOffsets,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GoalVariant {
    /// Direction of the lateral offset, positive to the vehicle's left.
    fn lateral_sign(&self) -> f64 {
        match self {
            GoalVariant::Left => 1.0,
            GoalVariant::Right => -1.0,
            GoalVariant::Center => 0.0,
        }
    }
}

impl std::str::FromStr for GoalVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "left" => Ok(GoalVariant::Left),
            "right" => Ok(GoalVariant::Right),
            "center" | "centre" => Ok(GoalVariant::Center),
            _ => Err(format!("Unknown goal variant \"{}\"", s)),
        }
    }
}

impl GoalPose {
    /// Derive the goal of the given variant from a landmark.
    pub fn from_landmark(landmark: &Landmark, variant: GoalVariant, params: &Params) -> Self {
        // Step out from the landmark face and turn around, then shift sideways along the
        // vehicle's own left
        let pose = landmark
            .field_pose
            .offset(params.backward_offset_m, 0.0, params.heading_offset_rad)
            .offset(0.0, variant.lateral_sign() * params.lateral_offset_m, 0.0);

        Self {
            landmark_id: landmark.id,
            variant,
            pose,
        }
    }
}

impl GoalCatalog {
    /// Build the catalog for the given landmarks.
    ///
    /// Goals are ordered by landmark (in the order given) then by variant (in the order of the
    /// parameters).
    pub fn build(
        layout: &FieldLayout,
        landmark_ids: &[u32],
        params: &Params,
    ) -> Result<Self, GoalError> {
        params.validate()?;

        let mut goals = Vec::with_capacity(landmark_ids.len() * params.variants.len());

        for id in landmark_ids {
            let landmark = layout.landmark(*id).ok_or(GoalError::UnknownLandmark(*id))?;

            for variant in params.variants.iter() {
                goals.push(GoalPose::from_landmark(landmark, *variant, params));
            }
        }

        Ok(Self { goals })
    }

    /// Build the catalog for the landmarks of the given alliance.
    pub fn for_alliance(
        layout: &FieldLayout,
        params: &Params,
        alliance: Alliance,
    ) -> Result<Self, GoalError> {
        let catalog = Self::build(layout, params.landmark_ids(alliance), params)?;

        info!(
            "Built {:?} goal catalog with {} goals",
            alliance,
            catalog.len()
        );

        Ok(catalog)
    }

    pub fn goals(&self) -> &[GoalPose] {
        &self.goals
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    /// Find the goal whose position is nearest the given pose. Heading is not considered.
    ///
    /// If `variant` is given only goals of that variant are considered. When several goals are
    /// equally near the first one in the catalog is chosen.
    pub fn select_nearest(&self, pose: &Pose2D, variant: Option<GoalVariant>) -> Selection {
        let mut nearest: Option<(f64, &GoalPose)> = None;

        let candidates = self
            .goals
            .iter()
            .filter(|g| variant.map_or(true, |v| g.variant == v));

        for goal in candidates {
            let dist_m = pose.distance_to(&goal.pose);

            // Strict comparison keeps the first of any equal distances
            let is_nearer = match nearest {
                Some((best_m, _)) => dist_m < best_m,
                None => true,
            };

            if is_nearer {
                nearest = Some((dist_m, goal));
            }
        }

        match nearest {
            Some((_, goal)) => Selection::Goal(*goal),
            None => Selection::NoTargets(*pose),
        }
    }
}

impl Selection {
    /// The pose to align onto. With no targets this is the pose the search was made from.
    pub fn pose(&self) -> Pose2D {
        match self {
            Selection::Goal(g) => g.pose,
            Selection::NoTargets(p) => *p,
        }
    }

    pub fn goal(&self) -> Option<&GoalPose> {
        match self {
            Selection::Goal(g) => Some(g),
            Selection::NoTargets(_) => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn landmark(id: u32, x: f64, y: f64, heading_deg: f64) -> Landmark {
        Landmark {
            id,
            field_pose: Pose2D::from_degrees(x, y, heading_deg),
        }
    }

    fn hexagon() -> FieldLayout {
        // A hexagon of landmarks around (4.5, 4), all facing outwards
        let landmarks = (0..6u32).map(|i| {
            let angle_deg = 60.0 * i as f64;
            let (s, c) = angle_deg.to_radians().sin_cos();
            landmark(17 + i, 4.5 + 0.8 * c, 4.0 + 0.8 * s, angle_deg)
        });

        FieldLayout::new(landmarks, 17.548, 8.052).unwrap()
    }

    #[test]
    fn test_goal_geometry() {
        let tag = landmark(1, 5.0, 4.0, 0.0);
        let params = Params::default();

        let left = GoalPose::from_landmark(&tag, GoalVariant::Left, &params);
        let right = GoalPose::from_landmark(&tag, GoalVariant::Right, &params);
        let centre = GoalPose::from_landmark(&tag, GoalVariant::Center, &params);

        // In front of the landmark, facing it
        assert!((centre.pose.x() - 5.395).abs() < 1e-12);
        assert!((centre.pose.y() - 4.0).abs() < 1e-12);
        assert!((centre.pose.heading_rad.abs() - std::f64::consts::PI).abs() < 1e-12);

        // Facing -X the vehicle's left is -Y
        assert!((left.pose.y() - 3.835).abs() < 1e-12);
        assert!((right.pose.y() - 4.165).abs() < 1e-12);
        assert!((left.pose.x() - 5.395).abs() < 1e-12);
    }

    #[test]
    fn test_catalog_size_and_order() {
        let layout = hexagon();
        let ids: Vec<u32> = (17..23).collect();

        let catalog = GoalCatalog::build(&layout, &ids, &Params::default()).unwrap();

        assert_eq!(catalog.len(), 12);
        assert_eq!(catalog.goals()[0].landmark_id, 17);
        assert_eq!(catalog.goals()[0].variant, GoalVariant::Left);
        assert_eq!(catalog.goals()[1].variant, GoalVariant::Right);
        assert_eq!(catalog.goals()[11].landmark_id, 22);

        // Building again gives the same catalog
        let again = GoalCatalog::build(&layout, &ids, &Params::default()).unwrap();
        assert_eq!(catalog, again);
    }

    #[test]
    fn test_alliance_catalog() {
        let layout = hexagon();
        let mut params = Params::default();
        params.red_landmark_ids = vec![19, 20];

        let red = GoalCatalog::for_alliance(&layout, &params, Alliance::Red).unwrap();
        assert_eq!(red.len(), 4);

        // The default red landmarks aren't in this layout
        assert!(matches!(
            GoalCatalog::for_alliance(&layout, &Params::default(), Alliance::Red),
            Err(GoalError::UnknownLandmark(6))
        ));
    }

    #[test]
    fn test_select_nearest() {
        let layout = hexagon();
        let ids: Vec<u32> = (17..23).collect();
        let catalog = GoalCatalog::build(&layout, &ids, &Params::default()).unwrap();

        // Well out along +X, so the goals of landmark 17 are nearest
        let pose = Pose2D::new(7.0, 4.0, 1.0);
        let selection = catalog.select_nearest(&pose, None);
        let goal = selection.goal().unwrap();
        assert_eq!(goal.landmark_id, 17);

        // Same answer when asked again
        assert_eq!(catalog.select_nearest(&pose, None), selection);

        // Filtering by variant
        let right = catalog.select_nearest(&pose, Some(GoalVariant::Right));
        assert_eq!(right.goal().unwrap().variant, GoalVariant::Right);
        assert_eq!(right.goal().unwrap().landmark_id, 17);
    }

    #[test]
    fn test_tie_takes_first() {
        let layout = FieldLayout::new(
            vec![landmark(1, 0.0, 2.0, 90.0), landmark(2, 0.0, -2.0, -90.0)],
            10.0,
            10.0,
        )
        .unwrap();
        let mut params = Params::default();
        params.variants = vec![GoalVariant::Center];

        // Both goals are the same distance from the origin
        let catalog = GoalCatalog::build(&layout, &[2, 1], &params).unwrap();
        let selection = catalog.select_nearest(&Pose2D::default(), None);

        assert_eq!(selection.goal().unwrap().landmark_id, 2);
    }

    #[test]
    fn test_no_targets() {
        let pose = Pose2D::new(1.0, 2.0, 3.0);

        let selection = GoalCatalog::default().select_nearest(&pose, None);
        assert_eq!(selection, Selection::NoTargets(pose));
        assert_eq!(selection.pose(), pose);

        // A filter which matches nothing
        let catalog = GoalCatalog::build(&hexagon(), &[17], &Params::default()).unwrap();
        let selection = catalog.select_nearest(&pose, Some(GoalVariant::Center));
        assert_eq!(selection, Selection::NoTargets(pose));
    }

    #[test]
    fn test_parse_variant() {
        assert_eq!("Left".parse::<GoalVariant>(), Ok(GoalVariant::Left));
        assert_eq!("centre".parse::<GoalVariant>(), Ok(GoalVariant::Center));
        assert!("up".parse::<GoalVariant>().is_err());
    }
}
