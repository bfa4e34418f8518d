//! User-authored metadata attached to a piece of content.
//!
//! Annotations are keyed by fingerprint, not by path, so they follow a file
//! through renames and moves. Every path the content has been seen at is kept
//! in [`Annotation::paths`].

use crate::error::ErrorKind;
use crate::reconcile::Tracked;
use reel_store::Patch;
use serde::{Deserialize, Serialize};

/// Clockwise quarter-turn rotation, stored as its number of degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = ErrorKind;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            other => Err(ErrorKind::InvalidRotation(other)),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// The default metadata record.
///
/// Missing fields deserialize to their defaults, which are also the values a
/// record starts from when it is first patched: no likes, not a favorite, no
/// rotation, no screenshot rotation, no tags and no known paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotation {
    pub like_count: u32,
    pub is_favorite: bool,
    pub rotation: Rotation,
    /// Rotation applied to exported screenshots; `None` follows [`rotation`](Self::rotation).
    pub screenshot_rotation: Option<Rotation>,
    /// Tag identifiers.
    pub tags: Vec<u64>,
    /// Every path this content has been observed at, oldest first.
    pub paths: Vec<String>,
}

impl Annotation {
    /// Whether the record holds anything a user would be upset to lose.
    ///
    /// Valuable records survive their file disappearing from the library.
    pub fn is_valuable(&self) -> bool {
        self.like_count > 0
            || self.is_favorite
            || !self.tags.is_empty()
            || self.rotation != Rotation::Deg0
            || self.screenshot_rotation.is_some_and(|r| r != Rotation::Deg0)
    }
}

impl Tracked for Annotation {
    fn paths(&self) -> &[String] {
        &self.paths
    }

    fn add_path(&mut self, path: String) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    fn is_valuable(&self) -> bool {
        Annotation::is_valuable(self)
    }
}

/// A partial update to an [`Annotation`]; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationPatch {
    pub like_count: Option<u32>,
    pub is_favorite: Option<bool>,
    pub rotation: Option<Rotation>,
    /// `Some(None)` resets the screenshot rotation.
    pub screenshot_rotation: Option<Option<Rotation>>,
    /// Replaces the whole tag list.
    pub tags: Option<Vec<u64>>,
    /// Paths to record in addition to the ones already known.
    pub add_paths: Vec<String>,
}

impl AnnotationPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Patch<Annotation> for AnnotationPatch {
    fn apply(self, target: &mut Annotation) {
        if let Some(like_count) = self.like_count {
            target.like_count = like_count;
        }
        if let Some(is_favorite) = self.is_favorite {
            target.is_favorite = is_favorite;
        }
        if let Some(rotation) = self.rotation {
            target.rotation = rotation;
        }
        if let Some(screenshot_rotation) = self.screenshot_rotation {
            target.screenshot_rotation = screenshot_rotation;
        }
        if let Some(tags) = self.tags {
            target.tags = tags;
        }
        for path in self.add_paths {
            target.add_path(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_serialize() {
        let json = serde_json::to_value(Annotation::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "like_count": 0,
                "is_favorite": false,
                "rotation": 0,
                "screenshot_rotation": null,
                "tags": [],
                "paths": []
            })
        );
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let annotation: Annotation = serde_json::from_str(r#"{"is_favorite": true, "rotation": 90}"#).unwrap();
        assert_eq!(
            annotation,
            Annotation { is_favorite: true, rotation: Rotation::Deg90, ..Default::default() }
        );
    }

    #[rstest]
    #[case(0, Some(Rotation::Deg0))]
    #[case(90, Some(Rotation::Deg90))]
    #[case(180, Some(Rotation::Deg180))]
    #[case(270, Some(Rotation::Deg270))]
    #[case(45, None)]
    #[case(360, None)]
    fn test_rotation_from_degrees(#[case] degrees: u16, #[case] expected: Option<Rotation>) {
        assert_eq!(Rotation::try_from(degrees).ok(), expected);
        let parsed = serde_json::from_str::<Rotation>(&degrees.to_string()).ok();
        assert_eq!(parsed, expected);
    }

    #[rstest]
    #[case(Annotation::default(), false)]
    #[case(Annotation { paths: vec!["/a.mp4".into()], ..Default::default() }, false)]
    #[case(Annotation { screenshot_rotation: Some(Rotation::Deg0), ..Default::default() }, false)]
    #[case(Annotation { like_count: 1, ..Default::default() }, true)]
    #[case(Annotation { is_favorite: true, ..Default::default() }, true)]
    #[case(Annotation { tags: vec![7], ..Default::default() }, true)]
    #[case(Annotation { rotation: Rotation::Deg270, ..Default::default() }, true)]
    #[case(Annotation { screenshot_rotation: Some(Rotation::Deg90), ..Default::default() }, true)]
    fn test_is_valuable(#[case] annotation: Annotation, #[case] expected: bool) {
        assert_eq!(annotation.is_valuable(), expected);
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut annotation = Annotation {
            like_count: 3,
            tags: vec![1, 2],
            paths: vec!["/a/old.mp4".into()],
            ..Default::default()
        };
        let patch = AnnotationPatch {
            is_favorite: Some(true),
            screenshot_rotation: Some(Some(Rotation::Deg180)),
            add_paths: vec!["/a/old.mp4".into(), "/a/new.mp4".into()],
            ..Default::default()
        };
        assert!(!patch.is_empty());
        patch.apply(&mut annotation);
        assert_eq!(
            annotation,
            Annotation {
                like_count: 3,
                is_favorite: true,
                rotation: Rotation::Deg0,
                screenshot_rotation: Some(Rotation::Deg180),
                tags: vec![1, 2],
                paths: vec!["/a/old.mp4".into(), "/a/new.mp4".into()],
            }
        );

        AnnotationPatch { screenshot_rotation: Some(None), tags: Some(vec![]), ..Default::default() }
            .apply(&mut annotation);
        assert_eq!(annotation.screenshot_rotation, None);
        assert!(annotation.tags.is_empty());
        assert!(AnnotationPatch::default().is_empty());
    }
}
