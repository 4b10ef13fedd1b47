//! Scene descriptions for the tutorial driver.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const SCENE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("unsupported scene version {0} (expected {SCENE_VERSION})")]
    UnsupportedVersion(u32),
    #[error("image size must be non-zero, got {width}x{height}")]
    ZeroSize { width: u32, height: u32 },
    #[error("mesh has no triangles")]
    EmptyMesh,
    #[error("mesh has {colors} colors for {vertices} vertices")]
    ColorCount { colors: usize, vertices: usize },
    #[error("triangle {triangle} references vertex {index} of {vertices}")]
    IndexOutOfRange {
        triangle: usize,
        index: i32,
        vertices: usize,
    },
    #[error("distant light needs a direction")]
    MissingDirection,
    #[error("failed to read scene: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scene: {0}")]
    Json(#[from] serde_json::Error),
}

/// Sections missing from a scene file are taken from [`SceneFile::tutorial`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneFile {
    pub version: u32,
    pub image: ImageSpec,
    pub camera: CameraSpec,
    pub mesh: MeshSpec,
    pub lights: Vec<LightSpec>,
    pub renderer: RendererSpec,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ImageSpec {
    pub width: u32,
    pub height: u32,
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CameraSpec {
    #[serde(rename = "type", default = "default_camera")]
    pub kind: String,
    pub position: [f32; 3],
    pub direction: [f32; 3],
    pub up: [f32; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fovy: Option<f32>,
    /// Orthographic view height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeshSpec {
    pub vertices: Vec<[f32; 3]>,
    #[serde(default)]
    pub colors: Vec<[f32; 4]>,
    pub indices: Vec<[i32; 3]>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LightSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "white")]
    pub color: [f32; 3],
    #[serde(default = "one")]
    pub intensity: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<[f32; 3]>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RendererSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub ao_samples: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ao_distance: Option<f32>,
    pub background: f32,
    pub spp: i32,
    pub shadows: bool,
}

impl Default for RendererSpec {
    fn default() -> Self {
        Self {
            kind: "scivis".to_string(),
            ao_samples: 1,
            ao_distance: None,
            background: 1.0,
            spp: 1,
            shadows: false,
        }
    }
}

fn default_camera() -> String {
    "perspective".to_string()
}

fn white() -> [f32; 3] {
    [1.0; 3]
}

fn one() -> f32 {
    1.0
}

impl SceneFile {
    /// The two-triangle scene of the walkthrough.
    pub fn tutorial() -> Self {
        Self {
            version: SCENE_VERSION,
            image: ImageSpec::default(),
            camera: CameraSpec {
                kind: default_camera(),
                position: [0.0, 0.0, 0.0],
                direction: [0.1, 0.0, 1.0],
                up: [0.0, 1.0, 0.0],
                fovy: None,
                height: None,
            },
            mesh: MeshSpec {
                vertices: vec![
                    [-1.0, -1.0, 3.0],
                    [-1.0, 1.0, 3.0],
                    [1.0, -1.0, 3.0],
                    [0.1, 0.1, 0.3],
                ],
                colors: vec![
                    [0.9, 0.5, 0.5, 1.0],
                    [0.8, 0.8, 0.8, 1.0],
                    [0.8, 0.8, 0.8, 1.0],
                    [0.5, 0.9, 0.5, 1.0],
                ],
                indices: vec![[0, 1, 2], [1, 2, 3]],
            },
            lights: vec![LightSpec {
                kind: "ambient".to_string(),
                color: white(),
                intensity: one(),
                direction: None,
            }],
            renderer: RendererSpec::default(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, SceneError> {
        let scene: SceneFile = serde_json::from_str(text)?;
        scene.validate()?;
        Ok(scene)
    }

    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Checks what the engine would only reject at commit time.
    pub fn validate(&self) -> Result<(), SceneError> {
        if self.version != SCENE_VERSION {
            return Err(SceneError::UnsupportedVersion(self.version));
        }
        if self.image.width == 0 || self.image.height == 0 {
            return Err(SceneError::ZeroSize {
                width: self.image.width,
                height: self.image.height,
            });
        }
        if self.mesh.indices.is_empty() {
            return Err(SceneError::EmptyMesh);
        }

        let vertices = self.mesh.vertices.len();
        if !self.mesh.colors.is_empty() && self.mesh.colors.len() < vertices {
            return Err(SceneError::ColorCount {
                colors: self.mesh.colors.len(),
                vertices,
            });
        }
        for (triangle, corners) in self.mesh.indices.iter().enumerate() {
            for &index in corners {
                if index < 0 || index as usize >= vertices {
                    return Err(SceneError::IndexOutOfRange {
                        triangle,
                        index,
                        vertices,
                    });
                }
            }
        }

        if self
            .lights
            .iter()
            .any(|light| light.kind == "distant" && light.direction.is_none())
        {
            return Err(SceneError::MissingDirection);
        }
        Ok(())
    }

    /// Width over height.
    pub fn aspect(&self) -> f32 {
        self.image.width as f32 / self.image.height as f32
    }
}

impl Default for SceneFile {
    fn default() -> Self {
        Self::tutorial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tutorial_scene_is_valid() {
        let scene = SceneFile::tutorial();
        scene.validate().unwrap();
        assert_eq!(scene.mesh.indices.len(), 2);
        assert!((scene.aspect() - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn scene_file_round_trip_is_stable() {
        let scene = SceneFile::tutorial();
        let json = serde_json::to_string_pretty(&scene).unwrap();
        let decoded = SceneFile::from_json(&json).unwrap();
        assert_eq!(decoded, scene);
    }

    #[test]
    fn omitted_sections_take_tutorial_defaults() {
        let json = r#"{
            "version": 1,
            "camera": { "position": [0, 0, 0], "direction": [0, 0, 1], "up": [0, 1, 0] },
            "mesh": { "vertices": [[0, 0, 1], [1, 0, 1], [0, 1, 1]], "indices": [[0, 1, 2]] },
            "lights": [{ "type": "ambient" }]
        }"#;
        let scene = SceneFile::from_json(json).unwrap();
        assert_eq!(scene.image, ImageSpec::default());
        assert_eq!(scene.camera.kind, "perspective");
        assert_eq!(scene.renderer, RendererSpec::default());
        assert_eq!(scene.lights[0].intensity, 1.0);
        assert!(scene.mesh.colors.is_empty());
    }

    #[test]
    fn a_mesh_alone_is_lit_and_framed_like_the_tutorial() {
        let json = r#"{
            "mesh": { "vertices": [[0, 0, 1], [1, 0, 1], [0, 1, 1]], "indices": [[0, 1, 2]] }
        }"#;
        let scene = SceneFile::from_json(json).unwrap();
        let tutorial = SceneFile::default();
        assert_eq!(scene.version, SCENE_VERSION);
        assert_eq!(scene.camera, tutorial.camera);
        assert_eq!(scene.lights, tutorial.lights);
        assert_eq!(scene.mesh.indices, vec![[0, 1, 2]]);
        scene.validate().unwrap();
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let mut scene = SceneFile::tutorial();
        scene.mesh.indices.push([0, 1, 4]);
        assert!(matches!(
            scene.validate(),
            Err(SceneError::IndexOutOfRange {
                triangle: 2,
                index: 4,
                vertices: 4
            })
        ));
    }

    #[test]
    fn distant_lights_need_a_direction() {
        let mut scene = SceneFile::tutorial();
        scene.lights.push(LightSpec {
            kind: "distant".to_string(),
            color: white(),
            intensity: 2.0,
            direction: None,
        });
        assert!(matches!(scene.validate(), Err(SceneError::MissingDirection)));
    }

    #[test]
    fn unknown_versions_are_rejected() {
        let mut scene = SceneFile::tutorial();
        scene.version = 7;
        let json = serde_json::to_string(&scene).unwrap();
        assert!(matches!(
            SceneFile::from_json(&json),
            Err(SceneError::UnsupportedVersion(7))
        ));
    }
}
