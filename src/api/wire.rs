//! JSON wire types of the anchor service

use crate::core::Transform;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 4x4 transform as four named columns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireTransform {
    pub col0: [f32; 4],
    pub col1: [f32; 4],
    pub col2: [f32; 4],
    pub col3: [f32; 4],
}

fn column(transform: &Transform, index: usize) -> [f32; 4] {
    let c = transform.column(index);
    [c[0], c[1], c[2], c[3]]
}

impl From<&Transform> for WireTransform {
    fn from(transform: &Transform) -> Self {
        Self {
            col0: column(transform, 0),
            col1: column(transform, 1),
            col2: column(transform, 2),
            col3: column(transform, 3),
        }
    }
}

impl From<WireTransform> for Transform {
    fn from(wire: WireTransform) -> Self {
        // Column-major storage matches the wire layout
        let mut data = [0.0f32; 16];
        for (i, col) in [wire.col0, wire.col1, wire.col2, wire.col3].iter().enumerate() {
            data[i * 4..i * 4 + 4].copy_from_slice(col);
        }
        Transform::from_column_slice(&data)
    }
}

/// Body of `POST /UWBAnchor/{name}/new`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnchorRequest {
    pub relative_transform: WireTransform,
}

/// Reply to `POST /UWBAnchor/{name}/new`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnchorResponse {
    pub id: Uuid,
}

/// One element of `GET /UWBAnchor/{name}/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorRecord {
    pub id: Uuid,
    pub relative_transform: WireTransform,
}
