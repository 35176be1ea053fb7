use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};

use super::VolumeId;

/// Faceting strategy of the neutronics export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetingMode {
    /// Material groups named `mat:<tag>`.
    Legacy,
    /// Material blocks.
    Native,
}

/// A legacy material group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialGroup {
    /// Group name, `mat:<tag>`.
    pub name: String,
    /// Member volumes, ascending.
    pub volumes: Vec<VolumeId>,
}

/// A native material block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialBlock {
    /// Block number; the smallest member volume id.
    pub block_id: u32,
    /// Material name.
    pub mat_tag: String,
    /// Member volumes, ascending.
    pub volumes: Vec<VolumeId>,
}

/// Material data handed to the export sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialAssignment {
    /// Legacy faceting groups.
    Legacy(Vec<MaterialGroup>),
    /// Native faceting blocks.
    Native(Vec<MaterialBlock>),
}

impl MaterialAssignment {
    /// Total number of tagged volumes.
    #[must_use]
    pub fn num_volumes(&self) -> usize {
        match self {
            Self::Legacy(groups) => groups.iter().map(|g| g.volumes.len()).sum(),
            Self::Native(blocks) => blocks.iter().map(|b| b.volumes.len()).sum(),
        }
    }
}

/// Groups tagged volumes by material.
///
/// Each entry is a material tag and the volumes of one component. Legacy
/// mode gathers all volumes sharing a tag into one `mat:<tag>` group; native
/// mode makes one block per entry, numbered by its smallest volume id.
/// Groups and blocks come out in order of first appearance.
///
/// # Errors
///
/// Returns [`ExportError::NotImported`] if an entry has no volumes.
pub fn tag_materials(
    entries: &[(&str, &[VolumeId])],
    mode: FacetingMode,
) -> Result<MaterialAssignment> {
    for (tag, volumes) in entries {
        if volumes.is_empty() {
            return Err(ExportError::NotImported((*tag).to_string()).into());
        }
    }
    match mode {
        FacetingMode::Legacy => {
            let mut order: Vec<&str> = Vec::new();
            let mut members: BTreeMap<&str, Vec<VolumeId>> = BTreeMap::new();
            for &(tag, volumes) in entries {
                let group = members.entry(tag).or_insert_with(|| {
                    order.push(tag);
                    Vec::new()
                });
                group.extend_from_slice(volumes);
            }
            let groups = order
                .into_iter()
                .map(|tag| {
                    let mut volumes = members.remove(tag).unwrap_or_default();
                    volumes.sort_unstable();
                    volumes.dedup();
                    MaterialGroup {
                        name: format!("mat:{tag}"),
                        volumes,
                    }
                })
                .collect();
            Ok(MaterialAssignment::Legacy(groups))
        }
        FacetingMode::Native => {
            let blocks = entries
                .iter()
                .map(|&(tag, volumes)| {
                    let mut volumes = volumes.to_vec();
                    volumes.sort_unstable();
                    volumes.dedup();
                    MaterialBlock {
                        block_id: volumes[0].0,
                        mat_tag: tag.to_string(),
                        volumes,
                    }
                })
                .collect();
            Ok(MaterialAssignment::Native(blocks))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids(v: &[u32]) -> Vec<VolumeId> {
        v.iter().copied().map(VolumeId).collect()
    }

    #[test]
    fn legacy_groups_share_tags() {
        let plasma = ids(&[1]);
        let blanket = ids(&[3, 2]);
        let shield = ids(&[4]);
        let entries = [("plasma", &plasma[..]), ("steel", &blanket[..]), ("steel", &shield[..])];
        let MaterialAssignment::Legacy(groups) =
            tag_materials(&entries, FacetingMode::Legacy).unwrap()
        else {
            panic!("expected legacy groups");
        };
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "mat:plasma");
        assert_eq!(groups[1].name, "mat:steel");
        assert_eq!(groups[1].volumes, ids(&[2, 3, 4]));
    }

    #[test]
    fn native_blocks_use_smallest_volume_id() {
        let magnets = ids(&[9, 7, 8]);
        let wall = ids(&[2]);
        let entries = [("magnets", &magnets[..]), ("wall", &wall[..])];
        let MaterialAssignment::Native(blocks) =
            tag_materials(&entries, FacetingMode::Native).unwrap()
        else {
            panic!("expected native blocks");
        };
        assert_eq!(blocks[0].block_id, 7);
        assert_eq!(blocks[0].volumes, ids(&[7, 8, 9]));
        assert_eq!(blocks[1].block_id, 2);
    }

    #[test]
    fn empty_component_is_an_error() {
        let entries: [(&str, &[VolumeId]); 1] = [("wall", &[])];
        assert!(tag_materials(&entries, FacetingMode::Native).is_err());
    }
}
