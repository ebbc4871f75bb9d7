//! Per-frame stage graph.
//!
//! Each stage declares the resources it reads and writes; `plan_batches`
//! walks the submission order and starts a new command submission whenever a
//! stage reads something an earlier stage in the same batch wrote. The
//! voxelize-to-ray-march grid handoff is the split that matters: the grid has
//! one writer and one reader per frame, and the submission boundary is the
//! explicit sync point between them.

use std::ops::Range;

/// Resources a stage can declare against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceId {
    SourceColor,
    SceneDepth,
    LightingCapture,
    PositionCapture,
    VoxelGrid,
    BlurPing,
    BlurPong,
    Destination,
}

/// Declared inputs/outputs of one recorded stage.
#[derive(Clone, Debug, PartialEq)]
pub struct StageIo {
    pub name: &'static str,
    pub reads: Vec<ResourceId>,
    pub writes: Vec<ResourceId>,
}

impl StageIo {
    pub fn new(name: &'static str, reads: &[ResourceId], writes: &[ResourceId]) -> Self {
        Self {
            name,
            reads: reads.to_vec(),
            writes: writes.to_vec(),
        }
    }
}

/// Declared IO of every stage in one frame, in submission order. The
/// orchestrator records stages in exactly this shape; `debug_assert` checks
/// keep the two in sync.
pub fn plan_frame(debug_mode: bool, blur_iterations: u32) -> Vec<StageIo> {
    use ResourceId::*;

    let mut stages = vec![
        StageIo::new("lighting capture", &[SourceColor], &[LightingCapture]),
        StageIo::new("position capture", &[SceneDepth], &[PositionCapture]),
        StageIo::new("grid clear", &[], &[VoxelGrid]),
        StageIo::new("voxelize", &[LightingCapture, PositionCapture], &[VoxelGrid]),
    ];

    if debug_mode {
        stages.push(StageIo::new("debug view", &[VoxelGrid, SceneDepth], &[Destination]));
        return stages;
    }

    stages.push(StageIo::new("reflect", &[VoxelGrid, SceneDepth], &[BlurPing]));
    for _ in 0..blur_iterations {
        stages.push(StageIo::new("blur horizontal", &[BlurPing], &[BlurPong]));
        stages.push(StageIo::new("blur vertical", &[BlurPong], &[BlurPing]));
    }
    stages.push(StageIo::new("composite", &[SourceColor, BlurPing], &[Destination]));
    stages
}

/// Split the stage list into submission batches at read-after-write hazards.
pub fn plan_batches(stages: &[StageIo]) -> Vec<Range<usize>> {
    let mut batches = Vec::new();
    let mut batch_start = 0;
    let mut written: Vec<ResourceId> = Vec::new();

    for (i, stage) in stages.iter().enumerate() {
        let hazard = stage.reads.iter().any(|r| written.contains(r));
        if hazard {
            batches.push(batch_start..i);
            batch_start = i;
            written.clear();
        }
        written.extend_from_slice(&stage.writes);
    }
    if batch_start < stages.len() {
        batches.push(batch_start..stages.len());
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use ResourceId::*;

    #[test]
    fn empty_graph_has_no_batches() {
        assert!(plan_batches(&[]).is_empty());
    }

    #[test]
    fn independent_stages_share_one_batch() {
        let stages = [
            StageIo::new("lighting", &[SourceColor], &[LightingCapture]),
            StageIo::new("position", &[SceneDepth], &[PositionCapture]),
        ];
        assert_eq!(plan_batches(&stages), vec![0..2]);
    }

    #[test]
    fn grid_read_after_write_splits_the_submission() {
        let stages = [
            StageIo::new("clear", &[], &[VoxelGrid]),
            StageIo::new("voxelize", &[LightingCapture, PositionCapture], &[VoxelGrid]),
            StageIo::new("reflect", &[VoxelGrid, SceneDepth], &[BlurPing]),
        ];
        assert_eq!(plan_batches(&stages), vec![0..2, 2..3]);
    }

    #[test]
    fn full_frame_splits_at_every_handoff() {
        let stages = [
            StageIo::new("lighting", &[SourceColor], &[LightingCapture]),
            StageIo::new("position", &[SceneDepth], &[PositionCapture]),
            StageIo::new("clear", &[], &[VoxelGrid]),
            StageIo::new("voxelize", &[LightingCapture, PositionCapture], &[VoxelGrid]),
            StageIo::new("reflect", &[VoxelGrid, SceneDepth], &[BlurPing]),
            StageIo::new("blur h", &[BlurPing], &[BlurPong]),
            StageIo::new("blur v", &[BlurPong], &[BlurPing]),
            StageIo::new("composite", &[SourceColor, BlurPing], &[Destination]),
        ];
        let batches = plan_batches(&stages);
        assert_eq!(batches, vec![0..3, 3..4, 4..5, 5..6, 6..7, 7..8]);
    }

    #[test]
    fn write_after_write_stays_in_one_batch() {
        let stages = [
            StageIo::new("clear", &[], &[VoxelGrid]),
            StageIo::new("voxelize", &[], &[VoxelGrid]),
        ];
        assert_eq!(plan_batches(&stages), vec![0..2]);
    }

    #[test]
    fn zero_blur_iterations_plan_has_no_blur_stages() {
        let plan = plan_frame(false, 0);
        assert!(plan.iter().all(|s| !s.name.starts_with("blur")));
        // The composite reads the march output directly.
        let composite = plan.last().unwrap();
        assert_eq!(composite.name, "composite");
        assert!(composite.reads.contains(&BlurPing));
    }

    #[test]
    fn debug_plan_bypasses_blur_and_composite() {
        let plan = plan_frame(true, 3);
        assert_eq!(plan.last().unwrap().name, "debug view");
        assert!(plan
            .iter()
            .all(|s| !s.name.starts_with("blur") && s.name != "composite"));
    }

    #[test]
    fn frame_plan_splits_between_voxelize_and_march() {
        for (debug_mode, reader) in [(false, "reflect"), (true, "debug view")] {
            let plan = plan_frame(debug_mode, 2);
            let batches = plan_batches(&plan);
            let reader_idx = plan.iter().position(|s| s.name == reader).unwrap();
            assert!(
                batches.iter().any(|b| b.start == reader_idx),
                "grid read must start a new submission in {plan:?}"
            );
        }
    }
}
