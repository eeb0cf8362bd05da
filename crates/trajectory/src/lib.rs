//! Parquet I/O for recorded wall-environment trajectories.
//!
//! Each row of a trajectory file is one episode: the observation frames, the
//! actions taken between them, and (for probing splits) the agent location at
//! every frame. A dataset split is a directory of such files.

pub mod reader;
pub mod types;
pub mod writer;

pub use reader::TrajectoryReader;
pub use types::{DatasetSummary, FrameShape, WallEpisode, LOCATION_DIM};
pub use writer::TrajectoryWriter;
