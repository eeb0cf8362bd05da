//! Writes WallEpisodes to Parquet files using Arrow.

use crate::types::WallEpisode;
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use std::path::PathBuf;
use std::sync::Arc;

fn float_list() -> DataType {
    DataType::List(Arc::new(Field::new("item", DataType::Float32, true)))
}

/// Arrow schema for trajectory Parquet files (10 columns).
pub fn trajectory_schema() -> Schema {
    Schema::new(vec![
        Field::new("episode_id", DataType::UInt64, false),
        Field::new("num_steps", DataType::UInt32, false),
        Field::new("channels", DataType::UInt32, false),
        Field::new("height", DataType::UInt32, false),
        Field::new("width", DataType::UInt32, false),
        Field::new("action_dim", DataType::UInt32, false),
        Field::new("states", float_list(), false),
        Field::new("actions", float_list(), false),
        Field::new("locations", float_list(), true),
        Field::new("source", DataType::Utf8, false),
    ])
}

/// Buffers episodes and writes them to a Parquet file.
pub struct TrajectoryWriter {
    episodes: Vec<WallEpisode>,
    output_path: PathBuf,
}

impl TrajectoryWriter {
    /// Create a new writer that will write to the given path.
    pub fn new(output_path: PathBuf) -> Self {
        Self {
            episodes: Vec::new(),
            output_path,
        }
    }

    /// Buffer a single episode.
    pub fn record(&mut self, episode: WallEpisode) {
        self.episodes.push(episode);
    }

    /// Buffer multiple episodes.
    pub fn record_all(&mut self, episodes: Vec<WallEpisode>) {
        self.episodes.extend(episodes);
    }

    /// Number of buffered episodes.
    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    /// Validate and write all buffered episodes, returning the output path.
    pub fn finish(self) -> anyhow::Result<PathBuf> {
        for episode in &self.episodes {
            episode.validate()?;
        }

        let schema = Arc::new(trajectory_schema());
        let batch = if self.episodes.is_empty() {
            RecordBatch::new_empty(schema.clone())
        } else {
            build_record_batch(&self.episodes)?
        };

        let file = std::fs::File::create(&self.output_path)?;
        let mut writer = ArrowWriter::try_new(file, schema, None)?;
        writer.write(&batch)?;
        writer.close()?;

        tracing::info!(
            episodes = self.episodes.len(),
            path = %self.output_path.display(),
            "Wrote trajectory Parquet file"
        );

        Ok(self.output_path)
    }
}

fn build_float_list<'a>(values: impl Iterator<Item = Option<&'a [f32]>>) -> ListArray {
    let mut builder = ListBuilder::new(Float32Builder::new());
    for v in values {
        match v {
            Some(slice) => {
                builder.values().append_slice(slice);
                builder.append(true);
            }
            None => builder.append(false),
        }
    }
    builder.finish()
}

/// Build an Arrow RecordBatch from episodes.
fn build_record_batch(episodes: &[WallEpisode]) -> anyhow::Result<RecordBatch> {
    let schema = Arc::new(trajectory_schema());

    let ids: UInt64Array = episodes.iter().map(|e| Some(e.episode_id)).collect();
    let steps: UInt32Array = episodes.iter().map(|e| Some(e.num_steps as u32)).collect();
    let channels: UInt32Array = episodes.iter().map(|e| Some(e.frame.channels as u32)).collect();
    let heights: UInt32Array = episodes.iter().map(|e| Some(e.frame.height as u32)).collect();
    let widths: UInt32Array = episodes.iter().map(|e| Some(e.frame.width as u32)).collect();
    let action_dims: UInt32Array = episodes.iter().map(|e| Some(e.action_dim as u32)).collect();
    let states = build_float_list(episodes.iter().map(|e| Some(e.states.as_slice())));
    let actions = build_float_list(episodes.iter().map(|e| Some(e.actions.as_slice())));
    let locations = build_float_list(episodes.iter().map(|e| e.locations.as_deref()));
    let sources: StringArray = episodes.iter().map(|e| Some(e.source.as_str())).collect();

    let columns: Vec<Arc<dyn arrow::array::Array>> = vec![
        Arc::new(ids),
        Arc::new(steps),
        Arc::new(channels),
        Arc::new(heights),
        Arc::new(widths),
        Arc::new(action_dims),
        Arc::new(states),
        Arc::new(actions),
        Arc::new(locations),
        Arc::new(sources),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FrameShape, LOCATION_DIM};
    use tempfile::TempDir;

    fn make_test_episode(episode_id: u64, num_steps: usize) -> WallEpisode {
        let frame = FrameShape::new(2, 3, 3);
        WallEpisode {
            episode_id,
            num_steps,
            frame,
            action_dim: 2,
            states: (0..num_steps * frame.numel()).map(|i| i as f32).collect(),
            actions: vec![0.5; (num_steps - 1) * 2],
            locations: Some(vec![1.0; num_steps * LOCATION_DIM]),
            source: "probe_normal".to_string(),
        }
    }

    #[test]
    fn test_trajectory_schema_has_10_columns() {
        let schema = trajectory_schema();
        assert_eq!(schema.fields().len(), 10);
        assert_eq!(schema.field(0).name(), "episode_id");
        assert_eq!(schema.field(8).name(), "locations");
        assert!(schema.field(8).is_nullable());
        assert!(!schema.field(6).is_nullable());
        assert_eq!(schema.field(9).name(), "source");
    }

    #[test]
    fn test_write_empty_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.parquet");
        let writer = TrajectoryWriter::new(path.clone());
        assert!(writer.is_empty());
        let result = writer.finish().unwrap();
        assert_eq!(result, path);
        assert!(path.exists());
    }

    #[test]
    fn test_write_and_verify_file_exists() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("episodes.parquet");
        let mut writer = TrajectoryWriter::new(path.clone());

        for i in 0..4 {
            writer.record(make_test_episode(i, 5));
        }
        assert_eq!(writer.len(), 4);

        let result = writer.finish().unwrap();
        assert!(result.exists());
        assert!(std::fs::metadata(&result).unwrap().len() > 0);
    }

    #[test]
    fn test_finish_rejects_inconsistent_episode() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.parquet");
        let mut writer = TrajectoryWriter::new(path.clone());

        let mut episode = make_test_episode(0, 4);
        episode.states.truncate(10);
        writer.record(episode);

        assert!(writer.finish().is_err());
        assert!(!path.exists(), "nothing should be written for invalid episodes");
    }
}
