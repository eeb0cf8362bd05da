//! Reads WallEpisodes from Parquet files and dataset directories.

use crate::types::{DatasetSummary, FrameShape, WallEpisode};
use arrow::array::*;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::path::{Path, PathBuf};

/// Static methods for reading trajectory data from Parquet files.
pub struct TrajectoryReader;

impl TrajectoryReader {
    /// Read all episodes from a single Parquet file.
    pub fn read_all(path: &Path) -> anyhow::Result<Vec<WallEpisode>> {
        let file = std::fs::File::open(path)
            .map_err(|e| anyhow::anyhow!("Failed to open {}: {e}", path.display()))?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut episodes = Vec::new();
        for batch_result in reader {
            let batch = batch_result?;
            let mut batch_episodes = extract_episodes_from_batch(&batch)?;
            episodes.append(&mut batch_episodes);
        }

        tracing::debug!(
            count = episodes.len(),
            path = %path.display(),
            "Read trajectory episodes"
        );

        Ok(episodes)
    }

    /// List the Parquet files of a dataset directory, sorted by name.
    pub fn list_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| anyhow::anyhow!("Failed to read dataset directory {}: {e}", dir.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "parquet") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Read every Parquet file of a dataset directory.
    ///
    /// Files are decoded on up to `num_workers` scoped threads; with
    /// `num_workers <= 1` everything runs on the calling thread. Episodes are
    /// returned in file-name order regardless of the worker count.
    pub fn read_dir(dir: &Path, num_workers: usize) -> anyhow::Result<Vec<WallEpisode>> {
        let files = Self::list_files(dir)?;
        if files.is_empty() {
            anyhow::bail!("No .parquet files found in {}", dir.display());
        }

        let per_file = if num_workers <= 1 || files.len() == 1 {
            files
                .iter()
                .map(|f| Self::read_all(f))
                .collect::<anyhow::Result<Vec<_>>>()?
        } else {
            read_files_parallel(&files, num_workers)?
        };

        let episodes: Vec<WallEpisode> = per_file.into_iter().flatten().collect();
        tracing::debug!(
            files = files.len(),
            episodes = episodes.len(),
            dir = %dir.display(),
            "Read dataset directory"
        );
        Ok(episodes)
    }

    /// Read episodes from several Parquet files.
    pub fn read_multiple(paths: &[PathBuf]) -> anyhow::Result<Vec<WallEpisode>> {
        let mut all_episodes = Vec::new();
        for path in paths {
            let mut episodes = Self::read_all(path)?;
            all_episodes.append(&mut episodes);
        }
        Ok(all_episodes)
    }

    /// Compute summary statistics for a dataset directory.
    pub fn read_summary(dir: &Path) -> anyhow::Result<DatasetSummary> {
        let files = Self::list_files(dir)?;
        let episodes = Self::read_multiple(&files)?;
        Ok(DatasetSummary::from_episodes(files.len(), &episodes))
    }
}

fn read_files_parallel(files: &[PathBuf], num_workers: usize) -> anyhow::Result<Vec<Vec<WallEpisode>>> {
    let chunk_size = files.len().div_ceil(num_workers);

    std::thread::scope(|scope| {
        let handles: Vec<_> = files
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|f| TrajectoryReader::read_all(f))
                        .collect::<anyhow::Result<Vec<_>>>()
                })
            })
            .collect();

        let mut per_file = Vec::with_capacity(files.len());
        for handle in handles {
            let chunk_result = handle
                .join()
                .map_err(|_| anyhow::anyhow!("Trajectory reader thread panicked"))?;
            per_file.extend(chunk_result?);
        }
        Ok(per_file)
    })
}

fn float_list_value(list: &ListArray, row: usize, column: &str) -> anyhow::Result<Vec<f32>> {
    let values = list.value(row);
    let floats = values
        .as_any()
        .downcast_ref::<Float32Array>()
        .ok_or_else(|| anyhow::anyhow!("Column {column} does not contain Float32 values"))?;
    Ok(floats.values().to_vec())
}

/// Extract episodes from a single Arrow RecordBatch.
fn extract_episodes_from_batch(batch: &RecordBatch) -> anyhow::Result<Vec<WallEpisode>> {
    let ids = batch
        .column(0)
        .as_any()
        .downcast_ref::<UInt64Array>()
        .ok_or_else(|| anyhow::anyhow!("Column 0 (episode_id) is not UInt64Array"))?;

    let steps = batch
        .column(1)
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| anyhow::anyhow!("Column 1 (num_steps) is not UInt32Array"))?;

    let channels = batch
        .column(2)
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| anyhow::anyhow!("Column 2 (channels) is not UInt32Array"))?;

    let heights = batch
        .column(3)
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| anyhow::anyhow!("Column 3 (height) is not UInt32Array"))?;

    let widths = batch
        .column(4)
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| anyhow::anyhow!("Column 4 (width) is not UInt32Array"))?;

    let action_dims = batch
        .column(5)
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| anyhow::anyhow!("Column 5 (action_dim) is not UInt32Array"))?;

    let states = batch
        .column(6)
        .as_any()
        .downcast_ref::<ListArray>()
        .ok_or_else(|| anyhow::anyhow!("Column 6 (states) is not ListArray"))?;

    let actions = batch
        .column(7)
        .as_any()
        .downcast_ref::<ListArray>()
        .ok_or_else(|| anyhow::anyhow!("Column 7 (actions) is not ListArray"))?;

    let locations = batch
        .column(8)
        .as_any()
        .downcast_ref::<ListArray>()
        .ok_or_else(|| anyhow::anyhow!("Column 8 (locations) is not ListArray"))?;

    let sources = batch
        .column(9)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| anyhow::anyhow!("Column 9 (source) is not StringArray"))?;

    let mut episodes = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let episode_locations = if locations.is_null(i) {
            None
        } else {
            Some(float_list_value(locations, i, "locations")?)
        };

        let episode = WallEpisode {
            episode_id: ids.value(i),
            num_steps: steps.value(i) as usize,
            frame: FrameShape::new(
                channels.value(i) as usize,
                heights.value(i) as usize,
                widths.value(i) as usize,
            ),
            action_dim: action_dims.value(i) as usize,
            states: float_list_value(states, i, "states")?,
            actions: float_list_value(actions, i, "actions")?,
            locations: episode_locations,
            source: sources.value(i).to_string(),
        };
        episode.validate()?;
        episodes.push(episode);
    }

    Ok(episodes)
}
