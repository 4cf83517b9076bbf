pub mod models;

use std::io;
use std::path::Path;
use thiserror::Error;

use crate::NUM_FEATURES;
use models::{RawRow, Track};

/// Columns a dataset must carry. Anything else in the file is ignored.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "name",
    "artists",
    "popularity",
    "valence",
    "energy",
    "danceability",
    "acousticness",
    "tempo",
];

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Dataset is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

pub type Result<T> = std::result::Result<T, DatasetError>;

/// A cleaned, mood-labeled snapshot of the song catalog.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    tracks: Vec<Track>,
    dropped: usize,
}

impl Dataset {
    /// Load a CSV file, dropping rows with a missing or malformed required field.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let dataset = Self::from_reader(file)?;
        log::info!(
            "Loaded {} tracks from {} ({} incomplete rows dropped)",
            dataset.len(),
            path.display(),
            dataset.dropped
        );
        Ok(dataset)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Fields)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| !headers.iter().any(|h| h == **col))
            .map(|col| col.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DatasetError::MissingColumns(missing));
        }

        let mut tracks = Vec::new();
        let mut dropped = 0;
        for record in rdr.deserialize::<RawRow>() {
            match record.ok().and_then(RawRow::into_track) {
                Some(track) => tracks.push(track),
                None => dropped += 1,
            }
        }

        Ok(Self { tracks, dropped })
    }

    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        Self { tracks, dropped: 0 }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Number of rows discarded at load time.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Raw feature rows in dataset order.
    pub fn feature_matrix(&self) -> Vec<[f64; NUM_FEATURES]> {
        self.tracks.iter().map(Track::features).collect()
    }

    /// Index of the first track whose name equals `name`, ignoring case and
    /// surrounding whitespace.
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.tracks
            .iter()
            .position(|t| t.name.trim().to_lowercase() == needle)
    }

    /// Tracks whose name contains `pattern` (case-insensitive), in dataset order.
    pub fn search(&self, pattern: &str) -> Vec<&Track> {
        let p = pattern.trim().to_lowercase();
        self.tracks
            .iter()
            .filter(|t| t.name.to_lowercase().contains(&p))
            .collect()
    }

    /// Write the cleaned, mood-labeled dataset as CSV.
    pub fn save_cleaned(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut wtr = csv::Writer::from_path(path)?;
        for track in &self.tracks {
            wtr.serialize(track)?;
        }
        wtr.flush()?;
        log::info!("Wrote {} cleaned tracks to {}", self.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::Mood;

    const SAMPLE: &str = "\
id,name,artists,popularity,year,valence,energy,danceability,acousticness,tempo
1,Blue Sky,['Ann'],40,1999,0.8,0.9,0.7,0.1,120.5
2,No Tempo,['Bob'],30,2001,0.3,0.2,0.4,0.9,
3,Dusk,['Cy'],55,2005,0.2,0.3,0.5,0.8,80.0
4,Broken,['Dee'],abc,2005,0.2,0.3,0.5,0.8,80.0
5,blue sky,['Eve'],10,2010,0.6,0.4,0.3,0.2,99.0
";

    #[test]
    fn test_load_drops_incomplete_rows() {
        let ds = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.dropped(), 2);
        assert_eq!(ds.tracks()[0].name, "Blue Sky");
        assert_eq!(ds.tracks()[0].mood, Mood::Happy);
        assert_eq!(ds.tracks()[1].mood, Mood::Sad);
        assert_eq!(ds.tracks()[2].mood, Mood::Calm);
    }

    #[test]
    fn test_missing_columns() {
        let csv = "name,artists,popularity,valence\nA,B,1,0.5\n";
        match Dataset::from_reader(csv.as_bytes()) {
            Err(DatasetError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["energy", "danceability", "acousticness", "tempo"]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn test_find_by_name_is_case_insensitive_exact() {
        let ds = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        // First match in dataset order wins
        assert_eq!(ds.find_by_name("BLUE SKY"), Some(0));
        assert_eq!(ds.find_by_name(" dusk "), Some(1));
        // No substring matching
        assert_eq!(ds.find_by_name("Blue"), None);
        assert_eq!(ds.find_by_name(""), None);
    }

    #[test]
    fn test_search_substring() {
        let ds = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        let hits: Vec<&str> = ds.search("sky").iter().map(|t| t.name.as_str()).collect();
        assert_eq!(hits, vec!["Blue Sky", "blue sky"]);
        assert!(ds.search("zzz").is_empty());
    }

    #[test]
    fn test_save_cleaned_writes_mood_column() {
        let ds = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("cleaned_data.csv");
        ds.save_cleaned(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next().unwrap(),
            "name,artists,popularity,valence,energy,danceability,acousticness,tempo,mood"
        );
        assert!(lines.next().unwrap().ends_with(",happy"));

        // The cleaned file loads back to the same tracks
        let reloaded = Dataset::load(&path).unwrap();
        assert_eq!(reloaded.tracks(), ds.tracks());
    }
}
