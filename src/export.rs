use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    library::{LibraryCache, enrich},
    model::UserPlant,
    traits::Clock,
    watering,
};

/// One exported collection row.
#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
    pub id: i64,
    pub name: String,
    pub library_plant_id: i64,
    pub library_name: String,
    pub watering_interval_days: i64,
    pub light_preference: &'static str,
    pub care_difficulty: &'static str,
    pub last_watered_at: String,
    pub days_until_water: Option<i64>,
    pub status: &'static str,
}

/// Build the export rows for the collection at the clock's current time.
pub fn export_rows<C: Clock>(
    plants: &[UserPlant],
    cache: &LibraryCache,
    clock: &C,
) -> Vec<ExportRow> {
    plants
        .iter()
        .map(|plant| {
            let enriched = enrich(plant, cache);
            let days = enriched.days_until_water(clock);
            ExportRow {
                id: plant.id,
                name: enriched.display_name().to_string(),
                library_plant_id: plant.plant_library_id,
                library_name: enriched.library_name.clone().unwrap_or_default(),
                watering_interval_days: enriched.watering_interval_days,
                light_preference: enriched.light_preference.key(),
                care_difficulty: enriched.care_difficulty.key(),
                last_watered_at: plant
                    .last_watered_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
                days_until_water: days,
                status: watering::classify(days, false).status.key(),
            }
        })
        .collect()
}

/// Export the collection to a timestamped CSV file in `output_dir`.
///
/// Returns the path of the written file.
pub async fn export_collection_csv<C: Clock>(
    plants: &[UserPlant],
    cache: &LibraryCache,
    output_dir: &Path,
    clock: &C,
) -> Result<PathBuf> {
    let rows = export_rows(plants, cache, clock);

    let export_time = clock.now_utc();
    let filename = format!(
        "plant_care_export_{}.csv",
        export_time.format("%Y%m%d_%H%M%S")
    );
    let output_path = output_dir.join(&filename);
    let path = output_path.clone();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut wtr = csv::Writer::from_path(&path).context("Failed to create CSV writer")?;

        for row in rows {
            wtr.serialize(row).context("Failed to serialize plant row")?;
        }

        wtr.flush().context("Failed to flush CSV writer")?;
        Ok(())
    })
    .await
    .context("CSV export task failed")??;

    tracing::info!("Exported {} plants to {}", plants.len(), output_path.display());
    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    use super::*;
    use crate::model::{CareDifficulty, LibraryPlant, LightPreference};
    use crate::traits::MockClock;

    fn clock() -> MockClock {
        MockClock::new(Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap())
    }

    fn cache() -> LibraryCache {
        let mut cache = LibraryCache::new();
        cache.populate(vec![LibraryPlant {
            id: 1,
            name: "Fern".to_string(),
            description: String::new(),
            watering_interval_days: 4,
            light_preference: LightPreference::Shade,
            care_difficulty: CareDifficulty::Easy,
            image_url: None,
            created_at: None,
        }]);
        cache
    }

    fn plants(clock: &MockClock) -> Vec<UserPlant> {
        vec![
            UserPlant {
                id: 10,
                plant_library_id: 1,
                custom_name: Some("Bathroom fern".to_string()),
                image_url: None,
                last_watered_at: Some(clock.now_utc() - Duration::days(6)),
                days_until_water: None,
                created_at: None,
                name: None,
                watering_interval_days: None,
                light_preference: None,
                care_difficulty: None,
            },
            UserPlant {
                id: 11,
                plant_library_id: 99,
                custom_name: None,
                image_url: None,
                last_watered_at: None,
                days_until_water: Some(5),
                created_at: None,
                name: Some("Mystery".to_string()),
                watering_interval_days: None,
                light_preference: None,
                care_difficulty: None,
            },
        ]
    }

    #[test]
    fn test_export_rows() {
        let clock = clock();
        let rows = export_rows(&plants(&clock), &cache(), &clock);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Bathroom fern");
        assert_eq!(rows[0].library_name, "Fern");
        assert_eq!(rows[0].days_until_water, Some(-2));
        assert_eq!(rows[0].status, "overdue");
        assert_eq!(rows[0].light_preference, "shade");

        assert_eq!(rows[1].watering_interval_days, 7);
        assert_eq!(rows[1].status, "ok");
        assert_eq!(rows[1].last_watered_at, "");
    }

    #[tokio::test]
    async fn test_export_writes_timestamped_file() {
        let dir = TempDir::new().unwrap();
        let clock = clock();

        let path = export_collection_csv(&plants(&clock), &cache(), dir.path(), &clock)
            .await
            .unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "plant_care_export_20240615_120000.csv"
        );

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,name,library_plant_id,library_name,watering_interval_days,light_preference,care_difficulty,last_watered_at,days_until_water,status"
        );
        assert!(lines.next().unwrap().starts_with("10,Bathroom fern,1,Fern,4,shade,easy,"));
        assert_eq!(
            lines.next().unwrap(),
            "11,Mystery,99,Mystery,7,unknown,unknown,,5,ok"
        );
        assert!(lines.next().is_none());
    }

    #[tokio::test]
    async fn test_export_empty_collection_has_no_rows() {
        let dir = TempDir::new().unwrap();
        let clock = clock();

        let path = export_collection_csv(&[], &cache(), dir.path(), &clock)
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.is_empty());
    }
}
