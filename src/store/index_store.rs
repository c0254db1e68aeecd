use std::collections::HashSet;

use diesel::dsl::insert_into;
use diesel::prelude::*;
use log::{debug, info};

use crate::error::{SabiError, SabiResult};
use crate::store::models::{FingerprintMatch, NewFingerprint, NewSong, Song};
use crate::store::schema::{fingerprints, songs};

const BULK_INSERT_BATCH_SIZE: usize = 15_000;
const HASH_LOOKUP_BATCH_SIZE: usize = 5_000;

/// A single posting: a hash's occurrence at a given reference-time offset
/// in a given song.
#[derive(Debug, Clone, Copy)]
pub struct Posting {
    pub hash: u32,
    pub time_offset_ms: i64,
    pub song_id: i32,
}

/// Everything the catalog needs to insert one freshly indexed song.
pub struct SongRecord {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub file_path: Option<String>,
    pub duration_sec: Option<f64>,
    pub sample_rate: Option<u32>,
}

/// The persisted hash->posting multimap plus song metadata side table.
///
/// One `IndexStore` owns one `PgConnection`; batch indexing workers each
/// construct their own (see `indexing::worker`), so there's no contention
/// on this handle beyond what Postgres itself serializes.
pub struct IndexStore {
    conn: PgConnection,
}

impl IndexStore {
    pub fn connect(database_url: &str) -> SabiResult<Self> {
        let conn = PgConnection::establish(database_url)?;
        Ok(Self { conn })
    }

    /// Idempotently ensure both tables and the covering hash index exist.
    pub fn create_schema(&mut self) -> SabiResult<()> {
        diesel::sql_query(
            "CREATE TABLE IF NOT EXISTS songs (
                id SERIAL PRIMARY KEY,
                title VARCHAR(255) NOT NULL,
                artist_name VARCHAR(255),
                album_name VARCHAR(255),
                file_path TEXT,
                duration_sec DOUBLE PRECISION,
                sample_rate INTEGER,
                created_at TIMESTAMP DEFAULT now()
            );",
        )
        .execute(&mut self.conn)?;

        diesel::sql_query(
            "CREATE TABLE IF NOT EXISTS fingerprints (
                id BIGSERIAL PRIMARY KEY,
                hash INTEGER NOT NULL,
                time_offset_msec BIGINT NOT NULL,
                song_id INTEGER NOT NULL REFERENCES songs(id)
            );",
        )
        .execute(&mut self.conn)?;

        diesel::sql_query(
            "CREATE INDEX IF NOT EXISTS idx_fingerprints_hash ON fingerprints(hash);",
        )
        .execute(&mut self.conn)?;

        Ok(())
    }

    pub fn insert_song(&mut self, song: &SongRecord) -> SabiResult<i32> {
        let new_song = NewSong {
            title: song.title.clone(),
            artist_name: song.artist.clone(),
            album_name: song.album.clone(),
            file_path: song.file_path.clone(),
            duration_sec: song.duration_sec,
            sample_rate: song.sample_rate.map(|r| r as i32),
            created_at: Some(std::time::SystemTime::now()),
        };

        let inserted: Song = insert_into(songs::table)
            .values(&new_song)
            .get_result(&mut self.conn)?;

        debug!("inserted song {} ({})", inserted.id, inserted.title);
        Ok(inserted.id)
    }

    pub fn lookup_song(&mut self, id: i32) -> SabiResult<Option<Song>> {
        use crate::store::schema::songs::dsl;
        Ok(dsl::songs
            .filter(dsl::id.eq(id))
            .first(&mut self.conn)
            .optional()?)
    }

    /// Dedup probe: case-sensitive exact match on (title, artist, album).
    pub fn find_song_id(
        &mut self,
        title: &str,
        artist: Option<&str>,
        album: Option<&str>,
    ) -> SabiResult<Option<i32>> {
        use crate::store::schema::songs::dsl;

        let mut query = dsl::songs.into_boxed();
        query = query.filter(dsl::title.eq(title));
        query = match artist {
            Some(a) => query.filter(dsl::artist_name.eq(a)),
            None => query.filter(dsl::artist_name.is_null()),
        };
        query = match album {
            Some(a) => query.filter(dsl::album_name.eq(a)),
            None => query.filter(dsl::album_name.is_null()),
        };

        let row: Option<Song> = query.select(Song::as_select()).first(&mut self.conn).optional()?;
        Ok(row.map(|s| s.id))
    }

    pub fn count_songs(&mut self) -> SabiResult<i64> {
        use crate::store::schema::songs::dsl;
        Ok(dsl::songs.count().get_result(&mut self.conn)?)
    }

    /// Streaming bulk load, chunked into batches substantially larger than
    /// one row per insert statement.
    pub fn bulk_insert_fingerprints(
        &mut self,
        song_id: i32,
        postings: impl IntoIterator<Item = (u32, i64)>,
    ) -> SabiResult<usize> {
        let rows: Vec<NewFingerprint> = postings
            .into_iter()
            .map(|(hash, time_offset_msec)| NewFingerprint {
                hash: hash as i32,
                time_offset_msec,
                song_id,
            })
            .collect();

        if rows.is_empty() {
            return Ok(0);
        }

        let mut total = 0usize;
        self.conn.transaction(|conn| {
            for batch in rows.chunks(BULK_INSERT_BATCH_SIZE) {
                total += insert_into(fingerprints::table)
                    .values(batch)
                    .execute(conn)?;
            }
            Ok::<_, diesel::result::Error>(())
        })?;

        info!("inserted {} fingerprints for song {}", total, song_id);
        Ok(total)
    }

    /// One-shot lookup by hash set. Returns every posting whose hash is in
    /// `hashes`; order is unspecified.
    pub fn find_postings(&mut self, hashes: &HashSet<u32>) -> SabiResult<Vec<Posting>> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }

        let hash_list: Vec<i64> = hashes.iter().map(|&h| h as i64).collect();

        let records: Vec<FingerprintMatch> = self.conn.transaction(|conn| {
            diesel::sql_query(
                "CREATE TEMPORARY TABLE query_hashes (hash BIGINT NOT NULL PRIMARY KEY) ON COMMIT DROP;",
            )
            .execute(conn)?;

            for batch in hash_list.chunks(HASH_LOOKUP_BATCH_SIZE) {
                let values: Vec<String> = batch.iter().map(|h| h.to_string()).collect();
                let sql = format!(
                    "INSERT INTO query_hashes (hash) VALUES ({}) ON CONFLICT DO NOTHING;",
                    values.join("), (")
                );
                diesel::sql_query(sql).execute(conn)?;
            }

            diesel::sql_query(
                "SELECT f.hash, f.time_offset_msec, f.song_id
                 FROM fingerprints AS f
                 INNER JOIN query_hashes AS q ON f.hash = q.hash::int4;",
            )
            .load::<FingerprintMatch>(conn)
        }).map_err(|e: diesel::result::Error| SabiError::StorageError(e.to_string()))?;

        Ok(records
            .into_iter()
            .map(|r| Posting {
                hash: r.hash as u32,
                time_offset_ms: r.time_offset_msec,
                song_id: r.song_id,
            })
            .collect())
    }
}
