use std::time::SystemTime;

use diesel::prelude::*;

use crate::store::schema::{fingerprints, songs};

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = songs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Song {
    pub id: i32,
    pub title: String,
    pub artist_name: Option<String>,
    pub album_name: Option<String>,
    pub file_path: Option<String>,
    pub duration_sec: Option<f64>,
    pub sample_rate: Option<i32>,
    pub created_at: Option<SystemTime>,
}

#[derive(Insertable)]
#[diesel(table_name = songs)]
pub struct NewSong {
    pub title: String,
    pub artist_name: Option<String>,
    pub album_name: Option<String>,
    pub file_path: Option<String>,
    pub duration_sec: Option<f64>,
    pub sample_rate: Option<i32>,
    pub created_at: Option<SystemTime>,
}

#[derive(Insertable)]
#[diesel(table_name = fingerprints)]
pub struct NewFingerprint {
    pub hash: i32,
    pub time_offset_msec: i64,
    pub song_id: i32,
}

/// Row shape returned by the raw posting-lookup query (see
/// `store::index_store::IndexStore::find_postings`).
#[derive(QueryableByName, Debug, Clone)]
pub struct FingerprintMatch {
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub hash: i32,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub time_offset_msec: i64,
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub song_id: i32,
}
