// Logical schema matching the external interface in SPEC_FULL.md §6.

diesel::table! {
    songs (id) {
        id -> Int4,
        #[max_length = 255]
        title -> Varchar,
        #[max_length = 255]
        artist_name -> Nullable<Varchar>,
        #[max_length = 255]
        album_name -> Nullable<Varchar>,
        file_path -> Nullable<Text>,
        duration_sec -> Nullable<Float8>,
        sample_rate -> Nullable<Int4>,
        created_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    fingerprints (id) {
        id -> Int8,
        hash -> Int4,
        time_offset_msec -> Int8,
        song_id -> Int4,
    }
}

diesel::joinable!(fingerprints -> songs (song_id));
diesel::allow_tables_to_appear_in_same_query!(fingerprints, songs,);
