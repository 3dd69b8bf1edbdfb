//! Diesel table definitions.
//!
//! Must match `backend/migrations`. Regenerate with `diesel print-schema`
//! after changing a migration.

diesel::table! {
    /// JSON documents for every domain collection.
    ///
    /// The composite key is `(collection, id)`. `revision` starts at 1 and is
    /// bumped by each conditional update.
    documents (collection, id) {
        /// Collection name, for example `lessons` or `user_quests`.
        collection -> Text,
        /// Entity identifier taken from the document itself.
        id -> Uuid,
        /// Optimistic concurrency counter.
        revision -> Int8,
        /// Serialised entity.
        body -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}
